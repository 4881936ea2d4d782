// Crisis keyword detector

use serde::Serialize;

use crate::config::{EmergencyNumbers, SafetyConfig};

/// Outcome of scanning one message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrisisDetection {
    pub detected: bool,
    /// Matching keywords in configured order, each at most once
    pub matched_keywords: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CrisisDetector {
    /// Lower-cased once at construction
    keywords: Vec<String>,
    emergency_numbers: EmergencyNumbers,
}

impl CrisisDetector {
    pub fn new(keywords: Vec<String>, emergency_numbers: EmergencyNumbers) -> Self {
        Self {
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
            emergency_numbers,
        }
    }

    pub fn from_config(config: &SafetyConfig) -> Self {
        Self::new(
            config.crisis_keywords.clone(),
            config.emergency_numbers.clone(),
        )
    }

    /// Detect crisis keywords in a message.
    ///
    /// Case-insensitive substring match; not word-bounded, so a keyword
    /// inside a longer word also counts.
    pub fn detect_crisis(&self, message: &str) -> CrisisDetection {
        let message_lower = message.to_lowercase();

        let matched_keywords: Vec<String> = self
            .keywords
            .iter()
            .filter(|keyword| message_lower.contains(keyword.as_str()))
            .cloned()
            .collect();

        if !matched_keywords.is_empty() {
            tracing::warn!(keywords = ?matched_keywords, "Crisis keywords detected");
        }

        CrisisDetection {
            detected: !matched_keywords.is_empty(),
            matched_keywords,
        }
    }

    /// Safety message shown instead of a model reply.
    ///
    /// Only the emergency numbers vary; the matched keywords decide whether
    /// this is shown, not what it says.
    pub fn crisis_response(&self, _matched_keywords: &[String]) -> String {
        format!(
            "**Mensaje importante de seguridad**\n\
             \n\
             He detectado contenido en tu mensaje que puede indicar que estás pasando por un momento difícil.\n\
             \n\
             Es importante que sepas que hay ayuda disponible:\n\
             \n\
             - Teléfono de Emergencias: {}\n\
             - Línea de Prevención del Suicidio: {}\n\
             \n\
             Este asistente no está diseñado para manejar situaciones de crisis y no reemplaza \
             la ayuda profesional. Si estás en peligro inmediato, por favor contacta con los \
             servicios de emergencia.\n\
             \n\
             Si quieres seguir conversando sobre temas generales de salud mental, estoy aquí para ayudarte.\n",
            self.emergency_numbers.general, self.emergency_numbers.suicide_prevention
        )
    }
}

impl Default for CrisisDetector {
    fn default() -> Self {
        Self::from_config(&SafetyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_detector() -> CrisisDetector {
        CrisisDetector::new(
            vec!["suicidio".to_string(), "No Quiero Vivir".to_string(), "cortarme".to_string()],
            EmergencyNumbers::default(),
        )
    }

    #[test]
    fn test_crisis_detection() {
        let detector = create_test_detector();

        let result = detector.detect_crisis("ya no quiero vivir");
        assert!(result.detected);
        assert_eq!(result.matched_keywords, vec!["no quiero vivir"]);

        let result = detector.detect_crisis("¿Qué puedo hacer para dormir mejor?");
        assert!(!result.detected);
        assert!(result.matched_keywords.is_empty());
    }

    #[test]
    fn test_case_insensitive() {
        let detector = create_test_detector();

        assert!(detector.detect_crisis("SUICIDIO").detected);
        assert!(detector.detect_crisis("SuIcIdIo").detected);
    }

    #[test]
    fn test_matches_follow_keyword_order_once_each() {
        let detector = create_test_detector();

        let result = detector.detect_crisis("cortarme... suicidio, cortarme otra vez");
        assert_eq!(result.matched_keywords, vec!["suicidio", "cortarme"]);
    }

    #[test]
    fn test_not_word_bounded() {
        let detector = create_test_detector();

        assert!(detector.detect_crisis("antisuicidio").detected);
    }

    #[test]
    fn test_empty_message() {
        let detector = create_test_detector();

        assert_eq!(detector.detect_crisis(""), CrisisDetection::default());
    }

    #[test]
    fn test_response_ignores_keywords() {
        let detector = CrisisDetector::default();

        let a = detector.crisis_response(&["suicidio".to_string()]);
        let b = detector.crisis_response(&[]);
        assert_eq!(a, b);
        assert!(a.contains("112"));
        assert!(a.contains("024"));
    }

    #[test]
    fn test_response_uses_configured_numbers() {
        let detector = CrisisDetector::new(
            vec![],
            EmergencyNumbers {
                general: "911".to_string(),
                suicide_prevention: "988".to_string(),
            },
        );

        let response = detector.crisis_response(&[]);
        assert!(response.contains("911"));
        assert!(response.contains("988"));
    }
}
