// Prompt formatting for the Vicuna conversation template

use super::category::Category;
use crate::config::{Config, MESSAGE_SLOT};

/// Wraps user messages into the configured template
#[derive(Debug, Clone)]
pub struct PromptFormatter {
    template: String,
}

impl PromptFormatter {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.prompt_template.clone())
    }

    /// Format a message for the model.
    ///
    /// `General` embeds the message verbatim; any other category (known or
    /// not) prefixes a context note naming it. Only the message slot is
    /// touched, so the role markers survive unchanged.
    pub fn format_prompt(&self, message: &str, category: &Category) -> String {
        let slot = if category.is_general() {
            message.to_string()
        } else {
            format!(
                "(Contexto: El usuario quiere hablar sobre temas relacionados con {}) {}",
                category.label().to_lowercase(),
                message
            )
        };

        self.template.replacen(MESSAGE_SLOT, &slot, 1)
    }
}

/// Guidance for the assistant per topic; empty for General and unknown topics
pub fn category_instructions(category: &Category) -> &'static str {
    match category {
        Category::Ansiedad => {
            "Para temas de ansiedad: Muestra una actitud calmada, valida sus sentimientos, \
             enseña técnicas de respiración y relajación cuando sea apropiado, y explora \
             desencadenantes específicos con preguntas abiertas."
        }
        Category::Depresion => {
            "Para temas de depresión: Utiliza un enfoque de escucha empática, valida sus \
             experiencias sin minimizarlas, explora patrones de pensamiento, y pregunta \
             sobre actividades que antes disfrutaban. Mantén un tono esperanzador pero realista."
        }
        Category::Estres => {
            "Para manejo del estrés: Ayuda a identificar fuentes de estrés, explora estrategias \
             de afrontamiento, sugiere técnicas de mindfulness cuando sea apropiado, y ayuda \
             a priorizar el autocuidado."
        }
        Category::Relaciones => {
            "Para problemas de relaciones: Escucha sin juzgar, evita tomar partido, ayuda a \
             explorar patrones de comunicación, y anima a considerar diferentes perspectivas."
        }
        Category::Autoestima => {
            "Para problemas de autoestima: Ayuda a identificar fortalezas personales, cuestiona \
             pensamientos autocríticos, y fomenta una autoimagen más compasiva y realista."
        }
        Category::TecnicasRelajacion => {
            "Para técnicas de relajación: Guía en respiración profunda, relajación muscular progresiva, \
             visualización o mindfulness. Ofrece instrucciones paso a paso cuando sea apropiado."
        }
        Category::General | Category::Other(_) => "",
    }
}

/// Conversation starter offered when the user picks a topic
pub fn topic_suggestion(category: &Category) -> String {
    match category {
        Category::General => "Hola, me gustaría conversar contigo.".to_string(),
        Category::Ansiedad => "Últimamente me siento ansioso. ¿Podrías ayudarme?".to_string(),
        Category::Depresion => {
            "He estado sintiéndome sin energía y con poco interés en las cosas.".to_string()
        }
        Category::Estres => "El estrés me está afectando mucho últimamente.".to_string(),
        Category::Relaciones => {
            "Estoy teniendo dificultades en mis relaciones personales.".to_string()
        }
        other => format!("Me gustaría hablar sobre {}.", other.label().to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PROMPT_TEMPLATE;

    fn formatter() -> PromptFormatter {
        PromptFormatter::new(DEFAULT_PROMPT_TEMPLATE)
    }

    #[test]
    fn test_general_embeds_message_verbatim() {
        let prompt = formatter().format_prompt("Hola, ¿cómo estás?", &Category::General);
        assert!(prompt.contains("USER: Hola, ¿cómo estás?\nASSISTANT:"));
        assert!(!prompt.contains("Contexto"));
    }

    #[test]
    fn test_category_adds_context() {
        let prompt = formatter().format_prompt("tengo un examen mañana", &Category::Estres);
        assert!(prompt.contains(
            "USER: (Contexto: El usuario quiere hablar sobre temas relacionados con estrés) tengo un examen mañana"
        ));
    }

    #[test]
    fn test_unknown_category_degrades_gracefully() {
        let prompt = formatter().format_prompt("perdí a mi abuela", &Category::parse("Duelo"));
        assert!(prompt.contains("relacionados con duelo) perdí a mi abuela"));
    }

    #[test]
    fn test_slot_text_in_message_is_not_expanded() {
        let prompt = formatter().format_prompt("literal {message} aquí", &Category::General);
        assert!(prompt.contains("USER: literal {message} aquí"));
        assert_eq!(prompt.matches("ASSISTANT:").count(), 1);
    }

    #[test]
    fn test_instructions_only_for_specific_topics() {
        assert!(category_instructions(&Category::General).is_empty());
        assert!(category_instructions(&Category::parse("Duelo")).is_empty());
        assert!(category_instructions(&Category::Ansiedad).contains("respiración"));
    }

    #[test]
    fn test_topic_suggestion_fallback() {
        assert_eq!(
            topic_suggestion(&Category::Autoestima),
            "Me gustaría hablar sobre autoestima."
        );
        assert_eq!(
            topic_suggestion(&Category::General),
            "Hola, me gustaría conversar contigo."
        );
    }
}
