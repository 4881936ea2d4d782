// Configuration structs
//
// Built once at startup by `load_config` and passed by reference afterwards.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::launcher::Component;

/// Vicuna conversation template for the mental-health context.
/// `{message}` is the only substitution slot.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "
A continuación hay una conversación entre un usuario y un Asistente Virtual de Salud Mental. El asistente está basado en el modelo Vicuna y está diseñado para proporcionar apoyo emocional, escucha empática y recursos psicoeducativos. El asistente es empático, respetuoso, utiliza preguntas abiertas para explorar las emociones del usuario, y evita dar consejos directivos cuando no es apropiado. No diagnostica ni reemplaza a profesionales de la salud mental.

USER: {message}
ASSISTANT:
";

/// Slot replaced by the user's message in the prompt template
pub const MESSAGE_SLOT: &str = "{message}";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub controller: Endpoint,
    pub worker: Endpoint,
    pub api_server: Endpoint,
    pub web: WebConfig,
    pub gateway: GatewayConfig,
    pub generation: GenerationConfig,
    pub safety: SafetyConfig,
    pub prompt_template: String,
    pub launch: LaunchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            controller: Endpoint::new("localhost", 21001),
            worker: Endpoint::new("localhost", 21002),
            api_server: Endpoint::new("localhost", 8000),
            web: WebConfig::default(),
            gateway: GatewayConfig::default(),
            generation: GenerationConfig::default(),
            safety: SafetyConfig::default(),
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            launch: LaunchConfig::default(),
        }
    }
}

impl Config {
    /// Copy of this configuration pointing the worker at another model path
    /// (used once a download resolved the reference to a local directory).
    pub fn with_model_path(&self, model_path: impl Into<String>) -> Self {
        let mut config = self.clone();
        config.model.model_path = model_path.into();
        config
    }

    /// Name the worker registers under first; used by the chat gateway
    pub fn primary_model_name(&self) -> &str {
        self.model
            .model_names
            .first()
            .map(String::as_str)
            .unwrap_or("vicuna")
    }
}

/// Host/port pair of a local service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
        }
    }

    /// Base URL (e.g. "http://localhost:21001")
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Hub reference ("lmsys/vicuna-7b-v1.5") or local path
    pub model_path: String,
    /// Device passed to the worker ("cpu", "cuda", "mps")
    pub device: String,
    pub load_8bit: bool,
    pub cpu_offloading: bool,
    /// Visible GPUs, e.g. "0,1"
    pub gpus: Option<String>,
    pub num_gpus: u32,
    /// Per-GPU memory cap, e.g. "13GiB"
    pub max_gpu_memory: Option<String>,
    /// Names the worker registers with the controller
    pub model_names: Vec<String>,
    /// HuggingFace token for gated repositories
    #[serde(skip_serializing)]
    pub hf_token: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: "lmsys/vicuna-7b-v1.5".to_string(),
            device: "cpu".to_string(),
            load_8bit: false,
            cpu_offloading: false,
            gpus: None,
            num_gpus: 1,
            max_gpu_memory: None,
            model_names: vec!["vicuna".to_string(), "mental_health_assistant".to_string()],
            hf_token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
    /// Ask Gradio for a public share link
    pub share: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7860,
            share: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub enabled: bool,
    pub bind_address: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub max_new_tokens: u32,
    /// Kept for REPETITION_PENALTY compatibility. FastChat's completions
    /// endpoint has no such parameter, so the gateway does not send it.
    pub repetition_penalty: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            max_new_tokens: 512,
            repetition_penalty: 1.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Phrases that trigger the crisis response, matched in this order
    pub crisis_keywords: Vec<String>,
    pub emergency_numbers: EmergencyNumbers,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            crisis_keywords: [
                "suicidio",
                "matarme",
                "quitarme la vida",
                "no quiero vivir",
                "autolesión",
                "cortarme",
                "hacerme daño",
            ]
            .iter()
            .map(|k| k.to_string())
            .collect(),
            emergency_numbers: EmergencyNumbers::default(),
        }
    }
}

/// Emergency phone numbers (defaults are Spain's)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyNumbers {
    pub general: String,
    pub suicide_prevention: String,
}

impl Default for EmergencyNumbers {
    fn default() -> Self {
        Self {
            general: "112".to_string(),
            suicide_prevention: "024".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    /// Python interpreter that has FastChat installed
    pub python: String,
    /// Directory receiving one log file per component
    pub log_dir: PathBuf,
    /// Delay between readiness probes
    pub poll_interval_ms: u64,
    pub startup_timeouts: StartupTimeouts,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            log_dir: PathBuf::from("logs"),
            poll_interval_ms: 500,
            startup_timeouts: StartupTimeouts::default(),
        }
    }
}

impl LaunchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Seconds each component may take to answer its readiness probe
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupTimeouts {
    pub router: u64,
    pub worker: u64,
    pub api_server: u64,
    pub web_ui: u64,
}

impl Default for StartupTimeouts {
    fn default() -> Self {
        Self {
            router: 30,
            // Loading a 7B model on CPU is slow
            worker: 900,
            api_server: 60,
            web_ui: 120,
        }
    }
}

impl StartupTimeouts {
    pub fn for_component(&self, component: Component) -> Duration {
        let secs = match component {
            Component::Router => self.router,
            Component::Worker => self.worker,
            Component::ApiServer => self.api_server,
            Component::WebUi => self.web_ui,
        };
        Duration::from_secs(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_fastchat_layout() {
        let config = Config::default();
        assert_eq!(config.controller.url(), "http://localhost:21001");
        assert_eq!(config.worker.port, 21002);
        assert_eq!(config.api_server.port, 8000);
        assert_eq!(config.web.port, 7860);
        assert_eq!(config.primary_model_name(), "vicuna");
    }

    #[test]
    fn test_template_has_single_slot() {
        assert_eq!(DEFAULT_PROMPT_TEMPLATE.matches(MESSAGE_SLOT).count(), 1);
    }

    #[test]
    fn test_with_model_path_leaves_original_untouched() {
        let config = Config::default();
        let resolved = config.with_model_path("models/vicuna-7b-v1.5");
        assert_eq!(resolved.model.model_path, "models/vicuna-7b-v1.5");
        assert_eq!(config.model.model_path, "lmsys/vicuna-7b-v1.5");
    }
}
