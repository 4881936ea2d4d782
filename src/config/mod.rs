// Configuration module
// Public interface for configuration loading

mod loader;
mod settings;

pub use loader::{load_config, load_config_from};
pub use settings::{
    Config, EmergencyNumbers, Endpoint, GatewayConfig, GenerationConfig, LaunchConfig,
    ModelConfig, SafetyConfig, StartupTimeouts, WebConfig, DEFAULT_PROMPT_TEMPLATE, MESSAGE_SLOT,
};
