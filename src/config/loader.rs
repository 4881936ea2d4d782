// Configuration loader
// Defaults, then calma.toml (or $CALMA_CONFIG), then environment variables

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::settings::{Config, MESSAGE_SLOT};
use crate::errors;

const DEFAULT_CONFIG_FILE: &str = "calma.toml";

/// Load configuration from the config file and process environment
pub fn load_config() -> Result<Config> {
    let explicit = std::env::var("CALMA_CONFIG").ok().map(PathBuf::from);
    let path = explicit
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    if explicit.is_some() && !path.exists() {
        bail!(errors::file_not_found_error(
            &path.display().to_string(),
            "Configuration file"
        ));
    }

    let file = if path.exists() { Some(path.as_path()) } else { None };
    load_config_from(file, |key| std::env::var(key).ok())
}

/// Build a configuration from an optional TOML file and an environment lookup
pub fn load_config_from<F>(file: Option<&Path>, env: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match file {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            toml::from_str::<Config>(&contents)
                .map_err(|e| anyhow::anyhow!(errors::config_parse_error(&e.to_string())))?
        }
        None => Config::default(),
    };

    apply_env(&mut config, env)?;
    validate(&config)?;

    tracing::debug!(
        model = %config.model.model_path,
        device = %config.model.device,
        "Configuration loaded"
    );

    Ok(config)
}

fn apply_env<F>(config: &mut Config, env: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = var("MODEL_PATH") {
        config.model.model_path = v;
    }
    if let Some(v) = var("DEVICE") {
        config.model.device = v;
    }
    if let Some(v) = var("LOAD_8BIT") {
        config.model.load_8bit = parse_flag(&v);
    }
    if let Some(v) = var("CPU_OFFLOADING") {
        config.model.cpu_offloading = parse_flag(&v);
    }
    if let Some(v) = var("GPUS") {
        config.model.gpus = Some(v);
    }
    if let Some(v) = var("NUM_GPUS") {
        config.model.num_gpus = parse_number("NUM_GPUS", &v)?;
    }
    if let Some(v) = var("MAX_GPU_MEMORY") {
        config.model.max_gpu_memory = Some(v);
    }
    if let Some(v) = var("HUGGINGFACE_TOKEN") {
        config.model.hf_token = Some(v);
    }
    if let Some(v) = var("HOST") {
        config.web.host = v;
    }
    if let Some(v) = var("PORT") {
        config.web.port = parse_number("PORT", &v)?;
    }
    if let Some(v) = var("SHARE_GRADIO") {
        config.web.share = parse_flag(&v);
    }
    if let Some(v) = var("TEMPERATURE") {
        config.generation.temperature = parse_number("TEMPERATURE", &v)?;
    }
    if let Some(v) = var("TOP_P") {
        config.generation.top_p = parse_number("TOP_P", &v)?;
    }
    if let Some(v) = var("MAX_NEW_TOKENS") {
        config.generation.max_new_tokens = parse_number("MAX_NEW_TOKENS", &v)?;
    }
    if let Some(v) = var("REPETITION_PENALTY") {
        config.generation.repetition_penalty = parse_number("REPETITION_PENALTY", &v)?;
    }
    if let Some(v) = var("PYTHON") {
        config.launch.python = v;
    }
    if let Some(v) = var("GATEWAY_BIND") {
        config.gateway.bind_address = v;
    }

    Ok(())
}

/// "true" in any casing enables a flag; everything else disables it
fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

fn parse_number<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {}: '{}'", key, value))
}

fn validate(config: &Config) -> Result<()> {
    if config.prompt_template.matches(MESSAGE_SLOT).count() != 1 {
        bail!(errors::wrap_error_with_suggestion(
            "prompt_template must contain exactly one {message} slot",
            "Restore the default template or add a single {message} placeholder"
        ));
    }
    if config.model.model_names.is_empty() {
        bail!("model.model_names must list at least one name");
    }
    if config.safety.crisis_keywords.iter().any(|k| k.trim().is_empty()) {
        bail!("safety.crisis_keywords must not contain empty entries");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let config = load_config_from(None, env_from(&[])).unwrap();
        assert_eq!(config.model.model_path, "lmsys/vicuna-7b-v1.5");
        assert!(!config.model.load_8bit);
        assert_eq!(config.safety.emergency_numbers.general, "112");
    }

    #[test]
    fn test_flags_are_case_insensitive() {
        let config = load_config_from(
            None,
            env_from(&[("LOAD_8BIT", "TRUE"), ("CPU_OFFLOADING", "yes"), ("SHARE_GRADIO", "True")]),
        )
        .unwrap();
        assert!(config.model.load_8bit);
        assert!(!config.model.cpu_offloading);
        assert!(config.web.share);
    }

    #[test]
    fn test_malformed_number_is_an_error() {
        let result = load_config_from(None, env_from(&[("NUM_GPUS", "two")]));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("NUM_GPUS"));
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("calma.toml");
        fs::write(
            &path,
            r#"
prompt_template = "USER: {message}\nASSISTANT:"

[model]
model_path = "./local/model"
device = "cuda"

[generation]
temperature = 0.2
"#,
        )
        .unwrap();

        let config =
            load_config_from(Some(&path), env_from(&[("DEVICE", "mps"), ("TOP_P", "0.5")])).unwrap();
        assert_eq!(config.model.model_path, "./local/model");
        assert_eq!(config.model.device, "mps");
        assert_eq!(config.generation.temperature, 0.2);
        assert_eq!(config.generation.top_p, 0.5);
        // Untouched sections keep their defaults
        assert_eq!(config.controller.port, 21001);
    }

    #[test]
    fn test_template_without_slot_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("calma.toml");
        fs::write(&path, "prompt_template = \"USER:\\nASSISTANT:\"\n").unwrap();

        assert!(load_config_from(Some(&path), env_from(&[])).is_err());
    }
}
