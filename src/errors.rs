// User-friendly error messages
//
// Provides helpers to convert technical errors into actionable messages
// that guide operators toward solutions.
//
// Localization Support:
// Messages follow the LANG environment variable. Spanish is the default
// for this assistant; English is used when LANG starts with "en".

use anyhow::{Context, Result};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Locale {
    Es,
    En,
}

#[derive(Debug, Clone, Copy)]
enum Text {
    Try,
    Suggestion,
    PossibleCauses,
    Error,
}

/// Locale for a LANG value
fn locale_from_lang(lang: Option<&str>) -> Locale {
    match lang {
        Some(lang) if lang.starts_with("en") => Locale::En,
        _ => Locale::Es,
    }
}

/// Get the current locale from environment
fn get_locale() -> Locale {
    locale_from_lang(std::env::var("LANG").ok().as_deref())
}

fn text(locale: Locale, key: Text) -> &'static str {
    match (locale, key) {
        (Locale::En, Text::Try) => "Try",
        (Locale::En, Text::Suggestion) => "Suggestion",
        (Locale::En, Text::PossibleCauses) => "Possible causes",

        (Locale::Es, Text::Try) => "Intenta",
        (Locale::Es, Text::Suggestion) => "Sugerencia",
        (Locale::Es, Text::PossibleCauses) => "Posibles causas",

        (_, Text::Error) => "Error",
    }
}

/// Localized text helper
fn t(key: Text) -> &'static str {
    text(get_locale(), key)
}

/// Wrap an error with user-friendly context
pub trait UserFriendlyError {
    /// Add user-friendly context with a suggestion
    fn user_context_with_suggestion(self, problem: &str, suggestion: &str) -> Self;
}

impl<T> UserFriendlyError for Result<T> {
    fn user_context_with_suggestion(self, problem: &str, suggestion: &str) -> Self {
        self.with_context(|| wrap_error_with_suggestion(problem, suggestion))
    }
}

/// A FastChat component could not be located in the Python environment
pub fn missing_capability_error(capability: &str, tried: &[String]) -> String {
    format!(
        "Could not locate the FastChat {} (tried: {})\n\n\
        \x1b[1;33m{}:\x1b[0m\n\
        • FastChat is not installed in this Python environment\n\
        • The PYTHON variable points at another interpreter\n\n\
        \x1b[1;32m{}:\x1b[0m\n\
        1. Install FastChat with its worker and web UI extras:\n\
           \x1b[36mpip install 'fschat[model_worker,webui]'\x1b[0m\n\n\
        2. Check which interpreter is used:\n\
           \x1b[36mcalma check-env\x1b[0m",
        capability,
        tried.join(", "),
        t(Text::PossibleCauses),
        t(Text::Try)
    )
}

/// The model transfer from the hub failed
pub fn download_failed_error(model_ref: &str, error: &str) -> String {
    format!(
        "Failed to download model '{}'\n\n\
        \x1b[1;33m{}:\x1b[0m {}\n\n\
        \x1b[1;33m{}:\x1b[0m\n\
        • No network connection\n\
        • Gated repository (LLaMA-family models need approved access)\n\
        • Missing or invalid HuggingFace token\n\n\
        \x1b[1;32m{}:\x1b[0m\n\
        1. Set a token with the right permissions:\n\
           \x1b[36mexport HUGGINGFACE_TOKEN=\"hf_...\"\x1b[0m\n\n\
        2. Retry the download on its own:\n\
           \x1b[36mcalma download --model {}\x1b[0m",
        model_ref,
        t(Text::Error),
        error,
        t(Text::PossibleCauses),
        t(Text::Try),
        model_ref
    )
}

/// The configured Python interpreter could not be executed
pub fn python_not_found_error(python: &str) -> String {
    format!(
        "Python interpreter '{}' could not be executed\n\n\
        \x1b[1;32m{}:\x1b[0m\n\
        1. Install Python 3.8 or newer\n\n\
        2. Point calma at the right interpreter:\n\
           \x1b[36mexport PYTHON=/path/to/venv/bin/python\x1b[0m",
        python,
        t(Text::Try)
    )
}

/// Required Python packages are missing
pub fn missing_packages_error(packages: &[(String, String)]) -> String {
    let lines: Vec<String> = packages
        .iter()
        .map(|(name, hint)| format!("• {}: \x1b[36m{}\x1b[0m", name, hint))
        .collect();
    format!(
        "Required Python packages are not installed\n\n\
        \x1b[1;32m{}:\x1b[0m\n{}",
        t(Text::Try),
        lines.join("\n")
    )
}

/// Format a config parse error with helpful suggestions
pub fn config_parse_error(error: &str) -> String {
    format!(
        "Failed to parse config file\n\n\
        \x1b[1;33m{}:\x1b[0m {}\n\n\
        \x1b[1;32m{}:\x1b[0m\n\
        1. Check config file syntax:\n\
           \x1b[36mcat calma.toml\x1b[0m\n\n\
        2. Common mistakes:\n\
           • Missing quotes around strings\n\
           • Unclosed brackets []\n\
           • Numbers written as strings",
        t(Text::Error),
        error,
        t(Text::Try)
    )
}

/// Format a file not found error with helpful suggestions
pub fn file_not_found_error(path: &str, description: &str) -> String {
    format!(
        "{} not found: {}\n\n\
        \x1b[1;32m{}:\x1b[0m\n\
        1. Check if file exists:\n\
           \x1b[36mls -la {}\x1b[0m\n\n\
        2. Unset CALMA_CONFIG to fall back to ./calma.toml",
        description,
        path,
        t(Text::Try),
        path
    )
}

/// Wrap a generic error with suggestions
pub fn wrap_error_with_suggestion(error: impl fmt::Display, suggestion: &str) -> String {
    format!(
        "{}\n\n\
        \x1b[1;33m{}:\x1b[0m {}",
        error,
        t(Text::Suggestion),
        suggestion
    )
}
