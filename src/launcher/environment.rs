// Python environment check
//
// Reports the interpreter version and which serving packages are importable.
// Nothing is installed automatically; missing packages come with a pip hint.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use tokio::process::Command;

use crate::errors;

/// (import name, pip hint, required to launch)
const PACKAGES: &[(&str, &str, bool)] = &[
    ("fastchat", "pip install 'fschat[model_worker,webui]'", true),
    ("gradio", "pip install gradio", true),
    ("transformers", "pip install transformers", false),
    ("torch", "pip install torch", false),
    ("huggingface_hub", "pip install huggingface_hub", false),
];

const VERSION_SCRIPT: &str = "\
import importlib, json, sys
packages = {}
for name in sys.argv[1:]:
    try:
        module = importlib.import_module(name)
        packages[name] = str(getattr(module, '__version__', 'desconocida'))
    except Exception:
        packages[name] = None
print(json.dumps({'python': sys.version.split()[0], 'packages': packages}))
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageStatus {
    pub name: String,
    /// None when the package cannot be imported
    pub version: Option<String>,
    pub install_hint: String,
    pub required: bool,
}

#[derive(Debug, Clone)]
pub struct EnvironmentReport {
    pub python_version: String,
    pub packages: Vec<PackageStatus>,
}

#[derive(Deserialize)]
struct RawReport {
    python: String,
    packages: HashMap<String, Option<String>>,
}

impl EnvironmentReport {
    /// Build a report from the JSON printed by the version script
    pub fn parse(json: &str) -> Result<Self> {
        let raw: RawReport =
            serde_json::from_str(json.trim()).context("Unexpected output from Python check")?;

        let packages = PACKAGES
            .iter()
            .map(|(name, hint, required)| PackageStatus {
                name: name.to_string(),
                version: raw.packages.get(*name).cloned().flatten(),
                install_hint: hint.to_string(),
                required: *required,
            })
            .collect();

        Ok(Self {
            python_version: raw.python,
            packages,
        })
    }

    pub fn missing(&self) -> impl Iterator<Item = &PackageStatus> {
        self.packages.iter().filter(|p| p.version.is_none())
    }

    /// Error listing the required packages that are missing, if any
    pub fn ensure_launchable(&self) -> Result<()> {
        let missing: Vec<(String, String)> = self
            .missing()
            .filter(|p| p.required)
            .map(|p| (p.name.clone(), p.install_hint.clone()))
            .collect();

        if !missing.is_empty() {
            bail!(errors::missing_packages_error(&missing));
        }
        Ok(())
    }

    /// Print the report the way the operator console shows it
    pub fn print(&self) {
        println!("🔍 Verificando entorno...");
        println!("Python: {}", self.python_version);
        for package in &self.packages {
            match &package.version {
                Some(version) => println!("✅ {}: {}", package.name, version),
                None => println!(
                    "❌ {} no está instalado ({})",
                    package.name, package.install_hint
                ),
            }
        }
    }
}

/// Run the version script with `python`
pub async fn check_environment(python: &str) -> Result<EnvironmentReport> {
    let names: Vec<&str> = PACKAGES.iter().map(|(name, _, _)| *name).collect();

    let output = Command::new(python)
        .arg("-c")
        .arg(VERSION_SCRIPT)
        .args(&names)
        .output()
        .await
        .with_context(|| errors::python_not_found_error(python))?;

    if !output.status.success() {
        bail!(
            "Python environment check failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let report = EnvironmentReport::parse(&String::from_utf8_lossy(&output.stdout))?;
    tracing::debug!(
        python = %report.python_version,
        missing = report.missing().count(),
        "Environment checked"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_complete_environment() {
        let report = EnvironmentReport::parse(
            r#"{"python":"3.11.4","packages":{"fastchat":"0.2.36","gradio":"3.50.2","transformers":"4.36.0","torch":"2.1.0","huggingface_hub":"0.19.4"}}"#,
        )
        .unwrap();

        assert_eq!(report.python_version, "3.11.4");
        assert_eq!(report.missing().count(), 0);
        assert!(report.ensure_launchable().is_ok());
    }

    #[test]
    fn test_missing_required_package_blocks_launch() {
        let report = EnvironmentReport::parse(
            r#"{"python":"3.10.0","packages":{"fastchat":null,"gradio":"4.0","transformers":"4.36.0","torch":null,"huggingface_hub":"0.19.4"}}"#,
        )
        .unwrap();

        let missing: Vec<&str> = report.missing().map(|p| p.name.as_str()).collect();
        assert_eq!(missing, vec!["fastchat", "torch"]);

        let err = report.ensure_launchable().unwrap_err().to_string();
        assert!(err.contains("fschat[model_worker,webui]"));
        assert!(!err.contains("pip install torch"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(EnvironmentReport::parse("Traceback (most recent call last)").is_err());
    }

    #[tokio::test]
    async fn test_missing_interpreter() {
        assert!(check_environment("/nonexistent/python-interpreter").await.is_err());
    }
}
