// Capability locator
//
// FastChat has shipped its entry points under several module layouts.
// Each component has an ordered list of candidates; the first one the
// probe accepts is used.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use tokio::process::Command;

use super::{Component, LaunchError};

/// A Python module that may provide a component's entry point
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderCandidate {
    pub module: String,
}

impl ProviderCandidate {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
        }
    }
}

/// Decides whether a candidate is usable in the current environment
#[async_trait]
pub trait CapabilityProbe: Send + Sync {
    async fn provides(&self, candidate: &ProviderCandidate) -> bool;
}

/// Candidates for one component across FastChat's historical layouts
pub fn fastchat_candidates(component: Component) -> Vec<ProviderCandidate> {
    let name = component.module_name();
    ["fastchat.serve", "fastchat", "fschat.serve", "fschat"]
        .iter()
        .map(|package| ProviderCandidate::new(format!("{}.{}", package, name)))
        .collect()
}

pub struct CapabilityLocator<P> {
    probe: P,
    registry: HashMap<Component, Vec<ProviderCandidate>>,
}

impl<P: CapabilityProbe> CapabilityLocator<P> {
    /// Locator over the default FastChat registry
    pub fn new(probe: P) -> Self {
        let registry = Component::STARTUP_ORDER
            .iter()
            .map(|c| (*c, fastchat_candidates(*c)))
            .collect();
        Self::with_registry(probe, registry)
    }

    pub fn with_registry(probe: P, registry: HashMap<Component, Vec<ProviderCandidate>>) -> Self {
        Self { probe, registry }
    }

    pub fn candidates(&self, component: Component) -> &[ProviderCandidate] {
        self.registry
            .get(&component)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First candidate the probe accepts, in registry order
    pub async fn locate(&self, component: Component) -> Result<ProviderCandidate, LaunchError> {
        let candidates = self.candidates(component);

        for candidate in candidates {
            if self.probe.provides(candidate).await {
                tracing::debug!(%component, module = %candidate.module, "Provider located");
                return Ok(candidate.clone());
            }
            tracing::debug!(%component, module = %candidate.module, "Provider not available");
        }

        Err(LaunchError::MissingCapability {
            component,
            tried: candidates.iter().map(|c| c.module.clone()).collect(),
        })
    }
}

/// Asks a Python interpreter whether a module can be imported
pub struct PythonModuleProbe {
    python: String,
}

const FIND_SPEC_SCRIPT: &str = "\
import importlib.util, sys
try:
    found = importlib.util.find_spec(sys.argv[1]) is not None
except Exception:
    found = False
sys.exit(0 if found else 1)
";

impl PythonModuleProbe {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }

    async fn module_exists(&self, module: &str) -> Result<bool> {
        let status = Command::new(&self.python)
            .arg("-c")
            .arg(FIND_SPEC_SCRIPT)
            .arg(module)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .with_context(|| format!("Failed to execute {}", self.python))?;
        Ok(status.success())
    }
}

#[async_trait]
impl CapabilityProbe for PythonModuleProbe {
    async fn provides(&self, candidate: &ProviderCandidate) -> bool {
        match self.module_exists(&candidate.module).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(module = %candidate.module, error = %e, "Module probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    struct SetProbe {
        available: HashSet<String>,
        asked: Mutex<Vec<String>>,
    }

    impl SetProbe {
        fn new(modules: &[&str]) -> Self {
            Self {
                available: modules.iter().map(|m| m.to_string()).collect(),
                asked: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CapabilityProbe for SetProbe {
        async fn provides(&self, candidate: &ProviderCandidate) -> bool {
            self.asked.lock().unwrap().push(candidate.module.clone());
            self.available.contains(&candidate.module)
        }
    }

    #[test]
    fn test_default_candidates_order() {
        let modules: Vec<String> = fastchat_candidates(Component::Router)
            .into_iter()
            .map(|c| c.module)
            .collect();
        assert_eq!(
            modules,
            vec![
                "fastchat.serve.controller",
                "fastchat.controller",
                "fschat.serve.controller",
                "fschat.controller"
            ]
        );
    }

    #[tokio::test]
    async fn test_first_accepted_candidate_wins() {
        let probe = SetProbe::new(&["fschat.serve.model_worker", "fschat.model_worker"]);
        let locator = CapabilityLocator::new(probe);

        let found = locator.locate(Component::Worker).await.unwrap();
        assert_eq!(found.module, "fschat.serve.model_worker");
        assert_eq!(
            *locator.probe.asked.lock().unwrap(),
            vec![
                "fastchat.serve.model_worker",
                "fastchat.model_worker",
                "fschat.serve.model_worker"
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_capability_names_all_candidates() {
        let locator = CapabilityLocator::new(SetProbe::new(&[]));

        let err = locator.locate(Component::WebUi).await.unwrap_err();
        match err {
            LaunchError::MissingCapability { component, tried } => {
                assert_eq!(component, Component::WebUi);
                assert_eq!(tried.len(), 4);
                assert_eq!(tried[0], "fastchat.serve.gradio_web_server");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_python_probe_with_missing_interpreter() {
        let probe = PythonModuleProbe::new("/nonexistent/python-interpreter");
        assert!(!probe.provides(&ProviderCandidate::new("json")).await);
    }
}
