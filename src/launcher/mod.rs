// Launcher for the FastChat serving stack
//
// Locates each FastChat component in the Python environment, starts it as
// a supervised subprocess and advances once the component reports ready.

pub mod environment;
pub mod locator;
pub mod orchestrator;
pub mod readiness;
pub mod spawn;

pub use environment::{check_environment, EnvironmentReport, PackageStatus};
pub use locator::{CapabilityLocator, CapabilityProbe, ProviderCandidate, PythonModuleProbe};
pub use orchestrator::{Orchestrator, Stage};
pub use readiness::ReadinessProbe;
pub use spawn::{LaunchHandle, Launcher, ProcessLauncher, Readiness};

use std::fmt;
use std::time::Duration;

/// External FastChat components, in startup order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    /// FastChat controller: tracks which worker serves which model
    Router,
    /// Model worker: loads the model and generates
    Worker,
    /// OpenAI-compatible HTTP API
    ApiServer,
    /// Gradio web chat
    WebUi,
}

impl Component {
    pub const STARTUP_ORDER: [Component; 4] = [
        Component::Router,
        Component::Worker,
        Component::ApiServer,
        Component::WebUi,
    ];

    /// Module name inside `fastchat.serve`
    pub fn module_name(&self) -> &'static str {
        match self {
            Component::Router => "controller",
            Component::Worker => "model_worker",
            Component::ApiServer => "openai_api_server",
            Component::WebUi => "gradio_web_server",
        }
    }

    /// Short name used for log files
    pub fn slug(&self) -> &'static str {
        match self {
            Component::Router => "router",
            Component::Worker => "worker",
            Component::ApiServer => "api",
            Component::WebUi => "web_ui",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Component::Router => "controller",
            Component::Worker => "model worker",
            Component::ApiServer => "API server",
            Component::WebUi => "web UI",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("no FastChat provider found for the {component} (tried: {})", .tried.join(", "))]
    MissingCapability {
        component: Component,
        tried: Vec<String>,
    },

    #[error("failed to start the {component}: {reason}")]
    Spawn { component: Component, reason: String },

    #[error("the {component} exited before becoming ready (exit code: {code:?})")]
    ExitedBeforeReady {
        component: Component,
        code: Option<i32>,
    },

    #[error("the {component} was not ready after {}s", .timeout.as_secs())]
    ReadinessTimeout {
        component: Component,
        timeout: Duration,
    },
}

impl LaunchError {
    pub fn component(&self) -> Component {
        match self {
            LaunchError::MissingCapability { component, .. }
            | LaunchError::Spawn { component, .. }
            | LaunchError::ExitedBeforeReady { component, .. }
            | LaunchError::ReadinessTimeout { component, .. } => *component,
        }
    }
}
