// Startup orchestration
//
// Starts router, worker, API server and web UI in that order. Each step
// waits for the component's readiness signal (bounded by its startup
// timeout) before the next one is launched.

use std::fmt;
use std::future::Future;
use tokio::sync::watch;

use super::locator::{CapabilityLocator, CapabilityProbe};
use super::spawn::{LaunchHandle, Launcher, Readiness};
use super::{Component, LaunchError};
use crate::config::StartupTimeouts;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    NotStarted,
    Starting(Component),
    Up(Component),
    Running,
    Stopped,
    Failed(Component),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::NotStarted => write!(f, "not started"),
            Stage::Starting(c) => write!(f, "starting {}", c),
            Stage::Up(c) => write!(f, "{} up", c),
            Stage::Running => write!(f, "running"),
            Stage::Stopped => write!(f, "stopped"),
            Stage::Failed(c) => write!(f, "{} failed", c),
        }
    }
}

pub struct Orchestrator<P, L> {
    locator: CapabilityLocator<P>,
    launcher: L,
    timeouts: StartupTimeouts,
    stage: watch::Sender<Stage>,
    launched: Vec<LaunchHandle>,
    ready: Vec<Component>,
}

impl<P: CapabilityProbe, L: Launcher> Orchestrator<P, L> {
    pub fn new(locator: CapabilityLocator<P>, launcher: L, timeouts: StartupTimeouts) -> Self {
        let (stage, _) = watch::channel(Stage::NotStarted);
        Self {
            locator,
            launcher,
            timeouts,
            stage,
            launched: Vec::new(),
            ready: Vec::new(),
        }
    }

    /// Follow stage changes
    pub fn subscribe(&self) -> watch::Receiver<Stage> {
        self.stage.subscribe()
    }

    pub fn stage(&self) -> Stage {
        *self.stage.borrow()
    }

    /// Components that reported ready, in startup order
    pub fn ready_components(&self) -> &[Component] {
        &self.ready
    }

    /// Every launched component, including one that failed to become ready
    pub fn launched(&self) -> &[LaunchHandle] {
        &self.launched
    }

    /// Start every component in order.
    ///
    /// Stops at the first failure; components already started keep running.
    pub async fn start(&mut self) -> Result<(), LaunchError> {
        for component in Component::STARTUP_ORDER {
            self.start_component(component).await?;
        }
        self.set_stage(Stage::Running);
        Ok(())
    }

    async fn start_component(&mut self, component: Component) -> Result<(), LaunchError> {
        self.set_stage(Stage::Starting(component));

        match self.launch_and_wait(component).await {
            Ok(()) => {
                self.ready.push(component);
                self.set_stage(Stage::Up(component));
                Ok(())
            }
            Err(e) => {
                tracing::error!(%component, error = %e, "Component failed to start");
                self.set_stage(Stage::Failed(component));
                Err(e)
            }
        }
    }

    async fn launch_and_wait(&mut self, component: Component) -> Result<(), LaunchError> {
        let provider = self.locator.locate(component).await?;
        let mut handle = self.launcher.launch(component, &provider).await?;

        let timeout = self.timeouts.for_component(component);
        let outcome = tokio::time::timeout(timeout, &mut handle.ready).await;
        self.launched.push(handle);

        match outcome {
            Ok(Ok(Readiness::Ready)) => Ok(()),
            Ok(Ok(Readiness::Exited { code })) => {
                Err(LaunchError::ExitedBeforeReady { component, code })
            }
            // Supervisor dropped without reporting
            Ok(Err(_)) => Err(LaunchError::ExitedBeforeReady {
                component,
                code: None,
            }),
            Err(_) => Err(LaunchError::ReadinessTimeout { component, timeout }),
        }
    }

    /// Idle in `Running` until `shutdown` resolves, then move to `Stopped`.
    ///
    /// Components are not shut down gracefully; they end with the launcher.
    pub async fn run_until<F>(self, shutdown: F) -> Stage
    where
        F: Future<Output = ()>,
    {
        shutdown.await;
        self.set_stage(Stage::Stopped);
        tracing::info!(components = self.launched.len(), "Launcher stopped");
        Stage::Stopped
    }

    fn set_stage(&self, stage: Stage) {
        tracing::debug!(%stage, "Orchestrator stage");
        self.stage.send_replace(stage);
    }
}
