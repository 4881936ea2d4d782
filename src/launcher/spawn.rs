// Component subprocess spawning and supervision
//
// Each component runs as `python -m <module> <args>` with its output
// appended to `<log_dir>/<component>.log`. A supervisor task owns the child,
// polls the readiness probe and reports on a oneshot channel.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;

use super::locator::ProviderCandidate;
use super::readiness::ReadinessProbe;
use super::{Component, LaunchError};
use crate::config::Config;

/// First signal a supervisor sends about its component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Exited { code: Option<i32> },
}

/// A launched component, not yet known to be ready
pub struct LaunchHandle {
    pub component: Component,
    pub pid: Option<u32>,
    pub ready: oneshot::Receiver<Readiness>,
}

impl LaunchHandle {
    pub fn new(component: Component, pid: Option<u32>, ready: oneshot::Receiver<Readiness>) -> Self {
        Self {
            component,
            pid,
            ready,
        }
    }
}

/// Starts one component from a located provider
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(
        &self,
        component: Component,
        provider: &ProviderCandidate,
    ) -> Result<LaunchHandle, LaunchError>;
}

/// Launches FastChat components as Python subprocesses
pub struct ProcessLauncher {
    config: Arc<Config>,
}

impl ProcessLauncher {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    fn log_path(&self, component: Component) -> PathBuf {
        self.config
            .launch
            .log_dir
            .join(format!("{}.log", component.slug()))
    }

    fn open_log(&self, component: Component) -> std::io::Result<std::fs::File> {
        std::fs::create_dir_all(&self.config.launch.log_dir)?;
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path(component))
    }

    fn command(&self, component: Component, provider: &ProviderCandidate) -> std::io::Result<Command> {
        let log_file = self.open_log(component)?;

        let mut cmd = Command::new(&self.config.launch.python);
        cmd.arg("-m")
            .arg(&provider.module)
            .args(component_args(component, &self.config))
            .stdin(Stdio::null())
            .stdout(Stdio::from(log_file.try_clone()?))
            .stderr(Stdio::from(log_file))
            // Components live as long as the launcher
            .kill_on_drop(true);

        if component == Component::Worker {
            if let Some(gpus) = &self.config.model.gpus {
                cmd.env("CUDA_VISIBLE_DEVICES", gpus);
            }
        }

        Ok(cmd)
    }
}

#[async_trait]
impl Launcher for ProcessLauncher {
    async fn launch(
        &self,
        component: Component,
        provider: &ProviderCandidate,
    ) -> Result<LaunchHandle, LaunchError> {
        let spawn_error = |reason: String| LaunchError::Spawn { component, reason };

        let probe = ReadinessProbe::for_component(component, &self.config)
            .map_err(|e| spawn_error(e.to_string()))?;

        let child = self
            .command(component, provider)
            .and_then(|mut cmd| cmd.spawn())
            .map_err(|e| spawn_error(format!("{} -m {}: {}", self.config.launch.python, provider.module, e)))?;

        let pid = child.id();
        tracing::info!(
            %component,
            module = %provider.module,
            pid = ?pid,
            log = %self.log_path(component).display(),
            "Component process spawned"
        );

        let (ready_tx, ready_rx) = oneshot::channel();
        let poll = self.config.launch.poll_interval();
        // The supervisor owns the child; it is killed when the runtime drops the task
        tokio::spawn(supervise(component, child, probe, poll, ready_tx));

        Ok(LaunchHandle::new(component, pid, ready_rx))
    }
}

/// Own the child until it exits; report readiness or early exit once
async fn supervise(
    component: Component,
    mut child: Child,
    probe: ReadinessProbe,
    poll: Duration,
    ready_tx: oneshot::Sender<Readiness>,
) {
    let mut ready_tx = Some(ready_tx);
    let mut ticker = tokio::time::interval(poll);

    loop {
        tokio::select! {
            status = child.wait() => {
                let code = match &status {
                    Ok(status) => {
                        tracing::warn!(%component, %status, "Component process exited");
                        status.code()
                    }
                    Err(e) => {
                        tracing::error!(%component, error = %e, "Failed to wait for component process");
                        None
                    }
                };
                if let Some(tx) = ready_tx.take() {
                    tx.send(Readiness::Exited { code }).ok();
                }
                return;
            }
            _ = ticker.tick(), if ready_tx.is_some() => {
                if probe.check().await {
                    tracing::info!(%component, url = %probe.url(), "Component ready");
                    if let Some(tx) = ready_tx.take() {
                        tx.send(Readiness::Ready).ok();
                    }
                }
            }
        }
    }
}

/// Command-line arguments for a component's FastChat entry point
pub fn component_args(component: Component, config: &Config) -> Vec<String> {
    let mut args = Vec::new();

    match component {
        Component::Router => {
            push_flag(&mut args, "--host", &config.controller.host);
            push_flag(&mut args, "--port", config.controller.port.to_string());
        }
        Component::Worker => {
            let model = &config.model;
            push_flag(&mut args, "--host", &config.worker.host);
            push_flag(&mut args, "--port", config.worker.port.to_string());
            push_flag(&mut args, "--worker-address", config.worker.url());
            push_flag(&mut args, "--controller-address", config.controller.url());
            push_flag(&mut args, "--model-path", &model.model_path);
            push_flag(&mut args, "--model-names", model.model_names.join(","));
            push_flag(&mut args, "--device", &model.device);
            push_flag(&mut args, "--num-gpus", model.num_gpus.to_string());
            if let Some(gpus) = &model.gpus {
                push_flag(&mut args, "--gpus", gpus);
            }
            if let Some(max_memory) = &model.max_gpu_memory {
                push_flag(&mut args, "--max-gpu-memory", max_memory);
            }
            if model.load_8bit {
                args.push("--load-8bit".to_string());
            }
            if model.cpu_offloading {
                args.push("--cpu-offloading".to_string());
            }
        }
        Component::ApiServer => {
            push_flag(&mut args, "--host", &config.api_server.host);
            push_flag(&mut args, "--port", config.api_server.port.to_string());
            push_flag(&mut args, "--controller-address", config.controller.url());
        }
        Component::WebUi => {
            push_flag(&mut args, "--host", &config.web.host);
            push_flag(&mut args, "--port", config.web.port.to_string());
            push_flag(&mut args, "--controller-url", config.controller.url());
            if config.web.share {
                args.push("--share".to_string());
            }
        }
    }

    args
}

fn push_flag(args: &mut Vec<String>, flag: &str, value: impl Into<String>) {
    args.push(flag.to_string());
    args.push(value.into());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_args() {
        let mut config = Config::default();
        config.model.gpus = Some("0,1".to_string());
        config.model.load_8bit = true;

        let args = component_args(Component::Worker, &config);
        let joined = args.join(" ");
        assert!(joined.contains("--model-path lmsys/vicuna-7b-v1.5"));
        assert!(joined.contains("--controller-address http://localhost:21001"));
        assert!(joined.contains("--model-names vicuna,mental_health_assistant"));
        assert!(joined.contains("--gpus 0,1"));
        assert!(args.contains(&"--load-8bit".to_string()));
        assert!(!args.contains(&"--cpu-offloading".to_string()));
        assert!(!joined.contains("--max-gpu-memory"));
    }

    #[test]
    fn test_web_ui_share_flag() {
        let mut config = Config::default();
        assert!(!component_args(Component::WebUi, &config).contains(&"--share".to_string()));

        config.web.share = true;
        let args = component_args(Component::WebUi, &config);
        assert!(args.contains(&"--share".to_string()));
        assert!(args.join(" ").contains("--controller-url http://localhost:21001"));
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_spawn_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.launch.python = "/nonexistent/python-interpreter".to_string();
        config.launch.log_dir = dir.path().to_path_buf();

        let launcher = ProcessLauncher::new(Arc::new(config));
        let result = launcher
            .launch(Component::Router, &ProviderCandidate::new("fastchat.serve.controller"))
            .await;

        assert!(matches!(result, Err(LaunchError::Spawn { component: Component::Router, .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_early_exit_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        // `sh -m <module> ...` fails immediately
        config.launch.python = "sh".to_string();
        config.launch.log_dir = dir.path().to_path_buf();
        config.controller.port = 1;

        let launcher = ProcessLauncher::new(Arc::new(config));
        let handle = launcher
            .launch(Component::Router, &ProviderCandidate::new("fastchat.serve.controller"))
            .await
            .unwrap();

        let readiness = tokio::time::timeout(Duration::from_secs(10), handle.ready)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(readiness, Readiness::Exited { .. }));
        assert!(dir.path().join("router.log").exists());
    }
}
