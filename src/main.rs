// Calma - Mental-health support assistant launcher
// Main entry point

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::prelude::*;

use calma::config::{load_config, Config};
use calma::launcher::{
    check_environment, CapabilityLocator, LaunchError, Orchestrator, ProcessLauncher,
    PythonModuleProbe,
};
use calma::prompts::{Category, PromptFormatter};
use calma::provision::{ModelStore, ProvisionError};
use calma::safety::CrisisDetector;
use calma::server::ChatGateway;
use calma::errors;

#[derive(Parser, Debug)]
#[command(name = "calma")]
#[command(about = "Asistente virtual de salud mental sobre FastChat", version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Parser, Debug)]
enum Command {
    /// Check the environment, provision the model and start every component
    Run {
        /// Do not download the model if it is missing
        #[arg(long)]
        skip_download: bool,
        /// Do not start the chat gateway
        #[arg(long)]
        no_gateway: bool,
    },
    /// Download the configured (or given) model
    Download {
        /// Hub reference or local path (default: MODEL_PATH)
        #[arg(long)]
        model: Option<String>,
        /// Output directory (default: models/<name>)
        #[arg(long)]
        output: Option<PathBuf>,
        /// HuggingFace token (default: HUGGINGFACE_TOKEN)
        #[arg(long)]
        token: Option<String>,
        /// Only report whether the model is already downloaded
        #[arg(long)]
        check: bool,
    },
    /// Report the Python interpreter and installed serving packages
    CheckEnv,
    /// Run the safety gate and prompt formatter on one message
    Check {
        message: String,
        #[arg(long, default_value = "General")]
        category: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing();

    let config = load_config()?;

    match args.command.unwrap_or(Command::Run {
        skip_download: false,
        no_gateway: false,
    }) {
        Command::Run {
            skip_download,
            no_gateway,
        } => run_assistant(config, skip_download, no_gateway).await,
        Command::Download {
            model,
            output,
            token,
            check,
        } => run_download(&config, model, output, token, check).await,
        Command::CheckEnv => run_check_env(&config).await,
        Command::Check { message, category } => run_check(&config, &message, &category),
    }
}

fn init_tracing() {
    let show_debug = std::env::var("CALMA_DEBUG")
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false);

    // RUST_LOG wins over CALMA_DEBUG
    let default_level = if show_debug { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Bridge log crate → tracing (hf-hub, tokenizers)
    tracing_log::LogTracer::init().ok();
}

async fn run_assistant(config: Config, skip_download: bool, no_gateway: bool) -> Result<()> {
    println!("🤖 Iniciando Asistente de Salud Mental con FastChat...");

    let report = check_environment(&config.launch.python).await?;
    report.print();
    report.ensure_launchable()?;

    println!("\n📦 Modelo configurado: {}", config.model.model_path);
    let config = Arc::new(provision_model(config, skip_download).await);

    println!("\n🚀 Iniciando componentes...");
    let locator = CapabilityLocator::new(PythonModuleProbe::new(config.launch.python.clone()));
    let launcher = ProcessLauncher::new(Arc::clone(&config));
    let mut orchestrator = Orchestrator::new(
        locator,
        launcher,
        config.launch.startup_timeouts.clone(),
    );

    if let Err(e) = orchestrator.start().await {
        return Err(explain_launch_error(e, &config.launch.log_dir));
    }

    for handle in orchestrator.launched() {
        println!("✅ {} (PID {:?})", handle.component, handle.pid);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let gateway_task = if no_gateway || !config.gateway.enabled {
        None
    } else {
        let gateway = ChatGateway::from_config(&config)?;
        let mut rx = shutdown_rx.clone();
        println!("🛡️  Pasarela de chat en http://{}", config.gateway.bind_address);
        Some(tokio::spawn(gateway.serve(async move {
            rx.changed().await.ok();
        })))
    };

    println!("✨ ¡Asistente iniciado correctamente!");
    println!("💬 Interfaz web disponible en http://localhost:{}", config.web.port);
    println!("💡 Presiona Ctrl+C para detener el asistente");

    orchestrator
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            }
        })
        .await;
    println!("\n👋 Deteniendo el asistente...");

    shutdown_tx.send(true).ok();
    if let Some(task) = gateway_task {
        match task.await {
            Ok(Ok(())) => tracing::info!("Chat gateway stopped"),
            Ok(Err(e)) => tracing::error!(error = %e, "Chat gateway exited with error"),
            Err(e) => tracing::error!(error = %e, "Chat gateway task panicked"),
        }
    }

    Ok(())
}

/// Resolve the model to a local path, downloading it unless told not to.
/// Failures degrade to the configured reference.
async fn provision_model(config: Config, skip_download: bool) -> Config {
    let store = ModelStore::default();
    let model_ref = config.model.model_path.clone();

    if let Some(path) = store.resolve_local(&model_ref) {
        println!("✅ Modelo encontrado: {}", path.display());
        return config.with_model_path(path.to_string_lossy());
    }

    if skip_download {
        println!("⚠️ Continuando sin descargar el modelo. El asistente podría no funcionar correctamente.");
        return config;
    }

    println!("⚠️ El modelo {} no está descargado. Descargando automáticamente...", model_ref);
    let token = config.model.hf_token.clone();
    let result = tokio::task::spawn_blocking(move || {
        store.ensure_model_available(&model_ref, None, token.as_deref())
    })
    .await;

    match result {
        Ok(Ok(path)) => {
            println!("✅ Modelo descargado en: {}", path.display());
            config.with_model_path(path.to_string_lossy())
        }
        Ok(Err(ProvisionError::Download { model, reason })) => {
            eprintln!("{}", errors::download_failed_error(&model, &reason));
            println!("❌ No se pudo descargar el modelo. El asistente podría no funcionar correctamente.");
            config
        }
        Ok(Err(e)) => {
            eprintln!("❌ {}", e);
            config
        }
        Err(e) => {
            tracing::error!(error = %e, "Download task panicked");
            config
        }
    }
}

fn explain_launch_error(error: LaunchError, log_dir: &Path) -> anyhow::Error {
    match &error {
        LaunchError::MissingCapability { component, tried } => {
            anyhow::anyhow!(errors::missing_capability_error(&component.to_string(), tried))
        }
        LaunchError::ExitedBeforeReady { component, .. }
        | LaunchError::ReadinessTimeout { component, .. } => {
            anyhow::anyhow!(errors::wrap_error_with_suggestion(
                &error,
                &format!(
                    "Check {} for the component output",
                    log_dir.join(format!("{}.log", component.slug())).display()
                )
            ))
        }
        LaunchError::Spawn { .. } => anyhow::Error::new(error),
    }
}

async fn run_download(
    config: &Config,
    model: Option<String>,
    output: Option<PathBuf>,
    token: Option<String>,
    check: bool,
) -> Result<()> {
    let model_ref = model.unwrap_or_else(|| config.model.model_path.clone());
    let store = ModelStore::default();

    if check {
        if store.is_model_available(&model_ref) {
            println!("✅ El modelo ya está descargado");
        } else {
            println!("❌ El modelo no está descargado");
        }
        return Ok(());
    }

    let token = token.or_else(|| config.model.hf_token.clone());
    let path = tokio::task::spawn_blocking(move || {
        store.ensure_model_available(&model_ref, output.as_deref(), token.as_deref())
    })
    .await
    .context("Download task panicked")?
    .map_err(|e| match e {
        ProvisionError::Download { model, reason } => {
            anyhow::anyhow!(errors::download_failed_error(&model, &reason))
        }
        other => anyhow::Error::new(other),
    })?;

    println!("✅ Modelo disponible en: {}", path.display());
    Ok(())
}

async fn run_check_env(config: &Config) -> Result<()> {
    let report = check_environment(&config.launch.python).await?;
    report.print();
    report.ensure_launchable()
}

fn run_check(config: &Config, message: &str, category: &str) -> Result<()> {
    let detector = CrisisDetector::from_config(&config.safety);
    let detection = detector.detect_crisis(message);

    println!("{}", serde_json::to_string_pretty(&detection)?);

    if detection.detected {
        println!("{}", detector.crisis_response(&detection.matched_keywords));
    } else {
        let formatter = PromptFormatter::from_config(config);
        println!("{}", formatter.format_prompt(message, &Category::parse(category)));
    }
    Ok(())
}
