// Chat gateway
// HTTP front door that applies the safety gate and prompt formatting
// before a message reaches the model

mod handlers;
mod upstream;

pub use handlers::{create_router, health_check, ChatRequest, ChatResponse, FALLBACK_REPLY};
pub use upstream::CompletionClient;

use anyhow::{Context, Result};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::prompts::PromptFormatter;
use crate::safety::CrisisDetector;

/// Shared, read-only state of the gateway
pub struct ChatGateway {
    detector: CrisisDetector,
    formatter: PromptFormatter,
    upstream: CompletionClient,
    bind_address: String,
}

impl ChatGateway {
    pub fn new(
        detector: CrisisDetector,
        formatter: PromptFormatter,
        upstream: CompletionClient,
        bind_address: impl Into<String>,
    ) -> Self {
        Self {
            detector,
            formatter,
            upstream,
            bind_address: bind_address.into(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            CrisisDetector::from_config(&config.safety),
            PromptFormatter::from_config(config),
            CompletionClient::from_config(config)?,
            config.gateway.bind_address.clone(),
        ))
    }

    pub fn detector(&self) -> &CrisisDetector {
        &self.detector
    }

    pub fn formatter(&self) -> &PromptFormatter {
        &self.formatter
    }

    pub fn upstream(&self) -> &CompletionClient {
        &self.upstream
    }

    /// Serve until `shutdown` resolves
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = self
            .bind_address
            .parse()
            .with_context(|| format!("Invalid gateway bind address: {}", self.bind_address))?;

        let app = create_router(Arc::new(self))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive());

        tracing::info!("Starting chat gateway on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}
