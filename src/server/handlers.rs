// HTTP request handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::ChatGateway;
use crate::errors::UserFriendlyError;
use crate::prompts::{category_instructions, resources_for, topic_suggestion, Category, Resource};

/// Reply used whenever the model cannot answer
pub const FALLBACK_REPLY: &str = "Lo siento, el modelo no está disponible en este momento.";

/// Create the gateway router
pub fn create_router(gateway: Arc<ChatGateway>) -> Router {
    Router::new()
        .route("/v1/chat", post(handle_chat))
        .route("/v1/categories", get(list_categories))
        .route("/v1/resources/:category", get(list_resources))
        .route("/health", get(health_check))
        .with_state(gateway)
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub category: Category,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub category: Category,
    pub crisis: bool,
    pub matched_keywords: Vec<String>,
    /// True when the reply is the canned fallback instead of model output
    pub fallback: bool,
}

/// Handle POST /v1/chat
async fn handle_chat(
    State(gateway): State<Arc<ChatGateway>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if request.message.trim().is_empty() {
        return Err(AppError::bad_request("message must not be empty"));
    }

    let detection = gateway.detector().detect_crisis(&request.message);
    if detection.detected {
        let reply = gateway.detector().crisis_response(&detection.matched_keywords);
        return Ok(Json(ChatResponse {
            reply,
            category: request.category,
            crisis: true,
            matched_keywords: detection.matched_keywords,
            fallback: false,
        }));
    }

    let prompt = gateway
        .formatter()
        .format_prompt(&request.message, &request.category);

    let (reply, fallback) = match gateway
        .upstream()
        .complete(&prompt)
        .await
        .user_context_with_suggestion(
            "Model request failed",
            "Check logs/api.log and logs/worker.log",
        ) {
        Ok(text) => (text, false),
        Err(e) => {
            tracing::warn!(error = %format!("{:#}", e), "Falling back to canned reply");
            (FALLBACK_REPLY.to_string(), true)
        }
    };

    Ok(Json(ChatResponse {
        reply,
        category: request.category,
        crisis: false,
        matched_keywords: Vec::new(),
        fallback,
    }))
}

#[derive(Debug, Serialize)]
pub struct CategoryInfo {
    pub label: Category,
    pub instructions: &'static str,
    pub suggestion: String,
}

/// Handle GET /v1/categories
async fn list_categories() -> Json<Vec<CategoryInfo>> {
    let categories = Category::KNOWN
        .into_iter()
        .map(|category| CategoryInfo {
            instructions: category_instructions(&category),
            suggestion: topic_suggestion(&category),
            label: category,
        })
        .collect();
    Json(categories)
}

/// Handle GET /v1/resources/:category
async fn list_resources(Path(category): Path<String>) -> Json<&'static [Resource]> {
    Json(resources_for(&Category::parse(&category)))
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Error type for HTTP handlers
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: anyhow::anyhow!(message.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.error, "Request failed");

        let body = serde_json::json!({
            "error": {
                "message": self.error.to_string(),
                "type": if self.status.is_client_error() { "invalid_request_error" } else { "api_error" }
            }
        });

        (self.status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: err.into(),
        }
    }
}
