// Completions client for the OpenAI-compatible API server

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{Config, GenerationConfig};

const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: String,
}

#[derive(Clone)]
pub struct CompletionClient {
    client: Client,
    base_url: String,
    model: String,
    generation: GenerationConfig,
}

impl CompletionClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, generation: GenerationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
            generation,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.api_server.url(),
            config.primary_model_name(),
            config.generation.clone(),
        )
    }

    /// Generate a reply for an already formatted prompt
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/completions", self.base_url);
        let request = CompletionRequest {
            model: &self.model,
            prompt,
            temperature: self.generation.temperature,
            top_p: self.generation.top_p,
            max_tokens: self.generation.max_new_tokens,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?
            .error_for_status()
            .context("Completion request rejected")?;

        let body: CompletionResponse = response
            .json()
            .await
            .context("Failed to parse completion response")?;

        let text = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.text.trim().to_string())
            .filter(|t| !t.is_empty())
            .context("Completion response had no text")?;

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_request_only_carries_fields_the_api_accepts() {
        let request = CompletionRequest {
            model: "vicuna",
            prompt: "USER: hola\nASSISTANT:",
            temperature: 0.7,
            top_p: 0.9,
            max_tokens: 512,
        };

        let value = serde_json::to_value(&request).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["max_tokens", "model", "prompt", "temperature", "top_p"]);
    }

    #[tokio::test]
    async fn test_complete_sends_generation_settings() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/completions")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "vicuna",
                "max_tokens": 64
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"text":" Hola "}]}"#)
            .create_async()
            .await;

        let generation = GenerationConfig {
            max_new_tokens: 64,
            ..GenerationConfig::default()
        };
        let client = CompletionClient::new(server.url(), "vicuna", generation).unwrap();

        assert_eq!(client.complete("USER: hola\nASSISTANT:").await.unwrap(), "Hola");
        mock.assert_async().await;
    }
}
