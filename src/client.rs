//! Chat-completion client.
//!
//! [`CompletionClient`] is the seam between the conversion pipeline and the
//! remote model: one blocking call, prompt in, text out. [`OpenAiClient`]
//! talks to any OpenAI-compatible `/chat/completions` endpoint.

use crate::config::Config;
use crate::error::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// Generates text for a prompt.
///
/// Implementations block until the full response is available. Every failure
/// is reported as [`Error::Generation`]; callers do not retry.
pub trait CompletionClient: Send + Sync {
    /// Submits `prompt` and returns the generated text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Generation`] on authentication, rate limit, network
    /// or response-format failures.
    fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Blocking client for an OpenAI-compatible chat-completions API.
#[derive(Debug)]
pub struct OpenAiClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    api_key: SecretString,
    model: String,
    temperature: f32,
}

impl OpenAiClient {
    /// Creates a client from configuration.
    ///
    /// Must be called outside of an async runtime; the blocking transport
    /// owns its own.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP transport cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));

        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.completions_url(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    /// Returns the model identifier sent with each request.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl CompletionClient for OpenAiClient {
    fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        debug!(
            "Requesting completion from {} (model={}, prompt={} bytes)",
            self.endpoint,
            self.model,
            prompt.len()
        );
        let start = Instant::now();

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()?;

        let status = response.status();
        let body = response.text()?;

        debug!(
            "Completion endpoint answered {} in {:.2}s",
            status,
            start.elapsed().as_secs_f64()
        );

        if !status.is_success() {
            let detail = api_error_message(&body);
            warn!("Completion request rejected with {status}: {detail}");
            return Err(Error::generation(format!("{status}: {detail}")));
        }

        extract_content(&body)
    }
}

/// Pulls the error message out of an API error body, falling back to the raw text.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect())
}

/// Returns the first choice's message text.
fn extract_content(body: &str) -> Result<String> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| Error::generation(format!("Malformed completion response: {e}")))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| Error::generation("Completion response contained no message content"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "gpt-4",
            messages: [ChatMessage {
                role: "user",
                content: "convert me",
            }],
            temperature: 0.2,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4");
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "convert me");
        assert!((json["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_extract_first_choice() {
        let body = r#"{
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "first"}},
                {"index": 1, "message": {"role": "assistant", "content": "second"}}
            ]
        }"#;

        assert_eq!(extract_content(body).unwrap(), "first");
    }

    #[test]
    fn test_extract_without_choices() {
        let err = extract_content(r#"{"choices": []}"#).unwrap_err();
        assert!(err.is_generation());
    }

    #[test]
    fn test_extract_null_content() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        assert!(extract_content(body).unwrap_err().is_generation());
    }

    #[test]
    fn test_extract_malformed_body() {
        let err = extract_content("<html>Bad Gateway</html>").unwrap_err();
        assert!(err.to_string().contains("Malformed"));
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error": {"message": "Rate limit reached", "type": "requests"}}"#;
        assert_eq!(api_error_message(body), "Rate limit reached");
        assert_eq!(api_error_message("plain failure"), "plain failure");
    }

    #[test]
    fn test_unreachable_endpoint_is_generation_error() {
        let config = Config::builder()
            .api_key("sk-test")
            .api_base_url("http://127.0.0.1:9/v1")
            .request_timeout(std::time::Duration::from_secs(2))
            .build()
            .unwrap();

        let client = OpenAiClient::new(&config).unwrap();
        assert_eq!(client.model(), "gpt-4");

        let err = client.complete("prompt").unwrap_err();
        assert!(err.is_generation());
    }
}
