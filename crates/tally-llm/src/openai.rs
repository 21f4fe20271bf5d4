//! OpenAI-compatible provider implementation
//!
//! Speaks the chat-completions API of OpenAI-compatible services. Vision
//! transcription ships the page image inline as a base64 data URL;
//! structured calls request JSON mode so classification and extraction
//! prompts get machine-parseable bodies back.
//!
//! # Features
//!
//! - Async HTTP communication
//! - Configurable endpoint, model, and API key
//! - Injected retry policy with exponential backoff
//! - Terminal-vs-transient error split (auth failures are never retried)
//!
//! # Examples
//!
//! ```no_run
//! use tally_llm::OpenAiProvider;
//!
//! let provider = OpenAiProvider::new(
//!     "https://api.openai.com/v1",
//!     std::env::var("OPENAI_API_KEY").unwrap(),
//!     "gpt-4o-mini",
//! );
//! ```

use crate::{ModelError, ModelProvider, RetryPolicy};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Default API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// Default per-request timeout (120 seconds; vision calls are slow)
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

const TRANSCRIBE_SYSTEM: &str = "You are a careful OCR assistant. You read historical ledger pages \
     and transcribe the text faithfully, line by line, without adding extra interpretation.";

const TRANSCRIBE_INSTRUCTIONS: &str = "Transcribe all visible text from this ledger page.\n\
     - Preserve the line order from top to bottom.\n\
     - Separate lines with newline characters.\n\
     - Include column headers, names, places, and amounts.\n\
     - Do NOT summarise or interpret; just transcribe.";

/// OpenAI-compatible chat-completions provider
pub struct OpenAiProvider {
    endpoint: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiProvider {
    /// Create a new provider
    ///
    /// # Parameters
    ///
    /// - `endpoint`: API base URL (e.g. "https://api.openai.com/v1")
    /// - `api_key`: bearer token
    /// - `model`: a vision-capable chat model (e.g. "gpt-4o-mini")
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
            retry: RetryPolicy::default(),
        }
    }

    /// Create a provider against the default endpoint
    pub fn default_endpoint(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(DEFAULT_ENDPOINT, api_key, model)
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The configured model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one chat request, retrying transient failures per the policy
    async fn send_chat(&self, request: &ChatRequest) -> Result<String, ModelError> {
        let url = format!("{}/chat/completions", self.endpoint);

        let mut last_error = None;

        for attempt in 0..self.retry.max_attempts {
            if attempt > 0 {
                let delay = self.retry.delay(attempt - 1);
                debug!("retrying model call in {:?} (attempt {})", delay, attempt + 1);
                tokio::time::sleep(delay).await;
            }

            match self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(request)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let body: ChatResponse = response.json().await.map_err(|e| {
                            ModelError::InvalidResponse(format!("Failed to parse response: {}", e))
                        })?;
                        let content = body
                            .choices
                            .into_iter()
                            .next()
                            .and_then(|c| c.message.content)
                            .ok_or_else(|| {
                                ModelError::InvalidResponse("Model returned empty content".to_string())
                            })?;
                        return Ok(content.trim().to_string());
                    } else if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(ModelError::ModelNotAvailable(self.model.clone()));
                    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        warn!("model call rate limited (attempt {})", attempt + 1);
                        last_error = Some(ModelError::RateLimitExceeded);
                    } else if status.is_client_error() {
                        // auth/bad-request failures will not improve on retry
                        let body = response.text().await.unwrap_or_default();
                        return Err(ModelError::Rejected(format!("HTTP {}: {}", status, body)));
                    } else {
                        let body = response.text().await.unwrap_or_default();
                        last_error =
                            Some(ModelError::Communication(format!("HTTP {}: {}", status, body)));
                    }
                }
                Err(e) => {
                    last_error = Some(ModelError::Communication(format!("Request failed: {}", e)));
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| ModelError::Communication("Max retries exceeded".to_string())))
    }

    fn image_data_url(image: &Path, bytes: &[u8]) -> String {
        let mime = match image.extension().and_then(|e| e.to_str()) {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("webp") => "image/webp",
            _ => "image/png",
        };
        format!("data:{};base64,{}", mime, BASE64_STANDARD.encode(bytes))
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    async fn transcribe(&self, image: &Path, prior: Option<&str>) -> Result<String, ModelError> {
        let bytes = tokio::fs::read(image).await?;
        let data_url = Self::image_data_url(image, &bytes);

        let mut instructions = TRANSCRIBE_INSTRUCTIONS.to_string();
        if let Some(prior) = prior {
            instructions.push_str(
                "\n\nA previous transcription of this page follows; correct it where it \
                 disagrees with the image rather than transcribing from scratch:\n",
            );
            instructions.push_str(prior);
        }

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(TRANSCRIBE_SYSTEM.to_string()),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Parts(vec![
                        ContentPart::ImageUrl {
                            image_url: ImageUrl { url: data_url },
                        },
                        ContentPart::Text { text: instructions },
                    ]),
                },
            ],
            temperature: 0.0,
            response_format: None,
        };

        self.send_chat(&request).await
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ModelError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(system.to_string()),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Text(prompt.to_string()),
                },
            ],
            temperature: 0.0,
            response_format: Some(ResponseFormat {
                format_type: "json_object",
            }),
        };

        self.send_chat(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let provider = OpenAiProvider::new("https://api.openai.com/v1", "sk-test", "gpt-4o-mini");
        assert_eq!(provider.endpoint, "https://api.openai.com/v1");
        assert_eq!(provider.model(), "gpt-4o-mini");
        assert_eq!(provider.retry, RetryPolicy::default());
    }

    #[test]
    fn test_default_endpoint() {
        let provider = OpenAiProvider::default_endpoint("sk-test", "gpt-4o-mini");
        assert_eq!(provider.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_with_retry_policy() {
        let provider = OpenAiProvider::default_endpoint("sk-test", "gpt-4o-mini")
            .with_retry_policy(RetryPolicy::no_retries());
        assert_eq!(provider.retry.max_attempts, 1);
    }

    #[test]
    fn test_image_data_url_mime() {
        let url = OpenAiProvider::image_data_url("p.jpg".as_ref(), &[0xFF]);
        assert!(url.starts_with("data:image/jpeg;base64,"));
        let url = OpenAiProvider::image_data_url("p.png".as_ref(), &[0x89]);
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_errors() {
        // invalid port, single attempt: fails fast with a transport error
        let provider = OpenAiProvider::new("http://localhost:1", "sk-test", "gpt-4o-mini")
            .with_retry_policy(RetryPolicy::no_retries());

        let result = provider.complete("sys", "prompt").await;
        match result {
            Err(ModelError::Communication(_)) => {}
            other => panic!("Expected Communication error, got {:?}", other.map(|_| ())),
        }
    }
}
