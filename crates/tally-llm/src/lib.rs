//! Tally Model Provider Layer
//!
//! Pluggable transcription/extraction model providers.
//!
//! # Architecture
//!
//! This crate defines the [`ModelProvider`] trait - the seam between the
//! engine and the vision-capable model that transcribes ledger pages and
//! answers the structured classification/extraction prompts - together with
//! its implementations.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `OpenAiProvider`: OpenAI-compatible chat-completions API with vision
//!   input and bounded retry
//!
//! # Examples
//!
//! ```
//! use tally_llm::{MockProvider, ModelProvider};
//!
//! # tokio_test::block_on(async {
//! let provider = MockProvider::new().with_default_transcript("Page text");
//! let text = provider.transcribe("page_1.png".as_ref(), None).await.unwrap();
//! assert_eq!(text, "Page text");
//! # });
//! ```

#![warn(missing_docs)]

pub mod openai;

pub use openai::OpenAiProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during model operations
#[derive(Error, Debug)]
pub enum ModelError {
    /// Network or API communication error (transient, retried)
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from the model
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded (transient, retried)
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Request rejected by the API (terminal, not retried)
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Failed to read a page image from disk
    #[error("Image read error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("Model error: {0}")]
    Other(String),
}

/// Bounded retry with exponential backoff for transient model failures
///
/// Injected into providers rather than hard-coded: attempt `n` (0-based)
/// waits `base_delay_ms * multiplier^n` before retrying, and after
/// `max_attempts` total attempts the error is final.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts before giving up (including the first)
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds
    pub base_delay_ms: u64,
    /// Backoff multiplier applied per subsequent retry
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn no_retries() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            multiplier: 1.0,
        }
    }

    /// Backoff delay before retry number `retry` (0-based)
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(0.0).powi(retry as i32);
        let millis = (self.base_delay_ms as f64 * factor).round() as u64;
        Duration::from_millis(millis)
    }

    /// Validate the policy
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err("multiplier must be a finite number >= 1.0".to_string());
        }
        Ok(())
    }
}

/// Trait for the vision-capable transcription/extraction model
///
/// Two operations back the whole pipeline: `transcribe` turns a page image
/// into plain text, and `complete` answers a structured prompt (page
/// classification, row extraction) with a JSON body.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Transcribe a page image into plain text
    ///
    /// `prior` carries the previous transcription on a forced refresh so
    /// the model can correct rather than start blind.
    async fn transcribe(&self, image: &Path, prior: Option<&str>) -> Result<String, ModelError>;

    /// Answer a structured prompt; the response body is expected to be JSON
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ModelError>;
}

/// Mock model provider for deterministic testing
///
/// Returns pre-configured responses without any network calls and counts
/// invocations, which is what the cache-idempotence tests assert on.
///
/// # Examples
///
/// ```
/// use tally_llm::{MockProvider, ModelProvider};
///
/// # tokio_test::block_on(async {
/// let provider = MockProvider::new()
///     .with_transcript("p1.png", "To cash  £3 12s 6d")
///     .with_default_completion("{\"rows\": []}");
///
/// let text = provider.transcribe("p1.png".as_ref(), None).await.unwrap();
/// assert_eq!(text, "To cash  £3 12s 6d");
/// assert_eq!(provider.transcribe_calls(), 1);
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    transcripts: Arc<Mutex<HashMap<PathBuf, String>>>,
    default_transcript: Option<String>,
    failing_images: Arc<Mutex<Vec<PathBuf>>>,
    completions: Arc<Mutex<Vec<(String, String)>>>,
    default_completion: Option<String>,
    failing_prompts: Arc<Mutex<Vec<String>>>,
    transcribe_log: Arc<Mutex<Vec<PathBuf>>>,
    complete_count: Arc<Mutex<usize>>,
}

impl MockProvider {
    /// Create an empty mock
    pub fn new() -> Self {
        Self::default()
    }

    /// Canned transcription for a specific image path
    pub fn with_transcript(self, image: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.transcripts
            .lock()
            .unwrap()
            .insert(image.into(), text.into());
        self
    }

    /// Transcription returned for any image without a specific entry
    pub fn with_default_transcript(mut self, text: impl Into<String>) -> Self {
        self.default_transcript = Some(text.into());
        self
    }

    /// Make transcription fail for a specific image (simulated OCR failure)
    pub fn with_failing_image(self, image: impl Into<PathBuf>) -> Self {
        self.failing_images.lock().unwrap().push(image.into());
        self
    }

    /// Canned completion returned when the prompt contains `needle`
    ///
    /// Needles are checked in insertion order; the first match wins.
    pub fn with_completion(self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.completions
            .lock()
            .unwrap()
            .push((needle.into(), response.into()));
        self
    }

    /// Completion returned when no needle matches
    pub fn with_default_completion(mut self, response: impl Into<String>) -> Self {
        self.default_completion = Some(response.into());
        self
    }

    /// Make completion fail when the prompt contains `needle`
    pub fn with_failing_prompt(self, needle: impl Into<String>) -> Self {
        self.failing_prompts.lock().unwrap().push(needle.into());
        self
    }

    /// Total transcription calls made
    pub fn transcribe_calls(&self) -> usize {
        self.transcribe_log.lock().unwrap().len()
    }

    /// Transcription calls made for one image
    pub fn transcribe_calls_for(&self, image: &Path) -> usize {
        self.transcribe_log
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.as_path() == image)
            .count()
    }

    /// Total completion calls made
    pub fn complete_calls(&self) -> usize {
        *self.complete_count.lock().unwrap()
    }

    /// Reset all call counters
    pub fn reset_counts(&self) {
        self.transcribe_log.lock().unwrap().clear();
        *self.complete_count.lock().unwrap() = 0;
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    async fn transcribe(&self, image: &Path, _prior: Option<&str>) -> Result<String, ModelError> {
        self.transcribe_log.lock().unwrap().push(image.to_path_buf());

        if self
            .failing_images
            .lock()
            .unwrap()
            .iter()
            .any(|p| p.as_path() == image)
        {
            return Err(ModelError::Communication("mock transcription failure".to_string()));
        }

        if let Some(text) = self.transcripts.lock().unwrap().get(image) {
            return Ok(text.clone());
        }

        self.default_transcript
            .clone()
            .ok_or_else(|| ModelError::Other(format!("no mock transcript for {}", image.display())))
    }

    async fn complete(&self, _system: &str, prompt: &str) -> Result<String, ModelError> {
        *self.complete_count.lock().unwrap() += 1;

        if self
            .failing_prompts
            .lock()
            .unwrap()
            .iter()
            .any(|needle| prompt.contains(needle.as_str()))
        {
            return Err(ModelError::Communication("mock completion failure".to_string()));
        }

        let completions = self.completions.lock().unwrap();
        for (needle, response) in completions.iter() {
            if prompt.contains(needle.as_str()) {
                return Ok(response.clone());
            }
        }

        self.default_completion
            .clone()
            .ok_or_else(|| ModelError::Other("no mock completion configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_delays() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_delay_ms: 500,
            multiplier: 2.0,
        };
        assert_eq!(policy.delay(0), Duration::from_millis(500));
        assert_eq!(policy.delay(1), Duration::from_millis(1_000));
        assert_eq!(policy.delay(2), Duration::from_millis(2_000));
    }

    #[test]
    fn test_retry_policy_validation() {
        assert!(RetryPolicy::default().validate().is_ok());
        assert!(RetryPolicy::no_retries().validate().is_ok());

        let zero_attempts = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert!(zero_attempts.validate().is_err());

        let shrinking = RetryPolicy {
            multiplier: 0.5,
            ..RetryPolicy::default()
        };
        assert!(shrinking.validate().is_err());
    }

    #[tokio::test]
    async fn test_mock_transcripts() {
        let provider = MockProvider::new()
            .with_transcript("a.png", "page a")
            .with_default_transcript("fallback");

        assert_eq!(provider.transcribe("a.png".as_ref(), None).await.unwrap(), "page a");
        assert_eq!(provider.transcribe("b.png".as_ref(), None).await.unwrap(), "fallback");
        assert_eq!(provider.transcribe_calls(), 2);
        assert_eq!(provider.transcribe_calls_for("a.png".as_ref()), 1);
    }

    #[tokio::test]
    async fn test_mock_failing_image() {
        let provider = MockProvider::new()
            .with_default_transcript("ok")
            .with_failing_image("bad.png");

        assert!(provider.transcribe("bad.png".as_ref(), None).await.is_err());
        assert!(provider.transcribe("good.png".as_ref(), None).await.is_ok());
        // failures still count as calls
        assert_eq!(provider.transcribe_calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_completions_first_needle_wins() {
        let provider = MockProvider::new()
            .with_completion("page 1", "{\"rows\": [1]}")
            .with_completion("page", "{\"rows\": []}")
            .with_default_completion("{}");

        let r = provider.complete("sys", "classify page 1 now").await.unwrap();
        assert_eq!(r, "{\"rows\": [1]}");

        let r = provider.complete("sys", "classify page 2 now").await.unwrap();
        assert_eq!(r, "{\"rows\": []}");

        let r = provider.complete("sys", "something else").await.unwrap();
        assert_eq!(r, "{}");
        assert_eq!(provider.complete_calls(), 3);
    }

    #[tokio::test]
    async fn test_mock_clone_shares_counts() {
        let provider = MockProvider::new().with_default_transcript("t");
        let clone = provider.clone();

        provider.transcribe("x.png".as_ref(), None).await.unwrap();

        // both views share the same log via Arc
        assert_eq!(clone.transcribe_calls(), 1);
        clone.reset_counts();
        assert_eq!(provider.transcribe_calls(), 0);
    }
}
