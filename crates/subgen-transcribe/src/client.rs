//! AssemblyAI HTTP client.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use subgen_models::TimedWord;
use tracing::{debug, info, warn};

use crate::error::{TranscribeError, TranscribeResult};
use crate::transcriber::Transcriber;
use crate::types::{
    TranscriptRequest, TranscriptResponse, TranscriptStatus, UploadResponse,
};

/// Upper bound for a single retry delay.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Configuration for the AssemblyAI client.
#[derive(Debug, Clone)]
pub struct AssemblyAiConfig {
    /// API key sent in the `authorization` header
    pub api_key: String,
    /// Base URL of the API
    pub base_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Maximum time to wait for a transcript to complete
    pub timeout: Duration,
    /// Delay between status polls
    pub poll_interval: Duration,
    /// Max retries for transient HTTP failures
    pub max_retries: u32,
    /// First retry delay, doubled on every attempt
    pub retry_base_delay: Duration,
}

impl AssemblyAiConfig {
    /// Create a config with default timings.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.assemblyai.com".to_string(),
            request_timeout: Duration::from_secs(120),
            timeout: Duration::from_secs(600), // 10 minutes per chunk
            poll_interval: Duration::from_millis(3000),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(500),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> TranscribeResult<Self> {
        let api_key = std::env::var("ASSEMBLYAI_API_KEY")
            .map_err(|_| TranscribeError::config_error("ASSEMBLYAI_API_KEY not set"))?;
        let defaults = Self::new(api_key);

        Ok(Self {
            base_url: std::env::var("ASSEMBLYAI_BASE_URL").unwrap_or(defaults.base_url.clone()),
            timeout: std::env::var("ASSEMBLYAI_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            poll_interval: std::env::var("ASSEMBLYAI_POLL_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            max_retries: std::env::var("ASSEMBLYAI_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            ..defaults
        })
    }
}

/// Client for the AssemblyAI transcription API.
pub struct AssemblyAiClient {
    http: Client,
    config: AssemblyAiConfig,
}

impl AssemblyAiClient {
    /// Create a new client.
    pub fn new(config: AssemblyAiConfig) -> TranscribeResult<Self> {
        if config.api_key.is_empty() {
            return Err(TranscribeError::config_error("API key is empty"));
        }

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&config.api_key)
            .map_err(|_| TranscribeError::config_error("API key is not a valid header value"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(TranscribeError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> TranscribeResult<Self> {
        Self::new(AssemblyAiConfig::from_env()?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Upload a local audio file, returning the URL the service can read it from.
    pub async fn upload(&self, audio_path: &Path) -> TranscribeResult<String> {
        let data = tokio::fs::read(audio_path).await?;
        let url = self.url("/v2/upload");

        debug!(bytes = data.len(), "Uploading {} for transcription", audio_path.display());

        let response = self
            .with_retry(|| {
                send_checked(
                    self.http
                        .post(&url)
                        .header(CONTENT_TYPE, "application/octet-stream")
                        .body(data.clone()),
                )
            })
            .await?;

        let upload: UploadResponse = response.json().await?;
        Ok(upload.upload_url)
    }

    /// Start a transcript for previously uploaded audio.
    pub async fn create_transcript(&self, audio_url: &str) -> TranscribeResult<TranscriptResponse> {
        let url = self.url("/v2/transcript");
        let request = TranscriptRequest {
            audio_url: audio_url.to_string(),
            language_detection: true,
        };

        let response = self
            .with_retry(|| send_checked(self.http.post(&url).json(&request)))
            .await?;

        Ok(response.json().await?)
    }

    /// Fetch the current state of a transcript.
    pub async fn get_transcript(&self, id: &str) -> TranscribeResult<TranscriptResponse> {
        let url = self.url(&format!("/v2/transcript/{}", id));

        let response = self
            .with_retry(|| send_checked(self.http.get(&url)))
            .await?;

        Ok(response.json().await?)
    }

    /// Poll a transcript until it completes, fails, or the timeout elapses.
    async fn wait_for_transcript(&self, id: &str) -> TranscribeResult<TranscriptResponse> {
        let deadline = Instant::now() + self.config.timeout;

        loop {
            let transcript = self.get_transcript(id).await?;

            match transcript.status {
                TranscriptStatus::Completed => return Ok(transcript),
                TranscriptStatus::Error => {
                    return Err(TranscribeError::TranscriptFailed(
                        transcript
                            .error
                            .unwrap_or_else(|| format!("transcript {} failed", id)),
                    ));
                }
                TranscriptStatus::Queued | TranscriptStatus::Processing => {
                    if Instant::now() >= deadline {
                        return Err(TranscribeError::Timeout(self.config.timeout.as_secs()));
                    }
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> TranscribeResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = TranscribeResult<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = backoff_delay(self.config.retry_base_delay, attempt);
                    warn!(
                        "Transcription request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(TranscribeError::RequestFailed("Unknown error".to_string())))
    }
}

#[async_trait]
impl Transcriber for AssemblyAiClient {
    async fn transcribe(&self, audio_path: &Path) -> TranscribeResult<Vec<TimedWord>> {
        let audio_url = self.upload(audio_path).await?;
        let created = self.create_transcript(&audio_url).await?;

        info!(transcript_id = %created.id, "Transcript created, waiting for completion");

        let transcript = if created.status.is_terminal() {
            match created.status {
                TranscriptStatus::Completed => created,
                _ => {
                    return Err(TranscribeError::TranscriptFailed(
                        created.error.unwrap_or_else(|| "transcript failed".to_string()),
                    ))
                }
            }
        } else {
            self.wait_for_transcript(&created.id).await?
        };

        let words: Vec<TimedWord> = transcript
            .words
            .unwrap_or_default()
            .into_iter()
            .map(TimedWord::from)
            .collect();

        info!(
            transcript_id = %transcript.id,
            language = transcript.language_code.as_deref().unwrap_or("unknown"),
            words = words.len(),
            "Transcript completed"
        );

        Ok(words)
    }
}

/// Send a request and map non-success responses to errors. 429 and 5xx are retryable.
async fn send_checked(request: RequestBuilder) -> TranscribeResult<Response> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let msg = format!("AssemblyAI returned {}: {}", status, body);

    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        Err(TranscribeError::ServiceUnavailable(msg))
    } else {
        Err(TranscribeError::RequestFailed(msg))
    }
}

/// Exponential backoff for `attempt` (0-based), saturating and capped at [`MAX_RETRY_DELAY`].
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt)).min(MAX_RETRY_DELAY)
}
