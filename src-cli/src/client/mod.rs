//! Analysis service client
//!
//! A thin, stateless request layer over the pronunciation-analysis HTTP
//! API. The [`AnalysisApi`] trait is the seam for injecting a fake client
//! into the session controller under test; [`HttpAnalysisClient`] is the
//! production implementation.

mod http;

pub use http::HttpAnalysisClient;

use async_trait::async_trait;
use speaktrainer_types::{AnalysisResult, Prompt};
use thiserror::Error;

/// What a recording is scored against.
#[derive(Debug, Clone)]
pub enum AnalysisReference {
    /// A prompt stored on the service side.
    PromptId(String),
    /// Literal expected text (used for client-only custom prompts).
    ExpectedText(String),
}

/// An encoded audio payload ready for upload.
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

impl AudioUpload {
    pub fn from_captured(captured: &speaktrainer_audio::CapturedAudio) -> Self {
        Self {
            bytes: captured.bytes.clone(),
            file_name: captured.file_name.clone(),
            mime_type: captured.encoding.mime_type().to_string(),
        }
    }
}

/// Client-side failures, distinguished by origin.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The request never produced a service response (connect, timeout).
    #[error("network error: {0}")]
    Network(String),
    /// Non-success status from a prompt endpoint.
    #[error("request failed ({status}): {message}")]
    Fetch { status: u16, message: String },
    /// Analysis rejected by the service; the message is the service's own
    /// error string when it sent one.
    #[error("analysis failed: {0}")]
    Analysis(String),
}

/// Operations of the external analysis service.
///
/// Every call is an independent request with its own outcome; the client
/// holds no state beyond its connection pool.
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    /// Fetch all prompts, in service order.
    async fn list_prompts(&self) -> Result<Vec<Prompt>, ClientError>;

    /// Fetch one random prompt.
    async fn random_prompt(&self) -> Result<Prompt, ClientError>;

    /// Create a prompt from non-empty text.
    async fn create_prompt(&self, text: &str) -> Result<Prompt, ClientError>;

    /// Upload a recording and wait for the completed analysis.
    async fn analyze(
        &self,
        audio: AudioUpload,
        reference: AnalysisReference,
    ) -> Result<AnalysisResult, ClientError>;
}
