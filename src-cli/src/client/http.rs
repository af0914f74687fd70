//! HTTP implementation of the analysis API
//!
//! Wire shapes follow the service contract: prompt endpoints return JSON,
//! analysis takes a multipart upload, and error responses carry an
//! `{ "error": string }` body whose message is surfaced to the user.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use speaktrainer_types::{AnalysisResult, Prompt};

use super::{AnalysisApi, AnalysisReference, AudioUpload, ClientError};

#[derive(Debug, Deserialize)]
struct PromptListResponse {
    prompts: Vec<Prompt>,
}

/// `GET /prompts/random` returns a bare `{id, text}` pair; the full prompt
/// is synthesized at receipt time.
#[derive(Debug, Deserialize)]
struct RandomPromptResponse {
    id: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Analysis service client over HTTP.
pub struct HttpAnalysisClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAnalysisClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl AnalysisApi for HttpAnalysisClient {
    async fn list_prompts(&self) -> Result<Vec<Prompt>, ClientError> {
        let response = self
            .client
            .get(self.url("/prompts"))
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(fetch_error(status, &body));
        }

        let body: PromptListResponse = response.json().await.map_err(|e| ClientError::Fetch {
            status: status.as_u16(),
            message: format!("failed to parse response: {e}"),
        })?;

        Ok(body.prompts)
    }

    async fn random_prompt(&self) -> Result<Prompt, ClientError> {
        let response = self
            .client
            .get(self.url("/prompts/random"))
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(fetch_error(status, &body));
        }

        let body: RandomPromptResponse =
            response.json().await.map_err(|e| ClientError::Fetch {
                status: status.as_u16(),
                message: format!("failed to parse response: {e}"),
            })?;

        Ok(Prompt::from_wire(body.id, body.text))
    }

    async fn create_prompt(&self, text: &str) -> Result<Prompt, ClientError> {
        let response = self
            .client
            .post(self.url("/prompts"))
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(fetch_error(status, &body));
        }

        response.json().await.map_err(|e| ClientError::Fetch {
            status: status.as_u16(),
            message: format!("failed to parse response: {e}"),
        })
    }

    async fn analyze(
        &self,
        audio: AudioUpload,
        reference: AnalysisReference,
    ) -> Result<AnalysisResult, ClientError> {
        let file_part = Part::bytes(audio.bytes)
            .file_name(audio.file_name)
            .mime_str(&audio.mime_type)
            .map_err(|e| ClientError::Analysis(e.to_string()))?;

        let form = Form::new().part("audio_file", file_part);
        let form = match reference {
            AnalysisReference::PromptId(id) => form.text("prompt_id", id),
            AnalysisReference::ExpectedText(text) => form.text("expected_text", text),
        };

        tracing::debug!("Submitting recording for analysis");

        let response = self
            .client
            .post(self.url("/sessions/analyze"))
            .multipart(form)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Analysis(analysis_error_message(status, &body)));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Analysis(format!("failed to parse response: {e}")))
    }
}

fn map_send_error(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        ClientError::Network("request timed out".to_string())
    } else if err.is_connect() {
        ClientError::Network(format!("could not reach the analysis service: {err}"))
    } else {
        ClientError::Network(err.to_string())
    }
}

fn fetch_error(status: StatusCode, body: &str) -> ClientError {
    ClientError::Fetch {
        status: status.as_u16(),
        message: error_body_message(body)
            .unwrap_or_else(|| format!("request failed with status {status}")),
    }
}

fn analysis_error_message(status: StatusCode, body: &str) -> String {
    error_body_message(body).unwrap_or_else(|| format!("analysis failed with status {status}"))
}

fn error_body_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body).ok().map(|b| b.error)
}
