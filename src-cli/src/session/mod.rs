//! Session controller
//!
//! Orchestrates one practice attempt: obtaining a prompt, submitting the
//! recorded audio, and tracking the analysis lifecycle. The analysis client
//! is injected behind [`AnalysisApi`], so the controller is testable without
//! a live service or microphone.
//!
//! State lives behind a mutex and methods take `&self`; at most one analysis
//! request is in flight per controller. Each submission is tagged with a
//! generation counter, and a response whose generation was superseded by a
//! reset or prompt change is discarded instead of overwriting fresh state.

pub mod words;

use crate::client::{AnalysisApi, AnalysisReference, AudioUpload, ClientError};
use parking_lot::Mutex;
use speaktrainer_types::{AnalysisResult, Prompt};
use std::sync::Arc;
use thiserror::Error;

/// Controller-level failures.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("an analysis is already in progress")]
    AlreadyInProgress,
    /// The session was reset or the prompt changed while the request was in
    /// flight; the response was discarded.
    #[error("analysis superseded by a newer attempt")]
    Superseded,
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Lifecycle of the current analysis attempt.
#[derive(Debug, Clone)]
pub enum AnalysisPhase {
    Idle,
    Analyzing,
    Succeeded(AnalysisResult),
    Failed(SessionError),
}

/// Lifecycle of the current prompt fetch.
#[derive(Debug, Clone)]
pub enum PromptPhase {
    Idle,
    Loading,
    Succeeded,
    Failed(SessionError),
}

struct SessionState {
    current_prompt: Option<Prompt>,
    analysis: AnalysisPhase,
    prompt_phase: PromptPhase,
    generation: u64,
}

/// Screen-level workflow controller.
pub struct SessionController {
    client: Arc<dyn AnalysisApi>,
    state: Mutex<SessionState>,
}

impl SessionController {
    pub fn new(client: Arc<dyn AnalysisApi>) -> Self {
        Self {
            client,
            state: Mutex::new(SessionState {
                current_prompt: None,
                analysis: AnalysisPhase::Idle,
                prompt_phase: PromptPhase::Idle,
                generation: 0,
            }),
        }
    }

    pub fn current_prompt(&self) -> Option<Prompt> {
        self.state.lock().current_prompt.clone()
    }

    pub fn analysis_phase(&self) -> AnalysisPhase {
        self.state.lock().analysis.clone()
    }

    pub fn prompt_phase(&self) -> PromptPhase {
        self.state.lock().prompt_phase.clone()
    }

    /// Fetch a random prompt and make it current.
    ///
    /// A new prompt always invalidates the previous attempt: the analysis
    /// phase returns to idle and any in-flight submission is detached. On
    /// failure the previous prompt is kept so the user can retry without
    /// losing context.
    pub async fn load_random_prompt(&self) -> Result<Prompt, SessionError> {
        self.state.lock().prompt_phase = PromptPhase::Loading;

        match self.client.random_prompt().await {
            Ok(prompt) => {
                let mut state = self.state.lock();
                state.current_prompt = Some(prompt.clone());
                state.prompt_phase = PromptPhase::Succeeded;
                state.analysis = AnalysisPhase::Idle;
                state.generation += 1;
                tracing::info!("Loaded prompt {}: \"{}\"", prompt.id, prompt.text);
                Ok(prompt)
            }
            Err(e) => {
                let err = SessionError::from(e);
                self.state.lock().prompt_phase = PromptPhase::Failed(err.clone());
                Err(err)
            }
        }
    }

    /// Use free-form text as a client-only prompt. Blank input is rejected
    /// without contacting the service.
    pub fn use_custom_text(&self, text: &str) -> Result<Prompt, SessionError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SessionError::Validation(
                "prompt text must not be blank".to_string(),
            ));
        }

        let prompt = Prompt::custom(trimmed);
        let mut state = self.state.lock();
        state.current_prompt = Some(prompt.clone());
        state.prompt_phase = PromptPhase::Succeeded;
        state.analysis = AnalysisPhase::Idle;
        state.generation += 1;
        Ok(prompt)
    }

    /// Submit a recording against the current prompt.
    ///
    /// Rejected with `AlreadyInProgress` while an earlier submission is
    /// still in flight; no second request is issued. Custom prompts are
    /// submitted as literal expected text, stored prompts by id.
    pub async fn submit_recording(
        &self,
        audio: AudioUpload,
    ) -> Result<AnalysisResult, SessionError> {
        let (reference, generation) = {
            let mut state = self.state.lock();
            let prompt = state.current_prompt.as_ref().ok_or_else(|| {
                SessionError::Validation("no prompt selected".to_string())
            })?;
            if matches!(state.analysis, AnalysisPhase::Analyzing) {
                return Err(SessionError::AlreadyInProgress);
            }

            let reference = if prompt.is_custom() {
                AnalysisReference::ExpectedText(prompt.text.clone())
            } else {
                AnalysisReference::PromptId(prompt.id.clone())
            };
            state.analysis = AnalysisPhase::Analyzing;
            (reference, state.generation)
        };

        let outcome = self.client.analyze(audio, reference).await;

        let mut state = self.state.lock();
        if state.generation != generation {
            tracing::debug!("Discarding analysis response for a superseded attempt");
            return Err(SessionError::Superseded);
        }

        match outcome {
            Ok(result) => {
                state.analysis = AnalysisPhase::Succeeded(result.clone());
                Ok(result)
            }
            Err(e) => {
                let err = SessionError::from(e);
                state.analysis = AnalysisPhase::Failed(err.clone());
                Err(err)
            }
        }
    }

    /// Return the analysis to idle, keeping the current prompt so the same
    /// text can be retried. Any in-flight submission is detached.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.analysis = AnalysisPhase::Idle;
        state.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn upload() -> AudioUpload {
        AudioUpload {
            bytes: vec![1, 2, 3],
            file_name: "recording.wav".to_string(),
            mime_type: "audio/wav".to_string(),
        }
    }

    fn result_for(prompt: Prompt, transcription: &str) -> AnalysisResult {
        AnalysisResult {
            session_id: "s-1".to_string(),
            prompt,
            transcription: transcription.to_string(),
            score: 87.5,
            expected_phonemes: String::new(),
            actual_phonemes: String::new(),
            phoneme_diff: String::new(),
            analysis_details: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    fn prompt_from_reference(reference: &AnalysisReference) -> Prompt {
        match reference {
            AnalysisReference::PromptId(id) => Prompt::from_wire(id.clone(), "stored text"),
            AnalysisReference::ExpectedText(text) => Prompt::custom(text.clone()),
        }
    }

    /// Scripted analysis client: a fixed random prompt and a fixed analyze
    /// outcome, echoing the submitted reference back as the result prompt.
    struct ScriptedClient {
        random: Result<Prompt, ClientError>,
        analyze_error: Option<ClientError>,
        analyze_calls: AtomicUsize,
    }

    impl ScriptedClient {
        fn new() -> Self {
            Self {
                random: Ok(Prompt::from_wire("p1", "She sells seashells")),
                analyze_error: None,
                analyze_calls: AtomicUsize::new(0),
            }
        }

        fn failing_analysis(message: &str) -> Self {
            Self {
                analyze_error: Some(ClientError::Analysis(message.to_string())),
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl AnalysisApi for ScriptedClient {
        async fn list_prompts(&self) -> Result<Vec<Prompt>, ClientError> {
            Ok(Vec::new())
        }

        async fn random_prompt(&self) -> Result<Prompt, ClientError> {
            self.random.clone()
        }

        async fn create_prompt(&self, text: &str) -> Result<Prompt, ClientError> {
            Ok(Prompt::from_wire("p-new", text))
        }

        async fn analyze(
            &self,
            _audio: AudioUpload,
            reference: AnalysisReference,
        ) -> Result<AnalysisResult, ClientError> {
            self.analyze_calls.fetch_add(1, Ordering::SeqCst);
            match &self.analyze_error {
                Some(err) => Err(err.clone()),
                None => Ok(result_for(prompt_from_reference(&reference), "echo")),
            }
        }
    }

    /// Client whose analyze call blocks until released, for exercising the
    /// in-flight paths.
    struct BlockingClient {
        started: Notify,
        release: Notify,
        analyze_calls: AtomicUsize,
    }

    impl BlockingClient {
        fn new() -> Self {
            Self {
                started: Notify::new(),
                release: Notify::new(),
                analyze_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AnalysisApi for BlockingClient {
        async fn list_prompts(&self) -> Result<Vec<Prompt>, ClientError> {
            Ok(Vec::new())
        }

        async fn random_prompt(&self) -> Result<Prompt, ClientError> {
            Ok(Prompt::from_wire("p1", "She sells seashells"))
        }

        async fn create_prompt(&self, text: &str) -> Result<Prompt, ClientError> {
            Ok(Prompt::from_wire("p-new", text))
        }

        async fn analyze(
            &self,
            _audio: AudioUpload,
            reference: AnalysisReference,
        ) -> Result<AnalysisResult, ClientError> {
            self.analyze_calls.fetch_add(1, Ordering::SeqCst);
            self.started.notify_one();
            self.release.notified().await;
            Ok(result_for(prompt_from_reference(&reference), "echo"))
        }
    }

    #[tokio::test]
    async fn random_prompt_becomes_current_and_resets_analysis() {
        let client = Arc::new(ScriptedClient::failing_analysis("boom"));
        let controller = SessionController::new(client);

        controller.use_custom_text("old text").unwrap();
        let _ = controller.submit_recording(upload()).await;
        assert!(matches!(
            controller.analysis_phase(),
            AnalysisPhase::Failed(_)
        ));

        let prompt = controller.load_random_prompt().await.unwrap();
        assert_eq!(prompt.id, "p1");
        assert_eq!(prompt.text, "She sells seashells");
        assert_eq!(controller.current_prompt().unwrap().id, "p1");
        assert!(matches!(controller.analysis_phase(), AnalysisPhase::Idle));
        assert!(matches!(
            controller.prompt_phase(),
            PromptPhase::Succeeded
        ));
    }

    #[tokio::test]
    async fn failed_prompt_fetch_keeps_previous_prompt() {
        let mut client = ScriptedClient::new();
        client.random = Err(ClientError::Network("connection refused".to_string()));
        let controller = SessionController::new(Arc::new(client));

        controller.use_custom_text("keep me").unwrap();
        let err = controller.load_random_prompt().await.unwrap_err();
        assert!(matches!(err, SessionError::Client(ClientError::Network(_))));
        assert_eq!(controller.current_prompt().unwrap().text, "keep me");
        assert!(matches!(
            controller.prompt_phase(),
            PromptPhase::Failed(_)
        ));
    }

    #[tokio::test]
    async fn blank_custom_text_is_rejected() {
        let controller = SessionController::new(Arc::new(ScriptedClient::new()));
        let err = controller.use_custom_text("   ").unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));
        assert!(controller.current_prompt().is_none());
    }

    #[tokio::test]
    async fn custom_prompt_text_round_trips_through_analysis() {
        let controller = SessionController::new(Arc::new(ScriptedClient::new()));
        controller.use_custom_text("hello world").unwrap();

        let result = controller.submit_recording(upload()).await.unwrap();
        assert_eq!(result.prompt.text, "hello world");
        assert!(result.prompt.is_custom());
        assert!(matches!(
            controller.analysis_phase(),
            AnalysisPhase::Succeeded(_)
        ));
    }

    #[tokio::test]
    async fn service_error_message_is_preserved() {
        let controller = SessionController::new(Arc::new(ScriptedClient::failing_analysis(
            "transcription service unavailable",
        )));
        controller.use_custom_text("hello").unwrap();

        let err = controller.submit_recording(upload()).await.unwrap_err();
        match &err {
            SessionError::Client(ClientError::Analysis(message)) => {
                assert_eq!(message, "transcription service unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        match controller.analysis_phase() {
            AnalysisPhase::Failed(SessionError::Client(ClientError::Analysis(message))) => {
                assert_eq!(message, "transcription service unavailable");
            }
            other => panic!("unexpected phase: {other:?}"),
        }
    }

    #[tokio::test]
    async fn submission_without_prompt_is_rejected() {
        let client = Arc::new(ScriptedClient::new());
        let controller = SessionController::new(client.clone());

        let err = controller.submit_recording(upload()).await.unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));
        assert_eq!(client.analyze_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn concurrent_submission_is_rejected_without_a_second_request() {
        let client = Arc::new(BlockingClient::new());
        let controller = Arc::new(SessionController::new(client.clone()));
        controller.use_custom_text("hello world").unwrap();

        let background = controller.clone();
        let first = tokio::spawn(async move { background.submit_recording(upload()).await });

        client.started.notified().await;
        assert!(matches!(
            controller.analysis_phase(),
            AnalysisPhase::Analyzing
        ));

        let err = controller.submit_recording(upload()).await.unwrap_err();
        assert!(matches!(err, SessionError::AlreadyInProgress));
        assert_eq!(client.analyze_calls.load(Ordering::SeqCst), 1);

        client.release.notify_one();
        first.await.unwrap().unwrap();
        assert!(matches!(
            controller.analysis_phase(),
            AnalysisPhase::Succeeded(_)
        ));
    }

    #[tokio::test]
    async fn reset_during_analysis_discards_the_stale_response() {
        let client = Arc::new(BlockingClient::new());
        let controller = Arc::new(SessionController::new(client.clone()));
        controller.use_custom_text("hello world").unwrap();

        let background = controller.clone();
        let first = tokio::spawn(async move { background.submit_recording(upload()).await });

        client.started.notified().await;
        controller.reset();
        client.release.notify_one();

        let outcome = first.await.unwrap();
        assert!(matches!(outcome, Err(SessionError::Superseded)));
        assert!(matches!(controller.analysis_phase(), AnalysisPhase::Idle));
    }

    #[tokio::test]
    async fn reset_keeps_the_current_prompt() {
        let controller = SessionController::new(Arc::new(ScriptedClient::new()));
        controller.use_custom_text("hello").unwrap();
        let _ = controller.submit_recording(upload()).await.unwrap();

        controller.reset();
        assert!(matches!(controller.analysis_phase(), AnalysisPhase::Idle));
        assert_eq!(controller.current_prompt().unwrap().text, "hello");
    }
}
