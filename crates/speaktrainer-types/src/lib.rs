//! Shared types for SpeakTrainer
//!
//! This crate contains the data structures exchanged between the audio
//! engine, the analysis client and the session controller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Prompt Types
// ============================================================================

/// Sentinel prompt id for client-only prompts built from free-form text.
/// Such prompts are never persisted on the service side.
pub const CUSTOM_PROMPT_ID: &str = "custom";

/// A text phrase the user is asked to pronounce.
///
/// Immutable once fetched; replaced wholesale when the user requests a new
/// prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Prompt {
    /// Build a client-only prompt from free-form text.
    ///
    /// Both timestamps are set to the moment of construction.
    pub fn custom(text: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: CUSTOM_PROMPT_ID.to_string(),
            text: text.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Synthesize a full prompt from the `{id, text}` pair the random-prompt
    /// endpoint returns. Timestamps are set at receipt time.
    pub fn from_wire(id: impl Into<String>, text: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            text: text.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_custom(&self) -> bool {
        self.id == CUSTOM_PROMPT_ID
    }
}

// ============================================================================
// Analysis Types
// ============================================================================

/// Completed analysis returned by the scoring service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub session_id: String,
    pub prompt: Prompt,
    /// What the service heard.
    pub transcription: String,
    /// Accuracy score, 0-100.
    pub score: f64,
    pub expected_phonemes: String,
    pub actual_phonemes: String,
    /// Per-unit correctness markers comparing expected vs actual phonemes.
    pub phoneme_diff: String,
    /// Opaque detail blob from the service; rendered verbatim, never
    /// interpreted by the client.
    #[serde(default)]
    pub analysis_details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Audio Types
// ============================================================================

/// Audio input device information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioDevice {
    /// Device ID
    pub id: String,
    /// Human-readable device name
    pub name: String,
    /// Whether this is the default device
    pub is_default: bool,
    /// Number of input channels
    pub channels: u16,
    /// Sample rate in Hz
    pub sample_rate: u32,
}
