//! Terminal rendering of analysis results
//!
//! Purely a function of controller state; nothing here feeds back into the
//! workflow.

use crate::session::words::{word_marks, WordStatus};
use speaktrainer_audio::RecorderError;
use speaktrainer_types::AnalysisResult;

pub fn render_result(result: &AnalysisResult) {
    println!();
    println!("Score: {:.0}%", result.score);
    println!("You said: \"{}\"", result.transcription);

    let marks = word_marks(&result.prompt.text, &result.transcription);
    let rendered: Vec<String> = marks
        .iter()
        .map(|m| format!("{}{}", marker(m.status), m.word))
        .collect();
    println!("Words:    {}", rendered.join("  "));

    if !result.expected_phonemes.is_empty() {
        println!("Expected: {}", result.expected_phonemes);
        println!("Heard:    {}", result.actual_phonemes);
        println!("Diff:     {}", result.phoneme_diff);
    }
    println!();
}

fn marker(status: WordStatus) -> &'static str {
    match status {
        WordStatus::Correct => "+",
        WordStatus::Partial => "~",
        WordStatus::Incorrect => "-",
    }
}

/// Actionable guidance for recording failures.
pub fn recording_hint(err: &RecorderError) -> String {
    match err {
        RecorderError::PermissionDenied(_) => {
            format!("{err}. Allow microphone access for this terminal and try again.")
        }
        RecorderError::DeviceNotFound(_) => format!(
            "{err}. Connect a microphone or pick one with --device (see `speaktrainer devices`)."
        ),
        RecorderError::EmptyRecording => {
            format!("{err}. Speak into the microphone and try again.")
        }
        _ => format!("{err}. Check your microphone and try again."),
    }
}
