//! Audio engine for SpeakTrainer
//!
//! Owns the microphone capture lifecycle and playback of captured clips.
//!
//! # Features
//! - **Microphone capture** via cpal (cross-platform), driven on a
//!   dedicated capture thread
//! - **Encoding policy**: MP3 via FFmpeg pipe when available, WAV via
//!   hound as the guaranteed fallback
//! - **Playback** of the captured clip via rodio on its own thread
//! - **Recorder state machine** with deterministic resource release on
//!   every exit path

pub mod capture;
pub mod encoder;
pub mod playback;
pub mod recorder;

pub use capture::{list_input_devices, CaptureError, CaptureSource, MicSource, SourceFactory};
pub use encoder::{select_encoding, AudioEncoding};
pub use recorder::{CapturedAudio, Recorder, RecorderError, RecorderState};
