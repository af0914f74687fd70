//! Recording session state machine
//!
//! One `Recorder` owns at most one live capture stream and at most one
//! playback stream. The cpal stream lives on a dedicated capture thread
//! (it is not Send); the recorder holds the thread handle and a stop flag,
//! and joins the thread to collect the buffered samples.
//!
//! States: Idle -> Recording -> Stopped -> Idle. Starting a new recording
//! performs an implicit reset, so no two capture streams ever coexist.

use crate::capture::{CaptureError, MicSource, SourceFactory};
use crate::encoder::{self, AudioEncoding};
use crate::playback::Playback;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Recorder lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
    Stopped,
}

/// Recording and playback failures. All of them are non-fatal: the recorder
/// is left in a stable state and the operation can be retried.
#[derive(Debug, Clone, Error)]
pub enum RecorderError {
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),
    #[error("no input device found: {0}")]
    DeviceNotFound(String),
    #[error("could not start capture: {0}")]
    CaptureStartFailed(String),
    #[error("no audio data was captured")]
    EmptyRecording,
    #[error("no recording available")]
    NoRecordingAvailable,
    #[error("playback failed: {0}")]
    PlaybackFailed(String),
}

impl From<CaptureError> for RecorderError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::PermissionDenied(msg) => RecorderError::PermissionDenied(msg),
            CaptureError::DeviceNotFound(msg) => RecorderError::DeviceNotFound(msg),
            CaptureError::StartFailed(msg) => RecorderError::CaptureStartFailed(msg),
        }
    }
}

/// An encoded clip produced by a completed recording.
#[derive(Debug, Clone)]
pub struct CapturedAudio {
    pub bytes: Vec<u8>,
    pub encoding: AudioEncoding,
    /// `recording.<ext>`, extension matching the encoding.
    pub file_name: String,
    pub duration_secs: u64,
}

struct CaptureHandle {
    stop_flag: Arc<AtomicBool>,
    join: Option<JoinHandle<(Vec<f32>, u32)>>,
}

/// Microphone recording state machine.
pub struct Recorder {
    state: RecorderState,
    device_id: Option<String>,
    capture: Option<CaptureHandle>,
    captured: Option<CapturedAudio>,
    playback: Option<Playback>,
    last_error: Option<RecorderError>,
    elapsed: Arc<AtomicU64>,
    level: Arc<Mutex<f32>>,
}

impl Recorder {
    /// Recorder for the default input device.
    pub fn new() -> Self {
        Self::with_device(None)
    }

    /// Recorder bound to a named input device.
    pub fn with_device(device_id: Option<String>) -> Self {
        Self {
            state: RecorderState::Idle,
            device_id,
            capture: None,
            captured: None,
            playback: None,
            last_error: None,
            elapsed: Arc::new(AtomicU64::new(0)),
            level: Arc::new(Mutex::new(0.0)),
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Seconds elapsed since the current (or last) recording started.
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed.load(Ordering::SeqCst)
    }

    /// Input level of the most recent capture batch, 0-100.
    pub fn input_level(&self) -> f32 {
        *self.level.lock()
    }

    pub fn captured(&self) -> Option<&CapturedAudio> {
        self.captured.as_ref()
    }

    pub fn last_error(&self) -> Option<&RecorderError> {
        self.last_error.as_ref()
    }

    /// Start recording from the configured microphone.
    ///
    /// Blocks until the capture thread has acquired the device (which is
    /// where the OS permission prompt resolves). Any previous session is
    /// fully reset first.
    pub fn start_recording(&mut self) -> Result<(), RecorderError> {
        let factory = MicSource::factory(self.device_id.clone());
        self.start_recording_from(factory)
    }

    /// Start recording from an arbitrary capture source.
    pub fn start_recording_from(&mut self, factory: SourceFactory) -> Result<(), RecorderError> {
        self.reset();

        let stop_flag = Arc::new(AtomicBool::new(false));
        let (init_tx, init_rx) = mpsc::channel::<Result<(), CaptureError>>();

        let thread_stop = stop_flag.clone();
        let thread_elapsed = self.elapsed.clone();
        let thread_level = self.level.clone();

        let join = std::thread::Builder::new()
            .name("capture".to_string())
            .spawn(move || {
                capture_thread(factory, init_tx, thread_stop, thread_elapsed, thread_level)
            })
            .map_err(|e| RecorderError::CaptureStartFailed(e.to_string()))?;

        match init_rx.recv() {
            Ok(Ok(())) => {
                self.capture = Some(CaptureHandle {
                    stop_flag,
                    join: Some(join),
                });
                self.state = RecorderState::Recording;
                tracing::info!("Recording started");
                Ok(())
            }
            Ok(Err(capture_err)) => {
                let _ = join.join();
                let err = RecorderError::from(capture_err);
                tracing::warn!("Failed to start recording: {}", err);
                self.last_error = Some(err.clone());
                Err(err)
            }
            Err(_) => {
                let _ = join.join();
                let err = RecorderError::CaptureStartFailed(
                    "capture thread terminated during init".to_string(),
                );
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Finish the current recording and encode the captured samples.
    ///
    /// Valid only while recording; in any other state this reports
    /// `EmptyRecording` and leaves the session untouched. A genuine
    /// zero-sample capture also reports `EmptyRecording` and returns the
    /// recorder to idle so the user can retry. The hardware stream is
    /// released on every outcome.
    pub fn stop_recording(&mut self) -> Result<&CapturedAudio, RecorderError> {
        if self.state != RecorderState::Recording {
            return Err(RecorderError::EmptyRecording);
        }

        let mut handle = match self.capture.take() {
            Some(handle) => handle,
            None => {
                self.state = RecorderState::Idle;
                return Err(RecorderError::EmptyRecording);
            }
        };

        handle.stop_flag.store(true, Ordering::SeqCst);
        let joined = handle.join.take().map(|j| j.join());

        let (samples, sample_rate) = match joined {
            Some(Ok(result)) => result,
            _ => {
                self.state = RecorderState::Idle;
                let err =
                    RecorderError::CaptureStartFailed("capture thread panicked".to_string());
                self.last_error = Some(err.clone());
                return Err(err);
            }
        };

        if samples.is_empty() || sample_rate == 0 {
            tracing::warn!("Recording stopped with no captured audio");
            self.state = RecorderState::Idle;
            self.last_error = Some(RecorderError::EmptyRecording);
            return Err(RecorderError::EmptyRecording);
        }

        let captured = match encode_with_fallback(&samples, sample_rate) {
            Some(captured) => captured,
            None => {
                self.state = RecorderState::Idle;
                self.last_error = Some(RecorderError::EmptyRecording);
                return Err(RecorderError::EmptyRecording);
            }
        };

        tracing::info!(
            "Recording stopped: {} samples, {}s, {} bytes as {:?}",
            samples.len(),
            captured.duration_secs,
            captured.bytes.len(),
            captured.encoding
        );

        self.last_error = None;
        self.state = RecorderState::Stopped;
        Ok(self.captured.insert(captured))
    }

    /// Play back the captured clip. Valid only once a recording exists;
    /// playback failures never alter the recording state.
    pub fn play_recording(&mut self) -> Result<(), RecorderError> {
        let bytes = match &self.captured {
            Some(captured) => captured.bytes.clone(),
            None => {
                self.last_error = Some(RecorderError::NoRecordingAvailable);
                return Err(RecorderError::NoRecordingAvailable);
            }
        };

        // One playback at a time: tear down the previous one first
        if let Some(previous) = self.playback.take() {
            previous.stop();
        }

        match Playback::start(bytes) {
            Ok(playback) => {
                self.playback = Some(playback);
                Ok(())
            }
            Err(msg) => {
                let err = RecorderError::PlaybackFailed(msg);
                tracing::warn!("{}", err);
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Stop any active playback. No-op when nothing is playing.
    pub fn stop_playback(&mut self) {
        if let Some(playback) = self.playback.take() {
            playback.stop();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback
            .as_ref()
            .map(|p| !p.is_finished())
            .unwrap_or(false)
    }

    /// Release every resource and return to idle. Safe to call from any
    /// state, any number of times.
    pub fn reset(&mut self) {
        if let Some(mut handle) = self.capture.take() {
            handle.stop_flag.store(true, Ordering::SeqCst);
            if let Some(join) = handle.join.take() {
                let _ = join.join();
            }
        }
        if let Some(playback) = self.playback.take() {
            playback.stop();
        }
        self.captured = None;
        self.last_error = None;
        self.elapsed = Arc::new(AtomicU64::new(0));
        self.level = Arc::new(Mutex::new(0.0));
        self.state = RecorderState::Idle;
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.reset();
    }
}

fn encode_with_fallback(samples: &[f32], sample_rate: u32) -> Option<CapturedAudio> {
    let mut encoding = encoder::select_encoding();
    let bytes = match encoder::encode(samples, sample_rate, encoding) {
        Ok(bytes) => bytes,
        Err(e) if encoding != AudioEncoding::Wav => {
            tracing::warn!("{:?} encoding failed ({}), falling back to WAV", encoding, e);
            encoding = AudioEncoding::Wav;
            match encoder::encode(samples, sample_rate, encoding) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!("WAV encoding failed: {}", e);
                    return None;
                }
            }
        }
        Err(e) => {
            tracing::error!("WAV encoding failed: {}", e);
            return None;
        }
    };

    Some(CapturedAudio {
        bytes,
        encoding,
        file_name: format!("recording.{}", encoding.extension()),
        duration_secs: samples.len() as u64 / sample_rate as u64,
    })
}

fn capture_thread(
    factory: SourceFactory,
    init_tx: mpsc::Sender<Result<(), CaptureError>>,
    stop_flag: Arc<AtomicBool>,
    elapsed: Arc<AtomicU64>,
    level: Arc<Mutex<f32>>,
) -> (Vec<f32>, u32) {
    let mut source = match factory() {
        Ok(source) => source,
        Err(e) => {
            let _ = init_tx.send(Err(e));
            return (Vec::new(), 0);
        }
    };
    let sample_rate = source.sample_rate();
    let _ = init_tx.send(Ok(()));

    let started = Instant::now();
    let mut samples: Vec<f32> = Vec::new();

    while !stop_flag.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(50));

        let fresh = source.drain();
        if !fresh.is_empty() {
            *level.lock() = input_level_of(&fresh);
            samples.extend_from_slice(&fresh);
        }
        elapsed.store(started.elapsed().as_secs(), Ordering::SeqCst);
    }

    // Pick up anything buffered between the last poll and the stop signal
    samples.extend(source.drain());

    (samples, sample_rate)
}

// RMS of the most recent ~800 samples scaled to 0-100 for a VU-style gauge.
fn input_level_of(samples: &[f32]) -> f32 {
    let recent = &samples[samples.len().saturating_sub(800)..];
    if recent.is_empty() {
        return 0.0;
    }
    let rms = (recent.iter().map(|s| s * s).sum::<f32>() / recent.len() as f32).sqrt();
    (rms * 300.0).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureSource;

    /// Capture source fed from a fixed sample script.
    struct ScriptedSource {
        sample_rate: u32,
        remaining: Vec<f32>,
    }

    impl ScriptedSource {
        fn factory(sample_rate: u32, samples: Vec<f32>) -> SourceFactory {
            Box::new(move || {
                Ok(Box::new(ScriptedSource {
                    sample_rate,
                    remaining: samples,
                }) as Box<dyn CaptureSource>)
            })
        }
    }

    impl CaptureSource for ScriptedSource {
        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn drain(&mut self) -> Vec<f32> {
            std::mem::take(&mut self.remaining)
        }
    }

    fn failing_factory(err: CaptureError) -> SourceFactory {
        Box::new(move || Err(err))
    }

    fn tone(len: usize) -> Vec<f32> {
        (0..len).map(|i| (i as f32 * 0.1).sin() * 0.4).collect()
    }

    #[test]
    fn start_stop_produces_encoded_audio() {
        let mut recorder = Recorder::new();
        recorder
            .start_recording_from(ScriptedSource::factory(16_000, tone(32_000)))
            .unwrap();
        assert_eq!(recorder.state(), RecorderState::Recording);

        let captured = recorder.stop_recording().unwrap().clone();
        assert_eq!(recorder.state(), RecorderState::Stopped);
        assert!(!captured.bytes.is_empty());
        assert_eq!(captured.duration_secs, 2);
        assert!(captured
            .file_name
            .ends_with(captured.encoding.extension()));
    }

    #[test]
    fn empty_capture_reverts_to_idle() {
        let mut recorder = Recorder::new();
        recorder
            .start_recording_from(ScriptedSource::factory(16_000, Vec::new()))
            .unwrap();

        let err = recorder.stop_recording().unwrap_err();
        assert!(matches!(err, RecorderError::EmptyRecording));
        assert_eq!(recorder.state(), RecorderState::Idle);
        assert!(recorder.captured().is_none());
        assert!(matches!(
            recorder.last_error(),
            Some(RecorderError::EmptyRecording)
        ));
    }

    #[test]
    fn stop_without_recording_reports_empty() {
        let mut recorder = Recorder::new();
        let err = recorder.stop_recording().unwrap_err();
        assert!(matches!(err, RecorderError::EmptyRecording));
        assert_eq!(recorder.state(), RecorderState::Idle);
    }

    #[test]
    fn failed_acquisition_keeps_recorder_idle() {
        let mut recorder = Recorder::new();
        let err = recorder
            .start_recording_from(failing_factory(CaptureError::DeviceNotFound(
                "no default input device".to_string(),
            )))
            .unwrap_err();

        assert!(matches!(err, RecorderError::DeviceNotFound(_)));
        assert_eq!(recorder.state(), RecorderState::Idle);
        assert!(matches!(
            recorder.last_error(),
            Some(RecorderError::DeviceNotFound(_))
        ));
    }

    #[test]
    fn permission_failure_maps_to_permission_denied() {
        let mut recorder = Recorder::new();
        let err = recorder
            .start_recording_from(failing_factory(CaptureError::PermissionDenied(
                "denied by user".to_string(),
            )))
            .unwrap_err();
        assert!(matches!(err, RecorderError::PermissionDenied(_)));
    }

    #[test]
    fn reset_is_idempotent() {
        let mut recorder = Recorder::new();
        recorder
            .start_recording_from(ScriptedSource::factory(16_000, tone(16_000)))
            .unwrap();
        recorder.stop_recording().unwrap();

        for _ in 0..2 {
            recorder.reset();
            assert_eq!(recorder.state(), RecorderState::Idle);
            assert!(recorder.captured().is_none());
            assert!(recorder.last_error().is_none());
            assert_eq!(recorder.elapsed_seconds(), 0);
        }
    }

    #[test]
    fn starting_again_discards_previous_capture() {
        let mut recorder = Recorder::new();
        recorder
            .start_recording_from(ScriptedSource::factory(16_000, tone(16_000)))
            .unwrap();
        recorder.stop_recording().unwrap();
        assert!(recorder.captured().is_some());

        recorder
            .start_recording_from(ScriptedSource::factory(16_000, tone(16_000)))
            .unwrap();
        assert_eq!(recorder.state(), RecorderState::Recording);
        assert!(recorder.captured().is_none());

        recorder.reset();
    }

    #[test]
    fn playback_without_capture_is_rejected() {
        let mut recorder = Recorder::new();
        let err = recorder.play_recording().unwrap_err();
        assert!(matches!(err, RecorderError::NoRecordingAvailable));
        assert_eq!(recorder.state(), RecorderState::Idle);
    }

    #[test]
    fn input_level_is_bounded() {
        assert_eq!(input_level_of(&[]), 0.0);
        let loud = vec![1.0f32; 1000];
        assert_eq!(input_level_of(&loud), 100.0);
        let quiet = vec![0.001f32; 1000];
        assert!(input_level_of(&quiet) < 1.0);
    }
}
