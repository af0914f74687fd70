//! Microphone capture using cpal
//!
//! The cpal stream is not Send, so a capture source is always constructed
//! and driven on the recorder's dedicated capture thread. Callers hand the
//! recorder a [`SourceFactory`] instead of a live source.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use speaktrainer_types::AudioDevice;
use std::sync::Arc;
use thiserror::Error;

/// Why a capture source could not be opened.
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),
    #[error("no usable input device: {0}")]
    DeviceNotFound(String),
    #[error("failed to start capture: {0}")]
    StartFailed(String),
}

/// A source of mono f32 samples, owned by the capture thread.
pub trait CaptureSource {
    /// Native sample rate of the source in Hz.
    fn sample_rate(&self) -> u32;

    /// Drain the samples buffered since the previous call.
    fn drain(&mut self) -> Vec<f32>;
}

/// Builds a capture source on the capture thread.
pub type SourceFactory =
    Box<dyn FnOnce() -> Result<Box<dyn CaptureSource>, CaptureError> + Send + 'static>;

/// Microphone capture source backed by a cpal input stream.
///
/// Uses the device's default input configuration, which on every major host
/// carries the OS-level processing chain (echo cancellation, noise
/// suppression) the device exposes. Multi-channel input is folded to mono by
/// averaging channels.
pub struct MicSource {
    _stream: cpal::Stream,
    sample_rate: u32,
    buffer: Arc<Mutex<Vec<f32>>>,
}

impl MicSource {
    /// Open the named input device, or the default one.
    pub fn open(device_name: Option<&str>) -> Result<Self, CaptureError> {
        let host = cpal::default_host();

        let device = if let Some(name) = device_name {
            host.input_devices()
                .map_err(map_devices_error)?
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| {
                    CaptureError::DeviceNotFound(format!("input device '{name}' not found"))
                })?
        } else {
            host.default_input_device().ok_or_else(|| {
                CaptureError::DeviceNotFound("no default input device".to_string())
            })?
        };

        let config = device
            .default_input_config()
            .map_err(map_config_error)?;

        tracing::info!(
            "Audio capture: {} @ {}Hz, {} channels",
            device.name().unwrap_or_default(),
            config.sample_rate().0,
            config.channels()
        );

        let stream_config: cpal::StreamConfig = config.into();
        let sample_rate = stream_config.sample_rate.0;
        let channels = stream_config.channels as usize;
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let callback_buffer = buffer.clone();

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Fold to mono by averaging channels
                    let mono = data
                        .chunks(channels)
                        .map(|chunk| chunk.iter().sum::<f32>() / channels as f32);
                    callback_buffer.lock().extend(mono);
                },
                |err| {
                    tracing::error!("Audio capture error: {}", err);
                },
                None,
            )
            .map_err(map_build_error)?;

        stream
            .play()
            .map_err(|e| CaptureError::StartFailed(e.to_string()))?;

        tracing::info!("Audio stream started");

        Ok(Self {
            _stream: stream,
            sample_rate,
            buffer,
        })
    }

    /// Factory for a microphone source; the device is opened lazily on the
    /// capture thread.
    pub fn factory(device_name: Option<String>) -> SourceFactory {
        Box::new(move || {
            MicSource::open(device_name.as_deref())
                .map(|s| Box::new(s) as Box<dyn CaptureSource>)
        })
    }
}

impl CaptureSource for MicSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn drain(&mut self) -> Vec<f32> {
        std::mem::take(&mut *self.buffer.lock())
    }
}

fn map_devices_error(err: cpal::DevicesError) -> CaptureError {
    let msg = err.to_string();
    if looks_like_permission(&msg) {
        CaptureError::PermissionDenied(msg)
    } else {
        CaptureError::DeviceNotFound(msg)
    }
}

fn map_config_error(err: cpal::DefaultStreamConfigError) -> CaptureError {
    match err {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => {
            CaptureError::DeviceNotFound("input device no longer available".to_string())
        }
        other => CaptureError::StartFailed(other.to_string()),
    }
}

fn map_build_error(err: cpal::BuildStreamError) -> CaptureError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => {
            CaptureError::DeviceNotFound("input device no longer available".to_string())
        }
        other => {
            let msg = other.to_string();
            if looks_like_permission(&msg) {
                CaptureError::PermissionDenied(msg)
            } else {
                CaptureError::StartFailed(msg)
            }
        }
    }
}

// Hosts report OS permission refusals as backend-specific errors; the
// message text is the only discriminator cpal gives us.
fn looks_like_permission(msg: &str) -> bool {
    let msg = msg.to_ascii_lowercase();
    msg.contains("permission") || msg.contains("denied") || msg.contains("not permitted")
}

/// List available input devices
pub fn list_input_devices() -> anyhow::Result<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let devices: Vec<AudioDevice> = host
        .input_devices()?
        .filter_map(|device| {
            let name = device.name().ok()?;
            let config = device.default_input_config().ok()?;

            Some(AudioDevice {
                id: name.clone(),
                name: name.clone(),
                is_default: default_name.as_ref() == Some(&name),
                channels: config.channels(),
                sample_rate: config.sample_rate().0,
            })
        })
        .collect();

    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_detection_matches_host_messages() {
        assert!(looks_like_permission("Permission denied by the OS"));
        assert!(looks_like_permission("operation not permitted"));
        assert!(!looks_like_permission("device is busy"));
    }

    #[test]
    fn capture_errors_render_their_context() {
        let err = CaptureError::DeviceNotFound("no default input device".to_string());
        assert!(err.to_string().contains("no default input device"));
    }
}
