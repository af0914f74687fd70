//! Captured-audio encoding
//!
//! The recorder tries the preferred encodings in priority order and takes
//! the first one the runtime supports: MP3 through an FFmpeg pipe when an
//! `ffmpeg` binary is on PATH, WAV via hound otherwise. The chosen encoding
//! determines the file extension of the captured clip.

use anyhow::{Context, Result};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Supported encodings, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEncoding {
    Mp3,
    Wav,
}

impl AudioEncoding {
    /// Preference order; the last entry is always supported.
    pub const PREFERRED: [AudioEncoding; 2] = [AudioEncoding::Mp3, AudioEncoding::Wav];

    pub fn extension(&self) -> &'static str {
        match self {
            AudioEncoding::Mp3 => "mp3",
            AudioEncoding::Wav => "wav",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioEncoding::Mp3 => "audio/mpeg",
            AudioEncoding::Wav => "audio/wav",
        }
    }

    pub fn is_supported(&self) -> bool {
        match self {
            AudioEncoding::Mp3 => find_ffmpeg().is_some(),
            AudioEncoding::Wav => true,
        }
    }
}

/// Pick the first supported encoding from the preference list.
pub fn select_encoding() -> AudioEncoding {
    let chosen = AudioEncoding::PREFERRED
        .iter()
        .copied()
        .find(AudioEncoding::is_supported)
        .unwrap_or(AudioEncoding::Wav);
    tracing::debug!("Selected audio encoding: {:?}", chosen);
    chosen
}

/// Encode mono f32 samples into the given format.
pub fn encode(samples: &[f32], sample_rate: u32, encoding: AudioEncoding) -> Result<Vec<u8>> {
    match encoding {
        AudioEncoding::Wav => encode_wav(samples, sample_rate),
        AudioEncoding::Mp3 => encode_mp3(samples, sample_rate),
    }
}

/// Convert f32 samples to WAV bytes (16-bit PCM, mono).
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    use std::io::Cursor;

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer.write_sample(sample_i16)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

/// Encode samples to MP3 through an FFmpeg pipe.
///
/// FFmpeg reads s16le from stdin and writes the MP3 container to stdout.
/// stdin is fed from a helper thread so a full stdout pipe cannot deadlock
/// the exchange.
fn encode_mp3(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let ffmpeg = find_ffmpeg().context("ffmpeg not found on PATH")?;

    let mut child = Command::new(&ffmpeg)
        .args([
            "-f",
            "s16le",
            "-ar",
            &sample_rate.to_string(),
            "-ac",
            "1",
            "-i",
            "pipe:0",
            "-c:a",
            "libmp3lame",
            "-b:a",
            "128k",
            "-f",
            "mp3",
            "pipe:1",
        ])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("Failed to start FFmpeg: {}", ffmpeg.display()))?;

    let mut stdin = child.stdin.take().context("Failed to get FFmpeg stdin")?;
    let mut stdout = child.stdout.take().context("Failed to get FFmpeg stdout")?;

    // Convert float32 -> int16 little-endian
    let mut pcm = vec![0u8; samples.len() * 2];
    for (i, &sample) in samples.iter().enumerate() {
        let int_sample = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
        pcm[i * 2] = int_sample as u8;
        pcm[i * 2 + 1] = (int_sample >> 8) as u8;
    }

    let writer = std::thread::spawn(move || {
        let result = stdin.write_all(&pcm);
        drop(stdin);
        result
    });

    let mut encoded = Vec::new();
    stdout
        .read_to_end(&mut encoded)
        .context("Failed to read FFmpeg output")?;

    writer
        .join()
        .map_err(|_| anyhow::anyhow!("FFmpeg writer thread panicked"))?
        .context("Failed to write to FFmpeg stdin")?;

    let status = child.wait().context("Failed to wait for FFmpeg")?;
    if !status.success() {
        anyhow::bail!("FFmpeg exited with status {status}");
    }
    if encoded.is_empty() {
        anyhow::bail!("FFmpeg produced no output");
    }

    Ok(encoded)
}

fn find_ffmpeg() -> Option<PathBuf> {
    which::which("ffmpeg").ok()
}
