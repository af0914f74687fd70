//! Analyze an existing audio file

use crate::client::{AnalysisApi, AnalysisReference, AudioUpload};
use crate::output;
use std::path::Path;
use std::sync::Arc;

pub async fn run(
    client: Arc<dyn AnalysisApi>,
    file: std::path::PathBuf,
    text: Option<String>,
    prompt_id: Option<String>,
) -> anyhow::Result<()> {
    let reference = match (text, prompt_id) {
        (Some(text), None) => AnalysisReference::ExpectedText(text),
        (None, Some(id)) => AnalysisReference::PromptId(id),
        _ => anyhow::bail!("provide exactly one of --text or --prompt-id"),
    };

    let bytes = std::fs::read(&file)
        .map_err(|e| anyhow::anyhow!("could not read {}: {e}", file.display()))?;
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("recording.wav")
        .to_string();

    let upload = AudioUpload {
        bytes,
        file_name,
        mime_type: mime_for(&file).to_string(),
    };

    println!("Analyzing {}...", file.display());
    let result = client.analyze(upload, reference).await?;
    output::render_result(&result);

    Ok(())
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
        .as_str()
    {
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "webm" => "audio/webm",
        "m4a" | "mp4" => "audio/mp4",
        "flac" => "audio/flac",
        _ => "audio/wav",
    }
}
