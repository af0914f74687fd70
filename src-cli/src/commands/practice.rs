//! Interactive practice loop
//!
//! Fetch a prompt, record an attempt, optionally replay it, submit it for
//! analysis and render the verdict. Everything runs through the session
//! controller; the recorder is reset between attempts so no capture stream
//! outlives its attempt.

use crate::client::{AnalysisApi, AudioUpload};
use crate::commands::ask;
use crate::output;
use crate::session::SessionController;
use speaktrainer_audio::{CapturedAudio, Recorder};
use std::sync::Arc;
use std::time::Duration;

pub async fn run(
    client: Arc<dyn AnalysisApi>,
    device: Option<String>,
    text: Option<String>,
) -> anyhow::Result<()> {
    let controller = SessionController::new(client);
    let mut recorder = Recorder::with_device(device);

    match text {
        Some(text) => {
            controller.use_custom_text(&text)?;
        }
        None => {
            controller.load_random_prompt().await?;
        }
    }

    loop {
        let prompt = match controller.current_prompt() {
            Some(prompt) => prompt,
            None => anyhow::bail!("no prompt selected"),
        };

        println!();
        println!("Say: \"{}\"", prompt.text);

        let Some(captured) = record_attempt(&mut recorder)? else {
            // User backed out or the capture failed in a retryable way
            if !ask("Try recording again? [Y/n]")?.eq_ignore_ascii_case("n") {
                continue;
            }
            break;
        };

        offer_playback(&mut recorder)?;

        println!("Analyzing...");
        match controller
            .submit_recording(AudioUpload::from_captured(&captured))
            .await
        {
            Ok(result) => output::render_result(&result),
            Err(e) => println!("Analysis failed: {e}"),
        }

        match ask("Same prompt [Enter], new prompt [n], quit [q]:")?.as_str() {
            "q" => break,
            "n" => {
                if let Err(e) = controller.load_random_prompt().await {
                    // Previous prompt stays usable on a failed fetch
                    println!("Could not fetch a new prompt: {e}");
                }
                recorder.reset();
            }
            _ => {
                controller.reset();
                recorder.reset();
            }
        }
    }

    recorder.reset();
    Ok(())
}

/// One record/stop round. Returns None when nothing usable was captured.
fn record_attempt(recorder: &mut Recorder) -> anyhow::Result<Option<CapturedAudio>> {
    ask("Press Enter to start recording:")?;

    if let Err(e) = recorder.start_recording() {
        println!("{}", output::recording_hint(&e));
        return Ok(None);
    }

    ask("Recording... press Enter to stop:")?;

    match recorder.stop_recording() {
        Ok(captured) => {
            let captured = captured.clone();
            println!(
                "Captured {}s ({})",
                captured.duration_secs, captured.file_name
            );
            Ok(Some(captured))
        }
        Err(e) => {
            println!("{}", output::recording_hint(&e));
            Ok(None)
        }
    }
}

fn offer_playback(recorder: &mut Recorder) -> anyhow::Result<()> {
    if !ask("Play it back? [y/N]")?.eq_ignore_ascii_case("y") {
        return Ok(());
    }

    if let Err(e) = recorder.play_recording() {
        println!("{e}");
        return Ok(());
    }

    while recorder.is_playing() {
        std::thread::sleep(Duration::from_millis(100));
    }
    recorder.stop_playback();
    Ok(())
}
