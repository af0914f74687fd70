//! SpeakTrainer - pronunciation practice client
//!
//! Main entry point for the command-line application.

fn main() -> anyhow::Result<()> {
    speaktrainer::run()
}
