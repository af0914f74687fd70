//! Command-line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// SpeakTrainer - pronunciation practice client
#[derive(Parser, Debug)]
#[command(name = "speaktrainer")]
#[command(author, version, about = "Practice pronunciation and get instant feedback")]
pub struct Cli {
    /// Analysis service base URL (overrides SPEAKTRAINER_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record attempts against prompts and get scored feedback
    Practice {
        /// Practice a custom text instead of a fetched prompt
        #[arg(long)]
        text: Option<String>,

        /// Input device name (see `speaktrainer devices`)
        #[arg(long)]
        device: Option<String>,
    },
    /// Manage practice prompts
    Prompts {
        #[command(subcommand)]
        action: PromptAction,
    },
    /// Analyze an existing audio file without recording
    Analyze {
        /// Path to the audio file
        file: PathBuf,

        /// Expected text to compare against
        #[arg(long, conflicts_with = "prompt_id")]
        text: Option<String>,

        /// Id of a stored prompt to compare against
        #[arg(long)]
        prompt_id: Option<String>,
    },
    /// List audio input devices
    Devices,
}

#[derive(Subcommand, Debug)]
pub enum PromptAction {
    /// List all prompts
    List,
    /// Fetch one random prompt
    Random,
    /// Create a new prompt
    Add {
        /// Prompt text
        text: String,
    },
}
