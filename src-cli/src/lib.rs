//! SpeakTrainer client library
//!
//! Records a spoken attempt at a prompt, uploads it to the external
//! analysis service and renders the returned score and phoneme comparison.

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod output;
pub mod session;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Parse arguments and run the selected command.
pub fn run() -> anyhow::Result<()> {
    init_tracing();

    let cli = cli::Cli::parse();
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(commands::dispatch(cli))
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "warn,speaktrainer=info,speaktrainer_audio=info".into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .init();
}
