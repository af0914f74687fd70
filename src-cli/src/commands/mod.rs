//! CLI command handlers

mod analyze;
mod devices;
mod practice;
mod prompts;

use crate::cli::{Cli, Commands};
use crate::client::{AnalysisApi, HttpAnalysisClient};
use crate::config::Config;
use std::io::Write;
use std::sync::Arc;

pub async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let config = Config::resolve(cli.api_url.clone());
    let client: Arc<dyn AnalysisApi> = Arc::new(HttpAnalysisClient::new(&config.api_base_url));

    match cli.command {
        Commands::Practice { text, device } => practice::run(client, device, text).await,
        Commands::Prompts { action } => prompts::run(client, action).await,
        Commands::Analyze {
            file,
            text,
            prompt_id,
        } => analyze::run(client, file, text, prompt_id).await,
        Commands::Devices => devices::run(),
    }
}

/// Print a prompt and read one trimmed line from stdin.
pub(crate) fn ask(prompt: &str) -> anyhow::Result<String> {
    print!("{prompt} ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
