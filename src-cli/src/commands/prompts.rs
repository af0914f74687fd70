//! Prompt management commands

use crate::cli::PromptAction;
use crate::client::AnalysisApi;
use std::sync::Arc;

pub async fn run(client: Arc<dyn AnalysisApi>, action: PromptAction) -> anyhow::Result<()> {
    match action {
        PromptAction::List => {
            let prompts = client.list_prompts().await?;
            if prompts.is_empty() {
                println!("No prompts available");
                return Ok(());
            }
            for prompt in &prompts {
                println!("{}  {}", prompt.id, prompt.text);
            }
            println!("{} prompt(s)", prompts.len());
        }
        PromptAction::Random => {
            let prompt = client.random_prompt().await?;
            println!("{}  {}", prompt.id, prompt.text);
        }
        PromptAction::Add { text } => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                anyhow::bail!("prompt text must not be blank");
            }
            let prompt = client.create_prompt(trimmed).await?;
            println!("Created prompt {}", prompt.id);
        }
    }

    Ok(())
}
