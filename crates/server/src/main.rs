//! Simple test harness for the quest orchestrator.
//!
//! Reads upstream addresses and deployment switches from the environment,
//! then requests one batch for a user and prints it as JSON.
//!
//! Usage: server <user_id> [quests] [max_tasks]

use anyhow::{Context, Result};
use tracing::info;

use providers::ProviderConfig;
use server::{Providers, QuestOrchestrator, QuestSettings};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,server=debug,pipeline=debug,selection=debug")
            }),
        )
        .init();

    info!("Starting quest builder test harness");

    let mut args = std::env::args().skip(1);
    let user_id = args.next().context("usage: server <user_id> [quests] [max_tasks]")?;
    let quests: usize = match args.next() {
        Some(n) => n.parse().context("quests must be a number")?,
        None => 3,
    };
    let max_tasks: usize = match args.next() {
        Some(n) => n.parse().context("max_tasks must be a number")?,
        None => 5,
    };

    let config = ProviderConfig::from_env();
    let settings = QuestSettings::from_env().context("Invalid quest settings")?;
    info!("Profile: {:?}, relevance: {:?}", settings.profile, settings.relevance);

    let providers = Providers::http(&config).context("Invalid provider configuration")?;
    let orchestrator =
        QuestOrchestrator::new(providers, settings).context("Failed to build orchestrator")?;

    info!("Requesting {} quests for user {} (max tasks: {})", quests, user_id, max_tasks);
    let result = orchestrator
        .build_profile_batch(&user_id, quests, max_tasks)
        .await
        .with_context(|| format!("Failed to build quests for user {}", user_id))?;

    info!("Received {} quests", result.len());
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
