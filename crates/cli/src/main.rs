use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use pipeline::UnknownCrowd;
use providers::{ProviderConfig, base_url};
use quest_model::Quest;
use server::{DegradedBuild, Providers, QuestOrchestrator, QuestSettings, RelevanceMode};
use std::time::{Duration, Instant};
use tracing::info;

/// Quest Builder - museum quests from nearby collections
#[derive(Parser)]
#[command(name = "quest-builder")]
#[command(about = "Build artwork-visit quests for users of the museum network", long_about = None)]
struct Cli {
    /// Print quests as JSON instead of the human-readable listing
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    upstream: UpstreamArgs,

    #[command(flatten)]
    tuning: TuningArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Upstream addresses; unset values fall back to the `*_SVC_NAME` variables
#[derive(Args)]
struct UpstreamArgs {
    /// Point every upstream at one base URL (a gateway or a mock)
    #[arg(long, global = true, env = "QUEST_UPSTREAM")]
    upstream: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value = "30")]
    timeout_secs: u64,
}

#[derive(Args)]
struct TuningArgs {
    /// How museums and artworks are matched against preferences
    #[arg(long, global = true, value_enum)]
    relevance: Option<Relevance>,

    /// Ask the chat service for quest titles and descriptions
    #[arg(long, global = true)]
    generate_text: bool,

    /// Crowd penalty coefficient (values below 1 are raised to 1)
    #[arg(long, global = true, env = "CROWD_PENALTY")]
    penalty: Option<f64>,

    /// Where museums with unknown crowd status go in the tour
    #[arg(long, global = true, value_enum, default_value = "no-penalty")]
    unknown_crowd: UnknownCrowdArg,

    /// Query the catalog even when the search window is a single point
    #[arg(long, global = true)]
    tolerate_point: bool,

    /// Upper bound on concurrent quest builds
    #[arg(long, global = true, env = "QUEST_MAX_WORKERS")]
    max_workers: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Relevance {
    Tags,
    Chat,
}

#[derive(Clone, Copy, ValueEnum)]
enum UnknownCrowdArg {
    NoPenalty,
    RankLast,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a quest for one museum
    Single {
        #[arg(long)]
        user_id: String,

        #[arg(long)]
        museum_id: String,

        /// Maximum number of tasks in the quest
        #[arg(long, default_value = "5")]
        max_tasks: usize,
    },

    /// Build quests for museums around the user, in visiting order
    Batch {
        #[arg(long)]
        user_id: String,

        /// Number of quests wanted
        #[arg(long, default_value = "3")]
        quests: usize,

        #[arg(long, default_value = "5")]
        max_tasks: usize,

        /// Also list the museums whose build was dropped
        #[arg(long)]
        report: bool,
    },

    /// Build the featured-event quest
    Featured {
        #[arg(long)]
        user_id: String,

        #[arg(long, default_value = "5")]
        max_tasks: usize,

        /// Featured museum name (defaults to NDR_MUSEUM_NAME or the event name)
        #[arg(long)]
        museum_name: Option<String>,
    },

    /// Build placeholder quests without contacting any upstream
    Placeholder {
        #[arg(long, default_value = "3")]
        quests: usize,

        #[arg(long, default_value = "5")]
        max_tasks: usize,
    },

    /// Build whatever the deployment profile selects (standard, featured or placeholder)
    Profile {
        #[arg(long)]
        user_id: String,

        #[arg(long, default_value = "3")]
        quests: usize,

        #[arg(long, default_value = "5")]
        max_tasks: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = provider_config(&cli.upstream);
    let mut settings = QuestSettings::from_env().context("Invalid quest settings in environment")?;
    apply_tuning(&mut settings, &cli.tuning);
    if let Commands::Featured {
        museum_name: Some(name),
        ..
    } = &cli.command
    {
        settings.featured.museum_name = name.clone();
    }

    let providers = Providers::http(&config).context("Invalid upstream configuration")?;
    let orchestrator =
        QuestOrchestrator::new(providers, settings).context("Failed to set up quest pipeline")?;

    let start = Instant::now();
    match cli.command {
        Commands::Single {
            user_id,
            museum_id,
            max_tasks,
        } => {
            let quest = orchestrator
                .build_single_quest(&user_id, &museum_id, max_tasks)
                .await
                .with_context(|| format!("Failed to build quest for museum {}", museum_id))?;
            print_quests(&[quest], cli.json)?;
        }
        Commands::Batch {
            user_id,
            quests,
            max_tasks,
            report,
        } => {
            let batch = orchestrator
                .build_quest_batch_report(&user_id, quests, max_tasks)
                .await
                .with_context(|| format!("Failed to build quests for user {}", user_id))?;
            if report && cli.json {
                println!("{}", serde_json::to_string_pretty(&batch)?);
            } else {
                print_quests(&batch.quests, cli.json)?;
                if report {
                    print_degraded(&batch.degraded);
                }
            }
        }
        Commands::Featured {
            user_id, max_tasks, ..
        } => {
            let quests = orchestrator
                .build_featured_quest(&user_id, max_tasks)
                .await
                .context("Failed to build featured quest")?;
            print_quests(&quests, cli.json)?;
        }
        Commands::Placeholder { quests, max_tasks } => {
            let quests = orchestrator.build_placeholder_batch(quests, max_tasks).await;
            print_quests(&quests, cli.json)?;
        }
        Commands::Profile {
            user_id,
            quests,
            max_tasks,
        } => {
            info!("Profile: {:?}", orchestrator.settings().profile);
            let quests = orchestrator
                .build_profile_batch(&user_id, quests, max_tasks)
                .await
                .with_context(|| format!("Failed to build quests for user {}", user_id))?;
            print_quests(&quests, cli.json)?;
        }
    }

    if !cli.json {
        println!("{} Done in {:?}", "✓".green(), start.elapsed());
    }
    Ok(())
}

/// Environment defaults, then command-line overrides
fn provider_config(args: &UpstreamArgs) -> ProviderConfig {
    let mut config = ProviderConfig::from_env().with_timeout(Duration::from_secs(args.timeout_secs));
    if let Some(upstream) = &args.upstream {
        let base = base_url(upstream);
        config.user_url = base.clone();
        config.location_url = base.clone();
        config.museum_url = base.clone();
        config.artwork_url = base.clone();
        config.routing_url = base.clone();
        config.crowd_url = base.clone();
        config.chat_url = base;
    }
    config
}

fn apply_tuning(settings: &mut QuestSettings, tuning: &TuningArgs) {
    if let Some(relevance) = tuning.relevance {
        settings.relevance = match relevance {
            Relevance::Tags => RelevanceMode::Tags,
            Relevance::Chat => RelevanceMode::Chat,
        };
    }
    if tuning.generate_text {
        settings.generate_text = true;
    }
    if let Some(penalty) = tuning.penalty {
        settings.penalty_coefficient = penalty;
    }
    settings.unknown_crowd = match tuning.unknown_crowd {
        UnknownCrowdArg::NoPenalty => UnknownCrowd::NoPenalty,
        UnknownCrowdArg::RankLast => UnknownCrowd::RankLast,
    };
    settings.point_query_tolerated |= tuning.tolerate_point;
    if tuning.max_workers.is_some() {
        settings.max_workers = tuning.max_workers;
    }
}

fn print_quests(quests: &[Quest], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(quests)?);
        return Ok(());
    }

    if quests.is_empty() {
        println!("{}", "No quests available".yellow());
        return Ok(());
    }

    println!("{}", "Quests:".bold().blue());
    for (rank, quest) in quests.iter().enumerate() {
        let title = if quest.title.is_empty() {
            "(untitled)"
        } else {
            quest.title.as_str()
        };
        println!(
            "{}. {} [museum {}] {} tasks",
            (rank + 1).to_string().green(),
            title.bold(),
            quest.museum_id,
            quest.tasks.len()
        );
        if !quest.description.is_empty() {
            println!("   {}", quest.description.dimmed());
        }

        let mut tasks: Vec<_> = quest.tasks.iter().collect();
        tasks.sort_by(|a, b| a.artwork_id.cmp(&b.artwork_id));
        for task in tasks {
            println!("   {}{} ({})", "• ".cyan(), task.title, task.artwork_id);
        }
    }
    Ok(())
}

fn print_degraded(degraded: &[DegradedBuild]) {
    if degraded.is_empty() {
        return;
    }
    println!("{}", "Dropped museums:".bold().red());
    for entry in degraded {
        println!("   {}{}: {}", "• ".red(), entry.museum_id, entry.reason);
    }
}
