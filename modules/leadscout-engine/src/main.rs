use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use leadscout_common::types::{Frequency, Pillar};
use leadscout_common::Config;
use leadscout_engine::discovery::DiscoveryRequest;
use leadscout_engine::{
    BudgetTracker, DiscoveryEngine, ProviderSet, ResearchPipeline, Scheduler, Services,
};
use leadscout_store::MemoryStore;

#[derive(Parser)]
#[command(name = "leadscout", about = "Research and outreach pipeline worker")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// User the workflow runs for.
    #[arg(long, global = true, default_value = "local")]
    user_id: String,
}

#[derive(Subcommand)]
enum Command {
    /// Run the research workflow for one topic.
    Research {
        topic: String,
        #[arg(long, default_value = "thought_leadership")]
        pillar: String,
        #[arg(long)]
        industry: Option<String>,
    },
    /// Discover prospects for one or more categories.
    Discover {
        #[arg(long, required = true, value_delimiter = ',')]
        categories: Vec<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long, default_value_t = 25)]
        max_results: usize,
    },
    /// Run due scheduled topics at a frequency.
    RunScheduled {
        #[arg(long, default_value = "daily")]
        frequency: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("leadscout=info".parse()?))
        .init();

    let cli = Cli::parse();

    let config = Config::engine_from_env();
    config.log_redacted();

    let budget = Arc::new(BudgetTracker::new(config.daily_budget_cents));
    let providers = Arc::new(ProviderSet::from_config(&config, budget.clone()));
    // Local runs use the in-process store; deployments wire a DocStore
    // backend here instead.
    let store = Arc::new(MemoryStore::new());
    let services = Services::new(store, providers, &config);

    match cli.command {
        Command::Research {
            topic,
            pillar,
            industry,
        } => {
            let pillar: Pillar = pillar
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?;
            let pipeline = ResearchPipeline::new(services);
            let insight = pipeline
                .complete_workflow(&cli.user_id, &topic, pillar, industry.as_deref())
                .await?;
            info!(
                insight_id = %insight.insight_id,
                sources = insight.sources.len(),
                targets = insight.prospect_targets.len(),
                "Research complete"
            );
            println!("{}", serde_json::to_string_pretty(&insight)?);
        }
        Command::Discover {
            categories,
            location,
            max_results,
        } => {
            let engine = DiscoveryEngine::new(services);
            let envelope = engine
                .discover(DiscoveryRequest {
                    user_id: cli.user_id.clone(),
                    categories,
                    location,
                    max_results,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        Command::RunScheduled { frequency } => {
            let frequency: Frequency = frequency
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?;
            let scheduler = Scheduler::new(services);
            let summary = scheduler.run_scheduled(&cli.user_id, frequency).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    budget.log_status();
    Ok(())
}
