use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info, warn};

use leadflow::config::AppConfig;
use leadflow::logging;
use leadflow::pipeline::enrich::create_enricher;
use leadflow::pipeline::orchestrator::LeadPipeline;
use leadflow::pipeline::resolve::StakeholderResolver;
use leadflow::pipeline::scoring::Rubric;
use leadflow::report;
use leadflow::store::{self, InMemoryStore};

#[derive(Parser)]
#[command(name = "leadflow")]
#[command(about = "Lead qualification pipeline for industry-event exhibitor data")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and persist the company feed without enriching or scoring
    Source {
        /// Path to the raw exhibitor feed (JSON array)
        #[arg(long)]
        input: PathBuf,
        /// Event name applied to records that carry none
        #[arg(long, default_value = "ISA Sign Expo 2025")]
        event: String,
        /// Path to the pipeline configuration
        #[arg(long, default_value = "config.toml")]
        config: String,
    },
    /// Run the full pipeline: source, enrich, resolve, score, emit
    Run {
        /// Path to the raw exhibitor feed (JSON array)
        #[arg(long)]
        input: PathBuf,
        /// Event name applied to records that carry none
        #[arg(long, default_value = "ISA Sign Expo 2025")]
        event: String,
        /// Path to the pipeline configuration
        #[arg(long, default_value = "config.toml")]
        config: String,
        /// Override the configured enrichment provider
        #[arg(long)]
        provider: Option<String>,
        /// How many leads to print after the run
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Source {
            input,
            event,
            config,
        } => {
            let config = AppConfig::load(&config)?;
            let output_dir = Path::new(&config.pipeline.output_dir);

            println!("📥 Sourcing companies from {}...", input.display());
            let outcome = store::load_companies(&input, &event)?;
            let path = store::persist_companies(&outcome.companies, output_dir)?;

            println!("✅ Sourced {} companies", outcome.companies.len());
            if !outcome.skipped.is_empty() {
                warn!("{} records skipped during sourcing", outcome.skipped.len());
                println!("⚠️  Skipped {} malformed records:", outcome.skipped.len());
                for reason in &outcome.skipped {
                    println!("   - {reason}");
                }
            }
            println!("💾 Saved companies to {}", path.display());
        }
        Commands::Run {
            input,
            event,
            config,
            provider,
            top,
        } => {
            let mut config = AppConfig::load(&config)?;
            if let Some(provider) = provider {
                config.enrichment.provider = provider;
            }
            let output_dir = PathBuf::from(&config.pipeline.output_dir);

            // A misconfigured rubric must fail here, before any scoring
            let rubric = match Rubric::from_config(&config.rubric) {
                Ok(rubric) => rubric,
                Err(e) => {
                    error!("Rubric rejected: {}", e);
                    println!("❌ Rubric rejected: {e}");
                    std::process::exit(1);
                }
            };
            let enricher = create_enricher(&config.enrichment)?;
            let resolver = StakeholderResolver::new(&config.roles);
            let pipeline = LeadPipeline::new(
                Arc::new(InMemoryStore::new()),
                enricher,
                resolver,
                rubric,
            );

            // Ctrl-C aborts after the current stage completes
            let cancel = pipeline.cancel_handle();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, finishing the current stage");
                    cancel.store(true, Ordering::SeqCst);
                }
            });

            println!("🚀 Running lead qualification pipeline...");
            let summary = pipeline.run(&input, &event, &output_dir).await?;
            report::write_summary(&summary, &output_dir)?;

            if summary.cancelled {
                println!("⛔ Run cancelled; no leads were emitted");
                return Ok(());
            }

            info!("Pipeline finished");
            println!("\n📊 Run summary:");
            println!("   Companies sourced: {}", summary.companies_sourced);
            println!("   Records skipped: {}", summary.skipped_records.len());
            println!("   Enriched: {}", summary.enriched);
            println!("   Enrichment failures: {}", summary.enrichment_failed);
            println!("   Stakeholders: {}", summary.stakeholders_found);
            println!("   Leads emitted: {}", summary.leads_emitted);
            if let Some(output_file) = &summary.output_file {
                println!("   Output file: {output_file}");
            }
            if !summary.errors.is_empty() {
                println!("\n⚠️  Degraded records:");
                for e in &summary.errors {
                    println!("   - {e}");
                }
            }

            if summary.leads_emitted > 0 {
                let leads: Vec<leadflow::domain::ScoredLead> = serde_json::from_str(
                    &std::fs::read_to_string(output_dir.join("scored_leads.json"))?,
                )?;
                println!("\n🏆 Top leads:");
                print!("{}", report::render_top_leads(&leads, top));
            }
        }
    }
    Ok(())
}
