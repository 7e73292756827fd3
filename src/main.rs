//! CEDmate Analytics CLI
//!
//! Command-line caller for the analytics pipeline:
//! - Generate charts for a user
//! - Export the consolidated PDF report
//! - Dump a raw category table as CSV
//! - Print a default config file

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cedmate_analytics::config::{generate_default_config, Config, ConfigError, LoggingConfig};
use cedmate_analytics::{
    build_store, AnalyticsEngine, ArtifactStore, Category, CategoryOutcome, RecordFetcher,
    ReportExporter,
};

#[derive(Parser)]
#[command(name = "cedmate-analytics")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Charts and PDF exports for CEDmate health logs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the usual locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate all category charts for a user
    Analytics {
        /// Firebase UID of the user (users/<uid>/...)
        #[arg(short, long)]
        user: String,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export the PDF report for a user
    Export {
        /// Firebase UID of the user
        #[arg(short, long)]
        user: String,
    },

    /// Dump one category's raw table as CSV
    Table {
        /// Firebase UID of the user
        #[arg(short, long)]
        user: String,
        /// Category (bowel-movement, mood, symptom, meal)
        #[arg(long)]
        category: Category,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        return write_default_config(output.as_deref());
    }

    // Logging settings live in the config, so loading it logs through a
    // temporary subscriber.
    let bootstrap = bootstrap_subscriber(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        std::io::stderr,
    );
    let config = tracing::subscriber::with_default(bootstrap, || {
        load_config(cli.config.as_deref())
    })
    .context("Failed to load config")?;
    init_logging(&config.logging);

    tracing::info!("CEDmate Analytics v{}", env!("CARGO_PKG_VERSION"));

    let store = build_store(&config.store)
        .await
        .context("Failed to set up the document store")?;

    match cli.command {
        Commands::Analytics { user, json } => {
            let artifacts = Arc::new(ArtifactStore::new(&config.output.dir));
            let engine = AnalyticsEngine::new(store, artifacts, &config.analytics);
            let result = engine
                .generate(&user)
                .await
                .with_context(|| format!("Analytics failed for user '{}'", user))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result.to_json())?);
            } else {
                println!("Analytics complete.");
                for (category, outcome) in result.iter() {
                    match outcome {
                        CategoryOutcome::Rendered(artifact) => {
                            println!("  {}: {}", category, artifact.path.display())
                        }
                        CategoryOutcome::Absent => println!("  {}: no output", category),
                        CategoryOutcome::Failed(reason) => {
                            println!("  {}: failed ({})", category, reason)
                        }
                    }
                }
            }
        }

        Commands::Export { user } => {
            let artifacts = Arc::new(ArtifactStore::new(&config.output.dir));
            let engine = Arc::new(AnalyticsEngine::new(store, artifacts, &config.analytics));
            let exporter = ReportExporter::new(engine, &config.analytics);

            let summary = exporter
                .export(&user)
                .await
                .with_context(|| format!("Export failed for user '{}'", user))?;

            println!(
                "PDF created: {} ({} pages, {} charts)",
                summary.path.display(),
                summary.pages.len(),
                summary.chart_pages()
            );
        }

        Commands::Table {
            user,
            category,
            output,
        } => {
            let table = RecordFetcher::new(store)
                .fetch(category, &user)
                .await
                .with_context(|| format!("Failed to fetch {} for user '{}'", category, user))?;

            match output {
                Some(path) => {
                    let file = std::fs::File::create(&path)
                        .with_context(|| format!("Failed to create {:?}", path))?;
                    table.write_csv(file)?;
                    println!("Wrote {} rows to {:?}", table.row_count(), path);
                }
                None => table.write_csv(std::io::stdout().lock())?,
            }
        }

        Commands::Config { output } => write_default_config(output.as_deref())?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => {
            let config = Config::load_with_env(path)?;
            tracing::info!("Loaded config from {:?}", path);
            Ok(config)
        }
        None => Ok(Config::load_default()),
    }
}

/// Subscriber used until the configured one is installed
fn bootstrap_subscriber<W>(
    filter: tracing_subscriber::EnvFilter,
    make_writer: W,
) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(make_writer)
        .finish()
}

fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn write_default_config(output: Option<&std::path::Path>) -> anyhow::Result<()> {
    let config = generate_default_config();

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &config)
                .with_context(|| format!("Failed to write config to {:?}", path))?;
            println!("Config written to {:?}", path);
        }
        None => print!("{}", config),
    }
    Ok(())
}
