//! fraudflow CLI - train, serve, and inspect the fraud-detection pipeline.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fraudflow::config::PipelineConfig;
use fraudflow::pipeline::{PipelineOrchestrator, RunOptions};
use fraudflow::serve::{FeatureRecord, InferenceContext};
use fraudflow::store::{layout, ArtifactStore};
use fraudflow::testing::TransactionGenerator;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "fraudflow")]
#[command(version)]
#[command(about = "Fraud-detection model training pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = fraudflow::config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the training pipeline end to end
    Train {
        /// Record the run to the configured tracking sinks
        #[arg(long)]
        use_tracking: bool,

        /// Retrain even when model artifacts already exist
        #[arg(long)]
        force_retrain: bool,
    },

    /// Score a single transaction record
    Predict {
        /// Path to a JSON object mapping feature names to numbers
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Generate a synthetic transaction dataset
    Generate {
        /// Number of rows to generate
        #[arg(long, default_value = "10000")]
        rows: usize,

        /// Path of the CSV file to write
        #[arg(short, long)]
        out: PathBuf,

        /// Fraction of rows labelled fraud
        #[arg(long, default_value = "0.001")]
        fraud_rate: f64,

        /// RNG seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Check the artifact directory tree and report which artifacts exist
    Doctor,

    /// Validate configuration file
    Validate,

    /// Show example configuration
    Example,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: logging already initialized");
    }
}

fn load_config(path: &PathBuf) -> Result<PipelineConfig> {
    PipelineConfig::from_file(path)
        .with_context(|| format!("Failed to load config from {path:?}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Example => {
            println!("{}", PipelineConfig::example_toml());
            return Ok(());
        }

        Commands::Validate => {
            let config = load_config(&cli.config)?;
            info!("Configuration is valid");
            if let Some(ingestion) = &config.ingestion {
                info!(
                    "  Sources: {} file(s) under '{}'",
                    ingestion.source_files.len(),
                    ingestion.source_location
                );
            }
            info!("  Artifact root: {}", config.artifacts.root.display());
            info!("  Test fraction: {}", config.processing.test_fraction);
            info!("  Remote mirror: {}", config.remote.is_some());
            info!("  Tracking: {}", config.tracking.is_some());
            return Ok(());
        }

        Commands::Train {
            use_tracking,
            force_retrain,
        } => {
            let config = load_config(&cli.config)?;
            let orchestrator =
                PipelineOrchestrator::from_config(config).context("Failed to build pipeline")?;

            let options = RunOptions {
                use_experiment_tracking: use_tracking,
                force_retrain,
            };
            let outcome = orchestrator.run(options).await?;

            println!("\n=== Training Run Complete ===");
            println!("Run:       {}", outcome.run_id);
            println!("Duration:  {} ms", outcome.duration_ms);
            if outcome.skipped {
                println!("Skipped:   model artifacts already exist (use --force-retrain)");
            }
            for report in &outcome.reports {
                println!(
                    "  {:<12} {:?} ({} ms)",
                    report.stage.to_string(),
                    report.status,
                    report.duration_ms
                );
            }
            if let Some(evaluation) = &outcome.evaluation {
                println!("Accuracy:  {:.4}", evaluation.accuracy);
                match evaluation.roc_auc {
                    Some(auc) => println!("ROC-AUC:   {auc:.4}"),
                    None => println!("ROC-AUC:   n/a"),
                }
            }
            for warning in &outcome.warnings {
                println!("Warning:   [{}] {}", warning.sink, warning.message);
            }
        }

        Commands::Predict { input } => {
            let config = load_config(&cli.config)?;
            let store = Arc::new(
                ArtifactStore::open(&config.artifacts.root)
                    .context("Failed to open artifact store")?,
            );
            let context =
                InferenceContext::load(store).context("Failed to load model artifacts")?;

            let raw = std::fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {input:?}"))?;
            let object: serde_json::Map<String, serde_json::Value> =
                serde_json::from_str(&raw).context("Input must be a JSON object")?;

            let mut pairs = Vec::with_capacity(object.len());
            for (name, value) in object {
                let number = value
                    .as_f64()
                    .with_context(|| format!("Feature '{name}' is not a number"))?;
                pairs.push((name, number));
            }

            let record = FeatureRecord::new(pairs).arranged(&context.schema())?;
            let prediction = context.predict(&record)?;
            println!("{}", serde_json::to_string_pretty(&prediction)?);
        }

        Commands::Generate {
            rows,
            out,
            fraud_rate,
            seed,
        } => {
            let table = TransactionGenerator::new(rows)
                .with_fraud_rate(fraud_rate)
                .with_seed(seed)
                .build()
                .context("Failed to generate dataset")?;
            let bytes = table.to_csv_bytes().context("Failed to render CSV")?;

            if let Some(parent) = out.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create {parent:?}"))?;
                }
            }
            std::fs::write(&out, bytes).with_context(|| format!("Failed to write {out:?}"))?;

            println!("Created sample data: {}", out.display());
            println!("  Rows:  {rows}");
            println!("  Fraud: {:.3}%", fraud_rate * 100.0);
        }

        Commands::Doctor => {
            let config = load_config(&cli.config)?;
            let store = ArtifactStore::open(&config.artifacts.root)
                .context("Failed to open artifact store")?;

            println!("Artifact root: {}", store.root().display());
            let artifacts = [
                layout::COMBINED_RAW,
                layout::DATASET,
                layout::SCALER,
                layout::FEATURE_NAMES,
                layout::BASELINE_MODEL,
                layout::BEST_MODEL,
                layout::EVALUATION_RESULTS,
                layout::CLASSIFICATION_REPORT,
                layout::CONFUSION_MATRIX,
            ];
            for name in artifacts {
                if store.exists(name) {
                    let size = std::fs::metadata(store.path_of(name))
                        .map(|m| m.len())
                        .unwrap_or(0);
                    println!("  [ok]      {name} ({size} bytes)");
                } else {
                    println!("  [missing] {name}");
                }
            }
            if !store.has_model_artifacts() {
                println!("\nModel artifacts are incomplete; run: fraudflow train");
            }
        }
    }

    Ok(())
}
