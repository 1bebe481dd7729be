use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};

use pricelens::api::builder::{DEFAULT_DATASET_PATH, DEFAULT_PIPELINE_PATH, DEFAULT_VOCABULARY_PATH};
use pricelens::api::EstimatorBuilder;
use pricelens::models::FeatureRequest;
use pricelens::services::{
    BuildOutcome, ChartApiClient, MarketDataConfig, Staleness, StockViewer, VocabularyBuilder,
    DEFAULT_MARKET_DATA_URL,
};
use pricelens::utils::{format_date, init_logger, parse_date};

#[derive(Parser)]
#[command(name = "pricelens")]
#[command(about = "Used car price estimation and daily stock history lookup")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage the vocabulary document derived from the dataset
    Vocab {
        #[command(subcommand)]
        action: VocabAction,
        /// Cleaned dataset CSV
        #[arg(long, global = true, default_value = DEFAULT_DATASET_PATH)]
        dataset: PathBuf,
        /// Vocabulary document to write or inspect
        #[arg(long, global = true, default_value = DEFAULT_VOCABULARY_PATH)]
        output: PathBuf,
    },
    /// Estimate the price of one car described by a JSON file
    Predict {
        #[arg(long, default_value = DEFAULT_PIPELINE_PATH)]
        pipeline: PathBuf,
        #[arg(long, default_value = DEFAULT_VOCABULARY_PATH)]
        vocabulary: PathBuf,
        /// JSON file holding one car record
        #[arg(long)]
        record: PathBuf,
    },
    /// Estimate a price for every row of a CSV file
    PredictBatch {
        #[arg(long, default_value = DEFAULT_PIPELINE_PATH)]
        pipeline: PathBuf,
        #[arg(long, default_value = DEFAULT_VOCABULARY_PATH)]
        vocabulary: PathBuf,
        /// CSV file with the dataset column headers
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Show daily history for a ticker symbol
    Stock {
        #[arg(short, long)]
        symbol: String,
        /// Start date (YYYY-MM-DD), inclusive
        #[arg(long)]
        start: String,
        /// End date (YYYY-MM-DD), exclusive
        #[arg(long)]
        end: String,
        #[arg(long, default_value = DEFAULT_MARKET_DATA_URL)]
        base_url: String,
        /// Exchange time zone used to date the bars
        #[arg(long, default_value = "America/New_York")]
        timezone: String,
    },
}

#[derive(Subcommand, Clone, Copy)]
pub enum VocabAction {
    /// Write the document if it does not exist yet
    Build,
    /// Rebuild the document from the dataset
    Refresh,
    /// Report whether the document is missing, fresh or stale
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger()?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Vocab { action, dataset, output } => {
            let builder = VocabularyBuilder::new(dataset, output);
            match action {
                VocabAction::Build | VocabAction::Refresh => {
                    let outcome = match action {
                        VocabAction::Build => builder.build()?,
                        _ => builder.refresh()?,
                    };
                    let verb = match outcome {
                        BuildOutcome::Created => "Created",
                        BuildOutcome::AlreadyPresent => "Kept existing",
                        BuildOutcome::Refreshed => "Refreshed",
                    };
                    println!("{} {}", verb, builder.output_path().display());
                }
                VocabAction::Status => {
                    let status = match builder.status()? {
                        Staleness::Missing => "missing",
                        Staleness::Fresh => "fresh",
                        Staleness::Stale => "stale",
                    };
                    println!("{}: {}", builder.output_path().display(), status);
                }
            }
        }
        Commands::Predict { pipeline, vocabulary, record } => {
            let estimator = EstimatorBuilder::new()
                .with_pipeline_path(pipeline)
                .with_vocabulary_path(vocabulary)
                .with_auto_build(false)
                .build()?;

            let content = fs::read_to_string(&record).with_context(|| format!("reading {}", record.display()))?;
            let request: FeatureRequest =
                serde_json::from_str(&content).with_context(|| format!("parsing {}", record.display()))?;

            let estimate = estimator.estimate(&request)?;
            println!("Predicted price: {}", estimate.formatted);
        }
        Commands::PredictBatch { pipeline, vocabulary, input } => {
            let estimator = EstimatorBuilder::new()
                .with_pipeline_path(pipeline)
                .with_vocabulary_path(vocabulary)
                .with_auto_build(false)
                .build()?;

            let mut reader = csv::Reader::from_path(&input).with_context(|| format!("opening {}", input.display()))?;
            let requests = reader
                .deserialize::<FeatureRequest>()
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("parsing {}", input.display()))?;

            for (row, result) in estimator.estimate_batch(&requests).into_iter().enumerate() {
                match result {
                    Ok(estimate) => println!("{}\t{}", row + 1, estimate.formatted),
                    Err(e) => println!("{}\terror: {}", row + 1, e),
                }
            }
        }
        Commands::Stock { symbol, start, end, base_url, timezone } => {
            let tz: Tz = timezone.parse().map_err(|e| anyhow!("invalid time zone '{}': {}", timezone, e))?;
            let start = parse_date(&start)?;
            let end = parse_date(&end)?;

            let client = ChartApiClient::new(MarketDataConfig {
                base_url,
                ..MarketDataConfig::default()
            })?;
            let viewer = StockViewer::new(Arc::new(client), tz);
            let view = viewer.view(&symbol, start, end).await?;

            println!("{}", view.title);
            if view.is_empty() {
                println!("No data for {} between {} and {}", view.symbol, format_date(start), format_date(end));
                return Ok(());
            }

            println!("{:<12} {:>12} {:>12} {:>12} {:>12} {:>14}", "Date", "Open", "High", "Low", "Close", "Volume");
            for bar in &view.bars {
                println!(
                    "{:<12} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>14}",
                    format_date(bar.date),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume
                );
            }

            for series in [&view.volume, &view.close] {
                if let Some((low, high)) = series.min_max() {
                    println!("{}: {} points, min {:.2}, max {:.2}", series.title, series.points.len(), low, high);
                }
            }
        }
    }

    Ok(())
}
