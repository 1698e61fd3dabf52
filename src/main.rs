//! This program curates the Yelp open dataset into a dataset of reviews of US
//! food businesses, annotated with sentiment labels and dietary keyword
//! matches, and partitioned into Parquet files for downstream storage. The
//! dataset's general documentation can be found at
//! <https://www.yelp.com/dataset/documentation/main>.

mod annotate;
mod business;
mod config;
mod error;
mod jsonl;
mod keywords;
mod partition;
mod persist;
mod pipeline;
mod progress;
mod records;
mod retry;
mod reviews;
mod upload;

use crate::{config::Config, progress::ProgressReport, upload::LocalObjectStore};
use clap::Parser;
use log::LevelFilter;
use std::{
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
};

/// Turn the raw Yelp business and review feeds into partitioned Parquet files
/// of annotated food business reviews
///
/// Only reviews of food-related businesses from the USA are kept. Each
/// review is labeled with a sentiment derived from its rating, and with the
/// keywords from a user-provided list that appear in its text.
#[derive(Parser, Debug)]
#[command(version, author)]
struct Args {
    /// Line-delimited JSON business feed, possibly gzipped
    #[arg(long, default_value = "data/yelp_academic_dataset_business.json")]
    business: PathBuf,

    /// Line-delimited JSON review feed, possibly gzipped
    #[arg(long, default_value = "data/yelp_academic_dataset_review.json")]
    reviews: PathBuf,

    /// CSV file listing the keywords to look for, in a `word` column
    #[arg(long, default_value = "data/veg_words.csv")]
    keywords: PathBuf,

    /// Directory where output partitions are written
    #[arg(short, long, default_value = "data/reviews")]
    output_dir: PathBuf,

    /// Number of reviews that are loaded and joined at once
    ///
    /// The review feed is much larger than the subset of it that we keep, so
    /// it is not loaded all at once. Instead it is read in chunks of this many
    /// reviews, and each chunk is joined with the food businesses before the
    /// next one is read. Lower values reduce peak memory usage.
    #[arg(long, default_value = "500000")]
    chunk_size: NonZeroUsize,

    /// Number of output partitions
    #[arg(short, long, default_value = "4")]
    partitions: NonZeroUsize,

    /// Number of reviews per parallel keyword matching task
    ///
    /// This is a tunable parameter, which should be adjusted until optimal
    /// performance is observed. If it is set too low, constant overheads for
    /// spawning parallel tasks will not be properly amortized. But if it is set
    /// too high, parallel load balancing will be less effective.
    #[arg(long, default_value = "500")]
    match_block: NonZeroUsize,

    /// Number of attempts at each I/O operation before giving up
    #[arg(long, default_value = "3")]
    retries: NonZeroU32,

    /// Delay between two attempts at an I/O operation, in milliseconds
    #[arg(long, default_value = "1000")]
    retry_delay_ms: u64,

    /// Directory acting as the object store where outputs are uploaded
    ///
    /// Outputs are only written locally if this is not specified.
    #[arg(short, long)]
    upload_root: Option<PathBuf>,

    /// Destination prefix of uploaded files inside of the object store
    #[arg(long, default_value = "yelp_project/data")]
    upload_prefix: Box<str>,
}
//
impl Args {
    /// Decode and validate CLI arguments
    pub fn parse_and_check() -> Result<Self> {
        // Decode CLI arguments
        let args = Args::parse();

        // Check CLI arguments for basic sanity
        anyhow::ensure!(
            !args.upload_prefix.starts_with('/'),
            "upload prefix should be relative to the object store root"
        );
        Ok(args)
    }
}
//
#[tokio::main]
async fn main() -> Result<()> {
    // Set up logging
    setup_logging().map_err(|e| anyhow::format_err!("{e}"))?;

    // Decode CLI arguments
    let config = Config::new(Args::parse_and_check()?);
    log::info!("Starting with {config:?}");

    // Set up progress reporting and output uploads
    let report = ProgressReport::new();
    let store = (config.upload.as_ref()).map(|upload| LocalObjectStore::new(&upload.root));

    // Run the pipeline
    let outputs = pipeline::run(&config, store.as_ref(), &report).await?;
    for output in outputs {
        println!("{}", output.display());
    }
    Ok(())
}

/// Use anyhow for Result type erasure
pub use anyhow::Result;

/// Set up logging
fn setup_logging() -> syslog::Result<()> {
    syslog::init(
        syslog::Facility::LOG_USER,
        if cfg!(feature = "log-trace") {
            LevelFilter::Trace
        } else if cfg!(debug_assertions) {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        },
        None,
    )
}
