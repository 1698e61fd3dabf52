//! Processing pipeline configuration

use crate::{retry::RetryPolicy, Args};
use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

/// Final process configuration
///
/// This is the digested form of [`Args`]. Please refer to [`Args`] to know
/// more about individual fields.
#[allow(missing_docs)]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Config {
    /// Subset of the configuration that affects which data is loaded
    pub input: InputConfig,

    /// Directory where output partitions are written
    pub output_dir: PathBuf,

    // Other fields have the same meaning as in Args
    pub partitions: NonZeroUsize,
    pub match_block: NonZeroUsize,
    pub upload: Option<UploadConfig>,

    /// Retry policy of I/O operations
    pub retry: RetryPolicy,
}
//
impl Config {
    /// Determine process configuration from CLI arguments
    pub(crate) fn new(args: Args) -> Arc<Self> {
        let Args {
            business,
            reviews,
            keywords,
            output_dir,
            chunk_size,
            partitions,
            match_block,
            retries,
            retry_delay_ms,
            upload_root,
            upload_prefix,
        } = args;
        Arc::new(Self {
            input: InputConfig {
                business,
                reviews,
                keywords,
                chunk_size,
            },
            output_dir,
            partitions,
            match_block,
            upload: upload_root.map(|root| UploadConfig {
                root,
                prefix: upload_prefix,
            }),
            retry: RetryPolicy {
                max_attempts: retries,
                delay: Duration::from_millis(retry_delay_ms),
            },
        })
    }

    /// Local path of the `index`-th output partition
    pub fn partition_path(&self, index: usize) -> PathBuf {
        self.output_dir.join(partition_file_name(index))
    }
}

/// Name of the file where the `index`-th output partition is stored
pub fn partition_file_name(index: usize) -> String {
    format!("reviews_{index}.parquet")
}

/// Subset of the configuration that affects which data is loaded
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct InputConfig {
    /// Line-delimited JSON business feed
    pub business: PathBuf,

    /// Line-delimited JSON review feed
    pub reviews: PathBuf,

    /// CSV list of keywords to look for in review text
    pub keywords: PathBuf,

    /// Number of reviews that are loaded and joined at once
    pub chunk_size: NonZeroUsize,
}

/// Where output files should be uploaded
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct UploadConfig {
    /// Root of the object store
    pub root: PathBuf,

    /// Destination prefix inside of the object store
    pub prefix: Box<str>,
}
//
impl UploadConfig {
    /// Destination of an output partition
    pub fn partition_destination(&self, index: usize) -> String {
        format!("{}/reviews/{}", self.prefix, partition_file_name(index))
    }

    /// Destination of a file that is uploaded next to the partitions
    pub fn side_file_destination(&self, local: &Path) -> String {
        let name = local
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();
        format!("{}/{name}", self.prefix)
    }
}
