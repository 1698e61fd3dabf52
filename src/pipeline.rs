//! End-to-end flow, from raw feeds to uploaded output partitions
//!
//! Each stage runs to completion before the next one starts, so a failure in
//! any stage aborts the run before any partition is written or uploaded.

use crate::{
    annotate, business,
    config::Config,
    keywords::{self, KeywordList},
    partition, persist,
    progress::{ProgressConfig, ProgressReport, Work},
    reviews,
    upload::ObjectStore,
    Result,
};
use anyhow::Context;
use std::path::{Path, PathBuf};

/// Run the whole pipeline, return the local paths of the output partitions
///
/// Outputs are uploaded to `store` if one is provided.
pub async fn run(
    config: &Config,
    store: Option<&impl ObjectStore>,
    report: &ProgressReport,
) -> Result<Vec<PathBuf>> {
    let retry = config.retry;
    let input = &config.input;

    // Load the food businesses
    let business_path: &Path = &input.business;
    let businesses = retry
        .run("loading businesses", move || business::load(business_path))
        .await
        .context("loading the business feed")?;
    let businesses = business::filter(businesses);

    // Stream the reviews of these businesses
    let reviews_path: &Path = &input.reviews;
    let food_businesses = &businesses[..];
    let chunk_size = input.chunk_size;
    let merged = retry
        .run("loading reviews", move || {
            reviews::load_and_merge(reviews_path, food_businesses, chunk_size, report)
        })
        .await
        .context("loading and joining the review feed")?;

    // Derive review features
    let annotated = annotate::annotate(merged).context("annotating reviews")?;
    let keywords_path: &Path = &input.keywords;
    let words = retry
        .run("loading keywords", move || keywords::load(keywords_path))
        .await
        .context("loading the keyword list")?;
    let keywords = KeywordList::new(words).context("preparing keywords for matching")?;
    let matched = keywords::match_all(annotated, &keywords, config.match_block, report);

    // Split the dataset, save each partition and upload it
    let partitions = partition::split(&matched, config.partitions);
    let writes = report.add(
        "Writing output partitions",
        ProgressConfig::new(Work::Steps(partitions.len())),
    );
    let mut outputs = Vec::with_capacity(partitions.len());
    for (idx, partition) in partitions.into_iter().enumerate() {
        let path = &config.partition_path(idx);
        let written = retry
            .run("writing a partition", move || persist::write_local(partition, path))
            .await
            .with_context(|| format!("writing output partition #{idx}"))?;
        if let (Some(store), Some(upload)) = (store, &config.upload) {
            let destination = &upload.partition_destination(idx);
            let written = &written;
            retry
                .run("uploading a partition", move || store.upload(written, destination))
                .await
                .with_context(|| format!("uploading output partition #{idx}"))?;
        }
        writes.make_progress(1);
        outputs.push(written);
    }

    // Upload the keyword list alongside the partitions
    if let (Some(store), Some(upload)) = (store, &config.upload) {
        let destination = &upload.side_file_destination(keywords_path);
        retry
            .run("uploading keywords", move || {
                store.upload(keywords_path, destination)
            })
            .await
            .context("uploading the keyword list")?;
    }
    Ok(outputs)
}
