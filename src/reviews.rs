//! Chunked loading of the review feed and joining with food businesses
//!
//! The review feed is too large to be loaded in one go, so it is read in
//! chunks of bounded size. Each chunk is joined with the filtered businesses
//! right away, which discards most reviews early on, and only the join output
//! is kept in memory.

use crate::{
    error::PipelineError,
    jsonl::JsonLines,
    progress::{ProgressConfig, ProgressReport, Work},
    records::{FilteredBusiness, MergedRecord, Review, ReviewRecord},
};
use std::{collections::HashMap, num::NonZeroUsize, path::Path, sync::Arc};

/// Stream reviews from a line-delimited JSON feed, keeping those which are
/// about one of the specified `businesses`
///
/// Results are ordered by input chunk, then within each chunk in the order
/// of [`join_chunk()`].
pub async fn load_and_merge(
    path: &Path,
    businesses: &[Arc<FilteredBusiness>],
    chunk_size: NonZeroUsize,
    report: &ProgressReport,
) -> Result<Vec<MergedRecord>, PipelineError> {
    let chunks = report.add(
        "Loading and joining review chunks",
        ProgressConfig::new(Work::Steps(0)).allow_adding_work(),
    );
    let mut reviews = JsonLines::<ReviewRecord>::open(path).await?;
    let mut merged = Vec::new();
    let mut num_reviews = 0;
    let mut chunk_idx = 0;
    loop {
        let chunk = reviews.next_chunk(chunk_size).await?;
        if chunk.is_empty() {
            break;
        }
        chunks.add_work(1);
        num_reviews += chunk.len();
        let chunk_len = chunk.len();
        let joined = join_chunk(businesses, chunk);
        log::debug!(
            "Review chunk #{chunk_idx}: kept {} reviews out of {chunk_len}",
            joined.len()
        );
        merged.extend(joined);
        chunks.make_progress(1);
        chunk_idx += 1;
    }
    chunks.done_adding_work();
    log::info!(
        "Kept {} reviews of food businesses out of {num_reviews} reviews from {}",
        merged.len(),
        path.display()
    );
    Ok(merged)
}

/// Inner join of a chunk of reviews with a set of businesses
///
/// Output is ordered by business, in the order of `businesses`, then by order
/// of appearance within the chunk. Reviews about other businesses are
/// discarded.
pub fn join_chunk(
    businesses: &[Arc<FilteredBusiness>],
    chunk: Vec<ReviewRecord>,
) -> Vec<MergedRecord> {
    // Group the reviews of this chunk by business
    let mut reviews_by_business = HashMap::<Box<str>, Vec<Review>>::new();
    for record in chunk {
        let review = Review::from(record);
        reviews_by_business
            .entry(review.business_id.clone())
            .or_default()
            .push(review);
    }

    // Walk through businesses, emitting their reviews
    let mut merged = Vec::new();
    for business in businesses {
        let Some(reviews) = reviews_by_business.get(&business.business_id) else {
            continue;
        };
        merged.extend(reviews.iter().map(|review| MergedRecord {
            business: business.clone(),
            review: review.clone(),
        }));
    }
    if log::log_enabled!(log::Level::Trace) {
        for (business_id, reviews) in &reviews_by_business {
            if !businesses.iter().any(|b| b.business_id == *business_id) {
                log::trace!(
                    "Discarded {} review(s) of non-food business {business_id}",
                    reviews.len()
                );
            }
        }
    }
    merged
}
