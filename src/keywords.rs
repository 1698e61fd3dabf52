//! Whole-word keyword matching over cleansed review text
//!
//! This is the most CPU-intensive part of the pipeline, as every keyword is
//! looked up in every review, so it is spread across the rayon thread pool.

use crate::{
    error::PipelineError,
    progress::{ProgressConfig, ProgressReport, Work},
    records::{AnnotatedRecord, MatchedRecord},
};
use csv_async::AsyncReaderBuilder;
use futures::StreamExt;
use rayon::prelude::*;
use regex::Regex;
use serde::Deserialize;
use std::{num::NonZeroUsize, path::Path};
use tokio::fs::File;

/// Row of the keyword CSV file
#[derive(Debug, Deserialize)]
struct KeywordRow {
    /// Lowercase keyword
    word: Box<str>,
}

/// Load the keywords from a CSV file with a `word` column
pub async fn load(path: &Path) -> Result<Vec<Box<str>>, PipelineError> {
    let file = File::open(path)
        .await
        .map_err(|e| PipelineError::io("opening", path, e))?;
    let mut rows = std::pin::pin!(AsyncReaderBuilder::new()
        .has_headers(true)
        .create_deserializer(file)
        .into_deserialize::<KeywordRow>());
    let mut words = Vec::new();
    while let Some(row) = rows.next().await {
        let KeywordRow { word } = row.map_err(|e| csv_error(path, e))?;
        if word.trim().is_empty() {
            log::warn!("Ignoring blank keyword in {}", path.display());
            continue;
        }
        words.push(word);
    }
    log::info!("Loaded {} keywords from {}", words.len(), path.display());
    Ok(words)
}

/// Translate a CSV decoding error
fn csv_error(path: &Path, error: csv_async::Error) -> PipelineError {
    let detail = error.to_string();
    match error.into_kind() {
        csv_async::ErrorKind::Io(source) => PipelineError::io("reading", path, source),
        _ => PipelineError::schema(path.display().to_string(), detail),
    }
}

/// Ordered list of keywords, ready for matching
#[derive(Clone, Debug)]
pub struct KeywordList(Box<[(Box<str>, Regex)]>);
//
impl KeywordList {
    /// Prepare keywords for whole-word matching
    ///
    /// Keywords are matched literally and case-sensitively.
    pub fn new(words: impl IntoIterator<Item = Box<str>>) -> Result<Self, PipelineError> {
        words
            .into_iter()
            .map(|word| {
                let pattern = format!(r"\b{}\b", regex::escape(&word));
                let regex = Regex::new(&pattern)
                    .map_err(|e| PipelineError::schema(format!("keyword {word:?}"), e))?;
                Ok::<_, PipelineError>((word, regex))
            })
            .collect::<Result<Box<[_]>, _>>()
            .map(Self)
    }

    /// Keywords which occur as whole words in some text, in list order
    ///
    /// Each keyword is reported at most once, however many times it occurs.
    pub fn matches<'list>(&'list self, text: &'list str) -> impl Iterator<Item = &'list str> {
        (self.0.iter())
            .filter(move |(_word, regex)| regex.is_match(text))
            .map(|(word, _regex)| &**word)
    }

    /// Annotate a record with the keywords found in its cleansed text
    pub fn apply(&self, record: AnnotatedRecord) -> MatchedRecord {
        let matched = self.matches(&record.text_cleansed).collect::<Vec<_>>();
        let num_words_matched =
            u32::try_from(matched.len()).expect("keyword lists shouldn't have 4G entries");
        let text_matched = matched.join(" ").into();
        MatchedRecord {
            record,
            num_words_matched,
            text_matched,
        }
    }
}

/// Look up keywords in every record, in parallel
///
/// Records are processed in blocks of `block_size`, and come out in the same
/// order as they went in.
pub fn match_all(
    records: Vec<AnnotatedRecord>,
    keywords: &KeywordList,
    block_size: NonZeroUsize,
    report: &ProgressReport,
) -> Vec<MatchedRecord> {
    let num_blocks = records.len().div_ceil(block_size.get());
    let progress = report.add(
        "Matching keywords",
        ProgressConfig::new(Work::PercentSteps(num_blocks)),
    );
    let matched = (records.into_par_iter())
        .chunks(block_size.get())
        .map(|block| {
            let block = (block.into_iter())
                .map(|record| keywords.apply(record))
                .collect::<Vec<_>>();
            progress.make_progress(1);
            block
        })
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

    let num_matched = matched.iter().filter(|r| r.num_words_matched > 0).count();
    let num_text_matched = matched.iter().filter(|r| !r.text_matched.is_empty()).count();
    log::info!("Num matched: {num_matched}");
    log::info!("Num text_matched: {num_text_matched}");
    matched
}
