//! Restriction of merged reviews to the USA and derivation of review features

use crate::{
    error::PipelineError,
    records::{AnnotatedRecord, MergedRecord, Sentiment},
};
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

/// State codes of the USA, including the District of Columbia
pub const US_STATES: [&str; 51] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DC", "DE", "FL", "GA", "HI", "ID", "IL", "IN",
    "IA", "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH",
    "NJ", "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT",
    "VT", "VA", "WA", "WV", "WI", "WY",
];

/// Date layouts accepted in the review feed, tried in order
const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Keep reviews of US businesses and compute their derived features
///
/// Fails on the first review whose date cannot be parsed.
pub fn annotate(merged: Vec<MergedRecord>) -> Result<Vec<AnnotatedRecord>, PipelineError> {
    let num_merged = merged.len();
    let annotated = merged
        .into_iter()
        .filter(|record| {
            let is_us = record
                .business
                .state
                .as_deref()
                .is_some_and(|state| US_STATES.contains(&state));
            if !is_us {
                log::trace!(
                    "Rejected review {} of business {} in state {:?}",
                    record.review.review_id,
                    record.business.business_id,
                    record.business.state
                );
            }
            is_us
        })
        .map(|MergedRecord { business, review }| {
            let date = parse_date(&review.date).ok_or_else(|| {
                PipelineError::schema(
                    format!("review {}", review.review_id),
                    format!("unparseable date {:?}", review.date),
                )
            })?;
            let sentiment = Sentiment::from_stars(review.review_stars);
            let text_cleansed = cleanse_text(&review.text).into();
            Ok::<_, PipelineError>(AnnotatedRecord {
                business,
                review,
                date,
                sentiment,
                text_cleansed,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    log::info!(
        "Kept {} reviews of US businesses out of {num_merged}",
        annotated.len()
    );
    Ok(annotated)
}

/// Parse a review date
pub fn parse_date(date: &str) -> Option<NaiveDateTime> {
    let date = date.trim();
    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(date, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .ok()
                .and_then(|day| day.and_hms_opt(0, 0, 0))
        })
}

/// Normalize review text for keyword matching
///
/// The text is lowercased, then sentence punctuation and line feeds are
/// replaced with spaces, then symbols are removed outright. These two
/// substitutions must stay separate and ordered.
pub fn cleanse_text(text: &str) -> String {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    static SYMBOLS: OnceLock<Regex> = OnceLock::new();
    let separators =
        SEPARATORS.get_or_init(|| Regex::new(r"\n|[!.,?-]").expect("separator regex is valid"));
    let symbols = SYMBOLS.get_or_init(|| {
        Regex::new(r##"[-|':$~"#%&()*+/;<=>?@\[\]^_`{}]"##).expect("symbol regex is valid")
    });
    let lowercase = text.to_lowercase();
    let spaced = separators.replace_all(&lowercase, " ");
    symbols.replace_all(&spaced, "").into_owned()
}
