//! Records flowing through the pipeline, from raw input to annotated output
//!
//! Each stage consumes the records of the previous stage by value and produces
//! a new record type, so that what a stage has added is visible in the types.

use chrono::NaiveDateTime;
use serde::Deserialize;
use std::sync::Arc;

/// Business listing, as found in the raw business feed
///
/// Only `business_id` and `stars` are strictly required. Other fields are
/// carried along when present.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct BusinessRecord {
    /// Unique business identifier, used as the join key
    pub business_id: Box<str>,

    #[serde(default)]
    pub name: Option<Box<str>>,
    #[serde(default)]
    pub address: Option<Box<str>>,
    #[serde(default)]
    pub city: Option<Box<str>>,

    /// Two-letter state or province code
    #[serde(default)]
    pub state: Option<Box<str>>,

    #[serde(default)]
    pub postal_code: Option<Box<str>>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,

    /// Average rating, in half-star increments
    pub stars: f64,

    #[serde(default)]
    pub review_count: Option<u64>,
    #[serde(default)]
    pub is_open: Option<i64>,

    /// Free-form attribute map, not used downstream
    #[serde(default)]
    pub attributes: Option<serde_json::Value>,

    /// Comma-separated category list, may be missing
    #[serde(default)]
    pub categories: Option<Box<str>>,

    /// Opening hours, not used downstream
    #[serde(default)]
    pub hours: Option<serde_json::Value>,
}

/// Food-related business with unused fields stripped
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq)]
pub struct FilteredBusiness {
    pub business_id: Box<str>,
    pub name: Option<Box<str>>,
    pub address: Option<Box<str>>,
    pub city: Option<Box<str>>,
    pub state: Option<Box<str>>,
    pub postal_code: Option<Box<str>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    /// Average rating, truncated toward zero
    pub avg_stars: i64,

    pub is_open: Option<i64>,

    /// Category list, known to mention restaurants or food
    pub categories: Box<str>,
}

/// Customer review, as found in the raw review feed
#[allow(missing_docs)]
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct ReviewRecord {
    pub review_id: Box<str>,
    pub user_id: Box<str>,

    /// Reviewed business, used as the join key
    pub business_id: Box<str>,

    /// Rating given by the reviewer, from 1 to 5
    pub stars: i64,

    /// Unparsed review date
    pub date: Box<str>,

    pub text: Box<str>,
    pub useful: i64,
    pub funny: i64,
    pub cool: i64,
}

/// Review with the fields that we don't use stripped
#[allow(missing_docs)]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Review {
    pub review_id: Box<str>,
    pub user_id: Box<str>,
    pub business_id: Box<str>,

    /// Rating given by the reviewer, renamed to avoid confusion with the
    /// business-wide average rating
    pub review_stars: i64,

    pub date: Box<str>,
    pub text: Box<str>,
    pub useful: i64,
}
//
impl From<ReviewRecord> for Review {
    fn from(record: ReviewRecord) -> Self {
        let ReviewRecord {
            review_id,
            user_id,
            business_id,
            stars,
            date,
            text,
            useful,
            funny: _,
            cool: _,
        } = record;
        Self {
            review_id,
            user_id,
            business_id,
            review_stars: stars,
            date,
            text,
            useful,
        }
    }
}

/// Review joined with the food business that it is about
///
/// Business data is shared between all reviews of a business.
#[derive(Clone, Debug, PartialEq)]
pub struct MergedRecord {
    /// Reviewed business
    pub business: Arc<FilteredBusiness>,

    /// Review of this business
    pub review: Review,
}

/// Three-valued opinion derived from a review's star rating
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}
//
impl Sentiment {
    /// Label a star rating
    pub fn from_stars(stars: i64) -> Self {
        match stars {
            4.. => Self::Positive,
            3 => Self::Neutral,
            _ => Self::Negative,
        }
    }

    /// Textual form, as stored in the output files
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

/// Merged record from a US business, with parsed date and derived features
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotatedRecord {
    /// Reviewed business
    pub business: Arc<FilteredBusiness>,

    /// Review of this business (whose `date` field is the unparsed original)
    pub review: Review,

    /// Parsed review date
    pub date: NaiveDateTime,

    /// Opinion derived from the review rating
    pub sentiment: Sentiment,

    /// Lowercased review text with punctuation stripped
    pub text_cleansed: Box<str>,
}

/// Annotated record with keyword matching results
#[derive(Clone, Debug, PartialEq)]
pub struct MatchedRecord {
    /// Record that keyword matching was applied to
    pub record: AnnotatedRecord,

    /// Number of distinct keywords found in the cleansed text
    pub num_words_matched: u32,

    /// Keywords found in the cleansed text, space-separated, in keyword list
    /// order
    pub text_matched: Box<str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_covers_all_ratings() {
        let labels = (1..=5).map(Sentiment::from_stars).collect::<Vec<_>>();
        assert_eq!(
            labels,
            [
                Sentiment::Negative,
                Sentiment::Negative,
                Sentiment::Neutral,
                Sentiment::Positive,
                Sentiment::Positive,
            ]
        );
        assert_eq!(Sentiment::Positive.as_str(), "positive");
        assert_eq!(Sentiment::Neutral.as_str(), "neutral");
        assert_eq!(Sentiment::Negative.as_str(), "negative");
    }

    #[test]
    fn review_conversion_drops_votes_and_renames_stars() {
        let record = ReviewRecord {
            review_id: "r1".into(),
            user_id: "u1".into(),
            business_id: "b1".into(),
            stars: 4,
            date: "2018-07-07 22:09:11".into(),
            text: "Nice".into(),
            useful: 2,
            funny: 1,
            cool: 3,
        };
        let review = Review::from(record);
        assert_eq!(review.review_stars, 4);
        assert_eq!(review.useful, 2);
        assert_eq!(&*review.business_id, "b1");
    }
}
