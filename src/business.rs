//! Loading and filtering of the business feed

use crate::{
    error::PipelineError,
    jsonl::JsonLines,
    records::{BusinessRecord, FilteredBusiness},
};
use std::{path::Path, sync::Arc};

/// Category keywords which identify a food-related business
///
/// Matched case-insensitively anywhere in the category list.
const FOOD_CATEGORIES: [&str; 2] = ["restaurants", "food"];

/// Load every business from a line-delimited JSON feed
pub async fn load(path: &Path) -> Result<Vec<BusinessRecord>, PipelineError> {
    let businesses = JsonLines::open(path).await?.read_all().await?;
    log::info!(
        "Loaded {} businesses from {}",
        businesses.len(),
        path.display()
    );
    Ok(businesses)
}

/// Keep food-related businesses and strip the fields that we don't need
///
/// Businesses without a category list are discarded.
pub fn filter(businesses: Vec<BusinessRecord>) -> Vec<Arc<FilteredBusiness>> {
    let num_businesses = businesses.len();
    let filtered = businesses
        .into_iter()
        .filter_map(|business| {
            let accepted = business.categories.as_deref().is_some_and(is_food_related);
            if !accepted {
                log::trace!(
                    "Rejected business {} with categories {:?}",
                    business.business_id,
                    business.categories
                );
                return None;
            }
            let BusinessRecord {
                business_id,
                name,
                address,
                city,
                state,
                postal_code,
                latitude,
                longitude,
                stars,
                review_count: _,
                is_open,
                attributes: _,
                categories,
                hours: _,
            } = business;
            Some(Arc::new(FilteredBusiness {
                business_id,
                name,
                address,
                city,
                state,
                postal_code,
                latitude,
                longitude,
                // Truncation toward zero, not rounding
                avg_stars: stars.trunc() as i64,
                is_open,
                categories: categories?,
            }))
        })
        .collect::<Vec<_>>();
    log::info!(
        "Kept {} food-related businesses out of {num_businesses}",
        filtered.len()
    );
    filtered
}

/// Truth that a category list mentions restaurants or food
fn is_food_related(categories: &str) -> bool {
    let categories = categories.to_lowercase();
    FOOD_CATEGORIES
        .iter()
        .any(|keyword| categories.contains(keyword))
}
