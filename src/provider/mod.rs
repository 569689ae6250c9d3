pub mod yelp;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::VenueLocation;

pub const DEFAULT_CATEGORIES: &str = "bars,nightlife";
pub const DEFAULT_SORT: &str = "best_match";
pub const MAX_PAGE_SIZE: u32 = 50;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(String),
    #[error("provider api error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("business not found: {0}")]
    NotFound(String),
    #[error("parse error: {0}")]
    Parse(String),
}

/// External business-search API. Result order is the provider's ranking and
/// is never re-sorted downstream.
pub trait SearchProvider: Send + Sync {
    fn search(&self, request: &SearchRequest) -> Result<BusinessPage, ProviderError>;
    fn business(&self, id: &str) -> Result<Business, ProviderError>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchRequest {
    pub location: String,
    pub term: String,
    pub categories: String,
    pub limit: u32,
    pub offset: u32,
    pub sort_by: String,
}

impl SearchRequest {
    pub fn page(location: &str, term: &str, limit: u32, offset: u32) -> Self {
        Self {
            location: location.to_string(),
            term: term.to_string(),
            categories: DEFAULT_CATEGORIES.to_string(),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
            offset,
            sort_by: DEFAULT_SORT.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Business {
    pub id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub url: Option<String>,
    pub rating: Option<f64>,
    pub review_count: u32,
    pub price: Option<String>,
    pub phone: Option<String>,
    pub location: VenueLocation,
    pub coordinates: Option<Coordinates>,
}

#[derive(Clone, Debug, Default)]
pub struct BusinessPage {
    pub businesses: Vec<Business>,
    pub total: u32,
}
