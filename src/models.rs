use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::provider::{Business, Coordinates};

/// Account identity: the lowercased username.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(identity: &str) -> Self {
        Self(identity.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    pub going_to: Vec<String>, // external venue ids
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VenueLocation {
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

/// A venue materialized in the ledger.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Venue {
    pub id: i64,
    pub external_id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub url: Option<String>,
    pub rating: Option<f64>,
    pub location: VenueLocation,
    pub phone: Option<String>,
    pub attendees: Vec<UserId>,
    pub last_updated: DateTime<Utc>,
}

impl Venue {
    pub fn attendee_count(&self) -> usize {
        self.attendees.len()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Attendee {
    pub user_id: UserId,
    pub display_name: String,
}

/// Provider data for one business annotated with ledger attendance.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MergedVenueView {
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
    pub attendee_count: usize,
    pub attendees: Vec<String>,
    pub is_going: bool,
}

impl MergedVenueView {
    pub fn from_business(business: Business) -> Self {
        Self {
            id: business.id,
            name: business.name,
            image_url: business.image_url,
            url: business.url,
            rating: business.rating,
            review_count: business.review_count,
            price: business.price,
            phone: business.phone,
            location: business.location,
            coordinates: business.coordinates,
            attendee_count: 0,
            attendees: Vec::new(),
            is_going: false,
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SearchParams {
    pub location: String,
    pub term: String,
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub venues: Vec<MergedVenueView>,
    pub total: u32,
    pub search_params: SearchParams,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ToggleOutcome {
    pub attending: bool,
    pub attendee_count: usize,
    pub venue_id: i64,
}
