use std::time::Duration;

use reqwest::{blocking::Client, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use super::{Business, BusinessPage, Coordinates, ProviderError, SearchProvider, SearchRequest};
use crate::config::Settings;
use crate::error::AppError;
use crate::models::VenueLocation;

const USER_AGENT: &str = "nightlife/0.1";
const NOT_FOUND_CODE: &str = "BUSINESS_NOT_FOUND";

/// Yelp Fusion business API.
pub struct YelpClient {
    base_url: String,
    api_key: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    businesses: Vec<YelpBusiness>,
    #[serde(default)]
    total: u32,
}

#[derive(Debug, Deserialize)]
struct YelpBusiness {
    id: String,
    name: String,
    image_url: Option<String>,
    url: Option<String>,
    rating: Option<f64>,
    #[serde(default)]
    review_count: u32,
    price: Option<String>,
    display_phone: Option<String>,
    #[serde(default)]
    location: YelpLocation,
    coordinates: Option<YelpCoordinates>,
}

#[derive(Debug, Default, Deserialize)]
struct YelpLocation {
    address1: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YelpCoordinates {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDoc,
}

#[derive(Debug, Deserialize)]
struct ErrorDoc {
    code: Option<String>,
    description: Option<String>,
}

impl YelpClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| ProviderError::Http(err.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            client,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, AppError> {
        let api_key = settings
            .yelp_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AppError::Config("YELP_API_KEY is not set".into()))?;

        Self::new(&settings.yelp_api_url, api_key, settings.provider_timeout)
            .map_err(AppError::ProviderUnavailable)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| ProviderError::Http(format!("invalid base url: {err}")))?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::Http(format!("invalid base url: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn fetch(&self, url: Url) -> Result<String, ProviderError> {
        debug!("yelp request: {}", url.path());
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .map_err(|err| ProviderError::Http(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|err| ProviderError::Http(err.to_string()))?;

        if !status.is_success() {
            return Err(classify_failure(status, &body));
        }
        Ok(body)
    }
}

impl SearchProvider for YelpClient {
    fn search(&self, request: &SearchRequest) -> Result<BusinessPage, ProviderError> {
        let mut url = self.endpoint(&["businesses", "search"])?;
        url.query_pairs_mut()
            .append_pair("location", &request.location)
            .append_pair("term", &request.term)
            .append_pair("categories", &request.categories)
            .append_pair("limit", &request.limit.to_string())
            .append_pair("offset", &request.offset.to_string())
            .append_pair("sort_by", &request.sort_by);

        let body = self.fetch(url)?;
        parse_search(&body)
    }

    fn business(&self, id: &str) -> Result<Business, ProviderError> {
        let url = self.endpoint(&["businesses", id])?;
        let body = self.fetch(url)?;
        parse_business(&body)
    }
}

pub(crate) fn parse_search(body: &str) -> Result<BusinessPage, ProviderError> {
    let payload: SearchResponse =
        serde_json::from_str(body).map_err(|err| ProviderError::Parse(err.to_string()))?;
    Ok(BusinessPage {
        businesses: payload.businesses.into_iter().map(Business::from).collect(),
        total: payload.total,
    })
}

pub(crate) fn parse_business(body: &str) -> Result<Business, ProviderError> {
    let doc: YelpBusiness =
        serde_json::from_str(body).map_err(|err| ProviderError::Parse(err.to_string()))?;
    Ok(doc.into())
}

pub(crate) fn classify_failure(status: StatusCode, body: &str) -> ProviderError {
    let doc = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error);
    let code = doc.as_ref().and_then(|d| d.code.as_deref());

    if status == StatusCode::NOT_FOUND || code == Some(NOT_FOUND_CODE) {
        let message = doc
            .as_ref()
            .and_then(|d| d.description.clone())
            .unwrap_or_else(|| status.to_string());
        return ProviderError::NotFound(message);
    }

    ProviderError::Api {
        status: status.as_u16(),
        message: doc
            .and_then(|d| d.description)
            .unwrap_or_else(|| body.to_string()),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl From<YelpBusiness> for Business {
    fn from(doc: YelpBusiness) -> Self {
        let coordinates = doc.coordinates.and_then(|c| match (c.latitude, c.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        });

        Business {
            id: doc.id,
            name: doc.name,
            image_url: non_empty(doc.image_url),
            url: non_empty(doc.url),
            rating: doc.rating,
            review_count: doc.review_count,
            price: non_empty(doc.price),
            phone: non_empty(doc.display_phone),
            location: VenueLocation {
                address: non_empty(doc.location.address1),
                city: non_empty(doc.location.city),
                state: non_empty(doc.location.state),
                zip_code: non_empty(doc.location.zip_code),
            },
            coordinates,
        }
    }
}
