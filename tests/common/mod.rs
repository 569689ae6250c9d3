#![allow(dead_code)]

use std::{
    path::Path,
    sync::atomic::{AtomicUsize, Ordering},
    thread,
    time::Duration,
};

use nightlife_lib::{
    app::Nightlife,
    config::Settings,
    models::VenueLocation,
    provider::{Business, BusinessPage, ProviderError, SearchProvider, SearchRequest},
};

pub fn business(index: usize) -> Business {
    Business {
        id: format!("venue-{index:02}"),
        name: format!("Venue {index}"),
        image_url: None,
        url: Some(format!("https://www.example.com/biz/venue-{index:02}")),
        rating: Some(4.0),
        review_count: index as u32,
        price: Some("$$".to_string()),
        phone: None,
        location: VenueLocation {
            address: Some(format!("{index} Main St")),
            city: Some("Boise".to_string()),
            state: Some("ID".to_string()),
            zip_code: Some("83702".to_string()),
        },
        coordinates: None,
    }
}

/// Ranked catalogue of `count` venues. Detail lookups are slowed down so that
/// concurrent first toggles overlap.
pub struct CatalogueProvider {
    businesses: Vec<Business>,
    lookup_delay: Duration,
    pub searches: AtomicUsize,
    pub lookups: AtomicUsize,
}

impl CatalogueProvider {
    pub fn new(count: usize) -> Self {
        Self {
            businesses: (0..count).map(business).collect(),
            lookup_delay: Duration::from_millis(25),
            searches: AtomicUsize::new(0),
            lookups: AtomicUsize::new(0),
        }
    }
}

impl SearchProvider for CatalogueProvider {
    fn search(&self, request: &SearchRequest) -> Result<BusinessPage, ProviderError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        Ok(BusinessPage {
            businesses: self
                .businesses
                .iter()
                .skip(request.offset as usize)
                .take(request.limit as usize)
                .cloned()
                .collect(),
            total: self.businesses.len() as u32,
        })
    }

    fn business(&self, id: &str) -> Result<Business, ProviderError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.lookup_delay);
        self.businesses
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))
    }
}

pub fn app(dir: &Path, count: usize) -> Nightlife<CatalogueProvider> {
    let settings = Settings {
        database_path: Some(dir.join("ledger.sqlite")),
        ..Settings::default()
    };
    Nightlife::new(settings, CatalogueProvider::new(count))
}
