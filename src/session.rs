//! Client-side search state: the current query, its pagination cursor and
//! the results accumulated by "load more". Owned by the caller and passed
//! explicitly; nothing here touches the network or the ledger.
use crate::models::{MergedVenueView, SearchResults};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub location: String,
    pub offset: u32,
    /// Fresh search: results replace the accumulated list.
    pub replace: bool,
}

#[derive(Debug, Default)]
pub struct SearchSession {
    query: Option<String>,
    offset: u32,
    total: Option<u32>,
    venues: Vec<MergedVenueView>,
    loading: bool,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new search. Ignored (returns `None`) while a fetch is in
    /// flight or when the location is blank.
    pub fn begin(&mut self, location: &str) -> Option<PageRequest> {
        let location = location.trim();
        if self.loading || location.is_empty() {
            return None;
        }
        self.query = Some(location.to_string());
        self.offset = 0;
        self.total = None;
        self.loading = true;
        Some(PageRequest {
            location: location.to_string(),
            offset: 0,
            replace: true,
        })
    }

    pub fn load_more(&mut self) -> Option<PageRequest> {
        if self.loading || !self.has_more() {
            return None;
        }
        let location = self.query.clone()?;
        self.loading = true;
        Some(PageRequest {
            location,
            offset: self.offset,
            replace: false,
        })
    }

    pub fn complete(&mut self, request: &PageRequest, results: SearchResults) {
        let received = u32::try_from(results.venues.len()).unwrap_or(u32::MAX);
        if request.replace {
            self.venues = results.venues;
        } else {
            self.venues.extend(results.venues);
        }
        self.offset = request.offset.saturating_add(received);
        self.total = Some(results.total);
        self.loading = false;
    }

    pub fn fail(&mut self, _request: &PageRequest) {
        self.loading = false;
    }

    pub fn has_more(&self) -> bool {
        match self.total {
            Some(total) => self.offset < total,
            None => false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn total(&self) -> Option<u32> {
        self.total
    }

    pub fn venues(&self) -> &[MergedVenueView] {
        &self.venues
    }
}
