use crate::attendance;
use crate::config::Settings;
use crate::db::Store;
use crate::error::AppError;
use crate::merge::{self, SearchQuery};
use crate::models::{SearchResults, ToggleOutcome, User, UserId, Venue};
use crate::provider::SearchProvider;
use crate::session::{PageRequest, SearchSession};

/// Presentation-facing operations. Every call opens its own ledger
/// connection, so concurrent callers share nothing but the database file.
pub struct Nightlife<P> {
    settings: Settings,
    provider: P,
}

impl<P: SearchProvider> Nightlife<P> {
    pub fn new(settings: Settings, provider: P) -> Self {
        Self { settings, provider }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn store(&self) -> Result<Store, AppError> {
        Ok(Store::open(&self.settings.ledger_path())?)
    }

    pub fn search(
        &self,
        location: &str,
        term: Option<&str>,
        offset: u32,
        viewer: Option<&UserId>,
    ) -> Result<SearchResults, AppError> {
        let term = term
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(self.settings.default_term.as_str());
        let query = SearchQuery {
            location,
            term,
            offset,
            page_size: self.settings.page_size,
        };
        merge::search_venues(&self.provider, &mut self.store()?, &query, viewer)
    }

    /// Runs one page request for a session, settling its loading flag.
    pub fn fetch_page(
        &self,
        session: &mut SearchSession,
        request: &PageRequest,
        term: Option<&str>,
        viewer: Option<&UserId>,
    ) -> Result<(), AppError> {
        match self.search(&request.location, term, request.offset, viewer) {
            Ok(results) => {
                session.complete(request, results);
                Ok(())
            }
            Err(err) => {
                session.fail(request);
                Err(err)
            }
        }
    }

    pub fn toggle_attendance(
        &self,
        venue_external_id: &str,
        user: Option<&UserId>,
    ) -> Result<ToggleOutcome, AppError> {
        attendance::toggle_attendance(&self.provider, &mut self.store()?, venue_external_id, user)
    }

    pub fn user_venues(&self, user: Option<&UserId>) -> Result<Vec<Venue>, AppError> {
        attendance::user_venues(&self.store()?, user)
    }

    pub fn register_user(&self, username: &str, display_name: &str) -> Result<User, AppError> {
        attendance::register_user(&self.store()?, username, display_name)
    }

    pub fn user(&self, id: &UserId) -> Result<Option<User>, AppError> {
        Ok(self.store()?.get_user(id)?)
    }
}
