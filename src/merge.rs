use std::collections::HashMap;

use tracing::{debug, info};

use crate::db::Store;
use crate::error::AppError;
use crate::models::{Attendee, MergedVenueView, SearchParams, SearchResults, UserId};
use crate::provider::{BusinessPage, SearchProvider, SearchRequest};

pub const PREVIEW_LIMIT: usize = 5;

#[derive(Clone, Debug)]
pub struct SearchQuery<'a> {
    pub location: &'a str,
    pub term: &'a str,
    pub offset: u32,
    pub page_size: u32,
}

/// One page of provider results annotated with ledger attendance.
pub fn search_venues(
    provider: &dyn SearchProvider,
    store: &mut Store,
    query: &SearchQuery<'_>,
    viewer: Option<&UserId>,
) -> Result<SearchResults, AppError> {
    let location = query.location.trim();
    if location.is_empty() {
        return Err(AppError::LocationRequired);
    }
    if let Some(user) = viewer {
        if !store.user_exists(user)? {
            return Err(AppError::Unauthenticated);
        }
    }

    let request = SearchRequest::page(location, query.term, query.page_size, query.offset);
    let page = provider
        .search(&request)
        .map_err(AppError::ProviderUnavailable)?;
    info!(
        "provider returned {} of {} venues for {location:?} at offset {}",
        page.businesses.len(),
        page.total,
        query.offset
    );

    let refreshed = store.refresh_cached_fields(&page.businesses)?;
    if refreshed > 0 {
        debug!("refreshed cached fields for {refreshed} ledger venues");
    }

    let ids: Vec<&str> = page.businesses.iter().map(|b| b.id.as_str()).collect();
    let attendance = store.attendance_for(&ids)?;

    Ok(SearchResults {
        total: page.total,
        venues: merge_page(page, &attendance, viewer),
        search_params: SearchParams {
            location: location.to_string(),
            term: query.term.to_string(),
        },
    })
}

/// Provider order is kept as-is. A business with no ledger entry reports
/// zero attendees.
pub fn merge_page(
    page: BusinessPage,
    attendance: &HashMap<String, Vec<Attendee>>,
    viewer: Option<&UserId>,
) -> Vec<MergedVenueView> {
    page.businesses
        .into_iter()
        .map(|business| {
            let attendees = attendance
                .get(&business.id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let mut view = MergedVenueView::from_business(business);
            view.attendee_count = attendees.len();
            view.attendees = attendees
                .iter()
                .take(PREVIEW_LIMIT)
                .map(|a| a.display_name.clone())
                .collect();
            view.is_going =
                viewer.is_some_and(|user| attendees.iter().any(|a| &a.user_id == user));
            view
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::{business, FakeProvider};

    fn attendee(name: &str) -> Attendee {
        Attendee {
            user_id: UserId::new(name),
            display_name: name.to_uppercase(),
        }
    }

    fn query(location: &str, offset: u32) -> SearchQuery<'_> {
        SearchQuery {
            location,
            term: "bars",
            offset,
            page_size: 20,
        }
    }

    #[test]
    fn merges_counts_in_provider_order() {
        let page = BusinessPage {
            businesses: vec![business("c"), business("a"), business("b")],
            total: 3,
        };
        let mut attendance = HashMap::new();
        attendance.insert("a".to_string(), vec![attendee("ada"), attendee("bob")]);
        attendance.insert(
            "b".to_string(),
            ["u1", "u2", "u3", "u4", "u5", "u6", "u7"]
                .iter()
                .map(|n| attendee(n))
                .collect(),
        );

        let views = merge_page(page, &attendance, Some(&UserId::new("bob")));
        let ids: Vec<_> = views.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);

        assert_eq!(views[0].attendee_count, 0);
        assert!(views[0].attendees.is_empty());
        assert!(!views[0].is_going);

        assert_eq!(views[1].attendee_count, 2);
        assert_eq!(views[1].attendees, vec!["ADA", "BOB"]);
        assert!(views[1].is_going);

        assert_eq!(views[2].attendee_count, 7);
        assert_eq!(views[2].attendees, vec!["U1", "U2", "U3", "U4", "U5"]);
        assert!(!views[2].is_going);
    }

    #[test]
    fn anonymous_viewer_is_never_going() {
        let page = BusinessPage {
            businesses: vec![business("a")],
            total: 1,
        };
        let mut attendance = HashMap::new();
        attendance.insert("a".to_string(), vec![attendee("ada")]);

        let views = merge_page(page, &attendance, None);
        assert_eq!(views[0].attendee_count, 1);
        assert!(!views[0].is_going);
    }

    #[test]
    fn search_reads_ledger_for_known_venues() {
        let provider = FakeProvider::with_ids(&["v1", "v2", "v3"]);
        let mut store = Store::open_in_memory().unwrap();
        let ada = UserId::new("ada");
        store.insert_user(&ada, "Ada").unwrap();
        store.insert_venue_if_absent("v2", &business("v2")).unwrap();
        store.toggle_attendance("v2", &ada).unwrap();

        let results = search_venues(&provider, &mut store, &query("Boise", 0), Some(&ada)).unwrap();
        assert_eq!(results.total, 3);
        assert_eq!(
            results.search_params,
            SearchParams {
                location: "Boise".into(),
                term: "bars".into()
            }
        );
        let counts: Vec<_> = results.venues.iter().map(|v| v.attendee_count).collect();
        assert_eq!(counts, vec![0, 1, 0]);
        assert!(results.venues[1].is_going);
        assert_eq!(results.venues[1].attendees, vec!["Ada"]);
    }

    #[test]
    fn search_refreshes_cached_fields_of_known_venues() {
        let mut provider = FakeProvider::with_ids(&["v1", "v2"]);
        let mut store = Store::open_in_memory().unwrap();
        let ada = UserId::new("ada");
        store.insert_user(&ada, "Ada").unwrap();
        store.insert_venue_if_absent("v1", &business("v1")).unwrap();
        store.toggle_attendance("v1", &ada).unwrap();
        let before = store.venue("v1").unwrap().expect("venue");

        provider.businesses[0].name = "Neurolux Lounge".to_string();
        provider.businesses[0].rating = Some(3.5);
        provider.businesses[0].phone = None;

        let results = search_venues(&provider, &mut store, &query("Boise", 0), None).unwrap();
        assert_eq!(results.venues[0].name, "Neurolux Lounge");

        let after = store.venue("v1").unwrap().expect("venue");
        assert_eq!(after.name, "Neurolux Lounge");
        assert_eq!(after.rating, Some(3.5));
        assert_eq!(after.phone, None);
        assert_eq!(after.attendees, vec![ada]);
        assert_eq!(after.last_updated, before.last_updated);
        assert!(!store.venue_exists("v2").unwrap(), "search never materializes");
    }

    #[test]
    fn search_requires_location_and_known_viewer() {
        let provider = FakeProvider::with_ids(&["v1"]);
        let mut store = Store::open_in_memory().unwrap();

        let err = search_venues(&provider, &mut store, &query("   ", 0), None).unwrap_err();
        assert!(matches!(err, AppError::LocationRequired));

        let ghost = UserId::new("ghost");
        let err = search_venues(&provider, &mut store, &query("Boise", 0), Some(&ghost)).unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }

    #[test]
    fn provider_failure_fails_the_whole_search() {
        let provider = FakeProvider::unavailable();
        let mut store = Store::open_in_memory().unwrap();

        let err = search_venues(&provider, &mut store, &query("Boise", 0), None).unwrap_err();
        assert!(matches!(err, AppError::ProviderUnavailable(_)));
    }
}
