use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use crate::db::Store;
use crate::error::AppError;
use crate::models::{ToggleOutcome, User, UserId, Venue};
use crate::provider::SearchProvider;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_.-]{3,}$").expect("valid username regex"));

/// Flips `user`'s attendance on the venue. An unseen venue is materialized
/// from the provider first; an id the provider cannot resolve is `NotFound`
/// and leaves the ledger untouched.
pub fn toggle_attendance(
    provider: &dyn SearchProvider,
    store: &mut Store,
    external_id: &str,
    user: Option<&UserId>,
) -> Result<ToggleOutcome, AppError> {
    let user = user.ok_or(AppError::Unauthenticated)?;
    if !store.user_exists(user)? {
        return Err(AppError::Unauthenticated);
    }

    let external_id = external_id.trim();
    if external_id.is_empty() {
        return Err(AppError::NotFound(String::new()));
    }

    if !store.venue_exists(external_id)? {
        let business = provider
            .business(external_id)
            .map_err(|err| AppError::from_lookup(external_id, err))?;
        if store.insert_venue_if_absent(external_id, &business)? {
            info!("materialized venue {external_id} ({})", business.name);
        }
    }

    let outcome = store
        .toggle_attendance(external_id, user)?
        .ok_or_else(|| AppError::NotFound(external_id.to_string()))?;
    info!(
        "{user} is {} {external_id} ({} attending)",
        if outcome.attending { "going to" } else { "no longer going to" },
        outcome.attendee_count
    );
    Ok(outcome)
}

pub fn user_venues(store: &Store, user: Option<&UserId>) -> Result<Vec<Venue>, AppError> {
    let user = user.ok_or(AppError::Unauthenticated)?;
    if !store.user_exists(user)? {
        return Err(AppError::Unauthenticated);
    }
    Ok(store.venues_for_user(user)?)
}

pub fn register_user(store: &Store, username: &str, display_name: &str) -> Result<User, AppError> {
    let id = UserId::new(username);
    if !USERNAME_RE.is_match(id.as_str()) {
        return Err(AppError::Invalid {
            field: "username",
            reason: "at least 3 characters of letters, digits, '_', '.' or '-'".into(),
        });
    }
    let display_name = display_name.trim();
    if display_name.chars().count() < 2 {
        return Err(AppError::Invalid {
            field: "display name",
            reason: "at least 2 characters".into(),
        });
    }

    if !store.insert_user(&id, display_name)? {
        return Err(AppError::UserExists(id.to_string()));
    }
    info!("registered user {id}");

    store
        .get_user(&id)?
        .ok_or_else(|| AppError::UserExists(id.to_string()))
}
