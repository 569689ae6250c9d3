use std::{
    env, fmt::Display, fs, path::PathBuf, str::FromStr, sync::Mutex, time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::utils;

const DEFAULT_YELP_URL: &str = "https://api.yelp.com/v3";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PAGE_SIZE: u32 = 20;
const DEFAULT_TERM: &str = "bars";

/// Runtime settings, read once from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub yelp_api_key: Option<String>,
    pub yelp_api_url: String,
    pub provider_timeout: Duration,
    pub page_size: u32,
    pub default_term: String,
    /// Explicit ledger location; `None` resolves under the user data dir.
    pub database_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            yelp_api_key: None,
            yelp_api_url: DEFAULT_YELP_URL.to_string(),
            provider_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            page_size: DEFAULT_PAGE_SIZE,
            default_term: DEFAULT_TERM.to_string(),
            database_path: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        if let Err(err) = dotenvy::dotenv() {
            debug!("no .env loaded: {err}");
        }

        Self {
            yelp_api_key: env::var("YELP_API_KEY").ok(),
            yelp_api_url: env::var("YELP_API_URL")
                .unwrap_or_else(|_| DEFAULT_YELP_URL.to_string()),
            provider_timeout: Duration::from_secs(parse_or("YELP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)),
            page_size: parse_or("NIGHTLIFE_PAGE_SIZE", DEFAULT_PAGE_SIZE),
            default_term: env::var("NIGHTLIFE_SEARCH_TERM")
                .ok()
                .filter(|term| !term.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TERM.to_string()),
            database_path: env::var_os("NIGHTLIFE_DB_PATH").map(PathBuf::from),
        }
    }

    /// The data dir is only touched when no explicit path is configured.
    pub fn ledger_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(utils::database_path)
    }
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|err| {
            warn!("invalid {key} value {raw:?}: {err}, using default {default}");
            default
        }),
        Err(_) => default,
    }
}

/// Preferences remembered between runs.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Prefs {
    pub last_search: Option<String>,
}

pub struct PrefsStore {
    path: PathBuf,
    data: Mutex<Prefs>,
}

impl PrefsStore {
    pub fn load() -> Self {
        Self::load_from(utils::prefs_path())
    }

    pub fn load_from(path: PathBuf) -> Self {
        let data = read_prefs(&path).unwrap_or_else(|err| {
            warn!("ignoring unreadable prefs {:?}: {err}", path);
            Prefs::default()
        });
        Self {
            path,
            data: Mutex::new(data),
        }
    }

    pub fn read(&self) -> Prefs {
        self.data
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn update<F>(&self, transform: F) -> Result<Prefs, AppError>
    where
        F: FnOnce(&mut Prefs),
    {
        let mut guard = self
            .data
            .lock()
            .map_err(|_| AppError::Config("prefs mutex poisoned".into()))?;
        transform(&mut guard);
        write_prefs(&self.path, &guard)?;
        Ok(guard.clone())
    }

    pub fn remember_search(&self, location: &str) -> Result<Prefs, AppError> {
        let location = location.trim().to_string();
        self.update(|prefs| prefs.last_search = Some(location))
    }
}

fn read_prefs(path: &PathBuf) -> Result<Prefs, AppError> {
    if !path.exists() {
        return Ok(Prefs::default());
    }
    let contents = fs::read_to_string(path).map_err(|err| AppError::Config(err.to_string()))?;
    serde_json::from_str(&contents).map_err(|err| AppError::Config(err.to_string()))
}

fn write_prefs(path: &PathBuf, prefs: &Prefs) -> Result<(), AppError> {
    utils::ensure_parent(path);
    let contents =
        serde_json::to_string_pretty(prefs).map_err(|err| AppError::Config(err.to_string()))?;
    fs::write(path, contents).map_err(|err| AppError::Config(err.to_string()))
}
