pub mod app;
pub mod attendance;
pub mod config;
pub mod db;
pub mod error;
pub mod merge;
pub mod models;
pub mod provider;
pub mod session;
mod utils;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use app::Nightlife;
use config::{PrefsStore, Settings};
use db::Store;
use models::UserId;
use provider::yelp::YelpClient;
use session::SearchSession;

#[derive(Debug, Parser)]
#[command(name = "nightlife", version, about = "Find bars nearby and see who's going")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create an account
    Register {
        username: String,
        display_name: String,
    },
    /// Search venues near a location (defaults to the last search)
    Search {
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        term: Option<String>,
        #[arg(long)]
        user: Option<String>,
        /// Pages to load, following "load more"
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Toggle going / not going on a venue
    Attend {
        venue_id: String,
        #[arg(long)]
        user: Option<String>,
    },
    /// Venues a user is going to
    Going {
        #[arg(long)]
        user: Option<String>,
    },
}

pub fn run() -> anyhow::Result<()> {
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    let settings = Settings::from_env();

    match cli.command {
        Command::Register {
            username,
            display_name,
        } => {
            let store = Store::open(&settings.ledger_path())?;
            let user = attendance::register_user(&store, &username, &display_name)?;
            print_json(&user)
        }
        Command::Search {
            location,
            term,
            user,
            pages,
        } => {
            let prefs = PrefsStore::load();
            let location = location
                .or_else(|| prefs.read().last_search)
                .ok_or_else(|| anyhow!("no location given and no previous search"))?;
            let viewer = user.as_deref().map(UserId::new);

            let app = Nightlife::new(settings.clone(), YelpClient::from_settings(&settings)?);
            let mut session = SearchSession::new();
            let first = session
                .begin(&location)
                .ok_or(error::AppError::LocationRequired)?;
            app.fetch_page(&mut session, &first, term.as_deref(), viewer.as_ref())?;

            if let Err(err) = prefs.remember_search(&location) {
                warn!("could not remember search: {err}");
            }

            for _ in 1..pages {
                let Some(next) = session.load_more() else {
                    break;
                };
                app.fetch_page(&mut session, &next, term.as_deref(), viewer.as_ref())?;
            }
            info!(
                "loaded {} venues for {:?}",
                session.venues().len(),
                session.query().unwrap_or_default()
            );

            print_json(&json!({
                "venues": session.venues(),
                "total": session.total(),
                "offset": session.offset(),
                "hasMore": session.has_more(),
            }))
        }
        Command::Attend { venue_id, user } => {
            let user = user.as_deref().map(UserId::new);
            let app = Nightlife::new(settings.clone(), YelpClient::from_settings(&settings)?);
            let outcome = app.toggle_attendance(&venue_id, user.as_ref())?;
            print_json(&outcome)
        }
        Command::Going { user } => {
            let user = user.as_deref().map(UserId::new);
            let store = Store::open(&settings.ledger_path())?;
            let venues = attendance::user_venues(&store, user.as_ref())?;
            print_json(&venues)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{out}");
    Ok(())
}
