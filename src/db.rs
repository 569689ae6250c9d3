//! Attendance ledger.
//!
//! Venues are keyed by the provider's external id (unique). Attendance is a
//! single `(venue_id, user_id)` relation: a venue's attendee set and a user's
//! going-to set are both read from it, so a toggle is one row insert or
//! delete and the two views cannot drift apart.
use std::{collections::HashMap, path::Path, time::Duration};

use chrono::{DateTime, Utc};
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior,
};

use crate::models::{Attendee, ToggleOutcome, User, UserId, Venue, VenueLocation};
use crate::provider::Business;
use crate::utils;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const VENUE_COLUMNS: &str = "id, external_id, name, image_url, url, rating,
    address, city, state, zip_code, phone, last_updated_utc";

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        utils::ensure_parent(path);
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> rusqlite::Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users(
                id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                created_at_utc TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS venues(
                id INTEGER PRIMARY KEY,
                external_id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                image_url TEXT,
                url TEXT,
                rating REAL,
                address TEXT,
                city TEXT,
                state TEXT,
                zip_code TEXT,
                phone TEXT,
                first_seen_utc TEXT NOT NULL,
                last_updated_utc TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS attendance(
                venue_id INTEGER NOT NULL REFERENCES venues(id),
                user_id TEXT NOT NULL REFERENCES users(id),
                joined_at_utc TEXT NOT NULL,
                PRIMARY KEY (venue_id, user_id)
            );
            CREATE INDEX IF NOT EXISTS attendance_by_user ON attendance(user_id);",
        )?;
        Ok(())
    }

    /// Returns `false` when the identity is already taken.
    pub fn insert_user(&self, id: &UserId, display_name: &str) -> rusqlite::Result<bool> {
        let inserted = self.conn.execute(
            "INSERT INTO users (id, display_name, created_at_utc) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO NOTHING",
            params![id.as_str(), display_name, Utc::now()],
        )?;
        Ok(inserted == 1)
    }

    pub fn get_user(&self, id: &UserId) -> rusqlite::Result<Option<User>> {
        let row = self
            .conn
            .query_row(
                "SELECT display_name, created_at_utc FROM users WHERE id = ?1",
                params![id.as_str()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, DateTime<Utc>>(1)?)),
            )
            .optional()?;

        let Some((display_name, created_at)) = row else {
            return Ok(None);
        };

        let going_to = self
            .venues_for_user(id)?
            .into_iter()
            .map(|venue| venue.external_id)
            .collect();

        Ok(Some(User {
            id: id.clone(),
            display_name,
            going_to,
            created_at,
        }))
    }

    pub fn user_exists(&self, id: &UserId) -> rusqlite::Result<bool> {
        self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
            params![id.as_str()],
            |row| row.get(0),
        )
    }

    pub fn venue(&self, external_id: &str) -> rusqlite::Result<Option<Venue>> {
        let sql = format!("SELECT {VENUE_COLUMNS} FROM venues WHERE external_id = ?1");
        let venue = self
            .conn
            .query_row(&sql, params![external_id], venue_from_row)
            .optional()?;

        match venue {
            Some(mut venue) => {
                venue.attendees = self
                    .attendance_for(&[external_id])?
                    .remove(external_id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|attendee| attendee.user_id)
                    .collect();
                Ok(Some(venue))
            }
            None => Ok(None),
        }
    }

    pub fn venue_exists(&self, external_id: &str) -> rusqlite::Result<bool> {
        self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM venues WHERE external_id = ?1)",
            params![external_id],
            |row| row.get(0),
        )
    }

    /// Create-if-absent keyed on the unique external id the caller asked for,
    /// which may be an alias of `business.id`. Returns whether this call
    /// created the row; a concurrent loser sees `false`.
    pub fn insert_venue_if_absent(
        &self,
        external_id: &str,
        business: &Business,
    ) -> rusqlite::Result<bool> {
        let now = Utc::now();
        let inserted = self.conn.execute(
            "INSERT INTO venues (external_id, name, image_url, url, rating,
                address, city, state, zip_code, phone, first_seen_utc, last_updated_utc)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
             ON CONFLICT(external_id) DO NOTHING",
            params![
                external_id,
                business.name,
                business.image_url,
                business.url,
                business.rating,
                business.location.address,
                business.location.city,
                business.location.state,
                business.location.zip_code,
                business.phone,
                now,
            ],
        )?;
        Ok(inserted == 1)
    }

    /// Rewrites cached provider fields for businesses already in the ledger.
    /// Unknown ids are skipped; attendance and `last_updated_utc` are untouched.
    pub fn refresh_cached_fields(&mut self, businesses: &[Business]) -> rusqlite::Result<usize> {
        if businesses.is_empty() {
            return Ok(0);
        }
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut refreshed = 0;
        {
            let mut stmt = tx.prepare(
                "UPDATE venues SET name = ?2, image_url = ?3, url = ?4, rating = ?5,
                    address = ?6, city = ?7, state = ?8, zip_code = ?9, phone = ?10
                 WHERE external_id = ?1",
            )?;
            for business in businesses {
                refreshed += stmt.execute(params![
                    business.id,
                    business.name,
                    business.image_url,
                    business.url,
                    business.rating,
                    business.location.address,
                    business.location.city,
                    business.location.state,
                    business.location.zip_code,
                    business.phone,
                ])?;
            }
        }
        tx.commit()?;
        Ok(refreshed)
    }

    /// Attendees per external id, in the order they joined. One query for the
    /// whole batch; venues with no attendees are absent from the map.
    pub fn attendance_for(
        &self,
        external_ids: &[&str],
    ) -> rusqlite::Result<HashMap<String, Vec<Attendee>>> {
        let mut out: HashMap<String, Vec<Attendee>> = HashMap::new();
        if external_ids.is_empty() {
            return Ok(out);
        }

        let placeholders = vec!["?"; external_ids.len()].join(", ");
        let sql = format!(
            "SELECT v.external_id, a.user_id, u.display_name
             FROM attendance a
             JOIN venues v ON v.id = a.venue_id
             JOIN users u ON u.id = a.user_id
             WHERE v.external_id IN ({placeholders})
             ORDER BY a.rowid"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(external_ids.iter()), |row| {
            Ok((
                row.get::<_, String>(0)?,
                Attendee {
                    user_id: UserId::new(&row.get::<_, String>(1)?),
                    display_name: row.get(2)?,
                },
            ))
        })?;

        for row in rows {
            let (external_id, attendee) = row?;
            out.entry(external_id).or_default().push(attendee);
        }
        Ok(out)
    }

    /// Flips the user's attendance on an existing venue inside one IMMEDIATE
    /// transaction. `None` when the venue is not in the ledger.
    pub fn toggle_attendance(
        &mut self,
        external_id: &str,
        user: &UserId,
    ) -> rusqlite::Result<Option<ToggleOutcome>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let venue_id: Option<i64> = tx
            .query_row(
                "SELECT id FROM venues WHERE external_id = ?1",
                params![external_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(venue_id) = venue_id else {
            return Ok(None);
        };

        let removed = tx.execute(
            "DELETE FROM attendance WHERE venue_id = ?1 AND user_id = ?2",
            params![venue_id, user.as_str()],
        )?;

        let attending = if removed == 0 {
            let now = Utc::now();
            tx.execute(
                "INSERT INTO attendance (venue_id, user_id, joined_at_utc) VALUES (?1, ?2, ?3)",
                params![venue_id, user.as_str(), now],
            )?;
            tx.execute(
                "UPDATE venues SET last_updated_utc = ?2 WHERE id = ?1",
                params![venue_id, now],
            )?;
            true
        } else {
            false
        };

        let attendee_count: usize = tx.query_row(
            "SELECT COUNT(*) FROM attendance WHERE venue_id = ?1",
            params![venue_id],
            |row| row.get(0),
        )?;
        tx.commit()?;

        Ok(Some(ToggleOutcome {
            attending,
            attendee_count,
            venue_id,
        }))
    }

    /// Venues the user is going to, in the order they joined.
    pub fn venues_for_user(&self, user: &UserId) -> rusqlite::Result<Vec<Venue>> {
        let sql = format!(
            "SELECT {} FROM venues v
             JOIN attendance a ON a.venue_id = v.id
             WHERE a.user_id = ?1
             ORDER BY a.rowid",
            VENUE_COLUMNS
                .split(',')
                .map(|col| format!("v.{}", col.trim()))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user.as_str()], venue_from_row)?;

        let mut venues = Vec::new();
        for row in rows {
            venues.push(row?);
        }

        let ids: Vec<&str> = venues.iter().map(|v| v.external_id.as_str()).collect();
        let mut attendance = self.attendance_for(&ids)?;
        for venue in &mut venues {
            venue.attendees = attendance
                .remove(&venue.external_id)
                .unwrap_or_default()
                .into_iter()
                .map(|attendee| attendee.user_id)
                .collect();
        }
        Ok(venues)
    }
}

fn venue_from_row(row: &Row<'_>) -> rusqlite::Result<Venue> {
    Ok(Venue {
        id: row.get(0)?,
        external_id: row.get(1)?,
        name: row.get(2)?,
        image_url: row.get(3)?,
        url: row.get(4)?,
        rating: row.get(5)?,
        location: VenueLocation {
            address: row.get(6)?,
            city: row.get(7)?,
            state: row.get(8)?,
            zip_code: row.get(9)?,
        },
        phone: row.get(10)?,
        attendees: Vec::new(),
        last_updated: row.get(11)?,
    })
}
