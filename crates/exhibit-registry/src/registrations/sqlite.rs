//! SQLite-backed record store.
//!
//! Each table keeps its lookup and foreign-key columns relational and the
//! remaining validated fields as a JSON document, so cascades and ownership
//! checks stay in the database while the field set can follow the domain types.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use super::domain::{
    Appointments, AppointmentsDetails, AppointmentsId, Exhibit, ExhibitDetails, ExhibitEntry,
    ExhibitId, ExhibitParticipation, ExhibitReview, Federation, FederationDetails, FederationId,
    Participant, ParticipantDetails, ParticipantId, ParticipationDetails, ParticipationId,
    TravelDetails, TravelDetailsData, TravelDetailsId, UserId, MAX_PARTICIPATIONS_PER_EXHIBIT,
};
use super::store::{RecordStore, StoreError};

const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS participants (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL UNIQUE,
    data TEXT NOT NULL,
    created_at TEXT NOT NULL,
    changed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS federations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    country_code TEXT NOT NULL,
    data TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_federations_country ON federations(country_code);

CREATE TABLE IF NOT EXISTS appointments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    participant_id INTEGER NOT NULL UNIQUE REFERENCES participants(id) ON DELETE CASCADE,
    federation_id INTEGER NOT NULL REFERENCES federations(id),
    commissioner INTEGER NOT NULL DEFAULT 0,
    data TEXT NOT NULL,
    created_at TEXT NOT NULL,
    changed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS exhibits (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    participant_id INTEGER NOT NULL REFERENCES participants(id) ON DELETE CASCADE,
    data TEXT NOT NULL,
    jury_group INTEGER,
    rejected INTEGER NOT NULL DEFAULT 0,
    start_frame INTEGER,
    received INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    changed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_exhibits_participant ON exhibits(participant_id);

CREATE TABLE IF NOT EXISTS exhibit_participations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    exhibit_id INTEGER NOT NULL REFERENCES exhibits(id) ON DELETE CASCADE,
    data TEXT NOT NULL,
    created_at TEXT NOT NULL,
    changed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_participations_exhibit ON exhibit_participations(exhibit_id);

CREATE TABLE IF NOT EXISTS travel_details (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    participant_id INTEGER NOT NULL UNIQUE REFERENCES participants(id) ON DELETE CASCADE,
    data TEXT NOT NULL,
    created_at TEXT NOT NULL,
    changed_at TEXT NOT NULL
);
"#;

const PARTICIPANT_COLUMNS: &str = "p.id, p.user_id, p.data, p.created_at, p.changed_at";
const APPOINTMENTS_COLUMNS: &str = "a.id, a.participant_id, a.data, a.created_at, a.changed_at";
const EXHIBIT_COLUMNS: &str = "e.id, e.participant_id, e.data, e.jury_group, e.rejected, \
     e.start_frame, e.received, e.created_at, e.changed_at";
const PARTICIPATION_COLUMNS: &str = "x.id, x.exhibit_id, x.data, x.created_at, x.changed_at";
const TRAVEL_COLUMNS: &str = "t.id, t.participant_id, t.data, t.created_at, t.changed_at";

/// Staff columns added after the first release, as `(name, definition)`.
const EXHIBIT_REVIEW_UPGRADES: [(&str, &str); 2] = [
    ("start_frame", "INTEGER"),
    ("received", "INTEGER NOT NULL DEFAULT 0"),
];

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        StoreError::Unavailable(value.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        StoreError::Unavailable(format!("record encoding failed: {value}"))
    }
}

/// Record store persisted in a single SQLite file.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        upgrade_exhibits(&conn)?;
        info!(path = %path.display(), "sqlite record store initialized");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("sqlite connection mutex poisoned".to_string()))
    }
}

/// Adds review columns missing from databases created by older builds.
fn upgrade_exhibits(conn: &Connection) -> Result<(), StoreError> {
    let present: Vec<String> = {
        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('exhibits')")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        names
    };
    for (column, definition) in EXHIBIT_REVIEW_UPGRADES {
        if !present.iter().any(|name| name == column) {
            conn.execute_batch(&format!("ALTER TABLE exhibits ADD COLUMN {column} {definition}"))?;
            info!(column, "exhibits table upgraded");
        }
    }
    Ok(())
}

fn key(id: u64) -> i64 {
    id as i64
}

fn encode<T: Serialize>(value: &T) -> Result<String, StoreError> {
    Ok(serde_json::to_string(value)?)
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, index: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(index)?;
    serde_json::from_str(&raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err)))
}

fn participant_from_row(row: &Row<'_>, at: usize) -> rusqlite::Result<Participant> {
    Ok(Participant {
        id: ParticipantId(row.get::<_, i64>(at)? as u64),
        user: UserId(row.get(at + 1)?),
        details: json_column(row, at + 2)?,
        created_at: row.get(at + 3)?,
        changed_at: row.get(at + 4)?,
    })
}

fn federation_from_row(row: &Row<'_>) -> rusqlite::Result<Federation> {
    Ok(Federation {
        id: FederationId(row.get::<_, i64>(0)? as u64),
        details: json_column(row, 1)?,
    })
}

fn appointments_from_row(row: &Row<'_>) -> rusqlite::Result<Appointments> {
    Ok(Appointments {
        id: AppointmentsId(row.get::<_, i64>(0)? as u64),
        participant: ParticipantId(row.get::<_, i64>(1)? as u64),
        details: json_column(row, 2)?,
        created_at: row.get(3)?,
        changed_at: row.get(4)?,
    })
}

fn exhibit_from_row(row: &Row<'_>) -> rusqlite::Result<Exhibit> {
    Ok(Exhibit {
        id: ExhibitId(row.get::<_, i64>(0)? as u64),
        participant: ParticipantId(row.get::<_, i64>(1)? as u64),
        details: json_column(row, 2)?,
        review: ExhibitReview {
            jury_group: row.get::<_, Option<i64>>(3)?.map(|group| group as u32),
            rejected: row.get(4)?,
            start_frame: row.get::<_, Option<i64>>(5)?.map(|frame| frame as u32),
            received: row.get(6)?,
        },
        created_at: row.get(7)?,
        changed_at: row.get(8)?,
    })
}

fn participation_from_row(row: &Row<'_>) -> rusqlite::Result<ExhibitParticipation> {
    Ok(ExhibitParticipation {
        id: ParticipationId(row.get::<_, i64>(0)? as u64),
        exhibit: ExhibitId(row.get::<_, i64>(1)? as u64),
        details: json_column(row, 2)?,
        created_at: row.get(3)?,
        changed_at: row.get(4)?,
    })
}

fn travel_from_row(row: &Row<'_>) -> rusqlite::Result<TravelDetails> {
    Ok(TravelDetails {
        id: TravelDetailsId(row.get::<_, i64>(0)? as u64),
        participant: ParticipantId(row.get::<_, i64>(1)? as u64),
        details: json_column(row, 2)?,
        created_at: row.get(3)?,
        changed_at: row.get(4)?,
    })
}

fn check_limit(participations: &[ParticipationDetails]) -> Result<(), StoreError> {
    if participations.len() > MAX_PARTICIPATIONS_PER_EXHIBIT {
        return Err(StoreError::ParticipationLimit {
            limit: MAX_PARTICIPATIONS_PER_EXHIBIT,
        });
    }
    Ok(())
}

fn select_participations(
    conn: &Connection,
    exhibit: ExhibitId,
) -> Result<Vec<ExhibitParticipation>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PARTICIPATION_COLUMNS} FROM exhibit_participations x
         WHERE x.exhibit_id = ?1 ORDER BY x.id"
    ))?;
    let rows = stmt
        .query_map(params![key(exhibit.0)], participation_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn select_exhibit(conn: &Connection, id: ExhibitId) -> Result<Option<Exhibit>, StoreError> {
    let exhibit = conn
        .query_row(
            &format!("SELECT {EXHIBIT_COLUMNS} FROM exhibits e WHERE e.id = ?1"),
            params![key(id.0)],
            exhibit_from_row,
        )
        .optional()?;
    Ok(exhibit)
}

/// Rewrites rows in place by position; extra rows are inserted and surplus
/// rows deleted, so surviving participations keep their ids.
fn replace_participations(
    tx: &Transaction<'_>,
    exhibit: ExhibitId,
    participations: &[ParticipationDetails],
) -> Result<(), StoreError> {
    let existing: Vec<i64> = {
        let mut stmt = tx.prepare(
            "SELECT id FROM exhibit_participations WHERE exhibit_id = ?1 ORDER BY id",
        )?;
        let ids = stmt
            .query_map(params![key(exhibit.0)], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        ids
    };
    let now = Utc::now();
    let mut update = tx.prepare(
        "UPDATE exhibit_participations SET data = ?2, changed_at = ?3 WHERE id = ?1",
    )?;
    let mut insert = tx.prepare(
        "INSERT INTO exhibit_participations (exhibit_id, data, created_at, changed_at)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (index, details) in participations.iter().enumerate() {
        match existing.get(index) {
            Some(id) => update.execute(params![id, encode(details)?, now])?,
            None => insert.execute(params![key(exhibit.0), encode(details)?, now, now])?,
        };
    }
    let mut delete = tx.prepare("DELETE FROM exhibit_participations WHERE id = ?1")?;
    for id in existing.iter().skip(participations.len()) {
        delete.execute(params![id])?;
    }
    Ok(())
}

impl RecordStore for SqliteRecordStore {
    fn participant_for_user(&self, user: &UserId) -> Result<Option<Participant>, StoreError> {
        let conn = self.lock()?;
        let participant = conn
            .query_row(
                &format!("SELECT {PARTICIPANT_COLUMNS} FROM participants p WHERE p.user_id = ?1"),
                params![user.0],
                |row| participant_from_row(row, 0),
            )
            .optional()?;
        Ok(participant)
    }

    fn participant(&self, id: ParticipantId) -> Result<Option<Participant>, StoreError> {
        let conn = self.lock()?;
        let participant = conn
            .query_row(
                &format!("SELECT {PARTICIPANT_COLUMNS} FROM participants p WHERE p.id = ?1"),
                params![key(id.0)],
                |row| participant_from_row(row, 0),
            )
            .optional()?;
        Ok(participant)
    }

    fn participants(&self) -> Result<Vec<Participant>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants p ORDER BY p.id"
        ))?;
        let rows = stmt
            .query_map([], |row| participant_from_row(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn upsert_participant(
        &self,
        user: &UserId,
        details: ParticipantDetails,
    ) -> Result<Participant, StoreError> {
        let conn = self.lock()?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO participants (user_id, data, created_at, changed_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(user_id) DO UPDATE SET data = excluded.data, changed_at = excluded.changed_at",
            params![user.0, encode(&details)?, now],
        )?;
        let participant = conn.query_row(
            &format!("SELECT {PARTICIPANT_COLUMNS} FROM participants p WHERE p.user_id = ?1"),
            params![user.0],
            |row| participant_from_row(row, 0),
        )?;
        Ok(participant)
    }

    fn delete_participant(&self, id: ParticipantId) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM participants WHERE id = ?1", params![key(id.0)])?;
        Ok(removed > 0)
    }

    fn federations(&self) -> Result<Vec<Federation>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, data FROM federations ORDER BY id")?;
        let rows = stmt
            .query_map([], federation_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn federation(&self, id: FederationId) -> Result<Option<Federation>, StoreError> {
        let conn = self.lock()?;
        let federation = conn
            .query_row(
                "SELECT id, data FROM federations WHERE id = ?1",
                params![key(id.0)],
                federation_from_row,
            )
            .optional()?;
        Ok(federation)
    }

    fn federation_by_country(&self, country_code: &str) -> Result<Option<Federation>, StoreError> {
        let conn = self.lock()?;
        let federation = conn
            .query_row(
                "SELECT id, data FROM federations WHERE country_code = upper(?1)
                 ORDER BY id LIMIT 1",
                params![country_code],
                federation_from_row,
            )
            .optional()?;
        Ok(federation)
    }

    fn insert_federation(&self, details: FederationDetails) -> Result<Federation, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO federations (country_code, data) VALUES (upper(?1), ?2)",
            params![details.country_code, encode(&details)?],
        )?;
        Ok(Federation {
            id: FederationId(conn.last_insert_rowid() as u64),
            details,
        })
    }

    fn appointments_for(
        &self,
        participant: ParticipantId,
    ) -> Result<Option<Appointments>, StoreError> {
        let conn = self.lock()?;
        let appointments = conn
            .query_row(
                &format!(
                    "SELECT {APPOINTMENTS_COLUMNS} FROM appointments a WHERE a.participant_id = ?1"
                ),
                params![key(participant.0)],
                appointments_from_row,
            )
            .optional()?;
        Ok(appointments)
    }

    fn all_appointments(&self) -> Result<Vec<Appointments>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {APPOINTMENTS_COLUMNS} FROM appointments a ORDER BY a.id"
        ))?;
        let rows = stmt
            .query_map([], appointments_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn commissioner_for_country(
        &self,
        country_code: &str,
    ) -> Result<Option<(Appointments, Participant)>, StoreError> {
        let conn = self.lock()?;
        let found = conn
            .query_row(
                &format!(
                    "SELECT {APPOINTMENTS_COLUMNS}, {PARTICIPANT_COLUMNS}
                     FROM appointments a
                     JOIN federations f ON f.id = a.federation_id
                     JOIN participants p ON p.id = a.participant_id
                     WHERE a.commissioner = 1 AND f.country_code = upper(?1)
                     ORDER BY a.id LIMIT 1"
                ),
                params![country_code],
                |row| Ok((appointments_from_row(row)?, participant_from_row(row, 5)?)),
            )
            .optional()?;
        Ok(found)
    }

    fn upsert_appointments(
        &self,
        participant: ParticipantId,
        details: AppointmentsDetails,
    ) -> Result<Appointments, StoreError> {
        let conn = self.lock()?;
        let known: i64 = conn.query_row(
            "SELECT (SELECT COUNT(*) FROM participants WHERE id = ?1)
                  * (SELECT COUNT(*) FROM federations WHERE id = ?2)",
            params![key(participant.0), key(details.federation.0)],
            |row| row.get(0),
        )?;
        if known == 0 {
            return Err(StoreError::NotFound);
        }
        let now = Utc::now();
        conn.execute(
            "INSERT INTO appointments (participant_id, federation_id, commissioner, data, created_at, changed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(participant_id) DO UPDATE SET
                federation_id = excluded.federation_id,
                commissioner = excluded.commissioner,
                data = excluded.data,
                changed_at = excluded.changed_at",
            params![
                key(participant.0),
                key(details.federation.0),
                details.commissioner,
                encode(&details)?,
                now
            ],
        )?;
        let appointments = conn.query_row(
            &format!("SELECT {APPOINTMENTS_COLUMNS} FROM appointments a WHERE a.participant_id = ?1"),
            params![key(participant.0)],
            appointments_from_row,
        )?;
        Ok(appointments)
    }

    fn exhibits_for(&self, participant: ParticipantId) -> Result<Vec<Exhibit>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {EXHIBIT_COLUMNS} FROM exhibits e WHERE e.participant_id = ?1 ORDER BY e.id"
        ))?;
        let rows = stmt
            .query_map(params![key(participant.0)], exhibit_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn exhibit(&self, id: ExhibitId) -> Result<Option<Exhibit>, StoreError> {
        let conn = self.lock()?;
        select_exhibit(&conn, id)
    }

    fn exhibits(&self) -> Result<Vec<Exhibit>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {EXHIBIT_COLUMNS} FROM exhibits e ORDER BY e.id"
        ))?;
        let rows = stmt
            .query_map([], exhibit_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn participations_for(
        &self,
        exhibit: ExhibitId,
    ) -> Result<Vec<ExhibitParticipation>, StoreError> {
        let conn = self.lock()?;
        select_participations(&conn, exhibit)
    }

    fn participations(&self) -> Result<Vec<ExhibitParticipation>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PARTICIPATION_COLUMNS} FROM exhibit_participations x ORDER BY x.id"
        ))?;
        let rows = stmt
            .query_map([], participation_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn insert_exhibit(
        &self,
        participant: ParticipantId,
        details: ExhibitDetails,
        participations: Vec<ParticipationDetails>,
    ) -> Result<ExhibitEntry, StoreError> {
        check_limit(&participations)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let owner: Option<i64> = tx
            .query_row(
                "SELECT id FROM participants WHERE id = ?1",
                params![key(participant.0)],
                |row| row.get(0),
            )
            .optional()?;
        if owner.is_none() {
            return Err(StoreError::NotFound);
        }
        let now = Utc::now();
        tx.execute(
            "INSERT INTO exhibits (participant_id, data, created_at, changed_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![key(participant.0), encode(&details)?, now],
        )?;
        let id = ExhibitId(tx.last_insert_rowid() as u64);
        replace_participations(&tx, id, &participations)?;
        tx.commit()?;

        let exhibit = select_exhibit(&conn, id)?.ok_or(StoreError::NotFound)?;
        let participations = select_participations(&conn, id)?;
        Ok(ExhibitEntry {
            exhibit,
            participations,
        })
    }

    fn update_exhibit(
        &self,
        id: ExhibitId,
        details: ExhibitDetails,
        participations: Vec<ParticipationDetails>,
    ) -> Result<ExhibitEntry, StoreError> {
        check_limit(&participations)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let updated = tx.execute(
            "UPDATE exhibits SET data = ?2, changed_at = ?3 WHERE id = ?1",
            params![key(id.0), encode(&details)?, Utc::now()],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound);
        }
        replace_participations(&tx, id, &participations)?;
        tx.commit()?;

        let exhibit = select_exhibit(&conn, id)?.ok_or(StoreError::NotFound)?;
        let participations = select_participations(&conn, id)?;
        Ok(ExhibitEntry {
            exhibit,
            participations,
        })
    }

    fn delete_exhibit(&self, id: ExhibitId) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM exhibits WHERE id = ?1", params![key(id.0)])?;
        Ok(removed > 0)
    }

    fn review_exhibit(&self, id: ExhibitId, review: ExhibitReview) -> Result<Exhibit, StoreError> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE exhibits
             SET jury_group = ?2, rejected = ?3, start_frame = ?4, received = ?5, changed_at = ?6
             WHERE id = ?1",
            params![
                key(id.0),
                review.jury_group.map(i64::from),
                review.rejected,
                review.start_frame.map(i64::from),
                review.received,
                Utc::now()
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound);
        }
        select_exhibit(&conn, id)?.ok_or(StoreError::NotFound)
    }

    fn travel_details_for(
        &self,
        participant: ParticipantId,
    ) -> Result<Option<TravelDetails>, StoreError> {
        let conn = self.lock()?;
        let travel = conn
            .query_row(
                &format!("SELECT {TRAVEL_COLUMNS} FROM travel_details t WHERE t.participant_id = ?1"),
                params![key(participant.0)],
                travel_from_row,
            )
            .optional()?;
        Ok(travel)
    }

    fn all_travel_details(&self) -> Result<Vec<TravelDetails>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TRAVEL_COLUMNS} FROM travel_details t ORDER BY t.id"
        ))?;
        let rows = stmt
            .query_map([], travel_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn upsert_travel_details(
        &self,
        participant: ParticipantId,
        details: TravelDetailsData,
    ) -> Result<TravelDetails, StoreError> {
        let conn = self.lock()?;
        let now = Utc::now();
        let result = conn.execute(
            "INSERT INTO travel_details (participant_id, data, created_at, changed_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(participant_id) DO UPDATE SET data = excluded.data, changed_at = excluded.changed_at",
            params![key(participant.0), encode(&details)?, now],
        );
        match result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(StoreError::NotFound)
            }
            Err(err) => return Err(err.into()),
        }
        let travel = conn.query_row(
            &format!("SELECT {TRAVEL_COLUMNS} FROM travel_details t WHERE t.participant_id = ?1"),
            params![key(participant.0)],
            travel_from_row,
        )?;
        Ok(travel)
    }
}
