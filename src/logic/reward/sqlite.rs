//! SQLite Ledger
//!
//! Persistent storage cho users + readings audit trail.
//! Một connection duy nhất, owned bởi session orchestrator.

use std::path::Path;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::constants::DEFAULT_HISTORY_LIMIT;
use crate::logic::engine::Verdict;
use crate::logic::features::Sample;
use super::{AuditEntry, LedgerError, RewardLedger, UserRecord};

const SCHEMA_SQL: &str = r#"
-- Producers
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    phone TEXT NOT NULL,
    coins REAL NOT NULL DEFAULT 0
);

-- Every verified reading
CREATE TABLE IF NOT EXISTS readings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    ts TEXT NOT NULL,
    voltage REAL NOT NULL,
    current REAL NOT NULL,
    power REAL NOT NULL,
    is_anomaly INTEGER NOT NULL,
    verdict TEXT NOT NULL,
    coins_earned REAL NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_readings_user ON readings(user_id, id);
"#;

pub struct SqliteLedger {
    conn: Connection,
}

impl SqliteLedger {
    /// Open (or create) the ledger file, creating parent dirs
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| LedgerError::Unavailable(format!("{}: {}", parent.display(), e)))?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, LedgerError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, LedgerError> {
        conn.execute_batch(SCHEMA_SQL)?;
        log::debug!("Ledger schema applied");
        Ok(Self { conn })
    }

    // ========================================================================
    // USERS
    // ========================================================================

    /// Register a producer, returning the new id
    pub fn create_user(&self, name: &str, phone: &str) -> Result<i64, LedgerError> {
        self.conn.execute(
            "INSERT INTO users (name, phone) VALUES (?1, ?2)",
            params![name, phone],
        )?;
        let id = self.conn.last_insert_rowid();
        log::info!("Registered user {} ({})", id, name);
        Ok(id)
    }

    pub fn get_user(&self, user_id: i64) -> Result<Option<UserRecord>, LedgerError> {
        let user = self
            .conn
            .query_row(
                "SELECT id, name, phone, coins FROM users WHERE id = ?1",
                params![user_id],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Oldest account registered with this phone
    pub fn find_user_by_phone(&self, phone: &str) -> Result<Option<UserRecord>, LedgerError> {
        let user = self
            .conn
            .query_row(
                "SELECT id, name, phone, coins FROM users WHERE phone = ?1 ORDER BY id LIMIT 1",
                params![phone],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    pub fn balance(&self, user_id: i64) -> Result<f64, LedgerError> {
        self.get_user(user_id)?
            .map(|u| u.coins)
            .ok_or(LedgerError::UnknownUser(user_id))
    }

    // ========================================================================
    // HISTORY
    // ========================================================================

    /// Most recent readings first
    pub fn get_history(&self, user_id: i64, limit: usize) -> Result<Vec<AuditEntry>, LedgerError> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, ts, voltage, current, power, is_anomaly, verdict, coins_earned
             FROM readings WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![user_id, limit as i64], |row| {
            let ts: String = row.get(1)?;
            let timestamp = DateTime::parse_from_rfc3339(&ts)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
                })?;

            Ok(AuditEntry {
                user_id: row.get(0)?,
                timestamp,
                voltage: row.get(2)?,
                current: row.get(3)?,
                power: row.get(4)?,
                is_anomaly: row.get(5)?,
                verdict: row.get(6)?,
                coins_earned: row.get(7)?,
            })
        })?;

        let mut history = Vec::new();
        for row in rows {
            history.push(row?);
        }
        Ok(history)
    }

    pub fn recent_history(&self, user_id: i64) -> Result<Vec<AuditEntry>, LedgerError> {
        self.get_history(user_id, DEFAULT_HISTORY_LIMIT)
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        coins: row.get(3)?,
    })
}

impl RewardLedger for SqliteLedger {
    fn apply_reward(&mut self, user_id: i64, increment: f64) -> Result<f64, LedgerError> {
        let changed = self.conn.execute(
            "UPDATE users SET coins = coins + ?1 WHERE id = ?2",
            params![increment, user_id],
        )?;
        if changed == 0 {
            return Err(LedgerError::UnknownUser(user_id));
        }
        self.balance(user_id)
    }

    fn record_audit(
        &mut self,
        user_id: i64,
        sample: &Sample,
        verdict: Verdict,
        increment: f64,
    ) -> Result<(), LedgerError> {
        let entry = AuditEntry::new(user_id, sample, verdict, increment);
        self.conn.execute(
            "INSERT INTO readings (user_id, ts, voltage, current, power, is_anomaly, verdict, coins_earned)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.user_id,
                entry.timestamp.to_rfc3339(),
                entry.voltage,
                entry.current,
                entry.power,
                entry.is_anomaly,
                entry.verdict,
                entry.coins_earned,
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_create_and_get_user() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        let id = ledger.create_user("Lan", "0901234567").unwrap();

        let user = ledger.get_user(id).unwrap().unwrap();
        assert_eq!(user.name, "Lan");
        assert_eq!(user.coins, 0.0);
        assert!(ledger.get_user(id + 1).unwrap().is_none());
        assert_eq!(ledger.find_user_by_phone("0901234567").unwrap().unwrap().id, id);
    }

    #[test]
    fn test_apply_reward_accumulates() {
        let mut ledger = SqliteLedger::open_in_memory().unwrap();
        let id = ledger.create_user("Minh", "1").unwrap();

        ledger.apply_reward(id, 0.25).unwrap();
        let balance = ledger.apply_reward(id, 0.5).unwrap();
        assert_eq!(balance, 0.75);
        assert_eq!(ledger.balance(id).unwrap(), 0.75);

        assert!(matches!(ledger.apply_reward(999, 1.0), Err(LedgerError::UnknownUser(999))));
    }

    #[test]
    fn test_history_newest_first_with_limit() {
        let mut ledger = SqliteLedger::open_in_memory().unwrap();
        let id = ledger.create_user("An", "2").unwrap();
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        for i in 0..25 {
            let s = Sample::new(0.8, 0.02, start + Duration::seconds(i));
            ledger.record_audit(id, &s, Verdict::Authentic, 0.0000016).unwrap();
        }
        let spike = Sample::new(5.0, 200.0, start + Duration::seconds(30));
        ledger.record_audit(id, &spike, Verdict::Anomalous, 0.0).unwrap();

        let history = ledger.recent_history(id).unwrap();
        assert_eq!(history.len(), 20);
        assert!(history[0].is_anomaly);
        assert_eq!(history[0].verdict, "anomalous");
        assert_eq!(history[0].timestamp, spike.timestamp());
        assert_eq!(history[1].timestamp, start + Duration::seconds(24));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db").join("users.db");

        let id = {
            let mut ledger = SqliteLedger::open(&path).unwrap();
            let id = ledger.create_user("Hoa", "3").unwrap();
            ledger.apply_reward(id, 1.5).unwrap();
            id
        };

        let ledger = SqliteLedger::open(&path).unwrap();
        assert_eq!(ledger.balance(id).unwrap(), 1.5);
    }
}
