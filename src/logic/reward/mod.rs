//! Reward Module - Green coin accounting
//!
//! Engine quyết định increment, ledger chỉ ghi nhận.
//! Ledger failures never feed back into verdicts or engine state.
//!
//! ## Structure
//! - `sqlite` - Persistent ledger (users + readings audit trail)
//! - `memory` - In-memory ledger for tests / dry runs

pub mod sqlite;
pub mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::engine::Verdict;
use crate::logic::features::Sample;

pub use sqlite::SqliteLedger;
pub use memory::MemoryLedger;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("unknown user {0}")]
    UnknownUser(i64),

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

// ============================================================================
// RECORDS
// ============================================================================

/// Registered producer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub coins: f64,
}

/// One audited reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub user_id: i64,
    pub timestamp: DateTime<Utc>,
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    pub is_anomaly: bool,
    pub verdict: String,
    pub coins_earned: f64,
}

impl AuditEntry {
    pub fn new(user_id: i64, sample: &Sample, verdict: Verdict, coins_earned: f64) -> Self {
        Self {
            user_id,
            timestamp: sample.timestamp(),
            voltage: sample.voltage(),
            current: sample.current(),
            power: sample.power(),
            is_anomaly: verdict.is_anomalous(),
            verdict: verdict.as_str().to_string(),
            coins_earned,
        }
    }
}

// ============================================================================
// LEDGER TRAIT
// ============================================================================

/// External store for balances and the audit trail
pub trait RewardLedger {
    /// Credit `increment` and return the new balance
    fn apply_reward(&mut self, user_id: i64, increment: f64) -> Result<f64, LedgerError>;

    fn record_audit(
        &mut self,
        user_id: i64,
        sample: &Sample,
        verdict: Verdict,
        increment: f64,
    ) -> Result<(), LedgerError>;
}

// ============================================================================
// SESSION BALANCE
// ============================================================================

/// Session-side running balance, kept even when the ledger is down
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardState {
    pub balance: f64,
    pub earned_this_session: f64,
    pub withheld_this_session: f64,
    pub credited_samples: u64,
    /// Credited locally, not yet accepted by the ledger
    pub pending: f64,
}

impl RewardState {
    pub fn with_balance(balance: f64) -> Self {
        Self {
            balance,
            ..Default::default()
        }
    }

    pub fn credit(&mut self, increment: f64) {
        if increment > 0.0 {
            self.balance += increment;
            self.pending += increment;
            self.earned_this_session += increment;
            self.credited_samples += 1;
        }
    }

    pub fn withhold(&mut self, increment: f64) {
        if increment > 0.0 {
            self.withheld_this_session += increment;
        }
    }

    /// The ledger accepted every pending credit and now reports
    /// `ledger_balance`. It is authoritative from here on.
    pub fn settle(&mut self, ledger_balance: f64) {
        self.pending = 0.0;
        self.balance = ledger_balance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_state_credit() {
        let mut state = RewardState::with_balance(1.0);
        state.credit(0.5);
        state.credit(0.0);
        state.withhold(0.25);

        assert_eq!(state.balance, 1.5);
        assert_eq!(state.earned_this_session, 0.5);
        assert_eq!(state.withheld_this_session, 0.25);
        assert_eq!(state.credited_samples, 1);
        assert_eq!(state.pending, 0.5);
    }

    #[test]
    fn test_reward_state_settle_clears_pending() {
        let mut state = RewardState::with_balance(1.0);
        state.credit(0.5);
        state.credit(0.25);
        assert_eq!(state.pending, 0.75);

        state.settle(1.75);
        assert_eq!(state.pending, 0.0);
        assert_eq!(state.balance, 1.75);
        assert_eq!(state.earned_this_session, 0.75);
    }

    #[test]
    fn test_audit_entry_from_sample() {
        let sample = Sample::now(5.0, 200.0);
        let entry = AuditEntry::new(7, &sample, Verdict::Anomalous, 0.0);

        assert!(entry.is_anomaly);
        assert_eq!(entry.verdict, "anomalous");
        assert_eq!(entry.power, 1000.0);
    }
}
