//! In-memory ledger

use std::collections::HashMap;

use crate::logic::engine::Verdict;
use crate::logic::features::Sample;
use super::{AuditEntry, LedgerError, RewardLedger};

#[derive(Debug, Default)]
pub struct MemoryLedger {
    balances: HashMap<i64, f64>,
    audit: Vec<AuditEntry>,
    failing: bool,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user_id: i64, balance: f64) -> Self {
        self.balances.insert(user_id, balance);
        self
    }

    /// Make every call fail with `Unavailable`
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    pub fn balance(&self, user_id: i64) -> Option<f64> {
        self.balances.get(&user_id).copied()
    }

    pub fn audit(&self) -> &[AuditEntry] {
        &self.audit
    }

    fn check(&self) -> Result<(), LedgerError> {
        if self.failing {
            return Err(LedgerError::Unavailable("memory ledger set to fail".into()));
        }
        Ok(())
    }
}

impl RewardLedger for MemoryLedger {
    fn apply_reward(&mut self, user_id: i64, increment: f64) -> Result<f64, LedgerError> {
        self.check()?;
        let balance = self
            .balances
            .get_mut(&user_id)
            .ok_or(LedgerError::UnknownUser(user_id))?;
        *balance += increment;
        Ok(*balance)
    }

    fn record_audit(
        &mut self,
        user_id: i64,
        sample: &Sample,
        verdict: Verdict,
        increment: f64,
    ) -> Result<(), LedgerError> {
        self.check()?;
        self.audit.push(AuditEntry::new(user_id, sample, verdict, increment));
        Ok(())
    }
}
