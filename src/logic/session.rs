//! Session - one producer, one engine, one running balance
//!
//! Orchestrator gọi `tick` / `process` cho mỗi sample. Ledger và journal là
//! side effects: lỗi ở đó chỉ log warn, không bao giờ đổi verdict.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic::dataset::{DatasetRecord, DatasetWriter};
use crate::logic::display::{format_current, format_power, format_voltage};
use crate::logic::engine::{Assessment, DecisionStage, Verdict, VerificationEngine};
use crate::logic::features::Sample;
use crate::logic::reward::{RewardLedger, RewardState};
use crate::logic::source::{SampleSource, SourceError};

// ============================================================================
// PENALTY
// ============================================================================

/// Reward cooldown after an anomaly, measured on sample timestamps
#[derive(Debug, Clone, Default)]
pub struct PenaltyTracker {
    duration: Option<Duration>,
    until: Option<DateTime<Utc>>,
}

impl PenaltyTracker {
    /// 0 disables the cooldown
    pub fn new(penalty_secs: u64) -> Self {
        Self {
            duration: (penalty_secs > 0).then(|| Duration::seconds(penalty_secs as i64)),
            until: None,
        }
    }

    pub fn trigger(&mut self, at: DateTime<Utc>) {
        if let Some(d) = self.duration {
            self.until = Some(at + d);
        }
    }

    /// Seconds left at `at`, 0 when not penalized
    pub fn remaining(&self, at: DateTime<Utc>) -> f64 {
        match self.until {
            Some(until) if until > at => (until - at).num_milliseconds() as f64 / 1000.0,
            _ => 0.0,
        }
    }

    pub fn is_active(&self, at: DateTime<Utc>) -> bool {
        self.remaining(at) > 0.0
    }
}

// ============================================================================
// TICK REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub sample: Sample,
    pub verdict: Verdict,
    pub stage: DecisionStage,
    /// Physics explanation for the reading
    pub reason: String,
    pub credited: f64,
    pub withheld: f64,
    pub balance: f64,
    pub penalty_remaining_secs: f64,
    pub calibrated_now: bool,
    pub ledger_ok: bool,
}

impl fmt::Display for TickReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | {} | {:<10} | coins {:.4}",
            format_voltage(self.sample.voltage()),
            format_current(self.sample.current()),
            format_power(self.sample.power()),
            self.verdict.as_str().to_uppercase(),
            self.balance
        )?;
        if self.credited > 0.0 {
            write!(f, " (+{:.6})", self.credited)?;
        }
        if self.penalty_remaining_secs > 0.0 {
            write!(f, " [penalty {}s]", self.penalty_remaining_secs.ceil() as u64)?;
        }
        Ok(())
    }
}

// ============================================================================
// SESSION
// ============================================================================

pub struct Session {
    id: Uuid,
    user_id: i64,
    engine: VerificationEngine,
    rewards: RewardState,
    penalty: PenaltyTracker,
    journal: Option<DatasetWriter>,
    started_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: i64, engine: VerificationEngine, opening_balance: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            engine,
            rewards: RewardState::with_balance(opening_balance),
            penalty: PenaltyTracker::default(),
            journal: None,
            started_at: Utc::now(),
        }
    }

    pub fn with_penalty_secs(mut self, secs: u64) -> Self {
        self.penalty = PenaltyTracker::new(secs);
        self
    }

    pub fn with_journal(mut self, journal: DatasetWriter) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Poll once; None if the source had nothing this tick
    pub fn tick(
        &mut self,
        source: &mut dyn SampleSource,
        ledger: &mut dyn RewardLedger,
    ) -> Result<Option<TickReport>, SourceError> {
        Ok(source.poll()?.map(|sample| self.process(sample, ledger)))
    }

    pub fn process(&mut self, sample: Sample, ledger: &mut dyn RewardLedger) -> TickReport {
        let assessment = self.engine.assess(sample);
        let at = sample.timestamp();

        if assessment.verdict == Verdict::Anomalous {
            self.penalty.trigger(at);
        }

        let penalized = assessment.verdict == Verdict::Authentic && self.penalty.is_active(at);
        let (credited, withheld) = if penalized {
            (0.0, assessment.reward_increment)
        } else {
            (assessment.reward_increment, 0.0)
        };
        self.rewards.credit(credited);
        self.rewards.withhold(withheld);

        let mut ledger_ok = true;
        let pending = self.rewards.pending;
        if pending > 0.0 {
            // Includes credits left over from earlier ledger failures
            match ledger.apply_reward(self.user_id, pending) {
                Ok(balance) => self.rewards.settle(balance),
                Err(e) => {
                    ledger_ok = false;
                    log::warn!(
                        "Ledger apply_reward failed for user {} ({:.6} pending): {}",
                        self.user_id, pending, e
                    );
                }
            }
        }
        if let Err(e) = ledger.record_audit(self.user_id, &sample, assessment.verdict, credited) {
            ledger_ok = false;
            log::warn!("Ledger record_audit failed for user {}: {}", self.user_id, e);
        }

        self.journal_append(&assessment);

        TickReport {
            sample,
            verdict: assessment.verdict,
            stage: assessment.stage,
            reason: assessment.reason,
            credited,
            withheld,
            balance: self.rewards.balance,
            penalty_remaining_secs: self.penalty.remaining(at),
            calibrated_now: assessment.calibrated_now,
            ledger_ok,
        }
    }

    fn journal_append(&self, assessment: &Assessment) {
        if let Some(journal) = &self.journal {
            let record = DatasetRecord::from_assessment(self.user_id, assessment);
            if let Err(e) = journal.append(&record) {
                log::warn!("Failed to append to dataset: {}", e);
            }
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn engine(&self) -> &VerificationEngine {
        &self.engine
    }

    pub fn rewards(&self) -> &RewardState {
        &self.rewards
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Shared handle to one active session
pub type SessionHandle = Arc<Mutex<Session>>;

/// Active sessions keyed by user id. The map lock only guards lookups;
/// each session has its own lock.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<i64, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session it replaced, if any
    pub fn insert(&self, session: Session) -> Option<SessionHandle> {
        let user_id = session.user_id();
        let previous = self
            .sessions
            .lock()
            .insert(user_id, Arc::new(Mutex::new(session)));
        if previous.is_some() {
            log::warn!("Replaced active session for user {}", user_id);
        }
        previous
    }

    pub fn remove(&self, user_id: i64) -> Option<SessionHandle> {
        self.sessions.lock().remove(&user_id)
    }

    pub fn get(&self, user_id: i64) -> Option<SessionHandle> {
        self.sessions.lock().get(&user_id).cloned()
    }

    /// Run `f` with exclusive access to the user's session. Other users'
    /// sessions stay available while `f` runs.
    pub fn with_session<R>(&self, user_id: i64, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let handle = self.get(user_id)?;
        let mut session = handle.lock();
        Some(f(&mut session))
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    pub fn user_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.sessions.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::logic::config::VerifierConfig;
    use crate::logic::reward::MemoryLedger;
    use crate::logic::source::{SyntheticProfile, SyntheticSource};

    const USER: i64 = 1;

    fn at(secs: i64, voltage: f64, current: f64) -> Sample {
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Sample::new(voltage, current, start + Duration::seconds(secs))
    }

    fn session() -> Session {
        let engine = VerificationEngine::new(VerifierConfig::default()).unwrap();
        Session::new(USER, engine, 0.0)
    }

    #[test]
    fn test_authentic_credits_ledger() {
        let mut ledger = MemoryLedger::new().with_user(USER, 0.0);
        let mut s = session();

        let report = s.process(at(0, 0.8, 50.0), &mut ledger);
        assert_eq!(report.verdict, Verdict::Authentic);
        assert!((report.credited - 40.0 * 0.0001).abs() < 1e-12);
        assert_eq!(ledger.balance(USER), Some(report.balance));
        assert_eq!(ledger.audit().len(), 1);
        assert!(report.ledger_ok);
    }

    #[test]
    fn test_anomaly_audited_not_credited() {
        let mut ledger = MemoryLedger::new().with_user(USER, 0.0);
        let mut s = session();

        let report = s.process(at(0, 5.0, 50.0), &mut ledger);
        assert_eq!(report.verdict, Verdict::Anomalous);
        assert_eq!(report.credited, 0.0);
        assert_eq!(ledger.balance(USER), Some(0.0));
        assert!(ledger.audit()[0].is_anomaly);
        assert!(report.reason.contains("ceiling"));
    }

    #[test]
    fn test_ledger_failure_keeps_verdict() {
        let mut ledger = MemoryLedger::new().with_user(USER, 0.0);
        ledger.set_failing(true);
        let mut s = session();

        let report = s.process(at(0, 0.8, 0.02), &mut ledger);
        assert_eq!(report.verdict, Verdict::Authentic);
        assert!(!report.ledger_ok);
        assert!(report.credited > 0.0);
        assert_eq!(s.rewards().balance, report.credited);
        assert_eq!(s.rewards().pending, report.credited);
        assert_eq!(s.engine().window().len(), 1);
    }

    #[test]
    fn test_balance_survives_ledger_outage() {
        let mut ledger = MemoryLedger::new().with_user(USER, 0.0);
        let mut s = session();

        ledger.set_failing(true);
        let first = s.process(at(0, 0.8, 50.0), &mut ledger);
        assert!(!first.ledger_ok);
        assert!((first.balance - 0.004).abs() < 1e-12);

        ledger.set_failing(false);
        let second = s.process(at(1, 0.8, 0.02), &mut ledger);
        assert!(second.ledger_ok);
        assert!(second.balance >= first.balance);
        assert!((second.balance - (0.004 + 0.0000016)).abs() < 1e-12);

        let on_ledger = ledger.balance(USER).unwrap();
        assert!((on_ledger - second.balance).abs() < 1e-12);
        assert_eq!(s.rewards().pending, 0.0);
    }

    #[test]
    fn test_pending_flushed_on_non_rewarding_tick() {
        let mut ledger = MemoryLedger::new().with_user(USER, 0.0);
        let mut s = session();

        ledger.set_failing(true);
        let credited = s.process(at(0, 0.8, 0.02), &mut ledger).credited;

        ledger.set_failing(false);
        let report = s.process(at(1, 5.0, 0.02), &mut ledger);
        assert_eq!(report.verdict, Verdict::Anomalous);
        assert_eq!(report.credited, 0.0);
        assert_eq!(ledger.balance(USER), Some(credited));
        assert_eq!(report.balance, credited);
    }

    #[test]
    fn test_penalty_withholds_rewards() {
        let mut ledger = MemoryLedger::new().with_user(USER, 0.0);
        let mut s = session().with_penalty_secs(30);

        s.process(at(0, 5.0, 200.0), &mut ledger);

        let during = s.process(at(10, 0.8, 0.02), &mut ledger);
        assert_eq!(during.verdict, Verdict::Authentic);
        assert_eq!(during.credited, 0.0);
        assert!(during.withheld > 0.0);
        assert_eq!(during.penalty_remaining_secs, 20.0);
        assert!(during.to_string().contains("[penalty 20s]"));

        let after = s.process(at(31, 0.8, 0.02), &mut ledger);
        assert!(after.credited > 0.0);
        assert_eq!(after.penalty_remaining_secs, 0.0);
    }

    #[test]
    fn test_penalty_disabled_by_default() {
        let mut ledger = MemoryLedger::new().with_user(USER, 0.0);
        let mut s = session();

        s.process(at(0, 5.0, 200.0), &mut ledger);
        assert!(s.process(at(1, 0.8, 0.02), &mut ledger).credited > 0.0);
    }

    #[test]
    fn test_tick_with_grid_spoof() {
        let mut ledger = MemoryLedger::new().with_user(USER, 0.0);
        let mut source = SyntheticSource::new(SyntheticProfile::GridSpoof, 42);
        let mut s = session();

        for _ in 0..25 {
            let report = s.tick(&mut source, &mut ledger).unwrap().unwrap();
            assert_eq!(report.verdict, Verdict::Anomalous);
        }
        assert_eq!(ledger.balance(USER), Some(0.0));
        assert_eq!(ledger.audit().len(), 25);
    }

    #[test]
    fn test_journal_written() {
        let dir = tempfile::tempdir().unwrap();
        let journal = DatasetWriter::from_path(dir.path().to_path_buf()).unwrap();
        let mut ledger = MemoryLedger::new().with_user(USER, 0.0);
        let mut s = session().with_journal(journal);

        s.process(at(0, 0.8, 0.02), &mut ledger);
        s.process(at(1, 1.8, 0.02), &mut ledger);

        let stats = s.journal.as_ref().unwrap().get_stats().unwrap();
        assert_eq!(stats.records_written, 2);
    }

    #[test]
    fn test_display_units() {
        let mut ledger = MemoryLedger::new().with_user(USER, 0.0);
        let report = session().process(at(0, 0.8, 0.02), &mut ledger);
        let line = report.to_string();
        assert!(line.contains("0.80 V"));
        assert!(line.contains("20.0 µA"));
        assert!(line.contains("16.0 µW"));
        assert!(line.contains("AUTHENTIC"));
    }

    #[test]
    fn test_registry_exclusive_access() {
        let registry = SessionRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.insert(session()).is_none());

        let other = Session::new(2, VerificationEngine::new(VerifierConfig::default()).unwrap(), 5.0);
        registry.insert(other);
        assert_eq!(registry.user_ids(), vec![1, 2]);

        let mut ledger = MemoryLedger::new().with_user(2, 5.0);
        let verdict = registry
            .with_session(2, |s| s.process(at(0, 0.8, 0.02), &mut ledger).verdict)
            .unwrap();
        assert_eq!(verdict, Verdict::Authentic);
        assert!(registry.with_session(3, |_| ()).is_none());

        assert!(registry.insert(session()).is_some());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.remove(1).unwrap().lock().user_id(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_sessions_locked_independently() {
        let registry = SessionRegistry::new();
        registry.insert(session());
        registry.insert(Session::new(2, VerificationEngine::new(VerifierConfig::default()).unwrap(), 0.0));

        let mut ledger = MemoryLedger::new().with_user(USER, 0.0).with_user(2, 0.0);

        // User 1 busy: user 2 and the registry itself stay usable
        let busy = registry.get(USER).unwrap();
        let _guard = busy.lock();
        let verdict = registry
            .with_session(2, |s| s.process(at(0, 0.8, 0.02), &mut ledger).verdict)
            .unwrap();
        assert_eq!(verdict, Verdict::Authentic);
        assert_eq!(registry.user_ids(), vec![1, 2]);
        assert!(busy.try_lock().is_none());
    }
}
