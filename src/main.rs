//! VISION-X Verification Core - Main Entry Point
//!
//! Polls a sample source, verifies every reading and credits green coins to
//! the producer's ledger account.
//!
//! ```text
//!   source ──► Session ──► VerificationEngine (physics → detector)
//!                 │
//!                 ├──► SqliteLedger (balance + audit)
//!                 └──► DatasetWriter (optional JSONL journal)
//! ```

use std::thread;

use anyhow::{Context, Result};

use visionx_core::constants::{APP_NAME, APP_VERSION};
use visionx_core::logic::config::VerifierConfig;
use visionx_core::logic::dataset::{export, get_dataset_dir, DatasetWriter};
use visionx_core::logic::engine::VerificationEngine;
use visionx_core::logic::model::storage::{get_default_snapshot_path, load_snapshot, save_snapshot};
use visionx_core::logic::reward::{SqliteLedger, UserRecord};
use visionx_core::logic::runtime::RuntimeConfig;
use visionx_core::logic::session::Session;
use visionx_core::logic::source::build_source;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let runtime = RuntimeConfig::from_env();

    log::info!("Starting {} v{}...", APP_NAME, APP_VERSION);

    if let Some(target) = &runtime.export_dataset {
        let merged = export::to_jsonl(&get_dataset_dir(), target)
            .with_context(|| format!("exporting dataset to {}", target.display()))?;
        log::info!("Merged {} journal files", merged);
        return Ok(());
    }

    let verifier = match &runtime.config_path {
        Some(path) => VerifierConfig::from_json_file(path)
            .with_context(|| format!("loading verifier config {}", path.display()))?,
        None => VerifierConfig::from_env().context("verifier config from environment")?,
    };

    let mut ledger = SqliteLedger::open(&runtime.ledger_path)
        .with_context(|| format!("opening ledger {}", runtime.ledger_path.display()))?;
    let user = resolve_user(&ledger, &runtime)?;
    log::info!("Producer #{} {} (balance {:.4})", user.id, user.name, user.coins);

    let mut engine = VerificationEngine::new(verifier)?;

    let snapshot_path = get_default_snapshot_path(user.id);
    if runtime.persist_detector && snapshot_path.exists() {
        match load_snapshot(&snapshot_path).and_then(|s| engine.restore(s)) {
            Ok(()) => {}
            Err(e) => log::warn!("Detector snapshot rejected, recalibrating: {}", e),
        }
    }

    let mut session = Session::new(user.id, engine, user.coins).with_penalty_secs(runtime.penalty_secs);
    if runtime.journal {
        session = session.with_journal(DatasetWriter::new().context("opening dataset journal")?);
    }
    log::info!(
        "Session {} started at {} for producer #{}",
        session.id(),
        session.started_at().format("%Y-%m-%d %H:%M:%S"),
        session.user_id()
    );

    let mut source = build_source(&runtime.source)?;
    let interval = runtime.poll_interval(source.is_simulated());

    let mut ticks: u64 = 0;
    let mut source_error = None;
    loop {
        if runtime.max_ticks.is_some_and(|max| ticks >= max) {
            break;
        }

        match session.tick(source.as_mut(), &mut ledger) {
            Ok(Some(report)) => {
                if report.calibrated_now {
                    log::info!("Model calibrated");
                }
                log::debug!("{} via {:?}: {}", report.verdict, report.stage, report.reason);
                println!("{}", report);
            }
            Ok(None) => {}
            Err(e) => {
                source_error = Some(e);
                break;
            }
        }
        ticks += 1;

        if source.is_exhausted() {
            break;
        }
        thread::sleep(interval);
    }

    let status = session.engine().status();
    log::info!(
        "Stopped after {} polls: {} authentic, {} anomalous, {} uncertain, {:.6} coins earned",
        ticks,
        status.verdicts.authentic,
        status.verdicts.anomalous,
        status.verdicts.uncertain,
        session.rewards().earned_this_session
    );
    log::debug!("{}", serde_json::to_string_pretty(&status)?);

    if runtime.persist_detector && session.engine().detector().is_trained() {
        let snapshot = session.engine().snapshot()?;
        save_snapshot(&snapshot, &snapshot_path)
            .with_context(|| format!("saving detector to {}", snapshot_path.display()))?;
        log::info!("Detector saved to {}", snapshot_path.display());
    }

    match ledger.recent_history(user.id) {
        Ok(history) => log::info!("{} recent readings on record", history.len()),
        Err(e) => log::warn!("History unavailable: {}", e),
    }

    if let Some(e) = source_error {
        return Err(e).context("sample source failed");
    }
    Ok(())
}

/// Resume by id, then by phone, else register
fn resolve_user(ledger: &SqliteLedger, runtime: &RuntimeConfig) -> Result<UserRecord> {
    if let Some(id) = runtime.user_id {
        return ledger
            .get_user(id)?
            .with_context(|| format!("user {} not found", id));
    }

    if !runtime.user_phone.is_empty() {
        if let Some(user) = ledger.find_user_by_phone(&runtime.user_phone)? {
            return Ok(user);
        }
    }

    let id = ledger.create_user(&runtime.user_name, &runtime.user_phone)?;
    ledger
        .get_user(id)?
        .with_context(|| format!("user {} vanished after registration", id))
}
