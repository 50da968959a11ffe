use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::Connection;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::ingest::{self, IngestError};

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    Completed,
    Skipped,
}

/// Periodic ingestion loop. The first tick fires immediately (run on start),
/// then every `interval`. Ticks never overlap: a tick that arrives while a
/// run holds `run_lock` (scheduled or manually triggered) is skipped, and a
/// shutdown signal stops new runs while letting the current one finish.
pub async fn run(
    db: Arc<Mutex<Connection>>,
    run_lock: Arc<tokio::sync::Mutex<()>>,
    menu_url: String,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!("Scheduler started (interval {:?})", interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                tick(&db, &run_lock, &menu_url).await;
            }
            _ = shutdown.changed() => {
                info!("Scheduler stopped");
                return;
            }
        }
    }
}

async fn tick(
    db: &Mutex<Connection>,
    run_lock: &tokio::sync::Mutex<()>,
    menu_url: &str,
) -> TickOutcome {
    let Ok(_guard) = run_lock.try_lock() else {
        warn!("Ingestion already in flight, skipping tick");
        return TickOutcome::Skipped;
    };

    match ingest::run_ingest(db, menu_url).await {
        Ok(outcome) => {
            info!("Ingested {} dishes for {}", outcome.items, outcome.date);
        }
        // Expected for off-schedule documents; the next tick tries again.
        Err(IngestError::NoUsableMenu) => {}
        Err(e) => error!("Ingestion failed: {}", e),
    }
    TickOutcome::Completed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn tick_skips_while_a_run_is_in_flight() {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        let dbm = Mutex::new(conn);
        let run_lock = tokio::sync::Mutex::new(());

        // A manual trigger holds the lock; the scheduled tick must not run.
        let _manual = run_lock.lock().await;
        let outcome = tick(&dbm, &run_lock, "http://example.test/karte.pdf").await;
        assert_eq!(outcome, TickOutcome::Skipped);

        // Nothing was logged because nothing ran.
        let conn = dbm.lock().unwrap();
        assert_eq!(db::get_stats(&conn).unwrap().runs, 0);
    }
}
