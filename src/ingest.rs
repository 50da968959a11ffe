use std::sync::Mutex;
use std::time::Instant;

use chrono::NaiveDate;
use rusqlite::Connection;
use thiserror::Error;
use tracing::{info, warn};

use crate::extract::{self, ExtractError};
use crate::parser::{self, ParsedMenu};
use crate::{db, fetch};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("menu download failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("text extraction failed: {0}")]
    Extraction(#[from] ExtractError),
    /// Designed soft outcome: the document held no date or no dishes
    /// (an off-schedule upload, a holiday notice, a reformatted layout).
    #[error("no usable menu in document")]
    NoUsableMenu,
    #[error("menu storage failed: {0}")]
    Storage(#[source] anyhow::Error),
}

#[derive(Debug)]
pub struct IngestOutcome {
    pub date: NaiveDate,
    pub items: usize,
}

/// One full ingestion run: download the document, extract the first page,
/// parse it, and converge the result into the store. Every run, successful
/// or not, leaves one ingest_log row.
///
/// Callers serialize runs; this function assumes it is the only writer.
/// The DB mutex is only taken after the download completes, so the lock is
/// never held across an await point.
pub async fn run_ingest(
    db: &Mutex<Connection>,
    url: &str,
) -> Result<IngestOutcome, IngestError> {
    let started = Instant::now();

    let bytes = match fetch::download(url).await {
        Ok(bytes) => bytes,
        Err(e) => {
            record_failure(db, url, None, &e.to_string(), started);
            return Err(IngestError::Fetch(e));
        }
    };

    let text = match extract::first_page_text(&bytes) {
        Ok(text) => text,
        Err(e) => {
            record_failure(db, url, None, &e.to_string(), started);
            return Err(IngestError::Extraction(e));
        }
    };

    let menu = parser::parse_menu(&text);
    store_menu(db, url, menu, started)
}

/// Persistence half of a run, split out so it can be exercised without a
/// network fetch. Enforces the usability precondition: an undated or empty
/// parse never reaches the store.
fn store_menu(
    db: &Mutex<Connection>,
    url: &str,
    menu: ParsedMenu,
    started: Instant,
) -> Result<IngestOutcome, IngestError> {
    let latency_ms = started.elapsed().as_millis() as i64;

    if !menu.is_usable() {
        warn!("No usable menu data found in document");
        let err = IngestError::NoUsableMenu;
        record_failure(db, url, menu.date, &err.to_string(), started);
        return Err(err);
    }
    // is_usable() guarantees the date is present.
    let date = menu.date.ok_or(IngestError::NoUsableMenu)?;

    let conn = db.lock().unwrap();
    match db::upsert_menu(&conn, date, &menu.items) {
        Ok(written) => {
            info!("Saved/updated {} dishes for {}", written, date);
            log_run(
                &conn,
                url,
                Some(date),
                written,
                None,
                latency_ms,
            );
            Ok(IngestOutcome {
                date,
                items: written,
            })
        }
        Err(e) => {
            let msg = e.to_string();
            log_run(&conn, url, Some(date), 0, Some(&msg), latency_ms);
            Err(IngestError::Storage(e))
        }
    }
}

fn record_failure(
    db: &Mutex<Connection>,
    url: &str,
    menu_date: Option<NaiveDate>,
    error: &str,
    started: Instant,
) {
    let conn = db.lock().unwrap();
    log_run(
        &conn,
        url,
        menu_date,
        0,
        Some(error),
        started.elapsed().as_millis() as i64,
    );
}

/// A failed log write must not mask the run's real outcome.
fn log_run(
    conn: &Connection,
    url: &str,
    menu_date: Option<NaiveDate>,
    items: usize,
    error: Option<&str>,
    latency_ms: i64,
) {
    let log = db::IngestLog {
        url: url.to_string(),
        menu_date,
        items,
        error: error.map(str::to_string),
        latency_ms,
    };
    if let Err(e) = db::log_ingest(conn, &log) {
        warn!("Failed to write ingest log: {}", e);
    }
}
