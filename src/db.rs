use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::Connection;

use crate::parser::DishEntry;

/// Stored dates use ISO form so they sort and compare as text.
const DATE_FMT: &str = "%Y-%m-%d";

pub fn connect(path: &str) -> Result<Connection> {
    if let Some(dir) = std::path::Path::new(path).parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS menu_items (
            id          INTEGER PRIMARY KEY,
            menu_date   TEXT NOT NULL,
            name        TEXT NOT NULL,
            category    TEXT NOT NULL DEFAULT 'Gerichte',
            price_cents INTEGER NOT NULL CHECK(price_cents >= 0),
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(menu_date, name)
        );
        CREATE INDEX IF NOT EXISTS idx_menu_items_date ON menu_items(menu_date);

        CREATE TABLE IF NOT EXISTS ingest_log (
            id         INTEGER PRIMARY KEY,
            url        TEXT NOT NULL,
            menu_date  TEXT,
            items      INTEGER NOT NULL DEFAULT 0,
            error      TEXT,
            latency_ms INTEGER,
            fetched_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;
    Ok(())
}

// ── Convergence ──

/// Insert-or-update one day's dishes as a single transaction. Re-running the
/// same batch changes nothing; a changed price or category overwrites the
/// stored row for that (date, name) key. Rows for dishes missing from a later
/// batch of the same day are left alone. An empty batch is a no-op.
///
/// Returns the number of rows written.
pub fn upsert_menu(conn: &Connection, date: NaiveDate, items: &[DishEntry]) -> Result<usize> {
    if items.is_empty() {
        return Ok(0);
    }

    let date_str = date.format(DATE_FMT).to_string();
    let tx = conn.unchecked_transaction()?;
    let mut written = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO menu_items (menu_date, name, category, price_cents)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(menu_date, name) DO UPDATE SET
                 price_cents = excluded.price_cents,
                 category    = excluded.category,
                 updated_at  = datetime('now')",
        )?;
        for item in items {
            written += stmt.execute(rusqlite::params![
                date_str,
                item.name,
                item.category,
                item.price_cents,
            ])?;
        }
    }
    tx.commit()?;
    Ok(written)
}

// ── Lookup ──

pub struct MenuRecord {
    pub menu_date: NaiveDate,
    pub name: String,
    pub category: String,
    pub price_cents: i64,
}

/// All dishes stored for one date, in insertion (= document) order.
/// Empty Vec when nothing is stored for that date.
pub fn menu_by_date(conn: &Connection, date: NaiveDate) -> Result<Vec<MenuRecord>> {
    let mut stmt = conn.prepare(
        "SELECT name, category, price_cents
         FROM menu_items
         WHERE menu_date = ?1
         ORDER BY id",
    )?;
    let rows = stmt
        .query_map([date.format(DATE_FMT).to_string()], |row| {
            Ok(MenuRecord {
                menu_date: date,
                name: row.get(0)?,
                category: row.get(1)?,
                price_cents: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// All dates with at least one stored dish, ascending.
pub fn menu_dates(conn: &Connection) -> Result<Vec<NaiveDate>> {
    let mut stmt =
        conn.prepare("SELECT DISTINCT menu_date FROM menu_items ORDER BY menu_date")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter()
        .map(|s| NaiveDate::parse_from_str(&s, DATE_FMT).map_err(Into::into))
        .collect()
}

// ── Ingest log ──

pub struct IngestLog {
    pub url: String,
    pub menu_date: Option<NaiveDate>,
    pub items: usize,
    pub error: Option<String>,
    pub latency_ms: i64,
}

pub fn log_ingest(conn: &Connection, log: &IngestLog) -> Result<()> {
    conn.execute(
        "INSERT INTO ingest_log (url, menu_date, items, error, latency_ms)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            log.url,
            log.menu_date.map(|d| d.format(DATE_FMT).to_string()),
            log.items as i64,
            log.error,
            log.latency_ms,
        ],
    )?;
    Ok(())
}

// ── Stats ──

pub struct Stats {
    pub runs: usize,
    pub failed: usize,
    pub dishes: usize,
    pub days: usize,
    pub last_success: Option<String>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let runs: usize = conn.query_row("SELECT COUNT(*) FROM ingest_log", [], |r| r.get(0))?;
    let failed: usize = conn.query_row(
        "SELECT COUNT(*) FROM ingest_log WHERE error IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    let dishes: usize = conn.query_row("SELECT COUNT(*) FROM menu_items", [], |r| r.get(0))?;
    let days: usize = conn.query_row(
        "SELECT COUNT(DISTINCT menu_date) FROM menu_items",
        [],
        |r| r.get(0),
    )?;
    let last_success: Option<String> = conn.query_row(
        "SELECT MAX(fetched_at) FROM ingest_log WHERE error IS NULL",
        [],
        |r| r.get(0),
    )?;
    Ok(Stats {
        runs,
        failed,
        dishes,
        days,
        last_success,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::DEFAULT_CATEGORY;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn dish(name: &str, price_cents: i64) -> DishEntry {
        DishEntry {
            name: name.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            price_cents,
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 3).unwrap()
    }

    fn row_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM menu_items", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn upsert_then_lookup() {
        let conn = test_conn();
        let items = vec![dish("Schnitzel", 990), dish("Currywurst", 750)];

        let written = upsert_menu(&conn, day(), &items).unwrap();
        assert_eq!(written, 2);

        let stored = menu_by_date(&conn, day()).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].name, "Schnitzel");
        assert_eq!(stored[0].price_cents, 990);
        assert_eq!(stored[0].category, "Gerichte");
    }

    #[test]
    fn reingest_is_idempotent() {
        let conn = test_conn();
        let items = vec![dish("Schnitzel", 990), dish("Currywurst", 750)];

        upsert_menu(&conn, day(), &items).unwrap();
        upsert_menu(&conn, day(), &items).unwrap();

        assert_eq!(row_count(&conn), 2);
        let stored = menu_by_date(&conn, day()).unwrap();
        assert_eq!(stored[0].price_cents, 990);
        assert_eq!(stored[1].price_cents, 750);
    }

    #[test]
    fn price_change_converges_without_duplicating() {
        let conn = test_conn();
        upsert_menu(&conn, day(), &[dish("Schnitzel", 990)]).unwrap();
        upsert_menu(&conn, day(), &[dish("Schnitzel", 1090)]).unwrap();

        assert_eq!(row_count(&conn), 1);
        let stored = menu_by_date(&conn, day()).unwrap();
        assert_eq!(stored[0].price_cents, 1090);
    }

    #[test]
    fn overlapping_batches_keep_earlier_dishes() {
        let conn = test_conn();
        upsert_menu(&conn, day(), &[dish("Schnitzel", 990), dish("Currywurst", 750)]).unwrap();
        // Later fetch of the same day without the Currywurst: no pruning.
        upsert_menu(&conn, day(), &[dish("Schnitzel", 990)]).unwrap();

        assert_eq!(row_count(&conn), 2);
    }

    #[test]
    fn failed_batch_writes_nothing() {
        let conn = test_conn();
        // Second entry violates the non-negative price constraint; the first
        // must not survive on its own.
        let items = vec![dish("Schnitzel", 990), dish("Currywurst", -1)];

        assert!(upsert_menu(&conn, day(), &items).is_err());
        assert_eq!(row_count(&conn), 0);
    }

    #[test]
    fn empty_batch_is_a_noop() {
        let conn = test_conn();
        assert_eq!(upsert_menu(&conn, day(), &[]).unwrap(), 0);
        assert_eq!(row_count(&conn), 0);
    }

    #[test]
    fn lookup_order_is_insertion_order() {
        let conn = test_conn();
        let items = vec![dish("Zwiebelrostbraten", 1450), dish("Apfelstrudel", 420)];
        upsert_menu(&conn, day(), &items).unwrap();

        let names: Vec<String> = menu_by_date(&conn, day())
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Zwiebelrostbraten", "Apfelstrudel"]);
    }

    #[test]
    fn unknown_date_returns_empty_vec() {
        let conn = test_conn();
        upsert_menu(&conn, day(), &[dish("Schnitzel", 990)]).unwrap();

        let other = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        assert!(menu_by_date(&conn, other).unwrap().is_empty());
    }

    #[test]
    fn dates_are_isolated() {
        let conn = test_conn();
        let next = NaiveDate::from_ymd_opt(2026, 2, 4).unwrap();
        upsert_menu(&conn, day(), &[dish("Schnitzel", 990)]).unwrap();
        upsert_menu(&conn, next, &[dish("Schnitzel", 1050)]).unwrap();

        assert_eq!(row_count(&conn), 2);
        assert_eq!(menu_by_date(&conn, day()).unwrap()[0].price_cents, 990);
        assert_eq!(menu_by_date(&conn, next).unwrap()[0].price_cents, 1050);
    }

    #[test]
    fn menu_dates_are_distinct_and_ascending() {
        let conn = test_conn();
        assert!(menu_dates(&conn).unwrap().is_empty());

        let next = NaiveDate::from_ymd_opt(2026, 2, 4).unwrap();
        upsert_menu(&conn, next, &[dish("Gulasch", 1120)]).unwrap();
        upsert_menu(&conn, day(), &[dish("Schnitzel", 990), dish("Currywurst", 750)]).unwrap();

        assert_eq!(menu_dates(&conn).unwrap(), vec![day(), next]);
    }

    #[test]
    fn ingest_log_feeds_stats() {
        let conn = test_conn();
        log_ingest(
            &conn,
            &IngestLog {
                url: "http://example.test/karte.pdf".into(),
                menu_date: Some(day()),
                items: 3,
                error: None,
                latency_ms: 120,
            },
        )
        .unwrap();
        log_ingest(
            &conn,
            &IngestLog {
                url: "http://example.test/karte.pdf".into(),
                menu_date: None,
                items: 0,
                error: Some("no usable menu in document".into()),
                latency_ms: 80,
            },
        )
        .unwrap();

        let stats = get_stats(&conn).unwrap();
        assert_eq!(stats.runs, 2);
        assert_eq!(stats.failed, 1);
        assert!(stats.last_success.is_some());
    }
}
