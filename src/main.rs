mod config;
mod db;
mod extract;
mod fetch;
mod ingest;
mod parser;
mod scheduler;
mod server;

use std::sync::{Arc, Mutex};

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use crate::config::Config;
use crate::ingest::IngestError;

#[derive(Parser)]
#[command(name = "tageskarte", about = "Daily menu scraper + lookup API for Lengauers Bistro")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the lookup API with the periodic fetcher
    Serve,
    /// Fetch, parse and persist the current menu once
    Ingest,
    /// Fetch and parse the menu without saving anything
    Preview,
    /// Show the stored menu for a date
    Show {
        /// Date to show (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Ingestion statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = Config::from_env();

    match cli.command {
        Commands::Serve => serve(cfg).await,
        Commands::Ingest => {
            let conn = db::connect(&cfg.db_path)?;
            db::init_schema(&conn)?;
            let dbm = Mutex::new(conn);

            match ingest::run_ingest(&dbm, &cfg.menu_url).await {
                Ok(outcome) => {
                    println!("Saved/updated {} dishes for {}", outcome.items, outcome.date);
                    Ok(())
                }
                Err(IngestError::NoUsableMenu) => {
                    println!("No usable menu data found in document.");
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        }
        Commands::Preview => {
            let bytes = fetch::download(&cfg.menu_url).await?;
            let text = extract::first_page_text(&bytes)?;
            let menu = parser::parse_menu(&text);

            match menu.date {
                Some(date) => println!("Menu date: {}", date),
                None => println!("Menu date: not found"),
            }
            for item in &menu.items {
                println!("  {:<50} {:>9}", item.name, format_price(item.price_cents));
            }
            if !menu.is_usable() {
                println!("Not usable (missing date or dishes); nothing would be saved.");
            }
            Ok(())
        }
        Commands::Show { date } => {
            let date = match date {
                Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                    .map_err(|_| anyhow::anyhow!("Invalid date format. Use YYYY-MM-DD"))?,
                None => Local::now().date_naive(),
            };

            let conn = db::connect(&cfg.db_path)?;
            db::init_schema(&conn)?;
            let records = db::menu_by_date(&conn, date)?;
            if records.is_empty() {
                println!("No menu stored for {}.", date);
                return Ok(());
            }

            println!("Menu for {}:", date);
            for r in records {
                println!("  {:<50} {:>9}", r.name, format_price(r.price_cents));
            }
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&cfg.db_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Ingest runs:  {}", s.runs);
            println!("Failed runs:  {}", s.failed);
            println!("Dishes:       {}", s.dishes);
            println!("Menu days:    {}", s.days);
            println!(
                "Last success: {}",
                s.last_success.as_deref().unwrap_or("never")
            );
            Ok(())
        }
    }
}

async fn serve(cfg: Config) -> anyhow::Result<()> {
    let conn = db::connect(&cfg.db_path)?;
    db::init_schema(&conn)?;

    let dbm = Arc::new(Mutex::new(conn));
    let run_lock = Arc::new(tokio::sync::Mutex::new(()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = tokio::spawn(scheduler::run(
        Arc::clone(&dbm),
        Arc::clone(&run_lock),
        cfg.menu_url.clone(),
        cfg.fetch_interval,
        shutdown_rx.clone(),
    ));

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let state = server::AppState {
        db: dbm,
        run_lock,
        menu_url: cfg.menu_url,
    };
    server::serve(state, cfg.port, shutdown_rx).await?;

    // Let an in-flight scheduled run finish before exiting.
    scheduler.await?;
    Ok(())
}

fn format_price(cents: i64) -> String {
    format!("{},{:02} €", cents / 100, cents % 100)
}
