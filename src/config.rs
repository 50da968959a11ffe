use std::time::Duration;

const DEFAULT_MENU_URL: &str = "https://lengauers-bistro.de/wp-content/uploads/Tageskarte.pdf";
const DEFAULT_DB_PATH: &str = "data/tageskarte.sqlite";
const DEFAULT_INTERVAL_SECS: u64 = 3600;
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct Config {
    pub menu_url: String,
    pub fetch_interval: Duration,
    pub port: u16,
    pub db_path: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            menu_url: env_or("MENU_URL", DEFAULT_MENU_URL),
            fetch_interval: Duration::from_secs(env_parse(
                "FETCH_INTERVAL_SECS",
                DEFAULT_INTERVAL_SECS,
            )),
            port: env_parse("PORT", DEFAULT_PORT),
            db_path: env_or("MENU_DB", DEFAULT_DB_PATH),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
