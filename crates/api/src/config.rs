//! Server and engine settings read from the environment.

use fulfillment::FulfillmentConfig;

/// Reads from environment variables:
/// - `HOST`: bind address (default `0.0.0.0`)
/// - `PORT`: listen port (default `3000`)
/// - `RUST_LOG`: tracing filter directive (default `info`)
/// - `DATABASE_URL`: PostgreSQL journal; unset keeps events in memory
/// - `RETURN_WINDOW_DAYS`: days after delivery a return is accepted (default `10`)
/// - `LOW_STOCK_THRESHOLD`: threshold for products registered without one (default `5`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub return_window_days: i64,
    pub low_stock_threshold: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parsed(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            return_window_days: parsed(&lookup, "RETURN_WINDOW_DAYS")
                .filter(|days| *days > 0)
                .unwrap_or(defaults.return_window_days),
            low_stock_threshold: parsed(&lookup, "LOW_STOCK_THRESHOLD")
                .unwrap_or(defaults.low_stock_threshold),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn fulfillment(&self) -> FulfillmentConfig {
        FulfillmentConfig::default()
            .with_return_window_days(self.return_window_days)
            .with_low_stock_threshold(self.low_stock_threshold)
    }
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|raw| raw.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            return_window_days: 10,
            low_stock_threshold: 5,
        }
    }
}
