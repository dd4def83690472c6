//! Application configuration loaded from environment variables.

use std::time::Duration;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `"json"` for JSON log lines, anything else for text
/// - `DATABASE_URL`: PostgreSQL connection string; absent means in-memory
/// - `CAD_SERVICE_URL`: base URL of the CAD splitting service
/// - `CAD_TIMEOUT_SECS`, `CAD_MAX_ATTEMPTS`, `CAD_BACKOFF_BASE_MS`
/// - `EMAIL_API_URL`, `EMAIL_API_KEY`, `EMAIL_FROM`: all three enable the
///   HTTP mailer; otherwise emails are kept in memory
/// - `NOTIFY_POLL_INTERVAL_MS`: outbox polling interval
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_json: bool,
    pub database_url: Option<String>,
    pub cad: CadConfig,
    pub email: Option<EmailConfig>,
    pub notify_poll_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct CadConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    var(name).and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let email = match (var("EMAIL_API_URL"), var("EMAIL_API_KEY"), var("EMAIL_FROM")) {
            (Some(api_url), Some(api_key), Some(from)) => Some(EmailConfig {
                api_url,
                api_key,
                from,
            }),
            _ => None,
        };

        Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: parsed("PORT", defaults.port),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_json: var("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
            database_url: var("DATABASE_URL"),
            cad: CadConfig {
                base_url: var("CAD_SERVICE_URL").unwrap_or(defaults.cad.base_url),
                timeout: Duration::from_secs(parsed("CAD_TIMEOUT_SECS", 30)),
                max_attempts: parsed("CAD_MAX_ATTEMPTS", defaults.cad.max_attempts),
                backoff_base: Duration::from_millis(parsed("CAD_BACKOFF_BASE_MS", 200)),
            },
            email,
            notify_poll_interval: Duration::from_millis(parsed("NOTIFY_POLL_INTERVAL_MS", 1000)),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_json: false,
            database_url: None,
            cad: CadConfig {
                base_url: "http://localhost:8000".to_string(),
                timeout: Duration::from_secs(30),
                max_attempts: 3,
                backoff_base: Duration::from_millis(200),
            },
            email: None,
            notify_poll_interval: Duration::from_secs(1),
        }
    }
}
