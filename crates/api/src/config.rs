use std::time::Duration;

use rebulk_engine::BulkActionSettings;

/// A Redis database bulk actions may target, from `REDIS_DATABASES`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub id: String,
    pub url: String,
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Grace period for background tasks on shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Databases bulk actions can run against.
    pub databases: Vec<DatabaseConfig>,
    /// How long a report-enabled action waits for its download to attach.
    pub report_wait_ms: u64,
    /// Debounce window for overview notifications.
    pub notify_window_ms: u64,
    /// `SCAN ... COUNT` hint for delete workers.
    pub scan_count: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                            |
    /// |-------------------------|------------------------------------|
    /// | `HOST`                  | `0.0.0.0`                          |
    /// | `PORT`                  | `3000`                             |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`            |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                               |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                               |
    /// | `REDIS_DATABASES`       | `default=redis://127.0.0.1:6379`   |
    /// | `BULK_REPORT_WAIT_MS`   | `5000`                             |
    /// | `BULK_NOTIFY_WINDOW_MS` | `1000`                             |
    /// | `BULK_SCAN_COUNT`       | `10000`                            |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let databases = parse_databases(
            &std::env::var("REDIS_DATABASES")
                .unwrap_or_else(|_| "default=redis://127.0.0.1:6379".into()),
        )
        .unwrap_or_else(|e| panic!("REDIS_DATABASES is invalid: {e}"));

        let report_wait_ms: u64 = std::env::var("BULK_REPORT_WAIT_MS")
            .unwrap_or_else(|_| "5000".into())
            .parse()
            .expect("BULK_REPORT_WAIT_MS must be a valid u64");

        let notify_window_ms: u64 = std::env::var("BULK_NOTIFY_WINDOW_MS")
            .unwrap_or_else(|_| "1000".into())
            .parse()
            .expect("BULK_NOTIFY_WINDOW_MS must be a valid u64");

        let scan_count: u64 = std::env::var("BULK_SCAN_COUNT")
            .unwrap_or_else(|_| "10000".into())
            .parse()
            .expect("BULK_SCAN_COUNT must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            databases,
            report_wait_ms,
            notify_window_ms,
            scan_count,
        }
    }

    /// Engine timing knobs derived from this configuration.
    pub fn bulk_action_settings(&self) -> BulkActionSettings {
        BulkActionSettings {
            report_wait: Duration::from_millis(self.report_wait_ms),
            notify_window: Duration::from_millis(self.notify_window_ms),
        }
    }
}

/// Parse comma-separated `id=url` pairs.
pub fn parse_databases(raw: &str) -> Result<Vec<DatabaseConfig>, String> {
    let mut databases: Vec<DatabaseConfig> = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (id, url) = entry
            .split_once('=')
            .ok_or_else(|| format!("expected id=url, got '{entry}'"))?;
        let (id, url) = (id.trim(), url.trim());
        if id.is_empty() || url.is_empty() {
            return Err(format!("expected id=url, got '{entry}'"));
        }
        if databases.iter().any(|d| d.id == id) {
            return Err(format!("duplicate database id '{id}'"));
        }
        databases.push(DatabaseConfig {
            id: id.to_string(),
            url: url.to_string(),
        });
    }

    Ok(databases)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_id_url_pairs() {
        let dbs = parse_databases("main=redis://a:6379, cache = redis://b:6380/1").unwrap();
        assert_eq!(
            dbs,
            vec![
                DatabaseConfig {
                    id: "main".into(),
                    url: "redis://a:6379".into()
                },
                DatabaseConfig {
                    id: "cache".into(),
                    url: "redis://b:6380/1".into()
                },
            ]
        );
    }

    #[test]
    fn url_may_contain_equals_sign() {
        let dbs = parse_databases("x=redis://h:1/0?protocol=resp3").unwrap();
        assert_eq!(dbs[0].url, "redis://h:1/0?protocol=resp3");
    }

    #[test]
    fn rejects_malformed_entries() {
        assert!(parse_databases("redis://a:6379").is_err());
        assert!(parse_databases("=redis://a").is_err());
        assert!(parse_databases("a=redis://x,a=redis://y").is_err());
    }
}
