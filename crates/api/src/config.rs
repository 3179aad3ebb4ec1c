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
    /// Sessions idle longer than this are deleted (default: `24`).
    pub session_expiry_hours: i64,
    /// A snapshot is written every this-many events (default: `50`).
    pub snapshot_interval: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SESSION_EXPIRY_HOURS` | `24`                       |
    /// | `SNAPSHOT_INTERVAL`    | `50`                       |
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

        let session_expiry_hours: i64 = std::env::var("SESSION_EXPIRY_HOURS")
            .unwrap_or_else(|_| "24".into())
            .parse()
            .expect("SESSION_EXPIRY_HOURS must be a valid i64");

        let snapshot_interval: u64 = std::env::var("SNAPSHOT_INTERVAL")
            .unwrap_or_else(|_| "50".into())
            .parse()
            .expect("SNAPSHOT_INTERVAL must be a valid u64");
        if snapshot_interval == 0 {
            panic!("SNAPSHOT_INTERVAL must be greater than zero");
        }

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            session_expiry_hours,
            snapshot_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_snapshot_interval_fails_at_startup() {
        std::env::set_var("SNAPSHOT_INTERVAL", "0");
        let result = std::panic::catch_unwind(ServerConfig::from_env);
        std::env::remove_var("SNAPSHOT_INTERVAL");
        assert!(result.is_err());
    }
}
