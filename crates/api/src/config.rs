use crate::auth::jwt::JwtConfig;

/// How the booking path guards capacity against concurrent writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityEnforcement {
    /// Lock the client, branch and employee rows before counting.
    Strict,
    /// Count without locks; concurrent overbooking is tolerated.
    Soft,
}

impl CapacityEnforcement {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "soft" => Some(Self::Soft),
            _ => None,
        }
    }
}

/// Write-path settings shared by every booking mutation.
#[derive(Debug, Clone, Copy)]
pub struct BookingPolicy {
    pub capacity: CapacityEnforcement,
    /// Attempts for a transaction that hits a serialization failure or deadlock.
    pub max_attempts: u32,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            capacity: CapacityEnforcement::Strict,
            max_attempts: 3,
        }
    }
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
    /// Time allowed for background tasks to stop after the server drains.
    pub shutdown_timeout_secs: u64,
    /// JWT token configuration.
    pub jwt: JwtConfig,
    pub booking: BookingPolicy,
    /// Period of the mirror reconciliation job; `0` disables it.
    pub mirror_reconcile_interval_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default                 |
    /// |----------------------------------|-------------------------|
    /// | `HOST`                           | `0.0.0.0`               |
    /// | `PORT`                           | `3000`                  |
    /// | `CORS_ORIGINS`                   | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`           | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`          | `30`                    |
    /// | `CAPACITY_ENFORCEMENT`           | `strict`                |
    /// | `BOOKING_MAX_ATTEMPTS`           | `3`                     |
    /// | `MIRROR_RECONCILE_INTERVAL_SECS` | `900`                   |
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

        let capacity = std::env::var("CAPACITY_ENFORCEMENT")
            .map(|raw| {
                CapacityEnforcement::parse(&raw)
                    .unwrap_or_else(|| panic!("CAPACITY_ENFORCEMENT must be 'strict' or 'soft', got '{raw}'"))
            })
            .unwrap_or(CapacityEnforcement::Strict);

        let max_attempts: u32 = std::env::var("BOOKING_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("BOOKING_MAX_ATTEMPTS must be a valid u32");
        assert!(max_attempts > 0, "BOOKING_MAX_ATTEMPTS must be at least 1");

        let mirror_reconcile_interval_secs: u64 = std::env::var("MIRROR_RECONCILE_INTERVAL_SECS")
            .unwrap_or_else(|_| "900".into())
            .parse()
            .expect("MIRROR_RECONCILE_INTERVAL_SECS must be a valid u64");

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt,
            booking: BookingPolicy {
                capacity,
                max_attempts,
            },
            mirror_reconcile_interval_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_mode_parsing() {
        assert_eq!(CapacityEnforcement::parse("strict"), Some(CapacityEnforcement::Strict));
        assert_eq!(CapacityEnforcement::parse(" SOFT "), Some(CapacityEnforcement::Soft));
        assert_eq!(CapacityEnforcement::parse("loose"), None);
    }

    #[test]
    fn default_policy_is_strict_with_three_attempts() {
        let policy = BookingPolicy::default();
        assert_eq!(policy.capacity, CapacityEnforcement::Strict);
        assert_eq!(policy.max_attempts, 3);
    }
}
