use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_STALE_UNVERIFIED_DAYS: i64 = 7;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" | "in-memory" => Ok(StorageBackend::Memory),
            _ => Err(()),
        }
    }
}

/// Which columns the waitlist keeps. `Full` is the 7-column sheet, `Compact`
/// the 5-column one without verification time and client info.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetLayout {
    Full,
    Compact,
}

static FULL_COLUMNS: [&str; 7] = [
    "Name",
    "Email",
    "Timestamp",
    "Status",
    "Token",
    "Verified At",
    "Client Info",
];

impl SheetLayout {
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            SheetLayout::Full => &FULL_COLUMNS,
            SheetLayout::Compact => &FULL_COLUMNS[..5],
        }
    }

    pub fn records_verified_at(&self) -> bool {
        matches!(self, SheetLayout::Full)
    }

    pub fn captures_client_info(&self) -> bool {
        matches!(self, SheetLayout::Full)
    }
}

impl FromStr for SheetLayout {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" | "7" => Ok(SheetLayout::Full),
            "compact" | "simple" | "5" => Ok(SheetLayout::Compact),
            _ => Err(()),
        }
    }
}

/// Copy used in emails and verification pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branding {
    pub product_name: String,
    pub tagline: String,
    pub homepage_url: String,
    pub support_email: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub frontend_origin: String,
    pub public_base_url: String,
    pub layout: SheetLayout,
    pub branding: Branding,
    pub admin_api_token: Option<String>,
    pub stale_unverified_days: i64,
    pub maintenance_interval_seconds: u64,
    pub report_recipient: Option<String>,
    pub rate_limit_ms: u64,
    pub rate_limit_burst: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok(); // Load .env file
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let storage_backend = parse_or(&get, "STORAGE_BACKEND", StorageBackend::Postgres)?;
        let database_url = get("DATABASE_URL");
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let bind_addr = parse_or(
            &get,
            "BIND_ADDR",
            SocketAddr::from(([127, 0, 0, 1], 3000)),
        )?;

        let frontend_origin = require("FRONTEND_ORIGIN")?;
        let public_base_url = require("PUBLIC_BASE_URL")?
            .trim_end_matches('/')
            .to_string();

        let branding = Branding {
            product_name: get("PRODUCT_NAME").unwrap_or_else(|| "PocketCounselor".into()),
            tagline: get("PRODUCT_TAGLINE")
                .unwrap_or_else(|| "AI-Powered Opportunity Finder".into()),
            homepage_url: get("HOMEPAGE_URL").unwrap_or_else(|| frontend_origin.clone()),
            support_email: get("SUPPORT_EMAIL")
                .unwrap_or_else(|| "hello@pocketcounselor.org".into()),
        };

        let stale_unverified_days =
            parse_or(&get, "STALE_UNVERIFIED_DAYS", DEFAULT_STALE_UNVERIFIED_DAYS)?;
        if stale_unverified_days < 0 {
            return Err(ConfigError::Invalid {
                key: "STALE_UNVERIFIED_DAYS",
                value: stale_unverified_days.to_string(),
            });
        }

        Ok(Config {
            storage_backend,
            database_url,
            bind_addr,
            frontend_origin,
            public_base_url,
            layout: parse_or(&get, "WAITLIST_LAYOUT", SheetLayout::Full)?,
            branding,
            admin_api_token: get("ADMIN_API_TOKEN"),
            stale_unverified_days,
            maintenance_interval_seconds: parse_or(&get, "MAINTENANCE_INTERVAL_SECONDS", 0)?,
            report_recipient: get("REPORT_RECIPIENT"),
            rate_limit_ms: parse_or(&get, "RATE_LIMITER_MILLISECONDS", 500)?,
            rate_limit_burst: parse_or(&get, "RATE_LIMITER_BURST", 10)?,
        })
    }

    /// Link embedded in the verification email.
    pub fn verification_url(&self, token: &str) -> String {
        format!("{}/?action=verify&token={}", self.public_base_url, token)
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self::from_lookup(|key| match key {
            "STORAGE_BACKEND" => Some("memory".into()),
            "FRONTEND_ORIGIN" => Some("http://localhost:5173".into()),
            "PUBLIC_BASE_URL" => Some("https://waitlist.test".into()),
            "ADMIN_API_TOKEN" => Some("test-admin-token".into()),
            _ => None,
        })
        .expect("test config should be valid")
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse::<T>().map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn postgres_backend_requires_database_url() {
        let err = Config::from_lookup(lookup_from(&[
            ("FRONTEND_ORIGIN", "http://localhost"),
            ("PUBLIC_BASE_URL", "http://localhost:3000"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn defaults_apply_for_optional_settings() {
        let config = Config::from_lookup(lookup_from(&[
            ("STORAGE_BACKEND", "memory"),
            ("FRONTEND_ORIGIN", "http://localhost"),
            ("PUBLIC_BASE_URL", "https://api.example.com/"),
        ]))
        .unwrap();

        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert_eq!(config.layout, SheetLayout::Full);
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.stale_unverified_days, 7);
        assert_eq!(config.maintenance_interval_seconds, 0);
        assert_eq!(config.rate_limit_ms, 500);
        assert_eq!(config.rate_limit_burst, 10);
        assert!(config.admin_api_token.is_none());
        assert_eq!(
            config.verification_url("abc"),
            "https://api.example.com/?action=verify&token=abc"
        );
    }

    #[test]
    fn malformed_rate_limit_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("STORAGE_BACKEND", "memory"),
            ("FRONTEND_ORIGIN", "http://localhost"),
            ("PUBLIC_BASE_URL", "http://localhost"),
            ("RATE_LIMITER_BURST", "ten"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "RATE_LIMITER_BURST",
                value: "ten".into()
            }
        );
    }

    #[test]
    fn invalid_layout_is_reported() {
        let err = Config::from_lookup(lookup_from(&[
            ("STORAGE_BACKEND", "memory"),
            ("FRONTEND_ORIGIN", "http://localhost"),
            ("PUBLIC_BASE_URL", "http://localhost"),
            ("WAITLIST_LAYOUT", "wide"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "WAITLIST_LAYOUT",
                value: "wide".into()
            }
        );
    }

    #[test]
    fn compact_layout_has_five_columns() {
        assert_eq!(SheetLayout::Compact.columns().len(), 5);
        assert_eq!(SheetLayout::Full.columns()[6], "Client Info");
        assert!(!SheetLayout::Compact.records_verified_at());
    }
}
