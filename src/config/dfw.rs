//! # Firewall Configuration
//!
//! NSX manager connection settings and firewall behaviour, loaded from
//! environment variables with defaults from [`crate::constants`].

use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Result};
use zeroize::Zeroizing;

use crate::constants::{
    DEFAULT_CONFLICT_RETRIES, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SECTION_NAME,
};

/// What to do when the store returns several objects with the same display name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateNamePolicy {
    /// Treat duplicates as a data-integrity error
    #[default]
    Reject,
    /// Pick the last object in store order
    LastMatch,
}

impl FromStr for DuplicateNamePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "last-match" | "last_match" | "lastmatch" => Ok(Self::LastMatch),
            other => Err(anyhow!(
                "Unknown duplicate name policy '{other}' (expected 'reject' or 'last-match')"
            )),
        }
    }
}

/// Log output format for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(anyhow!("Unknown log format '{other}' (expected 'text' or 'json')")),
        }
    }
}

/// Firewall integration configuration
///
/// All settings except the manager URL have defaults and can be overridden
/// via environment variables.
#[derive(Clone)]
pub struct DfwConfig {
    /// NSX manager base URL, e.g. `https://nsx.example.com`
    pub manager_url: Option<String>,
    /// NSX manager user for basic auth
    pub user: String,
    /// NSX manager password, wiped on drop
    pub password: Zeroizing<String>,
    /// Display name of the managed section
    pub section_name: String,
    /// Additional attempts after a revision conflict on create/update
    pub conflict_retries: u32,
    /// Tie-break for duplicate display names
    pub duplicate_names: DuplicateNamePolicy,
    /// Verify the manager's TLS certificate
    pub verify_tls: bool,
    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,
    /// Log format (json, text)
    pub log_format: LogFormat,
}

impl std::fmt::Debug for DfwConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DfwConfig")
            .field("manager_url", &self.manager_url)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("section_name", &self.section_name)
            .field("conflict_retries", &self.conflict_retries)
            .field("duplicate_names", &self.duplicate_names)
            .field("verify_tls", &self.verify_tls)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for DfwConfig {
    fn default() -> Self {
        Self {
            manager_url: None,
            user: "admin".to_string(),
            password: Zeroizing::new(String::new()),
            section_name: DEFAULT_SECTION_NAME.to_string(),
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
            duplicate_names: DuplicateNamePolicy::default(),
            verify_tls: true,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            log_format: LogFormat::default(),
        }
    }
}

impl DfwConfig {
    /// Load configuration from environment variables with defaults
    ///
    /// # Errors
    /// Returns an error if an enum-valued variable holds an unknown value
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// # Errors
    /// Returns an error if an enum-valued variable holds an unknown value
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let duplicate_names = match lookup("NSX_DUPLICATE_NAMES") {
            Some(v) => v.parse()?,
            None => defaults.duplicate_names,
        };
        let log_format = match lookup("LOG_FORMAT") {
            Some(v) => v.parse()?,
            None => defaults.log_format,
        };

        Ok(Self {
            manager_url: lookup("NSX_MANAGER_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
            user: lookup("NSX_USER").unwrap_or(defaults.user),
            password: Zeroizing::new(lookup("NSX_PASSWORD").unwrap_or_default()),
            section_name: lookup("NSX_SECTION_NAME").unwrap_or(defaults.section_name),
            conflict_retries: parse_or_default(
                lookup("NSX_CONFLICT_RETRIES"),
                defaults.conflict_retries,
            ),
            duplicate_names,
            verify_tls: parse_bool_or_default(lookup("NSX_VERIFY_TLS"), defaults.verify_tls),
            request_timeout_secs: parse_or_default(
                lookup("NSX_TIMEOUT_SECS"),
                defaults.request_timeout_secs,
            ),
            log_format,
        })
    }

    /// Get request timeout duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Total attempts for a mutating call (first try plus conflict retries)
    pub fn max_attempts(&self) -> u32 {
        self.conflict_retries.saturating_add(1)
    }
}

/// Parse a value or return default value
fn parse_or_default<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// Parse a value as boolean or return default
fn parse_bool_or_default(value: Option<String>, default: bool) -> bool {
    value
        .map(|v| {
            let v_lower = v.trim().to_lowercase();
            v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
        })
        .unwrap_or(default)
}
