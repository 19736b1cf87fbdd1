use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_u32(key: &str, default: u32) -> u32 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub anki: AnkiConnectConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    ///
    /// Unparseable numeric values fall back to their defaults; the endpoint
    /// URL is checked by [`Config::validate`].
    pub fn from_env() -> Self {
        Self {
            anki: AnkiConnectConfig::from_env(),
            server: ServerConfig::from_env(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.anki.validate()
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!(
            "  anki:    url={}, version={}, timeout={}ms",
            self.anki.url,
            self.anki.api_version,
            self.anki.timeout_ms
        );
        tracing::info!(
            "  retry:   max_attempts={}, ceiling={}ms",
            self.anki.max_attempts,
            self.anki.retry_timeout_ms
        );
        tracing::info!("  deck:    default={}", self.anki.default_deck);
        tracing::info!(
            "  server:  name={}, schema_ttl={}s",
            self.server.name,
            self.server.schema_ttl_secs
        );
    }
}

// ── AnkiConnect ───────────────────────────────────────────────

pub const DEFAULT_ANKI_CONNECT_URL: &str = "http://localhost:8765";
pub const DEFAULT_API_VERSION: u32 = 6;
pub const DEFAULT_DECK: &str = "Default";

/// Connection settings for the AnkiConnect endpoint. Immutable once a
/// client has been built from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnkiConnectConfig {
    pub url: String,
    pub api_version: u32,
    /// Per-attempt request deadline.
    pub timeout_ms: u64,
    /// Upper bound for a single backoff delay between attempts.
    pub retry_timeout_ms: u64,
    /// Total attempts per operation (first try included).
    pub max_attempts: u32,
    pub default_deck: String,
}

impl Default for AnkiConnectConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ANKI_CONNECT_URL.to_string(),
            api_version: DEFAULT_API_VERSION,
            timeout_ms: 5_000,
            retry_timeout_ms: 10_000,
            max_attempts: 2,
            default_deck: DEFAULT_DECK.to_string(),
        }
    }
}

impl AnkiConnectConfig {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: env_or("ANKI_CONNECT_URL", &defaults.url),
            api_version: env_u32("ANKI_CONNECT_VERSION", defaults.api_version),
            timeout_ms: env_u64("ANKI_CONNECT_TIMEOUT_MS", defaults.timeout_ms),
            retry_timeout_ms: env_u64("ANKI_CONNECT_RETRY_TIMEOUT_MS", defaults.retry_timeout_ms),
            max_attempts: env_u32("ANKI_CONNECT_MAX_ATTEMPTS", defaults.max_attempts),
            default_deck: env_or("ANKI_DEFAULT_DECK", &defaults.default_deck),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_ceiling(&self) -> Duration {
        Duration::from_millis(self.retry_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = url::Url::parse(&self.url).map_err(|e| ConfigError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                url: self.url.clone(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        if self.default_deck.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "default_deck".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

// ── MCP server ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Name advertised in the MCP `initialize` handshake.
    pub name: String,
    /// Freshness window of the note-type schema cache.
    pub schema_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "anki-mcp".to_string(),
            schema_ttl_secs: 300,
        }
    }
}

impl ServerConfig {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            name: env_or("ANKI_MCP_SERVER_NAME", &defaults.name),
            schema_ttl_secs: env_u64("ANKI_MCP_SCHEMA_TTL_SECS", defaults.schema_ttl_secs),
        }
    }

    pub fn schema_ttl(&self) -> Duration {
        Duration::from_secs(self.schema_ttl_secs)
    }
}
