use clap::Parser;

use ankimcp_core::Config;

/// MCP server exposing an Anki collection through AnkiConnect.
///
/// Speaks JSON-RPC over stdin/stdout; logs go to stderr. Flags override
/// the `ANKI_*` environment variables (and `.env`).
#[derive(Parser, Debug, Default)]
#[command(name = "ankimcp", version, about = "MCP server for Anki via AnkiConnect")]
pub struct CliArgs {
    /// AnkiConnect endpoint (overrides ANKI_CONNECT_URL)
    #[arg(long)]
    pub url: Option<String>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Upper bound for the retry backoff delay in milliseconds
    #[arg(long)]
    pub retry_timeout_ms: Option<u64>,

    /// Total attempts per AnkiConnect call
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Deck used when a note is created without one
    #[arg(long)]
    pub default_deck: Option<String>,

    /// Log filter, e.g. "info" or "ankimcp_anki=debug" (overrides RUST_LOG)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Layer command-line overrides on top of the environment config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.url {
            config.anki.url = url.clone();
        }
        if let Some(ms) = self.timeout_ms {
            config.anki.timeout_ms = ms;
        }
        if let Some(ms) = self.retry_timeout_ms {
            config.anki.retry_timeout_ms = ms;
        }
        if let Some(n) = self.max_attempts {
            config.anki.max_attempts = n;
        }
        if let Some(deck) = &self.default_deck {
            config.anki.default_deck = deck.clone();
        }
    }
}
