//! Runtime configuration for a table handle.

use log::warn;

/// Upper bound on page numbers the pager will hand out.
pub const TABLE_MAX_PAGES: u32 = 100;

const MAX_PAGES_VAR: &str = "LEAFDB_MAX_PAGES";
const SYNC_VAR: &str = "LEAFDB_SYNC";

/// Settings that shape how a table's pager behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Page numbers at or above this bound are rejected with a capacity error.
    pub max_pages: u32,
    /// fsync the file after the close-time flush.
    pub sync_on_close: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            max_pages: TABLE_MAX_PAGES,
            sync_on_close: true,
        }
    }
}

impl DbConfig {
    /// Defaults, overridden by `LEAFDB_MAX_PAGES` / `LEAFDB_SYNC` where those parse.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(MAX_PAGES_VAR) {
            match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => config.max_pages = n,
                _ => warn!("ignoring {}={:?}: expected a positive integer", MAX_PAGES_VAR, raw),
            }
        }

        if let Some(raw) = lookup(SYNC_VAR) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => config.sync_on_close = true,
                "0" | "false" | "no" | "off" => config.sync_on_close = false,
                _ => warn!("ignoring {}={:?}: expected a boolean", SYNC_VAR, raw),
            }
        }

        config
    }
}
