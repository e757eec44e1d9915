//! Project-wide constants.

use std::path::PathBuf;

use anyhow::{Context, Result};

pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
pub const HOMEPAGE: &str = env!("CARGO_PKG_HOMEPAGE");
pub const REPO: &str = env!("CARGO_PKG_REPOSITORY");

/// Backend used when nothing is configured: a local WooCommerce install.
pub const DEFAULT_API_URL: &str = "http://localhost:8080/wp-json/wc/v3";

/// HTTP request timeout when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "storefront=info";

/// Default database path: `~/.storefront/storefront.db`.
/// Single DB for session and config.
pub fn default_db_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("cannot determine home directory")?;
    Ok(home.join(".storefront").join("storefront.db"))
}

/// `1 item`, `3 items`.
pub fn pluralize(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consts_are_non_empty() {
        assert!(!AUTHOR.is_empty());
        assert!(!HOMEPAGE.is_empty());
        assert!(!REPO.is_empty());
        assert!(!DEFAULT_API_URL.is_empty());
    }

    #[test]
    fn consts_from_cargo_toml() {
        assert!(REPO.contains("storefront"));
    }

    #[test]
    fn default_db_path_ends_with_db_file() {
        if let Ok(path) = default_db_path() {
            assert!(path.ends_with(".storefront/storefront.db"));
        }
    }

    #[test]
    fn pluralize_counts() {
        assert_eq!(pluralize(0, "item"), "0 items");
        assert_eq!(pluralize(1, "item"), "1 item");
        assert_eq!(pluralize(12, "item"), "12 items");
    }
}
