//! Command-line and environment configuration.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::api::{DEFAULT_BASE_URL, StoreConfig};
use crate::error::{Result, simple_error};

/// Browse, search and edit user records served by a REST API.
#[derive(Clone, Debug, Parser)]
#[command(name = "usrapi-manager", version, about)]
pub struct Cli {
    /// Base URL of the API exposing `/users`.
    #[arg(long, env = "USRAPI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Per-request timeout in milliseconds.
    #[arg(long, env = "USRAPI_TIMEOUT_MS", default_value_t = 8000)]
    pub timeout_ms: u64,

    /// Theme file (key = #RRGGBB); written with defaults if missing.
    #[arg(long, default_value = "theme.conf")]
    pub theme: String,

    /// Keybindings file; written with defaults if missing.
    #[arg(long, default_value = "keybinds.conf")]
    pub keybinds: String,

    /// Where log output goes. Filter with RUST_LOG.
    #[arg(long, env = "USRAPI_LOG_FILE", default_value = "usrapi-manager.log")]
    pub log_file: PathBuf,

    /// Use built-in sample users instead of the API.
    #[arg(long)]
    pub offline: bool,
}

impl Cli {
    pub fn store_config(&self) -> Result<StoreConfig> {
        let base_url = self.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(simple_error(format!(
                "base URL must start with http:// or https://, got '{base_url}'"
            )));
        }
        if self.timeout_ms == 0 {
            return Err(simple_error("timeout must be greater than zero"));
        }
        Ok(StoreConfig {
            base_url: base_url.to_string(),
            timeout: Duration::from_millis(self.timeout_ms),
        })
    }

    /// Short description of the data source for the header.
    pub fn source_label(&self) -> String {
        if self.offline {
            "offline sample data".to_string()
        } else {
            self.base_url.trim().trim_end_matches('/').to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_public_api_with_8s_timeout() {
        let cli = Cli::try_parse_from(["usrapi-manager", "--base-url", DEFAULT_BASE_URL, "--timeout-ms", "8000"]).unwrap();
        let cfg = cli.store_config().unwrap();
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.timeout, Duration::from_millis(8000));
        assert!(!cli.offline);
    }

    #[test]
    fn rejects_non_http_base_url_and_zero_timeout() {
        let cli = Cli::try_parse_from(["usrapi-manager", "--base-url", "ftp://x"]).unwrap();
        assert!(cli.store_config().is_err());
        let cli = Cli::try_parse_from(["usrapi-manager", "--base-url", "http://x", "--timeout-ms", "0"]).unwrap();
        assert!(cli.store_config().is_err());
    }

    #[test]
    fn offline_label() {
        let cli = Cli::try_parse_from(["usrapi-manager", "--offline"]).unwrap();
        assert_eq!(cli.source_label(), "offline sample data");
    }
}
