use clap::Parser;

use crate::app::{AppOptions, DAY_MS};

/// Terminal chat over a feed-based P2P network.
#[derive(Debug, Parser)]
#[command(name = "scat", version, about)]
pub struct Config {
    /// Address of the node's RPC endpoint
    #[arg(long, value_name = "HOST:PORT", default_value = "127.0.0.1:8008")]
    pub node: String,

    /// Write diagnostic logs to stderr
    #[arg(long)]
    pub debug: bool,

    /// Show messages from the last N days
    #[arg(long, value_name = "N", default_value_t = 7, value_parser = clap::value_parser!(u32).range(1..))]
    pub window_days: u32,

    /// Messages kept per conversation
    #[arg(long, value_name = "N", default_value_t = crate::store::DEFAULT_HISTORY)]
    pub history: usize,
}

impl Config {
    pub fn window_ms(&self) -> i64 {
        i64::from(self.window_days) * DAY_MS
    }

    pub fn app_options(&self) -> AppOptions {
        AppOptions {
            history: self.history,
            window_ms: self.window_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::parse_from(["scat"]);
        assert_eq!(config.node, "127.0.0.1:8008");
        assert!(!config.debug);
        assert_eq!(config.window_ms(), 7 * DAY_MS);
        assert_eq!(config.app_options().history, crate::store::DEFAULT_HISTORY);
    }

    #[test]
    fn flags() {
        let config = Config::parse_from(["scat", "--debug", "--node", "10.0.0.2:9000", "--window-days", "2"]);
        assert!(config.debug);
        assert_eq!(config.node, "10.0.0.2:9000");
        assert_eq!(config.app_options().window_ms, 2 * DAY_MS);
    }

    #[test]
    fn zero_day_window_is_rejected() {
        assert!(Config::try_parse_from(["scat", "--window-days", "0"]).is_err());
    }
}
