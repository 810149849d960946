use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

pub const DEFAULT_UPSTREAM: &str = "https://www.goodreads.com";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("upstream must be an http(s) url, got `{0}`")]
    InvalidUpstream(String),
    #[error("timeout must be at least one second")]
    ZeroTimeout,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "shelf-feed")]
#[command(about = "Serves a Goodreads shelf as cacheable JSON", long_about = None)]
pub struct ServiceConfig {
    /// Address to listen on
    #[arg(long, env = "SHELF_FEED_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Scheme and host the shelf feed path is appended to
    #[arg(long, env = "SHELF_FEED_UPSTREAM", default_value = DEFAULT_UPSTREAM)]
    pub upstream: String,

    /// Upper bound for one upstream fetch, in seconds
    #[arg(long, env = "SHELF_FEED_TIMEOUT_SECS", default_value_t = 60)]
    pub timeout_secs: u64,
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let upstream = self.upstream.trim();
        if !(upstream.starts_with("http://") || upstream.starts_with("https://")) {
            return Err(ConfigError::InvalidUpstream(self.upstream.clone()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
