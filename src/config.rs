//! Runtime settings. The defaults are what the service ships with; the
//! environment may override the listener and database location.

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::Context;

pub const ADDR_VAR: &str = "ORDER_API_ADDR";
pub const DB_VAR: &str = "ORDER_API_DB";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub db_path: PathBuf,
    pub pool_size: usize,
    pub request_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            db_path: PathBuf::from("./orders.db"),
            pool_size: 8,
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut cfg = Self::default();
        if let Some(addr) = get(ADDR_VAR) {
            cfg.bind_addr = addr
                .parse()
                .with_context(|| format!("{ADDR_VAR}={addr} is not a socket address"))?;
        }
        if let Some(path) = get(DB_VAR).filter(|p| !p.is_empty()) {
            cfg.db_path = PathBuf::from(path);
        }
        Ok(cfg)
    }
}
