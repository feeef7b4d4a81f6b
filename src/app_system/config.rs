use std::time::Duration;

use clap::Parser;
use tracing::Level;

use super::SystemError;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

/// Runtime settings for the order core.
#[derive(Debug, Clone, PartialEq)]
pub struct StorefrontConfig {
    /// Base URL of the REST document store. `None` runs against the
    /// in-process store.
    pub store_url: Option<String>,
    pub cart_owner: String,
    pub cleanup_interval: Duration,
    pub payment_delay: Duration,
    pub retention: chrono::Duration,
    pub restock_on_clear: bool,
    pub serialize_stock_writes: bool,
    pub request_timeout: Option<Duration>,
    pub log_level: LogLevel,
    pub demo: bool,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            store_url: None,
            cart_owner: "guest".to_string(),
            cleanup_interval: Duration::from_secs(3600),
            payment_delay: Duration::from_millis(2000),
            retention: chrono::Duration::days(crate::domain::DEFAULT_RETENTION_DAYS),
            restock_on_clear: false,
            serialize_stock_writes: false,
            request_timeout: None,
            log_level: LogLevel::Info,
            demo: false,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "storefront", about = "Storefront order lifecycle and inventory core")]
pub struct StorefrontEnv {
    /// Base URL of the REST document store (in-memory store when absent)
    #[clap(long, env)]
    store_url: Option<String>,
    /// Owner id stamped on cart lines
    #[clap(long, env, default_value = "guest")]
    cart_owner: String,
    /// Seconds between auto-cleanup sweeps
    #[clap(long, env, default_value = "3600")]
    cleanup_interval_secs: u64,
    /// Simulated payment processing time
    #[clap(long, env, default_value = "2000")]
    payment_delay_ms: u64,
    /// Days an archived order is kept before deletion
    #[clap(long, env, default_value = "30")]
    retention_days: i64,
    /// Return stock when the whole cart is cleared
    #[clap(long, env)]
    restock_on_clear: bool,
    /// Serialize stock writes per product within this process
    #[clap(long, env)]
    serialize_stock_writes: bool,
    /// Bound on every store request; unbounded when absent
    #[clap(long, env)]
    request_timeout_secs: Option<u64>,
    #[clap(long, env, default_value = "info")]
    log_level: LogLevel,
    /// Seed a product and run one order end to end
    #[clap(long)]
    demo: bool,
}

impl StorefrontEnv {
    pub fn into_config(self) -> Result<StorefrontConfig, SystemError> {
        if self.cleanup_interval_secs == 0 {
            return Err(SystemError::Config(
                "cleanup interval must be at least one second".to_string(),
            ));
        }
        if self.retention_days <= 0 {
            return Err(SystemError::Config(
                "retention must be at least one day".to_string(),
            ));
        }
        let store_url = self
            .store_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        Ok(StorefrontConfig {
            store_url,
            cart_owner: self.cart_owner,
            cleanup_interval: Duration::from_secs(self.cleanup_interval_secs),
            payment_delay: Duration::from_millis(self.payment_delay_ms),
            retention: chrono::Duration::days(self.retention_days),
            restock_on_clear: self.restock_on_clear,
            serialize_stock_writes: self.serialize_stock_writes,
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
            log_level: self.log_level,
            demo: self.demo,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = StorefrontEnv::try_parse_from(["storefront"])
            .unwrap()
            .into_config()
            .unwrap();
        assert_eq!(config, StorefrontConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let config = StorefrontEnv::try_parse_from([
            "storefront",
            "--store-url",
            "http://localhost:3000/",
            "--cleanup-interval-secs",
            "60",
            "--restock-on-clear",
            "--request-timeout-secs",
            "5",
            "--log-level",
            "debug",
        ])
        .unwrap()
        .into_config()
        .unwrap();

        assert_eq!(config.store_url.as_deref(), Some("http://localhost:3000/"));
        assert_eq!(config.cleanup_interval, Duration::from_secs(60));
        assert!(config.restock_on_clear);
        assert!(!config.serialize_stock_writes);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn zero_retention_is_rejected() {
        let result = StorefrontEnv::try_parse_from(["storefront", "--retention-days", "0"])
            .unwrap()
            .into_config();
        assert!(matches!(result, Err(SystemError::Config(_))));
    }
}
