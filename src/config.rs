//! Process configuration.
//!
//! Every setting can come from a flag or from the environment; flags win.
//! Nothing is global: `main` parses one [`Config`] and passes it down.

use std::time::Duration;

use clap::Parser;

use crate::server::DEFAULT_MAX_BODY_BYTES;

/// Runtime settings for the roster service.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "roster", version, about = "In-memory user records over HTTP")]
pub struct Config {
    /// Interface to listen on. Empty means all interfaces.
    #[arg(long, env = "APP_HOST", default_value = "")]
    pub host: String,

    /// TCP port to listen on.
    #[arg(long, env = "APP_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Seconds to wait for in-flight requests after a shutdown signal.
    #[arg(long = "shutdown-timeout", env = "APP_SHUTDOWN_TIMEOUT", default_value_t = 5)]
    pub shutdown_timeout_secs: u64,

    /// Largest request body accepted, in bytes.
    #[arg(long = "max-body-bytes", env = "APP_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Log filter directives, e.g. `info` or `roster=debug,hyper=warn`.
    #[arg(long = "log", env = "RUST_LOG", default_value = "info")]
    pub log_filter: String,
}

impl Config {
    /// Host to hand to the socket layer; the empty host binds every interface.
    pub fn bind_host(&self) -> &str {
        if self.host.is_empty() { "0.0.0.0" } else { &self.host }
    }

    /// `host:port` as configured, for logs.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    #[cfg(test)]
    pub(crate) fn for_test(host: &str, port: u16, shutdown_timeout_secs: u64) -> Self {
        Self {
            host: host.to_owned(),
            port,
            shutdown_timeout_secs,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            log_filter: "info".to_owned(),
        }
    }
}
