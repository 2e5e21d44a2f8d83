//! Crate-wide error taxonomy. Mirrors the fatal/degraded/transient split: only
//! fatal initialisation errors are returned as `Err` across the Orchestrator's
//! public boundary; everything else is logged and absorbed inside a driver.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitError {
    #[error("insufficient privileges for requested scan level: {0}")]
    InsufficientPrivileges(String),

    #[error("no usable network interface detected")]
    NoInterface,

    #[error("required tool for this scan level is missing: {0}")]
    RequiredToolMissing(String),
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to spawn external tool {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("socket error: {0}")]
    Socket(#[source] std::io::Error),

    #[error("driver deadline exceeded")]
    Timeout,
}
