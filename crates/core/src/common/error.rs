//! Fatal configuration errors.
//!
//! All construction-time failures surface through [`ConfigError`]; once a
//! memory system is built, the core never fails — admission refusal is a
//! boolean and invariant violations are fatal assertions.

use thiserror::Error;

/// A fatal error detected while building a memory system from configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The address-mapping string is malformed or inconsistent.
    #[error("invalid address mapping \"{mapping}\": {reason}")]
    InvalidAddressMapping {
        /// The offending mapping string.
        mapping: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A topology parameter is zero or not a power of two.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// A queue parameter is out of range.
    #[error("invalid queue configuration: {0}")]
    InvalidQueue(String),

    /// A timing parameter is out of range.
    #[error("invalid timing configuration: {0}")]
    InvalidTiming(String),

    /// An output parameter is out of range.
    #[error("invalid output configuration: {0}")]
    InvalidOutput(String),

    /// A configuration file could not be read or an output file created.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration file could not be parsed.
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
