//! Common types shared across the DRAM memory-system simulator.
//!
//! This module provides the fundamental building blocks used by every other
//! component. It includes:
//! 1. **Address Coordinates:** The decoded DRAM address hierarchy (channel, rank, bankgroup, bank, row, column).
//! 2. **Commands:** Low-level DRAM command types and the `Command` value issued on the command bus.
//! 3. **Requests:** User-facing memory operations tracked from admission to completion callback.
//! 4. **Error Handling:** Fatal configuration errors surfaced at construction time.

/// Decoded DRAM address coordinate type.
pub mod addr;

/// DRAM command types and command values.
pub mod command;

/// Configuration error definitions.
pub mod error;

/// User-facing memory request type.
pub mod request;

pub use addr::Address;
pub use command::{Command, CommandType};
pub use error::ConfigError;
pub use request::Request;
