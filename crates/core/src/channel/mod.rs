//! Per-channel DRAM state tracking.
//!
//! This module models everything a single channel knows about its devices:
//! 1. **Timing Table:** Static pairwise constraints between command types.
//! 2. **Bank State:** Per-bank FSM with open row, row-hit count, and
//!    earliest-legal cycles per command type.
//! 3. **Channel State:** The aggregate over all banks; answers the
//!    scheduler's `required_command`/`is_ready` queries and applies the
//!    controller's state and timing updates.

/// Per-bank finite state machine and command timing.
pub mod bank_state;

/// Aggregate channel state and scheduler queries.
pub mod channel_state;

/// Static command-to-command timing constraint table.
pub mod timing;

pub use bank_state::{BankState, BankStatus};
pub use channel_state::ChannelState;
pub use timing::Timing;
