//! The per-channel memory controller.
//!
//! This module contains the decision-making half of a channel:
//! 1. **Command Queue:** Bounded per-bank or per-rank FIFOs with round-robin
//!    and first-ready-first-come-first-serve arbitration.
//! 2. **Refresh Engine:** Periodic injection of rank- or bank-level refresh.
//! 3. **Controller:** The per-cycle orchestrator tying queues, refresh,
//!    channel state, completions, and statistics together.

/// Bounded command FIFOs and issue arbitration.
pub mod command_queue;

/// Per-cycle controller orchestration.
pub mod controller;

/// Periodic refresh injection.
pub mod refresh;

pub use command_queue::CommandQueue;
pub use controller::Controller;
pub use refresh::Refresh;
