//! Cycle-accurate DRAM memory-system simulator library.
//!
//! This crate models a JEDEC-style DRAM subsystem one clock at a time, with the following:
//! 1. **Mapping:** Bijective physical-address decoding into (channel, rank, bankgroup, bank, row, column).
//! 2. **Channel:** Per-bank FSMs, the pairwise command timing table, and aggregate channel state.
//! 3. **Controller:** Bounded command queues with FR-FCFS arbitration, refresh injection, and the per-cycle tick loop.
//! 4. **System:** The multi-channel `MemorySystem` facade with request callbacks, statistics epochs, and output files.
//! 5. **Simulation:** Workload frontends (random, stream, trace replay) for standalone runs.

/// Per-channel DRAM state: timing table, bank FSMs, channel aggregate.
pub mod channel;
/// Common types (addresses, commands, requests, configuration errors).
pub mod common;
/// Simulator configuration (defaults, enums, hierarchical config structures).
pub mod config;
/// Per-channel controller: command queues, refresh engine, tick loop.
pub mod ctrl;
/// Physical-address decoding and encoding.
pub mod mapping;
/// Simulation drivers: workload frontends and trace records.
pub mod sim;
/// Statistics collection and reporting.
pub mod stats;
/// Top-level multi-channel memory-system facade.
pub mod system;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Top-level memory system; construct with `MemorySystem::new`.
pub use crate::system::MemorySystem;
