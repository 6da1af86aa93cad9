//! Standalone simulation drivers.
//!
//! Provides the stimulus side of a standalone run: workload frontends that
//! generate memory requests (random, streaming, or replayed from an address
//! trace) and the trace-record parser they share with the trace writer.

/// Address trace records and parsing.
pub mod trace;

/// Request-generating workload frontends.
pub mod workload;

pub use trace::TraceRecord;
pub use workload::{RandomWorkload, StreamWorkload, TraceWorkload, Workload};
