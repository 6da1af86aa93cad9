//! Request-generating workload frontends.
//!
//! Each frontend injects at most a handful of requests per cycle and backs
//! off when the memory system refuses admission, so queue pressure shapes
//! the generated stream the same way a real producer would experience it.
//!
//! Three frontends are provided:
//! 1. **Random:** Uniformly random addresses, one in three a write.
//! 2. **Stream:** A read-read-write triad marching through three regions.
//! 3. **Trace:** Replays `<clk> <R|W> <hex_addr>` records from a file.

use std::fs;
use std::io;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::system::MemorySystem;

use super::trace::TraceRecord;

/// A stimulus source driven once per simulated cycle.
pub trait Workload {
    /// Injects this cycle's requests into `memory`.
    ///
    /// Called before [`MemorySystem::clock_tick`] each cycle.
    fn clock_tick(&mut self, memory: &mut MemorySystem);

    /// Whether the workload has produced everything it ever will.
    fn exhausted(&self) -> bool {
        false
    }
}

/// Uniformly random addresses; one request attempted per cycle.
#[derive(Debug)]
pub struct RandomWorkload {
    rng: StdRng,
    addr_mask: u64,
    pending: Option<(u64, bool)>,
}

impl RandomWorkload {
    /// Creates a deterministic random workload over `2^addr_bits` bytes.
    pub fn new(seed: u64, addr_bits: u32) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            addr_mask: (1 << addr_bits) - 1,
            pending: None,
        }
    }
}

impl Workload for RandomWorkload {
    fn clock_tick(&mut self, memory: &mut MemorySystem) {
        // Keep retrying a refused request rather than generating a fresh
        // one, so the address stream is back-pressure independent.
        let (addr, is_write) = self.pending.take().unwrap_or_else(|| {
            let addr = self.rng.random::<u64>() & self.addr_mask;
            let is_write = self.rng.random_range(0..3) == 0;
            (addr, is_write)
        });
        if memory.will_accept(addr, is_write) {
            let inserted = memory.insert_req(addr, is_write);
            debug_assert!(inserted);
        } else {
            self.pending = Some((addr, is_write));
        }
    }
}

/// Streaming read-read-write triad over three disjoint regions.
#[derive(Debug)]
pub struct StreamWorkload {
    base_a: u64,
    base_b: u64,
    base_c: u64,
    region_size: u64,
    stride: u64,
    offset: u64,
    /// Next leg of the triad: 0 = read A, 1 = read B, 2 = write C.
    leg: u8,
}

impl StreamWorkload {
    /// Creates a stream marching `stride` bytes per triad through regions of
    /// `region_size` bytes.
    pub fn new(region_size: u64, stride: u64) -> Self {
        Self {
            base_a: 0,
            base_b: region_size,
            base_c: 2 * region_size,
            region_size,
            stride,
            offset: 0,
            leg: 0,
        }
    }
}

impl Workload for StreamWorkload {
    fn clock_tick(&mut self, memory: &mut MemorySystem) {
        let (addr, is_write) = match self.leg {
            0 => (self.base_a + self.offset, false),
            1 => (self.base_b + self.offset, false),
            _ => (self.base_c + self.offset, true),
        };
        if !memory.will_accept(addr, is_write) {
            return;
        }
        let inserted = memory.insert_req(addr, is_write);
        debug_assert!(inserted);
        self.leg += 1;
        if self.leg == 3 {
            self.leg = 0;
            self.offset = (self.offset + self.stride) % self.region_size;
        }
    }
}

/// Replays an address trace, honoring each record's injection cycle.
#[derive(Debug)]
pub struct TraceWorkload {
    records: Vec<TraceRecord>,
    next: usize,
}

impl TraceWorkload {
    /// Loads a trace file, one record per line; blank lines and `#` comments
    /// are skipped.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if the file cannot be read or a line cannot
    /// be parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        let mut records = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let record: TraceRecord = line
                .parse()
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            records.push(record);
        }
        Ok(Self { records, next: 0 })
    }

    /// Builds a workload from already-parsed records.
    pub fn from_records(records: Vec<TraceRecord>) -> Self {
        Self { records, next: 0 }
    }
}

impl Workload for TraceWorkload {
    fn clock_tick(&mut self, memory: &mut MemorySystem) {
        while let Some(record) = self.records.get(self.next) {
            if record.cycle > memory.clk() {
                break;
            }
            if !memory.will_accept(record.hex_addr, record.is_write) {
                break;
            }
            let inserted = memory.insert_req(record.hex_addr, record.is_write);
            debug_assert!(inserted);
            self.next += 1;
        }
    }

    fn exhausted(&self) -> bool {
        self.next == self.records.len()
    }
}
