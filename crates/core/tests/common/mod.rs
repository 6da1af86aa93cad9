//! Shared test infrastructure.

use std::cell::RefCell;
use std::rc::Rc;

use memsim_core::config::{Config, TimingConfig};
use memsim_core::system::MemorySystem;
use tempfile::TempDir;

/// A small topology with hand-checkable timing values.
///
/// Two ranks of 2×2 banks, 64 rows, 32 columns, BL8 on a 64-bit bus
/// (one burst = 64 bytes). Refresh is pushed far out so tests opt into it
/// explicitly.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.dram.channels = 1;
    config.dram.ranks = 2;
    config.dram.bankgroups = 2;
    config.dram.banks_per_group = 2;
    config.dram.rows = 64;
    config.dram.columns = 32;
    config.dram.bus_width = 64;
    config.dram.bl = 8;
    config.queue.cmd_queue_size = 8;
    config.scheduler.row_hit_cap = 4;
    config.timing = TimingConfig {
        cl: 4,
        cwl: 3,
        trcd: 3,
        trp: 3,
        tras: 8,
        trc: 11,
        trrd_l: 2,
        trrd_s: 2,
        tccd_l: 2,
        tccd_s: 2,
        trtp: 2,
        twr: 4,
        twtr_l: 3,
        twtr_s: 2,
        trtrs: 1,
        tfaw: 20,
        trfc: 20,
        trfcb: 10,
        trefi: 10_000,
        trefib: 2_500,
        txs: 24,
        tckesr: 5,
    };
    config.output.output_level = 0;
    config
}

/// Captured completion callbacks, in firing order.
#[derive(Default)]
pub struct CallbackLog {
    /// Addresses passed to the read callback.
    pub reads: Rc<RefCell<Vec<u64>>>,
    /// Addresses passed to the write callback.
    pub writes: Rc<RefCell<Vec<u64>>>,
}

impl CallbackLog {
    /// Total callbacks of both kinds.
    pub fn total(&self) -> usize {
        self.reads.borrow().len() + self.writes.borrow().len()
    }
}

/// A memory system wired to callback capture, writing its output files into
/// a scratch directory.
pub struct TestSystem {
    /// The system under test.
    pub memory: MemorySystem,
    /// Captured callbacks.
    pub log: CallbackLog,
    _output_dir: TempDir,
}

impl TestSystem {
    /// Builds the harness around `config`, overriding its output directory.
    pub fn new(mut config: Config) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let output_dir = TempDir::new().unwrap();
        config.output.output_dir = output_dir.path().to_string_lossy().into_owned();

        let mut memory = MemorySystem::new(config).unwrap();
        let log = CallbackLog::default();
        let reads = log.reads.clone();
        let writes = log.writes.clone();
        memory.register_callbacks(
            move |addr| reads.borrow_mut().push(addr),
            move |addr| writes.borrow_mut().push(addr),
        );

        Self {
            memory,
            log,
            _output_dir: output_dir,
        }
    }

    /// Path of the scratch output directory.
    pub fn output_dir(&self) -> &std::path::Path {
        self._output_dir.path()
    }

    /// Drops the memory system (flushing its output files) but keeps the
    /// scratch directory alive so tests can inspect what was written.
    pub fn shutdown(self) -> TempDir {
        let Self {
            memory,
            log: _,
            _output_dir,
        } = self;
        drop(memory);
        _output_dir
    }

    /// Ticks the system `n` cycles.
    pub fn tick(&mut self, n: u64) {
        for _ in 0..n {
            self.memory.clock_tick();
        }
    }

    /// Ticks until `expected` callbacks have fired, panicking after `max`
    /// cycles.
    pub fn run_until_complete(&mut self, expected: usize, max: u64) {
        for _ in 0..max {
            if self.log.total() >= expected {
                return;
            }
            self.memory.clock_tick();
        }
        panic!(
            "only {} of {expected} callbacks fired within {max} cycles",
            self.log.total()
        );
    }
}
