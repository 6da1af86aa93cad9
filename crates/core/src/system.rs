//! Top-level memory-system facade.
//!
//! `MemorySystem` is the consumer-facing contract: it owns one controller
//! per channel, decodes incoming addresses, assigns request ids, fires the
//! registered read/write callbacks, and handles statistics epochs and output
//! files. Channels are independent state machines ticked sequentially in
//! channel order, so results are deterministic.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use crate::common::{ConfigError, Request};
use crate::config::Config;
use crate::ctrl::Controller;
use crate::mapping::AddressMapper;
use crate::stats::Statistics;

/// User callback invoked with the original physical address of a completed
/// request.
pub type Callback = Box<dyn FnMut(u64)>;

/// A complete multi-channel DRAM memory system.
pub struct MemorySystem {
    config: Config,
    mapper: AddressMapper,
    ctrls: Vec<Controller>,
    read_callback: Option<Callback>,
    write_callback: Option<Callback>,
    clk: u64,
    next_req_id: u64,
    last_req_clk: u64,
    /// Staging buffer for refused requests in no-backpressure mode.
    buffer_q: VecDeque<Request>,
    stats_file: Option<BufWriter<File>>,
    stats_csv_file: Option<BufWriter<File>>,
    epoch_csv_file: Option<BufWriter<File>>,
    histo_csv_file: Option<BufWriter<File>>,
    epoch_txt_file: Option<BufWriter<File>>,
    address_trace: Option<BufWriter<File>>,
}

impl std::fmt::Debug for MemorySystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySystem")
            .field("channels", &self.ctrls.len())
            .field("clk", &self.clk)
            .finish_non_exhaustive()
    }
}

impl MemorySystem {
    /// Builds a memory system with system id 0.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an invalid configuration or unwritable
    /// output location.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        Self::with_system_id(config, 0)
    }

    /// Builds a memory system whose output files carry a numeric suffix.
    ///
    /// Multiple instances in one process pass distinct `system_id`s so their
    /// statistics files do not overwrite each other.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an invalid configuration or unwritable
    /// output location.
    pub fn with_system_id(config: Config, system_id: usize) -> Result<Self, ConfigError> {
        config.validate()?;
        let mapper = AddressMapper::new(&config)?;

        let ctrls = (0..config.dram.channels)
            .map(|ch| Controller::new(ch, &config))
            .collect();

        fs::create_dir_all(&config.output.output_dir)?;
        let path = |name: &str| -> PathBuf {
            let file = if system_id > 0 {
                format!("{}_{system_id}_{name}", config.output.output_prefix)
            } else {
                format!("{}_{name}", config.output.output_prefix)
            };
            PathBuf::from(&config.output.output_dir).join(file)
        };
        let writer = |name: &str| -> Result<BufWriter<File>, ConfigError> {
            Ok(BufWriter::new(File::create(path(name))?))
        };

        let level = config.output.output_level;
        let stats_file = Some(writer("stats.txt")?);
        let stats_csv_file = Some(writer("stats.csv")?);
        let mut epoch_csv_file = (level >= 1).then(|| writer("epoch.csv")).transpose()?;
        let mut histo_csv_file = (level >= 2).then(|| writer("histo.csv")).transpose()?;
        let epoch_txt_file = (level >= 3).then(|| writer("epoch.txt")).transpose()?;
        let address_trace = config
            .output
            .address_trace
            .then(|| writer("addr.trace"))
            .transpose()?;

        // Epoch files stream rows as the simulation runs, so their headers
        // go out up front.
        let template = Statistics::new();
        if let Some(out) = epoch_csv_file.as_mut() {
            template.print_csv_header(out)?;
        }
        if let Some(out) = histo_csv_file.as_mut() {
            template.print_histo_csv_header(out)?;
        }

        Ok(Self {
            config,
            mapper,
            ctrls,
            read_callback: None,
            write_callback: None,
            clk: 0,
            next_req_id: 0,
            last_req_clk: 0,
            buffer_q: VecDeque::new(),
            stats_file,
            stats_csv_file,
            epoch_csv_file,
            histo_csv_file,
            epoch_txt_file,
            address_trace,
        })
    }

    /// Registers the completion callbacks, one per direction.
    ///
    /// Each admitted request eventually invokes exactly one of them with its
    /// original physical address, on the thread that calls
    /// [`clock_tick`](Self::clock_tick).
    pub fn register_callbacks(
        &mut self,
        read_callback: impl FnMut(u64) + 'static,
        write_callback: impl FnMut(u64) + 'static,
    ) {
        self.read_callback = Some(Box::new(read_callback));
        self.write_callback = Some(Box::new(write_callback));
    }

    /// Current simulation cycle.
    #[inline]
    pub const fn clk(&self) -> u64 {
        self.clk
    }

    /// The address mapper built from this system's configuration.
    #[inline]
    pub const fn mapper(&self) -> &AddressMapper {
        &self.mapper
    }

    /// Read-only view of one channel's controller.
    #[inline]
    pub fn controller(&self, channel: usize) -> &Controller {
        &self.ctrls[channel]
    }

    /// Whether [`insert_req`](Self::insert_req) would succeed this cycle.
    pub fn will_accept(&self, hex_addr: u64, _is_write: bool) -> bool {
        if self.config.queue.no_backpressure {
            return true;
        }
        let addr = self.mapper.decode(hex_addr);
        self.ctrls[addr.channel].will_accept(&addr)
    }

    /// Admits a memory request.
    ///
    /// Returns false when the target command queue is full (strict mode);
    /// the caller retries on a later cycle. In no-backpressure mode refused
    /// requests are staged internally and this always returns true.
    pub fn insert_req(&mut self, hex_addr: u64, is_write: bool) -> bool {
        if let Some(trace) = self.address_trace.as_mut() {
            let dir = if is_write { "W" } else { "R" };
            if writeln!(trace, "{} {dir} {hex_addr:#x}", self.clk).is_err() {
                tracing::warn!("address trace write failed");
            }
        }

        let addr = self.mapper.decode(hex_addr);
        self.next_req_id += 1;
        let req = Request::new(hex_addr, addr, is_write, self.clk, self.next_req_id);

        let channel = addr.channel;
        let interarrival = self.clk - self.last_req_clk;
        match self.ctrls[channel].insert_req(req) {
            Ok(()) => {}
            Err(req) => {
                if !self.config.queue.no_backpressure {
                    return false;
                }
                self.ctrls[channel].stats_mut().numb_buffered_requests.inc();
                self.buffer_q.push_back(req);
            }
        }
        self.ctrls[channel]
            .stats_mut()
            .interarrival_latency
            .add_value(interarrival);
        self.last_req_clk = self.clk;
        true
    }

    /// Advances every channel by one cycle and fires due callbacks.
    pub fn clock_tick(&mut self) {
        for ctrl in &mut self.ctrls {
            ctrl.clock_tick();
            for completion in ctrl.drain_finished() {
                let callback = if completion.is_write {
                    self.write_callback.as_mut()
                } else {
                    self.read_callback.as_mut()
                };
                if let Some(callback) = callback {
                    callback(completion.hex_addr);
                }
            }
        }

        // Feed staged requests back in as queue space frees, one per cycle.
        if let Some(pos) = self
            .buffer_q
            .iter()
            .position(|req| self.ctrls[req.cmd.addr.channel].will_accept(&req.cmd.addr))
        {
            if let Some(req) = self.buffer_q.remove(pos) {
                let channel = req.cmd.addr.channel;
                let readmitted = self.ctrls[channel].insert_req(req).is_ok();
                assert!(readmitted, "staged request refused by an accepting queue");
            }
        }

        if self.clk > 0 && self.clk % self.config.output.epoch_period == 0 {
            self.roll_epoch();
        }

        self.clk += 1;
    }

    /// Aggregated statistics over all channels.
    pub fn aggregate_stats(&self) -> Statistics {
        let mut total = Statistics::new();
        for ctrl in &self.ctrls {
            total.merge(ctrl.stats());
        }
        total
    }

    /// Prints final statistics to stdout and the configured output files.
    pub fn print_stats(&mut self) {
        let total = self.aggregate_stats();
        println!("-----------------------------------------------------");
        println!("Final statistics of memory system");
        println!("-----------------------------------------------------");
        let mut stdout = io::stdout();
        if total.print_stats(&mut stdout).is_err() {
            tracing::warn!("stats write to stdout failed");
        }
        println!("-----------------------------------------------------");

        if let Some(out) = self.stats_file.as_mut() {
            let _ = total.print_stats(out);
            let _ = out.flush();
        }
        if let Some(out) = self.stats_csv_file.as_mut() {
            let _ = total.print_csv_header(out);
            let _ = total.print_csv_row(out, self.clk);
            let _ = out.flush();
        }
    }

    /// Prints the current epoch's statistics to stdout.
    pub fn print_epoch_stats(&self) {
        let total = self.aggregate_stats();
        let mut stdout = io::stdout();
        if total.print_epoch_stats(&mut stdout).is_err() {
            tracing::warn!("epoch stats write to stdout failed");
        }
    }

    /// Closes the statistics epoch: samples queue usage, streams the epoch
    /// rows, and rolls every channel's snapshot forward.
    fn roll_epoch(&mut self) {
        tracing::debug!(clk = self.clk, "epoch rollover");
        for ctrl in &mut self.ctrls {
            let usage = ctrl.queue_usage() as f64;
            ctrl.stats_mut().epoch_queue_usage = usage;
        }
        let total = self.aggregate_stats();
        if let Some(out) = self.epoch_csv_file.as_mut() {
            let _ = total.print_epoch_csv_row(out, self.clk);
        }
        if let Some(out) = self.histo_csv_file.as_mut() {
            let _ = total.print_histo_csv_row(out, self.clk);
        }
        if let Some(out) = self.epoch_txt_file.as_mut() {
            let _ = writeln!(out, "-----------------------------------------------------");
            let _ = writeln!(
                out,
                "Epoch stats from clock = {} to {}",
                self.clk - self.config.output.epoch_period,
                self.clk
            );
            let _ = writeln!(out, "-----------------------------------------------------");
            let _ = total.print_epoch_stats(out);
        }
        for ctrl in &mut self.ctrls {
            ctrl.stats_mut().update_epoch();
        }
    }
}

impl Drop for MemorySystem {
    fn drop(&mut self) {
        for out in [
            self.stats_file.as_mut(),
            self.stats_csv_file.as_mut(),
            self.epoch_csv_file.as_mut(),
            self.histo_csv_file.as_mut(),
            self.epoch_txt_file.as_mut(),
            self.address_trace.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            let _ = out.flush();
        }
    }
}
