//! Configuration system for the DRAM memory-system simulator.
//!
//! This module defines all configuration structures and enums used to
//! parameterize the simulator. It provides:
//! 1. **Defaults:** Baseline DDR4-2400-style constants (topology, queueing, timing, output).
//! 2. **Structures:** Hierarchical config for device topology, queues, scheduler, timing, and output.
//! 3. **Enums:** DRAM protocol, queue structure, and refresh strategy.
//! 4. **Validation:** A construction-time pass that rejects inconsistent configurations.
//!
//! Configuration is supplied as JSON (see [`Config::from_file`]) or use
//! `Config::default()` for tests and the CLI.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::common::ConfigError;

/// Default configuration constants for the simulator.
///
/// These values describe a single-channel DDR4-2400-style device and are used
/// whenever a field is omitted from the configuration file.
mod defaults {
    /// Number of independent memory channels.
    pub const CHANNELS: usize = 1;

    /// Number of ranks per channel.
    pub const RANKS: usize = 2;

    /// Number of bankgroups per rank.
    pub const BANKGROUPS: usize = 4;

    /// Number of banks per bankgroup.
    pub const BANKS_PER_GROUP: usize = 4;

    /// Number of rows per bank.
    pub const ROWS: usize = 1 << 16;

    /// Number of columns per row (burst granularity).
    pub const COLUMNS: usize = 1 << 10;

    /// DQ pins per device.
    pub const DEVICE_WIDTH: usize = 8;

    /// Data bus width in bits.
    pub const BUS_WIDTH: usize = 64;

    /// Burst length in beats.
    pub const BL: usize = 8;

    /// Capacity of each command FIFO.
    pub const CMD_QUEUE_SIZE: usize = 8;

    /// Consecutive row hits permitted before an on-demand precharge may win
    /// arbitration against further hits.
    pub const ROW_HIT_CAP: u32 = 4;

    /// Address bit order, MSB first: row, channel, rank, bank, bankgroup, column.
    pub const ADDRESS_MAPPING: &str = "rochrababgco";

    /// CAS latency (READ command to first data beat).
    pub const CL: u64 = 16;

    /// CAS write latency (WRITE command to first data beat).
    pub const CWL: u64 = 12;

    /// ACTIVATE to internal read/write delay.
    pub const TRCD: u64 = 16;

    /// PRECHARGE to ACTIVATE delay.
    pub const TRP: u64 = 16;

    /// ACTIVATE to PRECHARGE minimum row-open time.
    pub const TRAS: u64 = 32;

    /// ACTIVATE to ACTIVATE delay, same bank (row cycle time).
    pub const TRC: u64 = 48;

    /// ACTIVATE to ACTIVATE delay, same bankgroup.
    pub const TRRD_L: u64 = 6;

    /// ACTIVATE to ACTIVATE delay, different bankgroup.
    pub const TRRD_S: u64 = 4;

    /// Column access to column access delay, same bankgroup.
    pub const TCCD_L: u64 = 6;

    /// Column access to column access delay, different bankgroup.
    pub const TCCD_S: u64 = 4;

    /// READ to PRECHARGE delay.
    pub const TRTP: u64 = 12;

    /// Write recovery time (last write data beat to PRECHARGE).
    pub const TWR: u64 = 18;

    /// Write-to-read turnaround, same bankgroup.
    pub const TWTR_L: u64 = 9;

    /// Write-to-read turnaround, different bankgroup.
    pub const TWTR_S: u64 = 3;

    /// Rank-to-rank bus switch time.
    pub const TRTRS: u64 = 1;

    /// Four-activate window: at most four ACTIVATEs per rank in this window.
    pub const TFAW: u64 = 26;

    /// Rank-level refresh cycle time.
    pub const TRFC: u64 = 416;

    /// Bank-level refresh cycle time.
    pub const TRFCB: u64 = 156;

    /// Average rank-level refresh interval.
    pub const TREFI: u64 = 9360;

    /// Average bank-level refresh interval.
    pub const TREFIB: u64 = 585;

    /// Self-refresh exit to first valid command.
    pub const TXS: u64 = 432;

    /// Minimum self-refresh residency.
    pub const TCKESR: u64 = 8;

    /// Output verbosity level (0-3); gates which stats files are written.
    pub const OUTPUT_LEVEL: u8 = 1;

    /// Cycles per statistics epoch.
    pub const EPOCH_PERIOD: u64 = 100_000;

    /// Directory for statistics and trace files.
    pub const OUTPUT_DIR: &str = ".";

    /// Prefix for statistics and trace file names.
    pub const OUTPUT_PREFIX: &str = "memsim";
}

/// Supported DRAM protocols.
///
/// The protocol selects which timing constraints are meaningful; protocols
/// without bankgroups collapse the long/short variants of tCCD, tRRD, and
/// tWTR into a single constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DramProtocol {
    /// DDR3: no bankgroups.
    Ddr3,
    /// DDR4: bankgrouped, the default.
    #[default]
    Ddr4,
    /// LPDDR4: no bankgroups.
    Lpddr4,
    /// GDDR5: bankgrouped.
    Gddr5,
    /// High Bandwidth Memory: bankgrouped, per-bank refresh capable.
    Hbm,
}

impl DramProtocol {
    /// Whether this protocol distinguishes same/different-bankgroup timing.
    #[inline]
    pub const fn has_bankgroups(self) -> bool {
        matches!(self, Self::Ddr4 | Self::Gddr5 | Self::Hbm)
    }
}

/// Command queue organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStructure {
    /// One FIFO per bank, the default.
    #[default]
    PerBank,
    /// One FIFO per rank.
    PerRank,
}

/// Refresh granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefreshStrategy {
    /// All-bank refresh, one rank at a time, every tREFI. The default.
    #[default]
    RankLevel,
    /// Single-bank refresh, rotating through banks, every tREFIb.
    BankLevel,
}

/// Root configuration structure containing all simulator settings.
///
/// # Examples
///
/// Creating a default configuration:
///
/// ```
/// use memsim_core::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.dram.channels, 1);
/// assert_eq!(config.queue.cmd_queue_size, 8);
/// ```
///
/// Deserializing from JSON:
///
/// ```
/// use memsim_core::config::{Config, QueueStructure};
///
/// let json = r#"{
///     "dram": { "protocol": "DDR4", "channels": 2, "ranks": 1 },
///     "queue": { "cmd_queue_size": 16, "queue_structure": "PER_RANK" },
///     "scheduler": { "row_hit_cap": 8 },
///     "timing": { "cl": 14, "trcd": 14, "trp": 14 },
///     "output": { "output_level": 0 }
/// }"#;
///
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.dram.channels, 2);
/// assert_eq!(config.queue.queue_structure, QueueStructure::PerRank);
/// assert_eq!(config.timing.cl, 14);
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Device topology and protocol.
    #[serde(default)]
    pub dram: DramConfig,
    /// Command queue sizing and structure.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Scheduler and refresh policy.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// JEDEC timing parameters, in memory-clock cycles.
    #[serde(default)]
    pub timing: TimingConfig,
    /// Statistics output configuration.
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not valid JSON for this schema.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Validates the configuration, returning the first inconsistency found.
    ///
    /// The address-mapping string itself is validated separately when the
    /// [`AddressMapper`](crate::mapping::AddressMapper) is built.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pow2 = |name: &str, v: usize| -> Result<(), ConfigError> {
            if v == 0 || !v.is_power_of_two() {
                return Err(ConfigError::InvalidTopology(format!(
                    "{name} must be a nonzero power of two, got {v}"
                )));
            }
            Ok(())
        };
        pow2("channels", self.dram.channels)?;
        pow2("ranks", self.dram.ranks)?;
        pow2("bankgroups", self.dram.bankgroups)?;
        pow2("banks_per_group", self.dram.banks_per_group)?;
        pow2("rows", self.dram.rows)?;
        pow2("columns", self.dram.columns)?;
        pow2("bl", self.dram.bl)?;
        if self.dram.bus_width == 0 || self.dram.bus_width % 8 != 0 {
            return Err(ConfigError::InvalidTopology(format!(
                "bus_width must be a nonzero multiple of 8 bits, got {}",
                self.dram.bus_width
            )));
        }
        if self.dram.device_width == 0 || self.dram.bus_width % self.dram.device_width != 0 {
            return Err(ConfigError::InvalidTopology(format!(
                "device_width {} must divide bus_width {}",
                self.dram.device_width, self.dram.bus_width
            )));
        }
        if self.queue.cmd_queue_size == 0 {
            return Err(ConfigError::InvalidQueue(
                "cmd_queue_size must be at least 1".into(),
            ));
        }
        if self.timing.trefi == 0 || self.timing.trefib == 0 {
            return Err(ConfigError::InvalidTiming(
                "refresh intervals trefi/trefib must be nonzero".into(),
            ));
        }
        if self.timing.trc < self.timing.tras {
            return Err(ConfigError::InvalidTiming(format!(
                "trc {} must be at least tras {}",
                self.timing.trc, self.timing.tras
            )));
        }
        if self.output.output_level > 3 {
            return Err(ConfigError::InvalidOutput(format!(
                "output_level must be 0-3, got {}",
                self.output.output_level
            )));
        }
        if self.output.epoch_period == 0 {
            return Err(ConfigError::InvalidOutput(
                "epoch_period must be nonzero".into(),
            ));
        }
        Ok(())
    }
}

/// Device topology and protocol configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DramConfig {
    /// DRAM protocol kind.
    #[serde(default)]
    pub protocol: DramProtocol,

    /// Number of independent channels.
    #[serde(default = "DramConfig::default_channels")]
    pub channels: usize,

    /// Ranks per channel.
    #[serde(default = "DramConfig::default_ranks")]
    pub ranks: usize,

    /// Bankgroups per rank.
    #[serde(default = "DramConfig::default_bankgroups")]
    pub bankgroups: usize,

    /// Banks per bankgroup.
    #[serde(default = "DramConfig::default_banks_per_group")]
    pub banks_per_group: usize,

    /// Rows per bank.
    #[serde(default = "DramConfig::default_rows")]
    pub rows: usize,

    /// Columns per row, in bursts.
    #[serde(default = "DramConfig::default_columns")]
    pub columns: usize,

    /// DQ pins per device.
    #[serde(default = "DramConfig::default_device_width")]
    pub device_width: usize,

    /// Data bus width in bits.
    #[serde(default = "DramConfig::default_bus_width")]
    pub bus_width: usize,

    /// Burst length in beats.
    #[serde(default = "DramConfig::default_bl")]
    pub bl: usize,
}

impl DramConfig {
    /// Total banks per rank.
    #[inline]
    pub const fn banks(&self) -> usize {
        self.bankgroups * self.banks_per_group
    }

    /// Bytes transferred by one burst on the data bus.
    #[inline]
    pub const fn request_size_bytes(&self) -> usize {
        self.bus_width / 8 * self.bl
    }

    fn default_channels() -> usize {
        defaults::CHANNELS
    }
    fn default_ranks() -> usize {
        defaults::RANKS
    }
    fn default_bankgroups() -> usize {
        defaults::BANKGROUPS
    }
    fn default_banks_per_group() -> usize {
        defaults::BANKS_PER_GROUP
    }
    fn default_rows() -> usize {
        defaults::ROWS
    }
    fn default_columns() -> usize {
        defaults::COLUMNS
    }
    fn default_device_width() -> usize {
        defaults::DEVICE_WIDTH
    }
    fn default_bus_width() -> usize {
        defaults::BUS_WIDTH
    }
    fn default_bl() -> usize {
        defaults::BL
    }
}

impl Default for DramConfig {
    fn default() -> Self {
        Self {
            protocol: DramProtocol::default(),
            channels: defaults::CHANNELS,
            ranks: defaults::RANKS,
            bankgroups: defaults::BANKGROUPS,
            banks_per_group: defaults::BANKS_PER_GROUP,
            rows: defaults::ROWS,
            columns: defaults::COLUMNS,
            device_width: defaults::DEVICE_WIDTH,
            bus_width: defaults::BUS_WIDTH,
            bl: defaults::BL,
        }
    }
}

/// Command queue configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Capacity of each command FIFO.
    #[serde(default = "QueueConfig::default_cmd_queue_size")]
    pub cmd_queue_size: usize,

    /// FIFO organization: per bank or per rank.
    #[serde(default)]
    pub queue_structure: QueueStructure,

    /// When true, refused requests are held in an unbounded staging buffer
    /// and retried as queue space frees instead of being rejected.
    /// Approximation mode for frontends that do not model backpressure.
    #[serde(default)]
    pub no_backpressure: bool,
}

impl QueueConfig {
    fn default_cmd_queue_size() -> usize {
        defaults::CMD_QUEUE_SIZE
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            cmd_queue_size: defaults::CMD_QUEUE_SIZE,
            queue_structure: QueueStructure::default(),
            no_backpressure: false,
        }
    }
}

/// Scheduler and refresh policy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Address bit order string over the tokens `ch ra bg ba ro co`, MSB first.
    #[serde(default = "SchedulerConfig::default_address_mapping")]
    pub address_mapping: String,

    /// Consecutive row hits permitted before an on-demand precharge may win
    /// arbitration against further pending hits.
    #[serde(default = "SchedulerConfig::default_row_hit_cap")]
    pub row_hit_cap: u32,

    /// Refresh granularity.
    #[serde(default)]
    pub refresh_strategy: RefreshStrategy,
}

impl SchedulerConfig {
    fn default_address_mapping() -> String {
        defaults::ADDRESS_MAPPING.to_string()
    }
    fn default_row_hit_cap() -> u32 {
        defaults::ROW_HIT_CAP
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            address_mapping: defaults::ADDRESS_MAPPING.to_string(),
            row_hit_cap: defaults::ROW_HIT_CAP,
            refresh_strategy: RefreshStrategy::default(),
        }
    }
}

/// JEDEC timing parameters, all in memory-clock cycles.
///
/// Field names follow the JEDEC datasheet parameters they model; the
/// `defaults` module documents the meaning of each.
#[derive(Debug, Clone, Deserialize)]
#[allow(missing_docs)]
pub struct TimingConfig {
    #[serde(default = "TimingConfig::default_cl")]
    pub cl: u64,
    #[serde(default = "TimingConfig::default_cwl")]
    pub cwl: u64,
    #[serde(default = "TimingConfig::default_trcd")]
    pub trcd: u64,
    #[serde(default = "TimingConfig::default_trp")]
    pub trp: u64,
    #[serde(default = "TimingConfig::default_tras")]
    pub tras: u64,
    #[serde(default = "TimingConfig::default_trc")]
    pub trc: u64,
    #[serde(default = "TimingConfig::default_trrd_l")]
    pub trrd_l: u64,
    #[serde(default = "TimingConfig::default_trrd_s")]
    pub trrd_s: u64,
    #[serde(default = "TimingConfig::default_tccd_l")]
    pub tccd_l: u64,
    #[serde(default = "TimingConfig::default_tccd_s")]
    pub tccd_s: u64,
    #[serde(default = "TimingConfig::default_trtp")]
    pub trtp: u64,
    #[serde(default = "TimingConfig::default_twr")]
    pub twr: u64,
    #[serde(default = "TimingConfig::default_twtr_l")]
    pub twtr_l: u64,
    #[serde(default = "TimingConfig::default_twtr_s")]
    pub twtr_s: u64,
    #[serde(default = "TimingConfig::default_trtrs")]
    pub trtrs: u64,
    #[serde(default = "TimingConfig::default_tfaw")]
    pub tfaw: u64,
    #[serde(default = "TimingConfig::default_trfc")]
    pub trfc: u64,
    #[serde(default = "TimingConfig::default_trfcb")]
    pub trfcb: u64,
    #[serde(default = "TimingConfig::default_trefi")]
    pub trefi: u64,
    #[serde(default = "TimingConfig::default_trefib")]
    pub trefib: u64,
    #[serde(default = "TimingConfig::default_txs")]
    pub txs: u64,
    #[serde(default = "TimingConfig::default_tckesr")]
    pub tckesr: u64,
}

impl TimingConfig {
    fn default_cl() -> u64 {
        defaults::CL
    }
    fn default_cwl() -> u64 {
        defaults::CWL
    }
    fn default_trcd() -> u64 {
        defaults::TRCD
    }
    fn default_trp() -> u64 {
        defaults::TRP
    }
    fn default_tras() -> u64 {
        defaults::TRAS
    }
    fn default_trc() -> u64 {
        defaults::TRC
    }
    fn default_trrd_l() -> u64 {
        defaults::TRRD_L
    }
    fn default_trrd_s() -> u64 {
        defaults::TRRD_S
    }
    fn default_tccd_l() -> u64 {
        defaults::TCCD_L
    }
    fn default_tccd_s() -> u64 {
        defaults::TCCD_S
    }
    fn default_trtp() -> u64 {
        defaults::TRTP
    }
    fn default_twr() -> u64 {
        defaults::TWR
    }
    fn default_twtr_l() -> u64 {
        defaults::TWTR_L
    }
    fn default_twtr_s() -> u64 {
        defaults::TWTR_S
    }
    fn default_trtrs() -> u64 {
        defaults::TRTRS
    }
    fn default_tfaw() -> u64 {
        defaults::TFAW
    }
    fn default_trfc() -> u64 {
        defaults::TRFC
    }
    fn default_trfcb() -> u64 {
        defaults::TRFCB
    }
    fn default_trefi() -> u64 {
        defaults::TREFI
    }
    fn default_trefib() -> u64 {
        defaults::TREFIB
    }
    fn default_txs() -> u64 {
        defaults::TXS
    }
    fn default_tckesr() -> u64 {
        defaults::TCKESR
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            cl: defaults::CL,
            cwl: defaults::CWL,
            trcd: defaults::TRCD,
            trp: defaults::TRP,
            tras: defaults::TRAS,
            trc: defaults::TRC,
            trrd_l: defaults::TRRD_L,
            trrd_s: defaults::TRRD_S,
            tccd_l: defaults::TCCD_L,
            tccd_s: defaults::TCCD_S,
            trtp: defaults::TRTP,
            twr: defaults::TWR,
            twtr_l: defaults::TWTR_L,
            twtr_s: defaults::TWTR_S,
            trtrs: defaults::TRTRS,
            tfaw: defaults::TFAW,
            trfc: defaults::TRFC,
            trfcb: defaults::TRFCB,
            trefi: defaults::TREFI,
            trefib: defaults::TREFIB,
            txs: defaults::TXS,
            tckesr: defaults::TCKESR,
        }
    }
}

/// Statistics output configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Output verbosity (0-3): final text+CSV at 0, plus epoch CSV at 1,
    /// plus histogram CSV at 2, plus epoch text at 3.
    #[serde(default = "OutputConfig::default_output_level")]
    pub output_level: u8,

    /// Cycles per statistics epoch.
    #[serde(default = "OutputConfig::default_epoch_period")]
    pub epoch_period: u64,

    /// Directory where statistics and trace files are created.
    #[serde(default = "OutputConfig::default_output_dir")]
    pub output_dir: String,

    /// File name prefix for statistics and trace files.
    #[serde(default = "OutputConfig::default_output_prefix")]
    pub output_prefix: String,

    /// When true, every admitted request is appended to an address trace file
    /// as `<clk> <R|W> <hex_addr>`.
    #[serde(default)]
    pub address_trace: bool,
}

impl OutputConfig {
    fn default_output_level() -> u8 {
        defaults::OUTPUT_LEVEL
    }
    fn default_epoch_period() -> u64 {
        defaults::EPOCH_PERIOD
    }
    fn default_output_dir() -> String {
        defaults::OUTPUT_DIR.to_string()
    }
    fn default_output_prefix() -> String {
        defaults::OUTPUT_PREFIX.to_string()
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_level: defaults::OUTPUT_LEVEL,
            epoch_period: defaults::EPOCH_PERIOD,
            output_dir: defaults::OUTPUT_DIR.to_string(),
            output_prefix: defaults::OUTPUT_PREFIX.to_string(),
            address_trace: false,
        }
    }
}
