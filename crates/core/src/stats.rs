//! Simulation statistics collection and reporting.
//!
//! This module tracks everything the simulator reports. It provides:
//! 1. **Counters:** Monotonic event counts with per-epoch deltas.
//! 2. **Histograms:** Fixed-bin latency distributions with epoch snapshots.
//! 3. **Aggregation:** Per-channel statistics merged for whole-system output.
//! 4. **Printers:** Aligned text tables plus CSV (final, per-epoch, and
//!    histogram) formats.

use std::io::{self, Write};

/// Number of bins used by the latency histograms.
const LATENCY_BINS: usize = 20;

/// Upper edge of the access-latency histogram, in cycles.
const ACCESS_LATENCY_MAX: u64 = 1000;

/// Upper edge of the interarrival-latency histogram, in cycles.
const INTERARRIVAL_MAX: u64 = 200;

/// A monotonic event counter with an epoch snapshot.
#[derive(Clone, Debug)]
pub struct CounterStat {
    name: &'static str,
    description: &'static str,
    count: u64,
    last_epoch_count: u64,
}

impl CounterStat {
    /// Creates a zeroed counter.
    pub const fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            count: 0,
            last_epoch_count: 0,
        }
    }

    /// Counter name used in text and CSV output.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Increments the counter by one.
    #[inline]
    pub fn inc(&mut self) {
        self.count += 1;
    }

    /// Adds `n` to the counter.
    #[inline]
    pub fn add(&mut self, n: u64) {
        self.count += n;
    }

    /// Total count since construction.
    #[inline]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Count accumulated since the last epoch rollover.
    #[inline]
    pub const fn epoch_count(&self) -> u64 {
        self.count - self.last_epoch_count
    }

    /// Rolls the epoch snapshot forward.
    pub fn update_epoch(&mut self) {
        self.last_epoch_count = self.count;
    }

    fn merge(&mut self, other: &Self) {
        self.count += other.count;
        self.last_epoch_count += other.last_epoch_count;
    }
}

/// A fixed-bin histogram with running sum and epoch snapshots.
///
/// Values below the range land in the first bin and values at or above the
/// upper edge in the last, so every sample is represented.
#[derive(Clone, Debug)]
pub struct HistogramStat {
    name: &'static str,
    description: &'static str,
    start: u64,
    bin_width: u64,
    bins: Vec<u64>,
    last_epoch_bins: Vec<u64>,
    sum: u128,
    count: u64,
    last_epoch_sum: u128,
    last_epoch_count: u64,
}

impl HistogramStat {
    /// Creates a histogram covering `[start, end)` with `num_bins` bins.
    pub fn new(name: &'static str, description: &'static str, start: u64, end: u64, num_bins: usize) -> Self {
        let bin_width = ((end - start) / num_bins as u64).max(1);
        Self {
            name,
            description,
            start,
            bin_width,
            bins: vec![0; num_bins],
            last_epoch_bins: vec![0; num_bins],
            sum: 0,
            count: 0,
            last_epoch_sum: 0,
            last_epoch_count: 0,
        }
    }

    /// Histogram name used in text and CSV output.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Records one sample.
    pub fn add_value(&mut self, value: u64) {
        let idx = if value < self.start {
            0
        } else {
            (((value - self.start) / self.bin_width) as usize).min(self.bins.len() - 1)
        };
        self.bins[idx] += 1;
        self.sum += u128::from(value);
        self.count += 1;
    }

    /// Total number of samples.
    #[inline]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Mean over all samples, or zero when empty.
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }

    /// Mean over the samples of the current epoch, or zero when empty.
    pub fn epoch_average(&self) -> f64 {
        let count = self.count - self.last_epoch_count;
        if count == 0 {
            0.0
        } else {
            (self.sum - self.last_epoch_sum) as f64 / count as f64
        }
    }

    /// Rolls the epoch snapshot forward.
    pub fn update_epoch(&mut self) {
        self.last_epoch_bins.copy_from_slice(&self.bins);
        self.last_epoch_sum = self.sum;
        self.last_epoch_count = self.count;
    }

    /// Bin labels of the form `name[lo-hi)`.
    pub fn bin_headers(&self) -> Vec<String> {
        (0..self.bins.len())
            .map(|i| {
                let lo = self.start + i as u64 * self.bin_width;
                let hi = lo + self.bin_width;
                format!("{}[{lo}-{hi})", self.name)
            })
            .collect()
    }

    /// Per-bin counts accumulated since the last epoch rollover.
    pub fn epoch_bins(&self) -> Vec<u64> {
        self.bins
            .iter()
            .zip(&self.last_epoch_bins)
            .map(|(now, then)| now - then)
            .collect()
    }

    fn merge(&mut self, other: &Self) {
        for (mine, theirs) in self.bins.iter_mut().zip(&other.bins) {
            *mine += theirs;
        }
        for (mine, theirs) in self.last_epoch_bins.iter_mut().zip(&other.last_epoch_bins) {
            *mine += theirs;
        }
        self.sum += other.sum;
        self.count += other.count;
        self.last_epoch_sum += other.last_epoch_sum;
        self.last_epoch_count += other.last_epoch_count;
    }
}

/// All statistics for one channel (or the merged whole system).
#[derive(Clone, Debug)]
pub struct Statistics {
    /// READ column accesses issued.
    pub numb_read_reqs_issued: CounterStat,
    /// WRITE column accesses issued.
    pub numb_write_reqs_issued: CounterStat,
    /// Column accesses that hit an already-open row.
    pub numb_row_hits: CounterStat,
    /// Column accesses that required their row to be opened first.
    pub numb_row_misses: CounterStat,
    /// ACTIVATE commands issued.
    pub numb_activates: CounterStat,
    /// Row-closing commands issued (PRECHARGE and autoprecharge variants).
    pub numb_precharges: CounterStat,
    /// PRECHARGEs issued on demand by queue arbitration.
    pub numb_ondemand_precharges: CounterStat,
    /// Rank-level REFRESH commands issued.
    pub numb_refreshes: CounterStat,
    /// Bank-level refresh commands issued.
    pub numb_refresh_banks: CounterStat,
    /// Requests deferred to the staging buffer in no-backpressure mode.
    pub numb_buffered_requests: CounterStat,
    /// DRAM cycles simulated.
    pub dramcycles: CounterStat,
    /// Request arrival to completion callback, in cycles.
    pub access_latency: HistogramStat,
    /// Gap between consecutive request arrivals, in cycles.
    pub interarrival_latency: HistogramStat,
    /// Mean command-queue occupancy sampled at the last epoch boundary.
    pub epoch_queue_usage: f64,
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}

impl Statistics {
    /// Creates a zeroed statistics set.
    pub fn new() -> Self {
        Self {
            numb_read_reqs_issued: CounterStat::new(
                "numb_read_reqs_issued",
                "read requests issued",
            ),
            numb_write_reqs_issued: CounterStat::new(
                "numb_write_reqs_issued",
                "write requests issued",
            ),
            numb_row_hits: CounterStat::new("numb_row_hits", "column accesses hitting an open row"),
            numb_row_misses: CounterStat::new("numb_row_misses", "column accesses needing a row open"),
            numb_activates: CounterStat::new("numb_activates", "ACTIVATE commands issued"),
            numb_precharges: CounterStat::new("numb_precharges", "row-closing commands issued"),
            numb_ondemand_precharges: CounterStat::new(
                "numb_ondemand_precharges",
                "precharges won through queue arbitration",
            ),
            numb_refreshes: CounterStat::new("numb_refreshes", "rank refreshes issued"),
            numb_refresh_banks: CounterStat::new("numb_refresh_banks", "bank refreshes issued"),
            numb_buffered_requests: CounterStat::new(
                "numb_buffered_requests",
                "requests staged in no-backpressure mode",
            ),
            dramcycles: CounterStat::new("dramcycles", "DRAM cycles simulated"),
            access_latency: HistogramStat::new(
                "access_latency",
                "request arrival to completion, cycles",
                0,
                ACCESS_LATENCY_MAX,
                LATENCY_BINS,
            ),
            interarrival_latency: HistogramStat::new(
                "interarrival_latency",
                "gap between request arrivals, cycles",
                0,
                INTERARRIVAL_MAX,
                LATENCY_BINS,
            ),
            epoch_queue_usage: 0.0,
        }
    }

    fn counters(&self) -> [&CounterStat; 11] {
        [
            &self.numb_read_reqs_issued,
            &self.numb_write_reqs_issued,
            &self.numb_row_hits,
            &self.numb_row_misses,
            &self.numb_activates,
            &self.numb_precharges,
            &self.numb_ondemand_precharges,
            &self.numb_refreshes,
            &self.numb_refresh_banks,
            &self.numb_buffered_requests,
            &self.dramcycles,
        ]
    }

    fn counters_mut(&mut self) -> [&mut CounterStat; 11] {
        [
            &mut self.numb_read_reqs_issued,
            &mut self.numb_write_reqs_issued,
            &mut self.numb_row_hits,
            &mut self.numb_row_misses,
            &mut self.numb_activates,
            &mut self.numb_precharges,
            &mut self.numb_ondemand_precharges,
            &mut self.numb_refreshes,
            &mut self.numb_refresh_banks,
            &mut self.numb_buffered_requests,
            &mut self.dramcycles,
        ]
    }

    /// Rolls every counter and histogram into the next epoch.
    pub fn update_epoch(&mut self) {
        for counter in self.counters_mut() {
            counter.update_epoch();
        }
        self.access_latency.update_epoch();
        self.interarrival_latency.update_epoch();
    }

    /// Adds another statistics set into this one (multi-channel aggregation).
    pub fn merge(&mut self, other: &Self) {
        let theirs = other.counters();
        for (i, counter) in self.counters_mut().into_iter().enumerate() {
            counter.merge(theirs[i]);
        }
        self.access_latency.merge(&other.access_latency);
        self.interarrival_latency.merge(&other.interarrival_latency);
        self.epoch_queue_usage += other.epoch_queue_usage;
    }

    /// Writes the final statistics as an aligned text table.
    ///
    /// # Errors
    ///
    /// Propagates write failures on `out`.
    pub fn print_stats<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for counter in self.counters() {
            writeln!(
                out,
                "{:<26} {:>14}   # {}",
                counter.name(),
                counter.count(),
                counter.description
            )?;
        }
        writeln!(
            out,
            "{:<26} {:>14.2}   # {}",
            "avg_access_latency",
            self.access_latency.average(),
            self.access_latency.description
        )?;
        writeln!(
            out,
            "{:<26} {:>14.2}   # {}",
            "avg_interarrival",
            self.interarrival_latency.average(),
            self.interarrival_latency.description
        )?;
        Ok(())
    }

    /// Writes the current epoch's deltas as an aligned text table.
    ///
    /// # Errors
    ///
    /// Propagates write failures on `out`.
    pub fn print_epoch_stats<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for counter in self.counters() {
            writeln!(
                out,
                "{:<26} {:>14}   # {}",
                counter.name(),
                counter.epoch_count(),
                counter.description
            )?;
        }
        writeln!(
            out,
            "{:<26} {:>14.2}   # {}",
            "avg_access_latency",
            self.access_latency.epoch_average(),
            self.access_latency.description
        )?;
        writeln!(
            out,
            "{:<26} {:>14.2}   # {}",
            "epoch_queue_usage", self.epoch_queue_usage, "mean command-queue occupancy"
        )?;
        Ok(())
    }

    /// Writes the CSV header shared by the final and epoch CSV rows.
    ///
    /// # Errors
    ///
    /// Propagates write failures on `out`.
    pub fn print_csv_header<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "cycle")?;
        for counter in self.counters() {
            write!(out, ",{}", counter.name())?;
        }
        writeln!(out, ",avg_access_latency,avg_interarrival,queue_usage")
    }

    /// Writes one CSV row of cumulative values.
    ///
    /// # Errors
    ///
    /// Propagates write failures on `out`.
    pub fn print_csv_row<W: Write>(&self, out: &mut W, cycle: u64) -> io::Result<()> {
        write!(out, "{cycle}")?;
        for counter in self.counters() {
            write!(out, ",{}", counter.count())?;
        }
        writeln!(
            out,
            ",{:.2},{:.2},{:.2}",
            self.access_latency.average(),
            self.interarrival_latency.average(),
            self.epoch_queue_usage
        )
    }

    /// Writes one CSV row of epoch deltas.
    ///
    /// # Errors
    ///
    /// Propagates write failures on `out`.
    pub fn print_epoch_csv_row<W: Write>(&self, out: &mut W, cycle: u64) -> io::Result<()> {
        write!(out, "{cycle}")?;
        for counter in self.counters() {
            write!(out, ",{}", counter.epoch_count())?;
        }
        writeln!(
            out,
            ",{:.2},{:.2},{:.2}",
            self.access_latency.epoch_average(),
            self.interarrival_latency.epoch_average(),
            self.epoch_queue_usage
        )
    }

    /// Writes the histogram CSV header.
    ///
    /// # Errors
    ///
    /// Propagates write failures on `out`.
    pub fn print_histo_csv_header<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let mut headers = vec!["cycle".to_string()];
        headers.extend(self.access_latency.bin_headers());
        headers.extend(self.interarrival_latency.bin_headers());
        writeln!(out, "{}", headers.join(","))
    }

    /// Writes one histogram CSV row of epoch bin deltas.
    ///
    /// # Errors
    ///
    /// Propagates write failures on `out`.
    pub fn print_histo_csv_row<W: Write>(&self, out: &mut W, cycle: u64) -> io::Result<()> {
        let mut cells = vec![cycle.to_string()];
        cells.extend(self.access_latency.epoch_bins().iter().map(u64::to_string));
        cells.extend(
            self.interarrival_latency
                .epoch_bins()
                .iter()
                .map(u64::to_string),
        );
        writeln!(out, "{}", cells.join(","))
    }
}
