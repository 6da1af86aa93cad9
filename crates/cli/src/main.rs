//! DRAM memory-system simulator CLI.
//!
//! This binary provides a single entry point for standalone simulation runs. It performs:
//! 1. **Synthetic runs:** Drive the memory system with a random or streaming workload.
//! 2. **Trace replay:** Feed a `<clk> <R|W> <hex_addr>` address trace through the system.
//! 3. **Reporting:** Print final statistics and write the configured output files.

use clap::{Parser, Subcommand, ValueEnum};
use std::process;

use memsim_core::config::Config;
use memsim_core::sim::workload::{RandomWorkload, StreamWorkload, TraceWorkload, Workload};
use memsim_core::system::MemorySystem;

#[derive(Parser, Debug)]
#[command(
    name = "memsim",
    author,
    version,
    about = "Cycle-accurate DRAM memory-system simulator",
    long_about = "Run a synthetic workload or replay an address trace against a configured memory system.\n\nConfiguration is JSON (see Config); omit --config for the built-in DDR4 defaults.\n\nExamples:\n  memsim run --cycles 1000000\n  memsim run --workload stream --config ddr4_2ch.json\n  memsim trace --file app_addr.trace --cycles 2000000"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Synthetic workload kinds for `memsim run`.
#[derive(ValueEnum, Clone, Copy, Debug)]
enum WorkloadKind {
    /// Uniformly random addresses, one in three a write.
    Random,
    /// Streaming read-read-write triad.
    Stream,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a synthetic workload for a fixed number of cycles.
    Run {
        /// JSON configuration file (defaults to built-in DDR4 config).
        #[arg(short, long)]
        config: Option<String>,

        /// Number of cycles to simulate.
        #[arg(long, default_value_t = 100_000)]
        cycles: u64,

        /// Workload kind.
        #[arg(long, value_enum, default_value = "random")]
        workload: WorkloadKind,

        /// Seed for the random workload.
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },

    /// Replay an address trace file.
    Trace {
        /// JSON configuration file (defaults to built-in DDR4 config).
        #[arg(short, long)]
        config: Option<String>,

        /// Trace file, one `<clk> <R|W> <hex_addr>` record per line.
        #[arg(short, long)]
        file: String,

        /// Stop after this many cycles even if the trace has more records.
        #[arg(long)]
        cycles: Option<u64>,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            cycles,
            workload,
            seed,
        } => {
            let config = load_config(config.as_deref());
            let workload: Box<dyn Workload> = match workload {
                // Random addresses over the low 32 bits keep the stream
                // inside a plausibly sized physical range.
                WorkloadKind::Random => Box::new(RandomWorkload::new(seed, 32)),
                WorkloadKind::Stream => Box::new(StreamWorkload::new(1 << 20, 64)),
            };
            run(config, workload, Some(cycles));
        }
        Commands::Trace {
            config,
            file,
            cycles,
        } => {
            let config = load_config(config.as_deref());
            let workload = TraceWorkload::from_file(&file).unwrap_or_else(|e| {
                eprintln!("Error reading trace {file}: {e}");
                process::exit(1);
            });
            run(config, Box::new(workload), cycles);
        }
    }
}

/// Loads a JSON config, or the defaults when no path is given.
///
/// Exits with code 1 on read, parse, or validation failure.
fn load_config(path: Option<&str>) -> Config {
    let config = match path {
        Some(path) => Config::from_file(path).unwrap_or_else(|e| {
            eprintln!("Error loading config {path}: {e}");
            process::exit(1);
        }),
        None => Config::default(),
    };
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        process::exit(1);
    }
    config
}

/// Drives the workload until the cycle budget (or the trace) runs out, then
/// prints final statistics.
fn run(config: Config, mut workload: Box<dyn Workload>, cycles: Option<u64>) {
    let mut memory = MemorySystem::new(config).unwrap_or_else(|e| {
        eprintln!("Error building memory system: {e}");
        process::exit(1);
    });

    let reads_done = std::rc::Rc::new(std::cell::Cell::new(0u64));
    let writes_done = std::rc::Rc::new(std::cell::Cell::new(0u64));
    let r = reads_done.clone();
    let w = writes_done.clone();
    memory.register_callbacks(
        move |_addr| r.set(r.get() + 1),
        move |_addr| w.set(w.get() + 1),
    );

    let budget = cycles.unwrap_or(u64::MAX);
    // Trace replay drains in-flight requests for a short grace window after
    // the last record before stopping.
    let mut drain = 2048u64;
    while memory.clk() < budget {
        workload.clock_tick(&mut memory);
        memory.clock_tick();
        if workload.exhausted() {
            drain -= 1;
            if drain == 0 {
                break;
            }
        }
    }

    println!(
        "[*] Simulated {} cycles: {} reads and {} writes completed",
        memory.clk(),
        reads_done.get(),
        writes_done.get()
    );
    memory.print_stats();
}
