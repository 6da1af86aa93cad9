//! # Memory System Facade Tests
//!
//! Verifies the consumer-facing contract: admission and backpressure,
//! exactly-one-callback delivery, channel routing, the address trace file,
//! and epoch/final statistics files.

use std::fs;

use memsim_core::common::Address;
use memsim_core::system::MemorySystem;
use pretty_assertions::assert_eq;

use crate::common::{TestSystem, test_config};

#[test]
fn single_read_round_trip() {
    let mut sys = TestSystem::new(test_config());
    assert!(sys.memory.will_accept(0x40, false));
    assert!(sys.memory.insert_req(0x40, false));
    sys.run_until_complete(1, 64);
    assert_eq!(*sys.log.reads.borrow(), vec![0x40]);
    assert!(sys.log.writes.borrow().is_empty());
}

#[test]
fn every_request_gets_exactly_one_callback() {
    let mut sys = TestSystem::new(test_config());
    let mut inserted = Vec::new();
    let mapper = sys.memory.mapper().clone();
    // Spread across banks and rows, reads and writes.
    for i in 0u64..24 {
        let addr = mapper.encode(Address::new(
            0,
            (i % 2) as usize,
            (i / 2 % 2) as usize,
            (i / 4 % 2) as usize,
            (i % 8) as usize,
            (i % 16) as usize,
        ));
        let is_write = i % 3 == 0;
        if sys.memory.insert_req(addr, is_write) {
            inserted.push((addr, is_write));
        }
        sys.tick(1);
    }
    sys.run_until_complete(inserted.len(), 4096);
    sys.tick(16);

    let mut completed: Vec<(u64, bool)> = sys
        .log
        .reads
        .borrow()
        .iter()
        .map(|&a| (a, false))
        .chain(sys.log.writes.borrow().iter().map(|&a| (a, true)))
        .collect();
    let mut expected = inserted;
    completed.sort_unstable();
    expected.sort_unstable();
    assert_eq!(completed, expected);
}

#[test]
fn strict_mode_refuses_when_full_and_recovers() {
    let mut sys = TestSystem::new(test_config());
    let mapper = sys.memory.mapper().clone();
    // Same bank, conflicting rows: drain is slow, so the FIFO fills.
    let addr_for = |i: usize| mapper.encode(Address::new(0, 0, 0, 0, i % 4, 0));
    let mut accepted = 0;
    for i in 0..9 {
        if sys.memory.insert_req(addr_for(i), false) {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 8);
    assert!(!sys.memory.will_accept(addr_for(8), false));

    // Space frees as requests complete; admission resumes.
    sys.run_until_complete(1, 256);
    assert!(sys.memory.will_accept(addr_for(8), false));
    assert!(sys.memory.insert_req(addr_for(8), false));
    sys.run_until_complete(9, 2048);
}

#[test]
fn no_backpressure_mode_stages_overflow() {
    let mut config = test_config();
    config.queue.no_backpressure = true;
    let mut sys = TestSystem::new(config);
    let mapper = sys.memory.mapper().clone();
    let addr_for = |i: usize| mapper.encode(Address::new(0, 0, 0, 0, i % 4, 0));

    for i in 0..12 {
        assert!(sys.memory.will_accept(addr_for(i), false));
        assert!(sys.memory.insert_req(addr_for(i), false));
    }
    // Four requests did not fit the FIFO and were staged.
    assert_eq!(
        sys.memory
            .controller(0)
            .stats()
            .numb_buffered_requests
            .count(),
        4
    );
    // They are fed back in and all twelve still complete exactly once.
    sys.run_until_complete(12, 4096);
    assert_eq!(sys.log.total(), 12);
}

#[test]
fn requests_route_to_their_channel() {
    let mut config = test_config();
    config.dram.channels = 2;
    let mut sys = TestSystem::new(config);
    let mapper = sys.memory.mapper().clone();

    let ch0 = mapper.encode(Address::new(0, 0, 0, 0, 3, 0));
    let ch1 = mapper.encode(Address::new(1, 0, 0, 0, 3, 0));
    assert!(sys.memory.insert_req(ch0, false));
    assert!(sys.memory.insert_req(ch1, true));
    sys.run_until_complete(2, 128);

    assert_eq!(
        sys.memory.controller(0).stats().numb_read_reqs_issued.count(),
        1
    );
    assert_eq!(
        sys.memory
            .controller(1)
            .stats()
            .numb_write_reqs_issued
            .count(),
        1
    );
}

#[test]
fn address_trace_records_insertions() {
    let mut config = test_config();
    config.output.address_trace = true;
    config.output.output_prefix = "tracecheck".to_string();
    let mut sys = TestSystem::new(config);

    assert!(sys.memory.insert_req(0x40, false));
    sys.tick(3);
    assert!(sys.memory.insert_req(0x80, true));
    sys.run_until_complete(2, 128);

    let dir = sys.shutdown(); // flush
    let trace = fs::read_to_string(dir.path().join("tracecheck_addr.trace")).unwrap();
    let lines: Vec<&str> = trace.lines().collect();
    assert_eq!(lines, vec!["0 R 0x40", "3 W 0x80"]);
}

#[test]
fn epoch_files_stream_rows() {
    let mut config = test_config();
    config.output.output_level = 2;
    config.output.epoch_period = 50;
    config.output.output_prefix = "epochcheck".to_string();
    let mut sys = TestSystem::new(config);

    assert!(sys.memory.insert_req(0x40, false));
    sys.tick(120); // two epoch boundaries (50, 100)
    let dir = sys.shutdown();
    let dir = dir.path();

    let epoch = fs::read_to_string(dir.join("epochcheck_epoch.csv")).unwrap();
    let lines: Vec<&str> = epoch.lines().collect();
    assert_eq!(lines.len(), 3); // header + two rows
    assert!(lines[0].starts_with("cycle,numb_read_reqs_issued"));
    assert!(lines[1].starts_with("50,1,"));
    assert!(lines[2].starts_with("100,0,"));

    let histo = fs::read_to_string(dir.join("epochcheck_histo.csv")).unwrap();
    assert_eq!(histo.lines().count(), 3);
}

#[test]
fn final_stats_files_are_written() {
    let mut sys = TestSystem::new(test_config());
    assert!(sys.memory.insert_req(0x40, false));
    sys.run_until_complete(1, 64);
    sys.memory.print_stats();

    let dir = sys.shutdown();
    let dir = dir.path();
    let txt = fs::read_to_string(dir.join("memsim_stats.txt")).unwrap();
    assert!(txt.contains("numb_read_reqs_issued"));
    let csv = fs::read_to_string(dir.join("memsim_stats.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("cycle,"));
}

#[test]
fn system_id_suffixes_output_files() {
    let mut config = test_config();
    let dir = tempfile::TempDir::new().unwrap();
    config.output.output_dir = dir.path().to_string_lossy().into_owned();
    let sys = MemorySystem::with_system_id(config, 2).unwrap();
    drop(sys);
    assert!(dir.path().join("memsim_2_stats.txt").exists());
}

#[test]
fn invalid_configs_fail_construction() {
    let mut config = test_config();
    config.dram.ranks = 3;
    assert!(MemorySystem::new(config).is_err());

    let mut config = test_config();
    config.scheduler.address_mapping = "nonsense-map".to_string();
    assert!(MemorySystem::new(config).is_err());

    let mut config = test_config();
    config.queue.cmd_queue_size = 0;
    assert!(MemorySystem::new(config).is_err());
}
