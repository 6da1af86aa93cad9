//! # Property-Based Invariant Tests
//!
//! Drives the controller with random request streams and checks the
//! system-level guarantees: every admitted request completes exactly once,
//! activates balance precharges, queue structure changes only ordering and
//! latency, and scaling the timing parameters scales the schedule.

use memsim_core::common::{Address, Request};
use memsim_core::config::{Config, QueueStructure};
use memsim_core::ctrl::Controller;
use proptest::prelude::*;

use crate::common::test_config;

/// One request: (tick gap, rank, bankgroup, bank, row, column, is_write).
type Op = (u64, usize, usize, usize, usize, usize, bool);

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        (
            0u64..3,
            0usize..2,
            0usize..2,
            0usize..2,
            0usize..8,
            0usize..8,
            any::<bool>(),
        ),
        1..12,
    )
}

/// Runs every op to completion (retrying refused admissions) and returns the
/// completed (address, direction) list plus the finishing cycle.
fn run_ops(config: &Config, ops: &[Op]) -> (Vec<(u64, bool)>, u64) {
    let mut ctrl = Controller::new(0, config);
    let mut completed = Vec::new();
    let drain = |ctrl: &mut Controller, out: &mut Vec<(u64, bool)>| {
        out.extend(ctrl.drain_finished().map(|c| (c.hex_addr, c.is_write)));
    };

    for (i, &(gap, rank, bankgroup, bank, row, column, is_write)) in ops.iter().enumerate() {
        for _ in 0..gap {
            ctrl.clock_tick();
            drain(&mut ctrl, &mut completed);
        }
        let id = (i + 1) as u64;
        let addr = Address::new(0, rank, bankgroup, bank, row, column);
        let mut req = Request::new(id << 8, addr, is_write, ctrl.clk(), id);
        loop {
            match ctrl.insert_req(req) {
                Ok(()) => break,
                Err(back) => {
                    req = back;
                    ctrl.clock_tick();
                    drain(&mut ctrl, &mut completed);
                }
            }
        }
    }

    let mut budget = 20_000u64;
    while completed.len() < ops.len() {
        assert!(budget > 0, "stream did not drain");
        budget -= 1;
        ctrl.clock_tick();
        drain(&mut ctrl, &mut completed);
    }

    // Activates balance precharges plus whatever rows are still open.
    let state = ctrl.channel_state();
    let mut open_banks = 0u64;
    for rank in 0..2 {
        for bankgroup in 0..2 {
            for bank in 0..2 {
                if state.open_row(rank, bankgroup, bank).is_some() {
                    open_banks += 1;
                }
            }
        }
    }
    assert_eq!(
        ctrl.stats().numb_activates.count(),
        ctrl.stats().numb_precharges.count() + open_banks
    );

    (completed, ctrl.clk())
}

/// Refresh pressure makes the random streams exercise the refresh path too.
fn property_config() -> Config {
    let mut config = test_config();
    config.timing.trefi = 200;
    config
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn every_admitted_request_completes_exactly_once(ops in ops_strategy()) {
        let (completed, _) = run_ops(&property_config(), &ops);

        let mut expected: Vec<(u64, bool)> = ops
            .iter()
            .enumerate()
            .map(|(i, op)| (((i + 1) as u64) << 8, op.6))
            .collect();
        let mut completed = completed;
        completed.sort_unstable();
        expected.sort_unstable();
        prop_assert_eq!(completed, expected);
    }

    #[test]
    fn queue_structure_only_reorders(ops in ops_strategy()) {
        let per_bank = property_config();
        let mut per_rank = property_config();
        per_rank.queue.queue_structure = QueueStructure::PerRank;

        let (mut a, _) = run_ops(&per_bank, &ops);
        let (mut b, _) = run_ops(&per_rank, &ops);
        a.sort_unstable();
        b.sort_unstable();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn doubling_timing_slows_the_schedule_proportionally(ops in ops_strategy()) {
        let base = property_config();
        let mut doubled = property_config();
        let t = &mut doubled.timing;
        for field in [
            &mut t.cl, &mut t.cwl, &mut t.trcd, &mut t.trp, &mut t.tras, &mut t.trc,
            &mut t.trrd_l, &mut t.trrd_s, &mut t.tccd_l, &mut t.tccd_s, &mut t.trtp,
            &mut t.twr, &mut t.twtr_l, &mut t.twtr_s, &mut t.trtrs, &mut t.tfaw,
            &mut t.trfc, &mut t.trfcb, &mut t.trefi, &mut t.trefib, &mut t.txs,
            &mut t.tckesr,
        ] {
            *field *= 2;
        }

        let (_, base_cycles) = run_ops(&base, &ops);
        let (_, doubled_cycles) = run_ops(&doubled, &ops);
        prop_assert!(doubled_cycles >= base_cycles);
        prop_assert!(doubled_cycles <= 2 * base_cycles + 128);
    }
}
