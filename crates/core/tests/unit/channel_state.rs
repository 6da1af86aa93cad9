//! # Channel State Tests
//!
//! Verifies the scheduler-facing queries (`required_command`, `is_ready`)
//! and the controller-facing updates (bank FSM transitions, timing
//! propagation, tFAW windows, refresh-waiting gating).

use memsim_core::channel::{BankStatus, ChannelState, Timing};
use memsim_core::common::{Address, Command, CommandType};

use crate::common::test_config;

fn channel() -> ChannelState {
    let config = test_config();
    ChannelState::new(&config, Timing::new(&config))
}

fn read_cmd(rank: usize, bankgroup: usize, bank: usize, row: usize) -> Command {
    Command::new(
        CommandType::Read,
        Address::new(0, rank, bankgroup, bank, row, 0),
        1,
    )
}

#[test]
fn closed_bank_requires_activate() {
    let state = channel();
    let cmd = read_cmd(0, 0, 0, 5);
    let required = state.required_command(&cmd).unwrap();
    assert_eq!(required.cmd_type, CommandType::Activate);
    assert_eq!(required.row(), 5);
    assert_eq!(required.id, cmd.id);
}

#[test]
fn open_matching_row_passes_through() {
    let mut state = channel();
    let cmd = read_cmd(0, 0, 0, 5);
    state.update_state(&cmd.with_type(CommandType::Activate), 0);
    assert_eq!(state.required_command(&cmd), Some(cmd));
}

#[test]
fn open_conflicting_row_requires_precharge() {
    let mut state = channel();
    state.update_state(&read_cmd(0, 0, 0, 9).with_type(CommandType::Activate), 0);
    let required = state.required_command(&read_cmd(0, 0, 0, 5)).unwrap();
    assert_eq!(required.cmd_type, CommandType::Precharge);
}

#[test]
fn refresh_requires_precharge_while_any_bank_open() {
    let mut state = channel();
    state.update_state(&read_cmd(0, 1, 1, 7).with_type(CommandType::Activate), 0);

    let refresh = Command::new(CommandType::Refresh, Address::new(0, 0, 0, 0, 0, 0), 0);
    let required = state.required_command(&refresh).unwrap();
    assert_eq!(required.cmd_type, CommandType::Precharge);
    assert_eq!(required.bankgroup(), 1);
    assert_eq!(required.bank(), 1);

    // Other-rank banks do not matter for a rank 1 refresh.
    let refresh_r1 = Command::new(CommandType::Refresh, Address::new(0, 1, 0, 0, 0, 0), 0);
    assert_eq!(state.required_command(&refresh_r1), Some(refresh_r1));
}

#[test]
fn refreshing_bank_must_wait() {
    let mut state = channel();
    let refresh = Command::new(CommandType::Refresh, Address::new(0, 0, 0, 0, 0, 0), 0);
    state.update_state(&refresh, 100);
    assert_eq!(state.bank(0, 0, 0).status(), BankStatus::Refreshing);
    // A read toward a refreshing bank can only progress by waiting.
    assert_eq!(state.required_command(&read_cmd(0, 0, 0, 5)), None);

    // The bank closes when the tRFC window elapses (tRFC = 20 in the test
    // config).
    state.expire_refreshes(119);
    assert_eq!(state.bank(0, 0, 0).status(), BankStatus::Refreshing);
    state.expire_refreshes(120);
    assert_eq!(state.bank(0, 0, 0).status(), BankStatus::Closed);
}

#[test]
fn is_ready_gates_on_timing_and_row_match() {
    let mut state = channel();
    let act = read_cmd(0, 0, 0, 5).with_type(CommandType::Activate);
    assert!(state.is_ready(&act, 0));
    state.update_state(&act, 0);
    state.update_timing(&act, 0);

    let read = read_cmd(0, 0, 0, 5);
    // tRCD = 3 in the test config.
    assert!(!state.is_ready(&read, 2));
    assert!(state.is_ready(&read, 3));

    // Same bank, wrong row: never ready regardless of timing.
    assert!(!state.is_ready(&read_cmd(0, 0, 0, 6), 100));

    // A second ACTIVATE to the open bank is inadmissible.
    assert!(!state.is_ready(&act, 100));
}

#[test]
fn self_refresh_round_trip() {
    let mut state = channel();
    let sref = Command::new(
        CommandType::SelfRefreshEnter,
        Address::new(0, 0, 0, 0, 0, 0),
        0,
    );
    assert!(state.is_ready(&sref, 0));
    state.update_state(&sref, 0);
    state.update_timing(&sref, 0);
    assert_eq!(state.bank(0, 0, 1).status(), BankStatus::SelfRefresh);
    assert!(state.rank_in_self_refresh(0));
    assert!(!state.rank_in_self_refresh(1));

    // A read against the sleeping rank first needs the exit command.
    let required = state.required_command(&read_cmd(0, 0, 0, 5)).unwrap();
    assert_eq!(required.cmd_type, CommandType::SelfRefreshExit);

    // Minimum residency (tCKESR = 5) gates the exit.
    let exit = sref.with_type(CommandType::SelfRefreshExit);
    assert!(!state.is_ready(&exit, 4));
    assert!(state.is_ready(&exit, 5));
    state.update_state(&exit, 5);
    state.update_timing(&exit, 5);
    assert_eq!(state.bank(0, 0, 0).status(), BankStatus::Closed);

    // tXS = 24 holds off the next ACTIVATE.
    let act = read_cmd(0, 0, 0, 5).with_type(CommandType::Activate);
    assert!(!state.is_ready(&act, 28));
    assert!(state.is_ready(&act, 29));
}

#[test]
fn four_activates_fill_the_window() {
    let mut state = channel();
    // tFAW = 20, tRRD = 2: four activates to distinct banks at 0/2/4/6.
    let banks = [(0, 0), (0, 1), (1, 0), (1, 1)];
    for (i, (g, b)) in banks.into_iter().enumerate() {
        let act = read_cmd(0, g, b, 1).with_type(CommandType::Activate);
        let clk = (i * 2) as u64;
        assert!(state.is_ready(&act, clk), "activate {i} not ready");
        state.update_state(&act, clk);
        state.update_timing(&act, clk);
    }

    // A fifth activate must wait for the first to leave the window at 0 +
    // tFAW = 20, even though its bank-level timing is long satisfied.
    for (g, b) in banks {
        let pre = read_cmd(0, g, b, 1).with_type(CommandType::Precharge);
        state.update_state(&pre, 8);
        state.update_timing(&pre, 8);
    }
    let fifth = read_cmd(0, 0, 0, 2).with_type(CommandType::Activate);
    assert!(!state.is_ready(&fifth, 19));
    assert!(state.is_ready(&fifth, 20));

    // The other rank has its own window.
    let other_rank = read_cmd(1, 0, 0, 2).with_type(CommandType::Activate);
    assert!(state.is_ready(&other_rank, 19));
}

#[test]
fn refresh_waiting_blocks_new_activates() {
    let mut state = channel();
    state.set_refresh_waiting(0, true);
    let act = read_cmd(0, 0, 0, 5).with_type(CommandType::Activate);
    assert!(!state.is_ready(&act, 0));
    // Other ranks are unaffected.
    let act_r1 = read_cmd(1, 0, 0, 5).with_type(CommandType::Activate);
    assert!(state.is_ready(&act_r1, 0));
    state.set_refresh_waiting(0, false);
    assert!(state.is_ready(&act, 0));
}

#[test]
fn timing_propagates_across_scopes() {
    let config = test_config();
    let mut state = ChannelState::new(&config, Timing::new(&config));
    let read = read_cmd(0, 0, 0, 5);
    state.update_state(&read.with_type(CommandType::Activate), 0);
    state.update_timing(&read.with_type(CommandType::Activate), 0);
    state.update_state(&read, 10);
    state.update_timing(&read, 10);

    let burst = (config.dram.bl / 2) as u64;
    // Same bank: next read after max(burst, tCCD_L).
    assert_eq!(
        state.bank(0, 0, 0).earliest_cycle(CommandType::Read),
        10 + burst.max(config.timing.tccd_l)
    );
    // Other rank: burst plus the rank switch.
    assert_eq!(
        state.bank(1, 0, 0).earliest_cycle(CommandType::Read),
        10 + burst + config.timing.trtrs
    );
}
