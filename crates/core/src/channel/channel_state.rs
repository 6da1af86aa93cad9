//! Aggregate bank state for one channel.
//!
//! `ChannelState` owns the flat `ranks × bankgroups × banks_per_group` array
//! of [`BankState`]s and the per-rank bookkeeping that spans banks: the
//! four-activate windows (tFAW), the refresh-waiting flags that keep new row
//! activations from starving a due refresh, and the self-refresh markers.
//!
//! The scheduler uses the read-only queries (`open_row`, `row_hit_count`,
//! `required_command`, `is_ready`); only the controller calls the mutating
//! updates (`update_state`, `update_timing`, `expire_refreshes`).

use std::collections::VecDeque;

use crate::common::{Address, Command, CommandType};
use crate::config::Config;

use super::bank_state::{BankState, BankStatus};
use super::timing::Timing;

/// Maximum ACTIVATEs per rank inside one tFAW window.
const ACTIVATES_PER_WINDOW: usize = 4;

/// All bank state for a single channel.
#[derive(Debug)]
pub struct ChannelState {
    ranks: usize,
    bankgroups: usize,
    banks_per_group: usize,
    banks_per_rank: usize,
    timing: Timing,
    banks: Vec<BankState>,
    /// Recent ACTIVATE cycles per rank, pruned to the tFAW window.
    activation_times: Vec<VecDeque<u64>>,
    /// Per-rank flag: a refresh is waiting, hold back new ACTIVATEs.
    refresh_waiting: Vec<bool>,
    /// Per-rank flag: the rank is in self-refresh.
    rank_in_self_refresh: Vec<bool>,
}

impl ChannelState {
    /// Creates the channel state for the configured topology.
    pub fn new(config: &Config, timing: Timing) -> Self {
        let ranks = config.dram.ranks;
        let banks_per_rank = config.dram.banks();
        Self {
            ranks,
            bankgroups: config.dram.bankgroups,
            banks_per_group: config.dram.banks_per_group,
            banks_per_rank,
            timing,
            banks: vec![BankState::new(); ranks * banks_per_rank],
            activation_times: vec![VecDeque::with_capacity(ACTIVATES_PER_WINDOW); ranks],
            refresh_waiting: vec![false; ranks],
            rank_in_self_refresh: vec![false; ranks],
        }
    }

    #[inline]
    fn index(&self, rank: usize, bankgroup: usize, bank: usize) -> usize {
        rank * self.banks_per_rank + bankgroup * self.banks_per_group + bank
    }

    /// Read-only view of one bank's state.
    #[inline]
    pub fn bank(&self, rank: usize, bankgroup: usize, bank: usize) -> &BankState {
        &self.banks[self.index(rank, bankgroup, bank)]
    }

    /// The open row of a bank, if any.
    #[inline]
    pub fn open_row(&self, rank: usize, bankgroup: usize, bank: usize) -> Option<usize> {
        self.bank(rank, bankgroup, bank).open_row()
    }

    /// Consecutive row hits since the bank's last ACTIVATE.
    #[inline]
    pub fn row_hit_count(&self, rank: usize, bankgroup: usize, bank: usize) -> u32 {
        self.bank(rank, bankgroup, bank).row_hit_count()
    }

    /// The timing table this channel was built with.
    #[inline]
    pub const fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Number of ranks in this channel.
    #[inline]
    pub const fn ranks(&self) -> usize {
        self.ranks
    }

    /// Whether a refresh is waiting on `rank`.
    #[inline]
    pub fn refresh_waiting(&self, rank: usize) -> bool {
        self.refresh_waiting[rank]
    }

    /// Whether `rank` is currently in self-refresh.
    #[inline]
    pub fn rank_in_self_refresh(&self, rank: usize) -> bool {
        self.rank_in_self_refresh[rank]
    }

    /// Marks or clears the refresh-waiting flag for `rank`.
    pub fn set_refresh_waiting(&mut self, rank: usize, waiting: bool) {
        self.refresh_waiting[rank] = waiting;
    }

    fn banks_of_rank(&self, rank: usize) -> impl Iterator<Item = &BankState> {
        let start = rank * self.banks_per_rank;
        self.banks[start..start + self.banks_per_rank].iter()
    }

    /// Returns the command that must be issued next to make progress toward
    /// `cmd`, or `None` if the target can only progress by waiting.
    ///
    /// For a column access this is the access itself when its row is open,
    /// the ACTIVATE that opens it when the bank is closed, or the PRECHARGE
    /// that evicts a conflicting row. Refresh-class commands first close any
    /// open bank in scope; a bank mid-refresh yields `None`.
    pub fn required_command(&self, cmd: &Command) -> Option<Command> {
        match cmd.cmd_type {
            CommandType::Read
            | CommandType::ReadPrecharge
            | CommandType::Write
            | CommandType::WritePrecharge => {
                let bank = self.bank(cmd.rank(), cmd.bankgroup(), cmd.bank());
                match bank.status() {
                    BankStatus::Closed => Some(cmd.with_type(CommandType::Activate)),
                    BankStatus::Open => {
                        if bank.open_row() == Some(cmd.row()) {
                            Some(*cmd)
                        } else {
                            Some(cmd.with_type(CommandType::Precharge))
                        }
                    }
                    BankStatus::Refreshing => None,
                    BankStatus::SelfRefresh => Some(cmd.with_type(CommandType::SelfRefreshExit)),
                }
            }
            CommandType::Refresh | CommandType::SelfRefreshEnter => {
                // Close the first open bank in the rank before the rank-level
                // command can go out.
                for g in 0..self.bankgroups {
                    for b in 0..self.banks_per_group {
                        let bank = self.bank(cmd.rank(), g, b);
                        match bank.status() {
                            BankStatus::Open => {
                                let row = bank.open_row().unwrap_or_default();
                                let addr =
                                    Address::new(cmd.addr.channel, cmd.rank(), g, b, row, 0);
                                return Some(Command::new(CommandType::Precharge, addr, cmd.id));
                            }
                            BankStatus::SelfRefresh if cmd.cmd_type == CommandType::Refresh => {
                                return Some(cmd.with_type(CommandType::SelfRefreshExit));
                            }
                            _ => {}
                        }
                    }
                }
                if self
                    .banks_of_rank(cmd.rank())
                    .any(|bank| bank.status() == BankStatus::Refreshing)
                {
                    return None;
                }
                Some(*cmd)
            }
            CommandType::RefreshBank => {
                let bank = self.bank(cmd.rank(), cmd.bankgroup(), cmd.bank());
                match bank.status() {
                    BankStatus::Open => Some(cmd.with_type(CommandType::Precharge)),
                    BankStatus::Refreshing => None,
                    BankStatus::SelfRefresh => Some(cmd.with_type(CommandType::SelfRefreshExit)),
                    BankStatus::Closed => Some(*cmd),
                }
            }
            // Already-elemental commands pass through unchanged.
            CommandType::Activate | CommandType::Precharge | CommandType::SelfRefreshExit => {
                Some(*cmd)
            }
        }
    }

    /// Whether `cmd` can legally be issued at `clk`.
    ///
    /// True iff the timing constraints for its type have elapsed on every
    /// bank in scope and the bank FSM admits it. ACTIVATE additionally
    /// requires a free slot in the rank's four-activate window and no
    /// refresh waiting on the rank.
    pub fn is_ready(&self, cmd: &Command, clk: u64) -> bool {
        match cmd.cmd_type {
            CommandType::Activate => {
                let bank = self.bank(cmd.rank(), cmd.bankgroup(), cmd.bank());
                !self.refresh_waiting[cmd.rank()]
                    && bank.admits(cmd.cmd_type)
                    && bank.timing_ok(cmd.cmd_type, clk)
                    && self.activation_window_ok(cmd.rank(), clk)
            }
            CommandType::Read
            | CommandType::ReadPrecharge
            | CommandType::Write
            | CommandType::WritePrecharge => {
                let bank = self.bank(cmd.rank(), cmd.bankgroup(), cmd.bank());
                bank.admits(cmd.cmd_type)
                    && bank.timing_ok(cmd.cmd_type, clk)
                    && bank.open_row() == Some(cmd.row())
            }
            CommandType::Precharge | CommandType::RefreshBank => {
                let bank = self.bank(cmd.rank(), cmd.bankgroup(), cmd.bank());
                bank.admits(cmd.cmd_type) && bank.timing_ok(cmd.cmd_type, clk)
            }
            CommandType::Refresh | CommandType::SelfRefreshEnter | CommandType::SelfRefreshExit => {
                self.banks_of_rank(cmd.rank())
                    .all(|bank| bank.admits(cmd.cmd_type) && bank.timing_ok(cmd.cmd_type, clk))
            }
        }
    }

    /// Advances bank FSMs for an issued command.
    ///
    /// Rank-level commands update every bank of their rank; refresh commands
    /// record their completion window from the timing table.
    pub fn update_state(&mut self, cmd: &Command, clk: u64) {
        let rank = cmd.rank();
        match cmd.cmd_type {
            CommandType::Refresh => {
                let done = clk + self.timing.trfc;
                let start = rank * self.banks_per_rank;
                for bank in &mut self.banks[start..start + self.banks_per_rank] {
                    bank.update_state(cmd.cmd_type, cmd.row(), done);
                }
            }
            CommandType::RefreshBank => {
                let done = clk + self.timing.trfcb;
                let idx = self.index(rank, cmd.bankgroup(), cmd.bank());
                self.banks[idx].update_state(cmd.cmd_type, cmd.row(), done);
            }
            CommandType::SelfRefreshEnter | CommandType::SelfRefreshExit => {
                let start = rank * self.banks_per_rank;
                for bank in &mut self.banks[start..start + self.banks_per_rank] {
                    bank.update_state(cmd.cmd_type, cmd.row(), 0);
                }
                self.rank_in_self_refresh[rank] =
                    cmd.cmd_type == CommandType::SelfRefreshEnter;
            }
            CommandType::Activate => {
                let idx = self.index(rank, cmd.bankgroup(), cmd.bank());
                self.banks[idx].update_state(cmd.cmd_type, cmd.row(), 0);
                self.record_activation(rank, clk);
            }
            _ => {
                let idx = self.index(rank, cmd.bankgroup(), cmd.bank());
                self.banks[idx].update_state(cmd.cmd_type, cmd.row(), 0);
            }
        }
    }

    /// Applies the timing table for an issued command at `clk`.
    pub fn update_timing(&mut self, cmd: &Command, clk: u64) {
        let (r, g, b) = (cmd.rank(), cmd.bankgroup(), cmd.bank());
        let banks_per_rank = self.banks_per_rank;
        let banks_per_group = self.banks_per_group;
        let timing = &self.timing;
        let banks = &mut self.banks;
        let index = |rank: usize, group: usize, bank: usize| {
            rank * banks_per_rank + group * banks_per_group + bank
        };
        let apply = |banks: &mut [BankState], idx: usize, entries: &[(CommandType, u64)]| {
            for &(affected, delta) in entries {
                banks[idx].update_timing(affected, clk + delta);
            }
        };

        if cmd.cmd_type.is_rank_level() {
            let entries = timing.same_rank(cmd.cmd_type);
            for gg in 0..self.bankgroups {
                for bb in 0..banks_per_group {
                    apply(banks, index(r, gg, bb), entries);
                }
            }
            return;
        }

        apply(banks, index(r, g, b), timing.same_bank(cmd.cmd_type));

        let same_group = timing.other_banks_same_bankgroup(cmd.cmd_type);
        for bb in (0..banks_per_group).filter(|&bb| bb != b) {
            apply(banks, index(r, g, bb), same_group);
        }

        let other_groups = timing.other_bankgroups_same_rank(cmd.cmd_type);
        for gg in (0..self.bankgroups).filter(|&gg| gg != g) {
            for bb in 0..banks_per_group {
                apply(banks, index(r, gg, bb), other_groups);
            }
        }

        let other_ranks = timing.other_ranks(cmd.cmd_type);
        for rr in (0..self.ranks).filter(|&rr| rr != r) {
            for gg in 0..self.bankgroups {
                for bb in 0..banks_per_group {
                    apply(banks, index(rr, gg, bb), other_ranks);
                }
            }
        }
    }

    /// Returns banks whose refresh window has elapsed to the closed state.
    pub fn expire_refreshes(&mut self, clk: u64) {
        for bank in &mut self.banks {
            bank.expire_refresh(clk);
        }
    }

    /// Whether `rank` may accept another ACTIVATE at `clk` under tFAW.
    pub fn activation_window_ok(&self, rank: usize, clk: u64) -> bool {
        let in_window = self.activation_times[rank]
            .iter()
            .filter(|&&t| t + self.timing.tfaw > clk)
            .count();
        in_window < ACTIVATES_PER_WINDOW
    }

    fn record_activation(&mut self, rank: usize, clk: u64) {
        let tfaw = self.timing.tfaw;
        let window = &mut self.activation_times[rank];
        while window.front().is_some_and(|&t| t + tfaw <= clk) {
            let _ = window.pop_front();
        }
        window.push_back(clk);
    }
}
