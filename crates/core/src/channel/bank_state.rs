//! Per-bank finite state machine and command timing.
//!
//! Each bank tracks its FSM state, the currently open row, the number of
//! consecutive row hits since the last ACTIVATE, and the earliest cycle at
//! which each command type may legally be issued to it.

use crate::common::CommandType;

/// Bank FSM states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BankStatus {
    /// No row open; ACTIVATE, refresh, or self-refresh entry are possible.
    #[default]
    Closed,
    /// A row is latched in the sense amplifiers.
    Open,
    /// A refresh is in progress; the bank returns to `Closed` when its
    /// refresh window elapses.
    Refreshing,
    /// The rank is in self-refresh; only SELF_REFRESH_EXIT applies.
    SelfRefresh,
}

/// State of one (rank, bankgroup, bank) tuple.
#[derive(Clone, Debug)]
pub struct BankState {
    state: BankStatus,
    open_row: Option<usize>,
    row_hit_count: u32,
    /// Earliest legal issue cycle per command type.
    cmd_timing: [u64; CommandType::COUNT],
    /// Cycle at which an in-progress refresh completes.
    refresh_done_cycle: u64,
}

impl Default for BankState {
    fn default() -> Self {
        Self::new()
    }
}

impl BankState {
    /// Creates a closed bank with all commands immediately legal.
    pub const fn new() -> Self {
        Self {
            state: BankStatus::Closed,
            open_row: None,
            row_hit_count: 0,
            cmd_timing: [0; CommandType::COUNT],
            refresh_done_cycle: 0,
        }
    }

    /// Current FSM state.
    #[inline]
    pub const fn status(&self) -> BankStatus {
        self.state
    }

    /// The open row, if any. `Some` iff the bank is `Open`.
    #[inline]
    pub const fn open_row(&self) -> Option<usize> {
        self.open_row
    }

    /// Consecutive row hits since the last ACTIVATE.
    #[inline]
    pub const fn row_hit_count(&self) -> u32 {
        self.row_hit_count
    }

    /// Earliest cycle at which `cmd_type` may be issued to this bank.
    #[inline]
    pub const fn earliest_cycle(&self, cmd_type: CommandType) -> u64 {
        self.cmd_timing[cmd_type.index()]
    }

    /// Whether the timing constraint for `cmd_type` has elapsed at `clk`.
    #[inline]
    pub const fn timing_ok(&self, cmd_type: CommandType, clk: u64) -> bool {
        clk >= self.cmd_timing[cmd_type.index()]
    }

    /// Whether this bank's FSM state admits `cmd_type` at all.
    ///
    /// Row-match checks for column accesses are the channel's job; this only
    /// encodes the state machine edges.
    pub fn admits(&self, cmd_type: CommandType) -> bool {
        use crate::common::CommandType::{
            Activate, Precharge, Read, ReadPrecharge, Refresh, RefreshBank, SelfRefreshEnter,
            SelfRefreshExit, Write, WritePrecharge,
        };
        match self.state {
            BankStatus::Closed => matches!(
                cmd_type,
                Activate | Refresh | RefreshBank | SelfRefreshEnter
            ),
            BankStatus::Open => matches!(
                cmd_type,
                Read | ReadPrecharge | Write | WritePrecharge | Precharge
            ),
            BankStatus::Refreshing => false,
            BankStatus::SelfRefresh => cmd_type == SelfRefreshExit,
        }
    }

    /// Advances the FSM for an issued command.
    ///
    /// `refresh_done_cycle` is the completion cycle for refresh commands and
    /// ignored otherwise.
    ///
    /// # Panics
    ///
    /// Panics if the command is not admissible in the current state; the
    /// channel must have vetted it with [`admits`](Self::admits).
    pub fn update_state(&mut self, cmd_type: CommandType, row: usize, refresh_done_cycle: u64) {
        assert!(
            self.admits(cmd_type),
            "illegal {cmd_type} in bank state {:?}",
            self.state
        );
        match cmd_type {
            CommandType::Activate => {
                self.state = BankStatus::Open;
                self.open_row = Some(row);
                self.row_hit_count = 0;
            }
            CommandType::Read | CommandType::Write => {
                self.row_hit_count += 1;
            }
            CommandType::ReadPrecharge
            | CommandType::WritePrecharge
            | CommandType::Precharge => {
                self.state = BankStatus::Closed;
                self.open_row = None;
                self.row_hit_count = 0;
            }
            CommandType::Refresh | CommandType::RefreshBank => {
                self.state = BankStatus::Refreshing;
                self.refresh_done_cycle = refresh_done_cycle;
            }
            CommandType::SelfRefreshEnter => {
                self.state = BankStatus::SelfRefresh;
            }
            CommandType::SelfRefreshExit => {
                self.state = BankStatus::Closed;
            }
        }
    }

    /// Returns the bank to `Closed` once its refresh window has elapsed.
    pub fn expire_refresh(&mut self, clk: u64) {
        if self.state == BankStatus::Refreshing && clk >= self.refresh_done_cycle {
            self.state = BankStatus::Closed;
        }
    }

    /// Raises the earliest legal cycle for `cmd_type` to at least `cycle`.
    #[inline]
    pub fn update_timing(&mut self, cmd_type: CommandType, cycle: u64) {
        let slot = &mut self.cmd_timing[cmd_type.index()];
        *slot = (*slot).max(cycle);
    }
}
