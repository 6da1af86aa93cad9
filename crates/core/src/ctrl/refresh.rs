//! Periodic refresh injection.
//!
//! Every `tREFI` cycles (rank-level strategy) or `tREFIb` cycles (bank-level
//! strategy) a refresh command for the next rank or bank in rotation is
//! pushed onto a waiting list. The controller consults the list before
//! ordinary scheduling each cycle and converts the waiting refresh into a
//! PRECHARGE-then-REFRESH sequence through the channel state.

use std::collections::VecDeque;

use crate::common::{Address, Command, CommandType};
use crate::config::{Config, RefreshStrategy};

/// Refresh counter and waiting list for one channel.
#[derive(Debug)]
pub struct Refresh {
    refresh_q: VecDeque<Command>,
    strategy: RefreshStrategy,
    trefi: u64,
    trefib: u64,
    channel: usize,
    ranks: usize,
    bankgroups: usize,
    banks_per_group: usize,
    next_rank: usize,
    next_bankgroup: usize,
    next_bank: usize,
}

impl Refresh {
    /// Creates the refresh engine for one channel.
    pub fn new(channel: usize, config: &Config) -> Self {
        Self {
            refresh_q: VecDeque::new(),
            strategy: config.scheduler.refresh_strategy,
            trefi: config.timing.trefi,
            trefib: config.timing.trefib,
            channel,
            ranks: config.dram.ranks,
            bankgroups: config.dram.bankgroups,
            banks_per_group: config.dram.banks_per_group,
            next_rank: 0,
            next_bankgroup: 0,
            next_bank: 0,
        }
    }

    /// Enqueues a refresh if one has come due at `clk`.
    pub fn clock_tick(&mut self, clk: u64) {
        match self.strategy {
            RefreshStrategy::RankLevel => {
                if clk > 0 && clk % self.trefi == 0 {
                    self.insert_rank_refresh();
                }
            }
            RefreshStrategy::BankLevel => {
                if clk > 0 && clk % self.trefib == 0 {
                    self.insert_bank_refresh();
                }
            }
        }
    }

    /// The oldest waiting refresh, if any.
    #[inline]
    pub fn pending(&self) -> Option<&Command> {
        self.refresh_q.front()
    }

    /// Removes the oldest waiting refresh after it has been issued.
    pub fn pop(&mut self) -> Option<Command> {
        self.refresh_q.pop_front()
    }

    /// Ranks with at least one waiting refresh, oldest first.
    pub fn waiting_ranks(&self) -> impl Iterator<Item = usize> + '_ {
        self.refresh_q.iter().map(Command::rank)
    }

    fn insert_rank_refresh(&mut self) {
        let addr = Address::new(self.channel, self.next_rank, 0, 0, 0, 0);
        self.refresh_q
            .push_back(Command::new(CommandType::Refresh, addr, 0));
        tracing::debug!(channel = self.channel, rank = self.next_rank, "refresh due");
        self.next_rank = (self.next_rank + 1) % self.ranks;
    }

    fn insert_bank_refresh(&mut self) {
        let addr = Address::new(
            self.channel,
            self.next_rank,
            self.next_bankgroup,
            self.next_bank,
            0,
            0,
        );
        self.refresh_q
            .push_back(Command::new(CommandType::RefreshBank, addr, 0));
        tracing::debug!(
            channel = self.channel,
            rank = self.next_rank,
            bankgroup = self.next_bankgroup,
            bank = self.next_bank,
            "bank refresh due"
        );
        self.next_bankgroup = (self.next_bankgroup + 1) % self.bankgroups;
        if self.next_bankgroup == 0 {
            self.next_bank = (self.next_bank + 1) % self.banks_per_group;
            if self.next_bank == 0 {
                self.next_rank = (self.next_rank + 1) % self.ranks;
            }
        }
    }
}
