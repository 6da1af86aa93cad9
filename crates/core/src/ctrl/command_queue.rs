//! Bounded command FIFOs and issue arbitration.
//!
//! Pending column accesses wait here until the channel can make progress on
//! them. The queue implements:
//! 1. **Admission:** One bounded FIFO per bank (`PER_BANK`) or per rank
//!    (`PER_RANK`); arrival order is preserved within a FIFO.
//! 2. **Round-Robin:** A cursor advances one FIFO per issue attempt, giving
//!    long-run fairness across banks.
//! 3. **FR-FCFS:** Within a FIFO the first entry whose required command is
//!    ready wins; row hits are implicitly preferred because they become
//!    ready sooner than entries needing an ACTIVATE.
//! 4. **Precharge Arbitration:** An on-demand PRECHARGE is vetoed while
//!    pending hits to the open row remain under the row-hit cap.

use std::collections::VecDeque;

use crate::channel::ChannelState;
use crate::common::{Command, CommandType};
use crate::config::{Config, QueueStructure};

/// Per-bank or per-rank FIFOs of pending column accesses.
#[derive(Debug)]
pub struct CommandQueue {
    queues: Vec<VecDeque<Command>>,
    queue_size: usize,
    structure: QueueStructure,
    ranks: usize,
    bankgroups: usize,
    banks_per_group: usize,
    banks_per_rank: usize,
    row_hit_cap: u32,
    next_rank: usize,
    next_bankgroup: usize,
    next_bank: usize,
    next_queue_index: usize,
}

impl CommandQueue {
    /// Creates the FIFOs for the configured queue structure.
    pub fn new(config: &Config) -> Self {
        let ranks = config.dram.ranks;
        let banks_per_rank = config.dram.banks();
        let num_queues = match config.queue.queue_structure {
            QueueStructure::PerBank => ranks * banks_per_rank,
            QueueStructure::PerRank => ranks,
        };
        let queue_size = config.queue.cmd_queue_size;
        Self {
            queues: (0..num_queues)
                .map(|_| VecDeque::with_capacity(queue_size))
                .collect(),
            queue_size,
            structure: config.queue.queue_structure,
            ranks,
            bankgroups: config.dram.bankgroups,
            banks_per_group: config.dram.banks_per_group,
            banks_per_rank,
            row_hit_cap: config.scheduler.row_hit_cap,
            next_rank: 0,
            next_bankgroup: 0,
            next_bank: 0,
            next_queue_index: 0,
        }
    }

    #[inline]
    fn queue_index(&self, rank: usize, bankgroup: usize, bank: usize) -> usize {
        match self.structure {
            QueueStructure::PerRank => rank,
            QueueStructure::PerBank => {
                rank * self.banks_per_rank + bankgroup * self.banks_per_group + bank
            }
        }
    }

    /// Whether the FIFO for `(rank, bankgroup, bank)` has room.
    pub fn will_accept(&self, rank: usize, bankgroup: usize, bank: usize) -> bool {
        self.queues[self.queue_index(rank, bankgroup, bank)].len() < self.queue_size
    }

    /// Appends a command to its FIFO; false if the FIFO is full.
    pub fn add_command(&mut self, cmd: Command) -> bool {
        let idx = self.queue_index(cmd.rank(), cmd.bankgroup(), cmd.bank());
        if self.queues[idx].len() < self.queue_size {
            self.queues[idx].push_back(cmd);
            true
        } else {
            false
        }
    }

    /// Picks the command to issue this cycle, if any FIFO has one ready.
    ///
    /// Advances the round-robin cursor once per FIFO visited; the first FIFO
    /// whose scan yields a ready command wins. A PRECHARGE that loses
    /// arbitration ends the whole attempt — the cycle is yielded to the
    /// pending row hits it would have evicted.
    pub fn get_command_to_issue(
        &mut self,
        clk: u64,
        channel_state: &ChannelState,
    ) -> Option<Command> {
        for _ in 0..self.queues.len() {
            self.iterate_next();
            let Some(cmd) = self.first_ready_in_queue(self.next_queue_index, clk, channel_state)
            else {
                continue;
            };
            if cmd.cmd_type == CommandType::Precharge
                && !self.arbitrate_precharge(&cmd, channel_state)
            {
                return None;
            }
            return Some(cmd);
        }
        None
    }

    /// Scans one FIFO head-to-tail for the first entry whose required
    /// command is ready. FR-FCFS applies at the queued-command level: the
    /// scan position is the queued access, not the substituted command.
    fn first_ready_in_queue(
        &self,
        queue_index: usize,
        clk: u64,
        channel_state: &ChannelState,
    ) -> Option<Command> {
        for queued in &self.queues[queue_index] {
            let Some(cmd) = channel_state.required_command(queued) else {
                continue;
            };
            if channel_state.is_ready(&cmd, clk) {
                return Some(cmd);
            }
        }
        None
    }

    /// Decides whether an on-demand PRECHARGE may evict the open row.
    ///
    /// The precharge is vetoed while the same FIFO still holds accesses to
    /// the open row and the bank's consecutive-hit count is below the cap;
    /// past the cap the precharge wins, bounding row-miss starvation.
    fn arbitrate_precharge(&self, cmd: &Command, channel_state: &ChannelState) -> bool {
        let (r, g, b) = (cmd.rank(), cmd.bankgroup(), cmd.bank());
        let open_row = channel_state.open_row(r, g, b);
        let queue = &self.queues[self.queue_index(r, g, b)];
        let pending_row_hits_exist = open_row.is_some_and(|row| {
            queue.iter().any(|pending| {
                pending.row() == row
                    && pending.bank() == b
                    && pending.bankgroup() == g
                    && pending.rank() == r
            })
        });
        let rowhit_limit_reached = channel_state.row_hit_count(r, g, b) >= self.row_hit_cap;
        !pending_row_hits_exist || rowhit_limit_reached
    }

    /// Removes an issued column access from its FIFO by request id.
    pub fn issue_rw_command(&mut self, cmd: &Command) {
        let idx = self.queue_index(cmd.rank(), cmd.bankgroup(), cmd.bank());
        if let Some(pos) = self.queues[idx].iter().position(|c| c.id == cmd.id) {
            let _ = self.queues[idx].remove(pos);
        }
    }

    /// Total number of queued commands across all FIFOs.
    pub fn queue_usage(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    fn iterate_next(&mut self) {
        match self.structure {
            QueueStructure::PerBank => {
                // Bankgroup-innermost rotation: consecutive visits touch
                // different bankgroups, matching the bus-efficient order.
                self.next_bankgroup = (self.next_bankgroup + 1) % self.bankgroups;
                if self.next_bankgroup == 0 {
                    self.next_bank = (self.next_bank + 1) % self.banks_per_group;
                    if self.next_bank == 0 {
                        self.next_rank = (self.next_rank + 1) % self.ranks;
                    }
                }
            }
            QueueStructure::PerRank => {
                self.next_rank = (self.next_rank + 1) % self.ranks;
            }
        }
        self.next_queue_index =
            self.queue_index(self.next_rank, self.next_bankgroup, self.next_bank);
    }
}
