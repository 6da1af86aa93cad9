//! Per-channel controller orchestration.
//!
//! `Controller::clock_tick` runs once per simulated cycle and performs, in
//! order: refresh injection, command selection (waiting refresh first, then
//! queue arbitration), issue with state and timing updates, and completion
//! processing. At most one command goes out on the command bus per cycle.
//!
//! Requests flow through three owned collections: the pending map while
//! their column access is queued, a completion FIFO while data is in flight,
//! and the finished list the facade drains to fire user callbacks.

use std::collections::{HashMap, VecDeque};

use crate::channel::{ChannelState, Timing};
use crate::common::{Address, Command, CommandType, Request};
use crate::config::Config;
use crate::stats::Statistics;

use super::command_queue::CommandQueue;
use super::refresh::Refresh;

/// A completed request ready for its user callback.
#[derive(Clone, Copy, Debug)]
pub struct Completion {
    /// Original physical address of the request.
    pub hex_addr: u64,
    /// Whether the request was a write.
    pub is_write: bool,
}

/// The memory controller for a single channel.
#[derive(Debug)]
pub struct Controller {
    channel_id: usize,
    clk: u64,
    channel_state: ChannelState,
    cmd_queue: CommandQueue,
    refresh: Refresh,
    stats: Statistics,
    /// Requests admitted but not yet issued, keyed by id.
    pending_reqs: HashMap<u64, Request>,
    /// Issued reads awaiting their data transfer, in issue order.
    read_completions: VecDeque<(u64, Request)>,
    /// Issued writes awaiting their data transfer, in issue order.
    write_completions: VecDeque<(u64, Request)>,
    /// Completed requests not yet delivered to callbacks.
    finished: Vec<Completion>,
    read_delay: u64,
    write_delay: u64,
}

impl Controller {
    /// Creates the controller for `channel_id` from the configuration.
    pub fn new(channel_id: usize, config: &Config) -> Self {
        let timing = Timing::new(config);
        let read_delay = timing.read_delay;
        let write_delay = timing.write_delay;
        Self {
            channel_id,
            clk: 0,
            channel_state: ChannelState::new(config, timing),
            cmd_queue: CommandQueue::new(config),
            refresh: Refresh::new(channel_id, config),
            stats: Statistics::new(),
            pending_reqs: HashMap::new(),
            read_completions: VecDeque::new(),
            write_completions: VecDeque::new(),
            finished: Vec::new(),
            read_delay,
            write_delay,
        }
    }

    /// Current cycle of this channel.
    #[inline]
    pub const fn clk(&self) -> u64 {
        self.clk
    }

    /// Read-only view of the channel state, for inspection and tests.
    #[inline]
    pub const fn channel_state(&self) -> &ChannelState {
        &self.channel_state
    }

    /// This channel's statistics.
    #[inline]
    pub const fn stats(&self) -> &Statistics {
        &self.stats
    }

    /// Mutable statistics access, used by the facade for epoch rollover.
    #[inline]
    pub const fn stats_mut(&mut self) -> &mut Statistics {
        &mut self.stats
    }

    /// Total queued commands across this channel's FIFOs.
    pub fn queue_usage(&self) -> usize {
        self.cmd_queue.queue_usage()
    }

    /// Whether a request for `addr` would be admitted this cycle.
    pub fn will_accept(&self, addr: &Address) -> bool {
        self.cmd_queue
            .will_accept(addr.rank, addr.bankgroup, addr.bank)
    }

    /// Admits a request, or hands it back if its FIFO is full.
    ///
    /// # Errors
    ///
    /// Returns the request unchanged when the target FIFO is full; the
    /// caller retries on a later cycle or stages it elsewhere.
    pub fn insert_req(&mut self, req: Request) -> Result<(), Request> {
        if !self.will_accept(&req.cmd.addr) {
            return Err(req);
        }
        let cmd = req.cmd;
        let admitted = self.cmd_queue.add_command(cmd);
        assert!(admitted, "queue accepted a command it refused to admit");
        let prev = self.pending_reqs.insert(req.id, req);
        assert!(prev.is_none(), "duplicate request id admitted");
        Ok(())
    }

    /// Advances this channel by one cycle.
    pub fn clock_tick(&mut self) {
        self.channel_state.expire_refreshes(self.clk);
        self.refresh.clock_tick(self.clk);
        self.sync_refresh_waiting();

        // A waiting refresh outranks ordinary traffic; only when it cannot
        // make progress this cycle does the command queue get a turn.
        let mut from_queue = false;
        let mut issued = self
            .refresh
            .pending()
            .copied()
            .and_then(|want| self.channel_state.required_command(&want))
            .filter(|cmd| self.channel_state.is_ready(cmd, self.clk));
        if issued.is_none() {
            issued = self
                .cmd_queue
                .get_command_to_issue(self.clk, &self.channel_state);
            from_queue = issued.is_some();
        }

        if let Some(cmd) = issued {
            self.issue_command(&cmd, from_queue);
        }

        self.process_completions();
        self.clk += 1;
        self.stats.dramcycles.inc();
    }

    /// Moves completed requests out of the controller.
    pub fn drain_finished(&mut self) -> std::vec::Drain<'_, Completion> {
        self.finished.drain(..)
    }

    fn issue_command(&mut self, cmd: &Command, from_queue: bool) {
        // A command the scheduler deemed ready must still be ready now;
        // anything else is a state-tracking bug.
        assert!(
            self.channel_state.is_ready(cmd, self.clk),
            "channel {}: scheduled {cmd} is not issuable at cycle {}",
            self.channel_id,
            self.clk
        );
        tracing::trace!(
            channel = self.channel_id,
            clk = self.clk,
            cmd = %cmd,
            "issue"
        );

        if cmd.cmd_type.is_read_write() {
            // Hit iff a previous access already touched the open row; the
            // first access after ACTIVATE is the miss that paid for it.
            let hit = self
                .channel_state
                .row_hit_count(cmd.rank(), cmd.bankgroup(), cmd.bank())
                > 0;
            if hit {
                self.stats.numb_row_hits.inc();
            } else {
                self.stats.numb_row_misses.inc();
            }

            let req = self
                .pending_reqs
                .remove(&cmd.id)
                .unwrap_or_else(|| panic!("issued {cmd} has no pending request"));
            self.cmd_queue.issue_rw_command(cmd);
            if cmd.cmd_type.is_read() {
                self.stats.numb_read_reqs_issued.inc();
                self.read_completions
                    .push_back((self.clk + self.read_delay, req));
            } else {
                self.stats.numb_write_reqs_issued.inc();
                self.write_completions
                    .push_back((self.clk + self.write_delay, req));
            }
        }

        match cmd.cmd_type {
            CommandType::Activate => self.stats.numb_activates.inc(),
            CommandType::Precharge => {
                self.stats.numb_precharges.inc();
                if from_queue {
                    self.stats.numb_ondemand_precharges.inc();
                }
            }
            CommandType::ReadPrecharge | CommandType::WritePrecharge => {
                self.stats.numb_precharges.inc();
            }
            CommandType::Refresh => self.stats.numb_refreshes.inc(),
            CommandType::RefreshBank => self.stats.numb_refresh_banks.inc(),
            _ => {}
        }

        self.channel_state.update_state(cmd, self.clk);
        self.channel_state.update_timing(cmd, self.clk);

        if cmd.cmd_type.is_refresh() {
            let _ = self.refresh.pop();
            self.sync_refresh_waiting();
        }
    }

    /// Fires completions whose data transfer has finished, oldest first.
    ///
    /// Each FIFO is already in completion order (issue order plus a fixed
    /// delay); the merge picks the earlier head, reads before writes on ties.
    fn process_completions(&mut self) {
        loop {
            let read_due = self
                .read_completions
                .front()
                .map(|&(done, _)| done)
                .filter(|&done| done <= self.clk);
            let write_due = self
                .write_completions
                .front()
                .map(|&(done, _)| done)
                .filter(|&done| done <= self.clk);

            let take_read = match (read_due, write_due) {
                (Some(r), Some(w)) => r <= w,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };

            let (done, req) = if take_read {
                self.read_completions.pop_front()
            } else {
                self.write_completions.pop_front()
            }
            .unwrap_or_else(|| unreachable!("due completion vanished"));

            self.stats
                .access_latency
                .add_value(done - req.arrival_cycle);
            self.finished.push(Completion {
                hex_addr: req.hex_addr,
                is_write: req.is_write,
            });
        }
    }

    /// Re-derives the per-rank refresh-waiting flags from the waiting list.
    fn sync_refresh_waiting(&mut self) {
        let refresh = &self.refresh;
        let channel_state = &mut self.channel_state;
        for rank in 0..channel_state.ranks() {
            channel_state.set_refresh_waiting(rank, false);
        }
        for rank in refresh.waiting_ranks() {
            channel_state.set_refresh_waiting(rank, true);
        }
    }
}
