//! Static command-to-command timing constraints.
//!
//! This module derives, from the configured JEDEC parameters, the full table
//! of pairwise constraints the channel must honor. For each issued command
//! type it records, per affected scope, the list of
//! `(affected command, minimum gap)` pairs. Applying these lists is the only
//! mechanism by which timing propagates through the simulator.
//!
//! Scopes mirror the JEDEC hierarchy: the issuing command's own bank, the
//! other banks of its bankgroup, the other bankgroups of its rank, the other
//! ranks of the channel, and (for rank-level commands) every bank of its
//! rank.
//!
//! The four-activate window (tFAW) is not representable as a pairwise gap and
//! is enforced separately by the channel state.

use crate::common::CommandType;
use crate::config::Config;

/// A minimum-gap constraint on one affected command type.
pub type TimingEntry = (CommandType, u64);

/// Per-command-type constraint lists, indexed by [`CommandType::index`].
type TimingTable = Vec<Vec<TimingEntry>>;

/// The complete timing constraint table for one channel.
#[derive(Clone, Debug)]
pub struct Timing {
    /// READ command to last data beat: `CL + BL/2`.
    pub read_delay: u64,
    /// WRITE command to last data beat: `CWL + BL/2`.
    pub write_delay: u64,
    /// Rank-level refresh cycle time.
    pub trfc: u64,
    /// Bank-level refresh cycle time.
    pub trfcb: u64,
    /// Four-activate window length.
    pub tfaw: u64,

    same_bank: TimingTable,
    other_banks_same_bankgroup: TimingTable,
    other_bankgroups_same_rank: TimingTable,
    other_ranks: TimingTable,
    same_rank: TimingTable,
}

fn empty_table() -> TimingTable {
    vec![Vec::new(); CommandType::COUNT]
}

impl Timing {
    /// Derives the constraint table from the configuration.
    pub fn new(config: &Config) -> Self {
        use crate::common::CommandType::{
            Activate, Precharge, Read, ReadPrecharge, Refresh, RefreshBank, SelfRefreshEnter,
            SelfRefreshExit, Write, WritePrecharge,
        };

        let t = &config.timing;
        let burst = (config.dram.bl / 2) as u64;

        // Protocols without bankgroups have no long/short split.
        let has_bg = config.dram.protocol.has_bankgroups() && config.dram.bankgroups > 1;
        let tccd_s = if has_bg { t.tccd_s } else { t.tccd_l };
        let trrd_s = if has_bg { t.trrd_s } else { t.trrd_l };
        let twtr_s = if has_bg { t.twtr_s } else { t.twtr_l };

        let read_delay = t.cl + burst;
        let write_delay = t.cwl + burst;

        let read_to_read_l = burst.max(t.tccd_l);
        let read_to_read_s = burst.max(tccd_s);
        let read_to_read_o = burst + t.trtrs;
        let read_to_write = (t.cl + burst + t.trtrs).saturating_sub(t.cwl);
        let readp_to_act = t.trtp + t.trp;

        let write_to_read_l = t.cwl + burst + t.twtr_l;
        let write_to_read_s = t.cwl + burst + twtr_s;
        let write_to_read_o = (t.cwl + burst + t.trtrs).saturating_sub(t.cl);
        let write_to_write_l = burst.max(t.tccd_l);
        let write_to_write_s = burst.max(tccd_s);
        let write_to_write_o = burst + t.trtrs;
        let write_to_precharge = t.cwl + burst + t.twr;
        let writep_to_act = t.cwl + burst + t.twr + t.trp;

        let mut same_bank = empty_table();
        let mut other_banks_same_bankgroup = empty_table();
        let mut other_bankgroups_same_rank = empty_table();
        let mut other_ranks = empty_table();
        let mut same_rank = empty_table();

        // READ
        same_bank[Read.index()] = vec![
            (Read, read_to_read_l),
            (ReadPrecharge, read_to_read_l),
            (Write, read_to_write),
            (WritePrecharge, read_to_write),
            (Precharge, t.trtp),
        ];
        other_banks_same_bankgroup[Read.index()] = vec![
            (Read, read_to_read_l),
            (ReadPrecharge, read_to_read_l),
            (Write, read_to_write),
            (WritePrecharge, read_to_write),
        ];
        other_bankgroups_same_rank[Read.index()] = vec![
            (Read, read_to_read_s),
            (ReadPrecharge, read_to_read_s),
            (Write, read_to_write),
            (WritePrecharge, read_to_write),
        ];
        other_ranks[Read.index()] = vec![
            (Read, read_to_read_o),
            (ReadPrecharge, read_to_read_o),
            (Write, read_to_write),
            (WritePrecharge, read_to_write),
        ];

        // READ with autoprecharge: READ bus constraints plus the implicit
        // row close gating the next row cycle.
        same_bank[ReadPrecharge.index()] = vec![
            (Read, read_to_read_l),
            (ReadPrecharge, read_to_read_l),
            (Write, read_to_write),
            (WritePrecharge, read_to_write),
            (Activate, readp_to_act),
            (Refresh, readp_to_act),
            (RefreshBank, readp_to_act),
            (SelfRefreshEnter, readp_to_act),
        ];
        other_banks_same_bankgroup[ReadPrecharge.index()] =
            other_banks_same_bankgroup[Read.index()].clone();
        other_bankgroups_same_rank[ReadPrecharge.index()] =
            other_bankgroups_same_rank[Read.index()].clone();
        other_ranks[ReadPrecharge.index()] = other_ranks[Read.index()].clone();

        // WRITE
        same_bank[Write.index()] = vec![
            (Read, write_to_read_l),
            (ReadPrecharge, write_to_read_l),
            (Write, write_to_write_l),
            (WritePrecharge, write_to_write_l),
            (Precharge, write_to_precharge),
        ];
        other_banks_same_bankgroup[Write.index()] = vec![
            (Read, write_to_read_l),
            (ReadPrecharge, write_to_read_l),
            (Write, write_to_write_l),
            (WritePrecharge, write_to_write_l),
        ];
        other_bankgroups_same_rank[Write.index()] = vec![
            (Read, write_to_read_s),
            (ReadPrecharge, write_to_read_s),
            (Write, write_to_write_s),
            (WritePrecharge, write_to_write_s),
        ];
        other_ranks[Write.index()] = vec![
            (Read, write_to_read_o),
            (ReadPrecharge, write_to_read_o),
            (Write, write_to_write_o),
            (WritePrecharge, write_to_write_o),
        ];

        // WRITE with autoprecharge.
        same_bank[WritePrecharge.index()] = vec![
            (Read, write_to_read_l),
            (ReadPrecharge, write_to_read_l),
            (Write, write_to_write_l),
            (WritePrecharge, write_to_write_l),
            (Activate, writep_to_act),
            (Refresh, writep_to_act),
            (RefreshBank, writep_to_act),
            (SelfRefreshEnter, writep_to_act),
        ];
        other_banks_same_bankgroup[WritePrecharge.index()] =
            other_banks_same_bankgroup[Write.index()].clone();
        other_bankgroups_same_rank[WritePrecharge.index()] =
            other_bankgroups_same_rank[Write.index()].clone();
        other_ranks[WritePrecharge.index()] = other_ranks[Write.index()].clone();

        // ACTIVATE
        same_bank[Activate.index()] = vec![
            (Activate, t.trc),
            (Read, t.trcd),
            (ReadPrecharge, t.trcd),
            (Write, t.trcd),
            (WritePrecharge, t.trcd),
            (Precharge, t.tras),
        ];
        other_banks_same_bankgroup[Activate.index()] =
            vec![(Activate, t.trrd_l), (RefreshBank, t.trrd_l)];
        other_bankgroups_same_rank[Activate.index()] =
            vec![(Activate, trrd_s), (RefreshBank, trrd_s)];

        // PRECHARGE
        same_bank[Precharge.index()] = vec![
            (Activate, t.trp),
            (Refresh, t.trp),
            (RefreshBank, t.trp),
            (SelfRefreshEnter, t.trp),
        ];

        // REFRESH (rank level)
        same_rank[Refresh.index()] = vec![
            (Activate, t.trfc),
            (Refresh, t.trfc),
            (RefreshBank, t.trfc),
            (SelfRefreshEnter, t.trfc),
        ];

        // REFRESH (bank level)
        same_bank[RefreshBank.index()] = vec![
            (Activate, t.trfcb),
            (Refresh, t.trfcb),
            (RefreshBank, t.trfcb),
            (SelfRefreshEnter, t.trfcb),
        ];
        other_banks_same_bankgroup[RefreshBank.index()] =
            vec![(Activate, t.trrd_l), (RefreshBank, t.trrd_l)];
        other_bankgroups_same_rank[RefreshBank.index()] =
            vec![(Activate, trrd_s), (RefreshBank, trrd_s)];

        // Self-refresh entry and exit.
        same_rank[SelfRefreshEnter.index()] = vec![(SelfRefreshExit, t.tckesr)];
        same_rank[SelfRefreshExit.index()] = vec![
            (Activate, t.txs),
            (Refresh, t.txs),
            (RefreshBank, t.txs),
            (SelfRefreshEnter, t.txs),
        ];

        Self {
            read_delay,
            write_delay,
            trfc: t.trfc,
            trfcb: t.trfcb,
            tfaw: t.tfaw,
            same_bank,
            other_banks_same_bankgroup,
            other_bankgroups_same_rank,
            other_ranks,
            same_rank,
        }
    }

    /// Constraints applied to the issuing command's own bank.
    #[inline]
    pub fn same_bank(&self, cmd_type: CommandType) -> &[TimingEntry] {
        &self.same_bank[cmd_type.index()]
    }

    /// Constraints applied to the other banks of the issuing bankgroup.
    #[inline]
    pub fn other_banks_same_bankgroup(&self, cmd_type: CommandType) -> &[TimingEntry] {
        &self.other_banks_same_bankgroup[cmd_type.index()]
    }

    /// Constraints applied to the other bankgroups of the issuing rank.
    #[inline]
    pub fn other_bankgroups_same_rank(&self, cmd_type: CommandType) -> &[TimingEntry] {
        &self.other_bankgroups_same_rank[cmd_type.index()]
    }

    /// Constraints applied to every bank of the other ranks.
    #[inline]
    pub fn other_ranks(&self, cmd_type: CommandType) -> &[TimingEntry] {
        &self.other_ranks[cmd_type.index()]
    }

    /// Constraints applied to every bank of the issuing rank (rank-level commands).
    #[inline]
    pub fn same_rank(&self, cmd_type: CommandType) -> &[TimingEntry] {
        &self.same_rank[cmd_type.index()]
    }
}
