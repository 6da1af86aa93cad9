//! DRAM command types and command-bus values.
//!
//! This module defines the vocabulary the controller speaks to the devices.
//! It provides:
//! 1. **Command Types:** Every JEDEC-style command the controller can issue.
//! 2. **Classification Helpers:** Read/write/refresh predicates used by the scheduler.
//! 3. **Command Values:** The `(type, address, id)` triple placed on the command bus.

use std::fmt;

use super::addr::Address;

/// A low-level DRAM command type.
///
/// The discriminant doubles as the index into per-bank timing tables, so the
/// variant order is load-bearing for [`CommandType::COUNT`]-sized arrays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum CommandType {
    /// Column read from the open row.
    Read,
    /// Column read followed by an automatic precharge.
    ReadPrecharge,
    /// Column write to the open row.
    Write,
    /// Column write followed by an automatic precharge.
    WritePrecharge,
    /// Open a row into the bank's sense amplifiers.
    Activate,
    /// Close the bank's open row.
    Precharge,
    /// Rank-level refresh; all banks in the rank must be closed.
    Refresh,
    /// Single-bank refresh; the target bank must be closed.
    RefreshBank,
    /// Enter self-refresh; the whole rank retains data without clocking.
    SelfRefreshEnter,
    /// Exit self-refresh and return the rank to the closed state.
    SelfRefreshExit,
}

impl CommandType {
    /// Number of command types; sizes per-bank timing arrays.
    pub const COUNT: usize = 10;

    /// Every command type, in discriminant order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Read,
        Self::ReadPrecharge,
        Self::Write,
        Self::WritePrecharge,
        Self::Activate,
        Self::Precharge,
        Self::Refresh,
        Self::RefreshBank,
        Self::SelfRefreshEnter,
        Self::SelfRefreshExit,
    ];

    /// Index into [`CommandType::COUNT`]-sized timing arrays.
    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// True for `Read` and `ReadPrecharge`.
    #[inline]
    pub const fn is_read(self) -> bool {
        matches!(self, Self::Read | Self::ReadPrecharge)
    }

    /// True for `Write` and `WritePrecharge`.
    #[inline]
    pub const fn is_write(self) -> bool {
        matches!(self, Self::Write | Self::WritePrecharge)
    }

    /// True for any column access (read or write, with or without autoprecharge).
    #[inline]
    pub const fn is_read_write(self) -> bool {
        self.is_read() || self.is_write()
    }

    /// True for rank- and bank-level refresh commands.
    #[inline]
    pub const fn is_refresh(self) -> bool {
        matches!(self, Self::Refresh | Self::RefreshBank)
    }

    /// True for commands that close the target row as a side effect.
    #[inline]
    pub const fn closes_row(self) -> bool {
        matches!(
            self,
            Self::ReadPrecharge | Self::WritePrecharge | Self::Precharge
        )
    }

    /// True for commands addressed to a whole rank rather than a single bank.
    #[inline]
    pub const fn is_rank_level(self) -> bool {
        matches!(
            self,
            Self::Refresh | Self::SelfRefreshEnter | Self::SelfRefreshExit
        )
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Read => "READ",
            Self::ReadPrecharge => "READ_P",
            Self::Write => "WRITE",
            Self::WritePrecharge => "WRITE_P",
            Self::Activate => "ACT",
            Self::Precharge => "PRE",
            Self::Refresh => "REF",
            Self::RefreshBank => "REFb",
            Self::SelfRefreshEnter => "SREF_ENTER",
            Self::SelfRefreshExit => "SREF_EXIT",
        };
        write!(f, "{s}")
    }
}

/// A command value as placed on the command bus.
///
/// `id` links column accesses back to the originating
/// [`Request`](super::request::Request); controller-generated commands
/// (ACTIVATE, PRECHARGE, refreshes) carry the id of the request they make
/// progress for, or zero when none applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Command {
    /// Command type.
    pub cmd_type: CommandType,
    /// Fully decoded target address.
    pub addr: Address,
    /// Originating request id, if any.
    pub id: u64,
}

impl Command {
    /// Creates a command targeting `addr`.
    #[inline]
    pub const fn new(cmd_type: CommandType, addr: Address, id: u64) -> Self {
        Self { cmd_type, addr, id }
    }

    /// Derives a command of a different type for the same target and request.
    ///
    /// Used by the channel state to turn a queued READ into the ACTIVATE or
    /// PRECHARGE that must precede it.
    #[inline]
    pub const fn with_type(self, cmd_type: CommandType) -> Self {
        Self { cmd_type, ..self }
    }

    /// Rank index shorthand.
    #[inline(always)]
    pub const fn rank(&self) -> usize {
        self.addr.rank
    }

    /// Bankgroup index shorthand.
    #[inline(always)]
    pub const fn bankgroup(&self) -> usize {
        self.addr.bankgroup
    }

    /// Bank index shorthand.
    #[inline(always)]
    pub const fn bank(&self) -> usize {
        self.addr.bank
    }

    /// Row index shorthand.
    #[inline(always)]
    pub const fn row(&self) -> usize {
        self.addr.row
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} r{} g{} b{} row{} col{}",
            self.cmd_type,
            self.addr.rank,
            self.addr.bankgroup,
            self.addr.bank,
            self.addr.row,
            self.addr.column
        )
    }
}
