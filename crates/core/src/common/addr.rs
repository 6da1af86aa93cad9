//! Decoded DRAM address coordinates.
//!
//! This module defines the strong type for a fully decoded physical address.
//! It provides:
//! 1. **Hierarchy Fields:** Channel, rank, bankgroup, bank, row, and column indices.
//! 2. **Construction Helpers:** A zeroed address and a full-field constructor.
//!
//! Decoding from and re-encoding to raw physical addresses is performed by
//! [`AddressMapper`](crate::mapping::AddressMapper); this type only carries
//! the result.

/// A physical address decoded into the JEDEC DRAM hierarchy.
///
/// All fields are indices into the configured topology: `channel` selects the
/// memory channel, `rank`/`bankgroup`/`bank` select the bank, and `row`/
/// `column` locate the burst within the bank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Address {
    /// Channel index.
    pub channel: usize,
    /// Rank index within the channel.
    pub rank: usize,
    /// Bankgroup index within the rank.
    pub bankgroup: usize,
    /// Bank index within the bankgroup.
    pub bank: usize,
    /// Row index within the bank.
    pub row: usize,
    /// Column index within the row (burst granularity).
    pub column: usize,
}

impl Address {
    /// Creates an address from all six hierarchy fields.
    #[inline]
    pub const fn new(
        channel: usize,
        rank: usize,
        bankgroup: usize,
        bank: usize,
        row: usize,
        column: usize,
    ) -> Self {
        Self {
            channel,
            rank,
            bankgroup,
            bank,
            row,
            column,
        }
    }
}
