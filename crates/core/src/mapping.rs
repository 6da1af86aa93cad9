//! Physical address decoding.
//!
//! This module slices raw physical addresses into DRAM coordinates. It
//! provides:
//! 1. **Mapper Construction:** Parses the configurable bit-order string and
//!    derives field widths from the topology.
//! 2. **Decode:** `hex_addr → Address`, dropping the low bits that address
//!    bytes within one burst.
//! 3. **Encode:** The inverse composition, used for round-trip checks and
//!    trace tooling.
//!
//! The mapping is bijective over the addressable range: every
//! `(channel, rank, bankgroup, bank, row, column)` tuple corresponds to
//! exactly one burst-aligned physical address.

use crate::common::{Address, ConfigError};
use crate::config::Config;

/// Bit position and width of one address field.
#[derive(Clone, Copy, Debug, Default)]
struct FieldSlice {
    pos: u32,
    width: u32,
}

impl FieldSlice {
    #[inline]
    fn extract(self, addr: u64) -> usize {
        ((addr >> self.pos) & ((1 << self.width) - 1)) as usize
    }

    #[inline]
    fn compose(self, value: usize) -> u64 {
        ((value as u64) & ((1 << self.width) - 1)) << self.pos
    }
}

/// Decodes physical addresses into DRAM coordinates per the configured order.
///
/// Built once at system construction; decoding is pure bit arithmetic.
#[derive(Clone, Debug)]
pub struct AddressMapper {
    /// Low bits covering one burst; ignored by the mapping.
    shift_bits: u32,
    channel: FieldSlice,
    rank: FieldSlice,
    bankgroup: FieldSlice,
    bank: FieldSlice,
    row: FieldSlice,
    column: FieldSlice,
}

/// Field tokens accepted in the mapping string, two characters each.
const FIELD_TOKENS: [&str; 6] = ["ch", "ra", "bg", "ba", "ro", "co"];

fn log2(v: usize) -> u32 {
    v.trailing_zeros()
}

impl AddressMapper {
    /// Builds a mapper from the configured topology and bit-order string.
    ///
    /// The string is six two-character tokens, MSB-first, each of
    /// `ch ra bg ba ro co` exactly once (e.g. `"rochrababgco"`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAddressMapping`] if the string is not
    /// six known, distinct tokens.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let mapping = config.scheduler.address_mapping.as_str();
        let bad = |reason: String| ConfigError::InvalidAddressMapping {
            mapping: mapping.to_string(),
            reason,
        };

        if mapping.len() != 12 || !mapping.is_ascii() {
            return Err(bad(format!(
                "expected six two-character tokens, got {} characters",
                mapping.len()
            )));
        }

        let mut tokens = Vec::with_capacity(6);
        for i in 0..6 {
            let tok = &mapping[i * 2..i * 2 + 2];
            if !FIELD_TOKENS.contains(&tok) {
                return Err(bad(format!("unknown field token \"{tok}\"")));
            }
            if tokens.contains(&tok) {
                return Err(bad(format!("duplicate field token \"{tok}\"")));
            }
            tokens.push(tok);
        }

        let width_of = |tok: &str| -> u32 {
            match tok {
                "ch" => log2(config.dram.channels),
                "ra" => log2(config.dram.ranks),
                "bg" => log2(config.dram.bankgroups),
                "ba" => log2(config.dram.banks_per_group),
                "ro" => log2(config.dram.rows),
                _ => log2(config.dram.columns),
            }
        };

        let shift_bits = log2(config.dram.request_size_bytes());
        let mut slices = [FieldSlice::default(); 6];
        let mut pos = shift_bits;
        // Assign LSB-first: the last token in the string owns the lowest bits.
        for (i, tok) in tokens.iter().enumerate().rev() {
            let width = width_of(tok);
            slices[i] = FieldSlice { pos, width };
            pos += width;
        }

        let slice_for = |tok: &str| -> FieldSlice {
            let i = tokens
                .iter()
                .position(|t| *t == tok)
                .unwrap_or_default();
            slices[i]
        };

        Ok(Self {
            shift_bits,
            channel: slice_for("ch"),
            rank: slice_for("ra"),
            bankgroup: slice_for("bg"),
            bank: slice_for("ba"),
            row: slice_for("ro"),
            column: slice_for("co"),
        })
    }

    /// Decodes a raw physical address into DRAM coordinates.
    #[inline]
    pub fn decode(&self, hex_addr: u64) -> Address {
        Address {
            channel: self.channel.extract(hex_addr),
            rank: self.rank.extract(hex_addr),
            bankgroup: self.bankgroup.extract(hex_addr),
            bank: self.bank.extract(hex_addr),
            row: self.row.extract(hex_addr),
            column: self.column.extract(hex_addr),
        }
    }

    /// Re-composes the burst-aligned physical address for a coordinate tuple.
    ///
    /// Inverse of [`decode`](Self::decode) up to the in-burst byte offset:
    /// `encode(decode(a)) == a` whenever `a` is burst aligned.
    #[inline]
    pub fn encode(&self, addr: Address) -> u64 {
        self.channel.compose(addr.channel)
            | self.rank.compose(addr.rank)
            | self.bankgroup.compose(addr.bankgroup)
            | self.bank.compose(addr.bank)
            | self.row.compose(addr.row)
            | self.column.compose(addr.column)
    }

    /// Number of low address bits covered by one burst.
    #[inline]
    pub const fn shift_bits(&self) -> u32 {
        self.shift_bits
    }
}
