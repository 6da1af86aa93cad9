//! Address trace records.
//!
//! One record per line, in the same format the memory system emits:
//! `<clk> <R|W> <hex_addr>`. The direction token also accepts the long
//! `READ`/`WRITE` spellings for compatibility with hand-written traces.

use std::str::FromStr;

/// One line of an address trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceRecord {
    /// Cycle at which the request should be injected.
    pub cycle: u64,
    /// Whether the request is a write.
    pub is_write: bool,
    /// Physical address.
    pub hex_addr: u64,
}

impl FromStr for TraceRecord {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut fields = line.split_whitespace();
        let cycle = fields
            .next()
            .ok_or_else(|| format!("missing cycle in trace line {line:?}"))?;
        let dir = fields
            .next()
            .ok_or_else(|| format!("missing direction in trace line {line:?}"))?;
        let addr = fields
            .next()
            .ok_or_else(|| format!("missing address in trace line {line:?}"))?;

        let cycle: u64 = cycle
            .parse()
            .map_err(|_| format!("bad cycle {cycle:?} in trace line {line:?}"))?;
        let is_write = match dir {
            "R" | "READ" => false,
            "W" | "WRITE" => true,
            _ => return Err(format!("bad direction {dir:?} in trace line {line:?}")),
        };
        let hex = addr.strip_prefix("0x").or_else(|| addr.strip_prefix("0X"));
        let hex_addr = u64::from_str_radix(hex.unwrap_or(addr), 16)
            .map_err(|_| format!("bad address {addr:?} in trace line {line:?}"))?;

        Ok(Self {
            cycle,
            is_write,
            hex_addr,
        })
    }
}
