//! User-facing memory requests.
//!
//! A `Request` is created at admission, held by the controller while its
//! column access is queued and in flight, and destroyed once its completion
//! callback has fired.

use super::addr::Address;
use super::command::{Command, CommandType};

/// A memory operation submitted by the simulator's consumer.
#[derive(Clone, Debug)]
pub struct Request {
    /// True for writes, false for reads.
    pub is_write: bool,
    /// Raw physical address as submitted.
    pub hex_addr: u64,
    /// Cycle at which the request was admitted.
    pub arrival_cycle: u64,
    /// Unique request id, assigned by the memory system.
    pub id: u64,
    /// Decoded column-access command for this request.
    pub cmd: Command,
}

impl Request {
    /// Creates a request and its column-access command from a decoded address.
    pub fn new(hex_addr: u64, addr: Address, is_write: bool, arrival_cycle: u64, id: u64) -> Self {
        let cmd_type = if is_write {
            CommandType::Write
        } else {
            CommandType::Read
        };
        Self {
            is_write,
            hex_addr,
            arrival_cycle,
            id,
            cmd: Command::new(cmd_type, addr, id),
        }
    }
}
