//! Net indices: dense integer addresses of 1-bit wires after bit-blasting.

use std::fmt;

/// A dense index into a [`super::Netlist`]'s net space, `[0, net_count)`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NetId(u32);

impl NetId {
    pub const fn new(idx: u32) -> Self {
        Self(idx)
    }

    pub const fn index(self) -> u32 {
        self.0
    }
}

impl From<u32> for NetId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<NetId> for u32 {
    fn from(value: NetId) -> Self {
        value.0
    }
}

impl From<usize> for NetId {
    fn from(value: usize) -> Self {
        Self(value as u32)
    }
}

impl From<NetId> for usize {
    fn from(value: NetId) -> Self {
        value.0 as usize
    }
}

impl fmt::Display for NetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
