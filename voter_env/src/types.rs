//! Common types for the voter model.

use serde::{Deserialize, Serialize};

/// Identifier of a lattice node.
///
/// Nodes are enumerated row-major, so `NodeId(row * width + col)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Returns the node's position in dense per-node arrays.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Creates a NodeId from a dense array index.
    #[inline]
    pub fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Position of a node on the 2D lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub row: u32,
    pub col: u32,
}

impl Coord {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Binary opinion held by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Status {
    #[default]
    Zero,
    One,
}

impl Status {
    /// Returns the status as 0 or 1.
    #[inline]
    pub fn as_u8(self) -> u8 {
        match self {
            Status::Zero => 0,
            Status::One => 1,
        }
    }

    #[inline]
    pub fn is_one(self) -> bool {
        self == Status::One
    }
}

impl From<Status> for u8 {
    fn from(status: Status) -> u8 {
        status.as_u8()
    }
}

impl From<bool> for Status {
    fn from(value: bool) -> Self {
        if value {
            Status::One
        } else {
            Status::Zero
        }
    }
}

impl TryFrom<u8> for Status {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Status::Zero),
            1 => Ok(Status::One),
            other => Err(format!("status must be 0 or 1, got {}", other)),
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}
