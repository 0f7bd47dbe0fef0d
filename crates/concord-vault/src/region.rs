//! Custody regions
//!
//! The vault distributes its epoch shares across a fixed set of three
//! regions. Each region owns a fixed 1-based evaluation index; indices never
//! change, only membership in the active set does.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A share-holding custody region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    Us,
    Eu,
    Cn,
}

impl Region {
    /// Every region, in index order.
    pub const ALL: [Region; 3] = [Region::Us, Region::Eu, Region::Cn];

    /// Fixed share-evaluation index.
    pub fn index(&self) -> u64 {
        match self {
            Region::Us => 1,
            Region::Eu => 2,
            Region::Cn => 3,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Region::Us => "US",
            Region::Eu => "EU",
            Region::Cn => "CN",
        };
        f.write_str(name)
    }
}

/// One region's evaluated share for the current epoch.
///
/// Exposed for diagnostics and tests; the scheme is bookkeeping for the
/// quorum rule, not secret material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub index: u64,
    pub value: u64,
}
