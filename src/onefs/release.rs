//! OneFS Releases
//!
//! Revision numbers reported by OneFS nodes for each known release.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The build revision reported by a OneFS node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterRevision(pub u64);

impl ClusterRevision {
    pub const fn new(revision: u64) -> Self {
        Self(revision)
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClusterRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u64> for ClusterRevision {
    fn from(revision: u64) -> Self {
        Self(revision)
    }
}

pub const ONEFS_7_2_0_0: ClusterRevision = ClusterRevision(0x70200500000000A);
pub const ONEFS_8_0_0_0: ClusterRevision = ClusterRevision(0x800005000000025);
pub const ONEFS_8_0_0_4: ClusterRevision = ClusterRevision(0x800005000400035);
pub const ONEFS_8_0_1_0: ClusterRevision = ClusterRevision(0x800015000000007);
pub const ONEFS_8_0_1_1: ClusterRevision = ClusterRevision(0x800015000100070);
pub const ONEFS_8_1_0_0: ClusterRevision = ClusterRevision(0x80100500000000B);
pub const ONEFS_8_1_1_0: ClusterRevision = ClusterRevision(0x8010150000000D4);
pub const ONEFS_8_1_2_0: ClusterRevision = ClusterRevision(0x801025000000010);
pub const ONEFS_8_1_3_0: ClusterRevision = ClusterRevision(0x80103500000000D);
pub const ONEFS_8_2_0_0: ClusterRevision = ClusterRevision(0x80200500000000B);
pub const ONEFS_8_2_1_0: ClusterRevision = ClusterRevision(0x802015000000004);
pub const ONEFS_8_2_2_0: ClusterRevision = ClusterRevision(0x802025000000007);
pub const ONEFS_8_2_3_0: ClusterRevision = ClusterRevision(0x802035000000000);

/// Known releases, oldest first
pub const ONEFS_RELEASES: &[(&str, ClusterRevision)] = &[
    ("7.2.0.0", ONEFS_7_2_0_0),
    ("8.0.0.0", ONEFS_8_0_0_0),
    ("8.0.0.4", ONEFS_8_0_0_4),
    ("8.0.1.0", ONEFS_8_0_1_0),
    ("8.0.1.1", ONEFS_8_0_1_1),
    ("8.1.0.0", ONEFS_8_1_0_0),
    ("8.1.1.0", ONEFS_8_1_1_0),
    ("8.1.2.0", ONEFS_8_1_2_0),
    ("8.1.3.0", ONEFS_8_1_3_0),
    ("8.2.0.0", ONEFS_8_2_0_0),
    ("8.2.1.0", ONEFS_8_2_1_0),
    ("8.2.2.0", ONEFS_8_2_2_0),
    ("8.2.3.0", ONEFS_8_2_3_0),
];

/// Look up the revision of a release by its dotted name
pub fn release(name: &str) -> Option<ClusterRevision> {
    ONEFS_RELEASES
        .iter()
        .find(|(release, _)| *release == name)
        .map(|(_, revision)| *revision)
}
