//! HDFS Directories
//!
//! The directory layout a Hadoop distribution expects under the HDFS root,
//! with the ownership and mode of every directory.

pub mod catalog;
pub mod creator;

pub use catalog::{cdh_directories, hdp_directories};
pub use creator::{DirectoryProvisioner, DirectoryReport, IFS_ROOT};

use serde::{Deserialize, Serialize};

/// A directory on HDFS, relative to the HDFS root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HdfsDirectory {
    pub path: String,
    pub owner: String,
    pub group: String,
    pub mode: u32,
}

impl HdfsDirectory {
    pub fn new(path: &str, owner: &str, group: &str, mode: u32) -> Self {
        Self {
            path: path.to_string(),
            owner: owner.to_string(),
            group: group.to_string(),
            mode,
        }
    }

    /// Append `suffix` to the owner and group
    pub fn apply_identity_suffix(&mut self, suffix: &str) {
        self.owner.push_str(suffix);
        self.group.push_str(suffix);
    }
}
