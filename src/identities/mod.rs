//! Hadoop Identities
//!
//! The target identity state (groups, users and proxy users), the order
//! in which it is created, and numeric id allocation.

pub mod catalog;
pub mod creator;

pub use catalog::{cdh_identities, hdp_identities};
pub use creator::{
    IdentityProvisioner, IdentityProvisionerConfig, IdentityReport, Provisioned,
    DEFAULT_START_GID, DEFAULT_START_UID,
};

use crate::domain::model::MemberRef;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// =============================================================================
// Target State
// =============================================================================

/// A user's group memberships
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSpec {
    pub primary_group: String,
    #[serde(default)]
    pub secondary_groups: BTreeSet<String>,
}

impl UserSpec {
    /// Every group the user references, primary included
    pub fn groups(&self) -> BTreeSet<&str> {
        self.secondary_groups
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.primary_group.as_str()))
            .collect()
    }
}

/// The identities a Hadoop distribution needs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identities {
    /// Groups no user has as a primary or secondary group
    #[serde(default)]
    pub groups: BTreeSet<String>,
    #[serde(default)]
    pub users: BTreeMap<String, UserSpec>,
    #[serde(default)]
    pub proxy_users: BTreeMap<String, BTreeSet<MemberRef>>,
}

impl Identities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, name: &str) -> Self {
        self.groups.insert(name.to_string());
        self
    }

    pub fn with_user(mut self, name: &str, primary_group: &str, secondary_groups: &[&str]) -> Self {
        self.users.insert(
            name.to_string(),
            UserSpec {
                primary_group: primary_group.to_string(),
                secondary_groups: secondary_groups.iter().map(|g| g.to_string()).collect(),
            },
        );
        self
    }

    pub fn with_proxy_user(mut self, name: &str, members: &[MemberRef]) -> Self {
        self.proxy_users
            .insert(name.to_string(), members.iter().cloned().collect());
        self
    }

    /// Append `suffix` to every identity name, members included
    pub fn with_suffix(&self, suffix: &str) -> Self {
        let apply = |name: &str| format!("{}{}", name, suffix);
        Self {
            groups: self.groups.iter().map(|group| apply(group)).collect(),
            users: self
                .users
                .iter()
                .map(|(name, spec)| {
                    let spec = UserSpec {
                        primary_group: apply(&spec.primary_group),
                        secondary_groups: spec
                            .secondary_groups
                            .iter()
                            .map(|group| apply(group))
                            .collect(),
                    };
                    (apply(name), spec)
                })
                .collect(),
            proxy_users: self
                .proxy_users
                .iter()
                .map(|(name, members)| {
                    let members = members
                        .iter()
                        .map(|member| MemberRef {
                            name: apply(&member.name),
                            kind: member.kind,
                        })
                        .collect();
                    (apply(name), members)
                })
                .collect(),
        }
    }

    /// The creation order.
    ///
    /// Catalog groups come first. Each user is preceded by whichever of its
    /// groups were not created yet and followed by its secondary group
    /// memberships. Proxy users come last.
    pub fn plan(&self) -> Plan {
        let mut created: BTreeSet<&str> = BTreeSet::new();
        let groups: Vec<String> = self
            .groups
            .iter()
            .filter(|group| created.insert(group.as_str()))
            .cloned()
            .collect();

        let users = self
            .users
            .iter()
            .map(|(name, spec)| UserStep {
                new_groups: spec
                    .groups()
                    .into_iter()
                    .filter(|group| created.insert(group))
                    .map(str::to_string)
                    .collect(),
                name: name.clone(),
                primary_group: spec.primary_group.clone(),
                secondary_groups: spec.secondary_groups.iter().cloned().collect(),
            })
            .collect();

        let proxy_users = self
            .proxy_users
            .iter()
            .map(|(name, members)| (name.clone(), members.iter().cloned().collect()))
            .collect();

        Plan {
            groups,
            users,
            proxy_users,
        }
    }
}

/// Normalise a cluster name into an identity suffix (`prod` → `-prod`)
pub fn cluster_name_suffix(cluster_name: &str) -> String {
    if cluster_name.is_empty() || cluster_name.starts_with('-') {
        cluster_name.to_string()
    } else {
        format!("-{}", cluster_name)
    }
}

// =============================================================================
// Creation Plan
// =============================================================================

/// Identities in creation order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub groups: Vec<String>,
    pub users: Vec<UserStep>,
    pub proxy_users: Vec<(String, Vec<MemberRef>)>,
}

/// One user with the groups that must be created before it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStep {
    pub new_groups: Vec<String>,
    pub name: String,
    pub primary_group: String,
    pub secondary_groups: Vec<String>,
}

/// Phases of an identity provisioning run, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityPhase {
    Idle,
    CreatingGroups,
    CreatingUsers,
    CreatingProxyUsers,
    FlushingCache,
    Done,
}

impl IdentityPhase {
    /// The phase that follows this one
    pub fn next(self) -> Option<Self> {
        match self {
            IdentityPhase::Idle => Some(IdentityPhase::CreatingGroups),
            IdentityPhase::CreatingGroups => Some(IdentityPhase::CreatingUsers),
            IdentityPhase::CreatingUsers => Some(IdentityPhase::CreatingProxyUsers),
            IdentityPhase::CreatingProxyUsers => Some(IdentityPhase::FlushingCache),
            IdentityPhase::FlushingCache => Some(IdentityPhase::Done),
            IdentityPhase::Done => None,
        }
    }
}

impl fmt::Display for IdentityPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityPhase::Idle => write!(f, "Idle"),
            IdentityPhase::CreatingGroups => write!(f, "Creating groups"),
            IdentityPhase::CreatingUsers => write!(f, "Creating users"),
            IdentityPhase::CreatingProxyUsers => write!(f, "Creating proxy users"),
            IdentityPhase::FlushingCache => write!(f, "Flushing the auth cache"),
            IdentityPhase::Done => write!(f, "Done"),
        }
    }
}

// =============================================================================
// Id Allocation
// =============================================================================

/// Which kind of numeric id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdKind {
    Uid,
    Gid,
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdKind::Uid => write!(f, "UID"),
            IdKind::Gid => write!(f, "GID"),
        }
    }
}

/// Hands out strictly increasing ids; an id is never handed out twice
#[derive(Debug, Clone)]
pub struct IdAllocator {
    kind: IdKind,
    next: Option<u32>,
}

impl IdAllocator {
    pub fn new(kind: IdKind, start: u32) -> Self {
        Self {
            kind,
            next: Some(start),
        }
    }

    pub fn kind(&self) -> IdKind {
        self.kind
    }

    /// The id the next call to [`IdAllocator::allocate`] returns
    pub fn peek(&self) -> Option<u32> {
        self.next
    }

    pub fn allocate(&mut self) -> Result<u32> {
        let id = self.next.ok_or(Error::IdExhausted { kind: self.kind })?;
        self.next = id.checked_add(1);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_plan_creates_referenced_groups_first() {
        let identities = Identities::new()
            .with_group("hadoop")
            .with_user("hdfs", "hdfs", &["hadoop"]);
        let plan = identities.plan();

        assert_eq!(plan.groups, vec!["hadoop"]);
        assert_eq!(
            plan.users,
            vec![UserStep {
                new_groups: vec!["hdfs".into()],
                name: "hdfs".into(),
                primary_group: "hdfs".into(),
                secondary_groups: vec!["hadoop".into()],
            }]
        );
        assert!(plan.proxy_users.is_empty());
    }

    #[test]
    fn test_plan_creates_each_group_once() {
        let identities = Identities::new()
            .with_user("hbase", "hbase", &["hadoop", "supergroup"])
            .with_user("hdfs", "hdfs", &["hadoop", "supergroup"]);
        let plan = identities.plan();

        assert_eq!(plan.users[0].new_groups, vec!["hadoop", "hbase", "supergroup"]);
        assert_eq!(plan.users[1].new_groups, vec!["hdfs"]);
    }

    #[test]
    fn test_with_suffix() {
        let identities = Identities::new()
            .with_group("spare")
            .with_user("hdfs", "hdfs", &["hadoop"])
            .with_proxy_user("hive", &[MemberRef::user("ambari-qa"), MemberRef::group("hadoop")])
            .with_suffix("-prod");

        assert!(identities.groups.contains("spare-prod"));
        let hdfs = &identities.users["hdfs-prod"];
        assert_eq!(hdfs.primary_group, "hdfs-prod");
        assert!(hdfs.secondary_groups.contains("hadoop-prod"));
        let members = &identities.proxy_users["hive-prod"];
        assert!(members.contains(&MemberRef::user("ambari-qa-prod")));
        assert!(members.contains(&MemberRef::group("hadoop-prod")));
    }

    #[test]
    fn test_cluster_name_suffix() {
        assert_eq!(cluster_name_suffix("prod"), "-prod");
        assert_eq!(cluster_name_suffix("-prod"), "-prod");
        assert_eq!(cluster_name_suffix(""), "");
    }

    #[test]
    fn test_phases_are_sequential() {
        let mut phase = IdentityPhase::Idle;
        let mut seen = vec![phase];
        while let Some(next) = phase.next() {
            assert!(next > phase);
            phase = next;
            seen.push(phase);
        }
        assert_eq!(seen.len(), 6);
        assert_eq!(phase, IdentityPhase::Done);
    }

    #[test]
    fn test_id_allocator_is_monotonic() {
        let mut allocator = IdAllocator::new(IdKind::Gid, 1025);
        assert_eq!(allocator.allocate().unwrap(), 1025);
        assert_eq!(allocator.allocate().unwrap(), 1026);
        assert_eq!(allocator.peek(), Some(1027));

        let mut allocator = IdAllocator::new(IdKind::Uid, u32::MAX);
        assert_eq!(allocator.allocate().unwrap(), u32::MAX);
        assert_matches!(
            allocator.allocate(),
            Err(Error::IdExhausted { kind: IdKind::Uid })
        );
    }
}
