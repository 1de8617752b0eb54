//! Domain Model - Wire-level types exchanged with the OneFS platform API
//!
//! Only the fields this crate reads or writes are typed; everything else a
//! resource carries is kept in a flattened map so it survives a round trip.

use crate::onefs::release::ClusterRevision;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// =============================================================================
// Cluster Version
// =============================================================================

/// Revision report of every node in the cluster
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterVersion {
    #[serde(default)]
    pub nodes: Vec<NodeVersion>,
}

/// Revision report of a single node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeVersion {
    pub id: u64,
    /// OneFS reports the revision as a decimal string
    #[serde(deserialize_with = "revision_from_string_or_number")]
    pub revision: ClusterRevision,
}

fn revision_from_string_or_number<'de, D>(deserializer: D) -> Result<ClusterRevision, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(revision) => Ok(ClusterRevision(revision)),
        Raw::Text(revision) => revision
            .trim()
            .parse::<u64>()
            .map(ClusterRevision)
            .map_err(serde::de::Error::custom),
    }
}

// =============================================================================
// Zones, Licenses and Protocol Settings
// =============================================================================

/// Setting names accepted by a zone update
pub const ZONE_SETTING_KEYS: &[&str] = &[
    "alternate_system_provider",
    "auth_providers",
    "cache_entry_expiry",
    "create_path",
    "groupnet",
    "home_directory_umask",
    "map_untrusted",
    "name",
    "netbios_name",
    "path",
    "skeleton_directory",
    "system_provider",
    "user_mapping_rules",
];

/// Setting names accepted by an HDFS settings update
pub const HDFS_SETTING_KEYS: &[&str] = &[
    "ambari_namenode",
    "ambari_server",
    "authentication_mode",
    "default_block_size",
    "default_checksum_type",
    "odp_version",
    "root_directory",
    "service",
    "webhdfs_enabled",
];

/// An access zone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneSettings {
    pub name: String,
    /// Absolute base path of the zone, e.g. `/ifs/zones/hadoop`
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ZoneList {
    #[serde(default)]
    pub zones: Vec<ZoneSettings>,
}

/// HDFS protocol settings of an access zone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HdfsSettings {
    /// Absolute path of the HDFS root, e.g. `/ifs/zones/hadoop/hdfs`
    pub root_directory: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HdfsSettingsEnvelope {
    pub settings: HdfsSettings,
}

/// A license record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub name: String,
    pub status: String,
    /// Expiration date formatted `%Y-%m-%d`
    #[serde(default)]
    pub expiration: Option<String>,
}

impl License {
    pub fn is_active(&self) -> bool {
        matches!(
            self.status.to_lowercase().as_str(),
            "activated" | "evaluation" | "licensed"
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LicenseList {
    #[serde(default)]
    pub licenses: Vec<License>,
}

// =============================================================================
// Identities
// =============================================================================

/// Kind of a group or proxy user member
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    User,
    Group,
    Wellknown,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberKind::User => write!(f, "user"),
            MemberKind::Group => write!(f, "group"),
            MemberKind::Wellknown => write!(f, "wellknown"),
        }
    }
}

/// A reference to a user or group by name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemberRef {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MemberKind,
}

impl MemberRef {
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::User,
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Group,
        }
    }
}

impl fmt::Display for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)
    }
}

/// A resolved identity as reported by OneFS (`{"id": "GID:1025", ...}`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl Persona {
    /// The numeric part of the persona id (`UID:1025` → 1025)
    pub fn numeric_id(&self) -> Option<u32> {
        self.id
            .as_deref()
            .and_then(|id| id.split_once(':'))
            .and_then(|(_, number)| number.parse().ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthGroup {
    pub name: String,
    pub gid: Persona,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthGroupList {
    #[serde(default)]
    pub groups: Vec<AuthGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub name: String,
    pub uid: Persona,
    /// Primary group
    pub gid: Persona,
    #[serde(default)]
    pub member_of: Vec<Persona>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthUserList {
    #[serde(default)]
    pub users: Vec<AuthUser>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCreateParams {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gid: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserCreateParams {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<u32>,
    pub primary_group: MemberRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyUserCreateParams {
    pub name: String,
    pub members: Vec<MemberRef>,
}

// =============================================================================
// Namespace
// =============================================================================

/// The ACL of a namespace path as reported by OneFS
#[derive(Debug, Clone, Deserialize)]
pub struct NamespaceAcl {
    pub owner: Persona,
    pub group: Persona,
    /// Octal mode string, e.g. `"0755"`
    pub mode: String,
}

/// Owner, group and mode of a path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub owner: String,
    pub group: String,
    pub mode: u32,
}

/// An identity by numeric id, as sent in ACL updates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberObject {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: String,
}

impl MemberObject {
    pub fn uid(uid: u32) -> Self {
        Self {
            kind: "UID",
            id: format!("UID:{}", uid),
        }
    }

    pub fn gid(gid: u32) -> Self {
        Self {
            kind: "GID",
            id: format!("GID:{}", gid),
        }
    }
}

/// A mode-authoritative ACL update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AclUpdate {
    pub authoritative: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<MemberObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<MemberObject>,
}

impl AclUpdate {
    pub fn mode(mode: u32) -> Self {
        Self {
            authoritative: "mode",
            mode: Some(format!("{:o}", mode)),
            owner: None,
            group: None,
        }
    }

    pub fn ownership(owner: Option<u32>, group: Option<u32>) -> Self {
        Self {
            authoritative: "mode",
            mode: None,
            owner: owner.map(MemberObject::uid),
            group: group.map(MemberObject::gid),
        }
    }
}

// =============================================================================
// Upgrade / Feature Bits
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpgradeCluster {
    /// Absent before OneFS 8.2.0
    #[serde(default)]
    pub committed_features: Option<CommittedFeatures>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedFeatures {
    pub default_gen: u64,
    #[serde(default)]
    pub gen_bits: Vec<GenBits>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenBits {
    pub gen: u64,
    #[serde(default)]
    pub bits: Vec<u32>,
}
