//! Provisioning Events
//!
//! The provisioners report progress only through an [`EventSink`] passed
//! in by the caller. [`TracingSink`] renders events as log records;
//! [`RecordingSink`] keeps them for inspection.

use crate::domain::model::MemberRef;
use crate::identities::IdentityPhase;
use crate::onefs::classify::messages;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// How an event should be brought to the operator's attention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

/// Events emitted by the identity and directory provisioners
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProvisionEvent {
    /// The identity provisioner entered a phase
    PhaseStarted { phase: IdentityPhase },

    /// Provisioning targets the System zone
    SystemZoneDeployment { zone: String },

    // ---- Identities --------------------------------------------------------
    GroupCreated { name: String, gid: u32 },

    /// The allocated GID was taken; the next one will be tried
    GidInUse { name: String, gid: u32 },

    /// The group already existed and kept its GID
    GroupExists { name: String, gid: u32 },

    UserCreated {
        name: String,
        uid: u32,
        primary_group: String,
    },

    /// The allocated UID was taken; the next one will be tried
    UidInUse { name: String, uid: u32 },

    /// The user already existed and kept its UID
    UserExists { name: String, uid: u32 },

    UserAddedToGroup { user: String, group: String },

    UserAlreadyInGroup { user: String, uid: u32, group: String },

    ProxyUserCreated { name: String, members: Vec<MemberRef> },

    ProxyUserExists { name: String },

    AuthCacheFlushed { zone: String },

    /// A line was appended to the replay script
    ScriptAppended { path: String, line: String },

    // ---- Directories -------------------------------------------------------
    HdfsRootIsZoneRoot { root: String },

    DirectoryCreated { path: String, mode: u32 },

    DirectoryExists { path: String },

    ModeSet { path: String, mode: u32 },

    OwnershipSet {
        path: String,
        owner: String,
        group: String,
    },
}

impl ProvisionEvent {
    pub fn severity(&self) -> Severity {
        match self {
            ProvisionEvent::SystemZoneDeployment { .. }
            | ProvisionEvent::GidInUse { .. }
            | ProvisionEvent::GroupExists { .. }
            | ProvisionEvent::UidInUse { .. }
            | ProvisionEvent::UserExists { .. }
            | ProvisionEvent::UserAlreadyInGroup { .. }
            | ProvisionEvent::ProxyUserExists { .. }
            | ProvisionEvent::HdfsRootIsZoneRoot { .. }
            | ProvisionEvent::DirectoryExists { .. } => Severity::Warning,
            _ => Severity::Info,
        }
    }

    /// Short machine-readable name of the event
    pub fn kind(&self) -> &'static str {
        match self {
            ProvisionEvent::PhaseStarted { .. } => "phase_started",
            ProvisionEvent::SystemZoneDeployment { .. } => "system_zone_deployment",
            ProvisionEvent::GroupCreated { .. } => "group_created",
            ProvisionEvent::GidInUse { .. } => "gid_in_use",
            ProvisionEvent::GroupExists { .. } => "group_exists",
            ProvisionEvent::UserCreated { .. } => "user_created",
            ProvisionEvent::UidInUse { .. } => "uid_in_use",
            ProvisionEvent::UserExists { .. } => "user_exists",
            ProvisionEvent::UserAddedToGroup { .. } => "user_added_to_group",
            ProvisionEvent::UserAlreadyInGroup { .. } => "user_already_in_group",
            ProvisionEvent::ProxyUserCreated { .. } => "proxy_user_created",
            ProvisionEvent::ProxyUserExists { .. } => "proxy_user_exists",
            ProvisionEvent::AuthCacheFlushed { .. } => "auth_cache_flushed",
            ProvisionEvent::ScriptAppended { .. } => "script_appended",
            ProvisionEvent::HdfsRootIsZoneRoot { .. } => "hdfs_root_is_zone_root",
            ProvisionEvent::DirectoryCreated { .. } => "directory_created",
            ProvisionEvent::DirectoryExists { .. } => "directory_exists",
            ProvisionEvent::ModeSet { .. } => "mode_set",
            ProvisionEvent::OwnershipSet { .. } => "ownership_set",
        }
    }
}

impl fmt::Display for ProvisionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionEvent::PhaseStarted { phase } => write!(f, "{}...", phase),
            ProvisionEvent::SystemZoneDeployment { .. } => {
                write!(f, "Deploying in the System zone is not recommended.")
            }
            ProvisionEvent::GroupCreated { name, gid } => {
                write!(f, "Created the {} group with GID {}.", name, gid)
            }
            ProvisionEvent::GidInUse { gid, .. } => {
                write!(f, "{}", messages::gid_already_exists(*gid))
            }
            ProvisionEvent::GroupExists { name, .. } => {
                write!(f, "{}", messages::group_already_exists(name))
            }
            ProvisionEvent::UserCreated {
                name,
                uid,
                primary_group,
            } => write!(f, "Created the {}:{} user with UID {}.", name, primary_group, uid),
            ProvisionEvent::UidInUse { uid, .. } => {
                write!(f, "{}", messages::uid_already_exists(*uid))
            }
            ProvisionEvent::UserExists { name, .. } => {
                write!(f, "{}", messages::user_already_exists(name))
            }
            ProvisionEvent::UserAddedToGroup { user, group } => {
                write!(f, "Added the {} user to the {} group.", user, group)
            }
            ProvisionEvent::UserAlreadyInGroup { uid, group, .. } => {
                write!(f, "{}", messages::user_already_in_group(*uid, group))
            }
            ProvisionEvent::ProxyUserCreated { name, members } => {
                let members: Vec<String> = members.iter().map(ToString::to_string).collect();
                write!(
                    f,
                    "Created the {} proxy user with the following members: {}.",
                    name,
                    members.join(", ")
                )
            }
            ProvisionEvent::ProxyUserExists { name } => {
                write!(f, "{}", messages::proxy_user_already_exists(name))
            }
            ProvisionEvent::AuthCacheFlushed { zone } => {
                write!(f, "Flushed the auth cache of the {} zone.", zone)
            }
            ProvisionEvent::ScriptAppended { path, line } => write!(f, "{} >> {}", line, path),
            ProvisionEvent::HdfsRootIsZoneRoot { .. } => {
                write!(f, "The HDFS root is the same as the zone root.")
            }
            ProvisionEvent::DirectoryCreated { path, mode } => {
                write!(f, "mkdir '{}' (mode {:o})", path, mode)
            }
            ProvisionEvent::DirectoryExists { path } => write!(f, "{} already exists.", path),
            ProvisionEvent::ModeSet { path, mode } => write!(f, "chmod '{:o}' '{}'", mode, path),
            ProvisionEvent::OwnershipSet { path, owner, group } => {
                write!(f, "chown '{}:{}' '{}'", owner, group, path)
            }
        }
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// Receiver of provisioning events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ProvisionEvent);
}

/// Logs every event through `tracing` at its severity
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: ProvisionEvent) {
        match event.severity() {
            Severity::Info => info!(event = event.kind(), "{}", event),
            Severity::Warning => warn!(event = event.kind(), "{}", event),
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProvisionEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event received so far, oldest first
    pub fn events(&self) -> Vec<ProvisionEvent> {
        self.events.lock().clone()
    }

    pub fn warnings(&self) -> Vec<ProvisionEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.severity() == Severity::Warning)
            .cloned()
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: ProvisionEvent) {
        self.events.lock().push(event);
    }
}
