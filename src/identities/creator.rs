//! Identity Provisioner
//!
//! Creates the groups, users and proxy users of an [`Identities`] catalog in
//! one access zone, walking the phases of [`IdentityPhase`] in order:
//!
//! ```text
//! Idle → CreatingGroups → CreatingUsers → CreatingProxyUsers → FlushingCache → Done
//! ```
//!
//! Ids come from monotonic allocators. An id that is already taken is
//! skipped; an identity that already exists keeps its id and is reported
//! as pre-existing. Every successful action can be mirrored into a
//! [`ReplayScript`] for Linux hosts.

use crate::domain::model::MemberRef;
use crate::domain::ports::IdentityStore;
use crate::error::{Error, Result};
use crate::events::{EventSink, ProvisionEvent};
use crate::identities::{IdAllocator, IdKind, Identities, IdentityPhase};
use crate::onefs::client::{is_system_zone, SYSTEM_ZONE};
use crate::script::{ReplayScript, ScriptCommand};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

pub const DEFAULT_START_UID: u32 = 1025;
pub const DEFAULT_START_GID: u32 = 1025;

/// Consecutive "id already taken" answers tolerated for one identity
pub const DEFAULT_MAX_ID_CONFLICTS: u32 = 1024;

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct IdentityProvisionerConfig {
    /// Access zone the identities are created in
    pub zone: String,
    pub start_uid: u32,
    pub start_gid: u32,
    /// Give up on an identity after this many taken ids in a row
    pub max_id_conflicts: u32,
    /// Mirror every action into this script
    pub script_path: Option<PathBuf>,
}

impl Default for IdentityProvisionerConfig {
    fn default() -> Self {
        Self {
            zone: SYSTEM_ZONE.to_string(),
            start_uid: DEFAULT_START_UID,
            start_gid: DEFAULT_START_GID,
            max_id_conflicts: DEFAULT_MAX_ID_CONFLICTS,
            script_path: None,
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// Outcome of creating one group or user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Provisioned {
    /// The GID or UID the identity has on the cluster
    pub id: u32,
    /// The identity existed before this run
    pub preexisting: bool,
}

impl Provisioned {
    fn created(id: u32) -> Self {
        Self {
            id,
            preexisting: false,
        }
    }

    fn existing(id: u32) -> Self {
        Self {
            id,
            preexisting: true,
        }
    }
}

/// Everything a run created or found
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdentityReport {
    pub groups: BTreeMap<String, Provisioned>,
    pub users: BTreeMap<String, Provisioned>,
    /// Proxy user name → whether it already existed
    pub proxy_users: BTreeMap<String, bool>,
    /// Secondary group memberships established or confirmed
    pub memberships: usize,
}

impl IdentityReport {
    /// Number of identities this run actually created
    pub fn created(&self) -> usize {
        self.groups.values().filter(|g| !g.preexisting).count()
            + self.users.values().filter(|u| !u.preexisting).count()
            + self.proxy_users.values().filter(|existed| !**existed).count()
    }
}

// =============================================================================
// Provisioner
// =============================================================================

pub struct IdentityProvisioner<'a> {
    store: &'a dyn IdentityStore,
    events: &'a dyn EventSink,
    config: IdentityProvisionerConfig,
    script: Option<ReplayScript>,
    gids: IdAllocator,
    uids: IdAllocator,
    phase: IdentityPhase,
}

impl<'a> IdentityProvisioner<'a> {
    pub fn new(
        store: &'a dyn IdentityStore,
        events: &'a dyn EventSink,
        config: IdentityProvisionerConfig,
    ) -> Self {
        Self {
            store,
            events,
            script: config.script_path.clone().map(ReplayScript::new),
            gids: IdAllocator::new(IdKind::Gid, config.start_gid),
            uids: IdAllocator::new(IdKind::Uid, config.start_uid),
            phase: IdentityPhase::Idle,
            config,
        }
    }

    pub fn phase(&self) -> IdentityPhase {
        self.phase
    }

    pub fn zone(&self) -> &str {
        &self.config.zone
    }

    pub fn script(&self) -> Option<&ReplayScript> {
        self.script.as_ref()
    }

    /// Create every identity of `identities`, then flush the auth cache.
    ///
    /// The cache is flushed even when nothing was created, since negative
    /// entries left by an earlier partial run would hide the identities.
    pub async fn create_identities(&mut self, identities: &Identities) -> Result<IdentityReport> {
        self.phase = IdentityPhase::Idle;
        if is_system_zone(&self.config.zone) {
            self.events.emit(ProvisionEvent::SystemZoneDeployment {
                zone: self.config.zone.clone(),
            });
        }
        if let Some(script) = &self.script {
            debug!(path = %script.path().display(), "Creating the replay script");
            script.ensure_created().await?;
        }

        let plan = identities.plan();
        let mut report = IdentityReport::default();

        self.advance(IdentityPhase::CreatingGroups);
        for group in &plan.groups {
            let provisioned = self.create_group(group).await?;
            report.groups.insert(group.clone(), provisioned);
        }

        self.advance(IdentityPhase::CreatingUsers);
        for step in &plan.users {
            for group in &step.new_groups {
                let provisioned = self.create_group(group).await?;
                report.groups.insert(group.clone(), provisioned);
            }
            let provisioned = self.create_user(&step.name, &step.primary_group).await?;
            report.users.insert(step.name.clone(), provisioned);
            for group in &step.secondary_groups {
                self.add_user_to_group(&step.name, group).await?;
                report.memberships += 1;
            }
        }

        self.advance(IdentityPhase::CreatingProxyUsers);
        for (name, members) in &plan.proxy_users {
            let preexisting = self.create_proxy_user(name, members).await?;
            report.proxy_users.insert(name.clone(), preexisting);
        }

        self.advance(IdentityPhase::FlushingCache);
        self.store.flush_auth_cache(&self.config.zone).await?;
        self.events.emit(ProvisionEvent::AuthCacheFlushed {
            zone: self.config.zone.clone(),
        });

        self.advance(IdentityPhase::Done);
        Ok(report)
    }

    /// Move to `phase`, which must directly follow the current one
    fn advance(&mut self, phase: IdentityPhase) {
        debug_assert_eq!(self.phase.next(), Some(phase));
        self.phase = phase;
        if phase != IdentityPhase::Done {
            self.events.emit(ProvisionEvent::PhaseStarted { phase });
        }
    }

    /// Create a group with the next free GID, or adopt the existing group
    pub async fn create_group(&mut self, name: &str) -> Result<Provisioned> {
        let zone = self.config.zone.as_str();
        let mut conflicts = 0;
        let provisioned = loop {
            let gid = self.gids.allocate()?;
            match self.store.create_group(name, Some(gid), zone).await {
                Ok(()) => {
                    self.events.emit(ProvisionEvent::GroupCreated {
                        name: name.to_string(),
                        gid,
                    });
                    break Provisioned::created(gid);
                }
                Err(Error::Api(err)) if err.gid_already_exists(gid) => {
                    self.events.emit(ProvisionEvent::GidInUse {
                        name: name.to_string(),
                        gid,
                    });
                    conflicts += 1;
                    if conflicts >= self.config.max_id_conflicts {
                        return Err(Error::IdConflictLimit {
                            kind: IdKind::Gid,
                            name: name.to_string(),
                            attempts: conflicts,
                        });
                    }
                }
                Err(Error::Api(err)) if err.group_already_exists(name) => {
                    let gid = self.store.gid_of_group(name, zone).await?;
                    self.events.emit(ProvisionEvent::GroupExists {
                        name: name.to_string(),
                        gid,
                    });
                    break Provisioned::existing(gid);
                }
                Err(e) => return Err(e),
            }
        };

        self.record(ScriptCommand::GroupAdd {
            gid: provisioned.id,
            name: name.to_string(),
        })
        .await?;
        Ok(provisioned)
    }

    /// Create an enabled user with the next free UID, or adopt the existing user
    pub async fn create_user(&mut self, name: &str, primary_group: &str) -> Result<Provisioned> {
        let zone = self.config.zone.as_str();
        let mut conflicts = 0;
        let provisioned = loop {
            let uid = self.uids.allocate()?;
            match self.store.create_user(name, primary_group, Some(uid), zone).await {
                Ok(()) => {
                    self.events.emit(ProvisionEvent::UserCreated {
                        name: name.to_string(),
                        uid,
                        primary_group: primary_group.to_string(),
                    });
                    break Provisioned::created(uid);
                }
                Err(Error::Api(err)) if err.uid_already_exists(uid) => {
                    self.events.emit(ProvisionEvent::UidInUse {
                        name: name.to_string(),
                        uid,
                    });
                    conflicts += 1;
                    if conflicts >= self.config.max_id_conflicts {
                        return Err(Error::IdConflictLimit {
                            kind: IdKind::Uid,
                            name: name.to_string(),
                            attempts: conflicts,
                        });
                    }
                }
                Err(Error::Api(err)) if err.user_already_exists(name) => {
                    let uid = self.store.uid_of_user(name, zone).await?;
                    self.events.emit(ProvisionEvent::UserExists {
                        name: name.to_string(),
                        uid,
                    });
                    break Provisioned::existing(uid);
                }
                Err(e) => return Err(e),
            }
        };

        if self.script.is_some() {
            // A pre-existing user may have a different primary group than the catalog's.
            let primary_group = self.store.primary_group_of_user(name, zone).await?;
            let gid = self.store.gid_of_group(&primary_group, zone).await?;
            self.record(ScriptCommand::UserAdd {
                uid: provisioned.id,
                gid,
                name: name.to_string(),
            })
            .await?;
        }
        Ok(provisioned)
    }

    /// Add a user to a secondary group; existing memberships are kept
    pub async fn add_user_to_group(&self, user: &str, group: &str) -> Result<()> {
        let zone = self.config.zone.as_str();
        match self.store.add_user_to_group(user, group, zone).await {
            Ok(()) => self.events.emit(ProvisionEvent::UserAddedToGroup {
                user: user.to_string(),
                group: group.to_string(),
            }),
            Err(Error::Api(err)) => {
                let uid = match self.store.uid_of_user(user, zone).await {
                    Ok(uid) => uid,
                    Err(lookup) => {
                        debug!(user, error = %lookup, "Cannot look up the UID of {}", user);
                        return Err(Error::Api(err));
                    }
                };
                if !err.user_already_in_group(uid, group) {
                    return Err(Error::Api(err));
                }
                self.events.emit(ProvisionEvent::UserAlreadyInGroup {
                    user: user.to_string(),
                    uid,
                    group: group.to_string(),
                });
            }
            Err(e) => return Err(e),
        }

        self.record(ScriptCommand::UserMod {
            group: group.to_string(),
            user: user.to_string(),
        })
        .await
    }

    /// Create an HDFS proxy user; returns whether it already existed.
    /// The members of an existing proxy user are left as they are.
    pub async fn create_proxy_user(&self, name: &str, members: &[MemberRef]) -> Result<bool> {
        match self
            .store
            .create_proxy_user(name, members, &self.config.zone)
            .await
        {
            Ok(()) => {
                self.events.emit(ProvisionEvent::ProxyUserCreated {
                    name: name.to_string(),
                    members: members.to_vec(),
                });
                Ok(false)
            }
            Err(Error::Api(err)) if err.proxy_user_already_exists(name) => {
                self.events.emit(ProvisionEvent::ProxyUserExists {
                    name: name.to_string(),
                });
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }

    async fn record(&self, command: ScriptCommand) -> Result<()> {
        if let Some(script) = &self.script {
            let line = script.append(&command).await?;
            self.events.emit(ProvisionEvent::ScriptAppended {
                path: script.path().display().to_string(),
                line,
            });
        }
        Ok(())
    }
}
