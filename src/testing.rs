//! In-memory OneFS cluster for tests
//!
//! [`FakeCluster`] holds the state of a small cluster (zones, licenses,
//! identities, directories) and hands out [`RemoteStorageApi`] transports
//! sharing it. Failures use the same message templates as OneFS, so the
//! real classification and reconciliation paths are exercised.

use crate::domain::model::*;
use crate::domain::ports::{RemoteResult, RemoteStorageApi};
use crate::error::Result;
use crate::onefs::binding::ApiBinding;
use crate::onefs::classify::{messages, RemoteError};
use crate::onefs::client::{Client, ClientConfig};
use crate::onefs::release::ClusterRevision;
use crate::onefs::retry::RetryPolicy;
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Url;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct FakeGroup {
    zone: String,
    name: String,
    gid: u32,
}

#[derive(Debug, Clone)]
struct FakeUser {
    zone: String,
    name: String,
    uid: u32,
    primary_gid: u32,
    /// Secondary groups
    gids: BTreeSet<u32>,
}

#[derive(Debug, Clone, Copy)]
struct FakeAcl {
    uid: u32,
    gid: u32,
    mode: u32,
}

#[derive(Debug, Default)]
struct State {
    nodes: Vec<ClusterRevision>,
    licenses: BTreeMap<String, License>,
    zones: Vec<ZoneSettings>,
    /// Keyed by lowercase zone name
    hdfs: BTreeMap<String, HdfsSettings>,
    groups: Vec<FakeGroup>,
    users: Vec<FakeUser>,
    proxy_users: BTreeMap<(String, String), Vec<MemberRef>>,
    directories: BTreeMap<String, FakeAcl>,
    committed: Option<CommittedFeatures>,
    failures: BTreeMap<String, VecDeque<Vec<String>>>,
    mutations: Vec<String>,
}

impl State {
    fn fail(&mut self, operation: &str) -> RemoteResult<()> {
        match self.failures.get_mut(operation).and_then(VecDeque::pop_front) {
            Some(failure) => {
                let failure: Vec<&str> = failure.iter().map(String::as_str).collect();
                Err(RemoteError::api(500, &failure))
            }
            None => Ok(()),
        }
    }

    fn zone(&self, zone: &str) -> RemoteResult<&ZoneSettings> {
        self.zones
            .iter()
            .find(|z| z.name.eq_ignore_ascii_case(zone))
            .ok_or_else(|| api_error(404, messages::zone_not_found(zone)))
    }

    fn zone_key(&self, zone: &str) -> RemoteResult<String> {
        Ok(self.zone(zone)?.name.to_lowercase())
    }

    fn group(&self, name: &str, zone: &str) -> Option<&FakeGroup> {
        self.groups.iter().find(|g| g.zone == zone && g.name == name)
    }

    fn user(&self, name: &str, zone: &str) -> Option<&FakeUser> {
        self.users.iter().find(|u| u.zone == zone && u.name == name)
    }

    fn group_name(&self, gid: u32, zone: &str) -> Option<String> {
        self.groups
            .iter()
            .find(|g| g.zone == zone && g.gid == gid)
            .map(|g| g.name.clone())
    }

    fn group_persona(&self, gid: u32, zone: &str) -> Persona {
        Persona {
            id: Some(format!("GID:{}", gid)),
            name: self.group_name(gid, zone),
            kind: Some("group".to_string()),
        }
    }

    fn auth_user(&self, user: &FakeUser, query_member_of: bool) -> AuthUser {
        let member_of = if query_member_of {
            let mut gids = user.gids.clone();
            gids.insert(user.primary_gid);
            gids.into_iter()
                .map(|gid| self.group_persona(gid, &user.zone))
                .collect()
        } else {
            Vec::new()
        };
        AuthUser {
            name: user.name.clone(),
            uid: Persona {
                id: Some(format!("UID:{}", user.uid)),
                name: Some(user.name.clone()),
                kind: Some("user".to_string()),
            },
            gid: self.group_persona(user.primary_gid, &user.zone),
            member_of,
        }
    }

    fn directory(&self, path: &str) -> RemoteResult<FakeAcl> {
        self.directories
            .get(normalize(path))
            .copied()
            .ok_or_else(|| api_error(404, format!("Path not found: {}", path)))
    }
}

fn api_error(status: u16, message: impl AsRef<str>) -> RemoteError {
    RemoteError::api(status, &[message.as_ref()])
}

fn normalize(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

// =============================================================================
// Cluster
// =============================================================================

/// A fake OneFS cluster with a `System` zone at `/ifs` and a `hadoop`
/// zone at `/ifs/zones/hadoop`, HDFS licensed
#[derive(Debug, Clone)]
pub struct FakeCluster {
    state: Arc<Mutex<State>>,
}

impl FakeCluster {
    pub fn new(revision: ClusterRevision) -> Self {
        let cluster = Self {
            state: Arc::new(Mutex::new(State {
                nodes: vec![revision; 3],
                ..Default::default()
            })),
        };
        cluster.add_zone("System", "/ifs", "/ifs/hdfs");
        cluster.add_zone("hadoop", "/ifs/zones/hadoop", "/ifs/zones/hadoop/hdfs");
        cluster.set_license("HDFS", "Activated", None);
        cluster
    }

    /// A transport sharing this cluster's state
    pub fn api(&self) -> Box<dyn RemoteStorageApi> {
        Box::new(FakeApi {
            state: Arc::clone(&self.state),
        })
    }

    pub fn config(&self, zone: &str) -> ClientConfig {
        ClientConfig {
            address: "127.0.0.1".to_string(),
            password: "fake".to_string(),
            default_zone: zone.to_string(),
            retry: RetryPolicy::unbounded(Duration::ZERO),
            ..Default::default()
        }
    }

    pub async fn client(&self, zone: &str) -> Result<Client> {
        Client::with_api(self.config(zone), self.api()).await
    }

    pub fn add_zone(&self, name: &str, path: &str, hdfs_root: &str) {
        let mut state = self.state.lock();
        state.zones.push(ZoneSettings {
            name: name.to_string(),
            path: path.to_string(),
            ..Default::default()
        });
        state.hdfs.insert(
            name.to_lowercase(),
            HdfsSettings {
                root_directory: hdfs_root.to_string(),
                ..Default::default()
            },
        );
    }

    pub fn set_hdfs_root(&self, zone: &str, root: &str) {
        let mut state = self.state.lock();
        if let Some(settings) = state.hdfs.get_mut(&zone.to_lowercase()) {
            settings.root_directory = root.to_string();
        }
    }

    pub fn set_license(&self, name: &str, status: &str, expiration: Option<&str>) {
        self.state.lock().licenses.insert(
            name.to_string(),
            License {
                name: name.to_string(),
                status: status.to_string(),
                expiration: expiration.map(str::to_string),
            },
        );
    }

    pub fn set_node_revisions(&self, revisions: &[ClusterRevision]) {
        self.state.lock().nodes = revisions.to_vec();
    }

    pub fn set_committed_features(&self, committed: CommittedFeatures) {
        self.state.lock().committed = Some(committed);
    }

    /// Add a group without any conflict checks
    pub fn add_group(&self, name: &str, gid: u32, zone: &str) {
        self.state.lock().groups.push(FakeGroup {
            zone: zone.to_lowercase(),
            name: name.to_string(),
            gid,
        });
    }

    /// A second group record with the same name, as a local/LDAP clash would produce
    pub fn add_duplicate_group(&self, name: &str, gid: u32, zone: &str) {
        self.add_group(name, gid, zone);
    }

    /// Add a user whose primary group must already exist
    pub fn add_user(&self, name: &str, uid: u32, primary_group: &str, zone: &str) {
        let mut state = self.state.lock();
        let zone = zone.to_lowercase();
        let primary_gid = state.group(primary_group, &zone).map_or(0, |g| g.gid);
        state.users.push(FakeUser {
            zone,
            name: name.to_string(),
            uid,
            primary_gid,
            gids: BTreeSet::new(),
        });
    }

    /// Make the next call of `operation` fail with `messages`
    pub fn fail_next(&self, operation: &str, messages: &[&str]) {
        self.state
            .lock()
            .failures
            .entry(operation.to_string())
            .or_default()
            .push_back(messages.iter().map(|m| m.to_string()).collect());
    }

    /// Every successful mutating call, oldest first
    pub fn mutations(&self) -> Vec<String> {
        self.state.lock().mutations.clone()
    }

    pub fn clear_mutations(&self) {
        self.state.lock().mutations.clear();
    }

    /// Sorted names of the groups in a zone
    pub fn group_names(&self, zone: &str) -> Vec<String> {
        let zone = zone.to_lowercase();
        let names: BTreeSet<String> = self
            .state
            .lock()
            .groups
            .iter()
            .filter(|g| g.zone == zone)
            .map(|g| g.name.clone())
            .collect();
        names.into_iter().collect()
    }

    /// Owner UID, group GID and mode of a directory
    pub fn acl(&self, path: &str) -> Option<(u32, u32, u32)> {
        self.state
            .lock()
            .directories
            .get(normalize(path))
            .map(|acl| (acl.uid, acl.gid, acl.mode))
    }
}

// =============================================================================
// Transport
// =============================================================================

struct FakeApi {
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl RemoteStorageApi for FakeApi {
    fn set_host(&mut self, _host: &Url) {}

    async fn cluster_version(&self, _binding: ApiBinding) -> RemoteResult<ClusterVersion> {
        let mut state = self.state.lock();
        state.fail("cluster_version")?;
        Ok(ClusterVersion {
            nodes: state
                .nodes
                .iter()
                .enumerate()
                .map(|(index, revision)| NodeVersion {
                    id: index as u64 + 1,
                    revision: *revision,
                })
                .collect(),
        })
    }

    async fn upgrade_cluster(&self, _binding: ApiBinding) -> RemoteResult<UpgradeCluster> {
        let mut state = self.state.lock();
        state.fail("upgrade_cluster")?;
        Ok(UpgradeCluster {
            committed_features: state.committed.clone(),
        })
    }

    async fn get_license(&self, _binding: ApiBinding, name: &str) -> RemoteResult<LicenseList> {
        let mut state = self.state.lock();
        state.fail("get_license")?;
        Ok(LicenseList {
            licenses: state.licenses.get(name).cloned().into_iter().collect(),
        })
    }

    async fn list_zones(&self, _binding: ApiBinding) -> RemoteResult<ZoneList> {
        let mut state = self.state.lock();
        state.fail("list_zones")?;
        Ok(ZoneList {
            zones: state.zones.clone(),
        })
    }

    async fn update_zone(
        &self,
        _binding: ApiBinding,
        zone: &str,
        settings: &Map<String, Value>,
    ) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.fail("update_zone")?;
        let key = state.zone_key(zone)?;
        if let Some(settings_of_zone) = state.zones.iter_mut().find(|z| z.name.to_lowercase() == key) {
            settings_of_zone.extra.extend(settings.clone());
        }
        state.mutations.push(format!("update_zone {}", zone));
        Ok(())
    }

    async fn create_group(
        &self,
        _binding: ApiBinding,
        params: &GroupCreateParams,
        zone: &str,
    ) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.fail("create_group")?;
        let key = state.zone_key(zone)?;
        if state.group(&params.name, &key).is_some() {
            return Err(api_error(409, messages::group_already_exists(&params.name)));
        }
        let gid = match params.gid {
            Some(gid) if state.group_name(gid, &key).is_some() => {
                return Err(api_error(409, messages::gid_already_exists(gid)));
            }
            Some(gid) => gid,
            None => state.groups.iter().map(|g| g.gid).max().unwrap_or(1_000_000) + 1,
        };
        state.groups.push(FakeGroup {
            zone: key,
            name: params.name.clone(),
            gid,
        });
        state.mutations.push(format!("create_group {}", params.name));
        Ok(())
    }

    async fn delete_group(&self, _binding: ApiBinding, name: &str, zone: &str) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.fail("delete_group")?;
        let key = state.zone_key(zone)?;
        if state.group(name, &key).is_none() {
            return Err(api_error(404, messages::group_not_found(name)));
        }
        state.groups.retain(|g| !(g.zone == key && g.name == name));
        state.mutations.push(format!("delete_group {}", name));
        Ok(())
    }

    async fn get_group(
        &self,
        _binding: ApiBinding,
        name: &str,
        zone: &str,
    ) -> RemoteResult<AuthGroupList> {
        let mut state = self.state.lock();
        state.fail("get_group")?;
        let key = state.zone_key(zone)?;
        let groups: Vec<AuthGroup> = state
            .groups
            .iter()
            .filter(|g| g.zone == key && g.name == name)
            .map(|g| AuthGroup {
                name: g.name.clone(),
                gid: Persona {
                    id: Some(format!("GID:{}", g.gid)),
                    name: Some(g.name.clone()),
                    kind: Some("group".to_string()),
                },
            })
            .collect();
        if groups.is_empty() {
            return Err(api_error(404, messages::group_not_found(name)));
        }
        Ok(AuthGroupList { groups })
    }

    async fn list_groups(&self, _binding: ApiBinding, zone: &str) -> RemoteResult<AuthGroupList> {
        let mut state = self.state.lock();
        state.fail("list_groups")?;
        let key = state.zone_key(zone)?;
        Ok(AuthGroupList {
            groups: state
                .groups
                .iter()
                .filter(|g| g.zone == key)
                .map(|g| AuthGroup {
                    name: g.name.clone(),
                    gid: state.group_persona(g.gid, &key),
                })
                .collect(),
        })
    }

    async fn create_user(
        &self,
        _binding: ApiBinding,
        params: &UserCreateParams,
        zone: &str,
    ) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.fail("create_user")?;
        let key = state.zone_key(zone)?;
        if state.user(&params.name, &key).is_some() {
            return Err(api_error(409, messages::user_already_exists(&params.name)));
        }
        let primary_group = &params.primary_group.name;
        let primary_gid = state
            .group(primary_group, &key)
            .map(|g| g.gid)
            .ok_or_else(|| api_error(400, messages::group_unresolvable(primary_group)))?;
        let uid = match params.uid {
            Some(uid) if state.users.iter().any(|u| u.zone == key && u.uid == uid) => {
                return Err(api_error(409, messages::uid_already_exists(uid)));
            }
            Some(uid) => uid,
            None => state.users.iter().map(|u| u.uid).max().unwrap_or(1_000_000) + 1,
        };
        state.users.push(FakeUser {
            zone: key,
            name: params.name.clone(),
            uid,
            primary_gid,
            gids: BTreeSet::new(),
        });
        state
            .mutations
            .push(format!("create_user {} {}", params.name, primary_group));
        Ok(())
    }

    async fn delete_user(&self, _binding: ApiBinding, name: &str, zone: &str) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.fail("delete_user")?;
        let key = state.zone_key(zone)?;
        if state.user(name, &key).is_none() {
            return Err(api_error(404, messages::user_not_found(name)));
        }
        state.users.retain(|u| !(u.zone == key && u.name == name));
        state.mutations.push(format!("delete_user {}", name));
        Ok(())
    }

    async fn get_user(
        &self,
        _binding: ApiBinding,
        name: &str,
        query_member_of: bool,
        zone: &str,
    ) -> RemoteResult<AuthUserList> {
        let mut state = self.state.lock();
        state.fail("get_user")?;
        let key = state.zone_key(zone)?;
        let user = state
            .user(name, &key)
            .ok_or_else(|| api_error(404, messages::user_not_found(name)))?;
        Ok(AuthUserList {
            users: vec![state.auth_user(user, query_member_of)],
        })
    }

    async fn list_users(&self, _binding: ApiBinding, zone: &str) -> RemoteResult<AuthUserList> {
        let mut state = self.state.lock();
        state.fail("list_users")?;
        let key = state.zone_key(zone)?;
        Ok(AuthUserList {
            users: state
                .users
                .iter()
                .filter(|u| u.zone == key)
                .map(|u| state.auth_user(u, false))
                .collect(),
        })
    }

    async fn add_group_member(
        &self,
        _binding: ApiBinding,
        group: &str,
        member: &MemberRef,
        zone: &str,
    ) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.fail("add_group_member")?;
        let key = state.zone_key(zone)?;
        let gid = state
            .group(group, &key)
            .map(|g| g.gid)
            .ok_or_else(|| api_error(404, messages::group_not_found(group)))?;
        let user = state
            .users
            .iter_mut()
            .find(|u| u.zone == key && u.name == member.name)
            .ok_or_else(|| api_error(400, messages::user_unresolvable(&member.name)))?;
        if !user.gids.insert(gid) {
            let uid = user.uid;
            return Err(api_error(409, messages::user_already_in_group(uid, group)));
        }
        state
            .mutations
            .push(format!("add_group_member {} {}", group, member.name));
        Ok(())
    }

    async fn flush_auth_cache(&self, _binding: ApiBinding, zone: &str) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.fail("flush_auth_cache")?;
        state.zone_key(zone)?;
        state.mutations.push(format!("flush_auth_cache {}", zone));
        Ok(())
    }

    async fn create_proxy_user(
        &self,
        _binding: ApiBinding,
        params: &ProxyUserCreateParams,
        zone: &str,
    ) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.fail("create_proxy_user")?;
        let key = (state.zone_key(zone)?, params.name.clone());
        if state.proxy_users.contains_key(&key) {
            return Err(api_error(409, messages::proxy_user_already_exists(&params.name)));
        }
        state.proxy_users.insert(key, params.members.clone());
        state
            .mutations
            .push(format!("create_proxy_user {}", params.name));
        Ok(())
    }

    async fn delete_proxy_user(
        &self,
        _binding: ApiBinding,
        name: &str,
        zone: &str,
    ) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.fail("delete_proxy_user")?;
        let key = (state.zone_key(zone)?, name.to_string());
        if state.proxy_users.remove(&key).is_none() {
            return Err(api_error(404, format!("Proxyuser '{}' not found", name)));
        }
        state.mutations.push(format!("delete_proxy_user {}", name));
        Ok(())
    }

    async fn get_hdfs_settings(&self, _binding: ApiBinding, zone: &str) -> RemoteResult<HdfsSettings> {
        let mut state = self.state.lock();
        state.fail("get_hdfs_settings")?;
        let key = state.zone_key(zone)?;
        Ok(state.hdfs.get(&key).cloned().unwrap_or_default())
    }

    async fn update_hdfs_settings(
        &self,
        _binding: ApiBinding,
        settings: &Map<String, Value>,
        zone: &str,
    ) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.fail("update_hdfs_settings")?;
        let key = state.zone_key(zone)?;
        let hdfs = state.hdfs.entry(key).or_default();
        for (name, value) in settings {
            match (name.as_str(), value.as_str()) {
                ("root_directory", Some(root)) => hdfs.root_directory = root.to_string(),
                _ => {
                    hdfs.extra.insert(name.clone(), value.clone());
                }
            }
        }
        state.mutations.push(format!("update_hdfs_settings {}", zone));
        Ok(())
    }

    async fn create_directory(
        &self,
        _binding: ApiBinding,
        path: &str,
        mode: u32,
        _recursive: bool,
        _overwrite: bool,
    ) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.fail("create_directory")?;
        let path = normalize(path).to_string();
        if state.directories.contains_key(&path) {
            return Err(RemoteError::api(409, &[messages::DIR_PATH_ALREADY_EXISTS]));
        }
        state.directories.insert(path.clone(), FakeAcl { uid: 0, gid: 0, mode });
        state.mutations.push(format!("mkdir {} {:o}", path, mode));
        Ok(())
    }

    async fn delete_directory(
        &self,
        _binding: ApiBinding,
        path: &str,
        _recursive: bool,
    ) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.fail("delete_directory")?;
        state.directory(path)?;
        state.directories.remove(normalize(path));
        state.mutations.push(format!("rmdir {}", normalize(path)));
        Ok(())
    }

    async fn get_acl(&self, _binding: ApiBinding, path: &str) -> RemoteResult<NamespaceAcl> {
        let mut state = self.state.lock();
        state.fail("get_acl")?;
        let acl = state.directory(path)?;
        let owner = state
            .users
            .iter()
            .find(|u| u.uid == acl.uid)
            .map(|u| u.name.clone());
        let group = state
            .groups
            .iter()
            .find(|g| g.gid == acl.gid)
            .map(|g| g.name.clone());
        Ok(NamespaceAcl {
            owner: Persona {
                id: Some(format!("UID:{}", acl.uid)),
                name: owner.or_else(|| (acl.uid == 0).then(|| "root".to_string())),
                kind: Some("user".to_string()),
            },
            group: Persona {
                id: Some(format!("GID:{}", acl.gid)),
                name: group.or_else(|| (acl.gid == 0).then(|| "wheel".to_string())),
                kind: Some("group".to_string()),
            },
            mode: format!("{:04o}", acl.mode),
        })
    }

    async fn set_acl(&self, _binding: ApiBinding, path: &str, update: &AclUpdate) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.fail("set_acl")?;
        let mut acl = state.directory(path)?;
        let mut changes = Vec::new();
        if let Some(mode) = &update.mode {
            acl.mode = u32::from_str_radix(mode, 8)
                .map_err(|_| api_error(400, format!("Invalid mode '{}'", mode)))?;
            changes.push(format!("mode={}", mode));
        }
        if let Some(owner) = &update.owner {
            acl.uid = persona_number(&owner.id)?;
            changes.push(format!("owner={}", owner.id));
        }
        if let Some(group) = &update.group {
            acl.gid = persona_number(&group.id)?;
            changes.push(format!("group={}", group.id));
        }
        let path = normalize(path).to_string();
        state
            .mutations
            .push(format!("set_acl {} {}", path, changes.join(" ")));
        state.directories.insert(path, acl);
        Ok(())
    }
}

fn persona_number(id: &str) -> RemoteResult<u32> {
    id.split_once(':')
        .and_then(|(_, number)| number.parse().ok())
        .ok_or_else(|| api_error(400, format!("Invalid persona '{}'", id)))
}
