//! Remote Storage Client
//!
//! The façade over the OneFS platform API. A client pins a single node
//! address at construction, discovers the cluster revision, selects the
//! matching API binding and routes every call through [`accesses_onefs`].

use crate::domain::model::*;
use crate::domain::ports::{IdentityStore, NamespaceStore, RemoteResult, RemoteStorageApi};
use crate::error::{Error, Result};
use crate::onefs::binding::{binding_for_revision, ApiBinding};
use crate::onefs::feature::{is_committed, OneFsFeature};
use crate::onefs::http::HttpApi;
use crate::onefs::release::ClusterRevision;
use crate::onefs::retry::{accesses_onefs, RetryPolicy};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Url;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing::debug;

/// Name of the administrative zone every cluster has
pub const SYSTEM_ZONE: &str = "System";

/// Check whether a zone name refers to the System zone
pub fn is_system_zone(zone: &str) -> bool {
    zone.eq_ignore_ascii_case(SYSTEM_ZONE)
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for connecting to OneFS
#[derive(Clone)]
pub struct ClientConfig {
    /// Name or IP address of the cluster (a SmartConnect name is fine)
    pub address: String,
    /// Platform API port
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Zone used by operations that are not given one explicitly
    pub default_zone: String,
    /// Verify the HTTPS certificate presented by OneFS
    pub verify_tls: bool,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retry policy for "temporarily unavailable" answers
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: 8080,
            username: "root".to_string(),
            password: String::new(),
            default_zone: SYSTEM_ZONE.to_string(),
            verify_tls: true,
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("default_zone", &self.default_zone)
            .field("verify_tls", &self.verify_tls)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

// =============================================================================
// Client
// =============================================================================

/// A connection to one OneFS cluster
pub struct Client {
    api: Box<dyn RemoteStorageApi>,
    host: Url,
    /// The name the host was resolved from, unset when the host was set directly
    address: Option<String>,
    default_zone: String,
    retry: RetryPolicy,
    revision: ClusterRevision,
    binding: ApiBinding,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("host", &self.host.as_str())
            .field("address", &self.address)
            .field("default_zone", &self.default_zone)
            .field("revision", &self.revision)
            .field("binding", &self.binding)
            .finish()
    }
}

impl Client {
    /// Connect to OneFS over HTTPS and check that the default zone exists
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let api = HttpApi::new(&config)?;
        Self::with_api(config, Box::new(api)).await
    }

    /// Connect to OneFS and also check that HDFS is licensed
    pub async fn for_hdfs(config: ClientConfig) -> Result<Self> {
        let api = HttpApi::new(&config)?;
        Self::for_hdfs_with_api(config, Box::new(api)).await
    }

    /// Connect through an existing transport
    pub async fn with_api(config: ClientConfig, api: Box<dyn RemoteStorageApi>) -> Result<Self> {
        debug!("Connecting to the OneFS cluster...");

        let mut host = Url::parse("https://localhost")
            .map_err(|e| Error::Configuration(format!("Invalid OneFS URL: {}", e)))?;
        host.set_port(Some(config.port))
            .map_err(|_| Error::Configuration(format!("Invalid OneFS port {}", config.port)))?;

        let mut client = Self {
            api,
            host,
            address: None,
            default_zone: config.default_zone,
            retry: config.retry,
            revision: ClusterRevision::new(0),
            // The first binding able to report the cluster version
            binding: ApiBinding::DISCOVERY,
        };
        client.set_address(&config.address).await?;
        debug!(host = %client.host, "OneFS interactions will go to {}.", client.host);

        let zone = client.default_zone.clone();
        client.check_zone(&zone).await?;
        debug!("The {} zone exists.", zone);
        Ok(client)
    }

    /// [`Client::with_api`] followed by an HDFS license check
    pub async fn for_hdfs_with_api(
        config: ClientConfig,
        api: Box<dyn RemoteStorageApi>,
    ) -> Result<Self> {
        let client = Self::with_api(config, api).await?;
        client.check_license("HDFS").await?;
        debug!("HDFS is licensed.");
        Ok(client)
    }

    // =========================================================================
    // Connection Target
    // =========================================================================

    /// The address OneFS is reached at
    pub fn address(&self) -> String {
        match &self.address {
            Some(address) => address.clone(),
            None => self.host.host_str().unwrap_or_default().to_string(),
        }
    }

    /// Resolve `address` to a single node and connect to it.
    ///
    /// SmartConnect names hand out a different node per lookup, and
    /// configuration changes propagate between nodes with a delay, so every
    /// request of a run goes to the node resolved here.
    pub async fn set_address(&mut self, address: &str) -> Result<()> {
        let port = self.host.port_or_known_default().unwrap_or(8080);
        let resolved: Vec<SocketAddr> = tokio::net::lookup_host((address, port))
            .await
            .map_err(|e| Error::Connection {
                reason: format!("{}: {}", address, e),
            })?
            .collect();
        let ip = resolved
            .iter()
            .map(SocketAddr::ip)
            .find(IpAddr::is_ipv4)
            .or_else(|| resolved.first().map(SocketAddr::ip))
            .ok_or_else(|| Error::Connection {
                reason: format!("{}: no addresses found", address),
            })?;

        let mut host = self.host.clone();
        host.set_ip_host(ip)
            .map_err(|_| Error::Configuration(format!("Cannot use {} as a OneFS host", ip)))?;
        self.set_host(host).await?;
        self.address = Some(address.to_string());
        Ok(())
    }

    /// The URL requests are sent to
    pub fn host(&self) -> &Url {
        &self.host
    }

    /// Point the client at a different URL and re-derive the API binding
    pub async fn set_host(&mut self, host: Url) -> Result<()> {
        self.api.set_host(&host);
        self.host = host;
        self.address = None;
        self.refresh_binding().await
    }

    async fn refresh_binding(&mut self) -> Result<()> {
        let revision = self.revision().await?;
        let binding = binding_for_revision(revision, false)?;
        debug!(%revision, %binding, "Using the OneFS {} API binding.", binding);
        self.revision = revision;
        self.binding = binding;
        Ok(())
    }

    /// The API binding selected for the connected cluster
    pub fn binding(&self) -> ApiBinding {
        self.binding
    }

    /// The revision discovered when the binding was selected
    pub fn cluster_revision(&self) -> ClusterRevision {
        self.revision
    }

    pub fn default_zone(&self) -> &str {
        &self.default_zone
    }

    fn zone<'a>(&'a self, zone: Option<&'a str>) -> &'a str {
        zone.unwrap_or(self.default_zone.as_str())
    }

    // =========================================================================
    // Remote Calls
    // =========================================================================

    async fn call<'a, T, F, Fut>(&'a self, f: F) -> Result<T>
    where
        F: Fn(&'a dyn RemoteStorageApi, ApiBinding) -> Fut,
        Fut: Future<Output = RemoteResult<T>>,
    {
        self.call_with(self.binding, f).await
    }

    async fn call_with<'a, T, F, Fut>(&'a self, binding: ApiBinding, f: F) -> Result<T>
    where
        F: Fn(&'a dyn RemoteStorageApi, ApiBinding) -> Fut,
        Fut: Future<Output = RemoteResult<T>>,
    {
        let api = self.api.as_ref();
        accesses_onefs(&self.retry, || f(api, binding)).await
    }

    // =========================================================================
    // Cluster Version
    // =========================================================================

    /// The revision of every node, keyed by node id
    pub async fn revisions(&self) -> Result<BTreeMap<u64, ClusterRevision>> {
        // Bindings older than discovery cannot report the cluster version.
        let binding = self.binding.max(ApiBinding::DISCOVERY);
        let version = self
            .call_with(binding, |api, binding| api.cluster_version(binding))
            .await?;
        Ok(version
            .nodes
            .into_iter()
            .map(|node| (node.id, node.revision))
            .collect())
    }

    /// The revision of the cluster; every node must agree on it
    pub async fn revision(&self) -> Result<ClusterRevision> {
        let revisions: BTreeSet<ClusterRevision> =
            self.revisions().await?.into_values().collect();
        let mut iter = revisions.iter();
        match (iter.next(), iter.next()) {
            (Some(revision), None) => Ok(*revision),
            (None, _) => Err(Error::UndeterminableVersion(
                "no node reported a revision".to_string(),
            )),
            (Some(_), Some(_)) => Err(Error::MixedMode {
                revisions: revisions
                    .iter()
                    .map(ClusterRevision::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// Check whether a feature is committed on the cluster
    pub async fn feature_is_supported(&self, feature: OneFsFeature) -> Result<bool> {
        let unsupported = || {
            Error::UnsupportedOperation(
                "OneFS 8.2.0 or later is required for feature flag support.".to_string(),
            )
        };
        if !self.binding.reports_committed_features() {
            return Err(unsupported());
        }
        let upgrade = self.call(|api, binding| api.upgrade_cluster(binding)).await?;
        let committed = upgrade.committed_features.ok_or_else(unsupported)?;
        Ok(is_committed(feature, &committed))
    }

    // =========================================================================
    // Licenses
    // =========================================================================

    async fn licenses(&self, name: &str) -> Result<Vec<License>> {
        Ok(self
            .call(|api, binding| api.get_license(binding, name))
            .await?
            .licenses)
    }

    /// Check whether any license record for `name` is active
    pub async fn has_license(&self, name: &str) -> Result<bool> {
        Ok(self.licenses(name).await?.iter().any(License::is_active))
    }

    /// Fail with `MissingLicense` or `ExpiredLicense` unless `name` is licensed
    pub async fn check_license(&self, name: &str) -> Result<()> {
        let licenses = self.licenses(name).await?;
        let license = match licenses.as_slice() {
            [license] => license,
            [] => {
                return Err(Error::MissingLicense {
                    name: name.to_string(),
                })
            }
            _ => {
                return Err(Error::InvalidValue(format!(
                    "Expected one {} license record, found {}.",
                    name,
                    licenses.len()
                )))
            }
        };
        check_license_record(license, name, chrono::Local::now().date_naive())
    }

    // =========================================================================
    // Zones
    // =========================================================================

    async fn list_zones(&self) -> Result<Vec<ZoneSettings>> {
        Ok(self.call(|api, binding| api.list_zones(binding)).await?.zones)
    }

    /// Names of every access zone
    pub async fn zones(&self) -> Result<Vec<String>> {
        Ok(self
            .list_zones()
            .await?
            .into_iter()
            .map(|zone| zone.name)
            .collect())
    }

    /// Settings of a zone; zone names are case-insensitive
    pub async fn zone_settings(&self, zone: Option<&str>) -> Result<ZoneSettings> {
        let name = self.zone(zone);
        self.list_zones()
            .await?
            .into_iter()
            .find(|zone| zone.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::MissingZone {
                name: name.to_string(),
            })
    }

    pub async fn has_zone(&self, name: &str) -> Result<bool> {
        match self.zone_settings(Some(name)).await {
            Ok(_) => Ok(true),
            Err(Error::MissingZone { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn check_zone(&self, name: &str) -> Result<()> {
        if self.has_zone(name).await? {
            Ok(())
        } else {
            Err(Error::MissingZone {
                name: name.to_string(),
            })
        }
    }

    /// Update zone settings; unknown setting names are rejected before any call
    pub async fn update_zone_settings(
        &self,
        settings: &Map<String, Value>,
        zone: Option<&str>,
    ) -> Result<()> {
        validate_settings(settings, ZONE_SETTING_KEYS, "zone")?;
        let zone = self.zone(zone);
        self.call(|api, binding| api.update_zone(binding, zone, settings))
            .await
    }

    // =========================================================================
    // HDFS
    // =========================================================================

    pub async fn hdfs_settings(&self, zone: Option<&str>) -> Result<HdfsSettings> {
        let zone = self.zone(zone);
        self.call(|api, binding| api.get_hdfs_settings(binding, zone))
            .await
    }

    /// Update HDFS settings; unknown setting names are rejected before any call
    pub async fn update_hdfs_settings(
        &self,
        settings: &Map<String, Value>,
        zone: Option<&str>,
    ) -> Result<()> {
        validate_settings(settings, HDFS_SETTING_KEYS, "HDFS")?;
        let zone = self.zone(zone);
        self.call(|api, binding| api.update_hdfs_settings(binding, settings, zone))
            .await
    }

    pub async fn create_hdfs_proxy_user(
        &self,
        name: &str,
        members: &[MemberRef],
        zone: Option<&str>,
    ) -> Result<()> {
        let zone = self.zone(zone);
        let params = ProxyUserCreateParams {
            name: name.to_string(),
            members: members.to_vec(),
        };
        self.call(|api, binding| api.create_proxy_user(binding, &params, zone))
            .await
    }

    pub async fn delete_hdfs_proxy_user(&self, name: &str, zone: Option<&str>) -> Result<()> {
        let zone = self.zone(zone);
        self.call(|api, binding| api.delete_proxy_user(binding, name, zone))
            .await
    }

    // =========================================================================
    // Groups
    // =========================================================================

    pub async fn create_group(&self, name: &str, gid: Option<u32>, zone: Option<&str>) -> Result<()> {
        let zone = self.zone(zone);
        let params = GroupCreateParams {
            name: name.to_string(),
            gid,
        };
        self.call(|api, binding| api.create_group(binding, &params, zone))
            .await
    }

    pub async fn delete_group(&self, name: &str, zone: Option<&str>) -> Result<()> {
        let zone = self.zone(zone);
        self.call(|api, binding| api.delete_group(binding, name, zone))
            .await
    }

    pub async fn gid_of_group(&self, name: &str, zone: Option<&str>) -> Result<u32> {
        let zone = self.zone(zone);
        let groups = self
            .call(|api, binding| api.get_group(binding, name, zone))
            .await?
            .groups;
        let group = only_record(groups, "group", name)?;
        group
            .gid
            .numeric_id()
            .ok_or_else(|| Error::InvalidValue(format!("OneFS reported no GID for group {}.", name)))
    }

    /// Names of every group in a zone
    pub async fn groups(&self, zone: Option<&str>) -> Result<Vec<String>> {
        let zone = self.zone(zone);
        Ok(self
            .call(|api, binding| api.list_groups(binding, zone))
            .await?
            .groups
            .into_iter()
            .map(|group| group.name)
            .collect())
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub async fn create_user(
        &self,
        name: &str,
        primary_group: &str,
        uid: Option<u32>,
        enabled: Option<bool>,
        zone: Option<&str>,
    ) -> Result<()> {
        let zone = self.zone(zone);
        let params = UserCreateParams {
            name: name.to_string(),
            uid,
            primary_group: MemberRef::group(primary_group),
            enabled,
        };
        self.call(|api, binding| api.create_user(binding, &params, zone))
            .await
    }

    pub async fn delete_user(&self, name: &str, zone: Option<&str>) -> Result<()> {
        let zone = self.zone(zone);
        self.call(|api, binding| api.delete_user(binding, name, zone))
            .await
    }

    async fn user(&self, name: &str, query_member_of: bool, zone: Option<&str>) -> Result<AuthUser> {
        let zone = self.zone(zone);
        let users = self
            .call(|api, binding| api.get_user(binding, name, query_member_of, zone))
            .await?
            .users;
        only_record(users, "user", name)
    }

    pub async fn uid_of_user(&self, name: &str, zone: Option<&str>) -> Result<u32> {
        self.user(name, false, zone)
            .await?
            .uid
            .numeric_id()
            .ok_or_else(|| Error::InvalidValue(format!("OneFS reported no UID for user {}.", name)))
    }

    pub async fn primary_group_of_user(&self, name: &str, zone: Option<&str>) -> Result<String> {
        self.user(name, false, zone)
            .await?
            .gid
            .name
            .ok_or_else(|| {
                Error::InvalidValue(format!("OneFS reported no primary group for user {}.", name))
            })
    }

    /// Names of the groups a user is a member of
    pub async fn user_groups(&self, name: &str, zone: Option<&str>) -> Result<Vec<String>> {
        Ok(self
            .user(name, true, zone)
            .await?
            .member_of
            .into_iter()
            .filter_map(|group| group.name)
            .collect())
    }

    /// Names of every user in a zone
    pub async fn users(&self, zone: Option<&str>) -> Result<Vec<String>> {
        let zone = self.zone(zone);
        Ok(self
            .call(|api, binding| api.list_users(binding, zone))
            .await?
            .users
            .into_iter()
            .map(|user| user.name)
            .collect())
    }

    pub async fn add_user_to_group(&self, user: &str, group: &str, zone: Option<&str>) -> Result<()> {
        let zone = self.zone(zone);
        let member = MemberRef::user(user);
        self.call(|api, binding| api.add_group_member(binding, group, &member, zone))
            .await
    }

    /// Flush the security objects cache.
    ///
    /// Before OneFS 8.0.1 only the System zone cache can be flushed.
    pub async fn flush_auth_cache(&self, zone: Option<&str>) -> Result<()> {
        let zone = self.zone(zone);
        if self.binding.uses_legacy_auth_cache_flush() && !is_system_zone(zone) {
            return Err(Error::UnsupportedOperation(
                "The auth cache can only be flushed on the System zone before OneFS 8.0.1."
                    .to_string(),
            ));
        }
        self.call(|api, binding| api.flush_auth_cache(binding, zone))
            .await
    }

    // =========================================================================
    // Namespace (paths relative to the zone root)
    // =========================================================================

    /// The absolute path of a zone-relative path
    pub async fn zone_real_path(&self, path: &str, zone: Option<&str>) -> Result<String> {
        let zone = self.zone_settings(zone).await?;
        Ok(join_path(&zone.path, path.trim_start_matches('/')))
    }

    /// Create a directory with the given mode
    pub async fn mkdir(
        &self,
        path: &str,
        mode: u32,
        recursive: bool,
        overwrite: bool,
        zone: Option<&str>,
    ) -> Result<()> {
        let real_path = self.zone_real_path(path, zone).await?;
        // The first path component is the namespace itself (`ifs`), which cannot be created.
        if !real_path.trim_matches('/').contains('/') {
            return Err(Error::InvalidValue(
                "Calling mkdir on the ifs namespace will fail.".to_string(),
            ));
        }
        debug!(path = %real_path, "Creating directory");
        self.call(|api, binding| {
            api.create_directory(binding, &real_path, mode, recursive, overwrite)
        })
        .await
    }

    pub async fn rmdir(&self, path: &str, recursive: bool, zone: Option<&str>) -> Result<()> {
        let real_path = self.zone_real_path(path, zone).await?;
        self.call(|api, binding| api.delete_directory(binding, &real_path, recursive))
            .await
    }

    pub async fn chmod(&self, path: &str, mode: u32, zone: Option<&str>) -> Result<()> {
        let real_path = self.zone_real_path(path, zone).await?;
        let acl = AclUpdate::mode(mode);
        self.call(|api, binding| api.set_acl(binding, &real_path, &acl))
            .await
    }

    /// Change the owner and/or group of a path by name.
    ///
    /// Names are resolved to ids in the target zone first, so that
    /// configuring one zone from another does not resolve them in the wrong
    /// zone.
    pub async fn chown(
        &self,
        path: &str,
        owner: Option<&str>,
        group: Option<&str>,
        zone: Option<&str>,
    ) -> Result<()> {
        let uid = match owner {
            Some(owner) => Some(self.uid_of_user(owner, zone).await?),
            None => None,
        };
        let gid = match group {
            Some(group) => Some(self.gid_of_group(group, zone).await?),
            None => None,
        };
        self.chown_ids(path, uid, gid, zone).await
    }

    /// Change the owner and/or group of a path by id
    pub async fn chown_ids(
        &self,
        path: &str,
        uid: Option<u32>,
        gid: Option<u32>,
        zone: Option<&str>,
    ) -> Result<()> {
        let real_path = self.zone_real_path(path, zone).await?;
        let acl = AclUpdate::ownership(uid, gid);
        self.call(|api, binding| api.set_acl(binding, &real_path, &acl))
            .await
    }

    /// Owner, group and mode of a path
    pub async fn permissions(&self, path: &str, zone: Option<&str>) -> Result<Permissions> {
        let real_path = self.zone_real_path(path, zone).await?;
        let acl = self
            .call(|api, binding| api.get_acl(binding, &real_path))
            .await?;
        let mode = u32::from_str_radix(acl.mode.trim(), 8).map_err(|_| {
            Error::InvalidValue(format!("OneFS reported an invalid mode {:?}.", acl.mode))
        })?;
        Ok(Permissions {
            owner: acl.owner.name.unwrap_or_default(),
            group: acl.group.name.unwrap_or_default(),
            mode,
        })
    }
}

// =============================================================================
// Provisioner Ports
// =============================================================================

#[async_trait]
impl IdentityStore for Client {
    async fn create_group(&self, name: &str, gid: Option<u32>, zone: &str) -> Result<()> {
        Client::create_group(self, name, gid, Some(zone)).await
    }

    async fn gid_of_group(&self, name: &str, zone: &str) -> Result<u32> {
        Client::gid_of_group(self, name, Some(zone)).await
    }

    async fn create_user(
        &self,
        name: &str,
        primary_group: &str,
        uid: Option<u32>,
        zone: &str,
    ) -> Result<()> {
        Client::create_user(self, name, primary_group, uid, Some(true), Some(zone)).await
    }

    async fn uid_of_user(&self, name: &str, zone: &str) -> Result<u32> {
        Client::uid_of_user(self, name, Some(zone)).await
    }

    async fn primary_group_of_user(&self, name: &str, zone: &str) -> Result<String> {
        Client::primary_group_of_user(self, name, Some(zone)).await
    }

    async fn add_user_to_group(&self, user: &str, group: &str, zone: &str) -> Result<()> {
        Client::add_user_to_group(self, user, group, Some(zone)).await
    }

    async fn create_proxy_user(
        &self,
        name: &str,
        members: &[MemberRef],
        zone: &str,
    ) -> Result<()> {
        Client::create_hdfs_proxy_user(self, name, members, Some(zone)).await
    }

    async fn flush_auth_cache(&self, zone: &str) -> Result<()> {
        Client::flush_auth_cache(self, Some(zone)).await
    }
}

#[async_trait]
impl NamespaceStore for Client {
    async fn zone_root(&self, zone: &str) -> Result<String> {
        Ok(self.zone_settings(Some(zone)).await?.path)
    }

    async fn hdfs_root(&self, zone: &str) -> Result<String> {
        Ok(self.hdfs_settings(Some(zone)).await?.root_directory)
    }

    async fn mkdir(&self, path: &str, mode: u32, zone: &str) -> Result<()> {
        Client::mkdir(self, path, mode, false, false, Some(zone)).await
    }

    async fn chmod(&self, path: &str, mode: u32, zone: &str) -> Result<()> {
        Client::chmod(self, path, mode, Some(zone)).await
    }

    async fn chown(
        &self,
        path: &str,
        owner: Option<&str>,
        group: Option<&str>,
        zone: &str,
    ) -> Result<()> {
        Client::chown(self, path, owner, group, Some(zone)).await
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Join two POSIX paths the way a shell would (`rest` is relative)
pub(crate) fn join_path(base: &str, rest: &str) -> String {
    if base.is_empty() || base.ends_with('/') {
        format!("{}{}", base, rest)
    } else {
        format!("{}/{}", base, rest)
    }
}

fn only_record<T>(mut records: Vec<T>, kind: &'static str, name: &str) -> Result<T> {
    if records.len() == 1 {
        Ok(records.remove(0))
    } else {
        Err(Error::DuplicateIdentity {
            kind,
            name: name.to_string(),
            count: records.len(),
        })
    }
}

fn validate_settings(settings: &Map<String, Value>, known: &[&str], what: &str) -> Result<()> {
    match settings.keys().find(|key| !known.contains(&key.as_str())) {
        Some(key) => Err(Error::InvalidValue(format!(
            "\"{}\" is not a valid {} setting.",
            key, what
        ))),
        None => Ok(()),
    }
}

/// Decide whether an inactive license is missing or expired as of `today`
fn check_license_record(license: &License, name: &str, today: NaiveDate) -> Result<()> {
    if license.is_active() {
        return Ok(());
    }
    let expired = license
        .expiration
        .as_deref()
        .and_then(|expiration| NaiveDate::parse_from_str(expiration, "%Y-%m-%d").ok())
        .map_or(false, |expiration| expiration < today);
    if expired {
        Err(Error::ExpiredLicense {
            name: name.to_string(),
        })
    } else {
        Err(Error::MissingLicense {
            name: name.to_string(),
        })
    }
}
