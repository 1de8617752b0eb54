//! Domain Ports - Core trait definitions for the provisioner
//!
//! `RemoteStorageApi` is the boundary to the OneFS platform API: one method
//! per remote operation, each taking the active API binding and reporting
//! failures unclassified. `IdentityStore` and `NamespaceStore` are the
//! boundaries the provisioners work against; the OneFS client implements
//! both, and so does the dry-run wrapper.

use crate::domain::model::*;
use crate::error::Result;
use crate::onefs::binding::ApiBinding;
use crate::onefs::classify::RemoteError;
use async_trait::async_trait;
use reqwest::Url;
use serde_json::{Map, Value};

/// Result of a raw remote call, before classification
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

// =============================================================================
// Remote Storage API Port
// =============================================================================

/// Port for the OneFS platform and namespace APIs
#[async_trait]
pub trait RemoteStorageApi: Send + Sync {
    /// Point subsequent requests at a different base URL
    fn set_host(&mut self, host: &Url);

    // ---- Cluster -----------------------------------------------------------

    async fn cluster_version(&self, binding: ApiBinding) -> RemoteResult<ClusterVersion>;

    async fn upgrade_cluster(&self, binding: ApiBinding) -> RemoteResult<UpgradeCluster>;

    async fn get_license(&self, binding: ApiBinding, name: &str) -> RemoteResult<LicenseList>;

    // ---- Zones -------------------------------------------------------------

    async fn list_zones(&self, binding: ApiBinding) -> RemoteResult<ZoneList>;

    async fn update_zone(
        &self,
        binding: ApiBinding,
        zone: &str,
        settings: &Map<String, Value>,
    ) -> RemoteResult<()>;

    // ---- Auth --------------------------------------------------------------

    async fn create_group(
        &self,
        binding: ApiBinding,
        params: &GroupCreateParams,
        zone: &str,
    ) -> RemoteResult<()>;

    async fn delete_group(&self, binding: ApiBinding, name: &str, zone: &str) -> RemoteResult<()>;

    async fn get_group(&self, binding: ApiBinding, name: &str, zone: &str)
        -> RemoteResult<AuthGroupList>;

    async fn list_groups(&self, binding: ApiBinding, zone: &str) -> RemoteResult<AuthGroupList>;

    async fn create_user(
        &self,
        binding: ApiBinding,
        params: &UserCreateParams,
        zone: &str,
    ) -> RemoteResult<()>;

    async fn delete_user(&self, binding: ApiBinding, name: &str, zone: &str) -> RemoteResult<()>;

    async fn get_user(
        &self,
        binding: ApiBinding,
        name: &str,
        query_member_of: bool,
        zone: &str,
    ) -> RemoteResult<AuthUserList>;

    async fn list_users(&self, binding: ApiBinding, zone: &str) -> RemoteResult<AuthUserList>;

    async fn add_group_member(
        &self,
        binding: ApiBinding,
        group: &str,
        member: &MemberRef,
        zone: &str,
    ) -> RemoteResult<()>;

    /// Invalidate the security objects cache of a zone
    async fn flush_auth_cache(&self, binding: ApiBinding, zone: &str) -> RemoteResult<()>;

    // ---- HDFS --------------------------------------------------------------

    async fn create_proxy_user(
        &self,
        binding: ApiBinding,
        params: &ProxyUserCreateParams,
        zone: &str,
    ) -> RemoteResult<()>;

    async fn delete_proxy_user(&self, binding: ApiBinding, name: &str, zone: &str)
        -> RemoteResult<()>;

    async fn get_hdfs_settings(&self, binding: ApiBinding, zone: &str)
        -> RemoteResult<HdfsSettings>;

    async fn update_hdfs_settings(
        &self,
        binding: ApiBinding,
        settings: &Map<String, Value>,
        zone: &str,
    ) -> RemoteResult<()>;

    // ---- Namespace (paths are absolute, e.g. `/ifs/zones/x/hdfs/tmp`) ------

    async fn create_directory(
        &self,
        binding: ApiBinding,
        path: &str,
        mode: u32,
        recursive: bool,
        overwrite: bool,
    ) -> RemoteResult<()>;

    async fn delete_directory(&self, binding: ApiBinding, path: &str, recursive: bool)
        -> RemoteResult<()>;

    async fn get_acl(&self, binding: ApiBinding, path: &str) -> RemoteResult<NamespaceAcl>;

    async fn set_acl(&self, binding: ApiBinding, path: &str, acl: &AclUpdate) -> RemoteResult<()>;
}

// =============================================================================
// Provisioner Ports
// =============================================================================

/// Port for the identity operations the identity provisioner issues
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn create_group(&self, name: &str, gid: Option<u32>, zone: &str) -> Result<()>;

    async fn gid_of_group(&self, name: &str, zone: &str) -> Result<u32>;

    async fn create_user(
        &self,
        name: &str,
        primary_group: &str,
        uid: Option<u32>,
        zone: &str,
    ) -> Result<()>;

    async fn uid_of_user(&self, name: &str, zone: &str) -> Result<u32>;

    /// Name of the primary group of a user
    async fn primary_group_of_user(&self, name: &str, zone: &str) -> Result<String>;

    async fn add_user_to_group(&self, user: &str, group: &str, zone: &str) -> Result<()>;

    async fn create_proxy_user(&self, name: &str, members: &[MemberRef], zone: &str)
        -> Result<()>;

    async fn flush_auth_cache(&self, zone: &str) -> Result<()>;
}

/// Port for the namespace operations the directory provisioner issues.
/// Paths are relative to the zone root.
#[async_trait]
pub trait NamespaceStore: Send + Sync {
    /// Absolute base path of a zone
    async fn zone_root(&self, zone: &str) -> Result<String>;

    /// Absolute HDFS root directory of a zone
    async fn hdfs_root(&self, zone: &str) -> Result<String>;

    async fn mkdir(&self, path: &str, mode: u32, zone: &str) -> Result<()>;

    async fn chmod(&self, path: &str, mode: u32, zone: &str) -> Result<()>;

    async fn chown(
        &self,
        path: &str,
        owner: Option<&str>,
        group: Option<&str>,
        zone: &str,
    ) -> Result<()>;
}
