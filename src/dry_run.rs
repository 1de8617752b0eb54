//! Dry Runs
//!
//! [`DryRun`] wraps a store so that the provisioners walk their full
//! ordering and conflict logic, and report every event, without changing
//! anything on the cluster. Reads go through to the wrapped store; writes
//! succeed without being sent.

use crate::domain::model::MemberRef;
use crate::domain::ports::{IdentityStore, NamespaceStore};
use crate::error::Result;
use async_trait::async_trait;
use tracing::trace;

/// Banner logged before a dry run
pub const DRY_RUN_BANNER: &str = "Had this been for real, this is what would have happened...";

/// A store whose writes are no-ops
#[derive(Debug, Clone, Copy)]
pub struct DryRun<'a, S: ?Sized> {
    inner: &'a S,
}

impl<'a, S: ?Sized> DryRun<'a, S> {
    pub fn new(inner: &'a S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &'a S {
        self.inner
    }
}

#[async_trait]
impl<'a, S> IdentityStore for DryRun<'a, S>
where
    S: IdentityStore + ?Sized,
{
    async fn create_group(&self, name: &str, gid: Option<u32>, _zone: &str) -> Result<()> {
        trace!(name, ?gid, "dry run: create_group");
        Ok(())
    }

    async fn gid_of_group(&self, name: &str, zone: &str) -> Result<u32> {
        self.inner.gid_of_group(name, zone).await
    }

    async fn create_user(
        &self,
        name: &str,
        primary_group: &str,
        uid: Option<u32>,
        _zone: &str,
    ) -> Result<()> {
        trace!(name, primary_group, ?uid, "dry run: create_user");
        Ok(())
    }

    async fn uid_of_user(&self, name: &str, zone: &str) -> Result<u32> {
        self.inner.uid_of_user(name, zone).await
    }

    async fn primary_group_of_user(&self, name: &str, zone: &str) -> Result<String> {
        self.inner.primary_group_of_user(name, zone).await
    }

    async fn add_user_to_group(&self, user: &str, group: &str, _zone: &str) -> Result<()> {
        trace!(user, group, "dry run: add_user_to_group");
        Ok(())
    }

    async fn create_proxy_user(
        &self,
        name: &str,
        _members: &[MemberRef],
        _zone: &str,
    ) -> Result<()> {
        trace!(name, "dry run: create_proxy_user");
        Ok(())
    }

    async fn flush_auth_cache(&self, zone: &str) -> Result<()> {
        trace!(zone, "dry run: flush_auth_cache");
        Ok(())
    }
}

#[async_trait]
impl<'a, S> NamespaceStore for DryRun<'a, S>
where
    S: NamespaceStore + ?Sized,
{
    async fn zone_root(&self, zone: &str) -> Result<String> {
        self.inner.zone_root(zone).await
    }

    async fn hdfs_root(&self, zone: &str) -> Result<String> {
        self.inner.hdfs_root(zone).await
    }

    async fn mkdir(&self, path: &str, mode: u32, _zone: &str) -> Result<()> {
        trace!(path, mode, "dry run: mkdir");
        Ok(())
    }

    async fn chmod(&self, path: &str, mode: u32, _zone: &str) -> Result<()> {
        trace!(path, mode, "dry run: chmod");
        Ok(())
    }

    async fn chown(
        &self,
        path: &str,
        owner: Option<&str>,
        group: Option<&str>,
        _zone: &str,
    ) -> Result<()> {
        trace!(path, ?owner, ?group, "dry run: chown");
        Ok(())
    }
}
