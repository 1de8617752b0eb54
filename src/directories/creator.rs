//! Directory Provisioner
//!
//! Creates a directory catalog under the HDFS root of an access zone and
//! converges every directory to its declared mode and ownership, whether
//! or not it existed before.

use crate::directories::HdfsDirectory;
use crate::domain::ports::NamespaceStore;
use crate::error::{Error, Result};
use crate::events::{EventSink, ProvisionEvent};
use crate::onefs::client::{is_system_zone, join_path};
use serde::Serialize;

/// The top of the OneFS file system
pub const IFS_ROOT: &str = "/ifs";

/// Zone-relative paths of the directories a run created or found
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryReport {
    pub created: Vec<String>,
    pub existing: Vec<String>,
}

pub struct DirectoryProvisioner<'a> {
    store: &'a dyn NamespaceStore,
    events: &'a dyn EventSink,
    zone: String,
}

impl<'a> DirectoryProvisioner<'a> {
    pub fn new(store: &'a dyn NamespaceStore, events: &'a dyn EventSink, zone: &str) -> Self {
        Self {
            store,
            events,
            zone: zone.to_string(),
        }
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// Create `directories` in order, each followed by chmod and chown.
    ///
    /// The first failure other than "already exists" aborts the run.
    pub async fn create(&self, directories: &[HdfsDirectory]) -> Result<DirectoryReport> {
        let zone = self.zone.as_str();
        if is_system_zone(zone) {
            self.events.emit(ProvisionEvent::SystemZoneDeployment {
                zone: zone.to_string(),
            });
        }

        let zone_root = self.store.zone_root(zone).await?;
        let zone_root = zone_root.trim_end_matches('/');
        let hdfs_root = self.store.hdfs_root(zone).await?;
        let hdfs_root = hdfs_root.trim_end_matches('/');
        let zone_hdfs = zone_hdfs_path(zone_root, hdfs_root)?;
        if hdfs_root == zone_root {
            self.events.emit(ProvisionEvent::HdfsRootIsZoneRoot {
                root: hdfs_root.to_string(),
            });
        }

        let mut report = DirectoryReport::default();
        for directory in directories {
            let path = join_path(zone_hdfs, directory.path.trim_start_matches('/'));
            let real_path = join_path(zone_root, path.trim_start_matches('/'));

            match self.store.mkdir(&path, directory.mode, zone).await {
                Ok(()) => {
                    self.events.emit(ProvisionEvent::DirectoryCreated {
                        path: real_path.clone(),
                        mode: directory.mode,
                    });
                    report.created.push(path.clone());
                }
                Err(Error::Api(err)) if err.dir_path_already_exists() => {
                    self.events.emit(ProvisionEvent::DirectoryExists {
                        path: real_path.clone(),
                    });
                    report.existing.push(path.clone());
                }
                Err(e) => return Err(e),
            }

            self.store.chmod(&path, directory.mode, zone).await?;
            self.events.emit(ProvisionEvent::ModeSet {
                path: real_path.clone(),
                mode: directory.mode,
            });

            self.store
                .chown(&path, Some(&directory.owner), Some(&directory.group), zone)
                .await?;
            self.events.emit(ProvisionEvent::OwnershipSet {
                path: real_path,
                owner: directory.owner.clone(),
                group: directory.group.clone(),
            });
        }
        Ok(report)
    }
}

/// The HDFS root relative to the zone root.
///
/// Both paths come without a trailing `/`. An HDFS root at the top of the
/// file system is refused: it needs ownership and modes that break NFS and
/// SMB clients of `/ifs`.
fn zone_hdfs_path<'p>(zone_root: &str, hdfs_root: &'p str) -> Result<&'p str> {
    if hdfs_root == IFS_ROOT {
        return Err(Error::HdfsRootDirectory {
            path: hdfs_root.to_string(),
        });
    }
    match hdfs_root.strip_prefix(zone_root) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => Ok(rest),
        _ => Err(Error::HdfsRootOutsideZone {
            hdfs_root: hdfs_root.to_string(),
            zone_root: zone_root.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directories::cdh_directories;
    use crate::events::RecordingSink;
    use crate::identities::{cdh_identities, IdentityProvisioner, IdentityProvisionerConfig};
    use crate::onefs::release::ONEFS_8_2_0_0;
    use crate::testing::FakeCluster;
    use assert_matches::assert_matches;

    fn tmp() -> Vec<HdfsDirectory> {
        vec![HdfsDirectory::new("/tmp", "hdfs", "supergroup", 0o1777)]
    }

    async fn cluster_with_identities() -> FakeCluster {
        let cluster = FakeCluster::new(ONEFS_8_2_0_0);
        cluster.add_zone("x", "/ifs/zones/x", "/ifs/zones/x/hdfs");
        cluster.add_group("supergroup", 2000, "x");
        cluster.add_user("hdfs", 3000, "supergroup", "x");
        cluster
    }

    #[test]
    fn test_zone_hdfs_path() {
        assert_eq!(zone_hdfs_path("/ifs/zones/x", "/ifs/zones/x/hdfs").unwrap(), "/hdfs");
        assert_eq!(zone_hdfs_path("/ifs/zones/x", "/ifs/zones/x").unwrap(), "");
        assert_matches!(
            zone_hdfs_path("/ifs", "/ifs"),
            Err(Error::HdfsRootDirectory { path }) if path == "/ifs"
        );
        assert_matches!(
            zone_hdfs_path("/ifs/zones/x", "/ifs/zones/xy/hdfs"),
            Err(Error::HdfsRootOutsideZone { .. })
        );
    }

    #[tokio::test]
    async fn test_mkdir_then_chmod_then_chown() {
        let cluster = cluster_with_identities().await;
        let client = cluster.client("x").await.unwrap();
        let events = RecordingSink::new();

        let report = DirectoryProvisioner::new(&client, &events, "x")
            .create(&tmp())
            .await
            .unwrap();

        assert_eq!(report.created, vec!["/hdfs/tmp"]);
        assert_eq!(
            cluster.mutations(),
            vec![
                "mkdir /ifs/zones/x/hdfs/tmp 1777",
                "set_acl /ifs/zones/x/hdfs/tmp mode=1777",
                "set_acl /ifs/zones/x/hdfs/tmp owner=UID:3000 group=GID:2000",
            ]
        );
        assert_eq!(
            cluster.acl("/ifs/zones/x/hdfs/tmp"),
            Some((3000, 2000, 0o1777))
        );
        assert!(events.warnings().is_empty());
    }

    #[tokio::test]
    async fn test_existing_directories_are_converged() {
        let cluster = cluster_with_identities().await;
        let client = cluster.client("x").await.unwrap();
        client.mkdir("/hdfs/tmp", 0o700, false, false, None).await.unwrap();
        cluster.clear_mutations();
        let events = RecordingSink::new();

        let report = DirectoryProvisioner::new(&client, &events, "x")
            .create(&tmp())
            .await
            .unwrap();

        assert_eq!(report.existing, vec!["/hdfs/tmp"]);
        assert_eq!(
            cluster.mutations(),
            vec![
                "set_acl /ifs/zones/x/hdfs/tmp mode=1777",
                "set_acl /ifs/zones/x/hdfs/tmp owner=UID:3000 group=GID:2000",
            ]
        );
        assert_eq!(
            events.warnings(),
            vec![ProvisionEvent::DirectoryExists {
                path: "/ifs/zones/x/hdfs/tmp".into()
            }]
        );
        assert_eq!(cluster.acl("/ifs/zones/x/hdfs/tmp"), Some((3000, 2000, 0o1777)));
    }

    #[tokio::test]
    async fn test_hdfs_root_at_ifs_is_refused() {
        let cluster = FakeCluster::new(ONEFS_8_2_0_0);
        cluster.set_hdfs_root("System", "/ifs/");
        cluster.set_hdfs_root("hadoop", "/ifs");
        let events = RecordingSink::new();

        for zone in ["System", "hadoop"] {
            let client = cluster.client(zone).await.unwrap();
            let result = DirectoryProvisioner::new(&client, &events, zone)
                .create(&tmp())
                .await;
            assert_matches!(result, Err(Error::HdfsRootDirectory { .. }));
        }
        assert!(cluster.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_hdfs_root_at_zone_root_warns() {
        let cluster = cluster_with_identities().await;
        cluster.set_hdfs_root("x", "/ifs/zones/x/");
        let client = cluster.client("x").await.unwrap();
        let events = RecordingSink::new();

        let report = DirectoryProvisioner::new(&client, &events, "x")
            .create(&tmp())
            .await
            .unwrap();

        assert_eq!(report.created, vec!["tmp"]);
        assert_eq!(cluster.acl("/ifs/zones/x/tmp"), Some((3000, 2000, 0o1777)));
        assert_eq!(
            events.warnings(),
            vec![ProvisionEvent::HdfsRootIsZoneRoot {
                root: "/ifs/zones/x".into()
            }]
        );
        assert!(events.events().contains(&ProvisionEvent::DirectoryCreated {
            path: "/ifs/zones/x/tmp".into(),
            mode: 0o1777,
        }));
        assert!(events.events().contains(&ProvisionEvent::ModeSet {
            path: "/ifs/zones/x/tmp".into(),
            mode: 0o1777,
        }));
    }

    #[tokio::test]
    async fn test_failures_abort_the_run() {
        let cluster = cluster_with_identities().await;
        let client = cluster.client("x").await.unwrap();
        let events = RecordingSink::new();

        let directories = vec![
            HdfsDirectory::new("/tmp", "nobody", "supergroup", 0o1777),
            HdfsDirectory::new("/user", "hdfs", "supergroup", 0o755),
        ];
        let result = DirectoryProvisioner::new(&client, &events, "x")
            .create(&directories)
            .await;

        assert_matches!(result, Err(Error::Api(err)) if err.user_not_found("nobody"));
        assert!(cluster.acl("/ifs/zones/x/hdfs/user").is_none());
    }

    #[tokio::test]
    async fn test_whole_catalog_on_a_fresh_zone() {
        let cluster = FakeCluster::new(ONEFS_8_2_0_0);
        let client = cluster.client("hadoop").await.unwrap();
        let events = RecordingSink::new();

        let config = IdentityProvisionerConfig {
            zone: "hadoop".into(),
            ..Default::default()
        };
        IdentityProvisioner::new(&client, &events, config)
            .create_identities(&cdh_identities("hadoop"))
            .await
            .unwrap();

        let directories = cdh_directories(None);
        let report = DirectoryProvisioner::new(&client, &events, "hadoop")
            .create(&directories)
            .await
            .unwrap();
        assert_eq!(report.created.len(), directories.len());
        assert_eq!(report.created[0], "/hdfs/");
    }
}
