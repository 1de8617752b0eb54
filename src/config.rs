//! Settings File
//!
//! Every option of the command line can also come from a YAML file:
//!
//! ```yaml
//! onefs:
//!   address: isilon.example.com
//!   user: root
//!   zone: hadoop
//!   verify_tls: false
//!   retry_interval_secs: 2
//! identities:
//!   start_uid: 2000
//!   start_gid: 2000
//! dist: hdp
//! cluster_name: prod
//! ```
//!
//! Values given on the command line win over the file.

use crate::directories::{cdh_directories, hdp_directories, HdfsDirectory};
use crate::error::{Error, Result};
use crate::identities::{
    cdh_identities, hdp_identities, Identities, IdentityProvisionerConfig,
};
use crate::onefs::client::ClientConfig;
use crate::onefs::retry::{RetryPolicy, DEFAULT_RETRY_INTERVAL};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

// =============================================================================
// Distributions
// =============================================================================

/// Supported Hadoop distributions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    /// Cloudera Distribution including Hadoop
    Cdh,
    /// Hortonworks Data Platform
    Hdp,
}

impl Distribution {
    pub fn identities(self, zone: &str) -> Identities {
        match self {
            Distribution::Cdh => cdh_identities(zone),
            Distribution::Hdp => hdp_identities(zone),
        }
    }

    pub fn directories(self, identity_suffix: Option<&str>) -> Vec<HdfsDirectory> {
        match self {
            Distribution::Cdh => cdh_directories(identity_suffix),
            Distribution::Hdp => hdp_directories(identity_suffix),
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distribution::Cdh => write!(f, "cdh"),
            Distribution::Hdp => write!(f, "hdp"),
        }
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Connection settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OneFsSettings {
    pub address: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub zone: Option<String>,
    pub verify_tls: Option<bool>,
    pub timeout_secs: Option<u64>,
    pub retry_interval_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

/// Identity numbering settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentitySettings {
    pub start_uid: Option<u32>,
    pub start_gid: Option<u32>,
    pub max_id_conflicts: Option<u32>,
}

/// Everything that can be configured, each value optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub onefs: OneFsSettings,
    pub identities: IdentitySettings,
    pub dist: Option<Distribution>,
    /// Appended (with a leading `-`) to every identity name
    pub cluster_name: Option<String>,
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let yaml = tokio::fs::read_to_string(path).await?;
        Self::from_yaml(&yaml)
    }

    /// Layer `overrides` on top of these settings
    pub fn overlay(self, overrides: Settings) -> Settings {
        let onefs = OneFsSettings {
            address: overrides.onefs.address.or(self.onefs.address),
            port: overrides.onefs.port.or(self.onefs.port),
            user: overrides.onefs.user.or(self.onefs.user),
            password: overrides.onefs.password.or(self.onefs.password),
            zone: overrides.onefs.zone.or(self.onefs.zone),
            verify_tls: overrides.onefs.verify_tls.or(self.onefs.verify_tls),
            timeout_secs: overrides.onefs.timeout_secs.or(self.onefs.timeout_secs),
            retry_interval_secs: overrides
                .onefs
                .retry_interval_secs
                .or(self.onefs.retry_interval_secs),
            max_retries: overrides.onefs.max_retries.or(self.onefs.max_retries),
        };
        let identities = IdentitySettings {
            start_uid: overrides.identities.start_uid.or(self.identities.start_uid),
            start_gid: overrides.identities.start_gid.or(self.identities.start_gid),
            max_id_conflicts: overrides
                .identities
                .max_id_conflicts
                .or(self.identities.max_id_conflicts),
        };
        Settings {
            onefs,
            identities,
            dist: overrides.dist.or(self.dist),
            cluster_name: overrides.cluster_name.or(self.cluster_name),
        }
    }

    pub fn zone(&self) -> Result<&str> {
        required(&self.onefs.zone, "zone")
    }

    pub fn dist(&self) -> Result<Distribution> {
        self.dist
            .ok_or_else(|| Error::Configuration("a distribution (--dist) is required".to_string()))
    }

    /// The identity suffix derived from the cluster name, if any
    pub fn identity_suffix(&self) -> Option<String> {
        self.cluster_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .map(crate::identities::cluster_name_suffix)
    }

    pub fn client_config(&self) -> Result<ClientConfig> {
        let defaults = ClientConfig::default();
        let interval = self
            .onefs
            .retry_interval_secs
            .map_or(DEFAULT_RETRY_INTERVAL, Duration::from_secs);
        Ok(ClientConfig {
            address: required(&self.onefs.address, "OneFS address")?.to_string(),
            port: self.onefs.port.unwrap_or(defaults.port),
            username: self.onefs.user.clone().unwrap_or(defaults.username),
            password: required(&self.onefs.password, "OneFS password")?.to_string(),
            default_zone: self.zone()?.to_string(),
            verify_tls: self.onefs.verify_tls.unwrap_or(defaults.verify_tls),
            timeout: self
                .onefs
                .timeout_secs
                .map_or(defaults.timeout, Duration::from_secs),
            retry: match self.onefs.max_retries {
                Some(max_retries) => RetryPolicy::bounded(interval, max_retries),
                None => RetryPolicy::unbounded(interval),
            },
        })
    }

    pub fn identity_config(&self, script_path: Option<PathBuf>) -> Result<IdentityProvisionerConfig> {
        let defaults = IdentityProvisionerConfig::default();
        Ok(IdentityProvisionerConfig {
            zone: self.zone()?.to_string(),
            start_uid: self.identities.start_uid.unwrap_or(defaults.start_uid),
            start_gid: self.identities.start_gid.unwrap_or(defaults.start_gid),
            max_id_conflicts: self
                .identities
                .max_id_conflicts
                .unwrap_or(defaults.max_id_conflicts),
            script_path,
        })
    }
}

fn required<'a>(value: &'a Option<String>, what: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| Error::Configuration(format!("the {} is required", what)))
}
