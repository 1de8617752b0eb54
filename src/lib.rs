//! OneFS Provisioner - Hadoop identities and directories on OneFS
//!
//! Prepares an access zone of a OneFS (Isilon) cluster for a Hadoop
//! distribution: creates the users, groups and proxy users the distribution
//! expects, and the HDFS directory tree with its ownership and modes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                             CLI (main.rs)                           │
//! ├─────────────────────────────────┬───────────────────────────────────┤
//! │      Identity Provisioner       │       Directory Provisioner       │
//! │  groups → users → proxy users   │   mkdir → chmod → chown per dir   │
//! │  → auth cache flush             │                                   │
//! ├─────────────────────────────────┴───────────────────────────────────┤
//! │        IdentityStore / NamespaceStore ports (DryRun wrapper)        │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                      Remote Storage Client                          │
//! │   version discovery → API binding → retrying access → classifier    │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                  RemoteStorageApi (HTTPS transport)                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`onefs`]: OneFS client, API bindings, error classification and retries
//! - [`identities`]: Identity catalogs and the identity provisioner
//! - [`directories`]: Directory catalogs and the directory provisioner
//! - [`domain`]: Wire types and ports
//! - [`events`]: Provisioning events and sinks
//! - [`error`]: Error types and handling

pub mod config;
pub mod directories;
pub mod domain;
pub mod dry_run;
pub mod error;
pub mod events;
pub mod identities;
pub mod onefs;
pub mod script;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::{Distribution, Settings};

pub use directories::{
    cdh_directories, hdp_directories, DirectoryProvisioner, DirectoryReport, HdfsDirectory,
};

pub use domain::ports::{IdentityStore, NamespaceStore, RemoteStorageApi};

pub use dry_run::{DryRun, DRY_RUN_BANNER};

pub use error::{Error, Result};

pub use events::{EventSink, ProvisionEvent, RecordingSink, Severity, TracingSink};

pub use identities::{
    cdh_identities, hdp_identities, Identities, IdentityPhase, IdentityProvisioner,
    IdentityProvisionerConfig, IdentityReport, Provisioned,
};

pub use onefs::{ApiBinding, Client, ClientConfig, ClusterRevision, RetryPolicy};

pub use script::ReplayScript;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
