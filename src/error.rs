//! Error types for the OneFS provisioner
//!
//! Provides structured error types for every layer: transport failures,
//! API payload classification, version selection, cluster checks and the
//! identity/directory provisioners.

use crate::identities::IdKind;
use crate::onefs::classify::{ApiError, RawFailure};
use thiserror::Error;

/// Unified error type for the provisioner
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Connection Errors
    // =========================================================================
    #[error("Cannot connect to OneFS: {reason}")]
    Connection { reason: String },

    #[error("Cannot verify the OneFS HTTPS certificate: {reason}")]
    Certificate { reason: String },

    // =========================================================================
    // API Response Errors
    // =========================================================================
    #[error("{0}")]
    Api(ApiError),

    #[error("Malformed OneFS API response: {0}")]
    MalformedApi(RawFailure),

    #[error("Undecodable OneFS API response: {0}")]
    UndecodableApi(RawFailure),

    // =========================================================================
    // Version Errors
    // =========================================================================
    #[error("OneFS is in mixed mode (node revisions: {revisions})")]
    MixedMode { revisions: String },

    #[error("The OneFS version cannot be determined: {0}")]
    UndeterminableVersion(String),

    #[error("There is no API binding for OneFS revision {revision:#x}!")]
    UnsupportedVersion { revision: u64 },

    #[error("{0}")]
    UnsupportedOperation(String),

    // =========================================================================
    // Cluster Check Errors
    // =========================================================================
    #[error(
        "The {name} application is not currently installed. \
         Please contact your Isilon account team for more information \
         on evaluating and purchasing {name}."
    )]
    MissingLicense { name: String },

    #[error(
        "The evaluation license key for {name} has expired. \
         Please contact your Isilon representative."
    )]
    ExpiredLicense { name: String },

    #[error("Access Zone \"{name}\" not found.")]
    MissingZone { name: String },

    #[error("{0}")]
    InvalidValue(String),

    #[error("Found {count} {kind} records named {name} (do you have duplicates, e.g. local and LDAP?)")]
    DuplicateIdentity {
        kind: &'static str,
        name: String,
        count: usize,
    },

    // =========================================================================
    // Provisioning Errors
    // =========================================================================
    #[error("The HDFS root directory must not be {path}.")]
    HdfsRootDirectory { path: String },

    #[error("The HDFS root directory {hdfs_root} is outside of the zone root {zone_root}.")]
    HdfsRootOutsideZone { hdfs_root: String, zone_root: String },

    #[error("Gave up creating {name} after {attempts} conflicting {kind}s")]
    IdConflictLimit {
        kind: IdKind,
        name: String,
        attempts: u32,
    },

    #[error("No {kind}s are left to allocate")]
    IdExhausted { kind: IdKind },

    // =========================================================================
    // Configuration / IO Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Connection failures, including certificate failures
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. } | Error::Certificate { .. })
    }

    /// API responses that could not be interpreted, including undecodable ones
    pub fn is_malformed(&self) -> bool {
        matches!(self, Error::MalformedApi(_) | Error::UndecodableApi(_))
    }

    /// Missing licenses, including expired ones
    pub fn is_missing_license(&self) -> bool {
        matches!(
            self,
            Error::MissingLicense { .. } | Error::ExpiredLicense { .. }
        )
    }

    /// Check if OneFS asked for the request to be repeated
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Api(api) if api.try_again())
    }

    /// The API error, if this error carries an API payload
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(api) => Some(api),
            _ => None,
        }
    }

    /// A suggestion for the operator, if the error has a common remedy
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Error::Certificate { .. } => {
                Some("--no-verify can be used to skip certificate verification.")
            }
            _ => None,
        }
    }
}

/// Result type alias for the provisioner
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_subtypes() {
        let cert = Error::Certificate {
            reason: "self signed".into(),
        };
        assert!(cert.is_connection());
        assert_eq!(
            cert.hint(),
            Some("--no-verify can be used to skip certificate verification.")
        );

        let conn = Error::Connection {
            reason: "refused".into(),
        };
        assert!(conn.is_connection());
        assert!(conn.hint().is_none());

        let expired = Error::ExpiredLicense {
            name: "HDFS".into(),
        };
        assert!(expired.is_missing_license());
        assert!(!expired.is_connection());
    }

    #[test]
    fn test_operator_messages() {
        let err = Error::MissingZone {
            name: "hadoop".into(),
        };
        assert_eq!(err.to_string(), "Access Zone \"hadoop\" not found.");

        let err = Error::MissingLicense {
            name: "HDFS".into(),
        };
        assert_eq!(
            err.to_string(),
            "The HDFS application is not currently installed. \
             Please contact your Isilon account team for more information \
             on evaluating and purchasing HDFS."
        );

        let err = Error::HdfsRootDirectory {
            path: "/ifs".into(),
        };
        assert_eq!(err.to_string(), "The HDFS root directory must not be /ifs.");

        let err = Error::UnsupportedVersion { revision: 0x10 };
        assert_eq!(
            err.to_string(),
            "There is no API binding for OneFS revision 0x10!"
        );
    }
}
