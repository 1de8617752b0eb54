//! Error Classification
//!
//! Turns raw transport failures into the crate's error taxonomy. OneFS
//! reports API failures as a JSON body of the form
//! `{"errors": [{"message": "..."}, ...]}`; each message is matched
//! against the fixed templates in [`messages`].

use crate::error::Error;
use serde_json::Value;
use std::fmt;

/// Marker OneFS puts in the reason of a request that failed TLS verification
const CERTIFICATE_VERIFY_FAILED: &str = "CERTIFICATE_VERIFY_FAILED";

// =============================================================================
// Message Templates
// =============================================================================

/// Message templates OneFS uses in API error payloads
pub mod messages {
    pub const TRY_AGAIN: &str = "OneFS API is temporarily unavailable. Try your request again.";

    pub const DIR_PATH_ALREADY_EXISTS: &str =
        "Unable to create directory as requested -- container already exists";

    pub fn gid_already_exists(gid: u32) -> String {
        format!("Group already exists with gid '{}'", gid)
    }

    pub fn group_already_exists(group_name: &str) -> String {
        format!("Group '{}' already exists", group_name)
    }

    pub fn group_not_found(group_name: &str) -> String {
        format!("Failed to find group for 'GROUP:{}': No such group", group_name)
    }

    pub fn group_unresolvable(group_name: &str) -> String {
        format!("Could not resolve group {}", group_name)
    }

    pub fn proxy_user_already_exists(proxy_user_name: &str) -> String {
        format!("Proxyuser '{}' already exists", proxy_user_name)
    }

    pub fn uid_already_exists(uid: u32) -> String {
        format!("User already exists with uid '{}'", uid)
    }

    pub fn user_already_exists(user_name: &str) -> String {
        format!("User '{}' already exists", user_name)
    }

    pub fn user_already_in_group(uid: u32, group_name: &str) -> String {
        format!(
            "Failed to add member UID:{} to group GROUP:{}: User is already in local group",
            uid, group_name
        )
    }

    pub fn user_not_found(user_name: &str) -> String {
        format!("Failed to find user for 'USER:{}': No such user", user_name)
    }

    pub fn user_unresolvable(user_name: &str) -> String {
        format!("Could not resolve user {}", user_name)
    }

    pub fn zone_not_found(zone_name: &str) -> String {
        format!("Access Zone \"{}\" not found.", zone_name)
    }
}

// =============================================================================
// Raw Failures
// =============================================================================

/// A failure reported by the transport before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The request never produced a response (DNS, refused, reset, TLS)
    Connection { reason: String, certificate: bool },
    /// OneFS answered with a failure status
    Api {
        status: u16,
        reason: String,
        body: Option<String>,
    },
}

impl RemoteError {
    pub fn connection(reason: impl Into<String>) -> Self {
        RemoteError::Connection {
            reason: reason.into(),
            certificate: false,
        }
    }

    pub fn certificate(reason: impl Into<String>) -> Self {
        RemoteError::Connection {
            reason: reason.into(),
            certificate: true,
        }
    }

    /// An API failure carrying the standard error body for `messages`
    pub fn api(status: u16, messages: &[&str]) -> Self {
        let errors: Vec<Value> = messages
            .iter()
            .map(|message| serde_json::json!({ "message": message }))
            .collect();
        RemoteError::Api {
            status,
            reason: String::new(),
            body: Some(serde_json::json!({ "errors": errors }).to_string()),
        }
    }
}

/// The parts of an API failure kept for error reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFailure {
    pub status: u16,
    pub reason: String,
    pub body: Option<String>,
}

impl fmt::Display for RawFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.status)?;
        if !self.reason.is_empty() {
            write!(f, " Reason: {}", self.reason)?;
        }
        if let Some(body) = &self.body {
            write!(f, " Body: {}", body)?;
        }
        Ok(())
    }
}

// =============================================================================
// API Errors
// =============================================================================

/// A decoded OneFS API failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    raw: RawFailure,
    messages: Vec<String>,
}

impl ApiError {
    /// Every message listed in the payload, in order
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// The undecoded failure
    pub fn raw(&self) -> &RawFailure {
        &self.raw
    }

    pub fn status(&self) -> u16 {
        self.raw.status
    }

    /// Check whether any listed message is exactly `expected`
    pub fn has_message(&self, expected: &str) -> bool {
        self.messages.iter().any(|message| message == expected)
    }

    pub fn try_again(&self) -> bool {
        self.has_message(messages::TRY_AGAIN)
    }

    pub fn dir_path_already_exists(&self) -> bool {
        self.has_message(messages::DIR_PATH_ALREADY_EXISTS)
    }

    pub fn gid_already_exists(&self, gid: u32) -> bool {
        self.has_message(&messages::gid_already_exists(gid))
    }

    pub fn group_already_exists(&self, group_name: &str) -> bool {
        self.has_message(&messages::group_already_exists(group_name))
    }

    pub fn group_not_found(&self, group_name: &str) -> bool {
        self.has_message(&messages::group_not_found(group_name))
    }

    pub fn group_unresolvable(&self, group_name: &str) -> bool {
        self.has_message(&messages::group_unresolvable(group_name))
    }

    pub fn proxy_user_already_exists(&self, proxy_user_name: &str) -> bool {
        self.has_message(&messages::proxy_user_already_exists(proxy_user_name))
    }

    pub fn uid_already_exists(&self, uid: u32) -> bool {
        self.has_message(&messages::uid_already_exists(uid))
    }

    pub fn user_already_exists(&self, user_name: &str) -> bool {
        self.has_message(&messages::user_already_exists(user_name))
    }

    pub fn user_already_in_group(&self, uid: u32, group_name: &str) -> bool {
        self.has_message(&messages::user_already_in_group(uid, group_name))
    }

    pub fn user_not_found(&self, user_name: &str) -> bool {
        self.has_message(&messages::user_not_found(user_name))
    }

    pub fn user_unresolvable(&self, user_name: &str) -> bool {
        self.has_message(&messages::user_unresolvable(user_name))
    }

    pub fn zone_not_found(&self, zone_name: &str) -> bool {
        self.has_message(&messages::zone_not_found(zone_name))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.messages.is_empty() {
            write!(f, "OneFS API error {}", self.raw)
        } else {
            write!(f, "{}", self.messages.join("\n"))
        }
    }
}

// =============================================================================
// Classification
// =============================================================================

/// Classify a transport failure.
///
/// Pure and deterministic: the same failure always yields the same kind of
/// error, and parsing problems are themselves classified, never propagated.
pub fn classify(err: RemoteError) -> Error {
    match err {
        RemoteError::Connection {
            reason,
            certificate: true,
        } => Error::Certificate { reason },
        RemoteError::Connection { reason, .. } => Error::Connection { reason },
        RemoteError::Api {
            status,
            reason,
            body,
        } => {
            let body = body.filter(|body| !body.is_empty());
            if body.is_none() && reason.contains(CERTIFICATE_VERIFY_FAILED) {
                return Error::Certificate { reason };
            }
            let raw = RawFailure {
                status,
                reason,
                body,
            };
            match decode_messages(&raw) {
                Ok(messages) => Error::Api(ApiError { raw, messages }),
                Err(Decode::Undecodable) => Error::UndecodableApi(raw),
                Err(Decode::Malformed) => Error::MalformedApi(raw),
            }
        }
    }
}

enum Decode {
    Undecodable,
    Malformed,
}

fn decode_messages(raw: &RawFailure) -> std::result::Result<Vec<String>, Decode> {
    let body = raw.body.as_deref().ok_or(Decode::Undecodable)?;
    let json: Value = serde_json::from_str(body).map_err(|_| Decode::Undecodable)?;

    let errors = json
        .get("errors")
        .and_then(Value::as_array)
        .ok_or(Decode::Malformed)?;

    errors
        .iter()
        .map(|error| {
            error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or(Decode::Malformed)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn api_failure(body: Option<&str>) -> RemoteError {
        RemoteError::Api {
            status: 500,
            reason: "Internal Server Error".into(),
            body: body.map(str::to_string),
        }
    }

    #[test]
    fn test_classify_api_messages() {
        let err = classify(api_failure(Some(r#"{"errors": [{"message": "X"}]}"#)));
        assert_matches!(&err, Error::Api(api) if api.messages() == ["X".to_string()]);
        assert_eq!(err.to_string(), "X");

        let err = classify(RemoteError::api(409, &["first", "second"]));
        assert_eq!(err.to_string(), "first\nsecond");
    }

    #[test]
    fn test_classify_malformed_bodies() {
        for body in [
            r#"{"errors": [{}]}"#,
            r#"{"errors": [[]]}"#,
            r#"{"errors": null}"#,
            r#"{"errors": [{"message": 7}]}"#,
            "{}",
            "[]",
        ] {
            assert_matches!(
                classify(api_failure(Some(body))),
                Error::MalformedApi(_),
                "body {}",
                body
            );
        }
    }

    #[test]
    fn test_classify_undecodable_bodies() {
        assert_matches!(
            classify(api_failure(Some("not JSON"))),
            Error::UndecodableApi(_)
        );
        assert_matches!(classify(api_failure(None)), Error::UndecodableApi(_));
        assert_matches!(classify(api_failure(Some(""))), Error::UndecodableApi(_));
        assert!(classify(api_failure(None)).is_malformed());
    }

    #[test]
    fn test_classify_empty_error_list() {
        let err = classify(api_failure(Some(r#"{"errors": []}"#)));
        assert_matches!(&err, Error::Api(api) if api.messages().is_empty());
        assert!(err.to_string().contains("Internal Server Error"));
    }

    #[test]
    fn test_classify_connection_failures() {
        assert_matches!(
            classify(RemoteError::connection("connection refused")),
            Error::Connection { .. }
        );
        assert_matches!(
            classify(RemoteError::certificate("invalid peer certificate")),
            Error::Certificate { .. }
        );
        let err = classify(RemoteError::Api {
            status: 0,
            reason: "[SSL: CERTIFICATE_VERIFY_FAILED] certificate verify failed".into(),
            body: None,
        });
        assert_matches!(err, Error::Certificate { .. });
    }

    #[test]
    fn test_classification_is_deterministic() {
        let failure = api_failure(Some(r#"{"errors": [{"message": "Y"}]}"#));
        let first = classify(failure.clone()).to_string();
        let second = classify(failure).to_string();
        assert_eq!(first, second);
    }

    #[test]
    fn test_message_templates() {
        let err = classify(RemoteError::api(
            409,
            &[
                messages::gid_already_exists(1025).as_str(),
                messages::user_already_in_group(1030, "hadoop").as_str(),
            ],
        ));
        let api = err.api().unwrap();
        assert!(api.gid_already_exists(1025));
        assert!(!api.gid_already_exists(1026));
        assert!(api.user_already_in_group(1030, "hadoop"));
        assert!(!api.group_already_exists("hadoop"));
        assert!(!api.try_again());

        let err = classify(RemoteError::api(503, &[messages::TRY_AGAIN]));
        assert!(err.is_transient());
    }
}
