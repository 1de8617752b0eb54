//! OneFS Remote Access Layer
//!
//! Version detection, API binding selection, error classification, the
//! retrying access wrapper and the client façade built from them.

pub mod binding;
pub mod classify;
pub mod client;
pub mod feature;
pub mod http;
pub mod release;
pub mod retry;

pub use binding::{binding_for_revision, ApiBinding};
pub use classify::{classify, messages, ApiError, RawFailure, RemoteError};
pub use client::{is_system_zone, Client, ClientConfig, SYSTEM_ZONE};
pub use feature::OneFsFeature;
pub use http::HttpApi;
pub use release::{ClusterRevision, ONEFS_RELEASES};
pub use retry::{accesses_onefs, RetryPolicy};
