//! Version-Adaptive API Bindings
//!
//! Every OneFS release range speaks a slightly different platform API.
//! A binding names the request/response schemas valid for one contiguous
//! range of revisions; the client resolves one binding per connection
//! target and hands it to the transport with every request.

use crate::error::{Error, Result};
use crate::onefs::release::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// API schema set for a contiguous revision range `[floor, next floor)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ApiBinding {
    V7_2,
    V8_0,
    V8_0_1,
    V8_1_0,
    V8_1_1,
    V8_2_0,
    V8_2_1,
    V8_2_2,
}

/// Ascending (floor, binding) table
const BINDINGS: [(ClusterRevision, ApiBinding); 8] = [
    (ONEFS_7_2_0_0, ApiBinding::V7_2),
    (ONEFS_8_0_0_0, ApiBinding::V8_0),
    (ONEFS_8_0_1_0, ApiBinding::V8_0_1),
    (ONEFS_8_1_0_0, ApiBinding::V8_1_0),
    (ONEFS_8_1_1_0, ApiBinding::V8_1_1),
    (ONEFS_8_2_0_0, ApiBinding::V8_2_0),
    (ONEFS_8_2_1_0, ApiBinding::V8_2_1),
    (ONEFS_8_2_2_0, ApiBinding::V8_2_2),
];

/// Exclusive upper bound of the newest binding
const CEILING: ClusterRevision = ONEFS_8_2_3_0;

impl ApiBinding {
    /// The newest binding; newer clusters still accept its request shapes
    pub const LATEST: ApiBinding = ApiBinding::V8_2_2;

    /// The binding used before the cluster revision is known
    /// (the first one able to report the cluster version).
    pub const DISCOVERY: ApiBinding = ApiBinding::V8_0;

    /// Lowest revision served by this binding
    pub fn floor(self) -> ClusterRevision {
        BINDINGS
            .iter()
            .find(|(_, binding)| *binding == self)
            .map(|(floor, _)| *floor)
            .unwrap_or(ONEFS_7_2_0_0)
    }

    /// Platform API version segment used in request URLs
    pub fn platform_version(self) -> u8 {
        match self {
            ApiBinding::V7_2 => 1,
            ApiBinding::V8_0 => 3,
            ApiBinding::V8_0_1 => 4,
            ApiBinding::V8_1_0 => 5,
            ApiBinding::V8_1_1 => 6,
            ApiBinding::V8_2_0 => 7,
            ApiBinding::V8_2_1 => 8,
            ApiBinding::V8_2_2 => 9,
        }
    }

    /// Before 8.0.1 the auth cache is flushed through the user list
    /// endpoint, and only for the System zone.
    pub fn uses_legacy_auth_cache_flush(self) -> bool {
        self < ApiBinding::V8_0_1
    }

    /// Committed feature bits are reported from 8.2.0 on
    pub fn reports_committed_features(self) -> bool {
        self >= ApiBinding::V8_2_0
    }
}

impl fmt::Display for ApiBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApiBinding::V7_2 => "7.2",
            ApiBinding::V8_0 => "8.0",
            ApiBinding::V8_0_1 => "8.0.1",
            ApiBinding::V8_1_0 => "8.1.0",
            ApiBinding::V8_1_1 => "8.1.1",
            ApiBinding::V8_2_0 => "8.2.0",
            ApiBinding::V8_2_1 => "8.2.1",
            ApiBinding::V8_2_2 => "8.2.2",
        };
        write!(f, "{}", name)
    }
}

/// Select the binding intended to work with a given revision.
///
/// Revisions outside every known range fall back to [`ApiBinding::LATEST`]
/// unless `strict` is set, in which case they fail with
/// [`Error::UnsupportedVersion`].
pub fn binding_for_revision(revision: ClusterRevision, strict: bool) -> Result<ApiBinding> {
    for (index, (floor, binding)) in BINDINGS.iter().enumerate() {
        let ceiling = BINDINGS
            .get(index + 1)
            .map(|(next, _)| *next)
            .unwrap_or(CEILING);
        if *floor <= revision && revision < ceiling {
            return Ok(*binding);
        }
    }

    if strict {
        return Err(Error::UnsupportedVersion {
            revision: revision.value(),
        });
    }
    Ok(ApiBinding::LATEST)
}
