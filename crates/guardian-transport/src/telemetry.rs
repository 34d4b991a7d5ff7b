//! Client telemetry header

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

/// Header carrying the encoded [`Telemetry`]
pub const TELEMETRY_HEADER: &str = "Auth0-Client";

/// Library name reported when telemetry is left at its default
pub const LIBRARY_NAME: &str = "guardian-rs";

/// Client identification sent with every request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Telemetry {
    /// Library or application name
    pub name: String,

    /// Library or application version
    pub version: String,
}

impl Telemetry {
    /// Create telemetry for a named client
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Header value: base64url of the JSON object `{name, version}`
    pub fn header_value(&self) -> String {
        // Two string fields always serialize
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new(LIBRARY_NAME, crate::VERSION)
    }
}
