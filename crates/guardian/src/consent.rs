//! Rich consent records
//!
//! A consent describes what the login is asking for beyond authentication. Its
//! `authorization_details` are open-ended JSON objects discriminated by their
//! `type` field; they are kept as [`serde_json::Value`] and can be decoded into
//! caller-defined types on demand.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Details the relying party requested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestedDetails {
    /// API the access is requested for
    pub audience: String,

    /// Requested scopes
    #[serde(default)]
    pub scope: Vec<String>,

    /// Message shown on both the login device and this device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_message: Option<String>,

    /// Fine-grained authorization requests (RFC 9396)
    #[serde(default)]
    pub authorization_details: Vec<Value>,
}

/// A consent record fetched for a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichConsent {
    /// Consent identifier
    pub id: String,

    /// What is being consented to
    pub requested_details: RequestedDetails,

    /// Creation time, seconds since the Unix epoch
    pub created_at: i64,

    /// Expiry time, seconds since the Unix epoch
    pub expires_at: i64,
}

impl RichConsent {
    /// Authorization details whose `type` equals `kind`
    pub fn authorization_details_of_type<'a>(
        &'a self,
        kind: &'a str,
    ) -> impl Iterator<Item = &'a Value> + 'a {
        self.requested_details
            .authorization_details
            .iter()
            .filter(move |detail| detail["type"].as_str() == Some(kind))
    }

    /// Decode the authorization details of type `kind` into `T`
    ///
    /// Entries that do not decode are skipped.
    pub fn filter_authorization_details<T: DeserializeOwned>(&self, kind: &str) -> Vec<T> {
        self.authorization_details_of_type(kind)
            .filter_map(|detail| T::deserialize(detail).ok())
            .collect()
    }

    /// Check whether the consent has expired at `unix_seconds`
    pub fn is_expired_at(&self, unix_seconds: i64) -> bool {
        unix_seconds >= self.expires_at
    }
}
