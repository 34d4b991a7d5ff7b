//! Push notification payloads
//!
//! A Guardian push carries the transaction under the `mfa` key:
//!
//! ```json
//! {
//!   "aps": {"category": "com.auth0.notification.authentication"},
//!   "mfa": {
//!     "txtkn": "transaction-token",
//!     "dai": "dev_1",
//!     "sh": "tenant.guardian.auth0.com",
//!     "c": "challenge",
//!     "d": "2016-08-23T14:29:57.676Z",
//!     "s": {"b": {"n": "Chrome", "v": "58.0"}, "os": {"n": "Mac OS X", "v": "10.12"}},
//!     "l": {"n": "Buenos Aires", "lat": -34.6, "long": -58.4}
//!   }
//! }
//! ```

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Notification category of Guardian authentication requests
pub const AUTHENTICATION_CATEGORY: &str = "com.auth0.notification.authentication";

/// Action identifier that allows the login
pub const ACCEPT_ACTION: &str = "com.auth0.notification.authentication.accept";

/// Action identifier that rejects the login
pub const REJECT_ACTION: &str = "com.auth0.notification.authentication.reject";

/// Name and version of a browser or operating system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDetail {
    /// Product name
    pub name: String,

    /// Product version
    pub version: Option<String>,
}

/// Where the login attempt came from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Source {
    /// Browser used for the attempt
    pub browser: Option<SourceDetail>,

    /// Operating system used for the attempt
    pub os: Option<SourceDetail>,
}

/// Approximate location of the login attempt
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Location {
    /// Place name
    pub name: Option<String>,

    /// Latitude in degrees
    pub latitude: Option<f64>,

    /// Longitude in degrees
    pub longitude: Option<f64>,
}

/// An authentication request delivered to the device
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Guardian tenant domain
    pub domain: String,

    /// Enrollment the request is addressed to
    pub enrollment_id: String,

    /// Bearer token authorizing the answer
    pub transaction_token: String,

    /// Challenge to answer
    pub challenge: String,

    /// When the login attempt started
    pub started_at: DateTime<Utc>,

    /// Browser and OS of the attempt
    pub source: Option<Source>,

    /// Location of the attempt
    pub location: Option<Location>,
}

impl Notification {
    /// Create a notification with only the fields needed to answer it
    pub fn new(
        domain: impl Into<String>,
        enrollment_id: impl Into<String>,
        transaction_token: impl Into<String>,
        challenge: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            domain: domain.into(),
            enrollment_id: enrollment_id.into(),
            transaction_token: transaction_token.into(),
            challenge: challenge.into(),
            started_at,
            source: None,
            location: None,
        }
    }

    /// Parse a push payload
    ///
    /// Returns `None` for payloads of another category or missing required fields.
    pub fn from_push_payload(payload: &Value) -> Option<Self> {
        if let Some(category) = payload["aps"]["category"].as_str()
            && category != AUTHENTICATION_CATEGORY
        {
            return None;
        }

        let mfa = payload.get("mfa")?;
        let started_at = DateTime::parse_from_rfc3339(mfa["d"].as_str()?)
            .ok()?
            .with_timezone(&Utc);

        Some(Self {
            domain: mfa["sh"].as_str()?.to_string(),
            enrollment_id: mfa["dai"].as_str()?.to_string(),
            transaction_token: mfa["txtkn"].as_str()?.to_string(),
            challenge: mfa["c"].as_str()?.to_string(),
            started_at,
            source: mfa.get("s").map(parse_source),
            location: mfa.get("l").map(parse_location),
        })
    }
}

fn parse_source(value: &Value) -> Source {
    Source {
        browser: parse_detail(&value["b"]),
        os: parse_detail(&value["os"]),
    }
}

fn parse_detail(value: &Value) -> Option<SourceDetail> {
    Some(SourceDetail {
        name: value["n"].as_str()?.to_string(),
        version: value["v"].as_str().map(str::to_string),
    })
}

fn parse_location(value: &Value) -> Location {
    Location {
        name: value["n"].as_str().map(str::to_string),
        latitude: coordinate(&value["lat"]),
        longitude: coordinate(&value["long"]),
    }
}

// Coordinates arrive as numbers or numeric strings
fn coordinate(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn payload() -> Value {
        json!({
            "aps": {"alert": {"body": "Login request"}, "category": AUTHENTICATION_CATEGORY},
            "mfa": {
                "txtkn": "transaction-token",
                "dai": "dev_1",
                "sh": "tenant.guardian.auth0.com",
                "c": "challenge",
                "d": "2016-08-23T14:29:57.676Z",
                "s": {"b": {"n": "Chrome", "v": "58.0"}, "os": {"n": "Mac OS X"}},
                "l": {"n": "Buenos Aires", "lat": -34.6, "long": "-58.4"}
            }
        })
    }

    #[test]
    fn test_parses_full_payload() {
        let notification = Notification::from_push_payload(&payload()).unwrap();

        assert_eq!(notification.domain, "tenant.guardian.auth0.com");
        assert_eq!(notification.enrollment_id, "dev_1");
        assert_eq!(notification.transaction_token, "transaction-token");
        assert_eq!(notification.challenge, "challenge");
        assert_eq!(
            notification.started_at.timestamp_millis(),
            Utc.with_ymd_and_hms(2016, 8, 23, 14, 29, 57).unwrap().timestamp_millis() + 676
        );
        assert_eq!(
            notification.source,
            Some(Source {
                browser: Some(SourceDetail {
                    name: "Chrome".to_string(),
                    version: Some("58.0".to_string()),
                }),
                os: Some(SourceDetail {
                    name: "Mac OS X".to_string(),
                    version: None,
                }),
            })
        );
        assert_eq!(
            notification.location,
            Some(Location {
                name: Some("Buenos Aires".to_string()),
                latitude: Some(-34.6),
                longitude: Some(-58.4),
            })
        );
    }

    #[test]
    fn test_optional_sections() {
        let mut value = payload();
        value["mfa"].as_object_mut().unwrap().remove("s");
        value["mfa"].as_object_mut().unwrap().remove("l");
        value.as_object_mut().unwrap().remove("aps");

        let notification = Notification::from_push_payload(&value).unwrap();
        assert!(notification.source.is_none());
        assert!(notification.location.is_none());
    }

    #[test]
    fn test_rejects_foreign_or_incomplete_payloads() {
        let mut other = payload();
        other["aps"]["category"] = json!("com.example.chat");
        assert!(Notification::from_push_payload(&other).is_none());

        for key in ["txtkn", "dai", "sh", "c", "d"] {
            let mut value = payload();
            value["mfa"].as_object_mut().unwrap().remove(key);
            assert!(
                Notification::from_push_payload(&value).is_none(),
                "missing {key} should be rejected"
            );
        }

        let mut bad_date = payload();
        bad_date["mfa"]["d"] = json!("yesterday");
        assert!(Notification::from_push_payload(&bad_date).is_none());
        assert!(Notification::from_push_payload(&json!("mfa")).is_none());
    }
}
