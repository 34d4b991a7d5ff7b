//! Challenge response claim set

use guardian_transport::Url;
use serde::{Deserialize, Serialize};

/// Seconds a challenge response stays valid
pub const CHALLENGE_RESPONSE_LIFETIME: i64 = 30;

/// Value of `auth0_guardian_method` for push notifications
pub const PUSH_METHOD: &str = "push";

/// Claims of the signed token answering a challenge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeClaims {
    /// Issued-at, seconds since the Unix epoch
    pub iat: i64,

    /// Expiry, always `iat + 30`
    pub exp: i64,

    /// Absolute resolve-transaction URL
    pub aud: String,

    /// Device local identifier
    pub iss: String,

    /// The notification challenge
    pub sub: String,

    /// Always `push`
    pub auth0_guardian_method: String,

    /// Whether the user allowed the login
    pub auth0_guardian_accepted: bool,

    /// Rejection reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth0_guardian_reason: Option<String>,
}

impl ChallengeClaims {
    /// Claims answering `challenge`, issued at `now`
    pub fn new(
        audience: &Url,
        issuer: &str,
        challenge: &str,
        accepted: bool,
        reason: Option<&str>,
        now: i64,
    ) -> Self {
        Self {
            iat: now,
            exp: now + CHALLENGE_RESPONSE_LIFETIME,
            aud: audience.to_string(),
            iss: issuer.to_string(),
            sub: challenge.to_string(),
            auth0_guardian_method: PUSH_METHOD.to_string(),
            auth0_guardian_accepted: accepted,
            auth0_guardian_reason: reason.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_wire_shape() {
        let aud = Url::parse("https://tenant.guardian.auth0.com/api/resolve-transaction").unwrap();
        let claims = ChallengeClaims::new(&aud, "device-1", "abc", false, Some("hack"), 100);

        assert_eq!(
            serde_json::to_value(&claims).unwrap(),
            json!({
                "iat": 100,
                "exp": 130,
                "aud": "https://tenant.guardian.auth0.com/api/resolve-transaction",
                "iss": "device-1",
                "sub": "abc",
                "auth0_guardian_method": "push",
                "auth0_guardian_accepted": false,
                "auth0_guardian_reason": "hack"
            })
        );
    }

    #[test]
    fn test_reason_omitted_when_absent() {
        let aud = Url::parse("https://tenant.guardian.auth0.com/api/resolve-transaction").unwrap();
        let claims = ChallengeClaims::new(&aud, "device-1", "abc", true, None, 0);
        let value = serde_json::to_value(&claims).unwrap();
        assert!(value.get("auth0_guardian_reason").is_none());
    }
}
