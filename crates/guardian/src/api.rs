//! Guardian HTTP endpoints
//!
//! Each method returns a ready-to-run [`NetworkOperation`] with the Guardian
//! remote-error mapping registered. A URL that cannot be built becomes a deferred
//! error on the operation.

use guardian_transport::{
    HttpResponse, Method, NetworkError, NetworkOperation, RemoteError, Url,
};
use serde::Serialize;
use serde_json::Value;

use crate::config::GuardianConfig;
use crate::consent::RichConsent;
use crate::error::GuardianError;

/// Path of the challenge-response endpoint
pub const RESOLVE_TRANSACTION_PATH: [&str; 2] = ["api", "resolve-transaction"];

/// Path of the OTP allow endpoint
pub const VERIFY_OTP_PATH: [&str; 2] = ["api", "verify-otp"];

/// Path of the OTP reject endpoint
pub const REJECT_LOGIN_PATH: [&str; 2] = ["api", "reject-login"];

/// Path prefix of consent records
pub const RICH_CONSENTS_PATH: &str = "rich-consents";

/// Authorization scheme of consent requests
pub const MFA_DPOP_SCHEME: &str = "MFA-DPoP";

/// Header carrying the DPoP proof of consent requests
pub const MFA_DPOP_HEADER: &str = "MFA-DPoP";

const PUSH_NOTIFICATION_TYPE: &str = "push_notification";

#[derive(Debug, Serialize)]
struct ChallengeResponseBody<'a> {
    challenge_response: &'a str,
}

#[derive(Debug, Serialize)]
struct OtpBody<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

/// Endpoint catalogue of one Guardian tenant
#[derive(Debug, Clone)]
pub struct GuardianApi {
    config: GuardianConfig,
}

impl GuardianApi {
    /// Create the catalogue for a configuration
    pub fn new(config: GuardianConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    pub fn config(&self) -> &GuardianConfig {
        &self.config
    }

    /// Absolute resolve-transaction URL, also the challenge response audience
    pub fn resolve_transaction_url(&self) -> Result<Url, GuardianError> {
        self.config.endpoint(&RESOLVE_TRANSACTION_PATH)
    }

    /// Absolute URL of a consent record
    pub fn consent_url(&self, consent_id: &str) -> Result<Url, GuardianError> {
        self.config.endpoint(&[RICH_CONSENTS_PATH, consent_id])
    }

    /// `POST api/resolve-transaction` with a signed challenge response
    pub fn resolve_transaction(
        &self,
        transaction_token: &str,
        challenge_response: &str,
    ) -> NetworkOperation<Value> {
        let body = ChallengeResponseBody { challenge_response };
        self.post(
            self.resolve_transaction_url(),
            transaction_token,
            &body,
        )
    }

    /// `POST api/verify-otp` allowing the login with a one-time code
    pub fn verify_otp(&self, transaction_token: &str, code: &str) -> NetworkOperation<Value> {
        let body = OtpBody {
            kind: PUSH_NOTIFICATION_TYPE,
            code,
            reason: None,
        };
        self.post(
            self.config.endpoint(&VERIFY_OTP_PATH),
            transaction_token,
            &body,
        )
    }

    /// `POST api/reject-login` rejecting the login with a one-time code
    pub fn reject_login(
        &self,
        transaction_token: &str,
        code: &str,
        reason: Option<&str>,
    ) -> NetworkOperation<Value> {
        let body = OtpBody {
            kind: PUSH_NOTIFICATION_TYPE,
            code,
            reason,
        };
        self.post(
            self.config.endpoint(&REJECT_LOGIN_PATH),
            transaction_token,
            &body,
        )
    }

    /// `GET rich-consents/{id}` authorized by the notification token and a DPoP proof
    pub fn fetch_consent(
        &self,
        consent_url: Url,
        notification_token: &str,
        dpop_proof: &str,
    ) -> NetworkOperation<RichConsent> {
        let authorization = format!("{MFA_DPOP_SCHEME} {notification_token}");
        NetworkOperation::get(
            self.config.network().clone(),
            consent_url,
            [
                ("Authorization", authorization.as_str()),
                (MFA_DPOP_HEADER, dpop_proof),
            ],
        )
        .map_error(map_remote_error)
    }

    fn post<B: Serialize>(
        &self,
        url: Result<Url, GuardianError>,
        transaction_token: &str,
        body: &B,
    ) -> NetworkOperation<Value> {
        let network = self.config.network().clone();
        let operation = match url {
            Ok(url) => {
                let authorization = format!("Bearer {transaction_token}");
                NetworkOperation::new(
                    network,
                    Method::POST,
                    url,
                    [("Authorization", authorization.as_str())],
                    Some(body),
                )
            }
            Err(err) => NetworkOperation::failed(
                network,
                Method::POST,
                self.config.base_url().clone(),
                NetworkError::Configuration {
                    reason: err.to_string(),
                },
            ),
        };
        operation.map_error(map_remote_error)
    }
}

/// Map a JSON error body carrying `errorCode` to [`NetworkError::Remote`]
pub fn map_remote_error(response: &HttpResponse) -> Option<NetworkError> {
    if !response.is_json() {
        return None;
    }
    RemoteError::from_body(&response.body)
        .map(|remote| NetworkError::Remote(remote.with_status(response.status)))
}
