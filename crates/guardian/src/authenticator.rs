//! Answering authentication requests
//!
//! Every call runs through the same linear sequence of [`AuthenticationState`]s:
//! `Idle`, `BuildingPayload`, `Sending`, then exactly one `Completed`. A failure
//! while building the payload skips `Sending`, so nothing reaches the network.
//! There are no retries.

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use guardian_crypto::{CryptoError, DpopProofBuilder, Jwt, JwtHeader, SigningKey, Totp};
use guardian_transport::{NetworkOperation, NetworkResult, Payload};
use serde_json::Value;

use crate::api::GuardianApi;
use crate::challenge::ChallengeClaims;
use crate::config::GuardianConfig;
use crate::consent::RichConsent;
use crate::enrollment::{Credential, Enrollment};
use crate::error::{GuardianError, GuardianResult};
use crate::notification::{ACCEPT_ACTION, Notification, REJECT_ACTION};

/// Progress of a single allow, reject or consent call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthenticationState {
    /// Nothing done yet
    Idle,
    /// Generating the code or signing the payload
    BuildingPayload,
    /// Request handed to the transport
    Sending,
    /// Terminal state
    Completed {
        /// Whether the call succeeded
        success: bool,
    },
}

impl fmt::Display for AuthenticationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::BuildingPayload => write!(f, "building_payload"),
            Self::Sending => write!(f, "sending"),
            Self::Completed { success: true } => write!(f, "completed(success)"),
            Self::Completed { success: false } => write!(f, "completed(failure)"),
        }
    }
}

/// Observer of state transitions
pub type StateObserver = Arc<dyn Fn(AuthenticationState) + Send + Sync>;

/// The user's answer to an authentication request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision<'a> {
    Allow,
    Reject(Option<&'a str>),
}

impl Decision<'_> {
    fn accepted(&self) -> bool {
        matches!(self, Self::Allow)
    }

    fn reason(&self) -> Option<&str> {
        match self {
            Self::Allow => None,
            Self::Reject(reason) => *reason,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Reject(_) => "reject",
        }
    }
}

struct Transitions<'a> {
    state: AuthenticationState,
    operation: &'static str,
    observer: Option<&'a StateObserver>,
}

impl<'a> Transitions<'a> {
    fn start(operation: &'static str, observer: Option<&'a StateObserver>) -> Self {
        let transitions = Self {
            state: AuthenticationState::Idle,
            operation,
            observer,
        };
        transitions.notify();
        transitions
    }

    fn advance(&mut self, next: AuthenticationState) {
        tracing::debug!(operation = self.operation, from = %self.state, to = %next, "State transition");
        self.state = next;
        self.notify();
    }

    fn complete<T>(&mut self, result: &GuardianResult<T>) {
        self.advance(AuthenticationState::Completed {
            success: result.is_ok(),
        });
        match result {
            Ok(_) => tracing::info!(operation = self.operation, "Guardian request completed"),
            Err(err) => tracing::warn!(
                operation = self.operation,
                code = %err.code(),
                local = err.is_local(),
                error = %err,
                "Guardian request failed"
            ),
        }
    }

    fn notify(&self) {
        if let Some(observer) = self.observer {
            observer(self.state);
        }
    }
}

/// Allows, rejects and inspects Guardian authentication requests
#[derive(Clone)]
pub struct Authenticator {
    api: GuardianApi,
    observer: Option<StateObserver>,
}

impl Authenticator {
    /// Create an authenticator for a tenant
    pub fn new(config: GuardianConfig) -> Self {
        Self {
            api: GuardianApi::new(config),
            observer: None,
        }
    }

    /// Observe state transitions of every call
    pub fn on_state_change(
        mut self,
        observer: impl Fn(AuthenticationState) + Send + Sync + 'static,
    ) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Endpoints in use
    pub fn api(&self) -> &GuardianApi {
        &self.api
    }

    /// Allow the login
    pub async fn allow(
        &self,
        notification: &Notification,
        enrollment: &Enrollment,
    ) -> GuardianResult<()> {
        self.resolve(notification, enrollment, Decision::Allow).await
    }

    /// Reject the login, optionally saying why
    pub async fn reject(
        &self,
        notification: &Notification,
        enrollment: &Enrollment,
        reason: Option<&str>,
    ) -> GuardianResult<()> {
        self.resolve(notification, enrollment, Decision::Reject(reason))
            .await
    }

    /// Answer a notification action chosen by the user
    ///
    /// Only [`ACCEPT_ACTION`] and [`REJECT_ACTION`] are understood; anything else
    /// fails without contacting the server.
    pub async fn handle_action(
        &self,
        identifier: &str,
        notification: &Notification,
        enrollment: &Enrollment,
    ) -> GuardianResult<()> {
        match identifier {
            ACCEPT_ACTION => self.allow(notification, enrollment).await,
            REJECT_ACTION => self.reject(notification, enrollment, None).await,
            other => {
                let err = GuardianError::InvalidNotificationActionIdentifier {
                    identifier: other.to_string(),
                };
                tracing::warn!(identifier = other, "Unknown notification action");
                Err(err)
            }
        }
    }

    /// Fetch the consent record of a transaction
    ///
    /// The request carries a DPoP proof made with `signing_key` and bound to
    /// `notification_token`. A key whose public half cannot be exported fails
    /// before anything is sent.
    pub async fn fetch_consent(
        &self,
        consent_id: &str,
        notification_token: &str,
        signing_key: Arc<dyn SigningKey>,
    ) -> GuardianResult<RichConsent> {
        let mut transitions = Transitions::start("fetch_consent", self.observer.as_ref());
        transitions.advance(AuthenticationState::BuildingPayload);

        let operation = match self
            .consent_operation(consent_id, notification_token, signing_key)
            .await
        {
            Ok(operation) => operation,
            Err(err) => {
                let result = Err(err);
                transitions.complete(&result);
                return result;
            }
        };

        transitions.advance(AuthenticationState::Sending);
        let result = operation
            .execute()
            .await
            .and_then(Payload::require_content)
            .map_err(GuardianError::from);
        transitions.complete(&result);
        result
    }

    async fn resolve(
        &self,
        notification: &Notification,
        enrollment: &Enrollment,
        decision: Decision<'_>,
    ) -> GuardianResult<()> {
        let mut transitions = Transitions::start(decision.name(), self.observer.as_ref());
        tracing::debug!(
            enrollment = enrollment.id(),
            credential = enrollment.credential().kind(),
            decision = decision.name(),
            "Resolving transaction"
        );

        transitions.advance(AuthenticationState::BuildingPayload);
        let operation = match self.resolution_operation(notification, enrollment, decision).await {
            Ok(operation) => operation,
            Err(err) => {
                let result = Err(err);
                transitions.complete(&result);
                return result;
            }
        };

        transitions.advance(AuthenticationState::Sending);
        let result = discard(operation.execute().await).map_err(GuardianError::from);
        transitions.complete(&result);
        result
    }

    async fn resolution_operation(
        &self,
        notification: &Notification,
        enrollment: &Enrollment,
        decision: Decision<'_>,
    ) -> GuardianResult<NetworkOperation<Value>> {
        let token = notification.transaction_token.as_str();

        match enrollment.credential() {
            Credential::Otp(parameters) => {
                let code = Totp::from_parameters(parameters)?.now()?;
                Ok(match decision {
                    Decision::Allow => self.api.verify_otp(token, &code),
                    Decision::Reject(reason) => self.api.reject_login(token, &code, reason),
                })
            }
            Credential::Key(key) => {
                let claims = ChallengeClaims::new(
                    &self.api.resolve_transaction_url()?,
                    enrollment.local_identifier(),
                    &notification.challenge,
                    decision.accepted(),
                    decision.reason(),
                    unix_now()?,
                );
                let key = Arc::clone(key);
                let challenge_response =
                    blocking(move || Jwt::sign(JwtHeader::rs256(), claims, &*key)).await?;
                Ok(self
                    .api
                    .resolve_transaction(token, &challenge_response.compact()))
            }
        }
    }

    async fn consent_operation(
        &self,
        consent_id: &str,
        notification_token: &str,
        signing_key: Arc<dyn SigningKey>,
    ) -> GuardianResult<NetworkOperation<RichConsent>> {
        let url = self.api.consent_url(consent_id)?;

        let proof_url = url.to_string();
        let access_token = notification_token.to_string();
        let proof = blocking(move || {
            DpopProofBuilder::new().build_proof_for_key(
                &proof_url,
                "GET",
                &access_token,
                &*signing_key,
            )
        })
        .await?;

        Ok(self
            .api
            .fetch_consent(url, notification_token, &proof.compact()))
    }
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("api", &self.api)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

/// Run a keystore operation where blocking is allowed
async fn blocking<T, F>(task: F) -> Result<T, CryptoError>
where
    F: FnOnce() -> Result<T, CryptoError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| CryptoError::SignFailed {
            reason: format!("Signing task failed: {e}"),
        })?
}

fn discard(result: NetworkResult<Payload<Value>>) -> NetworkResult<()> {
    result.map(|_| ())
}

fn unix_now() -> Result<i64, CryptoError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .map_err(|_| CryptoError::SignFailed {
            reason: "System clock before Unix epoch".to_string(),
        })
}
