/*
 * Responsibility
 * - The authentication decision procedure for inbound channel requests
 * - Two-phase pipeline: cryptographic verification (extractor), then the
 *   ordered claims-invariant checks; every failure is terminal
 * - No per-request mutable state; safe to share behind Arc across tasks
 */
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;
use url::Url;

use crate::config::{ValidationParameters, WELL_KNOWN_KEY_DISCOVERY_URL};
use crate::credentials::CredentialProvider;
use crate::error::{AuthError, CredentialError};
use crate::identity::ClaimsIdentity;
use crate::token::{JwtTokenExtractor, KeyStore};

/// Default timeout for a single credential lookup.
const DEFAULT_CREDENTIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Authenticates inbound channel tokens.
///
/// Build one per validation context at startup and share it; independent
/// authentication calls run fully concurrently. The only cross-call state is
/// the verification key cache, which can also be shared between
/// authenticators via [`with_key_store`](Self::with_key_store).
pub struct ChannelAuthenticator {
    params: ValidationParameters,
    keys: Arc<KeyStore>,
    service_discovery_url: Option<Url>,
    credential_timeout: Duration,
}

impl ChannelAuthenticator {
    pub fn new(params: ValidationParameters) -> Self {
        Self {
            params,
            keys: Arc::new(KeyStore::new()),
            service_discovery_url: None,
            credential_timeout: DEFAULT_CREDENTIAL_TIMEOUT,
        }
    }

    /// Share a key store between authenticators (one cache per process).
    pub fn with_key_store(mut self, keys: Arc<KeyStore>) -> Self {
        self.keys = keys;
        self
    }

    /// Service-level default for the key discovery endpoint.
    ///
    /// Overridden by `ValidationParameters::key_discovery_url`; overrides the
    /// well-known fallback.
    pub fn with_service_discovery_url(mut self, url: Url) -> Self {
        self.service_discovery_url = Some(url);
        self
    }

    /// Cap on how long a single credential lookup may take. Exceeding it is
    /// a rejection, never a pass.
    pub fn with_credential_timeout(mut self, timeout: Duration) -> Self {
        self.credential_timeout = timeout;
        self
    }

    fn key_discovery_url(&self) -> Url {
        self.params
            .key_discovery_url
            .clone()
            .or_else(|| self.service_discovery_url.clone())
            .unwrap_or_else(|| {
                Url::parse(WELL_KNOWN_KEY_DISCOVERY_URL)
                    .expect("well-known key discovery url is valid")
            })
    }

    /// Authenticate a request claiming to come from the channel service.
    ///
    /// Phase one delegates to the token extractor (structural decoding,
    /// algorithm/key matching, signature, issuer membership, exp/nbf within
    /// tolerance). Any failure there short-circuits: the claims checks never
    /// run and the credential provider is never consulted. Phase two is
    /// [`validate_identity`](Self::validate_identity).
    pub async fn authenticate_channel_token(
        &self,
        auth_header: &str,
        credentials: &dyn CredentialProvider,
        channel_id: &str,
    ) -> Result<ClaimsIdentity, AuthError> {
        let extractor = JwtTokenExtractor::new(
            self.params.clone(),
            self.key_discovery_url(),
            self.keys.clone(),
        );

        let identity = extractor.verify(auth_header, channel_id).await?;
        self.validate_identity(Some(&identity), credentials).await?;
        Ok(identity)
    }

    /// The claims-invariant pipeline, strictly in order; each failure is
    /// terminal and no later check can mask an earlier one.
    pub async fn validate_identity(
        &self,
        identity: Option<&ClaimsIdentity>,
        credentials: &dyn CredentialProvider,
    ) -> Result<(), AuthError> {
        let identity = identity.ok_or(AuthError::MissingIdentity)?;

        if !identity.is_authenticated() {
            return Err(AuthError::NotAuthenticated);
        }

        // Defense-in-depth: the extractor already filtered on accepted
        // issuers, but the claim is re-checked so a future extractor change
        // cannot silently widen trust.
        let issuer = identity.issuer().unwrap_or("");
        if !self.params.accepted_issuers.iter().any(|i| i == issuer) {
            warn!(issuer, "identity issuer is not trusted for this channel");
            return Err(AuthError::IssuerMismatch {
                actual: issuer.to_string(),
            });
        }

        // An absent audience claim is checked as "", never skipped.
        let app_id = identity.audience_or_empty();
        let lookup = tokio::time::timeout(
            self.credential_timeout,
            credentials.is_valid_app_id(app_id),
        );
        match lookup.await {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => {
                warn!(app_id, "token audience is not a valid application id");
                Err(AuthError::InvalidAppId {
                    app_id: app_id.to_string(),
                    source: None,
                })
            }
            Ok(Err(err)) => {
                warn!(app_id, error = %err, "credential lookup failed");
                Err(AuthError::InvalidAppId {
                    app_id: app_id.to_string(),
                    source: Some(err),
                })
            }
            Err(_) => {
                warn!(app_id, "credential lookup timed out");
                Err(AuthError::InvalidAppId {
                    app_id: app_id.to_string(),
                    source: Some(CredentialError::Timeout),
                })
            }
        }
    }

    /// Base pipeline plus binding to the conversation's callback address.
    ///
    /// A token proving "caller is the trusted channel" does not prove
    /// "caller is replying to this conversation"; requiring the service-url
    /// claim to match stops a validly signed token minted for one
    /// conversation from being replayed against another endpoint.
    pub async fn authenticate_with_service_url(
        &self,
        auth_header: &str,
        credentials: &dyn CredentialProvider,
        service_url: &str,
        channel_id: &str,
    ) -> Result<ClaimsIdentity, AuthError> {
        let identity = self
            .authenticate_channel_token(auth_header, credentials, channel_id)
            .await?;

        let claimed = identity.service_url().unwrap_or("");
        if claimed != service_url {
            warn!(expected = service_url, claimed, "service url mismatch");
            return Err(AuthError::ServiceUrlMismatch {
                expected: service_url.to_string(),
                claimed: claimed.to_string(),
            });
        }

        Ok(identity)
    }
}
