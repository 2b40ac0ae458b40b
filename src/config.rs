/*
 * Responsibility
 * - Validation parameters for inbound channel tokens
 * - Defaults that match the channel service contract (300s skew, expiration on)
 * - Key discovery endpoint resolution (params override > service default > well-known)
 */
use std::time::Duration;

use jsonwebtoken::Algorithm;
use url::Url;

/// Well-known metadata endpoint of the channel login service.
///
/// Used when neither the parameters nor the authenticator carry an override.
pub const WELL_KNOWN_KEY_DISCOVERY_URL: &str =
    "https://login.botframework.com/v1/.well-known/openidconfiguration";

/// Default clock skew tolerance for expiration / not-before checks.
pub const DEFAULT_CLOCK_TOLERANCE: Duration = Duration::from_secs(300);

/// Validation parameters for inbound channel tokens.
///
/// Immutable per authenticator instance; build once at startup and share.
///
/// Note:
/// - There is deliberately no audience knob here. The extractor never checks
///   `aud`; the authenticator checks it against the credential provider as a
///   separate pipeline step. Keeping the knob out of the config makes that
///   ordering impossible to misconfigure.
#[derive(Debug, Clone)]
pub struct ValidationParameters {
    /// The only issuer values considered trusted.
    pub accepted_issuers: Vec<String>,

    /// Permitted skew for expiration / not-before checks.
    pub clock_tolerance: Duration,

    /// If false, `exp` is not required or checked (test/diagnostic use only).
    pub enforce_expiration: bool,

    /// Signature algorithms the extractor will accept.
    ///
    /// A token whose header names any other algorithm is rejected before key
    /// lookup (prevents algorithm downgrade/confusion).
    pub allowed_algorithms: Vec<Algorithm>,

    /// Instance-level override for the key discovery endpoint.
    pub key_discovery_url: Option<Url>,
}

impl Default for ValidationParameters {
    fn default() -> Self {
        Self {
            accepted_issuers: Vec::new(),
            clock_tolerance: DEFAULT_CLOCK_TOLERANCE,
            enforce_expiration: true,
            allowed_algorithms: vec![Algorithm::RS256, Algorithm::RS384, Algorithm::RS512],
            key_discovery_url: None,
        }
    }
}

impl ValidationParameters {
    /// Parameters trusting a single issuer, everything else at defaults.
    pub fn for_issuer(issuer: impl Into<String>) -> Self {
        Self {
            accepted_issuers: vec![issuer.into()],
            ..Self::default()
        }
    }

    pub fn with_clock_tolerance(mut self, tolerance: Duration) -> Self {
        self.clock_tolerance = tolerance;
        self
    }

    pub fn with_allowed_algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.allowed_algorithms = algorithms;
        self
    }

    pub fn with_key_discovery_url(mut self, url: Url) -> Self {
        self.key_discovery_url = Some(url);
        self
    }
}
