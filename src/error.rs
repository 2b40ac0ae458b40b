/*
 * Responsibility
 * - Rejection taxonomy for the authentication pipeline
 * - One variant per rejection kind so callers must handle each explicitly
 * - Messages carry claim names and offending values, never token or key material
 */
use jsonwebtoken::Algorithm;
use thiserror::Error;

/// Failures raised while fetching the verification key set.
#[derive(Debug, Error)]
pub enum KeyDiscoveryError {
    #[error("key discovery request to {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    #[error("key discovery document from {url} is invalid: {reason}")]
    InvalidDocument { url: String, reason: String },
}

/// Cryptographic / structural token failures raised by the extractor.
///
/// Any of these short-circuits the pipeline: the claims-invariant checks
/// never run and the credential provider is never consulted.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("authorization header is not a bearer token")]
    NotBearer,

    #[error("malformed token: {0}")]
    Malformed(#[source] jsonwebtoken::errors::Error),

    #[error("token signing algorithm {0:?} is not allowed")]
    DisallowedAlgorithm(Algorithm),

    #[error("no verification key matches kid {kid:?}")]
    UnknownKey { kid: Option<String> },

    #[error("verification key for kid {kid:?} is unusable: {source}")]
    UnusableKey {
        kid: Option<String>,
        #[source]
        source: jsonwebtoken::errors::Error,
    },

    #[error("token issuer is not an accepted issuer")]
    UntrustedIssuer,

    #[error("token is expired (outside clock tolerance)")]
    Expired,

    #[error("token is not yet valid (outside clock tolerance)")]
    NotYetValid,

    #[error("token signature verification failed")]
    InvalidSignature,

    #[error("token verification failed: {0}")]
    Verification(#[source] jsonwebtoken::errors::Error),

    #[error(transparent)]
    KeyDiscovery(#[from] KeyDiscoveryError),
}

/// Failures raised by a [`CredentialProvider`](crate::CredentialProvider)
/// backend.
///
/// Kept separate from [`AuthError`] so providers never decide the verdict:
/// the authenticator maps every backend failure to a rejection (fail-closed).
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential lookup timed out")]
    Timeout,

    #[error("credential backend error: {0}")]
    Backend(String),
}

/// The verdict taxonomy: every way an authentication attempt can be rejected.
///
/// A successful call returns the verified identity instead; there is no
/// partial-success state. Callers must map any variant to "deny request".
#[derive(Debug, Error)]
pub enum AuthError {
    /// Raised by the token extractor, passed through unchanged.
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("token verification produced no identity")]
    MissingIdentity,

    #[error("identity is not authenticated")]
    NotAuthenticated,

    #[error("token issuer {actual:?} is not the trusted issuer for this channel")]
    IssuerMismatch { actual: String },

    #[error("audience {app_id:?} is not a valid application id")]
    InvalidAppId {
        app_id: String,
        #[source]
        source: Option<CredentialError>,
    },

    #[error("token is bound to service url {claimed:?}, expected {expected:?}")]
    ServiceUrlMismatch { expected: String, claimed: String },
}
