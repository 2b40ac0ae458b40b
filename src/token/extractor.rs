/*
 * Responsibility
 * - Structural decoding + cryptographic verification of an inbound channel token
 * - Bearer scheme, algorithm allowlist, key lookup by kid, signature,
 *   issuer membership, exp/nbf within clock tolerance
 * - Audience is NOT checked here: the authenticator checks it against the
 *   credential provider as a separate pipeline step
 */
use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, Validation, decode, decode_header};
use serde_json::Value;
use tracing::warn;
use url::Url;

use crate::config::ValidationParameters;
use crate::error::TokenError;
use crate::identity::ClaimsIdentity;
use crate::token::keys::KeyStore;

/// Verifies inbound channel tokens against a discoverable key set.
///
/// A successful [`verify`](Self::verify) is the only way to obtain a
/// [`ClaimsIdentity`]; claims-invariant checks therefore can never run on a
/// token that skipped verification.
pub struct JwtTokenExtractor {
    params: ValidationParameters,
    discovery_url: Url,
    keys: Arc<KeyStore>,
}

impl JwtTokenExtractor {
    pub fn new(params: ValidationParameters, discovery_url: Url, keys: Arc<KeyStore>) -> Self {
        Self {
            params,
            discovery_url,
            keys,
        }
    }

    /// Verify a raw `Authorization` header value and return the claims.
    ///
    /// `channel_id` is carried as a log field only; it does not take part in
    /// verification.
    pub async fn verify(
        &self,
        auth_header: &str,
        channel_id: &str,
    ) -> Result<ClaimsIdentity, TokenError> {
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(TokenError::NotBearer)?;

        let header = decode_header(token).map_err(|e| {
            warn!(channel_id, error = %e, "malformed channel token header");
            TokenError::Malformed(e)
        })?;

        // Allowlist check before any key lookup, so a downgraded `alg` can
        // never influence which key we fetch.
        if !self.params.allowed_algorithms.contains(&header.alg) {
            warn!(channel_id, alg = ?header.alg, "channel token uses disallowed algorithm");
            return Err(TokenError::DisallowedAlgorithm(header.alg));
        }

        let jwk = self
            .keys
            .get(&self.discovery_url, header.kid.as_deref())
            .await?;
        let key = DecodingKey::from_jwk(&jwk).map_err(|e| TokenError::UnusableKey {
            kid: header.kid.clone(),
            source: e,
        })?;

        let mut validation = Validation::new(header.alg);
        if !self.params.accepted_issuers.is_empty() {
            validation.set_issuer(&self.params.accepted_issuers);
        }
        // Audience is checked later, explicitly, against the application
        // identity. Never here.
        validation.validate_aud = false;
        validation.validate_nbf = true;
        validation.leeway = self.params.clock_tolerance.as_secs();
        if !self.params.enforce_expiration {
            validation.validate_exp = false;
            validation.required_spec_claims.remove("exp");
        }

        let data = decode::<serde_json::Map<String, Value>>(token, &key, &validation)
            .map_err(|e| {
                warn!(channel_id, error = %e, "channel token verification failed");
                classify(e)
            })?;

        Ok(ClaimsIdentity::from_payload(data.claims))
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::ExpiredSignature => return TokenError::Expired,
        ErrorKind::ImmatureSignature => return TokenError::NotYetValid,
        ErrorKind::InvalidIssuer => return TokenError::UntrustedIssuer,
        ErrorKind::InvalidSignature => return TokenError::InvalidSignature,
        _ => {}
    }
    TokenError::Verification(err)
}
