/*
 * Responsibility
 * - ClaimsIdentity: the claim bag produced by successful token verification
 * - Constructor is pub(crate): only the extractor can mint one, so claims
 *   checks can never run on a token that skipped cryptographic verification
 */
use std::collections::HashMap;

use serde_json::Value;

/// Issuer claim name.
pub const ISSUER_CLAIM: &str = "iss";
/// Audience claim name (the application id the token is addressed to).
pub const AUDIENCE_CLAIM: &str = "aud";
/// Service URL claim name (the callback address the token is bound to).
pub const SERVICE_URL_CLAIM: &str = "serviceurl";

/// A verified token's claims.
///
/// Values outside this crate can only be obtained from a successful
/// [`JwtTokenExtractor::verify`](crate::token::JwtTokenExtractor::verify) or
/// one of the authenticator entry points, both of which run full signature
/// verification first.
#[derive(Debug, Clone)]
pub struct ClaimsIdentity {
    claims: HashMap<String, String>,
    is_authenticated: bool,
}

impl ClaimsIdentity {
    pub(crate) fn new(claims: HashMap<String, String>, is_authenticated: bool) -> Self {
        Self {
            claims,
            is_authenticated,
        }
    }

    /// Build the claim bag from a decoded JWT payload.
    ///
    /// String values are kept as-is; numbers and booleans are stringified;
    /// arrays and objects are kept as their JSON text; nulls are dropped.
    pub(crate) fn from_payload(payload: serde_json::Map<String, Value>) -> Self {
        let claims = payload
            .into_iter()
            .filter_map(|(name, value)| {
                let value = match value {
                    Value::String(s) => s,
                    Value::Null => return None,
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    other => other.to_string(),
                };
                Some((name, value))
            })
            .collect();

        Self::new(claims, true)
    }

    /// True only if cryptographic verification succeeded.
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    /// Look up a claim value by name.
    pub fn claim(&self, name: &str) -> Option<&str> {
        self.claims.get(name).map(String::as_str)
    }

    /// The issuer claim, if present.
    pub fn issuer(&self) -> Option<&str> {
        self.claim(ISSUER_CLAIM)
    }

    /// The audience claim. Absence is reported as an empty string, never as
    /// "skip the check": the credential provider decides what `""` means.
    pub fn audience_or_empty(&self) -> &str {
        self.claim(AUDIENCE_CLAIM).unwrap_or("")
    }

    /// The service URL claim, if present.
    pub fn service_url(&self) -> Option<&str> {
        self.claim(SERVICE_URL_CLAIM)
    }

    /// Iterate over all claims (for audit logging).
    pub fn claims(&self) -> impl Iterator<Item = (&str, &str)> {
        self.claims.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
