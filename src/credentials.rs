//! Credential lookup interface used by the claims-invariant pipeline.
use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::CredentialError;

/// Application credential registry.
///
/// This is intentionally small and string-based: the pipeline only ever asks
/// "is this audience value one of our application ids?". Implementations may
/// consult a remote multi-tenant registry; the call is awaited and subject to
/// the authenticator's credential timeout.
///
/// Contract:
/// - `""` (the absent-audience case) is a defined input, not an error.
/// - `Err(_)` means the answer is unknown; the authenticator treats it as a
///   rejection, never as success.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn is_valid_app_id(&self, app_id: &str) -> Result<bool, CredentialError>;
}

/// Fixed-allowlist provider backed by an in-memory set.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialProvider {
    app_ids: HashSet<String>,
}

impl StaticCredentialProvider {
    pub fn new<I, S>(app_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            app_ids: app_ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Provider for a single application id.
    pub fn single(app_id: impl Into<String>) -> Self {
        Self::new([app_id.into()])
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn is_valid_app_id(&self, app_id: &str) -> Result<bool, CredentialError> {
        Ok(self.app_ids.contains(app_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_provider_matches_exact_ids() {
        let provider = StaticCredentialProvider::new(["app1", "app2"]);
        assert!(provider.is_valid_app_id("app1").await.unwrap());
        assert!(provider.is_valid_app_id("app2").await.unwrap());
        assert!(!provider.is_valid_app_id("app3").await.unwrap());
    }

    #[tokio::test]
    async fn empty_string_is_a_defined_input() {
        let provider = StaticCredentialProvider::single("app1");
        assert!(!provider.is_valid_app_id("").await.unwrap());

        let permissive = StaticCredentialProvider::new([""]);
        assert!(permissive.is_valid_app_id("").await.unwrap());
    }
}
