//! Inbound channel-token authentication.
//!
//! Decides whether an HTTP request claiming to originate from a trusted
//! upstream channel service is genuine, unexpired, correctly scoped, and
//! destined for this application. Callers hand over the raw `Authorization`
//! header value, a [`CredentialProvider`] and the channel id; the crate
//! returns either the verified [`ClaimsIdentity`] or a typed [`AuthError`]
//! that must be mapped to "deny request".
//!
//! ```no_run
//! use channel_auth::{ChannelAuthenticator, StaticCredentialProvider, ValidationParameters};
//!
//! # async fn example(auth_header: &str) -> Result<(), channel_auth::AuthError> {
//! let authenticator = ChannelAuthenticator::new(ValidationParameters::for_issuer(
//!     "https://api.botframework.com",
//! ));
//! let credentials = StaticCredentialProvider::single("my-app-id");
//!
//! let identity = authenticator
//!     .authenticate_channel_token(auth_header, &credentials, "msteams")
//!     .await?;
//! # let _ = identity;
//! # Ok(())
//! # }
//! ```

mod authenticator;
mod config;
mod credentials;
mod error;
mod identity;
pub mod token;

pub use authenticator::ChannelAuthenticator;
pub use config::{DEFAULT_CLOCK_TOLERANCE, ValidationParameters, WELL_KNOWN_KEY_DISCOVERY_URL};
pub use credentials::{CredentialProvider, StaticCredentialProvider};
pub use error::{AuthError, CredentialError, KeyDiscoveryError, TokenError};
pub use identity::{AUDIENCE_CLAIM, ClaimsIdentity, ISSUER_CLAIM, SERVICE_URL_CLAIM};
pub use token::{JwtTokenExtractor, KeyStore};
