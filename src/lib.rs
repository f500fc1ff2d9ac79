//! OAuth2 bearer-token authentication for the WirLernenOnline
//! content-search MCP service
//!
//! Inbound requests carry `Authorization: Bearer <token>` credentials
//! issued by the deployment's authorization server. This crate validates
//! them entirely offline after key retrieval: the signing keys are
//! fetched from the issuer's JWKS endpoint and cached with a TTL, token
//! signatures are verified against the published RSA keys (`RS256`,
//! `RS384`, `RS512`, `PS256`, `PS384`, `PS512`), and the standard time
//! and identity claims (`exp`, `nbf`, `iss`, `aud`) are checked against
//! the service configuration. Every failure is a typed [`AuthError`]
//! carrying the HTTP status the transport should surface.
//!
//! # Disabled authentication
//!
//! When any of `OAUTH_ISSUER`, `OAUTH_JWKS_URL`, or
//! `OAUTH_TOKEN_ENDPOINT` is absent, the subsystem treats authentication
//! as **disabled**: [`Authority::ensure_authorized`] admits every
//! request without inspecting it. This is a deliberate operational
//! default for local development. Never expose a public instance without
//! all three configured; the condition is logged loudly at startup.
//!
//! # Example
//!
//! ```no_run
//! use wlo_mcp_auth::{Authority, OAuthConfig};
//!
//! # async fn example(headers: http::HeaderMap) -> Result<(), wlo_mcp_auth::AuthError> {
//! // Once, at startup:
//! let authority = Authority::new(OAuthConfig::from_env())?;
//!
//! // Per inbound request:
//! authority.ensure_authorized(&headers).await?;
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

pub mod authority;
pub mod clock;
pub mod config;
pub mod error;
pub mod jwa;
pub mod jwk;
pub mod jwks;
pub mod jws;
pub mod jwt;
pub mod oidc;

#[cfg(test)]
pub(crate) mod test;

#[doc(inline)]
pub use authority::Authority;
#[doc(inline)]
pub use config::OAuthConfig;
#[doc(inline)]
pub use error::{AuthError, ErrorKind};
#[doc(inline)]
pub use jwks::Jwks;
#[doc(inline)]
pub use oidc::ResourceMetadata;
