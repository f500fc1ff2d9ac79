//! Process configuration for the authentication subsystem
//!
//! The configuration is read from the environment exactly once at process
//! start and passed by reference into every component; no other part of
//! the crate touches environment variables.

use std::{env, time::Duration};

const ENV_ISSUER: &str = "OAUTH_ISSUER";
const ENV_JWKS_URL: &str = "OAUTH_JWKS_URL";
const ENV_TOKEN_ENDPOINT: &str = "OAUTH_TOKEN_ENDPOINT";
const ENV_AUDIENCE: &str = "OAUTH_AUDIENCE";
const ENV_AUTHORIZATION_SERVERS: &str = "OAUTH_AUTHORIZATION_SERVERS";
const ENV_USER_AGENT: &str = "MCP_USER_AGENT";

/// User agent presented to the authorization server when none is
/// configured
pub const DEFAULT_USER_AGENT: &str = "wlo-mcp/0.1 (+https://wirlernenonline.de)";

/// Clock-skew window applied to the `exp` and `nbf` checks
pub const DEFAULT_CLOCK_TOLERANCE: Duration = Duration::from_secs(60);

/// How long a fetched key set is served before it is revalidated
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_millis(300_000);

/// Immutable snapshot of the OAuth deployment settings
///
/// Bearer authentication is enforced only when `issuer`, `jwks_uri`, and
/// `token_endpoint` are all present; otherwise the subsystem treats
/// authentication as disabled and every request is implicitly authorized
/// (see [`crate::Authority`]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OAuthConfig {
    /// Expected `iss` claim of presented tokens
    pub issuer: Option<String>,

    /// Location of the issuer's published key set
    pub jwks_uri: Option<String>,

    /// Endpoint where clients obtain tokens; advertised in the discovery
    /// document
    pub token_endpoint: Option<String>,

    /// Audience presented tokens must name; doubles as the `resource`
    /// identifier in the discovery document
    pub audience: Option<String>,

    /// Comma-separated authorization server list for the discovery
    /// document
    pub authorization_servers: Option<String>,

    /// User agent sent on key-set fetches
    pub user_agent: String,

    /// Clock-skew window applied to `exp` and `nbf` checks
    pub clock_tolerance: Duration,

    /// How long a fetched key set is served before it is revalidated
    pub cache_ttl: Duration,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            issuer: None,
            jwks_uri: None,
            token_endpoint: None,
            audience: None,
            authorization_servers: None,
            user_agent: String::from(DEFAULT_USER_AGENT),
            clock_tolerance: DEFAULT_CLOCK_TOLERANCE,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl OAuthConfig {
    /// Builds the configuration snapshot from the process environment
    ///
    /// Unset and blank variables are normalized to `None`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            issuer: env_opt(ENV_ISSUER),
            jwks_uri: env_opt(ENV_JWKS_URL),
            token_endpoint: env_opt(ENV_TOKEN_ENDPOINT),
            audience: env_opt(ENV_AUDIENCE),
            authorization_servers: env_opt(ENV_AUTHORIZATION_SERVERS),
            user_agent: env_opt(ENV_USER_AGENT)
                .unwrap_or_else(|| String::from(DEFAULT_USER_AGENT)),
            clock_tolerance: DEFAULT_CLOCK_TOLERANCE,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Whether bearer authentication is enforced
    ///
    /// True exactly when `issuer`, `jwks_uri`, and `token_endpoint` are
    /// all present and non-empty.
    #[must_use]
    pub fn is_oauth_configured(&self) -> bool {
        present(&self.issuer) && present(&self.jwks_uri) && present(&self.token_endpoint)
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
