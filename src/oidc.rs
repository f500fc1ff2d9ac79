//! The OAuth protected-resource discovery document
//!
//! Clients discover how to obtain tokens for this service from a metadata
//! document derived entirely from the process configuration. How (and
//! whether) the document is exposed over HTTP is the transport's concern.

use serde::{Deserialize, Serialize};

use crate::config::OAuthConfig;

/// Discovery metadata describing this protected resource
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    /// Trusted token issuer
    pub issuer: String,

    /// Endpoint where clients obtain tokens
    pub token_endpoint: String,

    /// Location of the issuer's published key set
    pub jwks_uri: String,

    /// Authorization servers able to issue tokens for this resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_servers: Option<Vec<String>>,

    /// Identifier of this resource, present when an audience is
    /// configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

impl ResourceMetadata {
    /// Builds the discovery document from the configuration
    ///
    /// Returns `None` when bearer authentication is not configured: an
    /// unconfigured deployment has nothing to advertise.
    #[must_use]
    pub fn from_config(config: &OAuthConfig) -> Option<Self> {
        if !config.is_oauth_configured() {
            return None;
        }

        let authorization_servers = config
            .authorization_servers
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|entry| !entry.is_empty())
                    .map(str::to_owned)
                    .collect::<Vec<_>>()
            })
            .filter(|servers| !servers.is_empty());

        Some(Self {
            issuer: config.issuer.clone()?,
            token_endpoint: config.token_endpoint.clone()?,
            jwks_uri: config.jwks_uri.clone()?,
            authorization_servers,
            resource: config.audience.clone().filter(|aud| !aud.is_empty()),
        })
    }
}
