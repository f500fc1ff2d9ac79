//! The request-facing authority: key-set cache and bearer-token gate
//!
//! One [`Authority`] is built at startup from the process configuration
//! and shared across request handlers. It owns the only piece of shared
//! mutable state in the subsystem — the cached key set — as an atomic
//! snapshot that refreshes are swapped into wholesale; verification
//! itself is pure in the token, the snapshot, and the current time.

use std::{sync::Arc, time::Duration};

use arc_swap::ArcSwapOption;
use http::{header::AUTHORIZATION, HeaderMap};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use tokio::sync::Mutex;

use crate::{
    clock::{Clock, System, UnixTime},
    config::OAuthConfig,
    error::{self, AuthError},
    jwks::Jwks,
    jwt::{Claims, ClaimsValidator, Decomposed},
    oidc::ResourceMetadata,
};

/// Upper bound on a key-set fetch; a timeout surfaces as `server_error`
const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

static BEARER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^Bearer\s+(.+)$").expect("bearer pattern compiles"));

#[derive(Debug)]
struct CacheEntry {
    fetched_at: UnixTime,
    jwks: Jwks,
}

#[derive(Debug)]
struct Inner<C> {
    config: OAuthConfig,
    validator: ClaimsValidator,
    client: Client,
    cache: ArcSwapOption<CacheEntry>,
    refresh: Mutex<()>,
    clock: C,
}

/// Authenticates inbound requests against the configured authorization
/// server
///
/// Cheap to clone; clones share the cached key set.
///
/// # Disabled authentication
///
/// When the deployment does not provide all of `OAUTH_ISSUER`,
/// `OAUTH_JWKS_URL`, and `OAUTH_TOKEN_ENDPOINT`, bearer authentication is
/// **disabled** and [`ensure_authorized`](Authority::ensure_authorized)
/// admits every request without inspecting it. This is a deliberate
/// operational default for local development; the condition is logged
/// loudly at construction.
#[derive(Debug)]
#[must_use]
pub struct Authority<C = System> {
    inner: Arc<Inner<C>>,
}

impl<C> Clone for Authority<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Authority {
    /// Builds an authority from configuration, reading the system clock
    ///
    /// # Errors
    ///
    /// Fails with `server_error` if the HTTP client cannot be
    /// constructed.
    pub fn new(config: OAuthConfig) -> Result<Self, AuthError> {
        Self::with_clock(config, System)
    }
}

impl<C> Authority<C>
where
    C: Clock,
{
    /// Builds an authority with an explicit time source
    ///
    /// # Errors
    ///
    /// Fails with `server_error` if the HTTP client cannot be
    /// constructed.
    pub fn with_clock(config: OAuthConfig, clock: C) -> Result<Self, AuthError> {
        if !config.is_oauth_configured() {
            tracing::warn!(
                "OAuth is not configured; bearer authentication is disabled and \
                 every request will be authorized"
            );
        }

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(JWKS_FETCH_TIMEOUT)
            .build()
            .map_err(|err| error::server_error_with("failed to build JWKS HTTP client", err))?;

        let mut validator = ClaimsValidator::new().with_leeway(config.clock_tolerance);
        if let Some(issuer) = config.issuer.as_deref().filter(|v| !v.is_empty()) {
            validator = validator.require_issuer(issuer);
        }
        if let Some(audience) = config.audience.as_deref().filter(|v| !v.is_empty()) {
            validator = validator.require_audience(audience);
        }

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                validator,
                client,
                cache: ArcSwapOption::empty(),
                refresh: Mutex::new(()),
                clock,
            }),
        })
    }

    /// Whether bearer authentication is enforced
    #[must_use]
    pub fn is_oauth_configured(&self) -> bool {
        self.inner.config.is_oauth_configured()
    }

    /// The discovery document for this protected resource, or `None`
    /// when authentication is not configured
    #[must_use]
    pub fn oauth_metadata(&self) -> Option<ResourceMetadata> {
        ResourceMetadata::from_config(&self.inner.config)
    }

    /// Replaces the cached key set without a network round-trip
    ///
    /// The injected set counts as freshly fetched and is served until the
    /// cache TTL lapses.
    pub fn set_jwks(&self, jwks: Jwks) {
        let entry = CacheEntry {
            fetched_at: self.inner.clock.now(),
            jwks,
        };
        self.inner.cache.store(Some(Arc::new(entry)));
    }

    /// Authorizes one inbound request from its headers
    ///
    /// Succeeds unconditionally while authentication is disabled (see the
    /// type-level documentation). Otherwise the first non-empty
    /// `Authorization` value must present a `Bearer` token that passes
    /// signature verification and claim validation.
    ///
    /// # Errors
    ///
    /// Returns the typed failure of the first pipeline stage that
    /// rejects the request; nothing is retried.
    pub async fn ensure_authorized(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        if !self.is_oauth_configured() {
            return Ok(());
        }

        let raw = authorization_header(headers).ok_or_else(error::missing_authorization)?;
        let captures = BEARER
            .captures(&raw)
            .ok_or_else(error::invalid_authorization_scheme)?;

        let token = captures[1].trim();
        if token.is_empty() {
            return Err(error::invalid_token("bearer token is empty"));
        }

        self.verify_token(token).await.map(|_| ())
    }

    /// Verifies a compact bearer token and returns its validated claims
    ///
    /// Signature verification always precedes claim validation; claims
    /// from a token whose signature has not been checked are never
    /// parsed, trusted, or logged.
    ///
    /// # Errors
    ///
    /// Fails with `invalid_token` for a malformed token, unsupported
    /// algorithm, unresolvable or unusable key, bad signature, or bad
    /// issuer/audience; `token_expired`/`token_inactive` for time-claim
    /// violations; `server_error` when the key set cannot be obtained.
    pub async fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let decomposed = Decomposed::from_token(token)?;
        let alg = decomposed.algorithm()?;

        let entry = self.current_keys().await?;

        let kid = decomposed.header().kid.as_deref();
        let key = entry.jwks.select_key(kid).ok_or_else(|| {
            if let Some(kid) = kid {
                tracing::debug!(%kid, "unable to find matching key");
            } else {
                tracing::debug!("unable to find matching key");
            }
            error::invalid_token("no matching JWKS key found for token")
        })?;

        let verification_key = key.to_verification_key()?;
        let claims = decomposed.verify(alg, &verification_key)?;

        self.inner
            .validator
            .validate_at(&claims, self.inner.clock.now())?;

        Ok(claims)
    }

    /// Returns the cached key set, refreshing it when the TTL has lapsed
    async fn current_keys(&self) -> Result<Arc<CacheEntry>, AuthError> {
        if let Some(entry) = self.fresh_entry() {
            return Ok(entry);
        }

        // Coalesce concurrent misses into one in-flight fetch; whoever
        // held the lock first has already refreshed the snapshot.
        let _flight = self.inner.refresh.lock().await;
        if let Some(entry) = self.fresh_entry() {
            return Ok(entry);
        }

        let jwks = self.fetch_jwks().await?;
        let entry = Arc::new(CacheEntry {
            fetched_at: self.inner.clock.now(),
            jwks,
        });
        self.inner.cache.store(Some(Arc::clone(&entry)));

        Ok(entry)
    }

    fn fresh_entry(&self) -> Option<Arc<CacheEntry>> {
        let entry = self.inner.cache.load_full()?;
        let age = self.inner.clock.now().0.saturating_sub(entry.fetched_at.0);

        (Duration::from_secs(age) < self.inner.config.cache_ttl).then_some(entry)
    }

    #[tracing::instrument(skip(self), fields(jwks.url = tracing::field::Empty))]
    async fn fetch_jwks(&self) -> Result<Jwks, AuthError> {
        let url = self
            .inner
            .config
            .jwks_uri
            .as_deref()
            .ok_or_else(|| error::server_error("OAuth JWKS URI not configured"))?;

        tracing::Span::current().record("jwks.url", url);
        tracing::debug!("refreshing JWKS");

        let response = self
            .inner
            .client
            .get(url)
            .header(http::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| error::server_error_with("JWKS fetch failed", err))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                http.status_code = status.as_u16(),
                "JWKS refresh failed; unexpected response status"
            );
            return Err(error::server_error(format!(
                "JWKS fetch failed ({})",
                status.as_u16()
            )));
        }

        let jwks = response.json::<Jwks>().await.map_err(|err| {
            error::server_error_with("JWKS response was not a valid key set", err)
        })?;

        if jwks.is_empty() {
            tracing::warn!("JWKS refresh failed; document contained no keys");
            return Err(error::server_error("JWKS did not contain any keys"));
        }

        tracing::info!(jwks.keys = jwks.keys().len(), "JWKS refreshed");
        Ok(jwks)
    }
}

fn authorization_header(headers: &HeaderMap) -> Option<String> {
    headers.get_all(AUTHORIZATION).iter().find_map(|value| {
        let value = String::from_utf8_lossy(value.as_bytes());
        (!value.is_empty()).then(|| value.into_owned())
    })
}
