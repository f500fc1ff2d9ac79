//! Compact token handling and claim validation
//!
//! A bearer token arrives as three dot-separated base64url segments:
//! header, payload, and signature. The header is decoded early because it
//! elects the verification key, but nothing read from it is trusted until
//! the signature has been checked; the payload stays encoded until then,
//! so claims from an unverified token are never even parsed.

use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Deserialize;

use crate::{
    clock::{Clock, UnixTime},
    error::{self, AuthError},
    jwa::SigningAlgorithm,
    jws::Verifier,
};

/// The header segment of a compact token, parsed prior to verification
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Headers {
    /// Declared signing algorithm
    #[serde(default)]
    pub alg: Option<String>,

    /// Key-id hint for selection against the key set
    #[serde(default)]
    pub kid: Option<String>,

    /// Declared token type
    #[serde(default)]
    pub typ: Option<String>,
}

/// A compact token split into its constituent segments
///
/// `message` keeps the original encoded `header.payload` text, which is
/// the exact byte sequence the signature was produced over.
#[derive(Clone, Debug)]
#[must_use]
pub struct Decomposed<'a> {
    header: Headers,
    message: &'a str,
    payload: &'a str,
    signature: Vec<u8>,
}

impl<'a> Decomposed<'a> {
    /// Splits a compact token and decodes its header and signature
    ///
    /// # Errors
    ///
    /// Fails with `invalid_token` unless the token has exactly three
    /// segments, a base64url-decodable JSON header, and a decodable
    /// signature.
    pub fn from_token(token: &'a str) -> Result<Self, AuthError> {
        let malformed = || error::invalid_token("invalid JWT format");

        let (message, sig_segment) = token.rsplit_once('.').ok_or_else(malformed)?;
        let (header_segment, payload_segment) = message.rsplit_once('.').ok_or_else(malformed)?;
        if header_segment.contains('.') {
            return Err(malformed());
        }

        let header_raw = decode_segment(header_segment)?;
        let header: Headers = serde_json::from_slice(&header_raw)
            .map_err(|_| error::invalid_token("failed to decode JWT"))?;
        let signature = decode_segment(sig_segment)?;

        Ok(Self {
            header,
            message,
            payload: payload_segment,
            signature,
        })
    }

    /// The parsed, still-unverified header
    ///
    /// Only suitable for electing a verification key; an adversary
    /// controls every value in it.
    pub fn header(&self) -> &Headers {
        &self.header
    }

    /// Resolves the declared algorithm against the supported set
    ///
    /// # Errors
    ///
    /// Fails with `invalid_token` when `alg` is missing, empty, or not a
    /// supported RSA algorithm.
    pub fn algorithm(&self) -> Result<SigningAlgorithm, AuthError> {
        match self.header.alg.as_deref() {
            None | Some("") => Err(error::invalid_token("JWT header missing alg")),
            Some(name) => SigningAlgorithm::from_name(name),
        }
    }

    /// Verifies the signature and only then parses the payload
    ///
    /// # Errors
    ///
    /// Fails with `invalid_token` when the signature does not match or
    /// the payload segment cannot be decoded afterwards.
    pub fn verify(
        self,
        alg: SigningAlgorithm,
        key: &impl Verifier,
    ) -> Result<Claims, AuthError> {
        key.verify(alg, self.message.as_bytes(), &self.signature)?;

        let raw = decode_segment(self.payload)?;
        let claims: Claims = serde_json::from_slice(&raw)
            .map_err(|_| error::invalid_token("failed to decode JWT"))?;

        Ok(claims)
    }
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, AuthError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| error::invalid_token("failed to decode JWT"))
}

/// Claims carried by a verified token
///
/// `exp` and `nbf` may arrive as numbers or numeric strings; any other
/// shape is treated as if the claim were absent. Claims this service
/// never evaluates are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Claims {
    /// Token issuer
    #[serde(default)]
    pub iss: Option<String>,

    /// Intended audiences; a scalar or an array on the wire
    #[serde(default)]
    pub aud: Audiences,

    /// Subject the token was issued to
    #[serde(default)]
    pub sub: Option<String>,

    /// Expiry, in seconds since the Unix epoch
    #[serde(default, deserialize_with = "numeric_claim")]
    pub exp: Option<UnixTime>,

    /// Not-before, in seconds since the Unix epoch
    #[serde(default, deserialize_with = "numeric_claim")]
    pub nbf: Option<UnixTime>,
}

/// The audiences named by a token's `aud` claim
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct Audiences(Vec<String>);

impl Audiences {
    /// An empty audience set
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Indicates whether the audience set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `audience` is named in the set
    #[must_use]
    pub fn contains(&self, audience: &str) -> bool {
        self.0.iter().any(|a| a == audience)
    }

    /// Iterates through the audiences in the set
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for Audiences {
    fn from(vals: Vec<String>) -> Self {
        Self(vals)
    }
}

impl<'de> Deserialize<'de> for Audiences {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
            Other(serde::de::IgnoredAny),
        }

        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(aud) => Self(vec![aud]),
            OneOrMany::Many(auds) => Self(auds),
            OneOrMany::Other(_) => Self::empty(),
        })
    }
}

fn numeric_claim<'de, D>(deserializer: D) -> Result<Option<UnixTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    let as_time = |n: f64| (n.is_finite() && n >= 0.0).then(|| UnixTime(n as u64));

    Ok(Option::<Raw>::deserialize(deserializer)?.and_then(|raw| match raw {
        Raw::Number(n) => as_time(n),
        Raw::Text(s) => s.trim().parse::<f64>().ok().and_then(as_time),
        Raw::Other(_) => None,
    }))
}

/// Validates time-bound and identity claims against the service
/// configuration
///
/// Checks run in a fixed order — expiry, not-before, issuer, audience —
/// and fail fast on the first violation.
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct ClaimsValidator {
    issuer: Option<String>,
    audience: Option<String>,
    leeway: Duration,
}

impl ClaimsValidator {
    /// Creates a validator with no identity requirements and no leeway
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows a grace period on either side of the `exp` and `nbf` claims
    pub fn with_leeway(self, leeway: Duration) -> Self {
        Self { leeway, ..self }
    }

    /// Requires tokens to name exactly this issuer
    pub fn require_issuer(self, issuer: impl Into<String>) -> Self {
        Self {
            issuer: Some(issuer.into()),
            ..self
        }
    }

    /// Requires tokens to include this audience
    pub fn require_audience(self, audience: impl Into<String>) -> Self {
        Self {
            audience: Some(audience.into()),
            ..self
        }
    }

    /// Validates `claims` as of `now`
    ///
    /// # Errors
    ///
    /// Fails with `token_expired`, `token_inactive`, or `invalid_token`
    /// according to the first violated check.
    pub fn validate_at(&self, claims: &Claims, now: UnixTime) -> Result<(), AuthError> {
        let leeway = self.leeway.as_secs();

        if let Some(exp) = claims.exp {
            if now.0.saturating_sub(leeway) >= exp.0 {
                return Err(error::token_expired());
            }
        }

        if let Some(nbf) = claims.nbf {
            if nbf.0 > now.0.saturating_add(leeway) {
                return Err(error::token_inactive());
            }
        }

        if let Some(expected) = &self.issuer {
            match &claims.iss {
                Some(iss) if iss == expected => {}
                Some(_) => return Err(error::invalid_token("unexpected issuer")),
                None => return Err(error::invalid_token("issuer claim missing in token")),
            }
        }

        if let Some(expected) = &self.audience {
            if !claims.aud.contains(expected) {
                return Err(error::invalid_token("unexpected audience"));
            }
        }

        Ok(())
    }

    /// Validates `claims` at the current time of `clock`
    ///
    /// # Errors
    ///
    /// See [`validate_at`](Self::validate_at).
    pub fn validate_with_clock<C: Clock>(
        &self,
        claims: &Claims,
        clock: &C,
    ) -> Result<(), AuthError> {
        self.validate_at(claims, clock.now())
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use crate::{error::ErrorKind, test};

    use super::*;

    const NOW: UnixTime = UnixTime(test::TEST_EPOCH);
    const TOLERANCE: Duration = Duration::from_secs(60);

    fn claims(json: &str) -> Claims {
        serde_json::from_str(json).expect("claims fixture parses")
    }

    #[test]
    fn decomposes_a_compact_token() -> Result<()> {
        let decomposed = Decomposed::from_token(test::TOKEN_RS256)?;

        assert_eq!(decomposed.header().alg.as_deref(), Some("RS256"));
        assert_eq!(decomposed.header().kid.as_deref(), Some("wlo-rs-1"));
        assert_eq!(decomposed.header().typ.as_deref(), Some("JWT"));
        assert_eq!(decomposed.algorithm()?, SigningAlgorithm::RS256);
        Ok(())
    }

    #[test]
    fn rejects_tokens_without_three_segments() {
        for token in ["", "only-one", "two.segments", "a.b.c.d"] {
            let err = Decomposed::from_token(token).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidToken, "token {token:?}");
        }
    }

    #[test]
    fn rejects_an_undecodable_header() {
        let err = Decomposed::from_token("!!!.e30.c2ln").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidToken);
    }

    #[test]
    fn rejects_a_header_that_is_not_json() {
        // "bm90LWpzb24" decodes to "not-json"
        let err = Decomposed::from_token("bm90LWpzb24.e30.c2ln").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidToken);
    }

    #[test]
    fn a_missing_alg_is_reported_before_key_selection() -> Result<()> {
        let decomposed = Decomposed::from_token(test::TOKEN_NO_ALG)?;
        let err = decomposed.algorithm().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidToken);
        assert_eq!(err.message(), "JWT header missing alg");
        Ok(())
    }

    #[test]
    fn verifies_and_parses_the_payload() -> Result<()> {
        let key = crate::jwk::PublicKey::from_components(test::KEY_1_N, test::KEY_1_E)?;
        let decomposed = Decomposed::from_token(test::TOKEN_RS256)?;
        let alg = decomposed.algorithm()?;

        let claims = decomposed.verify(alg, &key)?;
        assert_eq!(claims.iss.as_deref(), Some(test::TEST_ISSUER));
        assert!(claims.aud.contains(test::TEST_AUDIENCE));
        Ok(())
    }

    #[test]
    fn a_tampered_payload_fails_verification() -> Result<()> {
        let key = crate::jwk::PublicKey::from_components(test::KEY_1_N, test::KEY_1_E)?;
        let decomposed = Decomposed::from_token(test::TOKEN_TAMPERED)?;
        let alg = decomposed.algorithm()?;

        let err = decomposed.verify(alg, &key).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidToken);
        assert_eq!(err.message(), "access token signature invalid");
        Ok(())
    }

    #[test]
    fn numeric_claims_accept_numbers_and_numeric_strings() {
        let parsed = claims(r#"{"exp": 1700000600, "nbf": "1700000000"}"#);
        assert_eq!(parsed.exp, Some(UnixTime(1_700_000_600)));
        assert_eq!(parsed.nbf, Some(UnixTime(1_700_000_000)));
    }

    #[test]
    fn non_numeric_time_claims_are_treated_as_absent() {
        let parsed = claims(r#"{"exp": "soon", "nbf": true}"#);
        assert_eq!(parsed.exp, None);
        assert_eq!(parsed.nbf, None);

        let parsed = claims(r#"{"exp": [1, 2], "nbf": {"at": 3}}"#);
        assert_eq!(parsed.exp, None);
        assert_eq!(parsed.nbf, None);
    }

    #[test]
    fn audiences_accept_scalar_and_array_forms() {
        let parsed = claims(r#"{"aud": "wlo-mcp"}"#);
        assert!(parsed.aud.contains("wlo-mcp"));

        let parsed = claims(r#"{"aud": ["moodle", "wlo-mcp"]}"#);
        assert!(parsed.aud.contains("wlo-mcp"));
        assert_eq!(parsed.aud.iter().count(), 2);

        let parsed = claims(r#"{"aud": 42}"#);
        assert!(parsed.aud.is_empty());
    }

    #[test]
    fn expiry_tolerance_boundaries() {
        let validator = ClaimsValidator::new().with_leeway(TOLERANCE);

        let barely_expired = claims(&format!(r#"{{"exp": {}}}"#, NOW.0 - 61));
        let err = validator.validate_at(&barely_expired, NOW).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TokenExpired);

        let within_tolerance = claims(&format!(r#"{{"exp": {}}}"#, NOW.0 - 59));
        validator
            .validate_at(&within_tolerance, NOW)
            .expect("inside the skew window");
    }

    #[test]
    fn not_before_tolerance_boundaries() {
        let validator = ClaimsValidator::new().with_leeway(TOLERANCE);

        let too_early = claims(&format!(r#"{{"nbf": {}}}"#, NOW.0 + 61));
        let err = validator.validate_at(&too_early, NOW).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TokenInactive);

        let within_tolerance = claims(&format!(r#"{{"nbf": {}}}"#, NOW.0 + 59));
        validator
            .validate_at(&within_tolerance, NOW)
            .expect("inside the skew window");
    }

    #[test]
    fn missing_time_claims_pass_the_time_checks() {
        let validator = ClaimsValidator::new().with_leeway(TOLERANCE);
        validator
            .validate_at(&claims("{}"), NOW)
            .expect("no time claims to violate");
    }

    #[test]
    fn a_required_issuer_must_be_present_and_equal() {
        let validator = ClaimsValidator::new().require_issuer(test::TEST_ISSUER);

        let matching = claims(&format!(r#"{{"iss": "{}"}}"#, test::TEST_ISSUER));
        validator.validate_at(&matching, NOW).expect("issuer matches");

        let mismatched = claims(r#"{"iss": "https://evil.example.com"}"#);
        let err = validator.validate_at(&mismatched, NOW).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidToken);
        assert_eq!(err.message(), "unexpected issuer");

        let missing = claims("{}");
        let err = validator.validate_at(&missing, NOW).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidToken);
        assert_eq!(err.message(), "issuer claim missing in token");
    }

    #[test]
    fn a_required_audience_must_be_named() {
        let validator = ClaimsValidator::new().require_audience("aud2");

        let multi = claims(r#"{"aud": ["aud1", "aud2"]}"#);
        validator.validate_at(&multi, NOW).expect("aud2 is named");

        let validator = ClaimsValidator::new().require_audience("aud3");
        let err = validator.validate_at(&multi, NOW).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidToken);
        assert_eq!(err.message(), "unexpected audience");

        let absent = claims("{}");
        let err = validator.validate_at(&absent, NOW).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidToken);
    }

    #[test]
    fn expiry_is_checked_before_identity_claims() {
        let validator = ClaimsValidator::new()
            .with_leeway(TOLERANCE)
            .require_issuer(test::TEST_ISSUER);

        let expired_and_wrong_issuer = claims(&format!(
            r#"{{"exp": {}, "iss": "https://evil.example.com"}}"#,
            NOW.0 - 3600
        ));

        let err = validator
            .validate_at(&expired_and_wrong_issuer, NOW)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TokenExpired);
    }
}
