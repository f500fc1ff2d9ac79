//! JSON Web Keys as published in the authorization server's key set
//!
//! Only RSA keys carrying both public components are usable for
//! verification. Other entries are retained as published so that key
//! selection operates on the set exactly as the issuer served it; an
//! unusable key is rejected only once it has been selected.

use serde::Deserialize;

use crate::{
    error::{self, AuthError},
    jwa::SigningAlgorithm,
    jws,
};

/// A single key from a JWKS document
///
/// Unknown members are ignored on deserialization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Jwk {
    /// Key identifier, matched against a token's `kid` hint
    #[serde(default)]
    pub kid: Option<String>,

    /// Key type, e.g. `RSA` or `EC`
    #[serde(default)]
    pub kty: String,

    /// Algorithm the publisher intends the key for
    #[serde(default)]
    pub alg: Option<String>,

    /// Intended usage, e.g. `sig`
    #[serde(rename = "use", default)]
    pub usage: Option<String>,

    /// RSA public modulus, base64url-encoded
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent, base64url-encoded
    #[serde(default)]
    pub e: Option<String>,
}

impl Jwk {
    /// Imports this entry as an RSA public key restricted to signature
    /// verification
    ///
    /// # Errors
    ///
    /// Fails with `invalid_token` unless the entry is an RSA key with
    /// both `n` and `e`; a component that cannot be decoded surfaces as
    /// `unauthorized`.
    pub fn to_verification_key(&self) -> Result<PublicKey, AuthError> {
        let (n, e) = match (self.kty.as_str(), &self.n, &self.e) {
            ("RSA", Some(n), Some(e)) => (n, e),
            _ => return Err(error::invalid_token("unsupported JWKS key type")),
        };

        PublicKey::from_components(n, e)
    }
}

/// An RSA public key usable only to verify signatures
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    modulus: Vec<u8>,
    exponent: Vec<u8>,
}

impl PublicKey {
    /// Constructs a key from base64url-encoded modulus and exponent
    ///
    /// # Errors
    ///
    /// A component that is not valid base64url cannot be imported and
    /// surfaces as `unauthorized`.
    pub fn from_components(n: &str, e: &str) -> Result<Self, AuthError> {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

        let modulus = URL_SAFE_NO_PAD.decode(n).map_err(error::unexpected)?;
        let exponent = URL_SAFE_NO_PAD.decode(e).map_err(error::unexpected)?;

        Ok(Self { modulus, exponent })
    }
}

impl jws::Verifier for PublicKey {
    fn verify(
        &self,
        alg: SigningAlgorithm,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), AuthError> {
        let pk = ring::signature::RsaPublicKeyComponents {
            n: self.modulus.as_slice(),
            e: self.exponent.as_slice(),
        };

        pk.verify(alg.verification_params(), message, signature)
            .map_err(|_| error::invalid_token("access token signature invalid"))
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use crate::{error::ErrorKind, test};

    use super::*;

    #[test]
    fn deserializes_rsa_entries_with_unknown_members() -> Result<()> {
        let jwk: Jwk = serde_json::from_str(
            r#"{"kty":"RSA","kid":"a","use":"sig","n":"AQAB","e":"AQAB","x5c":["ignored"]}"#,
        )?;
        assert_eq!(jwk.kid.as_deref(), Some("a"));
        assert_eq!(jwk.kty, "RSA");
        Ok(())
    }

    #[test]
    fn imports_a_published_rsa_key() -> Result<()> {
        let jwk = Jwk {
            kty: String::from("RSA"),
            n: Some(String::from(test::KEY_1_N)),
            e: Some(String::from(test::KEY_1_E)),
            ..Jwk::default()
        };

        jwk.to_verification_key()?;
        Ok(())
    }

    #[test]
    fn refuses_non_rsa_keys() {
        let jwk: Jwk =
            serde_json::from_str(r#"{"kty":"EC","crv":"P-256","x":"AA","y":"AA"}"#).unwrap();
        let err = jwk.to_verification_key().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidToken);
        assert_eq!(err.message(), "unsupported JWKS key type");
    }

    #[test]
    fn refuses_rsa_keys_missing_components() {
        let jwk = Jwk {
            kty: String::from("RSA"),
            n: Some(String::from("AQAB")),
            ..Jwk::default()
        };

        let err = jwk.to_verification_key().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidToken);
    }

    #[test]
    fn an_undecodable_component_is_an_import_failure() {
        let err = PublicKey::from_components("n=ot/base64url", "AQAB").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }
}
