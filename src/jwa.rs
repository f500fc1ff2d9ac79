//! The registry of signature algorithms accepted for bearer tokens
//!
//! Tokens presented to the service must be RSA-signed. The `RS*` family
//! uses PKCS#1 v1.5 padding; the `PS*` family uses PSS with a salt length
//! equal to the digest length (32, 48, and 64 bytes for SHA-256, SHA-384,
//! and SHA-512 respectively), which is what the `ring` parameter sets
//! below encode.

use std::fmt;

use crate::error::{self, AuthError};

/// RSA signing algorithms accepted by the verification pipeline
///
/// This list is the complete supported set; a token declaring anything
/// else is rejected before any key material is consulted.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
#[non_exhaustive]
pub enum SigningAlgorithm {
    /// RSASSA-PKCS1-v1_5 using SHA-256
    RS256,
    /// RSASSA-PKCS1-v1_5 using SHA-384
    RS384,
    /// RSASSA-PKCS1-v1_5 using SHA-512
    RS512,
    /// RSASSA-PSS using SHA-256, 32-byte salt
    PS256,
    /// RSASSA-PSS using SHA-384, 48-byte salt
    PS384,
    /// RSASSA-PSS using SHA-512, 64-byte salt
    PS512,
}

impl SigningAlgorithm {
    /// Resolves a token's declared `alg` name against the supported set
    ///
    /// # Errors
    ///
    /// Fails with `invalid_token` when the name is not one of the six
    /// supported RSA algorithms.
    pub fn from_name(name: &str) -> Result<Self, AuthError> {
        match name {
            "RS256" => Ok(Self::RS256),
            "RS384" => Ok(Self::RS384),
            "RS512" => Ok(Self::RS512),
            "PS256" => Ok(Self::PS256),
            "PS384" => Ok(Self::PS384),
            "PS512" => Ok(Self::PS512),
            other => Err(error::invalid_token(format!(
                "unsupported JWT algorithm: {other}"
            ))),
        }
    }

    pub(crate) fn verification_params(self) -> &'static ring::signature::RsaParameters {
        match self {
            SigningAlgorithm::RS256 => &ring::signature::RSA_PKCS1_2048_8192_SHA256,
            SigningAlgorithm::RS384 => &ring::signature::RSA_PKCS1_2048_8192_SHA384,
            SigningAlgorithm::RS512 => &ring::signature::RSA_PKCS1_2048_8192_SHA512,
            SigningAlgorithm::PS256 => &ring::signature::RSA_PSS_2048_8192_SHA256,
            SigningAlgorithm::PS384 => &ring::signature::RSA_PSS_2048_8192_SHA384,
            SigningAlgorithm::PS512 => &ring::signature::RSA_PSS_2048_8192_SHA512,
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::PS256 => "PS256",
            Self::PS384 => "PS384",
            Self::PS512 => "PS512",
        };

        f.write_str(s)
    }
}
