//! The signature-verification seam
//!
//! The token pipeline depends on this trait rather than on a particular
//! cryptography library; [`crate::jwk::PublicKey`] provides the `ring`
//! implementation.

use crate::{error::AuthError, jwa::SigningAlgorithm};

/// A provider able to verify token signatures
pub trait Verifier {
    /// Attempts to verify `signature` over `message` using the
    /// specified algorithm
    ///
    /// # Errors
    ///
    /// Fails with `invalid_token` when the signature does not match.
    fn verify(
        &self,
        alg: SigningAlgorithm,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), AuthError>;
}

impl<T> Verifier for &'_ T
where
    T: Verifier,
{
    #[inline]
    fn verify(
        &self,
        alg: SigningAlgorithm,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), AuthError> {
        T::verify(self, alg, message, signature)
    }
}
