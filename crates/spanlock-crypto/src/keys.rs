//! Role-typed key material.
//!
//! The wire and storage formats are raw byte buffers; these wrappers exist so
//! that a D-KEY cannot be handed where a consumer key belongs and a content
//! key cannot leak into an asymmetric call site. Secret-carrying types
//! zeroize their buffers on drop and redact their `Debug` output.

use std::fmt;

use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{error::CryptoError, rsa, CONTENT_KEY_SIZE};

/// Hourly symmetric content key (AES-128).
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ContentKey([u8; CONTENT_KEY_SIZE]);

impl ContentKey {
    /// Fresh random content key.
    pub fn generate(rng: &mut (impl RngCore + CryptoRng)) -> Self {
        let mut bits = [0u8; CONTENT_KEY_SIZE];
        rng.fill_bytes(&mut bits);
        Self(bits)
    }

    /// Content key from stored or unwrapped bits.
    ///
    /// # Errors
    ///
    /// `CryptoError::InvalidKeyLength` unless exactly 16 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bits: [u8; CONTENT_KEY_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: "16",
                    got: bytes.len(),
                })?;
        Ok(Self(bits))
    }

    /// Raw key bits.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentKey(..)")
    }
}

/// Public half of a group keypair (SPKI DER). Wraps content keys.
#[derive(Clone, PartialEq, Eq)]
pub struct EKeyPublic(Vec<u8>);

impl EKeyPublic {
    /// Wrap SPKI DER bytes as received from the network.
    pub fn from_der(der: impl Into<Vec<u8>>) -> Self {
        Self(der.into())
    }

    /// Canonical DER bytes.
    pub fn as_der(&self) -> &[u8] {
        &self.0
    }

    /// True before any key has been cached (the sentinel coverage record).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for EKeyPublic {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl fmt::Debug for EKeyPublic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EKeyPublic({} bytes)", self.0.len())
    }
}

/// Private half of a group keypair (PKCS#8 DER). Unwraps content keys.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DKeyPrivate(Vec<u8>);

impl DKeyPrivate {
    /// Generate a fresh group keypair, returning its private half.
    ///
    /// # Errors
    ///
    /// `CryptoError` from the underlying generation.
    pub fn generate(
        rng: &mut (impl RngCore + CryptoRng),
        bits: usize,
    ) -> Result<Self, CryptoError> {
        Ok(Self(rsa::generate(rng, bits)?))
    }

    /// Wrap PKCS#8 DER bytes as unwrapped from a D-KEY object.
    pub fn from_der(der: impl Into<Vec<u8>>) -> Self {
        Self(der.into())
    }

    /// Derive the matching E-KEY.
    ///
    /// # Errors
    ///
    /// `CryptoError::MalformedKey` when the buffer is not a valid key.
    pub fn derive_public(&self) -> Result<EKeyPublic, CryptoError> {
        Ok(EKeyPublic::from_der(rsa::derive_public(&self.0)?))
    }

    /// Canonical DER bytes.
    pub fn as_der(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for DKeyPrivate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DKeyPrivate(..)")
    }
}

/// A consumer's own private key (PKCS#8 DER). Unwraps D-KEY nonces.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ConsumerPrivate(Vec<u8>);

impl ConsumerPrivate {
    /// Generate a fresh consumer keypair, returning its private half.
    ///
    /// # Errors
    ///
    /// `CryptoError` from the underlying generation.
    pub fn generate(
        rng: &mut (impl RngCore + CryptoRng),
        bits: usize,
    ) -> Result<Self, CryptoError> {
        Ok(Self(rsa::generate(rng, bits)?))
    }

    /// Wrap PKCS#8 DER bytes loaded from the key database.
    pub fn from_der(der: impl Into<Vec<u8>>) -> Self {
        Self(der.into())
    }

    /// Derive the public half (SPKI DER) for enrollment fixtures.
    ///
    /// # Errors
    ///
    /// `CryptoError::MalformedKey` when the buffer is not a valid key.
    pub fn derive_public_der(&self) -> Result<Vec<u8>, CryptoError> {
        rsa::derive_public(&self.0)
    }

    /// Canonical DER bytes.
    pub fn as_der(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for ConsumerPrivate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConsumerPrivate(..)")
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::RsaScheme;

    #[test]
    fn content_key_length_is_enforced() {
        assert!(ContentKey::from_bytes(&[0u8; 16]).is_ok());
        assert!(matches!(
            ContentKey::from_bytes(&[0u8; 15]),
            Err(CryptoError::InvalidKeyLength { got: 15, .. })
        ));
        assert!(matches!(
            ContentKey::from_bytes(&[0u8; 32]),
            Err(CryptoError::InvalidKeyLength { got: 32, .. })
        ));
    }

    #[test]
    fn content_key_generation_uses_the_rng() {
        let mut rng_a = StdRng::seed_from_u64(1);
        let mut rng_b = StdRng::seed_from_u64(1);
        assert_eq!(ContentKey::generate(&mut rng_a), ContentKey::generate(&mut rng_b));

        let mut rng_c = StdRng::seed_from_u64(2);
        assert_ne!(ContentKey::generate(&mut rng_a), ContentKey::generate(&mut rng_c));
    }

    #[test]
    fn debug_output_is_redacted() {
        let key = ContentKey::from_bytes(&[0xAA; 16]).unwrap();
        assert_eq!(format!("{key:?}"), "ContentKey(..)");

        let d_key = DKeyPrivate::from_der(vec![1, 2, 3]);
        assert_eq!(format!("{d_key:?}"), "DKeyPrivate(..)");
    }

    #[test]
    fn group_pair_wraps_and_unwraps() {
        let mut rng = StdRng::seed_from_u64(7);
        let d_key = DKeyPrivate::generate(&mut rng, 1024).unwrap();
        let e_key = d_key.derive_public().unwrap();

        let content_key = ContentKey::generate(&mut rng);
        let wrapped = crate::rsa::encrypt(
            &mut rng,
            e_key.as_der(),
            content_key.as_bytes(),
            RsaScheme::OaepSha256,
        )
        .unwrap();
        let unwrapped =
            crate::rsa::decrypt(d_key.as_der(), &wrapped, RsaScheme::OaepSha256).unwrap();
        assert_eq!(unwrapped, content_key.as_bytes());
    }

    #[test]
    fn sentinel_e_key_is_empty() {
        assert!(EKeyPublic::default().is_empty());
        assert!(!EKeyPublic::from_der(vec![1]).is_empty());
    }
}
