//! RSA primitives over canonical DER buffers.
//!
//! Private keys travel as PKCS#8 DER, public keys as SPKI DER; this module is
//! the only place that parses either. Two padding schemes are supported:
//! PKCS#1 v1.5 and OAEP with SHA-256. Payloads are short by construction;
//! the protocol only ever wraps symmetric keys asymmetrically.

use rand::{CryptoRng, RngCore};
use rsa::{
    pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey},
    Oaep, Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey,
};
use sha2::Sha256;

use crate::error::CryptoError;

/// Asymmetric padding scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaScheme {
    /// PKCS#1 v1.5 encryption padding.
    Pkcs1v15,
    /// OAEP with SHA-256 for both the hash and the mask generation function.
    OaepSha256,
}

/// Generate a fresh private key, returned as PKCS#8 DER.
///
/// # Errors
///
/// `CryptoError::Rsa` when generation fails (e.g. unsupported bit size),
/// `CryptoError::MalformedKey` when DER serialization fails.
pub fn generate(rng: &mut (impl RngCore + CryptoRng), bits: usize) -> Result<Vec<u8>, CryptoError> {
    let key = RsaPrivateKey::new(rng, bits).map_err(|e| CryptoError::Rsa(e.to_string()))?;
    let der = key
        .to_pkcs8_der()
        .map_err(|e| CryptoError::MalformedKey(e.to_string()))?;
    Ok(der.as_bytes().to_vec())
}

/// Derive the public half of a PKCS#8 private key, returned as SPKI DER.
///
/// Deterministic: the same private key always yields the same bytes.
///
/// # Errors
///
/// `CryptoError::MalformedKey` when either DER step fails.
pub fn derive_public(private_pkcs8: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let key = RsaPrivateKey::from_pkcs8_der(private_pkcs8)
        .map_err(|e| CryptoError::MalformedKey(e.to_string()))?;
    let public = RsaPublicKey::from(&key);
    let der = public
        .to_public_key_der()
        .map_err(|e| CryptoError::MalformedKey(e.to_string()))?;
    Ok(der.as_bytes().to_vec())
}

/// Encrypt `plaintext` under an SPKI public key.
///
/// # Errors
///
/// `CryptoError::MalformedKey` for unparseable key material,
/// `CryptoError::Rsa` when the payload exceeds the scheme's capacity.
pub fn encrypt(
    rng: &mut (impl RngCore + CryptoRng),
    public_spki: &[u8],
    plaintext: &[u8],
    scheme: RsaScheme,
) -> Result<Vec<u8>, CryptoError> {
    let key = RsaPublicKey::from_public_key_der(public_spki)
        .map_err(|e| CryptoError::MalformedKey(e.to_string()))?;
    let ciphertext = match scheme {
        RsaScheme::Pkcs1v15 => key.encrypt(rng, Pkcs1v15Encrypt, plaintext),
        RsaScheme::OaepSha256 => key.encrypt(rng, Oaep::new::<Sha256>(), plaintext),
    }
    .map_err(|e| CryptoError::Rsa(e.to_string()))?;
    Ok(ciphertext)
}

/// Decrypt `ciphertext` under a PKCS#8 private key.
///
/// # Errors
///
/// `CryptoError::MalformedKey` for unparseable key material,
/// `CryptoError::Rsa` when decryption fails (wrong key or scheme included).
pub fn decrypt(
    private_pkcs8: &[u8],
    ciphertext: &[u8],
    scheme: RsaScheme,
) -> Result<Vec<u8>, CryptoError> {
    let key = RsaPrivateKey::from_pkcs8_der(private_pkcs8)
        .map_err(|e| CryptoError::MalformedKey(e.to_string()))?;
    let plaintext = match scheme {
        RsaScheme::Pkcs1v15 => key.decrypt(Pkcs1v15Encrypt, ciphertext),
        RsaScheme::OaepSha256 => key.decrypt(Oaep::new::<Sha256>(), ciphertext),
    }
    .map_err(|e| CryptoError::Rsa(e.to_string()))?;
    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    const TEST_BITS: usize = 1024;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0x5EED)
    }

    #[test]
    fn round_trip_both_schemes() {
        let mut rng = rng();
        let private = generate(&mut rng, TEST_BITS).unwrap();
        let public = derive_public(&private).unwrap();

        for scheme in [RsaScheme::Pkcs1v15, RsaScheme::OaepSha256] {
            let message = b"sixteen byte key";
            let ciphertext = encrypt(&mut rng, &public, message, scheme).unwrap();
            assert_ne!(ciphertext, message);
            assert_eq!(decrypt(&private, &ciphertext, scheme).unwrap(), message);
        }
    }

    #[test]
    fn derive_public_is_deterministic() {
        let mut rng = rng();
        let private = generate(&mut rng, TEST_BITS).unwrap();
        assert_eq!(
            derive_public(&private).unwrap(),
            derive_public(&private).unwrap()
        );
    }

    #[test]
    fn scheme_mismatch_fails() {
        let mut rng = rng();
        let private = generate(&mut rng, TEST_BITS).unwrap();
        let public = derive_public(&private).unwrap();

        let ciphertext = encrypt(&mut rng, &public, b"key", RsaScheme::OaepSha256).unwrap();
        assert!(matches!(
            decrypt(&private, &ciphertext, RsaScheme::Pkcs1v15),
            Err(CryptoError::Rsa(_))
        ));
    }

    #[test]
    fn wrong_key_fails() {
        let mut rng = rng();
        let private_a = generate(&mut rng, TEST_BITS).unwrap();
        let private_b = generate(&mut rng, TEST_BITS).unwrap();
        let public_a = derive_public(&private_a).unwrap();

        let ciphertext = encrypt(&mut rng, &public_a, b"key", RsaScheme::OaepSha256).unwrap();
        assert!(matches!(
            decrypt(&private_b, &ciphertext, RsaScheme::OaepSha256),
            Err(CryptoError::Rsa(_))
        ));
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let mut rng = rng();
        let private = generate(&mut rng, TEST_BITS).unwrap();
        let public = derive_public(&private).unwrap();

        // OAEP-SHA256 capacity for a 1024-bit key is 128 - 2*32 - 2 = 62.
        let too_long = vec![0u8; 63];
        assert!(matches!(
            encrypt(&mut rng, &public, &too_long, RsaScheme::OaepSha256),
            Err(CryptoError::Rsa(_))
        ));
    }

    #[test]
    fn garbage_key_material_is_rejected() {
        let mut rng = rng();
        assert!(matches!(
            encrypt(&mut rng, b"not a key", b"m", RsaScheme::OaepSha256),
            Err(CryptoError::MalformedKey(_))
        ));
        assert!(matches!(
            decrypt(b"not a key", b"ct", RsaScheme::OaepSha256),
            Err(CryptoError::MalformedKey(_))
        ));
        assert!(matches!(
            derive_public(b"not a key"),
            Err(CryptoError::MalformedKey(_))
        ));
    }
}
