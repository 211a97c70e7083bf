//! Signing and validation seams.
//!
//! Packet authenticity is an external collaborator: the engines sign every
//! emitted data object through a [`KeyChain`] and check every fetched one
//! through a [`Validator`], but never interpret the signature bytes
//! themselves. Validation is asynchronous because a real validator may fetch
//! certificates.
//!
//! `Ed25519KeyChain` / `Ed25519Validator` are the default production pair;
//! the null implementations exist for fixtures and for deployments that
//! delegate authenticity to an outer layer.

use std::future::Future;

use bytes::Bytes;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::{CryptoRng, RngCore};
use spanlock_proto::Data;

/// Signs outgoing data objects.
pub trait KeyChain: Send + Sync + 'static {
    /// Attach a signature to `data`.
    fn sign(&self, data: &mut Data);
}

/// Checks fetched data objects before the engines act on them.
pub trait Validator: Send + Sync + 'static {
    /// Resolve `Ok(())` for trustworthy data, `Err(reason)` otherwise.
    fn validate(&self, data: &Data) -> impl Future<Output = Result<(), String>> + Send;
}

/// Keychain that leaves data unsigned. Fixture use only.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullKeyChain;

impl KeyChain for NullKeyChain {
    fn sign(&self, _data: &mut Data) {}
}

/// Validator that accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullValidator;

impl Validator for NullValidator {
    async fn validate(&self, _data: &Data) -> Result<(), String> {
        Ok(())
    }
}

/// Ed25519 keychain signing over the canonical name encoding plus content.
#[derive(Clone)]
pub struct Ed25519KeyChain {
    signing_key: SigningKey,
}

impl Ed25519KeyChain {
    /// Keychain with a freshly generated signing key.
    pub fn generate(rng: &mut (impl RngCore + CryptoRng)) -> Self {
        Self {
            signing_key: SigningKey::generate(rng),
        }
    }

    /// Keychain over an existing signing key.
    pub fn new(signing_key: SigningKey) -> Self {
        Self { signing_key }
    }

    /// The verifying key peers use to build an [`Ed25519Validator`].
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl KeyChain for Ed25519KeyChain {
    fn sign(&self, data: &mut Data) {
        let message = signed_bytes(data);
        let signature = self.signing_key.sign(&message);
        data.signature = Bytes::copy_from_slice(&signature.to_bytes());
    }
}

/// Validator checking an [`Ed25519KeyChain`] signature.
#[derive(Clone)]
pub struct Ed25519Validator {
    verifying_key: VerifyingKey,
}

impl Ed25519Validator {
    /// Validator for data signed by the holder of `verifying_key`.
    pub fn new(verifying_key: VerifyingKey) -> Self {
        Self { verifying_key }
    }
}

impl Validator for Ed25519Validator {
    async fn validate(&self, data: &Data) -> Result<(), String> {
        let raw: [u8; 64] = data
            .signature
            .as_ref()
            .try_into()
            .map_err(|_| format!("bad signature length {} on {}", data.signature.len(), data.name))?;
        let signature = Signature::from_bytes(&raw);
        self.verifying_key
            .verify(&signed_bytes(data), &signature)
            .map_err(|_| format!("signature mismatch on {}", data.name))
    }
}

/// Byte string covered by the signature: canonical name encoding, then
/// content.
fn signed_bytes(data: &Data) -> Vec<u8> {
    let name = data.name.encode();
    let mut message = Vec::with_capacity(name.len() + data.content.len());
    message.extend_from_slice(&name);
    message.extend_from_slice(&data.content);
    message
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};
    use spanlock_proto::Name;

    use super::*;

    fn sample() -> Data {
        Data::new(
            Name::from_uri("/a/SAMPLE/b/20150815T101700000").unwrap(),
            Bytes::from_static(b"ciphertext"),
        )
    }

    #[tokio::test]
    async fn sign_then_validate() {
        let mut rng = StdRng::seed_from_u64(3);
        let keychain = Ed25519KeyChain::generate(&mut rng);
        let validator = Ed25519Validator::new(keychain.verifying_key());

        let mut data = sample();
        assert!(!data.is_signed());
        keychain.sign(&mut data);
        assert!(data.is_signed());

        assert_eq!(validator.validate(&data).await, Ok(()));
    }

    #[tokio::test]
    async fn tampered_content_fails_validation() {
        let mut rng = StdRng::seed_from_u64(3);
        let keychain = Ed25519KeyChain::generate(&mut rng);
        let validator = Ed25519Validator::new(keychain.verifying_key());

        let mut data = sample();
        keychain.sign(&mut data);
        data.content = Bytes::from_static(b"forged");

        assert!(validator.validate(&data).await.is_err());
    }

    #[tokio::test]
    async fn renamed_data_fails_validation() {
        let mut rng = StdRng::seed_from_u64(3);
        let keychain = Ed25519KeyChain::generate(&mut rng);
        let validator = Ed25519Validator::new(keychain.verifying_key());

        let mut data = sample();
        keychain.sign(&mut data);
        data.name = Name::from_uri("/somewhere/else").unwrap();

        assert!(validator.validate(&data).await.is_err());
    }

    #[tokio::test]
    async fn unsigned_data_fails_validation() {
        let mut rng = StdRng::seed_from_u64(3);
        let keychain = Ed25519KeyChain::generate(&mut rng);
        let validator = Ed25519Validator::new(keychain.verifying_key());

        assert!(validator.validate(&sample()).await.is_err());
    }

    #[tokio::test]
    async fn null_pair_accepts_everything() {
        let mut data = sample();
        NullKeyChain.sign(&mut data);
        assert!(!data.is_signed());
        assert_eq!(NullValidator.validate(&data).await, Ok(()));
    }
}
