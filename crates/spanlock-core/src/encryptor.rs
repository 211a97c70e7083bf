//! The encryptor helper.
//!
//! [`encrypt_data`] turns a plaintext plus target-key material into the
//! EncryptedContent payload of an outgoing data object; [`decrypt_content`]
//! is its inverse dispatch used by the consumer pipeline. Neither signs nor
//! validates; authenticity is the keychain's and validator's concern.

use rand::{CryptoRng, RngCore};
use spanlock_crypto::{aes, rsa, RsaScheme, AES_BLOCK_SIZE};
use spanlock_proto::{Data, EncryptAlgorithm, EncryptedContent, Name};

use crate::error::AccessError;

/// Parameters choosing the wire form of an encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptParams {
    /// Target wire algorithm.
    pub algorithm: EncryptAlgorithm,
    /// IV length for CBC modes; ignored for asymmetric algorithms.
    pub iv_len: usize,
}

impl EncryptParams {
    /// AES-CBC with the standard 16-byte IV.
    pub fn aes_cbc() -> Self {
        Self {
            algorithm: EncryptAlgorithm::AesCbc,
            iv_len: AES_BLOCK_SIZE,
        }
    }

    /// RSA-OAEP for wrapping short key material.
    pub fn rsa_oaep() -> Self {
        Self {
            algorithm: EncryptAlgorithm::RsaOaep,
            iv_len: 0,
        }
    }

    /// RSA PKCS#1 v1.5 for wrapping short key material.
    pub fn rsa_pkcs() -> Self {
        Self {
            algorithm: EncryptAlgorithm::RsaPkcs,
            iv_len: 0,
        }
    }
}

/// Encrypt `payload` under `key_bits` and install the resulting
/// EncryptedContent as the content of `data`.
///
/// For AES-CBC a fresh random IV is drawn from `rng`; asymmetric algorithms
/// encrypt the payload directly and carry no IV. `key_name` becomes the
/// key locator the consumer follows to the next link of the chain.
///
/// # Errors
///
/// - `AccessError::UnsupportedEncryptionScheme` for algorithms the helper
///   cannot produce (AES-ECB).
/// - `AccessError::InvalidEncryptedFormat` for an IV length other than 16.
/// - `AccessError::EncryptionFailure` from the primitives.
pub fn encrypt_data(
    rng: &mut (impl RngCore + CryptoRng),
    data: &mut Data,
    payload: &[u8],
    key_name: &Name,
    key_bits: &[u8],
    params: &EncryptParams,
) -> Result<(), AccessError> {
    let content = match params.algorithm {
        EncryptAlgorithm::AesCbc => {
            if params.iv_len != AES_BLOCK_SIZE {
                return Err(AccessError::InvalidEncryptedFormat(format!(
                    "AES-CBC IV length must be 16, got {}",
                    params.iv_len
                )));
            }
            let mut iv = [0u8; AES_BLOCK_SIZE];
            rng.fill_bytes(&mut iv);
            let ciphertext = aes::encrypt(key_bits, &iv, payload)?;
            EncryptedContent::aes_cbc(key_name.clone(), iv.to_vec(), ciphertext)
        }
        EncryptAlgorithm::RsaOaep => {
            let ciphertext = rsa::encrypt(rng, key_bits, payload, RsaScheme::OaepSha256)?;
            EncryptedContent::asymmetric(EncryptAlgorithm::RsaOaep, key_name.clone(), ciphertext)
        }
        EncryptAlgorithm::RsaPkcs => {
            let ciphertext = rsa::encrypt(rng, key_bits, payload, RsaScheme::Pkcs1v15)?;
            EncryptedContent::asymmetric(EncryptAlgorithm::RsaPkcs, key_name.clone(), ciphertext)
        }
        EncryptAlgorithm::AesEcb => {
            return Err(AccessError::UnsupportedEncryptionScheme(
                EncryptAlgorithm::AesEcb.id(),
            ))
        }
    };

    data.content = content.to_bytes();
    Ok(())
}

/// Decrypt one EncryptedContent with the matching key material.
///
/// The caller picks `key_bits` by following the key locator; this function
/// only dispatches on the wire algorithm.
///
/// # Errors
///
/// - `AccessError::UnsupportedEncryptionScheme` for AES-ECB.
/// - `AccessError::InvalidEncryptedFormat` when a CBC composite lacks an IV
///   (unreachable for codec-produced values).
/// - `AccessError::EncryptionFailure` from the primitives.
pub fn decrypt_content(
    content: &EncryptedContent,
    key_bits: &[u8],
) -> Result<Vec<u8>, AccessError> {
    match content.algorithm {
        EncryptAlgorithm::AesCbc => {
            let iv = content.initial_vector.as_ref().ok_or_else(|| {
                AccessError::InvalidEncryptedFormat("AES-CBC content without IV".to_string())
            })?;
            Ok(aes::decrypt(key_bits, iv, &content.payload)?)
        }
        EncryptAlgorithm::RsaOaep => Ok(rsa::decrypt(
            key_bits,
            &content.payload,
            RsaScheme::OaepSha256,
        )?),
        EncryptAlgorithm::RsaPkcs => Ok(rsa::decrypt(
            key_bits,
            &content.payload,
            RsaScheme::Pkcs1v15,
        )?),
        EncryptAlgorithm::AesEcb => Err(AccessError::UnsupportedEncryptionScheme(
            EncryptAlgorithm::AesEcb.id(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use rand::{rngs::StdRng, SeedableRng};
    use spanlock_crypto::{ContentKey, DKeyPrivate};

    use super::*;

    fn name(uri: &str) -> Name {
        Name::from_uri(uri).unwrap()
    }

    #[test]
    fn aes_cbc_data_round_trips() {
        let mut rng = StdRng::seed_from_u64(1);
        let key = ContentKey::generate(&mut rng);
        let key_name = name("/a/SAMPLE/b/C-KEY/20150815T100000000");

        let mut data = Data::new(name("/a/SAMPLE/b/20150815T101700000"), Bytes::new());
        encrypt_data(
            &mut rng,
            &mut data,
            b"hello",
            &key_name,
            key.as_bytes(),
            &EncryptParams::aes_cbc(),
        )
        .unwrap();

        let content = EncryptedContent::decode(&data.content).unwrap();
        assert_eq!(content.algorithm, EncryptAlgorithm::AesCbc);
        assert_eq!(content.key_locator, key_name);
        assert_eq!(content.initial_vector.as_ref().unwrap().len(), 16);

        assert_eq!(decrypt_content(&content, key.as_bytes()).unwrap(), b"hello");
    }

    #[test]
    fn fresh_iv_per_call() {
        let mut rng = StdRng::seed_from_u64(2);
        let key = ContentKey::generate(&mut rng);
        let key_name = name("/k");

        let mut first = Data::new(name("/d/1"), Bytes::new());
        let mut second = Data::new(name("/d/2"), Bytes::new());
        for data in [&mut first, &mut second] {
            encrypt_data(
                &mut rng,
                data,
                b"same plaintext",
                &key_name,
                key.as_bytes(),
                &EncryptParams::aes_cbc(),
            )
            .unwrap();
        }

        let a = EncryptedContent::decode(&first.content).unwrap();
        let b = EncryptedContent::decode(&second.content).unwrap();
        assert_ne!(a.initial_vector, b.initial_vector);
        assert_ne!(a.payload, b.payload);
    }

    #[test]
    fn rsa_oaep_wraps_a_content_key() {
        let mut rng = StdRng::seed_from_u64(3);
        let d_key = DKeyPrivate::generate(&mut rng, 1024).unwrap();
        let e_key = d_key.derive_public().unwrap();
        let content_key = ContentKey::generate(&mut rng);

        let mut data = Data::new(name("/a/SAMPLE/b/C-KEY/20150815T100000000"), Bytes::new());
        encrypt_data(
            &mut rng,
            &mut data,
            content_key.as_bytes(),
            &name("/a/READ/b/E-KEY/20150815T100000000/20150815T110000000"),
            e_key.as_der(),
            &EncryptParams::rsa_oaep(),
        )
        .unwrap();

        let content = EncryptedContent::decode(&data.content).unwrap();
        assert_eq!(content.algorithm, EncryptAlgorithm::RsaOaep);
        assert!(content.initial_vector.is_none());

        let unwrapped = decrypt_content(&content, d_key.as_der()).unwrap();
        assert_eq!(unwrapped, content_key.as_bytes());
    }

    #[test]
    fn aes_ecb_is_rejected_both_ways() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut data = Data::new(name("/d"), Bytes::new());
        let params = EncryptParams {
            algorithm: EncryptAlgorithm::AesEcb,
            iv_len: 0,
        };
        assert_eq!(
            encrypt_data(&mut rng, &mut data, b"x", &name("/k"), &[0u8; 16], &params),
            Err(AccessError::UnsupportedEncryptionScheme(0))
        );

        let content = EncryptedContent {
            algorithm: EncryptAlgorithm::AesEcb,
            key_locator: name("/k"),
            initial_vector: None,
            payload: Bytes::from_static(b"ct"),
        };
        assert_eq!(
            decrypt_content(&content, &[0u8; 16]),
            Err(AccessError::UnsupportedEncryptionScheme(0))
        );
    }

    #[test]
    fn bad_iv_length_is_rejected() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut data = Data::new(name("/d"), Bytes::new());
        let params = EncryptParams {
            algorithm: EncryptAlgorithm::AesCbc,
            iv_len: 8,
        };
        assert!(matches!(
            encrypt_data(&mut rng, &mut data, b"x", &name("/k"), &[0u8; 16], &params),
            Err(AccessError::InvalidEncryptedFormat(_))
        ));
    }
}
