//! AES-CBC with PKCS#7 padding.
//!
//! Content objects and the D-KEY payload half use this mode. Key sizes 128,
//! 192 and 256 bits are accepted; the protocol itself only ever generates
//! 128-bit content keys. The IV is always one AES block and always supplied
//! by the caller.

use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::{error::CryptoError, AES_BLOCK_SIZE};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes192CbcEnc = cbc::Encryptor<Aes192>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes192CbcDec = cbc::Decryptor<Aes192>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Encrypt `plaintext` under `key` / `iv`.
///
/// The ciphertext is always a whole number of blocks: PKCS#7 pads every
/// plaintext, so the output is strictly longer than the input.
///
/// # Errors
///
/// - `CryptoError::InvalidKeyLength` unless the key is 16, 24 or 32 bytes.
/// - `CryptoError::InvalidIvLength` unless the IV is 16 bytes.
pub fn encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    check_iv(iv)?;

    // One extra block for padding; `b2b` returns the exact ciphertext slice.
    let mut buffer = vec![0u8; plaintext.len() + AES_BLOCK_SIZE];
    let result = match key.len() {
        16 => Aes128CbcEnc::new_from_slices(key, iv)
            .map_err(|_| bad_key(key))?
            .encrypt_padded_b2b_mut::<Pkcs7>(plaintext, &mut buffer),
        24 => Aes192CbcEnc::new_from_slices(key, iv)
            .map_err(|_| bad_key(key))?
            .encrypt_padded_b2b_mut::<Pkcs7>(plaintext, &mut buffer),
        32 => Aes256CbcEnc::new_from_slices(key, iv)
            .map_err(|_| bad_key(key))?
            .encrypt_padded_b2b_mut::<Pkcs7>(plaintext, &mut buffer),
        got => {
            return Err(CryptoError::InvalidKeyLength {
                expected: "16, 24 or 32",
                got,
            })
        }
    };

    let Ok(ciphertext) = result else {
        unreachable!("output buffer holds plaintext plus one padding block");
    };
    Ok(ciphertext.to_vec())
}

/// Decrypt `ciphertext` under `key` / `iv`.
///
/// # Errors
///
/// - `CryptoError::InvalidKeyLength` / `InvalidIvLength` as for [`encrypt`].
/// - `CryptoError::BadPadding` when the ciphertext is empty, not block
///   aligned, or unpadding fails (wrong key or IV included).
pub fn decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    check_iv(iv)?;
    if ciphertext.is_empty() || ciphertext.len() % AES_BLOCK_SIZE != 0 {
        return Err(CryptoError::BadPadding);
    }

    let mut buffer = vec![0u8; ciphertext.len()];
    let result = match key.len() {
        16 => Aes128CbcDec::new_from_slices(key, iv)
            .map_err(|_| bad_key(key))?
            .decrypt_padded_b2b_mut::<Pkcs7>(ciphertext, &mut buffer),
        24 => Aes192CbcDec::new_from_slices(key, iv)
            .map_err(|_| bad_key(key))?
            .decrypt_padded_b2b_mut::<Pkcs7>(ciphertext, &mut buffer),
        32 => Aes256CbcDec::new_from_slices(key, iv)
            .map_err(|_| bad_key(key))?
            .decrypt_padded_b2b_mut::<Pkcs7>(ciphertext, &mut buffer),
        got => {
            return Err(CryptoError::InvalidKeyLength {
                expected: "16, 24 or 32",
                got,
            })
        }
    };

    let plaintext = result.map_err(|_| CryptoError::BadPadding)?;
    Ok(plaintext.to_vec())
}

fn check_iv(iv: &[u8]) -> Result<(), CryptoError> {
    if iv.len() != AES_BLOCK_SIZE {
        return Err(CryptoError::InvalidIvLength { got: iv.len() });
    }
    Ok(())
}

fn bad_key(key: &[u8]) -> CryptoError {
    CryptoError::InvalidKeyLength {
        expected: "16, 24 or 32",
        got: key.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 16] = [0x11; 16];
    const IV: [u8; 16] = [0x22; 16];

    #[test]
    fn round_trip_all_key_sizes() {
        let plaintext = b"the quick brown fox";
        for key in [vec![1u8; 16], vec![2u8; 24], vec![3u8; 32]] {
            let ciphertext = encrypt(&key, &IV, plaintext).unwrap();
            assert_eq!(decrypt(&key, &IV, &ciphertext).unwrap(), plaintext);
        }
    }

    #[test]
    fn round_trip_empty_plaintext() {
        let ciphertext = encrypt(&KEY, &IV, b"").unwrap();
        // PKCS#7 pads the empty message to one full block.
        assert_eq!(ciphertext.len(), AES_BLOCK_SIZE);
        assert_eq!(decrypt(&KEY, &IV, &ciphertext).unwrap(), b"");
    }

    #[test]
    fn round_trip_block_boundaries() {
        for len in [1, 15, 16, 17, 31, 32, 33, 1024] {
            let plaintext = vec![0xABu8; len];
            let ciphertext = encrypt(&KEY, &IV, &plaintext).unwrap();
            assert_eq!(ciphertext.len() % AES_BLOCK_SIZE, 0);
            assert!(ciphertext.len() > len);
            assert_eq!(decrypt(&KEY, &IV, &ciphertext).unwrap(), plaintext);
        }
    }

    #[test]
    fn wrong_key_fails_unpadding() {
        let ciphertext = encrypt(&KEY, &IV, b"secret").unwrap();
        let wrong = [0x99u8; 16];
        // Unpadding with the wrong key almost surely fails; if it happens to
        // produce valid padding the plaintext still differs.
        match decrypt(&wrong, &IV, &ciphertext) {
            Err(CryptoError::BadPadding) => {}
            Ok(plaintext) => assert_ne!(plaintext, b"secret"),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reject_bad_lengths() {
        assert!(matches!(
            encrypt(&[0u8; 10], &IV, b"x"),
            Err(CryptoError::InvalidKeyLength { got: 10, .. })
        ));
        assert!(matches!(
            encrypt(&KEY, &[0u8; 12], b"x"),
            Err(CryptoError::InvalidIvLength { got: 12 })
        ));
        assert!(matches!(
            decrypt(&KEY, &IV, &[0u8; 17]),
            Err(CryptoError::BadPadding)
        ));
        assert!(matches!(
            decrypt(&KEY, &IV, &[]),
            Err(CryptoError::BadPadding)
        ));
    }

    #[test]
    fn ciphertext_depends_on_iv() {
        let a = encrypt(&KEY, &[1u8; 16], b"same message").unwrap();
        let b = encrypt(&KEY, &[2u8; 16], b"same message").unwrap();
        assert_ne!(a, b);
    }
}
