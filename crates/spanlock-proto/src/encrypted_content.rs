//! The EncryptedContent wire struct.
//!
//! This is the one structure whose byte representation is pinned: a TLV
//! composite carrying the algorithm id, the key locator (the name of the key
//! that decrypts the payload), an initial vector for CBC modes, and the
//! ciphertext itself. Content objects, C-KEY objects and both halves of a
//! D-KEY object all carry one of these as their content.
//!
//! # Invariants
//!
//! - `initial_vector` is present iff `algorithm == AesCbc`. Enforced on
//!   decode; encode takes it from the typed constructors.
//! - Decode rejects trailing bytes, so `encode(decode(b)) == b` for every
//!   accepted input.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    error::ProtocolError,
    name::Name,
    tlv::{read_nonneg, write_nonneg, write_tlv, TlvReader, TLV_KEY_LOCATOR, TLV_NAME},
};

/// Type number of the EncryptedContent composite.
pub const TLV_ENCRYPTED_CONTENT: u64 = 130;
/// Type number of the algorithm id element.
pub const TLV_ENCRYPTION_ALGORITHM: u64 = 131;
/// Type number of the ciphertext element.
pub const TLV_ENCRYPTED_PAYLOAD: u64 = 132;
/// Type number of the initial-vector element.
pub const TLV_INITIAL_VECTOR: u64 = 133;

/// Wire algorithm ids.
///
/// The integer values are stable wire constants. `AesEcb` is known to the
/// codec but unsupported by the crypto layer; decrypting it surfaces an
/// unsupported-scheme error rather than a format error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EncryptAlgorithm {
    /// AES in ECB mode (wire-known, never produced or decrypted).
    AesEcb = 0,
    /// AES in CBC mode with PKCS#7 padding. Requires an initial vector.
    AesCbc = 1,
    /// RSA with PKCS#1 v1.5 padding.
    RsaPkcs = 2,
    /// RSA-OAEP.
    RsaOaep = 3,
}

impl EncryptAlgorithm {
    /// Stable wire id.
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Algorithm from a wire id.
    pub fn from_id(id: u64) -> Option<Self> {
        match id {
            0 => Some(Self::AesEcb),
            1 => Some(Self::AesCbc),
            2 => Some(Self::RsaPkcs),
            3 => Some(Self::RsaOaep),
            _ => None,
        }
    }

    /// True for the CBC mode that carries an initial vector on the wire.
    pub const fn uses_iv(self) -> bool {
        matches!(self, Self::AesCbc)
    }
}

/// Decoded EncryptedContent composite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedContent {
    /// Algorithm the payload was encrypted under.
    pub algorithm: EncryptAlgorithm,
    /// Name of the key that decrypts the payload.
    pub key_locator: Name,
    /// Initial vector; present iff `algorithm` is `AesCbc`.
    pub initial_vector: Option<Bytes>,
    /// Ciphertext.
    pub payload: Bytes,
}

impl EncryptedContent {
    /// AES-CBC content with its initial vector.
    pub fn aes_cbc(key_locator: Name, iv: impl Into<Bytes>, payload: impl Into<Bytes>) -> Self {
        Self {
            algorithm: EncryptAlgorithm::AesCbc,
            key_locator,
            initial_vector: Some(iv.into()),
            payload: payload.into(),
        }
    }

    /// Asymmetric (RSA) content; no initial vector on the wire.
    pub fn asymmetric(
        algorithm: EncryptAlgorithm,
        key_locator: Name,
        payload: impl Into<Bytes>,
    ) -> Self {
        debug_assert!(!algorithm.uses_iv());
        Self {
            algorithm,
            key_locator,
            initial_vector: None,
            payload: payload.into(),
        }
    }

    /// Emit the TLV composite into `dst`.
    pub fn encode(&self, dst: &mut impl BufMut) {
        let mut inner = Vec::new();
        write_nonneg(
            &mut inner,
            TLV_ENCRYPTION_ALGORITHM,
            u64::from(self.algorithm.id()),
        );
        write_tlv(&mut inner, TLV_KEY_LOCATOR, &self.key_locator.encode());
        if let Some(iv) = &self.initial_vector {
            write_tlv(&mut inner, TLV_INITIAL_VECTOR, iv);
        }
        write_tlv(&mut inner, TLV_ENCRYPTED_PAYLOAD, &self.payload);
        write_tlv(dst, TLV_ENCRYPTED_CONTENT, &inner);
    }

    /// TLV composite as a fresh buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::new();
        self.encode(&mut out);
        out.freeze()
    }

    /// Parse one TLV composite, rejecting trailing bytes.
    ///
    /// # Errors
    ///
    /// `ProtocolError` when the input is truncated, fields are missing or out
    /// of order, the algorithm id is unknown, or the IV presence contradicts
    /// the algorithm.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = TlvReader::new(bytes);
        let content = Self::read_one(&mut reader)?;
        reader.finish()?;
        Ok(content)
    }

    /// Parse one composite from a reader, leaving any following bytes.
    pub(crate) fn read_one(reader: &mut TlvReader<'_>) -> Result<Self, ProtocolError> {
        let value = reader.read_expected(TLV_ENCRYPTED_CONTENT)?;
        let mut fields = TlvReader::new(value);

        let algorithm_raw = read_nonneg(fields.read_expected(TLV_ENCRYPTION_ALGORITHM)?)?;
        let algorithm = EncryptAlgorithm::from_id(algorithm_raw)
            .ok_or(ProtocolError::UnknownAlgorithm(algorithm_raw))?;

        let locator_value = fields.read_expected(TLV_KEY_LOCATOR)?;
        let mut locator = TlvReader::new(locator_value);
        let key_locator = Name::decode_value(locator.read_expected(TLV_NAME)?)?;
        locator.finish()?;

        let (next_type, next_value) = fields.read_element()?;
        let (initial_vector, payload) = match next_type {
            TLV_INITIAL_VECTOR => {
                let payload = fields.read_expected(TLV_ENCRYPTED_PAYLOAD)?;
                (
                    Some(Bytes::copy_from_slice(next_value)),
                    Bytes::copy_from_slice(payload),
                )
            }
            TLV_ENCRYPTED_PAYLOAD => (None, Bytes::copy_from_slice(next_value)),
            got => {
                return Err(ProtocolError::UnexpectedType {
                    expected: TLV_ENCRYPTED_PAYLOAD,
                    got,
                })
            }
        };
        fields.finish()?;

        if algorithm.uses_iv() != initial_vector.is_some() {
            return Err(ProtocolError::InvalidEncryptedFormat(format!(
                "algorithm {algorithm:?} with IV {}",
                if initial_vector.is_some() { "present" } else { "absent" }
            )));
        }

        Ok(Self {
            algorithm,
            key_locator,
            initial_vector,
            payload,
        })
    }
}

/// Parse the content of a D-KEY data object: exactly two EncryptedContent
/// composites back to back, the encrypted nonce followed by the encrypted
/// key payload.
///
/// # Errors
///
/// `ProtocolError::InvalidEncryptedFormat` when the element count is not two;
/// any codec error from the children.
pub fn decode_d_key_content(
    bytes: &[u8],
) -> Result<(EncryptedContent, EncryptedContent), ProtocolError> {
    let mut reader = TlvReader::new(bytes);
    let nonce = EncryptedContent::read_one(&mut reader)?;
    if reader.is_empty() {
        return Err(ProtocolError::InvalidEncryptedFormat(
            "D-KEY content has one element, expected two".to_string(),
        ));
    }
    let payload = EncryptedContent::read_one(&mut reader)?;
    if !reader.is_empty() {
        return Err(ProtocolError::InvalidEncryptedFormat(
            "D-KEY content has more than two elements".to_string(),
        ));
    }
    Ok((nonce, payload))
}

/// Emit a D-KEY content blob from its two halves.
pub fn encode_d_key_content(nonce: &EncryptedContent, payload: &EncryptedContent) -> Bytes {
    let mut out = BytesMut::new();
    nonce.encode(&mut out);
    payload.encode(&mut out);
    out.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator() -> Name {
        Name::from_uri("/a/SAMPLE/b/C-KEY/20150815T100000000").unwrap()
    }

    #[test]
    fn aes_cbc_round_trip() {
        let content = EncryptedContent::aes_cbc(locator(), vec![7u8; 16], vec![1u8, 2, 3]);
        let wire = content.to_bytes();
        assert_eq!(EncryptedContent::decode(&wire).unwrap(), content);
    }

    #[test]
    fn asymmetric_round_trip() {
        for algorithm in [EncryptAlgorithm::RsaPkcs, EncryptAlgorithm::RsaOaep] {
            let content = EncryptedContent::asymmetric(algorithm, locator(), vec![9u8; 64]);
            let wire = content.to_bytes();
            assert_eq!(EncryptedContent::decode(&wire).unwrap(), content);
        }
    }

    #[test]
    fn reject_iv_on_rsa() {
        // Hand-build an RSA composite that smuggles an IV.
        let mut inner = Vec::new();
        crate::tlv::write_nonneg(
            &mut inner,
            TLV_ENCRYPTION_ALGORITHM,
            u64::from(EncryptAlgorithm::RsaOaep.id()),
        );
        crate::tlv::write_tlv(&mut inner, TLV_KEY_LOCATOR, &locator().encode());
        crate::tlv::write_tlv(&mut inner, TLV_INITIAL_VECTOR, &[0u8; 16]);
        crate::tlv::write_tlv(&mut inner, TLV_ENCRYPTED_PAYLOAD, b"ct");
        let mut wire = Vec::new();
        crate::tlv::write_tlv(&mut wire, TLV_ENCRYPTED_CONTENT, &inner);

        assert!(matches!(
            EncryptedContent::decode(&wire),
            Err(ProtocolError::InvalidEncryptedFormat(_))
        ));
    }

    #[test]
    fn reject_missing_iv_on_cbc() {
        let mut inner = Vec::new();
        crate::tlv::write_nonneg(
            &mut inner,
            TLV_ENCRYPTION_ALGORITHM,
            u64::from(EncryptAlgorithm::AesCbc.id()),
        );
        crate::tlv::write_tlv(&mut inner, TLV_KEY_LOCATOR, &locator().encode());
        crate::tlv::write_tlv(&mut inner, TLV_ENCRYPTED_PAYLOAD, b"ct");
        let mut wire = Vec::new();
        crate::tlv::write_tlv(&mut wire, TLV_ENCRYPTED_CONTENT, &inner);

        assert!(matches!(
            EncryptedContent::decode(&wire),
            Err(ProtocolError::InvalidEncryptedFormat(_))
        ));
    }

    #[test]
    fn reject_unknown_algorithm() {
        let mut inner = Vec::new();
        crate::tlv::write_nonneg(&mut inner, TLV_ENCRYPTION_ALGORITHM, 77);
        crate::tlv::write_tlv(&mut inner, TLV_KEY_LOCATOR, &locator().encode());
        crate::tlv::write_tlv(&mut inner, TLV_ENCRYPTED_PAYLOAD, b"ct");
        let mut wire = Vec::new();
        crate::tlv::write_tlv(&mut wire, TLV_ENCRYPTED_CONTENT, &inner);

        assert_eq!(
            EncryptedContent::decode(&wire),
            Err(ProtocolError::UnknownAlgorithm(77))
        );
    }

    #[test]
    fn reject_trailing_bytes() {
        let mut wire = EncryptedContent::aes_cbc(locator(), vec![0u8; 16], b"ct".as_slice())
            .to_bytes()
            .to_vec();
        wire.push(0);
        assert!(matches!(
            EncryptedContent::decode(&wire),
            Err(ProtocolError::TrailingBytes { count: 1 })
        ));
    }

    #[test]
    fn d_key_content_round_trip() {
        let nonce = EncryptedContent::asymmetric(
            EncryptAlgorithm::RsaOaep,
            Name::from_uri("/alice/KEY/1").unwrap(),
            vec![1u8; 32],
        );
        let payload = EncryptedContent::aes_cbc(
            Name::from_uri("/nonce").unwrap(),
            vec![2u8; 16],
            vec![3u8; 48],
        );
        let wire = encode_d_key_content(&nonce, &payload);
        let (n, p) = decode_d_key_content(&wire).unwrap();
        assert_eq!(n, nonce);
        assert_eq!(p, payload);
    }

    #[test]
    fn d_key_content_rejects_wrong_count() {
        let one = EncryptedContent::asymmetric(
            EncryptAlgorithm::RsaOaep,
            Name::from_uri("/alice/KEY/1").unwrap(),
            vec![1u8; 32],
        );

        // One element.
        assert!(matches!(
            decode_d_key_content(&one.to_bytes()),
            Err(ProtocolError::InvalidEncryptedFormat(_))
        ));

        // Three elements.
        let mut wire = BytesMut::new();
        one.encode(&mut wire);
        one.encode(&mut wire);
        one.encode(&mut wire);
        assert!(matches!(
            decode_d_key_content(&wire),
            Err(ProtocolError::InvalidEncryptedFormat(_))
        ));
    }
}
