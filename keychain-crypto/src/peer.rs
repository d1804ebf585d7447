//! Decoder for the libp2p-style marshalled private-key envelope accepted by
//! `importPeer`. The wire format is a two-field protobuf message:
//!
//! ```text
//! message PrivateKey {
//!     KeyType key_type = 1; // varint
//!     bytes   data      = 2;
//! }
//! ```
//!
//! Only the RSA key type (0) is supported; any other type is rejected with
//! [`CryptoError::UnsupportedPeerKeyType`] rather than guessed at. `data` for
//! an RSA key is a PKCS#1 DER `RSAPrivateKey`, matching what libp2p-rust's
//! `rsa` module marshals.

use crate::error::{CryptoError, CryptoResult};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::RsaPrivateKey;

const KEY_TYPE_RSA: i32 = 0;

struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn read_varint(&mut self) -> CryptoResult<u64> {
        let mut result: u64 = 0;
        let mut shift = 0;
        loop {
            let byte = *self
                .buf
                .get(self.pos)
                .ok_or_else(|| CryptoError::PeerEnvelope("truncated varint".to_string()))?;
            self.pos += 1;
            result |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
            if shift >= 64 {
                return Err(CryptoError::PeerEnvelope("varint too long".to_string()));
            }
        }
    }

    fn read_bytes(&mut self, len: usize) -> CryptoResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| CryptoError::PeerEnvelope("truncated field".to_string()))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn done(&self) -> bool {
        self.pos >= self.buf.len()
    }
}

struct PrivateKeyEnvelope {
    key_type: i32,
    data: Vec<u8>,
}

fn parse_envelope(bytes: &[u8]) -> CryptoResult<PrivateKeyEnvelope> {
    let mut reader = FieldReader::new(bytes);
    let mut key_type = None;
    let mut data = None;

    while !reader.done() {
        let tag = reader.read_varint()?;
        let field_number = tag >> 3;
        let wire_type = tag & 0x7;

        match (field_number, wire_type) {
            (1, 0) => {
                let value = reader.read_varint()?;
                key_type = Some(value as i32);
            }
            (2, 2) => {
                let len = reader.read_varint()? as usize;
                data = Some(reader.read_bytes(len)?.to_vec());
            }
            (_, 0) => {
                reader.read_varint()?;
            }
            (_, 2) => {
                let len = reader.read_varint()? as usize;
                reader.read_bytes(len)?;
            }
            _ => {
                return Err(CryptoError::PeerEnvelope(format!(
                    "unsupported wire type {wire_type}"
                )))
            }
        }
    }

    Ok(PrivateKeyEnvelope {
        key_type: key_type
            .ok_or_else(|| CryptoError::PeerEnvelope("missing key_type field".to_string()))?,
        data: data.ok_or_else(|| CryptoError::PeerEnvelope("missing data field".to_string()))?,
    })
}

/// Decodes a marshalled peer private key envelope into an [`RsaPrivateKey`].
pub fn decode_marshalled_private_key(bytes: &[u8]) -> CryptoResult<RsaPrivateKey> {
    let envelope = parse_envelope(bytes)?;
    if envelope.key_type != KEY_TYPE_RSA {
        return Err(CryptoError::UnsupportedPeerKeyType(envelope.key_type));
    }
    RsaPrivateKey::from_pkcs1_der(&envelope.data)
        .map_err(|e| CryptoError::PeerEnvelope(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs1::EncodeRsaPrivateKey;

    fn encode_envelope(key_type: i32, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.push((1 << 3) | 0); // field 1, varint
        out.push(key_type as u8);
        out.push((2 << 3) | 2); // field 2, length-delimited
        out.push(data.len() as u8);
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn decodes_an_rsa_envelope() {
        let mut rng = rand::thread_rng();
        let key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let der = key.to_pkcs1_der().unwrap();
        let envelope = encode_envelope(KEY_TYPE_RSA, der.as_bytes());

        let decoded = decode_marshalled_private_key(&envelope).unwrap();
        assert_eq!(
            decoded.to_pkcs1_der().unwrap().as_bytes(),
            key.to_pkcs1_der().unwrap().as_bytes()
        );
    }

    #[test]
    fn rejects_non_rsa_key_types() {
        let envelope = encode_envelope(1, b"not-rsa-data");
        let err = decode_marshalled_private_key(&envelope).unwrap_err();
        assert!(matches!(err, CryptoError::UnsupportedPeerKeyType(1)));
    }

    #[test]
    fn rejects_truncated_envelopes() {
        let envelope = vec![(1 << 3) | 0];
        assert!(decode_marshalled_private_key(&envelope).is_err());
    }
}
