// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! RSA key material: JWK reconstruction and the in-house signing key pair.
//!
//! ## JWK exponent padding
//!
//! Identity providers publish the public exponent as the shortest big-endian
//! byte string, typically `AQAB` (`01 00 01` = 65537). The decoded bytes are
//! left-padded with zeros to 8 bytes before being read as a big-endian `u64`,
//! so short exponents are widened instead of misread.

use base64ct::{Base64UrlUnpadded, Encoding};
use jsonwebtoken::{DecodingKey, EncodingKey};
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};

/// Errors raised while building RSA keys.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("invalid base64url in JWK field '{field}': {message}")]
    Decode {
        field: &'static str,
        message: String,
    },
    #[error("JWK exponent is {0} bytes long, at most 8 are supported")]
    ExponentTooLong(usize),
    #[error("invalid RSA public key: {0}")]
    InvalidPublicKey(String),
    #[error("invalid signing key: {0}")]
    InvalidSigningKey(String),
}

/// Rebuild an RSA public key from base64url JWK `n` and `e` components.
pub fn reconstruct_public_key(n: &str, e: &str) -> Result<RsaPublicKey, KeyError> {
    let modulus = decode_component("n", n)?;
    let exponent = exponent_from_be_bytes(&decode_component("e", e)?)?;

    RsaPublicKey::new(BigUint::from_bytes_be(&modulus), BigUint::from(exponent))
        .map_err(|e| KeyError::InvalidPublicKey(e.to_string()))
}

fn decode_component(field: &'static str, value: &str) -> Result<Vec<u8>, KeyError> {
    Base64UrlUnpadded::decode_vec(value).map_err(|e| KeyError::Decode {
        field,
        message: e.to_string(),
    })
}

fn exponent_from_be_bytes(bytes: &[u8]) -> Result<u64, KeyError> {
    if bytes.len() > 8 {
        return Err(KeyError::ExponentTooLong(bytes.len()));
    }
    let mut padded = [0u8; 8];
    padded[8 - bytes.len()..].copy_from_slice(bytes);
    Ok(u64::from_be_bytes(padded))
}

/// A public key ready for signature verification.
#[derive(Clone)]
pub struct VerificationKey {
    pub public_key: RsaPublicKey,
    pub decoding_key: DecodingKey,
}

impl VerificationKey {
    pub fn from_public_key(public_key: RsaPublicKey) -> Self {
        let decoding_key = DecodingKey::from_rsa_raw_components(
            &public_key.n().to_bytes_be(),
            &public_key.e().to_bytes_be(),
        );
        Self {
            public_key,
            decoding_key,
        }
    }

    /// Build from base64url JWK components.
    pub fn from_jwk_components(n: &str, e: &str) -> Result<Self, KeyError> {
        reconstruct_public_key(n, e).map(Self::from_public_key)
    }
}

impl std::fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationKey")
            .field("bits", &(self.public_key.size() * 8))
            .finish()
    }
}

/// The in-house RSA key pair, loaded once at start-up.
pub struct SigningKeyPair {
    pub encoding_key: EncodingKey,
    pub verification: VerificationKey,
}

impl SigningKeyPair {
    /// Parse a PEM-encoded RSA private key (`RSA PRIVATE KEY` or `PRIVATE KEY`).
    pub fn from_pem(pem_text: &str) -> Result<Self, KeyError> {
        let block = pem::parse(pem_text.trim())
            .map_err(|e| KeyError::InvalidSigningKey(format!("cannot decode PEM: {e}")))?;

        let private_key = match block.tag() {
            "RSA PRIVATE KEY" => RsaPrivateKey::from_pkcs1_der(block.contents())
                .map_err(|e| KeyError::InvalidSigningKey(format!("cannot parse PKCS#1 key: {e}")))?,
            "PRIVATE KEY" => RsaPrivateKey::from_pkcs8_der(block.contents())
                .map_err(|e| KeyError::InvalidSigningKey(format!("cannot parse PKCS#8 key: {e}")))?,
            other => {
                return Err(KeyError::InvalidSigningKey(format!(
                    "unexpected PEM block '{other}'"
                )))
            }
        };

        let der = private_key
            .to_pkcs1_der()
            .map_err(|e| KeyError::InvalidSigningKey(e.to_string()))?;

        Ok(Self {
            encoding_key: EncodingKey::from_rsa_der(der.as_bytes()),
            verification: VerificationKey::from_public_key(private_key.to_public_key()),
        })
    }
}

impl std::fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("verification", &self.verification)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const IN_HOUSE_PEM: &str = include_str!("testdata/inhouse_rsa.pem");
    pub(crate) const PROVIDER_PEM: &str = include_str!("testdata/provider_rsa.pem");

    /// JWK `n` for a PEM fixture.
    pub(crate) fn modulus_b64(pem_text: &str) -> String {
        let key = RsaPrivateKey::from_pkcs1_pem(pem_text).unwrap();
        Base64UrlUnpadded::encode_string(&key.n().to_bytes_be())
    }

    #[test]
    fn aqab_exponent_is_widened_to_65537() {
        let n = modulus_b64(PROVIDER_PEM);
        assert_eq!(Base64UrlUnpadded::decode_vec(&n).unwrap().len(), 256);

        let key = reconstruct_public_key(&n, "AQAB").unwrap();
        assert_eq!(key.e(), &BigUint::from(65537u32));
    }

    #[test]
    fn reconstructed_modulus_matches_source() {
        let n = modulus_b64(PROVIDER_PEM);
        let key = reconstruct_public_key(&n, "AQAB").unwrap();
        let expected = RsaPrivateKey::from_pkcs1_pem(PROVIDER_PEM).unwrap();
        assert_eq!(key.n(), expected.n());
    }

    #[test]
    fn exponent_padding_handles_every_width() {
        assert_eq!(exponent_from_be_bytes(&[0x03]).unwrap(), 3);
        assert_eq!(exponent_from_be_bytes(&[0x01, 0x00, 0x01]).unwrap(), 65537);
        assert_eq!(exponent_from_be_bytes(&[0, 0, 0, 0, 0, 1, 0, 1]).unwrap(), 65537);
        assert!(matches!(
            exponent_from_be_bytes(&[1; 9]),
            Err(KeyError::ExponentTooLong(9))
        ));
    }

    #[test]
    fn bad_base64_is_a_decode_error() {
        let err = reconstruct_public_key("not*base64", "AQAB").unwrap_err();
        assert!(matches!(err, KeyError::Decode { field: "n", .. }));

        let n = modulus_b64(PROVIDER_PEM);
        let err = reconstruct_public_key(&n, "A=Q=").unwrap_err();
        assert!(matches!(err, KeyError::Decode { field: "e", .. }));
    }

    #[test]
    fn signing_key_pair_loads_pkcs1_pem() {
        let pair = SigningKeyPair::from_pem(IN_HOUSE_PEM).unwrap();
        assert_eq!(pair.verification.public_key.size(), 256);
    }

    #[test]
    fn signing_key_pair_rejects_garbage() {
        assert!(matches!(
            SigningKeyPair::from_pem("not a key"),
            Err(KeyError::InvalidSigningKey(_))
        ));
        let public_only = "-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----\n";
        assert!(matches!(
            SigningKeyPair::from_pem(public_only),
            Err(KeyError::InvalidSigningKey(_))
        ));
    }
}
