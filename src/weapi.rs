//! The vendor's request-encryption envelope.
//!
//! Every POST body for an obfuscated `/weapi` endpoint carries exactly two
//! fields: `params`, the payload pushed through two AES-CBC passes (one under
//! the fixed [`NONCE`], one under a per-request session key), and `encSecKey`,
//! the session key pushed through a textbook, unpadded RSA step with reversed
//! byte order. Both quirks are wire-compatibility requirements of the deployed
//! endpoints and must not be corrected toward conventional AES/RSA usage.

use aes::cipher::{block_padding::Pkcs7, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use num_bigint::BigUint;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use serde::{Deserialize, Serialize};

use crate::constants::{ENC_SEC_KEY_LEN, EXPONENT, IV, KEY_LEN, MODULUS, NONCE};
use crate::error::CryptoError;
use crate::modexp::mod_pow;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;

/// 16-byte session key; always alphanumeric when generated by [`random_key`].
pub type CipherKey = [u8; KEY_LEN];

/// The two form fields of an encrypted request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedRequest {
    pub params: String,
    #[serde(rename = "encSecKey")]
    pub enc_sec_key: String,
}

/// Draw a fresh session key from the 62-symbol alphanumeric alphabet.
pub fn random_key() -> CipherKey {
    let mut rng = thread_rng();
    let mut key = [0u8; KEY_LEN];
    for byte in &mut key {
        *byte = rng.sample(Alphanumeric);
    }
    key
}

/// Length-checked conversion for callers holding key material as a slice.
pub fn key_from_slice(bytes: &[u8]) -> Result<CipherKey, CryptoError> {
    CipherKey::try_from(bytes).map_err(|_| CryptoError::InvalidKeyLength(bytes.len()))
}

fn aes_cbc_encrypt(data: &[u8], key: &CipherKey) -> Vec<u8> {
    Aes128CbcEnc::new(key.into(), (&IV).into()).encrypt_padded_vec_mut::<Pkcs7>(data)
}

/// Two-pass AES-128-CBC: once under the fixed [`NONCE`], once under the
/// session key, base64 between and after the passes.
pub fn double_encrypt(payload: &[u8], key: &CipherKey) -> String {
    let inner = BASE64.encode(aes_cbc_encrypt(payload, &NONCE));
    BASE64.encode(aes_cbc_encrypt(inner.as_bytes(), key))
}

/// RSA-encode the session key: reverse the byte order, interpret as an
/// unsigned big-endian integer and raise to [`EXPONENT`] mod [`MODULUS`].
///
/// The reversal replicates the vendor's implementation; no padding scheme is
/// applied. The 128-bit message is always below the 1024-bit modulus.
pub fn encrypt_key(key: &CipherKey) -> BigUint {
    let mut reversed = *key;
    reversed.reverse();
    let message = BigUint::from_bytes_be(&reversed);
    mod_pow(&message, &BigUint::from(EXPONENT), &MODULUS)
}

/// Render an RSA-encoded key as lowercase hex, left-zero-padded to 256 chars.
fn hex256(value: &BigUint) -> String {
    format!("{:0>width$}", value.to_str_radix(16), width = ENC_SEC_KEY_LEN)
}

/// Build the wire-ready `{params, encSecKey}` pair for a payload.
///
/// Draws a fresh [`random_key`] when `key` is `None`. Deterministic for a
/// fixed `(payload, key)` pair.
pub fn encrypt(payload: impl AsRef<[u8]>, key: Option<&CipherKey>) -> EncryptedRequest {
    let generated;
    let key = match key {
        Some(key) => key,
        None => {
            generated = random_key();
            &generated
        }
    };
    EncryptedRequest {
        params: double_encrypt(payload.as_ref(), key),
        enc_sec_key: hex256(&encrypt_key(key)),
    }
}

/// Serialize a value to JSON text, then [`encrypt`] it.
pub fn encrypt_json<T>(value: &T, key: Option<&CipherKey>) -> Result<EncryptedRequest, CryptoError>
where
    T: Serialize + ?Sized,
{
    Ok(encrypt(serde_json::to_string(value)?, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TEST_KEY: &CipherKey = b"erfMaqdJPvByr7Xl";

    // Reference vector produced by the deployed endpoints' own client code.
    const TEST_PARAMS: &str = "7KvkKBOcrvCW43XAV0rLbJHixeL5hnPJ6ndHWAxY4qGvaXk7v3Vt9+VWQr4JDhV3";
    const TEST_ENC_SEC_KEY: &str = "59ba25f5a3e0b29a9c3580c003565fa128e9e7624c6fbbd47321206ff00d07b1d7d340f773df588fe1dae991642d9fdd8095ca2b04137424a31b4d58eeb7a52e50366da3ce6501f4e3f19a62f77e585927afa0ef8b3c111b3a664bf328b723701fe626f23369aacdc36377bc2a9c7d8e7945ed1db8ceb1c63c9d9a9cf7ae4fcf";

    #[test]
    fn reference_vector() {
        let request = encrypt(r#"{"csrf_token":""}"#, Some(TEST_KEY));
        assert_eq!(request.params, TEST_PARAMS);
        assert_eq!(request.enc_sec_key, TEST_ENC_SEC_KEY);
    }

    #[test]
    fn deterministic_for_fixed_key() {
        let a = encrypt("payload", Some(TEST_KEY));
        let b = encrypt("payload", Some(TEST_KEY));
        assert_eq!(a, b);
    }

    #[test]
    fn enc_sec_key_is_always_256_lowercase_hex() {
        for _ in 0..20 {
            let request = encrypt("x", None);
            assert_eq!(request.enc_sec_key.len(), 256);
            assert!(request
                .enc_sec_key
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));
        }
    }

    #[test]
    fn random_key_is_alphanumeric() {
        for _ in 0..20 {
            let key = random_key();
            assert!(key.iter().all(|b| b.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn key_from_slice_rejects_wrong_length() {
        assert!(matches!(
            key_from_slice(b"too short"),
            Err(CryptoError::InvalidKeyLength(9))
        ));
        assert_eq!(key_from_slice(TEST_KEY).unwrap(), *TEST_KEY);
    }

    #[test]
    fn ciphertext_is_block_aligned() {
        for len in [0, 1, 15, 16, 17, 100] {
            let encrypted = aes_cbc_encrypt(&vec![b'a'; len], TEST_KEY);
            assert!(!encrypted.is_empty());
            assert_eq!(encrypted.len() % 16, 0);
        }
    }

    #[test]
    fn encrypt_json_serializes_values() {
        let request = encrypt_json(&json!({"csrf_token": ""}), Some(TEST_KEY)).unwrap();
        assert_eq!(request.params, TEST_PARAMS);
    }

    #[test]
    fn wire_field_name_is_enc_sec_key() {
        let request = encrypt("x", Some(TEST_KEY));
        let encoded = serde_json::to_value(&request).unwrap();
        assert!(encoded.get("encSecKey").is_some());
        assert!(encoded.get("params").is_some());
    }
}
