use num_bigint::BigUint;
use once_cell::sync::Lazy;

/// Symmetric key length in bytes (AES-128 block size).
pub const KEY_LEN: usize = 16;

// Wire constants of the vendor's request envelope. Changing any of these
// breaks compatibility with the deployed endpoints.
pub const NONCE: [u8; KEY_LEN] = *b"0CoJUm6Qyw8W8jud";
pub const IV: [u8; KEY_LEN] = *b"0102030405060708";

pub const EXPONENT: u32 = 65537;

/// 1024-bit public modulus, taken verbatim from the vendor's core.js.
pub const MODULUS_HEX: &str = "e0b509f6259df8642dbc35662901477df22677ec152b5f\
f68ace615bb7b725152b3ab17a876aea8a5aa76d2e417629ec4ee341f56135fccf695280104e\
0312ecbda92557c93870114af6c9d05c4f7f0c3685b7a46bee255932575cce10b424d813cfe4\
875d3e82047b97ddef52741d546b8e289dc6935b3ece0462db0a22b8e7";

pub static MODULUS: Lazy<BigUint> =
    Lazy::new(|| BigUint::parse_bytes(MODULUS_HEX.as_bytes(), 16).expect("modulus hex literal"));

/// `encSecKey` is always rendered as this many lowercase hex characters.
pub const ENC_SEC_KEY_LEN: usize = 256;
