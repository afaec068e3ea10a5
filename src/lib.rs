pub mod constants;
pub mod endpoint;
pub mod error;
pub mod modexp;
pub mod presence;
pub mod weapi;

pub use error::{CryptoError, SerializationError};
pub use presence::SparsePresenceTable;
pub use weapi::{encrypt, encrypt_json, random_key, CipherKey, EncryptedRequest};
