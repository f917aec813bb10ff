//! Password hashing.
//!
//! Two schemes share one `verify`: the stored digest's shape tells them
//! apart, so accounts hashed under either keep working after the
//! configured scheme changes.
//!
//! - `Sha256`: lowercase hex SHA-256 of the password. No salt and no work
//!   factor; only fit for demos and legacy imports.
//! - `Argon2`: argon2id with the crate's default (fixed) cost parameters and
//!   a random salt, stored as a PHC string.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand_core::OsRng;
use serde::Deserialize;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordScheme {
    Sha256,
    #[default]
    Argon2,
}

impl PasswordScheme {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Some(Self::Sha256),
            "argon2" => Some(Self::Argon2),
            _ => None,
        }
    }

    pub fn hash(&self, password: &str) -> Result<String, argon2::password_hash::Error> {
        match self {
            Self::Sha256 => Ok(sha256_hex(password.as_bytes())),
            Self::Argon2 => hash_password(password),
        }
    }
}

/// Hash a password with Argon2id
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored digest of either scheme.
/// Unrecognised or corrupt digests never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    if stored.starts_with("$argon2") {
        match PasswordHash::new(stored) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    } else if is_sha256_hex(stored) {
        constant_time_eq(sha256_hex(password.as_bytes()).as_bytes(), stored.as_bytes())
    } else {
        false
    }
}

/// Lowercase hex SHA-256, also used to fingerprint tokens and api keys
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn is_sha256_hex(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
