//! Password hashing.
//!
//! PBKDF2-HMAC-SHA256 with a per-user random 16-byte salt and a fixed high
//! iteration count. The stored form is `<salt_hex>:<derived_key_hex>`; a
//! malformed stored value verifies as false rather than erroring, so lookups
//! against legacy or corrupt rows fail closed.

use pbkdf2::pbkdf2_hmac_array;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// PBKDF2 iteration count.
const ITERATIONS: u32 = 150_000;

/// Salt length in bytes.
const SALT_LEN: usize = 16;

/// Derived key length in bytes.
const KEY_LEN: usize = 32;

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    let mut out = Vec::with_capacity(s.len() / 2);
    for chunk in s.as_bytes().chunks(2) {
        let hex_str = std::str::from_utf8(chunk).ok()?;
        out.push(u8::from_str_radix(hex_str, 16).ok()?);
    }
    Some(out)
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    let dk = pbkdf2_hmac_array::<Sha256, KEY_LEN>(password.as_bytes(), &salt, ITERATIONS);
    format!("{}:{}", hex_encode(&salt), hex_encode(&dk))
}

/// Verify a password against a stored `salt:key` hash in constant time.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, dk_hex)) = stored.split_once(':') else {
        return false;
    };
    let Some(salt) = hex_decode(salt_hex) else {
        return false;
    };
    let Some(expected) = hex_decode(dk_hex) else {
        return false;
    };
    if expected.len() != KEY_LEN {
        return false;
    }
    let dk = pbkdf2_hmac_array::<Sha256, KEY_LEN>(password.as_bytes(), &salt, ITERATIONS);
    dk.ct_eq(expected.as_slice()).into()
}
