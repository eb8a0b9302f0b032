//! Salted, iterated SHA-256 password hashing.
//!
//! Stored format: `v1$<salt_hex>$<digest_hex>`. The version segment pins
//! the iteration count, so raising it later only needs a new segment.

use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

const PASSWORD_HASH_VERSION: &str = "v1";
const PASSWORD_SALT_BYTES: usize = 16;
const PASSWORD_HASH_ITERATIONS: u32 = 100_000;

/// Hash a password with a fresh random salt.
#[must_use]
pub fn hash_password(password: &str) -> String {
    let mut salt = [0_u8; PASSWORD_SALT_BYTES];

    OsRng.fill_bytes(&mut salt);

    let digest = stretch(password, &salt);

    format!(
        "{PASSWORD_HASH_VERSION}${}${}",
        hex_encode(&salt),
        hex_encode(&digest)
    )
}

/// Verify a password against a stored hash string.
///
/// Returns `false` for malformed or unknown-version hashes rather than
/// erroring, so callers stay on the invalid-credentials path.
#[must_use]
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');

    let (Some(version), Some(salt_hex), Some(digest_hex)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    if version != PASSWORD_HASH_VERSION {
        return false;
    }

    let Some(salt) = hex_decode(salt_hex) else {
        return false;
    };

    let Some(expected) = hex_decode(digest_hex) else {
        return false;
    };

    let actual = stretch(password, &salt);

    constant_time_eq(&actual, &expected)
}

fn stretch(password: &str, salt: &[u8]) -> Vec<u8> {
    let mut digest = Sha256::new()
        .chain_update(salt)
        .chain_update(password.as_bytes())
        .finalize();

    for _ in 1..PASSWORD_HASH_ITERATIONS {
        digest = Sha256::new()
            .chain_update(salt)
            .chain_update(digest)
            .finalize();
    }

    digest.to_vec()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0_u8;

    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }

    diff == 0
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    let mut encoded = String::with_capacity(bytes.len() * 2);

    for byte in bytes {
        encoded.push(HEX[(byte >> 4) as usize] as char);
        encoded.push(HEX[(byte & 0x0f) as usize] as char);
    }

    encoded
}

fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }

    let bytes = hex.as_bytes();
    let mut decoded = Vec::with_capacity(hex.len() / 2);

    for pair in bytes.chunks_exact(2) {
        let hi = decode_hex_nibble(pair[0])?;
        let lo = decode_hex_nibble(pair[1])?;

        decoded.push((hi << 4) | lo);
    }

    Some(decoded)
}

fn decode_hex_nibble(value: u8) -> Option<u8> {
    match value {
        b'0'..=b'9' => Some(value - b'0'),
        b'a'..=b'f' => Some(value - b'a' + 10),
        b'A'..=b'F' => Some(value - b'A' + 10),
        _ => None,
    }
}
