use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::{Error, Result};

pub fn validate_password(password: &str) -> Result<()> {
    if password.len() < 8 {
        return Err(Error::invalid("Password must be at least 8 characters"));
    }
    Ok(())
}

/// Salted SHA-256 digest in the form `v1$<salt>$<digest>`.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);

    format!(
        "v1${}${}",
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(digest(&salt, password))
    )
}

pub fn verify_password(stored_hash: &str, password: &str) -> bool {
    let mut parts = stored_hash.split('$');
    let (Some("v1"), Some(encoded_salt), Some(encoded_digest)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    let Ok(salt) = URL_SAFE_NO_PAD.decode(encoded_salt) else {
        return false;
    };
    let Ok(expected) = URL_SAFE_NO_PAD.decode(encoded_digest) else {
        return false;
    };
    expected == digest(&salt, password)
}

fn digest(salt: &[u8], password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("verysecurepw");
        assert!(hash.starts_with("v1$"));
        assert!(verify_password(&hash, "verysecurepw"));
        assert!(!verify_password(&hash, "verysecurepx"));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        assert_ne!(hash_password("verysecurepw"), hash_password("verysecurepw"));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("plain", "plain"));
        assert!(!verify_password("v2$abc$def", "x"));
        assert!(!verify_password("v1$!!$!!", "x"));
    }
}
