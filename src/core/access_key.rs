//! Integration access key generation.

use crate::constants;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

fn random_alphanumeric(length: usize) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(OsRng.sample_iter(&Alphanumeric).take(length).collect())
}

/// Public access key: `SWIA` followed by uppercase URL-safe base64.
pub fn generate_access_key() -> String {
    let raw = random_alphanumeric(constants::ACCESS_KEY_RANDOM_LEN);
    format!(
        "{}{}",
        constants::INTEGRATION_ACCESS_KEY_PREFIX,
        URL_SAFE_NO_PAD.encode(raw.as_slice()).to_uppercase()
    )
}

pub fn generate_secret_access_key() -> Zeroizing<String> {
    let raw = random_alphanumeric(constants::SECRET_ACCESS_KEY_RANDOM_LEN);
    Zeroizing::new(URL_SAFE_NO_PAD.encode(raw.as_slice()))
}

/// Digest stored in place of the secret.
pub fn digest_secret(secret: &str) -> String {
    format!("{:x}", Sha256::digest(secret.as_bytes()))
}
