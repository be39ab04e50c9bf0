//! Password hashing and verification (Argon2id, PHC strings).
//! The PHC string embeds algorithm, cost parameters and the per-password salt,
//! so nothing besides the digest itself needs storing.

use anyhow::{anyhow, Result};
use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use password_hash::{PasswordHash, SaltString};

use crate::config::HashParams;

pub struct CredentialStore {
    params: Params,
    // Digest of a random secret at the same cost, built up front; verified
    // against when the username is unknown so both failure paths spend one
    // verification and nothing more.
    dummy: String,
}

impl CredentialStore {
    /// Cost is taken as given; `HashParams::validate` is where the minimum is enforced.
    pub fn new(hp: HashParams) -> Result<Self> {
        let params = Params::new(hp.memory_kib, hp.iterations, hp.parallelism, None)
            .map_err(|e| anyhow!("invalid argon2 params: {}", e))?;
        let mut store = Self { params, dummy: String::new() };
        let mut secret = [0u8; 24];
        getrandom::getrandom(&mut secret).map_err(|e| anyhow!(e.to_string()))?;
        store.dummy = store.hash(&base64_secret(&secret))?;
        Ok(store)
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, plaintext: &str) -> Result<String> {
        let mut salt_bytes = [0u8; 16];
        getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
        let phc = self.hasher().hash_password(plaintext.as_bytes(), &salt).map_err(|e| anyhow!(e.to_string()))?.to_string();
        Ok(phc)
    }

    /// Fails closed: a digest that does not parse is a mismatch, never an error.
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        match PasswordHash::new(digest) {
            // params come from the PHC string, not from self
            Ok(parsed) => self.hasher().verify_password(plaintext.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        }
    }

    /// Burn one verification's worth of work. Always false.
    pub fn verify_dummy(&self, plaintext: &str) -> bool {
        let _ = self.verify(plaintext, &self.dummy);
        false
    }
}

fn base64_secret(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
