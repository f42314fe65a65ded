use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::config::Argon2Config;

/// Argon2id hashing with configurable cost and a fresh salt per hash.
pub struct CredentialHasher {
    params: Params,
    // Verified against when the account does not exist, so a miss costs
    // the same as a wrong password.
    decoy_hash: String,
}

impl CredentialHasher {
    pub fn new(cost: &Argon2Config) -> anyhow::Result<Self> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|e| anyhow::anyhow!("argon2 params: {e}"))?;
        let mut hasher = Self {
            params,
            decoy_hash: String::new(),
        };
        hasher.decoy_hash = hasher.hash("decoy password never assigned to anyone")?;
        Ok(hasher)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow::anyhow!(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// Parameters are read from the stored hash, so hashes made under an
    /// older cost setting still verify.
    pub fn verify(&self, plain: &str, hash: &str) -> anyhow::Result<bool> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            anyhow::anyhow!(e.to_string())
        })?;
        Ok(self
            .argon2()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    }

    /// Burn one verification's worth of work and report failure.
    pub fn verify_decoy(&self, plain: &str) -> bool {
        let _ = self.verify(plain, &self.decoy_hash);
        false
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> CredentialHasher {
    CredentialHasher::new(&Argon2Config {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    })
    .expect("test params are valid")
}
