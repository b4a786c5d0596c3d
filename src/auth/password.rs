//! Password storage: Argon2id enrollment and verification of PHC strings.
//!
//! Enrolled hashes look like `$argon2id$v=19$m=19456,t=2,p=1$<salt>$<digest>`.
//! Verification reads the algorithm, version, cost and salt back out of the
//! stored string, so hashes produced under an older work factor keep
//! verifying after the configured defaults are raised.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, SaltString},
    Algorithm, Argon2, Params, ParamsBuilder, Version,
};
use constant_time_eq::constant_time_eq;
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use thiserror::Error;
use tracing::{debug, error};

use crate::auth::validation::check_password_strength;
use crate::config::HashingConfig;

/// Longest salt the argon2 PHC encoding can carry.
const MAX_SALT_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("{0}")]
    WeakSecret(String),
    /// Stored artifact could not be parsed. Internal only.
    #[error("corrupt password hash: {0}")]
    CorruptHash(String),
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Owns the Argon2id parameters and the decoy hash used when no user matches.
pub struct CredentialStore {
    params: Params,
    decoy: String,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    pub fn new(cfg: HashingConfig) -> Result<Self, CredentialError> {
        let params = ParamsBuilder::new()
            .m_cost(cfg.memory_kib)
            .t_cost(cfg.iterations)
            .p_cost(cfg.parallelism)
            .build()
            .map_err(|e| CredentialError::Hashing(e.to_string()))?;

        let mut store = Self {
            params,
            decoy: String::new(),
        };
        // Random secret nobody knows; only its cost profile matters.
        let decoy_secret: String = OsRng
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        store.decoy = store.derive(&decoy_secret)?;
        Ok(store)
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    fn derive(&self, plain: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                CredentialError::Hashing(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// Hashes a new password with a fresh salt and the current work factor.
    pub fn enroll(&self, plain: &str) -> Result<String, CredentialError> {
        check_password_strength(plain).map_err(CredentialError::WeakSecret)?;
        let hash = self.derive(plain)?;
        debug!(
            m_cost = self.params.m_cost(),
            t_cost = self.params.t_cost(),
            p_cost = self.params.p_cost(),
            "password enrolled"
        );
        Ok(hash)
    }

    /// Checks `plain` against a stored artifact. Malformed artifacts are a mismatch
    /// and cost one decoy verification, so they take as long as a wrong password.
    pub fn verify(&self, plain: &str, stored: &str) -> bool {
        match self.try_verify(plain, stored) {
            Ok(ok) => ok,
            Err(e) => {
                error!(error = %e, "stored password hash unusable");
                self.verify_decoy(plain)
            }
        }
    }

    /// Like [`verify`](Self::verify) but reports unparsable artifacts to the caller.
    ///
    /// An `Err` returns before any Argon2 work; callers answering a client
    /// should follow it with [`verify_decoy`](Self::verify_decoy).
    pub fn try_verify(&self, plain: &str, stored: &str) -> Result<bool, CredentialError> {
        let corrupt = |e: &dyn std::fmt::Display| CredentialError::CorruptHash(e.to_string());

        let parsed = PasswordHash::new(stored).map_err(|e| corrupt(&e))?;
        let algorithm = Algorithm::try_from(parsed.algorithm).map_err(|e| corrupt(&e))?;
        let version = match parsed.version {
            Some(v) => Version::try_from(v).map_err(|e| corrupt(&e))?,
            None => Version::default(),
        };
        let expected = parsed
            .hash
            .as_ref()
            .ok_or_else(|| corrupt(&"missing digest"))?;
        let salt = parsed
            .salt
            .as_ref()
            .ok_or_else(|| corrupt(&"missing salt"))?;
        let mut salt_buf = [0u8; MAX_SALT_LEN];
        let salt = salt.decode_b64(&mut salt_buf).map_err(|e| corrupt(&e))?;

        let stored_params = Params::try_from(&parsed).map_err(|e| corrupt(&e))?;
        let params = ParamsBuilder::new()
            .m_cost(stored_params.m_cost())
            .t_cost(stored_params.t_cost())
            .p_cost(stored_params.p_cost())
            .output_len(expected.len())
            .build()
            .map_err(|e| corrupt(&e))?;

        let mut computed = vec![0u8; expected.len()];
        Argon2::new(algorithm, version, params)
            .hash_password_into(plain.as_bytes(), salt, &mut computed)
            .map_err(|e| corrupt(&e))?;

        Ok(constant_time_eq(&computed, expected.as_bytes()))
    }

    /// Burns one verification against the decoy hash. Always false.
    pub fn verify_decoy(&self, plain: &str) -> bool {
        if let Err(e) = self.try_verify(plain, &self.decoy) {
            error!(error = %e, "decoy hash unusable");
        }
        false
    }

    /// Whether `stored` was produced with a weaker setup than the current one.
    ///
    /// Unparsable artifacts also report true.
    pub fn needs_rehash(&self, stored: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored) else {
            return true;
        };
        if !matches!(Algorithm::try_from(parsed.algorithm), Ok(Algorithm::Argon2id)) {
            return true;
        }
        let version = parsed.version.map(Version::try_from);
        if !matches!(version, None | Some(Ok(Version::V0x13))) {
            return true;
        }
        match Params::try_from(&parsed) {
            Ok(p) => {
                p.m_cost() < self.params.m_cost()
                    || p.t_cost() < self.params.t_cost()
                    || p.p_cost() < self.params.p_cost()
            }
            Err(_) => true,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> HashingConfig {
    HashingConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    }
}
