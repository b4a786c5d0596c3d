use anyhow::Context;

/// Argon2id work factor. Raising these only affects newly enrolled hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub hashing: HashingConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = HashingConfig::default();
        let hashing = HashingConfig {
            memory_kib: env_parse("HASH_MEMORY_KIB")?.unwrap_or(defaults.memory_kib),
            iterations: env_parse("HASH_ITERATIONS")?.unwrap_or(defaults.iterations),
            parallelism: env_parse("HASH_PARALLELISM")?.unwrap_or(defaults.parallelism),
        };
        Ok(Self {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_parse("APP_PORT")?.unwrap_or(8080),
            database_url: std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            database_max_connections: env_parse("DATABASE_MAX_CONNECTIONS")?.unwrap_or(10),
            hashing,
        })
    }
}

fn env_parse<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) => v
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("invalid value for {key}: {v:?}")),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_parse_reads_and_rejects() {
        std::env::set_var("USERAUTH_TEST_PORT_OK", "9090");
        std::env::set_var("USERAUTH_TEST_PORT_BAD", "ninety");
        assert_eq!(env_parse::<u16>("USERAUTH_TEST_PORT_OK").unwrap(), Some(9090));
        assert!(env_parse::<u16>("USERAUTH_TEST_PORT_BAD").is_err());
        assert_eq!(env_parse::<u16>("USERAUTH_TEST_PORT_MISSING").unwrap(), None);
    }

    #[test]
    fn default_work_factor_matches_argon2_recommendation() {
        let cfg = HashingConfig::default();
        assert_eq!(cfg.memory_kib, 19456);
        assert_eq!(cfg.iterations, 2);
        assert_eq!(cfg.parallelism, 1);
    }
}
