use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Argon2 cost parameters. `iterations` is the work factor.
#[derive(Debug, Clone, Deserialize)]
pub struct HashConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub root: PathBuf,
    pub max_avatar_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub hashing: HashConfig,
    pub uploads: UploadConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;

        // No built-in fallback secret: a missing key refuses to start.
        let secret = lookup("JWT_SECRET").context("JWT_SECRET must be set")?;
        if secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }

        let jwt = JwtConfig {
            secret,
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "skillfolio".into()),
            audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| "skillfolio-users".into()),
            ttl_minutes: parse_or(&lookup, "JWT_TTL_MINUTES", 60 * 24 * 7)?,
        };

        let hashing = HashConfig {
            memory_kib: parse_or(&lookup, "PASSWORD_MEMORY_KIB", 19 * 1024)?,
            iterations: parse_or(&lookup, "PASSWORD_ITERATIONS", 2)?,
            parallelism: parse_or(&lookup, "PASSWORD_PARALLELISM", 1)?,
        };

        let uploads = UploadConfig {
            root: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./uploads")),
            max_avatar_bytes: parse_or(&lookup, "MAX_AVATAR_BYTES", 5 * 1024 * 1024)?,
        };

        Ok(Self {
            database_url,
            jwt,
            hashing,
            uploads,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn loads_defaults_when_only_required_values_are_set() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/skillfolio"),
            ("JWT_SECRET", "s3cret"),
        ]))
        .expect("config should load");

        assert_eq!(cfg.jwt.issuer, "skillfolio");
        assert_eq!(cfg.jwt.audience, "skillfolio-users");
        assert_eq!(cfg.jwt.ttl_minutes, 7 * 24 * 60);
        assert_eq!(cfg.hashing.iterations, 2);
        assert_eq!(cfg.uploads.root, PathBuf::from("./uploads"));
        assert_eq!(cfg.uploads.max_avatar_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn missing_secret_refuses_to_start() {
        let err = AppConfig::from_lookup(lookup_from(&[(
            "DATABASE_URL",
            "postgres://localhost/skillfolio",
        )]))
        .unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn blank_secret_refuses_to_start() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/skillfolio"),
            ("JWT_SECRET", "   "),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn invalid_number_is_an_error_not_a_default() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/skillfolio"),
            ("JWT_SECRET", "s3cret"),
            ("PASSWORD_ITERATIONS", "lots"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("PASSWORD_ITERATIONS"));
    }
}
