use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

use crate::session::token::DEFAULT_EXPIRATION_DAYS;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is not valid: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Credentials for the super admin created on first start
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
    pub fullname: String,
}

/// Process configuration, read from the environment after loading `.env`
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    pub database_url: Option<String>,
    pub public_dir: PathBuf,
    pub jwt_secret: String,
    pub jwt_expire_days: i64,
    pub admin_seed: Option<AdminSeed>,
}

fn var(name: &'static str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match var(name) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => info!(path = %path.display(), "Loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => warn!(error = %e, "Could not read .env file"),
        }

        let jwt_expire_days = parsed("JWT_EXPIRE_DAYS", DEFAULT_EXPIRATION_DAYS)?;
        if jwt_expire_days < 1 {
            return Err(ConfigError::Invalid {
                name: "JWT_EXPIRE_DAYS",
                value: jwt_expire_days.to_string(),
            });
        }

        let admin_seed = match (var("ADMIN_EMAIL"), var("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed {
                email,
                password,
                fullname: var("ADMIN_FULLNAME").unwrap_or_else(|| "Super Admin".to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            host: parsed("HOST", IpAddr::from([0, 0, 0, 0]))?,
            port: parsed("PORT", 5000)?,
            database_url: var("DATABASE_URL"),
            public_dir: PathBuf::from(var("PUBLIC_DIR").unwrap_or_else(|| "public".to_string())),
            jwt_secret: var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
            jwt_expire_days,
            admin_seed,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsed_falls_back_and_rejects_garbage() {
        assert_eq!(parsed::<u16>("GYMHUB_TEST_UNSET_PORT", 5000).unwrap(), 5000);

        env::set_var("GYMHUB_TEST_BAD_PORT", "fifty");
        let err = parsed::<u16>("GYMHUB_TEST_BAD_PORT", 5000).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { value, .. } if value == "fifty"));
    }
}
