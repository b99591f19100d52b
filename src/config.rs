// src/config.rs

use std::env;

use crate::services::auth_service::PasswordPolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Clone, Debug)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Process configuration, read once at startup and handed to whatever needs it.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub mongo_uri: String,
    pub mongo_db_name: String,
    pub secret_key: String,
    pub bcrypt_cost: u32,
    pub password_policy: PasswordPolicy,
    /// Public base of this API, used in verification links.
    pub base_url: String,
    /// Public base of the client app, used in password reset links.
    pub front_url: String,
    /// Allowed CORS origin. Any origin is allowed when unset.
    pub client_origin: Option<String>,
    pub smtp: SmtpConfig,
    pub cloudinary: CloudinaryConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let password_policy = PasswordPolicy {
            min_length: parse_or("PASSWORD_MIN_LENGTH", 8)?,
            ..PasswordPolicy::default()
        };

        Ok(Self {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: parse_or("SERVER_PORT", 8080)?,
            mongo_uri: env::var("MONGO_URI")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            mongo_db_name: env::var("MONGO_DB_NAME").unwrap_or_else(|_| "roomfinder".to_string()),
            secret_key: required("SECRET_KEY")?,
            bcrypt_cost: parse_or("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            password_policy,
            base_url: env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string()),
            front_url: env::var("FRONT_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            client_origin: env::var("CLIENT_ORIGIN").ok().filter(|s| !s.is_empty()),
            smtp: SmtpConfig {
                server: required("SMTP_SERVER")?,
                port: parse_or("SMTP_PORT", 587)?,
                username: required("SMTP_USERNAME")?,
                password: required("SMTP_PASSWORD")?,
                from: env::var("EMAIL_FROM")
                    .unwrap_or_else(|_| "NoReply <no-reply@example.com>".to_string()),
            },
            cloudinary: CloudinaryConfig {
                cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
                api_key: required("CLOUDINARY_API_KEY")?,
                api_secret: required("CLOUDINARY_API_SECRET")?,
            },
        })
    }

    /// A config that never touches the environment.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            server_host: "127.0.0.1".into(),
            server_port: 0,
            mongo_uri: String::new(),
            mongo_db_name: "roomfinder_test".into(),
            secret_key: "test-secret".into(),
            bcrypt_cost: 4,
            password_policy: PasswordPolicy::default(),
            base_url: "http://api.test".into(),
            front_url: "http://app.test".into(),
            client_origin: None,
            smtp: SmtpConfig {
                server: "smtp.test".into(),
                port: 587,
                username: "user".into(),
                password: "pass".into(),
                from: "NoReply <no-reply@example.com>".into(),
            },
            cloudinary: CloudinaryConfig {
                cloud_name: "demo".into(),
                api_key: "key".into(),
                api_secret: "secret".into(),
            },
        }
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}

fn parse_or<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
