// src/services/auth_service.rs

use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::Error as JwtError, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::Lazy;
use rand::RngCore;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Lifetime of a session token.
pub const SESSION_TTL_DAYS: i64 = 7;

/// Lifetime of an email-verification or password-reset token.
pub const ONE_TIME_TOKEN_TTL_HOURS: i64 = 1;

/// JWT claims of a session token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id.
    pub sub: String,
    /// Issued at (UTC timestamp).
    pub iat: usize,
    /// Expiration time (UTC timestamp).
    pub exp: usize,
}

/// Verifies a plain password against a hashed password.
/// A malformed hash counts as a mismatch.
pub fn verify_password(plain_password: &str, hashed_password: &str) -> bool {
    verify(plain_password, hashed_password).unwrap_or(false)
}

/// Hashes a password using bcrypt.
pub fn get_password_hash(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    hash(password, cost)
}

/// Signs a session token for `user_id` that expires after `ttl`.
pub fn create_access_token(user_id: &str, secret: &str, ttl: Duration) -> Result<String, JwtError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp() as usize,
        exp: (now + ttl).timestamp() as usize,
    };
    // HS256
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
}

/// Verifies a JWT token and returns the decoded claims if valid and unexpired.
pub fn verify_jwt_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let validation = Validation::default();
    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)?;
    Ok(token_data.claims)
}

/// 256 random bits, hex encoded. Used for both verify and reset links.
pub fn generate_one_time_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL_RE.is_match(email)
}

/// Password strength rule: minimum length plus a mix of character classes.
#[derive(Debug, Clone, Copy)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub min_lowercase: usize,
    pub min_uppercase: usize,
    pub min_digits: usize,
    pub min_symbols: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            min_lowercase: 1,
            min_uppercase: 1,
            min_digits: 1,
            min_symbols: 1,
        }
    }
}

impl PasswordPolicy {
    pub fn is_strong(&self, password: &str) -> bool {
        let count = |pred: fn(&char) -> bool| password.chars().filter(pred).count();
        password.chars().count() >= self.min_length
            && count(char::is_ascii_lowercase) >= self.min_lowercase
            && count(char::is_ascii_uppercase) >= self.min_uppercase
            && count(char::is_ascii_digit) >= self.min_digits
            && count(|c| !c.is_alphanumeric() && !c.is_whitespace()) >= self.min_symbols
    }
}
