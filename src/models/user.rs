use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::models::timestamp;

/// Returns a new ObjectId as a hex string. This is used as the default for the `id` field.
pub fn default_id() -> String {
    ObjectId::new().to_hex()
}

/// A single-use token paired with its absolute expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Verify,
    Reset,
}

impl TokenKind {
    /// Stored field names for the token and its expiry.
    pub fn fields(self) -> (&'static str, &'static str) {
        match self {
            TokenKind::Verify => ("verifyToken", "verifyTokenExpire"),
            TokenKind::Reset => ("resetToken", "resetTokenExpire"),
        }
    }
}

/// A registered account.
///
/// Stored in the `users` collection. `_id` is kept as the hex form of an
/// ObjectId so ids round-trip through JWT subjects and URLs unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", default = "default_id")]
    pub id: String,

    pub name: String,

    pub email: String,

    /// bcrypt hash. Never sent to clients; see [`UserProfile`].
    pub password: String,

    #[serde(default)]
    pub is_verified: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none", with = "timestamp::option")]
    pub verify_token_expire: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none", with = "timestamp::option")]
    pub reset_token_expire: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    #[serde(default = "Utc::now", with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        Self {
            id: default_id(),
            name,
            email,
            password: password_hash,
            is_verified: false,
            verify_token: None,
            verify_token_expire: None,
            reset_token: None,
            reset_token_expire: None,
            avatar: None,
            created_at: Utc::now(),
        }
    }

    /// Stores a token and its expiry together.
    pub fn set_token(&mut self, kind: TokenKind, token: String, expires: DateTime<Utc>) {
        match kind {
            TokenKind::Verify => {
                self.verify_token = Some(token);
                self.verify_token_expire = Some(expires);
            }
            TokenKind::Reset => {
                self.reset_token = Some(token);
                self.reset_token_expire = Some(expires);
            }
        }
    }

    pub fn clear_token(&mut self, kind: TokenKind) {
        match kind {
            TokenKind::Verify => {
                self.verify_token = None;
                self.verify_token_expire = None;
            }
            TokenKind::Reset => {
                self.reset_token = None;
                self.reset_token_expire = None;
            }
        }
    }

    /// True when `token` is this user's live token of the given kind.
    /// An expired token counts as absent.
    pub fn holds_token(&self, kind: TokenKind, token: &str, now: DateTime<Utc>) -> bool {
        let (stored, expires) = match kind {
            TokenKind::Verify => (&self.verify_token, self.verify_token_expire),
            TokenKind::Reset => (&self.reset_token, self.reset_token_expire),
        };
        matches!((stored, expires), (Some(t), Some(exp)) if t == token && exp > now)
    }
}

/// What a user may see about their own account.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            avatar: u.avatar,
            is_verified: u.is_verified,
            created_at: u.created_at,
        }
    }
}

/// The minimal projection returned on login.
#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&User> for SessionUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.clone(),
            name: u.name.clone(),
            email: u.email.clone(),
        }
    }
}
