// src/services/user_service.rs

//! Accounts: signup and email verification, login, password reset, profile.

use chrono::{Duration, Utc};

use crate::error::ApiError;
use crate::media::UploadedFile;
use crate::models::user::{SessionUser, TokenKind, User, UserProfile};
use crate::services::auth_service::{self, ONE_TIME_TOKEN_TTL_HOURS, SESSION_TTL_DAYS};
use crate::services::{mail_service, media_service};
use crate::state::AppState;
use crate::store::StoreError;

const INVALID_TOKEN: &str = "Invalid or expired token";

/// Profile fields a user may change. Each one is optional.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub avatar: Option<UploadedFile>,
}

fn hash(state: &AppState, password: &str) -> Result<String, ApiError> {
    auth_service::get_password_hash(password, state.config.bcrypt_cost)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))
}

fn check_email(email: &str) -> Result<(), ApiError> {
    if !auth_service::is_valid_email(email) {
        return Err(ApiError::validation("Enter a valid email"));
    }
    Ok(())
}

fn check_password(state: &AppState, password: &str) -> Result<(), ApiError> {
    if !state.config.password_policy.is_strong(password) {
        return Err(ApiError::validation("Password is too weak"));
    }
    Ok(())
}

fn map_duplicate(err: StoreError) -> ApiError {
    match err {
        StoreError::Duplicate(_) => ApiError::Conflict("Email already exists".into()),
        other => ApiError::Store(other),
    }
}

fn one_time_expiry() -> chrono::DateTime<Utc> {
    Utc::now() + Duration::hours(ONE_TIME_TOKEN_TTL_HOURS)
}

async fn send_verification(state: &AppState, user: &User, token: &str) -> Result<(), ApiError> {
    let link = format!(
        "{}/api/user/verify-email/{}",
        state.config.base_url.trim_end_matches('/'),
        token
    );
    state
        .mailer
        .send(mail_service::verification_email(&user.name, &user.email, &link))
        .await
        .map_err(|e| {
            log::error!("Failed to send verification email to {}: {}", user.email, e);
            ApiError::from(e)
        })
}

/// Creates an unverified account and mails the verification link.
///
/// The account is kept when the mail fails; the caller still gets an error
/// and can ask for a new link.
pub async fn signup(state: &AppState, name: &str, email: &str, password: &str) -> Result<User, ApiError> {
    let name = name.trim();
    let email = email.trim();
    if name.is_empty() {
        return Err(ApiError::validation("Name is required"));
    }
    check_email(email)?;
    check_password(state, password)?;

    if state.users.find_user_by_email(email).await?.is_some() {
        return Err(ApiError::Conflict("Email already exists".into()));
    }

    let mut user = User::new(name.to_string(), email.to_string(), hash(state, password)?);
    let token = auth_service::generate_one_time_token();
    user.set_token(TokenKind::Verify, token.clone(), one_time_expiry());
    state.users.insert_user(&user).await.map_err(map_duplicate)?;
    log::info!("User {} registered", user.id);

    send_verification(state, &user, &token).await?;
    Ok(user)
}

pub async fn verify_email(state: &AppState, token: &str) -> Result<(), ApiError> {
    let mut user = state
        .users
        .find_user_by_token(TokenKind::Verify, token, Utc::now())
        .await?
        .ok_or_else(|| ApiError::validation(INVALID_TOKEN))?;

    user.is_verified = true;
    user.clear_token(TokenKind::Verify);
    state.users.replace_user(&user).await?;
    log::info!("User {} verified their email", user.id);
    Ok(())
}

pub async fn resend_verification(state: &AppState, email: &str) -> Result<(), ApiError> {
    let mut user = state
        .users
        .find_user_by_email(email.trim())
        .await?
        .ok_or_else(|| ApiError::not_found("Email not registered"))?;
    if user.is_verified {
        return Err(ApiError::validation("Email already verified"));
    }

    let token = auth_service::generate_one_time_token();
    user.set_token(TokenKind::Verify, token.clone(), one_time_expiry());
    state.users.replace_user(&user).await?;
    send_verification(state, &user, &token).await
}

/// Returns a session token and the login projection.
pub async fn login(state: &AppState, email: &str, password: &str) -> Result<(String, SessionUser), ApiError> {
    let user = state
        .users
        .find_user_by_email(email.trim())
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if !auth_service::verify_password(password, &user.password) {
        return Err(ApiError::InvalidCredentials);
    }
    if !user.is_verified {
        return Err(ApiError::Unverified);
    }

    let token = auth_service::create_access_token(
        &user.id,
        &state.config.secret_key,
        Duration::days(SESSION_TTL_DAYS),
    )
    .map_err(|e| ApiError::Internal(format!("token signing failed: {}", e)))?;
    Ok((token, SessionUser::from(&user)))
}

/// Issues a reset token and mails the link. Unknown addresses get a 404.
pub async fn forgot_password(state: &AppState, email: &str) -> Result<(), ApiError> {
    let email = email.trim();
    check_email(email).map_err(|_| ApiError::validation("Please enter a valid email."))?;

    let mut user = state
        .users
        .find_user_by_email(email)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let token = auth_service::generate_one_time_token();
    user.set_token(TokenKind::Reset, token.clone(), one_time_expiry());
    state.users.replace_user(&user).await?;

    let link = format!(
        "{}/reset-password/{}",
        state.config.front_url.trim_end_matches('/'),
        token
    );
    state
        .mailer
        .send(mail_service::password_reset_email(&user.name, &user.email, &link))
        .await
        .map_err(|e| {
            log::error!("Failed to send reset email to {}: {}", user.email, e);
            ApiError::from(e)
        })
}

pub async fn reset_password(state: &AppState, token: &str, new_password: &str) -> Result<(), ApiError> {
    check_password(state, new_password)?;

    let mut user = state
        .users
        .find_user_by_token(TokenKind::Reset, token, Utc::now())
        .await?
        .ok_or_else(|| ApiError::validation(INVALID_TOKEN))?;

    user.password = hash(state, new_password)?;
    user.clear_token(TokenKind::Reset);
    state.users.replace_user(&user).await?;
    log::info!("User {} reset their password", user.id);
    Ok(())
}

pub async fn get_profile(state: &AppState, user_id: &str) -> Result<UserProfile, ApiError> {
    state
        .users
        .find_user_by_id(user_id)
        .await?
        .map(UserProfile::from)
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// Validates every supplied field, then applies them together.
pub async fn update_profile(
    state: &AppState,
    user_id: &str,
    update: ProfileUpdate,
) -> Result<UserProfile, ApiError> {
    let mut user = state
        .users
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let name = match update.name.as_deref().map(str::trim) {
        Some("") => return Err(ApiError::validation("Name cannot be empty")),
        other => other.map(str::to_owned),
    };
    let email = match update.email.as_deref().map(str::trim) {
        Some(email) if email != user.email => {
            check_email(email)?;
            if state.users.find_user_by_email(email).await?.is_some() {
                return Err(ApiError::Conflict("Email already exists".into()));
            }
            Some(email.to_owned())
        }
        _ => None,
    };
    let password = match update.password.as_deref() {
        Some(p) => {
            check_password(state, p)?;
            Some(hash(state, p)?)
        }
        None => None,
    };

    let previous_avatar = user.avatar.clone();
    if let Some(avatar) = &update.avatar {
        let urls = media_service::upload_all(state.media.as_ref(), std::slice::from_ref(avatar)).await?;
        user.avatar = urls.into_iter().next();
    }
    if let Some(name) = name {
        user.name = name;
    }
    if let Some(email) = email {
        user.email = email;
    }
    if let Some(password) = password {
        user.password = password;
    }

    if !state.users.replace_user(&user).await.map_err(map_duplicate)? {
        return Err(ApiError::not_found("User not found"));
    }
    if update.avatar.is_some() {
        if let Some(old) = previous_avatar {
            media_service::remove_all(state.media.as_ref(), &[old]).await;
        }
    }
    log::info!("User {} updated their profile", user.id);
    Ok(UserProfile::from(user))
}

/// Hard delete. Ads owned by the user are left in place.
pub async fn delete_user(state: &AppState, user_id: &str) -> Result<(), ApiError> {
    if !state.users.delete_user(user_id).await? {
        return Err(ApiError::not_found("User not found"));
    }
    log::info!("User {} deleted", user_id);
    Ok(())
}
