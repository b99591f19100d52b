// src/controllers/user_controller.rs

use actix_multipart::Multipart;
use actix_web::{delete, get, post, routes, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::extractors::{read_multipart, AuthUser};
use crate::services::user_service::{self, ProfileUpdate};
use crate::state::AppState;

/// Request body for the signup endpoint.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Body of the endpoints that only need an address.
#[derive(Debug, Deserialize)]
pub struct EmailForm {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordForm {
    pub new_password: String,
}

/// POST /signup
/// Creates an unverified account and mails the verification link.
#[post("/signup")]
pub async fn signup(
    form: web::Json<SignupForm>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    user_service::signup(&data, &form.name, &form.email, &form.password).await?;
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "User registered. Please check your email to verify your account."
    })))
}

/// GET /verify-email/{token}
#[get("/verify-email/{token}")]
pub async fn verify_email(
    token: web::Path<String>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    user_service::verify_email(&data, &token).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Email verified successfully"
    })))
}

/// POST /resend-verification
#[post("/resend-verification")]
pub async fn resend_verification(
    form: web::Json<EmailForm>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    user_service::resend_verification(&data, &form.email).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Verification email resent successfully"
    })))
}

/// POST /login
/// Returns a session token and the caller's id, name and email.
#[post("/login")]
pub async fn login(
    form: web::Json<LoginForm>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let (token, user) = user_service::login(&data, &form.email, &form.password).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "token": token,
        "user": user
    })))
}

/// POST /forgot-password
#[post("/forgot-password")]
pub async fn forgot_password(
    form: web::Json<EmailForm>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    user_service::forgot_password(&data, &form.email).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Password reset link sent to your email"
    })))
}

/// POST /reset-password/{token}
#[post("/reset-password/{token}")]
pub async fn reset_password(
    token: web::Path<String>,
    form: web::Json<ResetPasswordForm>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    user_service::reset_password(&data, &token, &form.new_password).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Password has been reset successfully"
    })))
}

#[get("/profile")]
pub async fn get_profile(user: AuthUser, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let profile = user_service::get_profile(&data, &user.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "user": profile })))
}

/// PUT /update, PUT /update-profile
/// Multipart form with optional `name`, `email`, `password` and one `avatar` image.
/// Blank text fields leave the stored value unchanged.
#[routes]
#[put("/update")]
#[put("/update-profile")]
pub async fn update_profile(
    user: AuthUser,
    payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let (mut form, files) = read_multipart(payload, "avatar", 1).await?;
    let mut take = |key: &str| form.remove(key).filter(|v| !v.trim().is_empty());
    let update = ProfileUpdate {
        name: take("name"),
        email: take("email"),
        password: take("password"),
        avatar: files.into_iter().next(),
    };

    let profile = user_service::update_profile(&data, &user.id, update).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Profile updated successfully",
        "user": profile
    })))
}

#[delete("/delete")]
pub async fn delete_account(user: AuthUser, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    user_service::delete_user(&data, &user.id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "User deleted successfully"
    })))
}
