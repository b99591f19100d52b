// src/extractors.rs

//! Request extractors shared by the controllers.

use actix_multipart::{Multipart, MultipartError};
use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use futures::TryStreamExt;

use crate::error::ApiError;
use crate::media::UploadedFile;
use crate::services::auth_service;
use crate::services::listing_service::AdForm;
use crate::services::media_service;
use crate::state::AppState;

/// Longest accepted text part of a multipart body.
const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

/// The caller, identified by a valid `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, ApiError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| ApiError::Internal("application state is not configured".into()))?;

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|hv| hv.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthenticated("Not authorized, no token".into()))?;

    let claims = auth_service::verify_jwt_token(token, &state.config.secret_key).map_err(|e| {
        log::debug!("Rejected session token: {}", e);
        ApiError::Unauthenticated("Not authorized, token failed".into())
    })?;
    Ok(AuthUser { id: claims.sub })
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn bad_multipart(e: MultipartError) -> ApiError {
    ApiError::validation(format!("Invalid multipart body: {}", e))
}

/// Reads a multipart body into its text fields and the images sent under
/// `file_field`.
///
/// Image type, count and size are checked as parts arrive, so an oversized
/// upload is refused without buffering it whole.
pub async fn read_multipart(
    mut payload: Multipart,
    file_field: &str,
    max_files: usize,
) -> Result<(AdForm, Vec<UploadedFile>), ApiError> {
    let mut form = AdForm::new();
    let mut files = Vec::new();

    while let Some(mut field) = payload.try_next().await.map_err(bad_multipart)? {
        let disposition = field.content_disposition().clone();
        let name = disposition.get_name().unwrap_or_default().to_string();

        match disposition.get_filename() {
            // An empty file input still sends a part, with an empty filename.
            Some("") => {
                while field.try_next().await.map_err(bad_multipart)?.is_some() {}
            }
            Some(filename) => {
                if name != file_field {
                    return Err(ApiError::validation(format!(
                        "Unexpected file field '{}', expected '{}'",
                        name, file_field
                    )));
                }
                media_service::check_count(files.len() + 1, max_files)?;
                let content_type = field.content_type().map(|m| m.to_string());
                media_service::check_image(filename, content_type.as_deref())?;

                let mut bytes = Vec::new();
                while let Some(chunk) = field.try_next().await.map_err(bad_multipart)? {
                    bytes.extend_from_slice(&chunk);
                    media_service::check_size(filename, bytes.len())?;
                }
                files.push(UploadedFile {
                    filename: filename.to_string(),
                    content_type: content_type.unwrap_or_default(),
                    bytes,
                });
            }
            None => {
                let mut bytes = Vec::new();
                while let Some(chunk) = field.try_next().await.map_err(bad_multipart)? {
                    bytes.extend_from_slice(&chunk);
                    if bytes.len() > MAX_TEXT_FIELD_BYTES {
                        return Err(ApiError::validation(format!("Field '{}' is too long", name)));
                    }
                }
                let value = String::from_utf8(bytes)
                    .map_err(|_| ApiError::validation(format!("Field '{}' is not valid UTF-8", name)))?;
                form.insert(name, value);
            }
        }
    }
    Ok((form, files))
}
