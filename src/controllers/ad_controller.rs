// src/controllers/ad_controller.rs

use actix_multipart::Multipart;
use actix_web::{delete, get, post, put, web, HttpResponse};
use serde_json::json;

use crate::error::ApiError;
use crate::extractors::{read_multipart, AuthUser};
use crate::services::listing_query::ListingFilter;
use crate::services::listing_service;
use crate::services::media_service::MAX_FILES;
use crate::state::AppState;

/// POST /createAd
/// Multipart form: the ad fields as text parts (structured ones JSON encoded)
/// and 1 to 10 images under `photos`.
#[post("/createAd")]
pub async fn create_ad(
    user: AuthUser,
    payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let (form, photos) = read_multipart(payload, "photos", MAX_FILES).await?;
    let ad = listing_service::create(&data, &user.id, &form, &photos).await?;
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Ad created successfully",
        "ad": ad
    })))
}

/// GET /getall
/// Public search. See [`ListingFilter`] for the accepted query parameters.
#[get("/getall")]
pub async fn get_all_ads(
    filter: web::Query<ListingFilter>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let ads = listing_service::search(&data, filter.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": ads.len(),
        "ads": ads
    })))
}

#[get("/my-ads")]
pub async fn my_ads(user: AuthUser, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let ads = listing_service::list_by_owner(&data, &user.id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": ads.len(),
        "ads": ads
    })))
}

#[get("/wishlist/mine")]
pub async fn my_wishlist(user: AuthUser, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let ads = listing_service::get_wishlist(&data, &user.id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": ads.len(),
        "ads": ads
    })))
}

#[get("/{id}")]
pub async fn get_ad(id: web::Path<String>, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let ad = listing_service::get(&data, &id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "ad": ad })))
}

/// PUT /{id}
/// Owner only. Supplied fields replace the stored ones; new photos are appended.
#[put("/{id}")]
pub async fn update_ad(
    id: web::Path<String>,
    user: AuthUser,
    payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let (form, photos) = read_multipart(payload, "photos", MAX_FILES).await?;
    let ad = listing_service::update(&data, &id, &user.id, &form, &photos).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Ad updated successfully",
        "ad": ad
    })))
}

#[delete("/{id}")]
pub async fn delete_ad(
    id: web::Path<String>,
    user: AuthUser,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    listing_service::delete(&data, &id, &user.id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Ad deleted successfully"
    })))
}

#[post("/{id}/wishlist")]
pub async fn add_to_wishlist(
    id: web::Path<String>,
    user: AuthUser,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    listing_service::add_to_wishlist(&data, &id, &user.id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Added to wishlist"
    })))
}

#[delete("/{id}/wishlist")]
pub async fn remove_from_wishlist(
    id: web::Path<String>,
    user: AuthUser,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    listing_service::remove_from_wishlist(&data, &id, &user.id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Removed from wishlist"
    })))
}
