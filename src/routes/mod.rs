use actix_web::web;

use crate::error::ApiError;

mod ad_routes; // Module for ad endpoints
mod user_routes; // Module for user endpoints

pub fn init(cfg: &mut web::ServiceConfig) {
    // Malformed bodies and query strings get the same JSON error shape as everything else.
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::validation(err.to_string()).into()),
    )
    .service(
        web::scope("/api")
            .configure(user_routes::init)
            .configure(ad_routes::init),
    );
}
