// src/routes/user_routes.rs

use actix_web::web;
use crate::controllers::user_controller::{
    delete_account, forgot_password, get_profile, login, resend_verification, reset_password,
    signup, update_profile, verify_email,
};

/// Registers the account endpoints within the `/user` scope.
pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/user")
            .service(signup)
            .service(verify_email)
            .service(resend_verification)
            .service(login)
            .service(forgot_password)
            .service(reset_password)
            .service(get_profile)
            .service(update_profile)
            .service(delete_account)
    );
}
