// src/routes/ad_routes.rs

use actix_web::web;
use crate::controllers::ad_controller::{
    add_to_wishlist, create_ad, delete_ad, get_ad, get_all_ads, my_ads, my_wishlist,
    remove_from_wishlist, update_ad,
};

/// Registers the ad endpoints within the `/ad` scope.
///
/// Fixed paths come before `/{id}` so they are not taken for an ad id.
pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/ad")
            .service(create_ad)
            .service(get_all_ads)
            .service(my_ads)
            .service(my_wishlist)
            .service(add_to_wishlist)
            .service(remove_from_wishlist)
            .service(get_ad)
            .service(update_ad)
            .service(delete_ad)
    );
}
