// src/services/mod.rs

pub mod auth_service;
pub mod listing_query;
pub mod listing_service;
pub mod mail_service;
pub mod media_service;
pub mod user_service;
