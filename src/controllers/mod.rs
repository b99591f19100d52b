// src/controllers/mod.rs

pub mod ad_controller;
pub mod user_controller;
