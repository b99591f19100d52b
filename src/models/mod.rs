pub mod listing;
pub mod timestamp;
pub mod user;
