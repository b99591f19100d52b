// src/state.rs

use std::sync::Arc;

use crate::config::Config;
use crate::media::MediaStore;
use crate::services::mail_service::Mailer;
use crate::store::{ListingStore, UserStore};

/// Shared handles every handler receives. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub listings: Arc<dyn ListingStore>,
    pub mailer: Arc<dyn Mailer>,
    pub media: Arc<dyn MediaStore>,
    pub config: Arc<Config>,
}
