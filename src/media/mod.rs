//! External image hosting.

use async_trait::async_trait;

pub mod cloudinary;

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("host rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("cannot derive a public id from {0}")]
    BadUrl(String),
}

/// An image received from a client, already size and type checked.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Stores the image and returns its public URL.
    async fn upload(&self, file: &UploadedFile) -> Result<String, MediaError>;

    /// Removes a previously uploaded image by its public URL.
    async fn destroy(&self, url: &str) -> Result<(), MediaError>;
}
