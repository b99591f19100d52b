// src/media/cloudinary.rs

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::config::CloudinaryConfig;
use crate::media::{MediaError, MediaStore, UploadedFile};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Signed uploads to Cloudinary's image API.
pub struct CloudinaryStore {
    client: Client,
    config: CloudinaryConfig,
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/{}",
            self.config.cloud_name, action
        )
    }

    /// `params` must already be sorted by key, joined as `k=v&k=v`.
    fn sign(&self, params: &str) -> String {
        sign(params, &self.config.api_secret)
    }
}

fn sign(params: &str, api_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(params.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Public id of an asset: the last path segment without its extension.
pub fn public_id_from_url(url: &str) -> Option<&str> {
    let last = url.rsplit('/').next()?;
    let id = last.split('.').next()?;
    (!id.is_empty()).then_some(id)
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, MediaError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
    Err(MediaError::Rejected { status, body })
}

#[async_trait]
impl MediaStore for CloudinaryStore {
    async fn upload(&self, file: &UploadedFile) -> Result<String, MediaError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&format!("timestamp={}", timestamp));

        let part = Part::bytes(file.bytes.clone())
            .file_name(file.filename.clone())
            .mime_str(&file.content_type)?;
        let form = Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;
        let uploaded: UploadResponse = check(response).await?.json().await?;
        Ok(uploaded.secure_url)
    }

    async fn destroy(&self, url: &str) -> Result<(), MediaError> {
        let public_id = public_id_from_url(url).ok_or_else(|| MediaError::BadUrl(url.to_string()))?;
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&format!("public_id={}&timestamp={}", public_id, timestamp));

        let params = [
            ("public_id", public_id.to_string()),
            ("api_key", self.config.api_key.clone()),
            ("timestamp", timestamp),
            ("signature", signature),
            ("signature_algorithm", "sha256".to_string()),
        ];
        let response = self
            .client
            .post(self.endpoint("destroy"))
            .form(&params)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}
