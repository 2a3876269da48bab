use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::{ImageUpload, MediaError, MediaStore, UPLOAD_FOLDER};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Signed uploads to the Cloudinary REST API.
pub struct CloudinaryStore {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

impl CloudinaryStore {
    pub fn new(
        cloud_name: String,
        api_key: String,
        api_secret: String,
    ) -> Result<Self, MediaError> {
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()?,
            cloud_name,
            api_key,
            api_secret,
        })
    }

    fn upload_url(&self) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            self.cloud_name
        )
    }

    /// Request signature over the signed parameters, sorted by name, with
    /// the secret appended.
    fn sign(&self, timestamp: i64) -> String {
        let to_sign = format!(
            "folder={}&timestamp={}{}",
            UPLOAD_FOLDER, timestamp, self.api_secret
        );
        let digest = Sha256::digest(to_sign.as_bytes());
        hex_encode(&digest)
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[async_trait]
impl MediaStore for CloudinaryStore {
    #[tracing::instrument(skip_all, name = "CloudinaryStore::upload_image", err)]
    async fn upload_image(&self, image: ImageUpload) -> Result<String, MediaError> {
        if self.cloud_name.is_empty() || self.api_key.is_empty() || self.api_secret.is_empty() {
            return Err(MediaError::Credentials);
        }

        let timestamp = Utc::now().timestamp();
        let signature = self.sign(timestamp);

        let mut file_part = Part::bytes(image.bytes.to_vec()).file_name(image.filename);
        if let Some(content_type) = &image.content_type {
            file_part = file_part
                .mime_str(content_type)
                .map_err(|e| MediaError::Refused(format!("invalid content type: {e}")))?;
        }

        let form = Form::new()
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp.to_string())
            .text("folder", UPLOAD_FOLDER)
            .text("signature", signature)
            .text("signature_algorithm", "sha256")
            .part("file", file_part);

        let response = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MediaError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| MediaError::MalformedResponse(e.to_string()))?;

        parsed
            .secure_url
            .ok_or_else(|| MediaError::MalformedResponse("missing secure_url".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_deterministic_hex() {
        let store =
            CloudinaryStore::new("demo".into(), "key".into(), "secret".into()).unwrap();
        let a = store.sign(1_700_000_000);
        let b = store.sign(1_700_000_000);

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        // A different timestamp must change the signature.
        assert_ne!(a, store.sign(1_700_000_001));
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_any_request() {
        let store = CloudinaryStore::new(String::new(), String::new(), String::new()).unwrap();
        let err = store
            .upload_image(ImageUpload {
                filename: "x.png".into(),
                content_type: None,
                bytes: bytes::Bytes::from_static(b"png"),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Credentials));
    }
}
