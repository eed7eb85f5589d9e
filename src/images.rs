//! Re-hosting article images on Cloudflare Images.
//!
//! Each source image is downloaded and uploaded again; the article then
//! references the delivery URL instead of the original blog's CDN. Failed
//! images are dropped, never fatal.

use crate::scrapers::USER_AGENT;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, instrument, warn};

/// Anything that takes an image URL and returns a URL it is now served from.
pub trait ImageHost {
    async fn upload(&self, image_url: &str) -> Result<String, Box<dyn Error>>;
}

impl<T: ImageHost> ImageHost for &T {
    async fn upload(&self, image_url: &str) -> Result<String, Box<dyn Error>> {
        (**self).upload(image_url).await
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    success: bool,
    result: Option<UploadResult>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct UploadResult {
    id: String,
}

/// Cloudflare Images client.
pub struct CloudflareImages {
    download: reqwest::Client,
    api: reqwest::Client,
    api_token: String,
    account_id: String,
    account_hash: String,
}

impl fmt::Debug for CloudflareImages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudflareImages")
            .field("account_id", &self.account_id)
            .field("account_hash", &self.account_hash)
            .finish_non_exhaustive()
    }
}

impl CloudflareImages {
    pub fn new(
        api_token: impl Into<String>,
        account_id: impl Into<String>,
        account_hash: impl Into<String>,
    ) -> Result<Self, Box<dyn Error>> {
        let download = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()?;
        let api = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            download,
            api,
            api_token: api_token.into(),
            account_id: account_id.into(),
            account_hash: account_hash.into(),
        })
    }

    fn upload_endpoint(&self) -> String {
        format!(
            "https://api.cloudflare.com/client/v4/accounts/{}/images/v1",
            self.account_id
        )
    }

    /// Public delivery URL of an uploaded image.
    pub fn delivery_url(&self, image_id: &str) -> String {
        format!("https://imagedelivery.net/{}/{}/public", self.account_hash, image_id)
    }
}

impl ImageHost for CloudflareImages {
    #[instrument(level = "info", skip(self))]
    async fn upload(&self, image_url: &str) -> Result<String, Box<dyn Error>> {
        let bytes = self
            .download
            .get(image_url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let part = Part::bytes(bytes.to_vec())
            .file_name("image.jpg")
            .mime_str("image/jpeg")?;
        let form = Form::new().part("file", part);

        let response: UploadResponse = self
            .api
            .post(self.upload_endpoint())
            .bearer_auth(&self.api_token)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match response.result {
            Some(result) if response.success => {
                let url = self.delivery_url(&result.id);
                info!(%url, "Image uploaded");
                Ok(url)
            }
            _ => Err(format!("upload rejected: {:?}", response.errors).into()),
        }
    }
}

/// Upload up to `max` images in order, pausing between uploads.
///
/// Returns the hosted URLs of the images that made it, in source order.
pub async fn upload_images<H: ImageHost>(
    host: &H,
    images: &[String],
    max: usize,
    pause: Duration,
) -> Vec<String> {
    let mut hosted = Vec::new();
    for (i, image_url) in images.iter().take(max).enumerate() {
        if i > 0 && !pause.is_zero() {
            sleep(pause).await;
        }
        match host.upload(image_url).await {
            Ok(url) => hosted.push(url),
            Err(e) => warn!(%image_url, error = %e, "Image upload failed; skipping image"),
        }
    }
    info!(
        uploaded = hosted.len(),
        available = images.len(),
        "Finished image uploads"
    );
    hosted
}
