//! Cover image download and decoding.

use crate::error::RenderError;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::DynamicImage;
use std::time::Duration;

/// Largest cover image accepted
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// Loads the bytes behind a cover image URL
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch `url`
    ///
    /// # Errors
    ///
    /// Returns `RenderError::ImageFetch` if the image cannot be retrieved.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, RenderError>;
}

/// [`ImageFetcher`] over HTTP(S), with `data:` URLs decoded locally
#[derive(Debug, Clone, Default)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    /// Fetcher giving up after `timeout`
    ///
    /// # Errors
    ///
    /// Returns `RenderError::ImageFetch` if the HTTP client cannot be built.
    pub fn with_timeout(timeout: Duration) -> Result<Self, RenderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RenderError::ImageFetch(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, RenderError> {
        if url.starts_with("data:") {
            return decode_data_url(url);
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| RenderError::ImageFetch(e.to_string()))?;

        if response
            .content_length()
            .is_some_and(|length| length > MAX_IMAGE_BYTES as u64)
        {
            return Err(RenderError::ImageFetch("image too large".to_string()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RenderError::ImageFetch(e.to_string()))?;
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(RenderError::ImageFetch("image too large".to_string()));
        }

        Ok(bytes.to_vec())
    }
}

/// Payload of a `data:<mime>;base64,<payload>` URL
///
/// # Errors
///
/// Returns `RenderError::ImageFetch` for malformed or non-base64 data URLs.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, RenderError> {
    let Some((meta, payload)) = url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
    else {
        return Err(RenderError::ImageFetch("malformed data URL".to_string()));
    };

    if !meta.ends_with(";base64") {
        return Err(RenderError::ImageFetch("data URL is not base64".to_string()));
    }

    STANDARD
        .decode(payload.trim())
        .map_err(|e| RenderError::ImageFetch(e.to_string()))
}

/// Decode PNG or JPEG bytes
///
/// # Errors
///
/// Returns `RenderError::ImageDecode` for unsupported or corrupt data.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, RenderError> {
    image::load_from_memory(bytes).map_err(|e| RenderError::ImageDecode(e.to_string()))
}
