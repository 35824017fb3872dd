pub mod image_client;

use crate::{error::GenerationError, models::GenerationRequest};
use async_trait::async_trait;

pub use image_client::ImageClient;

const TXT2IMG_PATH: &str = "/sdapi/v1/txt2img";

/// Joins a server base URL and the txt2img route, tolerating a trailing slash.
pub fn txt2img_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), TXT2IMG_PATH)
}

/// A text-to-image backend. Returns the raw (base64, possibly data-URI
/// prefixed) payloads in the order the backend produced them.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn txt2img(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<Vec<String>, GenerationError>;
}
