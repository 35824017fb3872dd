use crate::{
    config::Config,
    error::{GenerationError, Result, TrendgenError},
    models::{GenerationRequest, Txt2ImgResponse},
    sdapi::{txt2img_url, ImageGenerator},
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const MAX_BODY_IN_ERROR: usize = 512;

#[derive(Clone)]
pub struct ImageClient {
    client: Client,
    endpoint: String,
}

impl ImageClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TrendgenError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: txt2img_url(base_url),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.base_url, config.timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ImageGenerator for ImageClient {
    async fn txt2img(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<Vec<String>, GenerationError> {
        log::debug!(
            "POST {} ({}x{}, {} steps, batch {})",
            self.endpoint,
            request.width,
            request.height,
            request.steps,
            request.batch_size
        );

        let response = self.client.post(&self.endpoint).json(request).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: truncate(&body, MAX_BODY_IN_ERROR),
            });
        }

        let parsed: Txt2ImgResponse = serde_json::from_str(&body).map_err(|e| {
            GenerationError::Malformed(format!(
                "{} (body: {})",
                e,
                truncate(&body, MAX_BODY_IN_ERROR)
            ))
        })?;

        if parsed.images.is_empty() {
            return Err(GenerationError::Malformed("No images generated".into()));
        }

        Ok(parsed.images)
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated, total_len={}]", &s[..end], s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_base_url() {
        let client = ImageClient::new("http://localhost:7860/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:7860/sdapi/v1/txt2img");

        let config = Config::new().with_base_url("http://gpu-box:7861///");
        let client = ImageClient::from_config(&config).unwrap();
        assert_eq!(client.endpoint(), config.txt2img_url());
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        let long = "é".repeat(10);
        let cut = truncate(&long, 5);
        assert!(cut.starts_with("éé..."));
        assert!(cut.ends_with("total_len=20]"));
    }
}
