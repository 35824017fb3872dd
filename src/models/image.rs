use serde::{Deserialize, Serialize};

/// Body of `POST /sdapi/v1/txt2img`. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub steps: u32,
    pub width: u32,
    pub height: u32,
    pub cfg_scale: f64,
    pub sampler_name: String,
    pub batch_size: u32,
}

/// The subset of the txt2img response we rely on.
#[derive(Debug, Deserialize)]
pub struct Txt2ImgResponse {
    pub images: Vec<String>,
}
