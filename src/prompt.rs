use crate::{
    config::GenerationConfig,
    models::{GenerationRequest, InputRecord},
};

const MISSING_VOLUME: &str = "N/A";

/// Maps input rows to txt2img payloads. Callers filter out rows without a trend.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    config: GenerationConfig,
}

impl RequestBuilder {
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, record: &InputRecord) -> GenerationRequest {
        GenerationRequest {
            prompt: self.prompt_for(record),
            negative_prompt: self.config.negative_prompt.clone(),
            steps: self.config.steps,
            width: self.config.width,
            height: self.config.height,
            cfg_scale: self.config.cfg_scale,
            sampler_name: self.config.sampler.clone(),
            batch_size: self.config.batch_size,
        }
    }

    fn prompt_for(&self, record: &InputRecord) -> String {
        let volume = match record.search_volume() {
            "" => MISSING_VOLUME,
            v => v,
        };

        // Placeholders are only expanded in template text, never in row values.
        let mut prompt = self
            .config
            .prompt_template
            .split("{trend}")
            .map(|piece| piece.replace("{volume}", volume))
            .collect::<Vec<_>>()
            .join(record.trend());

        for qualifier in &self.config.style_qualifiers {
            prompt.push_str(", ");
            prompt.push_str(qualifier);
        }
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(trend: &str, volume: &str) -> InputRecord {
        InputRecord::from_pairs(1, [("Trends", trend), ("Search volume", volume)])
    }

    #[test]
    fn test_prompt_uses_template_and_qualifiers() {
        let builder = RequestBuilder::new(GenerationConfig::default());
        let request = builder.build(&record("Cats", "120000"));
        assert_eq!(
            request.prompt,
            "Trending NFT artwork: Cats, 120000 searches, vibrant colors, highly detailed, digital art"
        );
        assert_eq!(request.negative_prompt, "blurry, low quality, text, watermark");
        assert_eq!(request.sampler_name, "Euler a");
        assert_eq!((request.width, request.height, request.steps), (768, 768, 28));
        assert_eq!(request.batch_size, 1);
    }

    #[test]
    fn test_missing_volume_renders_placeholder() {
        let builder = RequestBuilder::new(
            GenerationConfig::new()
                .with_prompt_template("{trend} ({volume} searches)")
                .with_style_qualifiers(Vec::<String>::new()),
        );
        let request = builder.build(&InputRecord::from_pairs(1, [("Trends", "Dogs")]));
        assert_eq!(request.prompt, "Dogs (N/A searches)");
    }

    #[test]
    fn test_placeholders_in_row_values_are_kept_verbatim() {
        let builder = RequestBuilder::new(GenerationConfig::default());

        let request = builder.build(&record("{volume} memes", "42"));
        assert_eq!(
            request.prompt,
            "Trending NFT artwork: {volume} memes, 42 searches, vibrant colors, highly detailed, digital art"
        );

        let request = builder.build(&record("Cats", "{trend}"));
        assert!(request.prompt.starts_with("Trending NFT artwork: Cats, {trend} searches"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = RequestBuilder::new(GenerationConfig::default());
        let first = serde_json::to_vec(&builder.build(&record("AI/ML 2024!", "5k"))).unwrap();
        let second = serde_json::to_vec(&builder.build(&record("AI/ML 2024!", "5k"))).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_payload_field_names() {
        let builder = RequestBuilder::new(GenerationConfig::default().with_cfg_scale(7.5));
        let value = serde_json::to_value(builder.build(&record("Cats", "1"))).unwrap();
        for key in [
            "prompt",
            "negative_prompt",
            "steps",
            "width",
            "height",
            "cfg_scale",
            "sampler_name",
            "batch_size",
        ] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(value["cfg_scale"], serde_json::json!(7.5));
    }
}
