use std::time::Duration;

use base64::Engine;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::Config;
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    images: Vec<String>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_ctx: u32,
    num_predict: u32,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    thinking: String,
}

/// Raw model reply, before parsing.
pub struct ModelReply {
    pub response: String,
    pub thinking: String,
}

/// Talks to a single Ollama-style `/api/generate` endpoint.
///
/// Deliberately not a multi-provider abstraction: the specification names
/// exactly one collaborator contract, so there is nothing for a provider
/// trait to select between.
pub struct ModelClient {
    http: reqwest::Client,
    base_url: String,
    model_name: String,
    timeout: Duration,
}

impl ModelClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.model_base_url.trim_end_matches('/').to_string(),
            model_name: config.model_name.clone(),
            timeout: Duration::from_secs(config.model_timeout_secs),
        }
    }

    /// Resize/re-encode an image on disk for the model and return it as
    /// base64. See the external-interfaces pre-send transform.
    pub fn prepare_image(path: &std::path::Path, max_dim: u32, max_bytes: u64) -> CoreResult<String> {
        let bytes = std::fs::read(path).map_err(|e| CoreError::Image(e.to_string()))?;
        let img = image::load_from_memory(&bytes).map_err(|e| CoreError::Image(e.to_string()))?;

        let is_jpeg = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"));

        let needs_resize = img.width() > max_dim || img.height() > max_dim;
        let force_jpeg80 = bytes.len() as u64 > max_bytes;

        let resized = if needs_resize {
            let scale = (max_dim as f32 / img.width().max(1) as f32)
                .min(max_dim as f32 / img.height().max(1) as f32);
            let new_w = ((img.width() as f32 * scale).round() as u32).max(1);
            let new_h = ((img.height() as f32 * scale).round() as u32).max(1);
            img.resize(new_w, new_h, FilterType::Lanczos3)
        } else {
            img
        };

        let mut out = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut out);
        if force_jpeg80 {
            let mut encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, 80);
            encoder
                .encode_image(&resized)
                .map_err(|e| CoreError::Image(e.to_string()))?;
        } else if is_jpeg {
            let mut encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, 85);
            encoder
                .encode_image(&resized)
                .map_err(|e| CoreError::Image(e.to_string()))?;
        } else {
            resized
                .write_to(&mut cursor, image::ImageFormat::Png)
                .map_err(|e| CoreError::Image(e.to_string()))?;
        }

        Ok(base64::engine::general_purpose::STANDARD.encode(&out))
    }

    /// Send one image + prompt to the model. No retries — the orchestrator
    /// records a failed record and moves on.
    pub async fn ask(&self, image_b64: String, prompt: &str) -> CoreResult<ModelReply> {
        let body = GenerateRequest {
            model: &self.model_name,
            prompt,
            images: vec![image_b64],
            stream: false,
            options: GenerateOptions {
                temperature: 0.3,
                num_ctx: 4096,
                num_predict: 4000,
            },
        };

        let resp = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .timeout(self.timeout)
            .json(&json!(body))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CoreError::ModelTimeout
                } else {
                    CoreError::Network(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            return Err(CoreError::Model(format!(
                "model endpoint returned status {}",
                resp.status()
            )));
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| CoreError::Model(format!("invalid model response body: {e}")))?;

        if parsed.response.trim().is_empty() && parsed.thinking.trim().is_empty() {
            return Err(CoreError::Model("empty model response".to_string()));
        }

        Ok(ModelReply {
            response: parsed.response,
            thinking: parsed.thinking,
        })
    }

    /// Liveness check against the endpoint's base URL.
    pub async fn check(&self) -> CoreResult<()> {
        self.http
            .get(&self.base_url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| CoreError::Network(e.to_string()))?;
        Ok(())
    }
}
