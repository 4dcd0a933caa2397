use std::{path::Path, time::Duration};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::util::config::OllamaSettings;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("prompt must not be empty")]
    EmptyPrompt,
    #[error("request to inference service failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP error: {status}\n{body}")]
    Status { status: u16, body: String },
    #[error("could not read image: {0}")]
    Image(#[from] std::io::Error),
    #[error("response did not contain any text")]
    EmptyResponse,
}

/// Client for a local Ollama server (`/api/generate`, no streaming).
#[derive(Clone)]
pub struct InferenceClient {
    http: reqwest::Client,
    settings: OllamaSettings,
    system_prompt: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

#[derive(Serialize)]
struct PullRequest<'a> {
    model: &'a str,
    stream: bool,
}

impl InferenceClient {
    pub fn new(http: reqwest::Client, settings: OllamaSettings, system_prompt: String) -> Self {
        Self {
            http,
            settings,
            system_prompt,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    fn options(&self) -> GenerateOptions {
        GenerateOptions {
            temperature: self.settings.temperature,
            top_p: self.settings.top_p,
            top_k: self.settings.top_k,
            num_predict: self.settings.max_tokens,
        }
    }

    pub async fn generate_text(&self, prompt: &str) -> Result<String, InferenceError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(InferenceError::EmptyPrompt);
        }
        let body = GenerateRequest {
            model: &self.settings.chat_model,
            prompt,
            stream: false,
            system: Some(&self.system_prompt),
            images: Vec::new(),
            options: self.options(),
        };
        self.generate(&body).await
    }

    pub async fn analyze_image(
        &self,
        image_path: &Path,
        prompt: &str,
    ) -> Result<String, InferenceError> {
        let bytes = tokio::fs::read(image_path).await?;
        let body = GenerateRequest {
            model: &self.settings.vision_model,
            prompt: prompt.trim(),
            stream: false,
            system: None,
            images: vec![STANDARD.encode(bytes)],
            options: self.options(),
        };
        self.generate(&body).await
    }

    async fn generate(&self, body: &GenerateRequest<'_>) -> Result<String, InferenceError> {
        tracing::info!(model = body.model, images = body.images.len(), "inference request");
        let response = self
            .http
            .post(self.url("api/generate"))
            .timeout(Duration::from_secs(self.settings.timeout_secs))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read error body>".into());
            return Err(InferenceError::Status { status, body });
        }

        let payload: GenerateResponse = response.json().await?;
        payload
            .response
            .filter(|s| !s.trim().is_empty())
            .ok_or(InferenceError::EmptyResponse)
    }

    /// Downloads the vision model so the first `analyze` does not stall.
    pub async fn pull_vision_model(&self) -> Result<(), InferenceError> {
        let response = self
            .http
            .post(self.url("api/pull"))
            .json(&PullRequest {
                model: &self.settings.vision_model,
                stream: false,
            })
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Status { status, body });
        }
        Ok(())
    }
}

/// Splits `text` into chunks of at most `max_chars` characters, preferring line breaks.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > max_chars {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_request_shape() {
        let body = GenerateRequest {
            model: "llama3.2:latest",
            prompt: "hi",
            stream: false,
            system: Some("be nice"),
            images: Vec::new(),
            options: GenerateOptions {
                temperature: 0.5,
                top_p: 0.9,
                top_k: 40,
                num_predict: 16,
            },
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["model"], "llama3.2:latest");
        assert_eq!(v["stream"], false);
        assert_eq!(v["system"], "be nice");
        assert!(v.get("images").is_none());
        assert_eq!(v["options"]["num_predict"], 16);
    }

    #[test]
    fn url_joins_cleanly() {
        let client = InferenceClient::new(
            reqwest::Client::new(),
            OllamaSettings {
                base_url: "http://localhost:11434/".into(),
                ..Default::default()
            },
            String::new(),
        );
        assert_eq!(client.url("api/generate"), "http://localhost:11434/api/generate");
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected_locally() {
        let client = InferenceClient::new(reqwest::Client::new(), OllamaSettings::default(), String::new());
        assert!(matches!(
            client.generate_text("   ").await,
            Err(InferenceError::EmptyPrompt)
        ));
    }

    #[test]
    fn split_respects_limit() {
        let text = format!("{}\n{}\nshort", "a".repeat(15), "b".repeat(25));
        let chunks = split_message(&text, 10);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn split_keeps_short_text_whole() {
        assert_eq!(split_message("hello", 2000), vec!["hello"]);
        assert!(split_message("", 2000).is_empty());
    }
}
