use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::json;

use super::AiService;
use crate::image_data::ImageData;

pub struct GeminiService {
    api_key: String,
    model: String,
    client: Client,
}

impl GeminiService {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl AiService for GeminiService {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn complete(&self, image: &ImageData, prompt: &str) -> Result<String> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );

        let body = json!({
            "contents": [
                {
                    "parts": [
                        { "text": prompt },
                        {
                            "inline_data": {
                                "mime_type": image.mime_type(),
                                "data": image.base64()
                            }
                        }
                    ]
                }
            ],
            "generationConfig": {
                "maxOutputTokens": 400
            }
        });

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = resp.status();
        let text = resp.text().await.context("Failed to read Gemini response")?;

        if !status.is_success() {
            anyhow::bail!("Gemini API error ({}): {}", status, text);
        }

        let json: serde_json::Value =
            serde_json::from_str(&text).context("Failed to parse Gemini response JSON")?;

        answer_text(&json)
    }
}

/// Join the text parts of the first candidate.
fn answer_text(json: &serde_json::Value) -> Result<String> {
    let parts = json["candidates"][0]["content"]["parts"]
        .as_array()
        .context("No content in Gemini response")?;
    let content: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    let content = content.trim();
    if content.is_empty() {
        anyhow::bail!("Gemini returned an empty answer");
    }
    Ok(content.to_string())
}
