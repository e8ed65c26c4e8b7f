use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::json;

use super::AiService;
use crate::image_data::ImageData;

pub struct OpenAiService {
    api_key: String,
    model: String,
    client: Client,
}

impl OpenAiService {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl AiService for OpenAiService {
    fn name(&self) -> &str {
        "OpenAI"
    }

    async fn complete(&self, image: &ImageData, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are an image analysis assistant. Answer in exactly the format requested. No markdown, no code blocks, no extra text."
                },
                {
                    "role": "user",
                    "content": [
                        {
                            "type": "text",
                            "text": prompt
                        },
                        {
                            "type": "image_url",
                            "image_url": {
                                "url": image.data_url(),
                                "detail": "low"
                            }
                        }
                    ]
                }
            ],
            "max_tokens": 400
        });

        let resp = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .context("OpenAI request failed")?;

        let status = resp.status();
        let text = resp.text().await.context("Failed to read OpenAI response")?;

        if !status.is_success() {
            anyhow::bail!("OpenAI API error ({}): {}", status, text);
        }

        let json: serde_json::Value =
            serde_json::from_str(&text).context("Failed to parse OpenAI response JSON")?;

        answer_text(&json)
    }
}

/// Pull the assistant message out of a chat completions response.
fn answer_text(json: &serde_json::Value) -> Result<String> {
    let content = json["choices"][0]["message"]["content"]
        .as_str()
        .context("No content in OpenAI response")?
        .trim();
    if content.is_empty() {
        anyhow::bail!("OpenAI returned an empty answer");
    }
    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_text_reads_first_choice() {
        let json = json!({
            "choices": [{ "message": { "role": "assistant", "content": "  Harbor at Dusk \n" } }]
        });
        assert_eq!(answer_text(&json).unwrap(), "Harbor at Dusk");
    }

    #[test]
    fn answer_text_rejects_blank_and_missing_content() {
        let blank = json!({ "choices": [{ "message": { "content": "   " } }] });
        assert!(answer_text(&blank).unwrap_err().to_string().contains("empty answer"));

        let refused = json!({ "choices": [{ "message": { "content": null, "refusal": "no" } }] });
        assert!(answer_text(&refused).is_err());
    }
}
