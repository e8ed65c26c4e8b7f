use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::json;

use super::AiService;
use crate::image_data::ImageData;

pub struct CloudflareService {
    account_id: String,
    api_token: String,
    model: String,
    client: Client,
}

impl CloudflareService {
    pub fn new(account_id: String, api_token: String, model: String) -> Self {
        Self {
            account_id,
            api_token,
            model,
            client: Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl AiService for CloudflareService {
    fn name(&self) -> &str {
        "Cloudflare"
    }

    async fn complete(&self, image: &ImageData, prompt: &str) -> Result<String> {
        let url = format!(
            "https://api.cloudflare.com/client/v4/accounts/{}/ai/run/{}",
            self.account_id, self.model
        );

        let body = json!({
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ],
            "image": image.base64(),
            "max_tokens": 400
        });

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .json(&body)
            .send()
            .await
            .context("Cloudflare request failed")?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .context("Failed to read Cloudflare response")?;

        if !status.is_success() {
            anyhow::bail!("Cloudflare API error ({}): {}", status, text);
        }

        let json: serde_json::Value =
            serde_json::from_str(&text).context("Failed to parse Cloudflare response JSON")?;

        answer_text(&json)
    }
}

/// LLaVA answers under `description`, chat models under `response`.
fn answer_text(json: &serde_json::Value) -> Result<String> {
    let content = json["result"]["response"]
        .as_str()
        .or_else(|| json["result"]["description"].as_str())
        .context("No content in Cloudflare response")?
        .trim();
    if content.is_empty() {
        anyhow::bail!("Cloudflare returned an empty answer");
    }
    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_text_accepts_response_or_description() {
        let chat = json!({ "result": { "response": "A lighthouse" }, "success": true });
        assert_eq!(answer_text(&chat).unwrap(), "A lighthouse");

        let llava = json!({ "result": { "description": " A lighthouse on a cliff. " } });
        assert_eq!(answer_text(&llava).unwrap(), "A lighthouse on a cliff.");
    }

    #[test]
    fn answer_text_rejects_blank_and_missing_result() {
        let blank = json!({ "result": { "response": "" } });
        assert!(answer_text(&blank).unwrap_err().to_string().contains("empty answer"));
        assert!(answer_text(&json!({ "errors": [] })).is_err());
    }
}
