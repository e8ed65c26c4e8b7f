use anyhow::Result;

use super::{AiService, CloudflareService, GeminiService, OpenAiService};
use crate::config::Config;
use crate::image_data::ImageData;

/// An ordered failover chain of AI services.
///
/// Each service is tried once, in order. The first successful answer wins;
/// if every service fails the errors are reported together.
pub struct ServiceChain {
    services: Vec<Box<dyn AiService>>,
}

impl ServiceChain {
    pub fn new(services: Vec<Box<dyn AiService>>) -> Self {
        Self { services }
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Display names of the services, in failover order.
    pub fn names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name()).collect()
    }
}

#[async_trait::async_trait]
impl AiService for ServiceChain {
    fn name(&self) -> &str {
        "Service chain"
    }

    async fn complete(&self, image: &ImageData, prompt: &str) -> Result<String> {
        if self.services.is_empty() {
            anyhow::bail!("No AI services configured");
        }

        let mut errors = Vec::new();
        for service in &self.services {
            log::debug!("Trying {}...", service.name());

            match service.complete(image, prompt).await {
                Ok(text) if !text.trim().is_empty() => {
                    log::debug!("{} succeeded", service.name());
                    return Ok(text);
                }
                Ok(_) => {
                    errors.push(format!("{}: returned empty result", service.name()));
                    log::warn!("{} returned an empty result", service.name());
                }
                Err(e) => {
                    errors.push(format!("{}: {e}", service.name()));
                    log::warn!("{} failed: {e}", service.name());
                }
            }
        }

        anyhow::bail!("All AI services failed: {}", errors.join("; "))
    }
}

/// Build the AI service failover chain from configuration.
///
/// Services are added in the order of [`Config::enabled_services`], skipping
/// ones missing credentials (with a warning).
///
/// # Example
///
/// ```rust,no_run
/// use ai_image_queries::config::Config;
/// use ai_image_queries::ai::build_service_chain;
///
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
/// let services = build_service_chain(&config);
/// println!("Configured {} AI services", services.len());
/// ```
pub fn build_service_chain(config: &Config) -> ServiceChain {
    let mut services: Vec<Box<dyn AiService>> = Vec::new();

    for name in config.enabled_services() {
        match name.as_str() {
            "openai" => {
                if config.ai_services.openai.api_key.is_empty() {
                    log::warn!("OpenAI enabled but no API key configured");
                    continue;
                }
                services.push(Box::new(OpenAiService::new(
                    config.ai_services.openai.api_key.clone(),
                    config.ai_services.openai.model.clone(),
                )));
            }
            "gemini" => {
                if config.ai_services.gemini.api_key.is_empty() {
                    log::warn!("Gemini enabled but no API key configured");
                    continue;
                }
                services.push(Box::new(GeminiService::new(
                    config.ai_services.gemini.api_key.clone(),
                    config.ai_services.gemini.model.clone(),
                )));
            }
            "cloudflare" => {
                if config.ai_services.cloudflare.account_id.is_empty()
                    || config.ai_services.cloudflare.api_token.is_empty()
                {
                    log::warn!("Cloudflare enabled but account ID or API token not configured");
                    continue;
                }
                services.push(Box::new(CloudflareService::new(
                    config.ai_services.cloudflare.account_id.clone(),
                    config.ai_services.cloudflare.api_token.clone(),
                    config.ai_services.cloudflare.model.clone(),
                )));
            }
            _ => {}
        }
    }

    ServiceChain::new(services)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::ScriptedService;

    fn image() -> ImageData {
        ImageData::new("aGVsbG8=".into(), "image/jpeg".into())
    }

    #[tokio::test]
    async fn first_success_wins() {
        let chain = ServiceChain::new(vec![
            Box::new(ScriptedService::new("A").respond("p", "from A")),
            Box::new(ScriptedService::new("B").respond("p", "from B")),
        ]);
        assert_eq!(chain.complete(&image(), "p").await.unwrap(), "from A");
    }

    #[tokio::test]
    async fn fails_over_on_error_and_empty_answer() {
        let chain = ServiceChain::new(vec![
            Box::new(ScriptedService::new("A").fail("p", "rate limited")),
            Box::new(ScriptedService::new("B").respond("p", "   ")),
            Box::new(ScriptedService::new("C").respond("p", "from C")),
        ]);
        assert_eq!(chain.complete(&image(), "p").await.unwrap(), "from C");
    }

    #[tokio::test]
    async fn all_failures_are_joined() {
        let chain = ServiceChain::new(vec![
            Box::new(ScriptedService::new("A").fail("p", "timeout")),
            Box::new(ScriptedService::new("B").fail("p", "bad key")),
        ]);
        let err = chain.complete(&image(), "p").await.unwrap_err().to_string();
        assert!(err.contains("A: timeout"));
        assert!(err.contains("B: bad key"));
    }

    #[tokio::test]
    async fn empty_chain_fails() {
        let chain = ServiceChain::new(Vec::new());
        assert!(chain.is_empty());
        assert!(chain.complete(&image(), "p").await.is_err());
    }

    #[test]
    fn build_skips_services_without_credentials() {
        let mut config = Config::default();
        config.ai_services.openai.enabled = true;
        config.ai_services.openai.api_key = String::new();
        config.ai_services.gemini.enabled = true;
        config.ai_services.gemini.api_key = "key".into();
        config.ai_services.cloudflare.enabled = true;

        let chain = build_service_chain(&config);
        assert_eq!(chain.names(), vec!["Gemini"]);
    }

    #[test]
    fn build_follows_service_order() {
        let mut config = Config::default();
        config.ai_services.openai.api_key = "sk".into();
        config.ai_services.gemini.enabled = true;
        config.ai_services.gemini.api_key = "key".into();
        config.service_order = vec!["gemini".into(), "openai".into(), "bogus".into()];

        let chain = build_service_chain(&config);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.names(), vec!["Gemini", "OpenAI"]);
    }
}
