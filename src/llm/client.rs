use super::types::*;
use crate::{Error, Result, config::LlmConfig};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate_content(
        &self,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse>;
}

pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            model: config.model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate_content(
        &self,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        debug!(
            "Calling {} with {} content parts",
            self.model,
            request.parts().count()
        );

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Model API returned {}", status);
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body: GenerateContentResponse = response.json().await?;

        if let Some(ref usage) = body.usage_metadata {
            debug!(
                "Model usage: prompt={} candidates={} total={}",
                usage.prompt_token_count, usage.candidates_token_count, usage.total_token_count
            );
        }

        Ok(body)
    }
}
