//! Snowflake Cortex Provider
//!
//! LLM provider using the Cortex inference REST endpoint
//! (`/api/v2/cortex/inference:complete`) in non-streaming mode.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use super::{
    LlmProvider, LlmResponse, ProviderConfig, ResponseMetadata, ResponseTiming, TokenUsage,
};
use crate::snowflake::SnowflakeClient;
use crate::types::{ChefError, ErrorCategory, ErrorClassifier, LlmError, Result};

const COMPLETE_PATH: &str = "/api/v2/cortex/inference:complete";
const PROVIDER: &str = "cortex";

/// Cortex inference provider bound to one account
#[derive(Debug)]
pub struct CortexProvider {
    client: SnowflakeClient,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

impl CortexProvider {
    pub fn new(config: ProviderConfig, client: SnowflakeClient) -> Self {
        Self {
            client,
            model: config.model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn build_request<'a>(&'a self, prompt: &'a str) -> CompleteRequest<'a> {
        CompleteRequest {
            model: &self.model,
            messages: vec![CompleteMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        }
    }
}

#[async_trait]
impl LlmProvider for CortexProvider {
    async fn generate(&self, prompt: &str) -> Result<LlmResponse> {
        info!("Generating with Cortex (model: {})", self.model);

        let start_time = Instant::now();
        let request = self.build_request(prompt);

        debug!("Sending request to Cortex inference API");

        let response = self
            .client
            .post(COMPLETE_PATH)
            .json(&request)
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, PROVIDER))?;

        if !response.status().is_success() {
            return Err(ErrorClassifier::classify_response(response, PROVIDER)
                .await
                .into());
        }

        let body: CompleteResponse = response
            .json()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, PROVIDER))?;

        parse_response(body, &self.model, start_time.elapsed())
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn parse_response(
    body: CompleteResponse,
    model: &str,
    elapsed: std::time::Duration,
) -> Result<LlmResponse> {
    let usage = body
        .usage
        .map(|u| TokenUsage::from_openai(u.prompt_tokens, u.completion_tokens))
        .unwrap_or_default();

    let content = body
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| {
            ChefError::Llm(LlmError::with_provider(
                ErrorCategory::ParseError,
                "No content in Cortex response",
                PROVIDER,
            ))
        })?;

    Ok(LlmResponse::with_metrics(
        content,
        usage,
        ResponseTiming::from_duration(elapsed),
        ResponseMetadata {
            model: model.to_string(),
            provider: PROVIDER.to_string(),
        },
    ))
}

// Request/Response types

#[derive(Debug, Serialize)]
struct CompleteRequest<'a> {
    model: &'a str,
    messages: Vec<CompleteMessage<'a>>,
    temperature: f32,
    max_tokens: usize,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct CompleteMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompleteResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SnowflakeConfig;
    use std::time::Duration;

    fn provider() -> CortexProvider {
        let client = SnowflakeClient::new(
            &SnowflakeConfig {
                account_url: Some("https://acme.snowflakecomputing.com".into()),
                token: Some("t".into()),
                database: Some("DB".into()),
                schema: Some("DATA".into()),
                search_service: Some("SVC".into()),
                ..Default::default()
            },
            Duration::from_secs(5),
        )
        .unwrap();

        CortexProvider::new(
            ProviderConfig::from_llm(&Default::default(), "mistral-large"),
            client,
        )
    }

    #[test]
    fn test_request_shape() {
        let provider = provider();
        let request = provider.build_request("What can I cook?");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "mistral-large");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "What can I cook?");
    }

    #[test]
    fn test_parse_response() {
        let body: CompleteResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"content": "Try fried rice."}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
        }))
        .unwrap();

        let response = parse_response(body, "mistral-large", Duration::from_millis(10)).unwrap();
        assert_eq!(response.content, "Try fried rice.");
        assert_eq!(response.usage.total(), 16);
        assert_eq!(response.metadata.provider, "cortex");
    }

    #[test]
    fn test_parse_response_without_choices() {
        let body: CompleteResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        let err = parse_response(body, "mistral-large", Duration::ZERO).unwrap_err();
        assert!(matches!(err, ChefError::Llm(e) if e.category == ErrorCategory::ParseError));
    }
}
