use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;
use crate::provider::{CompletionOptions, CompletionPrompt, CompletionProvider, post_json};

pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";
const API_VERSION: &str = "2023-06-01";

/// Anthropic messages backend.
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    endpoint: String,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

impl AnthropicProvider {
    pub fn new(api_key: &str, model: Option<&str>, endpoint: Option<&str>) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
            endpoint: endpoint.unwrap_or(DEFAULT_ENDPOINT).to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl CompletionProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn complete(
        &self,
        prompt: &CompletionPrompt,
        options: &CompletionOptions,
    ) -> Result<String, ProviderError> {
        let body = MessagesRequest {
            model: &self.model,
            system: &prompt.system,
            messages: vec![Message { role: "user", content: &prompt.user }],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        debug!(model = %self.model, endpoint = %self.endpoint, "anthropic completion request");
        let request = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION);
        let response: MessagesResponse = post_json(request, &body, options)?;

        Ok(response
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join(""))
    }
}
