use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;
use crate::provider::{CompletionOptions, CompletionPrompt, CompletionProvider, post_json};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_MODEL: &str = "qwen2.5:1.5b";

/// Local Ollama backend using the `/api/generate` endpoint in JSON mode.
pub struct OllamaProvider {
    pub endpoint: String,
    pub model: String,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'static str,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: String,
}

impl OllamaProvider {
    pub fn new(endpoint: Option<&str>, model: Option<&str>) -> Self {
        Self {
            endpoint: endpoint.unwrap_or(DEFAULT_ENDPOINT).to_string(),
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl CompletionProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn complete(
        &self,
        prompt: &CompletionPrompt,
        options: &CompletionOptions,
    ) -> Result<String, ProviderError> {
        let request = OllamaRequest {
            model: &self.model,
            system: &prompt.system,
            prompt: &prompt.user,
            stream: false,
            format: "json",
            options: OllamaOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens,
            },
        };

        debug!(model = %self.model, endpoint = %self.endpoint, "ollama completion request");
        let response: OllamaResponse =
            post_json(self.client.post(&self.endpoint), &request, options)?;
        Ok(response.response)
    }
}
