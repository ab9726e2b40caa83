use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ProviderError;
use crate::profile::profile_model::{Credential, ProviderKind};

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;

// ============================================================================
// CompletionProvider: the one capability the matching engine depends on
// ============================================================================

/// System instruction plus user message for one completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionPrompt {
    pub system: String,
    pub user: String,
}

/// Sampling and transport options for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 256,
            timeout: Duration::from_secs(30),
        }
    }
}

/// A remote (or local) text-completion backend.
///
/// `complete` issues exactly one non-streaming request. An `Err` means the
/// call itself failed; an `Ok` carrying empty text means the provider
/// answered with nothing.
pub trait CompletionProvider {
    fn name(&self) -> &str;

    fn complete(
        &self,
        prompt: &CompletionPrompt,
        options: &CompletionOptions,
    ) -> Result<String, ProviderError>;
}

/// Provider-specific overrides from configuration.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub model: Option<String>,
    pub endpoint: Option<String>,
}

/// Select the provider implementation for a credential.
pub fn build_provider(
    credential: &Credential,
    settings: &ProviderSettings,
) -> Box<dyn CompletionProvider> {
    let model = settings.model.as_deref();
    let endpoint = settings.endpoint.as_deref();
    match credential.provider {
        ProviderKind::OpenAi => Box::new(openai::OpenAiProvider::new(&credential.key, model, endpoint)),
        ProviderKind::Anthropic => {
            Box::new(anthropic::AnthropicProvider::new(&credential.key, model, endpoint))
        }
        ProviderKind::Ollama => Box::new(ollama::OllamaProvider::new(endpoint, model)),
        ProviderKind::Mock => Box::new(mock::HeuristicProvider),
    }
}

// ============================================================================
// Shared HTTP plumbing
// ============================================================================

/// Send a JSON body and decode a JSON reply, mapping HTTP failures.
pub(crate) fn post_json<B: Serialize, R: DeserializeOwned>(
    request: reqwest::blocking::RequestBuilder,
    body: &B,
    options: &CompletionOptions,
) -> Result<R, ProviderError> {
    let timeout_secs = options.timeout.as_secs();
    let response = request
        .timeout(options.timeout)
        .json(body)
        .send()
        .map_err(|e| ProviderError::from_reqwest(e, timeout_secs))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().unwrap_or_default();
        return Err(ProviderError::from_status(status.as_u16(), error_message(text)));
    }

    response
        .json::<R>()
        .map_err(|e| ProviderError::Decode(e.to_string()))
}

/// Pull `error.message` (or `error` as a string) out of an error body.
fn error_message(body: String) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(&body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            v["error"]["message"]
                .as_str()
                .or_else(|| v["error"].as_str())
                .map(String::from)
        })
        .unwrap_or(body)
}
