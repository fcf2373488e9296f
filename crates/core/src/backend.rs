//! The opaque generation capability and its OpenAI-compatible implementation.
//!
//! The pipeline treats text generation as a single injected capability:
//! one prompt in, raw text out. Timeouts, retries and validation live with
//! the callers, not here.

use crate::config::Config;
use crate::error::BackendError;
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;

/// A capability that turns a prompt into raw completion text.
///
/// Implementations make no promise about the shape of the reply; callers
/// extract and validate JSON themselves.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, system_prompt: &str, user_content: &str)
    -> Result<String, BackendError>;
}

/// A [`GenerationBackend`] for any OpenAI-compatible chat completion API.
pub struct OpenAICompatibleBackend {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAICompatibleBackend {
    /// Creates a backend with the default sampling parameters.
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
            temperature: 0.7,
            max_tokens: 1024,
        }
    }

    /// Builds the backend from loaded application [`Config`].
    pub fn from_config(cfg: &Config) -> Self {
        let mut api_config = OpenAIConfig::new().with_api_key(cfg.api_key.clone());
        if let Some(base) = &cfg.api_base {
            api_config = api_config.with_api_base(base.clone());
        }
        Self {
            client: Client::with_config(api_config),
            model: cfg.chat_model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
        }
    }
}

#[async_trait]
impl GenerationBackend for OpenAICompatibleBackend {
    async fn generate(
        &self,
        system_prompt: &str,
        user_content: &str,
    ) -> Result<String, BackendError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .messages(vec![
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_prompt)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_content)
                    .build()?
                    .into(),
            ])
            .build()?;

        let response = self.client.chat().create(request).await?;
        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.is_empty())
            .ok_or(BackendError::EmptyResponse)
    }
}
