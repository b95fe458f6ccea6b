use rig::completion::{CompletionModel, Message as RigMessage};
use rig::message::AssistantContent;
use rig::prelude::CompletionClient;
use rig::providers::openai;
use snafu::{ResultExt, ensure};

use super::provider::{
    BoxFuture, CompletionFailedSnafu, CompletionProvider, CompletionRequest, EmptyCompletionSnafu,
    EmptyPromptSnafu, HttpClientSnafu, MissingApiKeySnafu, ProviderConfig, ProviderResult,
};

pub const RIG_OPENAI_PROVIDER_ID: &str = "openai";

/// One-shot completion over rig's OpenAI-compatible client. Anything that
/// speaks the same completions API (Gemini's compatibility endpoint
/// included) can be selected via `endpoint`.
pub struct RigCompletionAdapter {
    config: ProviderConfig,
}

impl RigCompletionAdapter {
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        ensure!(
            !config.api_key.is_empty(),
            MissingApiKeySnafu {
                stage: "rig-adapter-new",
                provider_id: config.provider_id.clone(),
            }
        );

        Ok(Self { config })
    }

    fn build_client(config: &ProviderConfig) -> ProviderResult<openai::Client> {
        let mut builder = openai::Client::builder().api_key(config.api_key.as_str());
        if !config.endpoint.is_empty() {
            builder = builder.base_url(config.endpoint.as_str());
        }
        builder.build().context(HttpClientSnafu {
            stage: "build-client",
        })
    }

    async fn run_completion(
        config: &ProviderConfig,
        request: CompletionRequest,
    ) -> ProviderResult<String> {
        ensure!(
            !request.prompt.trim().is_empty(),
            EmptyPromptSnafu {
                stage: "run-completion",
            }
        );

        let client = Self::build_client(config)?;
        let model = client.completion_model(config.model.clone());

        let mut builder = model.completion_request(RigMessage::user(request.prompt));
        if let Some(preamble) = request.preamble
            && !preamble.trim().is_empty()
        {
            builder = builder.preamble(preamble);
        }
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }

        let response = builder.send().await.context(CompletionFailedSnafu {
            stage: "send-completion",
        })?;

        let text = response
            .choice
            .into_iter()
            .filter_map(|content| match content {
                AssistantContent::Text(text) => Some(text.text),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");

        ensure!(
            !text.trim().is_empty(),
            EmptyCompletionSnafu {
                stage: "collect-completion-text",
                model_id: config.model.clone(),
            }
        );

        Ok(text)
    }
}

impl CompletionProvider for RigCompletionAdapter {
    fn id(&self) -> &str {
        &self.config.provider_id
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }

    fn complete<'a>(&'a self, request: CompletionRequest) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async move {
            let result = Self::run_completion(&self.config, request).await;
            if let Err(error) = &result {
                tracing::warn!(
                    provider_id = %self.config.provider_id,
                    model_id = %self.config.model,
                    error = %error,
                    "completion request failed"
                );
            }
            result
        })
    }
}
