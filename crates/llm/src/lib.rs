use std::sync::Arc;

mod provider;
mod rig_adapter;

pub use provider::{
    BoxFuture, CompletionProvider, CompletionRequest, DEFAULT_MODEL, ProviderConfig, ProviderError,
    ProviderResult,
};
pub use rig_adapter::{RIG_OPENAI_PROVIDER_ID, RigCompletionAdapter};

pub fn create_provider(mut config: ProviderConfig) -> ProviderResult<Arc<dyn CompletionProvider>> {
    if config.provider_id.trim().is_empty() {
        config.provider_id = RIG_OPENAI_PROVIDER_ID.to_string();
    }

    match config.provider_id.as_str() {
        "openai" | "rig-openai" => {
            config.provider_id = RIG_OPENAI_PROVIDER_ID.to_string();
            Ok(Arc::new(RigCompletionAdapter::new(config)?))
        }
        _ => Err(ProviderError::UnsupportedProvider {
            stage: "create-provider",
            provider_id: config.provider_id,
        }),
    }
}
