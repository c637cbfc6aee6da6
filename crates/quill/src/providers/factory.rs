use std::sync::Arc;

use super::{base::Provider, configs::ProviderConfig, openai::OpenAiProvider};
use anyhow::Result;
use strum_macros::{Display, EnumIter};

#[derive(EnumIter, Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum ProviderType {
    OpenAi,
}

impl ProviderConfig {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            ProviderConfig::OpenAi(_) => ProviderType::OpenAi,
        }
    }
}

/// Build the process-wide provider. Fails when the config cannot produce a
/// working client (for example a blank API key), so callers refuse to start.
pub fn get_provider(config: ProviderConfig) -> Result<Arc<dyn Provider>> {
    tracing::info!(provider = %config.provider_type(), "initializing model provider");
    match config {
        ProviderConfig::OpenAi(openai_config) => Ok(Arc::new(OpenAiProvider::new(openai_config)?)),
    }
}
