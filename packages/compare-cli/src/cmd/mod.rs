//! Subcommand implementations.

pub mod compare;
pub mod normalize;
pub mod score;

use async_trait::async_trait;
use price_compare::{
    AiExtraction, AiProductGuess, NoAI, NormalizationError, NormalizeRequest, PageSnapshot,
    ProductAI,
};
use tracing::info;

use crate::config::Config;

type AiResult<T> = std::result::Result<T, NormalizationError>;

/// AI collaborator picked from the configuration.
pub enum Collaborator {
    Disabled(NoAI),
    #[cfg(feature = "openai")]
    OpenAI(price_compare::ai::OpenAI),
}

impl Collaborator {
    pub fn from_config(config: &Config) -> Self {
        #[cfg(feature = "openai")]
        if let Some(key) = &config.openai_api_key {
            info!("Using OpenAI for normalization fallback");
            return Self::OpenAI(price_compare::ai::OpenAI::new(key.expose()));
        }

        if config.openai_api_key.is_some() {
            info!("OPENAI_API_KEY set but built without the openai feature; AI disabled");
        }
        Self::Disabled(NoAI)
    }
}

#[async_trait]
impl ProductAI for Collaborator {
    async fn normalize(&self, request: &NormalizeRequest) -> AiResult<AiProductGuess> {
        match self {
            Self::Disabled(ai) => ai.normalize(request).await,
            #[cfg(feature = "openai")]
            Self::OpenAI(ai) => ai.normalize(request).await,
        }
    }

    async fn extract_fallback(&self, page: &PageSnapshot) -> AiResult<AiExtraction> {
        match self {
            Self::Disabled(ai) => ai.extract_fallback(page).await,
            #[cfg(feature = "openai")]
            Self::OpenAI(ai) => ai.extract_fallback(page).await,
        }
    }
}
