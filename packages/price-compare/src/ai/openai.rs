//! OpenAI implementation of the ProductAI trait.
//!
//! A reference implementation using structured outputs (`json_schema`
//! response format) so replies parse straight into the guess types.
//!
//! # Example
//!
//! ```rust,ignore
//! use price_compare::ai::OpenAI;
//!
//! let ai = OpenAI::new("sk-...").with_model("gpt-4o");
//! let comparator = Comparator::new(Arc::new(ai), searcher, CompareConfig::default());
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::{NormalizationError, NormalizationResult};
use crate::security::SecretString;
use crate::traits::ai::{AiExtraction, ProductAI};
use crate::types::{
    page::PageSnapshot,
    product::{AiProductGuess, NormalizeRequest},
};

/// Page text beyond this many characters is not sent.
const MAX_PAGE_CHARS: usize = 6000;

const NORMALIZE_PROMPT: &str = "You identify products sold in auction lots. \
Given a raw lot title (any language) and hints already detected, return the \
brand, model, manufacturer reference, storage capacity in GB, category, \
condition grade and functional state. Use null for anything the title does \
not state. Suggest up to three short web shopping queries in altQueries. \
confidence is your certainty in brand, model and category, from 0 to 1.";

const EXTRACT_PROMPT: &str = "You read auction lot pages. From the page \
content, return the lot title, the current bid or estimate as a number with \
its ISO currency, the buyer premium as a fraction if the page states one, \
and whether this is a single lot page. Use null for anything not shown. \
confidence is your certainty in the price, from 0 to 1.";

/// OpenAI-based collaborator.
#[derive(Clone)]
pub struct OpenAI {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl OpenAI {
    /// Create a new OpenAI client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: SecretString::new(api_key),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> NormalizationResult<Self> {
        let api_key = SecretString::from_env("OPENAI_API_KEY")
            .ok_or_else(|| NormalizationError::ProviderError("OPENAI_API_KEY not set".into()))?;
        Ok(Self {
            api_key,
            ..Self::new("")
        })
    }

    /// Set the chat model (default: gpt-4o-mini).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Structured output with JSON schema (OpenAI's json_schema response_format).
    async fn generate_structured(
        &self,
        name: &str,
        messages: Vec<ChatMessage>,
        schema: serde_json::Value,
    ) -> NormalizationResult<String> {
        let request = json!({
            "model": self.model,
            "messages": messages,
            "temperature": 0.0,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": name,
                    "strict": true,
                    "schema": schema,
                }
            }
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key.expose()))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| NormalizationError::ProviderError(Box::new(e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(NormalizationError::ProviderError(
                format!("OpenAI returned {status}: {error_text}").into(),
            ));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| NormalizationError::ProviderError(Box::new(e)))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| NormalizationError::NormalizationFailed("empty reply from OpenAI".into()))
    }
}

fn nullable(kind: &str) -> serde_json::Value {
    json!({ "type": [kind, "null"] })
}

fn guess_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": [
            "brand", "model", "reference", "capacity_gb", "category",
            "condition_grade", "functional_state", "confidence", "altQueries"
        ],
        "properties": {
            "brand": nullable("string"),
            "model": nullable("string"),
            "reference": nullable("string"),
            "capacity_gb": nullable("integer"),
            "category": nullable("string"),
            "condition_grade": { "type": ["string", "null"], "enum": ["new", "used", "unknown", null] },
            "functional_state": { "type": ["string", "null"], "enum": ["ok", "broken", "unknown", null] },
            "confidence": { "type": "number" },
            "altQueries": { "type": "array", "items": { "type": "string" } }
        }
    })
}

fn extraction_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["title", "price", "confidence", "domain", "lotPageInfo"],
        "properties": {
            "title": nullable("string"),
            "price": {
                "type": ["object", "null"],
                "additionalProperties": false,
                "required": ["value", "currency"],
                "properties": {
                    "value": { "type": "number" },
                    "currency": { "type": "string" }
                }
            },
            "confidence": { "type": "number" },
            "domain": { "type": "string" },
            "lotPageInfo": {
                "type": "object",
                "additionalProperties": false,
                "required": ["isLotPage", "lotNumber", "buyerPremium"],
                "properties": {
                    "isLotPage": { "type": "boolean" },
                    "lotNumber": nullable("string"),
                    "buyerPremium": nullable("number")
                }
            }
        }
    })
}

fn page_excerpt(page: &PageSnapshot) -> String {
    let text: String = page.text.chars().take(MAX_PAGE_CHARS).collect();
    format!(
        "URL: {}\nDomain: {}\nTitle: {}\n\n{}",
        page.url,
        page.domain,
        page.meta_title.as_deref().unwrap_or(""),
        text
    )
}

#[async_trait]
impl ProductAI for OpenAI {
    async fn normalize(&self, request: &NormalizeRequest) -> NormalizationResult<AiProductGuess> {
        if request.raw_title.trim().is_empty() {
            return Err(NormalizationError::InvalidRequest("raw title is empty".into()));
        }

        let user = serde_json::to_string(request)?;
        let messages = vec![
            ChatMessage {
                role: "system",
                content: NORMALIZE_PROMPT.into(),
            },
            ChatMessage {
                role: "user",
                content: user.into(),
            },
        ];

        let reply = self
            .generate_structured("product_guess", messages, guess_schema())
            .await?;
        debug!(title = %request.raw_title, "OpenAI normalization reply received");
        Ok(serde_json::from_str(&reply)?)
    }

    async fn extract_fallback(&self, page: &PageSnapshot) -> NormalizationResult<AiExtraction> {
        let mut parts = vec![json!({ "type": "text", "text": page_excerpt(page) })];
        if let Some(screenshot) = &page.screenshot_base64 {
            parts.push(json!({
                "type": "image_url",
                "image_url": { "url": format!("data:image/png;base64,{screenshot}") }
            }));
        }

        let messages = vec![
            ChatMessage {
                role: "system",
                content: EXTRACT_PROMPT.into(),
            },
            ChatMessage {
                role: "user",
                content: serde_json::Value::Array(parts),
            },
        ];

        let reply = self
            .generate_structured("lot_extraction", messages, extraction_schema())
            .await?;
        debug!(domain = %page.domain, "OpenAI extraction reply received");
        Ok(serde_json::from_str(&reply)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_builder() {
        let ai = OpenAI::new("sk-test")
            .with_model("gpt-4o")
            .with_base_url("http://localhost:8080/v1");
        assert_eq!(ai.model(), "gpt-4o");
        assert_eq!(ai.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_schema_reply_parses_into_guess() {
        let reply = r#"{"brand":"Apple","model":"iPhone 13","reference":null,"capacity_gb":128,
            "category":"smartphone","condition_grade":"used","functional_state":null,
            "confidence":0.9,"altQueries":["iphone 13 128"]}"#;
        let guess: AiProductGuess = serde_json::from_str(reply).unwrap();
        assert_eq!(guess.capacity_gb, Some(128));
        assert_eq!(guess.alt_queries, vec!["iphone 13 128".to_string()]);
    }

    #[test]
    fn test_page_excerpt_is_bounded() {
        let page = PageSnapshot::new("https://drouot.com/l/1").with_text("x".repeat(20_000));
        assert!(page_excerpt(&page).len() < MAX_PAGE_CHARS + 200);
    }
}
