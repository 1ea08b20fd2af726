//! Natural-language query → [`QueryIntent`].
//!
//! The `openai` extractor asks a chat model (`response_format =
//! json_object`) to fill in the intent vocabulary. The `disabled` extractor
//! treats every whitespace token of the query as a keyword and sets no
//! filters.
//!
//! Extraction failures are never fatal to a search: [`extract_or_default`]
//! logs them and continues with an empty intent (pure semantic search).

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, error};

use estate_index_core::filter::QueryIntent;

use crate::config::IntentConfig;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

const SYSTEM_PROMPT: &str = r#"You are a real estate search assistant. Turn the user's query into structured filters for a listing database of properties for rent, for purchase ("Buy") and short-term rental. Return one JSON object with any of these fields that the query mentions; use null for anything not mentioned:

- keywords: list of descriptive words or phrases (e.g. ["modern", "quiet"])
- property_type: "Rent", "Buy" or "Short-Term"
- max_total_price: maximum purchase price in yen (integer, Buy only)
- max_monthly_price: maximum monthly cost in yen (integer, Rent or Short-Term)
- short_term_duration: stay length for Short-Term (e.g. "1 month")
- min_area_m2, max_area_m2: floor area bounds in square meters (number)
- ward: city ward (e.g. "Shibuya")
- location: a place or landmark to search around (e.g. "Tokyo Tower")
- pet_friendly: true if pets must be allowed
- max_walk_time: maximum walk to a station in minutes (integer)
- station_name: a specific station
- train_lines: list of train line names
- min_year_built: earliest construction year (integer)
- min_floor, max_floor: floor bounds as strings (e.g. "2F")
- contract_length: contract length for Rent (e.g. "2 years")
- max_management_fee, max_guarantor_service, max_fire_insurance: fee caps in yen (integer)
- japanese_required: whether Japanese ability may be required (boolean)
- amenities: list of required amenities (e.g. ["autolock", "balcony"])
- layout: room layout for Buy (e.g. "2LDK")
- land_rights: land rights for Buy (e.g. "Freehold")
- status: listing status for Buy (e.g. "Available")
- building_id: a building identifier

Examples:
Query: "modern apartment for rent in Shibuya under 200,000 yen per month, pet-friendly, near Shibuya station"
Output: {"keywords": ["modern", "apartment"], "property_type": "Rent", "max_monthly_price": 200000, "ward": "Shibuya", "pet_friendly": true, "station_name": "Shibuya"}

Query: "buy a 3LDK freehold apartment in Meguro, max 100 million yen"
Output: {"keywords": ["apartment"], "property_type": "Buy", "max_total_price": 100000000, "ward": "Meguro", "layout": "3LDK", "land_rights": "Freehold"}

Query: "short-term furnished apartment in Roppongi for 1 month"
Output: {"keywords": ["furnished", "apartment"], "property_type": "Short-Term", "short_term_duration": "1 month", "location": "Roppongi", "amenities": ["furnished"]}"#;

/// Extracts a structured intent from free text.
#[async_trait]
pub trait IntentExtractor: Send + Sync {
    fn name(&self) -> &str;
    async fn extract(&self, query: &str) -> Result<QueryIntent>;
}

/// Run `extractor`, falling back to an empty intent on failure.
pub async fn extract_or_default(extractor: &dyn IntentExtractor, query: &str) -> QueryIntent {
    let started = Instant::now();
    match extractor.extract(query).await {
        Ok(intent) => {
            debug!(
                extractor = extractor.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                intent = ?intent,
                "extracted query intent"
            );
            intent
        }
        Err(e) => {
            error!(extractor = extractor.name(), "failed to extract query intent: {:#}", e);
            QueryIntent::default()
        }
    }
}

/// Keyword-only extraction; no network.
pub struct KeywordExtractor;

#[async_trait]
impl IntentExtractor for KeywordExtractor {
    fn name(&self) -> &str {
        "disabled"
    }
    async fn extract(&self, query: &str) -> Result<QueryIntent> {
        Ok(QueryIntent::keywords_only(query))
    }
}

/// Chat-completions extractor.
pub struct OpenAIIntentExtractor {
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAIIntentExtractor {
    pub fn new(config: &IntentConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build OpenAI HTTP client")?;
        Ok(Self {
            model: config.model.clone(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl IntentExtractor for OpenAIIntentExtractor {
    fn name(&self) -> &str {
        &self.model
    }

    async fn extract(&self, query: &str) -> Result<QueryIntent> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": query}
            ],
            "response_format": {"type": "json_object"},
            "temperature": 0
        });

        let response = self
            .client
            .post(OPENAI_CHAT_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .context("OpenAI chat request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("OpenAI API error {}: {}", status, body_text);
        }

        let json: Value = response.json().await?;
        parse_chat_intent(&json)
    }
}

/// Pull the JSON object out of `choices[0].message.content`.
fn parse_chat_intent(response: &Value) -> Result<QueryIntent> {
    let content = response
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("Invalid chat response: missing message content"))?;
    serde_json::from_str(content).context("intent is not a valid JSON object")
}

pub fn create_extractor(config: &IntentConfig) -> Result<Box<dyn IntentExtractor>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(KeywordExtractor)),
        "openai" => Ok(Box::new(OpenAIIntentExtractor::new(config)?)),
        other => bail!("Unknown intent provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    #[async_trait]
    impl IntentExtractor for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        async fn extract(&self, _query: &str) -> Result<QueryIntent> {
            bail!("model unavailable")
        }
    }

    #[test]
    fn test_parse_chat_intent() {
        let response = json!({
            "choices": [{"message": {"role": "assistant", "content":
                "{\"keywords\": [\"quiet\"], \"property_type\": \"Buy\", \"max_total_price\": 100000000, \"layout\": \"3LDK\", \"amenities\": null}"
            }}]
        });
        let intent = parse_chat_intent(&response).unwrap();
        assert_eq!(intent.keywords, vec!["quiet"]);
        assert_eq!(intent.max_total_price, Some(100_000_000.0));
        assert_eq!(intent.layout.as_deref(), Some("3LDK"));
    }

    #[test]
    fn test_parse_chat_intent_rejects_prose() {
        let response = json!({"choices": [{"message": {"content": "Sure! Here you go."}}]});
        assert!(parse_chat_intent(&response).is_err());
        assert!(parse_chat_intent(&json!({"choices": []})).is_err());
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_empty_intent() {
        let intent = extract_or_default(&Failing, "cheap studio").await;
        assert_eq!(intent, QueryIntent::default());
    }

    #[tokio::test]
    async fn test_disabled_extractor_uses_tokens() {
        let extractor = create_extractor(&IntentConfig::default()).unwrap();
        let intent = extract_or_default(extractor.as_ref(), "quiet 2LDK Meguro").await;
        assert_eq!(intent.keywords, vec!["quiet", "2LDK", "Meguro"]);
        assert_eq!(intent.property_type, None);
    }
}
