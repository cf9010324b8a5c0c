//! Web search through the Serper API

use super::{string_setting, usize_setting, Settings};
use crate::capabilities::{query_argument, Capability, CapabilityDescription, CapabilityError};
use crate::credentials::Credentials;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_API_KEY_ENV: &str = "SERPER_API_KEY";
pub const DEFAULT_ENDPOINT: &str = "https://google.serper.dev/search";

pub struct WebSearchCapability {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    max_results: usize,
}

impl WebSearchCapability {
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Result<Self, CapabilityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CapabilityError::InitializationError(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            max_results: 10,
        })
    }

    /// Settings: `api_key_env`, `endpoint`, `max_results`
    pub fn from_settings(
        settings: Option<&Settings>,
        credentials: &Credentials,
    ) -> Result<Self, CapabilityError> {
        let key_env = settings
            .and_then(|s| string_setting(s, "api_key_env"))
            .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string());
        let api_key = credentials
            .get(&key_env)
            .map_err(|e| CapabilityError::InitializationError(e.to_string()))?;
        let endpoint = settings
            .and_then(|s| string_setting(s, "endpoint"))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let mut capability = Self::new(api_key, endpoint)?;
        if let Some(max_results) = settings.and_then(|s| usize_setting(s, "max_results")) {
            capability.max_results = max_results.max(1);
        }
        Ok(capability)
    }

    fn build_payload(query: &str, num_results: usize, max_results: usize) -> Value {
        json!({
            "q": query,
            "num": num_results.min(max_results),
            "gl": "us",
            "hl": "en"
        })
    }

    /// Render organic results as plain text blocks
    fn format_results(response: &Value, num_results: usize) -> String {
        let blocks: Vec<String> = response
            .get("organic")
            .and_then(Value::as_array)
            .map(|organic| {
                organic
                    .iter()
                    .filter_map(|result| {
                        let title = result.get("title")?.as_str()?;
                        let link = result.get("link")?.as_str()?;
                        let snippet = result.get("snippet").and_then(Value::as_str).unwrap_or("");
                        Some(format!("Title: {title}\nLink: {link}\nSnippet: {snippet}"))
                    })
                    .take(num_results)
                    .collect()
            })
            .unwrap_or_default();

        if blocks.is_empty() {
            "No results found.".to_string()
        } else {
            blocks.join("\n---\n")
        }
    }

    async fn search(&self, query: &str, num_results: usize) -> Result<String, CapabilityError> {
        let payload = Self::build_payload(query, num_results, self.max_results);

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| CapabilityError::ExecutionError(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CapabilityError::ExecutionError(format!(
                "Serper API error ({}): {}",
                status.as_u16(),
                body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CapabilityError::ExecutionError(format!("Failed to parse response: {e}")))?;

        Ok(Self::format_results(&body, num_results.min(self.max_results)))
    }
}

#[async_trait]
impl Capability for WebSearchCapability {
    fn describe(&self) -> CapabilityDescription {
        CapabilityDescription {
            name: "web_search".to_string(),
            description: "Search the web for current information about markets, companies, news and trends".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query"
                    },
                    "num_results": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 20,
                        "default": 10
                    }
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        }
    }

    fn operation(&self) -> &str {
        "search"
    }

    async fn invoke(&self, query: &str) -> Result<String, CapabilityError> {
        self.search(query, self.max_results).await
    }

    async fn invoke_with(&self, arguments: &Value) -> Result<String, CapabilityError> {
        let query = query_argument(arguments)?;
        let num_results = arguments
            .get("num_results")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or(self.max_results);
        self.search(query, num_results).await
    }
}
