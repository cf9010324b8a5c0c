//! Retrieval over a reference document through an external retrieval service
//!
//! Indexing and vector search happen elsewhere. This capability posts the
//! query (and the document it is scoped to) to a configured endpoint and turns
//! the returned passages into text.
//!
//! Request: `{"query": "...", "document": "hatespeech.pdf", "top_k": 3}`
//! Response: `{"results": [{"text": "...", "score": 0.8}]}` or `{"answer": "..."}`

use super::{string_setting, usize_setting, Settings};
use crate::capabilities::{Capability, CapabilityDescription, CapabilityError};
use crate::credentials::Credentials;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub struct DocumentSearchCapability {
    client: reqwest::Client,
    endpoint: Url,
    document: Option<String>,
    top_k: usize,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct RetrievalRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    document: Option<&'a str>,
    top_k: usize,
}

#[derive(Debug, Default, Deserialize)]
struct RetrievalResponse {
    #[serde(default)]
    results: Vec<Passage>,
    answer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Passage {
    text: String,
    score: Option<f64>,
}

impl DocumentSearchCapability {
    pub fn new(endpoint: &str, document: Option<String>) -> Result<Self, CapabilityError> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            CapabilityError::InitializationError(format!("invalid retrieval endpoint '{endpoint}': {e}"))
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| CapabilityError::InitializationError(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            document,
            top_k: 3,
            api_key: None,
        })
    }

    /// Settings: `endpoint` (required), `document`, `top_k`, `api_key_env`
    pub fn from_settings(
        settings: Option<&Settings>,
        credentials: &Credentials,
    ) -> Result<Self, CapabilityError> {
        let settings = settings.ok_or_else(|| {
            CapabilityError::InitializationError(
                "document_search needs config = { endpoint = \"...\" }".to_string(),
            )
        })?;
        let endpoint = string_setting(settings, "endpoint").ok_or_else(|| {
            CapabilityError::InitializationError("document_search 'endpoint' is required".into())
        })?;

        let mut capability = Self::new(&endpoint, string_setting(settings, "document"))?;
        if let Some(top_k) = usize_setting(settings, "top_k") {
            capability.top_k = top_k.max(1);
        }
        if let Some(key_env) = string_setting(settings, "api_key_env") {
            let key = credentials
                .get(&key_env)
                .map_err(|e| CapabilityError::InitializationError(e.to_string()))?;
            capability.api_key = Some(key.to_string());
        }
        Ok(capability)
    }

    fn format_response(response: RetrievalResponse) -> String {
        if !response.results.is_empty() {
            return response
                .results
                .iter()
                .enumerate()
                .map(|(i, passage)| match passage.score {
                    Some(score) => format!("[{}] (score {:.2}) {}", i + 1, score, passage.text.trim()),
                    None => format!("[{}] {}", i + 1, passage.text.trim()),
                })
                .collect::<Vec<_>>()
                .join("\n\n");
        }
        response
            .answer
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| "No relevant passages found.".to_string())
    }
}

#[async_trait]
impl Capability for DocumentSearchCapability {
    fn describe(&self) -> CapabilityDescription {
        let scope = self
            .document
            .as_deref()
            .map(|d| format!(" in {d}"))
            .unwrap_or_default();
        CapabilityDescription::with_query(
            "document_search",
            format!("Retrieve passages relevant to a question from the reference document{scope}"),
        )
    }

    fn operation(&self) -> &str {
        "retrieval"
    }

    async fn invoke(&self, query: &str) -> Result<String, CapabilityError> {
        let body = RetrievalRequest {
            query,
            document: self.document.as_deref(),
            top_k: self.top_k,
        };

        let mut request = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CapabilityError::ExecutionError(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CapabilityError::ExecutionError(format!(
                "Retrieval service error ({}): {}",
                status.as_u16(),
                text
            )));
        }

        let parsed: RetrievalResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::ExecutionError(format!("Failed to parse response: {e}")))?;
        Ok(Self::format_response(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rejects_invalid_endpoint() {
        assert!(matches!(
            DocumentSearchCapability::new("not a url", None),
            Err(CapabilityError::InitializationError(_))
        ));
    }

    #[test]
    fn test_from_settings_requires_endpoint() {
        let credentials = Credentials::default();
        assert!(DocumentSearchCapability::from_settings(None, &credentials).is_err());
        assert!(DocumentSearchCapability::from_settings(Some(&Settings::new()), &credentials).is_err());
    }

    #[test]
    fn test_from_settings_with_key() {
        let mut settings = Settings::new();
        settings.insert("endpoint".to_string(), json!("http://localhost:8000/query"));
        settings.insert("document".to_string(), json!("hatespeech.pdf"));
        settings.insert("top_k".to_string(), json!(5));
        settings.insert("api_key_env".to_string(), json!("RAG_KEY"));

        assert!(DocumentSearchCapability::from_settings(Some(&settings), &Credentials::default()).is_err());

        let credentials = Credentials::from_pairs([("RAG_KEY", "k")]);
        let capability = DocumentSearchCapability::from_settings(Some(&settings), &credentials).unwrap();
        assert_eq!(capability.top_k, 5);
        assert_eq!(capability.api_key.as_deref(), Some("k"));
        assert!(capability.describe().description.contains("hatespeech.pdf"));
    }

    #[test]
    fn test_format_passages() {
        let response: RetrievalResponse = serde_json::from_value(json!({
            "results": [
                {"text": " Hate speech detection ", "score": 0.91},
                {"text": "Datasets"}
            ]
        }))
        .unwrap();

        assert_eq!(
            DocumentSearchCapability::format_response(response),
            "[1] (score 0.91) Hate speech detection\n\n[2] Datasets"
        );
    }

    #[test]
    fn test_format_answer_and_empty() {
        let response: RetrievalResponse =
            serde_json::from_value(json!({"answer": "Section 3"})).unwrap();
        assert_eq!(DocumentSearchCapability::format_response(response), "Section 3");

        assert_eq!(
            DocumentSearchCapability::format_response(RetrievalResponse::default()),
            "No relevant passages found."
        );
    }
}
