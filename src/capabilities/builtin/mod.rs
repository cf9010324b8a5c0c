//! Builtin capabilities
//!
//! The key a capability is declared under in the crew file selects the
//! builtin: `web_search`, `document_search` or `generation`.

pub mod document_search;
pub mod generation;
pub mod web_search;

pub use document_search::DocumentSearchCapability;
pub use generation::GenerationCapability;
pub use web_search::WebSearchCapability;

use super::{Capability, CapabilityError};
use crate::credentials::Credentials;
use crate::llm::LlmProvider;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub type Settings = HashMap<String, Value>;

/// Instantiate the builtin registered under `name`
pub fn create(
    name: &str,
    settings: Option<&Settings>,
    credentials: &Credentials,
    llm: Arc<dyn LlmProvider>,
) -> Result<Arc<dyn Capability>, CapabilityError> {
    match name {
        "web_search" => Ok(Arc::new(WebSearchCapability::from_settings(
            settings,
            credentials,
        )?)),
        "document_search" => Ok(Arc::new(DocumentSearchCapability::from_settings(
            settings,
            credentials,
        )?)),
        "generation" => Ok(Arc::new(GenerationCapability::from_settings(settings, llm)?)),
        other => Err(CapabilityError::UnknownCapability(other.to_string())),
    }
}

/// Environment variable holding the builtin's API key, if it needs one
pub fn credential_env(name: &str, settings: Option<&Settings>) -> Option<String> {
    let configured = settings.and_then(|s| string_setting(s, "api_key_env"));
    match name {
        "web_search" => Some(configured.unwrap_or_else(|| web_search::DEFAULT_API_KEY_ENV.into())),
        "document_search" => configured,
        _ => None,
    }
}

pub(crate) fn string_setting(settings: &Settings, key: &str) -> Option<String> {
    settings.get(key).and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn usize_setting(settings: &Settings, key: &str) -> Option<usize> {
    settings
        .get(key)
        .and_then(Value::as_u64)
        .map(|v| v as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mocks::MockLlmProvider;
    use serde_json::json;

    fn llm() -> Arc<dyn LlmProvider> {
        Arc::new(MockLlmProvider::single_response("unused"))
    }

    #[test]
    fn test_credential_env_defaults() {
        assert_eq!(
            credential_env("web_search", None),
            Some("SERPER_API_KEY".to_string())
        );
        assert_eq!(credential_env("generation", None), None);
        assert_eq!(credential_env("document_search", None), None);

        let mut settings = Settings::new();
        settings.insert("api_key_env".to_string(), json!("RAG_KEY"));
        assert_eq!(
            credential_env("document_search", Some(&settings)),
            Some("RAG_KEY".to_string())
        );
    }

    #[test]
    fn test_create_unknown_builtin() {
        let result = create("calculator", None, &Credentials::default(), llm());
        assert!(matches!(result, Err(CapabilityError::UnknownCapability(_))));
    }

    #[test]
    fn test_create_web_search_requires_key() {
        let result = create("web_search", None, &Credentials::default(), llm());
        assert!(matches!(
            result,
            Err(CapabilityError::InitializationError(_))
        ));

        let credentials = Credentials::from_pairs([("SERPER_API_KEY", "k")]);
        assert!(create("web_search", None, &credentials, llm()).is_ok());
    }

    #[test]
    fn test_create_generation() {
        let capability = create("generation", None, &Credentials::default(), llm()).unwrap();
        assert_eq!(capability.describe().name, "generation");
    }
}
