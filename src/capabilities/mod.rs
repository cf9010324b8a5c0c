//! Capability providers
//!
//! A capability is an external service an agent may call by name with a text
//! query: web search, document retrieval, text generation. The pipeline never
//! looks inside one; it only describes capabilities to the language model and
//! routes the model's calls back to them.
//!
//! Failures never escape a [`CapabilitySet`]. They come back to the agent as
//! `"Error performing <operation>: <message>"` so one provider outage degrades
//! an answer instead of aborting the run.

use crate::config::CapabilityConfig;
use crate::credentials::Credentials;
use crate::llm::LlmProvider;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn, Instrument};

pub mod builtin;

/// Capability seam for dependency injection and testing
#[async_trait]
pub trait Capability: Send + Sync {
    /// Name, description and JSON schema shown to the language model
    fn describe(&self) -> CapabilityDescription;

    /// Verb used in degraded output, e.g. "search" or "retrieval"
    fn operation(&self) -> &str;

    /// Run the capability with a plain text query
    async fn invoke(&self, query: &str) -> Result<String, CapabilityError>;

    /// Run the capability with model-supplied arguments.
    ///
    /// The default reads the `query` field and defers to [`Capability::invoke`].
    async fn invoke_with(&self, arguments: &Value) -> Result<String, CapabilityError> {
        let query = query_argument(arguments)?;
        self.invoke(query).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityDescription {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl CapabilityDescription {
    /// Description whose only argument is a required `query` string
    pub fn with_query(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The question or search text"
                    }
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        }
    }
}

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("Unknown capability: {0}")]
    UnknownCapability(String),
    #[error("Unknown capability implementation: {0}")]
    UnknownImplementation(String),
    #[error("Capability initialization failed: {0}")]
    InitializationError(String),
    #[error("Argument validation failed: {0}")]
    ValidationError(String),
    #[error("Schema error: {0}")]
    SchemaError(String),
    #[error("{0}")]
    ExecutionError(String),
}

/// Extract the `query` string argument
pub fn query_argument(arguments: &Value) -> Result<&str, CapabilityError> {
    arguments
        .get("query")
        .and_then(Value::as_str)
        .ok_or_else(|| CapabilityError::ValidationError("'query' argument is required".into()))
}

/// Format a capability failure the way agents see it
pub fn degraded_output(operation: &str, error: &dyn std::fmt::Display) -> String {
    format!("Error performing {operation}: {error}")
}

/// The capabilities bound to one agent
#[derive(Clone, Default)]
pub struct CapabilitySet {
    capabilities: BTreeMap<String, Arc<dyn Capability>>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, capability: Arc<dyn Capability>) {
        let name = capability.describe().name;
        self.capabilities.insert(name, capability);
    }

    pub fn with(mut self, capability: Arc<dyn Capability>) -> Self {
        self.insert(capability);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn names(&self) -> Vec<String> {
        self.capabilities.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Capability>> {
        self.capabilities.get(name)
    }

    /// Descriptions in name order, for the completion request
    pub fn describe_all(&self) -> Vec<CapabilityDescription> {
        self.capabilities.values().map(|c| c.describe()).collect()
    }

    /// Validate and run one model-requested call, returning text either way
    pub async fn call(&self, name: &str, arguments: &Value) -> String {
        let Some(capability) = self.capabilities.get(name) else {
            warn!(capability = %name, "Model requested a capability this agent does not have");
            return degraded_output(
                name,
                &CapabilityError::UnknownCapability(name.to_string()),
            );
        };

        let span = crate::capability_span!(capability = %name);
        async {
            let outcome = match validate_arguments(&capability.describe(), arguments) {
                Ok(()) => capability.invoke_with(arguments).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(text) => {
                    debug!(result_length = text.len(), "Capability succeeded");
                    text
                }
                Err(e) => {
                    warn!(error = %e, "Capability failed, degrading to error text");
                    degraded_output(capability.operation(), &e)
                }
            }
        }
        .instrument(span)
        .await
    }
}

impl CapabilitySet {
    /// Answer a call whose arguments the model sent as invalid JSON
    pub fn reject(&self, name: &str, reason: &str) -> String {
        let operation = self
            .capabilities
            .get(name)
            .map(|c| c.operation().to_string())
            .unwrap_or_else(|| name.to_string());
        warn!(capability = %name, reason = %reason, "Model sent unparseable capability arguments");
        degraded_output(&operation, &format!("invalid arguments: {reason}"))
    }
}

impl std::fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.capabilities.keys()).finish()
    }
}

/// Check model-supplied arguments against the capability's JSON schema
pub fn validate_arguments(
    description: &CapabilityDescription,
    arguments: &Value,
) -> Result<(), CapabilityError> {
    let validator = jsonschema::validator_for(&description.parameters)
        .map_err(|e| CapabilityError::SchemaError(format!("Schema compilation error: {e}")))?;

    validator.validate(arguments).map_err(|errors| {
        let messages: Vec<String> = errors
            .map(|e| format!("At '{}': {}", e.instance_path, e))
            .collect();
        CapabilityError::ValidationError(messages.join("; "))
    })
}

/// All capabilities declared in a crew file, built once and shared by agents
#[derive(Default)]
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every configured capability.
    ///
    /// `llm` backs the `generation` builtin; credentials supply API keys.
    pub fn from_config(
        configs: &HashMap<String, CapabilityConfig>,
        credentials: &Credentials,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Self, CapabilityError> {
        let mut registry = Self::new();
        for (name, config) in configs {
            let capability: Arc<dyn Capability> = match config.implementation() {
                "builtin" => builtin::create(name, config.settings(), credentials, llm.clone())?,
                other => return Err(CapabilityError::UnknownImplementation(other.to_string())),
            };
            registry.register(name.clone(), capability);
        }
        Ok(registry)
    }

    pub fn register(&mut self, name: impl Into<String>, capability: Arc<dyn Capability>) {
        self.capabilities.insert(name.into(), capability);
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.capabilities.keys().cloned().collect();
        names.sort();
        names
    }

    /// The subset bound to one agent
    pub fn select(&self, names: &[String]) -> Result<CapabilitySet, CapabilityError> {
        let mut set = CapabilitySet::new();
        for name in names {
            let capability = self
                .capabilities
                .get(name)
                .ok_or_else(|| CapabilityError::UnknownCapability(name.clone()))?;
            set.insert(capability.clone());
        }
        Ok(set)
    }
}
