//! Crew configuration
//!
//! A crew file is TOML describing the language model, capabilities, agents,
//! tasks, run inputs and reference documents of one pipeline:
//!
//! ```toml
//! [crew]
//! name = "tech-trends"
//! process = "sequential"
//!
//! [crew.inputs]
//! topic = "Enter topic"
//!
//! [llm]
//! model = "gpt-4o"
//!
//! [capabilities]
//! web_search = "builtin"
//!
//! [[agents]]
//! id = "researcher"
//! role = "Senior Researcher"
//! goal = "Uncover groundbreaking technologies in {topic}"
//! backstory = "Driven by curiosity."
//! capabilities = ["web_search"]
//!
//! [[tasks]]
//! id = "research"
//! agent = "researcher"
//! description = "Identify the next big trend in {topic}."
//! ```

use crate::capabilities::builtin;
use crate::pipeline::ProcessMode;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrewConfig {
    pub crew: CrewSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub capabilities: HashMap<String, CapabilityConfig>,
    #[serde(default)]
    pub documents: Vec<DocumentSource>,
    #[serde(default)]
    pub agents: Vec<AgentSpec>,
    #[serde(default)]
    pub tasks: Vec<TaskSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrewSection {
    /// Crew name (must match [a-zA-Z0-9._-]+)
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub process: ProcessMode,
    /// Placeholder name -> console prompt shown when the value is not given
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmSection {
    /// Only "openai" (any OpenAI-compatible endpoint) is supported
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable containing the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: None,
            temperature: None,
            max_tokens: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

/// Limits on the agent's capability-calling loop
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetConfig {
    /// Maximum model round trips per task
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

fn default_max_iterations() -> usize {
    8
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
        }
    }
}

/// Capability declaration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CapabilityConfig {
    /// Simple form: name = "builtin"
    Simple(String),
    /// Complex form: name = { impl = "builtin", config = { ... } }
    Complex {
        #[serde(rename = "impl")]
        implementation: String,
        #[serde(default)]
        config: HashMap<String, serde_json::Value>,
    },
}

impl CapabilityConfig {
    pub fn implementation(&self) -> &str {
        match self {
            CapabilityConfig::Simple(implementation) => implementation,
            CapabilityConfig::Complex { implementation, .. } => implementation,
        }
    }

    pub fn settings(&self) -> Option<&HashMap<String, serde_json::Value>> {
        match self {
            CapabilityConfig::Simple(_) => None,
            CapabilityConfig::Complex { config, .. } => Some(config),
        }
    }
}

/// A document fetched once before the run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSource {
    pub url: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSpec {
    pub id: String,
    pub role: String,
    /// May reference run inputs, e.g. "Narrate tech stories about {topic}"
    pub goal: String,
    #[serde(default)]
    pub backstory: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Overrides `llm.model` for this agent
    pub model: Option<String>,
    /// Overrides `llm.temperature` for this agent
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSpec {
    pub id: String,
    pub agent: String,
    pub description: String,
    #[serde(default)]
    pub expected_output: String,
    /// Ids of earlier tasks whose output this task receives
    #[serde(default)]
    pub context: Vec<String>,
    /// Result is written here, replacing existing content
    pub output_file: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid identifier: {0}")]
    InvalidId(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CrewConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: CrewConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks that need no network or credentials.
    ///
    /// Dependency order and template syntax are checked when the pipeline is
    /// assembled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_id("crew", &self.crew.name)?;

        if self.llm.provider != "openai" {
            return Err(ConfigError::InvalidConfig(format!(
                "Unsupported LLM provider: {}",
                self.llm.provider
            )));
        }
        if self.budget.max_iterations == 0 {
            return Err(ConfigError::InvalidConfig(
                "budget.max_iterations must be at least 1".to_string(),
            ));
        }
        if self.agents.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "at least one [[agents]] entry is required".to_string(),
            ));
        }
        if self.tasks.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "at least one [[tasks]] entry is required".to_string(),
            ));
        }

        let mut agent_ids = HashSet::new();
        for agent in &self.agents {
            validate_id("agent", &agent.id)?;
            if !agent_ids.insert(agent.id.as_str()) {
                return Err(ConfigError::InvalidConfig(format!(
                    "duplicate agent id '{}'",
                    agent.id
                )));
            }
            for capability in &agent.capabilities {
                if !self.capabilities.contains_key(capability) {
                    return Err(ConfigError::InvalidConfig(format!(
                        "agent '{}' uses undeclared capability '{}'",
                        agent.id, capability
                    )));
                }
            }
        }

        for task in &self.tasks {
            validate_id("task", &task.id)?;
            if !agent_ids.contains(task.agent.as_str()) {
                return Err(ConfigError::InvalidConfig(format!(
                    "task '{}' is assigned to unknown agent '{}'",
                    task.id, task.agent
                )));
            }
        }

        for document in &self.documents {
            url::Url::parse(&document.url).map_err(|e| {
                ConfigError::InvalidConfig(format!("document url '{}': {e}", document.url))
            })?;
        }

        Ok(())
    }

    /// Environment variables that must be set before anything is built
    pub fn required_env_vars(&self) -> Vec<String> {
        let mut names: Vec<String> = std::iter::once(self.llm.api_key_env.clone())
            .chain(
                self.capabilities
                    .iter()
                    .filter_map(|(name, cfg)| builtin::credential_env(name, cfg.settings())),
            )
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// Identifiers must match [a-zA-Z0-9._-]+
fn validate_id(kind: &str, id: &str) -> Result<(), ConfigError> {
    let valid_chars = id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');

    if id.is_empty() || !valid_chars {
        return Err(ConfigError::InvalidId(format!(
            "{kind} id '{id}' must match pattern [a-zA-Z0-9._-]+"
        )));
    }
    Ok(())
}
