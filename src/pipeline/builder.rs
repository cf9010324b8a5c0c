//! Assemble a [`Pipeline`] from a crew file
//!
//! Construction order: language model, capability registry, agents, tasks,
//! pipeline. Any failure here is fatal before the run starts.

use super::Pipeline;
use crate::agent::{Agent, ModelSettings};
use crate::capabilities::CapabilityRegistry;
use crate::config::{ConfigError, CrewConfig};
use crate::credentials::Credentials;
use crate::error::{CrewError, CrewResult};
use crate::llm::{LlmError, LlmProvider, OpenAiConfig, OpenAiProvider, DEFAULT_OPENAI_BASE_URL};
use crate::task::Task;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub struct CrewBuilder<'a> {
    config: &'a CrewConfig,
    credentials: &'a Credentials,
    llm: Option<Arc<dyn LlmProvider>>,
}

impl<'a> CrewBuilder<'a> {
    pub fn new(config: &'a CrewConfig, credentials: &'a Credentials) -> Self {
        Self {
            config,
            credentials,
            llm: None,
        }
    }

    /// Use this provider instead of building an OpenAI client
    pub fn with_llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn build(self) -> CrewResult<Pipeline> {
        let llm = match self.llm.clone() {
            Some(llm) => llm,
            None => self.create_llm()?,
        };

        let registry =
            CapabilityRegistry::from_config(&self.config.capabilities, self.credentials, llm.clone())?;
        debug!(capabilities = ?registry.list(), "Capabilities ready");

        let mut agents: HashMap<&str, Arc<Agent>> = HashMap::new();
        for spec in &self.config.agents {
            let capabilities = registry
                .select(&spec.capabilities)
                .map_err(|e| CrewError::construction(format!("agent '{}': {e}", spec.id)))?;
            let settings = ModelSettings {
                model: spec
                    .model
                    .clone()
                    .unwrap_or_else(|| self.config.llm.model.clone()),
                temperature: spec.temperature.or(self.config.llm.temperature),
                max_tokens: self.config.llm.max_tokens,
            };
            let agent = Agent::new(&spec.id, &spec.role, &spec.goal, &spec.backstory, llm.clone())?
                .with_capabilities(capabilities)
                .with_settings(settings)
                .with_max_iterations(self.config.budget.max_iterations);
            agents.insert(spec.id.as_str(), Arc::new(agent));
        }

        let mut tasks = Vec::with_capacity(self.config.tasks.len());
        for spec in &self.config.tasks {
            let agent = agents.get(spec.agent.as_str()).cloned().ok_or_else(|| {
                CrewError::construction(format!(
                    "task '{}' is assigned to unknown agent '{}'",
                    spec.id, spec.agent
                ))
            })?;
            let mut task = Task::new(&spec.id, &spec.description, agent)?
                .with_expected_output(&spec.expected_output)?
                .with_context(spec.context.iter().cloned());
            if let Some(path) = &spec.output_file {
                task = task.with_output_file(path);
            }
            tasks.push(task);
        }

        let pipeline = Pipeline::new(&self.config.crew.name, tasks, self.config.crew.process)?;
        info!(
            crew = %pipeline.name(),
            agents = agents.len(),
            tasks = pipeline.tasks().len(),
            mode = ?pipeline.mode(),
            "Crew assembled"
        );
        Ok(pipeline)
    }

    fn create_llm(&self) -> CrewResult<Arc<dyn LlmProvider>> {
        let section = &self.config.llm;
        let api_key = self.credentials.get(&section.api_key_env)?;
        let provider = OpenAiProvider::new(OpenAiConfig {
            api_key: api_key.to_string(),
            base_url: section
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            timeout: Duration::from_secs(section.timeout_secs),
        })
        .map_err(|e| match e {
            LlmError::NotConfigured(_) => {
                CrewError::Config(ConfigError::EnvVarNotFound(section.api_key_env.clone()))
            }
            other => CrewError::construction(format!("LLM provider: {other}")),
        })?;
        Ok(Arc::new(provider))
    }
}
