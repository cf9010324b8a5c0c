//! Agents
//!
//! An agent is a named role bound to a language model and a set of
//! capabilities. It has no behavior of its own beyond answering the task it is
//! handed; see [`executor`] for the conversation loop.

pub mod executor;

use crate::capabilities::CapabilitySet;
use crate::error::{CrewError, CrewResult};
use crate::llm::LlmProvider;
use crate::task::{RunInputs, Template};
use std::fmt;
use std::sync::Arc;

const DEFAULT_MAX_ITERATIONS: usize = 8;

/// Model parameters an agent sends with every request
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ModelSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Immutable after construction
pub struct Agent {
    id: String,
    role: String,
    goal: Template,
    backstory: String,
    capabilities: CapabilitySet,
    llm: Arc<dyn LlmProvider>,
    settings: ModelSettings,
    max_iterations: usize,
}

impl Agent {
    /// Build an agent; the goal may reference run inputs such as `{topic}`
    pub fn new(
        id: impl Into<String>,
        role: impl Into<String>,
        goal: &str,
        backstory: impl Into<String>,
        llm: Arc<dyn LlmProvider>,
    ) -> CrewResult<Self> {
        let id = id.into();
        let role = role.into();
        if role.trim().is_empty() {
            return Err(CrewError::construction(format!(
                "agent '{id}' needs a non-empty role"
            )));
        }
        let goal = Template::parse(goal).map_err(|e| {
            CrewError::construction(format!("agent '{id}' goal: {e}"))
        })?;

        Ok(Self {
            id,
            role,
            goal,
            backstory: backstory.into(),
            capabilities: CapabilitySet::new(),
            llm,
            settings: ModelSettings::new("gpt-4o-mini"),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        })
    }

    pub fn with_capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_settings(mut self, settings: ModelSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn backstory(&self) -> &str {
        &self.backstory
    }

    pub fn goal(&self) -> &Template {
        &self.goal
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn render_goal(&self, inputs: &RunInputs) -> CrewResult<String> {
        self.goal
            .render(inputs)
            .map_err(|e| CrewError::template(format!("agent '{}' goal", self.id), e))
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("capabilities", &self.capabilities)
            .field("llm", &self.llm.name())
            .field("model", &self.settings.model)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::inputs;
    use crate::testing::mocks::MockLlmProvider;

    fn llm() -> Arc<dyn LlmProvider> {
        Arc::new(MockLlmProvider::single_response("ok"))
    }

    #[test]
    fn test_empty_role_is_construction_error() {
        let err = Agent::new("writer", "  ", "Write", "", llm()).unwrap_err();
        assert!(matches!(err, CrewError::Construction { .. }));
    }

    #[test]
    fn test_bad_goal_template_is_construction_error() {
        let err = Agent::new("writer", "Writer", "Narrate {topic", "", llm()).unwrap_err();
        assert!(err.to_string().contains("agent 'writer' goal"));
    }

    #[test]
    fn test_render_goal() {
        let agent = Agent::new(
            "writer",
            "Writer",
            "Narrate compelling tech stories about {topic}",
            "You simplify complex topics.",
            llm(),
        )
        .unwrap();

        let goal = agent
            .render_goal(&inputs([("topic", "quantum computing")]))
            .unwrap();
        assert_eq!(goal, "Narrate compelling tech stories about quantum computing");
        assert!(agent.render_goal(&RunInputs::new()).is_err());
    }

    #[test]
    fn test_max_iterations_floor() {
        let agent = Agent::new("a", "Role", "goal", "", llm())
            .unwrap()
            .with_max_iterations(0);
        assert_eq!(agent.max_iterations(), 1);
    }
}
