//! Tasks
//!
//! A task is one unit of pipeline work bound to an agent. Its description and
//! expected output are templates rendered with the run inputs; the outputs of
//! the tasks it depends on are handed to the agent as context.

pub mod template;

pub use template::{inputs, RunInputs, Template, TemplateError};

use crate::agent::executor::TaskPrompt;
use crate::agent::Agent;
use crate::error::{CrewError, CrewResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Placed between dependency outputs when they are joined into context
pub const CONTEXT_DIVIDER: &str = "\n\n---\n\n";

#[derive(Debug)]
pub struct Task {
    id: String,
    description: Template,
    expected_output: Template,
    agent: Arc<Agent>,
    depends_on: Vec<String>,
    output_sink: Option<PathBuf>,
}

/// A task's templates rendered for one run
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedTask {
    pub task_id: String,
    pub goal: String,
    pub description: String,
    pub expected_output: String,
}

/// Result of one task; set once per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutput {
    pub task_id: String,
    pub agent_role: String,
    /// Rendered description the agent worked on
    pub description: String,
    pub raw: String,
    pub completed_at: DateTime<Utc>,
}

impl fmt::Display for TaskOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Task {
    pub fn new(id: impl Into<String>, description: &str, agent: Arc<Agent>) -> CrewResult<Self> {
        let id = id.into();
        let description = Template::parse(description)
            .map_err(|e| CrewError::construction(format!("task '{id}' description: {e}")))?;
        Ok(Self {
            id,
            description,
            expected_output: Template::default(),
            agent,
            depends_on: Vec::new(),
            output_sink: None,
        })
    }

    pub fn with_expected_output(mut self, expected_output: &str) -> CrewResult<Self> {
        self.expected_output = Template::parse(expected_output).map_err(|e| {
            CrewError::construction(format!("task '{}' expected_output: {e}", self.id))
        })?;
        Ok(self)
    }

    /// Ids of earlier tasks whose output this task receives, in order
    pub fn with_context<I, S>(mut self, depends_on: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = depends_on.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_sink = Some(path.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    pub fn output_sink(&self) -> Option<&Path> {
        self.output_sink.as_deref()
    }

    /// Substitute run inputs into the description, expected output and the
    /// agent's goal
    pub fn render(&self, inputs: &RunInputs) -> CrewResult<RenderedTask> {
        let description = self
            .description
            .render(inputs)
            .map_err(|e| CrewError::template(format!("task '{}' description", self.id), e))?;
        let expected_output = self
            .expected_output
            .render(inputs)
            .map_err(|e| CrewError::template(format!("task '{}' expected_output", self.id), e))?;
        let goal = self.agent.render_goal(inputs)?;

        Ok(RenderedTask {
            task_id: self.id.clone(),
            goal,
            description,
            expected_output,
        })
    }

    /// Delegate the rendered task to the agent, then write the output sink
    pub async fn execute(
        &self,
        rendered: &RenderedTask,
        context: &[&TaskOutput],
    ) -> CrewResult<TaskOutput> {
        let context = join_context(context);
        let prompt = TaskPrompt {
            task_id: &self.id,
            goal: &rendered.goal,
            description: &rendered.description,
            expected_output: &rendered.expected_output,
            context: context.as_deref(),
        };

        let raw = self.agent.perform(&prompt).await?;

        if let Some(path) = &self.output_sink {
            write_output(path, &raw).await?;
            info!(task_id = %self.id, path = %path.display(), "Task output written");
        }

        Ok(TaskOutput {
            task_id: self.id.clone(),
            agent_role: self.agent.role().to_string(),
            description: rendered.description.clone(),
            raw,
            completed_at: Utc::now(),
        })
    }
}

/// Join dependency outputs into one context block
pub fn join_context(outputs: &[&TaskOutput]) -> Option<String> {
    if outputs.is_empty() {
        return None;
    }
    Some(
        outputs
            .iter()
            .map(|output| output.raw.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_DIVIDER),
    )
}

/// Replace the file's content, creating parent directories as needed
async fn write_output(path: &Path, content: &str) -> CrewResult<()> {
    let to_error = |source| CrewError::OutputWrite {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(to_error)?;
    }
    tokio::fs::write(path, content).await.map_err(to_error)
}
