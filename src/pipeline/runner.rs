//! Pipeline execution
//!
//! Every template is rendered before the first task runs, so a missing input
//! fails the run without any model or capability call. Tasks then run wave by
//! wave; within a wave they are polled concurrently on the caller's task.
//! The first failure aborts the run and no partial result is returned.

use super::Pipeline;
use crate::error::{CrewError, CrewResult};
use crate::task::{RenderedTask, RunInputs, TaskOutput};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{info, Instrument};
use uuid::Uuid;

/// Result of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    /// Output of the last declared task
    pub raw: String,
    /// Every task's output in declared order
    pub tasks_output: Vec<TaskOutput>,
}

impl fmt::Display for PipelineOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Pipeline {
    /// Run every task once with the given inputs
    pub async fn kickoff(&self, inputs: &RunInputs) -> CrewResult<PipelineOutput> {
        let run_id = Uuid::new_v4();
        let span = crate::pipeline_span!(
            pipeline = %self.name,
            run_id = %run_id,
            mode = ?self.mode,
            tasks = self.tasks.len()
        );
        Runner::new(self).run(inputs).instrument(span).await
    }
}

struct Runner<'p> {
    pipeline: &'p Pipeline,
    outputs: HashMap<String, TaskOutput>,
}

impl<'p> Runner<'p> {
    fn new(pipeline: &'p Pipeline) -> Self {
        Self {
            pipeline,
            outputs: HashMap::new(),
        }
    }

    async fn run(mut self, inputs: &RunInputs) -> CrewResult<PipelineOutput> {
        info!("Pipeline started");
        let rendered = self.render_all(inputs)?;

        for wave in self.pipeline.waves() {
            let outputs = self.execute_wave(&wave, &rendered).await?;
            for output in outputs {
                self.record(output)?;
            }
        }

        let output = self.finish()?;
        info!(result_length = output.raw.len(), "Pipeline completed");
        Ok(output)
    }

    fn render_all(&self, inputs: &RunInputs) -> CrewResult<Vec<RenderedTask>> {
        self.pipeline
            .tasks
            .iter()
            .map(|task| task.render(inputs))
            .collect()
    }

    async fn execute_wave(
        &self,
        wave: &[usize],
        rendered: &[RenderedTask],
    ) -> CrewResult<Vec<TaskOutput>> {
        let runs = wave.iter().map(|&index| {
            let task = &self.pipeline.tasks[index];
            let context: Vec<&TaskOutput> = task
                .depends_on()
                .iter()
                .filter_map(|dependency| self.outputs.get(dependency))
                .collect();
            let span = crate::task_span!(task = %task.id(), agent = %task.agent().role());
            async move {
                info!("Task started");
                let result = task.execute(&rendered[index], &context).await;
                if result.is_ok() {
                    info!("Task completed");
                }
                result
            }
            .instrument(span)
        });
        // Remaining tasks in the wave are dropped at the first error
        try_join_all(runs).await
    }

    fn record(&mut self, output: TaskOutput) -> CrewResult<()> {
        if self.outputs.contains_key(&output.task_id) {
            return Err(CrewError::execution(
                output.task_id,
                "task output recorded twice in one run",
            ));
        }
        self.outputs.insert(output.task_id.clone(), output);
        Ok(())
    }

    fn finish(mut self) -> CrewResult<PipelineOutput> {
        let mut tasks_output = Vec::with_capacity(self.pipeline.tasks.len());
        for task in &self.pipeline.tasks {
            let output = self.outputs.remove(task.id()).ok_or_else(|| {
                CrewError::execution(task.id(), "task finished without an output")
            })?;
            tasks_output.push(output);
        }

        let raw = tasks_output
            .last()
            .map(|output| output.raw.clone())
            .unwrap_or_default();
        Ok(PipelineOutput { raw, tasks_output })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::pipeline::ProcessMode;
    use crate::task::{inputs, Task};
    use crate::testing::mocks::MockLlmProvider;
    use std::sync::Arc;

    fn agent(role: &str, llm: Arc<MockLlmProvider>) -> Arc<Agent> {
        Arc::new(Agent::new(role.to_lowercase(), role, "Help with {topic}", "", llm).unwrap())
    }

    #[tokio::test]
    async fn test_sequential_returns_last_output() {
        let llm = Arc::new(MockLlmProvider::new(vec![
            "research notes".to_string(),
            "final article".to_string(),
        ]));
        let researcher = agent("Researcher", llm.clone());
        let writer = agent("Writer", llm.clone());
        let pipeline = Pipeline::new(
            "blog",
            vec![
                Task::new("research", "Research {topic}", researcher).unwrap(),
                Task::new("write", "Write about {topic}", writer)
                    .unwrap()
                    .with_context(["research"]),
            ],
            ProcessMode::Sequential,
        )
        .unwrap();

        let output = pipeline
            .kickoff(&inputs([("topic", "quantum computing")]))
            .await
            .unwrap();
        assert_eq!(output.raw, "final article");
        assert_eq!(output.to_string(), "final article");
        assert_eq!(output.tasks_output.len(), 2);
        assert_eq!(output.tasks_output[0].raw, "research notes");

        let requests = llm.requests().await;
        assert!(requests[1].messages[1].content.contains("research notes"));
    }

    #[tokio::test]
    async fn test_missing_input_fails_before_any_call() {
        let llm = Arc::new(MockLlmProvider::single_response("unused"));
        let pipeline = Pipeline::new(
            "blog",
            vec![
                Task::new("research", "Research", agent("Researcher", llm.clone())).unwrap(),
                Task::new("write", "Write about {subject}", agent("Writer", llm.clone())).unwrap(),
            ],
            ProcessMode::Sequential,
        )
        .unwrap();

        let err = pipeline
            .kickoff(&inputs([("topic", "x")]))
            .await
            .unwrap_err();
        assert!(matches!(err, CrewError::Template { .. }));
        assert!(llm.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_first_failure_aborts_run() {
        let failing = Arc::new(MockLlmProvider::with_failure());
        let healthy = Arc::new(MockLlmProvider::single_response("never"));
        let pipeline = Pipeline::new(
            "blog",
            vec![
                Task::new("research", "Research {topic}", agent("Researcher", failing)).unwrap(),
                Task::new("write", "Write {topic}", agent("Writer", healthy.clone())).unwrap(),
            ],
            ProcessMode::Sequential,
        )
        .unwrap();

        let err = pipeline.kickoff(&inputs([("topic", "x")])).await.unwrap_err();
        assert!(matches!(err, CrewError::Execution { ref task, .. } if task == "research"));
        assert!(healthy.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_parallel_mode_passes_context_across_waves() {
        let llm = Arc::new(MockLlmProvider::echo());
        let pipeline = Pipeline::new(
            "fanout",
            vec![
                Task::new("a", "alpha {topic}", agent("A", llm.clone())).unwrap(),
                Task::new("b", "beta {topic}", agent("B", llm.clone())).unwrap(),
                Task::new("c", "gamma", agent("C", llm.clone()))
                    .unwrap()
                    .with_context(["a", "b"]),
            ],
            ProcessMode::Parallel,
        )
        .unwrap();

        let output = pipeline.kickoff(&inputs([("topic", "x")])).await.unwrap();
        assert_eq!(output.tasks_output.len(), 3);
        assert_eq!(output.tasks_output[2].task_id, "c");
        assert!(output.raw.contains("Current Task: alpha x"));
        assert!(output.raw.contains("Current Task: beta x"));
    }

    #[tokio::test]
    async fn test_parallel_failure_stops_rest_of_wave() {
        let dir = tempfile::tempdir().unwrap();
        let sink = dir.path().join("summary.md");
        let healthy = Arc::new(MockLlmProvider::single_response("summary"));
        let pipeline = Pipeline::new(
            "fanout",
            vec![
                Task::new(
                    "research",
                    "Research {topic}",
                    agent("Researcher", Arc::new(MockLlmProvider::with_failure())),
                )
                .unwrap(),
                Task::new("summarize", "Summarize {topic}", agent("Writer", healthy.clone()))
                    .unwrap()
                    .with_output_file(&sink),
            ],
            ProcessMode::Parallel,
        )
        .unwrap();
        assert_eq!(pipeline.waves(), vec![vec![0, 1]]);

        let err = pipeline.kickoff(&inputs([("topic", "x")])).await.unwrap_err();
        assert!(matches!(err, CrewError::Execution { ref task, .. } if task == "research"));
        assert!(healthy.requests().await.is_empty());
        assert!(!sink.exists());
    }
}
