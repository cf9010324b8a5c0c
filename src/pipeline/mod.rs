//! Pipelines
//!
//! An ordered list of tasks with dependencies pointing strictly backwards.
//! [`runner`] executes one, [`builder`] assembles one from a crew file.

pub mod builder;
pub mod runner;

pub use builder::CrewBuilder;
pub use runner::PipelineOutput;

use crate::error::{CrewError, CrewResult};
use crate::task::Task;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessMode {
    /// One task at a time in declared order
    #[default]
    Sequential,
    /// Tasks whose dependencies are complete run concurrently
    Parallel,
}

#[derive(Debug)]
pub struct Pipeline {
    name: String,
    tasks: Vec<Task>,
    mode: ProcessMode,
}

impl Pipeline {
    /// Validate task ids and dependency order
    pub fn new(name: impl Into<String>, tasks: Vec<Task>, mode: ProcessMode) -> CrewResult<Self> {
        let name = name.into();
        if tasks.is_empty() {
            return Err(CrewError::construction(format!(
                "pipeline '{name}' has no tasks"
            )));
        }

        validate_order(&tasks)?;
        Ok(Self { name, tasks, mode })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn mode(&self) -> ProcessMode {
        self.mode
    }

    /// Task indices grouped into execution waves.
    ///
    /// Sequential mode yields one task per wave. Parallel mode puts each task
    /// in the wave after its latest dependency.
    pub fn waves(&self) -> Vec<Vec<usize>> {
        match self.mode {
            ProcessMode::Sequential => (0..self.tasks.len()).map(|i| vec![i]).collect(),
            ProcessMode::Parallel => {
                let mut level: HashMap<&str, usize> = HashMap::new();
                let mut waves: Vec<Vec<usize>> = Vec::new();
                for (index, task) in self.tasks.iter().enumerate() {
                    let wave = task
                        .depends_on()
                        .iter()
                        .filter_map(|dep| level.get(dep.as_str()))
                        .map(|l| l + 1)
                        .max()
                        .unwrap_or(0);
                    level.insert(task.id(), wave);
                    if waves.len() <= wave {
                        waves.resize_with(wave + 1, Vec::new);
                    }
                    waves[wave].push(index);
                }
                waves
            }
        }
    }
}

/// Every dependency must name a task declared earlier; ids must be unique
fn validate_order(tasks: &[Task]) -> CrewResult<()> {
    let mut declared: HashSet<&str> = HashSet::new();
    for task in tasks {
        for dependency in task.depends_on() {
            if !declared.contains(dependency.as_str()) {
                return Err(CrewError::DependencyOrder {
                    task: task.id().to_string(),
                    dependency: dependency.clone(),
                });
            }
        }
        if !declared.insert(task.id()) {
            return Err(CrewError::construction(format!(
                "duplicate task id '{}'",
                task.id()
            )));
        }
    }
    Ok(())
}
