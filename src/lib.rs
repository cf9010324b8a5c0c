//! taskcrew - sequential multi-agent task pipelines
//!
//! A crew is a handful of agents (a role, a goal, a backstory and a set of
//! capabilities backed by a language model) and an ordered list of tasks
//! assigned to them. Running the crew renders every task template with the
//! run inputs, executes the tasks in dependency order, hands each task the
//! outputs of the tasks it depends on, and returns the last task's output.
//!
//! # Overview
//!
//! - [`config`]: TOML crew files
//! - [`credentials`]: API keys resolved once at startup
//! - [`llm`]: chat-completion providers
//! - [`capabilities`]: web search, document retrieval and generation
//! - [`agent`], [`task`], [`pipeline`]: the pipeline itself
//! - [`download`]: reference documents fetched before a run
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use taskcrew::testing::MockLlmProvider;
//! use taskcrew::{inputs, Agent, Pipeline, ProcessMode, Task};
//!
//! # tokio_test::block_on(async {
//! let llm = Arc::new(MockLlmProvider::new(vec![
//!     "Error-corrected qubits are the next big trend.".to_string(),
//!     "Quantum computing is entering its fault-tolerant era.".to_string(),
//! ]));
//! let researcher = Arc::new(
//!     Agent::new("researcher", "Senior Researcher", "Uncover trends in {topic}", "", llm.clone())
//!         .unwrap(),
//! );
//! let writer = Arc::new(
//!     Agent::new("writer", "Writer", "Narrate stories about {topic}", "", llm).unwrap(),
//! );
//!
//! let pipeline = Pipeline::new(
//!     "tech-trends",
//!     vec![
//!         Task::new("research", "Identify the next big trend in {topic}.", researcher).unwrap(),
//!         Task::new("write", "Compose an article on {topic}.", writer)
//!             .unwrap()
//!             .with_context(["research"]),
//!     ],
//!     ProcessMode::Sequential,
//! )
//! .unwrap();
//!
//! let output = pipeline
//!     .kickoff(&inputs([("topic", "quantum computing")]))
//!     .await
//!     .unwrap();
//! assert_eq!(output.raw, "Quantum computing is entering its fault-tolerant era.");
//! # });
//! ```

pub mod agent;
pub mod capabilities;
pub mod config;
pub mod credentials;
pub mod download;
pub mod error;
pub mod llm;
pub mod observability;
pub mod pipeline;
pub mod task;
pub mod testing;

pub use agent::{Agent, ModelSettings};
pub use capabilities::{Capability, CapabilityDescription, CapabilityError, CapabilitySet};
pub use config::{ConfigError, CrewConfig};
pub use credentials::Credentials;
pub use error::{CrewError, CrewResult, ErrorKind};
pub use pipeline::{CrewBuilder, Pipeline, PipelineOutput, ProcessMode};
pub use task::{inputs, RunInputs, Task, TaskOutput, TemplateError};
