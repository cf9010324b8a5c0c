//! Crate-level error type
//!
//! Every layer reports a typed error; `main` is the single place that turns
//! one into console output and an exit code.

use crate::capabilities::CapabilityError;
use crate::config::ConfigError;
use crate::download::DownloadError;
use crate::task::TemplateError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrewError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Construction failed: {message}")]
    Construction { message: String },

    #[error("Template error in {location}: {source}")]
    Template {
        location: String,
        #[source]
        source: TemplateError,
    },

    #[error("Task '{task}' depends on '{dependency}', which is not declared before it")]
    DependencyOrder { task: String, dependency: String },

    #[error("Pipeline execution failed in task '{task}': {message}")]
    Execution { task: String, message: String },

    #[error("Capability setup failed: {0}")]
    Capability(#[from] CapabilityError),

    #[error("Document download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("Failed to write output file {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure classes deciding how the top-level handler reacts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing credential or unreadable configuration
    Configuration,
    /// Agents, tasks or the pipeline could not be assembled
    Construction,
    /// The run itself failed
    PipelineExecution,
}

impl CrewError {
    pub fn construction<S: Into<String>>(message: S) -> Self {
        Self::Construction {
            message: message.into(),
        }
    }

    pub fn execution<T: Into<String>, S: Into<String>>(task: T, message: S) -> Self {
        Self::Execution {
            task: task.into(),
            message: message.into(),
        }
    }

    pub fn template<S: Into<String>>(location: S, source: TemplateError) -> Self {
        Self::Template {
            location: location.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CrewError::Config(_) => ErrorKind::Configuration,
            CrewError::Construction { .. }
            | CrewError::DependencyOrder { .. }
            | CrewError::Capability(_) => ErrorKind::Construction,
            CrewError::Template { .. }
            | CrewError::Execution { .. }
            | CrewError::Download(_)
            | CrewError::OutputWrite { .. } => ErrorKind::PipelineExecution,
        }
    }

    /// Every fatal class exits with status 1
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Message safe to print: secrets redacted, length capped
    pub fn console_message(&self) -> String {
        sanitize_error_message(&self.to_string())
    }
}

/// Result type for crew operations
pub type CrewResult<T> = Result<T, CrewError>;

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+")
        .expect("secret pattern is valid")
});

static OPENAI_KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"sk-[A-Za-z0-9_-]{8,}").expect("key pattern is valid"));

const MAX_MESSAGE_LEN: usize = 500;

/// Redact credentials and cap message length
pub fn sanitize_error_message(message: &str) -> String {
    let redacted = SECRET_PATTERN.replace_all(message, "${1}=***");
    let mut sanitized = OPENAI_KEY_PATTERN
        .replace_all(&redacted, "sk-***")
        .into_owned();

    if sanitized.len() > MAX_MESSAGE_LEN {
        let suffix = "...[truncated]";
        let mut cut = MAX_MESSAGE_LEN - suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
        sanitized.push_str(suffix);
    }

    sanitized
}
