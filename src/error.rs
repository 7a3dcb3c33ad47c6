use std::fmt;
use std::path::PathBuf;

use agent_provider::AgentError;
use dataset::DatasetError;
use thiserror::Error;

/// Terminal failure categories surfaced to the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    WorkspaceReset,
    DatasetLoad,
    AgentExecution,
}

impl FailureKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WorkspaceReset => "WorkspaceResetFailure",
            Self::DatasetLoad => "DatasetLoadFailure",
            Self::AgentExecution => "AgentExecutionFailure",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("I/O error while {operation} at {path}: {source}")]
    WorkspaceReset {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    DatasetLoad(#[from] DatasetError),

    #[error("agent execution failed: {0}")]
    AgentExecution(#[from] AgentError),
}

impl SessionError {
    #[must_use]
    pub fn workspace(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::WorkspaceReset {
            operation,
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::WorkspaceReset { .. } => FailureKind::WorkspaceReset,
            Self::DatasetLoad(_) => FailureKind::DatasetLoad,
            Self::AgentExecution(_) => FailureKind::AgentExecution,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config JSON at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("task template must contain the {slot} slot")]
    MissingTemplateSlot { slot: &'static str },
}
