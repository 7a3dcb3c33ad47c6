//! Session loop for a chat-style data analyst backed by a code-writing agent.
//!
//! Invariant: a run's figures directory is reset before the agent starts, and every
//! image found in it is surfaced exactly once, right after the step that produced it.
//!
//! # Public API Overview
//! - Start runs with [`SessionDriver::interact`] and iterate the returned [`Session`] for
//!   [`Snapshot`]s of the growing transcript.
//! - Build messages and inspect snapshots via [`message`].
//! - Scan and reset figure directories with [`artifacts::scan`] and [`workspace::reset`].
//! - Map raw agent steps to messages with [`normalize::normalize`].
//! - Configure runs through [`SessionConfig`].

pub mod artifacts;
pub mod config;
pub mod error;
pub mod message;
pub mod normalize;
pub mod prompt;
pub mod session;
pub mod workspace;

pub use crate::artifacts::{media_type_for, scan, ArtifactSet, IMAGE_EXTENSIONS};
pub use crate::config::SessionConfig;
pub use crate::error::{ConfigError, FailureKind, SessionError};
pub use crate::message::{ArtifactRef, Message, MessageKind, Payload, Role, Snapshot, SnapshotPhase};
pub use crate::normalize::normalize;
pub use crate::prompt::{build_prompt, TASK_TEMPLATE};
pub use crate::session::{Session, SessionDriver};

pub use agent_provider::{AgentError, AnalysisAgent, ExecutionStep, RunId};
