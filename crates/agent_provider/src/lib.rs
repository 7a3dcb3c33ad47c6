//! Minimal contract between an analysis session and an external code-writing agent.
//!
//! This crate defines what the agent is given (a prompt plus a bound dataset) and
//! what it yields back (a finite, non-restartable sequence of execution steps).
//! Planning, code execution and model transport stay on the agent's side.

use std::fmt;
use std::path::PathBuf;
use std::sync::{atomic::AtomicBool, Arc};

use dataset::Table;
use serde_json::Value;

pub mod worker;

/// Identifier for one session run.
pub type RunId = u64;

/// Shared cancellation flag for a run.
pub type CancelSignal = Arc<AtomicBool>;

/// Lazily produced steps of one agent run. Exhaustion means the agent completed;
/// an `Err` item means the agent raised and no further items follow.
pub type StepStream = Box<dyn Iterator<Item = Result<ExecutionStep, AgentError>> + Send>;

/// Error raised by an agent, either while starting or mid-run.
///
/// Mid-run failures carry the last iteration the agent reported, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentError {
    message: String,
    iteration: Option<u32>,
}

impl AgentError {
    /// Creates a new agent error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            iteration: None,
        }
    }

    /// Records the last iteration completed before the failure.
    #[must_use]
    pub fn after_iteration(mut self, iteration: u32) -> Self {
        self.iteration = Some(iteration);
        self
    }

    /// Returns the underlying error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn iteration(&self) -> Option<u32> {
        self.iteration
    }
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(iteration) = self.iteration {
            write!(f, " (after iteration {iteration})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AgentError {}

/// Code the agent decided to execute during one iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAction {
    pub tool: String,
    pub code: String,
}

/// One pass of the agent's think/act/observe loop. Any part may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationStep {
    pub iteration: u32,
    pub thought: Option<String>,
    pub action: Option<CodeAction>,
    pub observation: Option<String>,
    pub error: Option<String>,
}

impl IterationStep {
    #[must_use]
    pub fn new(iteration: u32) -> Self {
        Self {
            iteration,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_thought(mut self, thought: impl Into<String>) -> Self {
        self.thought = Some(thought.into());
        self
    }

    #[must_use]
    pub fn with_action(mut self, tool: impl Into<String>, code: impl Into<String>) -> Self {
        self.action = Some(CodeAction {
            tool: tool.into(),
            code: code.into(),
        });
        self
    }

    #[must_use]
    pub fn with_observation(mut self, observation: impl Into<String>) -> Self {
        self.observation = Some(observation.into());
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// The agent's answer to the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalAnswer {
    Text(String),
    Image(PathBuf),
}

/// Event produced by the agent for one iteration of its reasoning loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionStep {
    Iteration(IterationStep),
    FinalAnswer(FinalAnswer),
    /// A step the agent adapter could not classify, kept with its raw payload.
    Unrecognized { kind: String, detail: Value },
}

impl ExecutionStep {
    /// Returns the iteration number for iteration steps.
    #[must_use]
    pub fn iteration(&self) -> Option<u32> {
        match self {
            Self::Iteration(step) => Some(step.iteration),
            Self::FinalAnswer(_) | Self::Unrecognized { .. } => None,
        }
    }

    /// Returns a short label naming the step shape, used for logging.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Iteration(_) => "iteration",
            Self::FinalAnswer(_) => "final_answer",
            Self::Unrecognized { kind, .. } => kind,
        }
    }
}

/// Input required to start an agent run.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub run_id: RunId,
    pub prompt: String,
    /// Dataset bound into the agent's interpreter as a ready-to-use value.
    pub data: Arc<Table>,
    /// Directory the agent is told to save figures into.
    pub figures_dir: PathBuf,
    pub cancel: CancelSignal,
}

/// Immutable metadata describing an agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentProfile {
    pub agent_id: String,
    pub model_id: String,
    /// Upper bound on reasoning iterations, enforced by the agent itself.
    pub max_iterations: u32,
}

/// Agent interface for executing one analysis request.
pub trait AnalysisAgent: Send + Sync + 'static {
    /// Returns agent/model identity metadata.
    fn profile(&self) -> AgentProfile;

    /// Starts a run and returns its step stream.
    ///
    /// Implementations must not perform work for step `n + 1` before the caller has
    /// pulled step `n`; [`worker::spawn_step_worker`] provides that guarantee for
    /// callback-style agents.
    fn start(&self, request: AgentRequest) -> Result<StepStream, AgentError>;
}
