//! Deterministic scripted implementation of the shared `agent_provider` contract.
//!
//! The agent replays a fixed script of steps and file writes. It performs no
//! planning or code execution and is intended for local demos and session-level
//! integration testing.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use agent_provider::worker::spawn_step_worker;
use agent_provider::{
    AgentError, AgentProfile, AgentRequest, AnalysisAgent, CancelSignal, ExecutionStep,
    FinalAnswer, IterationStep, StepStream,
};
use dataset::{render_dtypes, Table};

/// Stable agent identifier used for explicit startup selection.
pub const MOCK_AGENT_ID: &str = "mock";

/// Iteration ceiling used when none is configured.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// In-step error emitted when the script runs past the iteration ceiling.
pub const MAX_ITERATIONS_ERROR: &str = "Reached max iterations.";

/// Tool name reported for scripted code actions.
pub const INTERPRETER_TOOL: &str = "python_interpreter";

/// 1x1 transparent PNG used by the demo script.
pub const PLACEHOLDER_PNG: [u8; 67] = [
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

const PAUSE_SLICE_MS: u64 = 10;

/// One scripted action, replayed in order.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptAction {
    /// Yields a step to the session.
    Emit(ExecutionStep),
    /// Writes a file relative to the request's figures directory.
    WriteFigure { name: String, bytes: Vec<u8> },
    /// Emits an iteration that inspects the bound dataset's shape and dtypes.
    InspectData { iteration: u32 },
    /// Sleeps, waking early when the run is cancelled.
    Pause(Duration),
    /// Ends the run with an error.
    Fail(String),
}

impl ScriptAction {
    #[must_use]
    pub fn png(name: impl Into<String>) -> Self {
        Self::WriteFigure {
            name: name.into(),
            bytes: PLACEHOLDER_PNG.to_vec(),
        }
    }
}

/// Deterministic scripted agent used by session tests and local runs.
#[derive(Debug)]
pub struct ScriptedAgent {
    script: Arc<[ScriptAction]>,
    model_id: String,
    max_iterations: u32,
    starts: AtomicUsize,
}

impl ScriptedAgent {
    /// Creates an agent replaying `script` with the default iteration ceiling.
    #[must_use]
    pub fn new(script: Vec<ScriptAction>) -> Self {
        Self {
            script: script.into(),
            model_id: "scripted".to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            starts: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    #[must_use]
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        let model_id = model_id.into();
        if !model_id.trim().is_empty() {
            self.model_id = model_id.trim().to_string();
        }
        self
    }

    /// Number of runs started so far.
    #[must_use]
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedAgent {
    fn default() -> Self {
        Self::new(vec![
            ScriptAction::Emit(ExecutionStep::Iteration(
                IterationStep::new(1).with_thought(
                    "I will start by checking the shape and column types of the dataframe.",
                ),
            )),
            ScriptAction::InspectData { iteration: 1 },
            ScriptAction::Pause(Duration::from_millis(150)),
            ScriptAction::png("overview.png"),
            ScriptAction::Emit(ExecutionStep::Iteration(
                IterationStep::new(2)
                    .with_thought("Next I will plot row counts per column to spot missing values.")
                    .with_action(
                        INTERPRETER_TOOL,
                        "import matplotlib.pyplot as plt\n\
                         data_file.count().plot(kind='bar')\n\
                         plt.savefig('./figures/overview.png')\n\
                         plt.clf()",
                    )
                    .with_observation("Saved ./figures/overview.png"),
            )),
            ScriptAction::Pause(Duration::from_millis(150)),
            ScriptAction::Emit(ExecutionStep::FinalAnswer(FinalAnswer::Text(
                "The overview chart shows non-missing counts for every column.".to_string(),
            ))),
        ])
    }
}

impl AnalysisAgent for ScriptedAgent {
    fn profile(&self) -> AgentProfile {
        AgentProfile {
            agent_id: MOCK_AGENT_ID.to_string(),
            model_id: self.model_id.clone(),
            max_iterations: self.max_iterations,
        }
    }

    fn start(&self, request: AgentRequest) -> Result<StepStream, AgentError> {
        self.starts.fetch_add(1, Ordering::SeqCst);

        let script = Arc::clone(&self.script);
        let max_iterations = self.max_iterations;
        let AgentRequest {
            run_id,
            data,
            figures_dir,
            cancel,
            ..
        } = request;

        spawn_step_worker(
            format!("mock-agent-run-{run_id}"),
            cancel,
            move |cancel, emit| {
                let mut replay = Replay {
                    max_iterations,
                    iterations: 0,
                    data: &data,
                    figures_dir: &figures_dir,
                    cancel: &cancel,
                };
                replay.run(&script, emit)
            },
        )
    }
}

struct Replay<'a> {
    max_iterations: u32,
    iterations: u32,
    data: &'a Table,
    figures_dir: &'a Path,
    cancel: &'a CancelSignal,
}

impl Replay<'_> {
    fn run(
        &mut self,
        script: &[ScriptAction],
        emit: &mut dyn FnMut(ExecutionStep),
    ) -> Result<(), String> {
        for (index, action) in script.iter().enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                return Ok(());
            }

            match action {
                ScriptAction::Emit(step @ ExecutionStep::Iteration(_)) => {
                    if !self.admit_iteration(&script[index..], emit) {
                        return Ok(());
                    }
                    emit(step.clone());
                }
                ScriptAction::Emit(step) => emit(step.clone()),
                ScriptAction::InspectData { iteration } => {
                    if !self.admit_iteration(&script[index..], emit) {
                        return Ok(());
                    }
                    emit(self.inspect_data(*iteration));
                }
                ScriptAction::WriteFigure { name, bytes } => self.write_figure(name, bytes)?,
                ScriptAction::Pause(duration) => self.pause(*duration),
                ScriptAction::Fail(message) => return Err(message.clone()),
            }
        }

        Ok(())
    }

    /// Counts one iteration, or emits the ceiling error plus any remaining final answer.
    fn admit_iteration(
        &mut self,
        remaining: &[ScriptAction],
        emit: &mut dyn FnMut(ExecutionStep),
    ) -> bool {
        if self.iterations < self.max_iterations {
            self.iterations += 1;
            return true;
        }

        emit(ExecutionStep::Iteration(
            IterationStep::new(self.max_iterations + 1).with_error(MAX_ITERATIONS_ERROR),
        ));

        let final_answer = remaining.iter().find_map(|action| match action {
            ScriptAction::Emit(step @ ExecutionStep::FinalAnswer(_)) => Some(step.clone()),
            _ => None,
        });
        if let Some(final_answer) = final_answer {
            emit(final_answer);
        }

        false
    }

    fn inspect_data(&self, iteration: u32) -> ExecutionStep {
        let (rows, columns) = self.data.shape();
        ExecutionStep::Iteration(
            IterationStep::new(iteration)
                .with_action(
                    INTERPRETER_TOOL,
                    "print(data_file.shape)\nprint(data_file.dtypes)",
                )
                .with_observation(format!(
                    "({rows}, {columns})\n{}",
                    render_dtypes(self.data)
                )),
        )
    }

    fn write_figure(&self, name: &str, bytes: &[u8]) -> Result<(), String> {
        let path = self.figures_dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|error| {
                format!("Failed to create figure directory {}: {error}", parent.display())
            })?;
        }

        fs::write(&path, bytes)
            .map_err(|error| format!("Failed to write figure {}: {error}", path.display()))
    }

    fn pause(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while !self.cancel.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            thread::sleep((deadline - now).min(Duration::from_millis(PAUSE_SLICE_MS)));
        }
    }
}
