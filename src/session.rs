//! Drives one agent run and yields transcript snapshots as it progresses.
//!
//! A [`Session`] is a pull-based state machine. The first `next()` prepares the run
//! (workspace reset, dataset load, prompt, agent start); every following call pulls
//! exactly one agent step, appends its messages and any images that appeared in the
//! figures directory, and yields the full transcript so far. The run ends after one
//! terminal snapshot.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use agent_provider::{AgentRequest, AnalysisAgent, CancelSignal, ExecutionStep, RunId, StepStream};
use dataset::structure_summary;
use tracing::{debug, error, info, info_span, Span};

use crate::artifacts::{self, media_type_for, ArtifactSet};
use crate::config::SessionConfig;
use crate::error::{FailureKind, SessionError};
use crate::message::{ArtifactRef, Message, Snapshot, SnapshotPhase};
use crate::normalize::normalize;
use crate::prompt::build_prompt;
use crate::workspace;

/// Starts runs against one agent with a shared configuration.
///
/// Runs sharing a figures directory must not overlap; the driver does not lock it.
pub struct SessionDriver {
    agent: Arc<dyn AnalysisAgent>,
    config: Arc<SessionConfig>,
    next_run_id: AtomicU64,
}

impl SessionDriver {
    #[must_use]
    pub fn new(agent: Arc<dyn AnalysisAgent>, config: SessionConfig) -> Self {
        Self {
            agent,
            config: Arc::new(config),
            next_run_id: AtomicU64::new(1),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Creates a run for `request` over the CSV at `dataset_path`.
    ///
    /// Nothing happens until the returned session is first polled.
    pub fn interact(&self, dataset_path: impl Into<PathBuf>, request: impl Into<String>) -> Session {
        let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed);
        let context = RunContext {
            run_id,
            workspace: self.config.figures_dir.clone(),
            dataset_path: dataset_path.into(),
            request: request.into(),
            prompt: None,
            artifacts: ArtifactSet::new(),
            cancel: Arc::new(AtomicBool::new(false)),
        };

        Session {
            agent: Arc::clone(&self.agent),
            config: Arc::clone(&self.config),
            span: info_span!("run", run_id),
            context,
            transcript: Vec::new(),
            state: RunState::Preparing,
        }
    }
}

struct RunContext {
    run_id: RunId,
    workspace: PathBuf,
    dataset_path: PathBuf,
    request: String,
    prompt: Option<String>,
    artifacts: ArtifactSet,
    cancel: CancelSignal,
}

enum RunState {
    Preparing,
    Running(StepStream),
    Done,
    Failed(FailureKind),
}

/// One run's snapshot sequence. Dropping it early cancels the agent.
pub struct Session {
    agent: Arc<dyn AnalysisAgent>,
    config: Arc<SessionConfig>,
    span: Span,
    context: RunContext,
    transcript: Vec<Message>,
    state: RunState,
}

impl Session {
    #[must_use]
    pub fn run_id(&self) -> RunId {
        self.context.run_id
    }

    /// Permanent transcript so far, without any placeholder.
    #[must_use]
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    /// Prompt handed to the agent, once preparation succeeded.
    #[must_use]
    pub fn prompt(&self) -> Option<&str> {
        self.context.prompt.as_deref()
    }

    #[must_use]
    pub fn figures_dir(&self) -> &Path {
        &self.context.workspace
    }

    /// Phase of the most recent snapshot, or `None` before the first poll.
    #[must_use]
    pub fn phase(&self) -> Option<SnapshotPhase> {
        match self.state {
            RunState::Preparing => None,
            RunState::Running(_) => Some(SnapshotPhase::InProgress),
            RunState::Done => Some(SnapshotPhase::Done),
            RunState::Failed(kind) => Some(SnapshotPhase::Failed(kind)),
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self.state, RunState::Done | RunState::Failed(_))
    }

    fn prepare(&mut self) -> Snapshot {
        info!(
            dataset = %self.context.dataset_path.display(),
            figures_dir = %self.context.workspace.display(),
            "starting run"
        );
        self.transcript
            .push(Message::user_text(self.context.request.as_str()));

        match self.try_prepare() {
            Ok(steps) => {
                self.state = RunState::Running(steps);
                self.in_progress(&self.config.starting_text)
            }
            Err(error) => self.fail(error),
        }
    }

    fn try_prepare(&mut self) -> Result<StepStream, SessionError> {
        workspace::reset(&self.context.workspace)?;

        let table = dataset::load_csv(&self.context.dataset_path)?;
        let (rows, columns) = table.shape();
        debug!(rows, columns, "dataset loaded");

        let prompt = build_prompt(
            &self.config.task_template,
            &self.context.workspace,
            &structure_summary(&table),
            &self.context.request,
        );
        self.context.prompt = Some(prompt.clone());

        let profile = self.agent.profile();
        debug!(agent = %profile.agent_id, model = %profile.model_id, "starting agent");
        let steps = self.agent.start(AgentRequest {
            run_id: self.context.run_id,
            prompt,
            data: Arc::new(table),
            figures_dir: self.context.workspace.clone(),
            cancel: Arc::clone(&self.context.cancel),
        })?;
        Ok(steps)
    }

    fn on_step(&mut self, step: ExecutionStep) -> Snapshot {
        debug!(step = step.label(), iteration = ?step.iteration(), "agent step");
        for message in normalize(step) {
            // Image answers share the run's emitted set with scanned figures.
            if let Some(artifact) = message.artifact() {
                if !self.context.artifacts.mark_emitted(artifact.path()) {
                    debug!(artifact = %artifact.path().display(), "artifact already shown");
                    continue;
                }
            }
            self.transcript.push(message);
        }
        self.collect_artifacts();
        self.in_progress(&self.config.processing_text)
    }

    fn finish(&mut self) -> Snapshot {
        self.collect_artifacts();
        self.state = RunState::Done;
        info!(
            messages = self.transcript.len(),
            artifacts = self.context.artifacts.len(),
            "run finished"
        );
        self.snapshot(SnapshotPhase::Done)
    }

    fn fail(&mut self, failure: SessionError) -> Snapshot {
        let kind = failure.kind();
        error!(failure = %kind, error = %failure, "run failed");
        self.transcript.push(Message::error(kind, failure.to_string()));
        self.state = RunState::Failed(kind);
        self.snapshot(SnapshotPhase::Failed(kind))
    }

    fn collect_artifacts(&mut self) {
        let scanned = artifacts::scan(&self.context.workspace);
        for path in self.context.artifacts.take_new(scanned) {
            debug!(artifact = %path.display(), "new artifact");
            let media_type = media_type_for(&path).unwrap_or(artifacts::FALLBACK_MEDIA_TYPE);
            self.transcript
                .push(Message::image(ArtifactRef::new(path, media_type)));
        }
    }

    fn in_progress(&self, placeholder: &str) -> Snapshot {
        let mut messages = self.transcript.clone();
        messages.push(Message::status(placeholder));
        Snapshot {
            run_id: self.context.run_id,
            messages,
            phase: SnapshotPhase::InProgress,
        }
    }

    fn snapshot(&self, phase: SnapshotPhase) -> Snapshot {
        Snapshot {
            run_id: self.context.run_id,
            messages: self.transcript.clone(),
            phase,
        }
    }
}

impl Iterator for Session {
    type Item = Snapshot;

    fn next(&mut self) -> Option<Self::Item> {
        let span = self.span.clone();
        let _entered = span.enter();

        match &mut self.state {
            RunState::Preparing => Some(self.prepare()),
            RunState::Running(steps) => match steps.next() {
                Some(Ok(step)) => Some(self.on_step(step)),
                Some(Err(error)) => Some(self.fail(SessionError::from(error))),
                None => Some(self.finish()),
            },
            RunState::Done | RunState::Failed(_) => None,
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.is_finished() {
            return;
        }

        self.context.cancel.store(true, Ordering::SeqCst);
        let _entered = self.span.enter();
        debug!("session dropped before completion; agent cancelled");
    }
}
