//! Lockstep adapter turning a callback-style agent body into a pulled [`StepStream`].
//!
//! The body runs on its own named thread but only advances while the consumer is
//! waiting for a step: it starts on the first pull, and each `emit` blocks until the
//! consumer asks for the next step. Side effects of step `n + 1` therefore cannot
//! happen before the consumer has finished handling step `n`.

use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::{AgentError, CancelSignal, ExecutionStep, StepStream};

enum WorkerMessage {
    Step(ExecutionStep),
    Finished,
    Failed(AgentError),
}

struct StepWorker {
    steps: Receiver<WorkerMessage>,
    resume: Option<SyncSender<()>>,
    cancel: CancelSignal,
    join_handle: Option<JoinHandle<()>>,
    done: bool,
}

/// Spawns `body` on a worker thread and returns its steps as a lockstep stream.
///
/// Dropping the stream before it is exhausted sets `cancel`; bodies are expected to
/// poll it between steps. `emit` becomes a no-op once the run is cancelled.
pub fn spawn_step_worker<F>(
    name: impl Into<String>,
    cancel: CancelSignal,
    body: F,
) -> Result<StepStream, AgentError>
where
    F: FnOnce(CancelSignal, &mut dyn FnMut(ExecutionStep)) -> Result<(), String>
        + Send
        + 'static,
{
    let (step_tx, step_rx) = mpsc::sync_channel(1);
    let (resume_tx, resume_rx) = mpsc::sync_channel(1);
    let worker_cancel = Arc::clone(&cancel);

    let join_handle = thread::Builder::new()
        .name(name.into())
        .spawn(move || run_body(body, worker_cancel, step_tx, resume_rx))
        .map_err(|error| AgentError::new(format!("Failed to spawn agent worker: {error}")))?;

    Ok(Box::new(StepWorker {
        steps: step_rx,
        resume: Some(resume_tx),
        cancel,
        join_handle: Some(join_handle),
        done: false,
    }))
}

fn run_body<F>(
    body: F,
    cancel: CancelSignal,
    step_tx: SyncSender<WorkerMessage>,
    resume_rx: Receiver<()>,
) where
    F: FnOnce(CancelSignal, &mut dyn FnMut(ExecutionStep)) -> Result<(), String>,
{
    if resume_rx.recv().is_err() {
        return;
    }

    let last_iteration = Cell::new(None);
    let emit_iteration = &last_iteration;
    let emit_tx = step_tx.clone();
    let emit_cancel = Arc::clone(&cancel);
    let mut emit = move |step: ExecutionStep| {
        if emit_cancel.load(Ordering::SeqCst) {
            return;
        }

        if let Some(iteration) = step.iteration() {
            emit_iteration.set(Some(iteration));
        }
        if emit_tx.send(WorkerMessage::Step(step)).is_err() || resume_rx.recv().is_err() {
            emit_cancel.store(true, Ordering::SeqCst);
        }
    };

    let outcome = catch_unwind(AssertUnwindSafe(|| body(Arc::clone(&cancel), &mut emit)));
    let failure = |message: String| {
        let error = AgentError::new(message);
        match last_iteration.get() {
            Some(iteration) => error.after_iteration(iteration),
            None => error,
        }
    };
    let terminal = match outcome {
        Ok(Ok(())) => WorkerMessage::Finished,
        Ok(Err(error)) => WorkerMessage::Failed(failure(error)),
        Err(_) => WorkerMessage::Failed(failure("Agent panicked".to_string())),
    };

    let _ = step_tx.send(terminal);
}

impl StepWorker {
    fn finish(&mut self) {
        self.done = true;
        self.resume.take();
        if let Some(join_handle) = self.join_handle.take() {
            let _ = join_handle.join();
        }
    }
}

impl Iterator for StepWorker {
    type Item = Result<ExecutionStep, AgentError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Some(resume) = self.resume.as_ref() {
            let _ = resume.send(());
        }

        match self.steps.recv() {
            Ok(WorkerMessage::Step(step)) => Some(Ok(step)),
            Ok(WorkerMessage::Finished) => {
                self.finish();
                None
            }
            Ok(WorkerMessage::Failed(error)) => {
                self.finish();
                Some(Err(error))
            }
            Err(_) => {
                self.finish();
                Some(Err(AgentError::new(
                    "Agent worker exited without terminal event",
                )))
            }
        }
    }
}

impl Drop for StepWorker {
    fn drop(&mut self) {
        if self.done {
            return;
        }

        self.cancel.store(true, Ordering::SeqCst);
        self.resume.take();

        if let Some(join_handle) = self.join_handle.take() {
            if join_handle.is_finished() {
                let _ = join_handle.join();
            }
        }
    }
}
