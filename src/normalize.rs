//! Maps raw agent steps to transcript messages.

use agent_provider::{ExecutionStep, FinalAnswer, IterationStep};
use serde_json::Value;
use tracing::warn;

use crate::artifacts::{media_type_for, FALLBACK_MEDIA_TYPE};
use crate::message::{ArtifactRef, Message};

pub const FINAL_ANSWER_TITLE: &str = "Final answer";
pub const OBSERVATION_TITLE: &str = "Observation";
pub const STEP_ERROR_TITLE: &str = "Error";

/// Converts one step into zero or more assistant messages.
///
/// Payload text is passed through untouched.
#[must_use]
pub fn normalize(step: ExecutionStep) -> Vec<Message> {
    match step {
        ExecutionStep::Iteration(step) => iteration_messages(step),
        ExecutionStep::FinalAnswer(FinalAnswer::Text(text)) => {
            vec![Message::assistant_text(text).titled(FINAL_ANSWER_TITLE)]
        }
        ExecutionStep::FinalAnswer(FinalAnswer::Image(path)) => {
            let media_type = media_type_for(&path).unwrap_or(FALLBACK_MEDIA_TYPE);
            vec![Message::image(ArtifactRef::new(path, media_type))]
        }
        ExecutionStep::Unrecognized { kind, detail } => {
            warn!(step_kind = %kind, "UnrecognizedStepShape: rendering raw step detail");
            vec![Message::assistant_text(detail_text(detail)).titled(kind)]
        }
    }
}

fn iteration_messages(step: IterationStep) -> Vec<Message> {
    let IterationStep {
        thought,
        action,
        observation,
        error,
        ..
    } = step;

    let mut messages = Vec::new();
    if let Some(thought) = thought {
        messages.push(Message::assistant_text(thought));
    }
    if let Some(action) = action {
        let title = format!("Used tool {}", action.tool);
        messages.push(Message::assistant_text(action.code).titled(title));
    }
    if let Some(observation) = observation {
        messages.push(Message::assistant_text(observation).titled(OBSERVATION_TITLE));
    }
    if let Some(error) = error {
        messages.push(Message::assistant_text(error).titled(STEP_ERROR_TITLE));
    }
    messages
}

fn detail_text(detail: Value) -> String {
    match detail {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
