//! Presentation-ready transcript messages and the snapshots handed to callers.

use std::path::{Path, PathBuf};

use agent_provider::RunId;

use crate::error::FailureKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    /// Transient progress indicator; only ever appears as a snapshot's last message.
    Status,
    Image,
    /// Terminal failure notice for the run.
    Error(FailureKind),
}

/// Reference to an image file produced during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    path: PathBuf,
    media_type: String,
}

impl ArtifactRef {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, media_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            media_type: media_type.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn media_type(&self) -> &str {
        &self.media_type
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Artifact(ArtifactRef),
}

/// One transcript entry. Messages have no mutators once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    role: Role,
    kind: MessageKind,
    payload: Payload,
    title: Option<String>,
}

impl Message {
    #[must_use]
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::text_message(Role::User, MessageKind::Text, text)
    }

    #[must_use]
    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self::text_message(Role::Assistant, MessageKind::Text, text)
    }

    #[must_use]
    pub fn status(text: impl Into<String>) -> Self {
        Self::text_message(Role::Assistant, MessageKind::Status, text)
    }

    #[must_use]
    pub fn error(kind: FailureKind, text: impl Into<String>) -> Self {
        Self::text_message(Role::Assistant, MessageKind::Error(kind), text).titled("Error")
    }

    #[must_use]
    pub fn image(artifact: ArtifactRef) -> Self {
        Self {
            role: Role::Assistant,
            kind: MessageKind::Image,
            payload: Payload::Artifact(artifact),
            title: None,
        }
    }

    /// Attaches presentation metadata rendered alongside the payload.
    #[must_use]
    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    fn text_message(role: Role, kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            role,
            kind,
            payload: Payload::Text(text.into()),
            title: None,
        }
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text(text) => Some(text),
            Payload::Artifact(_) => None,
        }
    }

    #[must_use]
    pub fn artifact(&self) -> Option<&ArtifactRef> {
        match &self.payload {
            Payload::Artifact(artifact) => Some(artifact),
            Payload::Text(_) => None,
        }
    }
}

/// Where the run stood when a snapshot was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotPhase {
    InProgress,
    Done,
    Failed(FailureKind),
}

/// Full ordered transcript at one yield point (never a diff).
///
/// In-progress snapshots end with exactly one ephemeral status message that is not
/// part of the run's permanent transcript. Terminal snapshots carry no placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub run_id: RunId,
    pub messages: Vec<Message>,
    pub phase: SnapshotPhase,
}

impl Snapshot {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self.phase, SnapshotPhase::InProgress)
    }

    /// Returns the ephemeral placeholder of an in-progress snapshot.
    #[must_use]
    pub fn placeholder(&self) -> Option<&Message> {
        if self.is_terminal() {
            return None;
        }
        self.messages.last()
    }

    /// Returns the permanent transcript prefix, excluding any placeholder.
    #[must_use]
    pub fn transcript(&self) -> &[Message] {
        if self.is_terminal() || self.messages.is_empty() {
            &self.messages
        } else {
            &self.messages[..self.messages.len() - 1]
        }
    }
}
