//! Plain-text transcript output for a terminal.
//!
//! Snapshots always carry the whole transcript; the renderer remembers how much of
//! the current run it has printed and only writes the new tail. Placeholder status
//! lines are printed when they change and never count as transcript.

use std::io::{self, Write};

use data_analyst::{Message, MessageKind, Payload, Role, RunId, Snapshot, SnapshotPhase};

pub struct TranscriptRenderer<W: Write> {
    out: W,
    run_id: Option<RunId>,
    printed: usize,
    last_status: Option<String>,
}

impl<W: Write> TranscriptRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            run_id: None,
            printed: 0,
            last_status: None,
        }
    }

    pub fn render(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        if self.run_id != Some(snapshot.run_id) {
            self.run_id = Some(snapshot.run_id);
            self.printed = 0;
            self.last_status = None;
        }

        let transcript = snapshot.transcript();
        for message in transcript.iter().skip(self.printed) {
            self.out.write_all(format_message(message).as_bytes())?;
        }
        self.printed = self.printed.max(transcript.len());

        match snapshot.phase {
            SnapshotPhase::InProgress => {
                if let Some(status) = snapshot.placeholder().and_then(Message::text) {
                    if self.last_status.as_deref() != Some(status) {
                        writeln!(self.out, "… {status}")?;
                        self.last_status = Some(status.to_string());
                    }
                }
            }
            SnapshotPhase::Done => writeln!(self.out, "--- run {} done ---", snapshot.run_id)?,
            SnapshotPhase::Failed(kind) => {
                writeln!(self.out, "--- run {} failed: {kind} ---", snapshot.run_id)?
            }
        }

        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Formats one message, keeping its payload text verbatim.
pub fn format_message(message: &Message) -> String {
    let speaker = match message.role() {
        Role::User => "user",
        Role::Assistant => "assistant",
    };
    let header = match (message.kind(), message.title()) {
        (MessageKind::Error(kind), _) => format!("{speaker} [error: {kind}]"),
        (MessageKind::Image, _) => format!("{speaker} [image]"),
        (_, Some(title)) => format!("{speaker} [{title}]"),
        (_, None) => speaker.to_string(),
    };

    let body = match message.payload() {
        Payload::Text(text) => text.clone(),
        Payload::Artifact(artifact) => format!(
            "{} ({})",
            artifact.path().display(),
            artifact.media_type()
        ),
    };

    let mut line = if body.contains('\n') {
        format!("{header}:\n{body}")
    } else {
        format!("{header}: {body}")
    };
    if !line.ends_with('\n') {
        line.push('\n');
    }
    line
}

#[cfg(test)]
mod tests {
    use data_analyst::{ArtifactRef, FailureKind};

    use super::*;

    fn snapshot(run_id: RunId, messages: Vec<Message>, phase: SnapshotPhase) -> Snapshot {
        Snapshot {
            run_id,
            messages,
            phase,
        }
    }

    fn rendered(renderer: TranscriptRenderer<Vec<u8>>) -> String {
        String::from_utf8(renderer.into_inner()).expect("utf8 output")
    }

    #[test]
    fn formats_each_message_kind() {
        assert_eq!(format_message(&Message::user_text("hi")), "user: hi\n");
        assert_eq!(
            format_message(&Message::assistant_text("print(1)\n").titled("Used tool python")),
            "assistant [Used tool python]:\nprint(1)\n"
        );
        assert_eq!(
            format_message(&Message::image(ArtifactRef::new("figures/a.png", "image/png"))),
            "assistant [image]: figures/a.png (image/png)\n"
        );
        assert_eq!(
            format_message(&Message::error(FailureKind::DatasetLoad, "bad csv")),
            "assistant [error: DatasetLoadFailure]: bad csv\n"
        );
    }

    #[test]
    fn prints_only_new_messages_and_changed_status() {
        let mut renderer = TranscriptRenderer::new(Vec::new());
        let user = Message::user_text("q");
        let answer = Message::assistant_text("a");

        renderer
            .render(&snapshot(
                1,
                vec![user.clone(), Message::status("starting")],
                SnapshotPhase::InProgress,
            ))
            .expect("render");
        renderer
            .render(&snapshot(
                1,
                vec![user.clone(), Message::status("starting")],
                SnapshotPhase::InProgress,
            ))
            .expect("render");
        renderer
            .render(&snapshot(
                1,
                vec![user.clone(), answer.clone(), Message::status("working")],
                SnapshotPhase::InProgress,
            ))
            .expect("render");
        renderer
            .render(&snapshot(1, vec![user, answer], SnapshotPhase::Done))
            .expect("render");

        assert_eq!(
            rendered(renderer),
            "user: q\n… starting\nassistant: a\n… working\n--- run 1 done ---\n"
        );
    }

    #[test]
    fn new_run_restarts_from_first_message() {
        let mut renderer = TranscriptRenderer::new(Vec::new());
        let failed = SnapshotPhase::Failed(FailureKind::AgentExecution);

        renderer
            .render(&snapshot(1, vec![Message::user_text("one")], failed))
            .expect("render");
        renderer
            .render(&snapshot(2, vec![Message::user_text("two")], SnapshotPhase::Done))
            .expect("render");

        assert_eq!(
            rendered(renderer),
            "user: one\n--- run 1 failed: AgentExecutionFailure ---\nuser: two\n--- run 2 done ---\n"
        );
    }
}
