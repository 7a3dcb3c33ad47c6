
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use agent_provider::{
    AgentError, AgentProfile, AgentRequest, AnalysisAgent, ExecutionStep, FinalAnswer,
    IterationStep, StepStream,
};
use agent_provider_mock::{ScriptAction, ScriptedAgent};
use assert_matches::assert_matches;
use data_analyst::{
    ArtifactRef, FailureKind, Message, MessageKind, Snapshot, SnapshotPhase,
};
use fixture::{dir_entries, driver, image_paths, run_dirs, status_count, RAGGED_CSV, TITANIC_CSV};
use pretty_assertions::assert_eq;

const REQUEST: &str = "What is the survival rate by class?";

fn thought(iteration: u32, text: &str) -> ScriptAction {
    ScriptAction::Emit(ExecutionStep::Iteration(
        IterationStep::new(iteration).with_thought(text),
    ))
}

fn observation(iteration: u32, text: &str) -> ScriptAction {
    ScriptAction::Emit(ExecutionStep::Iteration(
        IterationStep::new(iteration).with_observation(text),
    ))
}

fn png(path: &std::path::Path) -> Message {
    Message::image(ArtifactRef::new(path, "image/png"))
}

#[test]
fn single_text_step_then_completion() {
    let dirs = run_dirs(TITANIC_CSV);
    let agent = Arc::new(ScriptedAgent::new(vec![thought(1, "Survival is 67%.")]));
    let snapshots: Vec<Snapshot> = driver(agent, &dirs.figures).interact(&dirs.dataset, REQUEST).collect();

    assert_eq!(snapshots.len(), 3);
    assert_eq!(
        snapshots[0].messages,
        vec![Message::user_text(REQUEST), Message::status("⏳ _Starting task..._")]
    );
    assert_eq!(
        snapshots[1].messages,
        vec![
            Message::user_text(REQUEST),
            Message::assistant_text("Survival is 67%."),
            Message::status("⏳ _Still processing..._"),
        ]
    );
    assert_eq!(snapshots[2].phase, SnapshotPhase::Done);
    assert_eq!(
        snapshots[2].messages,
        vec![Message::user_text(REQUEST), Message::assistant_text("Survival is 67%.")]
    );
}

#[test]
fn figure_follows_the_step_that_produced_it() {
    let dirs = run_dirs(TITANIC_CSV);
    let agent = Arc::new(ScriptedAgent::new(vec![
        ScriptAction::png("fig1.png"),
        observation(1, "Saved the class chart."),
    ]));
    let mut session = driver(agent, &dirs.figures).interact(&dirs.dataset, REQUEST);

    assert_eq!(session.phase(), None);
    session.next().expect("prepared snapshot");
    let step = session.next().expect("step snapshot");
    assert_eq!(session.phase(), Some(SnapshotPhase::InProgress));

    assert_eq!(
        step.transcript(),
        &[
            Message::user_text(REQUEST),
            Message::assistant_text("Saved the class chart.").titled("Observation"),
            png(&dirs.figures.join("fig1.png")),
        ]
    );
    assert_eq!(session.next().map(|snapshot| snapshot.phase), Some(SnapshotPhase::Done));
    assert!(session.next().is_none());
}

#[test]
fn rewritten_figure_is_emitted_once() {
    let dirs = run_dirs(TITANIC_CSV);
    let agent = Arc::new(ScriptedAgent::new(vec![
        ScriptAction::png("fig1.png"),
        thought(1, "first plot"),
        ScriptAction::png("fig1.png"),
        thought(2, "replotted"),
    ]));

    let last = driver(agent, &dirs.figures)
        .interact(&dirs.dataset, REQUEST)
        .last()
        .expect("terminal snapshot");

    assert_eq!(last.phase, SnapshotPhase::Done);
    assert_eq!(image_paths(&last.messages), vec![dirs.figures.join("fig1.png")]);
}

#[test]
fn malformed_dataset_fails_before_agent_starts() {
    let dirs = run_dirs(RAGGED_CSV);
    let agent = Arc::new(ScriptedAgent::new(vec![thought(1, "never")]));
    let snapshots: Vec<Snapshot> = driver(agent.clone(), &dirs.figures)
        .interact(&dirs.dataset, REQUEST)
        .collect();

    assert_eq!(snapshots.len(), 1);
    let failed = &snapshots[0];
    assert_eq!(failed.phase, SnapshotPhase::Failed(FailureKind::DatasetLoad));
    assert_eq!(failed.messages.len(), 2);
    assert_eq!(failed.messages[0], Message::user_text(REQUEST));
    assert_eq!(
        failed.messages[1].kind(),
        MessageKind::Error(FailureKind::DatasetLoad)
    );
    assert_eq!(agent.starts(), 0);
}

#[test]
fn agent_error_keeps_prior_steps() {
    let dirs = run_dirs(TITANIC_CSV);
    let agent = Arc::new(ScriptedAgent::new(vec![
        thought(1, "one"),
        thought(2, "two"),
        thought(3, "three"),
        ScriptAction::Fail("kernel died".to_string()),
    ]));
    let snapshots: Vec<Snapshot> = driver(agent, &dirs.figures).interact(&dirs.dataset, REQUEST).collect();

    let last = snapshots.last().expect("terminal snapshot");
    assert_eq!(last.phase, SnapshotPhase::Failed(FailureKind::AgentExecution));
    assert_eq!(
        last.messages,
        vec![
            Message::user_text(REQUEST),
            Message::assistant_text("one"),
            Message::assistant_text("two"),
            Message::assistant_text("three"),
            Message::error(
                FailureKind::AgentExecution,
                "agent execution failed: kernel died (after iteration 3)"
            ),
        ]
    );
    assert_eq!(status_count(last), 0);
}

#[test]
fn workspace_is_empty_once_preparation_completes() {
    let dirs = run_dirs(TITANIC_CSV);
    fs::create_dir_all(dirs.figures.join("nested")).expect("stale dir");
    fs::write(dirs.figures.join("stale.png"), b"old").expect("stale figure");
    fs::write(dirs.figures.join("nested").join("old.jpg"), b"old").expect("stale figure");

    let agent = Arc::new(ScriptedAgent::new(vec![thought(1, "look")]));
    let mut session = driver(agent, &dirs.figures).interact(&dirs.dataset, REQUEST);

    let prepared = session.next().expect("prepared snapshot");
    assert_eq!(prepared.phase, SnapshotPhase::InProgress);
    assert!(dir_entries(&dirs.figures).is_empty());

    let last = session.last().expect("terminal snapshot");
    assert!(image_paths(&last.messages).is_empty());
}

#[test]
fn placeholder_only_on_in_progress_snapshots() {
    let dirs = run_dirs(TITANIC_CSV);
    let agent = Arc::new(ScriptedAgent::default());
    let snapshots: Vec<Snapshot> = driver(agent, &dirs.figures).interact(&dirs.dataset, REQUEST).collect();

    let (terminal, in_progress) = snapshots.split_last().expect("snapshots");
    for snapshot in in_progress {
        assert_eq!(status_count(snapshot), 1);
        assert_eq!(
            snapshot.messages.last().map(Message::kind),
            Some(MessageKind::Status)
        );
    }
    assert_eq!(terminal.phase, SnapshotPhase::Done);
    assert_eq!(status_count(terminal), 0);

    for pair in snapshots.windows(2) {
        let earlier = pair[0].transcript();
        assert_eq!(&pair[1].transcript()[..earlier.len()], earlier);
    }
    assert_eq!(image_paths(&terminal.messages), vec![dirs.figures.join("overview.png")]);
}

#[test]
fn figures_never_carry_across_runs() {
    let dirs = run_dirs(TITANIC_CSV);
    let plotting = Arc::new(ScriptedAgent::new(vec![
        ScriptAction::png("fig1.png"),
        thought(1, "plotted"),
    ]));
    let quiet = Arc::new(ScriptedAgent::new(vec![thought(1, "no plots")]));

    let first = driver(plotting.clone(), &dirs.figures)
        .interact(&dirs.dataset, REQUEST)
        .last()
        .expect("first run");
    let second = driver(quiet, &dirs.figures)
        .interact(&dirs.dataset, REQUEST)
        .last()
        .expect("second run");
    let third = driver(plotting, &dirs.figures)
        .interact(&dirs.dataset, REQUEST)
        .last()
        .expect("third run");

    assert_eq!(image_paths(&first.messages).len(), 1);
    assert!(image_paths(&second.messages).is_empty());
    assert_eq!(image_paths(&third.messages), vec![dirs.figures.join("fig1.png")]);
}

#[test]
fn late_figure_is_picked_up_at_completion() {
    let dirs = run_dirs(TITANIC_CSV);
    let agent = Arc::new(ScriptedAgent::new(vec![
        thought(1, "plotting"),
        ScriptAction::png("late.png"),
    ]));
    let snapshots: Vec<Snapshot> = driver(agent, &dirs.figures).interact(&dirs.dataset, REQUEST).collect();

    assert!(image_paths(&snapshots[1].messages).is_empty());
    let done = snapshots.last().expect("terminal snapshot");
    assert_eq!(done.phase, SnapshotPhase::Done);
    assert_eq!(
        done.messages.last(),
        Some(&png(&dirs.figures.join("late.png")))
    );
}

#[test]
fn final_answer_image_is_not_duplicated_by_scan() {
    let dirs = run_dirs(TITANIC_CSV);
    let chart = dirs.figures.join("answer.png");
    let agent = Arc::new(ScriptedAgent::new(vec![
        ScriptAction::png("answer.png"),
        ScriptAction::Emit(ExecutionStep::FinalAnswer(FinalAnswer::Image(chart.clone()))),
    ]));

    let done = driver(agent, &dirs.figures)
        .interact(&dirs.dataset, REQUEST)
        .last()
        .expect("terminal snapshot");

    assert_eq!(image_paths(&done.messages), vec![chart]);
}

#[test]
fn final_answer_image_already_scanned_is_not_repeated() {
    let dirs = run_dirs(TITANIC_CSV);
    let chart = dirs.figures.join("answer.png");
    let agent = Arc::new(ScriptedAgent::new(vec![
        ScriptAction::png("answer.png"),
        thought(1, "plotted the answer"),
        ScriptAction::Emit(ExecutionStep::FinalAnswer(FinalAnswer::Image(chart.clone()))),
    ]));

    let snapshots: Vec<Snapshot> = driver(agent, &dirs.figures).interact(&dirs.dataset, REQUEST).collect();

    assert_eq!(image_paths(snapshots[1].transcript()), vec![chart.clone()]);
    let done = snapshots.last().expect("terminal snapshot");
    assert_eq!(done.phase, SnapshotPhase::Done);
    assert_eq!(
        done.messages,
        vec![
            Message::user_text(REQUEST),
            Message::assistant_text("plotted the answer"),
            png(&chart),
        ]
    );
}

#[test]
fn non_utf8_dataset_fails_before_agent_starts() {
    let dirs = run_dirs(TITANIC_CSV);
    fs::write(&dirs.dataset, b"a,b\n\xff,1\n").expect("dataset overwritten");
    let agent = Arc::new(ScriptedAgent::new(vec![thought(1, "never")]));

    let snapshots: Vec<Snapshot> = driver(agent.clone(), &dirs.figures)
        .interact(&dirs.dataset, REQUEST)
        .collect();

    assert_eq!(snapshots.len(), 1);
    assert_eq!(
        snapshots[0].phase,
        SnapshotPhase::Failed(FailureKind::DatasetLoad)
    );
    assert_eq!(
        snapshots[0].messages[1].kind(),
        MessageKind::Error(FailureKind::DatasetLoad)
    );
    assert_eq!(agent.starts(), 0);
}

#[test]
fn multiple_figures_at_one_boundary_are_sorted() {
    let dirs = run_dirs(TITANIC_CSV);
    let agent = Arc::new(ScriptedAgent::new(vec![
        ScriptAction::png("b.png"),
        ScriptAction::png("a.PNG"),
        ScriptAction::WriteFigure {
            name: "notes.txt".to_string(),
            bytes: b"not an image".to_vec(),
        },
        thought(1, "two charts"),
    ]));
    let mut session = driver(agent, &dirs.figures).interact(&dirs.dataset, REQUEST);

    session.next().expect("prepared snapshot");
    let step = session.next().expect("step snapshot");

    assert_eq!(
        image_paths(step.transcript()),
        vec![dirs.figures.join("a.PNG"), dirs.figures.join("b.png")]
    );
}

#[test]
fn prompt_embeds_structure_notes_and_request() {
    let dirs = run_dirs(TITANIC_CSV);
    let agent = Arc::new(ScriptedAgent::new(Vec::new()));
    let mut session = driver(agent, &dirs.figures).interact(&dirs.dataset, REQUEST);

    assert!(session.prompt().is_none());
    session.next().expect("prepared snapshot");

    let prompt = session.prompt().expect("prompt built");
    assert!(prompt.contains("- Shape: 3 rows x 5 columns"));
    assert!(prompt.contains("- Columns with dtypes:"));
    assert!(prompt.contains(&format!("{}/", dirs.figures.display())));
    assert!(prompt.ends_with(REQUEST));
}

#[test]
fn run_ids_increase_per_interaction() {
    let dirs = run_dirs(TITANIC_CSV);
    let driver = driver(Arc::new(ScriptedAgent::new(Vec::new())), &dirs.figures);

    let first = driver.interact(&dirs.dataset, REQUEST);
    let second = driver.interact(&dirs.dataset, REQUEST);

    assert_eq!(first.run_id() + 1, second.run_id());
    let snapshot = second.last().expect("terminal snapshot");
    assert!(snapshot.is_terminal());
}

#[test]
fn workspace_reset_failure_is_reported() {
    let dirs = run_dirs(TITANIC_CSV);
    let blocker = dirs.root.path().join("blocker");
    fs::write(&blocker, b"file").expect("blocker file");
    let figures = blocker.join("figures");

    let agent = Arc::new(ScriptedAgent::new(vec![thought(1, "never")]));
    let snapshots: Vec<Snapshot> = driver(agent.clone(), &figures)
        .interact(&dirs.dataset, REQUEST)
        .collect();

    assert_eq!(snapshots.len(), 1);
    assert_eq!(
        snapshots[0].phase,
        SnapshotPhase::Failed(FailureKind::WorkspaceReset)
    );
    assert_eq!(agent.starts(), 0);
}

#[test]
fn dropping_session_cancels_running_agent() {
    let dirs = run_dirs(TITANIC_CSV);
    let agent = Arc::new(ScriptedAgent::new(vec![
        thought(1, "start"),
        ScriptAction::Pause(Duration::from_secs(30)),
        ScriptAction::png("late.png"),
        thought(2, "never shown"),
    ]));
    let mut session = driver(agent, &dirs.figures).interact(&dirs.dataset, REQUEST);

    session.next().expect("prepared snapshot");
    session.next().expect("first step");
    drop(session);

    thread::sleep(Duration::from_millis(100));
    assert!(!dirs.figures.join("late.png").exists());
}

struct RejectingAgent {
    starts: AtomicUsize,
}

impl AnalysisAgent for RejectingAgent {
    fn profile(&self) -> AgentProfile {
        AgentProfile {
            agent_id: "rejecting".to_string(),
            model_id: "none".to_string(),
            max_iterations: 1,
        }
    }

    fn start(&self, _request: AgentRequest) -> Result<StepStream, AgentError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Err(AgentError::new("model unavailable"))
    }
}

#[test]
fn agent_start_failure_is_terminal_agent_error() {
    let dirs = run_dirs(TITANIC_CSV);
    let agent = Arc::new(RejectingAgent {
        starts: AtomicUsize::new(0),
    });
    let snapshots: Vec<Snapshot> = driver(agent.clone(), &dirs.figures)
        .interact(&dirs.dataset, REQUEST)
        .collect();

    assert_eq!(snapshots.len(), 1);
    assert_matches!(
        snapshots[0].phase,
        SnapshotPhase::Failed(FailureKind::AgentExecution)
    );
    assert_eq!(
        snapshots[0].messages[1].text(),
        Some("agent execution failed: model unavailable")
    );
    assert_eq!(agent.starts.load(Ordering::SeqCst), 1);
}

struct UnknownShapeAgent;

impl AnalysisAgent for UnknownShapeAgent {
    fn profile(&self) -> AgentProfile {
        AgentProfile {
            agent_id: "unknown-shape".to_string(),
            model_id: "none".to_string(),
            max_iterations: 1,
        }
    }

    fn start(&self, _request: AgentRequest) -> Result<StepStream, AgentError> {
        Ok(Box::new(
            vec![
                Ok(ExecutionStep::Unrecognized {
                    kind: "planning".to_string(),
                    detail: serde_json::json!("1. load\n2. plot"),
                }),
                Ok(ExecutionStep::FinalAnswer(FinalAnswer::Text("done".to_string()))),
            ]
            .into_iter(),
        ))
    }
}

#[test]
fn unrecognized_step_does_not_end_run() {
    let dirs = run_dirs(TITANIC_CSV);
    let done = driver(Arc::new(UnknownShapeAgent), &dirs.figures)
        .interact(&dirs.dataset, REQUEST)
        .last()
        .expect("terminal snapshot");

    assert_eq!(done.phase, SnapshotPhase::Done);
    assert_eq!(
        done.messages,
        vec![
            Message::user_text(REQUEST),
            Message::assistant_text("1. load\n2. plot").titled("planning"),
            Message::assistant_text("done").titled("Final answer"),
        ]
    );
}
