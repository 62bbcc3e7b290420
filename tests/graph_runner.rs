use std::error::Error;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use proptest::prelude::*;
use rigbuild::engine::{
    CompletionSignal, GraphRunner, TaskGraph, TaskOutcome, TaskState,
};
use rigbuild::errors::RigError;
use rigbuild::pipeline::stages::WriteTo;
use rigbuild::pipeline::{Pipeline, Source};
use rigbuild::tasks::{Task, TaskContext, TaskFuture, TaskReport};
use rigbuild::watch::PatternSet;
use rigbuild_test_utils::{
    MemoryConfigProvider, ThemeConfigBuilder, ThemeFixture, init_tracing, with_timeout,
};

type TestResult = Result<(), Box<dyn Error>>;
type Log = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Clone, Copy)]
enum Behaviour {
    Succeed,
    Fail,
    Panic,
}

/// Task that logs its start and end and then does what it is told.
#[derive(Debug)]
struct ScriptedTask {
    name: String,
    behaviour: Behaviour,
    delay: Duration,
    log: Log,
}

impl ScriptedTask {
    fn graph(name: &str, behaviour: Behaviour, delay_ms: u64, log: &Log) -> TaskGraph {
        TaskGraph::task(ScriptedTask {
            name: name.to_string(),
            behaviour,
            delay: Duration::from_millis(delay_ms),
            log: Arc::clone(log),
        })
    }
}

impl Task for ScriptedTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn run<'a>(&'a self, _ctx: &'a TaskContext) -> TaskFuture<'a> {
        Box::pin(async move {
            self.log.lock().unwrap().push(format!("start:{}", self.name));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.log.lock().unwrap().push(format!("end:{}", self.name));
            match self.behaviour {
                Behaviour::Succeed => Ok(TaskReport::default()),
                Behaviour::Fail => Err(RigError::Other(anyhow::anyhow!("{} failed", self.name))),
                Behaviour::Panic => panic!("{} panicked", self.name),
            }
        })
    }
}

fn runner(fixture: &ThemeFixture) -> GraphRunner {
    let provider = Arc::new(MemoryConfigProvider::new(ThemeConfigBuilder::new().build()));
    GraphRunner::new(fixture.context(provider))
}

fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

#[test]
fn state_transitions_are_enforced() {
    assert_eq!(TaskState::Idle.advance(TaskState::Running), Some(TaskState::Running));
    assert_eq!(TaskState::Running.advance(TaskState::Completed), Some(TaskState::Completed));
    assert_eq!(TaskState::Running.advance(TaskState::Failed), Some(TaskState::Failed));
    assert_eq!(TaskState::Idle.advance(TaskState::Completed), None);
    assert_eq!(TaskState::Completed.advance(TaskState::Running), None);
    assert_eq!(TaskState::Failed.advance(TaskState::Completed), None);
    assert!(TaskState::Completed.is_terminal());
    assert!(!TaskState::Running.is_terminal());
}

#[test]
fn illegal_transition_settles_on_failed() {
    init_tracing();
    assert_eq!(
        TaskState::Idle.advance_or_fail(TaskState::Running, "php"),
        TaskState::Running
    );
    assert_eq!(
        TaskState::Running.advance_or_fail(TaskState::Completed, "php"),
        TaskState::Completed
    );
    assert_eq!(
        TaskState::Completed.advance_or_fail(TaskState::Running, "php"),
        TaskState::Failed
    );
    assert_eq!(
        TaskState::Idle.advance_or_fail(TaskState::Completed, "php"),
        TaskState::Failed
    );
}

#[tokio::test]
async fn completion_signal_fires_once() {
    let (signal, rx) = CompletionSignal::new("php");
    assert_eq!(rx.task(), "php");
    signal.complete(TaskOutcome::Completed(TaskReport::default()));
    assert_eq!(rx.wait().await, TaskOutcome::Completed(TaskReport::default()));
}

#[tokio::test]
async fn dropped_signal_reports_failure() {
    let (signal, rx) = CompletionSignal::new("styles");
    drop(signal);
    assert!(matches!(rx.wait().await, TaskOutcome::Failed(_)));
}

#[tokio::test]
async fn sequence_runs_in_order() -> TestResult {
    init_tracing();
    let fixture = ThemeFixture::new();
    let log = log();
    let graph = TaskGraph::sequence([
        ScriptedTask::graph("a", Behaviour::Succeed, 20, &log),
        ScriptedTask::graph("b", Behaviour::Succeed, 0, &log),
        ScriptedTask::graph("c", Behaviour::Succeed, 0, &log),
    ]);

    let outcome = with_timeout(runner(&fixture).run(&graph)).await;
    assert!(outcome.succeeded());
    assert_eq!(
        *log.lock().unwrap(),
        vec!["start:a", "end:a", "start:b", "end:b", "start:c", "end:c"]
    );
    Ok(())
}

#[tokio::test]
async fn sequence_stops_at_first_failure() -> TestResult {
    init_tracing();
    let fixture = ThemeFixture::new();
    let log = log();
    let graph = TaskGraph::sequence([
        ScriptedTask::graph("a", Behaviour::Succeed, 0, &log),
        ScriptedTask::graph("b", Behaviour::Fail, 0, &log),
        TaskGraph::parallel([
            ScriptedTask::graph("c", Behaviour::Succeed, 0, &log),
            ScriptedTask::graph("d", Behaviour::Succeed, 0, &log),
        ]),
    ]);

    let outcome = with_timeout(runner(&fixture).run(&graph)).await;
    assert!(!outcome.succeeded());
    assert_eq!(outcome.failed_tasks(), vec!["b"]);
    assert_eq!(outcome.state_of("a"), Some(TaskState::Completed));
    assert_eq!(outcome.state_of("c"), Some(TaskState::Idle));
    assert_eq!(outcome.state_of("d"), Some(TaskState::Idle));
    assert!(
        outcome
            .record("b")
            .and_then(|r| r.error.as_deref())
            .is_some_and(|e| e.contains("b failed"))
    );
    assert!(!log.lock().unwrap().iter().any(|l| l.ends_with(":c")));
    Ok(())
}

#[tokio::test]
async fn parallel_starts_all_and_waits_for_all() -> TestResult {
    init_tracing();
    let fixture = ThemeFixture::new();
    let log = log();
    let graph = TaskGraph::sequence([
        TaskGraph::parallel([
            ScriptedTask::graph("slow", Behaviour::Succeed, 80, &log),
            ScriptedTask::graph("fails", Behaviour::Fail, 10, &log),
            ScriptedTask::graph("fast", Behaviour::Succeed, 10, &log),
        ]),
        ScriptedTask::graph("after", Behaviour::Succeed, 0, &log),
    ]);

    let outcome = with_timeout(runner(&fixture).run(&graph)).await;
    let entries = log.lock().unwrap().clone();

    let first_end = entries.iter().position(|l| l.starts_with("end:")).unwrap();
    let starts_before_end = entries[..first_end]
        .iter()
        .filter(|l| l.starts_with("start:"))
        .count();
    assert_eq!(starts_before_end, 3, "{entries:?}");

    // The slow sibling still finishes even though another one failed.
    assert!(entries.contains(&"end:slow".to_string()));
    assert_eq!(outcome.state_of("slow"), Some(TaskState::Completed));
    assert_eq!(outcome.state_of("fails"), Some(TaskState::Failed));
    assert_eq!(outcome.state_of("after"), Some(TaskState::Idle));

    let names: Vec<&str> = outcome.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["slow", "fails", "fast", "after"]);
    Ok(())
}

#[tokio::test]
async fn panicking_task_is_reported_failed() -> TestResult {
    init_tracing();
    let fixture = ThemeFixture::new();
    let log = log();
    let graph = TaskGraph::sequence([
        ScriptedTask::graph("boom", Behaviour::Panic, 0, &log),
        ScriptedTask::graph("next", Behaviour::Succeed, 0, &log),
    ]);

    let outcome = with_timeout(runner(&fixture).run(&graph)).await;
    assert_eq!(outcome.state_of("boom"), Some(TaskState::Failed));
    assert_eq!(outcome.state_of("next"), Some(TaskState::Idle));
    Ok(())
}

/// Writes every file under `dev/shared/` into `theme/shared/`.
#[derive(Debug)]
struct SharedWriter {
    name: String,
}

impl Task for SharedWriter {
    fn name(&self) -> &str {
        &self.name
    }

    fn run<'a>(&'a self, ctx: &'a TaskContext) -> TaskFuture<'a> {
        Box::pin(async move {
            let patterns = PatternSet::new(&["dev/shared/*.txt".to_string()], &[])?;
            let source = Source::new(&ctx.paths.root, ctx.paths.root.join("dev"), patterns);
            let report = Pipeline::new(self.name.clone())
                .stage(WriteTo::new(self.name.clone(), &ctx.paths.final_root, ctx.claims.clone()))
                .run(&source)
                .await?;
            Ok(TaskReport::from(report))
        })
    }
}

#[tokio::test]
async fn parallel_writers_of_one_destination_conflict() -> TestResult {
    init_tracing();
    let fixture = ThemeFixture::new();
    fixture.write("dev/shared/a.txt", "a");
    fixture.write("dev/shared/b.txt", "b");

    let graph = TaskGraph::parallel([
        TaskGraph::task(SharedWriter { name: "left".into() }),
        TaskGraph::task(SharedWriter { name: "right".into() }),
    ]);
    let runner = runner(&fixture);

    for _ in 0..2 {
        // Each run starts with an empty claims registry.
        let outcome = with_timeout(runner.run(&graph)).await;
        assert!(outcome.succeeded());

        let reports: Vec<TaskReport> = outcome
            .records
            .iter()
            .map(|r| r.report.clone().unwrap())
            .collect();
        let written: usize = reports.iter().map(|r| r.written).sum();
        let errors: usize = reports.iter().map(|r| r.errors).sum();
        assert_eq!(written, 2);
        assert_eq!(errors, 2);
    }

    assert_eq!(fixture.read("theme/shared/a.txt"), "a");
    assert_eq!(fixture.read("theme/shared/b.txt"), "b");
    Ok(())
}

#[tokio::test]
async fn claims_allow_same_task_and_reject_others() -> TestResult {
    let fixture = ThemeFixture::new();
    let provider = Arc::new(MemoryConfigProvider::new(ThemeConfigBuilder::new().build()));
    let ctx = fixture.context(provider);
    let path = PathBuf::from("theme/style.css");

    ctx.claims.claim(&path, "styles")?;
    ctx.claims.claim(&path, "styles")?;
    assert!(matches!(
        ctx.claims.claim(&path, "php"),
        Err(RigError::PathConflict { owner, .. }) if owner == "styles"
    ));
    assert_eq!(ctx.claims.owner(&path).as_deref(), Some("styles"));
    assert!(ctx.for_new_run().claims.is_empty());
    Ok(())
}

#[test]
fn describe_renders_tree() {
    let log = log();
    let graph = TaskGraph::sequence([
        ScriptedTask::graph("php", Behaviour::Succeed, 0, &log),
        TaskGraph::parallel([
            ScriptedTask::graph("scripts", Behaviour::Succeed, 0, &log),
            ScriptedTask::graph("jsMin", Behaviour::Succeed, 0, &log),
        ]),
    ]);
    assert_eq!(
        graph.describe(),
        "sequence\n  php\n  parallel\n    scripts\n    jsMin\n"
    );
    assert_eq!(graph.task_names(), vec!["php", "scripts", "jsMin"]);
}

#[derive(Debug, Clone)]
enum Shape {
    Leaf(bool),
    Seq(Vec<Shape>),
    Par(Vec<Shape>),
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    prop::bool::weighted(0.25)
        .prop_map(Shape::Leaf)
        .prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 1..4).prop_map(Shape::Seq),
                prop::collection::vec(inner, 1..4).prop_map(Shape::Par),
            ]
        })
}

fn build(shape: &Shape, next: &mut usize, log: &Log) -> TaskGraph {
    match shape {
        Shape::Leaf(fails) => {
            let name = format!("t{next}");
            *next += 1;
            let behaviour = if *fails { Behaviour::Fail } else { Behaviour::Succeed };
            ScriptedTask::graph(&name, behaviour, 0, log)
        }
        Shape::Seq(children) => TaskGraph::sequence(children.iter().map(|c| build(c, next, log)).collect::<Vec<_>>()),
        Shape::Par(children) => TaskGraph::parallel(children.iter().map(|c| build(c, next, log)).collect::<Vec<_>>()),
    }
}

/// Reference semantics: (succeeded, (name, state) per task in record order).
fn expected(shape: &Shape, next: &mut usize, runs: bool) -> (bool, Vec<(String, TaskState)>) {
    match shape {
        Shape::Leaf(fails) => {
            let name = format!("t{next}");
            *next += 1;
            let state = match (runs, fails) {
                (false, _) => TaskState::Idle,
                (true, true) => TaskState::Failed,
                (true, false) => TaskState::Completed,
            };
            (runs && !fails, vec![(name, state)])
        }
        Shape::Seq(children) => {
            let mut ok = runs;
            let mut out = Vec::new();
            for child in children {
                let (child_ok, records) = expected(child, next, ok);
                out.extend(records);
                ok = ok && child_ok;
            }
            (ok, out)
        }
        Shape::Par(children) => {
            let mut ok = runs;
            let mut out = Vec::new();
            for child in children {
                let (child_ok, records) = expected(child, next, runs);
                out.extend(records);
                ok = ok && child_ok;
            }
            (ok, out)
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn graph_outcome_matches_reference(shape in shape_strategy()) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let fixture = ThemeFixture::new();
        let log = log();
        let graph = build(&shape, &mut 0, &log);
        let (ok, records) = expected(&shape, &mut 0, true);

        let outcome = rt.block_on(runner(&fixture).run(&graph));
        let actual: Vec<(String, TaskState)> = outcome
            .records
            .iter()
            .map(|r| (r.name.clone(), r.state))
            .collect();

        prop_assert_eq!(outcome.succeeded(), ok);
        prop_assert_eq!(actual, records);

        // Every started task logged both its start and its end exactly once.
        let entries = log.lock().unwrap().clone();
        for record in &outcome.records {
            let starts = entries.iter().filter(|l| **l == format!("start:{}", record.name)).count();
            let expected_starts = usize::from(record.state != TaskState::Idle);
            prop_assert_eq!(starts, expected_starts);
        }
    }
}
