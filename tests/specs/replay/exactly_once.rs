//! Startup replay exactly-once specs.

use crate::prelude::*;
use mu_engine::replay_startup;
use parking_lot::Mutex as PlMutex;
use std::sync::Arc;
use tempfile::TempDir;

/// Build a pipeline over an existing repo directory (no fresh tempdir).
fn pipeline_over(dir: &TempDir) -> (SpecPipeline, FakeExecutor, ControlPlanePaths) {
    let paths = ControlPlanePaths::resolve(dir.path());
    paths.ensure().unwrap();
    let stores = PipelineStores::open(&paths).unwrap();
    let executor = FakeExecutor::new();
    let pipeline = CommandPipeline::new(
        Arc::new(PlMutex::new(stores)),
        Arc::new(PlMutex::new(PolicyEngine::new(PolicyConfig::default()))),
        Arc::new(executor.clone()),
        Some(Arc::new(FakeOperator::new())),
        FakeClock::new(),
        PipelineConfig::default(),
    );
    (pipeline, executor, paths)
}

/// Run a mutation to completion, then rewrite the journal without its
/// terminal lifecycle entry, i.e. the crash window between a journaled
/// side effect and the terminal transition becoming visible.
async fn crash_after_effect(dir: &TempDir) -> CommandId {
    let paths = ControlPlanePaths::resolve(dir.path());
    paths.ensure().unwrap();
    {
        let mut stores = PipelineStores::open(&paths).unwrap();
        stores.identity.link(wildcard_binding(), 0).unwrap();
    }

    let (pipeline, _executor, paths) = pipeline_over(dir);
    let env = EnvelopeBuilder::new("mu! issue dep add mu-1 mu-2").build();
    let command_id = match pipeline.handle(&env).await.unwrap() {
        CommandPipelineResult::Completed { record } => record.command_id,
        other => panic!("expected completed, got {other:?}"),
    };

    let entries = Journal::<CommandEntry>::load(&paths.commands).unwrap();
    let truncated: Vec<CommandEntry> = entries
        .into_iter()
        .filter(|entry| match entry {
            CommandEntry::Lifecycle { record, .. } => record.state != CommandState::Completed,
            CommandEntry::Mutating { .. } => true,
        })
        .collect();
    let mut journal: Journal<CommandEntry> = Journal::open(&paths.commands).unwrap();
    journal.rewrite(&truncated).unwrap();

    command_id
}

#[tokio::test]
async fn mutating_entry_reconciles_without_re_execution() {
    let dir = TempDir::new().unwrap();
    let command_id = crash_after_effect(&dir).await;

    // Restart: replay must not re-run the executor for this command
    let paths = ControlPlanePaths::resolve(dir.path());
    let stores = Arc::new(PlMutex::new(PipelineStores::open(&paths).unwrap()));
    assert_eq!(
        stores.lock().state.get(command_id.as_str()).unwrap().state,
        CommandState::InProgress
    );

    let executor = FakeExecutor::new();
    let report = replay_startup(&stores, &executor, 5_000).await.unwrap();

    assert_eq!(report.reconciled, vec![command_id.clone()]);
    assert!(executor.executed().is_empty());

    let recovered = {
        let stores = stores.lock();
        stores.state.get(command_id.as_str()).unwrap().clone()
    };
    assert_eq!(recovered.state, CommandState::Completed);
    assert_eq!(
        recovered.result,
        Some(serde_json::json!({
            "reconciled": true,
            "reason": "mutating_event_present",
        }))
    );
}

#[tokio::test]
async fn second_restart_invokes_execute_zero_times() {
    let dir = TempDir::new().unwrap();
    crash_after_effect(&dir).await;
    let paths = ControlPlanePaths::resolve(dir.path());

    // First restart reconciles
    {
        let stores = Arc::new(PlMutex::new(PipelineStores::open(&paths).unwrap()));
        let executor = FakeExecutor::new();
        replay_startup(&stores, &executor, 5_000).await.unwrap();
        assert!(executor.executed().is_empty());
    }

    // Second restart finds only terminal state
    let stores = Arc::new(PlMutex::new(PipelineStores::open(&paths).unwrap()));
    let executor = FakeExecutor::new();
    let report = replay_startup(&stores, &executor, 6_000).await.unwrap();
    assert!(executor.executed().is_empty());
    assert!(report.reconciled.is_empty());
    assert!(report.executed.is_empty());
}

#[tokio::test]
async fn interrupted_command_without_effects_re_executes_once() {
    let dir = TempDir::new().unwrap();
    let paths = ControlPlanePaths::resolve(dir.path());
    paths.ensure().unwrap();
    {
        let mut stores = PipelineStores::open(&paths).unwrap();
        stores.identity.link(wildcard_binding(), 0).unwrap();
    }

    let (pipeline, _executor, paths) = pipeline_over(&dir);
    let env = EnvelopeBuilder::new("mu! issue dep add mu-1 mu-2").build();
    let command_id = pipeline
        .handle(&env)
        .await
        .unwrap()
        .record()
        .unwrap()
        .command_id
        .clone();

    // Simulate a crash before the executor ran: strip the terminal
    // entry AND the side effect
    let entries = Journal::<CommandEntry>::load(&paths.commands).unwrap();
    let truncated: Vec<CommandEntry> = entries
        .into_iter()
        .filter(|entry| match entry {
            CommandEntry::Lifecycle { record, .. } => record.state != CommandState::Completed,
            CommandEntry::Mutating { .. } => false,
        })
        .collect();
    let mut journal: Journal<CommandEntry> = Journal::open(&paths.commands).unwrap();
    journal.rewrite(&truncated).unwrap();

    // Restart re-executes exactly once, journaling the effect this time
    let stores = Arc::new(PlMutex::new(PipelineStores::open(&paths).unwrap()));
    let executor = FakeExecutor::new();
    let report = replay_startup(&stores, &executor, 5_000).await.unwrap();
    assert_eq!(report.executed, vec![command_id.clone()]);
    assert_eq!(executor.executed().len(), 1);
    assert!(stores.lock().state.has_mutating(&command_id));
}

#[tokio::test]
async fn replay_fold_is_deterministic_in_file_order() {
    let dir = TempDir::new().unwrap();
    let paths = ControlPlanePaths::resolve(dir.path());
    paths.ensure().unwrap();
    {
        let mut stores = PipelineStores::open(&paths).unwrap();
        stores.identity.link(wildcard_binding(), 0).unwrap();
    }
    let (pipeline, _executor, paths) = pipeline_over(&dir);

    for text in ["/mu status", "mu! issue dep add mu-1 mu-2", "/issue list"] {
        pipeline
            .handle(&EnvelopeBuilder::new(text).build())
            .await
            .unwrap();
    }

    let entries = Journal::<CommandEntry>::load(&paths.commands).unwrap();
    let once = mu_storage::MaterializedCommands::replay(&entries);
    let twice = mu_storage::MaterializedCommands::replay(&entries);

    let states_once: Vec<_> = once
        .commands()
        .map(|r| (r.command_id.clone(), r.state))
        .collect();
    let states_twice: Vec<_> = twice
        .commands()
        .map(|r| (r.command_id.clone(), r.state))
        .collect();
    assert_eq!(states_once, states_twice);
    assert_eq!(states_once.len(), 3);
}
