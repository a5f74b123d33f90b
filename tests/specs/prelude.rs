//! Shared fixtures for the behavioral specs.

pub use mu_adapters::{FakeDriver, FakeOperator, OperatorDecision};
pub use mu_core::test_support::EnvelopeBuilder;
pub use mu_core::{
    AssuranceTier, BindingId, BindingStatus, Channel, Clock, CommandEntry, CommandId,
    CommandPipelineResult, CommandState, ErrorCode, FakeClock, IdentityBinding,
};
pub use mu_engine::{
    CommandPipeline, FakeExecutor, PipelineConfig, PipelineStores, PolicyConfig, PolicyEngine,
};
pub use mu_storage::{ControlPlanePaths, Journal};

use parking_lot::Mutex as PlMutex;
use std::sync::Arc;
use tempfile::TempDir;

pub type SpecPipeline = CommandPipeline<FakeExecutor, FakeOperator, FakeClock>;

/// A pipeline over a temp repository with a wildcard TierA binding for
/// the default test actor.
pub struct PipelineFixture {
    pub pipeline: SpecPipeline,
    pub executor: FakeExecutor,
    pub operator: FakeOperator,
    pub clock: FakeClock,
    pub paths: ControlPlanePaths,
    pub dir: TempDir,
}

pub fn wildcard_binding() -> IdentityBinding {
    IdentityBinding {
        binding_id: BindingId::new("bind-1"),
        operator_id: "op-1".to_string(),
        channel: Channel::Telegram,
        channel_tenant_id: "tenant-1".to_string(),
        channel_actor_id: "actor-1".to_string(),
        assurance_tier: AssuranceTier::TierA,
        scopes: vec!["*".to_string()],
        status: BindingStatus::Active,
        linked_at_ms: 0,
        unlinked_at_ms: None,
        unlink_cause: None,
        revoked_at_ms: None,
        revoke_reason: None,
    }
}

/// Binding with explicit scopes and tier, for authorization specs.
pub fn scoped_binding(scopes: &[&str], tier: AssuranceTier) -> IdentityBinding {
    IdentityBinding {
        scopes: scopes.iter().map(|s| s.to_string()).collect(),
        assurance_tier: tier,
        ..wildcard_binding()
    }
}

pub fn pipeline_fixture_with(
    policy: PolicyConfig,
    pipeline_config: PipelineConfig,
    binding: Option<IdentityBinding>,
) -> PipelineFixture {
    let dir = TempDir::new().unwrap();
    let paths = ControlPlanePaths::resolve(dir.path());
    paths.ensure().unwrap();

    let mut stores = PipelineStores::open(&paths).unwrap();
    if let Some(b) = binding {
        stores.identity.link(b, 0).unwrap();
    }

    let executor = FakeExecutor::new();
    let operator = FakeOperator::new();
    let clock = FakeClock::new();
    let pipeline = CommandPipeline::new(
        Arc::new(PlMutex::new(stores)),
        Arc::new(PlMutex::new(PolicyEngine::new(policy))),
        Arc::new(executor.clone()),
        Some(Arc::new(operator.clone())),
        clock.clone(),
        pipeline_config,
    );

    PipelineFixture {
        pipeline,
        executor,
        operator,
        clock,
        paths,
        dir,
    }
}

pub fn pipeline_fixture() -> PipelineFixture {
    pipeline_fixture_with(
        PolicyConfig::default(),
        PipelineConfig::default(),
        Some(wildcard_binding()),
    )
}

/// Lifecycle entries in journal order.
pub fn lifecycle_entries(paths: &ControlPlanePaths) -> Vec<(String, CommandState)> {
    Journal::<CommandEntry>::load(&paths.commands)
        .unwrap()
        .into_iter()
        .filter_map(|entry| match entry {
            CommandEntry::Lifecycle { record, .. } => {
                Some((record.command_id.as_str().to_string(), record.state))
            }
            CommandEntry::Mutating { .. } => None,
        })
        .collect()
}
