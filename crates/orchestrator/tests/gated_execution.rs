//! End-to-end runs through the registry: sync, validate, then the gate.
//!
//! The meltano binding is pointed at `sh`, so `meltano run <tap> <target>`
//! becomes `sh run <tap> <target>` against a script in the project dir.
#![cfg(unix)]

use lorch_orchestrator::{
    AdapterRegistry, ExecuteOptions, ExecutionError, OrchestratorError, ToolAdapter,
};
use lorch_state::Settings;
use lorch_sync::CacheStatus;
use lorch_test_utils::{TestFixture, GMAIL_CONFLICT_MELTANO_YML, GMAIL_OK_MELTANO_YML};
use lorch_validate::{TaskSpec, SINK_EXISTS};
use std::collections::BTreeMap;

const RUN_SCRIPT: &str = r#"touch ran
if [ "$LORCH_FAIL" = 1 ]; then
  echo "extractor crashed" >&2
  exit 4
fi
echo "ran $1 -> $2"
printf 'q=%s\n' "$TAP_GMAIL_MESSAGES_Q"
"#;

fn registry(fixture: &TestFixture) -> AdapterRegistry {
    fixture.write_native("run", RUN_SCRIPT).unwrap();
    let settings = Settings::from_toml(
        "[tools.meltano]\nbinary = \"sh\"\n",
        fixture.project.clone(),
    )
    .unwrap();
    AdapterRegistry::builtin(&settings, &fixture.cache)
}

fn meltano(registry: &AdapterRegistry) -> &dyn ToolAdapter {
    registry.get("meltano").unwrap()
}

#[test]
fn synced_config_lists_declared_actions() {
    let fixture = TestFixture::new().unwrap();
    fixture.write_native("meltano.yml", GMAIL_OK_MELTANO_YML).unwrap();
    let registry = registry(&fixture);

    meltano(&registry).sync().unwrap();
    let config = meltano(&registry).load_cached_config().unwrap();

    assert_eq!(config.sources.keys().collect::<Vec<_>>(), ["tap-gmail"]);
    assert_eq!(config.sinks.keys().collect::<Vec<_>>(), ["target-jsonl"]);
    assert!(fixture.cache_file("meltano").is_file());
}

#[test]
fn undeclared_sink_is_reported_by_name() {
    let fixture = TestFixture::new().unwrap();
    fixture.write_native("meltano.yml", GMAIL_OK_MELTANO_YML).unwrap();
    let registry = registry(&fixture);
    meltano(&registry).sync().unwrap();

    let result = meltano(&registry)
        .validate(&TaskSpec::new("tap-gmail", "missing"))
        .unwrap();

    assert!(!result.is_valid());
    assert_eq!(result.errors().len(), 1);
    assert_eq!(result.errors()[0].rule, SINK_EXISTS);
    assert!(result.errors()[0].message.contains("missing"));
}

#[test]
fn valid_task_runs_with_overrides_as_env() {
    let fixture = TestFixture::new().unwrap();
    fixture.write_native("meltano.yml", GMAIL_OK_MELTANO_YML).unwrap();
    let registry = registry(&fixture);
    meltano(&registry).sync().unwrap();

    let task =
        TaskSpec::new("tap-gmail", "target-jsonl").with_override("messages.q", "after:2025/01/01");
    let outcome = meltano(&registry)
        .execute(&task, &ExecuteOptions::default())
        .unwrap();

    let result = outcome.result().expect("task should have run");
    assert_eq!(result.exit_code, 0);
    assert!(result.stdout.contains("ran tap-gmail -> target-jsonl"));
    assert!(result.stdout.contains("q=after:2025/01/01"));
    assert!(fixture.project.join("ran").exists());
}

#[test]
fn conflicting_selection_blocks_execution() {
    let fixture = TestFixture::new().unwrap();
    fixture
        .write_native("meltano.yml", GMAIL_CONFLICT_MELTANO_YML)
        .unwrap();
    let registry = registry(&fixture);
    meltano(&registry).sync().unwrap();

    let err = meltano(&registry)
        .execute(
            &TaskSpec::new("tap-gmail", "target-jsonl"),
            &ExecuteOptions::default(),
        )
        .unwrap_err();

    let result = err.validation().expect("gate should carry the validation");
    assert!(result
        .errors()
        .iter()
        .any(|e| e.message.contains("message_list")));
    assert!(!fixture.project.join("ran").exists());
}

#[test]
fn non_zero_exit_is_an_execution_error() {
    let fixture = TestFixture::new().unwrap();
    fixture.write_native("meltano.yml", GMAIL_OK_MELTANO_YML).unwrap();
    let registry = registry(&fixture);
    meltano(&registry).sync().unwrap();

    let options = ExecuteOptions {
        extra_env: BTreeMap::from([("LORCH_FAIL".to_string(), "1".to_string())]),
        ..Default::default()
    };
    let err = meltano(&registry)
        .execute(&TaskSpec::new("tap-gmail", "target-jsonl"), &options)
        .unwrap_err();

    match err {
        OrchestratorError::Execution(ExecutionError::NonZeroExit {
            exit_code, stderr, ..
        }) => {
            assert_eq!(exit_code, Some(4));
            assert!(stderr.contains("extractor crashed"));
        }
        other => panic!("expected a non-zero exit, got {other}"),
    }
}

#[test]
fn execution_uses_the_in_memory_snapshot_until_resync() {
    let fixture = TestFixture::new().unwrap();
    fixture.write_native("meltano.yml", GMAIL_OK_MELTANO_YML).unwrap();
    let registry = registry(&fixture);
    let adapter = meltano(&registry);
    adapter.sync().unwrap();

    fixture
        .write_native("meltano.yml", GMAIL_CONFLICT_MELTANO_YML)
        .unwrap();
    assert!(matches!(adapter.status().unwrap(), CacheStatus::Stale { .. }));

    let task = TaskSpec::new("tap-gmail", "target-jsonl");
    assert!(adapter
        .execute(&task, &ExecuteOptions::dry_run())
        .is_ok());

    adapter.sync().unwrap();
    assert!(adapter.status().unwrap().is_fresh());
    assert!(matches!(
        adapter.execute(&task, &ExecuteOptions::dry_run()),
        Err(OrchestratorError::ValidationFailed(_))
    ));
}

#[test]
fn unsynced_tools_refuse_to_run() {
    let fixture = TestFixture::new().unwrap();
    let registry = registry(&fixture);

    for adapter in registry.iter() {
        assert!(adapter.record().is_none());
        assert!(matches!(
            adapter.execute(&TaskSpec::new("a", "b"), &ExecuteOptions::default()),
            Err(OrchestratorError::ConfigNotFound { .. })
        ));
    }
}
