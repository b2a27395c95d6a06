//! Tests for dependency-ordered extension lifecycles driven through a host.

use orrery_core::{
    ExtensionError, ExtensionId, ExtensionState, HookPhase, LifecycleEvent, OrchestratorError,
};
use orrery_tests::{Journal, LogCapture, Plain, RecordingExtension, TestHarness};

fn id(name: &str) -> ExtensionId {
    ExtensionId::from(name)
}

fn register(harness: &TestHarness, extension: RecordingExtension) {
    assert!(harness.host.register(extension.into_arc(), "core").unwrap());
}

#[tokio::test]
async fn test_load_order_places_dependencies_first() {
    let harness = TestHarness::new().unwrap();
    let journal = Journal::new();
    register(&harness, RecordingExtension::new("web", &journal).depends_on(&["db", "cache"]));
    register(&harness, RecordingExtension::new("cache", &journal).depends_on(&["db"]));
    register(&harness, RecordingExtension::new("db", &journal));
    register(&harness, RecordingExtension::new("metrics", &journal));

    let order = harness.orchestrator().load_order().unwrap();
    let position = |name: &str| order.iter().position(|x| x == &id(name)).unwrap();
    assert!(position("db") < position("cache"));
    assert!(position("cache") < position("web"));

    let report = harness.host.start().await.unwrap();
    assert!(report.is_clean());
    assert_eq!(report.loaded, order);

    let mut unload = harness.orchestrator().unload_order().unwrap();
    unload.reverse();
    assert_eq!(unload, order);
}

#[tokio::test]
async fn test_scenario_a_c_b_with_failing_root() {
    let harness = TestHarness::new().unwrap();
    let journal = Journal::new();
    register(&harness, RecordingExtension::new("A", &journal).failing_enable());
    register(&harness, RecordingExtension::new("C", &journal).depends_on(&["A"]));
    register(&harness, RecordingExtension::new("B", &journal).depends_on(&["A"]));

    assert_eq!(
        harness.orchestrator().load_order().unwrap(),
        vec![id("A"), id("C"), id("B")]
    );

    let report = harness.host.start().await.unwrap();
    assert!(report.loaded.is_empty());
    assert_eq!(journal.entries(), vec!["enable:A"]);
    for name in ["A", "B", "C"] {
        assert_eq!(
            harness.orchestrator().state(&id(name)),
            Some(ExtensionState::FailedLoading)
        );
    }
    match &report.failed[0].1 {
        ExtensionError::HookFailure { phase, message, .. } => {
            assert_eq!(*phase, HookPhase::Enable);
            assert!(message.contains("refused to enable"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_cycle_is_rejected_at_registration() {
    let harness = TestHarness::new().unwrap();
    let journal = Journal::new();
    register(&harness, RecordingExtension::new("solo", &journal));
    register(&harness, RecordingExtension::new("p", &journal).depends_on(&["r"]));
    register(&harness, RecordingExtension::new("q", &journal).depends_on(&["p"]));

    let err = harness
        .host
        .register(
            RecordingExtension::new("r", &journal).depends_on(&["q"]).into_arc(),
            "core",
        )
        .unwrap_err();
    match err {
        OrchestratorError::DependencyCycle(message) => {
            assert!(message.contains("p, q, r"), "unexpected message: {message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(harness.orchestrator().ids(), vec![id("solo"), id("p"), id("q")]);
    assert!(journal.entries().is_empty());
    assert!(
        harness
            .orchestrator()
            .states()
            .iter()
            .all(|(_, state)| *state == ExtensionState::Unloaded)
    );
}

#[tokio::test]
async fn test_start_logs_each_enable_failure_once() {
    let logs = LogCapture::global();
    let harness = TestHarness::new().unwrap();
    let journal = Journal::new();
    register(&harness, RecordingExtension::new("loner_once", &journal).failing_enable());

    let report = harness.host.start().await.unwrap();
    assert_eq!(report.failed_ids(), vec![&id("loner_once")]);
    assert_eq!(logs.count(&["loner_once refused to enable"]), 1);

    // A second batch leaves the failed extension alone.
    harness.host.start().await.unwrap();
    assert_eq!(journal.entries(), vec!["enable:loner_once"]);
    assert_eq!(logs.count(&["loner_once refused to enable"]), 1);
}

#[tokio::test]
async fn test_panicking_enable_hook_fails_loading() {
    let harness = TestHarness::new().unwrap();
    let journal = Journal::new();
    register(&harness, RecordingExtension::new("fragile", &journal).panicking_enable());
    register(&harness, RecordingExtension::new("sturdy", &journal));

    let report = harness.host.start().await.unwrap();
    assert_eq!(report.loaded, vec![id("sturdy")]);
    assert_eq!(
        harness.orchestrator().state(&id("fragile")),
        Some(ExtensionState::FailedLoading)
    );
    match &report.failed[0].1 {
        ExtensionError::HookFailure { message, .. } => {
            assert!(message.contains("panicked"), "unexpected message: {message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // Only loaded extensions are stopped.
    journal.clear();
    assert_eq!(harness.host.teardown().await.exit_code(), 0);
    assert_eq!(journal.entries(), vec!["disable:sturdy"]);
}

#[tokio::test]
async fn test_failed_unload_reaches_caller_and_exit_code() {
    let harness = TestHarness::new().unwrap();
    let journal = Journal::new();
    register(&harness, RecordingExtension::new("base", &journal));
    register(
        &harness,
        RecordingExtension::new("top", &journal)
            .depends_on(&["base"])
            .failing_disable(),
    );
    harness.host.start().await.unwrap();
    journal.clear();

    let report = harness.host.teardown().await;
    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.unload_failures.len(), 1);
    assert_eq!(report.unload_failures[0].extension(), &id("top"));
    assert_eq!(journal.entries(), vec!["disable:top", "disable:base"]);
    assert_eq!(
        harness.orchestrator().state(&id("top")),
        Some(ExtensionState::FailedUnloading)
    );
    assert_eq!(
        harness.orchestrator().state(&id("base")),
        Some(ExtensionState::Unloaded)
    );
}

#[tokio::test]
async fn test_teardown_flushes_configs_after_stopping() {
    let harness = TestHarness::new().unwrap();
    let journal = Journal::new();
    register(&harness, RecordingExtension::new("user", &journal));
    harness.host.start().await.unwrap();

    let record = harness.cache().get::<Plain>().await.unwrap();
    record.update(|p: &mut Plain| p.value = 11).unwrap();
    let renders = harness.format.renders();

    let report = harness.host.teardown().await;
    assert!(report.is_clean());
    assert_eq!(harness.format.renders(), renders + 1);
    assert!(harness.read_config("plain.yml").unwrap().contains("value: 11"));
}

#[tokio::test]
async fn test_lifecycle_events_carry_extension_and_state() {
    let harness = TestHarness::new().unwrap();
    let journal = Journal::new();
    register(&harness, RecordingExtension::new("ok", &journal));
    register(&harness, RecordingExtension::new("bad", &journal).failing_enable());
    let mut events = harness.orchestrator().subscribe();

    harness.host.start().await.unwrap();

    let mut seen: Vec<LifecycleEvent> = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    let transitions: Vec<(String, ExtensionState)> = seen
        .iter()
        .map(|e| (e.extension.to_string(), e.state))
        .collect();
    assert_eq!(
        transitions,
        vec![
            ("ok".to_string(), ExtensionState::Loading),
            ("ok".to_string(), ExtensionState::Loaded),
            ("bad".to_string(), ExtensionState::Loading),
            ("bad".to_string(), ExtensionState::FailedLoading),
        ]
    );
    assert!(seen.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[tokio::test]
async fn test_disabled_extension_is_skipped_by_host() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut settings = orrery_core::HostSettings {
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    settings.extensions.insert("quiet".to_string(), false);
    let host = orrery_core::Host::new(settings);
    host.add_module("core");

    let journal = Journal::new();
    let registered = host
        .register(RecordingExtension::new("quiet", &journal).into_arc(), "core")
        .unwrap();
    assert!(!registered);
    assert!(host.start().await.unwrap().loaded.is_empty());
    assert!(journal.entries().is_empty());
}
