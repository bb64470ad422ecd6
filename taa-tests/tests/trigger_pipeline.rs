//! Trigger orchestration against in-memory services

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use taa_core::paths::incoming_key;
use taa_core::{RunDate, HORIZONS};
use taa_runtime::trigger::TriggerSettings;
use taa_runtime::{Error, ObjectLocation, ObjectStore, QueryState, TriggerOrchestrator};
use taa_tests::fixtures::{self, horizons, BUCKET, QUERY_BUCKET, QUERY_KEY};
use taa_tests::{
    InMemoryObjectStore, RecordingNotifier, RecordingWorkflowStarter, ScriptedExecution,
    ScriptedQueryEngine, TriggerEventBuilder,
};

const EXECUTION_ARN: &str = "arn:aws:states:us-east-1:123456789012:execution:taa:run-1";

struct Harness {
    store: Arc<InMemoryObjectStore>,
    engine: Arc<ScriptedQueryEngine>,
    workflow: Arc<RecordingWorkflowStarter>,
    notifier: Arc<RecordingNotifier>,
    orchestrator: TriggerOrchestrator,
}

fn harness(scripts: Vec<ScriptedExecution>, notifier: Arc<RecordingNotifier>) -> Harness {
    harness_with_workflow(
        scripts,
        notifier,
        RecordingWorkflowStarter::new(EXECUTION_ARN),
    )
}

fn harness_with_workflow(
    scripts: Vec<ScriptedExecution>,
    notifier: Arc<RecordingNotifier>,
    workflow: Arc<RecordingWorkflowStarter>,
) -> Harness {
    let store = InMemoryObjectStore::new();
    store.insert(BUCKET, QUERY_KEY, fixtures::QUERY_TEMPLATE);

    let engine = ScriptedQueryEngine::new(store.clone(), scripts);
    let orchestrator = TriggerOrchestrator::new(
        TriggerSettings {
            bucket_name: BUCKET.to_string(),
            query_key: QUERY_KEY.to_string(),
            query_bucket_name: QUERY_BUCKET.to_string(),
            result_folder: "query_results".to_string(),
        },
        store.clone(),
        engine.clone(),
        workflow.clone(),
        notifier.clone(),
    );

    Harness {
        store,
        engine,
        workflow,
        notifier,
        orchestrator,
    }
}

fn succeeding_scripts() -> Vec<ScriptedExecution> {
    horizons::all()
        .iter()
        .enumerate()
        .map(|(i, csv)| ScriptedExecution::succeeds_after(i, csv))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_trigger_relocates_three_results_and_starts_one_workflow() {
    let h = harness(succeeding_scripts(), RecordingNotifier::new());
    let event = TriggerEventBuilder::new().date(2024, 1, 9).build();

    let started = tokio::time::Instant::now();
    let outcome = h.orchestrator.trigger(&event).await.unwrap();

    // 0 + 1 + 2 running polls before each success
    assert_eq!(started.elapsed(), Duration::from_secs(15));
    assert_eq!(h.engine.polls(), 6);

    let date = RunDate::new(2024, 1, 9).unwrap();
    let expected_keys: Vec<String> = HORIZONS.iter().map(|h| incoming_key(&date, *h)).collect();
    assert_eq!(outcome.payload.key, expected_keys);
    assert_eq!(outcome.execution_arn, EXECUTION_ARN);

    for (key, csv) in expected_keys.iter().zip(horizons::all()) {
        assert_eq!(h.store.get_text(BUCKET, key).as_deref(), Some(csv));
    }
    assert_eq!(h.store.copies().len(), 3);
    assert_eq!(
        h.store.copies()[0].0.key,
        "query_results/exec-1.csv",
        "results are copied from the engine's output folder"
    );

    assert_eq!(
        h.workflow.inputs(),
        vec![json!({
            "bucket_name": BUCKET,
            "key": expected_keys.clone(),
            "file_date": "010924"
        })]
    );
    assert!(h.notifier.published().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_each_horizon_query_is_rendered_and_written_to_result_folder() {
    let h = harness(succeeding_scripts(), RecordingNotifier::new());
    let event = TriggerEventBuilder::new().date(2023, 8, 5).as_strings().build();

    h.orchestrator.trigger(&event).await.unwrap();

    let submitted = h.engine.submitted();
    assert_eq!(submitted.len(), 3);
    for (i, (query, output)) in submitted.iter().enumerate() {
        assert_eq!(
            query,
            &format!(
                "SELECT * FROM purchase_assets WHERE yyyy = '2023' AND mm = '8' AND dd = '5' AND horizon = {}",
                i + 1
            )
        );
        assert_eq!(output, "s3://taa-athena-results/query_results/");
    }
}

#[tokio::test(start_paused = true)]
async fn test_failed_horizon_alerts_once_and_starts_nothing() {
    let scripts = vec![
        ScriptedExecution::succeeds_after(0, horizons::H1),
        ScriptedExecution::fails("SYNTAX_ERROR: line 1:8"),
        ScriptedExecution::succeeds_after(0, horizons::H3),
    ];
    let h = harness(scripts, RecordingNotifier::new());
    let event = TriggerEventBuilder::new().date(2024, 1, 9).build();

    let err = h.orchestrator.trigger(&event).await.unwrap_err();
    assert_eq!(
        err,
        Error::QueryExecutionFailed {
            state: QueryState::Failed,
            reason: Some("SYNTAX_ERROR: line 1:8".to_string()),
        }
    );

    assert!(h.workflow.inputs().is_empty());
    assert_eq!(h.engine.submitted().len(), 2, "horizon 3 is never submitted");

    let published = h.notifier.published();
    assert_eq!(published.len(), 1);
    assert!(published[0].message.starts_with("Exception: Query execution failed"));
    assert!(published[0].message.contains("Event: "));
    assert!(published[0].message.contains("2024"));
}

#[tokio::test]
async fn test_invalid_event_is_alerted_and_returned() {
    let h = harness(succeeding_scripts(), RecordingNotifier::new());
    let event = TriggerEventBuilder::new().without_day().build();

    let err = h.orchestrator.trigger(&event).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(h.engine.submitted().is_empty());
    assert_eq!(h.notifier.published().len(), 1);
}

#[tokio::test]
async fn test_missing_template_is_resource_unavailable() {
    let h = harness(succeeding_scripts(), RecordingNotifier::new());
    h.store
        .delete_object(&ObjectLocation::new(BUCKET, QUERY_KEY))
        .await
        .unwrap();

    let err = h
        .orchestrator
        .trigger(&TriggerEventBuilder::new().build())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ResourceUnavailable(_)));
    assert!(h.engine.submitted().is_empty());
    assert!(h.workflow.inputs().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_alert_failure_surfaces_as_notification_error() {
    let scripts = vec![
        ScriptedExecution::succeeds_after(0, horizons::H1),
        ScriptedExecution::fails("access denied"),
    ];
    let h = harness(scripts, RecordingNotifier::failing());

    let err = h
        .orchestrator
        .trigger(&TriggerEventBuilder::new().build())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Notification(_)));
    assert_eq!(h.notifier.published().len(), 1);
    assert!(h.workflow.inputs().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_relocation_failure_stops_the_run() {
    let h = harness(succeeding_scripts(), RecordingNotifier::new());
    h.store.fail_writes_under("processing/incoming");

    let err = h
        .orchestrator
        .trigger(&TriggerEventBuilder::new().build())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Storage(_)));
    assert_eq!(h.engine.submitted().len(), 1);
    assert!(h.workflow.inputs().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_missing_execution_id_is_a_workflow_start_failure() {
    let h = harness_with_workflow(
        succeeding_scripts(),
        RecordingNotifier::new(),
        RecordingWorkflowStarter::without_execution_id(),
    );
    let event = TriggerEventBuilder::new().date(2024, 1, 9).build();

    let err = h.orchestrator.trigger(&event).await.unwrap_err();
    assert!(matches!(err, Error::WorkflowStart(_)));

    assert_eq!(h.engine.submitted().len(), 3);
    assert_eq!(h.store.copies().len(), 3);
    assert_eq!(h.workflow.inputs().len(), 1);

    let published = h.notifier.published();
    assert_eq!(published.len(), 1);
    assert!(published[0].message.starts_with("Exception: Workflow start error"));
    assert!(published[0].message.ends_with(&format!("Event: {}", event)));
}

#[tokio::test(start_paused = true)]
async fn test_rejected_workflow_start_is_alerted_and_returned() {
    let h = harness_with_workflow(
        succeeding_scripts(),
        RecordingNotifier::new(),
        RecordingWorkflowStarter::rejecting("ExecutionLimitExceeded"),
    );
    let event = TriggerEventBuilder::new().build();

    let err = h.orchestrator.trigger(&event).await.unwrap_err();
    assert_eq!(
        err,
        Error::WorkflowStart("ExecutionLimitExceeded".to_string())
    );
    assert_eq!(h.store.copies().len(), 3);

    let published = h.notifier.published();
    assert_eq!(published.len(), 1);
    assert!(published[0].message.contains("ExecutionLimitExceeded"));
    assert!(published[0].message.contains(&event.to_string()));
}
