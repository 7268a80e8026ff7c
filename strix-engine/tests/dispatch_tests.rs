//! Task signature building tests

mod common;

use common::harness;
use serde_json::json;
use std::collections::HashMap;
use strix_engine::handlers::PIPELINE_STATUS_ENTRY_POINT;
use strix_engine::models::{Job, JobStatus, TaskArgs, ValueScope};
use strix_engine::EngineError;
use uuid::Uuid;

const MANIFEST: &str = r#"
[[plugins]]
name = "Shodan"
kind = "analyzer"
entry_point = "analyzers.generic"
queue = "long"
soft_time_limit = 300

[[plugins.parameters]]
name = "api_key_name"
kind = "str"
is_secret = true
required = true

[[plugins.parameters]]
name = "max_results"
kind = "int"
required = false
"#;

#[tokio::test]
async fn build_populates_the_descriptor_from_the_plugin_config() {
    let h = harness(MANIFEST).await;
    h.store
        .upsert(ValueScope::Default, "Shodan", "api_key_name", &json!("key"))
        .await
        .unwrap();

    let job = Job::new("8.8.8.8", "ip", None);
    let descriptor = h.builder.build("Shodan", &job).await.unwrap();

    assert_eq!(descriptor.job_id, job.id);
    assert_eq!(descriptor.entry_point, "analyzers.generic");
    assert_eq!(descriptor.queue, "long");
    assert_eq!(descriptor.soft_time_limit, 300);
    assert_eq!(descriptor.message_group, descriptor.task_id.to_string());
    assert!(descriptor.dependencies.is_empty());
    assert!(!descriptor.is_stage_transition());

    match &descriptor.args {
        TaskArgs::RunPlugin { plugin, params, .. } => {
            assert_eq!(plugin, "Shodan");
            assert_eq!(params["api_key_name"], json!("key"));
            assert!(!params.contains_key("max_results"));
        }
        other => panic!("expected RunPlugin args, got {other:?}"),
    }
}

#[tokio::test]
async fn idempotency_tokens_are_fresh_per_attempt() {
    let h = harness(MANIFEST).await;
    h.store
        .upsert(ValueScope::Default, "Shodan", "api_key_name", &json!("key"))
        .await
        .unwrap();

    let job = Job::new("8.8.8.8", "ip", None);
    let first = h.builder.build("Shodan", &job).await.unwrap();
    let second = h.builder.build("Shodan", &job).await.unwrap();

    // Same plugin, same job: still two distinct attempts
    assert_ne!(first.task_id, second.task_id);
    assert_ne!(first.message_group, second.message_group);
}

#[tokio::test]
async fn build_refuses_a_plugin_that_is_not_runnable() {
    let h = harness(MANIFEST).await;
    // Required api_key_name has no stored value
    let job = Job::new("8.8.8.8", "ip", None);
    let err = h.builder.build("Shodan", &job).await;
    match err {
        Err(EngineError::PluginNotRunnable { plugin, reason }) => {
            assert_eq!(plugin, "Shodan");
            assert!(reason.to_string().contains("api_key_name"));
        }
        other => panic!("expected PluginNotRunnable, got {other:?}"),
    }

    let err = h.builder.build("Unregistered", &job).await;
    assert!(matches!(err, Err(EngineError::PluginNotFound(_))));
}

#[tokio::test]
async fn runnability_gate_ignores_runtime_overrides() {
    // A runtime override satisfies resolution but not the stored-value
    // runnability check; dispatch still refuses the plugin.
    let h = harness(MANIFEST).await;
    let mut runtime = HashMap::new();
    runtime.insert(
        "Shodan".to_string(),
        HashMap::from([("api_key_name".to_string(), json!("abc"))]),
    );
    let job = Job::new("8.8.8.8", "ip", None).with_runtime_configuration(runtime);

    let err = h.builder.build("Shodan", &job).await;
    assert!(matches!(err, Err(EngineError::PluginNotRunnable { .. })));
}

#[tokio::test]
async fn runtime_override_is_echoed_into_the_descriptor() {
    let h = harness(MANIFEST).await;
    h.store
        .upsert(ValueScope::Default, "Shodan", "api_key_name", &json!("stored"))
        .await
        .unwrap();

    let mut runtime = HashMap::new();
    runtime.insert(
        "Shodan".to_string(),
        HashMap::from([("max_results".to_string(), json!(10))]),
    );
    let job = Job::new("8.8.8.8", "ip", None).with_runtime_configuration(runtime);

    let descriptor = h.builder.build("Shodan", &job).await.unwrap();
    match &descriptor.args {
        TaskArgs::RunPlugin {
            params,
            runtime_configuration,
            ..
        } => {
            assert_eq!(params["max_results"], json!(10));
            assert_eq!(params["api_key_name"], json!("stored"));
            assert_eq!(runtime_configuration["max_results"], json!(10));
        }
        other => panic!("expected RunPlugin args, got {other:?}"),
    }
}

#[tokio::test]
async fn stage_transition_descriptor_shape() {
    let h = harness(MANIFEST).await;
    let job_id = Uuid::new_v4();
    let deps = vec![Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];

    let descriptor =
        h.builder
            .build_stage_transition(job_id, JobStatus::AnalyzersCompleted, deps.clone());

    assert!(descriptor.is_stage_transition());
    assert_eq!(descriptor.entry_point, PIPELINE_STATUS_ENTRY_POINT);
    assert_eq!(descriptor.queue, "default");
    // Fixed short limit: transitions only flip a status
    assert_eq!(descriptor.soft_time_limit, 10);
    assert_eq!(descriptor.dependencies, deps);
    match descriptor.args {
        TaskArgs::SetPipelineStatus { job_id: id, status } => {
            assert_eq!(id, job_id);
            assert_eq!(status, JobStatus::AnalyzersCompleted);
        }
        other => panic!("expected SetPipelineStatus args, got {other:?}"),
    }
}
