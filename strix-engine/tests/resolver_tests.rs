//! Parameter precedence tests

mod common;

use common::harness;
use serde_json::json;
use std::collections::HashMap;
use strix_engine::models::{Job, ValueScope};
use strix_engine::EngineError;
use uuid::Uuid;

const MANIFEST: &str = r#"
[[plugins]]
name = "AnalyzerX"
kind = "analyzer"
entry_point = "analyzers.generic"

[[plugins.parameters]]
name = "api_key_name"
kind = "str"
is_secret = true
required = true

[[plugins.parameters]]
name = "max_age_days"
kind = "int"
required = false
"#;

fn override_for(plugin: &str, param: &str, value: serde_json::Value) -> Job {
    let mut runtime = HashMap::new();
    runtime.insert(
        plugin.to_string(),
        HashMap::from([(param.to_string(), value)]),
    );
    Job::new("1.2.3.4", "ip", None).with_runtime_configuration(runtime)
}

#[tokio::test]
async fn user_scope_wins_over_organization_and_default() {
    let h = harness(MANIFEST).await;
    let user = Uuid::new_v4();
    let org = Uuid::new_v4();
    let owner = Uuid::new_v4();
    h.directory.enroll(user, org, owner);

    // All three tiers present simultaneously
    h.store
        .upsert(ValueScope::Default, "AnalyzerX", "api_key_name", &json!("def-key"))
        .await
        .unwrap();
    h.store
        .upsert(
            ValueScope::Organization { org_id: org },
            "AnalyzerX",
            "api_key_name",
            &json!("org-key"),
        )
        .await
        .unwrap();
    h.store
        .upsert(
            ValueScope::User { user_id: user },
            "AnalyzerX",
            "api_key_name",
            &json!("user-key"),
        )
        .await
        .unwrap();

    let plugin = h.registry.get("AnalyzerX").unwrap();
    let job = Job::new("1.2.3.4", "ip", Some(user));
    let params = h.resolver.read_params(&plugin, &job).await.unwrap();
    assert_eq!(params["api_key_name"], json!("user-key"));
}

#[tokio::test]
async fn runtime_override_wins_without_any_stored_value() {
    // Scenario: override {"AnalyzerX": {"api_key_name": "abc"}}, store empty
    let h = harness(MANIFEST).await;
    let job = override_for("AnalyzerX", "api_key_name", json!("abc"));

    let plugin = h.registry.get("AnalyzerX").unwrap();
    let params = h.resolver.read_params(&plugin, &job).await.unwrap();
    assert_eq!(params["api_key_name"], json!("abc"));
}

#[tokio::test]
async fn organization_value_beats_default() {
    // Scenario: no override, no user value; user in org with "org-key",
    // default "def-key" also present
    let h = harness(MANIFEST).await;
    let user = Uuid::new_v4();
    let org = Uuid::new_v4();
    h.directory.enroll(user, org, Uuid::new_v4());

    h.store
        .upsert(ValueScope::Default, "AnalyzerX", "api_key_name", &json!("def-key"))
        .await
        .unwrap();
    h.store
        .upsert(
            ValueScope::Organization { org_id: org },
            "AnalyzerX",
            "api_key_name",
            &json!("org-key"),
        )
        .await
        .unwrap();

    let plugin = h.registry.get("AnalyzerX").unwrap();
    let job = Job::new("1.2.3.4", "ip", Some(user));
    let params = h.resolver.read_params(&plugin, &job).await.unwrap();
    assert_eq!(params["api_key_name"], json!("org-key"));
}

#[tokio::test]
async fn organization_value_is_invisible_outside_the_organization() {
    let h = harness(MANIFEST).await;
    let org = Uuid::new_v4();
    h.store
        .upsert(
            ValueScope::Organization { org_id: org },
            "AnalyzerX",
            "api_key_name",
            &json!("org-key"),
        )
        .await
        .unwrap();

    // A user with no membership falls through to... nothing
    let outsider = Uuid::new_v4();
    let plugin = h.registry.get("AnalyzerX").unwrap();
    let job = Job::new("1.2.3.4", "ip", Some(outsider));
    let err = h.resolver.read_params(&plugin, &job).await;
    assert!(matches!(
        err,
        Err(EngineError::ParameterNotConfigured { .. })
    ));
}

#[tokio::test]
async fn required_parameter_without_value_raises_optional_is_omitted() {
    let h = harness(MANIFEST).await;
    let plugin = h.registry.get("AnalyzerX").unwrap();
    let job = Job::new("1.2.3.4", "ip", None);

    // Both parameters unset: the required one aborts resolution
    let err = h.resolver.read_params(&plugin, &job).await;
    match err {
        Err(EngineError::ParameterNotConfigured { plugin, parameter }) => {
            assert_eq!(plugin, "AnalyzerX");
            assert_eq!(parameter, "api_key_name");
        }
        other => panic!("expected ParameterNotConfigured, got {other:?}"),
    }

    // Satisfy the required one; the optional one is silently omitted
    h.store
        .upsert(ValueScope::Default, "AnalyzerX", "api_key_name", &json!("k"))
        .await
        .unwrap();
    let params = h.resolver.read_params(&plugin, &job).await.unwrap();
    assert_eq!(params["api_key_name"], json!("k"));
    assert!(!params.contains_key("max_age_days"));
}

#[tokio::test]
async fn anonymous_jobs_resolve_from_defaults_only() {
    let h = harness(MANIFEST).await;
    h.store
        .upsert(ValueScope::Default, "AnalyzerX", "api_key_name", &json!("def"))
        .await
        .unwrap();
    h.store
        .upsert(
            ValueScope::User {
                user_id: Uuid::new_v4(),
            },
            "AnalyzerX",
            "api_key_name",
            &json!("someone-elses"),
        )
        .await
        .unwrap();

    let plugin = h.registry.get("AnalyzerX").unwrap();
    let job = Job::new("1.2.3.4", "ip", None);
    let params = h.resolver.read_params(&plugin, &job).await.unwrap();
    assert_eq!(params["api_key_name"], json!("def"));
}

#[tokio::test]
async fn optional_parameter_resolves_when_present() {
    let h = harness(MANIFEST).await;
    h.store
        .upsert(ValueScope::Default, "AnalyzerX", "api_key_name", &json!("k"))
        .await
        .unwrap();
    h.store
        .upsert(ValueScope::Default, "AnalyzerX", "max_age_days", &json!(30))
        .await
        .unwrap();

    let plugin = h.registry.get("AnalyzerX").unwrap();
    let job = Job::new("1.2.3.4", "ip", None);
    let params = h.resolver.read_params(&plugin, &job).await.unwrap();
    assert_eq!(params["max_age_days"], json!(30));
}
