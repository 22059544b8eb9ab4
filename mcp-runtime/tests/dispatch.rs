mod common;

use common::{FakeCloud, Harness, body};
use gcp_ops_core::ProviderError;
use gcp_ops_core::diagram::Inventory;
use gcp_ops_mcp_runtime::dispatch::{
    DEPLOYMENT_APPROVAL_REQUIRED, GCE_RESTART_UNSUPPORTED, RUN_START_STOP_UNSUPPORTED,
};
use serde_json::json;

#[tokio::test]
async fn project_scoped_tool_without_any_project_explains_how_to_pick_one() {
    let harness = Harness::new(None);

    let response = harness
        .call("get_service_health", json!({ "service": "payments-api" }))
        .await;

    assert!(response.is_error);
    let text = response.text_content();
    assert!(text.contains("list_projects"), "{text}");
    assert!(text.contains("set_active_project"), "{text}");
    assert!(harness.cloud.calls().is_empty());
}

#[tokio::test]
async fn active_project_is_used_when_no_project_is_passed() {
    let harness = Harness::new(Some("demo-proj"));

    let response = harness
        .call("get_ci_pipeline_status", json!({ "repo": "svc-a" }))
        .await;

    let body = body(&response);
    assert_eq!(body["project"], "demo-proj");
    assert_eq!(body["repo"], "svc-a");
    assert_eq!(body["lastStatus"], "SUCCESS");
    assert_eq!(harness.cloud.calls(), vec!["pipeline_status demo-proj svc-a"]);
}

#[tokio::test]
async fn explicit_project_overrides_without_touching_the_session() {
    let harness = Harness::new(Some("demo-proj"));

    let response = harness
        .call("check_quota_status", json!({ "project": "other-proj" }))
        .await;

    let body = body(&response);
    assert_eq!(body["project"], "other-proj");
    assert_eq!(body["quotas"][0]["status"], "critical");
    assert_eq!(harness.active_project().as_deref(), Some("demo-proj"));
    assert_eq!(harness.cloud.calls(), vec!["quota_status other-proj"]);
}

#[tokio::test]
async fn unknown_tool_is_reported_and_nothing_changes() {
    let harness = Harness::new(Some("demo-proj"));

    let response = harness.call("frobnicate", json!({})).await;

    assert!(response.is_error);
    assert_eq!(response.text_content(), "Unknown tool: frobnicate");
    assert_eq!(harness.active_project().as_deref(), Some("demo-proj"));
    assert!(harness.cloud.calls().is_empty());
}

#[tokio::test]
async fn deployment_without_approval_never_reaches_cloud_build() {
    let harness = Harness::new(Some("demo-proj"));

    let response = harness
        .call(
            "trigger_deployment",
            json!({ "service": "payments-api", "approval": false }),
        )
        .await;

    assert!(response.is_error);
    assert_eq!(response.text_content(), DEPLOYMENT_APPROVAL_REQUIRED);
    assert!(harness.cloud.calls().is_empty());
}

#[tokio::test]
async fn approval_is_checked_before_the_project() {
    let harness = Harness::new(None);

    let response = harness
        .call(
            "trigger_deployment",
            json!({ "service": "payments-api", "approval": false }),
        )
        .await;

    assert_eq!(response.text_content(), DEPLOYMENT_APPROVAL_REQUIRED);
}

#[tokio::test]
async fn approved_deployment_runs_the_trigger() {
    let harness = Harness::new(Some("demo-proj"));

    let response = harness
        .call(
            "trigger_deployment",
            json!({ "service": "payments-api", "approval": true }),
        )
        .await;

    let body = body(&response);
    assert_eq!(body["buildId"], "b-123");
    assert_eq!(body["service"], "payments-api");
    assert_eq!(
        harness.cloud.calls(),
        vec!["trigger_deployment demo-proj payments-api"]
    );
}

#[tokio::test]
async fn unsupported_resource_actions_are_refused_before_any_call() {
    let harness = Harness::new(Some("demo-proj"));

    let restart_vm = harness
        .call(
            "manage_resource",
            json!({
                "resourceType": "gce",
                "resourceName": "batch-1",
                "action": "restart",
                "location": "us-central1-a"
            }),
        )
        .await;
    assert!(restart_vm.is_error);
    assert_eq!(restart_vm.text_content(), GCE_RESTART_UNSUPPORTED);

    for action in ["start", "stop"] {
        let response = harness
            .call(
                "manage_resource",
                json!({
                    "resourceType": "run",
                    "resourceName": "payments-api",
                    "action": action,
                    "location": "us-central1"
                }),
            )
            .await;
        assert!(response.is_error);
        assert_eq!(response.text_content(), RUN_START_STOP_UNSUPPORTED);
    }

    assert!(harness.cloud.calls().is_empty());
}

#[tokio::test]
async fn supported_resource_action_is_submitted() {
    let harness = Harness::new(Some("demo-proj"));

    let response = harness
        .call(
            "manage_resource",
            json!({
                "resourceType": "gce",
                "resourceName": "batch-1",
                "action": "stop",
                "location": "us-central1-a"
            }),
        )
        .await;

    let body = body(&response);
    assert_eq!(body["target"], "batch-1");
    assert_eq!(
        harness.cloud.calls(),
        vec!["manage_resource demo-proj batch-1 stop"]
    );
}

#[tokio::test]
async fn set_active_project_verifies_then_switches() {
    let harness = Harness::new(Some("demo-proj"));

    let response = harness
        .call("set_active_project", json!({ "projectId": "other-proj" }))
        .await;

    let body = body(&response);
    assert_eq!(body["activeProject"], "other-proj");
    assert_eq!(body["previousProject"], "demo-proj");
    assert_eq!(body["permissions"]["identity"], "ops@example.com");
    assert_eq!(body["permissions"]["capabilities"]["health"], true);
    assert_eq!(harness.active_project().as_deref(), Some("other-proj"));
    assert_eq!(
        harness.cloud.calls(),
        vec!["current_identity", "test_permissions other-proj"]
    );
}

#[tokio::test]
async fn failed_verification_leaves_the_active_project_alone() {
    let cloud = FakeCloud {
        permission_error: Some(ProviderError::Api {
            service: "Resource Manager",
            status: 403,
            message: "The caller does not have permission".to_string(),
        }),
        ..FakeCloud::default()
    };
    let harness = Harness::with_cloud(cloud, Some("demo-proj"));

    let response = harness
        .call("set_active_project", json!({ "projectId": "ghost-proj" }))
        .await;

    assert!(response.is_error);
    assert_eq!(harness.active_project().as_deref(), Some("demo-proj"));
}

#[tokio::test]
async fn partial_permissions_still_switch_and_report_the_gaps() {
    let cloud = FakeCloud {
        granted: vec!["monitoring.timeSeries.list".to_string()],
        ..FakeCloud::default()
    };
    let harness = Harness::with_cloud(cloud, None);

    let response = harness
        .call("set_active_project", json!({ "projectId": "demo-proj" }))
        .await;

    let body = body(&response);
    assert_eq!(body["previousProject"], serde_json::Value::Null);
    assert_eq!(body["permissions"]["capabilities"]["health"], true);
    assert_eq!(body["permissions"]["capabilities"]["cost"], false);
    assert_eq!(
        body["permissions"]["missingPermissions"]
            .as_array()
            .unwrap()
            .len(),
        4
    );
    assert_eq!(harness.active_project().as_deref(), Some("demo-proj"));
}

#[tokio::test]
async fn identity_check_without_a_project_reports_nothing_granted() {
    let harness = Harness::new(None);

    let response = harness.call("test_iam_identity", json!({})).await;

    let body = body(&response);
    assert_eq!(body["identity"]["emailOrLabel"], "ops@example.com");
    assert_eq!(body["permissions"]["projectId"], "");
    assert_eq!(
        body["permissions"]["missingPermissions"]
            .as_array()
            .unwrap()
            .len(),
        5
    );
    assert_eq!(harness.cloud.calls(), vec!["current_identity"]);
}

#[tokio::test]
async fn credential_failures_point_at_reauthentication() {
    let cloud = FakeCloud {
        identity_error: Some(ProviderError::Credentials(
            "gcloud exited with status 1".to_string(),
        )),
        ..FakeCloud::default()
    };
    let harness = Harness::with_cloud(cloud, Some("demo-proj"));

    let response = harness.call("test_iam_identity", json!({})).await;

    assert!(response.is_error);
    let text = response.text_content();
    assert!(text.starts_with("Authentication failed:"), "{text}");
    assert!(text.contains("gcloud auth application-default login"), "{text}");
}

#[tokio::test]
async fn schema_violations_are_validation_errors() {
    let harness = Harness::new(Some("demo-proj"));

    let missing = harness.call("get_service_health", json!({})).await;
    assert!(missing.is_error);
    assert!(missing.text_content().starts_with("Invalid arguments for get_service_health"));

    let extra = harness
        .call("check_quota_status", json!({ "region": "us-central1" }))
        .await;
    assert!(extra.is_error);

    let bad_enum = harness
        .call("audit_security_findings", json!({ "severity": "SEVERE" }))
        .await;
    assert!(bad_enum.is_error);

    let not_an_object = harness.call("list_projects", json!(["demo-proj"])).await;
    assert!(not_an_object.is_error);
    assert_eq!(
        not_an_object.text_content(),
        "Tool arguments must be a JSON object"
    );

    assert!(harness.cloud.calls().is_empty());
}

#[tokio::test]
async fn names_carrying_path_or_filter_syntax_never_reach_a_provider() {
    let harness = Harness::new(Some("demo-proj"));

    let traversal = harness
        .call(
            "manage_resource",
            json!({
                "resourceType": "gce",
                "resourceName": "batch-1/../victim",
                "action": "stop",
                "location": "us-central1-a"
            }),
        )
        .await;
    assert!(traversal.is_error);
    assert!(traversal.text_content().starts_with("Invalid arguments for manage_resource"));

    let quoted = harness
        .call("get_service_health", json!({ "service": "x\" OR resource.type=\"gce_instance" }))
        .await;
    assert!(quoted.is_error);

    let project = harness
        .call("check_quota_status", json!({ "project": "demo-proj/zones/x" }))
        .await;
    assert!(project.is_error);

    assert!(harness.cloud.calls().is_empty());
}

#[tokio::test]
async fn list_projects_includes_the_active_project() {
    let harness = Harness::new(Some("demo-proj"));

    let response = harness.call("list_projects", serde_json::Value::Null).await;

    let body = body(&response);
    assert_eq!(body["activeProject"], "demo-proj");
    assert_eq!(body["projects"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn log_search_reports_the_filter_and_default_limit() {
    let harness = Harness::new(Some("demo-proj"));

    let response = harness
        .call(
            "explore_logs",
            json!({ "severity": "ERROR", "resourceType": "cloud_run_revision" }),
        )
        .await;

    let body = body(&response);
    assert_eq!(
        body["filter"],
        "severity>=ERROR AND resource.type=\"cloud_run_revision\""
    );
    assert_eq!(body["count"], 1);
    assert_eq!(harness.cloud.calls(), vec!["search_logs demo-proj 20"]);
}

#[tokio::test]
async fn findings_and_recommendations_use_their_defaults() {
    let harness = Harness::new(Some("demo-proj"));

    let findings = body(&harness.call("audit_security_findings", json!({})).await);
    assert_eq!(findings["minimumSeverity"], "HIGH");
    assert_eq!(findings["count"], 0);

    let recommendations = body(
        &harness
            .call("get_optimization_recommendations", json!({}))
            .await,
    );
    assert_eq!(recommendations["location"], "global");
    assert_eq!(recommendations["recommendations"][0]["category"], "idle-vm");

    assert_eq!(
        harness.cloud.calls(),
        vec![
            "security_findings demo-proj HIGH",
            "recommendations demo-proj global"
        ]
    );
}

#[tokio::test]
async fn architecture_diagram_renders_mermaid() {
    let harness = Harness::new(Some("demo-proj"));

    let response = harness
        .call("generate_architecture_diagram", json!({}))
        .await;

    let body = body(&response);
    assert!(body["diagram"].as_str().unwrap().starts_with("graph TD"));
    assert!(body["diagram"].as_str().unwrap().contains("payments-api"));
}

#[tokio::test]
async fn empty_project_gets_a_plain_nothing_found_message() {
    let cloud = FakeCloud {
        inventory: Inventory::default(),
        ..FakeCloud::default()
    };
    let harness = Harness::with_cloud(cloud, Some("demo-proj"));

    let response = harness
        .call("generate_architecture_diagram", json!({}))
        .await;

    assert!(!response.is_error);
    assert!(response.text_content().starts_with("No Cloud Run services"));
    assert!(response.text_content().contains("demo-proj"));
}

#[tokio::test]
async fn provider_failures_surface_their_message() {
    let cloud = FakeCloud {
        permission_error: Some(ProviderError::Transport {
            service: "Resource Manager",
            message: "connection reset".to_string(),
        }),
        ..FakeCloud::default()
    };
    let harness = Harness::with_cloud(cloud, None);

    let response = harness
        .call("test_iam_identity", json!({ "project": "demo-proj" }))
        .await;

    assert!(response.is_error);
    assert_eq!(
        response.text_content(),
        "Failed to reach Resource Manager: connection reset"
    );
}
