#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gcp_ops_core::diagram::{Inventory, RunService};
use gcp_ops_core::model::{
    CostBreakdown, Deployment, FindingSeverity, Identity, LogEntry, LogQuery, PipelineStatus,
    ProjectSummary, QuotaUsage, Recommendation, ResourceOperation, ResourceRequest,
    SecurityFinding, ServiceHealth,
};
use gcp_ops_core::provider::{
    BillingProvider, BuildProvider, ComputeProvider, IdentityProvider, InventoryProvider,
    LoggingProvider, MonitoringProvider, QuotaProvider, RecommendationProvider, SecurityProvider,
};
use gcp_ops_core::{ProviderError, ProviderResult, Providers};
use gcp_ops_mcp_runtime::{Catalog, Dispatcher, Session, ToolRequest, ToolResponse};
use serde_json::Value;

/// Deterministic cloud that records every provider call as `"<method> <project>"`.
pub struct FakeCloud {
    pub calls: Mutex<Vec<String>>,
    pub granted: Vec<String>,
    pub permission_error: Option<ProviderError>,
    pub identity_error: Option<ProviderError>,
    pub inventory: Inventory,
}

impl Default for FakeCloud {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            granted: gcp_ops_core::required_permissions()
                .into_iter()
                .map(str::to_string)
                .collect(),
            permission_error: None,
            identity_error: None,
            inventory: Inventory {
                run_services: vec![RunService {
                    name: "payments-api".to_string(),
                    region: "us-central1".to_string(),
                    url: None,
                }],
                ..Inventory::default()
            },
        }
    }
}

impl FakeCloud {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityProvider for FakeCloud {
    async fn list_projects(&self) -> ProviderResult<Vec<ProjectSummary>> {
        self.record("list_projects");
        Ok(vec![
            ProjectSummary {
                project_id: "demo-proj".to_string(),
                name: "Demo".to_string(),
                state: "ACTIVE".to_string(),
            },
            ProjectSummary {
                project_id: "other-proj".to_string(),
                name: "Other".to_string(),
                state: "ACTIVE".to_string(),
            },
        ])
    }

    async fn current_identity(&self) -> ProviderResult<Identity> {
        self.record("current_identity");
        if let Some(err) = &self.identity_error {
            return Err(err.clone());
        }
        Ok(Identity {
            email_or_label: "ops@example.com".to_string(),
            project_id: "home-proj".to_string(),
            auth_method: "access_token".to_string(),
        })
    }

    async fn test_permissions(
        &self,
        project_id: &str,
        permissions: &[&str],
    ) -> ProviderResult<Vec<String>> {
        self.record(format!("test_permissions {project_id}"));
        if let Some(err) = &self.permission_error {
            return Err(err.clone());
        }
        Ok(self
            .granted
            .iter()
            .filter(|p| permissions.contains(&p.as_str()))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MonitoringProvider for FakeCloud {
    async fn service_health(&self, project_id: &str, service: &str) -> ProviderResult<ServiceHealth> {
        self.record(format!("service_health {project_id} {service}"));
        Ok(ServiceHealth {
            cpu_usage: 42.0,
            error_rate: 0.5,
            latency_p95: 180.0,
            pod_health: "healthy".to_string(),
            health_score: 98,
        })
    }
}

#[async_trait]
impl BillingProvider for FakeCloud {
    async fn cost_breakdown(&self, project_id: &str) -> ProviderResult<CostBreakdown> {
        self.record(format!("cost_breakdown {project_id}"));
        Ok(CostBreakdown {
            month_total: 1234.5,
            top_cost_service: Some("Cloud Run".to_string()),
            percentage_change: Some(4.2),
            anomaly_detected: false,
            billing_enabled: true,
        })
    }
}

#[async_trait]
impl BuildProvider for FakeCloud {
    async fn trigger_deployment(&self, project_id: &str, service: &str) -> ProviderResult<Deployment> {
        self.record(format!("trigger_deployment {project_id} {service}"));
        Ok(Deployment {
            build_id: "b-123".to_string(),
            status: "QUEUED".to_string(),
            environment: "production".to_string(),
        })
    }

    async fn pipeline_status(&self, project_id: &str, repo: &str) -> ProviderResult<PipelineStatus> {
        self.record(format!("pipeline_status {project_id} {repo}"));
        Ok(PipelineStatus {
            last_status: "SUCCESS".to_string(),
            duration_seconds: Some(312),
            last_commit: Some("abc1234".to_string()),
        })
    }
}

#[async_trait]
impl LoggingProvider for FakeCloud {
    async fn search_logs(&self, project_id: &str, query: &LogQuery) -> ProviderResult<Vec<LogEntry>> {
        self.record(format!("search_logs {project_id} {}", query.limit));
        Ok(vec![LogEntry {
            timestamp: Some("2026-10-01T12:00:00Z".to_string()),
            severity: "ERROR".to_string(),
            resource_type: Some("cloud_run_revision".to_string()),
            message: "upstream timeout".to_string(),
        }])
    }
}

#[async_trait]
impl ComputeProvider for FakeCloud {
    async fn manage_resource(
        &self,
        project_id: &str,
        request: &ResourceRequest,
    ) -> ProviderResult<ResourceOperation> {
        self.record(format!(
            "manage_resource {project_id} {} {}",
            request.name,
            request.action.as_str()
        ));
        Ok(ResourceOperation {
            status: "RUNNING".to_string(),
            operation_id: "op-1".to_string(),
            target: request.name.clone(),
        })
    }
}

#[async_trait]
impl SecurityProvider for FakeCloud {
    async fn security_findings(
        &self,
        project_id: &str,
        severity: FindingSeverity,
    ) -> ProviderResult<Vec<SecurityFinding>> {
        self.record(format!("security_findings {project_id} {}", severity.as_str()));
        Ok(Vec::new())
    }
}

#[async_trait]
impl RecommendationProvider for FakeCloud {
    async fn recommendations(
        &self,
        project_id: &str,
        location: &str,
    ) -> ProviderResult<Vec<Recommendation>> {
        self.record(format!("recommendations {project_id} {location}"));
        Ok(vec![Recommendation {
            category: "idle-vm".to_string(),
            description: "Stop idle instance batch-1".to_string(),
            priority: Some("P2".to_string()),
            estimated_monthly_savings: Some(31.5),
            currency: Some("USD".to_string()),
        }])
    }
}

#[async_trait]
impl QuotaProvider for FakeCloud {
    async fn quota_status(&self, project_id: &str) -> ProviderResult<Vec<QuotaUsage>> {
        self.record(format!("quota_status {project_id}"));
        Ok(vec![gcp_ops_core::insights::quota_usage("CPUS", 23.0, 24.0)])
    }
}

#[async_trait]
impl InventoryProvider for FakeCloud {
    async fn inventory(&self, project_id: &str) -> ProviderResult<Inventory> {
        self.record(format!("inventory {project_id}"));
        Ok(self.inventory.clone())
    }
}

pub struct Harness {
    pub cloud: Arc<FakeCloud>,
    pub dispatcher: Dispatcher,
}

impl Harness {
    pub fn new(active_project: Option<&str>) -> Self {
        Self::with_cloud(FakeCloud::default(), active_project)
    }

    pub fn with_cloud(cloud: FakeCloud, active_project: Option<&str>) -> Self {
        let cloud = Arc::new(cloud);
        let session = Arc::new(Session::new(active_project.map(str::to_string)));
        let dispatcher = Dispatcher::new(
            Catalog::new().unwrap(),
            session,
            Providers::from_shared(cloud.clone()),
        );
        Self { cloud, dispatcher }
    }

    pub async fn call(&self, name: &str, arguments: Value) -> ToolResponse {
        self.dispatcher
            .handle(ToolRequest::new(name, arguments))
            .await
    }

    pub fn active_project(&self) -> Option<String> {
        self.dispatcher.session().get()
    }
}

/// Parse the JSON document a successful tool returned.
pub fn body(response: &ToolResponse) -> Value {
    assert!(
        !response.is_error,
        "expected success, got: {}",
        response.text_content()
    );
    serde_json::from_str(&response.text_content()).unwrap()
}
