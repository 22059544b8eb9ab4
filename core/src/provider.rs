//! Capability provider seams.
//!
//! One narrow trait per tool family. The dispatcher depends only on these,
//! so tests substitute deterministic fakes and production wires the Google
//! Cloud adapters.

use std::sync::Arc;

use async_trait::async_trait;

use crate::diagram::Inventory;
use crate::error::ProviderError;
use crate::model::{
    ArchitectureDiagram, CostBreakdown, Deployment, FindingSeverity, Identity, LogEntry, LogQuery,
    PipelineStatus, ProjectSummary, QuotaUsage, Recommendation, ResourceOperation,
    ResourceRequest, SecurityFinding, ServiceHealth,
};

pub type ProviderResult<T> = Result<T, ProviderError>;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn list_projects(&self) -> ProviderResult<Vec<ProjectSummary>>;

    async fn current_identity(&self) -> ProviderResult<Identity>;

    /// Return the subset of `permissions` the ambient identity holds on the
    /// project. A denied permission is simply absent from the result.
    async fn test_permissions(
        &self,
        project_id: &str,
        permissions: &[&str],
    ) -> ProviderResult<Vec<String>>;
}

#[async_trait]
pub trait MonitoringProvider: Send + Sync {
    async fn service_health(&self, project_id: &str, service: &str)
    -> ProviderResult<ServiceHealth>;
}

#[async_trait]
pub trait BillingProvider: Send + Sync {
    async fn cost_breakdown(&self, project_id: &str) -> ProviderResult<CostBreakdown>;
}

#[async_trait]
pub trait BuildProvider: Send + Sync {
    async fn trigger_deployment(&self, project_id: &str, service: &str)
    -> ProviderResult<Deployment>;

    async fn pipeline_status(&self, project_id: &str, repo: &str)
    -> ProviderResult<PipelineStatus>;
}

#[async_trait]
pub trait LoggingProvider: Send + Sync {
    async fn search_logs(&self, project_id: &str, query: &LogQuery)
    -> ProviderResult<Vec<LogEntry>>;
}

#[async_trait]
pub trait ComputeProvider: Send + Sync {
    async fn manage_resource(
        &self,
        project_id: &str,
        request: &ResourceRequest,
    ) -> ProviderResult<ResourceOperation>;
}

#[async_trait]
pub trait SecurityProvider: Send + Sync {
    async fn security_findings(
        &self,
        project_id: &str,
        severity: FindingSeverity,
    ) -> ProviderResult<Vec<SecurityFinding>>;
}

#[async_trait]
pub trait RecommendationProvider: Send + Sync {
    /// Implementations skip recommender categories that fail and return what
    /// the remaining categories produced.
    async fn recommendations(
        &self,
        project_id: &str,
        location: &str,
    ) -> ProviderResult<Vec<Recommendation>>;
}

#[async_trait]
pub trait QuotaProvider: Send + Sync {
    async fn quota_status(&self, project_id: &str) -> ProviderResult<Vec<QuotaUsage>>;
}

#[async_trait]
pub trait InventoryProvider: Send + Sync {
    async fn inventory(&self, project_id: &str) -> ProviderResult<Inventory>;

    async fn architecture_diagram(&self, project_id: &str) -> ProviderResult<ArchitectureDiagram> {
        let inventory = self.inventory(project_id).await?;
        Ok(crate::diagram::render_architecture(project_id, &inventory))
    }
}

/// Every capability the runtime needs, each behind its own trait object.
#[derive(Clone)]
pub struct Providers {
    pub identity: Arc<dyn IdentityProvider>,
    pub monitoring: Arc<dyn MonitoringProvider>,
    pub billing: Arc<dyn BillingProvider>,
    pub build: Arc<dyn BuildProvider>,
    pub logging: Arc<dyn LoggingProvider>,
    pub compute: Arc<dyn ComputeProvider>,
    pub security: Arc<dyn SecurityProvider>,
    pub recommendations: Arc<dyn RecommendationProvider>,
    pub quota: Arc<dyn QuotaProvider>,
    pub inventory: Arc<dyn InventoryProvider>,
}

impl Providers {
    /// Use one adapter for every capability.
    pub fn from_shared<P>(provider: Arc<P>) -> Self
    where
        P: IdentityProvider
            + MonitoringProvider
            + BillingProvider
            + BuildProvider
            + LoggingProvider
            + ComputeProvider
            + SecurityProvider
            + RecommendationProvider
            + QuotaProvider
            + InventoryProvider
            + 'static,
    {
        Self {
            identity: provider.clone(),
            monitoring: provider.clone(),
            billing: provider.clone(),
            build: provider.clone(),
            logging: provider.clone(),
            compute: provider.clone(),
            security: provider.clone(),
            recommendations: provider.clone(),
            quota: provider.clone(),
            inventory: provider,
        }
    }
}
