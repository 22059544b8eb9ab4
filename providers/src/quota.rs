use async_trait::async_trait;
use gcp_ops_core::insights::{quota_usage, rank_quotas};
use gcp_ops_core::model::QuotaUsage;
use gcp_ops_core::provider::QuotaProvider;
use gcp_ops_core::ProviderResult;
use serde::Deserialize;

use crate::GcpProvider;
use crate::client::api_url;
use crate::compute::{COMPUTE, COMPUTE_URL};

#[derive(Debug, Default, Deserialize)]
struct ProjectResource {
    #[serde(default)]
    quotas: Vec<RawQuota>,
}

#[derive(Debug, Deserialize)]
struct RawQuota {
    metric: String,
    #[serde(default)]
    limit: f64,
    #[serde(default)]
    usage: f64,
}

fn ranked(quotas: Vec<RawQuota>) -> Vec<QuotaUsage> {
    rank_quotas(
        quotas
            .into_iter()
            .map(|q| quota_usage(q.metric, q.usage, q.limit))
            .collect(),
    )
}

#[async_trait]
impl QuotaProvider for GcpProvider {
    async fn quota_status(&self, project_id: &str) -> ProviderResult<Vec<QuotaUsage>> {
        let url = api_url(COMPUTE, COMPUTE_URL, &["projects", project_id])?;
        let project: ProjectResource = self
            .client()
            .get(COMPUTE, &url, &[("fields", "quotas".to_string())])
            .await?;
        Ok(ranked(project.quotas))
    }
}
