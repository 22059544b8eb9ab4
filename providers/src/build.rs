use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gcp_ops_core::model::{Deployment, PipelineStatus, filter_literal};
use gcp_ops_core::provider::BuildProvider;
use gcp_ops_core::{ProviderError, ProviderResult};
use serde::Deserialize;
use serde_json::json;

use crate::GcpProvider;
use crate::client::api_url;

const CLOUD_BUILD: &str = "Cloud Build";
const CLOUD_BUILD_URL: &str = "https://cloudbuild.googleapis.com/v1";

/// Triggers are named after the service they deploy and run from this branch.
const DEPLOY_BRANCH: &str = "main";
const DEPLOY_ENVIRONMENT: &str = "production";
const NO_BUILDS_STATUS: &str = "NO_BUILDS";

#[derive(Debug, Deserialize)]
struct Operation {
    #[serde(default)]
    name: String,
    #[serde(default)]
    metadata: Option<OperationMetadata>,
}

#[derive(Debug, Deserialize)]
struct OperationMetadata {
    build: Option<Build>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Build {
    #[serde(default)]
    id: String,
    #[serde(default)]
    status: String,
    start_time: Option<DateTime<Utc>>,
    finish_time: Option<DateTime<Utc>>,
    #[serde(default)]
    substitutions: HashMap<String, String>,
}

impl Build {
    fn duration_seconds(&self) -> Option<i64> {
        let (start, finish) = (self.start_time?, self.finish_time?);
        Some((finish - start).num_seconds())
    }

    fn commit(&self) -> Option<String> {
        ["SHORT_SHA", "COMMIT_SHA"]
            .iter()
            .find_map(|key| self.substitutions.get(*key))
            .filter(|sha| !sha.is_empty())
            .cloned()
    }
}

#[derive(Debug, Default, Deserialize)]
struct BuildsPage {
    #[serde(default)]
    builds: Vec<Build>,
}

fn pipeline_from_builds(builds: Vec<Build>) -> PipelineStatus {
    match builds.into_iter().next() {
        Some(build) => PipelineStatus {
            duration_seconds: build.duration_seconds(),
            last_commit: build.commit(),
            last_status: build.status,
        },
        None => PipelineStatus {
            last_status: NO_BUILDS_STATUS.to_string(),
            duration_seconds: None,
            last_commit: None,
        },
    }
}

#[async_trait]
impl BuildProvider for GcpProvider {
    async fn trigger_deployment(
        &self,
        project_id: &str,
        service: &str,
    ) -> ProviderResult<Deployment> {
        let url = api_url(
            CLOUD_BUILD,
            CLOUD_BUILD_URL,
            &["projects", project_id, "triggers", &format!("{service}:run")],
        )?;
        let operation: Operation = self
            .client()
            .post(CLOUD_BUILD, &url, json!({ "branchName": DEPLOY_BRANCH }))
            .await?;

        let build = operation
            .metadata
            .and_then(|m| m.build)
            .ok_or_else(|| ProviderError::Decode {
                service: CLOUD_BUILD,
                message: format!("operation {} carried no build metadata", operation.name),
            })?;
        tracing::info!(project = project_id, service, build_id = %build.id, "deployment triggered");

        Ok(Deployment {
            build_id: build.id,
            status: build.status,
            environment: DEPLOY_ENVIRONMENT.to_string(),
        })
    }

    async fn pipeline_status(&self, project_id: &str, repo: &str) -> ProviderResult<PipelineStatus> {
        let url = api_url(CLOUD_BUILD, CLOUD_BUILD_URL, &["projects", project_id, "builds"])?;
        let query = [
            ("filter", format!("substitutions.REPO_NAME={}", filter_literal(repo))),
            ("pageSize", "1".to_string()),
        ];
        let page: BuildsPage = self.client().get(CLOUD_BUILD, &url, &query).await?;
        Ok(pipeline_from_builds(page.builds))
    }
}
