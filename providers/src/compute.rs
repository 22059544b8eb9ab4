use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use gcp_ops_core::model::{ResourceAction, ResourceKind, ResourceOperation, ResourceRequest};
use gcp_ops_core::provider::ComputeProvider;
use gcp_ops_core::{ProviderError, ProviderResult};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::GcpProvider;
use crate::client::{api_url, short_name};

pub(crate) const COMPUTE: &str = "Compute Engine";
pub(crate) const COMPUTE_URL: &str = "https://compute.googleapis.com/compute/v1";
pub(crate) const CLOUD_RUN: &str = "Cloud Run";
pub(crate) const CLOUD_RUN_URL: &str = "https://run.googleapis.com/v2";

/// Template annotation bumped to force a new Cloud Run revision.
const RESTART_ANNOTATION: &str = "gcp-ops/restarted-at";

#[derive(Debug, Deserialize)]
struct ComputeOperation {
    #[serde(default)]
    name: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct LongRunningOperation {
    #[serde(default)]
    name: String,
    #[serde(default)]
    done: bool,
}

/// Set the restart annotation on a service's revision template in place.
fn stamp_restart(service: &mut Value, stamp: &str) -> Result<(), &'static str> {
    let template = service
        .as_object_mut()
        .ok_or("service is not an object")?
        .entry("template")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or("service template is not an object")?;
    let annotations = template
        .entry("annotations")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or("template annotations are not an object")?;
    annotations.insert(RESTART_ANNOTATION.to_string(), Value::String(stamp.to_string()));
    Ok(())
}

impl GcpProvider {
    async fn instance_action(
        &self,
        project_id: &str,
        request: &ResourceRequest,
    ) -> ProviderResult<ResourceOperation> {
        let url = api_url(
            COMPUTE,
            COMPUTE_URL,
            &[
                "projects",
                project_id,
                "zones",
                request.location.as_str(),
                "instances",
                request.name.as_str(),
                request.action.as_str(),
            ],
        )?;
        let operation: ComputeOperation = self.client().post(COMPUTE, &url, json!({})).await?;
        Ok(ResourceOperation {
            status: operation.status,
            operation_id: operation.name,
            target: format!("{}/{}", request.location, request.name),
        })
    }

    async fn restart_service(
        &self,
        project_id: &str,
        request: &ResourceRequest,
    ) -> ProviderResult<ResourceOperation> {
        let url = api_url(
            CLOUD_RUN,
            CLOUD_RUN_URL,
            &[
                "projects",
                project_id,
                "locations",
                request.location.as_str(),
                "services",
                request.name.as_str(),
            ],
        )?;
        let mut service: Value = self.client().get(CLOUD_RUN, &url, &[]).await?;
        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        stamp_restart(&mut service, &stamp).map_err(|message| ProviderError::Decode {
            service: CLOUD_RUN,
            message: message.to_string(),
        })?;

        let operation: LongRunningOperation = self.client().patch(CLOUD_RUN, &url, &[], service).await?;
        Ok(ResourceOperation {
            status: if operation.done { "DONE" } else { "RUNNING" }.to_string(),
            operation_id: short_name(&operation.name).to_string(),
            target: format!("{}/{}", request.location, request.name),
        })
    }
}

#[async_trait]
impl ComputeProvider for GcpProvider {
    async fn manage_resource(
        &self,
        project_id: &str,
        request: &ResourceRequest,
    ) -> ProviderResult<ResourceOperation> {
        match (request.kind, request.action) {
            (ResourceKind::Gce, ResourceAction::Start | ResourceAction::Stop) => {
                self.instance_action(project_id, request).await
            }
            (ResourceKind::Run, ResourceAction::Restart) => {
                self.restart_service(project_id, request).await
            }
            (kind, action) => Err(ProviderError::Api {
                service: match kind {
                    ResourceKind::Gce => COMPUTE,
                    ResourceKind::Run => CLOUD_RUN,
                },
                status: 400,
                message: format!("action '{}' is not supported for this resource", action.as_str()),
            }),
        }
    }
}
