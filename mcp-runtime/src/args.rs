//! Typed tool arguments, decoded after the schema check has passed.

use gcp_ops_core::model::{FindingSeverity, LogSeverity, ResourceAction, ResourceKind};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::dispatch::ToolError;

pub const DEFAULT_RECOMMENDER_LOCATION: &str = "global";

pub fn decode<T: DeserializeOwned>(args: &Map<String, Value>) -> Result<T, ToolError> {
    serde_json::from_value(Value::Object(args.clone()))
        .map_err(|e| ToolError::validation(format!("Invalid arguments: {e}")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectArgs {
    pub project: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetActiveProjectArgs {
    pub project_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealthArgs {
    pub service: String,
    pub project: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerDeploymentArgs {
    pub service: String,
    pub approval: bool,
    pub project: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStatusArgs {
    pub repo: String,
    pub project: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExploreLogsArgs {
    pub project: Option<String>,
    pub query: Option<String>,
    pub limit: Option<u32>,
    pub severity: Option<LogSeverity>,
    pub resource_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManageResourceArgs {
    pub resource_type: ResourceKind,
    pub resource_name: String,
    pub action: ResourceAction,
    pub location: String,
    pub project: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityFindingsArgs {
    pub severity: Option<FindingSeverity>,
    pub project: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationsArgs {
    pub location: Option<String>,
    pub project: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn manage_resource_args_decode_enums() {
        let args: ManageResourceArgs = decode(&map(json!({
            "resourceType": "run",
            "resourceName": "payments-api",
            "action": "restart",
            "location": "us-central1"
        })))
        .unwrap();
        assert_eq!(args.resource_type, ResourceKind::Run);
        assert_eq!(args.action, ResourceAction::Restart);
        assert!(args.project.is_none());
    }

    #[test]
    fn type_mismatch_is_a_validation_error() {
        let err = decode::<TriggerDeploymentArgs>(&map(json!({
            "service": "payments-api",
            "approval": "yes"
        })))
        .unwrap_err();
        assert_eq!(err.kind, gcp_ops_core::ErrorKind::ValidationError);
    }
}
