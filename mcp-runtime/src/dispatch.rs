use std::sync::Arc;

use gcp_ops_core::model::{
    ArchitectureDiagram, DEFAULT_LOG_LIMIT, FindingSeverity, LogQuery, ResourceAction,
    ResourceKind, ResourceRequest,
};
use gcp_ops_core::{ErrorKind, ProviderError, Providers, classify_provider_error};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::Instrument;

use crate::args::{
    self, DEFAULT_RECOMMENDER_LOCATION, ExploreLogsArgs, ManageResourceArgs, PipelineStatusArgs,
    ProjectArgs, RecommendationsArgs, SecurityFindingsArgs, ServiceHealthArgs,
    SetActiveProjectArgs, TriggerDeploymentArgs,
};
use crate::catalog::{Catalog, ToolName};
use crate::gate::PermissionGate;
use crate::resolver::{MissingProjectError, resolve_project};
use crate::results::{
    DiagramReport, FindingsReport, IdentityCheck, LogSearch, ProjectListing, ProjectSwitch,
    QuotaReport, RecommendationsReport, RepoReport, Scoped, ServiceReport,
};
use crate::session::Session;

pub const DEPLOYMENT_APPROVAL_REQUIRED: &str = "Deployment blocked: trigger_deployment changes production and requires explicit approval. Confirm with a human operator, then call it again with approval=true.";

pub const GCE_RESTART_UNSUPPORTED: &str = "Compute Engine instances cannot be restarted in one step. Call manage_resource with action=stop, then call it again with action=start.";

pub const RUN_START_STOP_UNSUPPORTED: &str = "Cloud Run services scale automatically and cannot be started or stopped. Use action=restart to roll out a fresh revision.";

const REAUTHENTICATE_HINT: &str = "Run `gcloud auth application-default login` to (re-)authenticate, then retry.";

/// One `tools/call` invocation.
#[derive(Debug, Clone)]
pub struct ToolRequest {
    pub name: String,
    pub arguments: Value,
}

impl ToolRequest {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

/// Uniform tool result envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub content: Vec<TextContent>,
    pub is_error: bool,
}

impl ToolResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![TextContent {
                kind: "text",
                text: text.into(),
            }],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::text(text)
        }
    }

    /// Concatenated text of every content block.
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_value(&self) -> Value {
        json!({
            "content": self.content,
            "isError": self.is_error
        })
    }
}

/// A classified, terminal failure of the current call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ToolError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, message)
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self::new(ErrorKind::UnknownToolError, format!("Unknown tool: {name}"))
    }

    /// Map a provider failure, singling out credential problems.
    pub fn from_provider(err: ProviderError) -> Self {
        let message = err.to_string();
        match classify_provider_error(&message) {
            ErrorKind::AuthenticationError => Self::new(
                ErrorKind::AuthenticationError,
                format!("Authentication failed: {message}. {REAUTHENTICATE_HINT}"),
            ),
            kind => Self::new(kind, message),
        }
    }
}

impl From<MissingProjectError> for ToolError {
    fn from(err: MissingProjectError) -> Self {
        Self::new(ErrorKind::MissingProjectError, err.to_string())
    }
}

impl From<ProviderError> for ToolError {
    fn from(err: ProviderError) -> Self {
        Self::from_provider(err)
    }
}

/// Reject `(resourceType, action)` pairs the product does not offer.
pub fn check_resource_action(kind: ResourceKind, action: ResourceAction) -> Result<(), ToolError> {
    match (kind, action) {
        (ResourceKind::Gce, ResourceAction::Start | ResourceAction::Stop) => Ok(()),
        (ResourceKind::Gce, ResourceAction::Restart) => {
            Err(ToolError::validation(GCE_RESTART_UNSUPPORTED))
        }
        (ResourceKind::Run, ResourceAction::Restart) => Ok(()),
        (ResourceKind::Run, ResourceAction::Start | ResourceAction::Stop) => {
            Err(ToolError::validation(RUN_START_STOP_UNSUPPORTED))
        }
    }
}

/// Routes tool calls: schema check, project resolution, gating, provider call
/// and error shaping. Never fails at the transport level.
pub struct Dispatcher {
    catalog: Catalog,
    session: Arc<Session>,
    providers: Providers,
    gate: PermissionGate,
    switch_lock: tokio::sync::Mutex<()>,
}

impl Dispatcher {
    pub fn new(catalog: Catalog, session: Arc<Session>, providers: Providers) -> Self {
        let gate = PermissionGate::new(providers.identity.clone());
        Self {
            catalog,
            session,
            providers,
            gate,
            switch_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn handle(&self, request: ToolRequest) -> ToolResponse {
        let span = tracing::info_span!("tool_call", tool = %request.name);
        async move {
            match self.dispatch(&request).await {
                Ok(text) => {
                    tracing::info!(outcome = "ok", "tool call completed");
                    ToolResponse::text(text)
                }
                Err(err) => {
                    tracing::warn!(
                        outcome = err.kind.as_str(),
                        message = %err.message,
                        "tool call failed"
                    );
                    ToolResponse::error(err.message)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&self, request: &ToolRequest) -> Result<String, ToolError> {
        let entry = self
            .catalog
            .lookup(&request.name)
            .ok_or_else(|| ToolError::unknown_tool(&request.name))?;

        let args = match &request.arguments {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            _ => return Err(ToolError::validation("Tool arguments must be a JSON object")),
        };
        let violations = entry.violations(&Value::Object(args.clone()));
        if !violations.is_empty() {
            return Err(ToolError::validation(format!(
                "Invalid arguments for {}: {}",
                entry.definition.name,
                violations.join("; ")
            )));
        }

        match entry.tool {
            ToolName::ListProjects => self.list_projects().await,
            ToolName::SetActiveProject => self.set_active_project(&args).await,
            ToolName::TestIamIdentity => self.test_iam_identity(&args).await,
            ToolName::GetServiceHealth => self.service_health(&args).await,
            ToolName::GetCloudCostBreakdown => self.cost_breakdown(&args).await,
            ToolName::TriggerDeployment => self.trigger_deployment(&args).await,
            ToolName::GetCiPipelineStatus => self.pipeline_status(&args).await,
            ToolName::ExploreLogs => self.explore_logs(&args).await,
            ToolName::ManageResource => self.manage_resource(&args).await,
            ToolName::AuditSecurityFindings => self.security_findings(&args).await,
            ToolName::GetOptimizationRecommendations => self.recommendations(&args).await,
            ToolName::CheckQuotaStatus => self.quota_status(&args).await,
            ToolName::GenerateArchitectureDiagram => self.architecture_diagram(&args).await,
        }
    }

    fn resolve(&self, explicit: Option<&str>) -> Result<String, ToolError> {
        let active = self.session.get();
        let project = resolve_project(explicit, active.as_deref())?;
        tracing::debug!(project = %project, "project resolved");
        Ok(project)
    }

    async fn list_projects(&self) -> Result<String, ToolError> {
        let projects = self.providers.identity.list_projects().await?;
        render(&ProjectListing {
            active_project: self.session.get(),
            projects,
        })
    }

    async fn set_active_project(&self, args: &Map<String, Value>) -> Result<String, ToolError> {
        let args: SetActiveProjectArgs = args::decode(args)?;
        let project_id = args.project_id.trim().to_string();
        if project_id.is_empty() {
            return Err(ToolError::validation("'projectId' must not be empty"));
        }

        // Verification and the write happen under one lock so a concurrent
        // switch can never interleave with this one.
        let _switch = self.switch_lock.lock().await;
        let identity = self.providers.identity.current_identity().await?;
        let permissions = self.gate.verify(&identity, &project_id).await?;
        let previous_project = self.session.set(project_id.clone());
        tracing::info!(
            project = %project_id,
            previous = ?previous_project,
            missing = permissions.missing_permissions.len(),
            "active project switched"
        );

        render(&ProjectSwitch {
            active_project: project_id,
            previous_project,
            permissions,
        })
    }

    async fn test_iam_identity(&self, args: &Map<String, Value>) -> Result<String, ToolError> {
        let args: ProjectArgs = args::decode(args)?;
        let active = self.session.get();
        let project = resolve_project(args.project.as_deref(), active.as_deref())
            .unwrap_or_default();
        let identity = self.providers.identity.current_identity().await?;
        let permissions = self.gate.verify(&identity, &project).await?;
        render(&IdentityCheck {
            identity,
            permissions,
        })
    }

    async fn service_health(&self, args: &Map<String, Value>) -> Result<String, ToolError> {
        let args: ServiceHealthArgs = args::decode(args)?;
        let project = self.resolve(args.project.as_deref())?;
        let health = self
            .providers
            .monitoring
            .service_health(&project, &args.service)
            .await?;
        render(&Scoped {
            project: &project,
            result: ServiceReport {
                service: &args.service,
                result: health,
            },
        })
    }

    async fn cost_breakdown(&self, args: &Map<String, Value>) -> Result<String, ToolError> {
        let args: ProjectArgs = args::decode(args)?;
        let project = self.resolve(args.project.as_deref())?;
        let costs = self.providers.billing.cost_breakdown(&project).await?;
        render(&Scoped {
            project: &project,
            result: costs,
        })
    }

    async fn trigger_deployment(&self, args: &Map<String, Value>) -> Result<String, ToolError> {
        let args: TriggerDeploymentArgs = args::decode(args)?;
        if !args.approval {
            tracing::warn!(service = %args.service, "deployment refused without approval");
            return Err(ToolError::validation(DEPLOYMENT_APPROVAL_REQUIRED));
        }
        let project = self.resolve(args.project.as_deref())?;
        let deployment = self
            .providers
            .build
            .trigger_deployment(&project, &args.service)
            .await?;
        render(&Scoped {
            project: &project,
            result: ServiceReport {
                service: &args.service,
                result: deployment,
            },
        })
    }

    async fn pipeline_status(&self, args: &Map<String, Value>) -> Result<String, ToolError> {
        let args: PipelineStatusArgs = args::decode(args)?;
        let project = self.resolve(args.project.as_deref())?;
        let status = self
            .providers
            .build
            .pipeline_status(&project, &args.repo)
            .await?;
        render(&Scoped {
            project: &project,
            result: RepoReport {
                repo: &args.repo,
                result: status,
            },
        })
    }

    async fn explore_logs(&self, args: &Map<String, Value>) -> Result<String, ToolError> {
        let args: ExploreLogsArgs = args::decode(args)?;
        let project = self.resolve(args.project.as_deref())?;
        let query = LogQuery {
            query: args.query,
            limit: args.limit.unwrap_or(DEFAULT_LOG_LIMIT),
            severity: args.severity,
            resource_type: args.resource_type,
        };
        let entries = self
            .providers
            .logging
            .search_logs(&project, &query)
            .await?;
        render(&Scoped {
            project: &project,
            result: LogSearch {
                filter: query.filter(),
                count: entries.len(),
                entries,
            },
        })
    }

    async fn manage_resource(&self, args: &Map<String, Value>) -> Result<String, ToolError> {
        let args: ManageResourceArgs = args::decode(args)?;
        check_resource_action(args.resource_type, args.action)?;
        let project = self.resolve(args.project.as_deref())?;
        let request = ResourceRequest {
            kind: args.resource_type,
            name: args.resource_name,
            location: args.location,
            action: args.action,
        };
        let operation = self
            .providers
            .compute
            .manage_resource(&project, &request)
            .await?;
        tracing::info!(
            project = %project,
            target = %operation.target,
            action = request.action.as_str(),
            "resource action submitted"
        );
        render(&Scoped {
            project: &project,
            result: operation,
        })
    }

    async fn security_findings(&self, args: &Map<String, Value>) -> Result<String, ToolError> {
        let args: SecurityFindingsArgs = args::decode(args)?;
        let project = self.resolve(args.project.as_deref())?;
        let severity = args.severity.unwrap_or(FindingSeverity::High);
        let findings = self
            .providers
            .security
            .security_findings(&project, severity)
            .await?;
        render(&Scoped {
            project: &project,
            result: FindingsReport {
                minimum_severity: severity,
                count: findings.len(),
                findings,
            },
        })
    }

    async fn recommendations(&self, args: &Map<String, Value>) -> Result<String, ToolError> {
        let args: RecommendationsArgs = args::decode(args)?;
        let project = self.resolve(args.project.as_deref())?;
        let location = args
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| DEFAULT_RECOMMENDER_LOCATION.to_string());
        let recommendations = self
            .providers
            .recommendations
            .recommendations(&project, &location)
            .await?;
        render(&Scoped {
            project: &project,
            result: RecommendationsReport {
                location,
                count: recommendations.len(),
                recommendations,
            },
        })
    }

    async fn quota_status(&self, args: &Map<String, Value>) -> Result<String, ToolError> {
        let args: ProjectArgs = args::decode(args)?;
        let project = self.resolve(args.project.as_deref())?;
        let quotas = self.providers.quota.quota_status(&project).await?;
        render(&Scoped {
            project: &project,
            result: QuotaReport {
                count: quotas.len(),
                quotas,
            },
        })
    }

    async fn architecture_diagram(&self, args: &Map<String, Value>) -> Result<String, ToolError> {
        let args: ProjectArgs = args::decode(args)?;
        let project = self.resolve(args.project.as_deref())?;
        match self
            .providers
            .inventory
            .architecture_diagram(&project)
            .await?
        {
            ArchitectureDiagram::Rendered {
                diagram,
                explanation,
            } => render(&Scoped {
                project: &project,
                result: DiagramReport {
                    diagram,
                    explanation,
                },
            }),
            ArchitectureDiagram::NothingFound { message } => Ok(message),
        }
    }
}

fn render<T: Serialize>(value: &T) -> Result<String, ToolError> {
    serde_json::to_string_pretty(value).map_err(|e| {
        ToolError::new(
            ErrorKind::ProviderError,
            format!("Failed to serialize tool result: {e}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_action_matrix() {
        assert!(check_resource_action(ResourceKind::Gce, ResourceAction::Start).is_ok());
        assert!(check_resource_action(ResourceKind::Gce, ResourceAction::Stop).is_ok());
        assert!(check_resource_action(ResourceKind::Run, ResourceAction::Restart).is_ok());

        let err = check_resource_action(ResourceKind::Gce, ResourceAction::Restart).unwrap_err();
        assert_eq!(err.message, GCE_RESTART_UNSUPPORTED);
        for action in [ResourceAction::Start, ResourceAction::Stop] {
            let err = check_resource_action(ResourceKind::Run, action).unwrap_err();
            assert_eq!(err.kind, ErrorKind::ValidationError);
            assert_eq!(err.message, RUN_START_STOP_UNSUPPORTED);
        }
    }

    #[test]
    fn credential_failures_become_authentication_errors() {
        let err = ToolError::from_provider(ProviderError::Credentials(
            "gcloud is not installed".to_string(),
        ));
        assert_eq!(err.kind, ErrorKind::AuthenticationError);
        assert!(err.message.contains("gcloud auth application-default login"));
    }

    #[test]
    fn other_provider_failures_keep_the_upstream_message() {
        let err = ToolError::from_provider(ProviderError::Api {
            service: "Cloud Build",
            status: 404,
            message: "Trigger payments-api not found".to_string(),
        });
        assert_eq!(err.kind, ErrorKind::ProviderError);
        assert_eq!(
            err.message,
            "Cloud Build API error (404): Trigger payments-api not found"
        );
    }

    #[test]
    fn response_envelope_shape() {
        let value = ToolResponse::error("boom").to_value();
        assert_eq!(value["isError"], true);
        assert_eq!(value["content"][0]["type"], "text");
        assert_eq!(value["content"][0]["text"], "boom");
        assert_eq!(ToolResponse::text("ok").to_value()["isError"], false);
    }
}
