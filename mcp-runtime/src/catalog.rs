use jsonschema::{Draft, Validator};
use serde_json::{Value, json};
use thiserror::Error;

/// Every tool the dispatcher handles. Matching on this enum is exhaustive,
/// which keeps the catalog and the handlers in lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    ListProjects,
    SetActiveProject,
    TestIamIdentity,
    GetServiceHealth,
    GetCloudCostBreakdown,
    TriggerDeployment,
    GetCiPipelineStatus,
    ExploreLogs,
    ManageResource,
    AuditSecurityFindings,
    GetOptimizationRecommendations,
    CheckQuotaStatus,
    GenerateArchitectureDiagram,
}

impl ToolName {
    pub const ALL: [ToolName; 13] = [
        ToolName::ListProjects,
        ToolName::SetActiveProject,
        ToolName::TestIamIdentity,
        ToolName::GetServiceHealth,
        ToolName::GetCloudCostBreakdown,
        ToolName::TriggerDeployment,
        ToolName::GetCiPipelineStatus,
        ToolName::ExploreLogs,
        ToolName::ManageResource,
        ToolName::AuditSecurityFindings,
        ToolName::GetOptimizationRecommendations,
        ToolName::CheckQuotaStatus,
        ToolName::GenerateArchitectureDiagram,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::ListProjects => "list_projects",
            ToolName::SetActiveProject => "set_active_project",
            ToolName::TestIamIdentity => "test_iam_identity",
            ToolName::GetServiceHealth => "get_service_health",
            ToolName::GetCloudCostBreakdown => "get_cloud_cost_breakdown",
            ToolName::TriggerDeployment => "trigger_deployment",
            ToolName::GetCiPipelineStatus => "get_ci_pipeline_status",
            ToolName::ExploreLogs => "explore_logs",
            ToolName::ManageResource => "manage_resource",
            ToolName::AuditSecurityFindings => "audit_security_findings",
            ToolName::GetOptimizationRecommendations => "get_optimization_recommendations",
            ToolName::CheckQuotaStatus => "check_quota_status",
            ToolName::GenerateArchitectureDiagram => "generate_architecture_diagram",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }
}

#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// Project IDs, optionally domain-scoped (`example.com:my-proj`). Blank
/// means "use the active project".
const PROJECT_ID_PATTERN: &str = r"^\s*([A-Za-z0-9][A-Za-z0-9._:-]*)?\s*$";
/// Names that end up as a single URL path segment.
const RESOURCE_NAME_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9._-]*$";
const REPO_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9._/-]*$";
const LOCATION_PATTERN: &str = r"^[a-z0-9][a-z0-9-]*$";

fn project_property() -> Value {
    json!({
        "type": "string",
        "pattern": PROJECT_ID_PATTERN,
        "description": "Project ID to target. Defaults to the active project."
    })
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "list_projects",
            description: "List the Google Cloud projects the current credentials can access, and show the active project.",
            input_schema: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "set_active_project",
            description: "Select the project used by later tool calls. The project is verified against the current identity first; on failure the active project is unchanged.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "projectId": { "type": "string", "minLength": 1, "pattern": PROJECT_ID_PATTERN, "description": "Project ID to activate" }
                },
                "required": ["projectId"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "test_iam_identity",
            description: "Show the current identity and which capabilities (health, cost, deployment, billing) it holds on a project, with the missing permissions.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "project": project_property()
                },
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "get_service_health",
            description: "Health snapshot of a Cloud Run service: CPU usage, 5xx error rate, p95 latency and a derived health rating.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "service": { "type": "string", "minLength": 1, "pattern": RESOURCE_NAME_PATTERN, "description": "Cloud Run service name" },
                    "project": project_property()
                },
                "required": ["service"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "get_cloud_cost_breakdown",
            description: "Month-to-date spend from the billing export, top service, month-over-month change and anomaly flag (over +20%).",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "project": project_property()
                },
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "trigger_deployment",
            description: "Run the Cloud Build trigger named after the service to deploy it to production. Requires approval=true.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "service": { "type": "string", "minLength": 1, "pattern": RESOURCE_NAME_PATTERN, "description": "Service (and Cloud Build trigger) name" },
                    "approval": { "type": "boolean", "description": "Must be true; confirms a human approved this production change" },
                    "project": project_property()
                },
                "required": ["service", "approval"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "get_ci_pipeline_status",
            description: "Status, duration and commit of the most recent Cloud Build run for a repository.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "repo": { "type": "string", "minLength": 1, "pattern": REPO_PATTERN, "description": "Repository name" },
                    "project": project_property()
                },
                "required": ["repo"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "explore_logs",
            description: "Search Cloud Logging entries, newest first, with optional query, minimum severity and resource type filters.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "project": project_property(),
                    "query": { "type": "string", "description": "Logging query language fragment" },
                    "limit": { "type": "integer", "minimum": 1, "maximum": 1000, "default": 20 },
                    "severity": {
                        "type": "string",
                        "enum": ["DEFAULT", "DEBUG", "INFO", "NOTICE", "WARNING", "ERROR", "CRITICAL", "ALERT", "EMERGENCY"],
                        "description": "Minimum severity"
                    },
                    "resourceType": { "type": "string", "description": "Monitored resource type, e.g. cloud_run_revision" }
                },
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "manage_resource",
            description: "Start or stop a Compute Engine instance (gce), or restart a Cloud Run service (run).",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "resourceType": { "type": "string", "enum": ["gce", "run"] },
                    "resourceName": { "type": "string", "minLength": 1, "pattern": RESOURCE_NAME_PATTERN },
                    "action": { "type": "string", "enum": ["start", "stop", "restart"] },
                    "location": { "type": "string", "minLength": 1, "pattern": LOCATION_PATTERN, "description": "Zone for gce, region for run" },
                    "project": project_property()
                },
                "required": ["resourceType", "resourceName", "action", "location"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "audit_security_findings",
            description: "Active Security Command Center findings at or above a severity.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "severity": { "type": "string", "enum": ["CRITICAL", "HIGH", "MEDIUM", "LOW"], "default": "HIGH" },
                    "project": project_property()
                },
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "get_optimization_recommendations",
            description: "Cost and rightsizing recommendations from Recommender. Categories that fail are skipped.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "location": { "type": "string", "minLength": 1, "pattern": LOCATION_PATTERN, "default": "global", "description": "Zone, region or global" },
                    "project": project_property()
                },
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "check_quota_status",
            description: "Compute Engine project quotas ranked by utilization, flagging those at 80% or more.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "project": project_property()
                },
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "generate_architecture_diagram",
            description: "Mermaid diagram of Cloud Run services, Compute Engine instances and Cloud SQL instances in a project.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "project": project_property()
                },
                "additionalProperties": false
            }),
        },
    ]
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog entry '{0}' has no handler")]
    UnhandledTool(&'static str),
    #[error("tool '{0}' has no catalog entry")]
    MissingDefinition(&'static str),
    #[error("tool '{0}' is listed more than once")]
    DuplicateDefinition(&'static str),
    #[error("input schema for '{tool}' does not compile: {message}")]
    Schema { tool: &'static str, message: String },
}

pub struct CatalogEntry {
    pub tool: ToolName,
    pub definition: ToolDefinition,
    validator: Validator,
}

impl CatalogEntry {
    /// Every schema violation of `arguments`, rendered as text.
    pub fn violations(&self, arguments: &Value) -> Vec<String> {
        self.validator
            .iter_errors(arguments)
            .map(|err| err.to_string())
            .collect()
    }
}

/// Tool definitions with their compiled input validators.
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Compile the static definitions, failing if any definition lacks a
    /// handler or any handler lacks a definition.
    pub fn new() -> Result<Self, CatalogError> {
        Self::from_definitions(tool_definitions())
    }

    fn from_definitions(definitions: Vec<ToolDefinition>) -> Result<Self, CatalogError> {
        let mut entries: Vec<CatalogEntry> = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let tool = ToolName::parse(definition.name)
                .ok_or(CatalogError::UnhandledTool(definition.name))?;
            if entries.iter().any(|entry| entry.tool == tool) {
                return Err(CatalogError::DuplicateDefinition(definition.name));
            }
            let validator = jsonschema::options()
                .with_draft(Draft::Draft7)
                .build(&definition.input_schema)
                .map_err(|err| CatalogError::Schema {
                    tool: definition.name,
                    message: err.to_string(),
                })?;
            entries.push(CatalogEntry {
                tool,
                definition,
                validator,
            });
        }
        if let Some(missing) = ToolName::ALL
            .into_iter()
            .find(|tool| !entries.iter().any(|entry| entry.tool == *tool))
        {
            return Err(CatalogError::MissingDefinition(missing.as_str()));
        }
        Ok(Self { entries })
    }

    pub fn lookup(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|entry| entry.definition.name == name)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.entries.iter().map(|entry| &entry.definition)
    }

    /// Discovery payload for `tools/list`.
    pub fn to_value(&self) -> Value {
        let tools: Vec<Value> = self
            .definitions()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "inputSchema": tool.input_schema,
                })
            })
            .collect();
        json!({ "tools": tools })
    }
}
