use serde::{Deserialize, Serialize};

/// A project the ambient identity can see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub project_id: String,
    pub name: String,
    /// Lifecycle state as reported by Resource Manager (e.g. "ACTIVE")
    pub state: String,
}

/// Who the ambient credentials belong to. Recomputed per request, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Account email, or a descriptive label when the token carries no email
    pub email_or_label: String,
    /// Project the credentials are associated with (may be empty)
    pub project_id: String,
    /// How the credentials were obtained (e.g. "access_token", "gcloud_adc")
    pub auth_method: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    /// Mean container CPU utilization, percent
    pub cpu_usage: f64,
    /// Share of 5xx responses, percent
    pub error_rate: f64,
    /// 95th percentile request latency, milliseconds
    pub latency_p95: f64,
    /// "healthy", "degraded" or "critical"
    pub pod_health: String,
    pub health_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub month_total: f64,
    pub top_cost_service: Option<String>,
    /// Month-over-month change, percent (None when last month was zero)
    pub percentage_change: Option<f64>,
    pub anomaly_detected: bool,
    pub billing_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub build_id: String,
    pub status: String,
    pub environment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStatus {
    pub last_status: String,
    pub duration_seconds: Option<i64>,
    pub last_commit: Option<String>,
}

/// Cloud Logging severities, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogSeverity {
    Default,
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl LogSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            LogSeverity::Default => "DEFAULT",
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO",
            LogSeverity::Notice => "NOTICE",
            LogSeverity::Warning => "WARNING",
            LogSeverity::Error => "ERROR",
            LogSeverity::Critical => "CRITICAL",
            LogSeverity::Alert => "ALERT",
            LogSeverity::Emergency => "EMERGENCY",
        }
    }
}

pub const DEFAULT_LOG_LIMIT: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    /// Raw Logging query language fragment supplied by the caller
    pub query: Option<String>,
    pub limit: u32,
    /// Minimum severity (inclusive)
    pub severity: Option<LogSeverity>,
    /// Monitored resource type, e.g. "cloud_run_revision"
    pub resource_type: Option<String>,
}

impl LogQuery {
    /// Build the Cloud Logging filter expression for this query.
    pub fn filter(&self) -> String {
        let mut clauses = Vec::new();
        if let Some(query) = self.query.as_deref().map(str::trim)
            && !query.is_empty()
        {
            clauses.push(format!("({query})"));
        }
        if let Some(severity) = self.severity {
            clauses.push(format!("severity>={}", severity.as_str()));
        }
        if let Some(resource_type) = self.resource_type.as_deref().map(str::trim)
            && !resource_type.is_empty()
        {
            clauses.push(format!("resource.type={}", filter_literal(resource_type)));
        }
        clauses.join(" AND ")
    }
}

/// Render a value as a double-quoted Google filter string literal.
pub fn filter_literal(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        if matches!(ch, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: Option<String>,
    pub severity: String,
    pub resource_type: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Compute Engine instance
    Gce,
    /// Cloud Run service
    Run,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceAction {
    Start,
    Stop,
    Restart,
}

impl ResourceAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceAction::Start => "start",
            ResourceAction::Stop => "stop",
            ResourceAction::Restart => "restart",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub kind: ResourceKind,
    pub name: String,
    /// Zone for Compute Engine, region for Cloud Run
    pub location: String,
    pub action: ResourceAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceOperation {
    pub status: String,
    pub operation_id: String,
    pub target: String,
}

/// Security Command Center severities, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FindingSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl FindingSeverity {
    const ORDERED: [FindingSeverity; 4] = [
        FindingSeverity::Critical,
        FindingSeverity::High,
        FindingSeverity::Medium,
        FindingSeverity::Low,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FindingSeverity::Critical => "CRITICAL",
            FindingSeverity::High => "HIGH",
            FindingSeverity::Medium => "MEDIUM",
            FindingSeverity::Low => "LOW",
        }
    }

    /// This severity and every more severe one.
    pub fn at_or_above(self) -> &'static [FindingSeverity] {
        let idx = Self::ORDERED
            .iter()
            .position(|s| *s == self)
            .unwrap_or(Self::ORDERED.len() - 1);
        &Self::ORDERED[..=idx]
    }

    /// Findings filter selecting active findings at or above this severity.
    pub fn findings_filter(self) -> String {
        let severities = self
            .at_or_above()
            .iter()
            .map(|s| format!("severity=\"{}\"", s.as_str()))
            .collect::<Vec<_>>()
            .join(" OR ");
        format!("state=\"ACTIVE\" AND ({severities})")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityFinding {
    pub category: String,
    pub severity: String,
    pub resource_name: String,
    pub event_time: Option<String>,
    pub external_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Recommender that produced the entry
    pub category: String,
    pub description: String,
    pub priority: Option<String>,
    /// Positive value means money saved per month
    pub estimated_monthly_savings: Option<f64>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaUsage {
    pub metric: String,
    pub usage: f64,
    pub limit: f64,
    pub utilization_percent: f64,
    /// "ok", "warning" or "critical"
    pub status: String,
}

/// Result of rendering a project's architecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ArchitectureDiagram {
    #[serde(rename_all = "camelCase")]
    Rendered { diagram: String, explanation: String },
    #[serde(rename_all = "camelCase")]
    NothingFound { message: String },
}
