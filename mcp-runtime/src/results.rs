//! Serialized result shapes. Field order here is the key order agents see.

use gcp_ops_core::PermissionReport;
use gcp_ops_core::model::{
    FindingSeverity, Identity, LogEntry, ProjectSummary, QuotaUsage, Recommendation,
    SecurityFinding,
};
use serde::Serialize;

/// A provider result tagged with the project it was computed for.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scoped<'a, T: Serialize> {
    pub project: &'a str,
    #[serde(flatten)]
    pub result: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListing {
    pub active_project: Option<String>,
    pub projects: Vec<ProjectSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSwitch {
    pub active_project: String,
    pub previous_project: Option<String>,
    pub permissions: PermissionReport,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityCheck {
    pub identity: Identity,
    pub permissions: PermissionReport,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceReport<'a, T: Serialize> {
    pub service: &'a str,
    #[serde(flatten)]
    pub result: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoReport<'a, T: Serialize> {
    pub repo: &'a str,
    #[serde(flatten)]
    pub result: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSearch {
    pub filter: String,
    pub count: usize,
    pub entries: Vec<LogEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingsReport {
    pub minimum_severity: FindingSeverity,
    pub count: usize,
    pub findings: Vec<SecurityFinding>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationsReport {
    pub location: String,
    pub count: usize,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaReport {
    pub count: usize,
    pub quotas: Vec<QuotaUsage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramReport {
    pub diagram: String,
    pub explanation: String,
}
