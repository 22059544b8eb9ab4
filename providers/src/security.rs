use async_trait::async_trait;
use gcp_ops_core::model::{FindingSeverity, SecurityFinding};
use gcp_ops_core::provider::SecurityProvider;
use gcp_ops_core::ProviderResult;
use serde::Deserialize;

use crate::GcpProvider;
use crate::client::api_url;

const SECURITY_COMMAND_CENTER: &str = "Security Command Center";
const SCC_URL: &str = "https://securitycenter.googleapis.com/v1";
const PAGE_SIZE: &str = "100";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FindingsPage {
    #[serde(default)]
    list_findings_results: Vec<FindingResult>,
}

#[derive(Debug, Deserialize)]
struct FindingResult {
    finding: RawFinding,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFinding {
    #[serde(default)]
    category: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    resource_name: String,
    event_time: Option<String>,
    external_uri: Option<String>,
}

impl From<RawFinding> for SecurityFinding {
    fn from(raw: RawFinding) -> Self {
        Self {
            category: raw.category,
            severity: raw.severity,
            resource_name: raw.resource_name,
            event_time: raw.event_time,
            external_uri: raw.external_uri.filter(|uri| !uri.is_empty()),
        }
    }
}

#[async_trait]
impl SecurityProvider for GcpProvider {
    async fn security_findings(
        &self,
        project_id: &str,
        severity: FindingSeverity,
    ) -> ProviderResult<Vec<SecurityFinding>> {
        let url = api_url(
            SECURITY_COMMAND_CENTER,
            SCC_URL,
            &["projects", project_id, "sources", "-", "findings"],
        )?;
        let query = [
            ("filter", severity.findings_filter()),
            ("pageSize", PAGE_SIZE.to_string()),
        ];
        let page: FindingsPage = self
            .client()
            .get(SECURITY_COMMAND_CENTER, &url, &query)
            .await?;
        Ok(page
            .list_findings_results
            .into_iter()
            .map(|result| result.finding.into())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn findings_unwrap_from_list_results() {
        let page: FindingsPage = serde_json::from_value(json!({
            "listFindingsResults": [{
                "finding": {
                    "name": "organizations/1/sources/2/findings/3",
                    "category": "PUBLIC_BUCKET_ACL",
                    "severity": "HIGH",
                    "resourceName": "//storage.googleapis.com/exports",
                    "eventTime": "2026-10-01T00:00:00Z",
                    "externalUri": ""
                },
                "resource": { "name": "//storage.googleapis.com/exports" }
            }],
            "totalSize": 1
        }))
        .unwrap();
        let findings: Vec<SecurityFinding> = page
            .list_findings_results
            .into_iter()
            .map(|r| r.finding.into())
            .collect();
        assert_eq!(findings[0].category, "PUBLIC_BUCKET_ACL");
        assert!(findings[0].external_uri.is_none());
    }
}
