use async_trait::async_trait;
use chrono::{Datelike, Months, NaiveDate, Utc};
use gcp_ops_core::insights::{CostRow, summarize_costs};
use gcp_ops_core::model::CostBreakdown;
use gcp_ops_core::provider::BillingProvider;
use gcp_ops_core::{ProviderError, ProviderResult};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::GcpProvider;
use crate::client::{api_url, number};

const CLOUD_BILLING: &str = "Cloud Billing";
const CLOUD_BILLING_URL: &str = "https://cloudbilling.googleapis.com/v1";
const BIGQUERY: &str = "BigQuery";
const BIGQUERY_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

const QUERY_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BillingInfo {
    #[serde(default)]
    billing_enabled: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    #[serde(default)]
    rows: Vec<QueryRow>,
}

#[derive(Debug, Deserialize)]
struct QueryRow {
    f: Vec<QueryCell>,
}

#[derive(Debug, Deserialize)]
struct QueryCell {
    v: Value,
}

/// The current and previous month as "YYYY-MM".
fn comparison_months(today: NaiveDate) -> (String, String) {
    let first = today.with_day(1).unwrap_or(today);
    let previous = first.checked_sub_months(Months::new(1)).unwrap_or(first);
    (
        first.format("%Y-%m").to_string(),
        previous.format("%Y-%m").to_string(),
    )
}

fn cost_query(project_id: &str, dataset: &str, table: &str) -> String {
    format!(
        "SELECT service.description AS service, \
         FORMAT_TIMESTAMP('%Y-%m', usage_start_time) AS month, \
         SUM(cost) AS total \
         FROM `{project_id}.{dataset}.{table}` \
         WHERE project.id = @project_id \
         AND FORMAT_TIMESTAMP('%Y-%m', usage_start_time) IN (@current_month, @previous_month) \
         GROUP BY service, month"
    )
}

fn string_parameter(name: &str, value: &str) -> Value {
    json!({
        "name": name,
        "parameterType": { "type": "STRING" },
        "parameterValue": { "value": value }
    })
}

fn parse_rows(rows: &[QueryRow]) -> Vec<CostRow> {
    rows.iter()
        .filter_map(|row| match row.f.as_slice() {
            [service, month, total] => Some(CostRow {
                service: service.v.as_str().unwrap_or("unknown").to_string(),
                month: month.v.as_str()?.to_string(),
                total: number(&total.v).unwrap_or(0.0),
            }),
            _ => None,
        })
        .collect()
}

#[async_trait]
impl BillingProvider for GcpProvider {
    async fn cost_breakdown(&self, project_id: &str) -> ProviderResult<CostBreakdown> {
        let (current_month, previous_month) = comparison_months(Utc::now().date_naive());

        let info_url = api_url(
            CLOUD_BILLING,
            CLOUD_BILLING_URL,
            &["projects", project_id, "billingInfo"],
        )?;
        let info: BillingInfo = self.client().get(CLOUD_BILLING, &info_url, &[]).await?;
        if !info.billing_enabled {
            tracing::info!(project = project_id, "billing is disabled, skipping export query");
            return Ok(summarize_costs(&[], &current_month, &previous_month, false));
        }

        let config = self.config();
        let body = json!({
            "query": cost_query(project_id, &config.billing_dataset, &config.billing_table),
            "useLegacySql": false,
            "parameterMode": "NAMED",
            "timeoutMs": QUERY_TIMEOUT_MS,
            "queryParameters": [
                string_parameter("project_id", project_id),
                string_parameter("current_month", &current_month),
                string_parameter("previous_month", &previous_month),
            ]
        });
        let url = api_url(BIGQUERY, BIGQUERY_URL, &["projects", project_id, "queries"])?;
        let response: QueryResponse = self.client().post(BIGQUERY, &url, body).await?;
        if !response.job_complete {
            return Err(ProviderError::Decode {
                service: BIGQUERY,
                message: format!(
                    "billing export query did not finish within {}s",
                    QUERY_TIMEOUT_MS / 1000
                ),
            });
        }

        let rows = parse_rows(&response.rows);
        Ok(summarize_costs(&rows, &current_month, &previous_month, true))
    }
}
