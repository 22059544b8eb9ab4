use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Utc};
use gcp_ops_core::insights::{health_score, pod_health_label};
use gcp_ops_core::model::{ServiceHealth, filter_literal};
use gcp_ops_core::provider::MonitoringProvider;
use gcp_ops_core::ProviderResult;
use serde::Deserialize;
use serde_json::Value;

use crate::GcpProvider;
use crate::client::{api_url, number};

const MONITORING: &str = "Cloud Monitoring";
const MONITORING_URL: &str = "https://monitoring.googleapis.com/v3";

const WINDOW_MINUTES: i64 = 10;
const ALIGNMENT_PERIOD: &str = "300s";

const CPU_METRIC: &str = "run.googleapis.com/container/cpu/utilizations";
const REQUEST_COUNT_METRIC: &str = "run.googleapis.com/request_count";
const LATENCY_METRIC: &str = "run.googleapis.com/request_latencies";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeSeriesPage {
    #[serde(default)]
    time_series: Vec<TimeSeries>,
}

#[derive(Debug, Default, Deserialize)]
struct TimeSeries {
    #[serde(default)]
    metric: Metric,
    /// Newest point first
    #[serde(default)]
    points: Vec<Point>,
}

#[derive(Debug, Default, Deserialize)]
struct Metric {
    #[serde(default)]
    labels: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct Point {
    value: Value,
}

impl Point {
    fn as_f64(&self) -> Option<f64> {
        self.value
            .get("doubleValue")
            .or_else(|| self.value.get("int64Value"))
            .and_then(number)
    }
}

struct SeriesQuery<'a> {
    metric: &'a str,
    aligner: &'a str,
    reducer: &'a str,
    group_by: Option<&'a str>,
}

impl GcpProvider {
    async fn time_series(
        &self,
        project_id: &str,
        service: &str,
        series: SeriesQuery<'_>,
    ) -> ProviderResult<Vec<TimeSeries>> {
        let end = Utc::now();
        let start = end - Duration::minutes(WINDOW_MINUTES);
        let mut query = vec![
            (
                "filter",
                format!(
                    "metric.type=\"{}\" AND resource.type=\"cloud_run_revision\" AND resource.labels.service_name={}",
                    series.metric,
                    filter_literal(service)
                ),
            ),
            (
                "interval.startTime",
                start.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            (
                "interval.endTime",
                end.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            ("aggregation.alignmentPeriod", ALIGNMENT_PERIOD.to_string()),
            ("aggregation.perSeriesAligner", series.aligner.to_string()),
            ("aggregation.crossSeriesReducer", series.reducer.to_string()),
        ];
        if let Some(field) = series.group_by {
            query.push(("aggregation.groupByFields", field.to_string()));
        }

        let url = api_url(MONITORING, MONITORING_URL, &["projects", project_id, "timeSeries"])?;
        let page: TimeSeriesPage = self.client().get(MONITORING, &url, &query).await?;
        Ok(page.time_series)
    }
}

#[async_trait]
impl MonitoringProvider for GcpProvider {
    async fn service_health(
        &self,
        project_id: &str,
        service: &str,
    ) -> ProviderResult<ServiceHealth> {
        let cpu = self.time_series(
            project_id,
            service,
            SeriesQuery {
                metric: CPU_METRIC,
                aligner: "ALIGN_PERCENTILE_50",
                reducer: "REDUCE_MEAN",
                group_by: None,
            },
        );
        let requests = self.time_series(
            project_id,
            service,
            SeriesQuery {
                metric: REQUEST_COUNT_METRIC,
                aligner: "ALIGN_DELTA",
                reducer: "REDUCE_SUM",
                group_by: Some("metric.labels.response_code_class"),
            },
        );
        let latency = self.time_series(
            project_id,
            service,
            SeriesQuery {
                metric: LATENCY_METRIC,
                aligner: "ALIGN_PERCENTILE_95",
                reducer: "REDUCE_MAX",
                group_by: None,
            },
        );
        let (cpu, requests, latency) = tokio::try_join!(cpu, requests, latency)?;

        // Utilization is reported as a 0..1 fraction.
        let cpu_usage = round2(latest(&cpu).unwrap_or(0.0) * 100.0);
        let error_rate = round2(error_rate_percent(&requests));
        let latency_p95 = round2(latest(&latency).unwrap_or(0.0));
        let score = health_score(cpu_usage, error_rate, latency_p95);
        tracing::debug!(project = project_id, service, score, "service health computed");

        Ok(ServiceHealth {
            cpu_usage,
            error_rate,
            latency_p95,
            pod_health: pod_health_label(score).to_string(),
            health_score: score,
        })
    }
}

fn latest(series: &[TimeSeries]) -> Option<f64> {
    series
        .iter()
        .filter_map(|s| s.points.first().and_then(Point::as_f64))
        .reduce(f64::max)
}

/// Share of 5xx responses across every response code class, percent.
fn error_rate_percent(series: &[TimeSeries]) -> f64 {
    let mut total = 0.0;
    let mut server_errors = 0.0;
    for s in series {
        let count: f64 = s.points.iter().filter_map(Point::as_f64).sum();
        total += count;
        if s.metric.labels.get("response_code_class").map(String::as_str) == Some("5xx") {
            server_errors += count;
        }
    }
    if total > 0.0 {
        server_errors / total * 100.0
    } else {
        0.0
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
