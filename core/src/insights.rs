//! Post-processing heuristics applied to raw provider responses.
//!
//! Only the +20% cost anomaly threshold is a fixed product rule. The health
//! deduction floors and per-point coefficients below are placeholder values
//! picked for this crate, not calibrated against any SLO; tune them here.

use crate::model::{CostBreakdown, QuotaUsage};

/// Month-over-month increase (percent) above which spend is flagged.
pub const COST_ANOMALY_THRESHOLD_PERCENT: f64 = 20.0;

const CPU_DEDUCTION_FLOOR_PERCENT: f64 = 80.0;
const CPU_DEDUCTION_PER_POINT: f64 = 1.5;
const ERROR_RATE_DEDUCTION_PER_POINT: f64 = 5.0;
const LATENCY_DEDUCTION_FLOOR_MS: f64 = 1000.0;
const LATENCY_DEDUCTION_PER_100MS: f64 = 2.0;

const HEALTHY_SCORE_MIN: u8 = 80;
const DEGRADED_SCORE_MIN: u8 = 50;

const QUOTA_WARNING_PERCENT: f64 = 80.0;
const QUOTA_CRITICAL_PERCENT: f64 = 90.0;

/// Score a service from 0 to 100 starting at 100 and deducting for CPU
/// pressure, 5xx share and slow tail latency.
pub fn health_score(cpu_usage_percent: f64, error_rate_percent: f64, latency_p95_ms: f64) -> u8 {
    let mut score = 100.0;
    if cpu_usage_percent > CPU_DEDUCTION_FLOOR_PERCENT {
        score -= (cpu_usage_percent - CPU_DEDUCTION_FLOOR_PERCENT) * CPU_DEDUCTION_PER_POINT;
    }
    score -= error_rate_percent.max(0.0) * ERROR_RATE_DEDUCTION_PER_POINT;
    if latency_p95_ms > LATENCY_DEDUCTION_FLOOR_MS {
        score -= (latency_p95_ms - LATENCY_DEDUCTION_FLOOR_MS) / 100.0 * LATENCY_DEDUCTION_PER_100MS;
    }
    score.clamp(0.0, 100.0).round() as u8
}

pub fn pod_health_label(score: u8) -> &'static str {
    if score >= HEALTHY_SCORE_MIN {
        "healthy"
    } else if score >= DEGRADED_SCORE_MIN {
        "degraded"
    } else {
        "critical"
    }
}

/// One aggregated row of the billing export: spend per service per month.
#[derive(Debug, Clone, PartialEq)]
pub struct CostRow {
    pub service: String,
    /// "YYYY-MM"
    pub month: String,
    pub total: f64,
}

/// Reduce billing export rows to the current/previous month comparison.
pub fn summarize_costs(
    rows: &[CostRow],
    current_month: &str,
    previous_month: &str,
    billing_enabled: bool,
) -> CostBreakdown {
    let month_total: f64 = rows
        .iter()
        .filter(|row| row.month == current_month)
        .map(|row| row.total)
        .sum();
    let previous_total: f64 = rows
        .iter()
        .filter(|row| row.month == previous_month)
        .map(|row| row.total)
        .sum();

    let top_cost_service = rows
        .iter()
        .filter(|row| row.month == current_month && row.total > 0.0)
        .max_by(|a, b| a.total.total_cmp(&b.total))
        .map(|row| row.service.clone());

    let percentage_change = if previous_total > 0.0 {
        Some(round2((month_total - previous_total) / previous_total * 100.0))
    } else {
        None
    };
    let anomaly_detected =
        percentage_change.is_some_and(|change| change > COST_ANOMALY_THRESHOLD_PERCENT);

    CostBreakdown {
        month_total: round2(month_total),
        top_cost_service,
        percentage_change,
        anomaly_detected,
        billing_enabled,
    }
}

/// Build a quota entry, deriving utilization and status.
pub fn quota_usage(metric: impl Into<String>, usage: f64, limit: f64) -> QuotaUsage {
    let utilization_percent = if limit > 0.0 {
        round2(usage / limit * 100.0)
    } else {
        0.0
    };
    let status = if utilization_percent >= QUOTA_CRITICAL_PERCENT {
        "critical"
    } else if utilization_percent >= QUOTA_WARNING_PERCENT {
        "warning"
    } else {
        "ok"
    };
    QuotaUsage {
        metric: metric.into(),
        usage,
        limit,
        utilization_percent,
        status: status.to_string(),
    }
}

/// Most utilized quotas first; ties keep metric name order.
pub fn rank_quotas(mut quotas: Vec<QuotaUsage>) -> Vec<QuotaUsage> {
    quotas.sort_by(|a, b| {
        b.utilization_percent
            .total_cmp(&a.utilization_percent)
            .then_with(|| a.metric.cmp(&b.metric))
    });
    quotas
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
