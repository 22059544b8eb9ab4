use async_trait::async_trait;
use gcp_ops_core::model::Recommendation;
use gcp_ops_core::provider::RecommendationProvider;
use gcp_ops_core::{ProviderError, ProviderResult};
use serde::Deserialize;
use serde_json::Value;

use crate::GcpProvider;
use crate::client::{api_url, number};

const RECOMMENDER: &str = "Recommender";
const RECOMMENDER_URL: &str = "https://recommender.googleapis.com/v1";

/// Categories queried per call, as (label, recommender id). Not every
/// recommender exists at every location; those simply fail and are skipped.
const RECOMMENDERS: [(&str, &str); 6] = [
    ("idle-vm", "google.compute.instance.IdleResourceRecommender"),
    ("vm-rightsizing", "google.compute.instance.MachineTypeRecommender"),
    ("idle-disk", "google.compute.disk.IdleResourceRecommender"),
    ("idle-address", "google.compute.address.IdleResourceRecommender"),
    ("idle-sql", "google.cloudsql.instance.IdleRecommender"),
    ("project-utilization", "google.resourcemanager.projectUtilization.Recommender"),
];

#[derive(Debug, Default, Deserialize)]
struct RecommendationsPage {
    #[serde(default)]
    recommendations: Vec<RawRecommendation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecommendation {
    #[serde(default)]
    description: String,
    priority: Option<String>,
    primary_impact: Option<Value>,
}

impl RawRecommendation {
    /// Monthly savings from a cost projection, which Google reports as a
    /// negative `Money` over the projection window.
    fn savings(&self) -> (Option<f64>, Option<String>) {
        let Some(cost) = self
            .primary_impact
            .as_ref()
            .and_then(|impact| impact.pointer("/costProjection/cost"))
        else {
            return (None, None);
        };
        let units = cost.get("units").and_then(number).unwrap_or(0.0);
        let nanos = cost.get("nanos").and_then(number).unwrap_or(0.0);
        let amount = -(units + nanos / 1e9);
        let currency = cost
            .get("currencyCode")
            .and_then(Value::as_str)
            .map(str::to_string);
        ((amount > 0.0).then(|| (amount * 100.0).round() / 100.0), currency)
    }

    fn into_recommendation(self, category: &str) -> Recommendation {
        let (estimated_monthly_savings, currency) = self.savings();
        Recommendation {
            category: category.to_string(),
            description: self.description,
            priority: self.priority,
            estimated_monthly_savings,
            currency,
        }
    }
}

/// Whether a failed category should fail the whole call. Credential
/// problems affect every category alike, so they are never skipped.
fn is_fatal(err: &ProviderError) -> bool {
    matches!(
        err,
        ProviderError::Credentials(_) | ProviderError::Api { status: 401, .. }
    )
}

/// Query every category through `fetch`, skipping the ones that fail.
async fn collect_recommendations<F, Fut>(
    project_id: &str,
    location: &str,
    mut fetch: F,
) -> ProviderResult<Vec<Recommendation>>
where
    F: FnMut(&'static str) -> Fut,
    Fut: Future<Output = ProviderResult<RecommendationsPage>>,
{
    let mut found = Vec::new();
    for (category, recommender) in RECOMMENDERS {
        match fetch(recommender).await {
            Ok(page) => found.extend(
                page.recommendations
                    .into_iter()
                    .map(|raw| raw.into_recommendation(category)),
            ),
            Err(err) if is_fatal(&err) => return Err(err),
            Err(err) => {
                tracing::warn!(
                    project = project_id,
                    location,
                    recommender,
                    error = %err,
                    "recommender category skipped"
                );
            }
        }
    }
    Ok(found)
}

#[async_trait]
impl RecommendationProvider for GcpProvider {
    async fn recommendations(
        &self,
        project_id: &str,
        location: &str,
    ) -> ProviderResult<Vec<Recommendation>> {
        // Fail once up front rather than six times inside the loop.
        self.client().tokens().access_token().await?;

        collect_recommendations(project_id, location, move |recommender| async move {
            let url = api_url(
                RECOMMENDER,
                RECOMMENDER_URL,
                &[
                    "projects",
                    project_id,
                    "locations",
                    location,
                    "recommenders",
                    recommender,
                    "recommendations",
                ],
            )?;
            let query = [("filter", "stateInfo.state=ACTIVE".to_string())];
            self.client()
                .get::<RecommendationsPage>(RECOMMENDER, &url, &query)
                .await
        })
        .await
    }
}
