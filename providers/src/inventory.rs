use std::collections::BTreeMap;

use async_trait::async_trait;
use gcp_ops_core::diagram::{ComputeInstance, Inventory, RunService, SqlInstance};
use gcp_ops_core::provider::InventoryProvider;
use gcp_ops_core::ProviderResult;
use serde::Deserialize;

use crate::GcpProvider;
use crate::client::{api_url, short_name};
use crate::compute::{CLOUD_RUN, CLOUD_RUN_URL, COMPUTE, COMPUTE_URL};

const CLOUD_SQL: &str = "Cloud SQL Admin";
const CLOUD_SQL_URL: &str = "https://sqladmin.googleapis.com/v1";

#[derive(Debug, Default, Deserialize)]
struct ServicesPage {
    #[serde(default)]
    services: Vec<RawService>,
}

#[derive(Debug, Deserialize)]
struct RawService {
    /// projects/{project}/locations/{region}/services/{name}
    name: String,
    uri: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AggregatedInstances {
    #[serde(default)]
    items: BTreeMap<String, InstancesScope>,
}

#[derive(Debug, Default, Deserialize)]
struct InstancesScope {
    #[serde(default)]
    instances: Vec<RawInstance>,
}

#[derive(Debug, Deserialize)]
struct RawInstance {
    name: String,
    #[serde(default)]
    zone: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Default, Deserialize)]
struct SqlInstancesPage {
    #[serde(default)]
    items: Vec<RawSqlInstance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSqlInstance {
    name: String,
    #[serde(default)]
    region: String,
    #[serde(default)]
    database_version: String,
}

fn run_service(raw: RawService) -> RunService {
    let segments: Vec<&str> = raw.name.split('/').collect();
    let (region, name) = match segments.as_slice() {
        [.., "locations", region, "services", name] => (region.to_string(), name.to_string()),
        _ => (String::new(), short_name(&raw.name).to_string()),
    };
    RunService {
        name,
        region,
        url: raw.uri.filter(|uri| !uri.is_empty()),
    }
}

fn compute_instances(aggregated: AggregatedInstances) -> Vec<ComputeInstance> {
    aggregated
        .items
        .into_values()
        .flat_map(|scope| scope.instances)
        .map(|raw| ComputeInstance {
            zone: short_name(&raw.zone).to_string(),
            name: raw.name,
            status: raw.status,
        })
        .collect()
}

impl GcpProvider {
    async fn run_services(&self, project_id: &str) -> ProviderResult<Vec<RunService>> {
        let url = api_url(
            CLOUD_RUN,
            CLOUD_RUN_URL,
            &["projects", project_id, "locations", "-", "services"],
        )?;
        let page: ServicesPage = self.client().get(CLOUD_RUN, &url, &[]).await?;
        Ok(page.services.into_iter().map(run_service).collect())
    }

    async fn compute_instances(&self, project_id: &str) -> ProviderResult<Vec<ComputeInstance>> {
        let url = api_url(
            COMPUTE,
            COMPUTE_URL,
            &["projects", project_id, "aggregated", "instances"],
        )?;
        let aggregated: AggregatedInstances = self.client().get(COMPUTE, &url, &[]).await?;
        Ok(compute_instances(aggregated))
    }

    async fn sql_instances(&self, project_id: &str) -> ProviderResult<Vec<SqlInstance>> {
        let url = api_url(CLOUD_SQL, CLOUD_SQL_URL, &["projects", project_id, "instances"])?;
        let page: SqlInstancesPage = self.client().get(CLOUD_SQL, &url, &[]).await?;
        Ok(page
            .items
            .into_iter()
            .map(|raw| SqlInstance {
                name: raw.name,
                region: raw.region,
                database_version: raw.database_version,
            })
            .collect())
    }
}

#[async_trait]
impl InventoryProvider for GcpProvider {
    async fn inventory(&self, project_id: &str) -> ProviderResult<Inventory> {
        let (run_services, instances, sql_instances) = tokio::try_join!(
            self.run_services(project_id),
            self.compute_instances(project_id),
            self.sql_instances(project_id),
        )?;
        tracing::debug!(
            project = project_id,
            run = run_services.len(),
            instances = instances.len(),
            sql = sql_instances.len(),
            "inventory collected"
        );
        Ok(Inventory {
            run_services,
            instances,
            sql_instances,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn run_service_names_split_into_region_and_name() {
        let service = run_service(RawService {
            name: "projects/demo-proj/locations/us-central1/services/payments-api".to_string(),
            uri: Some("https://payments-api-xyz.a.run.app".to_string()),
        });
        assert_eq!(service.region, "us-central1");
        assert_eq!(service.name, "payments-api");
    }

    #[test]
    fn aggregated_instances_flatten_across_zones() {
        let aggregated: AggregatedInstances = serde_json::from_value(json!({
            "items": {
                "zones/us-central1-a": {
                    "instances": [{
                        "name": "batch-1",
                        "zone": "https://www.googleapis.com/compute/v1/projects/demo-proj/zones/us-central1-a",
                        "status": "RUNNING"
                    }]
                },
                "zones/europe-west1-b": {
                    "warning": { "code": "NO_RESULTS_ON_PAGE" }
                }
            }
        }))
        .unwrap();
        let instances = compute_instances(aggregated);
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].zone, "us-central1-a");
    }
}
