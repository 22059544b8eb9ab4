use std::sync::Arc;

use gcp_ops_core::model::Identity;
use gcp_ops_core::provider::IdentityProvider;
use gcp_ops_core::{PermissionReport, ProviderError, required_permissions};

/// Checks an identity against the capability permission table.
#[derive(Clone)]
pub struct PermissionGate {
    identity: Arc<dyn IdentityProvider>,
}

impl PermissionGate {
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self { identity }
    }

    /// Issue one batch permission test for the union of required permissions
    /// and partition the result per capability.
    ///
    /// An empty project is reported without a provider call: nothing is
    /// granted and every permission is missing.
    pub async fn verify(
        &self,
        identity: &Identity,
        project_id: &str,
    ) -> Result<PermissionReport, ProviderError> {
        let project_id = project_id.trim();
        if project_id.is_empty() {
            return Ok(PermissionReport::from_granted(
                identity.email_or_label.as_str(),
                "",
                &[] as &[&str],
            ));
        }

        let required = required_permissions();
        let granted = self
            .identity
            .test_permissions(project_id, &required)
            .await?;
        tracing::debug!(
            project = project_id,
            granted = granted.len(),
            required = required.len(),
            "permission check completed"
        );
        Ok(PermissionReport::from_granted(
            identity.email_or_label.as_str(),
            project_id,
            &granted,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use gcp_ops_core::model::ProjectSummary;
    use gcp_ops_core::{Capability, ProviderResult};

    use super::*;

    struct ScriptedIdentity {
        granted: Result<Vec<String>, ProviderError>,
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl ScriptedIdentity {
        fn granting(granted: &[&str]) -> Self {
            Self {
                granted: Ok(granted.iter().map(|p| p.to_string()).collect()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl IdentityProvider for ScriptedIdentity {
        async fn list_projects(&self) -> ProviderResult<Vec<ProjectSummary>> {
            Ok(Vec::new())
        }

        async fn current_identity(&self) -> ProviderResult<Identity> {
            Ok(identity())
        }

        async fn test_permissions(
            &self,
            project_id: &str,
            permissions: &[&str],
        ) -> ProviderResult<Vec<String>> {
            self.calls.lock().unwrap().push((
                project_id.to_string(),
                permissions.iter().map(|p| p.to_string()).collect(),
            ));
            self.granted.clone()
        }
    }

    fn identity() -> Identity {
        Identity {
            email_or_label: "ops@example.com".to_string(),
            project_id: "home-proj".to_string(),
            auth_method: "access_token".to_string(),
        }
    }

    #[tokio::test]
    async fn verify_issues_one_batch_check_for_the_union() {
        let provider = Arc::new(ScriptedIdentity::granting(&[
            "monitoring.timeSeries.list",
            "bigquery.jobs.create",
        ]));
        let gate = PermissionGate::new(provider.clone());

        let report = gate.verify(&identity(), "demo-proj").await.unwrap();

        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "demo-proj");
        assert_eq!(calls[0].1.len(), 5);
        assert_eq!(report.identity, "ops@example.com");
        assert!(report.has(Capability::Health));
        assert!(!report.has(Capability::Cost));
        assert_eq!(
            report.missing_permissions,
            vec![
                "bigquery.tables.list",
                "cloudbuild.builds.list",
                "resourcemanager.projects.get",
            ]
        );
    }

    #[tokio::test]
    async fn check_failure_is_a_provider_error() {
        let provider = Arc::new(ScriptedIdentity {
            granted: Err(ProviderError::Api {
                service: "Resource Manager",
                status: 403,
                message: "Project not found or permission denied".to_string(),
            }),
            calls: Mutex::new(Vec::new()),
        });
        let gate = PermissionGate::new(provider);

        let err = gate.verify(&identity(), "ghost-proj").await.unwrap_err();
        assert!(err.to_string().contains("Project not found"));
    }

    #[tokio::test]
    async fn empty_project_reports_everything_missing_without_calling() {
        let provider = Arc::new(ScriptedIdentity::granting(&["monitoring.timeSeries.list"]));
        let gate = PermissionGate::new(provider.clone());

        let report = gate.verify(&identity(), "  ").await.unwrap();

        assert!(provider.calls.lock().unwrap().is_empty());
        assert_eq!(report.project_id, "");
        assert_eq!(report.missing_permissions.len(), 5);
        assert!(report.capabilities.values().all(|held| !*held));
    }
}
