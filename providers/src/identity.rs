use async_trait::async_trait;
use gcp_ops_core::model::{Identity, ProjectSummary};
use gcp_ops_core::provider::IdentityProvider;
use gcp_ops_core::{ProviderError, ProviderResult};
use serde::Deserialize;
use serde_json::json;

use crate::GcpProvider;
use crate::client::api_url;

const RESOURCE_MANAGER: &str = "Resource Manager";
const RESOURCE_MANAGER_URL: &str = "https://cloudresourcemanager.googleapis.com/v1";
const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Shown when the token carries no email (e.g. a service account without the
/// email scope).
const UNLABELED_IDENTITY: &str = "Application Default Credentials (no email available)";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectsPage {
    #[serde(default)]
    projects: Vec<ProjectResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResource {
    project_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    lifecycle_state: String,
}

#[derive(Debug, Default, Deserialize)]
struct TokenInfo {
    email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PermissionsResponse {
    #[serde(default)]
    permissions: Vec<String>,
}

#[async_trait]
impl IdentityProvider for GcpProvider {
    async fn list_projects(&self) -> ProviderResult<Vec<ProjectSummary>> {
        let url = format!("{RESOURCE_MANAGER_URL}/projects");
        let mut projects = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("filter", "lifecycleState:ACTIVE".to_string())];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }
            let page: ProjectsPage = self.client().get(RESOURCE_MANAGER, &url, &query).await?;
            projects.extend(page.projects.into_iter().map(|p| ProjectSummary {
                name: if p.name.is_empty() {
                    p.project_id.clone()
                } else {
                    p.name
                },
                project_id: p.project_id,
                state: p.lifecycle_state,
            }));
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        projects.sort_by(|a, b| a.project_id.cmp(&b.project_id));
        Ok(projects)
    }

    async fn current_identity(&self) -> ProviderResult<Identity> {
        let token = self.client().tokens().access_token().await?;
        let info: TokenInfo = self
            .client()
            .get("OAuth2", TOKENINFO_URL, &[("access_token", token)])
            .await
            .map_err(|err| match err {
                // tokeninfo answers 400 for expired or revoked tokens
                ProviderError::Api { status: 400, message, .. } => ProviderError::Credentials(
                    format!("access token was rejected: {message}"),
                ),
                other => other,
            })?;

        Ok(Identity {
            email_or_label: info
                .email
                .filter(|email| !email.is_empty())
                .unwrap_or_else(|| UNLABELED_IDENTITY.to_string()),
            project_id: self.config().default_project.clone().unwrap_or_default(),
            auth_method: self.client().tokens().auth_method().to_string(),
        })
    }

    async fn test_permissions(
        &self,
        project_id: &str,
        permissions: &[&str],
    ) -> ProviderResult<Vec<String>> {
        let url = api_url(
            RESOURCE_MANAGER,
            RESOURCE_MANAGER_URL,
            &["projects", &format!("{project_id}:testIamPermissions")],
        )?;
        let response: PermissionsResponse = self
            .client()
            .post(RESOURCE_MANAGER, &url, json!({ "permissions": permissions }))
            .await?;
        Ok(response.permissions)
    }
}
