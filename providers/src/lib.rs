//! Google Cloud REST adapters for the gcp-ops provider traits.
//!
//! A single [`GcpProvider`] implements every capability; each trait lives in
//! the module named after the API family it talks to.

pub mod auth;
pub mod billing;
pub mod build;
pub mod client;
pub mod compute;
pub mod identity;
pub mod inventory;
pub mod logging;
pub mod monitoring;
pub mod quota;
pub mod recommender;
pub mod security;

use auth::TokenSource;
use client::GcpClient;

pub const DEFAULT_BILLING_DATASET: &str = "billing_export";
pub const DEFAULT_BILLING_TABLE: &str = "gcp_billing_export_v1";

#[derive(Debug, Clone)]
pub struct GcpConfig {
    /// Bearer token to use instead of gcloud application default credentials
    pub access_token: Option<String>,
    /// Project the credentials are associated with, reported by identity checks
    pub default_project: Option<String>,
    pub billing_dataset: String,
    pub billing_table: String,
}

impl Default for GcpConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            default_project: None,
            billing_dataset: DEFAULT_BILLING_DATASET.to_string(),
            billing_table: DEFAULT_BILLING_TABLE.to_string(),
        }
    }
}

pub struct GcpProvider {
    config: GcpConfig,
    client: GcpClient,
}

impl GcpProvider {
    pub fn new(config: GcpConfig) -> Self {
        let client = GcpClient::new(TokenSource::new(config.access_token.clone()));
        Self { config, client }
    }

    pub fn config(&self) -> &GcpConfig {
        &self.config
    }

    pub(crate) fn client(&self) -> &GcpClient {
        &self.client
    }
}
