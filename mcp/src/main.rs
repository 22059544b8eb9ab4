use std::sync::Arc;

use clap::Parser;
use gcp_ops_core::Providers;
use gcp_ops_mcp_runtime::{RuntimeConfig, run};
use gcp_ops_providers::{DEFAULT_BILLING_DATASET, DEFAULT_BILLING_TABLE, GcpConfig, GcpProvider};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "gcp-ops-mcp",
    version,
    about = "Google Cloud operations tools for agents, served as MCP over stdio"
)]
struct Cli {
    /// Project selected at startup. Leave empty to require set_active_project.
    #[arg(long, env = "GOOGLE_CLOUD_PROJECT", default_value = "")]
    project: String,

    /// BigQuery dataset holding the billing export
    #[arg(long, env = "BILLING_DATASET", default_value = DEFAULT_BILLING_DATASET)]
    billing_dataset: String,

    /// Billing export table inside the dataset
    #[arg(long, env = "BILLING_TABLE", default_value = DEFAULT_BILLING_TABLE)]
    billing_table: String,

    /// OAuth access token; falls back to gcloud application default credentials
    #[arg(long, env = "GOOGLE_OAUTH_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // stdout carries protocol frames, so logs go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gcp_ops=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let default_project = Some(cli.project.trim().to_string()).filter(|p| !p.is_empty());
    let provider = GcpProvider::new(GcpConfig {
        access_token: cli.access_token,
        default_project: default_project.clone(),
        billing_dataset: cli.billing_dataset,
        billing_table: cli.billing_table,
    });

    let code = run(
        RuntimeConfig { default_project },
        Providers::from_shared(Arc::new(provider)),
    )
    .await;
    std::process::exit(code);
}
