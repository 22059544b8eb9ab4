use async_trait::async_trait;
use gcp_ops_core::model::{LogEntry, LogQuery};
use gcp_ops_core::provider::LoggingProvider;
use gcp_ops_core::ProviderResult;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::GcpProvider;

const CLOUD_LOGGING: &str = "Cloud Logging";
const ENTRIES_LIST_URL: &str = "https://logging.googleapis.com/v2/entries:list";

const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Debug, Default, Deserialize)]
struct EntriesPage {
    #[serde(default)]
    entries: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    timestamp: Option<String>,
    severity: Option<String>,
    resource: Option<MonitoredResource>,
    text_payload: Option<String>,
    json_payload: Option<Value>,
    proto_payload: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct MonitoredResource {
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl RawEntry {
    fn message(&self) -> String {
        let message = if let Some(text) = &self.text_payload {
            text.clone()
        } else if let Some(payload) = &self.json_payload {
            payload
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| payload.to_string())
        } else if let Some(payload) = &self.proto_payload {
            // Audit logs: method plus status message when present
            let method = payload.get("methodName").and_then(Value::as_str);
            let status = payload
                .pointer("/status/message")
                .and_then(Value::as_str);
            match (method, status) {
                (Some(method), Some(status)) => format!("{method}: {status}"),
                (Some(method), None) => method.to_string(),
                (None, Some(status)) => status.to_string(),
                (None, None) => payload.to_string(),
            }
        } else {
            String::new()
        };
        truncate(message.trim(), MAX_MESSAGE_CHARS)
    }

    fn into_entry(self) -> LogEntry {
        LogEntry {
            message: self.message(),
            timestamp: self.timestamp,
            severity: self.severity.unwrap_or_else(|| "DEFAULT".to_string()),
            resource_type: self.resource.and_then(|r| r.kind),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[async_trait]
impl LoggingProvider for GcpProvider {
    async fn search_logs(&self, project_id: &str, query: &LogQuery) -> ProviderResult<Vec<LogEntry>> {
        let mut body = json!({
            "resourceNames": [format!("projects/{project_id}")],
            "orderBy": "timestamp desc",
            "pageSize": query.limit,
        });
        let filter = query.filter();
        if !filter.is_empty() {
            body["filter"] = Value::String(filter);
        }

        let page: EntriesPage = self.client().post(CLOUD_LOGGING, ENTRIES_LIST_URL, body).await?;
        Ok(page
            .entries
            .into_iter()
            .take(query.limit as usize)
            .map(RawEntry::into_entry)
            .collect())
    }
}
