use gcp_ops_core::{ProviderError, ProviderResult};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::auth::TokenSource;

/// Authenticated JSON client shared by every Google API adapter.
pub struct GcpClient {
    http: reqwest::Client,
    tokens: TokenSource,
}

impl GcpClient {
    pub fn new(tokens: TokenSource) -> Self {
        Self {
            http: reqwest::Client::new(),
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenSource {
        &self.tokens
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        service: &'static str,
        url: &str,
        query: &[(&str, String)],
    ) -> ProviderResult<T> {
        self.send(service, Method::GET, url, query, None).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        service: &'static str,
        url: &str,
        body: Value,
    ) -> ProviderResult<T> {
        self.send(service, Method::POST, url, &[], Some(body)).await
    }

    pub async fn patch<T: DeserializeOwned>(
        &self,
        service: &'static str,
        url: &str,
        query: &[(&str, String)],
        body: Value,
    ) -> ProviderResult<T> {
        self.send(service, Method::PATCH, url, query, Some(body))
            .await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        service: &'static str,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> ProviderResult<T> {
        let token = self.tokens.access_token().await?;
        tracing::debug!(service, method = %method, url, "google api request");

        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(token)
            .query(query);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Transport {
                service,
                message: e.to_string(),
            })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Transport {
                service,
                message: format!("failed to read response body: {e}"),
            })?;

        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                self.tokens.invalidate().await;
            }
            return Err(ProviderError::Api {
                service,
                status: status.as_u16(),
                message: error_message(&bytes, status),
            });
        }

        // Some endpoints answer 200 with an empty body.
        let bytes: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &bytes
        };
        serde_json::from_slice(bytes).map_err(|e| ProviderError::Decode {
            service,
            message: e.to_string(),
        })
    }
}

/// Join names onto an API base URL, one percent-encoded path segment each.
///
/// A `/`, `?` or `#` inside a name stays inside its segment. Empty and dot
/// segments are refused since they would change which resource is addressed.
pub(crate) fn api_url(
    service: &'static str,
    base: &str,
    segments: &[&str],
) -> ProviderResult<String> {
    if let Some(bad) = segments
        .iter()
        .find(|segment| matches!(**segment, "" | "." | ".."))
    {
        return Err(ProviderError::InvalidReference {
            service,
            message: format!("'{bad}' is not a usable resource name"),
        });
    }
    let mut url = Url::parse(base).map_err(|e| ProviderError::InvalidReference {
        service,
        message: format!("{base}: {e}"),
    })?;
    url.path_segments_mut()
        .map_err(|()| ProviderError::InvalidReference {
            service,
            message: format!("{base} cannot carry a path"),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url.into())
}

/// Pull the human message out of a Google API error body, which looks like
/// `{"error": {"code": 403, "message": "...", "status": "PERMISSION_DENIED"}}`.
pub(crate) fn error_message(body: &[u8], status: StatusCode) -> String {
    let parsed: Option<Value> = serde_json::from_slice(body).ok();
    let message = parsed.as_ref().and_then(|value| {
        let error = value.get("error")?;
        match error {
            Value::String(text) => Some(
                value
                    .get("error_description")
                    .and_then(Value::as_str)
                    .map(|desc| format!("{text}: {desc}"))
                    .unwrap_or_else(|| text.clone()),
            ),
            Value::Object(obj) => {
                let message = obj.get("message").and_then(Value::as_str)?;
                Some(match obj.get("status").and_then(Value::as_str) {
                    Some(code) => format!("{message} [{code}]"),
                    None => message.to_string(),
                })
            }
            _ => None,
        }
    });

    message.unwrap_or_else(|| {
        let text = String::from_utf8_lossy(body).trim().to_string();
        if text.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("no response body")
                .to_string()
        } else {
            text
        }
    })
}

/// Google encodes 64-bit integers as strings; accept either form.
pub(crate) fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Last path segment of a resource name or self link.
pub(crate) fn short_name(resource: &str) -> &str {
    resource.rsplit('/').next().unwrap_or(resource)
}
