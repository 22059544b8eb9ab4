use chrono::{DateTime, Duration, Utc};
use gcp_ops_core::{ProviderError, ProviderResult};
use tokio::process::Command;
use tokio::sync::Mutex;

/// gcloud access tokens live for an hour; refresh well before that.
const GCLOUD_TOKEN_LIFETIME_MINUTES: i64 = 50;

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Bearer tokens for Google APIs, resolved in priority order:
/// 1. an explicitly configured access token
/// 2. `gcloud auth application-default print-access-token` (cached)
pub struct TokenSource {
    explicit: Option<String>,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    pub fn new(explicit: Option<String>) -> Self {
        Self {
            explicit: explicit
                .map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty()),
            cached: Mutex::new(None),
        }
    }

    /// How the credentials were obtained, as reported by `test_iam_identity`.
    pub fn auth_method(&self) -> &'static str {
        if self.explicit.is_some() {
            "access_token"
        } else {
            "gcloud_adc"
        }
    }

    pub async fn access_token(&self) -> ProviderResult<String> {
        if let Some(token) = &self.explicit {
            return Ok(token.clone());
        }

        let mut cached = self.cached.lock().await;
        if let Some(entry) = cached.as_ref()
            && Utc::now() < entry.expires_at
        {
            return Ok(entry.token.clone());
        }

        let token = print_access_token().await?;
        tracing::debug!("refreshed application default credentials via gcloud");
        *cached = Some(CachedToken {
            token: token.clone(),
            expires_at: Utc::now() + Duration::minutes(GCLOUD_TOKEN_LIFETIME_MINUTES),
        });
        Ok(token)
    }

    /// Drop a cached token, e.g. after the API rejected it.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}

async fn print_access_token() -> ProviderResult<String> {
    let output = Command::new("gcloud")
        .args(["auth", "application-default", "print-access-token"])
        .output()
        .await
        .map_err(|e| ProviderError::Credentials(format!("failed to run gcloud: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ProviderError::Credentials(format!(
            "gcloud exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    parse_token_output(&output.stdout)
}

fn parse_token_output(stdout: &[u8]) -> ProviderResult<String> {
    let token = String::from_utf8_lossy(stdout).trim().to_string();
    if token.is_empty() {
        return Err(ProviderError::Credentials(
            "gcloud printed an empty access token".to_string(),
        ));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use gcp_ops_core::ErrorKind;

    use super::*;

    #[tokio::test]
    async fn explicit_token_wins() {
        let source = TokenSource::new(Some("  ya29.token \n".to_string()));
        assert_eq!(source.auth_method(), "access_token");
        assert_eq!(source.access_token().await.unwrap(), "ya29.token");
    }

    #[test]
    fn blank_explicit_token_falls_back_to_gcloud() {
        let source = TokenSource::new(Some("   ".to_string()));
        assert_eq!(source.auth_method(), "gcloud_adc");
    }

    #[test]
    fn empty_gcloud_output_is_a_credentials_error() {
        let err = parse_token_output(b"\n").unwrap_err();
        assert_eq!(
            gcp_ops_core::classify_provider_error(&err.to_string()),
            ErrorKind::AuthenticationError
        );
        assert_eq!(parse_token_output(b"ya29.abc\n").unwrap(), "ya29.abc");
    }
}
