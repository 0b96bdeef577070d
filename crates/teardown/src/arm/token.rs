//! Access token acquisition for Resource Manager

use super::error::ProviderError;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::debug;

/// Tokens this close to expiry are fetched again
const REFRESH_MARGIN_SECS: i64 = 300;

/// Where the bearer token comes from
#[derive(Debug, Clone)]
pub enum TokenSource {
    /// Token supplied by the caller (flag or `AZURE_ACCESS_TOKEN`)
    Static(String),
    /// Token fetched from the Azure CLI's logged-in account, refreshed before it expires
    AzureCli,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CachedToken {
    value: String,
    /// `None` for tokens that are never refreshed
    expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let margin = chrono::Duration::seconds(REFRESH_MARGIN_SECS);
        self.expires_at
            .is_none_or(|expires_at| now + margin < expires_at)
    }
}

/// Resolves and caches a bearer token for one client
#[derive(Debug)]
pub struct TokenProvider {
    source: TokenSource,
    resource: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(source: TokenSource, resource: impl Into<String>) -> Self {
        Self {
            source,
            resource: resource.into(),
            cached: Mutex::new(None),
        }
    }

    pub async fn token(&self) -> Result<String, ProviderError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.value.clone());
        }

        let token = match &self.source {
            TokenSource::Static(value) => CachedToken {
                value: value.clone(),
                expires_at: None,
            },
            TokenSource::AzureCli => azure_cli_token(&self.resource).await?,
        };
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }
}

/// `az account get-access-token --output json`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    /// Local time, e.g. `2024-06-01 13:00:00.000000`
    #[serde(default)]
    expires_on: Option<String>,
    /// Unix seconds; only printed by newer CLI versions
    #[serde(default, rename = "expires_on")]
    expires_on_epoch: Option<i64>,
}

impl CliToken {
    fn expires_at(&self) -> Option<DateTime<Utc>> {
        if let Some(epoch) = self.expires_on_epoch {
            return DateTime::from_timestamp(epoch, 0);
        }
        let raw = self.expires_on.as_deref()?;
        let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").ok()?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|t| t.with_timezone(&Utc))
    }
}

fn parse_cli_token(stdout: &[u8]) -> Result<CachedToken, ProviderError> {
    let token: CliToken = serde_json::from_slice(stdout)
        .map_err(|e| ProviderError::Credentials(format!("unexpected az output: {}", e)))?;
    if token.access_token.trim().is_empty() {
        return Err(ProviderError::Credentials(
            "az returned an empty token".to_string(),
        ));
    }
    let expires_at = token.expires_at();
    if expires_at.is_none() {
        debug!("az did not report a token expiry; it will be fetched on every request");
    }
    Ok(CachedToken {
        value: token.access_token.trim().to_string(),
        // Unknown expiry counts as already stale
        expires_at: Some(expires_at.unwrap_or(DateTime::<Utc>::MIN_UTC)),
    })
}

/// Ask the Azure CLI for a token scoped to `resource`
async fn azure_cli_token(resource: &str) -> Result<CachedToken, ProviderError> {
    debug!(resource = %resource, "Requesting access token from Azure CLI");

    let output = Command::new("az")
        .args([
            "account",
            "get-access-token",
            "--resource",
            resource,
            "--output",
            "json",
        ])
        .output()
        .await
        .map_err(|e| ProviderError::Credentials(format!("failed to run az: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ProviderError::Credentials(stderr.trim().to_string()));
    }

    let token = parse_cli_token(&output.stdout)?;
    debug!(expires_at = ?token.expires_at, "Access token acquired");
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, minute, 0).unwrap()
    }

    #[tokio::test]
    async fn test_static_token() {
        let provider = TokenProvider::new(
            TokenSource::Static("abc".to_string()),
            "https://management.azure.com",
        );
        assert_eq!(provider.token().await.unwrap(), "abc");
        assert_eq!(provider.token().await.unwrap(), "abc");
    }

    #[test]
    fn test_token_refreshed_before_expiry() {
        let token = CachedToken {
            value: "t".to_string(),
            expires_at: Some(at(13, 0)),
        };
        assert!(token.is_fresh(at(12, 0)));
        assert!(token.is_fresh(at(12, 54)));
        // Inside the margin, and past expiry
        assert!(!token.is_fresh(at(12, 56)));
        assert!(!token.is_fresh(at(14, 0)));
    }

    #[test]
    fn test_static_token_never_refreshed() {
        let token = CachedToken {
            value: "t".to_string(),
            expires_at: None,
        };
        assert!(token.is_fresh(DateTime::<Utc>::MAX_UTC));
    }

    #[test]
    fn test_cli_output_with_epoch_expiry() {
        let token = parse_cli_token(
            br#"{"accessToken": "eyJ0", "expiresOn": "2024-06-01 13:00:00.000000", "expires_on": 1717246800, "tokenType": "Bearer"}"#,
        )
        .unwrap();
        assert_eq!(token.value, "eyJ0");
        assert_eq!(token.expires_at, Some(at(13, 0)));
    }

    #[test]
    fn test_cli_output_with_local_expiry() {
        let token =
            parse_cli_token(br#"{"accessToken": "eyJ0", "expiresOn": "2024-06-01 13:00:00.000000"}"#)
                .unwrap();
        let expected = Local
            .with_ymd_and_hms(2024, 6, 1, 13, 0, 0)
            .earliest()
            .map(|t| t.with_timezone(&Utc));
        assert_eq!(token.expires_at, expected);
    }

    #[test]
    fn test_cli_output_without_expiry_is_stale() {
        let token = parse_cli_token(br#"{"accessToken": "eyJ0"}"#).unwrap();
        assert!(!token.is_fresh(at(12, 0)));
    }

    #[test]
    fn test_empty_cli_token_is_rejected() {
        assert!(matches!(
            parse_cli_token(br#"{"accessToken": " "}"#),
            Err(ProviderError::Credentials(_))
        ));
    }
}
