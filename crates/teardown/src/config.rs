//! Configuration types for the teardown binary

use crate::arm::TokenSource;
use crate::orchestrator::RemovalOptions;

/// Resource Manager connection settings
#[derive(Debug, Clone)]
pub struct ArmConfig {
    /// Base URL, e.g. `https://management.azure.com`
    pub endpoint: String,
    /// Bearer token; the Azure CLI is asked when absent
    pub access_token: Option<String>,
}

impl ArmConfig {
    pub fn token_source(&self) -> TokenSource {
        match &self.access_token {
            Some(token) => TokenSource::Static(token.clone()),
            None => TokenSource::AzureCli,
        }
    }
}

/// How the final report is printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

/// Everything one `remove` invocation needs
#[derive(Debug, Clone)]
pub struct TeardownConfig {
    pub resource_id: String,
    pub resource_type: String,
    pub arm: ArmConfig,
    pub removal: RemovalOptions,
    pub output: OutputConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_source_prefers_explicit_token() {
        let config = ArmConfig {
            endpoint: "https://management.azure.com".into(),
            access_token: Some("t".into()),
        };
        assert!(matches!(config.token_source(), TokenSource::Static(t) if t == "t"));

        let config = ArmConfig {
            access_token: None,
            ..config
        };
        assert!(matches!(config.token_source(), TokenSource::AzureCli));
    }
}
