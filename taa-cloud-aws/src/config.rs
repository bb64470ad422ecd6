//! AWS and Snowflake connection settings

use crate::{Error, Result};
use aws_config::{BehaviorVersion, SdkConfig};

/// Region and credentials from the standard provider chain
pub async fn load_sdk_config() -> SdkConfig {
    aws_config::load_defaults(BehaviorVersion::latest()).await
}

/// Athena execution context
#[derive(Debug, Clone)]
pub struct AthenaSettings {
    pub database: String,
    pub catalog: String,
    pub workgroup: Option<String>,
}

impl AthenaSettings {
    pub const DEFAULT_CATALOG: &'static str = "AwsDataCatalog";

    pub fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(Error::Configuration("database cannot be empty".into()));
        }
        if self.catalog.trim().is_empty() {
            return Err(Error::Configuration("catalog cannot be empty".into()));
        }
        Ok(())
    }
}

/// Snowflake connection target
#[derive(Debug, Clone)]
pub struct SnowflakeConfig {
    /// Account identifier, e.g. `xy12345` or `myorg-myaccount`
    pub account: String,
    pub database: String,
    pub schema: String,
    pub warehouse: String,

    /// Override for the SQL API host; derived from `account` when unset
    pub base_url: Option<String>,
}

impl SnowflakeConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("account", &self.account),
            ("database", &self.database),
            ("schema", &self.schema),
            ("warehouse", &self.warehouse),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Configuration(format!("{} cannot be empty", name)));
            }
        }

        if let Some(url) = &self.base_url {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(Error::Configuration(
                    "base_url must be a valid HTTP(S) URL".into(),
                ));
            }
        }
        Ok(())
    }

    /// SQL API root, without a trailing slash
    pub fn api_base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!(
                "https://{}.snowflakecomputing.com",
                self.account.to_lowercase()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snowflake() -> SnowflakeConfig {
        SnowflakeConfig {
            account: "XY12345".to_string(),
            database: "ANALYTICS".to_string(),
            schema: "TAA".to_string(),
            warehouse: "LOAD_WH".to_string(),
            base_url: None,
        }
    }

    #[test]
    fn test_api_base_url_from_account() {
        assert_eq!(
            snowflake().api_base_url(),
            "https://xy12345.snowflakecomputing.com"
        );
    }

    #[test]
    fn test_validate_rejects_empty_schema() {
        let config = SnowflakeConfig {
            schema: " ".to_string(),
            ..snowflake()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_invalid_url() {
        let config = SnowflakeConfig {
            base_url: Some("not-a-url".to_string()),
            ..snowflake()
        };
        assert!(config.validate().is_err());
    }
}
