use std::net::SocketAddr;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use storage_client::StorageConfig;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub env: String,
    pub structured_logging: bool,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen_addr: "0.0.0.0:8920".to_string(),
            env: "local".to_string(),
            structured_logging: false,
            storage: StorageConfig::from_env(),
        }
    }
}

impl ServerConfig {
    pub fn from_path(path: &str) -> Result<ServerConfig> {
        let config_str = std::fs::read_to_string(path)?;
        let mut config: ServerConfig = Figment::new()
            .merge(Yaml::string(&config_str))
            .merge(Env::prefixed("ASSETS_"))
            .extract()?;
        // Credentials always come from the environment; the config file can
        // only carry the endpoint for deployments without env injection.
        let env_storage = StorageConfig::from_env();
        if config.storage.endpoint.is_none() {
            config.storage.endpoint = env_storage.endpoint;
        }
        config.storage.service_key = env_storage.service_key;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(anyhow::anyhow!(
                "invalid listen address: {}",
                self.listen_addr
            ));
        }
        if let Some(endpoint) = &self.storage.endpoint {
            if endpoint.parse::<Url>().is_err() {
                return Err(anyhow::anyhow!("invalid storage endpoint: {}", endpoint));
            }
        }
        Ok(())
    }

    /// Fails when any required storage credential is absent, naming the
    /// missing variables without printing values.
    pub fn require_credentials(&self) -> Result<()> {
        let missing = self.storage.missing_credentials();
        if !missing.is_empty() {
            return Err(anyhow::anyhow!(
                "missing required environment variables: {}",
                missing.join(", ")
            ));
        }
        Ok(())
    }

    pub fn structured_logging(&self) -> bool {
        self.structured_logging
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_listen_addr() {
        let mut config = ServerConfig::default();
        config.storage = StorageConfig::default();
        assert!(config.validate().is_ok());
        config.listen_addr = "not-an-addr".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_require_credentials_names_missing_vars() {
        let config = ServerConfig {
            storage: StorageConfig {
                endpoint: None,
                service_key: None,
            },
            ..Default::default()
        };
        let err = config.require_credentials().unwrap_err().to_string();
        assert!(err.contains("STORAGE_API_URL"));
        assert!(err.contains("STORAGE_SERVICE_KEY"));
    }

    #[test]
    fn test_env_overrides_yaml() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
                listen_addr: "0.0.0.0:8920"
                env: "local"
                structured_logging: false
                "#,
            )?;
            jail.set_env("ASSETS_ENV", "staging");
            let config = ServerConfig::from_path("config.yaml").map_err(|e| e.to_string())?;
            assert_eq!(config.env, "staging");
            assert_eq!(config.listen_addr, "0.0.0.0:8920");
            Ok(())
        });
    }
}
