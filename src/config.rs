// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! REST configuration helpers.
//!
//! `kube::Config` is the base configuration record every cluster client is
//! built from. These helpers load it and derive the variants collaborators need.

use crate::constants::discovery::DEFAULT_TIMEOUT_SECS;
use crate::error::{Error, Result};
use crate::types::Name;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Config;
use std::time::Duration;
use tracing::{debug, instrument};

/// Infer the configuration from the environment (kubeconfig or in-cluster)
pub async fn infer_config() -> Result<Config> {
    Config::infer()
        .await
        .map_err(|e| Error::InvalidConfig(format!("Failed to infer config: {}", e)))
}

/// Create a configuration from a kubeconfig document
pub async fn config_from_kubeconfig(kubeconfig: &str) -> Result<Config> {
    let parsed: Kubeconfig = serde_yaml::from_str(kubeconfig)
        .map_err(|e| Error::InvalidConfig(format!("Failed to parse kubeconfig: {}", e)))?;

    Config::from_custom_kubeconfig(parsed, &KubeConfigOptions::default())
        .await
        .map_err(|e| Error::InvalidConfig(format!("Failed to create config: {}", e)))
}

/// Bind `cluster` by appending its path to the server URL.
///
/// For collaborators that build their own HTTP client. Do not combine with the
/// cluster-aware transport, the path would be prefixed twice.
#[instrument(skip(config), fields(cluster_url = %config.cluster_url))]
pub fn with_cluster_host(mut config: Config, cluster: &Name) -> Result<Config> {
    let mut url = url::Url::parse(&config.cluster_url.to_string())
        .map_err(|e| Error::InvalidConfig(format!("Invalid cluster URL: {}", e)))?;

    let path = format!("{}{}", url.path().trim_end_matches('/'), cluster.path());
    url.set_path(&path);

    debug!("Scoping cluster URL to {}", url);
    config.cluster_url = url
        .as_str()
        .parse()
        .map_err(|e| Error::InvalidConfig(format!("Invalid URL: {}", e)))?;
    Ok(config)
}

/// Defaults that let API discovery succeed: discovery is request-heavy, so it
/// gets a per-request timeout when none is configured.
pub fn set_discovery_defaults(config: &mut Config) {
    if config.read_timeout.is_none() {
        config.read_timeout = Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: shard
  cluster:
    server: https://shard.example.com:6443
contexts:
- name: admin
  context:
    cluster: shard
    user: admin
current-context: admin
users:
- name: admin
  user:
    token: secret-token
"#;

    fn config(url: &str) -> Config {
        Config::new(url.parse().unwrap())
    }

    #[tokio::test]
    async fn test_config_from_kubeconfig() {
        let config = config_from_kubeconfig(KUBECONFIG).await.unwrap();
        assert_eq!(config.cluster_url.host(), Some("shard.example.com"));
        assert_eq!(config.cluster_url.port_u16(), Some(6443));
    }

    #[tokio::test]
    async fn test_config_from_invalid_kubeconfig() {
        let err = config_from_kubeconfig("clusters: [").await.unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_with_cluster_host() {
        let scoped = with_cluster_host(config("https://example.com:6443"), &Name::new("root:org")).unwrap();
        assert_eq!(scoped.cluster_url.path(), "/clusters/root:org");
        assert_eq!(scoped.cluster_url.host(), Some("example.com"));
    }

    #[test]
    fn test_with_cluster_host_keeps_existing_prefix() {
        let scoped = with_cluster_host(config("https://example.com/proxy/"), &Name::new("c1")).unwrap();
        assert_eq!(scoped.cluster_url.path(), "/proxy/clusters/c1");
    }

    #[test]
    fn test_set_discovery_defaults() {
        let mut unset = config("https://example.com");
        unset.read_timeout = None;
        set_discovery_defaults(&mut unset);
        assert_eq!(unset.read_timeout, Some(Duration::from_secs(32)));

        let mut custom = config("https://example.com");
        custom.read_timeout = Some(Duration::from_secs(5));
        set_discovery_defaults(&mut custom);
        assert_eq!(custom.read_timeout, Some(Duration::from_secs(5)));
    }
}
