// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster-scoped API discovery.

use crate::client::constructor::{Cache, ClientCache, Constructor};
use crate::config::set_discovery_defaults;
use crate::error::{Error, Result};
use crate::types::Name;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{
    APIGroup, APIGroupList, APIResourceList, GroupVersionForDiscovery,
};
use kube::{Client, Config};
use tracing::{debug, instrument};

/// Holds an unscoped configuration and HTTP client, and hands out discovery
/// clients scoped to a logical cluster.
pub struct ClusterDiscoveryClient {
    cache: ClientCache<DiscoveryClient>,
}

impl ClusterDiscoveryClient {
    pub fn new_for_config(mut config: Config) -> Result<Self> {
        set_discovery_defaults(&mut config);
        let client = Client::try_from(config.clone())?;
        Ok(Self::with_client(config, client))
    }

    pub fn new_for_config_and_client(mut config: Config, client: Client) -> Self {
        set_discovery_defaults(&mut config);
        Self::with_client(config, client)
    }

    fn with_client(config: Config, client: Client) -> Self {
        let constructor = Constructor::new(|_: &Config, client: Client| Ok(DiscoveryClient { client }));
        Self {
            cache: ClientCache::new(config, client, constructor),
        }
    }

    /// Discovery client scoped to `cluster`.
    pub fn cluster(&self, cluster: &Name) -> DiscoveryClient {
        self.cache.cluster_or_die(cluster)
    }

    /// Configuration with discovery defaults applied.
    pub fn config(&self) -> &Config {
        self.cache.config()
    }
}

/// Discovery for one logical cluster.
#[derive(Clone)]
pub struct DiscoveryClient {
    client: Client,
}

impl DiscoveryClient {
    /// Supported API groups, with the legacy core group first.
    ///
    /// A server that does not serve `/api` or `/apis` (404) contributes no groups.
    #[instrument(skip(self))]
    pub async fn server_groups(&self) -> Result<APIGroupList> {
        let mut groups = Vec::new();

        match self.client.list_core_api_versions().await.map_err(Error::from) {
            Ok(core) if !core.versions.is_empty() => groups.push(legacy_group(&core.versions)),
            Ok(_) => {}
            Err(e) if e.is_not_found() => debug!("Server does not serve /api"),
            Err(e) => return Err(e),
        }

        match self.client.list_api_groups().await.map_err(Error::from) {
            Ok(list) => groups.extend(list.groups),
            Err(e) if e.is_not_found() => debug!("Server does not serve /apis"),
            Err(e) => return Err(e),
        }

        Ok(APIGroupList { groups })
    }

    /// Every served group version, as `v1` for the core group and
    /// `<group>/<version>` otherwise.
    pub async fn server_group_versions(&self) -> Result<Vec<String>> {
        Ok(extract_group_versions(&self.server_groups().await?))
    }

    /// Resources served under `group_version`.
    #[instrument(skip(self))]
    pub async fn server_resources_for_group_version(&self, group_version: &str) -> Result<APIResourceList> {
        let list = if group_version.contains('/') {
            self.client.list_api_group_resources(group_version).await?
        } else {
            self.client.list_core_api_resources(group_version).await?
        };
        Ok(list)
    }
}

fn legacy_group(versions: &[String]) -> APIGroup {
    let versions: Vec<GroupVersionForDiscovery> = versions
        .iter()
        .map(|v| GroupVersionForDiscovery {
            group_version: v.clone(),
            version: v.clone(),
        })
        .collect();
    APIGroup {
        name: String::new(),
        preferred_version: versions.first().cloned(),
        versions,
        ..Default::default()
    }
}

pub fn extract_group_versions(list: &APIGroupList) -> Vec<String> {
    list.groups
        .iter()
        .flat_map(|g| g.versions.iter().map(|v| v.group_version.clone()))
        .collect()
}
