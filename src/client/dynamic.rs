// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster-scoped dynamic client.

use crate::client::constructor::{Cache, ClientCache, Constructor};
use crate::error::Result;
use crate::types::Name;
use kube::api::{ApiResource, DynamicObject};
use kube::{Api, Client, Config};

pub struct ClusterDynamicClient {
    cache: ClientCache<DynamicClient>,
}

impl ClusterDynamicClient {
    pub fn new_for_config(config: Config) -> Result<Self> {
        let client = Client::try_from(config.clone())?;
        Ok(Self::new_for_config_and_client(config, client))
    }

    pub fn new_for_config_and_client(config: Config, client: Client) -> Self {
        let constructor = Constructor::new(|_: &Config, client: Client| Ok(DynamicClient { client }));
        Self {
            cache: ClientCache::new(config, client, constructor),
        }
    }

    /// Dynamic client scoped to `cluster`. [`Name::wildcard`] yields a
    /// cross-cluster client.
    pub fn cluster(&self, cluster: &Name) -> DynamicClient {
        self.cache.cluster_or_die(cluster)
    }
}

#[derive(Clone)]
pub struct DynamicClient {
    client: Client,
}

impl DynamicClient {
    /// Cluster-scoped resources, or namespaced ones across all namespaces
    pub fn resource(&self, resource: &ApiResource) -> Api<DynamicObject> {
        Api::all_with(self.client.clone(), resource)
    }

    pub fn namespaced_resource(&self, resource: &ApiResource, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, resource)
    }
}
