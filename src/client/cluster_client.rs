// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Unscoped cluster client and per-resource scopers.

use crate::client::constructor::{Cache, ClientCache, Constructor};
use crate::constants::ROOT_CLUSTER;
use crate::error::Result;
use crate::types::Name;
use k8s_openapi::NamespaceResourceScope;
use kube::{Api, Client, Config, Resource};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{info, instrument};

/// Client that is not bound to any logical cluster yet.
///
/// Scope it with [`KubeClusterClient::cluster`], or keep a strongly typed but
/// unscoped handle for one resource kind with [`KubeClusterClient::resource`].
#[derive(Clone)]
pub struct KubeClusterClient {
    cache: Arc<ClientCache<Client>>,
}

impl KubeClusterClient {
    /// Create a cluster client for the given config, building the shared
    /// HTTP client from it.
    pub fn new_for_config(config: Config) -> Result<Self> {
        let client = Client::try_from(config.clone())?;
        Self::new_for_config_and_client(config, client)
    }

    /// Create a cluster client for the given config and HTTP client. The
    /// client takes precedence over the transport settings of `config`.
    #[instrument(skip(config, client), fields(cluster_url = %config.cluster_url))]
    pub fn new_for_config_and_client(config: Config, client: Client) -> Result<Self> {
        let cache = ClientCache::new(config, client, Constructor::new(|_: &Config, client: Client| Ok(client)));
        // surface configuration errors here rather than on first use
        cache.cluster(&Name::new(ROOT_CLUSTER))?;
        info!("Cluster client ready");

        Ok(Self {
            cache: Arc::new(cache),
        })
    }

    /// Client whose requests all target `name`.
    ///
    /// # Panics
    ///
    /// Panics if scoping fails, which the construction-time validation rules out
    /// for well-formed cluster names.
    pub fn cluster(&self, name: &Name) -> Client {
        self.cache.cluster_or_die(name)
    }

    /// Error-returning form of [`KubeClusterClient::cluster`].
    pub fn try_cluster(&self, name: &Name) -> Result<Client> {
        self.cache.cluster(name)
    }

    /// Strongly typed, not yet scoped client for resources of kind `K`.
    pub fn resource<K: Resource>(&self) -> ResourceClusterClient<K> {
        ResourceClusterClient {
            cache: self.cache.clone(),
            _resource: PhantomData,
        }
    }
}

pub struct ResourceClusterClient<K> {
    cache: Arc<ClientCache<Client>>,
    _resource: PhantomData<fn() -> K>,
}

impl<K> Clone for ResourceClusterClient<K> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            _resource: PhantomData,
        }
    }
}

impl<K: Resource> ResourceClusterClient<K> {
    pub fn cluster(&self, name: &Name) -> ClusterResource<K> {
        ClusterResource {
            client: self.cache.cluster_or_die(name),
            _resource: PhantomData,
        }
    }
}

/// Resource client bound to one logical cluster.
pub struct ClusterResource<K> {
    client: Client,
    _resource: PhantomData<fn() -> K>,
}

impl<K> ClusterResource<K>
where
    K: Resource,
    K::DynamicType: Default,
{
    /// Cluster-scoped resources, or namespaced ones across all namespaces
    pub fn all(&self) -> Api<K> {
        Api::all(self.client.clone())
    }

    pub fn namespaced(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    pub fn default_namespaced(&self) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
    {
        Api::default_namespaced(self.client.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{role_json, test_config, MockService};
    use k8s_openapi::api::rbac::v1::{ClusterRole, Role};

    fn cluster_role_json(name: &str) -> String {
        serde_json::json!({
            "apiVersion": "rbac.authorization.k8s.io/v1",
            "kind": "ClusterRole",
            "metadata": { "name": name }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_construction_validates_root_cluster() {
        let client =
            KubeClusterClient::new_for_config_and_client(test_config(), MockService::new().into_client())
                .unwrap();
        assert_eq!(client.cache.len(), 1);
    }

    #[tokio::test]
    async fn test_scoped_group_client() {
        let mock = MockService::new().on_get(
            "/clusters/legacy/apis/rbac.authorization.k8s.io/v1/namespaces/default/roles/system",
            200,
            &role_json("default", "system", "legacy"),
        );
        let unscoped = KubeClusterClient::new_for_config_and_client(test_config(), mock.clone().into_client())
            .unwrap();

        let roles: Api<Role> = Api::namespaced(unscoped.cluster(&Name::new("legacy")), "default");
        let role = roles.get("system").await.unwrap();
        assert_eq!(role.metadata.name.as_deref(), Some("system"));
    }

    #[tokio::test]
    async fn test_deferred_scoping_per_resource() {
        let mock = MockService::new()
            .on_get(
                "/clusters/whoa/apis/rbac.authorization.k8s.io/v1/clusterroles/foo",
                200,
                &cluster_role_json("foo"),
            )
            .on_get(
                "/clusters/dang/apis/rbac.authorization.k8s.io/v1/namespaces/default/roles/bar",
                200,
                &role_json("default", "bar", "dang"),
            );
        let unscoped = KubeClusterClient::new_for_config_and_client(test_config(), mock.clone().into_client())
            .unwrap();

        let cluster_roles = unscoped.resource::<ClusterRole>();
        let roles = unscoped.resource::<Role>();

        let foo = cluster_roles.cluster(&Name::new("whoa")).all().get("foo").await.unwrap();
        assert_eq!(foo.metadata.name.as_deref(), Some("foo"));

        let bar = roles
            .cluster(&Name::new("dang"))
            .namespaced("default")
            .get("bar")
            .await
            .unwrap();
        assert_eq!(Name::from_meta(&bar.metadata), Name::new("dang"));
    }

    #[tokio::test]
    async fn test_unknown_object_surfaces_api_not_found() {
        let unscoped =
            KubeClusterClient::new_for_config_and_client(test_config(), MockService::new().into_client())
                .unwrap();
        let roles = unscoped.resource::<Role>().cluster(&Name::new("c1")).default_namespaced();

        let err = crate::error::Error::from(roles.get("missing").await.unwrap_err());
        assert!(err.is_not_found());
    }
}
