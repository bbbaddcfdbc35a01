// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-cluster client cache.
//!
//! A [`ClientCache`] memoizes typed clients by logical cluster. Every client is
//! built from a copy of one base configuration and shares one HTTP client; the
//! cluster is bound at the transport level, see [`set_cluster`].

use crate::client::context::WithClusterLayer;
use crate::client::round_tripper::ClusterLayer;
use crate::error::{Error, Result};
use crate::types::Name;
use futures::future::BoxFuture;
use http::{Request, Response};
use kube::client::Body;
use kube::{Client, Config};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{BoxError, Service, ServiceBuilder};
use tracing::debug;

type NewForConfigAndClient<R> = dyn Fn(&Config, Client) -> std::result::Result<R, BoxError> + Send + Sync;

/// Describes how to build a typed client `R` from a configuration and an HTTP client.
pub struct Constructor<R> {
    new_for_config_and_client: Arc<NewForConfigAndClient<R>>,
}

impl<R> Constructor<R> {
    pub fn new<F>(new_for_config_and_client: F) -> Self
    where
        F: Fn(&Config, Client) -> std::result::Result<R, BoxError> + Send + Sync + 'static,
    {
        Self {
            new_for_config_and_client: Arc::new(new_for_config_and_client),
        }
    }

    pub fn construct(&self, config: &Config, client: Client) -> std::result::Result<R, BoxError> {
        (self.new_for_config_and_client)(config, client)
    }
}

impl<R> Clone for Constructor<R> {
    fn clone(&self) -> Self {
        Self {
            new_for_config_and_client: Arc::clone(&self.new_for_config_and_client),
        }
    }
}

/// Hands out cluster-scoped clients.
pub trait Cache<R> {
    fn cluster(&self, name: &Name) -> Result<R>;

    /// Like [`Cache::cluster`], for callers that already validated the
    /// configuration.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be constructed.
    fn cluster_or_die(&self, name: &Name) -> R {
        match self.cluster(name) {
            Ok(client) => client,
            Err(e) => panic!("failed to construct client for cluster {:?}: {}", name.as_str(), e),
        }
    }
}

/// Holds the client of one cluster once it has been constructed. Locked
/// while that client is being built.
type Slot<R> = Arc<Mutex<Option<R>>>;

pub struct ClientCache<R> {
    config: Config,
    client: Client,
    constructor: Constructor<R>,
    clients_by_cluster: RwLock<HashMap<Name, Slot<R>>>,
}

impl<R: Clone> ClientCache<R> {
    pub fn new(config: Config, client: Client, constructor: Constructor<R>) -> Self {
        Self {
            config,
            client,
            constructor,
            clients_by_cluster: RwLock::new(HashMap::new()),
        }
    }

    /// Base configuration every scoped client is built from
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of constructed clients. Waits for constructions in progress.
    pub fn len(&self) -> usize {
        self.slots().iter().filter(|slot| slot.lock().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slots(&self) -> Vec<Slot<R>> {
        self.clients_by_cluster.read().values().cloned().collect()
    }

    fn slot(&self, name: &Name) -> Slot<R> {
        if let Some(slot) = self.clients_by_cluster.read().get(name) {
            return slot.clone();
        }
        self.clients_by_cluster.write().entry(name.clone()).or_default().clone()
    }
}

impl<R: Clone> Cache<R> for ClientCache<R> {
    /// Must be called within a tokio runtime: scoped clients spawn their
    /// request buffer on construction.
    ///
    /// Callers racing for one name construct it once. Other names stay
    /// available meanwhile.
    fn cluster(&self, name: &Name) -> Result<R> {
        let slot = self.slot(name);
        let mut installed = slot.lock();
        if let Some(cached) = installed.as_ref() {
            return Ok(cached.clone());
        }

        debug!(cluster = %name, "Constructing cluster-scoped client");
        let config = self.config.clone();
        let client = set_cluster(&self.client, &config, name);
        let instance = self
            .constructor
            .construct(&config, client)
            .map_err(Error::Constructor)?;

        *installed = Some(instance.clone());
        Ok(instance)
    }
}

/// Binds `cluster` to a client sharing the connection pool, authentication
/// and base URL of `client`.
///
/// Requests made through the returned client carry the cluster in their
/// extensions and are rewritten by [`ClusterLayer`] before they reach `client`.
pub fn set_cluster(client: &Client, config: &Config, cluster: &Name) -> Client {
    let service = ServiceBuilder::new()
        .layer(WithClusterLayer::new(cluster.clone()))
        .layer(ClusterLayer::new())
        .service(SharedClient::new(client.clone()));
    Client::new(service, config.default_namespace.clone())
}

/// Exposes a [`kube::Client`] as the downstream service of a middleware stack.
#[derive(Clone)]
pub struct SharedClient {
    client: Client,
}

impl SharedClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Service<Request<Body>> for SharedClient {
    type Response = Response<Body>;
    type Error = kube::Error;
    type Future = BoxFuture<'static, std::result::Result<Response<Body>, kube::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let client = self.client.clone();
        Box::pin(async move { client.send(req).await })
    }
}
