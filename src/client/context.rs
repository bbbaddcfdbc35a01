// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Logical cluster binding carried in request extensions.

use crate::types::Name;
use http::{Extensions, Request};
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Extension key. Private so that only this module can set or read it.
#[derive(Clone, Debug)]
struct ClusterBinding(Name);

/// Returns the request carrying `cluster`, replacing any previous binding.
pub fn with_cluster<B>(mut req: Request<B>, cluster: &Name) -> Request<B> {
    insert_cluster(req.extensions_mut(), cluster.clone());
    req
}

pub fn insert_cluster(extensions: &mut Extensions, cluster: Name) {
    extensions.insert(ClusterBinding(cluster));
}

/// Extracts the cluster name bound to a request.
pub fn cluster_from<B>(req: &Request<B>) -> Option<&Name> {
    cluster_from_extensions(req.extensions())
}

pub fn cluster_from_extensions(extensions: &Extensions) -> Option<&Name> {
    extensions.get::<ClusterBinding>().map(|b| &b.0)
}

/// Layer binding a fixed logical cluster to every request.
#[derive(Clone, Debug)]
pub struct WithClusterLayer {
    cluster: Name,
}

impl WithClusterLayer {
    pub fn new(cluster: Name) -> Self {
        Self { cluster }
    }
}

impl<S> Layer<S> for WithClusterLayer {
    type Service = WithCluster<S>;

    fn layer(&self, inner: S) -> Self::Service {
        WithCluster {
            inner,
            cluster: self.cluster.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct WithCluster<S> {
    inner: S,
    cluster: Name,
}

impl<S, B> Service<Request<B>> for WithCluster<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        self.inner.call(with_cluster(req, &self.cluster))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::{service_fn, ServiceExt};

    #[test]
    fn test_unbound_request_has_no_cluster() {
        let req = Request::new(());
        assert!(cluster_from(&req).is_none());
    }

    #[test]
    fn test_with_cluster() {
        let req = with_cluster(Request::new(()), &Name::new("root:org"));
        assert_eq!(cluster_from(&req), Some(&Name::new("root:org")));
    }

    #[test]
    fn test_last_writer_wins() {
        let req = with_cluster(Request::new(()), &Name::new("first"));
        let req = with_cluster(req, &Name::new("second"));
        assert_eq!(cluster_from(&req), Some(&Name::new("second")));
    }

    #[test]
    fn test_binding_is_invisible_to_other_extension_types() {
        let mut req = Request::new(());
        req.extensions_mut().insert(Name::new("forged"));
        assert!(cluster_from(&req).is_none());
    }

    #[tokio::test]
    async fn test_with_cluster_layer_binds_every_request() {
        let svc = WithClusterLayer::new(Name::new("c1")).layer(service_fn(
            |req: Request<()>| async move {
                Ok::<_, std::convert::Infallible>(cluster_from(&req).cloned())
            },
        ));

        let seen = svc.oneshot(Request::new(())).await.unwrap();
        assert_eq!(seen, Some(Name::new("c1")));
    }
}
