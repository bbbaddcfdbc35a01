// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster-aware transport.
//!
//! Rewrites every outbound request so that it targets the logical cluster bound
//! to it via [`crate::client::context`].

use crate::client::context::cluster_from;
use crate::constants::CLUSTER_HEADER;
use crate::error::Error;
use crate::types::Name;
use futures::future::BoxFuture;
use http::{HeaderValue, Request, Uri};
use std::task::{Context, Poll};
use tower::{BoxError, Layer, Service};
use tracing::{debug, trace};

/// How the cluster is conveyed to the server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClusterRouting {
    /// Prefix the request path with `/clusters/<cluster>`
    #[default]
    Path,
    /// Set the `X-Kubernetes-Cluster` header and leave the path alone
    Header,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ClusterLayer {
    routing: ClusterRouting,
}

impl ClusterLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header() -> Self {
        Self {
            routing: ClusterRouting::Header,
        }
    }

    pub fn routing(&self) -> ClusterRouting {
        self.routing
    }
}

impl<S> Layer<S> for ClusterLayer {
    type Service = ClusterService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ClusterService {
            inner,
            routing: self.routing,
        }
    }
}

/// Cluster-aware wrapper around an HTTP service.
#[derive(Clone, Debug)]
pub struct ClusterService<S> {
    inner: S,
    routing: ClusterRouting,
}

impl<S> ClusterService<S> {
    pub fn new(inner: S) -> Self {
        ClusterLayer::new().layer(inner)
    }

    fn scope<B>(&self, req: Request<B>) -> Result<Request<B>, Error> {
        let Some(cluster) = cluster_from(&req).cloned() else {
            debug!(uri = %req.uri(), "Refusing request without a cluster binding");
            return Err(Error::MissingCluster);
        };

        let (mut parts, body) = req.into_parts();
        match self.routing {
            ClusterRouting::Path => {
                parts.uri = rewrite_uri(&parts.uri, &cluster)?;
                trace!(cluster = %cluster, uri = %parts.uri, "Rewrote request path");
            }
            ClusterRouting::Header => {
                let value = HeaderValue::from_str(cluster.as_str()).map_err(|e| {
                    Error::InvalidRequest(format!("cluster {} is not a valid header value: {}", cluster, e))
                })?;
                parts.headers.insert(CLUSTER_HEADER, value);
            }
        }
        Ok(Request::from_parts(parts, body))
    }
}

impl<S, B> Service<Request<B>> for ClusterService<S>
where
    S: Service<Request<B>>,
    S::Response: Send + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<S::Response, BoxError>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let req = match self.scope(req) {
            Ok(req) => req,
            Err(e) => return Box::pin(futures::future::ready(Err(e.into()))),
        };
        let fut = self.inner.call(req);
        Box::pin(async move { fut.await.map_err(Into::into) })
    }
}

fn rewrite_uri(uri: &Uri, cluster: &Name) -> Result<Uri, Error> {
    let path = generate_path(uri.path(), cluster);
    let path_and_query = match uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path,
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(
        path_and_query
            .parse()
            .map_err(|e| Error::InvalidRequest(format!("invalid path {}: {}", path_and_query, e)))?,
    );
    Uri::from_parts(parts).map_err(|e| Error::InvalidRequest(format!("invalid uri: {}", e)))
}

const API_SEGMENTS: [&str; 2] = ["/api/", "/apis/"];

/// Formats `original_path` to target `cluster`.
///
/// `/api/` and `/apis/` may sit anywhere in the path (proxies, aggregated
/// APIs), so every occurrence gets the cluster path inserted in front of it.
/// Paths without either are prefixed as a whole.
pub fn generate_path(original_path: &str, cluster: &Name) -> String {
    let cluster_path = cluster.path();

    if find_api_segment(original_path).is_some() {
        let mut path = String::with_capacity(original_path.len() + cluster_path.len());
        let mut rest = original_path;
        while let Some((idx, segment)) = find_api_segment(rest) {
            path.push_str(&rest[..idx]);
            path.push_str(&cluster_path);
            path.push_str(segment);
            rest = &rest[idx + segment.len()..];
        }
        path.push_str(rest);
        return path;
    }

    let mut path = cluster_path;
    // relative paths need a separator
    if !original_path.is_empty() && !original_path.starts_with('/') {
        path.push('/');
    }
    path.push_str(original_path);
    path
}

/// Leftmost occurrence of an API segment.
fn find_api_segment(path: &str) -> Option<(usize, &'static str)> {
    API_SEGMENTS
        .iter()
        .filter_map(|segment| path.find(segment).map(|idx| (idx, *segment)))
        .min_by_key(|(idx, _)| *idx)
}
