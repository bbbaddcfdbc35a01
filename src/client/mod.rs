// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster-aware clients: request binding, transport, per-cluster client cache
//! and the facades built on top of it.

pub mod cluster_client;
pub mod constructor;
pub mod context;
pub mod discovery;
pub mod dynamic;
pub mod round_tripper;

pub use cluster_client::{ClusterResource, KubeClusterClient, ResourceClusterClient};
pub use constructor::{set_cluster, Cache, ClientCache, Constructor, SharedClient};
pub use context::{cluster_from, cluster_from_extensions, insert_cluster, with_cluster, WithClusterLayer};
pub use discovery::{ClusterDiscoveryClient, DiscoveryClient};
pub use dynamic::{ClusterDynamicClient, DynamicClient};
pub use round_tripper::{generate_path, ClusterLayer, ClusterRouting, ClusterService};
