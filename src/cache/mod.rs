// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster-aware caching: keys, indexers, listers and informers.

mod handler;
mod indexer;
mod informer;
mod keyfunc;
mod listers;

pub use handler::{
    with_cancellation, CancellableResourceEventHandler, DeletedObject, ResourceEventHandler,
    ResourceEventHandlerFuncs, ScopedHandler,
};
pub use indexer::{IndexFunc, Indexer, Indexers, KeyFunc};
pub use informer::{ClusterScopedInformer, SharedIndexInformer};
pub use keyfunc::{
    add_by_logical_cluster_indexer, cluster_and_namespace_index_func, cluster_aware_indexers,
    cluster_index_func, deletion_handling_meta_cluster_namespace_key_func, index_by_logical_cluster,
    meta_cluster_namespace_key_func, obj_meta_cluster_namespace_key, CacheItem, DeletedFinalStateUnknown,
    MetaAccessor, MetaView, Unstructured,
};
pub use listers::{ClusterLister, Lister, NamespaceLister};
