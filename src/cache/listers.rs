// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Listers reading cluster-aware indexers.
//!
//! Lookups use the same key encoding the index functions produce.

use crate::cache::indexer::Indexer;
use crate::cache::keyfunc::MetaAccessor;
use crate::constants::indexes;
use crate::error::{Error, Result};
use crate::types::{Key, Name};
use kube::core::{Selector, SelectorExt};
use std::sync::Arc;

fn select<K: MetaAccessor>(objects: Vec<Arc<K>>, selector: &Selector) -> Vec<Arc<K>> {
    if selector.selects_all() {
        return objects;
    }
    objects
        .into_iter()
        .filter(|obj| {
            (**obj)
                .meta_accessor()
                .map(|meta| selector.matches(&meta.labels))
                .unwrap_or(false)
        })
        .collect()
}

/// Lists objects across all logical clusters.
pub struct ClusterLister<K> {
    indexer: Arc<Indexer<K>>,
    resource: String,
}

impl<K> Clone for ClusterLister<K> {
    fn clone(&self) -> Self {
        Self {
            indexer: self.indexer.clone(),
            resource: self.resource.clone(),
        }
    }
}

impl<K: MetaAccessor> ClusterLister<K> {
    /// `resource` names the kind in not-found errors, e.g. `configmaps`.
    pub fn new(indexer: Arc<Indexer<K>>, resource: impl Into<String>) -> Self {
        Self {
            indexer,
            resource: resource.into(),
        }
    }

    pub fn list(&self, selector: &Selector) -> Vec<Arc<K>> {
        select(self.indexer.list(), selector)
    }

    /// Lister restricted to one logical cluster.
    pub fn cluster(&self, cluster: &Name) -> Lister<K> {
        Lister {
            indexer: self.indexer.clone(),
            resource: self.resource.clone(),
            cluster: cluster.clone(),
        }
    }
}

/// Lists objects of one logical cluster.
pub struct Lister<K> {
    indexer: Arc<Indexer<K>>,
    resource: String,
    cluster: Name,
}

impl<K: MetaAccessor> Lister<K> {
    pub fn list(&self, selector: &Selector) -> Result<Vec<Arc<K>>> {
        let value = Key::new(self.cluster.clone(), "", "").to_string();
        Ok(select(self.indexer.by_index(indexes::CLUSTER, &value)?, selector))
    }

    /// Cluster-scoped object by name.
    pub fn get(&self, name: &str) -> Result<Arc<K>> {
        get(&self.indexer, &self.resource, Key::new(self.cluster.clone(), "", name))
    }

    pub fn namespace(&self, namespace: &str) -> NamespaceLister<K> {
        NamespaceLister {
            indexer: self.indexer.clone(),
            resource: self.resource.clone(),
            cluster: self.cluster.clone(),
            namespace: namespace.to_string(),
        }
    }
}

/// Lists objects of one namespace in one logical cluster.
pub struct NamespaceLister<K> {
    indexer: Arc<Indexer<K>>,
    resource: String,
    cluster: Name,
    namespace: String,
}

impl<K: MetaAccessor> NamespaceLister<K> {
    pub fn list(&self, selector: &Selector) -> Result<Vec<Arc<K>>> {
        let value = Key::new(self.cluster.clone(), self.namespace.clone(), "").to_string();
        Ok(select(
            self.indexer.by_index(indexes::CLUSTER_AND_NAMESPACE, &value)?,
            selector,
        ))
    }

    pub fn get(&self, name: &str) -> Result<Arc<K>> {
        let key = Key::new(self.cluster.clone(), self.namespace.clone(), name);
        get(&self.indexer, &self.resource, key)
    }
}

fn get<K>(indexer: &Indexer<K>, resource: &str, key: Key) -> Result<Arc<K>> {
    indexer.get_by_key(&key.to_string()).ok_or_else(|| Error::NotFound {
        resource: resource.to_string(),
        name: key.name,
    })
}
