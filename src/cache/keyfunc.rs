// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Key and index functions for cluster-aware caches.

use crate::cache::indexer::{IndexFunc, Indexer, Indexers};
use crate::constants::{annotations, indexes};
use crate::error::{Error, Result};
use crate::types::{parse_key, Key, Name};
use kube::Resource;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The metadata coordinates caches key and index objects by.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetaView {
    pub cluster: Name,
    pub namespace: String,
    pub name: String,
    pub labels: BTreeMap<String, String>,
}

/// Access to the metadata of a cached object.
pub trait MetaAccessor {
    fn meta_accessor(&self) -> Result<MetaView>;
}

impl<K: Resource> MetaAccessor for K {
    fn meta_accessor(&self) -> Result<MetaView> {
        let meta = self.meta();
        Ok(MetaView {
            cluster: Name::from_meta(meta),
            namespace: meta.namespace.clone().unwrap_or_default(),
            name: meta.name.clone().unwrap_or_default(),
            labels: meta.labels.clone().unwrap_or_default(),
        })
    }
}

/// An untyped object, as decoded from arbitrary JSON.
#[derive(Clone, Debug, PartialEq)]
pub struct Unstructured(pub Value);

impl MetaAccessor for Unstructured {
    fn meta_accessor(&self) -> Result<MetaView> {
        let Some(meta) = self.0.get("metadata").and_then(Value::as_object) else {
            return Err(Error::MissingMetadata(format!(
                "expected metadata object on Unstructured, found {}",
                json_type(self.0.get("metadata"))
            )));
        };

        let str_field = |field: &str| meta.get(field).and_then(Value::as_str).unwrap_or_default().to_string();
        let string_map = |field: &str| -> BTreeMap<String, String> {
            meta.get(field)
                .and_then(Value::as_object)
                .map(|m| {
                    m.iter()
                        .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                        .collect()
                })
                .unwrap_or_default()
        };

        let cluster = string_map("annotations")
            .remove(annotations::CLUSTER)
            .map(Name::from)
            .unwrap_or_default();

        Ok(MetaView {
            cluster,
            namespace: str_field("namespace"),
            name: str_field("name"),
            labels: string_map("labels"),
        })
    }
}

fn json_type(value: Option<&Value>) -> &'static str {
    match value {
        None => "nothing",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "bool",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

/// Last known state of an object whose deletion was observed only through a
/// relist. The key is the one the object was stored under.
#[derive(Debug)]
pub struct DeletedFinalStateUnknown<K> {
    pub key: String,
    pub obj: Arc<K>,
}

impl<K> Clone for DeletedFinalStateUnknown<K> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            obj: self.obj.clone(),
        }
    }
}

/// Anything a cache may be asked to key.
pub enum CacheItem<'a, K> {
    Object(&'a K),
    /// A key that was enqueued instead of an object
    ExplicitKey(&'a str),
    Tombstone(&'a DeletedFinalStateUnknown<K>),
}

/// Structured key of an object. Putting these in queues instead of strings
/// means no parsing errors are possible downstream.
pub fn obj_meta_cluster_namespace_key<K: MetaAccessor + ?Sized>(obj: &K) -> Result<Key> {
    let meta = obj.meta_accessor()?;
    Ok(Key::new(meta.cluster, meta.namespace, meta.name))
}

/// Key of an object: `<cluster>|<namespace>/<name>`, `<cluster>|<name>` for
/// cluster-scoped objects, and just `<name>` outside a multi-cluster context.
pub fn meta_cluster_namespace_key_func<K: MetaAccessor + ?Sized>(obj: &K) -> Result<String> {
    obj_meta_cluster_namespace_key(obj).map(|key| key.to_string())
}

/// Key function that passes tombstone keys through verbatim.
pub fn deletion_handling_meta_cluster_namespace_key_func<K: MetaAccessor>(item: &CacheItem<'_, K>) -> Result<String> {
    match item {
        CacheItem::Tombstone(deleted) => Ok(deleted.key.clone()),
        CacheItem::ExplicitKey(key) => parse_key(key).map(|key| key.to_string()),
        CacheItem::Object(obj) => meta_cluster_namespace_key_func(*obj),
    }
}

/// Indexes by cluster.
pub fn cluster_index_func<K: MetaAccessor + ?Sized>(obj: &K) -> Result<Vec<String>> {
    let meta = obj.meta_accessor()?;
    Ok(vec![Key::new(meta.cluster, "", "").to_string()])
}

/// Indexes by cluster and namespace.
pub fn cluster_and_namespace_index_func<K: MetaAccessor + ?Sized>(obj: &K) -> Result<Vec<String>> {
    let meta = obj.meta_accessor()?;
    Ok(vec![Key::new(meta.cluster, meta.namespace, "").to_string()])
}

/// Indexes by the bare logical cluster name.
pub fn index_by_logical_cluster<K: MetaAccessor + ?Sized>(obj: &K) -> Result<Vec<String>> {
    let meta = obj.meta_accessor()?;
    Ok(vec![meta.cluster.into_string()])
}

/// The cluster and cluster+namespace indexers listers rely on.
pub fn cluster_aware_indexers<K: MetaAccessor + 'static>() -> Indexers<K> {
    Indexers::from([
        (
            indexes::CLUSTER.to_string(),
            Arc::new(|obj: &K| cluster_index_func(obj)) as IndexFunc<K>,
        ),
        (
            indexes::CLUSTER_AND_NAMESPACE.to_string(),
            Arc::new(|obj: &K| cluster_and_namespace_index_func(obj)) as IndexFunc<K>,
        ),
    ])
}

/// Registers [`index_by_logical_cluster`] under
/// [`indexes::BY_LOGICAL_CLUSTER`]. A no-op when already registered, also
/// when another caller registers it concurrently.
pub fn add_by_logical_cluster_indexer<K: MetaAccessor + 'static>(indexer: &Indexer<K>) -> Result<()> {
    if indexer.has_indexer(indexes::BY_LOGICAL_CLUSTER) {
        return Ok(());
    }
    let added = indexer.add_indexers(Indexers::from([(
        indexes::BY_LOGICAL_CLUSTER.to_string(),
        Arc::new(|obj: &K| index_by_logical_cluster(obj)) as IndexFunc<K>,
    )]));
    match added {
        Err(Error::IndexerConflict(name)) if name == indexes::BY_LOGICAL_CLUSTER => Ok(()),
        other => other,
    }
}
