// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Thread-safe object store with secondary indices.

use crate::cache::keyfunc::{cluster_aware_indexers, meta_cluster_namespace_key_func, MetaAccessor};
use crate::error::{Error, Result};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Computes the storage key of an object.
pub type KeyFunc<K> = Arc<dyn Fn(&K) -> Result<String> + Send + Sync>;

/// Computes the values an object is indexed under.
pub type IndexFunc<K> = Arc<dyn Fn(&K) -> Result<Vec<String>> + Send + Sync>;

/// Index functions by index name.
pub type Indexers<K> = HashMap<String, IndexFunc<K>>;

/// index value -> keys of the objects indexed under it
type Index = HashMap<String, HashSet<String>>;

struct Store<K> {
    items: HashMap<String, Arc<K>>,
    indexers: Indexers<K>,
    indices: HashMap<String, Index>,
}

pub struct Indexer<K> {
    key_func: KeyFunc<K>,
    store: RwLock<Store<K>>,
}

impl<K: MetaAccessor + 'static> Indexer<K> {
    /// Store keyed by cluster, namespace and name, with the cluster and
    /// cluster+namespace indices listers rely on.
    pub fn cluster_aware() -> Self {
        let indexers: Indexers<K> = cluster_aware_indexers();
        let indices = indexers.keys().map(|name| (name.clone(), Index::new())).collect();
        Self {
            key_func: Arc::new(|obj: &K| meta_cluster_namespace_key_func(obj)),
            store: RwLock::new(Store {
                items: HashMap::new(),
                indexers,
                indices,
            }),
        }
    }
}

impl<K> Indexer<K> {
    pub fn new(key_func: KeyFunc<K>) -> Self {
        Self {
            key_func,
            store: RwLock::new(Store {
                items: HashMap::new(),
                indexers: HashMap::new(),
                indices: HashMap::new(),
            }),
        }
    }

    pub fn key_of(&self, obj: &K) -> Result<String> {
        (self.key_func)(obj)
    }

    /// Inserts or replaces an object, returning the previous one under the
    /// same key.
    pub fn add(&self, obj: impl Into<Arc<K>>) -> Result<Option<Arc<K>>> {
        let obj = obj.into();
        let key = self.key_of(&obj)?;
        let mut store = self.store.write();
        let old = store.items.get(&key).cloned();
        store.update_indices(old.as_deref(), Some(&*obj), &key)?;
        store.items.insert(key, obj);
        Ok(old)
    }

    pub fn update(&self, obj: impl Into<Arc<K>>) -> Result<Option<Arc<K>>> {
        self.add(obj)
    }

    pub fn delete(&self, obj: &K) -> Result<Option<Arc<K>>> {
        let key = self.key_of(obj)?;
        self.delete_by_key(&key)
    }

    pub fn delete_by_key(&self, key: &str) -> Result<Option<Arc<K>>> {
        let mut store = self.store.write();
        let Some(old) = store.items.get(key).cloned() else {
            return Ok(None);
        };
        store.update_indices(Some(&*old), None, key)?;
        store.items.remove(key);
        Ok(Some(old))
    }

    /// Replaces the whole contents, rebuilding every index. Returns the
    /// previous contents by key.
    pub fn replace(&self, items: Vec<Arc<K>>) -> Result<HashMap<String, Arc<K>>> {
        let keyed = items
            .into_iter()
            .map(|obj| Ok((self.key_of(&obj)?, obj)))
            .collect::<Result<HashMap<_, _>>>()?;

        let mut store = self.store.write();
        let mut indices: HashMap<String, Index> =
            store.indexers.keys().map(|name| (name.clone(), Index::new())).collect();
        for (key, obj) in &keyed {
            for (name, index_func) in &store.indexers {
                let index = indices.entry(name.clone()).or_default();
                for value in index_func(&**obj)? {
                    index.entry(value).or_default().insert(key.clone());
                }
            }
        }

        store.indices = indices;
        Ok(std::mem::replace(&mut store.items, keyed))
    }

    pub fn get(&self, obj: &K) -> Result<Option<Arc<K>>> {
        let key = self.key_of(obj)?;
        Ok(self.get_by_key(&key))
    }

    pub fn get_by_key(&self, key: &str) -> Option<Arc<K>> {
        self.store.read().items.get(key).cloned()
    }

    pub fn list(&self) -> Vec<Arc<K>> {
        self.store.read().items.values().cloned().collect()
    }

    pub fn list_keys(&self) -> Vec<String> {
        self.store.read().items.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.store.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Objects sharing any index value with `obj` under `index_name`.
    pub fn index(&self, index_name: &str, obj: &K) -> Result<Vec<Arc<K>>> {
        let store = self.store.read();
        let index_func = store
            .indexers
            .get(index_name)
            .ok_or_else(|| Error::UnknownIndex(index_name.to_string()))?;
        let index = store.index(index_name)?;

        let mut keys = HashSet::new();
        for value in index_func(obj)? {
            if let Some(set) = index.get(&value) {
                keys.extend(set.iter());
            }
        }
        Ok(keys.into_iter().filter_map(|key| store.items.get(key).cloned()).collect())
    }

    pub fn by_index(&self, index_name: &str, value: &str) -> Result<Vec<Arc<K>>> {
        let store = self.store.read();
        let keys = store.index(index_name)?.get(value);
        Ok(keys
            .into_iter()
            .flatten()
            .filter_map(|key| store.items.get(key).cloned())
            .collect())
    }

    pub fn index_keys(&self, index_name: &str, value: &str) -> Result<Vec<String>> {
        let store = self.store.read();
        let keys = store.index(index_name)?.get(value);
        Ok(keys.into_iter().flatten().cloned().collect())
    }

    /// Every value currently present in the named index.
    pub fn list_index_func_values(&self, index_name: &str) -> Vec<String> {
        self.store
            .read()
            .indices
            .get(index_name)
            .map(|index| index.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Registers more index functions and indexes the existing objects with
    /// them. Fails without changes if any name is already registered.
    pub fn add_indexers(&self, new_indexers: Indexers<K>) -> Result<()> {
        let mut store = self.store.write();
        if let Some(name) = new_indexers.keys().find(|name| store.indexers.contains_key(*name)) {
            return Err(Error::IndexerConflict(name.clone()));
        }

        let mut built = HashMap::new();
        for (name, index_func) in &new_indexers {
            let mut index = Index::new();
            for (key, obj) in &store.items {
                for value in index_func(&**obj)? {
                    index.entry(value).or_default().insert(key.clone());
                }
            }
            built.insert(name.clone(), index);
        }

        store.indices.extend(built);
        store.indexers.extend(new_indexers);
        Ok(())
    }

    pub fn has_indexer(&self, name: &str) -> bool {
        self.store.read().indexers.contains_key(name)
    }

    pub fn indexer_names(&self) -> Vec<String> {
        self.store.read().indexers.keys().cloned().collect()
    }
}

impl<K> Store<K> {
    fn index(&self, index_name: &str) -> Result<&Index> {
        self.indices
            .get(index_name)
            .ok_or_else(|| Error::UnknownIndex(index_name.to_string()))
    }

    /// Moves `key` from the index values of `old` to those of `new`. All index
    /// functions run before any index is touched, so a failure leaves the
    /// indices as they were.
    fn update_indices(&mut self, old: Option<&K>, new: Option<&K>, key: &str) -> Result<()> {
        let mut changes = Vec::with_capacity(self.indexers.len());
        for (name, index_func) in &self.indexers {
            let old_values = old.map(|obj| index_func(obj)).transpose()?.unwrap_or_default();
            let new_values = new.map(|obj| index_func(obj)).transpose()?.unwrap_or_default();
            changes.push((name.clone(), old_values, new_values));
        }

        for (name, old_values, new_values) in changes {
            let index = self.indices.entry(name).or_default();
            for value in old_values {
                if let Some(set) = index.get_mut(&value) {
                    set.remove(key);
                    if set.is_empty() {
                        index.remove(&value);
                    }
                }
            }
            for value in new_values {
                index.entry(value).or_default().insert(key.to_string());
            }
        }
        Ok(())
    }
}
