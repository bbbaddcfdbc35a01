// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Shared informer over a cross-cluster watch.
//!
//! One informer caches the objects of every logical cluster. Cluster-scoped
//! views filter notifications and lookups down to a single cluster.
//!
//! Store mutations and their notifications, handler registration with its
//! initial replay, and resyncs are serialized. No handler sees an object
//! announced twice. Handlers may call back into the informer from their
//! callbacks.

use crate::cache::handler::{CancellableResourceEventHandler, DeletedObject, ResourceEventHandler};
use crate::cache::indexer::Indexer;
use crate::cache::keyfunc::{DeletedFinalStateUnknown, MetaAccessor};
use crate::cache::listers::{ClusterLister, Lister};
use crate::error::Result;
use crate::types::Name;
use futures::future::BoxFuture;
use futures::{Stream, StreamExt};
use kube::{Api, Resource};
use kube_runtime::watcher::{self, watcher, Event};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

enum HandlerKind<K> {
    Plain(Box<dyn ResourceEventHandler<K>>),
    Cancellable(Box<dyn CancellableResourceEventHandler<K>>),
}

struct Resync {
    period: Duration,
    next: Mutex<Instant>,
}

struct Registration<K> {
    handler: HandlerKind<K>,
    resync: Option<Resync>,
}

impl<K> Registration<K> {
    fn new(handler: HandlerKind<K>, resync_period: Option<Duration>) -> Self {
        // a zero period disables resync
        let resync = resync_period.filter(|p| !p.is_zero()).map(|period| Resync {
            period,
            next: Mutex::new(Instant::now() + period),
        });
        Self { handler, resync }
    }

    fn is_done(&self) -> bool {
        match &self.handler {
            HandlerKind::Plain(_) => false,
            HandlerKind::Cancellable(h) => h.is_done(),
        }
    }

    fn resync_deadline(&self) -> Option<Instant> {
        self.resync.as_ref().map(|r| *r.next.lock())
    }

    /// True when a resync is due at `now`, scheduling the next one.
    fn take_resync(&self, now: Instant) -> bool {
        let Some(resync) = &self.resync else {
            return false;
        };
        let mut next = resync.next.lock();
        if *next > now {
            return false;
        }
        *next = now + resync.period;
        true
    }

    fn on_add(&self, obj: &K) {
        match &self.handler {
            HandlerKind::Plain(h) => h.on_add(obj),
            HandlerKind::Cancellable(h) => h.on_add(obj),
        }
    }

    fn on_update(&self, old: &K, new: &K) {
        match &self.handler {
            HandlerKind::Plain(h) => h.on_update(old, new),
            HandlerKind::Cancellable(h) => h.on_update(old, new),
        }
    }

    fn on_delete(&self, obj: &DeletedObject<K>) {
        match &self.handler {
            HandlerKind::Plain(h) => h.on_delete(obj),
            HandlerKind::Cancellable(h) => h.on_delete(obj),
        }
    }
}

pub struct SharedIndexInformer<K> {
    resource: String,
    indexer: Arc<Indexer<K>>,
    handlers: RwLock<Vec<Arc<Registration<K>>>>,
    /// Held while the store changes and handlers hear about it. Reentrant so
    /// that callbacks can register handlers.
    distribution: ReentrantMutex<()>,
    registered: Notify,
    relist: Mutex<Option<Vec<Arc<K>>>>,
    synced: AtomicBool,
}

impl<K: MetaAccessor + Send + Sync + 'static> SharedIndexInformer<K> {
    /// `resource` names the cached kind in logs and lister errors.
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            indexer: Arc::new(Indexer::cluster_aware()),
            handlers: RwLock::new(Vec::new()),
            distribution: ReentrantMutex::new(()),
            registered: Notify::new(),
            relist: Mutex::new(None),
            synced: AtomicBool::new(false),
        }
    }

    pub fn indexer(&self) -> &Arc<Indexer<K>> {
        &self.indexer
    }

    pub fn lister(&self) -> ClusterLister<K> {
        ClusterLister::new(self.indexer.clone(), self.resource.clone())
    }

    /// True once the first complete listing has been stored.
    pub fn has_synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }

    /// View of this informer restricted to one logical cluster.
    pub fn cluster(self: &Arc<Self>, cluster: &Name) -> ClusterScopedInformer<K> {
        ClusterScopedInformer {
            informer: self.clone(),
            cluster: cluster.clone(),
        }
    }

    /// Registers a handler. Objects already cached are delivered as adds.
    pub fn add_event_handler(&self, handler: impl ResourceEventHandler<K> + 'static) {
        self.register(HandlerKind::Plain(Box::new(handler)), None);
    }

    /// Like [`SharedIndexInformer::add_event_handler`], and every
    /// `resync_period` while the informer runs, each cached object is
    /// delivered again as an update from itself to itself.
    pub fn add_event_handler_with_resync_period(
        &self,
        handler: impl ResourceEventHandler<K> + 'static,
        resync_period: Duration,
    ) {
        self.register(HandlerKind::Plain(Box::new(handler)), Some(resync_period));
    }

    /// Registers a handler that is dropped once it reports done.
    pub fn add_cancellable_event_handler(&self, handler: impl CancellableResourceEventHandler<K> + 'static) {
        self.register(HandlerKind::Cancellable(Box::new(handler)), None);
    }

    pub fn add_cancellable_event_handler_with_resync_period(
        &self,
        handler: impl CancellableResourceEventHandler<K> + 'static,
        resync_period: Duration,
    ) {
        self.register(HandlerKind::Cancellable(Box::new(handler)), Some(resync_period));
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    fn register(&self, handler: HandlerKind<K>, resync_period: Option<Duration>) {
        let registration = Registration::new(handler, resync_period);
        let _distributing = self.distribution.lock();
        if registration.is_done() {
            return;
        }

        let registration = Arc::new(registration);
        self.handlers.write().push(registration.clone());
        for obj in self.indexer.list() {
            registration.on_add(&obj);
        }
        self.registered.notify_one();
    }

    /// Handlers to notify, after dropping those that are done.
    fn live_handlers(&self) -> Vec<Arc<Registration<K>>> {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|h| !h.is_done());
        if handlers.len() < before {
            debug!(resource = %self.resource, "Removed {} finished event handler(s)", before - handlers.len());
        }
        handlers.clone()
    }

    /// Applies one watch event to the cache and notifies handlers.
    pub fn handle_event(&self, event: Event<K>) -> Result<()> {
        match event {
            Event::Apply(obj) => self.apply(Arc::new(obj)),
            Event::Delete(obj) => self.delete(Arc::new(obj)),
            Event::Init => {
                *self.relist.lock() = Some(Vec::new());
                Ok(())
            }
            Event::InitApply(obj) => {
                self.relist.lock().get_or_insert_with(Vec::new).push(Arc::new(obj));
                Ok(())
            }
            Event::InitDone => {
                let items = self.relist.lock().take().unwrap_or_default();
                self.replace(items)
            }
        }
    }

    fn apply(&self, obj: Arc<K>) -> Result<()> {
        let _distributing = self.distribution.lock();
        let old = self.indexer.update(obj.clone())?;
        for handler in self.live_handlers() {
            match &old {
                Some(old) => handler.on_update(old, &obj),
                None => handler.on_add(&obj),
            }
        }
        Ok(())
    }

    fn delete(&self, obj: Arc<K>) -> Result<()> {
        let _distributing = self.distribution.lock();
        self.indexer.delete(&obj)?;
        let deleted = DeletedObject::Object(obj);
        for handler in self.live_handlers() {
            handler.on_delete(&deleted);
        }
        Ok(())
    }

    /// Stores a complete listing. Objects missing from it are announced as
    /// deletions of unknown final state.
    fn replace(&self, items: Vec<Arc<K>>) -> Result<()> {
        let _distributing = self.distribution.lock();
        let previous = self.indexer.replace(items.clone())?;
        let handlers = self.live_handlers();

        let mut seen = HashSet::with_capacity(items.len());
        for obj in &items {
            let key = self.indexer.key_of(obj)?;
            for handler in &handlers {
                match previous.get(&key) {
                    Some(old) => handler.on_update(old, obj),
                    None => handler.on_add(obj),
                }
            }
            seen.insert(key);
        }

        for (key, obj) in previous {
            if seen.contains(&key) {
                continue;
            }
            let deleted = DeletedObject::Unknown(DeletedFinalStateUnknown { key, obj });
            for handler in &handlers {
                handler.on_delete(&deleted);
            }
        }

        if !self.synced.swap(true, Ordering::SeqCst) {
            info!(resource = %self.resource, objects = items.len(), "Informer synced");
        }
        Ok(())
    }

    /// Earliest pending resync of a live handler.
    fn next_resync(&self) -> Option<Instant> {
        self.handlers
            .read()
            .iter()
            .filter(|h| !h.is_done())
            .filter_map(|h| h.resync_deadline())
            .min()
    }

    /// Redelivers every cached object to the handlers whose resync is due.
    fn resync(&self, now: Instant) {
        let _distributing = self.distribution.lock();
        let due: Vec<_> = self
            .live_handlers()
            .into_iter()
            .filter(|h| h.take_resync(now))
            .collect();
        if due.is_empty() {
            return;
        }

        let objects = self.indexer.list();
        debug!(resource = %self.resource, handlers = due.len(), objects = objects.len(), "Resyncing");
        for handler in &due {
            for obj in &objects {
                handler.on_update(obj, obj);
            }
        }
    }

    /// Consumes watch events until the stream ends, resyncing handlers that
    /// asked for it in between.
    pub async fn run<S>(&self, events: S)
    where
        S: Stream<Item = std::result::Result<Event<K>, watcher::Error>>,
    {
        futures::pin_mut!(events);
        loop {
            let next_resync = self.next_resync();
            tokio::select! {
                event = events.next() => match event {
                    Some(Ok(event)) => {
                        if let Err(e) = self.handle_event(event) {
                            warn!(resource = %self.resource, "Failed to handle watch event: {}", e);
                        }
                    }
                    Some(Err(e)) => warn!(resource = %self.resource, "Watcher error: {}", e),
                    None => break,
                },
                _ = resync_timer(next_resync) => self.resync(Instant::now()),
                // a new handler may resync sooner
                _ = self.registered.notified() => {}
            }
        }
        debug!(resource = %self.resource, "Watch stream ended");
    }

    /// Watches `api`, typically a wildcard-cluster client, until the watch
    /// ends.
    #[instrument(skip(self, api, config), fields(resource = %self.resource))]
    pub async fn watch(&self, api: Api<K>, config: watcher::Config)
    where
        K: Resource + Clone + DeserializeOwned + Debug,
    {
        info!("Starting informer");
        self.run(watcher(api, config)).await
    }
}

async fn resync_timer(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => futures::future::pending().await,
    }
}

/// An informer view for a single logical cluster.
pub struct ClusterScopedInformer<K> {
    informer: Arc<SharedIndexInformer<K>>,
    cluster: Name,
}

impl<K: MetaAccessor + Send + Sync + 'static> ClusterScopedInformer<K> {
    pub fn cluster(&self) -> &Name {
        &self.cluster
    }

    pub fn has_synced(&self) -> bool {
        self.informer.has_synced()
    }

    pub fn lister(&self) -> Lister<K> {
        self.informer.lister().cluster(&self.cluster)
    }

    pub fn add_event_handler<H>(&self, handler: H)
    where
        H: ResourceEventHandler<K> + 'static,
    {
        self.informer.add_event_handler(ClusterFilter {
            cluster: self.cluster.clone(),
            handler,
        });
    }

    pub fn add_cancellable_event_handler<H>(&self, handler: H)
    where
        H: CancellableResourceEventHandler<K> + 'static,
    {
        self.informer.add_cancellable_event_handler(ClusterFilter {
            cluster: self.cluster.clone(),
            handler,
        });
    }

    pub fn add_cancellable_event_handler_with_resync_period<H>(&self, handler: H, resync_period: Duration)
    where
        H: CancellableResourceEventHandler<K> + 'static,
    {
        let handler = ClusterFilter {
            cluster: self.cluster.clone(),
            handler,
        };
        self.informer
            .add_cancellable_event_handler_with_resync_period(handler, resync_period);
    }
}

/// Forwards only notifications about objects of one cluster.
struct ClusterFilter<H> {
    cluster: Name,
    handler: H,
}

impl<H> ClusterFilter<H> {
    fn admits<K: MetaAccessor>(&self, obj: &K) -> bool {
        obj.meta_accessor()
            .map(|meta| meta.cluster == self.cluster)
            .unwrap_or(false)
    }
}

impl<K: MetaAccessor, H: ResourceEventHandler<K>> ResourceEventHandler<K> for ClusterFilter<H> {
    fn on_add(&self, obj: &K) {
        if self.admits(obj) {
            self.handler.on_add(obj)
        }
    }

    fn on_update(&self, old: &K, new: &K) {
        if self.admits(new) {
            self.handler.on_update(old, new)
        }
    }

    fn on_delete(&self, obj: &DeletedObject<K>) {
        if self.admits(obj.object()) {
            self.handler.on_delete(obj)
        }
    }
}

impl<K: MetaAccessor, H: CancellableResourceEventHandler<K>> CancellableResourceEventHandler<K> for ClusterFilter<H> {
    fn done(&self) -> BoxFuture<'_, ()> {
        self.handler.done()
    }

    fn is_done(&self) -> bool {
        self.handler.is_done()
    }
}
