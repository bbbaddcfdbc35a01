// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resource event handlers, with an optional cancellation signal.

use crate::cache::keyfunc::DeletedFinalStateUnknown;
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What a delete notification carries: the object itself, or the last known
/// state when the deletion was only noticed on relist.
#[derive(Debug)]
pub enum DeletedObject<K> {
    Object(Arc<K>),
    Unknown(DeletedFinalStateUnknown<K>),
}

impl<K> DeletedObject<K> {
    pub fn object(&self) -> &K {
        match self {
            DeletedObject::Object(obj) => obj,
            DeletedObject::Unknown(deleted) => &deleted.obj,
        }
    }
}

/// Receives notifications about changes to cached objects.
pub trait ResourceEventHandler<K>: Send + Sync {
    fn on_add(&self, obj: &K);
    fn on_update(&self, old: &K, new: &K);
    fn on_delete(&self, obj: &DeletedObject<K>);
}

impl<K, H: ResourceEventHandler<K> + ?Sized> ResourceEventHandler<K> for Arc<H> {
    fn on_add(&self, obj: &K) {
        (**self).on_add(obj)
    }

    fn on_update(&self, old: &K, new: &K) {
        (**self).on_update(old, new)
    }

    fn on_delete(&self, obj: &DeletedObject<K>) {
        (**self).on_delete(obj)
    }
}

/// A handler that can signal it no longer wants notifications.
pub trait CancellableResourceEventHandler<K>: ResourceEventHandler<K> {
    /// Resolves once the handler is done.
    fn done(&self) -> BoxFuture<'_, ()>;

    fn is_done(&self) -> bool;
}

type AddFunc<K> = Box<dyn Fn(&K) + Send + Sync>;
type UpdateFunc<K> = Box<dyn Fn(&K, &K) + Send + Sync>;
type DeleteFunc<K> = Box<dyn Fn(&DeletedObject<K>) + Send + Sync>;

/// Handler assembled from optional closures. Missing ones ignore the event.
pub struct ResourceEventHandlerFuncs<K> {
    add: Option<AddFunc<K>>,
    update: Option<UpdateFunc<K>>,
    delete: Option<DeleteFunc<K>>,
}

impl<K> Default for ResourceEventHandlerFuncs<K> {
    fn default() -> Self {
        Self {
            add: None,
            update: None,
            delete: None,
        }
    }
}

impl<K> ResourceEventHandlerFuncs<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_add(mut self, f: impl Fn(&K) + Send + Sync + 'static) -> Self {
        self.add = Some(Box::new(f));
        self
    }

    pub fn with_update(mut self, f: impl Fn(&K, &K) + Send + Sync + 'static) -> Self {
        self.update = Some(Box::new(f));
        self
    }

    pub fn with_delete(mut self, f: impl Fn(&DeletedObject<K>) + Send + Sync + 'static) -> Self {
        self.delete = Some(Box::new(f));
        self
    }
}

impl<K> ResourceEventHandler<K> for ResourceEventHandlerFuncs<K> {
    fn on_add(&self, obj: &K) {
        if let Some(f) = &self.add {
            f(obj)
        }
    }

    fn on_update(&self, old: &K, new: &K) {
        if let Some(f) = &self.update {
            f(old, new)
        }
    }

    fn on_delete(&self, obj: &DeletedObject<K>) {
        if let Some(f) = &self.delete {
            f(obj)
        }
    }
}

/// Delegates to a handler until its token is cancelled.
pub struct ScopedHandler<H> {
    handler: H,
    token: CancellationToken,
}

/// Wraps `handler` so that it reports done once `token` is cancelled.
pub fn with_cancellation<H>(token: CancellationToken, handler: H) -> ScopedHandler<H> {
    ScopedHandler { handler, token }
}

impl<H> ScopedHandler<H> {
    pub async fn done(&self) {
        self.token.cancelled().await
    }

    pub fn is_done(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl<K, H: ResourceEventHandler<K>> ResourceEventHandler<K> for ScopedHandler<H> {
    fn on_add(&self, obj: &K) {
        self.handler.on_add(obj)
    }

    fn on_update(&self, old: &K, new: &K) {
        self.handler.on_update(old, new)
    }

    fn on_delete(&self, obj: &DeletedObject<K>) {
        self.handler.on_delete(obj)
    }
}

impl<K, H: ResourceEventHandler<K>> CancellableResourceEventHandler<K> for ScopedHandler<H> {
    fn done(&self) -> BoxFuture<'_, ()> {
        Box::pin(ScopedHandler::done(self))
    }

    fn is_done(&self) -> bool {
        ScopedHandler::is_done(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::keyfunc::Unstructured;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting() -> (Arc<AtomicUsize>, ResourceEventHandlerFuncs<Unstructured>) {
        let count = Arc::new(AtomicUsize::new(0));
        let (a, u, d) = (count.clone(), count.clone(), count.clone());
        let funcs = ResourceEventHandlerFuncs::new()
            .with_add(move |_| {
                a.fetch_add(1, Ordering::SeqCst);
            })
            .with_update(move |_, _| {
                u.fetch_add(10, Ordering::SeqCst);
            })
            .with_delete(move |_| {
                d.fetch_add(100, Ordering::SeqCst);
            });
        (count, funcs)
    }

    #[test]
    fn test_funcs_dispatch() {
        let (count, funcs) = counting();
        let obj = Unstructured(json!({}));
        funcs.on_add(&obj);
        funcs.on_update(&obj, &obj);
        funcs.on_delete(&DeletedObject::Object(Arc::new(obj)));
        assert_eq!(count.load(Ordering::SeqCst), 111);
    }

    #[test]
    fn test_missing_funcs_are_ignored() {
        let funcs = ResourceEventHandlerFuncs::<Unstructured>::new();
        funcs.on_add(&Unstructured(json!({})));
    }

    #[test]
    fn test_deleted_object_exposes_last_state() {
        let obj = Arc::new(Unstructured(json!({ "metadata": { "name": "x" } })));
        let unknown = DeletedObject::Unknown(DeletedFinalStateUnknown {
            key: "c|x".to_string(),
            obj: obj.clone(),
        });
        assert_eq!(unknown.object(), obj.as_ref());
        assert_eq!(DeletedObject::Object(obj.clone()).object(), obj.as_ref());
    }

    #[tokio::test]
    async fn test_with_cancellation() {
        let (count, funcs) = counting();
        let token = CancellationToken::new();
        let handler = with_cancellation(token.clone(), funcs);

        assert!(!handler.is_done());
        handler.on_add(&Unstructured(json!({})));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        let pending = tokio::time::timeout(Duration::from_millis(20), handler.done()).await;
        assert!(pending.is_err(), "done resolved before cancellation");

        token.cancel();
        assert!(handler.is_done());
        tokio::time::timeout(Duration::from_secs(1), handler.done())
            .await
            .expect("done did not resolve after cancellation");
    }

    #[tokio::test]
    async fn test_cancelling_parent_token_finishes_handler() {
        let parent = CancellationToken::new();
        let handler = with_cancellation(parent.child_token(), ResourceEventHandlerFuncs::<Unstructured>::new());
        parent.cancel();
        assert!(handler.is_done());
        handler.done().await;
    }
}
