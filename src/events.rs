//! Decoupled, typed event bus for cross-component notifications.
//!
//! A channel is a type implementing [`Channel`]: it fixes the channel name
//! and the payload every handler on it receives. Components publish via
//! [`EventBus::publish`] and listen via [`EventBus::subscribe`] or
//! [`EventBus::on`]. Fan-out is synchronous and follows registration order.
//! Nothing is buffered, so a handler only sees events published after it was
//! registered.
//!
//! A handler that returns an error or panics is logged and skipped; the
//! remaining handlers on the channel still run and the publisher never sees
//! the failure.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use anyhow::Result;

/// A named channel with a fixed payload type.
pub trait Channel: 'static {
    /// Channel name, used in logs. Must be non-empty.
    const NAME: &'static str;
    type Payload: Send + Sync + 'static;
}

/// A shared handler for channel `C`.
///
/// Keep a clone around if you intend to remove it later with
/// [`EventBus::unsubscribe`]; removal matches on the allocation.
pub type Handler<C> = Arc<dyn Fn(&<C as Channel>::Payload) -> Result<()> + Send + Sync>;

/// One registration. The handler is stored type-erased as a `Handler<C>`.
struct Entry {
    id: u64,
    handler: Box<dyn Any + Send + Sync>,
}

struct Inner {
    next_id: AtomicU64,
    channels: RwLock<HashMap<TypeId, Vec<Entry>>>,
}

/// Publish/subscribe hub. Cheap to share behind an `Arc`.
pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                next_id: AtomicU64::new(1),
                channels: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Register `handler` on channel `C`.
    ///
    /// Every call creates an independent registration, even for a handler
    /// that is already registered.
    pub fn subscribe<C: Channel>(&self, handler: Handler<C>) -> Subscription {
        debug_assert!(!C::NAME.is_empty(), "channel names must be non-empty");

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut channels = self
            .inner
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        channels.entry(TypeId::of::<C>()).or_default().push(Entry {
            id,
            handler: Box::new(handler),
        });

        tracing::trace!(channel = C::NAME, id, "subscribed");
        Subscription {
            bus: Arc::downgrade(&self.inner),
            channel: TypeId::of::<C>(),
            name: C::NAME,
            id,
        }
    }

    /// Register a closure on channel `C`.
    pub fn on<C: Channel>(
        &self,
        handler: impl Fn(&C::Payload) -> Result<()> + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe::<C>(Arc::new(handler))
    }

    /// Remove the earliest registration of `handler` on channel `C`.
    ///
    /// Returns whether anything was removed. Removing a handler that was never
    /// registered is not an error.
    pub fn unsubscribe<C: Channel>(&self, handler: &Handler<C>) -> bool {
        let target = Arc::as_ptr(handler) as *const ();
        let mut channels = self
            .inner
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(entries) = channels.get_mut(&TypeId::of::<C>()) else {
            return false;
        };

        let position = entries.iter().position(|entry| {
            entry
                .handler
                .downcast_ref::<Handler<C>>()
                .is_some_and(|h| Arc::as_ptr(h) as *const () == target)
        });
        match position {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Deliver `payload` to every handler registered on `C`.
    ///
    /// Handlers run in registration order on the caller's thread. The set of
    /// handlers is fixed when publishing starts; handlers may subscribe or
    /// unsubscribe from inside a callback without deadlocking.
    ///
    /// Returns the number of handlers that completed successfully.
    pub fn publish<C: Channel>(&self, payload: &C::Payload) -> usize {
        let handlers: Vec<Handler<C>> = {
            let channels = self
                .inner
                .channels
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            match channels.get(&TypeId::of::<C>()) {
                Some(entries) => entries
                    .iter()
                    .filter_map(|entry| entry.handler.downcast_ref::<Handler<C>>().cloned())
                    .collect(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        for handler in handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(payload))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    tracing::warn!(channel = C::NAME, error = %e, "subscriber failed");
                }
                Err(cause) => {
                    tracing::warn!(
                        channel = C::NAME,
                        panic = panic_message(cause.as_ref()),
                        "subscriber panicked"
                    );
                }
            }
        }
        delivered
    }

    /// Number of live registrations on channel `C`.
    pub fn subscriber_count<C: Channel>(&self) -> usize {
        self.inner
            .channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<C>())
            .map_or(0, Vec::len)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels = self
            .inner
            .channels
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("EventBus")
            .field("channels", &channels.len())
            .finish()
    }
}

/// Handle to a single registration.
///
/// Dropping the handle leaves the handler registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct Subscription {
    bus: Weak<Inner>,
    channel: TypeId,
    name: &'static str,
    id: u64,
}

impl Subscription {
    /// Remove exactly this registration. Returns `false` if it was already
    /// gone or the bus has been dropped.
    pub fn unsubscribe(self) -> bool {
        let Some(inner) = self.bus.upgrade() else {
            return false;
        };
        let mut channels = inner
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(entries) = channels.get_mut(&self.channel) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|entry| entry.id != self.id);
        let removed = entries.len() != before;
        if removed {
            tracing::trace!(channel = self.name, id = self.id, "unsubscribed");
        }
        removed
    }

    /// Name of the channel this registration belongs to.
    pub fn channel(&self) -> &'static str {
        self.name
    }
}

fn panic_message(cause: &(dyn Any + Send)) -> &str {
    if let Some(s) = cause.downcast_ref::<&str>() {
        s
    } else if let Some(s) = cause.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
