//! The authoritative, optimistically updated cart for one running client.
//!
//! Every mutation changes the in-memory list first, then persists the whole
//! list as the `"cart"` metadata entry of the signed-in customer and, on
//! success, publishes [`CartUpdated`]. Nothing here returns an error: lower
//! layer failures are logged, recorded in [`CartStore::sync_error`], and
//! otherwise absorbed.
//!
//! Once issued, a remote write runs on its own task to completion or failure.
//! Dropping the mutation future only stops the caller from waiting for it.
//! Mutations therefore need a tokio runtime.
//!
//! Overlapping mutations are applied to memory in call order, but their
//! remote writes race and whichever completes last wins. Each write replaces
//! the entire list, so concurrent clients of the same customer can lose each
//! other's changes.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::bail;

use super::{
    CART_META_KEY, CartItem, CartUpdated, add_item, decode_cart, encode_cart, remove_item,
    set_quantity,
};
use crate::api::{CustomerApi, CustomerUpdate};
use crate::events::EventBus;
use crate::session::{Session, SessionProvider};

/// What `refresh` does with the current cart when the fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshFailurePolicy {
    /// Clear the cart.
    #[default]
    ResetToEmpty,
    /// Leave the cart as it was before the refresh.
    KeepStale,
}

impl FromStr for RefreshFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim() {
            "reset" => Ok(Self::ResetToEmpty),
            "keep" => Ok(Self::KeepStale),
            other => bail!("unknown refresh failure policy: {other} (expected reset or keep)"),
        }
    }
}

impl fmt::Display for RefreshFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResetToEmpty => f.write_str("reset"),
            Self::KeepStale => f.write_str("keep"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    pub on_refresh_failure: RefreshFailurePolicy,
}

/// How a mutation's persistence step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Written remotely and `cartUpdated` published.
    Persisted,
    /// No signed-in user; the change only exists in memory.
    SkippedNoSession,
    /// The remote write failed; the change only exists in memory.
    Failed,
    /// The mutation was refused and nothing changed.
    Rejected,
}

pub struct CartStore {
    session: Arc<dyn SessionProvider>,
    api: Arc<dyn CustomerApi>,
    bus: Arc<EventBus>,
    config: StoreConfig,
    items: RwLock<Vec<CartItem>>,
    loading: AtomicBool,
    sync_error: Arc<RwLock<Option<String>>>,
}

impl CartStore {
    pub fn new(
        session: Arc<dyn SessionProvider>,
        api: Arc<dyn CustomerApi>,
        bus: Arc<EventBus>,
        config: StoreConfig,
    ) -> Self {
        Self {
            session,
            api,
            bus,
            config,
            items: RwLock::new(Vec::new()),
            loading: AtomicBool::new(false),
            sync_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Snapshot of the current cart.
    pub fn cart_items(&self) -> Vec<CartItem> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of distinct lines, not the sum of quantities.
    pub fn cart_count(&self) -> usize {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True while a refresh is in flight.
    pub fn loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Message of the last failed sync, cleared by the next successful one.
    pub fn sync_error(&self) -> Option<String> {
        self.sync_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Replace the cart with the one stored on the customer record.
    ///
    /// Signed out: the cart is cleared. Fetch failure: handled per
    /// [`RefreshFailurePolicy`]. Does not publish `cartUpdated`.
    pub async fn refresh(&self) {
        self.loading.store(true, Ordering::SeqCst);
        let _loading = LoadingGuard(&self.loading);

        let Some(user_id) = self.resolve_user().await else {
            tracing::debug!("no session, clearing cart");
            self.replace(Vec::new());
            return;
        };

        match self.api.get_customer_by_id(&user_id).await {
            Ok(customer) => {
                let items = decode_cart(customer.meta(CART_META_KEY));
                tracing::debug!(user_id = %user_id, items = items.len(), "cart refreshed");
                self.replace(items);
                self.set_sync_error(None);
            }
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %format!("{e:#}"), "failed to fetch cart");
                self.set_sync_error(Some(format!("{e:#}")));
                match self.config.on_refresh_failure {
                    RefreshFailurePolicy::ResetToEmpty => self.replace(Vec::new()),
                    RefreshFailurePolicy::KeepStale => {}
                }
            }
        }
    }

    /// Add `quantity` of `product_id`, merging into an existing line.
    pub async fn add_to_cart(&self, product_id: &str, quantity: u32) -> SyncOutcome {
        if quantity == 0 {
            tracing::warn!(product_id, "rejecting add with zero quantity");
            return SyncOutcome::Rejected;
        }
        let snapshot = self.mutate(|items| add_item(items, product_id, quantity));
        self.persist(snapshot).await
    }

    /// Remove the line for `product_id`, if any.
    pub async fn remove_from_cart(&self, product_id: &str) -> SyncOutcome {
        let snapshot = self.mutate(|items| {
            remove_item(items, product_id);
        });
        self.persist(snapshot).await
    }

    /// Set the quantity of an existing line. Never creates a line.
    pub async fn update_cart_quantity(&self, product_id: &str, quantity: u32) -> SyncOutcome {
        if quantity == 0 {
            tracing::warn!(product_id, "rejecting quantity update to zero");
            return SyncOutcome::Rejected;
        }
        let snapshot = self.mutate(|items| {
            set_quantity(items, product_id, quantity);
        });
        self.persist(snapshot).await
    }

    /// Apply `change` to the in-memory cart and return the result. The lock
    /// is released before returning, so callers can await afterwards.
    fn mutate(&self, change: impl FnOnce(&mut Vec<CartItem>)) -> Vec<CartItem> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        change(&mut items);
        items.clone()
    }

    fn replace(&self, items: Vec<CartItem>) {
        *self.items.write().unwrap_or_else(PoisonError::into_inner) = items;
    }

    fn set_sync_error(&self, error: Option<String>) {
        record_sync_error(&self.sync_error, error);
    }

    /// Write `items` to the customer record and announce it.
    async fn persist(&self, items: Vec<CartItem>) -> SyncOutcome {
        let Some(user_id) = self.resolve_user().await else {
            tracing::debug!("no session, cart change kept in memory only");
            return SyncOutcome::SkippedNoSession;
        };

        let api = Arc::clone(&self.api);
        let bus = Arc::clone(&self.bus);
        let sync_error = Arc::clone(&self.sync_error);
        let write = tokio::spawn(async move {
            let update = CustomerUpdate::meta(CART_META_KEY, encode_cart(&items));
            match api.update_customer_by_id(&user_id, &update).await {
                Ok(()) => {
                    tracing::debug!(user_id = %user_id, items = items.len(), "cart persisted");
                    record_sync_error(&sync_error, None);
                    bus.publish::<CartUpdated>(&items);
                    SyncOutcome::Persisted
                }
                Err(e) => {
                    tracing::error!(user_id = %user_id, error = %format!("{e:#}"), "failed to persist cart");
                    record_sync_error(&sync_error, Some(format!("{e:#}")));
                    SyncOutcome::Failed
                }
            }
        });

        match write.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "cart write task aborted");
                self.set_sync_error(Some(format!("cart write aborted: {e}")));
                SyncOutcome::Failed
            }
        }
    }

    /// The signed-in user id, looked up fresh. Provider errors count as
    /// signed out.
    async fn resolve_user(&self) -> Option<String> {
        let session: Option<Session> = match self.session.get_session().await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "session lookup failed");
                None
            }
        };
        session.and_then(|s| s.user_id().map(str::to_string))
    }
}

impl fmt::Debug for CartStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartStore")
            .field("items", &self.cart_items())
            .field("loading", &self.loading())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn record_sync_error(slot: &RwLock<Option<String>>, error: Option<String>) {
    *slot.write().unwrap_or_else(PoisonError::into_inner) = error;
}

/// Clears the loading flag when a refresh ends, including by cancellation.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
