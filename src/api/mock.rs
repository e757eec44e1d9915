use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use serde_json::Value;

use super::{Customer, CustomerApi, CustomerUpdate};

/// In-memory customer records for tests.
///
/// Reads and writes can be made to fail on demand, and individual writes can
/// be delayed to force overlapping persists to complete out of order.
#[derive(Default)]
pub struct MockCustomerApi {
    customers: Mutex<HashMap<String, Customer>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
    write_delays: Mutex<VecDeque<Duration>>,
}

impl MockCustomerApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_customer(self, customer: Customer) -> Self {
        self.insert(customer);
        self
    }

    pub fn insert(&self, customer: Customer) {
        self.lock().insert(customer.id.clone(), customer);
    }

    pub fn customer(&self, id: &str) -> Option<Customer> {
        self.lock().get(id).cloned()
    }

    /// The stored `"cart"` metadata value for a customer.
    pub fn stored_cart(&self, id: &str) -> Option<Value> {
        self.customer(id)?.meta(crate::cart::CART_META_KEY).cloned()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Delay the next not-yet-delayed write by `delay`. Delays are consumed
    /// in the order writes arrive.
    pub fn push_write_delay(&self, delay: Duration) {
        self.write_delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(delay);
    }

    /// Number of read calls so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of write calls so far, including failed ones.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Customer>> {
        self.customers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CustomerApi for MockCustomerApi {
    async fn get_customer_by_id(&self, id: &str) -> Result<Customer> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("mock: read of customer {id} failed");
        }
        self.customer(id)
            .ok_or_else(|| anyhow!("mock: customer {id} not found"))
    }

    async fn update_customer_by_id(&self, id: &str, update: &CustomerUpdate) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let delay = self
            .write_delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("mock: write to customer {id} failed");
        }

        let mut customers = self.lock();
        let customer = customers
            .get_mut(id)
            .ok_or_else(|| anyhow!("mock: customer {id} not found"))?;
        for entry in &update.meta_data {
            customer.merge_meta(entry.clone());
        }
        Ok(())
    }
}
