//! Per-product exclusion (§4.3, §13): prevents two in-flight tasks from
//! observing the same product concurrently and racing on `Product.apply_observation`.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

/// A simple mutual-exclusion set keyed by product id. Not a true lock
/// manager: `try_acquire` is advisory and callers are expected to release
/// on every code path, including failure.
pub struct ProductLocks {
    locked: Mutex<HashSet<Uuid>>,
}

impl Default for ProductLocks {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductLocks {
    pub fn new() -> Self {
        Self { locked: Mutex::new(HashSet::new()) }
    }

    /// Returns `true` if the product was free and is now locked by the caller.
    pub async fn try_acquire(&self, product_id: Uuid) -> bool {
        self.locked.lock().await.insert(product_id)
    }

    pub async fn release(&self, product_id: Uuid) {
        self.locked.lock().await.remove(&product_id);
    }

    pub async fn is_locked(&self, product_id: Uuid) -> bool {
        self.locked.lock().await.contains(&product_id)
    }
}

/// RAII guard releasing a product lock when dropped would require async
/// drop, which Rust doesn't have; callers release explicitly via
/// [`ProductLocks::release`] in a `finally`-style `match`/`?` pattern instead.
pub type SharedProductLocks = Arc<ProductLocks>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquire_of_same_product_fails_until_released() {
        let locks = ProductLocks::new();
        let id = Uuid::new_v4();
        assert!(locks.try_acquire(id).await);
        assert!(!locks.try_acquire(id).await);
        locks.release(id).await;
        assert!(locks.try_acquire(id).await);
    }

    #[tokio::test]
    async fn distinct_products_do_not_contend() {
        let locks = ProductLocks::new();
        assert!(locks.try_acquire(Uuid::new_v4()).await);
        assert!(locks.try_acquire(Uuid::new_v4()).await);
    }
}
