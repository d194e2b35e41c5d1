//! The cart state store.
//!
//! [`CartStore`] owns the shopper's cart and keeps it in step with the
//! persisted entry under [`CART_STORAGE_KEY`]. Each mutating operation either
//! commits fully (storage written, then the new cart published) or leaves both
//! untouched.
//!
//! Mutations are serialized through a gate held from the moment the current
//! cart is read until the new one is committed, so a slow catalog or stock
//! lookup can never interleave with another mutation. Reads never wait on the
//! gate.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument, warn};

use rocket_shoes_core::{CartSummary, Product, ProductId, validate_cart};

use crate::config::CorruptCartPolicy;
use crate::error::{CartError, Result, add_breadcrumb};
use crate::lookup::{ProductCatalog, StockLookup};
use crate::notify::{Notification, Notifier, Operation};
use crate::storage::{CART_STORAGE_KEY, KeyValueStore};

/// Request to set a cart entry's quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmountUpdate {
    pub product_id: ProductId,
    /// New absolute quantity; must be at least 1.
    pub amount: u32,
}

/// Shopping cart state, synchronized with local storage.
pub struct CartStore<C, S, K> {
    catalog: C,
    stock: S,
    storage: K,
    notifier: Arc<dyn Notifier>,
    state: watch::Sender<Vec<Product>>,
    gate: Mutex<()>,
}

impl<C, S, K> CartStore<C, S, K>
where
    C: ProductCatalog,
    S: StockLookup,
    K: KeyValueStore,
{
    /// Create a store, loading the persisted cart from `storage`.
    ///
    /// A missing entry yields an empty cart. An entry that cannot be parsed, or
    /// that breaks the cart invariants, is handled according to `policy`. No
    /// storage writes happen here.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the entry cannot be read, and
    /// `CartError::CorruptCart` if it is unusable under [`CorruptCartPolicy::Fail`].
    #[instrument(skip_all)]
    pub async fn initialize(
        catalog: C,
        stock: S,
        storage: K,
        notifier: Arc<dyn Notifier>,
        policy: CorruptCartPolicy,
    ) -> Result<Self> {
        let cart = match storage.get(CART_STORAGE_KEY).await? {
            None => {
                debug!("No persisted cart, starting empty");
                Vec::new()
            }
            Some(raw) => match parse_cart(&raw) {
                Ok(cart) => {
                    debug!(size = cart.len(), "Loaded persisted cart");
                    cart
                }
                Err(reason) => match policy {
                    CorruptCartPolicy::Discard => {
                        warn!(reason = %reason, "Discarding unusable persisted cart");
                        Vec::new()
                    }
                    CorruptCartPolicy::Fail => {
                        let err = CartError::CorruptCart(reason);
                        err.report();
                        return Err(err);
                    }
                },
            },
        };

        let (state, _) = watch::channel(cart);

        Ok(Self {
            catalog,
            stock,
            storage,
            notifier,
            state,
            gate: Mutex::new(()),
        })
    }

    /// Snapshot of the current cart, in insertion order.
    #[must_use]
    pub fn cart(&self) -> Vec<Product> {
        self.state.borrow().clone()
    }

    /// Watch the cart; the receiver sees every committed cart.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<Product>> {
        self.state.subscribe()
    }

    /// Totals for the current cart.
    #[must_use]
    pub fn summary(&self) -> CartSummary {
        CartSummary::of(&self.state.borrow())
    }

    /// Add one unit of a product.
    ///
    /// A product already in the cart is handed to the
    /// [`update_product_amount`](Self::update_product_amount) path with its
    /// quantity raised by one, and its failures are notified as update
    /// failures. Otherwise its metadata is fetched from the catalog and it is
    /// appended with quantity 1.
    ///
    /// # Errors
    ///
    /// Returns the reason the cart was left unchanged; the matching
    /// notification has already been sent.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_product(&self, product_id: ProductId) -> Result<()> {
        let _gate = self.gate.lock().await;
        let current = self.cart();

        let (operation, next) = match current.iter().find(|p| p.id == product_id) {
            Some(existing) => {
                let amount = existing.amount.saturating_add(1);
                (
                    Operation::UpdateAmount,
                    self.with_amount(&current, product_id, amount).await,
                )
            }
            None => (
                Operation::Add,
                self.with_new_product(&current, product_id).await,
            ),
        };

        match next {
            Ok(next) => self.commit(next, operation, product_id).await,
            Err(err) => Err(self.fail(operation, err)),
        }
    }

    /// Remove a product from the cart entirely.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotFound` if the product is not in the cart, or
    /// `CartError::Storage` if the new cart cannot be persisted.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_product(&self, product_id: ProductId) -> Result<()> {
        let _gate = self.gate.lock().await;
        let current = self.cart();

        if !current.iter().any(|p| p.id == product_id) {
            return Err(self.fail(Operation::Remove, CartError::NotFound(product_id)));
        }

        let next: Vec<Product> = current.into_iter().filter(|p| p.id != product_id).collect();
        self.commit(next, Operation::Remove, product_id).await
    }

    /// Set the quantity of a product already in the cart.
    ///
    /// Quantities below 1 are rejected without contacting the stock service;
    /// use [`remove_product`](Self::remove_product) to drop an entry.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount`, `NotFound`, `OutOfStock`, `Upstream` or
    /// `Storage`; the matching notification has already been sent.
    #[instrument(skip(self, update), fields(product_id = %update.product_id, amount = update.amount))]
    pub async fn update_product_amount(&self, update: AmountUpdate) -> Result<()> {
        let _gate = self.gate.lock().await;
        let current = self.cart();

        match self
            .with_amount(&current, update.product_id, update.amount)
            .await
        {
            Ok(next) => {
                self.commit(next, Operation::UpdateAmount, update.product_id)
                    .await
            }
            Err(err) => Err(self.fail(Operation::UpdateAmount, err)),
        }
    }

    /// `current` with `product_id`'s quantity replaced, after validating
    /// against available stock.
    async fn with_amount(
        &self,
        current: &[Product],
        product_id: ProductId,
        amount: u32,
    ) -> Result<Vec<Product>> {
        if amount < 1 {
            return Err(CartError::InvalidAmount { product_id, amount });
        }
        if !current.iter().any(|p| p.id == product_id) {
            return Err(CartError::NotFound(product_id));
        }

        let stock = self.stock.fetch_stock(product_id).await?;
        if !stock.covers(amount) {
            return Err(CartError::OutOfStock {
                product_id,
                requested: amount,
                available: stock.amount,
            });
        }

        Ok(current
            .iter()
            .map(|p| {
                if p.id == product_id {
                    p.with_amount(amount)
                } else {
                    p.clone()
                }
            })
            .collect())
    }

    /// `current` with a freshly fetched product appended at quantity 1.
    async fn with_new_product(
        &self,
        current: &[Product],
        product_id: ProductId,
    ) -> Result<Vec<Product>> {
        let details = self.catalog.fetch_product(product_id).await?;

        let mut next = Vec::with_capacity(current.len() + 1);
        next.extend_from_slice(current);
        next.push(Product::from_details(details, 1));
        Ok(next)
    }

    /// Persist `next`, then publish it.
    async fn commit(
        &self,
        next: Vec<Product>,
        operation: Operation,
        product_id: ProductId,
    ) -> Result<()> {
        debug_assert!(validate_cart(&next).is_ok(), "cart invariants broken");

        let persisted = serde_json::to_string(&next)
            .map_err(|e| self.fail(operation, CartError::Storage(e.into())))?;
        if let Err(err) = self.storage.set(CART_STORAGE_KEY, persisted).await {
            return Err(self.fail(operation, err.into()));
        }

        let size = next.len();
        self.state.send_replace(next);

        add_breadcrumb(&format!("cart {operation}"), product_id);
        info!(operation = %operation, size, "Cart updated");
        Ok(())
    }

    /// Notify and report a failed operation, handing the error back.
    fn fail(&self, operation: Operation, err: CartError) -> CartError {
        err.report();
        self.notifier
            .notify(Notification::for_failure(operation, &err));
        err
    }
}

/// Parse and validate a persisted cart.
fn parse_cart(raw: &str) -> std::result::Result<Vec<Product>, String> {
    let cart: Vec<Product> = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    validate_cart(&cart).map_err(|e| e.to_string())?;
    Ok(cart)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use rocket_shoes_core::{Price, ProductDetails, Stock};
    use tokio::sync::mpsc;

    use super::*;
    use crate::api::ApiError;
    use crate::notify::ChannelNotifier;
    use crate::storage::{MemoryStore, StorageError};

    /// In-memory catalog and stock service.
    #[derive(Default)]
    struct FakeApi {
        products: HashMap<ProductId, ProductDetails>,
        stock: HashMap<ProductId, u32>,
        delay: Option<Duration>,
        product_calls: AtomicUsize,
        stock_calls: AtomicUsize,
    }

    impl FakeApi {
        fn with_product(mut self, id: i32, title: &str, cents: i64, stock: u32) -> Self {
            let id = ProductId::new(id);
            self.products.insert(
                id,
                ProductDetails {
                    id,
                    title: title.to_string(),
                    price: Price::from_cents(cents),
                    image: format!("https://img.example/{id}.png"),
                },
            );
            self.stock.insert(id, stock);
            self
        }

        const fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    impl ProductCatalog for FakeApi {
        async fn fetch_product(&self, id: ProductId) -> std::result::Result<ProductDetails, ApiError> {
            self.product_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.products
                .get(&id)
                .cloned()
                .ok_or_else(|| ApiError::NotFound(format!("/products/{id}")))
        }
    }

    impl StockLookup for FakeApi {
        async fn fetch_stock(&self, id: ProductId) -> std::result::Result<Stock, ApiError> {
            self.stock_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.stock
                .get(&id)
                .map(|&amount| Stock { id, amount })
                .ok_or_else(|| ApiError::NotFound(format!("/stock/{id}")))
        }
    }

    /// Storage whose writes always fail.
    struct ReadOnlyStore(MemoryStore);

    impl KeyValueStore for ReadOnlyStore {
        async fn get(&self, key: &str) -> std::result::Result<Option<String>, StorageError> {
            self.0.get(key).await
        }

        async fn set(&self, _key: &str, _value: String) -> std::result::Result<(), StorageError> {
            Err(StorageError::Io {
                path: "readonly".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
    }

    type TestStore = CartStore<Arc<FakeApi>, Arc<FakeApi>, Arc<MemoryStore>>;

    struct Harness {
        store: TestStore,
        api: Arc<FakeApi>,
        storage: Arc<MemoryStore>,
        notifications: mpsc::UnboundedReceiver<Notification>,
    }

    impl Harness {
        async fn persisted(&self) -> Option<Vec<Product>> {
            self.storage
                .get(CART_STORAGE_KEY)
                .await
                .unwrap()
                .map(|raw| serde_json::from_str(&raw).unwrap())
        }

        fn next_notification(&mut self) -> Option<Notification> {
            self.notifications.try_recv().ok()
        }
    }

    async fn harness(api: FakeApi, storage: MemoryStore) -> Harness {
        let api = Arc::new(api);
        let storage = Arc::new(storage);
        let (notifier, notifications) = ChannelNotifier::channel();
        let store = CartStore::initialize(
            Arc::clone(&api),
            Arc::clone(&api),
            Arc::clone(&storage),
            Arc::new(notifier),
            CorruptCartPolicy::Discard,
        )
        .await
        .unwrap();
        Harness {
            store,
            api,
            storage,
            notifications,
        }
    }

    fn stored(products: &[Product]) -> MemoryStore {
        MemoryStore::with_entry(CART_STORAGE_KEY, serde_json::to_string(products).unwrap())
    }

    fn entry(id: i32, amount: u32) -> Product {
        Product {
            id: ProductId::new(id),
            title: format!("Product {id}"),
            price: Price::from_cents(10_000),
            image: format!("https://img.example/{id}.png"),
            amount,
        }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    #[tokio::test]
    async fn test_initialize_without_entry_is_empty() {
        let h = harness(FakeApi::default(), MemoryStore::new()).await;
        assert!(h.store.cart().is_empty());
        assert_eq!(h.persisted().await, None);
    }

    #[tokio::test]
    async fn test_initialize_loads_persisted_cart() {
        let cart = vec![entry(2, 3), entry(1, 1)];
        let h = harness(FakeApi::default(), stored(&cart)).await;
        assert_eq!(h.store.cart(), cart);
    }

    #[tokio::test]
    async fn test_initialize_discards_corrupt_entry_without_writing() {
        let h = harness(
            FakeApi::default(),
            MemoryStore::with_entry(CART_STORAGE_KEY, "{not a cart"),
        )
        .await;
        assert!(h.store.cart().is_empty());
        assert_eq!(
            h.storage.get(CART_STORAGE_KEY).await.unwrap().as_deref(),
            Some("{not a cart")
        );
    }

    #[tokio::test]
    async fn test_initialize_fail_policy_rejects_corrupt_entry() {
        let (notifier, _rx) = ChannelNotifier::channel();
        let result = CartStore::initialize(
            FakeApi::default(),
            FakeApi::default(),
            MemoryStore::with_entry(CART_STORAGE_KEY, "42"),
            Arc::new(notifier),
            CorruptCartPolicy::Fail,
        )
        .await;
        assert!(matches!(result, Err(CartError::CorruptCart(_))));
    }

    #[tokio::test]
    async fn test_initialize_treats_duplicate_ids_as_corrupt() {
        let (notifier, _rx) = ChannelNotifier::channel();
        let result = CartStore::initialize(
            FakeApi::default(),
            FakeApi::default(),
            stored(&[entry(1, 1), entry(1, 2)]),
            Arc::new(notifier),
            CorruptCartPolicy::Fail,
        )
        .await;
        assert!(matches!(result, Err(CartError::CorruptCart(_))));
    }

    #[tokio::test]
    async fn test_reinitialize_round_trip() {
        let api = FakeApi::default()
            .with_product(1, "Shoe", 1_000, 5)
            .with_product(2, "Boot", 2_500, 5);
        let h = harness(api, MemoryStore::new()).await;
        h.store.add_product(ProductId::new(1)).await.unwrap();
        h.store.add_product(ProductId::new(2)).await.unwrap();
        h.store.add_product(ProductId::new(2)).await.unwrap();

        let (notifier, _rx) = ChannelNotifier::channel();
        let reopened = CartStore::initialize(
            Arc::clone(&h.api),
            Arc::clone(&h.api),
            Arc::clone(&h.storage),
            Arc::new(notifier),
            CorruptCartPolicy::Fail,
        )
        .await
        .unwrap();
        assert_eq!(reopened.cart(), h.store.cart());
    }

    // =========================================================================
    // add_product
    // =========================================================================

    #[tokio::test]
    async fn test_add_new_product_uses_catalog_metadata() {
        let mut api = FakeApi::default();
        api.products.insert(
            ProductId::new(1),
            ProductDetails {
                id: ProductId::new(1),
                title: "Shoe".to_string(),
                price: Price::from_cents(1_000),
                image: "x".to_string(),
            },
        );
        let mut h = harness(api, MemoryStore::new()).await;

        h.store.add_product(ProductId::new(1)).await.unwrap();

        let expected = vec![Product {
            id: ProductId::new(1),
            title: "Shoe".to_string(),
            price: Price::from_cents(1_000),
            image: "x".to_string(),
            amount: 1,
        }];
        assert_eq!(h.store.cart(), expected);
        assert_eq!(h.persisted().await, Some(expected));
        assert_eq!(h.next_notification(), None);
        // New products need no stock check
        assert_eq!(h.api.stock_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_add_appends_in_insertion_order() {
        let api = FakeApi::default()
            .with_product(3, "Runner", 1_000, 5)
            .with_product(1, "Shoe", 1_000, 5);
        let h = harness(api, MemoryStore::new()).await;

        h.store.add_product(ProductId::new(3)).await.unwrap();
        h.store.add_product(ProductId::new(1)).await.unwrap();

        let ids: Vec<i32> = h.store.cart().iter().map(|p| p.id.as_i32()).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[tokio::test]
    async fn test_add_existing_product_increments_amount() {
        let api = FakeApi::default()
            .with_product(1, "Product 1", 10_000, 5)
            .with_product(2, "Product 2", 10_000, 5);
        let h = harness(api, stored(&[entry(1, 2), entry(2, 1)])).await;

        h.store.add_product(ProductId::new(1)).await.unwrap();

        assert_eq!(h.store.cart(), vec![entry(1, 3), entry(2, 1)]);
        assert_eq!(h.persisted().await, Some(vec![entry(1, 3), entry(2, 1)]));
        assert_eq!(h.api.product_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_add_existing_product_at_stock_limit() {
        let api = FakeApi::default().with_product(1, "Product 1", 10_000, 1);
        let mut h = harness(api, stored(&[entry(1, 1)])).await;

        let err = h.store.add_product(ProductId::new(1)).await.unwrap_err();

        assert!(matches!(
            err,
            CartError::OutOfStock {
                requested: 2,
                available: 1,
                ..
            }
        ));
        assert_eq!(h.next_notification(), Some(Notification::OutOfStock));
        assert_eq!(h.store.cart(), vec![entry(1, 1)]);
        assert_eq!(h.persisted().await, Some(vec![entry(1, 1)]));
    }

    #[tokio::test]
    async fn test_add_existing_product_stock_failure_notifies_update() {
        // Product in cart but unknown to the stock service
        let mut h = harness(FakeApi::default(), stored(&[entry(1, 1)])).await;

        let err = h.store.add_product(ProductId::new(1)).await.unwrap_err();

        assert!(matches!(err, CartError::Upstream(ApiError::NotFound(_))));
        assert_eq!(h.next_notification(), Some(Notification::UpdateFailed));
        assert_eq!(h.next_notification(), None);
        assert_eq!(h.store.cart(), vec![entry(1, 1)]);
        assert_eq!(h.api.product_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_add_existing_product_storage_failure_notifies_update() {
        let api = Arc::new(FakeApi::default().with_product(1, "Product 1", 10_000, 5));
        let (notifier, mut rx) = ChannelNotifier::channel();
        let store = CartStore::initialize(
            Arc::clone(&api),
            Arc::clone(&api),
            ReadOnlyStore(stored(&[entry(1, 1)])),
            Arc::new(notifier),
            CorruptCartPolicy::Discard,
        )
        .await
        .unwrap();

        let err = store.add_product(ProductId::new(1)).await.unwrap_err();

        assert!(matches!(err, CartError::Storage(_)));
        assert_eq!(rx.try_recv().ok(), Some(Notification::UpdateFailed));
        assert_eq!(store.cart(), vec![entry(1, 1)]);
    }

    #[tokio::test]
    async fn test_add_unknown_product_leaves_cart_unchanged() {
        let mut h = harness(FakeApi::default(), MemoryStore::new()).await;

        let err = h.store.add_product(ProductId::new(99)).await.unwrap_err();

        assert!(matches!(err, CartError::Upstream(ApiError::NotFound(_))));
        assert_eq!(h.next_notification(), Some(Notification::AddFailed));
        assert_eq!(h.next_notification(), None);
        assert!(h.store.cart().is_empty());
        assert_eq!(h.persisted().await, None);
    }

    #[tokio::test]
    async fn test_concurrent_adds_of_new_product_do_not_duplicate() {
        let api = FakeApi::default()
            .with_product(7, "Sneaker", 5_000, 10)
            .with_delay(Duration::from_millis(20));
        let h = harness(api, MemoryStore::new()).await;

        let (a, b) = tokio::join!(
            h.store.add_product(ProductId::new(7)),
            h.store.add_product(ProductId::new(7))
        );
        a.unwrap();
        b.unwrap();

        let cart = h.store.cart();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.first().map(|p| p.amount), Some(2));
        assert_eq!(h.persisted().await, Some(cart));
    }

    #[tokio::test]
    async fn test_add_storage_failure_leaves_cart_unchanged() {
        let api = Arc::new(FakeApi::default().with_product(1, "Shoe", 1_000, 5));
        let (notifier, mut rx) = ChannelNotifier::channel();
        let store = CartStore::initialize(
            Arc::clone(&api),
            Arc::clone(&api),
            ReadOnlyStore(MemoryStore::new()),
            Arc::new(notifier),
            CorruptCartPolicy::Discard,
        )
        .await
        .unwrap();

        let err = store.add_product(ProductId::new(1)).await.unwrap_err();

        assert!(matches!(err, CartError::Storage(StorageError::Io { .. })));
        assert_eq!(rx.try_recv().ok(), Some(Notification::AddFailed));
        assert!(store.cart().is_empty());
    }

    // =========================================================================
    // remove_product
    // =========================================================================

    #[tokio::test]
    async fn test_remove_absent_product() {
        let cart = vec![entry(1, 1)];
        let mut h = harness(FakeApi::default(), stored(&cart)).await;

        let err = h.store.remove_product(ProductId::new(2)).await.unwrap_err();

        assert!(matches!(err, CartError::NotFound(id) if id == ProductId::new(2)));
        assert_eq!(h.next_notification(), Some(Notification::RemoveFailed));
        assert_eq!(h.store.cart(), cart);
        assert_eq!(h.persisted().await, Some(cart));
    }

    #[tokio::test]
    async fn test_remove_present_product_preserves_order() {
        let mut h = harness(
            FakeApi::default(),
            stored(&[entry(1, 1), entry(2, 4), entry(3, 2)]),
        )
        .await;

        h.store.remove_product(ProductId::new(2)).await.unwrap();

        assert_eq!(h.store.cart(), vec![entry(1, 1), entry(3, 2)]);
        assert_eq!(h.persisted().await, Some(vec![entry(1, 1), entry(3, 2)]));
        assert_eq!(h.next_notification(), None);
    }

    // =========================================================================
    // update_product_amount
    // =========================================================================

    #[tokio::test]
    async fn test_update_to_zero_is_rejected_without_stock_lookup() {
        let api = FakeApi::default().with_product(2, "Product 2", 10_000, 10);
        let mut h = harness(api, stored(&[entry(2, 3)])).await;

        let err = h
            .store
            .update_product_amount(AmountUpdate {
                product_id: ProductId::new(2),
                amount: 0,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CartError::InvalidAmount { amount: 0, .. }));
        assert_eq!(h.next_notification(), Some(Notification::UpdateFailed));
        assert_eq!(h.store.cart(), vec![entry(2, 3)]);
        assert_eq!(h.api.stock_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_update_beyond_stock_is_rejected() {
        let api = FakeApi::default().with_product(1, "Product 1", 10_000, 4);
        let mut h = harness(api, stored(&[entry(1, 2)])).await;

        let err = h
            .store
            .update_product_amount(AmountUpdate {
                product_id: ProductId::new(1),
                amount: 5,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CartError::OutOfStock {
                requested: 5,
                available: 4,
                ..
            }
        ));
        assert_eq!(h.next_notification(), Some(Notification::OutOfStock));
        assert_eq!(h.store.cart(), vec![entry(1, 2)]);
    }

    #[tokio::test]
    async fn test_update_within_stock_changes_only_that_entry() {
        let api = FakeApi::default()
            .with_product(1, "Product 1", 10_000, 4)
            .with_product(2, "Product 2", 10_000, 4);
        let h = harness(api, stored(&[entry(1, 2), entry(2, 1)])).await;

        h.store
            .update_product_amount(AmountUpdate {
                product_id: ProductId::new(1),
                amount: 4,
            })
            .await
            .unwrap();

        assert_eq!(h.store.cart(), vec![entry(1, 4), entry(2, 1)]);
        assert_eq!(h.persisted().await, Some(vec![entry(1, 4), entry(2, 1)]));
    }

    #[tokio::test]
    async fn test_update_product_not_in_cart() {
        let api = FakeApi::default().with_product(5, "Product 5", 10_000, 4);
        let mut h = harness(api, stored(&[entry(1, 1)])).await;

        let err = h
            .store
            .update_product_amount(AmountUpdate {
                product_id: ProductId::new(5),
                amount: 2,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CartError::NotFound(_)));
        assert_eq!(h.next_notification(), Some(Notification::UpdateFailed));
        assert_eq!(h.store.cart(), vec![entry(1, 1)]);
    }

    #[tokio::test]
    async fn test_update_stock_lookup_failure() {
        // Product in cart but unknown to the stock service
        let mut h = harness(FakeApi::default(), stored(&[entry(1, 1)])).await;

        let err = h
            .store
            .update_product_amount(AmountUpdate {
                product_id: ProductId::new(1),
                amount: 2,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CartError::Upstream(_)));
        assert_eq!(h.next_notification(), Some(Notification::UpdateFailed));
        assert_eq!(h.store.cart(), vec![entry(1, 1)]);
    }

    #[test]
    fn test_amount_update_deserializes_from_camel_case() {
        let update: AmountUpdate =
            serde_json::from_str(r#"{"productId":2,"amount":3}"#).unwrap();
        assert_eq!(
            update,
            AmountUpdate {
                product_id: ProductId::new(2),
                amount: 3
            }
        );
    }

    // =========================================================================
    // Reads
    // =========================================================================

    #[tokio::test]
    async fn test_reads_are_stable_without_mutation() {
        let h = harness(FakeApi::default(), stored(&[entry(1, 2), entry(2, 1)])).await;
        assert_eq!(h.store.cart(), h.store.cart());
    }

    #[tokio::test]
    async fn test_subscribers_see_committed_cart() {
        let api = FakeApi::default().with_product(1, "Shoe", 1_000, 5);
        let h = harness(api, MemoryStore::new()).await;
        let mut rx = h.store.subscribe();

        h.store.add_product(ProductId::new(1)).await.unwrap();

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 1);
    }

    #[tokio::test]
    async fn test_summary_reflects_cart() {
        let h = harness(FakeApi::default(), stored(&[entry(1, 2), entry(2, 1)])).await;
        let summary = h.store.summary();
        assert_eq!(summary.size, 2);
        assert_eq!(summary.total_items, 3);
        assert_eq!(summary.subtotal, Price::from_cents(30_000));
    }
}
