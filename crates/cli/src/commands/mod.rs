//! Cart commands.
//!
//! Each command opens the configured storage, runs one cart operation and
//! prints the resulting cart. Failure notifications are printed as the
//! shopper would see them; the tagged error is returned for the exit code.

use std::sync::Arc;

use rocket_shoes_cart::{
    AmountUpdate, ApiClient, CartConfig, CartError, CartStore, ChannelNotifier, FileStore,
    Notification,
};
use rocket_shoes_core::{Product, ProductId};
use tokio::sync::mpsc;

/// A cart backed by the configured API and storage file.
pub struct CartSession {
    store: CartStore<ApiClient, ApiClient, FileStore>,
    notifications: mpsc::UnboundedReceiver<Notification>,
}

impl CartSession {
    /// Open the cart described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API client cannot be built or the persisted
    /// cart cannot be loaded.
    pub async fn open(config: &CartConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let api = ApiClient::new(&config.api)?;
        let storage = FileStore::open(&config.storage_path).await?;
        let (notifier, notifications) = ChannelNotifier::channel();

        let store = CartStore::initialize(
            api.clone(),
            api,
            storage,
            Arc::new(notifier),
            config.corrupt_cart,
        )
        .await?;

        tracing::debug!(path = %config.storage_path.display(), "Cart session opened");
        Ok(Self {
            store,
            notifications,
        })
    }

    /// Print the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON encoding fails.
    pub fn show(&self, json: bool) -> Result<(), serde_json::Error> {
        if json {
            print_line(&serde_json::to_string_pretty(&self.store.cart())?);
        } else {
            self.print_cart();
        }
        Ok(())
    }

    /// Add one unit of a product.
    ///
    /// # Errors
    ///
    /// Returns the reason the cart was not changed.
    pub async fn add(mut self, product_id: ProductId) -> Result<(), CartError> {
        let result = self.store.add_product(product_id).await;
        self.finish(result)
    }

    /// Remove a product.
    ///
    /// # Errors
    ///
    /// Returns the reason the cart was not changed.
    pub async fn remove(mut self, product_id: ProductId) -> Result<(), CartError> {
        let result = self.store.remove_product(product_id).await;
        self.finish(result)
    }

    /// Set a product's quantity.
    ///
    /// # Errors
    ///
    /// Returns the reason the cart was not changed.
    pub async fn update(mut self, product_id: ProductId, amount: u32) -> Result<(), CartError> {
        let result = self
            .store
            .update_product_amount(AmountUpdate { product_id, amount })
            .await;
        self.finish(result)
    }

    fn finish(&mut self, result: Result<(), CartError>) -> Result<(), CartError> {
        while let Ok(notification) = self.notifications.try_recv() {
            print_notice(notification);
        }
        if result.is_ok() {
            self.print_cart();
        }
        result
    }

    fn print_cart(&self) {
        let cart = self.store.cart();
        if cart.is_empty() {
            print_line("Cart is empty");
            return;
        }

        for product in &cart {
            print_line(&format_line(product));
        }

        let summary = self.store.summary();
        print_line(&format!(
            "{} product(s), {} item(s), subtotal {}",
            summary.size, summary.total_items, summary.subtotal
        ));
    }
}

fn format_line(product: &Product) -> String {
    format!(
        "#{:<4} {:<40} {:>3} x {:>12} = {:>12}",
        product.id,
        product.title,
        product.amount,
        product.price,
        product.subtotal()
    )
}

#[allow(clippy::print_stdout)]
fn print_line(line: &str) {
    println!("{line}");
}

#[allow(clippy::print_stderr)]
fn print_notice(notification: Notification) {
    eprintln!("! {notification}");
}
