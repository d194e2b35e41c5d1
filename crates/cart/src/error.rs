//! Cart error type with Sentry integration.
//!
//! Every cart operation returns `Result<T, CartError>`. The variant tells the
//! caller why an operation did not commit; the cart itself is unchanged in
//! every error case.

use thiserror::Error;

use rocket_shoes_core::ProductId;

use crate::api::ApiError;
use crate::storage::StorageError;

/// Why a cart operation did not commit.
#[derive(Debug, Error)]
pub enum CartError {
    /// The product is not in the cart.
    #[error("Product {0} is not in the cart")]
    NotFound(ProductId),

    /// The requested quantity is below 1.
    #[error("Invalid amount {amount} for product {product_id}")]
    InvalidAmount { product_id: ProductId, amount: u32 },

    /// The requested quantity exceeds available stock.
    #[error("Requested {requested} of product {product_id}, only {available} in stock")]
    OutOfStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The catalog or stock lookup failed.
    #[error("Upstream error: {0}")]
    Upstream(#[from] ApiError),

    /// Reading or writing the persisted cart failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The persisted cart could not be used and the store was told not to discard it.
    #[error("Persisted cart is corrupt: {0}")]
    CorruptCart(String),
}

impl CartError {
    /// Whether this failure points at infrastructure rather than shopper input.
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::Upstream(_) | Self::Storage(_) | Self::CorruptCart(_)
        )
    }

    /// Log the error and, for infrastructure failures, capture it to Sentry.
    pub fn report(&self) {
        if self.is_infrastructure() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Cart operation failed"
            );
        } else {
            tracing::info!(error = %self, "Cart operation rejected");
        }
    }
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;

/// Add a breadcrumb for a cart action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of cart
/// actions leading up to an error.
pub fn add_breadcrumb(message: &str, product_id: ProductId) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some("cart".to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };
    breadcrumb.data.insert(
        "product_id".to_string(),
        serde_json::Value::from(product_id.as_i32()),
    );

    sentry::add_breadcrumb(breadcrumb);
}
