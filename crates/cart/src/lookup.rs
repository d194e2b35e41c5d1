//! Read-only collaborators consulted by the cart store.

use std::future::Future;
use std::sync::Arc;

use rocket_shoes_core::{ProductDetails, ProductId, Stock};

use crate::api::ApiError;

/// Fetches product metadata by id.
pub trait ProductCatalog: Send + Sync {
    /// Look up a product's title, price and image.
    fn fetch_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<ProductDetails, ApiError>> + Send;
}

/// Fetches the currently available quantity of a product.
pub trait StockLookup: Send + Sync {
    /// Look up available stock. Implementations must not serve stale values.
    fn fetch_stock(&self, id: ProductId) -> impl Future<Output = Result<Stock, ApiError>> + Send;
}

impl<T: ProductCatalog> ProductCatalog for Arc<T> {
    fn fetch_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<ProductDetails, ApiError>> + Send {
        (**self).fetch_product(id)
    }
}

impl<T: StockLookup> StockLookup for Arc<T> {
    fn fetch_stock(&self, id: ProductId) -> impl Future<Output = Result<Stock, ApiError>> + Send {
        (**self).fetch_stock(id)
    }
}
