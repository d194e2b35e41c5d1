//! Cart-level helpers over a sequence of products.
//!
//! A cart is an ordered `Vec<Product>` (insertion order). These helpers check
//! its invariants and compute the totals shown next to the cart.

use std::collections::HashSet;

use serde::Serialize;

use super::{Price, Product, ProductId};

/// A broken cart invariant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartViolation {
    /// The same product id appears more than once.
    #[error("product {0} appears more than once")]
    DuplicateProduct(ProductId),
    /// An entry has a quantity below 1.
    #[error("product {0} has an amount below 1")]
    EmptyAmount(ProductId),
}

/// Check that every entry has `amount >= 1` and that ids are unique.
///
/// # Errors
///
/// Returns the first [`CartViolation`] found, scanning in cart order.
pub fn validate_cart(products: &[Product]) -> Result<(), CartViolation> {
    let mut seen = HashSet::with_capacity(products.len());
    for product in products {
        if product.amount < 1 {
            return Err(CartViolation::EmptyAmount(product.id));
        }
        if !seen.insert(product.id) {
            return Err(CartViolation::DuplicateProduct(product.id));
        }
    }
    Ok(())
}

/// Totals for a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CartSummary {
    /// Number of distinct products.
    pub size: usize,
    /// Sum of all quantities.
    pub total_items: u32,
    /// Sum of price times quantity.
    pub subtotal: Price,
}

impl CartSummary {
    /// Compute the summary of a cart.
    #[must_use]
    pub fn of(products: &[Product]) -> Self {
        Self {
            size: products.len(),
            total_items: products.iter().map(|p| p.amount).sum(),
            subtotal: products.iter().map(Product::subtotal).sum(),
        }
    }
}
