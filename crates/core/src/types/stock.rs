//! Stock availability.

use serde::{Deserialize, Serialize};

use super::ProductId;

/// Available quantity of a product, as reported by the stock service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    pub id: ProductId,
    pub amount: u32,
}

impl Stock {
    /// Whether `requested` units can be fulfilled from this stock.
    #[must_use]
    pub const fn covers(&self, requested: u32) -> bool {
        requested <= self.amount
    }
}
