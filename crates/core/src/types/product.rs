//! Product types.

use serde::{Deserialize, Serialize};

use super::{Price, ProductId};

/// Product metadata as served by the catalog, without a cart quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub id: ProductId,
    pub title: String,
    pub price: Price,
    /// Image URL.
    #[serde(alias = "imageUrl")]
    pub image: String,
}

/// A product entry in the cart.
///
/// Identity is `id`; a cart holds at most one entry per id and `amount` is
/// always at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub price: Price,
    /// Image URL.
    #[serde(alias = "imageUrl")]
    pub image: String,
    /// Quantity selected by the shopper.
    pub amount: u32,
}

impl Product {
    /// Build a cart entry from catalog details with the given quantity.
    #[must_use]
    pub fn from_details(details: ProductDetails, amount: u32) -> Self {
        Self {
            id: details.id,
            title: details.title,
            price: details.price,
            image: details.image,
            amount,
        }
    }

    /// Return a copy of this entry with a different quantity.
    #[must_use]
    pub fn with_amount(&self, amount: u32) -> Self {
        Self {
            amount,
            ..self.clone()
        }
    }

    /// Price of this entry times its quantity.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.price.times(self.amount)
    }
}
