//! Core types for Rocket Shoes.
//!
//! This module provides type-safe wrappers for the cart's domain concepts.

pub mod cart;
pub mod id;
pub mod price;
pub mod product;
pub mod stock;

pub use cart::{CartSummary, CartViolation, validate_cart};
pub use id::*;
pub use price::Price;
pub use product::{Product, ProductDetails};
pub use stock::Stock;
