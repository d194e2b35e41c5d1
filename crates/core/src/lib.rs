//! Rocket Shoes Core - Shared cart types.
//!
//! This crate provides the types used across all Rocket Shoes components:
//! - `cart` - Cart state store, API client and local persistence
//! - `cli` - Command-line front end for the cart
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no storage
//! access, no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Product ids, products, stock, prices and cart summaries

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
