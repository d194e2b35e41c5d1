//! Rocket Shoes Cart - shopping cart state for the storefront.
//!
//! # Architecture
//!
//! - [`store::CartStore`] owns the cart and is the only thing that mutates it
//! - [`lookup`] defines the read-only catalog and stock collaborators
//! - [`api::ApiClient`] implements both collaborators over HTTP
//! - [`storage`] persists the cart to a local key-value store
//! - [`notify`] carries the fixed user-facing failure messages
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use rocket_shoes_cart::{ApiClient, CartConfig, CartStore, FileStore, TracingNotifier};
//!
//! let config = CartConfig::from_env()?;
//! let api = ApiClient::new(&config.api)?;
//! let storage = FileStore::open(&config.storage_path).await?;
//! let cart = CartStore::initialize(
//!     api.clone(),
//!     api,
//!     storage,
//!     Arc::new(TracingNotifier),
//!     config.corrupt_cart,
//! )
//! .await?;
//!
//! cart.add_product(ProductId::new(1)).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod lookup;
pub mod notify;
pub mod storage;
pub mod store;

pub use api::{ApiClient, ApiError};
pub use config::{ApiConfig, CartConfig, ConfigError, CorruptCartPolicy};
pub use error::CartError;
pub use lookup::{ProductCatalog, StockLookup};
pub use notify::{ChannelNotifier, Notification, Notifier, Operation, TracingNotifier};
pub use storage::{CART_STORAGE_KEY, FileStore, KeyValueStore, MemoryStore, StorageError};
pub use store::{AmountUpdate, CartStore};
