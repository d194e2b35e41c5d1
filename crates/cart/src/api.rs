//! HTTP client for the storefront's catalog and stock API.
//!
//! # Endpoints
//!
//! - `GET {base}/products/{id}` - product metadata (`id`, `title`, `price`, `image`)
//! - `GET {base}/stock/{id}` - available quantity (`id`, `amount`)
//!
//! Product metadata is cached in memory via `moka`; stock is always fetched
//! fresh because it backs the quantity checks.
//!
//! # Example
//!
//! ```rust,ignore
//! use rocket_shoes_cart::api::ApiClient;
//!
//! let client = ApiClient::new(&config.api)?;
//! let product = client.get_product(ProductId::new(1)).await?;
//! let stock = client.get_stock(ProductId::new(1)).await?;
//! ```

use std::sync::Arc;

use moka::future::Cache;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use rocket_shoes_core::{ProductDetails, ProductId, Stock};

use crate::config::ApiConfig;
use crate::lookup::{ProductCatalog, StockLookup};

/// Maximum number of products kept in the metadata cache.
const CATALOG_CACHE_CAPACITY: u64 = 1000;

/// Errors that can occur when calling the catalog or stock API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Request URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Client construction failed.
    #[error("Invalid client configuration: {0}")]
    Config(String),
}

/// Client for the catalog and stock API.
///
/// Cheaply cloneable; clones share the HTTP connection pool and the cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    products: Cache<ProductId, ProductDetails>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` if the token is not a valid header value and
    /// `ApiError::Http` if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();

        if let Some(token) = &config.token {
            use secrecy::ExposeSecret;

            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| ApiError::Config(format!("Invalid API token format: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        let products = Cache::builder()
            .max_capacity(CATALOG_CACHE_CAPACITY)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                products,
            }),
        })
    }

    /// GET a JSON resource relative to the base URL.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.inner.base_url.join(path)?;

        let response = self.inner.client.get(url.clone()).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(url.path().to_string()));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                url = %url,
                body = %response_text.chars().take(500).collect::<String>(),
                "API returned non-success status"
            );
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: response_text.chars().take(200).collect(),
            });
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                url = %url,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse API response"
            );
            ApiError::Parse(e)
        })
    }

    /// Get a product's metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<ProductDetails, ApiError> {
        if let Some(product) = self.inner.products.get(&id).await {
            debug!("Cache hit for product");
            return Ok(product);
        }

        let product: ProductDetails = self.get_json(&format!("products/{id}")).await?;
        if product.id != id {
            return Err(ApiError::Api {
                status: 200,
                message: format!("requested product {id}, got product {}", product.id),
            });
        }

        self.inner.products.insert(id, product.clone()).await;

        Ok(product)
    }

    /// Get a product's available stock. Never cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the stock entry is not found or the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_stock(&self, id: ProductId) -> Result<Stock, ApiError> {
        self.get_json(&format!("stock/{id}")).await
    }

    /// Drop all cached product metadata.
    pub fn invalidate_products(&self) {
        self.inner.products.invalidate_all();
    }
}

impl ProductCatalog for ApiClient {
    async fn fetch_product(&self, id: ProductId) -> Result<ProductDetails, ApiError> {
        self.get_product(id).await
    }
}

impl StockLookup for ApiClient {
    async fn fetch_stock(&self, id: ProductId) -> Result<Stock, ApiError> {
        self.get_stock(id).await
    }
}
