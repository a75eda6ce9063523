//! Listings API client abstraction.
//!
//! The orchestrator depends on the [`ListingSource`] trait rather than a
//! concrete HTTP client, allowing mock sources in tests. The trait uses
//! boxed futures so it stays dyn-compatible (`Arc<dyn ListingSource>`).

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

use crate::geo::BoundingBox;
use crate::listing::{ListingFilter, ListingPage};

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors from the listings API.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-success response status.
    #[error("HTTP {status} from listings API")]
    Status { status: u16 },

    /// Response body could not be decoded.
    #[error("failed to decode listings response: {0}")]
    Decode(String),
}

/// A query-by-bounding-box request.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundsQuery {
    /// Viewport bounds (south-west / north-east corners).
    pub bounds: BoundingBox,
    /// Category filter.
    pub filter: ListingFilter,
    /// Zero-based page index.
    pub page: u32,
    /// Requested page size.
    pub page_size: u32,
}

/// Query-by-bounding-box capability of the listings backend.
pub trait ListingSource: Send + Sync {
    /// Fetch one page of listings inside the query bounds.
    fn query(&self, query: BoundsQuery) -> BoxFuture<'_, Result<ListingPage, SourceError>>;
}

/// Real listings client backed by reqwest.
pub struct HttpListingSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpListingSource {
    /// Create a client for the listings API at `base_url`.
    ///
    /// The underlying HTTP client carries its own generous timeout; the
    /// orchestrator enforces the tighter per-request bound.
    pub fn new(base_url: impl Into<String>) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SourceError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Create a client reusing an existing reqwest client.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn search_url(&self) -> String {
        format!("{}/listings/search", self.base_url.trim_end_matches('/'))
    }
}

impl ListingSource for HttpListingSource {
    fn query(&self, query: BoundsQuery) -> BoxFuture<'_, Result<ListingPage, SourceError>> {
        let url = self.search_url();
        let client = self.client.clone();

        Box::pin(async move {
            let mut request = client.get(&url).query(&[
                ("sw_lat", query.bounds.south.to_string()),
                ("sw_lng", query.bounds.west.to_string()),
                ("ne_lat", query.bounds.north.to_string()),
                ("ne_lng", query.bounds.east.to_string()),
                ("page", query.page.to_string()),
                ("page_size", query.page_size.to_string()),
            ]);
            if let Some(category) = query.filter.category() {
                request = request.query(&[("category", category.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| SourceError::Http(format!("Request failed: {}", e)))?;

            let status = response.status();
            if !status.is_success() {
                return Err(SourceError::Status {
                    status: status.as_u16(),
                });
            }

            response
                .json::<ListingPage>()
                .await
                .map_err(|e| SourceError::Decode(e.to_string()))
        })
    }
}
