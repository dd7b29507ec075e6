//! # Remote Catalog Source
//!
//! The seam between the engine and the paged character API.
//!
//! - `marvel` - reqwest client for the public Marvel API

pub mod marvel;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::catalog::{CharacterId, RawRecord};
use crate::error::FetchError;

pub use marvel::MarvelSource;

/// One page request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub offset: u32,
    pub limit: u32,
    /// Remote prefix filter (search mode only)
    pub name_starts_with: Option<String>,
}

/// A paged source of raw character records
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch one bounded page. Failures are never retried here.
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<RawRecord>, FetchError>;

    /// Fetch the comics a character appears in
    async fn fetch_comics(
        &self,
        character_id: CharacterId,
        limit: u32,
    ) -> Result<Vec<RawRecord>, FetchError>;
}
