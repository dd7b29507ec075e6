//! # Browser Events
//!
//! Events published to consumers (UI layers, the HTTP front end).

use serde::Serialize;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::favorites::FavoriteSet;

/// A change observable by consumers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CatalogEvent {
    /// The catalog was replaced (page merged or mode reset)
    CatalogChanged { catalog: Arc<Catalog> },
    /// A page fetch started or settled
    LoadingChanged { loading: bool },
    /// A page fetch failed; the catalog is unchanged and a retry is possible
    FetchFailed { reason: String },
    /// The favorite set changed
    FavoritesChanged { favorites: Arc<FavoriteSet> },
}

impl CatalogEvent {
    /// Short name used as the SSE event type
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CatalogChanged { .. } => "catalog_changed",
            Self::LoadingChanged { .. } => "loading_changed",
            Self::FetchFailed { .. } => "fetch_failed",
            Self::FavoritesChanged { .. } => "favorites_changed",
        }
    }
}
