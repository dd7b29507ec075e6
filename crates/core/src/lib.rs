//! # Herodex Core
//!
//! Character catalog engine: pages a remote catalog, merges pages into
//! alphabetical sections, debounces a search box into a browse/search mode
//! machine, and keeps a persisted favorite set.
//!
//! ## Architecture
//!
//! - `catalog/` - Record validation, section merge, paging aggregator
//! - `search/` - Debouncer and the browse/search coordinator
//! - `favorites/` - Favorite store seam and the toggle controller
//! - `source/` - Remote catalog seam and the signed HTTP client
//! - `state/` - Local SQLite key-value store
//! - `browser/` - Single-task runtime wiring the pieces together
//!
//! ## Usage
//!
//! ```rust,ignore
//! use herodex_core::{spawn_browser, CatalogConfig, HerodexDb, MarvelSource};
//!
//! let config = CatalogConfig::from_env()?;
//! let source = Arc::new(MarvelSource::new(config.api.clone())?);
//! let store = Arc::new(HerodexDb::open()?);
//! let browser = spawn_browser(&config, source, store).await;
//! browser.input("Iron").await?;
//! ```

pub mod browser;
pub mod catalog;
pub mod config;
pub mod error;
pub mod favorites;
pub mod search;
pub mod source;
pub mod state;

#[cfg(test)]
mod testing;

pub use browser::{spawn_browser, BrowserHandle, BrowserSnapshot, CatalogEvent};
pub use catalog::{Catalog, Character, CharacterDetail, CharacterId, Comic, Section};
pub use config::{ApiConfig, CatalogConfig};
pub use error::{FetchError, MalformedRecordError, PersistenceError};
pub use favorites::{FavoriteSet, FavoriteStore, MemoryStore};
pub use search::SearchMode;
pub use source::{CatalogSource, MarvelSource, PageRequest};
pub use state::HerodexDb;
