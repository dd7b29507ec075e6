//! # Catalog Browser
//!
//! Wires the aggregator, search coordinator and favorites controller onto a
//! single task and exposes it through [`BrowserHandle`].

pub mod events;
pub mod runtime;

pub use events::CatalogEvent;
pub use runtime::{spawn_browser, BrowserCommand, BrowserHandle, BrowserSnapshot};
