//! # Favorites
//!
//! Persisted favorite marking over the catalog's identity space. Membership
//! never depends on what the catalog currently holds.

pub mod controller;
pub mod store;

pub use controller::{load_favorites, FavoriteSet, FavoritesController};
pub use store::{FavoriteStore, MemoryStore};
