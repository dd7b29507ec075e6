//! # Search
//!
//! Debounced query input and the Browse/Search mode machine.

pub mod coordinator;
pub mod debounce;

pub use coordinator::{ModeTransition, QueryState, SearchCoordinator, SearchMode};
pub use debounce::{wait_until, Debouncer};
