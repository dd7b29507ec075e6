//! # Catalog
//!
//! Validated records, the pure sectioning merge, and the paging aggregator.
//!
//! ## Flow
//!
//! ```text
//! PageTicket → CatalogSource → raw records → validate → merge → Arc<Catalog>
//! ```

pub mod aggregator;
pub mod character;
pub mod sections;

pub use aggregator::{request_page, Aggregator, PageOutcome, PageTicket, PagingCursor};
pub use character::{
    validate_records, Character, CharacterDetail, CharacterId, Comic, RawRecord, Thumbnail,
    DESCRIPTION_PREVIEW_LEN,
};
pub use sections::{collate, merge, section_key, Catalog, Section};
