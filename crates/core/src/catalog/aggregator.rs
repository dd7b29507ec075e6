//! # Catalog Aggregator
//!
//! Owns the published catalog and the paging cursor. Every outbound request
//! is described by a [`PageTicket`]; a completion is applied only if its
//! ticket is still the one in flight, so pages from a superseded mode or
//! offset never reach the catalog.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::character::{validate_records, Character, RawRecord};
use super::sections::{merge, Catalog};
use crate::error::FetchError;
use crate::source::{CatalogSource, PageRequest};

/// Offset of the most recently requested page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingCursor {
    pub offset: u32,
    pub page_size: u32,
}

impl PagingCursor {
    pub fn new(page_size: u32) -> Self {
        Self {
            offset: 0,
            page_size,
        }
    }

    pub fn advance(&mut self) {
        self.offset += self.page_size;
    }

    pub fn reset(&mut self) {
        self.offset = 0;
    }
}

/// Identifies one outbound page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTicket {
    /// Reset count at the time of the request
    pub generation: u64,
    pub offset: u32,
    pub limit: u32,
    pub filter: Option<String>,
}

impl PageTicket {
    pub fn request(&self) -> PageRequest {
        PageRequest {
            offset: self.offset,
            limit: self.limit,
            name_starts_with: self.filter.clone(),
        }
    }
}

/// Result of applying a completion
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// Merged; the new catalog has been published
    Applied(Arc<Catalog>),
    /// The fetch failed; the catalog is unchanged
    Failed(FetchError),
    /// The ticket was superseded; nothing changed
    Discarded,
}

/// Paging state plus the accumulated catalog
#[derive(Debug)]
pub struct Aggregator {
    catalog: Arc<Catalog>,
    cursor: PagingCursor,
    filter: Option<String>,
    generation: u64,
    in_flight: Option<PageTicket>,
    failed: Option<PageTicket>,
}

/// Ask the source for the page a ticket describes
pub async fn request_page(
    source: &dyn CatalogSource,
    ticket: &PageTicket,
) -> Result<Vec<RawRecord>, FetchError> {
    source.fetch_page(&ticket.request()).await
}

impl Aggregator {
    pub fn new(page_size: u32) -> Self {
        Self {
            catalog: Arc::new(Catalog::new()),
            cursor: PagingCursor::new(page_size),
            filter: None,
            generation: 0,
            in_flight: None,
            failed: None,
        }
    }

    /// Current published catalog
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    pub fn offset(&self) -> u32 {
        self.cursor.offset
    }

    /// Active search filter, `None` in browse mode
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    fn ticket(&self) -> PageTicket {
        PageTicket {
            generation: self.generation,
            offset: self.cursor.offset,
            limit: self.cursor.page_size,
            filter: self.filter.clone(),
        }
    }

    /// Issue a fetch for the current offset and mode, superseding whatever
    /// is in flight
    pub fn request_current(&mut self) -> PageTicket {
        let ticket = self.ticket();
        self.failed = None;
        self.in_flight = Some(ticket.clone());
        ticket
    }

    /// Next page, or `None` while a fetch is in flight. After a failure the
    /// failed page is requested again instead of advancing.
    pub fn load_more(&mut self) -> Option<PageTicket> {
        if self.in_flight.is_some() {
            tracing::debug!(offset = self.cursor.offset, "Load more suppressed; fetch in flight");
            return None;
        }

        if let Some(failed) = self.failed.take() {
            self.cursor.offset = failed.offset;
            self.in_flight = Some(failed.clone());
            return Some(failed);
        }

        self.cursor.advance();
        Some(self.request_current())
    }

    fn reset(&mut self, filter: Option<String>) {
        self.catalog = Arc::new(Catalog::new());
        self.cursor.reset();
        self.filter = filter;
        self.generation += 1;
        self.in_flight = None;
        self.failed = None;
    }

    /// Clear the catalog and rewind to offset 0 for a new search term
    pub fn reset_for_search(&mut self, filter: impl Into<String>) {
        self.reset(Some(filter.into()));
    }

    /// Clear the catalog and rewind to offset 0 for unfiltered browsing
    pub fn reset_for_browse(&mut self) {
        self.reset(None);
    }

    /// Apply a completed fetch
    pub fn apply(
        &mut self,
        ticket: &PageTicket,
        result: Result<Vec<RawRecord>, FetchError>,
    ) -> PageOutcome {
        if self.in_flight.as_ref() != Some(ticket) {
            tracing::debug!(
                offset = ticket.offset,
                generation = ticket.generation,
                current_generation = self.generation,
                "Discarding stale page"
            );
            return PageOutcome::Discarded;
        }
        self.in_flight = None;

        match result {
            Ok(records) => {
                let characters = validate_records(&records, Character::from_record);
                let merged = merge(&self.catalog, characters, ticket.filter.as_deref());
                tracing::info!(
                    offset = ticket.offset,
                    received = records.len(),
                    total = merged.len(),
                    "Page applied"
                );
                self.catalog = Arc::new(merged);
                PageOutcome::Applied(self.catalog())
            }
            Err(e) => {
                tracing::warn!(offset = ticket.offset, error = %e, "Page fetch failed");
                // Roll back so the next load_more re-requests this page
                self.cursor.offset = ticket.offset.saturating_sub(self.cursor.page_size);
                self.failed = Some(ticket.clone());
                PageOutcome::Failed(e)
            }
        }
    }
}
