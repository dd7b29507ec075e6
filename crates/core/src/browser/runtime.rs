//! # Browser Runtime
//!
//! One task owns the aggregator, the search coordinator and the favorites
//! controller. Commands, page completions and the debounce deadline are
//! multiplexed on that task, so every state change happens on a single
//! timeline.
//!
//! ```text
//! BrowserHandle ── BrowserCommand ──▶ │
//!                                     ├── tokio::spawn(fetch) ──▶ CatalogSource
//!                                     │ ◀── PageCompletion ───────┘
//!                                     ├── debounce deadline
//! watch<BrowserSnapshot> ◀────────────┤
//! broadcast<CatalogEvent> ◀───────────┘
//! ```

use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::events::CatalogEvent;
use crate::catalog::{
    request_page, validate_records, Aggregator, Catalog, CharacterDetail, CharacterId, Comic,
    PageOutcome, PageTicket, RawRecord,
};
use crate::config::CatalogConfig;
use crate::error::FetchError;
use crate::favorites::{FavoriteSet, FavoriteStore, FavoritesController};
use crate::search::{wait_until, ModeTransition, QueryState, SearchCoordinator, SearchMode};
use crate::source::CatalogSource;

/// Commands accepted by the browser task
#[derive(Debug)]
pub enum BrowserCommand {
    /// A keystroke: the full current text of the search box
    Input(String),
    /// Leave search immediately
    ClearSearch,
    /// Next page (or the failed page again)
    LoadMore,
    /// Flip a favorite; replies with the new membership
    ToggleFavorite {
        id: CharacterId,
        reply: oneshot::Sender<bool>,
    },
    /// Flush favorites and stop
    Shutdown,
}

/// Everything a consumer needs to render the current state
#[derive(Debug, Clone, Serialize)]
pub struct BrowserSnapshot {
    pub catalog: Arc<Catalog>,
    pub favorites: Arc<FavoriteSet>,
    pub loading: bool,
    pub mode: SearchMode,
    pub query: QueryState,
    pub offset: u32,
    pub last_error: Option<String>,
}

impl BrowserSnapshot {
    /// Detail view of a character currently in the catalog
    pub fn detail(&self, id: CharacterId) -> Option<CharacterDetail> {
        let character = self.catalog.get(id)?;
        Some(CharacterDetail::new(character, self.favorites.contains(&id)))
    }
}

struct PageCompletion {
    ticket: PageTicket,
    result: Result<Vec<RawRecord>, FetchError>,
}

/// Client side of a running browser
pub struct BrowserHandle {
    command_tx: mpsc::Sender<BrowserCommand>,
    snapshot_rx: watch::Receiver<BrowserSnapshot>,
    event_tx: broadcast::Sender<CatalogEvent>,
    source: Arc<dyn CatalogSource>,
    comics_limit: u32,
    /// Handle to the spawned task
    pub task_handle: JoinHandle<()>,
}

impl BrowserHandle {
    async fn send(&self, command: BrowserCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| anyhow::anyhow!("Catalog browser has stopped"))
    }

    /// Report the current text of the search input
    pub async fn input(&self, text: impl Into<String>) -> Result<()> {
        self.send(BrowserCommand::Input(text.into())).await
    }

    pub async fn clear_search(&self) -> Result<()> {
        self.send(BrowserCommand::ClearSearch).await
    }

    /// Request the next page; ignored while a fetch is in flight
    pub async fn load_more(&self) -> Result<()> {
        self.send(BrowserCommand::LoadMore).await
    }

    /// Re-request the page whose fetch failed
    pub async fn retry(&self) -> Result<()> {
        self.load_more().await
    }

    /// Flip a favorite; returns whether it is now a favorite
    pub async fn toggle_favorite(&self, id: CharacterId) -> Result<bool> {
        let (reply, response) = oneshot::channel();
        self.send(BrowserCommand::ToggleFavorite { id, reply }).await?;
        response.await.context("Catalog browser dropped the reply")
    }

    /// Latest published state
    pub fn snapshot(&self) -> BrowserSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Receiver that is notified on every state change
    pub fn watch(&self) -> watch::Receiver<BrowserSnapshot> {
        self.snapshot_rx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.event_tx.subscribe()
    }

    /// Comics for a character's detail view, straight from the source
    pub async fn comics(&self, id: CharacterId) -> Result<Vec<Comic>, FetchError> {
        let records = self.source.fetch_comics(id, self.comics_limit).await?;
        Ok(validate_records(&records, Comic::from_record))
    }

    /// Ask the task to flush favorites and stop; resolves once it has
    pub async fn shutdown(&self) {
        let _ = self.command_tx.send(BrowserCommand::Shutdown).await;
        // The command receiver drops when the task returns
        self.command_tx.closed().await;
    }
}

struct CatalogBrowser {
    source: Arc<dyn CatalogSource>,
    aggregator: Aggregator,
    search: SearchCoordinator,
    favorites: FavoritesController,
    last_error: Option<String>,
    published_loading: bool,
    page_tx: mpsc::Sender<PageCompletion>,
    event_tx: broadcast::Sender<CatalogEvent>,
    snapshot_tx: watch::Sender<BrowserSnapshot>,
}

/// Hydrate favorites, spawn the browser task and issue the first browse page
pub async fn spawn_browser(
    config: &CatalogConfig,
    source: Arc<dyn CatalogSource>,
    store: Arc<dyn FavoriteStore>,
) -> BrowserHandle {
    let favorites = FavoritesController::hydrate(store, config.favorites_key.clone()).await;
    let aggregator = Aggregator::new(config.page_size);
    let search = SearchCoordinator::new(config.debounce(), config.min_query_len);

    let (command_tx, command_rx) = mpsc::channel(64);
    let (page_tx, page_rx) = mpsc::channel(16);
    let (event_tx, _) = broadcast::channel(256);
    let (snapshot_tx, snapshot_rx) = watch::channel(BrowserSnapshot {
        catalog: aggregator.catalog(),
        favorites: favorites.favorites(),
        loading: false,
        mode: search.mode().clone(),
        query: search.query().clone(),
        offset: aggregator.offset(),
        last_error: None,
    });

    let browser = CatalogBrowser {
        source: Arc::clone(&source),
        aggregator,
        search,
        favorites,
        last_error: None,
        published_loading: false,
        page_tx,
        event_tx: event_tx.clone(),
        snapshot_tx,
    };

    let task_handle = tokio::spawn(browser.run(command_rx, page_rx));

    BrowserHandle {
        command_tx,
        snapshot_rx,
        event_tx,
        source,
        comics_limit: config.comics_limit,
        task_handle,
    }
}

impl CatalogBrowser {
    async fn run(
        mut self,
        mut command_rx: mpsc::Receiver<BrowserCommand>,
        mut page_rx: mpsc::Receiver<PageCompletion>,
    ) {
        self.emit(CatalogEvent::FavoritesChanged {
            favorites: self.favorites.favorites(),
        });
        let ticket = self.aggregator.request_current();
        self.dispatch(ticket);
        self.publish();

        loop {
            let deadline = self.search.deadline();
            tokio::select! {
                command = command_rx.recv() => match command {
                    Some(BrowserCommand::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                Some(completion) = page_rx.recv() => self.on_page(completion),
                _ = wait_until(deadline) => {
                    if let Some(transition) = self.search.settle(Instant::now()) {
                        self.enter(transition);
                    }
                }
            }
            self.publish();
        }

        self.favorites.flush().await;
        tracing::info!("Catalog browser stopped");
    }

    fn handle(&mut self, command: BrowserCommand) {
        match command {
            BrowserCommand::Input(text) => self.search.input(text, Instant::now()),
            BrowserCommand::ClearSearch => {
                if let Some(transition) = self.search.clear() {
                    self.enter(transition);
                }
            }
            BrowserCommand::LoadMore => {
                if let Some(ticket) = self.aggregator.load_more() {
                    self.dispatch(ticket);
                }
            }
            BrowserCommand::ToggleFavorite { id, reply } => {
                let now_favorite = self.favorites.toggle(id);
                let _ = reply.send(now_favorite);
                self.emit(CatalogEvent::FavoritesChanged {
                    favorites: self.favorites.favorites(),
                });
            }
            BrowserCommand::Shutdown => {}
        }
    }

    /// Reset synchronously, publish the empty catalog, then fetch
    fn enter(&mut self, transition: ModeTransition) {
        match transition {
            ModeTransition::EnterSearch(term) => {
                tracing::info!(term = %term, "Entering search mode");
                self.aggregator.reset_for_search(term);
            }
            ModeTransition::EnterBrowse => {
                tracing::info!("Entering browse mode");
                self.aggregator.reset_for_browse();
            }
        }
        self.last_error = None;
        self.emit(CatalogEvent::CatalogChanged {
            catalog: self.aggregator.catalog(),
        });

        let ticket = self.aggregator.request_current();
        self.dispatch(ticket);
    }

    fn dispatch(&self, ticket: PageTicket) {
        tracing::debug!(offset = ticket.offset, filter = ?ticket.filter, "Requesting page");
        let source = Arc::clone(&self.source);
        let page_tx = self.page_tx.clone();

        tokio::spawn(async move {
            let result = request_page(source.as_ref(), &ticket).await;
            let _ = page_tx.send(PageCompletion { ticket, result }).await;
        });
    }

    fn on_page(&mut self, completion: PageCompletion) {
        match self.aggregator.apply(&completion.ticket, completion.result) {
            PageOutcome::Applied(catalog) => {
                self.last_error = None;
                self.emit(CatalogEvent::CatalogChanged { catalog });
            }
            PageOutcome::Failed(e) => {
                let reason = e.to_string();
                self.last_error = Some(reason.clone());
                self.emit(CatalogEvent::FetchFailed { reason });
            }
            PageOutcome::Discarded => {}
        }
    }

    fn emit(&self, event: CatalogEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    fn publish(&mut self) {
        let loading = self.aggregator.is_loading();
        if loading != self.published_loading {
            self.published_loading = loading;
            self.emit(CatalogEvent::LoadingChanged { loading });
        }

        self.snapshot_tx.send_replace(BrowserSnapshot {
            catalog: self.aggregator.catalog(),
            favorites: self.favorites.favorites(),
            loading,
            mode: self.search.mode().clone(),
            query: self.search.query().clone(),
            offset: self.aggregator.offset(),
            last_error: self.last_error.clone(),
        });
    }
}
