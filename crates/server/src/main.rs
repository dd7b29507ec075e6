//! Herodex Server
//!
//! Axum front end over the catalog browser, plus a one-shot terminal
//! browse command.

mod api;

use anyhow::{Context, Result};
use axum::Router;
use clap::{Parser, Subcommand};
use std::{future::Future, net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::{net::TcpListener, sync::watch};
use tracing_subscriber::EnvFilter;

use herodex_core::{
    spawn_browser, BrowserHandle, BrowserSnapshot, Catalog, CatalogConfig, FavoriteSet,
    FavoriteStore, HerodexDb, MarvelSource, MemoryStore, SearchMode,
};

/// Application state
pub struct AppState {
    browser: BrowserHandle,
    /// Flipped to `true` once graceful shutdown begins
    shutdown_tx: watch::Sender<bool>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    fn new(browser: BrowserHandle) -> SharedState {
        let (shutdown_tx, _) = watch::channel(false);
        Arc::new(Self {
            browser,
            shutdown_tx,
        })
    }

    /// Receiver that long-lived responses watch to end themselves
    pub fn stopping(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }
}

#[derive(Parser, Clone)]
#[command(author, version, about = "Herodex - Character Catalog Browser")]
struct Args {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Clone)]
enum CliCommand {
    /// Start the HTTP server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// SQLite file for favorites (defaults to .herodex/herodex.db)
        #[arg(long)]
        db: Option<PathBuf>,
        /// Keep favorites in memory only
        #[arg(long)]
        ephemeral: bool,
    },
    /// Fetch a few pages and print the sections
    Browse {
        /// Search term; browse mode when absent
        #[arg(short, long)]
        query: Option<String>,
        /// Number of pages to load
        #[arg(long, default_value = "1")]
        pages: u32,
        /// Keep favorites in memory only
        #[arg(long)]
        ephemeral: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("herodex_core=info,herodex_server=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(db: Option<PathBuf>, ephemeral: bool) -> Result<Arc<dyn FavoriteStore>> {
    if ephemeral {
        tracing::info!("Favorites kept in memory");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let db = match db {
        Some(path) => HerodexDb::open_at(&path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?,
        None => HerodexDb::open()?,
    };
    Ok(Arc::new(db))
}

async fn start_browser(config: &CatalogConfig, store: Arc<dyn FavoriteStore>) -> Result<BrowserHandle> {
    if !config.api.has_credentials() {
        tracing::warn!("MARVEL_PUBLIC_KEY / MARVEL_PRIVATE_KEY not set; requests will be rejected");
    }

    let source = MarvelSource::new(config.api.clone()).context("Failed to build HTTP client")?;
    Ok(spawn_browser(config, Arc::new(source), store).await)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

/// Serve until `signal` resolves, then end open SSE streams, drain
/// connections and flush favorites
async fn serve<F>(listener: TcpListener, state: SharedState, signal: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = Router::new()
        .nest("/api/v1", api::catalog_routes())
        .with_state(Arc::clone(&state));

    let stopping = Arc::clone(&state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            stopping.shutdown_tx.send_replace(true);
        })
        .await?;

    state.browser.shutdown().await;
    Ok(())
}

async fn run_server(config: CatalogConfig, port: u16, store: Arc<dyn FavoriteStore>) -> Result<()> {
    let browser = start_browser(&config, store).await?;

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    println!("Herodex Server running at http://{}", addr);
    println!("   Catalog:    /api/v1/catalog, /catalog/more");
    println!("   Search:     /api/v1/search (POST, DELETE)");
    println!("   Favorites:  /api/v1/favorites, /favorites/:id/toggle");
    println!("   Detail:     /api/v1/characters/:id, /characters/:id/comics");
    println!("   Events:     /api/v1/events (SSE)");

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    serve(listener, AppState::new(browser), shutdown_signal()).await
}

/// Wait for the next published snapshot that is idle and satisfies `done`
async fn settle<F>(rx: &mut watch::Receiver<BrowserSnapshot>, done: F) -> Result<BrowserSnapshot>
where
    F: Fn(&BrowserSnapshot) -> bool,
{
    loop {
        rx.changed().await.context("Catalog browser stopped")?;
        let snapshot = rx.borrow_and_update().clone();
        if !snapshot.loading && done(&snapshot) {
            return Ok(snapshot);
        }
    }
}

async fn run_browse(
    config: CatalogConfig,
    query: Option<String>,
    pages: u32,
    store: Arc<dyn FavoriteStore>,
) -> Result<()> {
    let browser = start_browser(&config, store).await?;
    let mut rx = browser.watch();

    let mut snapshot = settle(&mut rx, |_| true).await?;

    if let Some(query) = query {
        if query.chars().count() < config.min_query_len {
            anyhow::bail!(
                "Search term must be at least {} characters",
                config.min_query_len
            );
        }
        let _ = rx.borrow_and_update();
        browser.input(query.clone()).await?;
        let target = SearchMode::Search(query);
        snapshot = settle(&mut rx, |s| s.mode == target).await?;
    }

    for _ in 1..pages {
        if snapshot.last_error.is_some() {
            break;
        }
        let _ = rx.borrow_and_update();
        browser.load_more().await?;
        snapshot = settle(&mut rx, |_| true).await?;
    }

    print!("{}", render_sections(&snapshot.catalog, &snapshot.favorites));
    if let Some(reason) = &snapshot.last_error {
        eprintln!("Fetch failed: {}", reason);
    }

    browser.shutdown().await;
    Ok(())
}

/// Plain-text rendering: one header per section, favorites starred
fn render_sections(catalog: &Catalog, favorites: &FavoriteSet) -> String {
    let mut out = String::new();
    for section in catalog.sections() {
        out.push_str(&format!("== {} ==\n", section.title));
        for character in &section.characters {
            let star = if favorites.contains(&character.id) { " *" } else { "" };
            out.push_str(&format!("  {} ({}){}\n", character.name, character.id, star));
        }
    }
    out
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = Args::parse();
    let config = CatalogConfig::from_env()?;

    match args.command.unwrap_or(CliCommand::Serve {
        port: 8080,
        db: None,
        ephemeral: false,
    }) {
        CliCommand::Serve {
            port,
            db,
            ephemeral,
        } => run_server(config, port, open_store(db, ephemeral)?).await,
        CliCommand::Browse {
            query,
            pages,
            ephemeral,
        } => run_browse(config, query, pages, open_store(None, ephemeral)?).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herodex_core::catalog::{merge, Character, Thumbnail};
    use herodex_core::ApiConfig;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    fn character(id: u64, name: &str) -> Character {
        Character {
            id,
            name: name.to_string(),
            thumbnail: Thumbnail {
                path: "http://i.annihil.us/u/prod/marvel/i/mg/x".to_string(),
                extension: "jpg".to_string(),
            },
            description: None,
        }
    }

    #[test]
    fn test_render_sections_marks_favorites() {
        let catalog = merge(
            &Catalog::new(),
            vec![character(2, "Hulk"), character(1, "Iron Man"), character(3, "Invisible Woman")],
            None,
        );
        let favorites: FavoriteSet = [1].into_iter().collect();

        assert_eq!(
            render_sections(&catalog, &favorites),
            "== H ==\n  Hulk (2)\n== I ==\n  Invisible Woman (3)\n  Iron Man (1) *\n"
        );
    }

    #[test]
    fn test_cli_parses_browse() {
        let args = Args::parse_from(["herodex", "browse", "--query", "Spider", "--pages", "2"]);
        match args.command {
            Some(CliCommand::Browse { query, pages, ephemeral }) => {
                assert_eq!(query.as_deref(), Some("Spider"));
                assert_eq!(pages, 2);
                assert!(!ephemeral);
            }
            _ => panic!("expected browse"),
        }
    }

    #[tokio::test]
    async fn test_shutdown_ends_open_event_streams() {
        let config = CatalogConfig {
            api: ApiConfig {
                base_url: "http://127.0.0.1:9".to_string(),
                ..ApiConfig::default()
            },
            ..CatalogConfig::default()
        };
        let browser = start_browser(&config, Arc::new(MemoryStore::new()))
            .await
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(listener, AppState::new(browser), async move {
            let _ = stop_rx.await;
        }));

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"GET /api/v1/events HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut head = [0u8; 1024];
        let n = client.read(&mut head).await.unwrap();
        assert!(String::from_utf8_lossy(&head[..n]).contains("text/event-stream"));

        stop_tx.send(()).unwrap();
        let finished = tokio::time::timeout(Duration::from_secs(3), server).await;
        assert!(finished.is_ok(), "server kept running with an event stream open");
        finished.unwrap().unwrap().unwrap();
    }
}
