//! # Catalog API
//!
//! Thin HTTP surface over a running [`BrowserHandle`]. Every handler either
//! reads the latest snapshot or forwards a command; none of them touch
//! catalog state directly.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, time::Duration};
use tokio::sync::broadcast;

use herodex_core::{BrowserSnapshot, CharacterDetail, CharacterId, Comic, FavoriteSet};

use crate::SharedState;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    /// Full current text of the search box
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub id: CharacterId,
    pub favorite: bool,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiResponse>)>;

fn failure(status: StatusCode, error: impl std::fmt::Display) -> (StatusCode, Json<ApiResponse>) {
    (
        status,
        Json(ApiResponse {
            success: false,
            message: error.to_string(),
        }),
    )
}

fn accepted(result: anyhow::Result<()>, message: &str) -> ApiResult<ApiResponse> {
    result
        .map(|_| {
            Json(ApiResponse {
                success: true,
                message: message.to_string(),
            })
        })
        .map_err(|e| failure(StatusCode::SERVICE_UNAVAILABLE, e))
}

pub fn catalog_routes() -> Router<SharedState> {
    Router::new()
        .route("/catalog", get(get_catalog))
        .route("/catalog/more", post(load_more))
        .route("/search", post(search).delete(clear_search))
        .route("/favorites", get(get_favorites))
        .route("/favorites/:id/toggle", post(toggle_favorite))
        .route("/characters/:id", get(get_character))
        .route("/characters/:id/comics", get(get_comics))
        .route("/events", get(events))
}

/// Current catalog, favorites, mode and loading flag
async fn get_catalog(State(state): State<SharedState>) -> Json<BrowserSnapshot> {
    Json(state.browser.snapshot())
}

/// Request the next page, or the failed page again
async fn load_more(State(state): State<SharedState>) -> ApiResult<ApiResponse> {
    accepted(state.browser.load_more().await, "Page requested")
}

async fn search(
    State(state): State<SharedState>,
    Json(req): Json<SearchRequest>,
) -> ApiResult<ApiResponse> {
    accepted(state.browser.input(req.query).await, "Query received")
}

async fn clear_search(State(state): State<SharedState>) -> ApiResult<ApiResponse> {
    accepted(state.browser.clear_search().await, "Search cleared")
}

async fn get_favorites(State(state): State<SharedState>) -> Json<FavoriteSet> {
    Json(FavoriteSet::clone(&state.browser.snapshot().favorites))
}

async fn toggle_favorite(
    State(state): State<SharedState>,
    Path(id): Path<CharacterId>,
) -> ApiResult<ToggleResponse> {
    let favorite = state
        .browser
        .toggle_favorite(id)
        .await
        .map_err(|e| failure(StatusCode::SERVICE_UNAVAILABLE, e))?;

    Ok(Json(ToggleResponse { id, favorite }))
}

/// Detail view of a character in the current catalog
async fn get_character(
    State(state): State<SharedState>,
    Path(id): Path<CharacterId>,
) -> ApiResult<CharacterDetail> {
    state.browser.snapshot().detail(id).map(Json).ok_or_else(|| {
        failure(
            StatusCode::NOT_FOUND,
            format!("Character {} is not in the catalog", id),
        )
    })
}

/// Comics for the detail view; fetched on demand, never cached
async fn get_comics(
    State(state): State<SharedState>,
    Path(id): Path<CharacterId>,
) -> ApiResult<Vec<Comic>> {
    state
        .browser
        .comics(id)
        .await
        .map(Json)
        .map_err(|e| {
            tracing::warn!(id, error = %e, "Comics fetch failed");
            failure(StatusCode::BAD_GATEWAY, e)
        })
}

/// SSE feed of catalog events, with a heartbeat comment every 15 seconds.
/// The stream ends when the server starts shutting down.
async fn events(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.browser.subscribe();
    let stopping = state.stopping();

    let stream = stream::unfold((rx, stopping), |(mut rx, mut stopping)| async move {
        loop {
            let received = tokio::select! {
                _ = stopping.wait_for(|stop| *stop) => return None,
                received = tokio::time::timeout(Duration::from_secs(15), rx.recv()) => received,
            };

            match received {
                Ok(Ok(event)) => {
                    let json = serde_json::to_string(&event).unwrap_or_default();
                    let sse = Event::default().event(event.kind()).data(json);
                    return Some((Ok(sse), (rx, stopping)));
                }
                Ok(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                    // The next catalog event carries the whole catalog
                    tracing::debug!(skipped, "SSE subscriber lagged");
                }
                Ok(Err(broadcast::error::RecvError::Closed)) => return None,
                Err(_) => {
                    let heartbeat = Event::default().comment("heartbeat");
                    return Some((Ok(heartbeat), (rx, stopping)));
                }
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
