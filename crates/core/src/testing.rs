//! Test doubles for the source and store seams.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::catalog::{CharacterId, RawRecord};
use crate::error::{FetchError, PersistenceError};
use crate::favorites::FavoriteStore;
use crate::source::{CatalogSource, PageRequest};

/// A well-formed character record
pub fn record(id: CharacterId, name: &str) -> RawRecord {
    serde_json::json!({
        "id": id,
        "name": name,
        "description": "",
        "thumbnail": {"path": format!("http://i.annihil.us/u/prod/marvel/i/mg/{}", id), "extension": "jpg"}
    })
}

/// Replays queued pages in order and records every request. When gated,
/// each fetch waits for a permit from [`ScriptedSource::release`].
pub struct ScriptedSource {
    pages: Mutex<VecDeque<Result<Vec<RawRecord>, FetchError>>>,
    comics: Mutex<Vec<RawRecord>>,
    requests: Mutex<Vec<PageRequest>>,
    gate: Option<Semaphore>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            pages: Mutex::new(VecDeque::new()),
            comics: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    pub fn push_page(&self, page: Result<Vec<RawRecord>, FetchError>) {
        self.pages.lock().unwrap().push_back(page);
    }

    pub fn set_comics(&self, comics: Vec<RawRecord>) {
        *self.comics.lock().unwrap() = comics;
    }

    /// Let `n` pending or future fetches complete
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Poll until at least `n` requests have been made. Sleeps rather than
    /// yields so a paused clock can still auto-advance to pending deadlines.
    pub async fn wait_for_requests(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.requests.lock().unwrap().len() < n {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("timed out waiting for requests");
    }
}

#[async_trait]
impl CatalogSource for ScriptedSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<RawRecord>, FetchError> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .expect("gate closed")
                .forget();
        }

        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_comics(
        &self,
        _character_id: CharacterId,
        limit: u32,
    ) -> Result<Vec<RawRecord>, FetchError> {
        let comics = self.comics.lock().unwrap();
        Ok(comics.iter().take(limit as usize).cloned().collect())
    }
}

/// Records every write; optionally fails every call
pub struct RecordingStore {
    writes: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl FavoriteStore for RecordingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        if self.fail {
            return Err(PersistenceError::Read {
                key: key.to_string(),
                reason: "disk unavailable".to_string(),
            });
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.writes
            .lock()
            .unwrap()
            .push((key.to_string(), value.to_string()));

        if self.fail {
            return Err(PersistenceError::Write {
                key: key.to_string(),
                reason: "disk unavailable".to_string(),
            });
        }
        Ok(())
    }
}
