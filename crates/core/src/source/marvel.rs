//! # Marvel Source
//!
//! `CatalogSource` backed by the public Marvel API. Every request is signed
//! with `ts`, `apikey` and `hash = md5(ts + private_key + public_key)`.

use async_trait::async_trait;
use md5::{Digest, Md5};
use serde::Deserialize;

use super::{CatalogSource, PageRequest};
use crate::catalog::{CharacterId, RawRecord};
use crate::config::ApiConfig;
use crate::error::FetchError;

#[derive(Deserialize)]
struct Envelope {
    data: EnvelopeData,
}

#[derive(Deserialize)]
struct EnvelopeData {
    #[serde(default)]
    results: Vec<RawRecord>,
}

/// Error body returned on non-2xx responses. The API uses `message` for
/// some failures and `status` for others.
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

/// Request signature for the given timestamp
pub fn auth_hash(ts: &str, private_key: &str, public_key: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(ts.as_bytes());
    hasher.update(private_key.as_bytes());
    hasher.update(public_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Query parameters for a character page, excluding the signature
pub fn page_query(request: &PageRequest) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("limit", request.limit.to_string()),
        ("offset", request.offset.to_string()),
    ];
    if let Some(prefix) = &request.name_starts_with {
        query.push(("nameStartsWith", prefix.clone()));
    }
    query
}

/// HTTP client for the Marvel character API
pub struct MarvelSource {
    client: reqwest::Client,
    config: ApiConfig,
}

impl MarvelSource {
    pub fn new(config: ApiConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent("herodex/0.1")
            .timeout(config.timeout())
            .build()?;

        if !config.has_credentials() {
            tracing::warn!("Marvel API keys are not configured; requests will be rejected");
        }

        Ok(Self { client, config })
    }

    fn signature(&self) -> Vec<(&'static str, String)> {
        let ts = chrono::Utc::now().timestamp_millis().to_string();
        let hash = auth_hash(&ts, &self.config.private_key, &self.config.public_key);
        vec![
            ("ts", ts),
            ("apikey", self.config.public_key.clone()),
            ("hash", hash),
        ]
    }

    async fn get_results(
        &self,
        path: &str,
        query: Vec<(&'static str, String)>,
    ) -> Result<Vec<RawRecord>, FetchError> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);

        let response = self
            .client
            .get(&url)
            .query(&self.signature())
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message.or(b.status))
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
            return Err(FetchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope = response.json().await?;
        Ok(envelope.data.results)
    }
}

#[async_trait]
impl CatalogSource for MarvelSource {
    #[tracing::instrument(skip(self), fields(offset = request.offset, filter = ?request.name_starts_with))]
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<RawRecord>, FetchError> {
        let results = self.get_results("characters", page_query(request)).await?;
        tracing::debug!(count = results.len(), "Fetched character page");
        Ok(results)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_comics(
        &self,
        character_id: CharacterId,
        limit: u32,
    ) -> Result<Vec<RawRecord>, FetchError> {
        let path = format!("characters/{}/comics", character_id);
        self.get_results(&path, vec![("limit", limit.to_string())])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_hash_matches_documented_example() {
        // ts=1, privateKey=abcd, publicKey=1234
        assert_eq!(auth_hash("1", "abcd", "1234"), "ffd275c5130566a2916217b101f26150");
    }

    #[test]
    fn test_page_query() {
        let browse = PageRequest {
            offset: 30,
            limit: 15,
            name_starts_with: None,
        };
        assert_eq!(
            page_query(&browse),
            vec![("limit", "15".to_string()), ("offset", "30".to_string())]
        );

        let search = PageRequest {
            name_starts_with: Some("Iro".to_string()),
            ..browse
        };
        assert!(page_query(&search).contains(&("nameStartsWith", "Iro".to_string())));
    }

    #[test]
    fn test_envelope_decoding() {
        let body = r#"{"code":200,"status":"Ok","data":{"offset":0,"limit":15,"total":1,"count":1,"results":[{"id":1,"name":"Thor"}]}}"#;
        let envelope: Envelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.data.results.len(), 1);

        let error = r#"{"code":"InvalidCredentials","message":"The passed API key is invalid."}"#;
        let parsed: ErrorBody = serde_json::from_str(error).unwrap();
        assert_eq!(parsed.message.as_deref(), Some("The passed API key is invalid."));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let config = ApiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            public_key: "pub".to_string(),
            private_key: "priv".to_string(),
            timeout_secs: 2,
        };
        let source = MarvelSource::new(config).unwrap();
        let request = PageRequest {
            offset: 0,
            limit: 15,
            name_starts_with: None,
        };

        let err = source.fetch_page(&request).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
