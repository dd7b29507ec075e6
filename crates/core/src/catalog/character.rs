//! # Character Records
//!
//! Validated shapes for what the remote source returns. Raw records are kept
//! as JSON values until validation so a single bad record can be dropped
//! without failing the whole page.

use serde::{Deserialize, Serialize};

use crate::error::MalformedRecordError;

/// Identity assigned by the remote source
pub type CharacterId = u64;

/// An unvalidated record as returned by the remote source
pub type RawRecord = serde_json::Value;

/// Image locator; combined into a URL by consumers, never by the merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub path: String,
    pub extension: String,
}

impl Thumbnail {
    /// `path.extension`
    pub fn url(&self) -> String {
        format!("{}.{}", self.path, self.extension)
    }

    /// Same as [`Thumbnail::url`] but with a plain `http:` scheme upgraded to `https:`
    pub fn secure_url(&self) -> String {
        match self.path.strip_prefix("http:") {
            Some(rest) => format!("https:{}.{}", rest, self.extension),
            None => self.url(),
        }
    }
}

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub thumbnail: Thumbnail,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Chars of description shown on the detail view
pub const DESCRIPTION_PREVIEW_LEN: usize = 100;

/// What a detail view shows for one character
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacterDetail {
    pub id: CharacterId,
    pub name: String,
    /// Thumbnail URL with the scheme upgraded to https
    pub thumbnail_url: String,
    pub description: Option<String>,
    pub favorite: bool,
}

impl CharacterDetail {
    pub fn new(character: &Character, favorite: bool) -> Self {
        Self {
            id: character.id,
            name: character.name.clone(),
            thumbnail_url: character.thumbnail.secure_url(),
            description: character.description_preview(DESCRIPTION_PREVIEW_LEN),
            favorite,
        }
    }
}

/// A comic listed on a character's detail view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comic {
    pub id: u64,
    pub title: Option<String>,
    pub resource_uri: String,
    pub thumbnail: Option<Thumbnail>,
}

#[derive(Deserialize)]
struct ThumbnailRecord {
    path: Option<String>,
    extension: Option<String>,
}

#[derive(Deserialize)]
struct CharacterRecord {
    id: Option<u64>,
    name: Option<String>,
    description: Option<String>,
    thumbnail: Option<ThumbnailRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComicRecord {
    id: Option<u64>,
    title: Option<String>,
    #[serde(rename = "resourceURI")]
    resource_uri: Option<String>,
    thumbnail: Option<ThumbnailRecord>,
}

fn record_id(record: &RawRecord) -> Option<u64> {
    record.get("id").and_then(|id| id.as_u64())
}

impl ThumbnailRecord {
    fn validate(self) -> Option<Thumbnail> {
        match (self.path, self.extension) {
            (Some(path), Some(extension)) if !path.is_empty() && !extension.is_empty() => {
                Some(Thumbnail { path, extension })
            }
            _ => None,
        }
    }
}

impl Character {
    /// Validate a raw record. Required: `id`, non-empty `name`,
    /// `thumbnail.path` and `thumbnail.extension`. The name is stored trimmed.
    pub fn from_record(record: &RawRecord) -> Result<Self, MalformedRecordError> {
        let parsed: CharacterRecord = serde_json::from_value(record.clone())
            .map_err(|e| MalformedRecordError::new(record_id(record), e.to_string()))?;

        let id = parsed
            .id
            .ok_or_else(|| MalformedRecordError::new(None, "missing id"))?;

        let name = parsed
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| MalformedRecordError::new(Some(id), "missing name"))?;

        let thumbnail = parsed
            .thumbnail
            .and_then(ThumbnailRecord::validate)
            .ok_or_else(|| MalformedRecordError::new(Some(id), "missing thumbnail path or extension"))?;

        Ok(Self {
            id,
            name,
            thumbnail,
            description: parsed.description.filter(|d| !d.trim().is_empty()),
        })
    }

    /// Description cut to `limit` chars with a trailing ellipsis, if any
    pub fn description_preview(&self, limit: usize) -> Option<String> {
        let description = self.description.as_deref()?;
        if description.chars().count() <= limit {
            return Some(description.to_string());
        }
        let cut: String = description.chars().take(limit).collect();
        Some(format!("{}...", cut))
    }
}

impl Comic {
    /// Validate a raw comic record. Required: `id` and `resourceURI`.
    pub fn from_record(record: &RawRecord) -> Result<Self, MalformedRecordError> {
        let parsed: ComicRecord = serde_json::from_value(record.clone())
            .map_err(|e| MalformedRecordError::new(record_id(record), e.to_string()))?;

        let id = parsed
            .id
            .ok_or_else(|| MalformedRecordError::new(None, "missing id"))?;
        let resource_uri = parsed
            .resource_uri
            .ok_or_else(|| MalformedRecordError::new(Some(id), "missing resourceURI"))?;

        Ok(Self {
            id,
            title: parsed.title.filter(|t| !t.trim().is_empty()),
            resource_uri,
            thumbnail: parsed.thumbnail.and_then(ThumbnailRecord::validate),
        })
    }
}

/// Validate a page, dropping (and logging) records that fail validation
pub fn validate_records<T>(
    records: &[RawRecord],
    validate: impl Fn(&RawRecord) -> Result<T, MalformedRecordError>,
) -> Vec<T> {
    records
        .iter()
        .filter_map(|record| match validate(record) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(id = ?e.id, reason = %e.reason, "Dropping malformed record");
                None
            }
        })
        .collect()
}
