//! Attribution ledger: who took each photo currently on the site.
//!
//! The ledger is a JSON array with one object per placement. A run only
//! knows about the placements it processed, so new entries are merged into
//! whatever is already on disk:
//!
//! * an entry whose `placement` matches an incoming one is replaced where it
//!   stands (last write wins);
//! * every other entry, including any fields we do not model, is written
//!   back verbatim;
//! * new placements are appended in processing order.
//!
//! A missing or corrupt ledger counts as empty. Losing stale credits is
//! better than refusing to republish the site.

use crate::error::FillError;
use crate::pipeline::provider::PhotoRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// Credit for the photo used by one placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionEntry {
    pub placement: String,
    #[serde(rename = "id")]
    pub photo_id: String,
    /// Public path of the rendition as written into the document.
    #[serde(rename = "file")]
    pub file_path: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(rename = "username", skip_serializing_if = "Option::is_none")]
    pub author_handle: Option<String>,
    #[serde(rename = "url", skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(rename = "source")]
    pub source_name: String,
    pub license: String,
    pub query: String,
}

impl AttributionEntry {
    /// Credit line for `photo` placed at `placement`.
    ///
    /// The title prefers the photographer's description over the
    /// provider's generated alt description.
    pub fn new(
        placement: &str,
        photo: &PhotoRecord,
        file_path: &str,
        query: &str,
        source_name: &str,
        license: &str,
    ) -> Self {
        let title = photo
            .description
            .as_deref()
            .filter(|d| !d.is_empty())
            .or(photo.alt_description.as_deref())
            .unwrap_or("")
            .to_string();
        Self {
            placement: placement.to_string(),
            photo_id: photo.id.clone(),
            file_path: file_path.to_string(),
            title,
            author: photo.author_name.clone(),
            author_handle: photo.author_handle.clone(),
            source_url: photo.page_url.clone(),
            source_name: source_name.to_string(),
            license: license.to_string(),
            query: query.to_string(),
        }
    }
}

fn placement_of(entry: &Value) -> Option<&str> {
    entry.get("placement").and_then(Value::as_str)
}

/// Merge `incoming` into `existing`, keyed by `placement`.
///
/// Entries without a string `placement` cannot be keyed and are kept as-is.
pub fn merge(existing: Vec<Value>, incoming: &[AttributionEntry]) -> Result<Vec<Value>, FillError> {
    let mut merged: Vec<Value> = Vec::with_capacity(existing.len() + incoming.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    let mut upsert = |entry: Value| match placement_of(&entry).map(str::to_string) {
        Some(key) => match index.get(&key) {
            Some(&i) => merged[i] = entry,
            None => {
                index.insert(key, merged.len());
                merged.push(entry);
            }
        },
        None => merged.push(entry),
    };

    for entry in existing {
        upsert(entry);
    }
    for entry in incoming {
        let value = serde_json::to_value(entry).map_err(|e| FillError::Internal(e.to_string()))?;
        upsert(value);
    }
    Ok(merged)
}

/// Read the ledger at `path`; absent, unreadable, or malformed means empty.
pub async fn load(path: &Path) -> Vec<Value> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!("Ignoring unreadable ledger {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    match serde_json::from_str::<Vec<Value>>(&text) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Ignoring malformed ledger {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Pretty-print the merged ledger (2-space indent).
pub fn to_json(entries: &[Value]) -> Result<String, FillError> {
    serde_json::to_string_pretty(entries).map_err(|e| FillError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(placement: &str, id: &str) -> AttributionEntry {
        AttributionEntry {
            placement: placement.into(),
            photo_id: id.into(),
            file_path: format!("/p/images/{placement}-{id}.webp"),
            title: String::new(),
            author: Some("Jane Doe".into()),
            author_handle: Some("jdoe".into()),
            source_url: None,
            source_name: "Unsplash".into(),
            license: "Unsplash License".into(),
            query: "desk".into(),
        }
    }

    #[test]
    fn merge_adds_new_placements() {
        let existing = vec![serde_json::to_value(entry("a", "1")).unwrap()];
        let merged = merge(existing, &[entry("b", "2")]).unwrap();

        let keys: Vec<_> = merged.iter().filter_map(placement_of).collect();
        assert_eq!(keys, ["a", "b"]);
    }

    #[test]
    fn merge_replaces_only_matching_placement_in_place() {
        let existing = vec![
            serde_json::to_value(entry("a", "1")).unwrap(),
            serde_json::to_value(entry("b", "2")).unwrap(),
        ];
        let merged = merge(existing, &[entry("a", "9")]).unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0]["placement"], "a");
        assert_eq!(merged[0]["id"], "9");
        assert_eq!(merged[1]["id"], "2");
    }

    #[test]
    fn untouched_entries_survive_verbatim() {
        let legacy = json!({ "placement": "old", "id": "x", "note": "hand-added", "extra": [1, 2] });
        let merged = merge(vec![legacy.clone()], &[entry("new", "1")]).unwrap();
        assert_eq!(merged[0], legacy);
    }

    #[test]
    fn duplicate_existing_placements_collapse() {
        let existing = vec![
            json!({ "placement": "a", "id": "1" }),
            json!({ "note": "no placement" }),
            json!({ "placement": "a", "id": "2" }),
        ];
        let merged = merge(existing, &[]).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0]["id"], "2");
    }

    #[test]
    fn wire_keys_match_ledger_format() {
        let v = serde_json::to_value(entry("hero", "p1")).unwrap();
        let keys: Vec<_> = v.as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            keys,
            ["placement", "id", "file", "title", "author", "username", "source", "license", "query"]
        );
    }

    #[test]
    fn title_prefers_description() {
        let mut photo = PhotoRecord {
            id: "p1".into(),
            raw_url: "https://images.example.com/p1".into(),
            description: Some("Sunrise".into()),
            alt_description: Some("orange sky".into()),
            author_name: None,
            author_handle: Some("jdoe".into()),
            page_url: Some("https://unsplash.com/photos/p1".into()),
            download_location: String::new(),
        };
        let e = AttributionEntry::new("hero", &photo, "/f.webp", "sky", "Unsplash", "Unsplash License");
        assert_eq!(e.title, "Sunrise");
        assert_eq!(e.source_url.as_deref(), Some("https://unsplash.com/photos/p1"));

        photo.description = None;
        let e = AttributionEntry::new("hero", &photo, "/f.webp", "sky", "Unsplash", "Unsplash License");
        assert_eq!(e.title, "orange sky");
    }

    #[test]
    fn load_treats_missing_and_corrupt_as_empty() {
        tokio_test::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let missing = dir.path().join("attribution.json");
            assert!(load(&missing).await.is_empty());

            std::fs::write(&missing, "{ this is not a ledger").unwrap();
            assert!(load(&missing).await.is_empty());

            std::fs::write(&missing, r#"[{"placement":"a","id":"1"}]"#).unwrap();
            assert_eq!(load(&missing).await.len(), 1);
        });
    }
}
