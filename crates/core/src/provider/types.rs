//! Types exchanged with content providers.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// One searchable, fetchable item from the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Opaque, stable identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Tags in display order.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, alias = "coverUrl", skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Page count, when the provider knows it.
    #[serde(default, alias = "pageCount", skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
}

/// Why a raw provider entry could not become a [`ContentRecord`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("record is not an object")]
    NotAnObject,

    #[error("record has no usable `{field}` field")]
    MissingField { field: &'static str },
}

impl ContentRecord {
    /// Creates a record with only the required fields set.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: None,
            tags: Vec::new(),
            cover_url: None,
            description: None,
            pages: None,
        }
    }

    /// Sets the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Sets the tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Maps a loosely-typed provider entry into a record.
    ///
    /// `id` and `title` are required; numeric ids are stringified. Optional
    /// fields with the wrong type are dropped instead of failing the record.
    pub fn from_raw(raw: &Value) -> Result<Self, RecordError> {
        let obj = raw.as_object().ok_or(RecordError::NotAnObject)?;

        let id = match obj.get("id") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(RecordError::MissingField { field: "id" }),
        };

        let title = match obj.get("title") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => return Err(RecordError::MissingField { field: "title" }),
        };

        let optional_str = |keys: &[&str]| -> Option<String> {
            keys.iter().find_map(|key| match obj.get(*key) {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                Some(Value::Null) | None => None,
                Some(other) => {
                    debug!(record_id = %id, field = *key, value = %other, "Dropping non-string field");
                    None
                }
            })
        };

        let tags = match obj.get("tags") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|t| t.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };

        let pages = ["pages", "pageCount", "page_count"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_u64))
            .and_then(|n| u32::try_from(n).ok());

        Ok(Self {
            author: optional_str(&["author"]),
            cover_url: optional_str(&["cover_url", "coverUrl"]),
            description: optional_str(&["description"]),
            id,
            title,
            tags,
            pages,
        })
    }
}

/// Maps raw provider entries, skipping (and logging) malformed ones.
///
/// Order of the well-formed entries is preserved.
pub fn map_raw_records(raw: Vec<Value>) -> Vec<ContentRecord> {
    raw.into_iter()
        .enumerate()
        .filter_map(|(idx, entry)| match ContentRecord::from_raw(&entry) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(index = idx, entry = %entry, "Skipping malformed provider record: {}", e);
                None
            }
        })
        .collect()
}

/// Ordered results of one search call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultSet {
    /// Keyword that produced these results.
    pub keyword: String,
    /// Results in provider order.
    pub records: Vec<ContentRecord>,
    /// How many results the provider returned before any truncation.
    pub total_found: usize,
    /// When the search completed.
    pub created_at: DateTime<Utc>,
}

impl SearchResultSet {
    /// Creates a result set stamped with the current time.
    pub fn new(keyword: impl Into<String>, records: Vec<ContentRecord>) -> Self {
        let total_found = records.len();
        Self {
            keyword: keyword.into(),
            records,
            total_found,
            created_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the record at a 1-based position.
    pub fn get_one_based(&self, position: usize) -> Option<&ContentRecord> {
        position.checked_sub(1).and_then(|idx| self.records.get(idx))
    }

    /// Keeps at most `max` records. `total_found` is left untouched.
    pub fn truncated(mut self, max: usize) -> Self {
        self.records.truncate(max);
        self
    }

    /// Whether records were dropped by truncation.
    pub fn is_truncated(&self) -> bool {
        self.total_found > self.records.len()
    }
}

/// Converted output of a fetch, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Record this artifact was produced from.
    pub record_id: String,
    /// Location on local storage.
    pub path: PathBuf,
    /// Logical name used when delivering.
    pub name: String,
}

impl Artifact {
    /// Creates an artifact named after the file name of `path`.
    pub fn new(record_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            record_id: record_id.into(),
            path,
            name,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_raw_full_record() {
        let raw = json!({
            "id": "100001",
            "title": "示例漫画一",
            "author": "作者A",
            "tags": ["奇幻", "冒险"],
            "cover_url": "http://example.com/cover1.jpg",
            "description": "desc",
            "pages": 50,
        });

        let record = ContentRecord::from_raw(&raw).unwrap();
        assert_eq!(record.id, "100001");
        assert_eq!(record.title, "示例漫画一");
        assert_eq!(record.author.as_deref(), Some("作者A"));
        assert_eq!(record.tags, vec!["奇幻", "冒险"]);
        assert_eq!(record.pages, Some(50));
    }

    #[test]
    fn test_from_raw_numeric_id_and_camel_case() {
        let raw = json!({
            "id": 422866,
            "title": "Test",
            "coverUrl": "http://example.com/c.jpg",
            "pageCount": 20,
        });

        let record = ContentRecord::from_raw(&raw).unwrap();
        assert_eq!(record.id, "422866");
        assert_eq!(record.cover_url.as_deref(), Some("http://example.com/c.jpg"));
        assert_eq!(record.pages, Some(20));
    }

    #[test]
    fn test_from_raw_drops_mistyped_optional_fields() {
        let raw = json!({"id": "1", "title": "T", "author": 7, "pages": "many"});

        let record = ContentRecord::from_raw(&raw).unwrap();
        assert!(record.author.is_none());
        assert!(record.pages.is_none());
    }

    #[test]
    fn test_from_raw_rejects_missing_required() {
        assert_eq!(
            ContentRecord::from_raw(&json!({"title": "T"})),
            Err(RecordError::MissingField { field: "id" })
        );
        assert_eq!(
            ContentRecord::from_raw(&json!({"id": "1", "title": "  "})),
            Err(RecordError::MissingField { field: "title" })
        );
        assert_eq!(
            ContentRecord::from_raw(&json!(["1", "T"])),
            Err(RecordError::NotAnObject)
        );
    }

    #[test]
    fn test_map_raw_records_skips_malformed() {
        let records = map_raw_records(vec![
            json!({"id": "1", "title": "One"}),
            json!({"title": "no id"}),
            json!("garbage"),
            json!({"id": "3", "title": "Three"}),
        ]);

        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_result_set_positions_and_truncation() {
        let set = SearchResultSet::new(
            "kw",
            vec![
                ContentRecord::new("1", "a"),
                ContentRecord::new("2", "b"),
                ContentRecord::new("3", "c"),
            ],
        );

        assert_eq!(set.get_one_based(2).map(|r| r.id.as_str()), Some("2"));
        assert!(set.get_one_based(0).is_none());
        assert!(set.get_one_based(4).is_none());

        let truncated = set.truncated(2);
        assert_eq!(truncated.len(), 2);
        assert_eq!(truncated.total_found, 3);
        assert!(truncated.is_truncated());
    }

    #[test]
    fn test_artifact_name_from_path() {
        let artifact = Artifact::new("100001", "/downloads/100001.pdf");
        assert_eq!(artifact.name, "100001.pdf");
        assert_eq!(artifact.record_id, "100001");
    }
}
