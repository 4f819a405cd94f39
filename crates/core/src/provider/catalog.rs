//! Content provider backed by a local TOML catalog.
//!
//! ```toml
//! [[records]]
//! id = "100001"
//! title = "示例漫画一"
//! author = "作者A"
//! tags = ["奇幻", "冒险"]
//! source = "sources/100001.pdf"
//! ```
//!
//! Each entry's `source` points at an already-converted document (relative
//! paths resolve against the catalog's directory). `fetch` copies it into
//! the output directory as `{id}.pdf`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::error::ProviderError;
use super::traits::ContentProvider;
use super::types::{map_raw_records, Artifact, ContentRecord};

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    records: Vec<Value>,
}

/// A provider serving records listed in a catalog file.
#[derive(Debug)]
pub struct CatalogProvider {
    records: Vec<ContentRecord>,
    sources: HashMap<String, PathBuf>,
    output_dir: PathBuf,
}

impl CatalogProvider {
    /// Loads a catalog file.
    pub async fn open(
        catalog_path: impl AsRef<Path>,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self, ProviderError> {
        let catalog_path = catalog_path.as_ref();
        let contents = tokio::fs::read_to_string(catalog_path).await?;
        let base_dir = catalog_path.parent().unwrap_or_else(|| Path::new("."));
        let provider = Self::from_toml_str(&contents, base_dir, output_dir)?;

        info!(
            catalog = %catalog_path.display(),
            records = provider.records.len(),
            "Loaded content catalog"
        );
        Ok(provider)
    }

    /// Parses catalog contents. Relative `source` paths resolve against `base_dir`.
    pub fn from_toml_str(
        contents: &str,
        base_dir: &Path,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self, ProviderError> {
        let file: CatalogFile = toml::from_str(contents)
            .map_err(|e| ProviderError::library(format!("invalid catalog: {}", e)))?;

        let mut sources = HashMap::new();
        for entry in &file.records {
            let id = match entry.get("id") {
                Some(Value::String(s)) => s.trim().to_string(),
                Some(Value::Number(n)) => n.to_string(),
                _ => continue,
            };
            match entry.get("source").and_then(Value::as_str) {
                Some(source) => {
                    sources.insert(id, base_dir.join(source));
                }
                None => debug!(record_id = %id, "Catalog entry has no source; it cannot be fetched"),
            }
        }

        Ok(Self {
            records: map_raw_records(file.records),
            sources,
            output_dir: output_dir.into(),
        })
    }

    /// Number of well-formed records in the catalog.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn matches(record: &ContentRecord, needle: &str) -> bool {
        record.title.to_lowercase().contains(needle)
            || record
                .author
                .as_deref()
                .is_some_and(|a| a.to_lowercase().contains(needle))
            || record.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }
}

#[async_trait]
impl ContentProvider for CatalogProvider {
    fn name(&self) -> &str {
        "catalog"
    }

    async fn search(&self, keyword: &str) -> Result<Vec<ContentRecord>, ProviderError> {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .records
            .iter()
            .filter(|r| Self::matches(r, &needle))
            .cloned()
            .collect())
    }

    async fn fetch(&self, id: &str) -> Result<Artifact, ProviderError> {
        if !self.records.iter().any(|r| r.id == id) {
            return Err(ProviderError::NotFound { id: id.to_string() });
        }

        let source = self.sources.get(id).ok_or_else(|| {
            ProviderError::Conversion(format!("record {} has no source document", id))
        })?;

        if !tokio::fs::try_exists(source).await? {
            warn!(record_id = %id, source = %source.display(), "Catalog source document is missing");
            return Err(ProviderError::Conversion(format!(
                "source document {} is missing",
                source.display()
            )));
        }

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let target = self.output_dir.join(format!("{}.pdf", id));
        tokio::fs::copy(source, &target).await?;

        debug!(record_id = %id, path = %target.display(), "Catalog record fetched");
        Ok(Artifact::new(id, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CATALOG: &str = r#"
[[records]]
id = "100001"
title = "示例漫画一"
author = "作者A"
tags = ["奇幻", "冒险"]
source = "src/100001.pdf"

[[records]]
id = 100002
title = "示例漫画二"
author = "作者B"
tags = ["科幻"]
source = "src/missing.pdf"

[[records]]
title = "no id, skipped"

[[records]]
id = "200001"
title = "Test Work"
tags = ["test"]
"#;

    fn provider(dir: &TempDir) -> CatalogProvider {
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/100001.pdf"), b"%PDF-1.4").unwrap();
        CatalogProvider::from_toml_str(CATALOG, dir.path(), dir.path().join("out")).unwrap()
    }

    #[tokio::test]
    async fn test_malformed_entries_are_skipped() {
        let dir = TempDir::new().unwrap();
        assert_eq!(provider(&dir).len(), 3);
    }

    #[tokio::test]
    async fn test_search_matches_title_author_and_tags() {
        let dir = TempDir::new().unwrap();
        let provider = provider(&dir);

        let ids = |records: Vec<ContentRecord>| records.into_iter().map(|r| r.id).collect::<Vec<_>>();

        assert_eq!(ids(provider.search("示例").await.unwrap()), vec!["100001", "100002"]);
        assert_eq!(ids(provider.search("作者b").await.unwrap()), vec!["100002"]);
        assert_eq!(ids(provider.search("TEST").await.unwrap()), vec!["200001"]);
        assert!(provider.search("nothing").await.unwrap().is_empty());
        assert!(provider.search("  ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_copies_source() {
        let dir = TempDir::new().unwrap();
        let provider = provider(&dir);

        let artifact = provider.fetch("100001").await.unwrap();
        assert_eq!(artifact.name, "100001.pdf");
        assert_eq!(artifact.path, dir.path().join("out/100001.pdf"));
        assert_eq!(std::fs::read(&artifact.path).unwrap(), b"%PDF-1.4");
    }

    #[tokio::test]
    async fn test_fetch_failures() {
        let dir = TempDir::new().unwrap();
        let provider = provider(&dir);

        assert!(matches!(
            provider.fetch("does-not-exist").await,
            Err(ProviderError::NotFound { .. })
        ));
        assert!(matches!(
            provider.fetch("100002").await,
            Err(ProviderError::Conversion(_))
        ));
        assert!(matches!(
            provider.fetch("200001").await,
            Err(ProviderError::Conversion(_))
        ));
    }

    #[tokio::test]
    async fn test_open_missing_catalog_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = CatalogProvider::open(dir.path().join("nope.toml"), dir.path()).await;
        assert!(matches!(result, Err(ProviderError::Io(_))));
    }
}
