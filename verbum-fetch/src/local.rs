//! Fetchers that serve documents without a network.

use crate::ResourceFetcher;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;
use verbum_core::{FetchError, ResourceKey};

/// Serves documents from memory, falling back to a directory tree.
///
/// The directory layout mirrors the content host:
/// `{root}/{organization}/{language}_{resource}/{NN-BOOK}.usfm`.
/// Versions are ignored when reading from disk.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    documents: RwLock<HashMap<String, Bytes>>,
    root: Option<PathBuf>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read documents missing from memory under `root`.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_document(self, key: &ResourceKey, body: impl Into<Bytes>) -> Self {
        self.insert(key, body);
        self
    }

    pub fn insert(&self, key: &ResourceKey, body: impl Into<Bytes>) {
        if let Ok(mut documents) = self.documents.write() {
            documents.insert(key.cache_key(), body.into());
        }
    }

    pub fn len(&self) -> usize {
        self.documents.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn path_for(&self, key: &ResourceKey) -> Option<PathBuf> {
        self.root.as_ref().map(|root| {
            root.join(&key.organization)
                .join(key.repository())
                .join(key.file_name())
        })
    }
}

#[async_trait]
impl ResourceFetcher for StaticFetcher {
    async fn fetch(&self, key: &ResourceKey) -> Result<Bytes, FetchError> {
        let in_memory = self
            .documents
            .read()
            .ok()
            .and_then(|documents| documents.get(&key.cache_key()).cloned());
        if let Some(body) = in_memory {
            return Ok(body);
        }

        let Some(path) = self.path_for(key) else {
            return Err(FetchError::NotFound {
                resource: key.to_string(),
            });
        };
        match tokio::fs::read(&path).await {
            Ok(body) => Ok(Bytes::from(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FetchError::NotFound {
                resource: key.to_string(),
            }),
            Err(e) => Err(FetchError::Network {
                resource: key.to_string(),
                reason: format!("Failed to read {}: {}", path.display(), e),
            }),
        }
    }

    fn name(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(book: &str) -> ResourceKey {
        ResourceKey::new("unfoldingWord", "en", "ult", book, "master")
    }

    #[tokio::test]
    async fn test_in_memory_documents() {
        let fetcher = StaticFetcher::new().with_document(&key("JHN"), "\\c 1");
        assert_eq!(fetcher.fetch(&key("JHN")).await.unwrap().as_ref(), b"\\c 1");
        assert_eq!(fetcher.len(), 1);

        let err = fetcher.fetch(&key("ROM")).await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_directory_fallback() {
        let root = tempfile::TempDir::new().unwrap();
        let dir = root.path().join("unfoldingWord").join("en_ult");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("44-JHN.usfm"), "\\id JHN").unwrap();

        let fetcher = StaticFetcher::new().with_root(root.path());
        assert_eq!(fetcher.fetch(&key("JHN")).await.unwrap().as_ref(), b"\\id JHN");
        assert!(matches!(
            fetcher.fetch(&key("GEN")).await.unwrap_err(),
            FetchError::NotFound { .. }
        ));
    }
}
