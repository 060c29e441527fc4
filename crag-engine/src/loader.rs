//! Document loading.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::document::Document;
use crate::error::{CragError, Result};

/// Loads raw documents from a source location.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Load every document found at `source`.
    async fn load(&self, source: &Path) -> Result<Vec<Document>>;
}

/// Loads plain-text files from a directory, non-recursively.
///
/// Files are read in file-name order so repeated loads of the same directory
/// produce the same corpus. Files that are not valid UTF-8 are skipped with a
/// warning. The document id is the file name.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    extensions: Vec<String>,
}

impl DirectoryLoader {
    /// Create a loader accepting `.txt` and `.md` files.
    pub fn new() -> Self {
        Self { extensions: vec!["txt".into(), "md".into()] }
    }

    /// Replace the accepted file extensions (without the leading dot).
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

impl Default for DirectoryLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentLoader for DirectoryLoader {
    async fn load(&self, source: &Path) -> Result<Vec<Document>> {
        let mut entries = tokio::fs::read_dir(source).await.map_err(|e| {
            CragError::LoaderError(format!("cannot read directory '{}': {e}", source.display()))
        })?;

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            CragError::LoaderError(format!("cannot list '{}': {e}", source.display()))
        })? {
            let path = entry.path();
            if path.is_file() && self.accepts(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let text = match tokio::fs::read_to_string(&path).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable document");
                    continue;
                }
            };
            let id = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            debug!(document.id = %id, bytes = text.len(), "loaded document");
            documents.push(Document {
                id,
                text,
                metadata: HashMap::new(),
                source_uri: Some(path.display().to_string()),
            });
        }

        Ok(documents)
    }
}
