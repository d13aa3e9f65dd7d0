// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Document provider: a narrow file-backed store over `(workflow, tag, path)`
//! (spec.md §4.10). Maps to `<base_dir>/<workflow>/<tag>/<path>`, creating
//! parent directories as needed. Directories whose name starts with `_` are
//! internal and excluded from `list`.

use crate::error::{Result, StorageError};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct DocumentProvider {
    base_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentEntry {
    pub path: String,
    pub is_dir: bool,
}

impl DocumentProvider {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn resolve(&self, workflow: &str, tag: &str, path: &str) -> Result<PathBuf> {
        if path.contains("..") {
            return Err(StorageError::Validation(format!("path escapes document root: {path}")));
        }
        Ok(self.base_dir.join(workflow).join(tag).join(path))
    }

    pub async fn read(&self, workflow: &str, tag: &str, path: &str) -> Result<Option<String>> {
        let full = self.resolve(workflow, tag, path)?;
        match tokio::fs::read_to_string(&full).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn write(&self, workflow: &str, tag: &str, path: &str, content: &str) -> Result<()> {
        let full = self.resolve(workflow, tag, path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, content).await?;
        Ok(())
    }

    pub async fn append(&self, workflow: &str, tag: &str, path: &str, content: &str) -> Result<()> {
        use tokio::io::AsyncWriteExt;
        let full = self.resolve(workflow, tag, path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&full)
            .await?;
        file.write_all(content.as_bytes()).await?;
        Ok(())
    }

    /// Create a new document. Fails with [`StorageError::Duplicate`] if one
    /// already exists at `path`.
    pub async fn create(&self, workflow: &str, tag: &str, path: &str, content: &str) -> Result<()> {
        let full = self.resolve(workflow, tag, path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        match tokio::fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&full)
            .await
        {
            Ok(mut file) => {
                use tokio::io::AsyncWriteExt;
                file.write_all(content.as_bytes()).await?;
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StorageError::Duplicate(format!("document already exists: {path}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// List entries directly under `(workflow, tag, dir)`, skipping any
    /// directory whose name starts with `_`.
    pub async fn list(&self, workflow: &str, tag: &str, dir: &str) -> Result<Vec<DocumentEntry>> {
        let full = self.resolve(workflow, tag, dir)?;
        let mut read_dir = match tokio::fs::read_dir(&full).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() && name.starts_with('_') {
                continue;
            }
            let rel = if dir.is_empty() {
                name.clone()
            } else {
                format!("{dir}/{name}")
            };
            entries.push(DocumentEntry {
                path: rel,
                is_dir: file_type.is_dir(),
            });
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}

#[cfg(test)]
#[path = "documents_tests.rs"]
mod tests;
