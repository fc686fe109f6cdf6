//! Reads rule and layout definitions from directories of JSON files.

use std::io;
use std::path::{Path, PathBuf};

use cloudsign_core::{LayoutConfig, RuleConfig};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub async fn load_rules(dir: &Path) -> Result<Vec<RuleConfig>, LoadError> {
    load_dir(dir).await
}

pub async fn load_layouts(dir: &Path) -> Result<Vec<LayoutConfig>, LoadError> {
    load_dir(dir).await
}

/// Parse every `*.json` file in `dir`, in file name order.
/// A missing directory yields nothing.
async fn load_dir<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>, LoadError> {
    let io_err = |source: io::Error| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "config directory missing, nothing to load");
            return Ok(Vec::new());
        }
        Err(err) => return Err(io_err(err)),
    };

    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut items = Vec::with_capacity(paths.len());
    for path in paths {
        let raw = tokio::fs::read(&path).await.map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        let item = serde_json::from_slice(&raw).map_err(|source| LoadError::Parse {
            path: path.clone(),
            source,
        })?;
        items.push(item);
    }
    debug!(dir = %dir.display(), count = items.len(), "loaded config files");
    Ok(items)
}
