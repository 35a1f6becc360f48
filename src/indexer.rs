//! `--index` subtool: reads `config/search_config.json`, walks the
//! directories it lists, and writes manifest artifacts under
//! `config/faiss_index/`. Never opens a capture device.
//!
//! Building the actual vector index (embedding generation, FAISS) is out of
//! scope here — those directories' file listings are the artifact this
//! subtool owns; a real indexer would consume the manifest this produces.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config;
use crate::error::ResourceError;

#[derive(Debug, Deserialize)]
struct SearchConfig {
    directories: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
struct IndexManifest {
    directories_scanned: Vec<PathBuf>,
    files: Vec<PathBuf>,
}

/// Runs the indexer subtool to completion, returning `Ok(())` on success.
/// Any fatal condition (missing config, unreadable directories) is reported
/// as a `ResourceError` and the caller maps it to exit code 1.
pub fn run() -> Result<(), ResourceError> {
    let config_path = config::config_dir().join("search_config.json");
    let contents = std::fs::read_to_string(&config_path).map_err(|e| ResourceError::ConfigUnreadable {
        path: config_path.clone(),
        cause: e.to_string(),
    })?;
    let search_config: SearchConfig =
        serde_json::from_str(&contents).map_err(|e| ResourceError::ConfigUnreadable {
            path: config_path.clone(),
            cause: e.to_string(),
        })?;

    let mut files = Vec::new();
    let mut scanned = Vec::new();
    for dir in &search_config.directories {
        if !dir.is_dir() {
            warn!("skipping non-directory entry {:?}", dir);
            continue;
        }
        scanned.push(dir.clone());
        collect_files(dir, &mut files);
    }

    let manifest = IndexManifest {
        directories_scanned: scanned,
        files,
    };

    let index_dir = config::config_dir().join("faiss_index");
    std::fs::create_dir_all(&index_dir).map_err(|e| ResourceError::ConfigUnreadable {
        path: index_dir.clone(),
        cause: e.to_string(),
    })?;
    let manifest_path = index_dir.join("manifest.json");
    let body = serde_json::to_vec_pretty(&manifest).expect("manifest is always serializable");
    std::fs::write(&manifest_path, body).map_err(|e| ResourceError::ConfigUnreadable {
        path: manifest_path.clone(),
        cause: e.to_string(),
    })?;

    info!(
        directories = manifest.directories_scanned.len(),
        files = manifest.files.len(),
        "wrote index manifest to {:?}",
        manifest_path
    );
    Ok(())
}

fn collect_files(dir: &std::path::Path, out: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            error!("failed to read {:?}: {e}", dir);
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out);
        } else {
            out.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_files_walks_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(nested.join("b.txt"), "b").unwrap();

        let mut files = Vec::new();
        collect_files(dir.path(), &mut files);
        assert_eq!(files.len(), 2);
    }
}
