use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub version: u32,
    pub created_at: String,
    /// Tokenizer the data directory was first indexed with.
    pub tokenizer: String,
}

/// Layout of an engine data directory.
pub struct DataPaths {
    pub root: PathBuf,
}

impl DataPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn db(&self) -> PathBuf { self.root.join("db") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    pub fn blacklist(&self) -> PathBuf { self.root.join("blacklist.json") }
}

pub fn save_meta(paths: &DataPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &DataPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

/// Write `meta.json` on first use; afterwards refuse directories written in
/// another format version.
pub fn ensure_meta(paths: &DataPaths, tokenizer: &str) -> Result<MetaFile> {
    if paths.meta().exists() {
        let meta = load_meta(paths)?;
        if meta.version != FORMAT_VERSION {
            return Err(Error::InvalidInput(format!(
                "data directory {} has format version {}, expected {}",
                paths.root.display(),
                meta.version,
                FORMAT_VERSION
            )));
        }
        if meta.tokenizer != tokenizer {
            tracing::warn!(stored = %meta.tokenizer, configured = tokenizer, "tokenizer differs from the one the data was indexed with; update documents to re-segment");
        }
        return Ok(meta);
    }
    let meta = MetaFile { version: FORMAT_VERSION, created_at: now_rfc3339(), tokenizer: tokenizer.to_string() };
    save_meta(paths, &meta)?;
    tracing::info!(root = %paths.root.display(), "initialized data directory");
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_is_created_once() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path());
        let first = ensure_meta(&paths, "simple").unwrap();
        assert_eq!(first.version, FORMAT_VERSION);
        assert!(!first.created_at.is_empty());
        let again = ensure_meta(&paths, "simple").unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn other_versions_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path());
        save_meta(&paths, &MetaFile { version: 99, created_at: "2014-06-16T00:00:00Z".into(), tokenizer: "mecab".into() }).unwrap();
        assert!(matches!(ensure_meta(&paths, "mecab"), Err(Error::InvalidInput(_))));
    }
}
