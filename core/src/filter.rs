//! Term filtering applied between the segmenter and the term vector:
//! part-of-speech whitelisting and the persistent term blacklist.

use crate::error::Result;
use crate::tokenizer::Morpheme;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

pub const ANY: &str = "*";

/// A `(pos, subcategory)` pair to keep; `*` matches any subcategory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PosRule {
    pub pos: String,
    #[serde(default = "any")]
    pub subcategory: String,
}

fn any() -> String {
    ANY.to_string()
}

impl PosRule {
    pub fn new(pos: impl Into<String>, subcategory: impl Into<String>) -> Self {
        Self { pos: pos.into(), subcategory: subcategory.into() }
    }

    pub fn any(pos: impl Into<String>) -> Self {
        Self::new(pos, ANY)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PosFilter {
    rules: HashMap<String, HashSet<String>>,
}

impl PosFilter {
    pub fn new(rules: impl IntoIterator<Item = PosRule>) -> Self {
        let mut map: HashMap<String, HashSet<String>> = HashMap::new();
        for rule in rules {
            map.entry(rule.pos).or_default().insert(rule.subcategory);
        }
        Self { rules: map }
    }

    pub fn accepts(&self, m: &Morpheme) -> bool {
        match self.rules.get(&m.pos) {
            Some(subs) => subs.contains(ANY) || subs.contains(&m.subcategory),
            None => false,
        }
    }
}

/// Terms excluded from indexing and querying.
///
/// Loaded once from its file at startup; every mutation is written back with
/// [`TermFilterState::flush`]. Shared across analyzer threads.
#[derive(Debug, Default)]
pub struct TermFilterState {
    path: Option<PathBuf>,
    terms: RwLock<BTreeSet<String>>,
}

#[derive(Serialize, Deserialize)]
struct BlacklistFile {
    terms: BTreeSet<String>,
}

impl TermFilterState {
    /// An in-memory blacklist that is never persisted.
    pub fn in_memory(terms: impl IntoIterator<Item = String>) -> Self {
        Self { path: None, terms: RwLock::new(terms.into_iter().collect()) }
    }

    /// Load from `path`; a missing file is an empty blacklist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let terms = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str::<BlacklistFile>(&text)?.terms,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), terms = terms.len(), "loaded term blacklist");
        Ok(Self { path: Some(path), terms: RwLock::new(terms) })
    }

    pub fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else { return Ok(()) };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = BlacklistFile { terms: self.terms.read().clone() };
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&file)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn contains(&self, term: &str) -> bool {
        self.terms.read().contains(term)
    }

    pub fn terms(&self) -> Vec<String> {
        self.terms.read().iter().cloned().collect()
    }

    /// Add terms and persist. Returns how many were new.
    pub fn extend(&self, terms: impl IntoIterator<Item = String>) -> Result<usize> {
        let added = {
            let mut set = self.terms.write();
            terms.into_iter().filter(|t| !t.is_empty()).filter(|t| set.insert(t.clone())).count()
        };
        if added > 0 {
            self.flush()?;
        }
        Ok(added)
    }

    /// Remove terms and persist. Returns how many were present.
    pub fn remove(&self, terms: impl IntoIterator<Item = String>) -> Result<usize> {
        let removed = {
            let mut set = self.terms.write();
            terms.into_iter().filter(|t| set.remove(t)).count()
        };
        if removed > 0 {
            self.flush()?;
        }
        Ok(removed)
    }
}
