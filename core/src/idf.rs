//! Inverse document frequency per scope.
//!
//! Values are derived from the word index on demand and only for the terms
//! an operation touches. Index writes persist what they computed so the
//! dictionary can be inspected; queries always compute live.

use crate::error::{Error, Result};
use crate::model::Scope;
use crate::store::DocumentStore;
use crate::word_index::WordIndex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const IDF: &str = "idf";

pub type IdfMap = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdfEntry {
    pub term: String,
    pub idf: f64,
    /// Documents containing the term when the value was computed.
    pub docs: u64,
}

/// `ln(total / containing)`, 0 for a term no document contains, never negative.
pub fn idf_value(total: usize, containing: usize) -> f64 {
    if containing == 0 || total == 0 {
        return 0.0;
    }
    (total as f64 / containing as f64).ln().max(0.0)
}

#[derive(Clone)]
pub struct IdfDictionary {
    db: sled::Db,
    index: WordIndex,
}

impl IdfDictionary {
    pub fn new(db: sled::Db, index: WordIndex) -> Self {
        Self { db, index }
    }

    fn tree(&self, scope: &Scope) -> Result<sled::Tree> {
        Ok(self.db.open_tree(scope.tree(IDF))?)
    }

    fn compute_entries<'a>(&self, scope: &Scope, terms: impl IntoIterator<Item = &'a String>, total: usize) -> Result<Vec<IdfEntry>> {
        terms
            .into_iter()
            .map(|term| {
                let docs = self.index.doc_count(scope, term)?;
                Ok(IdfEntry { term: term.clone(), idf: idf_value(total, docs), docs: docs as u64 })
            })
            .collect()
    }

    /// Idf of `terms` against a known document total.
    pub fn compute<'a>(&self, scope: &Scope, terms: impl IntoIterator<Item = &'a String>, total: usize) -> Result<IdfMap> {
        Ok(self.compute_entries(scope, terms, total)?.into_iter().map(|e| (e.term, e.idf)).collect())
    }

    /// Idf of `terms` with the total taken from the document store.
    pub fn idf<'a>(&self, store: &dyn DocumentStore, scope: &Scope, terms: impl IntoIterator<Item = &'a String>) -> Result<IdfMap> {
        let total = store.count(scope)?;
        self.compute(scope, terms, total)
    }

    /// Compute and persist the entries of `terms`. Terms no longer contained in
    /// any document lose their entry.
    pub fn refresh<'a>(&self, scope: &Scope, terms: impl IntoIterator<Item = &'a String>, total: usize) -> Result<IdfMap> {
        let tree = self.tree(scope)?;
        let entries = self.compute_entries(scope, terms, total)?;
        let mut batch = sled::Batch::default();
        for e in &entries {
            if e.docs == 0 {
                batch.remove(e.term.as_bytes());
            } else {
                let bytes = bincode::serialize(e).map_err(|err| Error::corrupt(&e.term, err))?;
                batch.insert(e.term.as_bytes(), bytes);
            }
        }
        tree.apply_batch(batch)?;
        Ok(entries.into_iter().map(|e| (e.term, e.idf)).collect())
    }

    /// Persisted values for `terms`; terms without an entry are absent.
    pub fn lookup<'a>(&self, scope: &Scope, terms: impl IntoIterator<Item = &'a String>) -> Result<IdfMap> {
        let tree = self.tree(scope)?;
        let mut out = IdfMap::new();
        for term in terms {
            if let Some(bytes) = tree.get(term.as_bytes())? {
                let e: IdfEntry = bincode::deserialize(&bytes).map_err(|err| Error::corrupt(term, err))?;
                out.insert(e.term, e.idf);
            }
        }
        Ok(out)
    }

    /// All persisted entries of the scope, ordered by term.
    pub fn entries(&self, scope: &Scope) -> Result<Vec<IdfEntry>> {
        let mut out = Vec::new();
        for item in self.tree(scope)?.iter() {
            let (key, bytes) = item?;
            let e: IdfEntry =
                bincode::deserialize(&bytes).map_err(|err| Error::corrupt(String::from_utf8_lossy(&key), err))?;
            out.push(e);
        }
        Ok(out)
    }

    pub fn clear(&self, scope: &Scope) -> Result<()> {
        self.tree(scope)?.clear()?;
        Ok(())
    }
}
