use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub type DocId = String;

/// Structural fields of a stored document, used by filters.
pub type Fields = serde_json::Map<String, serde_json::Value>;

const SEP: char = '\u{1f}';

/// A (tenant code, collection) pair partitioning every index structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub code: String,
    pub collection: String,
}

impl Scope {
    pub fn new(code: impl Into<String>, collection: impl Into<String>) -> Result<Self> {
        let code = code.into();
        let collection = collection.into();
        for (name, value) in [("code", &code), ("collection", &collection)] {
            if value.is_empty() {
                return Err(Error::InvalidInput(format!("scope {name} must not be empty")));
            }
            if value.contains(SEP) {
                return Err(Error::InvalidInput(format!("scope {name} contains a control separator")));
            }
        }
        Ok(Self { code, collection })
    }

    /// Name of the backing tree for one kind of per-scope table.
    pub(crate) fn tree(&self, kind: &str) -> String {
        format!("{kind}{SEP}{}{SEP}{}", self.code, self.collection)
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.code, self.collection)
    }
}

/// One text to analyze together with the weight each of its terms contributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldText {
    pub text: String,
    pub weight: f64,
}

impl FieldText {
    pub fn new(text: impl Into<String>, weight: f64) -> Self {
        Self { text: text.into(), weight }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermWeight {
    pub term: String,
    pub weight: f64,
    pub count: u32,
    /// Surface, base and reading forms seen for this term.
    #[serde(default)]
    pub readings: BTreeSet<String>,
}

/// Weighted terms of one document (or query), ordered by term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentTermVector {
    pub terms: Vec<TermWeight>,
    pub total_weight: f64,
}

impl DocumentTermVector {
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn words(&self) -> Vec<String> {
        self.terms.iter().map(|t| t.term.clone()).collect()
    }

    pub fn term_set(&self) -> BTreeSet<String> {
        self.terms.iter().map(|t| t.term.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfIdfEntry {
    pub term: String,
    pub tf: f64,
    pub idf: f64,
    pub tfidf: f64,
}

/// A document as persisted in the document store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocRecord {
    pub id: DocId,
    #[serde(default)]
    pub fields: Fields,
    #[serde(default)]
    pub total_weight: f64,
    #[serde(default)]
    pub terms: Vec<TermWeight>,
    #[serde(default)]
    pub idx: Vec<TfIdfEntry>,
}

impl DocRecord {
    pub fn new(id: impl Into<DocId>, fields: Fields) -> Self {
        Self { id: id.into(), fields, ..Default::default() }
    }

    pub fn vector(&self) -> DocumentTermVector {
        DocumentTermVector { terms: self.terms.clone(), total_weight: self.total_weight }
    }

    pub fn term_set(&self) -> BTreeSet<String> {
        self.terms.iter().map(|t| t.term.clone()).collect()
    }

    /// Drops the term vector and tf-idf array, keeping the structural fields.
    pub fn clear_vector(&mut self) {
        self.terms.clear();
        self.idx.clear();
        self.total_weight = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_rejects_empty_parts() {
        assert!(Scope::new("", "docs").is_err());
        assert!(Scope::new("acme", "").is_err());
        assert!(Scope::new("acme", "do\u{1f}cs").is_err());
    }

    #[test]
    fn scope_trees_are_distinct_per_kind() {
        let s = Scope::new("acme", "docs").unwrap();
        assert_ne!(s.tree("docs"), s.tree("words"));
        assert_eq!(s.to_string(), "acme/docs");
    }

    #[test]
    fn record_without_vector_deserializes() {
        let rec: DocRecord = serde_json::from_str(r#"{"id":"a"}"#).unwrap();
        assert_eq!(rec.id, "a");
        assert!(rec.idx.is_empty());
    }
}
