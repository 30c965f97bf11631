//! Inverted word index: per scope, term -> set of document ids.
//!
//! Each term is one key in a sled tree; membership changes go through
//! `update_and_fetch`, a compare-and-swap loop, so concurrent writers touching
//! the same term never lose each other's updates. There is no lock spanning
//! several terms.

use crate::error::{Error, Result};
use crate::model::{DocId, Scope};
use std::collections::BTreeSet;

const WORDS: &str = "words";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Documents containing every term.
    All,
    /// Documents containing at least one term.
    Any,
}

#[derive(Clone)]
pub struct WordIndex {
    db: sled::Db,
}

type DocSet = BTreeSet<DocId>;

fn decode(term: &str, bytes: &[u8]) -> Result<DocSet> {
    bincode::deserialize(bytes).map_err(|e| Error::corrupt(term, e))
}

fn encode(term: &str, set: &DocSet) -> Result<Vec<u8>> {
    bincode::serialize(set).map_err(|e| Error::corrupt(term, e))
}

impl WordIndex {
    pub fn new(db: sled::Db) -> Self {
        Self { db }
    }

    fn tree(&self, scope: &Scope) -> Result<sled::Tree> {
        Ok(self.db.open_tree(scope.tree(WORDS))?)
    }

    /// Apply `change` to one term's id set atomically. An empty result
    /// removes the entry.
    fn modify(&self, tree: &sled::Tree, term: &str, change: impl Fn(&mut DocSet)) -> Result<()> {
        let mut failure: Option<Error> = None;
        tree.update_and_fetch(term.as_bytes(), |old| {
            failure = None;
            let mut set = match old.map(|b| decode(term, b)).transpose() {
                Ok(set) => set.unwrap_or_default(),
                Err(e) => {
                    failure = Some(e);
                    return old.map(|b| b.to_vec());
                }
            };
            change(&mut set);
            if set.is_empty() {
                return None;
            }
            match encode(term, &set) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    failure = Some(e);
                    old.map(|b| b.to_vec())
                }
            }
        })?;
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Union `doc_id` into each term's entry. Adding an id twice is a no-op.
    pub fn add_terms<'a>(&self, scope: &Scope, doc_id: &str, terms: impl IntoIterator<Item = &'a String>) -> Result<()> {
        let tree = self.tree(scope)?;
        for term in terms {
            self.modify(&tree, term, |set| {
                set.insert(doc_id.to_string());
            })?;
        }
        Ok(())
    }

    /// Take `doc_id` out of the entries of `terms`, the terms the document
    /// contributed when it was indexed.
    pub fn remove_doc<'a>(&self, scope: &Scope, doc_id: &str, terms: impl IntoIterator<Item = &'a String>) -> Result<()> {
        let tree = self.tree(scope)?;
        for term in terms {
            self.modify(&tree, term, |set| {
                set.remove(doc_id);
            })?;
        }
        Ok(())
    }

    pub fn entry(&self, scope: &Scope, term: &str) -> Result<DocSet> {
        match self.tree(scope)?.get(term.as_bytes())? {
            Some(bytes) => decode(term, &bytes),
            None => Ok(DocSet::new()),
        }
    }

    /// Number of documents containing `term`.
    pub fn doc_count(&self, scope: &Scope, term: &str) -> Result<usize> {
        Ok(self.entry(scope, term)?.len())
    }

    /// Intersection (`All`) or union (`Any`) of the terms' id sets.
    ///
    /// A term without an entry empties an `All` lookup and adds nothing to an
    /// `Any` lookup. No terms yields no documents.
    pub fn candidate_docs(&self, scope: &Scope, terms: &[String], mode: MatchMode) -> Result<DocSet> {
        let tree = self.tree(scope)?;
        let mut acc: Option<DocSet> = None;
        for term in terms {
            let set = match tree.get(term.as_bytes())? {
                Some(bytes) => decode(term, &bytes)?,
                None => DocSet::new(),
            };
            acc = Some(match (mode, acc) {
                (_, None) => set,
                (MatchMode::All, Some(prev)) => prev.intersection(&set).cloned().collect(),
                (MatchMode::Any, Some(mut prev)) => {
                    prev.extend(set);
                    prev
                }
            });
            if mode == MatchMode::All && acc.as_ref().map_or(false, |s| s.is_empty()) {
                break;
            }
        }
        Ok(acc.unwrap_or_default())
    }

    /// Drop every entry of the scope.
    pub fn clear(&self, scope: &Scope) -> Result<()> {
        self.tree(scope)?.clear()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (WordIndex, Scope) {
        let db = sled::Config::new().temporary(true).open().unwrap();
        (WordIndex::new(db), Scope::new("acme", "notes").unwrap())
    }

    fn terms(ts: &[&str]) -> Vec<String> {
        ts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn add_terms_is_idempotent() {
        let (idx, scope) = setup();
        let t = terms(&["apple", "banana"]);
        idx.add_terms(&scope, "a", &t).unwrap();
        let once = idx.entry(&scope, "apple").unwrap();
        idx.add_terms(&scope, "a", &t).unwrap();
        assert_eq!(idx.entry(&scope, "apple").unwrap(), once);
        assert_eq!(idx.doc_count(&scope, "apple").unwrap(), 1);
    }

    #[test]
    fn all_and_any_lookups() {
        let (idx, scope) = setup();
        idx.add_terms(&scope, "a", &terms(&["apple", "banana"])).unwrap();
        idx.add_terms(&scope, "b", &terms(&["banana", "cherry"])).unwrap();

        let all = idx.candidate_docs(&scope, &terms(&["banana"]), MatchMode::All).unwrap();
        assert_eq!(all.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
        let all = idx.candidate_docs(&scope, &terms(&["apple", "banana"]), MatchMode::All).unwrap();
        assert_eq!(all.into_iter().collect::<Vec<_>>(), vec!["a"]);
        let any = idx.candidate_docs(&scope, &terms(&["apple", "cherry", "durian"]), MatchMode::Any).unwrap();
        assert_eq!(any.len(), 2);
    }

    #[test]
    fn unknown_term_empties_all_but_not_any() {
        let (idx, scope) = setup();
        idx.add_terms(&scope, "a", &terms(&["apple"])).unwrap();
        assert!(idx.candidate_docs(&scope, &terms(&["apple", "durian"]), MatchMode::All).unwrap().is_empty());
        assert!(idx.candidate_docs(&scope, &terms(&["durian", "apple"]), MatchMode::All).unwrap().is_empty());
        assert_eq!(idx.candidate_docs(&scope, &terms(&["durian", "apple"]), MatchMode::Any).unwrap().len(), 1);
        assert!(idx.candidate_docs(&scope, &[], MatchMode::Any).unwrap().is_empty());
    }

    #[test]
    fn remove_doc_drops_empty_entries() {
        let (idx, scope) = setup();
        idx.add_terms(&scope, "a", &terms(&["apple", "banana"])).unwrap();
        idx.add_terms(&scope, "b", &terms(&["banana"])).unwrap();
        idx.remove_doc(&scope, "a", &terms(&["apple", "banana"])).unwrap();
        assert!(idx.entry(&scope, "apple").unwrap().is_empty());
        assert!(idx.tree(&scope).unwrap().get("apple").unwrap().is_none());
        assert_eq!(idx.entry(&scope, "banana").unwrap().into_iter().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn concurrent_adds_to_one_term_are_not_lost() {
        let (idx, scope) = setup();
        let t = terms(&["shared"]);
        std::thread::scope(|s| {
            for i in 0..8 {
                let (idx, scope, t) = (&idx, &scope, &t);
                s.spawn(move || {
                    for j in 0..25 {
                        idx.add_terms(scope, &format!("doc-{i}-{j}"), t).unwrap();
                    }
                });
            }
        });
        assert_eq!(idx.doc_count(&scope, "shared").unwrap(), 200);
    }
}
