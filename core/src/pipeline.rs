//! Indexing pipeline: add, update, remove, batch and rebuild.
//!
//! A document write walks the stages of [`Stage`] strictly in order. A failing
//! stage aborts the rest and returns its error; completed stages are not
//! rolled back, so the index may hold a document whose vector is stale until
//! the next successful `update`, `remove` or `rebuild` of it.

use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::idf::IdfMap;
use crate::model::{DocId, DocRecord, DocumentTermVector, FieldText, Fields, Scope};
use crate::query::Filter;
use crate::tfidf::tfidf_vector;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Tokenized,
    WordIndexUpdated,
    IdfRefreshed,
    VectorWritten,
    Done,
}

/// What `remove` does with the stored record once its index entries are gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoveMode {
    #[default]
    DeleteRecord,
    /// Keep the record's fields but drop its vector.
    ClearVector,
}

/// One document of a batch.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub id: DocId,
    pub texts: Vec<FieldText>,
    pub fields: Fields,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub indexed: usize,
    pub failed: Vec<(DocId, Error)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
    pub documents: usize,
    pub terms: usize,
}

struct Tokenized {
    vector: DocumentTermVector,
    terms: BTreeSet<String>,
}

struct Weighted {
    vector: DocumentTermVector,
    idf: IdfMap,
}

fn abort(scope: &Scope, id: &str, stage: Stage, e: Error) -> Error {
    tracing::warn!(%scope, id, ?stage, error = %e, "indexing aborted");
    e
}

impl Engine {
    /// Index a document, replacing any earlier version stored under `id`.
    pub fn add(&self, scope: &Scope, id: &str, texts: &[FieldText], fields: Fields) -> Result<DocRecord> {
        let _guard = self.lock_doc(scope, id);
        self.add_locked(scope, id, texts, fields)
    }

    fn add_locked(&self, scope: &Scope, id: &str, texts: &[FieldText], fields: Fields) -> Result<DocRecord> {
        if id.is_empty() {
            return Err(Error::InvalidInput("document id must not be empty".into()));
        }
        tracing::debug!(%scope, id, stage = ?Stage::Received);

        let existing = self.store.get(scope, id).map_err(|e| abort(scope, id, Stage::Received, e))?;
        if existing.is_some() {
            // an add over a stored id must not leave the old terms indexed
            self.remove_locked(scope, id, RemoveMode::DeleteRecord)?;
        }

        let tokenized = self.tokenize(texts).map_err(|e| abort(scope, id, Stage::Tokenized, e))?;
        tracing::debug!(%scope, id, stage = ?Stage::Tokenized, terms = tokenized.terms.len());

        self.index
            .add_terms(scope, id, &tokenized.terms)
            .map_err(|e| abort(scope, id, Stage::WordIndexUpdated, e))?;
        tracing::debug!(%scope, id, stage = ?Stage::WordIndexUpdated);

        let weighted = self.refresh_idf(scope, tokenized).map_err(|e| abort(scope, id, Stage::IdfRefreshed, e))?;
        tracing::debug!(%scope, id, stage = ?Stage::IdfRefreshed);

        let idx = tfidf_vector(&weighted.vector, &weighted.idf);
        let record = DocRecord {
            id: id.to_string(),
            fields,
            total_weight: weighted.vector.total_weight,
            terms: weighted.vector.terms,
            idx,
        };
        self.store.put(scope, &record).map_err(|e| abort(scope, id, Stage::VectorWritten, e))?;
        tracing::debug!(%scope, id, stage = ?Stage::Done);
        Ok(record)
    }

    fn tokenize(&self, texts: &[FieldText]) -> Result<Tokenized> {
        // without a segmenter the record is still stored, just not searchable by text
        let vector = match &self.analyzer {
            Some(analyzer) => analyzer.build(texts)?,
            None => DocumentTermVector::default(),
        };
        let terms = vector.term_set();
        Ok(Tokenized { vector, terms })
    }

    fn refresh_idf(&self, scope: &Scope, tokenized: Tokenized) -> Result<Weighted> {
        // the document being added is not stored yet but already counts
        let total = self.store.count(scope)? + 1;
        let idf = self.idf.refresh(scope, &tokenized.terms, total)?;
        Ok(Weighted { vector: tokenized.vector, idf })
    }

    /// Reindex a document: a full remove followed by a fresh add.
    pub fn update(&self, scope: &Scope, id: &str, texts: &[FieldText], fields: Fields) -> Result<DocRecord> {
        let _guard = self.lock_doc(scope, id);
        self.remove_locked(scope, id, RemoveMode::DeleteRecord)?;
        self.add_locked(scope, id, texts, fields)
    }

    /// Take a document out of the index. Returns `false` when nothing was stored under `id`.
    pub fn remove(&self, scope: &Scope, id: &str, mode: RemoveMode) -> Result<bool> {
        let _guard = self.lock_doc(scope, id);
        self.remove_locked(scope, id, mode)
    }

    fn remove_locked(&self, scope: &Scope, id: &str, mode: RemoveMode) -> Result<bool> {
        let Some(mut record) = self.store.get(scope, id)? else {
            return Ok(false);
        };
        let terms = record.term_set();
        self.index.remove_doc(scope, id, &terms)?;
        match mode {
            RemoveMode::DeleteRecord => {
                self.store.delete(scope, id)?;
            }
            RemoveMode::ClearVector => {
                record.clear_vector();
                self.store.put(scope, &record)?;
            }
        }
        let total = self.store.count(scope)?;
        self.idf.refresh(scope, &terms, total)?;
        tracing::debug!(%scope, id, ?mode, terms = terms.len(), "removed from index");
        Ok(true)
    }

    /// Update many documents concurrently on the worker pool. Failures are
    /// collected per document and do not stop the others. When an id repeats,
    /// only its last occurrence is indexed.
    pub fn add_batch(&self, scope: &Scope, docs: Vec<NewDocument>) -> BatchReport {
        let total = docs.len();
        let mut latest: HashMap<DocId, NewDocument> = HashMap::with_capacity(total);
        for doc in docs {
            latest.insert(doc.id.clone(), doc);
        }
        if latest.len() < total {
            tracing::debug!(%scope, superseded = total - latest.len(), "batch repeats document ids");
        }
        let docs: Vec<NewDocument> = latest.into_values().collect();
        let results: Vec<(DocId, Result<DocRecord>)> = self.pool.install(|| {
            docs.into_par_iter()
                .map(|doc| {
                    let res = self.update(scope, &doc.id, &doc.texts, doc.fields);
                    (doc.id, res)
                })
                .collect()
        });

        let mut report = BatchReport::default();
        for (id, res) in results {
            match res {
                Ok(_) => report.indexed += 1,
                Err(e) => {
                    tracing::warn!(%scope, id = %id, error = %e, "batch document failed");
                    report.failed.push((id, e));
                }
            }
        }
        tracing::info!(%scope, total, indexed = report.indexed, failed = report.failed.len(), "batch indexed");
        report
    }

    /// Rebuild the scope's word index, idf table and every stored vector from
    /// the records' term lists, with idf computed over the whole scope.
    pub fn rebuild(&self, scope: &Scope) -> Result<RebuildReport> {
        let records = self.store.find(scope, &Filter::new())?;
        self.index.clear(scope)?;
        self.idf.clear(scope)?;

        self.pool.install(|| {
            records
                .par_iter()
                .try_for_each(|r| self.index.add_terms(scope, &r.id, r.terms.iter().map(|t| &t.term)))
        })?;

        let terms: BTreeSet<String> = records.iter().flat_map(|r| r.terms.iter().map(|t| t.term.clone())).collect();
        let idf = self.idf.refresh(scope, &terms, records.len())?;

        let documents = records.len();
        self.pool.install(|| {
            records.into_par_iter().try_for_each(|mut r| {
                r.idx = tfidf_vector(&r.vector(), &idf);
                self.store.put(scope, &r)
            })
        })?;
        tracing::info!(%scope, documents, terms = terms.len(), "rebuilt scope");
        Ok(RebuildReport { documents, terms: terms.len() })
    }
}
