//! Query strategies: boolean full-text, cosine similarity, plain field match.

use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::model::{DocId, Scope, TfIdfEntry};
use crate::query::Filter;
use crate::tfidf::{cosine, tfidf_vector};
use crate::word_index::MatchMode;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullTextResult {
    pub words: Vec<String>,
    pub ids: Vec<DocId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDoc {
    pub id: DocId,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub words: Vec<String>,
    pub ranked: Vec<ScoredDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleResult {
    pub ids: Vec<DocId>,
}

impl Engine {
    /// Documents containing every query term and matching `filter`, by id.
    ///
    /// A query without terms degrades to a plain filter.
    pub fn full_text_search(&self, scope: &Scope, text: &str, filter: &Filter) -> Result<FullTextResult> {
        let words = self.analyzer()?.build_query(text)?.words();
        if words.is_empty() {
            let ids = self.simple_search(scope, filter)?.ids;
            return Ok(FullTextResult { words, ids });
        }
        let candidates = self.index.candidate_docs(scope, &words, MatchMode::All)?;
        let mut ids = Vec::with_capacity(candidates.len());
        for id in candidates {
            // index entries can outlive a record after an aborted write
            let Some(rec) = self.store.get(scope, &id)? else { continue };
            if filter.matches(&rec.fields) {
                ids.push(id);
            }
        }
        tracing::debug!(%scope, words = words.len(), hits = ids.len(), "full-text search");
        Ok(FullTextResult { words, ids })
    }

    /// Documents ranked by cosine similarity of their stored tf-idf vectors to
    /// the query's. At most `limit` candidates (the configured similarity
    /// limit when `None`) are scored.
    pub fn similarity_search(&self, scope: &Scope, text: &str, filter: &Filter, limit: Option<usize>) -> Result<SimilarityResult> {
        let query = self.analyzer()?.build_query(text)?;
        if query.is_empty() {
            return Ok(SimilarityResult { words: Vec::new(), ranked: Vec::new() });
        }
        let words = query.words();
        let idf = self.idf.idf(self.store.as_ref(), scope, &words)?;
        let qv = tfidf_vector(&query, &idf);
        let ranked = self.rank(scope, &qv, filter, limit, None)?;
        tracing::debug!(%scope, words = words.len(), hits = ranked.len(), "similarity search");
        Ok(SimilarityResult { words, ranked })
    }

    /// Documents similar to a stored one, using its own vector as the query.
    pub fn related(&self, scope: &Scope, id: &str, filter: &Filter, limit: Option<usize>) -> Result<SimilarityResult> {
        let rec = self.store.get(scope, id)?.ok_or_else(|| Error::NotFound(id.to_string()))?;
        let words = rec.idx.iter().map(|e| e.term.clone()).collect();
        let ranked = self.rank(scope, &rec.idx, filter, limit, Some(id))?;
        Ok(SimilarityResult { words, ranked })
    }

    /// Unweighted field match; needs no tokenizer.
    pub fn simple_search(&self, scope: &Scope, filter: &Filter) -> Result<SimpleResult> {
        let ids = self.store.find(scope, filter)?.into_iter().map(|r| r.id).collect();
        Ok(SimpleResult { ids })
    }

    fn rank(&self, scope: &Scope, query: &[TfIdfEntry], filter: &Filter, limit: Option<usize>, exclude: Option<&str>) -> Result<Vec<ScoredDoc>> {
        let limit = limit.unwrap_or(self.similarity_limit).max(1);

        // union of the terms' entries, with how many query terms each shares
        let mut shared: HashMap<DocId, usize> = HashMap::new();
        for e in query {
            for id in self.index.entry(scope, &e.term)? {
                *shared.entry(id).or_insert(0) += 1;
            }
        }
        if let Some(id) = exclude {
            shared.remove(id);
        }
        let mut candidates: Vec<(DocId, usize)> = shared.into_iter().collect();
        candidates.sort_by(|a, b| (Reverse(a.1), &a.0).cmp(&(Reverse(b.1), &b.0)));

        let mut scored = Vec::new();
        let mut examined = 0;
        for (id, _) in candidates {
            if examined == limit {
                break;
            }
            let Some(rec) = self.store.get(scope, &id)? else { continue };
            if !filter.matches(&rec.fields) {
                continue;
            }
            examined += 1;
            if let Some(score) = cosine(query, &rec.idx) {
                scored.push(ScoredDoc { id, score });
            }
        }
        scored.sort_by(|a, b| {
            b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal).then_with(|| a.id.cmp(&b.id))
        });
        Ok(scored)
    }
}
