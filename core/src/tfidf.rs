use crate::idf::IdfMap;
use crate::model::{DocumentTermVector, TfIdfEntry};
use std::cmp::Ordering;

/// Turn a weighted term vector into tf-idf entries, keeping the vector's term order.
///
/// tf = weight / total_weight, or 0 for an empty total. Terms missing from
/// `idf` get idf 0.
pub fn tfidf_vector(vector: &DocumentTermVector, idf: &IdfMap) -> Vec<TfIdfEntry> {
    vector
        .terms
        .iter()
        .map(|t| {
            let tf = if vector.total_weight > 0.0 { t.weight / vector.total_weight } else { 0.0 };
            let idf = idf.get(&t.term).copied().unwrap_or(0.0);
            TfIdfEntry { term: t.term.clone(), tf, idf, tfidf: tf * idf }
        })
        .collect()
}

/// Euclidean norm of the tf-idf weights.
pub fn norm(entries: &[TfIdfEntry]) -> f64 {
    entries.iter().map(|e| e.tfidf * e.tfidf).sum::<f64>().sqrt()
}

/// Cosine similarity of two term-sorted tf-idf vectors.
///
/// cos = Σ(q_i * d_i) / (‖q‖ * ‖d‖), with terms absent from either side
/// contributing nothing to the sum. `None` when the dot product is not
/// positive, which also covers zero norms.
pub fn cosine(query: &[TfIdfEntry], doc: &[TfIdfEntry]) -> Option<f64> {
    let mut q = query.iter().peekable();
    let mut d = doc.iter().peekable();
    let mut dot = 0.0;
    while let (Some(&a), Some(&b)) = (q.peek(), d.peek()) {
        match a.term.cmp(&b.term) {
            Ordering::Equal => {
                dot += a.tfidf * b.tfidf;
                q.next();
                d.next();
            }
            Ordering::Less => {
                q.next();
            }
            Ordering::Greater => {
                d.next();
            }
        }
    }
    if dot <= 0.0 {
        return None;
    }
    let denom = norm(query) * norm(doc);
    if denom <= 0.0 || !denom.is_finite() {
        return None;
    }
    // rounding can push a self-comparison a hair above 1
    Some((dot / denom).min(1.0))
}
