//! Multilingual TF-IDF search core.
//!
//! Text goes through a pluggable segmenter into weighted term vectors. Each
//! scope (tenant code + collection) keeps an inverted word index, an idf
//! dictionary and per-document tf-idf vectors in a sled database, and answers
//! boolean full-text, cosine-similarity and plain field queries.

pub mod analyzer;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod idf;
pub mod model;
pub mod normalize;
pub mod persist;
pub mod pipeline;
pub mod query;
pub mod search;
pub mod store;
pub mod tfidf;
pub mod tokenizer;
pub mod word_index;

pub use config::{Config, TokenizerConfig};
pub use engine::Engine;
pub use error::{Error, Result};
pub use model::{DocId, DocRecord, DocumentTermVector, FieldText, Fields, Scope, TermWeight, TfIdfEntry};
pub use pipeline::{BatchReport, NewDocument, RebuildReport, RemoveMode};
pub use query::Filter;
pub use search::{FullTextResult, ScoredDoc, SimilarityResult, SimpleResult};
pub use word_index::MatchMode;
