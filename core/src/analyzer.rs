//! Document term-vector construction.

use crate::error::{Error, Result};
use crate::filter::{PosFilter, PosRule, TermFilterState};
use crate::model::{DocumentTermVector, FieldText, Fields, TermWeight};
use crate::normalize::normalize;
use crate::tokenizer::Tokenizer;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Sentence punctuation texts are split on before segmentation.
const SENTENCE_MARKS: [char; 2] = ['。', '、'];

pub struct Analyzer {
    tokenizer: Arc<dyn Tokenizer>,
    pos: PosFilter,
    blacklist: Arc<TermFilterState>,
}

impl Analyzer {
    /// `whitelist` falls back to the tokenizer's default rules when `None`.
    pub fn new(tokenizer: Arc<dyn Tokenizer>, whitelist: Option<Vec<PosRule>>, blacklist: Arc<TermFilterState>) -> Self {
        let rules = whitelist.unwrap_or_else(|| tokenizer.default_whitelist());
        Self { tokenizer, pos: PosFilter::new(rules), blacklist }
    }

    pub fn tokenizer_name(&self) -> &'static str {
        self.tokenizer.name()
    }

    /// Accumulate all field texts into one weighted term vector.
    pub fn build(&self, fields: &[FieldText]) -> Result<DocumentTermVector> {
        let mut acc: BTreeMap<String, TermWeight> = BTreeMap::new();
        let mut total = 0.0;
        for field in fields {
            check_weight(field.weight)?;
            let text = normalize(&field.text);
            for sentence in text.split(SENTENCE_MARKS) {
                for m in self.tokenizer.tokenize(sentence)? {
                    if !self.pos.accepts(&m) {
                        continue;
                    }
                    let term = m.term();
                    if term.is_empty() || self.blacklist.contains(term) {
                        continue;
                    }
                    let entry = acc.entry(term.to_string()).or_insert_with(|| TermWeight {
                        term: term.to_string(),
                        weight: 0.0,
                        count: 0,
                        readings: BTreeSet::new(),
                    });
                    entry.weight += field.weight;
                    entry.count += 1;
                    entry.readings.insert(term.to_string());
                    entry.readings.insert(m.surface.clone());
                    if let Some(reading) = &m.reading {
                        entry.readings.insert(reading.clone());
                    }
                    total += field.weight;
                }
            }
        }
        Ok(DocumentTermVector { terms: acc.into_values().collect(), total_weight: total })
    }

    /// Convenience for queries: one text at weight 1.
    pub fn build_query(&self, text: &str) -> Result<DocumentTermVector> {
        self.build(&[FieldText::new(text, 1.0)])
    }
}

fn check_weight(weight: f64) -> Result<()> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("field weight must be a non-negative number, got {weight}")))
    }
}

/// Pick the weighted texts out of a document's fields.
///
/// Missing and null fields are skipped. Numbers and booleans are indexed as
/// their text, arrays of scalars are joined with spaces.
pub fn field_texts(fields: &Fields, weights: &BTreeMap<String, f64>) -> Result<Vec<FieldText>> {
    if weights.is_empty() {
        return Err(Error::InvalidInput("field weight map is empty".into()));
    }
    let mut out = Vec::with_capacity(weights.len());
    for (name, weight) in weights {
        check_weight(*weight)?;
        let text = match fields.get(name) {
            None | Some(Value::Null) => continue,
            Some(Value::Array(items)) => {
                let parts = items.iter().map(|v| scalar_text(name, v)).collect::<Result<Vec<_>>>()?;
                parts.join(" ")
            }
            Some(v) => scalar_text(name, v)?,
        };
        out.push(FieldText::new(text, *weight));
    }
    Ok(out)
}

fn scalar_text(name: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        _ => Err(Error::InvalidInput(format!("field {name} is not text"))),
    }
}
