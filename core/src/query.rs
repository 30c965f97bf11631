//! Structural filters over stored document fields.
//!
//! Filters are JSON objects mapping a field (dotted paths reach into nested
//! objects) to either a literal, meaning equality, or an operator object:
//!
//! ```json
//! {"status": "open", "tags": {"$in": ["rust", "search"]}, "year": {"$gte": 2014}}
//! ```
//!
//! Array-valued fields match when any element matches. All clauses must hold.

use crate::model::Fields;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter {
    pub clauses: BTreeMap<String, Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    Ops(Operators),
    Eq(Value),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Operators {
    #[serde(rename = "$eq", default, skip_serializing_if = "Option::is_none")]
    pub eq: Option<Value>,
    #[serde(rename = "$ne", default, skip_serializing_if = "Option::is_none")]
    pub ne: Option<Value>,
    #[serde(rename = "$in", default, skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<Value>>,
    #[serde(rename = "$nin", default, skip_serializing_if = "Option::is_none")]
    pub none_of: Option<Vec<Value>>,
    #[serde(rename = "$gt", default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<Value>,
    #[serde(rename = "$gte", default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<Value>,
    #[serde(rename = "$lt", default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<Value>,
    #[serde(rename = "$lte", default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<Value>,
    #[serde(rename = "$exists", default, skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.insert(field.into(), Condition::Eq(value.into()));
        self
    }

    pub fn any_of(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.clauses
            .insert(field.into(), Condition::Ops(Operators { any_of: Some(values), ..Default::default() }));
        self
    }

    /// Inclusive range; either bound may be open.
    pub fn range(mut self, field: impl Into<String>, gte: Option<Value>, lte: Option<Value>) -> Self {
        self.clauses.insert(field.into(), Condition::Ops(Operators { gte, lte, ..Default::default() }));
        self
    }

    pub fn matches(&self, fields: &Fields) -> bool {
        self.clauses.iter().all(|(path, cond)| cond.matches(lookup(fields, path)))
    }
}

fn lookup<'a>(fields: &'a Fields, path: &str) -> Option<&'a Value> {
    if let Some(v) = fields.get(path) {
        return Some(v);
    }
    let mut parts = path.split('.');
    let mut cur = fields.get(parts.next()?)?;
    for part in parts {
        cur = cur.as_object()?.get(part)?;
    }
    Some(cur)
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn equals(a: &Value, b: &Value) -> bool {
    compare(a, b) == Some(Ordering::Equal) || a == b
}

/// Apply `pred` to the value itself or, for arrays, to any element.
fn any_value(value: &Value, pred: impl Fn(&Value) -> bool) -> bool {
    match value {
        Value::Array(items) => pred(value) || items.iter().any(&pred),
        v => pred(v),
    }
}

impl Condition {
    fn matches(&self, value: Option<&Value>) -> bool {
        match self {
            Condition::Eq(expected) => match value {
                None => expected.is_null(),
                Some(v) => any_value(v, |x| equals(x, expected)),
            },
            Condition::Ops(ops) => ops.matches(value),
        }
    }
}

impl Operators {
    fn matches(&self, value: Option<&Value>) -> bool {
        if let Some(exists) = self.exists {
            if value.is_some() != exists {
                return false;
            }
        }
        let null = Value::Null;
        let v = value.unwrap_or(&null);

        if let Some(e) = &self.eq {
            if !any_value(v, |x| equals(x, e)) {
                return false;
            }
        }
        if let Some(e) = &self.ne {
            if any_value(v, |x| equals(x, e)) {
                return false;
            }
        }
        if let Some(set) = &self.any_of {
            if !set.iter().any(|e| any_value(v, |x| equals(x, e))) {
                return false;
            }
        }
        if let Some(set) = &self.none_of {
            if set.iter().any(|e| any_value(v, |x| equals(x, e))) {
                return false;
            }
        }
        let bounds: [(&Option<Value>, fn(Ordering) -> bool); 4] = [
            (&self.gt, |o| o == Ordering::Greater),
            (&self.gte, |o| o != Ordering::Less),
            (&self.lt, |o| o == Ordering::Less),
            (&self.lte, |o| o != Ordering::Greater),
        ];
        for (bound, accept) in bounds {
            if let Some(b) = bound {
                if !any_value(v, |x| compare(x, b).map_or(false, accept)) {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(v: Value) -> Fields {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn literal_means_equality() {
        let f: Filter = serde_json::from_value(json!({"status": "open", "n": 1})).unwrap();
        assert!(f.matches(&fields(json!({"status": "open", "n": 1.0}))));
        assert!(!f.matches(&fields(json!({"status": "closed", "n": 1}))));
    }

    #[test]
    fn arrays_match_any_element() {
        let f = Filter::new().eq("tags", "rust");
        assert!(f.matches(&fields(json!({"tags": ["go", "rust"]}))));
        assert!(!f.matches(&fields(json!({"tags": ["go"]}))));
    }

    #[test]
    fn range_and_set_operators() {
        let f: Filter = serde_json::from_value(json!({
            "year": {"$gte": 2010, "$lt": 2020},
            "lang": {"$in": ["ja", "zh"]},
            "kind": {"$nin": ["draft"]}
        }))
        .unwrap();
        assert!(f.matches(&fields(json!({"year": 2014, "lang": "ja", "kind": "memo"}))));
        assert!(!f.matches(&fields(json!({"year": 2020, "lang": "ja"}))));
        assert!(!f.matches(&fields(json!({"year": 2014, "lang": "en"}))));
        assert!(!f.matches(&fields(json!({"year": 2014, "lang": "zh", "kind": "draft"}))));
        assert!(!f.matches(&fields(json!({"lang": "zh"}))));
    }

    #[test]
    fn exists_and_null() {
        let f: Filter = serde_json::from_value(json!({"owner": {"$exists": false}})).unwrap();
        assert!(f.matches(&fields(json!({}))));
        assert!(!f.matches(&fields(json!({"owner": "x"}))));
        let g = Filter::new().eq("owner", Value::Null);
        assert!(g.matches(&fields(json!({}))));
    }

    #[test]
    fn dotted_paths_reach_nested_fields() {
        let f = Filter::new().range("meta.size", Some(json!(10)), None);
        assert!(f.matches(&fields(json!({"meta": {"size": 12}}))));
        assert!(!f.matches(&fields(json!({"meta": {"size": 2}}))));
    }

    #[test]
    fn nested_literal_object_is_equality() {
        let f: Filter = serde_json::from_value(json!({"meta": {"a": 1}})).unwrap();
        assert_eq!(f.clauses["meta"], Condition::Eq(json!({"a": 1})));
        assert!(f.matches(&fields(json!({"meta": {"a": 1}}))));
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(Filter::new().matches(&fields(json!({"x": 1}))));
    }
}
