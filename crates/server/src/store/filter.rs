//! MongoDB-style query documents with an in-memory evaluator.
//!
//! A [`Filter`] is a MongoDB operator document (`$eq`, `$gte`, `$regex`,
//! `$or`, ...) built through a typed builder. The MongoDB backend hands the
//! document to the server untouched; the JSON backend evaluates the same
//! document with [`matches`], so a query behaves identically on both
//! backends.
//!
//! Values are plain `serde_json` values. RFC 3339 timestamp strings compare
//! chronologically (not lexicographically) so date-range filters and
//! `createdAt` sorts are exact regardless of fractional-second precision.

use std::cmp::Ordering;

use chrono::DateTime;
use serde::Serialize;
use serde_json::{Map, Value};

/// A MongoDB-style query document.
///
/// An empty filter matches every document.
#[derive(Debug, Clone, Default)]
pub struct Filter(Map<String, Value>);

impl Filter {
    /// A filter that matches all documents.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Exact equality on a field (dotted paths reach into subdocuments).
    #[must_use]
    pub fn eq(self, field: &str, value: impl Serialize) -> Self {
        self.op(field, "$eq", value)
    }

    /// Field must not equal the value (missing fields match).
    #[must_use]
    pub fn ne(self, field: &str, value: impl Serialize) -> Self {
        self.op(field, "$ne", value)
    }

    /// Field must be strictly greater than the value.
    #[must_use]
    pub fn gt(self, field: &str, value: impl Serialize) -> Self {
        self.op(field, "$gt", value)
    }

    /// Field must be greater than or equal to the value.
    #[must_use]
    pub fn gte(self, field: &str, value: impl Serialize) -> Self {
        self.op(field, "$gte", value)
    }

    /// Field must be strictly less than the value.
    #[must_use]
    pub fn lt(self, field: &str, value: impl Serialize) -> Self {
        self.op(field, "$lt", value)
    }

    /// Field must be less than or equal to the value.
    #[must_use]
    pub fn lte(self, field: &str, value: impl Serialize) -> Self {
        self.op(field, "$lte", value)
    }

    /// Field must equal one of the given values.
    #[must_use]
    pub fn r#in(self, field: &str, values: impl IntoIterator<Item = impl Serialize>) -> Self {
        let list: Vec<Value> = values.into_iter().map(to_value).collect();
        self.op(field, "$in", list)
    }

    /// Field must match the regular expression.
    ///
    /// Translates to `{"$regex": pattern, "$options": "i"?}` for MongoDB and
    /// a compiled [`regex::Regex`] for the JSON backend.
    #[must_use]
    pub fn regex(self, field: &str, pattern: &str, case_insensitive: bool) -> Self {
        let mut cond = Map::new();
        cond.insert("$regex".to_string(), Value::String(pattern.to_string()));
        if case_insensitive {
            cond.insert("$options".to_string(), Value::String("i".to_string()));
        }
        self.raw(field, Value::Object(cond))
    }

    /// At least one of the given filters must match.
    #[must_use]
    pub fn any(branches: impl IntoIterator<Item = Self>) -> Self {
        let list: Vec<Value> = branches
            .into_iter()
            .map(|f| Value::Object(f.0))
            .collect();
        let mut map = Map::new();
        map.insert("$or".to_string(), Value::Array(list));
        Self(map)
    }

    /// Whether the filter matches every document.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The underlying operator document.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    fn op(mut self, field: &str, op: &str, value: impl Serialize) -> Self {
        let value = to_value(value);
        match self.0.get_mut(field) {
            // Merge with existing operators on the same field, e.g.
            // gte("price", a).lte("price", b) -> {"price": {"$gte": a, "$lte": b}}
            Some(Value::Object(ops)) if ops.keys().any(|k| k.starts_with('$')) => {
                ops.insert(op.to_string(), value);
            }
            _ => {
                let mut cond = Map::new();
                cond.insert(op.to_string(), value);
                self.0.insert(field.to_string(), Value::Object(cond));
            }
        }
        self
    }

    fn raw(mut self, field: &str, cond: Value) -> Self {
        self.0.insert(field.to_string(), cond);
        self
    }
}

/// A `$set`-style update document.
#[derive(Debug, Clone, Default)]
pub struct Update(Map<String, Value>);

impl Update {
    /// Set a field (dotted paths create nested subdocuments).
    #[must_use]
    pub fn set(mut self, field: &str, value: impl Serialize) -> Self {
        self.0.insert(field.to_string(), to_value(value));
        self
    }

    /// Whether the update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The underlying field map.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Sort direction for [`FindOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Sort, limit, and skip options for `find_many`.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub sort: Option<(String, SortOrder)>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
}

impl FindOptions {
    /// Sort ascending by a field.
    #[must_use]
    pub fn sort_asc(mut self, field: &str) -> Self {
        self.sort = Some((field.to_string(), SortOrder::Asc));
        self
    }

    /// Sort descending by a field.
    #[must_use]
    pub fn sort_desc(mut self, field: &str) -> Self {
        self.sort = Some((field.to_string(), SortOrder::Desc));
        self
    }

    /// Return at most `n` documents.
    #[must_use]
    pub const fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Skip the first `n` documents.
    #[must_use]
    pub const fn skip(mut self, n: usize) -> Self {
        self.skip = Some(n);
        self
    }
}

fn to_value(value: impl Serialize) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

// =============================================================================
// In-memory evaluation (JSON backend)
// =============================================================================

/// Evaluate a filter document against a JSON document.
pub(crate) fn matches(filter: &Map<String, Value>, doc: &Value) -> bool {
    filter.iter().all(|(key, cond)| match key.as_str() {
        "$or" => cond.as_array().is_some_and(|branches| {
            branches
                .iter()
                .any(|b| b.as_object().is_some_and(|m| matches(m, doc)))
        }),
        "$and" => cond.as_array().is_some_and(|branches| {
            branches
                .iter()
                .all(|b| b.as_object().is_some_and(|m| matches(m, doc)))
        }),
        field => field_matches(lookup(doc, field), cond),
    })
}

/// Resolve a dotted field path inside a document.
fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |value, segment| value.get(segment))
}

fn field_matches(actual: Option<&Value>, cond: &Value) -> bool {
    let Value::Object(ops) = cond else {
        // Bare value means equality, as in MongoDB.
        return actual.is_some_and(|a| values_equal(a, cond));
    };

    if !ops.keys().any(|k| k.starts_with('$')) {
        // A plain subdocument also means equality.
        return actual.is_some_and(|a| values_equal(a, cond));
    }

    ops.iter().all(|(op, rhs)| match op.as_str() {
        "$eq" => actual.is_some_and(|a| values_equal(a, rhs)),
        "$ne" => !actual.is_some_and(|a| values_equal(a, rhs)),
        "$gt" => cmp_is(actual, rhs, |o| o == Ordering::Greater),
        "$gte" => cmp_is(actual, rhs, |o| o != Ordering::Less),
        "$lt" => cmp_is(actual, rhs, |o| o == Ordering::Less),
        "$lte" => cmp_is(actual, rhs, |o| o != Ordering::Greater),
        "$in" => rhs.as_array().is_some_and(|list| {
            actual.is_some_and(|a| list.iter().any(|v| values_equal(a, v)))
        }),
        "$regex" => regex_matches(actual, rhs, ops.get("$options")),
        // Handled alongside $regex.
        "$options" => true,
        _ => false,
    })
}

fn cmp_is(actual: Option<&Value>, rhs: &Value, pred: impl Fn(Ordering) -> bool) -> bool {
    actual
        .and_then(|a| compare_values(a, rhs))
        .is_some_and(pred)
}

fn regex_matches(actual: Option<&Value>, pattern: &Value, options: Option<&Value>) -> bool {
    let (Some(Value::String(s)), Value::String(pattern)) = (actual, pattern) else {
        return false;
    };
    let case_insensitive = options
        .and_then(Value::as_str)
        .is_some_and(|o| o.contains('i'));

    regex::RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .is_ok_and(|re| re.is_match(s))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    compare_values(a, b) == Some(Ordering::Equal)
}

/// Compare two JSON values the way MongoDB would for query purposes.
///
/// Numbers compare numerically across integer/float representations, and
/// strings that both parse as RFC 3339 timestamps compare chronologically.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            x.as_f64().and_then(|x| y.as_f64().and_then(|y| x.partial_cmp(&y)))
        }
        (Value::String(x), Value::String(y)) => {
            match (
                DateTime::parse_from_rfc3339(x),
                DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(dx), Ok(dy)) => Some(dx.cmp(&dy)),
                _ => Some(x.cmp(y)),
            }
        }
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}
