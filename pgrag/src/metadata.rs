//! Chunk metadata and containment filters.
//!
//! Metadata is a JSON object ([`Metadata`]). A [`MetadataFilter`] matches a
//! stored chunk when the chunk's metadata *contains* the filter, using the
//! same rules as PostgreSQL's `jsonb @> jsonb` operator so that every
//! [`VectorStore`](crate::VectorStore) backend agrees on what matches:
//!
//! - objects: every filter key is present and its value is contained
//! - arrays: every filter element is contained in some stored element
//! - numbers: compared numerically (`1` matches `1.0`)
//! - other scalars: equal
//!
//! There are no range, negation or comparison operators.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::error::{RagError, Result};

/// Semi-structured chunk metadata: a JSON object.
pub type Metadata = serde_json::Map<String, Value>;

/// A containment filter over chunk [`Metadata`].
///
/// An empty filter imposes no restriction. Build one explicitly with
/// [`MetadataFilter::match_all`] when that is what you mean, in particular
/// before passing it to
/// [`delete_by_metadata_filter`](crate::VectorStore::delete_by_metadata_filter).
///
/// # Example
///
/// ```rust,ignore
/// use pgrag::MetadataFilter;
/// use serde_json::json;
///
/// let filter = MetadataFilter::new().with("document_id", json!(1));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataFilter(Metadata);

impl MetadataFilter {
    /// Create an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// A filter that matches every chunk.
    pub fn match_all() -> Self {
        Self::default()
    }

    /// Build a filter from a JSON value, which must be an object.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(RagError::Validation(format!(
                "metadata filter must be a JSON object, got {other}"
            ))),
        }
    }

    /// Add a required key/value pair.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Whether the filter has no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The underlying JSON object.
    pub fn as_map(&self) -> &Metadata {
        &self.0
    }

    /// Whether a chunk carrying `metadata` satisfies this filter.
    ///
    /// Chunks stored without metadata only match the empty filter.
    pub fn matches(&self, metadata: Option<&Metadata>) -> bool {
        if self.is_empty() {
            return true;
        }
        match metadata {
            Some(stored) => object_contains(stored, &self.0),
            None => false,
        }
    }
}

impl From<Metadata> for MetadataFilter {
    fn from(map: Metadata) -> Self {
        Self(map)
    }
}

fn object_contains(stored: &Metadata, wanted: &Metadata) -> bool {
    wanted.iter().all(|(key, value)| stored.get(key).is_some_and(|s| contains(s, value)))
}

/// jsonb containment: does `stored` contain `wanted`?
pub(crate) fn contains(stored: &Value, wanted: &Value) -> bool {
    match (stored, wanted) {
        (Value::Object(s), Value::Object(w)) => object_contains(s, w),
        (Value::Array(s), Value::Array(w)) => {
            w.iter().all(|item| s.iter().any(|candidate| contains(candidate, item)))
        }
        (Value::Number(s), Value::Number(w)) => numbers_equal(s, w),
        (s, w) => s == w,
    }
}

/// Numeric equality as jsonb sees it: exact for integers, so `1` equals
/// `1.0` but 2^53 + 1 does not equal 2^53.
fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    if a.is_f64() || b.is_f64() {
        return match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        };
    }
    // one side fits only i64 (negative), the other only u64 (above i64::MAX)
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(value: Value) -> Metadata {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn superset_matches_subset_filter() {
        let stored = meta(json!({"document_id": 1, "topic": "security"}));

        assert!(MetadataFilter::new().with("document_id", 1).matches(Some(&stored)));
        assert!(!MetadataFilter::new().with("document_id", 2).matches(Some(&stored)));
        assert!(
            !MetadataFilter::new().with("document_id", 1).with("lang", "en").matches(Some(&stored))
        );
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = MetadataFilter::match_all();
        assert!(filter.matches(None));
        assert!(filter.matches(Some(&Metadata::new())));
    }

    #[test]
    fn missing_metadata_never_matches_non_empty_filter() {
        assert!(!MetadataFilter::new().with("a", 1).matches(None));
    }

    #[test]
    fn numbers_compare_numerically() {
        let stored = meta(json!({"score": 1.0}));
        assert!(MetadataFilter::new().with("score", 1).matches(Some(&stored)));
    }

    #[test]
    fn large_integers_compare_exactly() {
        let above_f64_precision = 9_007_199_254_740_993_i64;
        let stored = meta(json!({"id": above_f64_precision}));
        let neighbour = MetadataFilter::new().with("id", above_f64_precision - 1);
        assert!(!neighbour.matches(Some(&stored)));
        assert!(MetadataFilter::new().with("id", above_f64_precision).matches(Some(&stored)));

        let stored = meta(json!({"id": u64::MAX}));
        assert!(!MetadataFilter::new().with("id", u64::MAX - 1).matches(Some(&stored)));
        assert!(MetadataFilter::new().with("id", u64::MAX).matches(Some(&stored)));
        assert!(!MetadataFilter::new().with("id", -1).matches(Some(&stored)));
    }

    #[test]
    fn values_are_not_coerced_across_types() {
        let stored = meta(json!({"document_id": "1"}));
        assert!(!MetadataFilter::new().with("document_id", 1).matches(Some(&stored)));
    }

    #[test]
    fn nested_objects_and_arrays_use_containment() {
        let stored = meta(json!({
            "source": {"kind": "web", "host": "example.org"},
            "tags": ["security", "auth", "2fa"]
        }));

        let nested = MetadataFilter::from_json(json!({"source": {"kind": "web"}})).unwrap();
        assert!(nested.matches(Some(&stored)));

        let tags = MetadataFilter::from_json(json!({"tags": ["2fa", "security"]})).unwrap();
        assert!(tags.matches(Some(&stored)));

        let wrong_tag = MetadataFilter::from_json(json!({"tags": ["ml"]})).unwrap();
        assert!(!wrong_tag.matches(Some(&stored)));
    }

    #[test]
    fn from_json_rejects_non_objects() {
        assert!(matches!(MetadataFilter::from_json(json!([1, 2])), Err(RagError::Validation(_))));
    }
}
