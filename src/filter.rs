//! Metadata filtering for search results.
//!
//! A [`MetadataFilter`] is an immutable predicate tree built once and
//! evaluated against each candidate document's metadata. Evaluation never
//! fails: a predicate that does not apply to a field (missing key, wrong
//! type) is simply false for that node, so imprecise filters exclude
//! documents instead of aborting the query.
//!
//! Filters can be built with the constructor helpers or parsed from JSON.
//! The JSON shape is also what serde produces, so a filter serialized with
//! `serde_json` parses back with [`MetadataFilter::from_json`]:
//!
//! ```
//! use serde_json::json;
//! use storex::MetadataFilter;
//!
//! let filter = MetadataFilter::from_json(&json!({
//!     "op": "AND",
//!     "children": [
//!         {"op": "EQ", "field": "category", "value": "news"},
//!         {"op": "GTE", "field": "year", "value": 2020}
//!     ]
//! })).unwrap();
//!
//! let built = MetadataFilter::and(vec![
//!     MetadataFilter::equals("category", "news"),
//!     MetadataFilter::at_least("year", 2020.0),
//! ]);
//! assert_eq!(filter, built);
//! ```

use crate::document::{Metadata, MetadataValue};
use crate::error::{Result, VectorDbError};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::ops::Bound;

/// Metadata predicate expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "FilterSpec", into = "FilterSpec")]
pub enum MetadataFilter {
    /// Field is present and holds an equal value of the same type
    Equals { field: String, value: MetadataValue },

    /// Field is present and holds a different value
    NotEquals { field: String, value: MetadataValue },

    /// Field is present and equals one of `values`
    In {
        field: String,
        values: Vec<MetadataValue>,
    },

    /// Field is present and equals none of `values`
    NotIn {
        field: String,
        values: Vec<MetadataValue>,
    },

    /// Field is numeric and lies within the bounds
    Range {
        field: String,
        min: Bound<f64>,
        max: Bound<f64>,
    },

    /// Field is present, whatever its value
    Exists { field: String },

    And(Vec<MetadataFilter>),

    Or(Vec<MetadataFilter>),

    Not(Box<MetadataFilter>),
}

impl MetadataFilter {
    pub fn equals(field: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        MetadataFilter::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn not_equals(field: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        MetadataFilter::NotEquals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_in<V: Into<MetadataValue>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        MetadataFilter::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn not_in<V: Into<MetadataValue>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        MetadataFilter::NotIn {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Inclusive range `min <= field <= max`.
    pub fn range(field: impl Into<String>, min: f64, max: f64) -> Self {
        MetadataFilter::Range {
            field: field.into(),
            min: Bound::Included(min),
            max: Bound::Included(max),
        }
    }

    /// `field > value`
    pub fn greater_than(field: impl Into<String>, value: f64) -> Self {
        MetadataFilter::Range {
            field: field.into(),
            min: Bound::Excluded(value),
            max: Bound::Unbounded,
        }
    }

    /// `field >= value`
    pub fn at_least(field: impl Into<String>, value: f64) -> Self {
        MetadataFilter::Range {
            field: field.into(),
            min: Bound::Included(value),
            max: Bound::Unbounded,
        }
    }

    /// `field < value`
    pub fn less_than(field: impl Into<String>, value: f64) -> Self {
        MetadataFilter::Range {
            field: field.into(),
            min: Bound::Unbounded,
            max: Bound::Excluded(value),
        }
    }

    /// `field <= value`
    pub fn at_most(field: impl Into<String>, value: f64) -> Self {
        MetadataFilter::Range {
            field: field.into(),
            min: Bound::Unbounded,
            max: Bound::Included(value),
        }
    }

    pub fn exists(field: impl Into<String>) -> Self {
        MetadataFilter::Exists {
            field: field.into(),
        }
    }

    pub fn and(filters: Vec<MetadataFilter>) -> Self {
        MetadataFilter::And(filters)
    }

    pub fn or(filters: Vec<MetadataFilter>) -> Self {
        MetadataFilter::Or(filters)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: MetadataFilter) -> Self {
        MetadataFilter::Not(Box::new(filter))
    }

    /// Evaluate the predicate against a metadata map.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        match self {
            MetadataFilter::Equals { field, value } => metadata
                .get(field)
                .map_or(false, |actual| values_equal(actual, value)),

            MetadataFilter::NotEquals { field, value } => metadata
                .get(field)
                .map_or(false, |actual| !values_equal(actual, value)),

            MetadataFilter::In { field, values } => metadata
                .get(field)
                .map_or(false, |actual| values.iter().any(|v| values_equal(actual, v))),

            MetadataFilter::NotIn { field, values } => metadata
                .get(field)
                .map_or(false, |actual| !values.iter().any(|v| values_equal(actual, v))),

            MetadataFilter::Range { field, min, max } => metadata
                .get(field)
                .and_then(MetadataValue::as_f64)
                .map_or(false, |x| within(x, *min, *max)),

            MetadataFilter::Exists { field } => metadata.contains_key(field),

            // Empty AND matches everything, empty OR matches nothing
            MetadataFilter::And(filters) => filters.iter().all(|f| f.matches(metadata)),

            MetadataFilter::Or(filters) => filters.iter().any(|f| f.matches(metadata)),

            MetadataFilter::Not(inner) => !inner.matches(metadata),
        }
    }

    /// Parse a filter from its JSON specification.
    ///
    /// Every node is an object with an upper-case `"op"` key:
    /// - `EQ`, `NEQ`: `field` and a scalar `value`
    /// - `LT`, `LTE`, `GT`, `GTE`: `field` and a numeric `value`
    /// - `IN`, `NIN`: `field` and a `values` array
    /// - `RANGE`: `field` and optional inclusive `min` / `max`. With neither,
    ///   the node matches any numeric field.
    /// - `EXISTS`: `field`
    /// - `AND`, `OR`: a `children` array
    /// - `NOT`: a `child` object
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        MetadataFilter::deserialize(value).map_err(|e| VectorDbError::InvalidFilter(e.to_string()))
    }
}

/// Wire form of a filter node, tagged by `"op"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "UPPERCASE")]
enum FilterSpec {
    Eq {
        field: String,
        value: MetadataValue,
    },
    Neq {
        field: String,
        value: MetadataValue,
    },
    Lt {
        field: String,
        value: f64,
    },
    Lte {
        field: String,
        value: f64,
    },
    Gt {
        field: String,
        value: f64,
    },
    Gte {
        field: String,
        value: f64,
    },
    In {
        field: String,
        values: Vec<MetadataValue>,
    },
    Nin {
        field: String,
        values: Vec<MetadataValue>,
    },
    Range {
        field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    Exists {
        field: String,
    },
    And {
        children: Vec<FilterSpec>,
    },
    Or {
        children: Vec<FilterSpec>,
    },
    Not {
        child: Box<FilterSpec>,
    },
}

impl From<FilterSpec> for MetadataFilter {
    fn from(spec: FilterSpec) -> Self {
        match spec {
            FilterSpec::Eq { field, value } => MetadataFilter::Equals { field, value },
            FilterSpec::Neq { field, value } => MetadataFilter::NotEquals { field, value },
            FilterSpec::Lt { field, value } => MetadataFilter::less_than(field, value),
            FilterSpec::Lte { field, value } => MetadataFilter::at_most(field, value),
            FilterSpec::Gt { field, value } => MetadataFilter::greater_than(field, value),
            FilterSpec::Gte { field, value } => MetadataFilter::at_least(field, value),
            FilterSpec::In { field, values } => MetadataFilter::In { field, values },
            FilterSpec::Nin { field, values } => MetadataFilter::NotIn { field, values },
            FilterSpec::Range { field, min, max } => MetadataFilter::Range {
                field,
                min: min.map_or(Bound::Unbounded, Bound::Included),
                max: max.map_or(Bound::Unbounded, Bound::Included),
            },
            FilterSpec::Exists { field } => MetadataFilter::Exists { field },
            FilterSpec::And { children } => {
                MetadataFilter::And(children.into_iter().map(Into::into).collect())
            }
            FilterSpec::Or { children } => {
                MetadataFilter::Or(children.into_iter().map(Into::into).collect())
            }
            FilterSpec::Not { child } => MetadataFilter::not((*child).into()),
        }
    }
}

impl From<MetadataFilter> for FilterSpec {
    fn from(filter: MetadataFilter) -> Self {
        match filter {
            MetadataFilter::Equals { field, value } => FilterSpec::Eq { field, value },
            MetadataFilter::NotEquals { field, value } => FilterSpec::Neq { field, value },
            MetadataFilter::In { field, values } => FilterSpec::In { field, values },
            MetadataFilter::NotIn { field, values } => FilterSpec::Nin { field, values },
            MetadataFilter::Range { field, min, max } => range_spec(field, min, max),
            MetadataFilter::Exists { field } => FilterSpec::Exists { field },
            MetadataFilter::And(filters) => FilterSpec::And {
                children: filters.into_iter().map(Into::into).collect(),
            },
            MetadataFilter::Or(filters) => FilterSpec::Or {
                children: filters.into_iter().map(Into::into).collect(),
            },
            MetadataFilter::Not(inner) => FilterSpec::Not {
                child: Box::new((*inner).into()),
            },
        }
    }
}

/// Inclusive and open-ended bounds map onto `RANGE`, single exclusive or
/// inclusive bounds onto the comparison ops. Anything else splits into an
/// `AND` of its two ends.
fn range_spec(field: String, min: Bound<f64>, max: Bound<f64>) -> FilterSpec {
    match (min, max) {
        (Bound::Unbounded, Bound::Unbounded) => FilterSpec::Range {
            field,
            min: None,
            max: None,
        },
        (Bound::Included(lo), Bound::Included(hi)) => FilterSpec::Range {
            field,
            min: Some(lo),
            max: Some(hi),
        },
        (Bound::Included(value), Bound::Unbounded) => FilterSpec::Gte { field, value },
        (Bound::Excluded(value), Bound::Unbounded) => FilterSpec::Gt { field, value },
        (Bound::Unbounded, Bound::Included(value)) => FilterSpec::Lte { field, value },
        (Bound::Unbounded, Bound::Excluded(value)) => FilterSpec::Lt { field, value },
        (min, max) => FilterSpec::And {
            children: vec![
                range_spec(field.clone(), min, Bound::Unbounded),
                range_spec(field, Bound::Unbounded, max),
            ],
        },
    }
}

/// Typed equality. Values of different variants never compare equal.
fn values_equal(actual: &MetadataValue, expected: &MetadataValue) -> bool {
    match (actual, expected) {
        (MetadataValue::Null, MetadataValue::Null) => true,
        (MetadataValue::Bool(a), MetadataValue::Bool(b)) => a == b,
        (MetadataValue::Int(a), MetadataValue::Int(b)) => a == b,
        (MetadataValue::Float(a), MetadataValue::Float(b)) => a == b,
        (MetadataValue::String(a), MetadataValue::String(b)) => a == b,
        (MetadataValue::Null, _)
        | (MetadataValue::Bool(_), _)
        | (MetadataValue::Int(_), _)
        | (MetadataValue::Float(_), _)
        | (MetadataValue::String(_), _) => false,
    }
}

fn within(x: f64, min: Bound<f64>, max: Bound<f64>) -> bool {
    let above = match min {
        Bound::Included(m) => x >= m,
        Bound::Excluded(m) => x > m,
        Bound::Unbounded => true,
    };
    let below = match max {
        Bound::Included(m) => x <= m,
        Bound::Excluded(m) => x < m,
        Bound::Unbounded => true,
    };
    above && below
}
