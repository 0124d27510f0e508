use serde::Serialize;
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::error::Error;

/// Discriminator literals the service uses in an aggregation's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregationKind {
    Term,
    Filter,
    Nested,
    Histogram,
    Timeslice,
    TopHits,
    UniqueCount,
    Max,
    Min,
    Average,
    Sum,
}

impl AggregationKind {
    pub const ALL: [AggregationKind; 11] = [
        Self::Term,
        Self::Filter,
        Self::Nested,
        Self::Histogram,
        Self::Timeslice,
        Self::TopHits,
        Self::UniqueCount,
        Self::Max,
        Self::Min,
        Self::Average,
        Self::Sum,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Term => "term",
            Self::Filter => "filter",
            Self::Nested => "nested",
            Self::Histogram => "histogram",
            Self::Timeslice => "timeslice",
            Self::TopHits => "top_hits",
            Self::UniqueCount => "unique_count",
            Self::Max => "max",
            Self::Min => "min",
            Self::Average => "average",
            Self::Sum => "sum",
        }
    }

    /// Exact, case-sensitive match on the wire literal.
    pub fn parse(literal: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == literal)
    }
}

impl FromStr for AggregationKind {
    type Err = Error;

    fn from_str(literal: &str) -> Result<Self, Self::Err> {
        Self::parse(literal)
            .ok_or_else(|| Error::UnrecognizedAggregationKind(literal.to_string()))
    }
}

impl std::fmt::Display for AggregationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded aggregation from a query response.
///
/// Serializes back to the service's shape, including the `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Aggregation {
    Term(Term),
    Filter(Filter),
    Nested(Nested),
    Histogram(Histogram),
    Timeslice(Timeslice),
    TopHits(TopHits),
    UniqueCount(UniqueCount),
    Max(Calculation),
    Min(Calculation),
    Average(Calculation),
    Sum(Calculation),
}

impl Aggregation {
    pub fn kind(&self) -> AggregationKind {
        match self {
            Self::Term(_) => AggregationKind::Term,
            Self::Filter(_) => AggregationKind::Filter,
            Self::Nested(_) => AggregationKind::Nested,
            Self::Histogram(_) => AggregationKind::Histogram,
            Self::Timeslice(_) => AggregationKind::Timeslice,
            Self::TopHits(_) => AggregationKind::TopHits,
            Self::UniqueCount(_) => AggregationKind::UniqueCount,
            Self::Max(_) => AggregationKind::Max,
            Self::Min(_) => AggregationKind::Min,
            Self::Average(_) => AggregationKind::Average,
            Self::Sum(_) => AggregationKind::Sum,
        }
    }

    /// The `type` literal this aggregation was decoded from.
    pub fn type_name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Aggregations nested directly under this one, if the variant can hold any.
    pub fn children(&self) -> Option<&[Aggregation]> {
        match self {
            Self::Term(t) => t.aggregations.as_deref(),
            Self::Filter(f) => f.aggregations.as_deref(),
            Self::Nested(n) => n.aggregations.as_deref(),
            _ => None,
        }
    }

    /// The calculated value for `max`, `min`, `average`, `sum` and `unique_count`.
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Max(c) | Self::Min(c) | Self::Average(c) | Self::Sum(c) => c.value,
            Self::UniqueCount(u) => u.value,
            _ => None,
        }
    }
}

/// A bucket produced by `term`, `histogram` and `timeslice`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationBucket {
    /// Bucket key exactly as the service sent it; numeric keys keep their JSON text.
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_as_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching_results: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Vec<Aggregation>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Term {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<AggregationBucket>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Vec<Aggregation>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Filter {
    #[serde(rename = "match")]
    pub match_expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching_results: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Vec<Aggregation>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Nested {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching_results: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Vec<Aggregation>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub field: String,
    pub interval: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<AggregationBucket>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeslice {
    pub field: String,
    /// Duration literal such as `"12h"`, kept verbatim.
    pub interval: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<AggregationBucket>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopHits {
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hits: Option<TopHitsResults>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopHitsResults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching_results: Option<u64>,
    /// Raw result documents; their schema belongs to the collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hits: Option<Vec<Map<String, Value>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniqueCount {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

/// Shared shape of `max`, `min`, `average` and `sum`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Calculation {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}
