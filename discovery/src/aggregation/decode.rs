//! Decoding of aggregation nodes from a query response body.
//!
//! Every node carries a `type` discriminator. The decoder dispatches on it,
//! pulls the required fields for that shape and recurses into any nested
//! `aggregations` array. Errors name the offending field by its path relative
//! to the node handed to [`AggregationDecoder::decode`], e.g.
//! `results[0].aggregations[1].match`.

use serde_json::{Map, Value};

use super::types::{
    Aggregation, AggregationBucket, AggregationKind, Calculation, Filter, Histogram, Nested, Term,
    Timeslice, TopHits, TopHitsResults, UniqueCount,
};
use crate::error::{Error, Result};

/// What to do with a node whose `type` is not a known aggregation kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownKindPolicy {
    /// Abort decoding with [`Error::UnrecognizedAggregationKind`].
    #[default]
    Fail,
    /// Drop the node from the sequence that contains it.
    Skip,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AggregationDecoder {
    policy: UnknownKindPolicy,
}

impl AggregationDecoder {
    pub fn new(policy: UnknownKindPolicy) -> Self {
        Self { policy }
    }

    /// Decoder that drops aggregation kinds it does not know.
    pub fn tolerant() -> Self {
        Self::new(UnknownKindPolicy::Skip)
    }

    pub fn policy(&self) -> UnknownKindPolicy {
        self.policy
    }

    /// Decode exactly one aggregation node.
    ///
    /// An unknown kind at this level is always an error, whatever the policy,
    /// since there is no sequence to drop it from. Unknown kinds nested deeper
    /// follow the policy.
    pub fn decode(&self, node: &Value) -> Result<Aggregation> {
        self.decode_at(node, "")
    }

    /// Decode an ordered sequence of aggregation nodes, preserving order.
    pub fn decode_all(&self, nodes: &[Value]) -> Result<Vec<Aggregation>> {
        self.decode_seq(nodes, "")
    }

    fn decode_seq(&self, nodes: &[Value], path: &str) -> Result<Vec<Aggregation>> {
        let mut out = Vec::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            let at = index(path, i);
            if self.policy == UnknownKindPolicy::Skip {
                let literal = discriminator(object(node, &at)?, &at)?;
                if AggregationKind::parse(literal).is_none() {
                    tracing::warn!("Skipping unrecognized aggregation kind '{}' at {}", literal, at);
                    continue;
                }
            }
            out.push(self.decode_at(node, &at)?);
        }
        Ok(out)
    }

    fn decode_at(&self, node: &Value, path: &str) -> Result<Aggregation> {
        let obj = object(node, path)?;
        let literal = discriminator(obj, path)?;
        let kind: AggregationKind = literal.parse()?;

        let agg = match kind {
            AggregationKind::Term => Aggregation::Term(Term {
                field: require_str(obj, path, "field")?,
                count: optional_u64(obj, path, "count")?,
                results: self.buckets(obj, path)?,
                aggregations: self.children(obj, path)?,
            }),
            AggregationKind::Filter => Aggregation::Filter(Filter {
                match_expression: require_str(obj, path, "match")?,
                matching_results: optional_u64(obj, path, "matching_results")?,
                aggregations: self.children(obj, path)?,
            }),
            AggregationKind::Nested => Aggregation::Nested(Nested {
                path: require_str(obj, path, "path")?,
                matching_results: optional_u64(obj, path, "matching_results")?,
                aggregations: self.children(obj, path)?,
            }),
            AggregationKind::Histogram => Aggregation::Histogram(Histogram {
                field: require_str(obj, path, "field")?,
                interval: require_i64(obj, path, "interval")?,
                results: self.buckets(obj, path)?,
            }),
            AggregationKind::Timeslice => Aggregation::Timeslice(Timeslice {
                field: require_str(obj, path, "field")?,
                interval: require_str(obj, path, "interval")?,
                anomaly: optional_bool(obj, path, "anomaly")?,
                results: self.buckets(obj, path)?,
            }),
            AggregationKind::TopHits => Aggregation::TopHits(TopHits {
                size: require_u64(obj, path, "size")?,
                hits: top_hits_results(obj, path)?,
            }),
            AggregationKind::UniqueCount => Aggregation::UniqueCount(UniqueCount {
                field: require_str(obj, path, "field")?,
                value: optional_f64(obj, path, "value")?,
            }),
            AggregationKind::Max => Aggregation::Max(calculation(obj, path)?),
            AggregationKind::Min => Aggregation::Min(calculation(obj, path)?),
            AggregationKind::Average => Aggregation::Average(calculation(obj, path)?),
            AggregationKind::Sum => Aggregation::Sum(calculation(obj, path)?),
        };
        Ok(agg)
    }

    fn children(&self, obj: &Map<String, Value>, path: &str) -> Result<Option<Vec<Aggregation>>> {
        match optional_array(obj, path, "aggregations")? {
            Some(items) => Ok(Some(self.decode_seq(items, &join(path, "aggregations"))?)),
            None => Ok(None),
        }
    }

    fn buckets(
        &self,
        obj: &Map<String, Value>,
        path: &str,
    ) -> Result<Option<Vec<AggregationBucket>>> {
        let Some(items) = optional_array(obj, path, "results")? else {
            return Ok(None);
        };
        let base = join(path, "results");
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.bucket(item, &index(&base, i)))
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    fn bucket(&self, node: &Value, path: &str) -> Result<AggregationBucket> {
        let obj = object(node, path)?;
        Ok(AggregationBucket {
            key: bucket_key(obj, path)?,
            key_as_string: optional_str(obj, path, "key_as_string")?,
            matching_results: optional_u64(obj, path, "matching_results")?,
            aggregations: self.children(obj, path)?,
        })
    }
}

fn calculation(obj: &Map<String, Value>, path: &str) -> Result<Calculation> {
    Ok(Calculation {
        field: require_str(obj, path, "field")?,
        value: optional_f64(obj, path, "value")?,
    })
}

fn top_hits_results(obj: &Map<String, Value>, path: &str) -> Result<Option<TopHitsResults>> {
    let Some(node) = present(obj, "hits") else {
        return Ok(None);
    };
    let at = join(path, "hits");
    let hits_obj = object(node, &at)?;

    let hits = match optional_array(hits_obj, &at, "hits")? {
        Some(items) => {
            let base = join(&at, "hits");
            let docs = items
                .iter()
                .enumerate()
                .map(|(i, doc)| object(doc, &index(&base, i)).cloned())
                .collect::<Result<Vec<_>>>()?;
            Some(docs)
        }
        None => None,
    };

    Ok(Some(TopHitsResults {
        matching_results: optional_u64(hits_obj, &at, "matching_results")?,
        hits,
    }))
}

/// Bucket keys stay textual: string keys as-is, numeric keys as the JSON text
/// the service sent (`serde_json` runs with `arbitrary_precision`). Digits are
/// never reparsed; only an exponent is respelled as `e+N` / `e-N`.
fn bucket_key(obj: &Map<String, Value>, path: &str) -> Result<String> {
    match present(obj, "key") {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(_) => Err(Error::invalid(join(path, "key"), "a string or number")),
        None => Err(Error::missing(join(path, "key"))),
    }
}

fn join(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", path, field)
    }
}

fn index(path: &str, i: usize) -> String {
    format!("{}[{}]", path, i)
}

fn object<'a>(node: &'a Value, path: &str) -> Result<&'a Map<String, Value>> {
    node.as_object().ok_or_else(|| {
        let label = if path.is_empty() { "(root)" } else { path };
        Error::invalid(label, "an object")
    })
}

fn discriminator<'a>(obj: &'a Map<String, Value>, path: &str) -> Result<&'a str> {
    match present(obj, "type") {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(Error::invalid(join(path, "type"), "a string")),
        None => Err(Error::missing(join(path, "type"))),
    }
}

/// A member counts as present unless absent or JSON `null`.
fn present<'a>(obj: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    obj.get(name).filter(|v| !v.is_null())
}

fn require_str(obj: &Map<String, Value>, path: &str, name: &str) -> Result<String> {
    optional_str(obj, path, name)?.ok_or_else(|| Error::missing(join(path, name)))
}

fn optional_str(obj: &Map<String, Value>, path: &str, name: &str) -> Result<Option<String>> {
    match present(obj, name) {
        Some(v) => v
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| Error::invalid(join(path, name), "a string")),
        None => Ok(None),
    }
}

fn require_i64(obj: &Map<String, Value>, path: &str, name: &str) -> Result<i64> {
    match present(obj, name) {
        Some(v) => v
            .as_i64()
            .ok_or_else(|| Error::invalid(join(path, name), "an integer")),
        None => Err(Error::missing(join(path, name))),
    }
}

fn require_u64(obj: &Map<String, Value>, path: &str, name: &str) -> Result<u64> {
    optional_u64(obj, path, name)?.ok_or_else(|| Error::missing(join(path, name)))
}

fn optional_u64(obj: &Map<String, Value>, path: &str, name: &str) -> Result<Option<u64>> {
    match present(obj, name) {
        Some(v) => v
            .as_u64()
            .map(Some)
            .ok_or_else(|| Error::invalid(join(path, name), "a non-negative integer")),
        None => Ok(None),
    }
}

fn optional_f64(obj: &Map<String, Value>, path: &str, name: &str) -> Result<Option<f64>> {
    match present(obj, name) {
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| Error::invalid(join(path, name), "a number")),
        None => Ok(None),
    }
}

fn optional_bool(obj: &Map<String, Value>, path: &str, name: &str) -> Result<Option<bool>> {
    match present(obj, name) {
        Some(v) => v
            .as_bool()
            .map(Some)
            .ok_or_else(|| Error::invalid(join(path, name), "a boolean")),
        None => Ok(None),
    }
}

fn optional_array<'a>(
    obj: &'a Map<String, Value>,
    path: &str,
    name: &str,
) -> Result<Option<&'a Vec<Value>>> {
    match present(obj, name) {
        Some(v) => v
            .as_array()
            .map(Some)
            .ok_or_else(|| Error::invalid(join(path, name), "an array")),
        None => Ok(None),
    }
}
