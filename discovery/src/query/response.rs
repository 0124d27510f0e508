//! Query response bodies.
//!
//! Plain fields come through serde. The `aggregations` array is handed to an
//! [`AggregationDecoder`] in document order; if any entry fails, the whole
//! response fails.
//!
//! Documents are split into known members and `extra` by hand rather than
//! with a derived `#[serde(flatten)]`, which buffers numbers and cannot read
//! them back when their JSON text is kept verbatim.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::aggregation::{Aggregation, AggregationDecoder};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub matching_results: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<QueryResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Vec<Aggregation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passages: Option<Vec<QueryPassage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicates_removed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieval_details: Option<RetrievalDetails>,
}

#[derive(Deserialize)]
struct RawQueryResponse {
    matching_results: Option<u64>,
    results: Option<Vec<QueryResult>>,
    aggregations: Option<Vec<Value>>,
    passages: Option<Vec<QueryPassage>>,
    duplicates_removed: Option<u64>,
    session_token: Option<String>,
    retrieval_details: Option<RetrievalDetails>,
}

impl QueryResponse {
    pub fn from_value(body: Value, decoder: &AggregationDecoder) -> Result<Self> {
        let raw: RawQueryResponse = serde_json::from_value(body)?;
        Ok(Self {
            matching_results: raw.matching_results,
            results: raw.results,
            aggregations: decode_aggregations(raw.aggregations, decoder)?,
            passages: raw.passages,
            duplicates_removed: raw.duplicates_removed,
            session_token: raw.session_token,
            retrieval_details: raw.retrieval_details,
        })
    }

    pub fn results(&self) -> &[QueryResult] {
        self.results.as_deref().unwrap_or_default()
    }

    pub fn aggregations(&self) -> &[Aggregation] {
        self.aggregations.as_deref().unwrap_or_default()
    }
}

fn decode_aggregations(
    nodes: Option<Vec<Value>>,
    decoder: &AggregationDecoder,
) -> Result<Option<Vec<Aggregation>>> {
    nodes.map(|nodes| decoder.decode_all(&nodes)).transpose()
}

/// One ranked document. Documents are schemaless, so anything beyond the
/// well-known fields lands in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct QueryResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_metadata: Option<QueryResultMetadata>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TryFrom<Map<String, Value>> for QueryResult {
    type Error = serde_json::Error;

    fn try_from(mut doc: Map<String, Value>) -> serde_json::Result<Self> {
        Ok(Self {
            id: take(&mut doc, "id")?,
            collection_id: take(&mut doc, "collection_id")?,
            metadata: take(&mut doc, "metadata")?,
            result_metadata: take(&mut doc, "result_metadata")?,
            extra: doc,
        })
    }
}

/// Remove `key` and decode it; absent or `null` gives the default.
fn take<T>(doc: &mut Map<String, Value>, key: &str) -> serde_json::Result<T>
where
    T: DeserializeOwned + Default,
{
    match doc.remove(key) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value),
    }
}

impl QueryResult {
    pub fn score(&self) -> Option<f64> {
        self.result_metadata.as_ref().map(|m| m.score)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResultMetadata {
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPassage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passage_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passage_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_retrieval_strategy: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryNoticesResponse {
    pub matching_results: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<QueryNoticesResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Vec<Aggregation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passages: Option<Vec<QueryPassage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicates_removed: Option<u64>,
}

#[derive(Deserialize)]
struct RawQueryNoticesResponse {
    matching_results: Option<u64>,
    results: Option<Vec<QueryNoticesResult>>,
    aggregations: Option<Vec<Value>>,
    passages: Option<Vec<QueryPassage>>,
    duplicates_removed: Option<u64>,
}

impl QueryNoticesResponse {
    pub fn from_value(body: Value, decoder: &AggregationDecoder) -> Result<Self> {
        let raw: RawQueryNoticesResponse = serde_json::from_value(body)?;
        Ok(Self {
            matching_results: raw.matching_results,
            results: raw.results,
            aggregations: decode_aggregations(raw.aggregations, decoder)?,
            passages: raw.passages,
            duplicates_removed: raw.duplicates_removed,
        })
    }

    pub fn results(&self) -> &[QueryNoticesResult] {
        self.results.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct QueryNoticesResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_metadata: Option<QueryResultMetadata>,
    /// HTTP status code the ingestion step reported for the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default)]
    pub notices: Vec<Notice>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TryFrom<Map<String, Value>> for QueryNoticesResult {
    type Error = serde_json::Error;

    fn try_from(mut doc: Map<String, Value>) -> serde_json::Result<Self> {
        Ok(Self {
            id: take(&mut doc, "id")?,
            collection_id: take(&mut doc, "collection_id")?,
            metadata: take(&mut doc, "metadata")?,
            result_metadata: take(&mut doc, "result_metadata")?,
            code: take(&mut doc, "code")?,
            filename: take(&mut doc, "filename")?,
            file_type: take(&mut doc, "file_type")?,
            sha1: take(&mut doc, "sha1")?,
            notices: take(&mut doc, "notices")?,
            extra: doc,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<NoticeSeverity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeSeverity {
    Warning,
    Error,
    #[serde(untagged)]
    Other(String),
}
