//! Query requests and their wire form.
//!
//! Every option is an `Option`; unset options never reach the wire. Sequence
//! options (`return`, `sort`, `passages.fields`, ...) are sent comma-joined in
//! the order given. Nothing here checks option combinations; the service does.

use reqwest::Method;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;

pub const LOGGING_OPT_OUT_HEADER: &str = "X-Watson-Logging-Opt-Out";

/// Optional parameters shared by all query endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub natural_language_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passages: Option<bool>,
    /// Aggregation expression, forwarded verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(
        rename = "return",
        skip_serializing_if = "Option::is_none",
        serialize_with = "comma_joined"
    )]
    pub return_fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "comma_joined")]
    pub sort: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<bool>,
    #[serde(
        rename = "passages.fields",
        skip_serializing_if = "Option::is_none",
        serialize_with = "comma_joined"
    )]
    pub passages_fields: Option<Vec<String>>,
    #[serde(rename = "passages.count", skip_serializing_if = "Option::is_none")]
    pub passages_count: Option<u32>,
    #[serde(rename = "passages.characters", skip_serializing_if = "Option::is_none")]
    pub passages_characters: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deduplicate: Option<bool>,
    #[serde(rename = "deduplicate.field", skip_serializing_if = "Option::is_none")]
    pub deduplicate_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similar: Option<bool>,
    #[serde(
        rename = "similar.document_ids",
        skip_serializing_if = "Option::is_none",
        serialize_with = "comma_joined"
    )]
    pub similar_document_ids: Option<Vec<String>>,
    #[serde(
        rename = "similar.fields",
        skip_serializing_if = "Option::is_none",
        serialize_with = "comma_joined"
    )]
    pub similar_fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bias: Option<String>,
}

fn comma_joined<S: Serializer>(
    value: &Option<Vec<String>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(items) => serializer.serialize_str(&items.join(",")),
        None => serializer.serialize_none(),
    }
}

impl QueryOptions {
    fn to_map(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }
}

/// A request in the form the transport sends it.
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    pub method: Method,
    /// Path with `{name}` placeholders filled from `path_params`.
    pub path_template: &'static str,
    pub path_params: BTreeMap<&'static str, String>,
    pub query: BTreeMap<String, String>,
    pub headers: BTreeMap<&'static str, String>,
    pub body: Option<Map<String, Value>>,
}

impl WireRequest {
    fn new(method: Method, path_template: &'static str) -> Self {
        Self {
            method,
            path_template,
            path_params: BTreeMap::new(),
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    fn path_param(mut self, name: &'static str, value: &str) -> Self {
        self.path_params.insert(name, value.to_string());
        self
    }

    /// Path segments with placeholders substituted, unencoded.
    pub fn path_segments(&self) -> Vec<String> {
        self.path_template
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|segment| {
                segment
                    .strip_prefix('{')
                    .and_then(|s| s.strip_suffix('}'))
                    .and_then(|name| self.path_params.get(name))
                    .cloned()
                    .unwrap_or_else(|| segment.to_string())
            })
            .collect()
    }

    pub fn path(&self) -> String {
        format!("/{}", self.path_segments().join("/"))
    }

    /// Every parameter the request carries: path, query string and body keys.
    pub fn parameter_names(&self) -> BTreeSet<&str> {
        let mut names: BTreeSet<&str> = self.path_params.keys().copied().collect();
        names.extend(self.query.keys().map(String::as_str));
        if let Some(body) = &self.body {
            names.extend(body.keys().map(String::as_str));
        }
        names
    }
}

fn query_pairs(map: Map<String, Value>) -> BTreeMap<String, String> {
    map.into_iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (k, v)
        })
        .collect()
}

fn opt_out_headers(logging_opt_out: Option<bool>) -> BTreeMap<&'static str, String> {
    logging_opt_out
        .map(|v| (LOGGING_OPT_OUT_HEADER, v.to_string()))
        .into_iter()
        .collect()
}

macro_rules! query_option_setters {
    ($ty:ty) => {
        impl $ty {
            pub fn options(mut self, options: QueryOptions) -> Self {
                self.options = options;
                self
            }

            pub fn filter(mut self, filter: impl Into<String>) -> Self {
                self.options.filter = Some(filter.into());
                self
            }

            pub fn query(mut self, query: impl Into<String>) -> Self {
                self.options.query = Some(query.into());
                self
            }

            pub fn natural_language_query(mut self, text: impl Into<String>) -> Self {
                self.options.natural_language_query = Some(text.into());
                self
            }

            pub fn passages(mut self, passages: bool) -> Self {
                self.options.passages = Some(passages);
                self
            }

            pub fn aggregation(mut self, expression: impl Into<String>) -> Self {
                self.options.aggregation = Some(expression.into());
                self
            }

            pub fn count(mut self, count: u32) -> Self {
                self.options.count = Some(count);
                self
            }

            pub fn return_fields<I, S>(mut self, fields: I) -> Self
            where
                I: IntoIterator<Item = S>,
                S: Into<String>,
            {
                self.options.return_fields = Some(fields.into_iter().map(Into::into).collect());
                self
            }

            pub fn offset(mut self, offset: u32) -> Self {
                self.options.offset = Some(offset);
                self
            }

            pub fn sort<I, S>(mut self, fields: I) -> Self
            where
                I: IntoIterator<Item = S>,
                S: Into<String>,
            {
                self.options.sort = Some(fields.into_iter().map(Into::into).collect());
                self
            }

            pub fn highlight(mut self, highlight: bool) -> Self {
                self.options.highlight = Some(highlight);
                self
            }

            pub fn passages_fields<I, S>(mut self, fields: I) -> Self
            where
                I: IntoIterator<Item = S>,
                S: Into<String>,
            {
                self.options.passages_fields = Some(fields.into_iter().map(Into::into).collect());
                self
            }

            pub fn passages_count(mut self, count: u32) -> Self {
                self.options.passages_count = Some(count);
                self
            }

            pub fn passages_characters(mut self, characters: u32) -> Self {
                self.options.passages_characters = Some(characters);
                self
            }

            pub fn deduplicate(mut self, deduplicate: bool) -> Self {
                self.options.deduplicate = Some(deduplicate);
                self
            }

            pub fn deduplicate_field(mut self, field: impl Into<String>) -> Self {
                self.options.deduplicate_field = Some(field.into());
                self
            }

            pub fn similar(mut self, similar: bool) -> Self {
                self.options.similar = Some(similar);
                self
            }

            pub fn similar_document_ids<I, S>(mut self, ids: I) -> Self
            where
                I: IntoIterator<Item = S>,
                S: Into<String>,
            {
                self.options.similar_document_ids = Some(ids.into_iter().map(Into::into).collect());
                self
            }

            pub fn similar_fields<I, S>(mut self, fields: I) -> Self
            where
                I: IntoIterator<Item = S>,
                S: Into<String>,
            {
                self.options.similar_fields = Some(fields.into_iter().map(Into::into).collect());
                self
            }

            pub fn bias(mut self, bias: impl Into<String>) -> Self {
                self.options.bias = Some(bias.into());
                self
            }
        }
    };
}

/// Query a single collection.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub environment_id: String,
    pub collection_id: String,
    pub options: QueryOptions,
    pub logging_opt_out: Option<bool>,
}

impl QueryRequest {
    pub fn new(environment_id: impl Into<String>, collection_id: impl Into<String>) -> Self {
        Self {
            environment_id: environment_id.into(),
            collection_id: collection_id.into(),
            options: QueryOptions::default(),
            logging_opt_out: None,
        }
    }

    pub fn logging_opt_out(mut self, opt_out: bool) -> Self {
        self.logging_opt_out = Some(opt_out);
        self
    }

    pub fn to_wire(&self) -> Result<WireRequest> {
        let mut wire = WireRequest::new(
            Method::POST,
            "/v1/environments/{environment_id}/collections/{collection_id}/query",
        )
        .path_param("environment_id", &self.environment_id)
        .path_param("collection_id", &self.collection_id);
        wire.headers = opt_out_headers(self.logging_opt_out);
        wire.body = Some(self.options.to_map()?);
        Ok(wire)
    }
}

query_option_setters!(QueryRequest);

/// Query the system notices (ingestion warnings and errors) of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryNoticesRequest {
    pub environment_id: String,
    pub collection_id: String,
    pub options: QueryOptions,
}

impl QueryNoticesRequest {
    pub fn new(environment_id: impl Into<String>, collection_id: impl Into<String>) -> Self {
        Self {
            environment_id: environment_id.into(),
            collection_id: collection_id.into(),
            options: QueryOptions::default(),
        }
    }

    pub fn to_wire(&self) -> Result<WireRequest> {
        let mut wire = WireRequest::new(
            Method::GET,
            "/v1/environments/{environment_id}/collections/{collection_id}/notices",
        )
        .path_param("environment_id", &self.environment_id)
        .path_param("collection_id", &self.collection_id);
        wire.query = query_pairs(self.options.to_map()?);
        Ok(wire)
    }
}

query_option_setters!(QueryNoticesRequest);

/// Query several collections of one environment at once.
#[derive(Debug, Clone, PartialEq)]
pub struct FederatedQueryRequest {
    pub environment_id: String,
    pub collection_ids: Vec<String>,
    pub options: QueryOptions,
    pub logging_opt_out: Option<bool>,
}

impl FederatedQueryRequest {
    pub fn new<I, S>(environment_id: impl Into<String>, collection_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            environment_id: environment_id.into(),
            collection_ids: collection_ids.into_iter().map(Into::into).collect(),
            options: QueryOptions::default(),
            logging_opt_out: None,
        }
    }

    pub fn logging_opt_out(mut self, opt_out: bool) -> Self {
        self.logging_opt_out = Some(opt_out);
        self
    }

    pub fn to_wire(&self) -> Result<WireRequest> {
        let mut wire = WireRequest::new(Method::POST, "/v1/environments/{environment_id}/query")
            .path_param("environment_id", &self.environment_id);
        let mut body = self.options.to_map()?;
        body.insert(
            "collection_ids".to_string(),
            Value::String(self.collection_ids.join(",")),
        );
        wire.headers = opt_out_headers(self.logging_opt_out);
        wire.body = Some(body);
        Ok(wire)
    }
}

query_option_setters!(FederatedQueryRequest);

/// Query the system notices of several collections at once.
#[derive(Debug, Clone, PartialEq)]
pub struct FederatedQueryNoticesRequest {
    pub environment_id: String,
    pub collection_ids: Vec<String>,
    pub options: QueryOptions,
}

impl FederatedQueryNoticesRequest {
    pub fn new<I, S>(environment_id: impl Into<String>, collection_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            environment_id: environment_id.into(),
            collection_ids: collection_ids.into_iter().map(Into::into).collect(),
            options: QueryOptions::default(),
        }
    }

    pub fn to_wire(&self) -> Result<WireRequest> {
        let mut wire = WireRequest::new(Method::GET, "/v1/environments/{environment_id}/notices")
            .path_param("environment_id", &self.environment_id);
        wire.query = query_pairs(self.options.to_map()?);
        wire.query
            .insert("collection_ids".to_string(), self.collection_ids.join(","));
        Ok(wire)
    }
}

query_option_setters!(FederatedQueryNoticesRequest);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_only_supplied_parameters_are_sent() {
        let wire = QueryRequest::new("e1", "c1")
            .natural_language_query("x")
            .to_wire()
            .unwrap();

        let names: Vec<_> = wire.parameter_names().into_iter().collect();
        assert_eq!(names, vec!["collection_id", "environment_id", "natural_language_query"]);
        assert_eq!(wire.body.as_ref().unwrap().len(), 1);
        assert_eq!(wire.body.as_ref().unwrap()["natural_language_query"], "x");
        assert!(wire.query.is_empty());
        assert!(wire.headers.is_empty());
    }

    #[test]
    fn test_query_path_and_method() {
        let wire = QueryRequest::new("system", "news-en").to_wire().unwrap();
        assert_eq!(wire.method, Method::POST);
        assert_eq!(wire.path(), "/v1/environments/system/collections/news-en/query");
        assert_eq!(
            wire.path_segments(),
            vec!["v1", "environments", "system", "collections", "news-en", "query"]
        );
        assert_eq!(wire.body, Some(Map::new()));
    }

    #[test]
    fn test_all_options_forwarded_under_wire_names() {
        let wire = QueryRequest::new("system", "news-en")
            .filter("enriched_text.concepts.text:\"Technology\"")
            .query("enriched_text.concepts.text:\"Cloud computing\"")
            .aggregation("term(enriched_text.concepts.text,count:10)")
            .count(5)
            .return_fields(["enriched_text", "title"])
            .offset(1)
            .sort(["enriched_text.sentiment.document.score", "-title"])
            .highlight(true)
            .passages(true)
            .passages_fields(["text"])
            .passages_count(1)
            .passages_characters(400)
            .deduplicate(true)
            .deduplicate_field("title")
            .similar(true)
            .similar_document_ids(Vec::<String>::new())
            .similar_fields(["text"])
            .bias("publication_date")
            .logging_opt_out(true)
            .to_wire()
            .unwrap();

        let body = Value::Object(wire.body.clone().unwrap());
        assert_eq!(
            body,
            json!({
                "filter": "enriched_text.concepts.text:\"Technology\"",
                "query": "enriched_text.concepts.text:\"Cloud computing\"",
                "aggregation": "term(enriched_text.concepts.text,count:10)",
                "count": 5,
                "return": "enriched_text,title",
                "offset": 1,
                "sort": "enriched_text.sentiment.document.score,-title",
                "highlight": true,
                "passages": true,
                "passages.fields": "text",
                "passages.count": 1,
                "passages.characters": 400,
                "deduplicate": true,
                "deduplicate.field": "title",
                "similar": true,
                "similar.document_ids": "",
                "similar.fields": "text",
                "bias": "publication_date"
            })
        );
        assert_eq!(wire.headers.get(LOGGING_OPT_OUT_HEADER).map(String::as_str), Some("true"));
    }

    #[test]
    fn test_aggregation_expression_is_not_interpreted() {
        let expr = "nested(enriched_text.entities).filter(enriched_text.entities.type::Company).term(enriched_text.entities.text)";
        let wire = QueryRequest::new("e", "c").aggregation(expr).to_wire().unwrap();
        assert_eq!(wire.body.unwrap()["aggregation"], expr);
    }

    #[test]
    fn test_options_struct_replaces_builder_state() {
        let options = QueryOptions {
            count: Some(10),
            highlight: Some(false),
            ..Default::default()
        };
        let wire = QueryRequest::new("e", "c")
            .filter("ignored")
            .options(options)
            .to_wire()
            .unwrap();
        let body = wire.body.unwrap();
        assert_eq!(body.len(), 2);
        assert_eq!(body["count"], 10);
        assert_eq!(body["highlight"], false);
    }

    #[test]
    fn test_notices_use_query_string() {
        let wire = QueryNoticesRequest::new("env", "col")
            .query("notices.severity:warning")
            .count(20)
            .sort(["-notices.created"])
            .to_wire()
            .unwrap();

        assert_eq!(wire.method, Method::GET);
        assert_eq!(wire.path(), "/v1/environments/env/collections/col/notices");
        assert!(wire.body.is_none());
        assert_eq!(wire.query.len(), 3);
        assert_eq!(wire.query["query"], "notices.severity:warning");
        assert_eq!(wire.query["count"], "20");
        assert_eq!(wire.query["sort"], "-notices.created");
    }

    #[test]
    fn test_federated_query_joins_collection_ids() {
        let wire = FederatedQueryRequest::new("env", ["c1", "c2"])
            .natural_language_query("IBM")
            .to_wire()
            .unwrap();

        assert_eq!(wire.method, Method::POST);
        assert_eq!(wire.path(), "/v1/environments/env/query");
        let body = wire.body.as_ref().unwrap();
        assert_eq!(body["collection_ids"], "c1,c2");
        assert_eq!(body["natural_language_query"], "IBM");
        let names: Vec<_> = wire.parameter_names().into_iter().collect();
        assert_eq!(names, vec!["collection_ids", "environment_id", "natural_language_query"]);
    }

    #[test]
    fn test_federated_notices() {
        let wire = FederatedQueryNoticesRequest::new("env", vec!["c1".to_string()])
            .highlight(true)
            .to_wire()
            .unwrap();

        assert_eq!(wire.method, Method::GET);
        assert_eq!(wire.path(), "/v1/environments/env/notices");
        assert_eq!(wire.query["collection_ids"], "c1");
        assert_eq!(wire.query["highlight"], "true");
        assert!(wire.headers.is_empty());
    }
}
