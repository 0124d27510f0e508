//! Client for the Discovery document search API
//!
//! Builds query requests, sends them through a [`Transport`] and decodes the
//! response, including the typed aggregation tree.
//!
//! # Endpoints
//!
//! - `POST /v1/environments/{environment_id}/collections/{collection_id}/query`
//! - `GET  /v1/environments/{environment_id}/collections/{collection_id}/notices`
//! - `POST /v1/environments/{environment_id}/query` (federated)
//! - `GET  /v1/environments/{environment_id}/notices` (federated)
//!
//! # Aggregations
//!
//! Decoded kinds: `term`, `filter`, `nested`, `histogram`, `timeslice`,
//! `top_hits`, `unique_count` and the calculations `max` / `min` / `average` /
//! `sum`. Unknown kinds fail the decode unless the decoder is built with
//! [`UnknownKindPolicy::Skip`].
//!
//! ```no_run
//! # async fn run() -> discovery::Result<()> {
//! use discovery::{Config, DiscoveryClient, QueryRequest};
//!
//! let client = DiscoveryClient::from_config(&Config::load()?)?;
//! let request = QueryRequest::new("system", "news-en")
//!     .natural_language_query("Kubernetes")
//!     .aggregation("term(enriched_text.concepts.text,count:10)")
//!     .count(5);
//! let response = client.query(&request).await?;
//! for agg in response.aggregations() {
//!     println!("{}", agg.type_name());
//! }
//! # Ok(())
//! # }
//! ```

pub mod aggregation;
pub mod client;
pub mod config;
pub mod error;
pub mod query;
pub mod transport;

pub use aggregation::{Aggregation, AggregationDecoder, AggregationKind, UnknownKindPolicy};
pub use client::DiscoveryClient;
pub use config::Config;
pub use error::{Error, Result};
pub use query::{
    FederatedQueryNoticesRequest, FederatedQueryRequest, QueryNoticesRequest,
    QueryNoticesResponse, QueryOptions, QueryRequest, QueryResponse, WireRequest,
};
pub use transport::{Credentials, HttpTransport, Transport};
