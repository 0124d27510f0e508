//! Typed aggregation results returned by the query endpoint.
//!
//! The aggregation expression sent with a query (`term(...)`, `histogram(...)`,
//! ...) is opaque to this crate; only the results are modelled here.

pub mod decode;
pub mod types;

pub use decode::{AggregationDecoder, UnknownKindPolicy};
pub use types::{
    Aggregation, AggregationBucket, AggregationKind, Calculation, Filter, Histogram, Nested,
    Term, Timeslice, TopHits, TopHitsResults, UniqueCount,
};
