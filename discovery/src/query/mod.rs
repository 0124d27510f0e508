pub mod request;
pub mod response;

pub use request::{
    FederatedQueryNoticesRequest, FederatedQueryRequest, QueryNoticesRequest, QueryOptions,
    QueryRequest, WireRequest, LOGGING_OPT_OUT_HEADER,
};
pub use response::{
    Notice, NoticeSeverity, QueryNoticesResponse, QueryNoticesResult, QueryPassage,
    QueryResponse, QueryResult, QueryResultMetadata, RetrievalDetails,
};
