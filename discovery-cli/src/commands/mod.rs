pub mod query;

pub use query::{
    run_federated_notices, run_federated_query, run_notices, run_query, QueryOptionArgs,
};
