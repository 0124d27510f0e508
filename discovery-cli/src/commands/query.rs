use anyhow::Result;
use clap::Args;
use discovery::{
    DiscoveryClient, FederatedQueryNoticesRequest, FederatedQueryRequest, QueryNoticesRequest,
    QueryOptions, QueryRequest, Transport,
};
use serde::Serialize;

/// Query options shared by every subcommand. Options left out are not sent.
#[derive(Args, Debug, Clone, Default)]
pub struct QueryOptionArgs {
    /// Filter expression, cacheable and unscored
    #[arg(long)]
    pub filter: Option<String>,

    /// Query expression, scored
    #[arg(short, long)]
    pub query: Option<String>,

    /// Natural language query
    #[arg(short, long)]
    pub natural_language_query: Option<String>,

    /// Return passages
    #[arg(long)]
    pub passages: Option<bool>,

    /// Aggregation expression, e.g. "term(enriched_text.concepts.text,count:10)"
    #[arg(short, long)]
    pub aggregation: Option<String>,

    /// Number of results to return
    #[arg(long)]
    pub count: Option<u32>,

    /// Fields to return (comma-separated)
    #[arg(long = "return", value_delimiter = ',')]
    pub return_fields: Option<Vec<String>>,

    #[arg(long)]
    pub offset: Option<u32>,

    /// Sort fields, prefix with "-" for descending (comma-separated)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub sort: Option<Vec<String>>,

    #[arg(long)]
    pub highlight: Option<bool>,

    /// Fields to take passages from (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub passages_fields: Option<Vec<String>>,

    #[arg(long)]
    pub passages_count: Option<u32>,

    #[arg(long)]
    pub passages_characters: Option<u32>,

    #[arg(long)]
    pub deduplicate: Option<bool>,

    #[arg(long)]
    pub deduplicate_field: Option<String>,

    #[arg(long)]
    pub similar: Option<bool>,

    #[arg(long, value_delimiter = ',')]
    pub similar_document_ids: Option<Vec<String>>,

    #[arg(long, value_delimiter = ',')]
    pub similar_fields: Option<Vec<String>>,

    /// Field to bias results toward
    #[arg(long)]
    pub bias: Option<String>,
}

impl From<QueryOptionArgs> for QueryOptions {
    fn from(args: QueryOptionArgs) -> Self {
        QueryOptions {
            filter: args.filter,
            query: args.query,
            natural_language_query: args.natural_language_query,
            passages: args.passages,
            aggregation: args.aggregation,
            count: args.count,
            return_fields: args.return_fields,
            offset: args.offset,
            sort: args.sort,
            highlight: args.highlight,
            passages_fields: args.passages_fields,
            passages_count: args.passages_count,
            passages_characters: args.passages_characters,
            deduplicate: args.deduplicate,
            deduplicate_field: args.deduplicate_field,
            similar: args.similar,
            similar_document_ids: args.similar_document_ids,
            similar_fields: args.similar_fields,
            bias: args.bias,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn run_query<T: Transport>(
    client: &DiscoveryClient<T>,
    environment: String,
    collection: String,
    logging_opt_out: bool,
    options: QueryOptionArgs,
) -> Result<()> {
    let mut request = QueryRequest::new(environment, collection).options(options.into());
    if logging_opt_out {
        request = request.logging_opt_out(true);
    }

    let response = client.query(&request).await?;
    tracing::info!(
        "{} matching results, {} aggregations",
        response.matching_results.unwrap_or(0),
        response.aggregations().len()
    );
    print_json(&response)
}

pub async fn run_notices<T: Transport>(
    client: &DiscoveryClient<T>,
    environment: String,
    collection: String,
    options: QueryOptionArgs,
) -> Result<()> {
    let request = QueryNoticesRequest::new(environment, collection).options(options.into());
    let response = client.query_notices(&request).await?;
    tracing::info!("{} matching results", response.matching_results.unwrap_or(0));
    print_json(&response)
}

pub async fn run_federated_query<T: Transport>(
    client: &DiscoveryClient<T>,
    environment: String,
    collections: Vec<String>,
    logging_opt_out: bool,
    options: QueryOptionArgs,
) -> Result<()> {
    let mut request = FederatedQueryRequest::new(environment, collections).options(options.into());
    if logging_opt_out {
        request = request.logging_opt_out(true);
    }

    let response = client.federated_query(&request).await?;
    tracing::info!(
        "{} matching results, {} aggregations",
        response.matching_results.unwrap_or(0),
        response.aggregations().len()
    );
    print_json(&response)
}

pub async fn run_federated_notices<T: Transport>(
    client: &DiscoveryClient<T>,
    environment: String,
    collections: Vec<String>,
    options: QueryOptionArgs,
) -> Result<()> {
    let request =
        FederatedQueryNoticesRequest::new(environment, collections).options(options.into());
    let response = client.federated_query_notices(&request).await?;
    tracing::info!("{} matching results", response.matching_results.unwrap_or(0));
    print_json(&response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        options: QueryOptionArgs,
    }

    fn parse(args: &[&str]) -> QueryOptions {
        let mut argv = vec!["discovery"];
        argv.extend_from_slice(args);
        Wrapper::try_parse_from(argv).unwrap().options.into()
    }

    #[test]
    fn test_no_flags_no_options() {
        assert_eq!(parse(&[]), QueryOptions::default());
    }

    #[test]
    fn test_flags_map_to_options() {
        let options = parse(&[
            "-n",
            "cloud pricing",
            "--return",
            "title,url",
            "--sort",
            "-date",
            "--passages",
            "true",
            "--passages-count",
            "3",
            "-a",
            "term(author,count:5)",
        ]);

        assert_eq!(options.natural_language_query.as_deref(), Some("cloud pricing"));
        assert_eq!(
            options.return_fields,
            Some(vec!["title".to_string(), "url".to_string()])
        );
        assert_eq!(options.sort, Some(vec!["-date".to_string()]));
        assert_eq!(options.passages, Some(true));
        assert_eq!(options.passages_count, Some(3));
        assert_eq!(options.aggregation.as_deref(), Some("term(author,count:5)"));
        assert!(options.filter.is_none());
        assert!(options.count.is_none());
    }
}
