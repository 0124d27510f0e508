use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use discovery::config::{Config, LoggingConfig};
use discovery::DiscoveryClient;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::QueryOptionArgs;

#[derive(Parser, Debug)]
#[command(name = "discovery")]
#[command(about = "Discovery CLI - query collections and their notices")]
#[command(version)]
struct Cli {
    /// Configuration file path (default: ~/.discovery/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Service base URL
    #[arg(long, global = true)]
    url: Option<String>,

    /// API key, sent as basic auth with user name "apikey"
    #[arg(long, global = true, env = "DISCOVERY_APIKEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Drop aggregation kinds this client does not know instead of failing
    #[arg(long, global = true)]
    tolerate_unknown_aggregations: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Query one collection
    Query {
        #[arg(short, long)]
        environment: String,

        #[arg(short, long)]
        collection: String,

        /// Ask the service not to log this query
        #[arg(long)]
        logging_opt_out: bool,

        #[command(flatten)]
        options: QueryOptionArgs,
    },

    /// Query the ingestion notices of one collection
    Notices {
        #[arg(short, long)]
        environment: String,

        #[arg(short, long)]
        collection: String,

        #[command(flatten)]
        options: QueryOptionArgs,
    },

    /// Query several collections of one environment
    FederatedQuery {
        #[arg(short, long)]
        environment: String,

        /// Collection ids (comma-separated)
        #[arg(short, long, value_delimiter = ',', required = true)]
        collections: Vec<String>,

        /// Ask the service not to log this query
        #[arg(long)]
        logging_opt_out: bool,

        #[command(flatten)]
        options: QueryOptionArgs,
    },

    /// Query the ingestion notices of several collections
    FederatedNotices {
        #[arg(short, long)]
        environment: String,

        /// Collection ids (comma-separated)
        #[arg(short, long, value_delimiter = ',', required = true)]
        collections: Vec<String>,

        #[command(flatten)]
        options: QueryOptionArgs,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| logging.level.clone()),
    );
    // stdout carries the response JSON
    let json = logging.format == "json";
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

/// Where the settings came from, reported once logging is up.
#[derive(Debug, PartialEq)]
enum ConfigSource {
    File(PathBuf),
    Defaults(PathBuf),
}

fn load_config(cli: &Cli) -> Result<(Config, ConfigSource)> {
    let path = match &cli.config {
        Some(path) => discovery::config::expand_tilde(path)?,
        None => Config::default_path()?,
    };
    let source = if path.exists() {
        ConfigSource::File(path.clone())
    } else {
        ConfigSource::Defaults(path.clone())
    };
    let mut config = Config::load_or_default(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    config.apply_env_overrides();

    if let Some(url) = &cli.url {
        config.service.url = url.clone();
    }
    if let Some(key) = &cli.api_key {
        config.service.api_key = Some(key.clone());
    }
    if cli.tolerate_unknown_aggregations {
        config.decode.tolerate_unknown_aggregations = true;
    }
    Ok((config, source))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, source) = load_config(&cli)?;
    init_tracing(&config.logging);

    match &source {
        ConfigSource::File(path) => tracing::debug!("Loaded config from {}", path.display()),
        ConfigSource::Defaults(path) => {
            tracing::debug!("No config at {}, using defaults", path.display())
        }
    }

    tracing::debug!("Using service at {}", config.service.url);
    let client = DiscoveryClient::from_config(&config)?;

    match cli.command {
        Commands::Query {
            environment,
            collection,
            logging_opt_out,
            options,
        } => {
            commands::run_query(&client, environment, collection, logging_opt_out, options)
                .await?;
        }
        Commands::Notices {
            environment,
            collection,
            options,
        } => {
            commands::run_notices(&client, environment, collection, options).await?;
        }
        Commands::FederatedQuery {
            environment,
            collections,
            logging_opt_out,
            options,
        } => {
            commands::run_federated_query(
                &client,
                environment,
                collections,
                logging_opt_out,
                options,
            )
            .await?;
        }
        Commands::FederatedNotices {
            environment,
            collections,
            options,
        } => {
            commands::run_federated_notices(&client, environment, collections, options).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["discovery"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_missing_config_file_is_reported_as_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("absent.toml");
        let cli = parse(&[
            "--config",
            path.to_str().unwrap(),
            "query",
            "-e",
            "system",
            "-c",
            "news-en",
        ]);

        let (config, source) = load_config(&cli).unwrap();
        assert_eq!(source, ConfigSource::Defaults(path));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_file_and_flags() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            "[service]\nurl = \"http://from-file:9000/api\"\n\n[logging]\nlevel = \"debug\"\n",
        )
        .unwrap();

        let cli = parse(&[
            "--config",
            path.to_str().unwrap(),
            "--url",
            "http://from-flag:9000/api",
            "--tolerate-unknown-aggregations",
            "notices",
            "-e",
            "system",
            "-c",
            "news-en",
        ]);

        let (config, source) = load_config(&cli).unwrap();
        assert_eq!(source, ConfigSource::File(path));
        assert_eq!(config.service.url, "http://from-flag:9000/api");
        assert_eq!(config.logging.level, "debug");
        assert!(config.decode.tolerate_unknown_aggregations);
    }
}
