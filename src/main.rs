use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use youtrack_search::{
    config::Config,
    error::AppError,
    metrics,
    output::SearchToolOutput,
    search::{
        request::{IntelligentSearchRequest, QueryBuilderRequest},
        SearchEngine, SearchError, SearchQuery, DEFAULT_SUGGESTION_LIMIT,
    },
    YouTrackClient,
};

#[derive(Parser)]
#[command(name = "youtrack-search")]
#[command(about = "Advanced YouTrack issue search", long_about = None, version)]
struct Cli {
    /// Configuration file (overrides CONFIG_PATH)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search issues by text and common filters
    Search {
        /// Free text matched against summary and description
        #[arg(value_name = "TEXT")]
        text: Option<String>,

        #[arg(short, long)]
        project: Option<String>,

        #[arg(short, long)]
        assignee: Option<String>,

        #[arg(short, long)]
        state: Option<String>,

        #[arg(short = 'P', long)]
        priority: Option<String>,

        /// Created on or after: YYYY-MM-DD or -Nd/-Nw/-Nm/-Ny
        #[arg(long)]
        created_after: Option<String>,

        /// Updated on or after: YYYY-MM-DD or -Nd/-Nw/-Nm/-Ny
        #[arg(long)]
        updated_after: Option<String>,

        #[arg(long)]
        sort_by: Option<String>,

        #[arg(long, default_value = "desc")]
        sort_order: String,

        #[arg(short, long, default_value = "50")]
        limit: i64,

        #[arg(short, long, default_value = "0")]
        offset: i64,

        /// Skip resolved issues
        #[arg(long)]
        unresolved: bool,
    },

    /// Run a structured query given as JSON conditions
    Query {
        /// JSON object with `conditions`, and optionally `text`, `sort_by`, `sort_order`, `limit`, `offset`
        #[arg(value_name = "JSON")]
        request: String,
    },

    /// Complete a partially typed query
    Suggest {
        #[arg(value_name = "PARTIAL")]
        partial: String,

        #[arg(short, long, default_value_t = DEFAULT_SUGGESTION_LIMIT)]
        limit: usize,
    },

    /// Run text searches and print cache and analytics statistics
    Stats {
        #[arg(value_name = "TEXT")]
        queries: Vec<String>,
    },

    /// Print Prometheus metrics after running optional text searches
    Metrics {
        #[arg(value_name = "TEXT")]
        queries: Vec<String>,
    },

    /// Print the effective configuration
    Config,
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("youtrack_search={}", config.observability.log_level).into()
    });
    let json = config.observability.json_logs;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn build_engine(config: &Config) -> anyhow::Result<SearchEngine> {
    let client = YouTrackClient::from_config(&config.youtrack)
        .context("Failed to create YouTrack client")?;
    tracing::info!(base_url = %client.base_url(), "YouTrack client ready");
    Ok(SearchEngine::new(Arc::new(client), config.search.clone()))
}

/// Print the error body on stdout so callers parsing the output see the failure
fn report(err: SearchError) -> anyhow::Error {
    let error = AppError::from(err);
    match serde_json::to_string_pretty(&error.to_json()) {
        Ok(body) => println!("{}", body),
        Err(e) => tracing::warn!("Failed to render error body: {}", e),
    }
    error.into()
}

async fn run_query(engine: &SearchEngine, query: SearchQuery) -> anyhow::Result<()> {
    let response = engine.search(query.clone()).await.map_err(report)?;
    let output = SearchToolOutput::new(response, &query);
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run_texts(engine: &SearchEngine, queries: &[String]) {
    for text in queries {
        if let Err(e) = engine.search(text.as_str()).await {
            tracing::warn!(query = %text, error = %e, "Search failed");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    init_tracing(&config);

    if config.observability.prometheus_enabled {
        if let Err(e) = metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
        }
    }

    match cli.command {
        Commands::Search {
            text,
            project,
            assignee,
            state,
            priority,
            created_after,
            updated_after,
            sort_by,
            sort_order,
            limit,
            offset,
            unresolved,
        } => {
            let request = IntelligentSearchRequest {
                query_text: text,
                project,
                assignee,
                state,
                priority,
                created_after,
                updated_after,
                sort_by,
                sort_order: Some(sort_order),
                limit: Some(limit),
                offset: Some(offset),
                include_resolved: Some(!unresolved),
                ..Default::default()
            };
            let query = request.into_query().map_err(report)?;
            let engine = build_engine(&config)?;
            run_query(&engine, query).await?;
        }

        Commands::Query { request } => {
            let request: QueryBuilderRequest =
                serde_json::from_str(&request).context("Invalid query JSON")?;
            let query = request.into_query().map_err(report)?;
            let engine = build_engine(&config)?;
            run_query(&engine, query).await?;
        }

        Commands::Suggest { partial, limit } => {
            for suggestion in youtrack_search::search::completions(&partial, limit) {
                println!("{}", suggestion);
            }
        }

        Commands::Stats { queries } => {
            let engine = build_engine(&config)?;
            run_texts(&engine, &queries).await;
            let stats = serde_json::json!({
                "cache": engine.get_cache_stats(),
                "analytics": engine.get_analytics_stats(),
            });
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }

        Commands::Metrics { queries } => {
            if !queries.is_empty() {
                let engine = build_engine(&config)?;
                run_texts(&engine, &queries).await;
            }
            print!("{}", metrics::gather_metrics());
        }

        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
