//! Command-line interface for invest-reporter
//!
//! # Usage
//!
//! ```bash
//! # Optional overrides
//! export INVEST_SOURCES="yfinance,fundamentus,statusinvest,investidor10"
//! export LOG_FORMAT=json
//!
//! invest-reporter fundamentals PETR4 --table
//! invest-reporter news "PETR4 Petrobras" --days 7
//! invest-reporter run VALE3
//! invest-reporter tools
//! ```

mod output;

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use clap::{Parser, Subcommand};
use invest_core::ToolRegistry;
use invest_stock::http::build_http_client;
use invest_stock::{
    Aggregator, FundamentalsTool, NewsQuery, NewsRetriever, NewsSearchTool, ReportCache,
    ReporterConfig,
};
use invest_utils::LogFormat;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "invest-reporter")]
#[command(
    about = "Gather B3 stock fundamentals and news for investment reports",
    long_about = None
)]
struct Cli {
    /// Log format: text or json (overrides LOG_FORMAT)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Aggregate fundamentals for one ticker
    Fundamentals {
        /// Ticker, e.g. PETR4 or PETR4.SA
        ticker: String,

        /// Price-history period (defaults to INVEST_PERIOD or 1y)
        #[arg(long)]
        period: Option<String>,

        /// Print a metric table instead of JSON
        #[arg(long)]
        table: bool,
    },
    /// Search recent news
    News {
        query: String,

        #[arg(long, allow_negative_numbers = true)]
        max_results: Option<i64>,

        #[arg(long)]
        days: Option<u32>,

        #[arg(long)]
        language: Option<String>,

        #[arg(long)]
        region: Option<String>,
    },
    /// Gather fundamentals and news for a report through the tool registry
    Run {
        #[arg(default_value = "PETR4")]
        ticker: String,

        /// Year stamped on the report header
        #[arg(long)]
        current_year: Option<i32>,
    },
    /// Print the definitions of the registered tools as JSON
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let app_config = invest_utils::Config::from_env()?;
    let log_format = cli.log_format.unwrap_or(app_config.log_format);
    invest_utils::init_tracing_with(log_format, &app_config.log_filter);

    let config = ReporterConfig::default()
        .with_env()
        .context("invalid INVEST_* configuration")?;

    info!(
        app = %app_config.app_name,
        environment = %app_config.environment,
        sources = ?config.sources,
        "Starting"
    );

    match cli.command {
        Commands::Fundamentals {
            ticker,
            period,
            table,
        } => fundamentals(&config, &ticker, period, table).await,
        Commands::News {
            query,
            max_results,
            days,
            language,
            region,
        } => {
            let news_query = NewsQuery::new(query)
                .max_results(max_results.unwrap_or(config.news.max_results as i64))
                .days(days.unwrap_or(config.news.days))
                .language(language.unwrap_or_else(|| config.news.language.clone()))
                .region(region.unwrap_or_else(|| config.news.region.clone()));
            news(&config, &news_query).await
        }
        Commands::Run {
            ticker,
            current_year,
        } => run(&config, &ticker, current_year.unwrap_or_else(|| Utc::now().year())).await,
        Commands::Tools => {
            let registry = build_registry(&config)?;
            println!("{}", serde_json::to_string_pretty(&registry.definitions())?);
            Ok(())
        }
    }
}

async fn fundamentals(
    config: &ReporterConfig,
    ticker: &str,
    period: Option<String>,
    table: bool,
) -> Result<()> {
    let aggregator = Aggregator::from_config(config, ReportCache::new())?;
    let period = period.unwrap_or_else(|| config.default_period.clone());

    info!(ticker, %period, sources = ?aggregator.source_names(), "Aggregating fundamentals");
    let report = aggregator.aggregate(ticker, &period).await;

    if table {
        println!("{}", output::report_table(&report));
        for line in output::report_notes(&report) {
            println!("{line}");
        }
    } else {
        println!("{}", report.render()?);
    }

    Ok(())
}

async fn news(config: &ReporterConfig, query: &NewsQuery) -> Result<()> {
    let client = build_http_client(config.request_timeout)?;
    let retriever = NewsRetriever::with_base_url(client, &config.endpoints.news);

    let search = retriever.search(query).await;
    println!("{}", search.render());

    Ok(())
}

fn build_registry(config: &ReporterConfig) -> Result<ToolRegistry> {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(FundamentalsTool::from_config(
        config,
        ReportCache::new(),
    )?));
    registry.register(Arc::new(NewsSearchTool::from_config(config)?));
    Ok(registry)
}

async fn run(config: &ReporterConfig, ticker: &str, current_year: i32) -> Result<()> {
    let registry = build_registry(config)?;

    info!(ticker, current_year, tools = ?registry.names(), "Running report tools");
    println!("# invest-reporter: {ticker} ({current_year})");

    let calls = [
        (FundamentalsTool::NAME, json!({ "ticker": ticker })),
        (NewsSearchTool::NAME, json!({ "query": ticker })),
    ];

    for (name, params) in calls {
        let output = registry.invoke(name, params).await?;
        println!("\n## {name}\n");
        println!("{}", output.as_str().unwrap_or_default());
    }

    Ok(())
}
