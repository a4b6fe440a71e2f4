mod args;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use stockwatch_market_data::{MarketDataConfig, PriceResponse, PriceService};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use args::{Args, Command};

/// Install the global subscriber. `STOCKWATCH_LOG_FORMAT=json` switches to
/// JSON lines; `RUST_LOG` overrides the default `info` filter.
fn init_tracing() {
    let log_format =
        std::env::var("STOCKWATCH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    let stderr = std::io::stderr;

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false).with_writer(stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(stderr),
            )
            .init();
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}

/// Log each failed lookup and return how many there were.
fn report_failures(responses: &[PriceResponse]) -> usize {
    let mut failed = 0;
    for response in responses {
        if let PriceResponse::Error {
            ticker,
            error_message,
            ..
        } = response
        {
            tracing::warn!(%ticker, "lookup failed: {}", error_message);
            failed += 1;
        }
    }
    if failed > 0 {
        tracing::warn!("{} of {} lookups failed", failed, responses.len());
    }
    failed
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing();
    tracing::debug!(command = ?args.command, "stockwatch starting");

    let config = MarketDataConfig::from_env();
    let service = || PriceService::from_config(&config).context("failed to build price service");

    match args.command {
        Command::Config => {
            println!("{config:#?}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Price {
            tickers,
            show_cache,
        } => {
            let service = service()?;
            let symbols: Vec<&str> = tickers.iter().map(String::as_str).collect();
            let responses = service.get_prices(&symbols).await;
            print_json(&responses)?;
            if show_cache {
                print_json(&service.cache_info())?;
            }
            if report_failures(&responses) == 0 {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Probe { ticker } => {
            let report = service()?.probe_all_providers(ticker.as_deref()).await;
            print_json(&report)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
