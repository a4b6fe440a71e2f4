use clap::{Parser, Subcommand};

/// Look up latest stock prices with caching and provider fallback.
#[derive(Debug, Parser)]
#[command(name = "stockwatch", version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the latest price for one or more tickers.
    Price {
        /// Ticker symbols, e.g. `AAPL MSFT`. Repeating a symbol shows the cache at work.
        #[arg(required = true)]
        tickers: Vec<String>,

        /// Print the cache contents after the lookups.
        #[arg(long)]
        show_cache: bool,
    },
    /// Query every provider once for a single ticker.
    Probe {
        /// Ticker to probe; defaults to AAPL.
        ticker: Option<String>,
    },
    /// Print the effective configuration with API keys masked.
    Config,
}
