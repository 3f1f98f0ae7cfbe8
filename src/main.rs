//! Candlestick pattern screener CLI.
//!
//! Resolves the most actively traded quote-asset pairs, fetches their recent
//! bars with bounded concurrency, classifies each series and prints the
//! per-instrument report plus the pattern frequency summary.

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use candlescan::binance::{Bar, BinanceClient, Interval, FALLBACK_SYMBOLS};
use candlescan::{aggregate, classify_parallel, EngineBuilder, FrequencyTable, InstrumentReport};

#[derive(Debug, Parser)]
#[command(name = "candlescan", version, about)]
struct Args {
    /// Universe size: how many top-volume pairs to scan
    #[arg(short, long, default_value_t = 50)]
    limit: usize,

    /// Kline interval (1m, 5m, 15m, 1h, 4h, 1d, 1w)
    #[arg(short, long, default_value = "1d")]
    interval: Interval,

    /// Number of recent bars to fetch per pair
    #[arg(short, long, default_value_t = 5)]
    bars: u32,

    /// Maximum concurrent requests toward the exchange
    #[arg(short, long, default_value_t = 4)]
    concurrency: usize,

    /// Quote asset suffix used to select pairs
    #[arg(short, long, default_value = "USDT")]
    quote: String,

    /// Emit the reports and the frequency table as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("candlescan=info")),
        )
        .init();

    run(Args::parse()).await
}

async fn run(args: Args) -> Result<()> {
    let client = BinanceClient::new().context("failed to build HTTP client")?;
    let engine = EngineBuilder::new()
        .with_defaults()
        .build()
        .context("failed to build pattern engine")?;

    info!(
        "resolving the {} most traded {} pairs",
        args.limit, args.quote
    );
    let symbols = match client.top_symbols(&args.quote, args.limit).await {
        Ok(symbols) if !symbols.is_empty() => symbols,
        Ok(_) => {
            warn!("ticker endpoint returned no pairs, using the fallback list");
            fallback_universe(args.limit)
        }
        Err(e) => {
            warn!(error = %e, "pair ranking failed, using the fallback list");
            fallback_universe(args.limit)
        }
    };
    let scanned = symbols.len();

    // Per-symbol failures are non-fatal: log, skip, keep going
    let series: Vec<(String, Vec<Bar>)> = futures::stream::iter(symbols)
        .map(|symbol| {
            let client = &client;
            async move {
                match client.klines(&symbol, args.interval, args.bars).await {
                    Ok(bars) => Some((symbol, bars)),
                    Err(e) => {
                        warn!(symbol = %symbol, error = %e, "fetch failed, skipping");
                        None
                    }
                }
            }
        })
        .buffer_unordered(args.concurrency.max(1))
        .filter_map(|fetched| async move { fetched })
        .collect()
        .await;

    info!("fetched {} of {} series, classifying", series.len(), scanned);

    let instruments: Vec<(&str, &[Bar])> = series
        .iter()
        .map(|(symbol, bars)| (symbol.as_str(), bars.as_slice()))
        .collect();
    let (mut reports, errors) = classify_parallel(&engine, instruments);
    for e in &errors {
        warn!(symbol = %e.symbol, error = %e.error, "classification failed, skipping");
    }

    reports.retain(InstrumentReport::has_patterns);
    // buffer_unordered scrambles completion order; make the output stable
    reports.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    let table = aggregate(&reports);

    if args.json {
        let out = serde_json::json!({
            "scanned": scanned,
            "reports": reports,
            "frequency": table,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        render(&reports, &table, scanned);
    }

    Ok(())
}

fn fallback_universe(limit: usize) -> Vec<String> {
    FALLBACK_SYMBOLS
        .iter()
        .take(limit)
        .map(|s| s.to_string())
        .collect()
}

fn render(reports: &[InstrumentReport], table: &FrequencyTable, scanned: usize) {
    println!("{:=<72}", "");
    println!("CANDLESTICK PATTERN SCREENER");
    println!("{:=<72}", "");

    if reports.is_empty() {
        println!("No patterns found across {scanned} scanned pairs");
        return;
    }

    for report in reports {
        let patterns: Vec<&str> = report.patterns.iter().map(|p| p.name()).collect();
        println!();
        println!("{}  ({})", report.symbol, report.time);
        println!(
            "  O:{:.4} H:{:.4} L:{:.4} C:{:.4}  {:+.2}%",
            report.open, report.high, report.low, report.close, report.price_change_pct
        );
        println!("  Patterns: {}", patterns.join(", "));
    }

    println!();
    println!(
        "Patterns found in {} of {} scanned pairs",
        reports.len(),
        scanned
    );
    println!();
    println!("PATTERN FREQUENCY");
    for entry in table.iter() {
        println!("  {:<20} {}", entry.pattern.name(), entry.count);
    }
}
