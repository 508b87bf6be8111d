use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use clap::Parser;
use douban_export::{
    info_time, reconcile, store, HttpSession, Result, Scraper, DEFAULT_BASE_URL,
};
use tracing_subscriber::EnvFilter;

/// Export a Douban user's movie ratings.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Douban username (people/<username>)
    username: String,

    /// Maximum number of pages to scrape
    #[arg(short, long)]
    max_pages: Option<usize>,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Origin the listing is fetched from
    #[arg(long, env = "DOUBAN_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let start_time = Local::now();
    let username = args.username.as_str();

    let outdir = store::ensure_outdir(&args.output_dir).await?;
    let json_path = store::json_path(&outdir, username);
    let md_path = json_path.with_extension("md");

    // Read the history up front: a broken file should stop us before any scraping.
    let previous = store::read_previous(&json_path).await?;

    let scraper = Scraper::new(Arc::new(HttpSession::new()?)).with_base_url(args.base_url);
    let fresh = scraper.scrape(username, args.max_pages).await?;

    let merged = reconcile(&fresh, &previous);
    store::write_current(&json_path, &merged.records).await?;
    store::write_markdown(&md_path, &merged.records, username).await?;

    println!(
        "Scraped: {}, new: {}, total: {}\nExported movie ratings to:\n  {}\n  {}",
        fresh.len(),
        merged.added,
        merged.records.len(),
        json_path.display(),
        md_path.display()
    );
    info_time!(start_time, "Full program time:");

    Ok(())
}
