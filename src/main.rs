//! # Newswright
//!
//! An article rewriting and publishing pipeline. Enqueued article URLs are
//! fetched, rewritten through a rate-limited multi-endpoint Gemini client,
//! cleaned of model artifacts, formatted as HTML, and published to a
//! WordPress site as draft posts. A SQLite database tracks which URLs have
//! been turned into posts.
//!
//! ## Usage
//!
//! ```sh
//! newswright add https://news.example/story --categories Technology
//! newswright run
//! newswright posts
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Fetching**: Download each pending article and extract title and body
//! 2. **Rewriting**: Title, body, and keyword generation with retry/failover
//!    across four rate-limited endpoints
//! 3. **Cleaning**: Strip markup and boilerplate, drop truncated fragments,
//!    filter near-duplicate paragraphs
//! 4. **Publishing**: Create the post as a WordPress draft and record the
//!    completion

use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod content;
mod error;
mod failover;
mod limiter;
mod models;
mod pipeline;
mod prompts;
mod publish;
mod scrape;
mod store;
mod utils;

use api::{GeminiClient, Generator};
use cli::{Cli, Command};
use config::AppConfig;
use content::{BoilerplateRules, ContentCleaner};
use failover::FailoverController;
use limiter::RateLimiter;
use pipeline::Pipeline;
use publish::WordPress;
use scrape::PageFetcher;
use store::{SqliteStore, UrlStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("newswright starting up");

    let args = Cli::parse();

    let config = match args.config.as_deref() {
        Some(path) => {
            let config = AppConfig::load(path)?;
            info!(path, "loaded configuration");
            config
        }
        None => AppConfig::default(),
    };

    let store = SqliteStore::open(Path::new(&args.database_path))?;

    match args.command {
        Command::Add { url, categories } => {
            if store.add_url(&url, &url, &categories)? {
                info!(url = %url, categories = ?categories, "url enqueued");
            } else {
                info!(url = %url, "url already enqueued; nothing to do");
            }
        }
        Command::Posts => {
            let records = store.published()?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Command::Run => {
            let api_key = args
                .gemini_api_key
                .ok_or("GEMINI_API_KEY is required for run")?;
            let site_url = args.wordpress_url.ok_or("WORDPRESS_URL is required for run")?;
            let username = args
                .wordpress_username
                .ok_or("WORDPRESS_USERNAME is required for run")?;
            let password = args
                .wordpress_password
                .ok_or("WORDPRESS_PASSWORD is required for run")?;

            let client = GeminiClient::new(api_key);
            let limiter = RateLimiter::new(&config.endpoints);
            let failover = FailoverController::new(config.endpoint_names());
            let generator = Generator::new(&client, &limiter, &failover, &config);
            let publisher = WordPress::new(&site_url, username, password)?;
            let cleaner = ContentCleaner::new(
                config.pipeline.similarity_threshold,
                BoilerplateRules::default(),
            );
            let pipeline = Pipeline::new(generator, &publisher, &store, cleaner, &config);
            let fetcher = PageFetcher::new();

            let summaries = pipeline.process_pending(&fetcher).await?;
            for summary in &summaries {
                info!(title = %summary.title, link = %summary.link, "published");
            }
            info!(published = summaries.len(), "run complete");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "execution complete"
    );

    Ok(())
}
