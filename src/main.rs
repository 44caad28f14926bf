use clap::Parser;
use tracing_subscriber::EnvFilter;

mod app;
mod channels;
mod cli;
mod config;
mod duration;
mod embedding;
mod index;
mod rerank;
mod search;
mod storage;
#[cfg(test)]
mod tests;
mod topics;
mod videos;
mod web;

use app::{AppFactory, Backend};
use channels::{ChannelQuery, ChannelSort};
use search::SearchResponse;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rewatch=info,tower_http=info")),
        )
        .init();

    let args = cli::Args::parse();
    let paths = AppFactory::get_paths()?;

    match args.command {
        cli::Command::Serve { bind } => {
            let app = AppFactory::create_local_app(&paths)?;
            let bind = match bind {
                Some(bind) => bind,
                None => app
                    .config()
                    .read()
                    .map_err(|_| anyhow::anyhow!("config lock poisoned"))?
                    .server
                    .bind
                    .clone(),
            };
            web::start_daemon(app, bind);
            Ok(())
        }

        cli::Command::Search { query, num, json } => {
            let backend = AppFactory::create_backend(&paths)?;
            match query {
                Some(query) => run_search(backend.as_ref(), &query, num, json),
                None => run_search_prompt(backend.as_ref(), num),
            }
        }

        cli::Command::Channels {
            sort,
            query,
            limit,
            offset,
            json,
        } => {
            let backend = AppFactory::create_backend(&paths)?;
            let channels = backend.channels(ChannelQuery {
                sort: ChannelSort::parse(sort.as_deref().unwrap_or_default()),
                q: query,
                limit,
                offset: offset.unwrap_or(0),
            })?;

            if json {
                println!("{}", serde_json::to_string_pretty(&channels)?);
                return Ok(());
            }

            println!(
                "{} channels over {} videos",
                channels.distinct_channels, channels.total_videos
            );
            for row in &channels.channels {
                let watch_time = row.watch_time.as_deref().unwrap_or("-");
                println!(
                    "{:>5}  {:>6.2}%  {:>10}  {}",
                    row.count, row.percent, watch_time, row.channel
                );
            }
            if channels.has_more {
                println!(
                    "... {} more (use --offset {})",
                    channels.total_available - channels.offset - channels.returned,
                    channels.offset + channels.returned
                );
            }
            Ok(())
        }

        cli::Command::ChannelVideos { channel, json } => {
            let backend = AppFactory::create_backend(&paths)?;
            let listing = backend.channel_videos(&channel)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&listing)?);
                return Ok(());
            }

            println!("{} videos by '{}'", listing.count, listing.channel);
            for (idx, card) in listing.results.iter().enumerate() {
                println!("\n{}. {}", idx + 1, card.title);
                if let Some(published) = published_date(card) {
                    println!("   Published: {published}");
                }
                if let Some(seconds) = card.metadata.duration_secs() {
                    println!("   Duration: {}", duration::format_watch_time(seconds));
                }
                println!("   URL: {}", card.url);
            }
            Ok(())
        }

        cli::Command::Topics { json } => {
            let backend = AppFactory::create_backend(&paths)?;
            let topics = backend.topics()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&topics)?);
                return Ok(());
            }

            if !topics.available {
                println!(
                    "{}",
                    topics
                        .message
                        .unwrap_or_else(|| "No topic snapshot available".to_string())
                );
                return Ok(());
            }

            println!(
                "{} clusters over {} videos (noise ratio {:.2})",
                topics.cluster_count, topics.total_videos, topics.noise_ratio
            );
            if topics.stale {
                println!("(snapshot is stale: the collection changed since it was built)");
            }
            for cluster in &topics.clusters {
                println!(
                    "\n{} ({} videos, {:.1}%)",
                    cluster.label, cluster.size, cluster.percent
                );
                if !cluster.top_keywords.is_empty() {
                    println!("   keywords: {}", cluster.top_keywords.join(", "));
                }
            }
            Ok(())
        }
    }
}

fn run_search(
    backend: &dyn Backend,
    query: &str,
    num: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let response = backend.search(query, num)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    print_results(query, &response);
    Ok(())
}

/// Interactive loop, for when the query is left off the command line.
fn run_search_prompt(backend: &dyn Backend, num: Option<usize>) -> anyhow::Result<()> {
    println!("--- YouTube Watch Later Semantic Search ---");

    match backend.health() {
        Ok(health) => {
            println!("Database contains {} items.", health.db_count);
            if health.db_count == 0 {
                println!("Warning: the collection is empty. Run the ingestion pipeline first.");
            }
        }
        Err(err) => log::warn!("healthcheck failed: {err}"),
    }

    println!("\nType search queries (or 'quit' to exit).\n");
    loop {
        let query = match inquire::Text::new(">").prompt() {
            Ok(query) => query,
            Err(
                inquire::InquireError::OperationCanceled
                | inquire::InquireError::OperationInterrupted,
            ) => break,
            Err(err) => anyhow::bail!("prompt error: {err}"),
        };

        let query = query.trim().to_string();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("quit") {
            break;
        }

        match backend.search(&query, num) {
            Ok(response) => print_results(&query, &response),
            Err(err) => println!("Search failed: {err}"),
        }
    }

    println!("\nExiting search.");
    Ok(())
}

fn print_results(query: &str, response: &SearchResponse) {
    if response.results.is_empty() {
        println!("No relevant videos found for '{query}'.");
        return;
    }

    println!("\n--- Top {} results for '{}' ---", response.count, query);
    for (idx, card) in response.results.iter().enumerate() {
        println!("\n{}. (Score: {:.4}) {}", idx + 1, card.score, card.title);
        println!("   Channel: {}", card.channel);
        println!("   URL: {}", card.url);
    }

    if response.rerank.applied {
        println!(
            "\n(order reranked by {} in {}ms)",
            response.rerank.model.as_deref().unwrap_or("llm"),
            response.rerank.latency_ms.unwrap_or(0)
        );
    }
}

fn published_date(card: &videos::VideoCard) -> Option<String> {
    let raw = card.metadata.published_at.as_deref()?;
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|date| date.format("%Y-%m-%d").to_string())
        .ok()
}
