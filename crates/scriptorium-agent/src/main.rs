//! Scriptorium: content collection for script generation.
//! Entry point for the agent binary.

mod cli;
mod config;

use std::io::Read;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use scriptorium_ingestion::{
    BroadcastPublisher, Collection, CollectionService, InMemoryCollectionRepository,
    IngestionPipeline, Metadata, PublishedMessage,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("scriptorium=debug,info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("Scriptorium {}", env!("CARGO_PKG_VERSION"));

    let config = config::Config::load()?;
    info!(
        max_file_size = config.ingestion.max_file_size,
        exchange = %config.broker.exchange,
        routing_key = %config.broker.routing_key,
        "Configuration loaded"
    );

    let pipeline = IngestionPipeline::new(&config.ingestion).context("building HTTP client")?;
    let publisher = Arc::new(BroadcastPublisher::new(
        config.broker.exchange.clone(),
        config.broker.channel_capacity,
    ));
    let mut messages = publisher.subscribe();
    let service = CollectionService::new(
        Arc::new(pipeline),
        Arc::new(InMemoryCollectionRepository::new()),
        publisher,
    )
    .with_routing_key(config.broker.routing_key.clone())
    .with_related_limit(config.ingestion.related_articles_limit);

    let params = cli.generation_params();
    let mut failures = 0usize;

    match cli.command {
        Command::Url { urls, related } => {
            for url in urls {
                match service.collect_url(&url, params.clone()).await {
                    Ok(collection) => {
                        report(&collection, &mut messages)?;
                        if related {
                            print_related(&service, &collection).await?;
                        }
                    }
                    Err(e) => {
                        failures += 1;
                        warn!(url = %url, retryable = e.is_retryable(), "Collection failed: {}", e);
                    }
                }
            }
        }
        Command::File { paths } => {
            for path in paths {
                let filename = path.display().to_string();
                let bytes = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("reading {}", filename))?;
                match service.collect_file(&filename, bytes, params.clone()).await {
                    Ok(collection) => report(&collection, &mut messages)?,
                    Err(e) => {
                        failures += 1;
                        warn!(file = %filename, "Collection failed: {}", e);
                    }
                }
            }
        }
        Command::Script { source, title } => {
            let content = read_script(&source).await?;
            let collection = service
                .collect_script(&content, title.as_deref(), params)
                .await?;
            report(&collection, &mut messages)?;
        }
    }

    let stored = service.list(config.storage.list_limit).await?;
    info!(stored = stored.len(), failures, "Done");
    for collection in &stored {
        info!(id = %collection.id, title = %collection.title, source = collection.source_type(), "Stored");
    }

    if failures > 0 {
        anyhow::bail!("{} input(s) could not be collected", failures);
    }
    Ok(())
}

async fn read_script(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        let content = tokio::task::spawn_blocking(|| {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).map(|_| buf)
        })
        .await??;
        return Ok(content);
    }
    tokio::fs::read_to_string(source)
        .await
        .with_context(|| format!("reading script {}", source))
}

/// Prints the stored collection and the message published for it.
fn report(
    collection: &Collection,
    messages: &mut broadcast::Receiver<PublishedMessage>,
) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(collection)?);
    match messages.try_recv() {
        Ok(message) => println!("{}", serde_json::to_string_pretty(&message)?),
        Err(e) => warn!(collection_id = %collection.id, "No published message: {}", e),
    }
    Ok(())
}

async fn print_related(service: &CollectionService, collection: &Collection) -> anyhow::Result<()> {
    let related = service.related_articles(collection.id).await?;
    if related.is_empty() {
        return Ok(());
    }
    let mut listing = Metadata::new();
    listing.insert("related_to".into(), collection.title.clone().into());
    listing.insert("articles".into(), serde_json::to_value(&related)?);
    println!("{}", serde_json::to_string_pretty(&listing)?);
    Ok(())
}
