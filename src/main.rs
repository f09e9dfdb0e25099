use std::sync::Arc;

use anyhow::bail;
use clap::Parser;

mod catalog;
mod cli;
mod config;
mod embedding;
mod images;
mod search;
#[cfg(test)]
mod tests;
mod web;

use catalog::CatalogStore;
use config::Config;
use search::SearchService;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = cli::Args::parse();

    let config = Config::load_with(&args.data_dir);

    match args.command {
        cli::Command::Daemon {} => {
            let service = Arc::new(SearchService::open(&config)?);
            log::info!(
                "ready: {} catalog products, {} index entries",
                service.catalog().len(),
                service.indexed_count()
            );
            web::start_daemon(
                service,
                config.server.bind_addr.clone(),
                config.server.default_limit,
            );
            Ok(())
        }

        cli::Command::Search { text, image, limit } => {
            if text.is_none() && image.is_none() {
                bail!("nothing to search: pass --text and/or --image");
            }

            let image_bytes = image.map(std::fs::read).transpose()?;

            let service = SearchService::open(&config)?;
            let results = service.search(text.as_deref(), image_bytes.as_deref(), limit);

            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }

        cli::Command::Categories {} => {
            let catalog = CatalogStore::load(&config.products_path())?;
            for article_type in catalog.article_types() {
                println!("{article_type}");
            }
            Ok(())
        }
    }
}
