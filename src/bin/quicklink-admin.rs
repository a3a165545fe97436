use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quicklink::config::Config;
use quicklink::shortener::{ClickRecorderConfig, LinkService, ShortenerError, UrlValidator};
use quicklink::storage;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "quicklink-admin")]
#[command(about = "Quicklink link management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Shorten a URL
    Create {
        /// URL to shorten (https:// is assumed when no scheme is given)
        url: String,
    },
    /// List links, newest first
    List {
        #[arg(long, default_value_t = 50)]
        limit: i64,
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },
    /// Delete a link by id
    Delete {
        id: i64,
    },
    /// Show where a short code points (counts as a click)
    Resolve {
        code: String,
    },
    /// Print the total number of links
    Count,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let storage = storage::connect(&config.database, None)
        .await
        .context("failed to open database")?;
    let service = Arc::new(LinkService::new(
        storage,
        UrlValidator::new(config.restrict_private_hosts),
        ClickRecorderConfig::default(),
    ));

    let result = run(&cli.command, &service, &config).await;
    service.shutdown().await;
    result
}

async fn run(command: &Commands, service: &LinkService, config: &Config) -> Result<()> {
    match command {
        Commands::Create { url } => {
            let link = service.create_link(url).await?;
            println!(
                "✓ {}/{} -> {} (id {})",
                config.redirect_base_url, link.short_code, link.original_url, link.id
            );
        }
        Commands::List { limit, offset } => {
            let links = service.list_links(*limit, *offset).await?;
            if links.is_empty() {
                println!("No links found.");
            } else {
                println!(
                    "{:<8} {:<14} {:<8} {}",
                    "ID", "Short Code", "Clicks", "Original URL"
                );
                println!("{}", "-".repeat(80));
                for link in links {
                    println!(
                        "{:<8} {:<14} {:<8} {}",
                        link.id, link.short_code, link.click_count, link.original_url
                    );
                }
            }
        }
        Commands::Delete { id } => match service.delete_link(*id).await {
            Ok(()) => println!("✓ Deleted link {}", id),
            Err(ShortenerError::NotFound) => println!("⚠ Link {} does not exist", id),
            Err(err) => return Err(err.into()),
        },
        Commands::Resolve { code } => match service.resolve(code).await {
            Ok(resolution) => println!("{}", resolution.original_url),
            Err(ShortenerError::NotFound) => println!("⚠ Short code '{}' not found", code),
            Err(err) => return Err(err.into()),
        },
        Commands::Count => {
            println!("{}", service.link_count().await?);
        }
    }

    Ok(())
}
