/// Emby CLI - admin tool for testing and browsing an Emby server
mod config;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use emby_client::{EmbyClient, ImageType, ItemQuery};
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "emby-cli")]
#[command(about = "Test and browse an Emby media server", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Write the session (token, user id) back to the configuration file
    #[arg(long, global = true)]
    save: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the server answers
    Check,
    /// Log in with the configured username and password
    Login,
    /// List the user's libraries
    Libraries,
    /// List items
    Items {
        /// Restrict to children of this item or library
        #[arg(long)]
        parent_id: Option<String>,
        /// Comma-separated item types, e.g. Movie,Series
        #[arg(long)]
        types: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        recursive: bool,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show a single item
    Item { id: String },
    /// List the seasons of a series
    Seasons { series_id: String },
    /// List the episodes of a series
    Episodes {
        series_id: String,
        #[arg(long)]
        season: Option<String>,
    },
    /// Print image, stream and subtitle URLs for an item
    Urls {
        item_id: String,
        #[arg(long)]
        max_width: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "emby_cli=info,emby_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let server_config = config::load(&cli.config)?;
    let client = EmbyClient::new(server_config).context("Invalid server configuration")?;

    run(&client, cli.command).await?;

    if cli.save {
        config::save(&cli.config, &client.to_config().await)?;
    }

    Ok(())
}

async fn run(client: &EmbyClient, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Check => check(client).await?,
        Commands::Login => login(client).await?,
        Commands::Libraries => print_json(&client.list_libraries().await?)?,
        Commands::Items {
            parent_id,
            types,
            search,
            recursive,
            limit,
        } => {
            let query = ItemQuery {
                parent_id,
                include_item_types: types,
                search_term: search,
                recursive: recursive.then_some(true),
                limit,
                ..ItemQuery::default()
            };
            print_json(&client.list_items(&query).await?)?;
        }
        Commands::Item { id } => print_json(&client.get_item(&id).await?)?,
        Commands::Seasons { series_id } => print_json(&client.list_seasons(&series_id).await?)?,
        Commands::Episodes { series_id, season } => {
            print_json(&client.list_episodes(&series_id, season.as_deref()).await?)?;
        }
        Commands::Urls { item_id, max_width } => urls(client, &item_id, max_width).await?,
    }

    Ok(())
}

async fn check(client: &EmbyClient) -> anyhow::Result<()> {
    let endpoint = client.endpoint().await;

    if !client.check_connectivity().await {
        bail!("Server at {} is not reachable", endpoint);
    }

    tracing::info!(endpoint = %endpoint, "Server reachable");
    match client.public_system_info().await {
        Ok(info) => print_json(&info)?,
        Err(e) => tracing::warn!(error = %e, "Could not read server info"),
    }

    Ok(())
}

async fn login(client: &EmbyClient) -> anyhow::Result<()> {
    let config = client.to_config().await;
    let (Some(username), Some(password)) = (config.username, config.password) else {
        bail!("Login needs both username and password (set EMBY_USERNAME and EMBY_PASSWORD)");
    };

    let result = client.login(&username, &password).await?;
    tracing::info!(user_id = %result.user_id, "Logged in");

    print_json(&json!({
        "user_id": result.user_id,
        "user_name": result.user_name,
    }))
}

async fn urls(client: &EmbyClient, item_id: &str, max_width: Option<u32>) -> anyhow::Result<()> {
    // Fetching the item also makes sure the session holds a credential
    let item = client.get_item(item_id).await?;
    let urls = client.resource_urls().await;
    let media_source_id = item.media_sources.first().map(|source| source.id.as_str());

    print_json(&json!({
        "images": {
            "primary": urls.image(&item.id, ImageType::Primary, max_width),
            "backdrop": urls.image(&item.id, ImageType::Backdrop, max_width),
            "logo": urls.image(&item.id, ImageType::Logo, max_width),
        },
        "direct_stream": urls.direct_stream(&item.id, media_source_id),
        "hls_stream": urls.hls_stream(&item.id, media_source_id),
        "subtitles": urls.subtitles(&item),
    }))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
