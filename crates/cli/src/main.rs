//! Atelier CLI - catalog back-office from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Promo codes
//! atelier promo list --search summer
//! atelier promo create --code SUMMER10 --kind percentage --value 10 \
//!     --from 2026-06-01 --until 2026-06-30
//! atelier promo toggle 4
//! atelier promo verify summer10
//!
//! # Products
//! atelier product create --manifest shirt.yaml
//! atelier product update 12 --manifest restock.yaml
//!
//! # Categories
//! atelier categories
//! ```
//!
//! # Environment Variables
//!
//! - `ATELIER_API_URL` - Catalog API origin (required)
//! - `ATELIER_API_TOKEN` - Bearer token for writes
//! - `ATELIER_LOG_FORMAT` - `json` for structured logs
//! - `SENTRY_DSN` - Report errors to Sentry

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use atelier_admin::{AdminConfig, ApiClient, LogFormat};
use atelier_core::{ProductId, PromoCodeId};
use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::promo::PromoFields;

#[derive(Parser)]
#[command(name = "atelier")]
#[command(author, version, about = "Atelier catalog back-office")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage promo codes
    Promo {
        #[command(subcommand)]
        action: PromoAction,
    },
    /// Manage products
    Product {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// List product categories
    Categories,
}

#[derive(Subcommand)]
enum PromoAction {
    /// List promo codes
    List {
        /// Only show codes containing this text (case-insensitive)
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show one promo code
    Show { id: PromoCodeId },
    /// Create a promo code
    Create {
        #[command(flatten)]
        fields: PromoFields,
    },
    /// Change fields of a promo code
    Update {
        id: PromoCodeId,
        #[command(flatten)]
        fields: PromoFields,
    },
    /// Delete a promo code
    Delete {
        id: PromoCodeId,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Activate or deactivate a promo code
    Toggle { id: PromoCodeId },
    /// Show usage statistics
    Stats { id: PromoCodeId },
    /// Check whether a code can be used at checkout
    Verify { code: String },
}

#[derive(Subcommand)]
enum ProductAction {
    /// List products
    List,
    /// Show one product
    Show { id: ProductId },
    /// Create a product from a YAML manifest
    Create {
        #[arg(short, long)]
        manifest: PathBuf,
    },
    /// Update a product from a YAML manifest
    Update {
        id: ProductId,
        #[arg(short, long)]
        manifest: PathBuf,
    },
    /// Delete a product
    Delete {
        id: ProductId,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &AdminConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "atelier_cli=info,atelier_admin=info".into());

    let json = format == LogFormat::Json;
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_target(false));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = AdminConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);
    init_tracing(config.as_ref().map_or(LogFormat::Text, |c| c.log_format));

    let result: Result<(), Box<dyn std::error::Error>> = match config {
        Ok(config) => run(cli, &config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &AdminConfig) -> Result<(), Box<dyn std::error::Error>> {
    let client = ApiClient::new(&config.api)?;
    tracing::debug!(api = %client.base_url(), token = client.has_token(), "API client ready");

    match cli.command {
        Commands::Promo { action } => match action {
            PromoAction::List { search } => commands::promo::list(client, search).await?,
            PromoAction::Show { id } => commands::promo::show(client, id).await?,
            PromoAction::Create { fields } => commands::promo::create(client, &fields).await?,
            PromoAction::Update { id, fields } => {
                commands::promo::update(client, id, &fields).await?;
            }
            PromoAction::Delete { id, yes } => commands::promo::delete(client, id, yes).await?,
            PromoAction::Toggle { id } => commands::promo::toggle(client, id).await?,
            PromoAction::Stats { id } => commands::promo::stats(client, id).await?,
            PromoAction::Verify { code } => commands::promo::verify(client, &code).await?,
        },
        Commands::Product { action } => match action {
            ProductAction::List => commands::product::list(client).await?,
            ProductAction::Show { id } => commands::product::show(client, id).await?,
            ProductAction::Create { manifest } => {
                commands::product::create(client, &manifest).await?;
            }
            ProductAction::Update { id, manifest } => {
                commands::product::update(client, id, &manifest).await?;
            }
            ProductAction::Delete { id, yes } => {
                commands::product::delete(client, id, yes).await?;
            }
        },
        Commands::Categories => commands::product::categories(client).await?,
    }
    Ok(())
}
