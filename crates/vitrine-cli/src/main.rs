mod commands;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "vitrine")]
#[command(about = "Search marketplaces and build affiliate links")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Search a marketplace by keywords
    Search {
        /// Keywords, e.g. "fone bluetooth"
        keywords: String,
        /// shopee or amazon
        #[arg(long, default_value = "shopee")]
        platform: String,
        /// Lowest price in reais (e.g. 49.90)
        #[arg(long)]
        min_price: Option<Decimal>,
        /// Highest price in reais
        #[arg(long)]
        max_price: Option<Decimal>,
        #[arg(long, default_value = "20")]
        limit: u32,
        #[arg(long, default_value = "1")]
        page: u32,
        /// Give up after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Show the full record of one product
    Details {
        platform: String,
        /// Shopee `{shopid}_{itemid}` or Amazon ASIN
        external_id: String,
    },
    /// Generate a tracked affiliate link for a product
    Link {
        platform: String,
        external_id: String,
        /// Campaign id: letters, digits, `_` or `-`
        #[arg(long)]
        campaign: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = vitrine_core::load_app_config_from_env()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let orchestrator = vitrine_acquisition::build_from_config(&config).await?;
    tracing::debug!(platforms = ?orchestrator.registry().platforms(), "adapters ready");

    match cli.command {
        Commands::Search {
            keywords,
            platform,
            min_price,
            max_price,
            limit,
            page,
            timeout_secs,
        } => {
            let options = commands::search_options(
                &platform,
                min_price,
                max_price,
                limit,
                page,
                timeout_secs,
            )?;
            commands::run_search(&orchestrator, &keywords, &options).await?;
        }
        Commands::Details {
            platform,
            external_id,
        } => commands::run_details(&orchestrator, &platform, &external_id).await?,
        Commands::Link {
            platform,
            external_id,
            campaign,
        } => commands::run_link(&orchestrator, &platform, &external_id, &campaign).await?,
    }

    Ok(())
}
