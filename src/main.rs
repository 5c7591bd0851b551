use clap::Parser;
use linkbio::{Registry, Repos, config, db, net::http};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "linkbio", version, about = "Link-in-bio profile server")]
struct Args {
    /// TOML config file (if omitted, use env/.env)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep everything in memory instead of Postgres
    #[arg(long)]
    memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let args = Args::parse();
    let cfg = Arc::new(match &args.config {
        Some(path) => config::Config::load(path)?,
        None => config::Config::from_env()?,
    });

    let repos = if args.memory {
        tracing::warn!("running with the in-memory store, nothing will be persisted");
        Repos::memory()
    } else {
        let db = Arc::new(db::Db::with_pool_size(&cfg.database_url, cfg.db_pool_size)?);
        db.init().await?;
        Repos::postgres(db)
    };

    let registry = Arc::new(Registry::new(repos, cfg.clone()));

    let http_addr: SocketAddr = cfg.http_addr.parse()?;
    tracing::info!(%http_addr, base = %cfg.public_base_url, "linkbio HTTP listening");
    http::serve(http_addr, registry).await?;

    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::{EnvFilter, prelude::*};

    color_eyre::install().map_err(|e| anyhow::anyhow!("cannot install error hooks: {e}"))?;

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info,linkbio=debug,tower_http=debug"))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::uptime()),
        )
        .with(tracing_error::ErrorLayer::default())
        .init();
    Ok(())
}
