use anyhow::Context;
use clap::{Parser, Subcommand};
use linkbio::config::Config;
use linkbio::db::Db;
use linkbio::models::types::AccountId;
use linkbio::{Registry, Repos};
use linkbio_core::describe_transformation;
use std::sync::Arc;

// cargo run --bin linkbio-admin -- check "John Doe"
// cargo run --bin linkbio-admin -- delete-user --id 7f1c...

#[derive(Debug, Parser)]
#[command(name = "linkbio-admin", version, about = "Maintenance tasks for a linkbio installation")]
struct Args {
    /// Override database URL (if omitted, use env/config)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show what a username turns into and whether it is valid (no database needed)
    Check { username: String },
    /// Print the sitemap to stdout
    Sitemap,
    /// Delete an account with its profile and links
    DeleteUser {
        #[arg(long)]
        id: AccountId,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // load config from env
    let mut cfg = Config::from_env()?;

    // allow overriding the DSN from CLI
    if let Some(url) = args.database_url {
        cfg.database_url = url;
    }
    let cfg = Arc::new(cfg);

    match args.command {
        Command::Check { username } => {
            let result = cfg.username_rules().validate(&username);
            println!("sanitized: {}", result.sanitized);
            println!("preview:   {}", result.preview);
            println!("valid:     {}", result.is_valid);
            for message in result.messages() {
                println!("error:     {message}");
            }
            if let Some(note) = describe_transformation(&username, &result.sanitized) {
                println!("note:      {note}");
            }
        }
        Command::Sitemap => {
            let registry = connect(cfg).await?;
            print!("{}", registry.services.sitemap.generate().await);
        }
        Command::DeleteUser { id } => {
            let registry = connect(cfg).await?;
            registry
                .services
                .admin
                .purge_user(id)
                .await
                .with_context(|| format!("cannot delete user {id}"))?;
            println!("deleted user {id}");
        }
    }

    Ok(())
}

async fn connect(cfg: Arc<Config>) -> anyhow::Result<Registry> {
    let db = Arc::new(Db::with_pool_size(&cfg.database_url, cfg.db_pool_size).context("cannot create database pool")?);
    db.init().await.context("cannot run migrations")?;
    Ok(Registry::new(Repos::postgres(db), cfg))
}
