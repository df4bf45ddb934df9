use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use tokio_util::sync::CancellationToken;

use apikit::runtime::{run, RunOptions, ShutdownOptions};
use apikit::{middleware, ModuleCtxBuilder, ModuleRegistry};
use apikit_bootstrap::{signals, AppConfig, AppConfigProvider, CliArgs};

mod cors;
mod registered_modules;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Modular web-API scaffold server
#[derive(Parser)]
#[command(name = "scaffold-server")]
#[command(about = "Modular web-API scaffold server")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port override for the HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    // defaults -> YAML -> APP__* env -> CLI overrides; also normalizes
    // and creates server.home_dir.
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config
        .logging
        .clone()
        .unwrap_or_else(apikit_bootstrap::default_logging_config);
    apikit_bootstrap::logging::init_logging(&logging_config, Path::new(&config.server.home_dir));

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(config),
    }
}

async fn run_server(config: AppConfig) -> Result<()> {
    tracing::info!(
        name = %config.app.name,
        version = %config.app.version,
        "starting server"
    );

    let db = match &config.database {
        Some(db) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .connect_lazy(&db.url())
                .context("invalid database configuration")?;
            tracing::info!(host = %db.host, database = %db.database, "database pool configured");
            Some(pool)
        }
        None => {
            tracing::info!("no database section; modules run without a pool");
            None
        }
    };

    let process_time = middleware::ProcessTime::new(
        &config.process_time.header,
        config.process_time.precision as usize,
    )?;
    let cors = cors::cors_layer(&config.cors)?;
    let root_path = config.app.root_path.clone();

    let bind_addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if signals::wait_for_shutdown().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    let registry = ModuleRegistry::discover_and_build()?;
    let provider = Arc::new(AppConfigProvider::new(config));
    let ctxb = ModuleCtxBuilder::new(provider, db, cancel.clone());

    let options = RunOptions {
        bind_addr,
        graphql_path: "/graphql".to_string(),
        shutdown: ShutdownOptions::default(),
    };

    run(registry, ctxb, cancel, options, move |router| {
        let router = if root_path.is_empty() || root_path == "/" {
            router
        } else {
            axum::Router::new().nest(&root_path, router)
        };
        router
            .layer(axum::middleware::from_fn(move |req, next| {
                middleware::process_time_middleware(process_time.clone(), req, next)
            }))
            .layer(cors)
            .layer(tower_http::trace::TraceLayer::new_for_http())
    })
    .await
}

fn check_config(config: AppConfig) -> Result<()> {
    println!("Configuration is valid");
    println!("{}", config.to_yaml()?);
    Ok(())
}
