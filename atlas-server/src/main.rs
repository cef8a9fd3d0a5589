use clap::Parser;
use atlas_core::AtlasConfig;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "atlas.toml")]
    config: String,

    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience — production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Init logging
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    // Load config
    let config = match AtlasConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Connect to DB
    let pool = match atlas_core::db::create_pool(&config.database).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    if args.health {
        match atlas_core::db::health_check(&pool).await {
            Ok(v) => println!("✅ PostgreSQL connected: {}", v),
            Err(e) => {
                println!("❌ PostgreSQL connection failed: {}", e);
                std::process::exit(1);
            }
        }

        match atlas_core::db::check_pgvector(&pool).await {
            Ok(v) => println!("✅ pgvector version: {}", v),
            Err(e) => {
                println!("❌ pgvector check failed: {}", e);
                std::process::exit(1);
            }
        }

        println!("✅ Atlas DB health check passed");
        return Ok(());
    }

    // Tables and the vector extension are created on first run
    atlas_core::db::init_schema(&pool, config.embedding.dimensions).await?;

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    // Spawn reindex backfill worker
    match atlas_rag::indexer::create_backend_from_config(&config) {
        Ok(backend) => {
            let reindex_pool = pool.clone();
            let reindex_config = config.clone();
            let reindex_shutdown = tx.subscribe();
            tokio::spawn(atlas_server::subsystems::reindex::run_reindex_worker(
                reindex_pool,
                reindex_config,
                backend,
                reindex_shutdown,
            ));
        }
        Err(e) => {
            tracing::warn!("Reindex worker skipped: failed to create embedding backend: {}", e);
        }
    }

    if config.http.enabled {
        atlas_server::http::start_http_server(pool, config, tx.subscribe()).await?;
    } else {
        // Headless mode: only the reindex worker runs
        tracing::info!("HTTP API disabled, running background workers only");
        let mut shutdown = tx.subscribe();
        let _ = shutdown.recv().await;
    }

    Ok(())
}
