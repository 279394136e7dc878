use std::env;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use county_portal::config::Config;
use county_portal::handlers::audit;
use county_portal::permission::PermissionEnforcer;
use county_portal::{db, routes, AppState};

const DEFAULT_CONFIG: &str = "./etc/county-portal.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|arg| arg == "-help" || arg == "--help") {
        println!("Usage: county-portal [OPTIONS]");
        println!("Options:");
        println!("  -config <path>  Path to configuration file (default: {})", DEFAULT_CONFIG);
        println!("  -help, --help   Print this help message");
        return Ok(());
    }

    let config_path = args
        .iter()
        .skip_while(|arg| arg.as_str() != "-config")
        .nth(1)
        .map(|s| s.to_string())
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());

    // Load configuration first (before logging init)
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) if std::path::Path::new(&config_path).exists() => {
            // A config that exists but is invalid must not silently fall back
            return Err(e.context(format!("invalid configuration in {}", config_path)));
        }
        Err(e) => {
            eprintln!("Could not load config file: {}, using defaults", e);
            Config::default()
        }
    };

    // Priority: RUST_LOG env var > config file > default "info"
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    fmt::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    info!("Starting County Portal server...");
    info!("Loading configuration from: {}", config_path);

    let db_conn = db::init_database(&config.database).await.map_err(|e| {
        tracing::error!("Database initialization failed: {}", e);
        anyhow::anyhow!("Database initialization failed: {}", e)
    })?;

    db::ensure_admin(&db_conn, &config.bootstrap).await?;

    audit::service::init(db_conn.clone());
    info!("Audit log service initialized");

    let enforcer = PermissionEnforcer::new().await.map_err(|e| {
        tracing::error!("Permission enforcer initialization failed: {}", e);
        anyhow::anyhow!("Permission enforcer initialization failed: {}", e)
    })?;
    info!("Permission enforcer initialized");

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address '{}': {}", config.addr, e))?;

    let state = AppState::new(db_conn, enforcer, config);
    let app = routes::create_router(state);

    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
