use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use atf_mapping::MappingTable;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use atf_server::{AppState, router};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = load_config();
    info!("binding to {}:{}", config.host, config.port);
    match &config.mapping_path {
        Some(path) => info!("using mapping table at {}", path.display()),
        None => info!("using bundled mapping table"),
    }
    if config.disable_cache {
        info!("cache headers disabled");
    }

    let start = Instant::now();
    let table = match &config.mapping_path {
        Some(path) => MappingTable::from_path(path)
            .with_context(|| format!("loading mapping table from {}", path.display()))?,
        None => MappingTable::builtin()?,
    };
    info!(
        "mapping table ({} entries) loaded in {} ms",
        table.len(),
        start.elapsed().as_millis()
    );

    let state = AppState::new(Arc::new(table), config.disable_cache);
    let app = router(state).layer(TraceLayer::new_for_http());
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid listen address")?;
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Clone)]
struct Config {
    host: String,
    port: u16,
    mapping_path: Option<PathBuf>,
    disable_cache: bool,
}

fn load_config() -> Config {
    let mut disable_cache = false;
    let mut cli_mapping: Option<PathBuf> = None;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--no-cache" => disable_cache = true,
            "--mapping" => {
                if let Some(path) = args.next() {
                    cli_mapping = Some(PathBuf::from(path));
                }
            }
            _ => {
                if let Some(path) = arg.strip_prefix("--mapping=") {
                    cli_mapping = Some(PathBuf::from(path));
                }
            }
        }
    }

    let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let mapping_path = cli_mapping.or_else(|| env::var("ATF_MAPPING_PATH").ok().map(PathBuf::from));

    Config {
        host,
        port,
        mapping_path,
        disable_cache,
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .init();
}
