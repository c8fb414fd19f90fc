use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use hanseg_core::Segmenter;
use hanseg_dict::LoadMode;
use hanseg_server::rate_limit::RateLimiterLayer;
use hanseg_server::{AppState, router};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_DICT_PATHS: &str = "data/dictionary.txt";
const MAX_TEXT_LEN: usize = 16 * 1024;
const DEFAULT_RATE_LIMIT_RPS: u32 = 5;
const DEFAULT_RATE_LIMIT_BURST: u32 = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = load_config();
    info!("binding to {}:{}", config.host, config.port);
    for path in &config.dict_paths {
        info!(
            "using dictionary at {} (mode: {:?})",
            path.display(),
            config.dict_mode
        );
    }
    if config.disable_cache {
        info!("cache headers disabled");
    }
    info!(
        "rate limit: {} req/s (burst {})",
        config.rate_limit_rps, config.rate_limit_burst
    );

    let start = Instant::now();
    let mut segmenter = Segmenter::new();
    segmenter.load_sources(&config.dict_paths, config.dict_mode)?;
    info!(
        "dictionary loaded in {} ms ({} words, frequency mass {})",
        start.elapsed().as_millis(),
        segmenter.dictionary().token_count(),
        segmenter.dictionary().total_frequency()
    );

    let state = AppState {
        segmenter: Arc::new(segmenter),
        max_text_len: MAX_TEXT_LEN,
        disable_cache: config.disable_cache,
    };

    let rate_limiter = RateLimiterLayer::new(config.rate_limit_rps, config.rate_limit_burst);
    let app = router(state)
        .layer(rate_limiter)
        .layer(TraceLayer::new_for_http());
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("invalid listen address");
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Clone)]
struct Config {
    host: String,
    port: u16,
    dict_paths: Vec<PathBuf>,
    dict_mode: LoadMode,
    disable_cache: bool,
    rate_limit_rps: u32,
    rate_limit_burst: u32,
}

fn load_config() -> Config {
    let mut disable_cache = false;
    let mut cli_dict_paths: Option<String> = None;
    let mut cli_dict_mode: Option<LoadMode> = None;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--no-cache" => disable_cache = true,
            "--dict" => {
                if let Some(paths) = args.next() {
                    cli_dict_paths = Some(paths);
                }
            }
            _ => {
                if let Some(paths) = arg.strip_prefix("--dict=") {
                    cli_dict_paths = Some(paths.to_string());
                } else if let Some(mode) = arg.strip_prefix("--dict-mode=") {
                    cli_dict_mode = parse_load_mode(mode);
                }
            }
        }
    }

    let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    // Comma-separated, ranked: earlier files shadow later ones on duplicate
    // surface forms.
    let dict_paths = cli_dict_paths
        .or_else(|| env::var("DICT_PATHS").ok())
        .unwrap_or_else(|| DEFAULT_DICT_PATHS.to_string())
        .split(',')
        .filter(|p| !p.trim().is_empty())
        .map(|p| PathBuf::from(p.trim()))
        .collect();
    let dict_mode = cli_dict_mode
        .or_else(|| {
            env::var("DICT_LOAD_MODE")
                .ok()
                .as_deref()
                .and_then(parse_load_mode)
        })
        .unwrap_or(LoadMode::Mmap);
    let rate_limit_rps = env::var("RATE_LIMIT_RPS")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_RATE_LIMIT_RPS);
    let rate_limit_burst = env::var("RATE_LIMIT_BURST")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_RATE_LIMIT_BURST);

    Config {
        host,
        port,
        dict_paths,
        dict_mode,
        disable_cache,
        rate_limit_rps,
        rate_limit_burst,
    }
}

fn parse_load_mode(raw: &str) -> Option<LoadMode> {
    match raw.to_ascii_lowercase().as_str() {
        "mmap" => Some(LoadMode::Mmap),
        "owned" => Some(LoadMode::Owned),
        _ => None,
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let max_level = env_filter
        .max_level_hint()
        .and_then(|hint| hint.into_level())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .with_max_level(max_level)
        .init();
}
