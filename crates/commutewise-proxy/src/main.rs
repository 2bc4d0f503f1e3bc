use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use commutewise_core::governor::GovernorConfig;
use commutewise_core::provider::google::DEFAULT_BASE_URL;
use commutewise_core::{GoogleDirectionsProvider, RequestGovernor, TravelTimeProvider};
use commutewise_proxy::routes::directions::API_KEY_ENV;
use commutewise_proxy::{build_router, AppState};

#[derive(Parser)]
#[command(name = "commutewise-proxy", version, about = "Rate-limited travel time proxy")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "COMMUTEWISE_BIND", default_value = "127.0.0.1:8787")]
    bind: SocketAddr,
    /// Base URL of the directions service
    #[arg(long, env = "COMMUTEWISE_UPSTREAM_URL", default_value = DEFAULT_BASE_URL)]
    upstream_url: String,
    /// Requests allowed per client per minute
    #[arg(long, env = "COMMUTEWISE_WINDOW_LIMIT", default_value_t = 60)]
    window_limit: u32,
    /// Requests allowed per client per day
    #[arg(long, env = "COMMUTEWISE_DAILY_LIMIT", default_value_t = 1000)]
    daily_limit: u32,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let provider: Option<Arc<dyn TravelTimeProvider>> = match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => Some(Arc::new(GoogleDirectionsProvider::with_base_url(
            key.trim(),
            args.upstream_url.as_str(),
        ))),
        _ => {
            warn!("{API_KEY_ENV} is not set; directions requests will fail with 500");
            None
        }
    };

    let governor = RequestGovernor::in_memory(GovernorConfig {
        window_limit: args.window_limit,
        daily_limit: args.daily_limit,
        ..GovernorConfig::default()
    });
    let state = Arc::new(AppState::new(governor, provider));

    let janitor = Arc::clone(&state);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(3600));
        loop {
            ticker.tick().await;
            let removed = janitor.governor.store().purge_expired(chrono::Utc::now());
            if removed > 0 {
                info!(removed, "purged expired rate limit entries");
            }
        }
    });

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    info!(addr = %args.bind, "commutewise proxy listening");
    axum::serve(
        listener,
        build_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
