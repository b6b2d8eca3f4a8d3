use coinfolio::orchestration::Valuator;
use coinfolio::pricing::{CachedPriceSource, HttpPriceSource, TtlPriceCache};
use coinfolio::{api, config::Config, db::init_db, PriceSource, Repository};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;

    let pool = match init_db(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let repo = Arc::new(Repository::new(pool));
    let quotes = Arc::new(HttpPriceSource::new(
        config.price_api_url.clone(),
        config.quote_currency.clone(),
    ));
    let prices: Arc<dyn PriceSource> = Arc::new(CachedPriceSource::new(
        quotes,
        Arc::new(TtlPriceCache::new(config.price_cache_ttl_ms)),
    ));
    let valuator = Arc::new(Valuator::new(repo.clone(), prices));

    if let Err(e) = valuator.rebuild_holdings().await {
        eprintln!("Failed to rebuild holdings: {}", e);
        std::process::exit(1);
    }

    let app = api::create_router(api::AppState::new(repo, config, valuator));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Portfolio ledger listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
