use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

use banana_edit::{
    api,
    cache::{self, proxy::DEFAULT_ASSETS},
    config,
    provider::GeminiClient,
    session,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    config::Config::dotenv_load();
    let config = config::Config::new().expect("Failed to load configuration");
    config::Config::print_env_vars();
    if config.gemini_api_key.is_empty() {
        tracing::warn!("GEMINI_API_KEY is not set; generate requests will be rejected by the provider");
    }

    let provider = GeminiClient::new(
        config.gemini_api_url.clone(),
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
    );
    let state = Arc::new(api::routes::AppState {
        session: RwLock::new(session::SessionState::new()),
        provider: Arc::new(provider),
    });

    // Bring up the offline cache generation in the background; it shares no
    // state with the session and coordinates only through the durable store.
    let cache_dir = config.cache_dir.clone();
    let cache_version = config.cache_version.clone();
    let app_origin = config.app_origin.clone();
    tokio::spawn(async move {
        let store = match cache::CacheStore::open(cache_dir, &cache_version).await {
            Ok(store) => store,
            Err(e) => {
                tracing::error!("Failed to open cache store: {}", e);
                return;
            }
        };
        let proxy = cache::FetchProxy::new(store, app_origin);
        if let Err(e) = proxy.install(DEFAULT_ASSETS).await {
            // Install failure is fatal to this cache generation only.
            tracing::error!("Cache install failed: {}", e);
            return;
        }
        if let Err(e) = proxy.activate().await {
            tracing::error!("Cache activation failed: {}", e);
        }
    });

    // Build our application with a route
    let app = api::routes::app(state).layer(CorsLayer::permissive());

    // Run our application with safe parsing
    let host_str = config.api_host.clone();
    let port_str = config.api_port.clone();
    let ip: std::net::IpAddr = host_str.parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid API_HOST '{}', falling back to 127.0.0.1", host_str);
        std::net::IpAddr::from([127, 0, 0, 1])
    });
    let port: u16 = port_str.parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid API_PORT '{}', falling back to 8190", port_str);
        8190
    });
    let socket_address = SocketAddr::new(ip, port);
    tracing::info!("listening on {}", socket_address);
    axum::Server::bind(&socket_address)
        .serve(app.into_make_service())
        .await
        .unwrap();
}
