mod audit;
mod config;
mod errors;
mod middleware;
mod models;
mod monitor;
mod routes;
mod session;

use axum::{extract::Extension, Router};
use env_logger::Env;
use std::sync::{Arc, Mutex};
use tokio::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::debug;

use audit::{AuditEmitter, HttpAuditSink};
use config::Config;
use middleware::{ActionRateLimiter, RateLimitConfig};
use monitor::{HttpAccessLogStore, HttpApprovalDirectory, MonitorConfig, UserActivityMonitor};
use session::{SessionRegistry, SessionWindows};

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    env_logger::init_from_env(Env::default().default_filter_or(&config.rust_log()));
    let bind_address = format!("{}:{}", config.host, config.port);

    // Remote collaborators
    let emitter = AuditEmitter::new(Arc::new(HttpAuditSink::new(&config.audit_sink_url)));
    let directory = Arc::new(HttpApprovalDirectory::new(&config.approval_directory_url));
    let access_log = Arc::new(HttpAccessLogStore::new(&config.access_log_url));

    let monitor = UserActivityMonitor::new(
        directory,
        access_log,
        emitter.clone(),
        MonitorConfig {
            inactivity_timeout: Duration::from_secs(config.inactivity_timeout_seconds()),
            track_page_views: config.track_page_views,
            track_user_actions: config.track_user_actions,
        },
    );

    let registry = Arc::new(SessionRegistry::new(
        SessionWindows {
            timeout_secs: config.timeout_seconds(),
            warning_lead_secs: config.warning_seconds(),
        },
        emitter.clone(),
        monitor.clone(),
    ));

    let limiter = Arc::new(Mutex::new(ActionRateLimiter::new(RateLimitConfig {
        max_actions: config.rate_limit_max_actions,
        window: Duration::from_secs(config.rate_limit_window_seconds),
    })));

    // Sweep abandoned rate limit keys so idle dashboards do not accumulate
    let sweep_limiter = limiter.clone();
    let sweep_registry = registry.clone();
    let sweep_interval = Duration::from_secs(config.rate_limit_window_seconds);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            let tracked_keys = match sweep_limiter.lock() {
                Ok(mut limiter) => {
                    limiter.prune();
                    limiter.tracked_keys()
                }
                Err(_) => continue,
            };
            debug!(
                tracked_keys,
                active_sessions = sweep_registry.len().await,
                "rate limit windows pruned"
            );
        }
    });

    println!("🚀 Starting vigil at http://{}", bind_address);

    let app = Router::new()
        .nest("/api/v1/sessions", routes::sessions::create_routes())
        .nest("/api/v1/access", routes::access::create_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(Extension(Arc::new(config)))
                .layer(Extension(registry))
                .layer(Extension(monitor))
                .layer(Extension(emitter))
                .layer(Extension(limiter)),
        );

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .unwrap_or_else(|e| {
            eprintln!("❌ Failed to bind to {}: {}", bind_address, e);
            std::process::exit(1);
        });

    axum::serve(listener, app).await.unwrap_or_else(|e| {
        eprintln!("❌ Server error: {}", e);
        std::process::exit(1);
    });
}
