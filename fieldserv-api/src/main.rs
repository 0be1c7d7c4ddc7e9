use fieldserv_api::{
    app, app_config::Config, state::AuthConfig, worker::start_expiry_worker, AppState,
};
use fieldserv_core::artifacts::InMemoryCompletionStore;
use fieldserv_core::notify::MockNotificationSender;
use fieldserv_core::payment::MockPaymentGateway;
use fieldserv_order::SchedulingCoordinator;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "fieldserv_api=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().expect("Failed to load config");
    tracing::info!("Starting FieldServ API on port {}", config.server.port);

    // Mock collaborators; a deployment swaps in a real provider, mailer, and
    // object store behind the same traits.
    let coordinator = Arc::new(SchedulingCoordinator::new(
        config.engine.clone(),
        Arc::new(MockPaymentGateway),
        Arc::new(MockNotificationSender::default()),
        Arc::new(InMemoryCompletionStore::default()),
    ));

    tokio::spawn(start_expiry_worker(
        coordinator.clone(),
        config.sweep.interval_seconds,
    ));

    let app_state = AppState {
        coordinator,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
