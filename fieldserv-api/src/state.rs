use fieldserv_order::SchedulingCoordinator;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<SchedulingCoordinator>,
    pub auth: AuthConfig,
}
