use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
///
/// Holds no random generator: each request builds its own balancer so
/// concurrent requests never share one.
#[derive(Clone, Default)]
pub struct AppState {
    pub config: Config,
}
