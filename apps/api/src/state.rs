use std::sync::Arc;

use sqlx::PgPool;

use crate::jobs::dispatch::Dispatcher;
use crate::jobs::store::JobStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Used directly only for the caller entitlement lookup.
    pub db: PgPool,
    pub jobs: Arc<dyn JobStore>,
    pub dispatcher: Arc<Dispatcher>,
}
