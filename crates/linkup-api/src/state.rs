use std::sync::Arc;

use tracing::error;

use linkup_db::{Database, StoreError, StoreResult};
use linkup_gateway::dispatcher::Dispatcher;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub dispatcher: Dispatcher,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
}

/// Run a store call off the async runtime. rusqlite is blocking, so every
/// handler goes through here.
pub async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Store(StoreError::Unavailable(format!("worker failed: {}", e)))
        })?
        .map_err(ApiError::from)
}
