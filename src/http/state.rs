use crate::config::runner::ServerConfig;
use crate::config::types::{ExecutionRequest, ExecutionResult};
use crate::exec::coordinator::ExecutionCoordinator;
use crate::http::error::ApiError;
use std::sync::Arc;
use tokio::sync::Semaphore;

pub struct AppState {
    pub coordinator: Arc<ExecutionCoordinator>,
    pub config: ServerConfig,
    permits: Arc<Semaphore>,
}

impl AppState {
    pub fn new(coordinator: ExecutionCoordinator, config: ServerConfig) -> Arc<Self> {
        let permits = Arc::new(Semaphore::new(
            coordinator.config().max_concurrent_executions,
        ));
        Arc::new(Self {
            coordinator: Arc::new(coordinator),
            config,
            permits,
        })
    }

    /// Run a request on the blocking pool once an execution slot is free.
    pub async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult, ApiError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ApiError::Internal("execution pool is closed".to_string()))?;

        let coordinator = self.coordinator.clone();
        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            coordinator.execute(&request)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("execution worker failed: {e}")))??;

        Ok(result)
    }
}
