use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report liveness and the storage backend while logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let mut backend = None;
    match state.require_snapshot_store().await {
        Ok(store) => {
            backend = Some(store.kind());
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    match backend {
        Some(kind) if !state.is_degraded() => HealthResponse::ok(kind),
        _ => HealthResponse::degraded(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::state::AppState;

    #[tokio::test]
    async fn health_reports_degraded_without_a_store() {
        let state = AppState::new(AppConfig::default());
        let response = health_status(&state).await;
        assert_eq!(response.status, "degraded");
        assert!(response.storage.is_none());
    }
}
