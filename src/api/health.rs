use axum::{extract::State, Json};
use serde::Serialize;
use super::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub networks: Vec<String>,
    pub api_key_configured: bool,
    pub address_book_entries: usize,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    // Lookups fail with a configuration error until SAFE_API_KEY is set
    let status = if state.lookup.has_api_key() {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.config.environment.clone(),
        networks: state
            .lookup
            .networks()
            .iter()
            .map(|n| n.name.clone())
            .collect(),
        api_key_configured: state.lookup.has_api_key(),
        address_book_entries: state.lookup.address_book().len(),
    })
}
