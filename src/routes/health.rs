use crate::state::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Map, Value};

// Liveness only: always 200 with an empty object, no dependency checks.
pub async fn healthz() -> Json<Map<String, Value>> {
    Json(Map::new())
}

// Application metadata as loaded into the settings
pub async fn version(State(state): State<AppState>) -> Json<Value> {
    let settings = &state.settings;
    Json(json!({
        "name": settings.app_name,
        "version": settings.app_version,
        "description": settings.app_description,
        "environment": settings.environment.as_str(),
    }))
}
