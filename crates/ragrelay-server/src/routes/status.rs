use axum::{extract::State, response::Json, routing::get, Router};
use serde_json::{json, Value};

use crate::state::AppState;

// Liveness probe; also tells operators which answer service this
// relay was pointed at.
async fn status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "upstream": state.upstream_host,
    }))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new().route("/status", get(status)).with_state(state)
}
