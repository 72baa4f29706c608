use std::sync::Arc;

use {
    axum::{Json, extract::State},
    serde_json::{Value, json},
    snaplist_listing::ListingDefaults,
    tracing::info,
};

use crate::{
    error::{ApiError, ApiResult},
    state::GatewayState,
};

/// `GET /settings/defaults`
pub async fn get_defaults(State(state): State<Arc<GatewayState>>) -> Json<ListingDefaults> {
    Json(state.defaults.load())
}

/// `POST /settings/defaults`
pub async fn post_defaults(
    State(state): State<Arc<GatewayState>>,
    Json(defaults): Json<ListingDefaults>,
) -> ApiResult<Json<Value>> {
    state
        .defaults
        .save(&defaults)
        .map_err(|e| ApiError::Internal(format!("Failed to save defaults: {e:#}")))?;
    info!(category_id = %defaults.category_id, condition = %defaults.condition, "listing defaults saved");
    Ok(Json(json!({ "success": true })))
}
