//! Marketplace account and listing endpoints under `/ebay`.

use std::sync::Arc;

use {
    axum::{
        Json,
        extract::{Query, State},
        response::{Html, IntoResponse},
    },
    serde::Deserialize,
    serde_json::{Value, json},
    snaplist_listing::ListingDraft,
    snaplist_oauth::Environment,
    tracing::info,
};

use crate::{
    error::{ApiError, ApiResult},
    state::GatewayState,
};

/// `GET /ebay/config`. Never returns secrets.
pub async fn get_config(State(state): State<Arc<GatewayState>>) -> Json<Value> {
    let record = state.credentials().load();
    Json(json!({
        "configured": record.is_configured(),
        "authenticated": record.is_authenticated(),
        "environment": record.environment,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ConfigBody {
    #[serde(default)]
    app_id: Option<String>,
    #[serde(default)]
    dev_id: Option<String>,
    #[serde(default)]
    cert_id: Option<String>,
    #[serde(default)]
    environment: Option<String>,
}

/// `POST /ebay/config`. Switching environment discards stored tokens.
pub async fn post_config(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<ConfigBody>,
) -> ApiResult<Json<Value>> {
    let environment = match body.environment.as_deref().map(str::trim) {
        None | Some("") => Environment::default(),
        Some(raw) => raw.parse::<Environment>().map_err(ApiError::BadRequest)?,
    };
    let text = |v: Option<String>| v.map(|s| s.trim().to_string()).unwrap_or_default();

    let record = state
        .credentials()
        .update(|record| {
            record.set_app_credentials(
                text(body.app_id),
                text(body.dev_id),
                text(body.cert_id),
                environment,
            );
        })
        .map_err(|e| ApiError::Internal(format!("Failed to save config: {e:#}")))?;

    info!(environment = %record.environment, configured = record.is_configured(), "credentials saved");
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    redirect_uri: Option<String>,
}

fn redirect_uri(state: &GatewayState, requested: Option<String>) -> ApiResult<String> {
    requested
        .or_else(|| state.config.oauth.redirect_uri.clone())
        .map(|uri| uri.trim().to_string())
        .filter(|uri| !uri.is_empty())
        .ok_or_else(|| {
            ApiError::BadRequest("redirect_uri is not configured (set oauth.redirect_uri)".into())
        })
}

/// `GET /ebay/login`
pub async fn login(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<LoginQuery>,
) -> ApiResult<Json<Value>> {
    let redirect_uri = redirect_uri(&state, query.redirect_uri)?;
    let auth_url = state.oauth.build_authorization_url(&redirect_uri)?;
    Ok(Json(json!({ "success": true, "auth_url": auth_url })))
}

/// `GET /ebay/callback`. The page forwards `code` and `state` to
/// `/ebay/exchange-token`.
pub async fn callback() -> impl IntoResponse {
    Html(include_str!("assets/ebay_redirect.html"))
}

#[derive(Debug, Deserialize)]
pub struct ExchangeBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    redirect_uri: Option<String>,
}

/// `POST /ebay/exchange-token`
pub async fn exchange_token(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<ExchangeBody>,
) -> ApiResult<Json<Value>> {
    let code = body
        .code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("No code provided".into()))?;
    let redirect_uri = redirect_uri(&state, body.redirect_uri)?;

    state
        .oauth
        .exchange_code_for_token(code.trim(), body.state.as_deref().unwrap_or_default(), &redirect_uri)
        .await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct CreateListingBody {
    #[serde(flatten)]
    draft: ListingDraft,
    #[serde(default)]
    images: Vec<String>,
}

/// `POST /ebay/create-listing`
///
/// Blank category, condition and quantity come from the saved listing
/// defaults. Image identifiers become public upload URLs.
pub async fn create_listing(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<CreateListingBody>,
) -> ApiResult<Json<Value>> {
    if !state.credentials().is_configured() {
        return Err(ApiError::BadRequest("eBay not configured".into()));
    }

    let mut draft = body.draft;
    state.defaults.load().apply_to(&mut draft);
    draft.image_urls = state.image_host.urls_for(&body.images);
    let request = draft.validate()?;

    let result = state.publish(&request).await?;
    Ok(Json(json!({ "success": true, "result": result })))
}
