use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::{Extension, Router};
use tracing::instrument;

use crate::AppState;
use crate::db::SubscriptionExt;
use crate::dtos::DataResponseDto;
use crate::error::HttpError;
use crate::middleware::JWTAuthMiddleware;

/// Subscription routes; auth is applied in routes.rs
pub fn subscriptions_handler() -> Router<AppState> {
    Router::new()
        .route("/", get(get_subscriptions))
        .route("/active", get(get_active_subscription))
        .route("/{subscription_id}/cancel", post(cancel_subscription))
}

#[instrument(skip(app_state, user), fields(username = %user.user.username))]
pub async fn get_subscriptions(
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let subscriptions = app_state
        .db_client
        .get_user_subscriptions(user.user.id)
        .await
        .map_err(|e| HttpError::from_db("getting subscriptions", e))?;

    Ok(Json(DataResponseDto::success(subscriptions)))
}

#[instrument(skip(app_state, user), fields(username = %user.user.username))]
pub async fn get_active_subscription(
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let subscription = app_state
        .db_client
        .get_active_subscription(user.user.id)
        .await
        .map_err(|e| HttpError::from_db("getting active subscription", e))?
        .ok_or_else(|| HttpError::not_found("No active subscription"))?;

    Ok(Json(DataResponseDto::success(subscription)))
}

/// Turn off auto-renewal. Access continues until the end date.
#[instrument(skip(app_state, user), fields(username = %user.user.username))]
pub async fn cancel_subscription(
    Path(subscription_id): Path<i64>,
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    // Someone else's subscription looks the same as a missing one
    let subscription = app_state
        .db_client
        .cancel_subscription(user.user.id, subscription_id)
        .await
        .map_err(|e| HttpError::from_db("cancelling subscription", e))?
        .ok_or_else(|| HttpError::not_found("Subscription not found"))?;

    tracing::info!(subscription_id, "cancel_subscription successful");
    Ok(Json(DataResponseDto::success(subscription)))
}
