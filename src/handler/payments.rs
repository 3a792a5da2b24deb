use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::{Extension, Router};
use tracing::instrument;
use validator::Validate;

use crate::AppState;
use crate::db::{NewPayment, PaymentExt, SubscriptionExt};
use crate::dtos::{CreatePaymentDto, DataResponseDto, PaymentResultDto};
use crate::error::HttpError;
use crate::middleware::JWTAuthMiddleware;

const DEFAULT_CURRENCY: &str = "EUR";

/// Public plan catalog
pub fn plans_handler() -> Router<AppState> {
    Router::new()
        .route("/", get(get_plans))
        .route("/{plan_id}", get(get_plan))
}

/// Payment routes; auth is applied in routes.rs
pub fn payments_handler() -> Router<AppState> {
    Router::new().route("/", get(get_payments).post(create_payment))
}

#[instrument(skip(app_state))]
pub async fn get_plans(State(app_state): State<AppState>) -> Result<impl IntoResponse, HttpError> {
    let plans = app_state
        .db_client
        .get_plans(true)
        .await
        .map_err(|e| HttpError::from_db("getting plans", e))?;

    Ok(Json(DataResponseDto::success(plans)))
}

#[instrument(skip(app_state))]
pub async fn get_plan(
    Path(plan_id): Path<i64>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let plan = app_state
        .db_client
        .get_plan(plan_id)
        .await
        .map_err(|e| HttpError::from_db("getting plan", e))?
        .ok_or_else(|| HttpError::not_found("Plan not found"))?;

    Ok(Json(DataResponseDto::success(plan)))
}

#[instrument(skip(app_state, user), fields(username = %user.user.username))]
pub async fn get_payments(
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let payments = app_state
        .db_client
        .get_user_payments(user.user.id)
        .await
        .map_err(|e| HttpError::from_db("getting payments", e))?;

    Ok(Json(DataResponseDto::success(payments)))
}

/// Pay for a plan and open the matching subscription.
///
/// The gateway is simulated: every well-formed payment completes. Card and
/// phone numbers are only checked, never stored. Repeating a request with
/// the same `request_id` returns the original payment.
#[instrument(
    skip(app_state, user, body),
    fields(username = %user.user.username, plan_id = ?body.plan_id)
)]
pub async fn create_payment(
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreatePaymentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_payment input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let (Some(plan_id), Some(amount)) = (body.plan_id, body.amount.as_ref()) else {
        return Err(HttpError::bad_request("plan_id and amount are required"));
    };

    let plan = app_state
        .db_client
        .get_plan(plan_id)
        .await
        .map_err(|e| HttpError::from_db("getting plan", e))?
        .filter(|plan| plan.is_active)
        .ok_or_else(|| {
            tracing::error!(plan_id, "Unknown or inactive plan");
            HttpError::not_found("Plan not found")
        })?;

    if let Some(request_id) = body.request_id.as_deref() {
        let existing = app_state
            .db_client
            .find_payment_by_request(user.user.id, request_id)
            .await
            .map_err(|e| HttpError::from_db("finding payment by request", e))?;

        if let Some(payment) = existing {
            let subscription = app_state
                .db_client
                .get_subscription_by_payment(payment.id)
                .await
                .map_err(|e| HttpError::from_db("getting subscription", e))?;

            tracing::info!(payment_id = payment.id, "Payment request already processed");
            return Ok((
                StatusCode::OK,
                Json(PaymentResultDto {
                    status: payment.status.to_str().to_string(),
                    payment_id: payment.id,
                    message: "Payment already processed".to_string(),
                    subscription,
                }),
            ));
        }
    }

    let currency = body
        .currency
        .as_deref()
        .map(str::to_uppercase)
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

    let (payment, subscription) = app_state
        .db_client
        .process_payment(NewPayment {
            user_id: user.user.id,
            plan: &plan,
            amount,
            currency: &currency,
            method: body.method(),
            request_id: body.request_id.as_deref(),
        })
        .await
        .map_err(|e| HttpError::from_db("processing payment", e))?;

    tracing::info!(
        payment_id = payment.id,
        subscription_id = subscription.id,
        "create_payment successful"
    );
    Ok((
        StatusCode::CREATED,
        Json(PaymentResultDto {
            status: payment.status.to_str().to_string(),
            payment_id: payment.id,
            message: "Payment completed, subscription activated".to_string(),
            subscription: Some(subscription),
        }),
    ))
}
