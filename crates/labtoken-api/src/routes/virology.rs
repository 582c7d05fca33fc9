//! Virology test API routes.
//!
//! ## Routes
//!
//! - `POST /virology-test/home-kit/order` - Order a home test kit
//! - `POST /virology-test/home-kit/register` - Register an already-held kit
//! - `POST /virology-test/results` - Poll for a test result
//! - `POST /virology-test/cta-exchange` - Exchange a CTA token for the
//!   diagnosis-key submission token
//!
//! Malformed bodies are rejected here with `422 UNPROCESSABLE` before any
//! store access; in particular they never reach the exchange latency floor.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use labtoken_core::token::{CtaToken, PollingToken};
use labtoken_virology::{
    CtaExchangeResult, TestKitRequestType, TestResult, VirologyLookupResult,
};

use crate::error::{ApiError, ApiErrorBody};
use crate::server::AppState;

/// Response to a successful order or register request.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VirologyOrderResponseBody {
    /// Destination URL with the CTA token embedded as a query parameter.
    pub website_url_with_query: String,
    /// The CTA token, returned separately for display to the user.
    pub token_parameter_value: String,
    /// Token for polling `/virology-test/results`.
    pub test_result_polling_token: String,
    /// Token for downstream diagnosis-key submission.
    pub diagnosis_key_submission_token: String,
}

/// Request to poll for a test result.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VirologyLookupRequest {
    /// The polling token returned when the order was created.
    pub test_result_polling_token: String,
}

/// An available test result.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VirologyLookupResponse {
    /// When the test was completed (RFC 3339, UTC).
    pub test_end_date: String,
    /// The test outcome.
    #[schema(value_type = String)]
    pub test_result: TestResult,
}

/// Request to exchange a CTA token.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CtaExchangeRequest {
    /// The human-entered CTA token.
    pub cta_token: String,
}

/// Response to a successful CTA exchange.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CtaExchangeResponse {
    /// Token for downstream diagnosis-key submission.
    pub diagnosis_key_submission_token: String,
    /// When the test was completed (RFC 3339, UTC).
    pub test_end_date: String,
    /// The test outcome.
    #[schema(value_type = String)]
    pub test_result: TestResult,
}

/// Creates the virology routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/virology-test/home-kit/order", post(order_test_kit))
        .route("/virology-test/home-kit/register", post(register_test_kit))
        .route("/virology-test/results", post(poll_test_result))
        .route("/virology-test/cta-exchange", post(exchange_cta_token))
        .route("/virology-test/health", post(mobile_health_check))
}

/// Mobile-contract health probe.
///
/// POST /virology-test/health
#[utoipa::path(
    post,
    path = "/virology-test/health",
    tag = "virology",
    responses(
        (status = 200, description = "Service is alive"),
    )
)]
pub(crate) async fn mobile_health_check() -> StatusCode {
    StatusCode::OK
}

/// Order a home test kit.
///
/// POST /virology-test/home-kit/order
#[utoipa::path(
    post,
    path = "/virology-test/home-kit/order",
    tag = "virology",
    responses(
        (status = 200, description = "Order created", body = VirologyOrderResponseBody),
        (status = 500, description = "Internal error", body = ApiErrorBody),
    )
)]
pub(crate) async fn order_test_kit(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    handle_test_order(&state, TestKitRequestType::Order).await
}

/// Register an already-held test kit.
///
/// POST /virology-test/home-kit/register
#[utoipa::path(
    post,
    path = "/virology-test/home-kit/register",
    tag = "virology",
    responses(
        (status = 200, description = "Registration created", body = VirologyOrderResponseBody),
        (status = 500, description = "Internal error", body = ApiErrorBody),
    )
)]
pub(crate) async fn register_test_kit(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    handle_test_order(&state, TestKitRequestType::Register).await
}

async fn handle_test_order(
    state: &AppState,
    request_type: TestKitRequestType,
) -> Result<(StatusCode, Json<VirologyOrderResponseBody>), ApiError> {
    tracing::info!(
        request_type = request_type.as_str(),
        "Creating virology test order"
    );

    let response = state
        .virology
        .handle_test_order_request(request_type, &state.config.websites)
        .await?;

    Ok((
        StatusCode::OK,
        Json(VirologyOrderResponseBody {
            website_url_with_query: response.website_url_with_query,
            token_parameter_value: response.cta_token.to_string(),
            test_result_polling_token: response.polling_token.to_string(),
            diagnosis_key_submission_token: response.submission_token.to_string(),
        }),
    ))
}

/// Poll for a test result.
///
/// POST /virology-test/results
#[utoipa::path(
    post,
    path = "/virology-test/results",
    tag = "virology",
    request_body = VirologyLookupRequest,
    responses(
        (status = 200, description = "Result available", body = VirologyLookupResponse),
        (status = 204, description = "Result not yet available"),
        (status = 404, description = "Unknown polling token", body = ApiErrorBody),
        (status = 422, description = "Malformed request body", body = ApiErrorBody),
        (status = 500, description = "Internal error", body = ApiErrorBody),
    )
)]
pub(crate) async fn poll_test_result(
    State(state): State<Arc<AppState>>,
    body: Result<Json<VirologyLookupRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body.map_err(unprocessable)?;
    let polling_token: PollingToken = request.test_result_polling_token.parse()?;

    match state.virology.virology_lookup_for(&polling_token).await? {
        VirologyLookupResult::Ready {
            test_end_date,
            test_result,
        } => Ok((
            StatusCode::OK,
            Json(VirologyLookupResponse {
                test_end_date: format_timestamp(test_end_date),
                test_result,
            }),
        )
            .into_response()),
        VirologyLookupResult::Pending => Ok(StatusCode::NO_CONTENT.into_response()),
        VirologyLookupResult::NotFound => Err(ApiError::not_found("test result not found")),
    }
}

/// Exchange a CTA token for the diagnosis-key submission token.
///
/// POST /virology-test/cta-exchange
#[utoipa::path(
    post,
    path = "/virology-test/cta-exchange",
    tag = "virology",
    request_body = CtaExchangeRequest,
    responses(
        (status = 200, description = "Result available, submission token released", body = CtaExchangeResponse),
        (status = 204, description = "Token valid but result not yet available"),
        (status = 404, description = "Unknown CTA token", body = ApiErrorBody),
        (status = 422, description = "Malformed request body", body = ApiErrorBody),
        (status = 500, description = "Internal error", body = ApiErrorBody),
    )
)]
pub(crate) async fn exchange_cta_token(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CtaExchangeRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    // Input validation happens before the latency floor: a token that can
    // never have been issued reveals nothing about the live token space.
    let Json(request) = body.map_err(unprocessable)?;
    let cta_token: CtaToken = request.cta_token.parse()?;

    match state.virology.exchange_cta_token(&cta_token).await? {
        CtaExchangeResult::Available {
            submission_token,
            test_end_date,
            test_result,
        } => Ok((
            StatusCode::OK,
            Json(CtaExchangeResponse {
                diagnosis_key_submission_token: submission_token.to_string(),
                test_end_date: format_timestamp(test_end_date),
                test_result,
            }),
        )
            .into_response()),
        CtaExchangeResult::Pending => Ok(StatusCode::NO_CONTENT.into_response()),
        CtaExchangeResult::NotFound => Err(ApiError::not_found("CTA token not found")),
    }
}

fn unprocessable(rejection: JsonRejection) -> ApiError {
    ApiError::unprocessable_entity(rejection.body_text())
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}
