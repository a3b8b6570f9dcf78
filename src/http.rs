//! HTTP surface: provider webhooks, checkout initiation and a health check.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::checkout::{CheckoutError, CheckoutRequest, CheckoutService};
use crate::fulfillment::Reconciliation;
use crate::webhooks::{WebhookError, WebhookOutcome, WebhookReceiver};

pub const PAYMENT_SIGNATURE_HEADER: &str = "stripe-signature";
pub const POS_SIGNATURE_HEADER: &str = "x-square-hmacsha256-signature";

#[derive(Clone)]
pub struct AppState {
    pub checkout: CheckoutService,
    pub webhooks: WebhookReceiver,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/checkout", post(start_checkout))
        .route("/webhooks/payments", post(payment_webhook))
        .route("/webhooks/pos", post(pos_webhook))
        .with_state(state)
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

async fn payment_webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> (StatusCode, Json<Value>) {
    let result = state
        .webhooks
        .handle_payment(&body, header(&headers, PAYMENT_SIGNATURE_HEADER))
        .await;
    webhook_response(result)
}

async fn pos_webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> (StatusCode, Json<Value>) {
    let result = state
        .webhooks
        .handle_pos(&body, header(&headers, POS_SIGNATURE_HEADER))
        .await;
    webhook_response(result)
}

fn outcome_body(outcome: &WebhookOutcome) -> Value {
    match outcome {
        WebhookOutcome::Processed(Reconciliation::Fulfilled { order_id, order_number, stock_failures }) => json!({
            "status": "fulfilled",
            "order_id": order_id,
            "order_number": order_number,
            "stock_failures": stock_failures,
        }),
        WebhookOutcome::Processed(Reconciliation::Refunded { order_id, restocked_units }) => {
            json!({ "status": "refunded", "order_id": order_id, "restocked_units": restocked_units })
        }
        WebhookOutcome::Processed(Reconciliation::Disputed { order_id }) => {
            json!({ "status": "disputed", "order_id": order_id })
        }
        WebhookOutcome::Processed(Reconciliation::AlreadyProcessed { order_id, status }) => {
            json!({ "status": "already_processed", "order_id": order_id, "order_status": status })
        }
        WebhookOutcome::PosSynced { updated } => json!({ "status": "synced", "updated": updated }),
        WebhookOutcome::Ignored { reason } => json!({ "status": "ignored", "reason": reason }),
    }
}

/// Maps a webhook result onto the status the provider acts on. Only
/// failures a redelivery can fix get a 5xx; the rest are acknowledged so the
/// provider stops retrying.
fn webhook_response(result: Result<WebhookOutcome, WebhookError>) -> (StatusCode, Json<Value>) {
    let err = match result {
        Ok(outcome) => return (StatusCode::OK, Json(outcome_body(&outcome))),
        Err(err) => err,
    };
    let status = match &err {
        WebhookError::MissingSignature | WebhookError::Signature(_) => {
            warn!(error = %err, "Webhook rejected");
            StatusCode::UNAUTHORIZED
        }
        WebhookError::Payload(_) => {
            warn!(error = %err, "Webhook payload rejected");
            StatusCode::BAD_REQUEST
        }
        WebhookError::NotConfigured(_) => {
            error!(error = %err, "Webhook received but not configured");
            StatusCode::SERVICE_UNAVAILABLE
        }
        e if e.is_retryable() => {
            error!(error = %err, "Webhook processing failed, provider will retry");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => {
            error!(error = %err, "Webhook could not be reconciled");
            return (StatusCode::OK, Json(json!({ "status": "error", "error": err.to_string() })));
        }
    };
    (status, Json(json!({ "error": err.to_string() })))
}

async fn start_checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    match state.checkout.start_checkout(request).await {
        Ok(started) => Ok((StatusCode::CREATED, Json(json!(started)))),
        Err(err) => {
            let status = match &err {
                CheckoutError::InsufficientStock { .. } | CheckoutError::Unavailable(_) => StatusCode::CONFLICT,
                e if e.is_client_error() => StatusCode::BAD_REQUEST,
                CheckoutError::Gateway { .. } => StatusCode::BAD_GATEWAY,
                _ => {
                    error!(error = %err, "Checkout failed");
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            Err((status, Json(json!({ "error": err.to_string() }))))
        }
    }
}
