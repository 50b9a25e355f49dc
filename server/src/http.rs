//! HTTP binding for the gateway.
//!
//! Every response body has the shape `{"status": "success" | "error",
//! "message": ..., ...}`. A hardware id that is not entitled is a normal
//! answer (200 with `"status": "error"`), not a failure.

use crate::error::GatewayError;
use crate::gateway::Gateway;
use axum::{
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use hwgate_license::{LedgerError, ListedRecord, VerifyOutcome};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Default, Deserialize)]
pub struct SubmitRequest {
    pub hardware_id: Option<String>,
    pub instance_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthorizeRequest {
    pub hardware_id: Option<String>,
    pub admin_key: Option<String>,
    pub days: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RevokeRequest {
    pub hardware_id: Option<String>,
    pub admin_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyRequest {
    pub hardware_id: Option<String>,
    pub instance_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActivityRequest {
    pub hardware_id: Option<String>,
    pub instance_id: Option<String>,
    pub status: Option<String>,
}

type ApiResult = Result<Json<Value>, GatewayError>;

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) | Self::Ledger(LedgerError::Validation(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized => StatusCode::FORBIDDEN,
            Self::Ledger(LedgerError::StoreConflict { .. }) => StatusCode::CONFLICT,
            Self::Ledger(LedgerError::StoreUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        };
        if !self.is_client_error() {
            warn!("Request failed: {}", self);
        }
        let body = json!({ "status": "error", "message": self.to_string() });
        (status, Json(body)).into_response()
    }
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, GatewayError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| GatewayError::Validation(format!("invalid JSON body: {}", e.body_text())))
}

fn required(value: Option<String>, field: &str) -> Result<String, GatewayError> {
    value.ok_or_else(|| GatewayError::Validation(format!("{field} is required")))
}

fn success(message: impl Into<String>) -> Value {
    json!({ "status": "success", "message": message.into() })
}

async fn health_handler() -> Json<Value> {
    Json(success("ok"))
}

async fn submit_handler(
    State(gateway): State<Arc<Gateway>>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> ApiResult {
    let req = body(payload)?;
    let hardware_id = required(req.hardware_id, "hardware_id")?;
    let instance_id = required(req.instance_id, "instance_id")?;

    gateway.submit_identity(&hardware_id, &instance_id).await?;
    Ok(Json(success("hardware id received")))
}

async fn authorize_handler(
    State(gateway): State<Arc<Gateway>>,
    payload: Result<Json<AuthorizeRequest>, JsonRejection>,
) -> ApiResult {
    let req = body(payload)?;
    let hardware_id = required(req.hardware_id, "hardware_id")?;
    let admin_key = required(req.admin_key, "admin_key")?;

    let record = gateway.authorize(&hardware_id, &admin_key, req.days).await?;
    let mut out = success(format!("hardware id {} authorized", record.hardware_id()));
    out["expiration_date"] = json!(record.expiration_date());
    Ok(Json(out))
}

async fn revoke_handler(
    State(gateway): State<Arc<Gateway>>,
    payload: Result<Json<RevokeRequest>, JsonRejection>,
) -> ApiResult {
    let req = body(payload)?;
    let hardware_id = required(req.hardware_id, "hardware_id")?;
    let admin_key = required(req.admin_key, "admin_key")?;

    let removed = gateway.revoke(&hardware_id, &admin_key).await?;
    let message = if removed {
        format!("hardware id {hardware_id} revoked")
    } else {
        format!("hardware id {hardware_id} was not authorized")
    };
    let mut out = success(message);
    out["removed"] = json!(removed);
    Ok(Json(out))
}

async fn verify_handler(
    State(gateway): State<Arc<Gateway>>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> ApiResult {
    let req = body(payload)?;
    let hardware_id = required(req.hardware_id, "hardware_id")?;

    let outcome = gateway
        .verify(&hardware_id, req.instance_id.as_deref())
        .await?;
    let out = match outcome {
        VerifyOutcome::Authorized { expiration_date } => {
            let mut out = success("authorized");
            out["expiration_date"] = json!(expiration_date);
            out
        }
        VerifyOutcome::NotAuthorized => json!({ "status": "error", "message": "not authorized" }),
    };
    Ok(Json(out))
}

async fn activity_handler(
    State(gateway): State<Arc<Gateway>>,
    payload: Result<Json<ActivityRequest>, JsonRejection>,
) -> ApiResult {
    let req = body(payload)?;
    let hardware_id = required(req.hardware_id, "hardware_id")?;
    let instance_id = required(req.instance_id, "instance_id")?;
    let status = required(req.status, "status")?;

    gateway
        .report_activity(&hardware_id, &instance_id, &status)
        .await?;
    Ok(Json(success(format!("activity recorded as {status}"))))
}

async fn authorized_handler(State(gateway): State<Arc<Gateway>>) -> ApiResult {
    let listing = gateway.list_authorized().await?;
    let as_of = listing.as_of();
    let records: Vec<ListedRecord> = listing.collect();

    let mut out = success(format!("{} record(s)", records.len()));
    out["as_of"] = json!(as_of);
    out["records"] = json!(records);
    Ok(Json(out))
}

async fn active_handler(State(gateway): State<Arc<Gateway>>) -> ApiResult {
    let snapshot = gateway.list_active().await?;

    let mut out = success(format!("{} hardware id(s) tracked", snapshot.len()));
    out["pruned"] = json!(snapshot.pruned_instances());
    out["entries"] = json!(snapshot.entries());
    Ok(Json(out))
}

/// Build the HTTP API router over the given gateway.
pub fn build_router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/submit_hardware_id", post(submit_handler))
        .route("/authorize", post(authorize_handler))
        .route("/revoke", post(revoke_handler))
        .route("/verify", post(verify_handler))
        .route("/report_activity", post(activity_handler))
        .route("/authorized", get(authorized_handler))
        .route("/active", get(active_handler))
        .with_state(gateway)
}
