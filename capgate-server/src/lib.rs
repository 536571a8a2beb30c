//! HTTP API for the capgate gateway.
//!
//! Capability API, from [`build_router`]:
//!
//! | Method | Path | Body | Response |
//! |---|---|---|---|
//! | POST | `/v1/capabilities/list` | none | [`ListResponse`] |
//! | POST | `/v1/capabilities/invoke` | [`ExecutionRequest`] | [`ExecutionResult`] or [`ErrorBody`] |
//!
//! The caller identity is read from the `Authorization: Bearer <token>`
//! header.
//!
//! Cache administration, from [`build_admin_router`]:
//!
//! | Method | Path | Body | Response |
//! |---|---|---|---|
//! | GET | `/v1/admin/cache/stats` | none | [`GatewayCacheStats`] |
//! | POST | `/v1/admin/cache/invalidate` | [`InvalidateRequest`] | [`InvalidateResponse`] |
//! | POST | `/v1/admin/cache/clear` | none | [`ClearResponse`] |
//!
//! The admin routes carry no authentication. They are served on a separate
//! listener (`server.admin_host`, loopback by default) and never on the
//! capability API listener.

use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use capgate_gateway::{Gateway, GatewayCacheStats, GatewayError};
use capgate_model::{
    CapabilityDescriptor, ExecutionRequest, ExecutionResult, Identity, ReturnShape,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// One entry of a capability listing.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CapabilitySummary {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub return_shape: ReturnShape,
}

impl From<&CapabilityDescriptor> for CapabilitySummary {
    fn from(descriptor: &CapabilityDescriptor) -> Self {
        Self {
            name: descriptor.name().to_string(),
            description: descriptor.description().to_string(),
            input_schema: descriptor.input_schema(),
            return_shape: descriptor.return_shape(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ListResponse {
    pub capabilities: Vec<CapabilitySummary>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct InvalidateRequest {
    pub identity: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct InvalidateResponse {
    pub invalidated: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ClearResponse {
    pub cleared: bool,
}

/// Error payload. `details` carries the structured validation failure.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Maps gateway errors onto HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    Gateway(GatewayError),
    BadRequest(String),
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self::Gateway(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Gateway(GatewayError::NotFound { name }) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: "not_found".into(),
                    message: format!("capability not found: {name}"),
                    details: None,
                },
            ),
            Self::Gateway(GatewayError::Validation(validation)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody {
                    error: "validation_failed".into(),
                    message: validation.to_string(),
                    details: serde_json::to_value(&validation).ok(),
                },
            ),
            Self::Gateway(GatewayError::Internal(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "internal".into(),
                    message: "internal error".into(),
                    details: None,
                },
            ),
            Self::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "bad_request".into(),
                    message,
                    details: None,
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

fn credential(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
}

async fn list_handler(
    State(gateway): State<Arc<Gateway>>,
    headers: HeaderMap,
) -> Json<ListResponse> {
    let capabilities = gateway
        .list(credential(&headers))
        .await
        .iter()
        .map(|d| CapabilitySummary::from(d.as_ref()))
        .collect();
    Json(ListResponse { capabilities })
}

async fn invoke_handler(
    State(gateway): State<Arc<Gateway>>,
    headers: HeaderMap,
    Json(request): Json<ExecutionRequest>,
) -> Result<Json<ExecutionResult>, ApiError> {
    let result = gateway.invoke(credential(&headers), request).await?;
    Ok(Json(result))
}

async fn stats_handler(State(gateway): State<Arc<Gateway>>) -> Json<GatewayCacheStats> {
    Json(gateway.cache_stats())
}

async fn invalidate_handler(
    State(gateway): State<Arc<Gateway>>,
    Json(request): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>, ApiError> {
    let identity = Identity::parse(&request.identity)
        .ok_or_else(|| ApiError::BadRequest("identity must not be blank".into()))?;
    Ok(Json(InvalidateResponse {
        invalidated: gateway.invalidate(&identity),
    }))
}

async fn clear_handler(State(gateway): State<Arc<Gateway>>) -> Json<ClearResponse> {
    gateway.clear_caches();
    Json(ClearResponse { cleared: true })
}

/// Build the capability API router around a shared gateway.
pub fn build_router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/v1/capabilities/list", post(list_handler))
        .route("/v1/capabilities/invoke", post(invoke_handler))
        .with_state(gateway)
}

/// Build the cache admin router. Serve it on a private listener only.
pub fn build_admin_router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/v1/admin/cache/stats", get(stats_handler))
        .route("/v1/admin/cache/invalidate", post(invalidate_handler))
        .route("/v1/admin/cache/clear", post(clear_handler))
        .with_state(gateway)
}
