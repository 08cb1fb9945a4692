use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use sea_orm::DatabaseConnection;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::consumer::ConsumerHealth;
use crate::delivery::EmailSender;

#[derive(Clone)]
pub struct AppState {
    db: Arc<DatabaseConnection>,
    consumer: Arc<ConsumerHealth>,
    email: Option<Arc<EmailSender>>,
    canary_token: Option<String>,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        consumer: Arc<ConsumerHealth>,
        email: Option<Arc<EmailSender>>,
        canary_token: Option<String>,
    ) -> Self {
        Self {
            db,
            consumer,
            email,
            canary_token,
        }
    }
}

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
    queue: &'static str,
}

/// Builds the ops router: the platform's liveness/readiness probe plus
/// the token-protected SMTP canary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/canary/email", post(canary_email))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database_ok = state.db.ping().await.is_ok();
    let queue_ok = state.consumer.is_healthy();
    let ok = database_ok && queue_ok;

    let response = HealthResponse {
        status: if ok { "ok" } else { "degraded" },
        database: if database_ok { "ok" } else { "unreachable" },
        queue: if queue_ok { "ok" } else { "stalled" },
    };

    let code = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(response))
}

#[derive(serde::Deserialize)]
struct CanaryRequest {
    to: String,
    #[serde(default)]
    name: String,
}

#[derive(serde::Serialize)]
struct CanaryResponse {
    status: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sent_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<String>,
}

impl CanaryResponse {
    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
            sent_to: None,
            duration: None,
        }
    }
}

/// Sends a real test email so operators can verify SMTP delivery end
/// to end. Guarded by a shared bearer token.
async fn canary_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CanaryRequest>, JsonRejection>,
) -> (StatusCode, Json<CanaryResponse>) {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if !authorized(auth, state.canary_token.as_deref()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(CanaryResponse::error(
                "unauthorized — provide Authorization: Bearer <CANARY_TOKEN>",
            )),
        );
    }

    let req = match body {
        Ok(Json(req)) => req,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(CanaryResponse::error(format!("invalid JSON body: {}", e))),
            );
        }
    };
    if req.to.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(CanaryResponse::error("\"to\" field is required")),
        );
    }
    let name = if req.name.is_empty() {
        "Canary Test".to_string()
    } else {
        req.name
    };

    let Some(email) = &state.email else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(CanaryResponse::error("SMTP not configured")),
        );
    };

    let start = Instant::now();
    let result = email.send_canary(&req.to, &name).await;
    let duration = format!("{:.1?}", start.elapsed());

    match result {
        Ok(()) => {
            info!(to = %req.to, %duration, "canary email sent");
            (
                StatusCode::OK,
                Json(CanaryResponse {
                    status: "ok",
                    message: "canary email sent successfully".to_string(),
                    sent_to: Some(req.to),
                    duration: Some(duration),
                }),
            )
        }
        Err(e) => {
            warn!("canary email failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(CanaryResponse {
                    status: "error",
                    message: format!("email delivery failed: {}", e),
                    sent_to: None,
                    duration: Some(duration),
                }),
            )
        }
    }
}

/// An unconfigured token denies every request; there is no open mode.
fn authorized(header: Option<&str>, token: Option<&str>) -> bool {
    match (header, token) {
        (Some(header), Some(token)) if !token.is_empty() => {
            header.strip_prefix("Bearer ") == Some(token)
        }
        _ => false,
    }
}
