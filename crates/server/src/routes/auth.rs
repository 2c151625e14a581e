use axum::{Router, extract::State, response::Json as ResponseJson, routing::post};
use secrecy::ExposeSecret;
use serde::Deserialize;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError, http::extract::JsonBody};

#[derive(Debug, Deserialize, TS)]
pub struct LoginRequest {
    #[ts(optional)]
    pub password: Option<String>,
}

/// Checks the shared dashboard password. Only the presentation layer acts on
/// the result; the other API routes are not gated by it.
pub async fn login(
    State(deployment): State<DeploymentImpl>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<ResponseJson<ApiResponse>, ApiError> {
    let Some(expected) = deployment.config().app_password.as_ref() else {
        tracing::error!("APP_PASSWORD is not configured");
        return Err(ApiError::Internal(
            "Server error: APP_PASSWORD is not defined.".to_string(),
        ));
    };

    let password = payload.password.unwrap_or_default();
    if password.is_empty() {
        return Err(ApiError::BadRequest("Password is required.".to_string()));
    }
    if password != expected.expose_secret() {
        tracing::debug!("Rejected login attempt");
        return Err(ApiError::Unauthorized("Invalid password.".to_string()));
    }

    Ok(ResponseJson(ApiResponse::success("Login successful.")))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new().route("/auth", post(login))
}
