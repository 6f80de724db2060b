use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct JsonResponse {
    pub status: String,
    pub success: bool,
    pub message: String,
    pub code: Option<String>,
}

impl JsonResponse {
    fn error(status: StatusCode, msg: &str, code: Option<&str>) -> (StatusCode, Json<JsonResponse>) {
        (
            status,
            Json(JsonResponse {
                status: "error".to_string(),
                success: false,
                message: msg.to_string(),
                code: code.map(str::to_string),
            }),
        )
    }

    pub fn success(msg: &str) -> impl IntoResponse {
        (
            StatusCode::OK,
            Json(JsonResponse {
                status: "success".to_string(),
                success: true,
                message: msg.to_string(),
                code: None,
            }),
        )
    }

    pub fn not_found(msg: &str) -> impl IntoResponse {
        Self::error(StatusCode::NOT_FOUND, msg, None)
    }

    pub fn conflict_with_code(msg: &str, code: &str) -> impl IntoResponse {
        Self::error(StatusCode::CONFLICT, msg, Some(code))
    }

    pub fn server_error(msg: &str) -> impl IntoResponse {
        Self::error(StatusCode::INTERNAL_SERVER_ERROR, msg, None)
    }

    pub fn unauthorized(msg: &str) -> impl IntoResponse {
        Self::error(StatusCode::UNAUTHORIZED, msg, None)
    }

    pub fn bad_request(msg: &str) -> impl IntoResponse {
        Self::error(StatusCode::BAD_REQUEST, msg, None)
    }

    pub fn forbidden(msg: &str) -> impl IntoResponse {
        Self::error(StatusCode::FORBIDDEN, msg, None)
    }

    pub fn too_many_requests(msg: &str) -> impl IntoResponse {
        Self::error(StatusCode::TOO_MANY_REQUESTS, msg, None)
    }
}
