use axum::{
    extract::{FromRequestParts, Json, Path, Query, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        request::Parts,
    },
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Deserialize;
use serde_json::json;
use subtle::ConstantTimeEq;
use tracing::{error, warn};

use crate::models::signup::SignupStatus;
use crate::models::waitlist_event::ACTOR_ADMIN;
use crate::responses::JsonResponse;
use crate::services::maintenance::MaintenanceError;
use crate::state::AppState;

const DEFAULT_EVENT_LIMIT: usize = 100;
const MAX_EVENT_LIMIT: usize = 1000;

/// Guard for `/api/admin/*`: a bearer token matching `ADMIN_API_TOKEN`.
#[derive(Debug)]
pub struct AdminAuth;

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.admin_api_token.as_deref() else {
            return Err(JsonResponse::forbidden("Admin API is disabled").into_response());
        };

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| JsonResponse::unauthorized("Missing bearer token").into_response())?;

        if bool::from(expected.as_bytes().ct_eq(bearer.token().as_bytes())) {
            Ok(AdminAuth)
        } else {
            warn!("admin request with invalid token");
            Err(JsonResponse::unauthorized("Invalid admin token").into_response())
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/signups", get(list_signups))
        .route("/signups/bulk-remove", post(bulk_remove))
        .route("/signups/remove-by-status", post(remove_by_status))
        .route("/signups/{email}", get(get_signup).delete(delete_signup))
        .route("/signups/{email}/status", put(update_status))
        .route("/cleanup", post(cleanup))
        .route("/summary", get(summary))
        .route("/reports/weekly", get(weekly_report))
        .route("/launch-list", get(launch_list))
        .route("/export.csv", get(export_csv))
        .route("/events", get(list_events))
        .route("/test-email", post(send_test_email))
}

fn maintenance_error(context: &str, err: MaintenanceError) -> Response {
    match err {
        MaintenanceError::NotFound(email) => {
            JsonResponse::not_found(&format!("{} is not in the waitlist", email)).into_response()
        }
        MaintenanceError::IrreversibleTransition { .. } => {
            JsonResponse::conflict_with_code(&err.to_string(), "IRREVERSIBLE_TRANSITION")
                .into_response()
        }
        MaintenanceError::InvalidInput(msg) => JsonResponse::bad_request(&msg).into_response(),
        other => {
            error!(error = %other, "admin: {}", context);
            JsonResponse::server_error(context).into_response()
        }
    }
}

pub async fn list_signups(State(state): State<AppState>, _admin: AdminAuth) -> Response {
    match state.maintenance.list().await {
        Ok(rows) => Json(rows).into_response(),
        Err(err) => maintenance_error("Failed to list signups", err),
    }
}

pub async fn get_signup(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Path(email): Path<String>,
) -> Response {
    match state.maintenance.find(&email).await {
        Ok(record) => Json(record).into_response(),
        Err(err) => maintenance_error("Failed to look up signup", err),
    }
}

pub async fn delete_signup(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Path(email): Path<String>,
) -> Response {
    match state.maintenance.remove(&email).await {
        Ok(removed) => Json(json!({
            "success": true,
            "message": format!(
                "Removed {} from waitlist. They can now sign up again.",
                removed.email
            ),
            "removed": removed,
        }))
        .into_response(),
        Err(err) => maintenance_error("Failed to remove signup", err),
    }
}

#[derive(Deserialize)]
pub struct StatusBody {
    pub status: SignupStatus,
}

pub async fn update_status(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Path(email): Path<String>,
    Json(body): Json<StatusBody>,
) -> Response {
    match state.maintenance.change_status(&email, body.status).await {
        Ok(change) => Json(change).into_response(),
        Err(err) => maintenance_error("Failed to change status", err),
    }
}

#[derive(Deserialize)]
pub struct BulkRemoveBody {
    pub emails: Vec<String>,
}

pub async fn bulk_remove(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Json(body): Json<BulkRemoveBody>,
) -> Response {
    let results = state.maintenance.remove_many(&body.emails).await;
    let removed = results.iter().filter(|r| r.removed).count();
    Json(json!({ "removed": removed, "results": results })).into_response()
}

pub async fn remove_by_status(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Json(body): Json<StatusBody>,
) -> Response {
    match state.maintenance.remove_by_status(body.status).await {
        Ok(result) => Json(result).into_response(),
        Err(err) => maintenance_error("Failed to remove signups by status", err),
    }
}

#[derive(Deserialize, Default)]
pub struct CleanupBody {
    pub days: Option<i64>,
}

pub async fn cleanup(
    State(state): State<AppState>,
    _admin: AdminAuth,
    body: Option<Json<CleanupBody>>,
) -> Response {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    match state
        .maintenance
        .cleanup_stale(body.days, ACTOR_ADMIN)
        .await
    {
        Ok(report) => Json(report).into_response(),
        Err(err) => maintenance_error("Failed to clean up stale signups", err),
    }
}

pub async fn summary(State(state): State<AppState>, _admin: AdminAuth) -> Response {
    match state.maintenance.summary().await {
        Ok(summary) => Json(summary).into_response(),
        Err(err) => maintenance_error("Failed to build summary", err),
    }
}

pub async fn weekly_report(State(state): State<AppState>, _admin: AdminAuth) -> Response {
    match state.maintenance.weekly_report().await {
        Ok(report) => Json(report).into_response(),
        Err(err) => maintenance_error("Failed to build weekly report", err),
    }
}

pub async fn launch_list(State(state): State<AppState>, _admin: AdminAuth) -> Response {
    match state.maintenance.launch_list().await {
        Ok(list) => Json(list).into_response(),
        Err(err) => maintenance_error("Failed to build launch list", err),
    }
}

pub async fn export_csv(State(state): State<AppState>, _admin: AdminAuth) -> Response {
    match state.maintenance.export_csv().await {
        Ok(csv) => (
            [
                (CONTENT_TYPE, "text/csv; charset=utf-8"),
                (CONTENT_DISPOSITION, "attachment; filename=\"waitlist.csv\""),
            ],
            csv,
        )
            .into_response(),
        Err(err) => maintenance_error("Failed to export signups", err),
    }
}

#[derive(Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
}

pub async fn list_events(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Query(query): Query<EventsQuery>,
) -> Response {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_EVENT_LIMIT)
        .clamp(1, MAX_EVENT_LIMIT);
    match state.maintenance.events(limit).await {
        Ok(events) => Json(events).into_response(),
        Err(err) => maintenance_error("Failed to load events", err),
    }
}

#[derive(Deserialize, Default, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum TestEmailKind {
    #[default]
    Plain,
    Verification,
}

#[derive(Deserialize)]
pub struct TestEmailBody {
    pub to: String,
    #[serde(default)]
    pub kind: TestEmailKind,
}

pub async fn send_test_email(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Json(body): Json<TestEmailBody>,
) -> Response {
    let result = match body.kind {
        TestEmailKind::Plain => state.maintenance.send_test_email(&body.to).await,
        TestEmailKind::Verification => state.maintenance.send_test_verification(&body.to).await,
    };
    match result {
        Ok(()) => JsonResponse::success(&format!("Test email sent to {}", body.to.trim()))
            .into_response(),
        Err(err) => maintenance_error("Failed to send test email", err),
    }
}
