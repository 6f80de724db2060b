use std::collections::HashMap;

use axum::{
    extract::{FromRequest, Multipart, Query, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{Html, IntoResponse, Response},
    Form, Json,
};
use serde::Deserialize;
use tracing::{error, info};

use crate::models::signup::SignupForm;
use crate::routes::pages::{already_verified_page, invalid_link_page, verified_page};
use crate::services::waitlist::{VerifyOutcome, WaitlistError};
use crate::state::AppState;

fn invalid_request() -> Response {
    (StatusCode::BAD_REQUEST, "Invalid request").into_response()
}

/// Signup fields from either a urlencoded or a multipart (`FormData`) body.
pub struct SignupSubmission(pub SignupForm);

impl<S> FromRequest<S> for SignupSubmission
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if !is_multipart {
            let Form(form) = Form::<SignupForm>::from_request(req, state)
                .await
                .map_err(|err| {
                    info!(error = %err, "unreadable signup body");
                    invalid_request()
                })?;
            return Ok(Self(form));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|_| invalid_request())?;
        let mut fields: HashMap<String, String> = HashMap::new();
        while let Some(field) = multipart.next_field().await.map_err(|_| invalid_request())? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let value = field.text().await.map_err(|_| invalid_request())?;
            fields.insert(name, value);
        }

        let mut take = |key: &str| fields.remove(key);
        Ok(Self(SignupForm {
            name: take("name").unwrap_or_default(),
            email: take("email").unwrap_or_default(),
            user_agent: take("userAgent"),
            timestamp: take("timestamp"),
            screen_resolution: take("screenResolution"),
            timezone: take("timezone"),
        }))
    }
}

pub async fn handle_submission(
    State(state): State<AppState>,
    SignupSubmission(form): SignupSubmission,
) -> Response {
    match state.waitlist.submit(&form).await {
        Ok(outcome) => (StatusCode::OK, outcome.message()).into_response(),
        Err(WaitlistError::Validation(err)) => {
            (StatusCode::BAD_REQUEST, err.to_string()).into_response()
        }
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct RootQuery {
    pub action: Option<String>,
    pub token: Option<String>,
}

pub async fn handle_get(State(state): State<AppState>, Query(query): Query<RootQuery>) -> Response {
    let token = query.token.as_deref().filter(|token| !token.is_empty());
    match (query.action.as_deref(), token) {
        (Some("verify"), Some(token)) => verify(&state, token).await,
        (Some("stats"), _) => stats(&state).await,
        _ => {
            info!(action = ?query.action, "invalid request parameters");
            invalid_request()
        }
    }
}

async fn verify(state: &AppState, token: &str) -> Response {
    let branding = &state.config.branding;
    match state.waitlist.verify(token).await {
        Ok(VerifyOutcome::Verified { name }) => {
            (StatusCode::OK, Html(verified_page(branding, &name))).into_response()
        }
        Ok(VerifyOutcome::AlreadyVerified { name }) => {
            (StatusCode::OK, Html(already_verified_page(branding, &name))).into_response()
        }
        Ok(VerifyOutcome::Invalid) => {
            (StatusCode::BAD_REQUEST, Html(invalid_link_page(branding))).into_response()
        }
        Err(err) => {
            error!(error = %err, "verification failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

async fn stats(state: &AppState) -> Response {
    match state.waitlist.stats().await {
        Ok(stats) => Json(stats).into_response(),
        Err(err) => {
            error!(error = %err, "failed to compute public stats");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::models::signup::SignupStatus;
    use crate::routes::test_support::TestApp;

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn form_post(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn form_submission_registers_and_verifies() {
        let app = TestApp::new();

        let (status, body) = send(
            app.router(),
            form_post("name=Ada&email=ADA%40X.com&userAgent=Mozilla%2F5.0+Chrome&timezone=UTC"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Success: Verification email sent");

        let row = app.signups.snapshot().remove(0);
        assert_eq!(row.email, "ada@x.com");
        assert_eq!(row.status, SignupStatus::Unverified);
        assert!(row.client_info.unwrap().starts_with("Chrome on Unknown OS | Unknown Resolution | UTC |"));

        let (status, page) = send(
            app.router(),
            get(&format!("/?action=verify&token={}", row.token)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(page.contains("Welcome to the Waitlist, Ada!"));
        assert_eq!(app.signups.snapshot()[0].status, SignupStatus::Verified);

        let (status, page) = send(
            app.router(),
            get(&format!("/?action=verify&token={}", row.token)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(page.contains("Already Verified!"));

        let statuses: Vec<String> = app.events.snapshot().into_iter().map(|e| e.status).collect();
        assert_eq!(statuses, vec!["SUCCESS", "SUCCESS"]);
    }

    #[tokio::test]
    async fn multipart_submission_is_accepted() {
        let app = TestApp::new();
        let body = "--XBOUNDARY\r\n\
            Content-Disposition: form-data; name=\"name\"\r\n\r\n\
            Ada\r\n\
            --XBOUNDARY\r\n\
            Content-Disposition: form-data; name=\"email\"\r\n\r\n\
            ada@x.com\r\n\
            --XBOUNDARY--\r\n";
        let request = Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(
                header::CONTENT_TYPE,
                "multipart/form-data; boundary=XBOUNDARY",
            )
            .body(Body::from(body))
            .unwrap();

        let (status, text) = send(app.router(), request).await;

        assert_eq!(status, StatusCode::OK, "{}", text);
        assert_eq!(app.signups.snapshot()[0].name, "Ada");
        assert_eq!(app.mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_and_invalid_submissions() {
        let app = TestApp::new();
        send(app.router(), form_post("name=Ada&email=ada%40x.com")).await;

        let (status, body) = send(app.router(), form_post("name=Ada&email=ADA%40x.com")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Email already registered");

        let (status, body) = send(app.router(), form_post("name=Ada")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Error: Email is required");

        let (status, body) = send(app.router(), form_post("email=bob%40x.com")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Error: Name is required");

        let (status, body) = send(app.router(), form_post("name=Bob&email=bob")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Error: Invalid email format");

        assert_eq!(app.signups.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn mail_failure_returns_server_error() {
        let app = TestApp::with_failing_mailer();

        let (status, body) = send(app.router(), form_post("name=Ada&email=ada%40x.com")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.starts_with("Error: "));
        assert_eq!(app.signups.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn unknown_token_renders_invalid_page() {
        let app = TestApp::new();
        let (status, page) = send(app.router(), get("/?action=verify&token=nope")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(page.contains("Invalid or Expired Link"));
    }

    #[tokio::test]
    async fn stats_are_public_json() {
        let app = TestApp::new();
        send(app.router(), form_post("name=Ada&email=ada%40x.com")).await;

        let (status, body) = send(app.router(), get("/?action=stats")).await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["totalSignups"], 1);
        assert_eq!(json["verifiedEmails"], 0);
        assert_eq!(json["verificationRate"], "0.0%");
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn other_queries_are_invalid_requests() {
        let app = TestApp::new();
        for uri in ["/", "/?action=verify", "/?action=verify&token=", "/?action=export"] {
            let (status, body) = send(app.router(), get(uri)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body, "Invalid request");
        }
    }
}
