//! HTTP Handlers

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use agent_core::{AgentError, ToolDefinition};

use crate::runner::{RunRequest, RunResponse, execute_run};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: &'static str,
    pub tools: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

/// Agent failure rendered as `{error, code}` JSON
#[derive(Debug)]
pub struct ApiError(AgentError);

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = if self.0.is_config() {
            (StatusCode::BAD_REQUEST, "CONFIG_ERROR")
        } else if self.0.is_provider() {
            (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR")
        } else {
            (StatusCode::INTERNAL_SERVER_ERROR, "AGENT_ERROR")
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "Run failed");
        } else {
            tracing::warn!(error = %self.0, "Run rejected");
        }

        let body = ErrorResponse {
            error: self.0.user_message(),
            code,
        };
        (status, Json(body)).into_response()
    }
}

/// Parse the `--allow-origin` list; `*` is rejected
pub fn cors_origins(origins: &[String]) -> Result<Vec<HeaderValue>, String> {
    origins
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .map(|o| {
            if o == "*" {
                return Err("wildcard CORS origin is not allowed; list origins explicitly".into());
            }
            HeaderValue::from_str(o).map_err(|_| format!("invalid CORS origin: {o}"))
        })
        .collect()
}

/// Cross-origin browsers are refused unless their origin is listed
pub fn router(state: AppState, allowed_origins: Vec<HeaderValue>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/tools", get(list_tools))
        .route("/api/run", post(run_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider: state.settings.default_provider.as_str(),
        tools: state.tools.len(),
    })
}

/// Tool catalogue in registration order
pub async fn list_tools(State(state): State<AppState>) -> Json<Vec<ToolDefinition>> {
    Json(state.tools.list())
}

/// Run the agent once
pub async fn run_handler(
    State(state): State<AppState>,
    Json(payload): Json<RunRequest>,
) -> Result<Json<RunResponse>, ApiError> {
    let response = execute_run(&state, payload).await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedProvider, state_with};
    use agent_core::ChatResponse;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_run(body: &Value) -> Request<Body> {
        Request::post("/api/run")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn test_app(responses: Vec<agent_core::Result<ChatResponse>>) -> (Router, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = state_with(ScriptedProvider::new(responses), dir.path().to_path_buf());
        (router(state, Vec::new()), dir)
    }

    fn preflight(origin: &str) -> Request<Body> {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/run")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _dir) = test_app(Vec::new());
        let (status, body) =
            send(app, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["tools"], 4);
    }

    #[tokio::test]
    async fn test_list_tools_in_order() {
        let (app, _dir) = test_app(Vec::new());
        let (status, body) =
            send(app, Request::get("/api/tools").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["file_read", "file_write", "shell_exec", "web_fetch"]);
    }

    #[tokio::test]
    async fn test_run_success() {
        let (app, _dir) = test_app(vec![Ok(ChatResponse::text("Hello!"))]);
        let (status, body) = send(app, post_run(&json!({ "message": "hi" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply"], "Hello!");
        assert_eq!(body["toolCalls"], json!([]));
        assert_eq!(body["model"], "scripted-model");
        assert!(body.get("tokensUsed").is_none());
    }

    #[tokio::test]
    async fn test_run_error_mapping() {
        let (app, _dir) = test_app(Vec::new());
        let (status, body) =
            send(app, post_run(&json!({ "message": "hi", "provider": "bard" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "CONFIG_ERROR");

        let (app, _dir) = test_app(vec![Err(AgentError::RateLimited("slow down".into()))]);
        let (status, body) = send(app, post_run(&json!({ "message": "hi" }))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "PROVIDER_ERROR");

        let (app, _dir) = test_app(vec![Err(AgentError::Other("boom".into()))]);
        let (status, body) = send(app, post_run(&json!({ "message": "hi" }))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "An unexpected error occurred.");
    }

    #[tokio::test]
    async fn test_cross_origin_preflight_refused_by_default() {
        let (app, _dir) = test_app(Vec::new());
        let response = app.oneshot(preflight("https://evil.example")).await.unwrap();
        assert!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_listed_origin_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = state_with(ScriptedProvider::new(Vec::new()), dir.path().to_path_buf());
        let origins = cors_origins(&["http://localhost:5173".to_string()]).unwrap();
        let app = router(state, origins);

        let response = app
            .clone()
            .oneshot(preflight("http://localhost:5173"))
            .await
            .unwrap();
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:5173"
        );

        let response = app.oneshot(preflight("https://evil.example")).await.unwrap();
        assert!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_plain_text_post_rejected_before_run() {
        let (app, dir) = test_app(vec![Ok(crate::test_support::tool_call(
            "c1",
            "shell_exec",
            json!({ "command": "touch pwned" }),
        ))]);
        let request = Request::post("/api/run")
            .header(header::ORIGIN, "https://evil.example")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from(json!({ "message": "hi" }).to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(!dir.path().join("pwned").exists());
    }

    #[test]
    fn test_cors_origins_parsing() {
        let parsed = cors_origins(&[
            "http://localhost:5173".to_string(),
            " ".to_string(),
            "https://app.example".to_string(),
        ])
        .unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(cors_origins(&["*".to_string()]).is_err());
        assert!(cors_origins(&["bad\norigin".to_string()]).is_err());
    }
}
