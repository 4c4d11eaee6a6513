use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AppSettings;
use crate::graph::layout::{LayoutDirection, layout_nodes};
use crate::graph::{CoverageMetrics, IssueEdge, IssueGraph, IssueNode, IssueStats};
use crate::jira::client::{ProxyClient, ProxyClientError};
use crate::jira::{IssueDetailsRequest, JiraCredentials};
use crate::testcase::{GeneratorClient, TestCaseFlowError, generate_for_issue};

#[derive(Clone)]
struct AppState {
    proxy: ProxyClient,
    generator: GeneratorClient,
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Laid-out graph plus derived statistics, ready for a client to render.
#[derive(Debug, Serialize)]
struct VisualizeResponse {
    nodes: Vec<IssueNode>,
    edges: Vec<IssueEdge>,
    stats: IssueStats,
    coverage: CoverageMetrics,
}

#[derive(Debug, Deserialize)]
struct GenerateTestCaseRequest {
    #[serde(flatten)]
    credentials: JiraCredentials,
    issue_key: String,
}

pub async fn run_http_server(settings: &AppSettings, bind: &str) -> Result<()> {
    let state = AppState {
        proxy: ProxyClient::new(settings.proxy_base_url.clone(), settings.http_timeout_ms),
        generator: GeneratorClient::new(
            settings.generator_base_url.clone(),
            settings.http_timeout_ms,
        ),
    };
    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/visualize", post(handle_visualize))
        .route("/visualize-project", post(handle_visualize_project))
        .route("/issue-details", post(handle_issue_details))
        .route("/generate-test-case", post(handle_generate_test_case))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind HTTP server to `{bind}`"))?;
    let local_addr = listener.local_addr().ok();

    info!(
        proxy = %settings.proxy_base_url,
        generator = %settings.generator_base_url,
        requested_bind = %bind,
        bound_addr = local_addr.map(|addr| addr.to_string()),
        "starting HTTP facade"
    );

    axum::serve(listener, app)
        .await
        .context("HTTP server exited with an error")
}

async fn handle_health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn handle_visualize(
    State(state): State<AppState>,
    Json(credentials): Json<JiraCredentials>,
) -> Response {
    match state.proxy.visualize(&credentials).await {
        Ok(payload) => visualize_response(payload),
        Err(error) => proxy_error_response("visualize", &error),
    }
}

async fn handle_visualize_project(
    State(state): State<AppState>,
    Json(credentials): Json<JiraCredentials>,
) -> Response {
    match state.proxy.visualize_project(&credentials).await {
        Ok(payload) => visualize_response(payload),
        Err(error) => proxy_error_response("visualize-project", &error),
    }
}

async fn handle_issue_details(
    State(state): State<AppState>,
    Json(request): Json<IssueDetailsRequest>,
) -> Response {
    let credentials = JiraCredentials {
        username: request.username.clone(),
        api_token: request.api_token.clone(),
        base_url: request.base_url.clone(),
        project_id: request.project_id.clone(),
        central_jira_id: String::new(),
    };
    match state
        .proxy
        .issue_details(&credentials, &request.issue_key)
        .await
    {
        Ok(details) => (StatusCode::OK, Json(details)).into_response(),
        Err(error) => proxy_error_response("issue-details", &error),
    }
}

async fn handle_generate_test_case(
    State(state): State<AppState>,
    Json(request): Json<GenerateTestCaseRequest>,
) -> Response {
    let credentials = request.credentials.normalized();
    if let Err(error) = credentials.validate(false) {
        return error_response(StatusCode::BAD_REQUEST, error.to_string());
    }

    match generate_for_issue(
        &state.proxy,
        &state.generator,
        &credentials,
        &request.issue_key,
        None,
    )
    .await
    {
        Ok(test_case) => (StatusCode::OK, Json(test_case)).into_response(),
        Err(error) => {
            let status = status_for_flow_error(&error);
            warn!(
                status = status.as_u16(),
                issue_key = %request.issue_key,
                error = %error,
                "test case generation failed"
            );
            error_response(status, error.user_message())
        }
    }
}

fn visualize_response(payload: crate::graph::RawGraphPayload) -> Response {
    let graph = IssueGraph::from_payload(payload);
    let nodes = layout_nodes(&graph.nodes, &graph.edges, LayoutDirection::TopToBottom);
    let stats = IssueStats::collect(&nodes);
    let coverage = CoverageMetrics::compute(&stats, &graph.edges);
    (
        StatusCode::OK,
        Json(VisualizeResponse {
            nodes,
            edges: graph.edges,
            stats,
            coverage,
        }),
    )
        .into_response()
}

fn proxy_error_response(operation: &str, error: &ProxyClientError) -> Response {
    let status = status_for_proxy_error(error);
    warn!(
        status = status.as_u16(),
        operation,
        error = %error,
        "proxy request failed"
    );
    error_response(status, error.user_message())
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorBody { error: message })).into_response()
}

/// Upstream 400/401/404 pass through; anything else from the proxy, and every
/// transport-level failure, reads as a bad gateway.
fn status_for_proxy_error(error: &ProxyClientError) -> StatusCode {
    match error {
        ProxyClientError::Configuration(_) => StatusCode::BAD_REQUEST,
        ProxyClientError::Timeout { .. }
        | ProxyClientError::Transport(_)
        | ProxyClientError::ResponseFormat(_) => StatusCode::BAD_GATEWAY,
        ProxyClientError::HttpStatus { status, .. } => match *status {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND => *status,
            _ => StatusCode::BAD_GATEWAY,
        },
    }
}

fn status_for_flow_error(_error: &TestCaseFlowError) -> StatusCode {
    StatusCode::BAD_GATEWAY
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::jira::client::ProxyClientError;
    use crate::testcase::TestCaseFlowError;

    use super::{status_for_flow_error, status_for_proxy_error};

    #[test]
    fn configuration_errors_map_to_bad_request() {
        let error = ProxyClientError::Configuration("Please fill in the username".to_owned());
        assert_eq!(status_for_proxy_error(&error), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn transport_failures_map_to_bad_gateway() {
        let error = ProxyClientError::Timeout { timeout_ms: 2_000 };
        assert_eq!(status_for_proxy_error(&error), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn upstream_auth_and_missing_issue_statuses_pass_through() {
        let unauthorized = ProxyClientError::HttpStatus {
            status: StatusCode::UNAUTHORIZED,
            detail: String::new(),
        };
        let not_found = ProxyClientError::HttpStatus {
            status: StatusCode::NOT_FOUND,
            detail: String::new(),
        };
        let server_error = ProxyClientError::HttpStatus {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: String::new(),
        };

        assert_eq!(
            status_for_proxy_error(&unauthorized),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status_for_proxy_error(&not_found), StatusCode::NOT_FOUND);
        assert_eq!(status_for_proxy_error(&server_error), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn flow_errors_read_as_upstream_failures() {
        let error = TestCaseFlowError::Generation {
            issue_key: "ABC-1".to_owned(),
            message: "generator unavailable".to_owned(),
        };
        assert_eq!(status_for_flow_error(&error), StatusCode::BAD_GATEWAY);
    }
}
