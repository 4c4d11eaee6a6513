use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::timeout;
use tracing::debug;

use crate::config::DEFAULT_PROJECT_ID;
use crate::graph::RawGraphPayload;
use crate::issue::IssueDetails;
use crate::jira::{ConnectionTestResponse, IssueDetailsRequest, JiraCredentials};

#[derive(Debug, thiserror::Error)]
pub enum ProxyClientError {
    #[error("proxy request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("proxy returned HTTP {status}: {detail}")]
    HttpStatus { status: StatusCode, detail: String },

    #[error("response format error: {0}")]
    ResponseFormat(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ProxyClientError {
    /// Human-readable message for banners and CLI output, mapped from the
    /// HTTP status the way the original surface did it.
    pub fn user_message(&self) -> String {
        match self {
            Self::Timeout { .. } | Self::Transport(_) => {
                "No response received from server. Please check your connection.".to_owned()
            }
            Self::HttpStatus { status, detail } => match *status {
                StatusCode::UNAUTHORIZED => {
                    "Authentication failed. Check your JIRA credentials.".to_owned()
                }
                _ if !detail.is_empty() => detail.clone(),
                _ => format!("JIRA API error (HTTP {status})"),
            },
            Self::ResponseFormat(message) | Self::Configuration(message) => message.clone(),
        }
    }
}

/// Client for the JIRA proxy backend. Every call is a single attempt with a
/// fixed deadline; failures are surfaced to the user, never retried.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    http_client: reqwest::Client,
    base_url: String,
    timeout_ms: u64,
}

impl ProxyClient {
    pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout_ms,
        }
    }

    pub async fn default_credentials(&self) -> Result<JiraCredentials, ProxyClientError> {
        let url = self.endpoint("/api/jira/default-credentials");
        debug!(url = %url, "fetching default credentials");
        self.get_json(&url).await
    }

    pub async fn test_connection(
        &self,
        credentials: &JiraCredentials,
    ) -> Result<ConnectionTestResponse, ProxyClientError> {
        let credentials = self.prepare(credentials, false)?;
        let url = self.endpoint("/api/jira/test-connection");
        debug!(url = %url, username = %credentials.username, "testing JIRA connection");
        self.post_json(&url, &credentials).await
    }

    pub async fn visualize(
        &self,
        credentials: &JiraCredentials,
    ) -> Result<RawGraphPayload, ProxyClientError> {
        let credentials = self.prepare(credentials, true)?;
        let url = self.endpoint("/api/jira/visualize");
        debug!(
            url = %url,
            central_issue = %credentials.central_jira_id,
            "requesting visualization graph"
        );
        self.post_json(&url, &credentials).await
    }

    pub async fn visualize_project(
        &self,
        credentials: &JiraCredentials,
    ) -> Result<RawGraphPayload, ProxyClientError> {
        let mut credentials = self.prepare(credentials, false)?;
        if credentials.project_id.is_empty() {
            credentials.project_id = DEFAULT_PROJECT_ID.to_owned();
        }
        let url = self.endpoint("/api/jira/visualize-project");
        debug!(
            url = %url,
            project = %credentials.project_id,
            "requesting project visualization graph"
        );
        self.post_json(&url, &credentials).await
    }

    pub async fn issue_details(
        &self,
        credentials: &JiraCredentials,
        issue_key: &str,
    ) -> Result<IssueDetails, ProxyClientError> {
        if issue_key.trim().is_empty() {
            return Err(ProxyClientError::Configuration(
                "Missing JIRA issue key".to_owned(),
            ));
        }
        let credentials = self.prepare(credentials, false)?;
        let request = IssueDetailsRequest::new(&credentials, issue_key.trim());
        let url = self.endpoint("/api/jira/issue-details");
        debug!(url = %url, issue_key = %request.issue_key, "fetching issue details");
        self.post_json(&url, &request).await
    }

    fn prepare(
        &self,
        credentials: &JiraCredentials,
        require_central_issue: bool,
    ) -> Result<JiraCredentials, ProxyClientError> {
        let credentials = credentials.normalized();
        credentials
            .validate(require_central_issue)
            .map_err(|error| ProxyClientError::Configuration(error.to_string()))?;
        Ok(credentials)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ProxyClientError> {
        self.with_deadline(async {
            let response = self.http_client.get(url).send().await?;
            let response = ensure_success(response).await?;
            response.json::<T>().await.map_err(ProxyClientError::from)
        })
        .await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, ProxyClientError> {
        self.with_deadline(async {
            let response = self.http_client.post(url).json(body).send().await?;
            let response = ensure_success(response).await?;
            response.json::<T>().await.map_err(ProxyClientError::from)
        })
        .await
    }

    async fn with_deadline<T>(
        &self,
        request: impl Future<Output = Result<T, ProxyClientError>>,
    ) -> Result<T, ProxyClientError> {
        match timeout(Duration::from_millis(self.timeout_ms), request).await {
            Ok(result) => result,
            Err(_) => Err(ProxyClientError::Timeout {
                timeout_ms: self.timeout_ms,
            }),
        }
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProxyClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error response body>".to_owned());
    Err(ProxyClientError::HttpStatus {
        status,
        detail: extract_detail(&body),
    })
}

/// The proxy reports errors as `{"detail": "..."}`; fall back to the raw body
/// when the shape differs.
fn extract_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("detail")
                .and_then(|detail| detail.as_str())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| body.trim().to_owned())
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::{ProxyClientError, extract_detail};

    #[test]
    fn detail_extraction_prefers_the_detail_field() {
        assert_eq!(
            extract_detail(r#"{"detail":"Authentication failed."}"#),
            "Authentication failed."
        );
        assert_eq!(extract_detail("plain body"), "plain body");
        assert_eq!(extract_detail(r#"{"other":"field"}"#), r#"{"other":"field"}"#);
    }

    #[test]
    fn unauthorized_maps_to_credential_message() {
        let error = ProxyClientError::HttpStatus {
            status: StatusCode::UNAUTHORIZED,
            detail: "upstream detail".to_owned(),
        };
        assert_eq!(
            error.user_message(),
            "Authentication failed. Check your JIRA credentials."
        );
    }

    #[test]
    fn timeout_and_transport_map_to_connection_message() {
        let error = ProxyClientError::Timeout { timeout_ms: 5_000 };
        assert!(error.user_message().contains("No response received"));
    }

    #[test]
    fn other_statuses_surface_the_upstream_detail() {
        let error = ProxyClientError::HttpStatus {
            status: StatusCode::NOT_FOUND,
            detail: "JIRA issue ABC-1 not found.".to_owned(),
        };
        assert_eq!(error.user_message(), "JIRA issue ABC-1 not found.");
    }
}
