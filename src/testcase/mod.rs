use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, info};

use crate::issue::IssueDetails;
use crate::jira::JiraCredentials;
use crate::jira::client::ProxyClient;

/// Normalized issue payload sent to the test-case generation endpoint. The
/// description is already converted to plain text here so the generator never
/// sees raw ADF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestCaseRequest {
    pub issue_key: String,
    pub summary: String,
    pub issue_type: String,
    pub status: String,
    pub priority: Option<String>,
    pub description: String,
    pub labels: Vec<String>,
    pub components: Vec<String>,
}

impl TestCaseRequest {
    pub fn from_details(details: &IssueDetails) -> Self {
        Self {
            issue_key: details.key.clone(),
            summary: details.summary.clone(),
            issue_type: details.issue_type.clone(),
            status: details.status.clone(),
            priority: details.priority.clone(),
            description: details.description.to_plain_text(),
            labels: details.labels.clone(),
            components: details.components.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TestStep {
    #[serde(default)]
    pub step: String,
    #[serde(default)]
    pub expected: String,
    #[serde(default)]
    pub data: String,
}

fn default_test_type() -> String {
    "Manual".to_owned()
}

fn default_priority() -> String {
    "Medium".to_owned()
}

/// Xray-shaped test case as returned by the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedTestCase {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub precondition: String,
    #[serde(rename = "type", default = "default_test_type")]
    pub test_type: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub steps: Vec<TestStep>,
}

#[derive(Debug, thiserror::Error)]
pub enum GeneratorClientError {
    #[error("generator request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("generator returned HTTP {status}: {detail}")]
    HttpStatus { status: StatusCode, detail: String },

    #[error("generator response missing field: {field}")]
    MissingField { field: &'static str },
}

impl GeneratorClientError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Timeout { .. } | Self::Transport(_) => {
                "No response received from the test case generator. Please check your connection."
                    .to_owned()
            }
            Self::HttpStatus { detail, status } => {
                if detail.is_empty() {
                    format!("Test case generator error (HTTP {status})")
                } else {
                    detail.clone()
                }
            }
            Self::MissingField { field } => {
                format!("Test case generator returned an incomplete test case (missing {field})")
            }
        }
    }
}

/// Client for the LLM-backed test-case generation endpoint. Single attempt,
/// fixed deadline, no retry; a failed generation waits for the user to
/// trigger it again.
#[derive(Debug, Clone)]
pub struct GeneratorClient {
    http_client: reqwest::Client,
    base_url: String,
    timeout_ms: u64,
}

impl GeneratorClient {
    pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout_ms,
        }
    }

    pub async fn generate(
        &self,
        request: &TestCaseRequest,
    ) -> Result<GeneratedTestCase, GeneratorClientError> {
        let url = format!(
            "{}/api/generate-test-case",
            self.base_url.trim_end_matches('/')
        );
        debug!(url = %url, issue_key = %request.issue_key, "requesting test case generation");

        let send = async {
            let response = self.http_client.post(&url).json(request).send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<failed to read error response body>".to_owned());
                return Err(GeneratorClientError::HttpStatus {
                    status,
                    detail: extract_detail(&body),
                });
            }
            response
                .json::<GeneratedTestCase>()
                .await
                .map_err(GeneratorClientError::from)
        };

        let test_case = match timeout(Duration::from_millis(self.timeout_ms), send).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(GeneratorClientError::Timeout {
                    timeout_ms: self.timeout_ms,
                });
            }
        };

        // A test case without steps has nothing to display or export.
        if test_case.steps.is_empty() {
            return Err(GeneratorClientError::MissingField { field: "steps" });
        }
        Ok(test_case)
    }
}

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

#[derive(Debug, thiserror::Error)]
pub enum TestCaseFlowError {
    #[error("Failed to load issue details for {issue_key}: {message}")]
    DetailsFetch { issue_key: String, message: String },

    #[error("Test case generation failed for {issue_key}: {message}")]
    Generation { issue_key: String, message: String },
}

impl TestCaseFlowError {
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// Full generation flow for one issue: make sure details are loaded (reusing
/// the caller's cached copy when present), normalize the payload, and call the
/// generator. Any failure leaves the caller's state untouched and carries a
/// human-readable message.
pub async fn generate_for_issue(
    proxy: &ProxyClient,
    generator: &GeneratorClient,
    credentials: &JiraCredentials,
    issue_key: &str,
    cached_details: Option<&IssueDetails>,
) -> Result<GeneratedTestCase, TestCaseFlowError> {
    let fetched;
    let details = match cached_details {
        Some(details) => details,
        None => {
            fetched = proxy
                .issue_details(credentials, issue_key)
                .await
                .map_err(|error| TestCaseFlowError::DetailsFetch {
                    issue_key: issue_key.to_owned(),
                    message: error.user_message(),
                })?;
            &fetched
        }
    };

    let request = TestCaseRequest::from_details(details);
    let test_case = generator.generate(&request).await.map_err(|error| {
        TestCaseFlowError::Generation {
            issue_key: issue_key.to_owned(),
            message: error.user_message(),
        }
    })?;

    info!(
        issue_key,
        steps = test_case.steps.len(),
        "generated test case"
    );
    Ok(test_case)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::issue::{Description, IssueDetails, NO_DESCRIPTION_FALLBACK};
    use crate::jira::JiraCredentials;
    use crate::jira::client::ProxyClient;

    use super::{
        GeneratedTestCase, GeneratorClient, GeneratorClientError, TestCaseRequest,
        generate_for_issue,
    };

    fn details_fixture() -> IssueDetails {
        IssueDetails {
            id: "10001".to_owned(),
            key: "ABC-1".to_owned(),
            summary: "Login flow".to_owned(),
            issue_type: "Story".to_owned(),
            status: "Open".to_owned(),
            priority: Some("High".to_owned()),
            description: Description::PlainText("User can log in".to_owned()),
            labels: vec!["auth".to_owned()],
            ..IssueDetails::default()
        }
    }

    fn credentials_fixture() -> JiraCredentials {
        JiraCredentials {
            username: "dev@example.com".to_owned(),
            api_token: "token".to_owned(),
            base_url: "https://example.atlassian.net".to_owned(),
            project_id: "ABC".to_owned(),
            central_jira_id: "ABC-1".to_owned(),
        }
    }

    #[test]
    fn request_normalizes_the_description_to_plain_text() {
        let mut details = details_fixture();
        details.description = Description::Missing;

        let request = TestCaseRequest::from_details(&details);
        assert_eq!(request.issue_key, "ABC-1");
        assert_eq!(request.description, NO_DESCRIPTION_FALLBACK);
        assert_eq!(request.labels, vec!["auth".to_owned()]);
    }

    #[test]
    fn generated_test_case_defaults_type_and_priority() {
        let test_case: GeneratedTestCase = serde_json::from_value(json!({
            "summary": "Test login",
            "steps": [{ "step": "open page", "expected": "page shown" }]
        }))
        .expect("sparse test case should deserialize");

        assert_eq!(test_case.test_type, "Manual");
        assert_eq!(test_case.priority, "Medium");
        assert_eq!(test_case.steps[0].data, "");
    }

    #[tokio::test]
    async fn generate_returns_the_parsed_test_case() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate-test-case"))
            .and(body_partial_json(json!({ "issue_key": "ABC-1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "summary": "Test login",
                "description": "covers the happy path",
                "precondition": "account exists",
                "type": "Manual",
                "priority": "High",
                "steps": [
                    { "step": "open login page", "expected": "form shown", "data": "" },
                    { "step": "submit credentials", "expected": "dashboard shown", "data": "user/pass" }
                ]
            })))
            .mount(&server)
            .await;

        let client = GeneratorClient::new(server.uri(), 5_000);
        let request = TestCaseRequest::from_details(&details_fixture());
        let test_case = client
            .generate(&request)
            .await
            .expect("generation should succeed");

        assert_eq!(test_case.summary, "Test login");
        assert_eq!(test_case.steps.len(), 2);
        assert_eq!(test_case.priority, "High");
    }

    #[tokio::test]
    async fn generate_rejects_a_test_case_without_steps() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate-test-case"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "summary": "Test login",
                "steps": []
            })))
            .mount(&server)
            .await;

        let client = GeneratorClient::new(server.uri(), 5_000);
        let request = TestCaseRequest::from_details(&details_fixture());
        let error = client
            .generate(&request)
            .await
            .expect_err("empty steps should be rejected");

        assert!(matches!(
            error,
            GeneratorClientError::MissingField { field: "steps" }
        ));
        assert!(error.user_message().contains("steps"));
    }

    #[tokio::test]
    async fn flow_surfaces_a_details_fetch_failure_without_a_test_case() {
        let proxy_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/jira/issue-details"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(json!({ "detail": "Error connecting to JIRA" })),
            )
            .mount(&proxy_server)
            .await;

        let proxy = ProxyClient::new(proxy_server.uri(), 5_000);
        let generator = GeneratorClient::new("http://127.0.0.1:9", 100);

        let result = generate_for_issue(
            &proxy,
            &generator,
            &credentials_fixture(),
            "ABC-1",
            None,
        )
        .await;

        let generated: Option<GeneratedTestCase> = result.as_ref().ok().cloned();
        let error = result.expect_err("flow should fail when details cannot be fetched");
        assert!(!error.user_message().is_empty());
        assert!(error.user_message().contains("ABC-1"));
        assert!(generated.is_none());
    }

    #[tokio::test]
    async fn flow_reuses_cached_details_without_calling_the_proxy() {
        let generator_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate-test-case"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "summary": "Test login",
                "steps": [{ "step": "s", "expected": "e", "data": "" }]
            })))
            .mount(&generator_server)
            .await;

        // Unreachable proxy: the flow must not need it when details are cached.
        let proxy = ProxyClient::new("http://127.0.0.1:9", 100);
        let generator = GeneratorClient::new(generator_server.uri(), 5_000);
        let details = details_fixture();

        let test_case = generate_for_issue(
            &proxy,
            &generator,
            &credentials_fixture(),
            "ABC-1",
            Some(&details),
        )
        .await
        .expect("cached details should be enough");

        assert_eq!(test_case.steps.len(), 1);
    }
}
