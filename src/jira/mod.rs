use std::fmt::{Debug, Formatter};

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

pub mod client;

/// Connection parameters for the JIRA proxy. `central_jira_id` is only
/// required for central-issue visualization; the project variant ignores it.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JiraCredentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub central_jira_id: String,
}

impl Debug for JiraCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraCredentials")
            .field("username", &self.username)
            .field("api_token", &"[MASKED]")
            .field("base_url", &self.base_url)
            .field("project_id", &self.project_id)
            .field("central_jira_id", &self.central_jira_id)
            .finish()
    }
}

impl JiraCredentials {
    /// Trims whitespace everywhere and the trailing slash off the base URL.
    pub fn normalized(&self) -> Self {
        Self {
            username: self.username.trim().to_owned(),
            api_token: self.api_token.trim().to_owned(),
            base_url: self.base_url.trim().trim_end_matches('/').to_owned(),
            project_id: self.project_id.trim().to_owned(),
            central_jira_id: self.central_jira_id.trim().to_owned(),
        }
    }

    pub fn validate(&self, require_central_issue: bool) -> Result<()> {
        ensure!(!self.username.is_empty(), "Please fill in the username");
        ensure!(!self.api_token.is_empty(), "Please fill in the api token");
        ensure!(!self.base_url.is_empty(), "Please fill in the base url");
        ensure!(
            self.base_url.starts_with("http://") || self.base_url.starts_with("https://"),
            "Base URL must start with http:// or https://"
        );
        if require_central_issue {
            ensure!(
                !self.central_jira_id.is_empty(),
                "Please fill in the central jira id"
            );
        }
        Ok(())
    }

    /// Fills empty fields from the proxy's default credentials, keeping any
    /// value the user already provided (the central issue id is always the
    /// user's own input).
    pub fn merge_defaults(&mut self, defaults: &JiraCredentials) {
        if self.username.is_empty() {
            self.username = defaults.username.clone();
        }
        if self.api_token.is_empty() {
            self.api_token = defaults.api_token.clone();
        }
        if self.base_url.is_empty() {
            self.base_url = defaults.base_url.clone();
        }
        if self.project_id.is_empty() {
            self.project_id = defaults.project_id.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueDetailsRequest {
    pub username: String,
    pub api_token: String,
    pub base_url: String,
    pub project_id: String,
    pub issue_key: String,
}

impl IssueDetailsRequest {
    pub fn new(credentials: &JiraCredentials, issue_key: impl Into<String>) -> Self {
        Self {
            username: credentials.username.clone(),
            api_token: credentials.api_token.clone(),
            base_url: credentials.base_url.clone(),
            project_id: credentials.project_id.clone(),
            issue_key: issue_key.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ConnectionTestResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}
