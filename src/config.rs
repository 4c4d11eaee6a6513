use std::env;

use anyhow::{Context, Result, ensure};

use crate::jira::JiraCredentials;

pub const DEFAULT_PROXY_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_GENERATOR_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;

/// Fallback project id for whole-project visualization when the form and the
/// environment both leave it empty.
pub const DEFAULT_PROJECT_ID: &str = "SCRUM";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSettings {
    pub proxy_base_url: String,
    pub generator_base_url: String,
    pub http_timeout_ms: u64,
    pub session_file: Option<String>,
}

impl AppSettings {
    pub fn from_env() -> Result<Self> {
        // Load .env if present, but do not fail if file does not exist.
        let _ = dotenvy::dotenv();

        let proxy_base_url =
            env::var("PROXY_BASE_URL").unwrap_or_else(|_| DEFAULT_PROXY_BASE_URL.to_owned());
        ensure!(
            !proxy_base_url.trim().is_empty(),
            "PROXY_BASE_URL cannot be empty"
        );

        let generator_base_url = env::var("GENERATOR_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_GENERATOR_BASE_URL.to_owned());
        ensure!(
            !generator_base_url.trim().is_empty(),
            "GENERATOR_BASE_URL cannot be empty"
        );

        let http_timeout_ms = parse_u64_env("HTTP_TIMEOUT_MS", DEFAULT_HTTP_TIMEOUT_MS)?;
        ensure!(
            http_timeout_ms > 0,
            "HTTP_TIMEOUT_MS must be greater than 0"
        );

        let session_file = read_optional_env("JIRASCOPE_SESSION_FILE");

        Ok(Self {
            proxy_base_url,
            generator_base_url,
            http_timeout_ms,
            session_file,
        })
    }
}

/// Credentials seeded from the environment. Fields the environment does not
/// provide stay empty and can be merged from the proxy's default-credentials
/// endpoint or filled in through the studio form.
pub fn credentials_from_env() -> JiraCredentials {
    JiraCredentials {
        username: read_optional_env("JIRA_USERNAME").unwrap_or_default(),
        api_token: read_optional_env("JIRA_API_TOKEN").unwrap_or_default(),
        base_url: read_optional_env("JIRA_BASE_URL").unwrap_or_default(),
        project_id: read_optional_env("JIRA_PROJECT_ID").unwrap_or_default(),
        central_jira_id: String::new(),
    }
}

fn read_optional_env(name: &str) -> Option<String> {
    env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_owned())
        }
    })
}

fn parse_u64_env(name: &str, default: u64) -> Result<u64> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("failed to parse {name} as u64")),
        Err(_) => Ok(default),
    }
}
