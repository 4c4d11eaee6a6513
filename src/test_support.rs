use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_path(prefix: &str) -> PathBuf {
    let now_ns = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!(
        "jirascope_{prefix}_{}_{}",
        std::process::id(),
        now_ns
    ))
}

pub fn remove_dir_if_exists(path: &Path) {
    let _ = std::fs::remove_dir_all(path);
}

pub fn remove_file_if_exists(path: &Path) {
    let _ = std::fs::remove_file(path);
}

pub fn apply_proxy_test_env(
    command: &mut Command,
    log_dir: &Path,
    proxy_base_url: &str,
    generator_base_url: &str,
) {
    command.env("PROXY_BASE_URL", proxy_base_url);
    command.env("GENERATOR_BASE_URL", generator_base_url);
    command.env("HTTP_TIMEOUT_MS", "2000");
    command.env("JIRA_USERNAME", "ci@example.com");
    command.env("JIRA_API_TOKEN", "ci-token");
    command.env("JIRA_BASE_URL", "https://example.atlassian.net");
    command.env("JIRA_PROJECT_ID", "ABC");
    command.env("RUST_LOG", "error");
    command.env("JIRASCOPE_FILE_LOG", "error");
    command.env("JIRASCOPE_LOG_DIR", log_dir.as_os_str());
    command.env_remove("JIRASCOPE_SESSION_FILE");
}
