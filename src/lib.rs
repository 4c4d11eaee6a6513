pub mod config;
pub mod export;
pub mod graph;
pub mod issue;
pub mod jira;
pub mod server;
pub mod session;
pub mod studio;
#[doc(hidden)]
pub mod test_support;
pub mod testcase;
