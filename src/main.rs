use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use jirascope::config::{AppSettings, credentials_from_env};
use jirascope::export;
use jirascope::graph::layout::{LayoutDirection, layout_nodes};
use jirascope::graph::{CoverageMetrics, IssueGraph, IssueStats};
use jirascope::jira::JiraCredentials;
use jirascope::jira::client::ProxyClient;
use jirascope::server::run_http_server;
use jirascope::session::{FileSessionStore, MemorySessionStore, SessionStore};
use jirascope::studio::run_studio;
use jirascope::testcase::{GeneratorClient, generate_for_issue};

#[derive(Debug, Parser)]
#[command(
    name = "jirascope",
    about = "JIRA relationship explorer and Xray test case generator"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check the JIRA connection with the configured credentials.
    TestConnection,
    /// Fetch a relationship graph and print its layout and statistics.
    Visualize {
        /// Central issue key, e.g. ABC-123.
        #[arg(long, conflicts_with = "project")]
        issue: Option<String>,
        /// Visualize the whole project instead of a central issue.
        #[arg(long)]
        project: bool,
        /// Layout direction: TB or LR.
        #[arg(long, default_value = "TB")]
        direction: String,
        /// Also write the issue list as CSV to this path.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Print full details for one issue.
    Details { issue_key: String },
    /// Generate an Xray-style test case for one issue.
    GenerateTestCase {
        issue_key: String,
        /// Also write the test case as CSV to this path.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Run the HTTP facade.
    Serve {
        #[arg(long, default_value = "127.0.0.1:7878")]
        bind: String,
    },
    /// Open the native studio shell.
    Studio,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = init_tracing()?;

    let cli = Cli::parse();
    let settings = AppSettings::from_env().context("failed to load configuration")?;
    let proxy = ProxyClient::new(settings.proxy_base_url.clone(), settings.http_timeout_ms);

    match cli.command {
        Commands::TestConnection => {
            let credentials = resolve_credentials(&proxy, None).await;
            let response = proxy
                .test_connection(&credentials)
                .await
                .map_err(|error| anyhow::anyhow!(error.user_message()))?;
            if response.message.is_empty() {
                println!("Successfully connected to JIRA!");
            } else {
                println!("{}", response.message);
            }
        }
        Commands::Visualize {
            issue,
            project,
            direction,
            csv,
        } => {
            let direction: LayoutDirection = direction.parse()?;
            let credentials = resolve_credentials(&proxy, issue.as_deref()).await;
            let payload = if project {
                proxy.visualize_project(&credentials).await
            } else {
                proxy.visualize(&credentials).await
            }
            .map_err(|error| anyhow::anyhow!(error.user_message()))?;

            let graph = IssueGraph::from_payload(payload);
            let nodes = layout_nodes(&graph.nodes, &graph.edges, direction);
            print_graph(&nodes, &graph);

            if let Some(path) = csv {
                export::write_csv(&path, &export::issues_csv(&nodes))?;
                println!("Issue list written to {}", path.display());
            }
        }
        Commands::Details { issue_key } => {
            let credentials = resolve_credentials(&proxy, None).await;
            let details = proxy
                .issue_details(&credentials, &issue_key)
                .await
                .map_err(|error| anyhow::anyhow!(error.user_message()))?;
            println!("{}", details.to_display_text());
        }
        Commands::GenerateTestCase { issue_key, csv } => {
            let generator = GeneratorClient::new(
                settings.generator_base_url.clone(),
                settings.http_timeout_ms,
            );
            let credentials = resolve_credentials(&proxy, None).await;
            let test_case =
                generate_for_issue(&proxy, &generator, &credentials, &issue_key, None)
                    .await
                    .map_err(|error| anyhow::anyhow!(error.user_message()))?;

            println!("Summary: {}", test_case.summary);
            println!("Type: {} | Priority: {}", test_case.test_type, test_case.priority);
            if !test_case.precondition.is_empty() {
                println!("Precondition: {}", test_case.precondition);
            }
            if !test_case.description.is_empty() {
                println!("Description: {}", test_case.description);
            }
            for (index, step) in test_case.steps.iter().enumerate() {
                println!("Step {}: {}", index + 1, step.step);
                if !step.data.is_empty() {
                    println!("  Data: {}", step.data);
                }
                println!("  Expected: {}", step.expected);
            }

            if let Some(path) = csv {
                export::write_csv(&path, &export::test_case_csv(&test_case))?;
                println!("Test case written to {}", path.display());
            }
        }
        Commands::Serve { bind } => run_http_server(&settings, &bind).await?,
        Commands::Studio => {
            let store: Arc<dyn SessionStore> = match &settings.session_file {
                Some(path) => Arc::new(FileSessionStore::open(path)),
                None => Arc::new(MemorySessionStore::default()),
            };
            run_studio(&settings, store)?;
        }
    }

    Ok(())
}

/// Credentials for one-shot CLI commands: environment values first, gaps
/// filled from the proxy's default-credentials endpoint when it is reachable.
async fn resolve_credentials(proxy: &ProxyClient, central_issue: Option<&str>) -> JiraCredentials {
    let mut credentials = credentials_from_env();
    if let Some(issue) = central_issue {
        credentials.central_jira_id = issue.trim().to_owned();
    }

    if credentials.username.is_empty()
        || credentials.api_token.is_empty()
        || credentials.base_url.is_empty()
    {
        match proxy.default_credentials().await {
            Ok(defaults) => credentials.merge_defaults(&defaults),
            Err(error) => debug!(%error, "default credentials unavailable; using environment only"),
        }
    }

    credentials
}

fn print_graph(nodes: &[jirascope::graph::IssueNode], graph: &IssueGraph) {
    let stats = IssueStats::collect(nodes);
    let coverage = CoverageMetrics::compute(&stats, &graph.edges);

    println!(
        "Graph: {} issues, {} relationships",
        stats.total, coverage.total_relationships
    );
    for node in nodes {
        println!(
            "  {:<12} [{}] {} ({:.0}, {:.0})",
            node.data.key,
            node.kind.as_str(),
            node.data.summary,
            node.position.x,
            node.position.y
        );
    }
    println!(
        "Requirements: {} | Tests: {} | Defects: {} | Other: {}",
        stats.requirements, stats.tests, stats.defects, stats.other
    );
    match coverage.test_coverage_ratio {
        Some(ratio) => println!("Test coverage ratio: {ratio:.1}%"),
        None => println!("Test coverage ratio: N/A"),
    }
    match coverage.defect_rate {
        Some(rate) => println!("Defect rate: {rate:.1}%"),
        None => println!("Defect rate: N/A"),
    }
}

fn init_tracing() -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,jirascope=debug"));
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_filter(env_filter);
    let registry = tracing_subscriber::registry().with(console_layer);

    let log_dir = std::env::var("JIRASCOPE_LOG_DIR")
        .ok()
        .map(|dir| dir.trim().to_owned())
        .filter(|dir| !dir.is_empty());

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "jirascope.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_filter = EnvFilter::new(
                std::env::var("JIRASCOPE_FILE_LOG").unwrap_or_else(|_| "info".to_owned()),
            );
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(file_filter);
            registry.with(file_layer).try_init().map_err(|error| {
                anyhow::anyhow!("failed to initialize tracing subscriber: {error}")
            })?;
            Ok(Some(guard))
        }
        None => {
            registry.try_init().map_err(|error| {
                anyhow::anyhow!("failed to initialize tracing subscriber: {error}")
            })?;
            Ok(None)
        }
    }
}
