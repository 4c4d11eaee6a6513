use crate::graph::{CoverageMetrics, IssueGraph, IssueStats};
use crate::issue::IssueDetails;
use crate::jira::JiraCredentials;
use crate::testcase::GeneratedTestCase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualizeTarget {
    CentralIssue,
    Project,
}

/// Work the UI hands to the runtime worker.
#[derive(Debug, Clone, PartialEq)]
pub enum StudioCommand {
    TestConnection {
        credentials: JiraCredentials,
    },
    LoadGraph {
        credentials: JiraCredentials,
        target: VisualizeTarget,
    },
    LoadIssueDetails {
        credentials: JiraCredentials,
        issue_key: String,
        generation: u64,
    },
    GenerateTestCase {
        credentials: JiraCredentials,
        issue_key: String,
        cached_details: Option<Box<IssueDetails>>,
    },
    Shutdown,
}

/// Results flowing back to the UI. Detail events carry the generation token
/// of the fetch they answer so superseded responses can be discarded.
#[derive(Debug, Clone, PartialEq)]
pub enum StudioEvent {
    ConnectionTested {
        message: String,
    },
    ConnectionFailed {
        error: String,
    },
    GraphLoaded {
        graph: IssueGraph,
        stats: IssueStats,
        coverage: CoverageMetrics,
    },
    GraphFailed {
        error: String,
    },
    DetailsLoaded {
        issue_key: String,
        generation: u64,
        details: Box<IssueDetails>,
    },
    DetailsFailed {
        issue_key: String,
        generation: u64,
        error: String,
    },
    TestCaseReady {
        issue_key: String,
        test_case: Box<GeneratedTestCase>,
    },
    TestCaseFailed {
        issue_key: String,
        error: String,
    },
}

#[cfg(test)]
mod tests {
    use crate::issue::IssueDetails;

    use super::{StudioEvent, VisualizeTarget};

    #[test]
    fn detail_events_carry_their_generation_token() {
        let event = StudioEvent::DetailsLoaded {
            issue_key: "ABC-1".to_owned(),
            generation: 7,
            details: Box::new(IssueDetails::default()),
        };

        match event {
            StudioEvent::DetailsLoaded { generation, issue_key, .. } => {
                assert_eq!(generation, 7);
                assert_eq!(issue_key, "ABC-1");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn visualize_targets_are_distinct() {
        assert_ne!(VisualizeTarget::CentralIssue, VisualizeTarget::Project);
    }
}
