use std::path::Path;

use anyhow::{Context, Result};

use crate::graph::IssueNode;
use crate::testcase::GeneratedTestCase;

const ISSUES_HEADER: [&str; 5] = ["Key", "Summary", "Issue Type", "Status", "Priority"];
const STEPS_HEADER: [&str; 4] = ["Step #", "Action", "Test Data", "Expected Result"];

/// Flat issue-list export, one row per node in display order.
pub fn issues_csv(nodes: &[IssueNode]) -> String {
    let mut lines = vec![csv_row(&ISSUES_HEADER)];
    for node in nodes {
        lines.push(csv_row(&[
            node.data.key.as_str(),
            node.data.summary.as_str(),
            node.data.issue_type.as_str(),
            node.data.status.as_str(),
            node.data.priority.as_deref().unwrap_or(""),
        ]));
    }
    lines.join("\n")
}

/// Single-test-case export: the test-level fields followed by one row per
/// step.
pub fn test_case_csv(test_case: &GeneratedTestCase) -> String {
    let mut lines = vec![
        csv_row(&["Summary", "Description", "Precondition", "Type", "Priority"]),
        csv_row(&[
            test_case.summary.as_str(),
            test_case.description.as_str(),
            test_case.precondition.as_str(),
            test_case.test_type.as_str(),
            test_case.priority.as_str(),
        ]),
        String::new(),
        csv_row(&STEPS_HEADER),
    ];
    for (index, step) in test_case.steps.iter().enumerate() {
        let number = (index + 1).to_string();
        lines.push(csv_row(&[
            number.as_str(),
            step.step.as_str(),
            step.data.as_str(),
            step.expected.as_str(),
        ]));
    }
    lines.join("\n")
}

pub fn write_csv(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("failed to write CSV to `{}`", path.display()))
}

fn csv_row(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|field| csv_field(field))
        .collect::<Vec<_>>()
        .join(",")
}

/// Quotes a field only when it needs it, doubling embedded quotes.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}
