use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

pub mod adf;

pub const NO_DESCRIPTION_FALLBACK: &str = "No description available";

/// Shape of the `description` field as JIRA actually returns it: a plain
/// string, an Atlassian Document Format document, or nothing at all.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Description {
    PlainText(String),
    Document(serde_json::Value),
    #[default]
    Missing,
}

impl Description {
    /// Converts whatever shape the upstream provided into display text.
    /// Missing or empty content yields the standard fallback line so every
    /// consumer (CLI, sidebar, generator payload) agrees on it.
    pub fn to_plain_text(&self) -> String {
        let text = match self {
            Self::PlainText(text) => {
                // Some JIRA instances hand ADF back as a JSON-encoded string.
                let trimmed = text.trim();
                if trimmed.starts_with('{') || trimmed.starts_with('[') {
                    match serde_json::from_str::<serde_json::Value>(trimmed) {
                        Ok(value) => adf::document_to_text(&value),
                        Err(_) => trimmed.to_owned(),
                    }
                } else {
                    trimmed.to_owned()
                }
            }
            Self::Document(value) => adf::document_to_text(value),
            Self::Missing => String::new(),
        };

        let text = text.trim().to_owned();
        if text.is_empty() {
            NO_DESCRIPTION_FALLBACK.to_owned()
        } else {
            text
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

impl Serialize for Description {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::PlainText(text) => serializer.serialize_str(text),
            Self::Document(value) => value.serialize(serializer),
            Self::Missing => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Description {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match value {
            None | Some(serde_json::Value::Null) => Self::Missing,
            Some(serde_json::Value::String(text)) => Self::PlainText(text),
            Some(other) => Self::Document(other),
        })
    }
}

/// Full per-issue record from the proxy's issue-details endpoint. Fetched
/// lazily on selection; no lifecycle beyond the current selection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IssueDetails {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: Description,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub issue_type: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub reporter: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub comments: Vec<IssueComment>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IssueComment {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub body: Description,
    #[serde(default)]
    pub created: Option<String>,
}

impl IssueDetails {
    /// Flat text block for terminal display and prompt-style consumers.
    pub fn to_display_text(&self) -> String {
        let mut text = format!(
            "JIRA ISSUE: {}\nTITLE: {}\nTYPE: {}\nSTATUS: {}\nPRIORITY: {}\nASSIGNEE: {}\nREPORTER: {}\nCREATED: {}\nUPDATED: {}\n\nDESCRIPTION:\n{}\n",
            self.key,
            self.summary,
            self.issue_type,
            self.status,
            self.priority.as_deref().unwrap_or("Not specified"),
            self.assignee.as_deref().unwrap_or("Unassigned"),
            self.reporter.as_deref().unwrap_or("Unknown"),
            self.created.as_deref().unwrap_or("Unknown"),
            self.updated.as_deref().unwrap_or("Unknown"),
            self.description.to_plain_text(),
        );

        if !self.comments.is_empty() {
            text.push_str("\nCOMMENTS:\n");
            for (index, comment) in self.comments.iter().enumerate() {
                text.push_str(&format!(
                    "\nCOMMENT #{}:\nAuthor: {}\nDate: {}\n{}\n---\n",
                    index + 1,
                    comment.author,
                    comment.created.as_deref().unwrap_or("Unknown"),
                    comment.body.to_plain_text(),
                ));
            }
        }

        text
    }
}
