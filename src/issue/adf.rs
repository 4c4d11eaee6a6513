use serde_json::Value;

const TABLE_PLACEHOLDER: &str = "[Table content not displayed in plain text]\n";

/// Converts an Atlassian Document Format value to plain text. Unknown node
/// types degrade to their text content or nothing; the converter never fails.
pub fn document_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(nodes) => process_nodes(nodes),
        Value::Object(map) => match map.get("content").and_then(Value::as_array) {
            Some(nodes) => process_nodes(nodes),
            None => map
                .get("text")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .unwrap_or_default(),
        },
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn process_nodes(nodes: &[Value]) -> String {
    nodes.iter().map(process_node).collect()
}

fn process_node(node: &Value) -> String {
    if let Value::String(text) = node {
        return text.clone();
    }

    let node_type = node.get("type").and_then(Value::as_str).unwrap_or_default();
    let content = node.get("content").and_then(Value::as_array);

    match node_type {
        "text" => node
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned(),
        "bulletList" => list_items(content, |_| "\u{2022} ".to_owned()),
        "orderedList" => list_items(content, |index| format!("{}. ", index + 1)),
        "codeBlock" => {
            let language = node
                .pointer("/attrs/language")
                .and_then(Value::as_str)
                .unwrap_or_default();
            format!(
                "```{language}\n{}\n```\n",
                content.map(|nodes| process_nodes(nodes)).unwrap_or_default()
            )
        }
        "blockquote" => format!(
            "> {}\n",
            content.map(|nodes| process_nodes(nodes)).unwrap_or_default()
        ),
        "table" => TABLE_PLACEHOLDER.to_owned(),
        "link" => {
            let text = content.map(|nodes| process_nodes(nodes)).unwrap_or_default();
            let url = node
                .pointer("/attrs/href")
                .and_then(Value::as_str)
                .unwrap_or_default();
            format!("{text} ({url})")
        }
        "mention" => format!(
            "@{}",
            node.pointer("/attrs/text")
                .and_then(Value::as_str)
                .unwrap_or("[mentioned user]")
        ),
        _ if node_type.starts_with("heading") => {
            let level = node
                .pointer("/attrs/level")
                .and_then(Value::as_u64)
                .unwrap_or(1)
                .clamp(1, 6) as usize;
            format!(
                "{} {}\n\n",
                "#".repeat(level),
                content.map(|nodes| process_nodes(nodes)).unwrap_or_default()
            )
        }
        // Paragraphs and any other block node with children.
        _ => match content {
            Some(nodes) => format!("{}\n", process_nodes(nodes)),
            None => node
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
        },
    }
}

fn list_items(content: Option<&Vec<Value>>, prefix: impl Fn(usize) -> String) -> String {
    let Some(items) = content else {
        return String::new();
    };
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            match item.get("content").and_then(Value::as_array) {
                Some(nodes) => format!("{}{}", prefix(index), process_nodes(nodes)),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
