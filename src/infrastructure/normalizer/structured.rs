//! Flattening of structured payloads (products, ERP records, emails)

use std::collections::HashMap;

/// Flatten a product record into labelled text lines
pub fn product_to_text(
    name: &str,
    description: &str,
    attributes: &HashMap<String, String>,
) -> String {
    let mut lines = Vec::new();

    if !name.trim().is_empty() {
        lines.push(format!("Product: {}", name.trim()));
    }

    if !description.trim().is_empty() {
        lines.push(description.trim().to_string());
    }

    let mut keys: Vec<&String> = attributes.keys().collect();
    keys.sort();

    for key in keys {
        let value = &attributes[key];
        if !value.trim().is_empty() {
            lines.push(format!("{}: {}", key, value.trim()));
        }
    }

    lines.join("\n")
}

/// Flatten an ERP record's fields into labelled text lines
///
/// Keys are sorted so the same record always flattens to the same text,
/// keeping re-ingestion idempotent.
pub fn erp_record_to_text(entity: &str, fields: &HashMap<String, serde_json::Value>) -> String {
    let mut lines = Vec::new();

    if !entity.trim().is_empty() {
        lines.push(format!("Record type: {}", entity.trim()));
    }

    let mut keys: Vec<&String> = fields.keys().collect();
    keys.sort();

    for key in keys {
        if let Some(rendered) = render_value(&fields[key]) {
            lines.push(format!("{}: {}", key, rendered));
        }
    }

    lines.join("\n")
}

/// Flatten an archived email into subject/sender header lines plus the body
pub fn email_to_text(subject: &str, from: &str, body: &str) -> String {
    let mut lines = Vec::new();

    if !subject.trim().is_empty() {
        lines.push(format!("Subject: {}", subject.trim()));
    }

    if !from.trim().is_empty() {
        lines.push(format!("From: {}", from.trim()));
    }

    let mut text = lines.join("\n");

    if !body.trim().is_empty() {
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        text.push_str(body.trim());
    }

    text
}

fn render_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Array(items) => {
            let rendered: Vec<String> = items.iter().filter_map(render_value).collect();
            if rendered.is_empty() {
                None
            } else {
                Some(rendered.join(", "))
            }
        }
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let rendered: Vec<String> = keys
                .into_iter()
                .filter_map(|k| render_value(&map[k]).map(|v| format!("{} {}", k, v)))
                .collect();
            if rendered.is_empty() {
                None
            } else {
                Some(rendered.join(", "))
            }
        }
    }
}
