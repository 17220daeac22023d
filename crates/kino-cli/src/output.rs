//! Output formatting for CLI

use console::style;
use serde::Serialize;
use serde_json::Value;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Text,
        }
    }
}

/// One line of a script run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Entry {
    Command {
        line: usize,
        command: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Event {
        name: String,
        args: Vec<Value>,
    },
    Watch {
        property: String,
        new: Value,
        old: Value,
    },
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("{s:?}"),
        other => other.to_string(),
    }
}

impl Entry {
    fn to_text(&self) -> String {
        match self {
            Entry::Command { line, command, result, error } => {
                let outcome = match (result, error) {
                    (_, Some(error)) => style(format!("error: {error}")).red().to_string(),
                    (Some(value), None) => render_value(value),
                    (None, None) => "ok".to_string(),
                };
                format!("{:>4}  {:<32} => {}", line, style(command).bold(), outcome)
            }
            Entry::Event { name, args } => {
                let args: Vec<String> = args.iter().map(render_value).collect();
                style(format!("      ! {name} [{}]", args.join(", "))).cyan().to_string()
            }
            Entry::Watch { property, new, old } => style(format!(
                "      ~ {property}: {} -> {}",
                render_value(old),
                render_value(new)
            ))
            .yellow()
            .to_string(),
        }
    }
}

/// Render a transcript
pub fn format_transcript(entries: &[Entry], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => entries
            .iter()
            .map(|entry| serde_json::to_string(entry).unwrap_or_else(|_| "{}".to_string()))
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Text => entries
            .iter()
            .map(Entry::to_text)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Render rows as a table or a JSON array
pub fn format_rows<T: Serialize + Tabled>(rows: &[T], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Text => Table::new(rows).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_transcript() {
        let entries = vec![
            Entry::Command {
                line: 1,
                command: "attr video src".into(),
                result: Some(Value::Null),
                error: None,
            },
            Entry::Watch {
                property: "isFullscreen".into(),
                new: json!(true),
                old: json!(false),
            },
        ];

        let out = format_transcript(&entries, OutputFormat::Json);
        let lines: Vec<Value> = out.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines[0]["kind"], "command");
        assert_eq!(lines[0]["result"], Value::Null);
        assert!(lines[0].get("error").is_none());
        assert_eq!(lines[1]["property"], "isFullscreen");
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from("table"), OutputFormat::Text);
    }
}
