//! Terminal output
//!
//! Table rendering for every resource listing, plus the typed path lookup
//! the column specs use.

use crate::operation::{Operation, OperationState};
use crate::pagination::Page;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use serde_json::Value;

/// Placeholder for missing values
pub const DEFAULT_VALUE: &str = "N.A.";

/// Something a column can read a dotted path from
#[derive(Debug, Clone, Copy)]
pub enum Record<'a> {
    /// Raw JSON object from a list response
    Map(&'a Value),
    /// Deserialized operation
    Operation(&'a Operation),
}

impl<'a> Record<'a> {
    /// Resolve `a.b.0.c`; numeric segments index arrays
    pub fn get(&self, path: &str) -> Option<Value> {
        match self {
            Self::Map(value) => lookup(value, path).cloned(),
            Self::Operation(op) => match path {
                "name" => Some(Value::String(op.name.clone())),
                "done" => Some(Value::Bool(op.done)),
                OPERATION_IDS => Some(Value::String(op.name.split('/').skip(4).collect::<Vec<_>>().join("\n"))),
                OPERATION_TYPE => op.kind().map(Value::String),
                OPERATION_STATUS => Some(Value::String(operation_status(op))),
                OPERATION_RESULT => Some(Value::String(operation_result(op))),
                _ => {
                    let value = serde_json::to_value(op).ok()?;
                    lookup(&value, path).cloned()
                }
            },
        }
    }
}

/// Derived operation fields: resource path below the location, one segment per line
pub const OPERATION_IDS: &str = "@ids";
/// Derived operation fields: metadata type without the `OperationMetadata` suffix
pub const OPERATION_TYPE: &str = "@type";
/// Derived operation fields: state plus create/update times
pub const OPERATION_STATUS: &str = "@status";
/// Derived operation fields: error code and message of a failed operation
pub const OPERATION_RESULT: &str = "@result";

fn operation_status(op: &Operation) -> String {
    let (created, updated) = op.times();
    let status = match op.state() {
        OperationState::Running => "running",
        OperationState::Succeeded => "success",
        OperationState::Failed { .. } => "error",
    };
    format!(
        "{}\ncreate: {}\nupdate: {}",
        status,
        created.map(format_timestamp).unwrap_or_else(|| DEFAULT_VALUE.to_string()),
        updated.map(format_timestamp).unwrap_or_else(|| DEFAULT_VALUE.to_string()),
    )
}

fn operation_result(op: &Operation) -> String {
    match op.state() {
        OperationState::Failed { code, message } => format!("code:{}\nmessage:{}", code, message),
        _ => String::new(),
    }
}

/// Borrowing dotted-path lookup over JSON
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }

    let mut current = value;
    for part in path.split('.') {
        current = match current {
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            Value::Object(map) => map.get(part)?,
            _ => return None,
        };
    }
    Some(current)
}

/// How a looked-up value becomes cell text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Plain,
    /// Keep what follows the last `/` (resource ID from a resource name)
    AfterLastSlash,
    /// Same as `AfterLastSlash` for each element of an array, one per line
    AfterLastSlashMulti,
    /// RFC3339 timestamp shortened to `YYYY-MM-DD HH:MM:SS`
    Timestamp,
}

#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub header: &'static str,
    pub path: &'static str,
    pub transform: Transform,
    pub highlight: bool,
}

impl ColumnSpec {
    pub const fn new(header: &'static str, path: &'static str) -> Self {
        Self {
            header,
            path,
            transform: Transform::Plain,
            highlight: false,
        }
    }

    pub const fn transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub const fn highlight(mut self) -> Self {
        self.highlight = true;
        self
    }

    pub fn cell_text(&self, record: &Record<'_>) -> String {
        let Some(value) = record.get(self.path) else {
            return DEFAULT_VALUE.to_string();
        };

        let text = match self.transform {
            Transform::Plain => scalar_text(&value),
            Transform::AfterLastSlash => value.as_str().map(after_last_slash).map(str::to_string),
            Transform::AfterLastSlashMulti => value.as_array().map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(after_last_slash)
                    .collect::<Vec<_>>()
                    .join("\n")
            }),
            Transform::Timestamp => value.as_str().map(format_timestamp),
        };

        text.filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_VALUE.to_string())
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => None,
        Value::Array(arr) => Some(format!("[{} items]", arr.len())),
        Value::Object(_) => Some("[object]".to_string()),
    }
}

pub fn after_last_slash(value: &str) -> &str {
    value.rsplit('/').next().unwrap_or(value)
}

/// Shorten an RFC3339 timestamp; anything unparsable is returned untouched
pub fn format_timestamp(timestamp: &str) -> String {
    match chrono::DateTime::parse_from_rfc3339(timestamp) {
        Ok(dt) => dt
            .with_timezone(&chrono::Utc)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        Err(_) => timestamp.to_string(),
    }
}

/// Base URL followed by the sorted query parameters, one per line
pub fn format_url(raw: &str) -> String {
    let Ok(parsed) = url::Url::parse(raw) else {
        return raw.to_string();
    };

    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.sort();

    let mut base = parsed.clone();
    base.set_query(None);
    let mut out = base.to_string();
    for (i, (k, v)) in pairs.iter().enumerate() {
        let separator = if i == 0 { '?' } else { '&' };
        out.push('\n');
        out.push(separator);
        out.push_str(&format!("{}={}", k, v));
    }
    out
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().copied());
    table
}

/// Generic table over a list of records
pub fn render_records(records: &[Record<'_>], columns: &[ColumnSpec]) -> String {
    let headers: Vec<&str> = columns.iter().map(|c| c.header).collect();
    let mut table = new_table(&headers);

    for record in records {
        table.add_row(columns.iter().map(|col| {
            let cell = Cell::new(col.cell_text(record));
            if col.highlight {
                cell.fg(Color::Green)
            } else {
                cell
            }
        }));
    }

    table.to_string()
}

/// Table of the items under `key` in a page
pub fn render_page(page: &Page, key: &str, columns: &[ColumnSpec]) -> String {
    let records: Vec<Record<'_>> = page.items(key).iter().map(Record::Map).collect();
    render_records(&records, columns)
}

// =========================================================================
// Resource tables
// =========================================================================

/// Gemini Enterprise apps (discovery engines)
pub fn render_apps(page: &Page) -> String {
    const COLUMNS: &[ColumnSpec] = &[
        ColumnSpec::new("App ID", "name")
            .transform(Transform::AfterLastSlash)
            .highlight(),
        ColumnSpec::new("Display Name", "displayName"),
        ColumnSpec::new("Solution Type", "solutionType"),
        ColumnSpec::new("Data Store IDs", "dataStoreIds").transform(Transform::AfterLastSlashMulti),
    ];
    render_page(page, "engines", COLUMNS)
}

pub fn render_agents(page: &Page) -> String {
    const COLUMNS: &[ColumnSpec] = &[
        ColumnSpec::new("Agent ID", "name")
            .transform(Transform::AfterLastSlash)
            .highlight(),
        ColumnSpec::new("Display Name", "displayName"),
        ColumnSpec::new(
            "Reasoning Engine",
            "adkAgentDefinition.provisionedReasoningEngine.reasoningEngine",
        )
        .transform(Transform::AfterLastSlash),
        ColumnSpec::new("Authorizations", "authorizationConfig.toolAuthorizations")
            .transform(Transform::AfterLastSlashMulti),
        ColumnSpec::new("Update Time", "updateTime").transform(Transform::Timestamp),
    ];
    render_page(page, "agents", COLUMNS)
}

pub fn render_authorizations(page: &Page) -> String {
    let mut table = new_table(&["Auth ID", "Client ID", "Authorization URI"]);

    for auth in page.items("authorizations") {
        let record = Record::Map(auth);
        let name = ColumnSpec::new("", "name")
            .transform(Transform::AfterLastSlash)
            .cell_text(&record);
        let client_id = ColumnSpec::new("", "serverSideOauth2.clientId").cell_text(&record);
        let auth_uri = lookup(auth, "serverSideOauth2.authorizationUri")
            .and_then(|v| v.as_str())
            .map(format_url)
            .unwrap_or_else(|| DEFAULT_VALUE.to_string());

        table.add_row(vec![Cell::new(name).fg(Color::Green), Cell::new(client_id), Cell::new(auth_uri)]);
    }

    table.to_string()
}

pub fn render_reasoning_engines(page: &Page) -> String {
    let mut table = new_table(&[
        "R.Engine ID",
        "Display Name",
        "Update Time",
        "Deployment Info",
        "Env vars",
    ]);

    for engine in page.items("reasoningEngines") {
        let record = Record::Map(engine);
        let id = ColumnSpec::new("", "name")
            .transform(Transform::AfterLastSlash)
            .cell_text(&record);
        let display_name = ColumnSpec::new("", "displayName").cell_text(&record);
        let update_time = ColumnSpec::new("", "updateTime")
            .transform(Transform::Timestamp)
            .cell_text(&record);

        let python = lookup(engine, "spec.sourceCodeSpec.pythonSpec");
        let module = python.and_then(|p| p.get("entrypointModule")).and_then(|v| v.as_str());
        let object = python.and_then(|p| p.get("entrypointObject")).and_then(|v| v.as_str());
        let deployment_info = match (module, object) {
            (Some(m), Some(o)) => format!("entrypointModule:{}\nentrypointObject:{}", m, o),
            _ => "?".to_string(),
        };

        let env_vars = lookup(engine, "spec.deploymentSpec.env")
            .and_then(|v| v.as_array())
            .map(|env| {
                env.iter()
                    .map(|e| {
                        format!(
                            "{}: {}",
                            e.get("name").and_then(|v| v.as_str()).unwrap_or(""),
                            e.get("value").and_then(|v| v.as_str()).unwrap_or("")
                        )
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();

        table.add_row(vec![
            Cell::new(id).fg(Color::Green),
            Cell::new(display_name),
            Cell::new(update_time),
            Cell::new(deployment_info),
            Cell::new(env_vars),
        ]);
    }

    table.to_string()
}

/// Operations table; accepts both list pages and single typed operations
pub fn render_operations(operations: &[Operation]) -> String {
    const COLUMNS: &[ColumnSpec] = &[
        ColumnSpec::new("LRO IDs", OPERATION_IDS).highlight(),
        ColumnSpec::new("Type", OPERATION_TYPE),
        ColumnSpec::new("Status\nDates", OPERATION_STATUS),
        ColumnSpec::new("Response", OPERATION_RESULT),
    ];

    let headers: Vec<&str> = COLUMNS.iter().map(|c| c.header).collect();
    let mut table = new_table(&headers);

    for op in operations {
        let record = Record::Operation(op);
        let status_color = match op.state() {
            OperationState::Running => Color::Yellow,
            OperationState::Succeeded => Color::Green,
            OperationState::Failed { .. } => Color::Red,
        };

        table.add_row(COLUMNS.iter().map(|col| {
            let cell = Cell::new(col.cell_text(&record));
            if col.highlight {
                cell.fg(Color::Green)
            } else if col.path == OPERATION_STATUS {
                cell.fg(status_color)
            } else {
                cell
            }
        }));
    }

    table.to_string()
}

/// Operations page; items that do not parse as operations are skipped
pub fn render_operations_page(page: &Page) -> String {
    let operations: Vec<Operation> = page
        .items("operations")
        .iter()
        .filter_map(|item| serde_json::from_value(item.clone()).ok())
        .collect();
    render_operations(&operations)
}

/// Compact one-line JSON, used for streamed events and raw listings
pub fn render_json_line(page: &Page) -> String {
    page.as_value().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_nested_and_indexed() {
        let value = json!({"spec": {"env": [{"name": "A"}, {"name": "B"}]}});
        assert_eq!(lookup(&value, "spec.env.1.name"), Some(&json!("B")));
        assert_eq!(lookup(&value, "spec.env.5.name"), None);
        assert_eq!(lookup(&value, "spec.missing"), None);
        assert_eq!(lookup(&value, ""), Some(&value));
    }

    #[test]
    fn test_record_operation_accessor() {
        let op: Operation = serde_json::from_value(json!({
            "name": "projects/1/locations/us/reasoningEngines/2/operations/3",
            "done": true,
            "error": {"code": 9, "message": "failed"}
        }))
        .unwrap();
        let record = Record::Operation(&op);
        assert_eq!(record.get("done"), Some(json!(true)));
        assert_eq!(record.get("error.code"), Some(json!(9)));
        assert_eq!(record.get("response"), None);
        assert_eq!(record.get(OPERATION_IDS), Some(json!("reasoningEngines\n2\noperations\n3")));
        assert_eq!(record.get(OPERATION_RESULT), Some(json!("code:9\nmessage:failed")));
        assert_eq!(record.get(OPERATION_TYPE), None);
    }

    #[test]
    fn test_operation_columns_read_through_record() {
        let op: Operation = serde_json::from_value(json!({
            "name": "projects/1/locations/us/reasoningEngines/2/operations/3",
            "done": false,
            "metadata": {
                "@type": "type.googleapis.com/google.cloud.aiplatform.v1beta1.DeleteOperationMetadata",
                "genericMetadata": {"createTime": "2025-03-04T05:06:07Z"}
            }
        }))
        .unwrap();
        let record = Record::Operation(&op);

        assert_eq!(ColumnSpec::new("", OPERATION_TYPE).cell_text(&record), "Delete");
        assert_eq!(
            ColumnSpec::new("", OPERATION_STATUS).cell_text(&record),
            "running\ncreate: 2025-03-04 05:06:07\nupdate: N.A."
        );
        assert_eq!(ColumnSpec::new("", OPERATION_RESULT).cell_text(&record), DEFAULT_VALUE);

        let rendered = render_operations(std::slice::from_ref(&op));
        assert!(rendered.contains("Delete"));
        assert!(rendered.contains("running"));
    }

    #[test]
    fn test_cell_text_transforms() {
        let item = json!({
            "name": "projects/p/locations/global/authorizations/my-auth",
            "ids": ["a/b/one", "c/two"],
            "updateTime": "2025-03-04T05:06:07.123456Z",
            "empty": ""
        });
        let record = Record::Map(&item);

        assert_eq!(
            ColumnSpec::new("", "name")
                .transform(Transform::AfterLastSlash)
                .cell_text(&record),
            "my-auth"
        );
        assert_eq!(
            ColumnSpec::new("", "ids")
                .transform(Transform::AfterLastSlashMulti)
                .cell_text(&record),
            "one\ntwo"
        );
        assert_eq!(
            ColumnSpec::new("", "updateTime")
                .transform(Transform::Timestamp)
                .cell_text(&record),
            "2025-03-04 05:06:07"
        );
        assert_eq!(ColumnSpec::new("", "empty").cell_text(&record), DEFAULT_VALUE);
        assert_eq!(ColumnSpec::new("", "missing").cell_text(&record), DEFAULT_VALUE);
    }

    #[test]
    fn test_format_url_sorts_query() {
        let formatted = format_url("https://accounts.google.com/o/oauth2/v2/auth?scope=openid&client_id=abc");
        assert_eq!(
            formatted,
            "https://accounts.google.com/o/oauth2/v2/auth\n?client_id=abc\n&scope=openid"
        );
        assert_eq!(format_url("not a url"), "not a url");
    }

    #[test]
    fn test_render_agents_contains_ids() {
        let page = Page::new(json!({
            "agents": [{
                "name": "projects/1/locations/global/collections/default_collection/engines/app/assistants/default_assistant/agents/agent-42",
                "displayName": "Helper",
                "adkAgentDefinition": {
                    "provisionedReasoningEngine": {
                        "reasoningEngine": "projects/p/locations/us-central1/reasoningEngines/777"
                    }
                }
            }]
        }));
        let rendered = render_agents(&page);
        assert!(rendered.contains("agent-42"));
        assert!(rendered.contains("Helper"));
        assert!(rendered.contains("777"));
    }

    #[test]
    fn test_render_operations_page_status() {
        let page = Page::new(json!({
            "operations": [
                {"name": "projects/1/locations/us/reasoningEngines/2/operations/3", "done": false},
                {"name": "projects/1/locations/us/reasoningEngines/2/operations/4", "done": true,
                 "error": {"code": 13, "message": "boom"}}
            ]
        }));
        let rendered = render_operations_page(&page);
        assert!(rendered.contains("running"));
        assert!(rendered.contains("message:boom"));
    }
}
