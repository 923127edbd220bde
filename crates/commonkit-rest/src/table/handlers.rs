//! Format handlers: decoders from uploaded bytes to a [`Table`].
//!
//! A [`HandlerRegistry`] maps file extensions to [`FormatHandler`]s. The
//! `"*"` entry, when present, catches every extension without its own
//! handler. Handlers receive the raw file content and a JSON object of
//! keyword arguments.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::Arc;

use commonkit_core::Settings;
use csv::{ReaderBuilder, StringRecord, Trim};
use serde_json::{Map, Number, Value as Json};
use thiserror::Error;

use super::data::{Row, Table};

/// The registry key that matches any extension.
pub const WILDCARD: &str = "*";

/// Errors raised while decoding an upload.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The CSV reader failed.
    #[error("{0}")]
    Csv(#[from] csv::Error),

    /// The JSON parser failed.
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    /// A keyword argument was unknown or had the wrong type.
    #[error("invalid keyword argument {name}: {reason}")]
    InvalidKwarg {
        /// The argument name.
        name: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The content parsed but is not tabular.
    #[error("{0}")]
    Shape(String),

    /// Any other failure, for custom handlers.
    #[error("{0}")]
    Other(String),
}

/// The signature of a parsing handler.
pub type ParseFn =
    dyn Fn(&[u8], &Map<String, Json>) -> Result<Table, HandlerError> + Send + Sync;

/// A registered format.
#[derive(Clone)]
pub enum FormatHandler {
    /// A decoder for the format.
    Parse(Arc<ParseFn>),
    /// A format that is advertised but cannot be decoded.
    Unavailable,
}

impl FormatHandler {
    /// Wraps a parsing function.
    pub fn parse<F>(handler: F) -> Self
    where
        F: Fn(&[u8], &Map<String, Json>) -> Result<Table, HandlerError> + Send + Sync + 'static,
    {
        Self::Parse(Arc::new(handler))
    }

    /// Returns `true` if the handler can decode content.
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}

impl std::fmt::Debug for FormatHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(_) => f.write_str("FormatHandler::Parse(..)"),
            Self::Unavailable => f.write_str("FormatHandler::Unavailable"),
        }
    }
}

/// Extension → handler mapping.
///
/// ```
/// use commonkit_rest::table::{read_csv, FormatHandler, HandlerRegistry};
///
/// let registry = HandlerRegistry::new().register("csv", FormatHandler::parse(read_csv));
/// assert!(registry.get("csv").is_some());
/// assert!(registry.get("txt").is_none());
/// assert_eq!(registry.formats(), vec!["csv"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, FormatHandler>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler for `extension` (compared case-insensitively).
    #[must_use]
    pub fn register(mut self, extension: &str, handler: FormatHandler) -> Self {
        self.insert(extension, handler);
        self
    }

    /// Adds or replaces a handler in place.
    pub fn insert(&mut self, extension: &str, handler: FormatHandler) {
        self.handlers.insert(extension.to_lowercase(), handler);
    }

    /// Looks up the handler for `extension`, falling back to [`WILDCARD`].
    pub fn get(&self, extension: &str) -> Option<&FormatHandler> {
        self.resolve(extension).map(|(_, handler)| handler)
    }

    /// Like [`get`](Self::get), but also returns the key the handler was
    /// registered under (`"*"` when the wildcard matched).
    pub fn resolve(&self, extension: &str) -> Option<(&str, &FormatHandler)> {
        self.handlers
            .get_key_value(&extension.to_lowercase())
            .or_else(|| self.handlers.get_key_value(WILDCARD))
            .map(|(key, handler)| (key.as_str(), handler))
    }

    /// Returns the registered extensions in sorted order.
    pub fn formats(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// The registry of built-in formats.
///
/// `csv`, `tsv` and `json` decode; the spreadsheet formats are registered as
/// [`FormatHandler::Unavailable`].
pub fn default_formats() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new()
        .register("csv", FormatHandler::parse(read_csv))
        .register("tsv", FormatHandler::parse(read_tsv))
        .register("json", FormatHandler::parse(read_json));
    for spreadsheet in ["xlsx", "xls", "xlsm", "xlsb", "ods"] {
        registry.insert(spreadsheet, FormatHandler::Unavailable);
    }
    registry
}

// ── Delimited text ──────────────────────────────────────────────────

/// Decodes comma-separated content.
///
/// Keyword arguments:
/// - `delimiter` (one ASCII character, defaults to the configured
///   `upload.csv_delimiter`)
/// - `has_headers` (default `true`; without headers columns are named
///   `"0"`, `"1"`, ...)
/// - `infer_types` (default `true`; integers, floats and booleans become
///   JSON numbers and booleans, empty cells become `null`)
pub fn read_csv(content: &[u8], kwargs: &Map<String, Json>) -> Result<Table, HandlerError> {
    let delimiter = u8::try_from(Settings::current().upload.csv_delimiter).unwrap_or(b',');
    read_delimited(content, kwargs, delimiter)
}

/// Decodes tab-separated content. Accepts the same keyword arguments as
/// [`read_csv`].
pub fn read_tsv(content: &[u8], kwargs: &Map<String, Json>) -> Result<Table, HandlerError> {
    read_delimited(content, kwargs, b'\t')
}

fn read_delimited(
    content: &[u8],
    kwargs: &Map<String, Json>,
    default_delimiter: u8,
) -> Result<Table, HandlerError> {
    let mut delimiter = default_delimiter;
    let mut has_headers = true;
    let mut infer_types = true;
    for (name, value) in kwargs {
        match name.as_str() {
            "delimiter" => delimiter = delimiter_kwarg(name, value)?,
            "has_headers" => has_headers = bool_kwarg(name, value)?,
            "infer_types" => infer_types = bool_kwarg(name, value)?,
            _ => {
                return Err(HandlerError::InvalidKwarg {
                    name: name.clone(),
                    reason: "unexpected keyword argument".to_string(),
                })
            }
        }
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(has_headers)
        .flexible(false)
        .trim(Trim::All)
        .from_reader(Cursor::new(content));

    let mut columns: Vec<String> = if has_headers {
        dedupe_columns(reader.headers()?)
    } else {
        Vec::new()
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if !has_headers && columns.is_empty() {
            columns = (0..record.len()).map(|i| i.to_string()).collect();
        }
        let row: Row = columns
            .iter()
            .zip(record.iter())
            .map(|(column, cell)| (column.clone(), parse_cell(cell, infer_types)))
            .collect();
        rows.push(row);
    }

    let mut table = Table::new(columns);
    for row in rows {
        table.push_row(row);
    }
    Ok(table)
}

/// Renames repeated headers to `name.1`, `name.2`, ... so that no cell is
/// overwritten when the row is keyed by column.
fn dedupe_columns(headers: &StringRecord) -> Vec<String> {
    let mut columns: Vec<String> = Vec::with_capacity(headers.len());
    for header in headers {
        let mut name = header.to_string();
        let mut suffix = 1;
        while columns.contains(&name) {
            name = format!("{header}.{suffix}");
            suffix += 1;
        }
        columns.push(name);
    }
    columns
}

fn parse_cell(cell: &str, infer_types: bool) -> Json {
    if !infer_types {
        return Json::String(cell.to_string());
    }
    if cell.is_empty() {
        return Json::Null;
    }
    if let Ok(n) = cell.parse::<i64>() {
        return Json::from(n);
    }
    if let Some(n) = cell.parse::<f64>().ok().and_then(Number::from_f64) {
        return Json::Number(n);
    }
    match cell.to_ascii_lowercase().as_str() {
        "true" => Json::Bool(true),
        "false" => Json::Bool(false),
        _ => Json::String(cell.to_string()),
    }
}

fn delimiter_kwarg(name: &str, value: &Json) -> Result<u8, HandlerError> {
    let invalid = || HandlerError::InvalidKwarg {
        name: name.to_string(),
        reason: format!("expected a single ASCII character, got {value}"),
    };
    let text = value.as_str().ok_or_else(invalid)?;
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => u8::try_from(c).map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

fn bool_kwarg(name: &str, value: &Json) -> Result<bool, HandlerError> {
    value.as_bool().ok_or_else(|| HandlerError::InvalidKwarg {
        name: name.to_string(),
        reason: format!("expected a boolean, got {value}"),
    })
}

// ── JSON ────────────────────────────────────────────────────────────

/// Decodes a JSON array of record objects.
///
/// With `lines: true` the content is read as one record per line.
pub fn read_json(content: &[u8], kwargs: &Map<String, Json>) -> Result<Table, HandlerError> {
    let mut lines = false;
    for (name, value) in kwargs {
        match name.as_str() {
            "lines" => lines = bool_kwarg(name, value)?,
            _ => {
                return Err(HandlerError::InvalidKwarg {
                    name: name.clone(),
                    reason: "unexpected keyword argument".to_string(),
                })
            }
        }
    }

    let records: Vec<Json> = if lines {
        content
            .split(|b| *b == b'\n')
            .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
            .map(serde_json::from_slice::<Json>)
            .collect::<Result<Vec<_>, _>>()?
    } else {
        match serde_json::from_slice::<Json>(content)? {
            Json::Array(records) => records,
            other => {
                return Err(HandlerError::Shape(format!(
                    "expected an array of records, got {}",
                    kind(&other)
                )))
            }
        }
    };

    let rows = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| match record {
            Json::Object(row) => Ok(row),
            other => Err(HandlerError::Shape(format!(
                "record {index} is {}, expected an object",
                kind(&other)
            ))),
        })
        .collect::<Result<Vec<Row>, _>>()?;
    Ok(Table::from_rows(rows))
}

const fn kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kwargs(value: Json) -> Map<String, Json> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_csv_infers_types_and_trims() {
        let content = b"name, age ,score,active\nann, 41 ,9.5,true\nbob,,x,FALSE\n";
        let table = read_csv(content, &Map::new()).unwrap();
        assert_eq!(table.columns(), ["name", "age", "score", "active"]);
        assert_eq!(
            table.to_json(),
            json!([
                {"name": "ann", "age": 41, "score": 9.5, "active": true},
                {"name": "bob", "age": null, "score": "x", "active": false},
            ])
        );
    }

    #[test]
    fn test_csv_options() {
        let table = read_csv(
            b"1;2\n3;4\n",
            &kwargs(json!({"delimiter": ";", "has_headers": false, "infer_types": false})),
        )
        .unwrap();
        assert_eq!(table.columns(), ["0", "1"]);
        assert_eq!(table.row(1), Some(&kwargs(json!({"0": "3", "1": "4"}))));
    }

    #[test]
    fn test_csv_rejects_bad_kwargs() {
        let err = read_csv(b"a\n1\n", &kwargs(json!({"delimiter": ";;"}))).unwrap_err();
        assert!(matches!(err, HandlerError::InvalidKwarg { .. }));
        let err = read_csv(b"a\n1\n", &kwargs(json!({"skiprows": 1}))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid keyword argument skiprows: unexpected keyword argument"
        );
    }

    #[test]
    fn test_csv_ragged_rows_fail() {
        assert!(matches!(read_csv(b"a,b\n1\n", &Map::new()), Err(HandlerError::Csv(_))));
    }

    #[test]
    fn test_csv_repeated_headers_keep_every_cell() {
        let table = read_csv(b"a,a,b,a\n1,2,3,4\n", &Map::new()).unwrap();
        assert_eq!(table.columns(), ["a", "a.1", "b", "a.2"]);
        assert_eq!(table.to_json(), json!([{"a": 1, "a.1": 2, "b": 3, "a.2": 4}]));

        let table = read_csv(b"a,a.1,a\nx,y,z\n", &Map::new()).unwrap();
        assert_eq!(table.columns(), ["a", "a.1", "a.2"]);
    }

    #[test]
    fn test_tsv() {
        let table = read_tsv(b"city\tpop\nOslo\t700000\n", &Map::new()).unwrap();
        assert_eq!(table.to_json(), json!([{"city": "Oslo", "pop": 700_000}]));
    }

    #[test]
    fn test_json_records_and_lines() {
        let table = read_json(br#"[{"a": 1}, {"a": 2, "b": 3}]"#, &Map::new()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.columns(), ["a", "b"]);

        let lines = kwargs(json!({"lines": true}));
        let table = read_json(b"{\"a\": 1}\n\n{\"a\": 2}\n", &lines).unwrap();
        assert_eq!(table.column("a"), vec![&json!(1), &json!(2)]);

        let err = read_json(br#"{"a": 1}"#, &Map::new()).unwrap_err();
        assert_eq!(err.to_string(), "expected an array of records, got an object");
        let err = read_json(b"[1]", &Map::new()).unwrap_err();
        assert_eq!(err.to_string(), "record 0 is a number, expected an object");
    }

    #[test]
    fn test_registry_wildcard_and_defaults() {
        let registry = default_formats();
        assert!(registry.get("CSV").unwrap().is_available());
        assert!(!registry.get("xlsx").unwrap().is_available());
        assert!(registry.get("txt").is_none());

        let registry = registry.register(WILDCARD, FormatHandler::parse(read_csv));
        assert!(registry.get("txt").unwrap().is_available());
        assert!(registry.formats().contains(&"*"));
        assert_eq!(registry.resolve("txt").map(|(key, _)| key), Some("*"));
        assert_eq!(registry.resolve("TSV").map(|(key, _)| key), Some("tsv"));
    }
}
