//! Dataset ingestion from CSV and JSON exports
//!
//! Spreadsheets are expected to be exported before loading:
//! - `.csv`: header row plus one line per record, RFC 4180 quoting
//! - `.json`: an array of flat objects, one per record

use crate::error::DatasetError;
use crate::record_store::{RecordStore, Row};
use crate::value::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Load a dataset, choosing the parser from the file extension
pub fn load_path<P: AsRef<Path>>(path: P) -> Result<RecordStore, DatasetError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(DatasetError::NotFound(path.display().to_string()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let contents = fs::read_to_string(path)?;
    let store = match extension.as_str() {
        "csv" => parse_csv(&contents)?,
        "json" => parse_json(&contents)?,
        _ => return Err(DatasetError::UnsupportedFormat(path.display().to_string())),
    };

    tracing::debug!(
        "Loaded {} rows x {} columns from {}",
        store.len(),
        store.columns().len(),
        path.display()
    );
    Ok(store)
}

/// Parse CSV text into a record store
pub fn parse_csv(input: &str) -> Result<RecordStore, DatasetError> {
    let mut records = split_csv_records(input)?.into_iter();

    let header = records.next().ok_or(DatasetError::EmptyHeader)?;
    let columns: Vec<String> = header.into_iter().map(|c| c.trim().to_string()).collect();

    let rows = records
        .map(|fields| Row::new(fields.iter().map(|f| Value::parse(f)).collect()))
        .collect();

    RecordStore::new(columns, rows)
}

/// Split CSV text into records of raw fields
///
/// Handles quoted fields with embedded commas, newlines, and doubled quotes.
/// Blank lines between records are skipped.
fn split_csv_records(input: &str) -> Result<Vec<Vec<String>>, DatasetError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);

    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut field_started = false;
    let mut line = 1;
    let mut quote_line = 0;

    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if !field_started => {
                in_quotes = true;
                field_started = true;
                quote_line = line;
            }
            '"' => {
                return Err(DatasetError::MalformedCsv {
                    line,
                    reason: "unexpected quote inside unquoted field".to_string(),
                });
            }
            ',' => {
                record.push(std::mem::take(&mut field));
                field_started = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                line += 1;
                end_record(&mut records, &mut record, &mut field, field_started);
                field_started = false;
            }
            _ => {
                field.push(c);
                field_started = true;
            }
        }
    }

    if in_quotes {
        return Err(DatasetError::MalformedCsv {
            line: quote_line,
            reason: "unterminated quoted field".to_string(),
        });
    }
    end_record(&mut records, &mut record, &mut field, field_started);

    Ok(records)
}

fn end_record(
    records: &mut Vec<Vec<String>>,
    record: &mut Vec<String>,
    field: &mut String,
    field_started: bool,
) {
    // A line with no separators and no content is blank, not a one-field record
    if record.is_empty() && field.is_empty() && !field_started {
        return;
    }
    record.push(std::mem::take(field));
    records.push(std::mem::take(record));
}

/// Parse a JSON array of flat objects into a record store
///
/// Column order follows the first appearance of each key. Keys missing from
/// an object are missing cells.
pub fn parse_json(input: &str) -> Result<RecordStore, DatasetError> {
    let parsed: serde_json::Value =
        serde_json::from_str(input).map_err(|e| DatasetError::InvalidJson(e.to_string()))?;

    let objects = parsed
        .as_array()
        .ok_or_else(|| DatasetError::InvalidJson("expected a top-level array".to_string()))?;

    let mut columns: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for (i, obj) in objects.iter().enumerate() {
        let map = obj.as_object().ok_or_else(|| {
            DatasetError::InvalidJson(format!("record {} is not an object", i + 1))
        })?;
        for key in map.keys() {
            if !positions.contains_key(key) {
                positions.insert(key.clone(), columns.len());
                columns.push(key.clone());
            }
        }
    }

    let mut rows = Vec::with_capacity(objects.len());
    for (i, obj) in objects.iter().enumerate() {
        let mut cells = vec![Value::Missing; columns.len()];
        if let Some(map) = obj.as_object() {
            for (key, raw) in map {
                cells[positions[key]] = json_cell(raw).map_err(|reason| {
                    DatasetError::InvalidJson(format!("record {}, key '{}': {}", i + 1, key, reason))
                })?;
            }
        }
        rows.push(Row::new(cells));
    }

    if columns.is_empty() {
        return Err(DatasetError::EmptyHeader);
    }
    RecordStore::new(columns, rows)
}

fn json_cell(raw: &serde_json::Value) -> Result<Value, &'static str> {
    match raw {
        serde_json::Value::Null => Ok(Value::Missing),
        serde_json::Value::Bool(b) => Ok(Value::Text(b.to_string())),
        serde_json::Value::Number(n) => Ok(match n.as_f64() {
            Some(value) if value.is_finite() => Value::Number {
                value,
                raw: n.to_string(),
            },
            _ => Value::Missing,
        }),
        serde_json::Value::String(s) => Ok(Value::parse(s)),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            Err("nested values are not supported")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_csv_basic() {
        let store = parse_csv("record_id,sex,months\nS1,,2\nS1,Female,3.1\n").unwrap();
        assert_eq!(store.columns(), &["record_id", "sex", "months"]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.value(0, "sex"), Some(&Value::Missing));
        assert_eq!(store.value(1, "months"), Some(&Value::number(3.1)));
    }

    #[test]
    fn test_parse_csv_quoted_fields() {
        let input = "id,phase,note\n1,\"3 to 4 months\",\"said \"\"ok\"\", then left\"\n2,\"a,b\",\"two\nlines\"\n";
        let store = parse_csv(input).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(
            store.value(0, "note"),
            Some(&Value::Text("said \"ok\", then left".to_string()))
        );
        assert_eq!(store.value(1, "phase"), Some(&Value::Text("a,b".to_string())));
        assert_eq!(store.value(1, "note"), Some(&Value::Text("two\nlines".to_string())));
    }

    #[test]
    fn test_parse_csv_crlf_and_blank_lines() {
        let store = parse_csv("id,x\r\n1,5\r\n\r\n2,\r\n").unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.value(1, "x"), Some(&Value::Missing));
    }

    #[test]
    fn test_parse_csv_trailing_empty_field() {
        let store = parse_csv("id,x\n1,\n").unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.value(0, "x"), Some(&Value::Missing));
    }

    #[test]
    fn test_parse_csv_unterminated_quote() {
        let err = parse_csv("id,x\n1,\"open\n").unwrap_err();
        assert!(matches!(err, DatasetError::MalformedCsv { line: 2, .. }));
    }

    #[test]
    fn test_parse_csv_ragged_row() {
        let err = parse_csv("id,x\n1,2,3\n").unwrap_err();
        assert!(matches!(err, DatasetError::RaggedRow { row: 1, .. }));
    }

    #[test]
    fn test_parse_csv_empty_input() {
        assert!(matches!(parse_csv(""), Err(DatasetError::EmptyHeader)));
    }

    #[test]
    fn test_parse_json_records() {
        let input = r#"[
            {"record_id": "S1", "months": 2, "ikdc": null},
            {"record_id": "S1", "months": 3.5, "ikdc": 71.2, "sex": "Female"}
        ]"#;
        let store = parse_json(input).unwrap();
        assert_eq!(store.columns(), &["record_id", "months", "ikdc", "sex"]);
        assert_eq!(store.value(0, "sex"), Some(&Value::Missing));
        assert_eq!(store.value(0, "ikdc"), Some(&Value::Missing));
        assert_eq!(store.value(1, "ikdc"), Some(&Value::number(71.2)));
    }

    #[test]
    fn test_parse_json_keeps_id_text() {
        let store = parse_json(r#"[{"id": 12345678901234567}, {"id": "007"}, {"id": 7}]"#).unwrap();
        assert_eq!(store.value(0, "id").unwrap().to_string(), "12345678901234567");
        assert_eq!(store.value(1, "id").unwrap().to_string(), "007");
        assert_ne!(store.value(1, "id"), store.value(2, "id"));
    }

    #[test]
    fn test_parse_json_rejects_nested() {
        let err = parse_json(r#"[{"a": [1, 2]}]"#).unwrap_err();
        assert!(matches!(err, DatasetError::InvalidJson(_)));
    }

    #[test]
    fn test_load_path_missing_file() {
        let err = load_path("/nonexistent/followup.csv").unwrap_err();
        assert!(matches!(err, DatasetError::NotFound(_)));
    }

    #[test]
    fn test_load_path_unsupported_extension() {
        let mut file = NamedTempFile::with_suffix(".xlsx").unwrap();
        file.write_all(b"binary").unwrap();
        let err = load_path(file.path()).unwrap_err();
        assert!(matches!(err, DatasetError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_load_path_csv() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        file.write_all(b"record_id,ikdc\nS1,40\n").unwrap();
        let store = load_path(file.path()).unwrap();
        assert_eq!(store.len(), 1);
    }
}
