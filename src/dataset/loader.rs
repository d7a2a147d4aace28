//! Loader for `search_dataset.csv` snapshots.

use std::path::Path;

use super::{DATASET_HEADER, Example, Label};
use crate::error::PersistenceError;

/// Read a dataset snapshot written by [`super::write_dataset`].
pub fn load_dataset(path: &Path) -> Result<Vec<Example>, PersistenceError> {
    let text = std::fs::read_to_string(path).map_err(|source| PersistenceError::io(path, source))?;
    parse_dataset(&text)
}

/// Parse dataset CSV text. The header must match [`DATASET_HEADER`].
pub fn parse_dataset(text: &str) -> Result<Vec<Example>, PersistenceError> {
    let records = parse_records(text)?;
    let mut records = records.into_iter();
    let Some((_, header)) = records.next() else {
        return Err(PersistenceError::Csv {
            line: 1,
            message: "missing header row".to_string(),
        });
    };
    if header != DATASET_HEADER {
        return Err(PersistenceError::Csv {
            line: 1,
            message: format!("unexpected header {header:?}"),
        });
    }

    let mut examples = Vec::new();
    for (line, record) in records {
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        let [link, query, position, title, description, label]: [String; 6] =
            record.try_into().map_err(|record: Vec<String>| PersistenceError::Csv {
                line,
                message: format!("expected {} fields, found {}", DATASET_HEADER.len(), record.len()),
            })?;
        let position = position.parse::<usize>().map_err(|_| PersistenceError::Csv {
            line,
            message: format!("invalid position {position:?}"),
        })?;
        let label = parse_label(&label).ok_or_else(|| PersistenceError::Csv {
            line,
            message: format!("invalid label {label:?}"),
        })?;
        examples.push(Example {
            link,
            title,
            description,
            query,
            position,
            label,
        });
    }
    Ok(examples)
}

fn parse_label(cell: &str) -> Option<Option<Label>> {
    match cell {
        "" => Some(None),
        "0" => Some(Some(Label::Irrelevant)),
        "1" => Some(Some(Label::Relevant)),
        _ => None,
    }
}

/// Split CSV text into records, honoring quoted cells with embedded
/// delimiters, doubled quotes, and newlines. Each record carries the line
/// number it started on.
fn parse_records(text: &str) -> Result<Vec<(usize, Vec<String>)>, PersistenceError> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut line = 1usize;
    let mut record_line = 1usize;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    cell.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    cell.push(c);
                }
                _ => cell.push(c),
            }
            continue;
        }
        match c {
            '"' if cell.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut cell)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut cell));
                records.push((record_line, std::mem::take(&mut record)));
                line += 1;
                record_line = line;
            }
            _ => cell.push(c),
        }
    }
    if in_quotes {
        return Err(PersistenceError::Csv {
            line: record_line,
            message: "unterminated quoted field".to_string(),
        });
    }
    if !cell.is_empty() || !record.is_empty() {
        record.push(cell);
        records.push((record_line, record));
    }
    Ok(records)
}
