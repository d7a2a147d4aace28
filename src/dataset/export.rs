use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use super::Example;
use crate::error::PersistenceError;

/// File name used for dataset snapshots.
pub const DATASET_FILE_NAME: &str = "search_dataset.csv";
/// Column order of every dataset snapshot.
pub const DATASET_HEADER: [&str; 6] = ["link", "query", "position", "title", "description", "label"];

/// Write a full snapshot of `examples` as CSV, replacing any existing file.
///
/// Unlabeled examples are written with an empty `label` cell.
pub fn write_dataset(examples: &[Example], path: &Path) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|source| PersistenceError::io(parent, source))?;
    }
    let file = File::create(path).map_err(|source| PersistenceError::io(path, source))?;
    let mut writer = BufWriter::new(file);
    write_rows(examples, &mut writer).map_err(|source| PersistenceError::io(path, source))?;
    info!("Exported {} examples to {}", examples.len(), path.display());
    Ok(())
}

fn write_rows(examples: &[Example], writer: &mut impl Write) -> std::io::Result<()> {
    writeln!(writer, "{}", DATASET_HEADER.join(","))?;
    for example in examples {
        let label = example
            .label
            .map(|label| label.to_string())
            .unwrap_or_default();
        let position = example.position.to_string();
        let cells = [
            example.link.as_str(),
            example.query.as_str(),
            position.as_str(),
            example.title.as_str(),
            example.description.as_str(),
            label.as_str(),
        ];
        let line = cells
            .iter()
            .map(|cell| quote_cell(cell))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(writer, "{line}")?;
    }
    writer.flush()
}

fn quote_cell(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Label;

    #[test]
    fn quotes_only_when_needed() {
        assert_eq!(quote_cell("plain"), "plain");
        assert_eq!(quote_cell("a,b"), "\"a,b\"");
        assert_eq!(quote_cell("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn writes_header_and_rows() {
        let examples = vec![
            Example::new("https://a.example", "A, Inc", "desc", "a", 0).with_label(Label::Relevant),
            Example::new("https://b.example", "B", "", "b", 1),
        ];
        let mut out = Vec::new();
        write_rows(&examples, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "link,query,position,title,description,label");
        assert_eq!(lines[1], "https://a.example,a,0,\"A, Inc\",desc,1");
        assert_eq!(lines[2], "https://b.example,b,1,B,,");
    }
}
