//! Flattened columnar text for whole tables (TSV and CSV profiles).

use crate::deserialize::resize;
use crate::error::{Result, TableError};
use crate::serialize::SerializationOptions;
use crate::table::Table;
use std::fs;
use std::path::Path;

fn single_byte(separator: &str, what: &str) -> Result<u8> {
    match separator.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(TableError::Serialize(format!(
            "{what} '{}' must be a single byte when quoting",
            separator.escape_debug()
        ))),
    }
}

fn terminator(separator: &str) -> Result<csv::Terminator> {
    if separator == "\r\n" {
        Ok(csv::Terminator::CRLF)
    } else {
        single_byte(separator, "row separator").map(csv::Terminator::Any)
    }
}

impl Table {
    /// Header names of the flattened columns, nested fields dot-joined.
    #[must_use]
    pub fn header_names(&self, options: &SerializationOptions) -> Vec<String> {
        let first = self.row(1);
        self.columns()
            .flat_map(|column| {
                let cell = first.and_then(|row| row.cell(column.position()));
                match cell {
                    Some(cell) if options.flatten => cell.leaf_headers(column.name()),
                    _ => vec![column.name().to_string()],
                }
            })
            .collect()
    }

    /// Text fields for every row, in position order.
    #[must_use]
    pub fn records(&self, options: &SerializationOptions) -> Vec<Vec<String>> {
        self.rows()
            .map(|row| {
                row.cells()
                    .flat_map(|cell| {
                        if options.flatten {
                            cell.leaves(options)
                        } else {
                            vec![cell.serialize(options)]
                        }
                    })
                    .collect()
            })
            .collect()
    }

    /// Serialize the table as delimited text, one line per row.
    pub fn to_delimited(&self, options: &SerializationOptions) -> Result<String> {
        let mut records = Vec::new();
        if options.include_header {
            records.push(self.header_names(options));
        }
        records.extend(self.records(options));

        if !options.quote_fields {
            let mut out = String::new();
            for record in &records {
                out.push_str(&record.join(&options.column_separator));
                out.push_str(&options.row_separator);
            }
            return Ok(out);
        }

        let mut writer = csv::WriterBuilder::new()
            .delimiter(single_byte(&options.column_separator, "column separator")?)
            .terminator(terminator(&options.row_separator)?)
            .quote_style(csv::QuoteStyle::Necessary)
            .flexible(true)
            .from_writer(Vec::new());
        for record in &records {
            writer.write_record(record)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| TableError::Serialize(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| TableError::Serialize(e.to_string()))
    }

    /// Split delimited text into records.
    pub fn parse_delimited(text: &str, options: &SerializationOptions) -> Result<Vec<Vec<String>>> {
        if !options.quote_fields {
            let mut lines: Vec<&str> = text.split(options.row_separator.as_str()).collect();
            if lines.last().is_some_and(|l| l.is_empty()) {
                lines.pop();
            }
            return Ok(lines
                .into_iter()
                .map(|line| {
                    line.split(options.column_separator.as_str())
                        .map(str::to_string)
                        .collect()
                })
                .collect());
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(single_byte(&options.column_separator, "column separator")?)
            .terminator(terminator(&options.row_separator)?)
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());
        let mut records = Vec::new();
        for result in reader.records() {
            let record = result?;
            records.push(record.iter().map(str::to_string).collect());
        }
        Ok(records)
    }

    /// Apply delimited text to the table's rows.
    ///
    /// Collection-backed tables are resized to the record count when
    /// `modify_sub_tables` is set; otherwise extra records are ignored.
    pub fn import_delimited(&mut self, text: &str, options: &SerializationOptions) -> Result<()> {
        let mut records = Self::parse_delimited(text, options)?;
        if options.include_header && !records.is_empty() {
            records.remove(0);
        }

        if self.is_collection() && options.modify_sub_tables {
            resize(self, records.len())?;
        } else if records.len() > self.row_count() {
            tracing::warn!(
                table = %self.name(),
                records = records.len(),
                rows = self.row_count(),
                "more records than rows, ignoring the rest"
            );
        }

        let width = self
            .row(1)
            .map_or(0, |row| row.cells().map(|c| if options.flatten { c.flat_width() } else { 1 }).sum());

        for (i, record) in records.iter().enumerate() {
            let slots = map_columns(record, options.column_mapping.as_deref(), width);
            let Some(row) = self.row_mut(i + 1) else {
                break;
            };
            let mut cursor = 0;
            for cell in row.cells.values_mut() {
                let result = if options.flatten {
                    cell.apply_flat(&slots, &mut cursor, options)
                } else {
                    let slot = slots.get(cursor).copied().flatten();
                    cursor += 1;
                    slot.map_or(Ok(()), |text| cell.deserialize(text, options))
                };
                if let Err(err) = result {
                    tracing::warn!(cell = %cell.global_position(), error = %err, "skipping field");
                }
            }
        }
        Ok(())
    }

    /// Write delimited text to a file.
    pub fn save_delimited<P: AsRef<Path>>(&self, path: P, options: &SerializationOptions) -> Result<()> {
        fs::write(path, self.to_delimited(options)?)?;
        Ok(())
    }
}

/// Reorder imported fields into table leaf slots. Mapping entry `i` names
/// the target slot of imported column `i`; negative entries skip it.
fn map_columns<'a>(record: &'a [String], mapping: Option<&[i64]>, width: usize) -> Vec<Option<&'a str>> {
    let Some(mapping) = mapping else {
        return record.iter().map(|s| Some(s.as_str())).collect();
    };
    let mut slots = vec![None; width.max(record.len())];
    for (i, text) in record.iter().enumerate() {
        let Some(target) = mapping.get(i).and_then(|t| usize::try_from(*t).ok()) else {
            continue;
        };
        if let Some(slot) = slots.get_mut(target) {
            *slot = Some(text.as_str());
        }
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_columns() {
        let record = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let slots = map_columns(&record, Some(&[2, -1, 0]), 3);
        assert_eq!(slots, vec![Some("c"), None, Some("a")]);

        let identity = map_columns(&record, None, 3);
        assert_eq!(identity, vec![Some("a"), Some("b"), Some("c")]);
    }

    #[test]
    fn test_parse_delimited_profiles() {
        let tsv = Table::parse_delimited("1\tx\n2\ty\n", &SerializationOptions::tsv()).unwrap();
        assert_eq!(tsv, vec![vec!["1", "x"], vec!["2", "y"]]);

        let csv = Table::parse_delimited(
            "1,\"a, \"\"b\"\"\"\n",
            &SerializationOptions::csv(),
        )
        .unwrap();
        assert_eq!(csv, vec![vec!["1".to_string(), "a, \"b\"".to_string()]]);
    }
}
