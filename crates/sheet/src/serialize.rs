//! Cell serialization: flattened scalar text and nested JSON.

use crate::cell::{Cell, CellKind};
use crate::scalar::{format_scalar, NULL_TOKEN};
use crate::source::{PathSegment, VALUE_COLUMN};
use crate::table::Table;
use crate::types::TypeDesc;
use crate::value::Value;
use serde_json::{Map, Value as Json};

/// Zero-width spaces standing in for a double quote inside dictionary keys.
pub const KEY_QUOTE_ESCAPE: &str = "\u{200B}\u{200B}";

/// Options for table and cell serialization
#[derive(Debug, Clone, PartialEq)]
pub struct SerializationOptions {
    /// Separator between columns (default: tab)
    pub column_separator: String,
    /// Separator between rows (default: newline)
    pub row_separator: String,
    /// Quote fields that contain separators or quotes (CSV profile)
    pub quote_fields: bool,
    /// Expand nested objects into their leaf values instead of JSON
    pub flatten: bool,
    /// Write (and expect) a header line
    pub include_header: bool,
    /// Let imports add and remove collection rows to match the payload
    pub modify_sub_tables: bool,
    /// Target leaf column for each imported column; `-1` skips it
    pub column_mapping: Option<Vec<i64>>,
    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for SerializationOptions {
    fn default() -> Self {
        SerializationOptions {
            column_separator: "\t".to_string(),
            row_separator: "\n".to_string(),
            quote_fields: false,
            flatten: true,
            include_header: false,
            modify_sub_tables: true,
            column_mapping: None,
            pretty: false,
        }
    }
}

impl SerializationOptions {
    /// Tab-separated, flattened, never quoted
    #[must_use]
    pub fn tsv() -> Self {
        Self::default()
    }

    /// Comma-separated with RFC 4180 quoting where needed
    #[must_use]
    pub fn csv() -> Self {
        SerializationOptions {
            column_separator: ",".to_string(),
            quote_fields: true,
            ..Default::default()
        }
    }

    /// Nested JSON
    #[must_use]
    pub fn json() -> Self {
        SerializationOptions {
            flatten: false,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_column_separator(mut self, separator: impl Into<String>) -> Self {
        self.column_separator = separator.into();
        self
    }

    #[must_use]
    pub fn with_row_separator(mut self, separator: impl Into<String>) -> Self {
        self.row_separator = separator.into();
        self
    }

    #[must_use]
    pub fn with_quoting(mut self, quote_fields: bool) -> Self {
        self.quote_fields = quote_fields;
        self
    }

    #[must_use]
    pub fn with_flatten(mut self, flatten: bool) -> Self {
        self.flatten = flatten;
        self
    }

    #[must_use]
    pub fn with_header(mut self, include_header: bool) -> Self {
        self.include_header = include_header;
        self
    }

    #[must_use]
    pub fn with_modify_sub_tables(mut self, modify: bool) -> Self {
        self.modify_sub_tables = modify;
        self
    }

    #[must_use]
    pub fn with_column_mapping(mut self, mapping: Vec<i64>) -> Self {
        self.column_mapping = Some(mapping);
        self
    }

    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

pub(crate) fn escape_key(key: &str) -> String {
    key.replace('"', KEY_QUOTE_ESCAPE)
}

pub(crate) fn unescape_key(key: &str) -> String {
    key.replace(KEY_QUOTE_ESCAPE, "\"")
}

/// Text of a dictionary key as it appears in JSON.
pub(crate) fn key_text(key: &Value, key_type: &TypeDesc) -> String {
    match key {
        Value::String(s) => escape_key(s),
        other => escape_key(&format_scalar(other, key_type)),
    }
}

impl Cell {
    /// Serialize the cell's cached value.
    ///
    /// Scalars produce plain text. Nested objects produce their leaves joined
    /// by the column separator when flattening outside any collection, and a
    /// JSON object otherwise. Collections always produce JSON.
    #[must_use]
    pub fn serialize(&self, options: &SerializationOptions) -> String {
        match self.kind {
            CellKind::Unsupported => NULL_TOKEN.to_string(),
            CellKind::List | CellKind::Dictionary => self.to_json().to_string(),
            CellKind::Object if options.flatten && !self.in_collection() => {
                self.leaves(options).join(&options.column_separator)
            }
            CellKind::Object => self.to_json().to_string(),
            _ => format_scalar(&self.value, &self.ty),
        }
    }

    /// Serialize wrapped in double quotes for embedding in an outer payload,
    /// optionally doubling embedded quotes.
    #[must_use]
    pub fn serialize_quoted(&self, options: &SerializationOptions, escape: bool) -> String {
        let text = self.serialize(options);
        if escape {
            format!("\"{}\"", text.replace('"', "\"\""))
        } else {
            format!("\"{text}\"")
        }
    }

    /// Whether any ancestor of this cell is a collection element.
    #[must_use]
    pub fn in_collection(&self) -> bool {
        self.source
            .locator()
            .path()
            .iter()
            .any(|s| matches!(s, PathSegment::Index(_) | PathSegment::Key(_)))
    }

    /// JSON form of the cell, built from its sub-table for structured kinds.
    #[must_use]
    pub fn to_json(&self) -> Json {
        match self.kind {
            CellKind::Unsupported => Json::Null,
            CellKind::Object => match self.sub_table().and_then(|t| t.row(1)) {
                Some(row) => row_json(row.cells()),
                None => Json::Null,
            },
            CellKind::List => match self.sub_table() {
                Some(table) => list_json(table),
                None => self.generator.registry().value_to_json(&self.value, &self.ty),
            },
            CellKind::Dictionary => match self.sub_table() {
                Some(table) => dictionary_json(table),
                None => self.generator.registry().value_to_json(&self.value, &self.ty),
            },
            _ => self.generator.registry().value_to_json(&self.value, &self.ty),
        }
    }

    /// Flattened leaf texts: nested objects expand into their fields, a
    /// null nested object into one `null` per leaf.
    #[must_use]
    pub fn leaves(&self, options: &SerializationOptions) -> Vec<String> {
        if self.kind != CellKind::Object {
            return vec![self.serialize(options)];
        }
        let Some(table) = self.sub_table() else {
            return vec![NULL_TOKEN.to_string()];
        };
        match table.row(1) {
            Some(row) => {
                let leaves: Vec<String> = row.cells().flat_map(|c| c.leaves(options)).collect();
                if leaves.is_empty() {
                    vec![NULL_TOKEN.to_string()]
                } else {
                    leaves
                }
            }
            None => vec![NULL_TOKEN.to_string(); self.flat_width()],
        }
    }

    /// Number of leaves this cell occupies in flattened text.
    #[must_use]
    pub fn flat_width(&self) -> usize {
        if self.kind != CellKind::Object {
            return 1;
        }
        let Some(table) = self.sub_table() else {
            return 1;
        };
        let width: usize = match table.row(1) {
            Some(row) => row.cells().map(Cell::flat_width).sum(),
            None => {
                let registry = self.generator.registry();
                table
                    .columns()
                    .map(|c| registry.flattened_width(c.declared_type()))
                    .sum()
            }
        };
        width.max(1)
    }

    /// Header names for the leaves, dot-joined under `prefix`.
    #[must_use]
    pub fn leaf_headers(&self, prefix: &str) -> Vec<String> {
        if self.kind != CellKind::Object {
            return vec![prefix.to_string()];
        }
        let Some(table) = self.sub_table() else {
            return vec![prefix.to_string()];
        };
        let headers: Vec<String> = match table.row(1) {
            Some(row) => row
                .cells()
                .flat_map(|c| c.leaf_headers(&format!("{prefix}.{}", c.field())))
                .collect(),
            None => {
                let registry = self.generator.registry();
                table
                    .columns()
                    .flat_map(|c| type_headers(&format!("{prefix}.{}", c.name()), c.declared_type(), registry))
                    .collect()
            }
        };
        if headers.is_empty() {
            vec![prefix.to_string()]
        } else {
            headers
        }
    }
}

fn type_headers(prefix: &str, ty: &TypeDesc, registry: &crate::types::TypeRegistry) -> Vec<String> {
    let TypeDesc::Object(name) = ty else {
        return vec![prefix.to_string()];
    };
    let headers: Vec<String> = registry
        .fields_of(name)
        .map(|fields| {
            fields
                .iter()
                .flat_map(|f| type_headers(&format!("{prefix}.{}", f.name), &f.ty, registry))
                .collect()
        })
        .unwrap_or_default();
    if headers.is_empty() {
        vec![prefix.to_string()]
    } else {
        headers
    }
}

pub(crate) fn row_json<'a>(cells: impl Iterator<Item = &'a Cell>) -> Json {
    let map: Map<String, Json> = cells
        .map(|cell| (cell.field().to_string(), cell.to_json()))
        .collect();
    Json::Object(map)
}

fn list_json(table: &Table) -> Json {
    let element_is_object = matches!(
        table.collection_type(),
        Some(TypeDesc::List(element)) if matches!(*element, TypeDesc::Object(_))
    );
    let items = table
        .rows()
        .map(|row| {
            if element_is_object {
                if row.source().locator().read(Value::is_null).unwrap_or(true) {
                    Json::Null
                } else {
                    row_json(row.cells())
                }
            } else {
                row.cell(1).map_or(Json::Null, Cell::to_json)
            }
        })
        .collect();
    Json::Array(items)
}

fn dictionary_json(table: &Table) -> Json {
    let key_type = match table.collection_type() {
        Some(TypeDesc::Dictionary(key, _)) => *key,
        _ => TypeDesc::String,
    };
    let map: Map<String, Json> = table
        .rows()
        .filter_map(|row| {
            let key = row.source().as_dict_entry()?.key();
            let value = row
                .cells()
                .find(|c| c.field() == VALUE_COLUMN)
                .map_or(Json::Null, Cell::to_json);
            Some((key_text(&key, &key_type), value))
        })
        .collect();
    Json::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let tsv = SerializationOptions::tsv();
        assert_eq!(tsv.column_separator, "\t");
        assert!(tsv.flatten && !tsv.quote_fields);

        let csv = SerializationOptions::csv();
        assert_eq!(csv.column_separator, ",");
        assert!(csv.quote_fields);

        let json = SerializationOptions::json().with_pretty(true);
        assert!(!json.flatten && json.pretty);
    }

    #[test]
    fn test_key_escape_roundtrip() {
        let key = r#"say "hi""#;
        let escaped = escape_key(key);
        assert!(!escaped.contains('"'));
        assert_eq!(unescape_key(&escaped), key);
    }
}
