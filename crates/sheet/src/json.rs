//! Whole-table JSON: `{"items":[{"guid", "path", "properties"}]}`.

use crate::deserialize::{apply_json_fields, resize};
use crate::error::{Result, TableError};
use crate::serialize::{row_json, SerializationOptions};
use crate::table::Table;
use serde_json::{Map, Value as Json};
use std::fs;
use std::path::Path;

const ITEMS_KEY: &str = "items";
const GUID_KEY: &str = "guid";
const PATH_KEY: &str = "path";
const PROPERTIES_KEY: &str = "properties";

impl Table {
    /// JSON document with one item per row. Rows over root objects carry the
    /// root's GUID and asset path.
    #[must_use]
    pub fn to_json_value(&self) -> Json {
        let items = self
            .rows()
            .map(|row| {
                let mut item = Map::new();
                let source = row.source();
                if source.locator().parent().is_none() {
                    let root = source.root();
                    item.insert(GUID_KEY.to_string(), Json::String(root.guid().to_string()));
                    if let Some(path) = root.path() {
                        item.insert(PATH_KEY.to_string(), Json::String(path.to_string()));
                    }
                }
                item.insert(PROPERTIES_KEY.to_string(), row_json(row.cells()));
                Json::Object(item)
            })
            .collect();

        let mut doc = Map::new();
        doc.insert(ITEMS_KEY.to_string(), Json::Array(items));
        Json::Object(doc)
    }

    pub fn to_json_string(&self, options: &SerializationOptions) -> Result<String> {
        let doc = self.to_json_value();
        let text = if options.pretty {
            serde_json::to_string_pretty(&doc)?
        } else {
            serde_json::to_string(&doc)?
        };
        Ok(text)
    }

    /// Apply a JSON document to the table.
    ///
    /// Accepts the `items` document or a bare array of items. Items with a
    /// `guid` apply to the row over that root; others apply by position.
    /// Items without `properties` are treated as property maps themselves.
    pub fn import_json(&mut self, text: &str, options: &SerializationOptions) -> Result<()> {
        let doc: Json = serde_json::from_str(text.trim())?;
        self.import_json_value(&doc, options)
    }

    pub fn import_json_value(&mut self, doc: &Json, options: &SerializationOptions) -> Result<()> {
        let items = match doc {
            Json::Object(map) => match map.get(ITEMS_KEY) {
                Some(Json::Array(items)) => items.clone(),
                Some(other) => {
                    return Err(TableError::Parse(format!(
                        "'{ITEMS_KEY}' must be an array, got {other}"
                    )))
                }
                None => vec![doc.clone()],
            },
            Json::Array(items) => items.clone(),
            other => {
                return Err(TableError::Parse(format!(
                    "expected a JSON object or array, got {other}"
                )))
            }
        };

        if self.is_collection() && options.modify_sub_tables {
            resize(self, items.len())?;
        }

        for (i, item) in items.iter().enumerate() {
            let position = match item.get(GUID_KEY).and_then(Json::as_str) {
                Some(guid) => match self.row_for_guid(guid) {
                    Some(position) => position,
                    None => {
                        tracing::warn!(guid, "no row for item, skipping");
                        continue;
                    }
                },
                None => i + 1,
            };
            if self.row(position).is_none() {
                tracing::warn!(table = %self.name(), position, "no row for item, skipping");
                continue;
            }

            let properties = match item.get(PROPERTIES_KEY) {
                Some(Json::Object(map)) => map,
                Some(_) | None => match item {
                    Json::Object(map) => map,
                    other => {
                        if let Some(cell) = self.cell_mut(1, position) {
                            if let Err(err) = cell.apply_json(other, options) {
                                tracing::warn!(position, error = %err, "skipping item");
                            }
                        }
                        continue;
                    }
                },
            };
            apply_json_fields(self, position, properties, options);
        }
        Ok(())
    }

    fn row_for_guid(&self, guid: &str) -> Option<usize> {
        self.rows()
            .find(|row| {
                let source = row.source();
                source.locator().parent().is_none() && source.root().guid().to_string() == guid
            })
            .map(|row| row.position())
    }

    /// Write the JSON document to a file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P, options: &SerializationOptions) -> Result<()> {
        fs::write(path, self.to_json_string(options)?)?;
        Ok(())
    }

    /// Serialize with the format the options select: flattened text when
    /// `flatten` is set, the JSON document otherwise.
    pub fn export(&self, options: &SerializationOptions) -> Result<String> {
        if options.flatten {
            self.to_delimited(options)
        } else {
            self.to_json_string(options)
        }
    }

    /// Apply a payload, detecting JSON by a leading `{` or `[`.
    ///
    /// A flattened row may begin with a collection field, so with `flatten`
    /// set only a table document is read as JSON. Anything else, including
    /// text that does not parse, is read as delimited text.
    pub fn import(&mut self, text: &str, options: &SerializationOptions) -> Result<()> {
        let trimmed = text.trim();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            match serde_json::from_str::<Json>(trimmed) {
                Ok(doc) if !options.flatten || is_table_document(&doc) => {
                    return self.import_json_value(&doc, options);
                }
                Ok(_) => {
                    tracing::debug!("payload is not a table document, reading as delimited text");
                }
                Err(err) => {
                    tracing::debug!(error = %err, "payload is not JSON, reading as delimited text");
                }
            }
        }
        self.import_delimited(text, options)
    }
}

/// An `items` document, or a non-empty array of items that each carry
/// `properties` or a `guid`.
fn is_table_document(doc: &Json) -> bool {
    match doc {
        Json::Object(map) => map.contains_key(ITEMS_KEY),
        Json::Array(items) => {
            !items.is_empty()
                && items
                    .iter()
                    .all(|item| item.get(PROPERTIES_KEY).is_some() || item.get(GUID_KEY).is_some())
        }
        _ => false,
    }
}
