//! Applying serialized text or JSON back onto cells.
//!
//! Failures inside one child cell are logged and skipped so the rest of the
//! payload still applies.

use crate::cell::{Cell, CellKind};
use crate::error::{Result, TableError};
use crate::scalar::{parse_scalar, NULL_TOKEN};
use crate::serialize::{unescape_key, SerializationOptions};
use crate::source::VALUE_COLUMN;
use crate::table::Table;
use crate::types::TypeDesc;
use serde_json::{Map, Value as Json};

impl Cell {
    /// Parse text and apply it to the cell.
    ///
    /// Empty text is a no-op and the literal `null` resets the cell. Nested
    /// objects accept a JSON object whose keys all name columns, and fall
    /// back to flattened text otherwise. Collections expect JSON.
    pub fn deserialize(&mut self, text: &str, options: &SerializationOptions) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        if text == NULL_TOKEN {
            return self.clear();
        }
        match self.kind {
            CellKind::Unsupported => Err(TableError::Unsupported(format!(
                "cannot deserialize into field '{}' of type {}",
                self.field, self.ty
            ))),
            CellKind::Object => self.deserialize_object(text, options),
            CellKind::List | CellKind::Dictionary => self.deserialize_collection(text, options),
            _ => {
                let value = parse_scalar(text, &self.ty, self.generator.registry())?;
                self.set_value(value)
            }
        }
    }

    /// Like [`Cell::deserialize`], logging the failure and returning `false`
    /// instead of an error.
    pub fn try_deserialize(&mut self, text: &str, options: &SerializationOptions) -> bool {
        match self.deserialize(text, options) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(cell = %self.global_position(), error = %err, "failed to deserialize cell");
                false
            }
        }
    }

    fn column_names(&self) -> Vec<String> {
        self.sub_table()
            .map(|t| t.columns().map(|c| c.name().to_string()).collect())
            .unwrap_or_default()
    }

    fn deserialize_object(&mut self, text: &str, options: &SerializationOptions) -> Result<()> {
        let trimmed = text.trim();
        if trimmed.starts_with('{') {
            if let Ok(Json::Object(map)) = serde_json::from_str::<Json>(trimmed) {
                let columns = self.column_names();
                if map.keys().all(|k| columns.contains(k)) {
                    return self.apply_json(&Json::Object(map), options);
                }
                tracing::debug!(
                    cell = %self.global_position(),
                    "JSON keys do not match columns, reading as flattened text"
                );
            }
        }
        let values: Vec<Option<&str>> = text
            .split(options.column_separator.as_str())
            .map(Some)
            .collect();
        let mut cursor = 0;
        self.apply_flat(&values, &mut cursor, options)
    }

    fn deserialize_collection(&mut self, text: &str, options: &SerializationOptions) -> Result<()> {
        let trimmed = text.trim();
        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            let json: Json = serde_json::from_str(trimmed)?;
            return self.apply_json(&json, options);
        }
        if self.kind == CellKind::Dictionary {
            return Err(TableError::Parse(format!(
                "dictionary field '{}' expects JSON",
                self.field
            )));
        }
        let items = text
            .split(options.column_separator.as_str())
            .map(|s| {
                if s == NULL_TOKEN {
                    Json::Null
                } else {
                    Json::String(s.to_string())
                }
            })
            .collect();
        self.apply_json(&Json::Array(items), options)
    }

    /// Consume this cell's leaves from positional flattened values. `None`
    /// slots are skipped.
    pub(crate) fn apply_flat(
        &mut self,
        values: &[Option<&str>],
        cursor: &mut usize,
        options: &SerializationOptions,
    ) -> Result<()> {
        if self.kind != CellKind::Object {
            let slot = values.get(*cursor).copied().flatten();
            *cursor += 1;
            return match slot {
                Some(text) => self.deserialize(text, options),
                None => Ok(()),
            };
        }

        let has_row = self.sub_table().is_some_and(|t| t.row_count() > 0);
        if !has_row {
            let width = self.flat_width();
            let start = (*cursor).min(values.len());
            let end = (*cursor + width).min(values.len());
            *cursor += width;
            let slice = &values[start..end];
            let all_empty = slice
                .iter()
                .all(|v| v.map_or(true, |s| s.is_empty() || s == NULL_TOKEN));
            if all_empty || !options.modify_sub_tables {
                return Ok(());
            }
            let default = self.generator.registry().default_value(&self.ty);
            self.set_value(default)?;
            let mut inner = 0;
            return self.apply_flat_children(slice, &mut inner, options);
        }
        self.apply_flat_children(values, cursor, options)
    }

    fn apply_flat_children(
        &mut self,
        values: &[Option<&str>],
        cursor: &mut usize,
        options: &SerializationOptions,
    ) -> Result<()> {
        if let Some(row) = self.sub_table.as_deref_mut().and_then(|t| t.row_mut(1)) {
            for cell in row.cells.values_mut() {
                if let Err(err) = cell.apply_flat(values, cursor, options) {
                    tracing::warn!(cell = %cell.global_position(), error = %err, "skipping field");
                }
            }
        }
        self.reload_value();
        Ok(())
    }

    /// Apply a JSON value to the cell.
    pub fn apply_json(&mut self, json: &Json, options: &SerializationOptions) -> Result<()> {
        if json.is_null() {
            return self.clear();
        }
        match self.kind {
            CellKind::Unsupported => Err(TableError::Unsupported(format!(
                "cannot deserialize into field '{}' of type {}",
                self.field, self.ty
            ))),
            CellKind::Object => self.apply_json_object(json, options),
            CellKind::List => self.apply_json_list(json, options),
            CellKind::Dictionary => self.apply_json_dictionary(json, options),
            _ => {
                let value = self.generator.registry().value_from_json(json, &self.ty)?;
                self.set_value(value)
            }
        }
    }

    fn apply_json_object(&mut self, json: &Json, options: &SerializationOptions) -> Result<()> {
        let map = match json {
            Json::Object(map) => map,
            Json::String(text) => return self.deserialize(text, options),
            other => {
                return Err(TableError::TypeMismatch {
                    expected: self.ty.to_string(),
                    actual: other.to_string(),
                })
            }
        };

        let has_row = self.sub_table().is_some_and(|t| t.row_count() > 0);
        if !has_row {
            let value = self.generator.registry().value_from_json(json, &self.ty)?;
            return self.set_value(value);
        }

        if let Some(table) = self.sub_table.as_deref_mut() {
            apply_json_fields(table, 1, map, options);
        }
        self.reload_value();
        Ok(())
    }

    fn apply_json_list(&mut self, json: &Json, options: &SerializationOptions) -> Result<()> {
        let items = match json {
            Json::Array(items) => items.clone(),
            Json::String(text) => return self.deserialize(text, options),
            other => vec![other.clone()],
        };
        let element_is_object = matches!(&self.ty, TypeDesc::List(e) if matches!(**e, TypeDesc::Object(_)));

        let Some(table) = self.sub_table.as_deref_mut() else {
            return Err(TableError::Unsupported(format!(
                "list field '{}' has no sub-table",
                self.field
            )));
        };
        if options.modify_sub_tables {
            resize(table, items.len())?;
        }

        let count = table.row_count().min(items.len());
        for (i, item) in items.iter().take(count).enumerate() {
            let position = i + 1;
            if element_is_object {
                match item {
                    Json::Object(map) => apply_json_fields(table, position, map, options),
                    Json::Array(values) => {
                        if let Some(row) = table.row_mut(position) {
                            for (cell, value) in row.cells.values_mut().zip(values) {
                                if let Err(err) = cell.apply_json(value, options) {
                                    tracing::warn!(cell = %cell.global_position(), error = %err, "skipping field");
                                }
                            }
                        }
                    }
                    other => {
                        tracing::warn!(position, value = %other, "list element is not an object, skipping");
                    }
                }
            } else if let Some(cell) = table.cell_mut(1, position) {
                if let Err(err) = cell.apply_json(item, options) {
                    tracing::warn!(cell = %cell.global_position(), error = %err, "skipping element");
                }
            }
        }
        self.reload_value();
        Ok(())
    }

    fn apply_json_dictionary(&mut self, json: &Json, options: &SerializationOptions) -> Result<()> {
        let TypeDesc::Dictionary(key_ty, _) = &self.ty else {
            return Err(TableError::TypeMismatch {
                expected: "dictionary".to_string(),
                actual: self.ty.to_string(),
            });
        };
        let key_ty = key_ty.as_ref().clone();

        let entries: Vec<(String, Json)> = match json {
            Json::Object(map) => map
                .iter()
                .map(|(k, v)| (unescape_key(k), v.clone()))
                .collect(),
            Json::String(text) => return self.deserialize(text, options),
            Json::Array(_) => {
                let value = self.generator.registry().value_from_json(json, &self.ty)?;
                return if options.modify_sub_tables {
                    self.set_value(value)
                } else {
                    Err(TableError::Unsupported(
                        "dictionary pairs can only replace the whole dictionary".into(),
                    ))
                };
            }
            other => {
                return Err(TableError::TypeMismatch {
                    expected: self.ty.to_string(),
                    actual: other.to_string(),
                })
            }
        };

        if options.modify_sub_tables {
            let map: Map<String, Json> = entries.into_iter().collect();
            let value = self
                .generator
                .registry()
                .value_from_json(&Json::Object(map), &self.ty)?;
            return self.set_value(value);
        }

        let registry = self.generator.registry();
        let mut updates = Vec::new();
        for (text, value) in entries {
            match parse_scalar(&text, &key_ty, registry) {
                Ok(key) => updates.push((key, value)),
                Err(err) => tracing::warn!(key = %text, error = %err, "skipping dictionary key"),
            }
        }
        if let Some(table) = self.sub_table.as_deref_mut() {
            for (key, value) in updates {
                let position = table
                    .rows()
                    .find(|row| row.source().as_dict_entry().is_some_and(|e| e.key() == key))
                    .map(|row| row.position());
                let Some(position) = position else {
                    tracing::warn!(key = %key, "key not present, dictionary left unchanged");
                    continue;
                };
                let column = table.column_by_name(VALUE_COLUMN).map(|c| c.position());
                if let Some(cell) = column.and_then(|c| table.cell_mut(c, position)) {
                    if let Err(err) = cell.apply_json(&value, options) {
                        tracing::warn!(key = %key, error = %err, "skipping dictionary value");
                    }
                }
            }
        }
        self.reload_value();
        Ok(())
    }
}

/// Apply a JSON object to the cells of one row by column name.
pub(crate) fn apply_json_fields(
    table: &mut Table,
    position: usize,
    map: &Map<String, Json>,
    options: &SerializationOptions,
) {
    for (name, value) in map {
        let Some(column) = table.column_by_name(name).map(|c| c.position()) else {
            tracing::warn!(table = %table.name(), column = %name, "unknown column, skipping");
            continue;
        };
        if let Some(cell) = table.cell_mut(column, position) {
            if let Err(err) = cell.apply_json(value, options) {
                tracing::warn!(cell = %cell.global_position(), error = %err, "skipping field");
            }
        }
    }
}

/// Grow or shrink a collection-backed table to `count` rows.
pub(crate) fn resize(table: &mut Table, count: usize) -> Result<()> {
    while table.row_count() > count {
        table.remove_item(table.row_count())?;
    }
    while table.row_count() < count {
        table.add_empty_item()?;
    }
    Ok(())
}
