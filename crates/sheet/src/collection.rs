//! Element-level editing of collection-backed tables.
//!
//! Every operation keeps the live collection and the table rows in lockstep:
//! one element added or removed means exactly one row added or removed.

use crate::error::{Result, TableError};
use crate::source::{DictEntrySource, ListItemSource};
use crate::table::{Backing, Table};
use crate::types::{TypeDesc, TypeRegistry};
use crate::value::{EnumValue, Value};
use std::rc::Rc;

/// Candidate keys probed when a dictionary needs a fresh default key.
const MAX_KEY_PROBES: usize = 10_000;

impl Table {
    /// Append an element. On a dictionary the element becomes the value of
    /// the first unused default key.
    pub fn add_item(&mut self, item: Value) -> Result<usize> {
        match self.backing.clone() {
            Backing::List { locator, element } => {
                let item = self.generator().registry().coerce(item, &element)?;
                let index = locator.write(|value| {
                    let kind = value.kind_name();
                    let items = value.as_list_mut().ok_or_else(|| TableError::TypeMismatch {
                        expected: "list".to_string(),
                        actual: kind.to_string(),
                    })?;
                    items.push(item);
                    Ok(items.len() - 1)
                })?;
                let source = ListItemSource::new(&locator, index, element);
                self.add_row(Rc::new(source))
            }
            Backing::Dictionary { locator, key, .. } => {
                let existing = locator.get()?;
                let new_key = free_key(&key, &existing, self.generator().registry())?;
                self.add_entry(new_key, item)
            }
            Backing::Plain => Err(self.not_a_collection()),
        }
    }

    /// Append a dictionary entry; a key already present is an
    /// invalid-cell-value error and nothing changes.
    pub fn add_entry(&mut self, key: Value, value: Value) -> Result<usize> {
        let Backing::Dictionary {
            locator,
            key: key_ty,
            value: value_ty,
        } = self.backing.clone()
        else {
            return Err(self.not_a_collection());
        };
        let registry = self.generator().registry();
        let key = registry.coerce(key, &key_ty)?;
        let value = registry.coerce(value, &value_ty)?;

        locator.write(|target| {
            let kind = target.kind_name();
            let entries = target
                .as_dictionary_mut()
                .ok_or_else(|| TableError::TypeMismatch {
                    expected: "dictionary".to_string(),
                    actual: kind.to_string(),
                })?;
            if entries.iter().any(|(k, _)| *k == key) {
                return Err(TableError::invalid_value(format!(
                    "Duplicate dictionary key '{key}'"
                )));
            }
            entries.push((key.clone(), value));
            Ok(())
        })?;
        let source = DictEntrySource::new(&locator, key, key_ty, value_ty);
        self.add_row(Rc::new(source))
    }

    /// Append a default element.
    pub fn add_empty_item(&mut self) -> Result<usize> {
        let item = match &self.backing {
            Backing::List { element, .. } => default_item(element, self.generator().registry()),
            Backing::Dictionary { value, .. } => default_item(value, self.generator().registry()),
            Backing::Plain => return Err(self.not_a_collection()),
        };
        self.add_item(item)
    }

    /// Remove the element behind a 1-based row position.
    pub fn remove_item(&mut self, position: usize) -> Result<()> {
        if !self.is_collection() {
            return Err(self.not_a_collection());
        }
        self.remove_row(position)
    }

    /// Snapshot of the live collection.
    pub fn get_items(&self) -> Result<Value> {
        let (locator, _) = self.collection_binding()?;
        locator.get()
    }

    /// Number of elements in the live collection.
    pub fn item_count(&self) -> Result<usize> {
        let (locator, _) = self.collection_binding()?;
        Ok(locator.read(Value::item_count)?.unwrap_or(0))
    }

    fn not_a_collection(&self) -> TableError {
        TableError::Unsupported(format!(
            "table '{}' is not backed by a collection",
            self.name()
        ))
    }
}

fn default_item(ty: &TypeDesc, registry: &TypeRegistry) -> Value {
    registry.default_value(ty)
}

/// First key of the declared type not already used by `existing`.
fn free_key(ty: &TypeDesc, existing: &Value, registry: &TypeRegistry) -> Result<Value> {
    let used: Vec<&Value> = existing
        .as_dictionary()
        .map(|entries| entries.iter().map(|(k, _)| k).collect())
        .unwrap_or_default();
    let is_free = |candidate: &Value| !used.contains(&candidate);

    let candidates: Box<dyn Iterator<Item = Value>> = match ty {
        TypeDesc::String => Box::new(
            std::iter::once(Value::String(String::new()))
                .chain((1..MAX_KEY_PROBES).map(|i| Value::String(i.to_string()))),
        ),
        TypeDesc::Int(crate::types::IntKind::U64) => {
            Box::new((0..MAX_KEY_PROBES as u64).map(Value::UInt))
        }
        TypeDesc::Int(kind) => {
            let (_, max) = kind.bounds();
            Box::new((0..=max.min(MAX_KEY_PROBES as i64)).map(Value::Int))
        }
        TypeDesc::Bool => Box::new([Value::Bool(false), Value::Bool(true)].into_iter()),
        TypeDesc::Char => Box::new(('a'..='z').map(Value::Char)),
        TypeDesc::Enum(name) => {
            let variants: Vec<Value> = registry
                .enum_type(name)
                .map(|e| {
                    e.variants
                        .iter()
                        .map(|(variant, d)| Value::Enum(EnumValue::new(variant.clone(), *d)))
                        .collect()
                })
                .unwrap_or_default();
            Box::new(variants.into_iter())
        }
        other => {
            return Err(TableError::Unsupported(format!(
                "cannot pick a default key of type {other}"
            )))
        }
    };

    candidates
        .into_iter()
        .find(is_free)
        .ok_or_else(|| TableError::invalid_value(format!("no unused key of type {ty} left")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EnumType, IntKind};

    #[test]
    fn test_free_key_sequences() {
        let reg = {
            let mut reg = TypeRegistry::new();
            reg.register_enum(EnumType::new("Side", ["Left", "Right"]));
            reg
        };
        let dict = Value::Dictionary(vec![
            (Value::from(""), Value::Null),
            (Value::from("1"), Value::Null),
        ]);
        assert_eq!(free_key(&TypeDesc::String, &dict, &reg).unwrap(), Value::from("2"));

        let ints = Value::Dictionary(vec![(Value::Int(0), Value::Null)]);
        assert_eq!(
            free_key(&TypeDesc::Int(IntKind::I32), &ints, &reg).unwrap(),
            Value::Int(1)
        );

        let sides = Value::Dictionary(vec![
            (Value::Enum(EnumValue::new("Left", 0)), Value::Null),
            (Value::Enum(EnumValue::new("Right", 1)), Value::Null),
        ]);
        assert!(free_key(&TypeDesc::Enum("Side".into()), &sides, &reg)
            .unwrap_err()
            .is_invalid_cell_value());
        assert!(free_key(&TypeDesc::Color, &sides, &reg).is_err());
    }
}
