//! Value sources: uniform get/set access to fields of live object graphs.
//!
//! A [`SourceRoot`] owns one root value tree. Adapters never hold references
//! into that tree; they hold a [`Locator`], a chain of path segments resolved
//! on every access. Renumbering a list row or renaming a dictionary key only
//! updates one segment, and every adapter below it follows automatically.

use crate::error::{Result, TableError};
use crate::types::{TypeDesc, TypeRegistry};
use crate::value::Value;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use uuid::Uuid;

/// Pseudo-column exposing a simple list element directly.
pub const VALUES_COLUMN: &str = "Values";
/// Pseudo-column exposing a dictionary entry's key.
pub const KEY_COLUMN: &str = "Key";
/// Pseudo-column exposing a dictionary entry's value.
pub const VALUE_COLUMN: &str = "Value";

/// One step from a value to one of its children.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
    Key(Value),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, ".{name}"),
            PathSegment::Index(i) => write!(f, "[{i}]"),
            PathSegment::Key(key) => write!(f, "[{key}]"),
        }
    }
}

/// Notification sent to observers after a write through a source.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub root: Uuid,
    pub path: Vec<PathSegment>,
}

type Observer = Rc<dyn Fn(&ChangeEvent)>;

/// An owned root object plus the bookkeeping the host needs: a stable GUID,
/// an optional asset path, a dirty flag, and change observers.
pub struct SourceRoot {
    guid: Uuid,
    path: Option<String>,
    data: RefCell<Value>,
    dirty: Cell<bool>,
    observers: RefCell<Vec<Observer>>,
}

pub type RootRef = Rc<SourceRoot>;

impl fmt::Debug for SourceRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRoot")
            .field("guid", &self.guid)
            .field("path", &self.path)
            .field("dirty", &self.dirty.get())
            .finish_non_exhaustive()
    }
}

impl SourceRoot {
    /// Wrap a value under a fresh random GUID.
    pub fn new(value: Value) -> RootRef {
        Self::with_guid(Uuid::new_v4(), None, value)
    }

    pub fn with_guid(guid: Uuid, path: Option<String>, value: Value) -> RootRef {
        Rc::new(SourceRoot {
            guid,
            path,
            data: RefCell::new(value),
            dirty: Cell::new(false),
            observers: RefCell::new(Vec::new()),
        })
    }

    #[must_use]
    pub fn guid(&self) -> Uuid {
        self.guid
    }

    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Snapshot of the whole value tree.
    #[must_use]
    pub fn value(&self) -> Value {
        self.data.borrow().clone()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn clear_dirty(&self) {
        self.dirty.set(false);
    }

    /// Register a callback invoked after every write below this root.
    pub fn subscribe(&self, observer: impl Fn(&ChangeEvent) + 'static) {
        self.observers.borrow_mut().push(Rc::new(observer));
    }

    fn mark_dirty(&self, path: Vec<PathSegment>) {
        if !self.dirty.get() {
            tracing::trace!(root = %self.guid, "marking source dirty");
            self.dirty.set(true);
        }
        let observers: Vec<Observer> = self.observers.borrow().clone();
        if observers.is_empty() {
            return;
        }
        let event = ChangeEvent {
            root: self.guid,
            path,
        };
        for observer in observers {
            observer(&event);
        }
    }
}

/// A resolvable path from a root to one value in its tree.
pub struct Locator {
    root: RootRef,
    parent: Option<Rc<Locator>>,
    segment: RefCell<Option<PathSegment>>,
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Locator({}", self.root.guid)?;
        for segment in self.path() {
            write!(f, "{segment}")?;
        }
        write!(f, ")")
    }
}

impl Locator {
    /// Locator for the root value itself.
    pub fn root(root: &RootRef) -> Rc<Locator> {
        Rc::new(Locator {
            root: Rc::clone(root),
            parent: None,
            segment: RefCell::new(None),
        })
    }

    pub fn child(parent: &Rc<Locator>, segment: PathSegment) -> Rc<Locator> {
        Rc::new(Locator {
            root: Rc::clone(&parent.root),
            parent: Some(Rc::clone(parent)),
            segment: RefCell::new(Some(segment)),
        })
    }

    #[must_use]
    pub fn source_root(&self) -> &RootRef {
        &self.root
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Rc<Locator>> {
        self.parent.as_ref()
    }

    #[must_use]
    pub fn segment(&self) -> Option<PathSegment> {
        self.segment.borrow().clone()
    }

    pub fn set_segment(&self, segment: PathSegment) {
        *self.segment.borrow_mut() = Some(segment);
    }

    /// Full path from the root, outermost segment first.
    #[must_use]
    pub fn path(&self) -> Vec<PathSegment> {
        let mut segments = Vec::new();
        let mut current = Some(self);
        while let Some(loc) = current {
            if let Some(segment) = loc.segment.borrow().clone() {
                segments.push(segment);
            }
            current = loc.parent.as_deref();
        }
        segments.reverse();
        segments
    }

    /// Run `f` against the located value.
    pub fn read<R>(&self, f: impl FnOnce(&Value) -> R) -> Result<R> {
        let path = self.path();
        let data = self.root.data.borrow();
        let value = navigate(&data, &path)?;
        Ok(f(value))
    }

    /// Clone of the located value.
    pub fn get(&self) -> Result<Value> {
        self.read(Value::clone)
    }

    /// Mutate the located value, then mark the root dirty and notify.
    pub fn write<R>(&self, f: impl FnOnce(&mut Value) -> Result<R>) -> Result<R> {
        let path = self.path();
        let result = {
            let mut data = self.root.data.borrow_mut();
            let value = navigate_mut(&mut data, &path)?;
            f(value)?
        };
        self.root.mark_dirty(path);
        Ok(result)
    }

    /// Whether two locators resolve to the same place.
    #[must_use]
    pub fn same_target(&self, other: &Locator) -> bool {
        Rc::ptr_eq(&self.root, &other.root) && self.path() == other.path()
    }
}

fn navigate<'a>(mut value: &'a Value, path: &[PathSegment]) -> Result<&'a Value> {
    for segment in path {
        value = match (value, segment) {
            (Value::Object(obj), PathSegment::Field(name)) => {
                obj.get(name).ok_or_else(|| TableError::FieldNotFound {
                    field: name.clone(),
                    owner: obj.type_name.clone(),
                })?
            }
            (Value::List(items), PathSegment::Index(i)) => {
                items.get(*i).ok_or_else(|| TableError::RowNotFound {
                    position: i + 1,
                    count: items.len(),
                })?
            }
            (Value::Dictionary(entries), PathSegment::Key(key)) => entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v)
                .ok_or_else(|| TableError::CellNotFound(format!("dictionary key '{key}'")))?,
            (other, segment) => {
                return Err(TableError::TypeMismatch {
                    expected: format!("container for {segment}"),
                    actual: other.kind_name().to_string(),
                })
            }
        };
    }
    Ok(value)
}

fn navigate_mut<'a>(mut value: &'a mut Value, path: &[PathSegment]) -> Result<&'a mut Value> {
    for segment in path {
        value = match (value, segment) {
            (Value::Object(obj), PathSegment::Field(name)) => {
                let owner = obj.type_name.clone();
                obj.get_mut(name).ok_or_else(|| TableError::FieldNotFound {
                    field: name.clone(),
                    owner,
                })?
            }
            (Value::List(items), PathSegment::Index(i)) => {
                let count = items.len();
                items.get_mut(*i).ok_or(TableError::RowNotFound {
                    position: i + 1,
                    count,
                })?
            }
            (Value::Dictionary(entries), PathSegment::Key(key)) => entries
                .iter_mut()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v)
                .ok_or_else(|| TableError::CellNotFound(format!("dictionary key '{key}'")))?,
            (other, segment) => {
                return Err(TableError::TypeMismatch {
                    expected: format!("container for {segment}"),
                    actual: other.kind_name().to_string(),
                })
            }
        };
    }
    Ok(value)
}

/// Shape of one column a source contributes to its row.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub ty: TypeDesc,
    pub is_static: bool,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, ty: TypeDesc) -> Self {
        Self {
            name: name.into(),
            ty,
            is_static: false,
        }
    }

    #[must_use]
    pub fn fixed(mut self) -> Self {
        self.is_static = true;
        self
    }
}

/// Uniform access to the fields of one row's backing value.
pub trait SerializedObject: fmt::Debug {
    fn locator(&self) -> &Rc<Locator>;

    fn root(&self) -> &RootRef {
        self.locator().source_root()
    }

    /// Declared type of the wrapped value.
    fn target_type(&self) -> TypeDesc;

    /// Columns this source produces, in order.
    fn column_specs(&self, registry: &TypeRegistry) -> Result<Vec<ColumnSpec>>;

    fn type_of(&self, field: &str, registry: &TypeRegistry) -> Option<TypeDesc> {
        self.column_specs(registry)
            .ok()?
            .into_iter()
            .find(|spec| spec.name == field)
            .map(|spec| spec.ty)
    }

    fn get(&self, field: &str) -> Result<Value>;

    fn set(&self, field: &str, value: Value, registry: &TypeRegistry) -> Result<()>;

    /// Locator of a field's value, used as the parent of nested sources.
    fn field_locator(&self, field: &str) -> Rc<Locator>;

    /// Display name of the row this source backs.
    fn row_name(&self) -> String;

    /// List element sources support in-place reordering.
    fn as_list_item(&self) -> Option<&ListItemSource> {
        None
    }

    fn as_dict_entry(&self) -> Option<&DictEntrySource> {
        None
    }
}

pub type SourceRef = Rc<dyn SerializedObject>;

fn object_field(value: &Value, field: &str) -> Result<Value> {
    let obj = value.as_object().ok_or_else(|| TableError::TypeMismatch {
        expected: "object".to_string(),
        actual: value.kind_name().to_string(),
    })?;
    obj.get(field)
        .cloned()
        .ok_or_else(|| TableError::FieldNotFound {
            field: field.to_string(),
            owner: obj.type_name.clone(),
        })
}

fn write_object_field(
    locator: &Locator,
    field: &str,
    value: Value,
    registry: &TypeRegistry,
) -> Result<()> {
    locator.write(|target| {
        let kind = target.kind_name();
        let obj = target.as_object_mut().ok_or_else(|| TableError::TypeMismatch {
            expected: "object".to_string(),
            actual: kind.to_string(),
        })?;
        let ty = registry
            .field_type(&obj.type_name, field)
            .ok_or_else(|| TableError::FieldNotFound {
                field: field.to_string(),
                owner: obj.type_name.clone(),
            })?;
        let value = registry.coerce(value, &ty)?;
        obj.fields.insert(field.to_string(), value);
        Ok(())
    })
}

fn object_columns(type_name: &str, registry: &TypeRegistry) -> Result<Vec<ColumnSpec>> {
    Ok(registry
        .fields_of(type_name)?
        .into_iter()
        .map(|f| ColumnSpec::new(f.name, f.ty))
        .collect())
}

/// Source over a whole object: one column per declared field.
#[derive(Debug)]
pub struct ObjectSource {
    locator: Rc<Locator>,
    type_override: Option<String>,
    name: String,
}

impl ObjectSource {
    pub fn new(locator: Rc<Locator>, name: impl Into<String>) -> Self {
        Self {
            locator,
            type_override: None,
            name: name.into(),
        }
    }

    /// Source over a root object.
    pub fn from_root(root: &RootRef, name: impl Into<String>) -> Self {
        Self::new(Locator::root(root), name)
    }

    /// Present the object through the fields of a base type so siblings of
    /// different derived types share one column layout.
    #[must_use]
    pub fn with_type_override(mut self, type_name: impl Into<String>) -> Self {
        self.type_override = Some(type_name.into());
        self
    }

    fn type_name(&self) -> Option<String> {
        self.type_override.clone().or_else(|| {
            self.locator
                .read(|v| v.as_object().map(|o| o.type_name.clone()))
                .ok()
                .flatten()
        })
    }
}

impl SerializedObject for ObjectSource {
    fn locator(&self) -> &Rc<Locator> {
        &self.locator
    }

    fn target_type(&self) -> TypeDesc {
        match self.type_name() {
            Some(name) => TypeDesc::Object(name),
            None => TypeDesc::Other("null".to_string()),
        }
    }

    fn column_specs(&self, registry: &TypeRegistry) -> Result<Vec<ColumnSpec>> {
        let name = self
            .type_name()
            .ok_or_else(|| TableError::Unsupported("object source over a null value".into()))?;
        object_columns(&name, registry)
    }

    fn get(&self, field: &str) -> Result<Value> {
        self.locator.read(|v| object_field(v, field))?
    }

    fn set(&self, field: &str, value: Value, registry: &TypeRegistry) -> Result<()> {
        write_object_field(&self.locator, field, value, registry)
    }

    fn field_locator(&self, field: &str) -> Rc<Locator> {
        Locator::child(&self.locator, PathSegment::Field(field.to_string()))
    }

    fn row_name(&self) -> String {
        self.name.clone()
    }
}

/// Source over one slot of a list.
#[derive(Debug)]
pub struct ListItemSource {
    locator: Rc<Locator>,
    element: TypeDesc,
}

impl ListItemSource {
    /// `list` locates the list itself; the new source points at `index`.
    pub fn new(list: &Rc<Locator>, index: usize, element: TypeDesc) -> Self {
        Self {
            locator: Locator::child(list, PathSegment::Index(index)),
            element,
        }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        match self.locator.segment() {
            Some(PathSegment::Index(i)) => i,
            _ => 0,
        }
    }

    pub fn set_index(&self, index: usize) {
        self.locator.set_segment(PathSegment::Index(index));
    }

    #[must_use]
    pub fn element_type(&self) -> &TypeDesc {
        &self.element
    }

    fn exposes_fields(&self) -> bool {
        matches!(self.element, TypeDesc::Object(_))
    }

    /// Swap the two live slots and the slots each source points at, so each
    /// source keeps following the element it wrapped before the swap.
    pub fn swap_with(&self, other: &ListItemSource) -> Result<()> {
        let (Some(list), Some(other_list)) = (self.locator.parent(), other.locator.parent()) else {
            return Err(TableError::Unsupported("list item without a list".into()));
        };
        if !list.same_target(other_list) {
            return Err(TableError::Unsupported(
                "cannot swap items of different lists".into(),
            ));
        }

        let (a, b) = (self.index(), other.index());
        list.write(|value| {
            let kind = value.kind_name();
            let items = value.as_list_mut().ok_or_else(|| TableError::TypeMismatch {
                expected: "list".to_string(),
                actual: kind.to_string(),
            })?;
            if a >= items.len() || b >= items.len() {
                return Err(TableError::RowNotFound {
                    position: a.max(b) + 1,
                    count: items.len(),
                });
            }
            items.swap(a, b);
            Ok(())
        })?;
        self.set_index(b);
        other.set_index(a);
        Ok(())
    }
}

impl SerializedObject for ListItemSource {
    fn locator(&self) -> &Rc<Locator> {
        &self.locator
    }

    fn target_type(&self) -> TypeDesc {
        self.element.clone()
    }

    fn column_specs(&self, registry: &TypeRegistry) -> Result<Vec<ColumnSpec>> {
        match &self.element {
            TypeDesc::Object(name) => object_columns(name, registry),
            other => Ok(vec![ColumnSpec::new(VALUES_COLUMN, other.clone())]),
        }
    }

    fn get(&self, field: &str) -> Result<Value> {
        if self.exposes_fields() {
            self.locator.read(|v| object_field(v, field))?
        } else if field == VALUES_COLUMN {
            self.locator.get()
        } else {
            Err(TableError::FieldNotFound {
                field: field.to_string(),
                owner: self.element.to_string(),
            })
        }
    }

    fn set(&self, field: &str, value: Value, registry: &TypeRegistry) -> Result<()> {
        if self.exposes_fields() {
            return write_object_field(&self.locator, field, value, registry);
        }
        if field != VALUES_COLUMN {
            return Err(TableError::FieldNotFound {
                field: field.to_string(),
                owner: self.element.to_string(),
            });
        }
        let value = registry.coerce(value, &self.element)?;
        self.locator.write(|slot| {
            *slot = value;
            Ok(())
        })
    }

    fn field_locator(&self, field: &str) -> Rc<Locator> {
        if self.exposes_fields() {
            Locator::child(&self.locator, PathSegment::Field(field.to_string()))
        } else {
            Rc::clone(&self.locator)
        }
    }

    fn row_name(&self) -> String {
        self.index().to_string()
    }

    fn as_list_item(&self) -> Option<&ListItemSource> {
        Some(self)
    }
}

/// Source over one key/value entry of a dictionary.
#[derive(Debug)]
pub struct DictEntrySource {
    locator: Rc<Locator>,
    key_type: TypeDesc,
    value_type: TypeDesc,
}

impl DictEntrySource {
    /// `dict` locates the dictionary itself; the new source points at `key`.
    pub fn new(dict: &Rc<Locator>, key: Value, key_type: TypeDesc, value_type: TypeDesc) -> Self {
        Self {
            locator: Locator::child(dict, PathSegment::Key(key)),
            key_type,
            value_type,
        }
    }

    #[must_use]
    pub fn key(&self) -> Value {
        match self.locator.segment() {
            Some(PathSegment::Key(key)) => key,
            _ => Value::Null,
        }
    }

    /// Rename this entry's key in place.
    ///
    /// Fails with an invalid-cell-value error if another entry already uses
    /// the new key; re-affirming the current key is a no-op.
    pub fn rename_key(&self, new_key: Value, registry: &TypeRegistry) -> Result<()> {
        let new_key = registry.coerce(new_key, &self.key_type)?;
        let old_key = self.key();
        if new_key == old_key {
            return Ok(());
        }
        let Some(dict) = self.locator.parent() else {
            return Err(TableError::Unsupported("dictionary entry without a dictionary".into()));
        };

        dict.write(|value| {
            let kind = value.kind_name();
            let entries = value
                .as_dictionary_mut()
                .ok_or_else(|| TableError::TypeMismatch {
                    expected: "dictionary".to_string(),
                    actual: kind.to_string(),
                })?;
            if entries.iter().any(|(k, _)| *k == new_key) {
                return Err(TableError::invalid_value(format!(
                    "Duplicate dictionary key '{new_key}'"
                )));
            }
            let entry = entries
                .iter_mut()
                .find(|(k, _)| *k == old_key)
                .ok_or_else(|| TableError::CellNotFound(format!("dictionary key '{old_key}'")))?;
            entry.0 = new_key.clone();
            Ok(())
        })?;

        self.locator.set_segment(PathSegment::Key(new_key));
        Ok(())
    }
}

impl SerializedObject for DictEntrySource {
    fn locator(&self) -> &Rc<Locator> {
        &self.locator
    }

    fn target_type(&self) -> TypeDesc {
        TypeDesc::dictionary(self.key_type.clone(), self.value_type.clone())
    }

    fn column_specs(&self, _registry: &TypeRegistry) -> Result<Vec<ColumnSpec>> {
        let key_type = if self.key_type.is_simple() {
            self.key_type.clone()
        } else {
            TypeDesc::Other(self.key_type.to_string())
        };
        Ok(vec![
            ColumnSpec::new(KEY_COLUMN, key_type).fixed(),
            ColumnSpec::new(VALUE_COLUMN, self.value_type.clone()).fixed(),
        ])
    }

    fn get(&self, field: &str) -> Result<Value> {
        match field {
            KEY_COLUMN => Ok(self.key()),
            VALUE_COLUMN => self.locator.get(),
            _ => Err(TableError::FieldNotFound {
                field: field.to_string(),
                owner: "dictionary entry".to_string(),
            }),
        }
    }

    fn set(&self, field: &str, value: Value, registry: &TypeRegistry) -> Result<()> {
        match field {
            KEY_COLUMN => self.rename_key(value, registry),
            VALUE_COLUMN => {
                let value = registry.coerce(value, &self.value_type)?;
                self.locator.write(|slot| {
                    *slot = value;
                    Ok(())
                })
            }
            _ => Err(TableError::FieldNotFound {
                field: field.to_string(),
                owner: "dictionary entry".to_string(),
            }),
        }
    }

    fn field_locator(&self, _field: &str) -> Rc<Locator> {
        Rc::clone(&self.locator)
    }

    fn row_name(&self) -> String {
        self.key().to_string()
    }

    fn as_dict_entry(&self) -> Option<&DictEntrySource> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IntKind, ObjectType};
    use crate::value::ObjectValue;

    fn registry() -> TypeRegistry {
        let mut reg = TypeRegistry::new();
        reg.register_object(
            ObjectType::new("Bag")
                .field("items", TypeDesc::list(TypeDesc::Int(IntKind::I32)))
                .field(
                    "names",
                    TypeDesc::dictionary(TypeDesc::String, TypeDesc::Int(IntKind::I32)),
                ),
        );
        reg
    }

    fn bag() -> RootRef {
        SourceRoot::new(Value::Object(
            ObjectValue::new("Bag")
                .with_field("items", vec![Value::Int(1), Value::Int(2), Value::Int(3)])
                .with_field(
                    "names",
                    Value::Dictionary(vec![
                        (Value::from("a"), Value::Int(1)),
                        (Value::from("b"), Value::Int(2)),
                    ]),
                ),
        ))
    }

    #[test]
    fn test_object_source_get_set_marks_dirty() {
        let reg = registry();
        let root = bag();
        let source = ObjectSource::from_root(&root, "bag");
        assert!(!root.is_dirty());
        source
            .set("items", Value::List(vec![Value::Int(9)]), &reg)
            .unwrap();
        assert!(root.is_dirty());
        assert_eq!(source.get("items").unwrap(), Value::List(vec![Value::Int(9)]));
        assert!(source.set("missing", Value::Int(1), &reg).is_err());
    }

    #[test]
    fn test_list_item_swap_follows_elements() {
        let reg = registry();
        let root = bag();
        let list = Locator::child(&Locator::root(&root), PathSegment::Field("items".into()));
        let first = ListItemSource::new(&list, 0, TypeDesc::Int(IntKind::I32));
        let third = ListItemSource::new(&list, 2, TypeDesc::Int(IntKind::I32));

        first.swap_with(&third).unwrap();
        assert_eq!(first.index(), 2);
        assert_eq!(third.index(), 0);
        assert_eq!(first.get(VALUES_COLUMN).unwrap(), Value::Int(1));
        assert_eq!(
            list.get().unwrap(),
            Value::List(vec![Value::Int(3), Value::Int(2), Value::Int(1)])
        );

        first.set(VALUES_COLUMN, Value::Int(7), &reg).unwrap();
        assert_eq!(
            list.get().unwrap(),
            Value::List(vec![Value::Int(3), Value::Int(2), Value::Int(7)])
        );
    }

    #[test]
    fn test_dict_key_rename_rejects_duplicates() {
        let reg = registry();
        let root = bag();
        let dict = Locator::child(&Locator::root(&root), PathSegment::Field("names".into()));
        let entry = DictEntrySource::new(
            &dict,
            Value::from("a"),
            TypeDesc::String,
            TypeDesc::Int(IntKind::I32),
        );

        let err = entry.rename_key(Value::from("b"), &reg).unwrap_err();
        assert!(err.is_invalid_cell_value());
        assert_eq!(entry.key(), Value::from("a"));

        entry.rename_key(Value::from("a"), &reg).unwrap();
        entry.rename_key(Value::from("z"), &reg).unwrap();
        assert_eq!(entry.get(VALUE_COLUMN).unwrap(), Value::Int(1));
        assert_eq!(entry.row_name(), "z");
    }

    #[test]
    fn test_observers_receive_paths() {
        let reg = registry();
        let root = bag();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        root.subscribe(move |event| sink.borrow_mut().push(event.path.clone()));

        let source = ObjectSource::from_root(&root, "bag");
        source.set("items", Value::List(Vec::new()), &reg).unwrap();
        assert_eq!(seen.borrow().len(), 1);
        assert!(seen.borrow()[0].is_empty());
    }
}
