use crate::error::{Result, TableError};
use crate::generation::GeneratorRef;
use crate::source::{DictEntrySource, SourceRef};
use crate::table::Table;
use crate::types::TypeDesc;
use crate::value::Value;
use gridgraph_primitives::get_position;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// The kind of a cell, chosen by the [`CellFactory`](crate::CellFactory)
/// from the declared field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Bool,
    Integer,
    Float,
    Char,
    String,
    Enum,
    Color,
    Curve,
    Gradient,
    LayerMask,
    Reference,
    List,
    Dictionary,
    /// A nested object exposed through a one-row sub-table.
    Object,
    /// Placeholder for a field type no kind supports.
    Unsupported,
}

impl CellKind {
    /// Whether cells of this kind own a sub-table.
    #[must_use]
    pub fn owns_sub_table(self) -> bool {
        matches!(self, CellKind::List | CellKind::Dictionary | CellKind::Object)
    }

    #[must_use]
    pub fn is_collection(self) -> bool {
        matches!(self, CellKind::List | CellKind::Dictionary)
    }

    #[must_use]
    pub fn is_primitive(self) -> bool {
        !self.owns_sub_table() && self != CellKind::Unsupported
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct CellLocation {
    pub table: String,
    pub prefix: Option<String>,
    pub column: usize,
    pub row: usize,
}

/// One typed cell: a cached copy of a field value read through a source.
pub struct Cell {
    pub(crate) generator: GeneratorRef,
    pub(crate) kind: CellKind,
    pub(crate) ty: TypeDesc,
    pub(crate) field: String,
    pub(crate) source: SourceRef,
    pub(crate) value: Value,
    pub(crate) column_id: u64,
    pub(crate) row_id: u64,
    pub(crate) location: CellLocation,
    pub(crate) sub_table: Option<Box<Table>>,
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("position", &self.global_position())
            .field("kind", &self.kind)
            .field("field", &self.field)
            .field("value", &self.value)
            .field("sub_table", &self.sub_table.as_ref().map(|t| t.name()))
            .finish()
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Cell {}

impl Hash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl Cell {
    pub(crate) fn new(
        generator: GeneratorRef,
        kind: CellKind,
        ty: TypeDesc,
        field: String,
        source: SourceRef,
        column_id: u64,
        row_id: u64,
    ) -> Self {
        let mut cell = Cell {
            generator,
            kind,
            ty,
            field,
            source,
            value: Value::Null,
            column_id,
            row_id,
            location: CellLocation::default(),
            sub_table: None,
        };
        cell.reload_value();
        cell
    }

    #[must_use]
    pub fn kind(&self) -> CellKind {
        self.kind
    }

    #[must_use]
    pub fn declared_type(&self) -> &TypeDesc {
        &self.ty
    }

    /// Name of the field this cell reads through its source.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[must_use]
    pub fn source(&self) -> &SourceRef {
        &self.source
    }

    /// Cached value, as of the last refresh.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Deterministic identity over column, row, value type and field, so the
    /// same logical cell built twice compares equal.
    #[must_use]
    pub fn identity(&self) -> u64 {
        crate::anchor::stable_hash((
            self.column_id,
            self.row_id,
            self.ty.to_string(),
            &self.field,
        ))
    }

    #[must_use]
    pub fn column(&self) -> usize {
        self.location.column
    }

    #[must_use]
    pub fn row(&self) -> usize {
        self.location.row
    }

    /// Local position such as `B3`.
    #[must_use]
    pub fn position(&self) -> String {
        get_position(self.location.column, self.location.row).unwrap_or_default()
    }

    /// Position including every ancestor cell, such as `B2.A1`.
    #[must_use]
    pub fn global_position(&self) -> String {
        let local = self.position();
        match &self.location.prefix {
            Some(prefix) => format!("{prefix}.{local}"),
            None => local,
        }
    }

    #[must_use]
    pub fn row_name(&self) -> String {
        self.source.row_name()
    }

    #[must_use]
    pub fn sub_table(&self) -> Option<&Table> {
        self.sub_table.as_deref()
    }

    pub(crate) fn sub_table_mut(&mut self) -> Option<&mut Table> {
        self.sub_table.as_deref_mut()
    }

    /// Run a structural edit against the sub-table, such as removing or
    /// reordering rows, then re-read the cached value so it matches the
    /// sub-table's rows.
    pub fn edit_sub_table<R>(&mut self, edit: impl FnOnce(&mut Table) -> Result<R>) -> Result<R> {
        let position = self.global_position();
        let table = self
            .sub_table
            .as_deref_mut()
            .ok_or_else(|| TableError::Unsupported(format!("cell {position} has no sub-table")))?;
        let result = edit(table);
        self.reload_value();
        result
    }

    pub(crate) fn reload_value(&mut self) {
        self.value = match self.source.get(&self.field) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(field = %self.field, error = %err, "failed to read cell value");
                Value::Null
            }
        };
    }

    /// Re-read the cached value and bring the sub-table in line with it.
    pub fn refresh(&mut self) -> Result<()> {
        self.reload_value();
        if !self.kind.owns_sub_table() {
            return Ok(());
        }

        let stale = match (&self.sub_table, self.kind) {
            (None, _) => true,
            (Some(sub), CellKind::Object) => self.value.is_null() != (sub.row_count() == 0),
            (Some(sub), CellKind::List) => self.value.item_count() != Some(sub.row_count()),
            (Some(sub), _) => match self.value.as_dictionary() {
                Some(entries) => {
                    entries.len() != sub.row_count()
                        || sub.rows().any(|row| {
                            let key = row.source().as_dict_entry().map(DictEntrySource::key);
                            !entries.iter().any(|(k, _)| Some(k) == key.as_ref())
                        })
                }
                None => true,
            },
        };

        if stale {
            self.rebuild_sub_table()
        } else if let Some(sub) = self.sub_table.as_deref_mut() {
            sub.refresh()
        } else {
            Ok(())
        }
    }

    pub(crate) fn rebuild_sub_table(&mut self) -> Result<()> {
        let locator = self.source.field_locator(&self.field);
        let mut table = self
            .generator
            .sub_table(self.kind, &self.ty, &self.field, &locator, &self.value)?;
        table.set_location(self.sub_table_name(), Some(self.global_position()));
        self.sub_table = Some(Box::new(table));
        Ok(())
    }

    pub(crate) fn sub_table_name(&self) -> String {
        format!("{}.{}", self.location.table, self.position())
    }

    /// Write a value through the source, then refresh.
    pub fn set_value(&mut self, value: Value) -> Result<()> {
        if self.kind == CellKind::Unsupported {
            return Err(TableError::Unsupported(format!(
                "field '{}' of type {} cannot be edited",
                self.field, self.ty
            )));
        }
        let registry = self.generator.registry();
        self.source.set(&self.field, value, registry)?;
        self.refresh()
    }

    /// Reset the field to the default for its declared type.
    pub fn clear(&mut self) -> Result<()> {
        let value = match self.ty {
            TypeDesc::Reference(_) | TypeDesc::Object(_) | TypeDesc::Other(_) => Value::Null,
            _ => self.generator.registry().default_value(&self.ty),
        };
        self.set_value(value)
    }

    fn collection_table(&self) -> Result<&Table> {
        match (self.sub_table.as_deref(), self.kind.is_collection()) {
            (Some(table), true) => Ok(table),
            _ => Err(TableError::Unsupported(format!(
                "cell {} is not a collection",
                self.global_position()
            ))),
        }
    }

    fn collection_table_mut(&mut self) -> Result<&mut Table> {
        let position = self.global_position();
        match (self.sub_table.as_deref_mut(), self.kind.is_collection()) {
            (Some(table), true) => Ok(table),
            _ => Err(TableError::Unsupported(format!(
                "cell {position} is not a collection"
            ))),
        }
    }

    /// Append an element to the live collection and one row to the sub-table.
    pub fn add_item(&mut self, item: Value) -> Result<usize> {
        let position = self.collection_table_mut()?.add_item(item)?;
        self.reload_value();
        Ok(position)
    }

    /// Append a default element; returns the new row position.
    pub fn add_empty_item(&mut self) -> Result<usize> {
        let position = self.collection_table_mut()?.add_empty_item()?;
        self.reload_value();
        Ok(position)
    }

    /// Remove the element at a 1-based row position.
    pub fn remove_item(&mut self, position: usize) -> Result<()> {
        self.collection_table_mut()?.remove_item(position)?;
        self.reload_value();
        Ok(())
    }

    /// Snapshot of the live collection.
    pub fn get_items(&self) -> Result<Value> {
        self.collection_table()?.get_items()
    }

    pub fn item_count(&self) -> Result<usize> {
        self.collection_table()?.item_count()
    }

    /// Total order used for column sorting.
    ///
    /// Unsupported cells compare as less than anything, so columns of them
    /// have no stable order.
    #[must_use]
    pub fn compare(&self, other: &Cell) -> Ordering {
        match self.kind {
            CellKind::Unsupported => Ordering::Less,
            CellKind::Bool
            | CellKind::Integer
            | CellKind::Float
            | CellKind::Char
            | CellKind::String
            | CellKind::Enum
            | CellKind::LayerMask => compare_scalars(&self.value, &other.value)
                .then_with(|| self.row_name().cmp(&other.row_name())),
            CellKind::Color => match (&self.value, &other.value) {
                (Value::Color(a), Value::Color(b)) => a
                    .r
                    .total_cmp(&b.r)
                    .then(a.g.total_cmp(&b.g))
                    .then(a.b.total_cmp(&b.b))
                    .then(a.a.total_cmp(&b.a)),
                (a, b) => null_first(a, b),
            },
            CellKind::Curve => match (&self.value, &other.value) {
                (Value::Curve(a), Value::Curve(b)) => a.keys.len().cmp(&b.keys.len()),
                (a, b) => null_first(a, b),
            },
            CellKind::Gradient => match (&self.value, &other.value) {
                (Value::Gradient(a), Value::Gradient(b)) => (a.color_keys.len() + a.alpha_keys.len())
                    .cmp(&(b.color_keys.len() + b.alpha_keys.len())),
                (a, b) => null_first(a, b),
            },
            CellKind::Reference => match (&self.value, &other.value) {
                (Value::Reference(a), Value::Reference(b)) => a.name.cmp(&b.name),
                (a, b) => null_first(a, b),
            },
            CellKind::List | CellKind::Dictionary => self
                .value
                .item_count()
                .unwrap_or(0)
                .cmp(&other.value.item_count().unwrap_or(0)),
            CellKind::Object => null_first(&self.value, &other.value),
        }
    }
}

fn null_first(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn compare_scalars(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Float(x), Value::Float(y)) => x.total_cmp(y),
        (Value::Float(x), other) => other.as_float().map_or(Ordering::Greater, |y| x.total_cmp(&y)),
        (other, Value::Float(y)) => other.as_float().map_or(Ordering::Less, |x| x.total_cmp(y)),
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::UInt(x), Value::UInt(y)) => x.cmp(y),
        (Value::Int(x), Value::UInt(y)) => i128::from(*x).cmp(&i128::from(*y)),
        (Value::UInt(x), Value::Int(y)) => i128::from(*x).cmp(&i128::from(*y)),
        (Value::Char(x), Value::Char(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Enum(x), Value::Enum(y)) => x.discriminant.cmp(&y.discriminant),
        (Value::LayerMask(x), Value::LayerMask(y)) => x.cmp(y),
        (x, y) => null_first(x, y).then_with(|| x.to_string().cmp(&y.to_string())),
    }
}
