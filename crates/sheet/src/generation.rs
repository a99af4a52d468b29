//! Building tables from value sources.

use crate::cell::CellKind;
use crate::error::{Result, TableError};
use crate::factory::CellFactory;
use crate::source::{
    ColumnSpec, DictEntrySource, ListItemSource, Locator, ObjectSource, RootRef, SourceRef,
    KEY_COLUMN, VALUES_COLUMN, VALUE_COLUMN,
};
use crate::table::{Backing, Table};
use crate::types::{TypeDesc, TypeRegistry};
use crate::value::Value;
use std::fmt;
use std::rc::Rc;

/// Produces the column shape of a table that has no rows yet, so callers
/// know what a new row will contain.
pub trait ColumnGenerator: fmt::Debug {
    /// Whether this generator handles tables over values of `ty`.
    fn accepts(&self, ty: &TypeDesc) -> bool;

    fn columns(&self, ty: &TypeDesc, registry: &TypeRegistry) -> Result<Vec<ColumnSpec>>;
}

/// Dictionaries always show exactly the static `Key` and `Value` columns.
#[derive(Debug, Default)]
pub struct DictionaryColumns;

impl ColumnGenerator for DictionaryColumns {
    fn accepts(&self, ty: &TypeDesc) -> bool {
        matches!(ty, TypeDesc::Dictionary(..))
    }

    fn columns(&self, ty: &TypeDesc, _registry: &TypeRegistry) -> Result<Vec<ColumnSpec>> {
        let TypeDesc::Dictionary(key, value) = ty else {
            return Err(TableError::TypeMismatch {
                expected: "dictionary".to_string(),
                actual: ty.to_string(),
            });
        };
        let key = if key.is_simple() {
            key.as_ref().clone()
        } else {
            TypeDesc::Other(key.to_string())
        };
        Ok(vec![
            ColumnSpec::new(KEY_COLUMN, key).fixed(),
            ColumnSpec::new(VALUE_COLUMN, value.as_ref().clone()).fixed(),
        ])
    }
}

/// Lists of objects show the element's fields; other lists show `Values`.
#[derive(Debug, Default)]
pub struct ListColumns;

impl ColumnGenerator for ListColumns {
    fn accepts(&self, ty: &TypeDesc) -> bool {
        matches!(ty, TypeDesc::List(_))
    }

    fn columns(&self, ty: &TypeDesc, registry: &TypeRegistry) -> Result<Vec<ColumnSpec>> {
        match ty {
            TypeDesc::List(element) => match element.as_ref() {
                TypeDesc::Object(name) => ObjectColumns.columns(&TypeDesc::object(name.clone()), registry),
                other => Ok(vec![ColumnSpec::new(VALUES_COLUMN, other.clone())]),
            },
            other => Err(TableError::TypeMismatch {
                expected: "list".to_string(),
                actual: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Default)]
pub struct ObjectColumns;

impl ColumnGenerator for ObjectColumns {
    fn accepts(&self, ty: &TypeDesc) -> bool {
        matches!(ty, TypeDesc::Object(_))
    }

    fn columns(&self, ty: &TypeDesc, registry: &TypeRegistry) -> Result<Vec<ColumnSpec>> {
        let TypeDesc::Object(name) = ty else {
            return Err(TableError::TypeMismatch {
                expected: "object".to_string(),
                actual: ty.to_string(),
            });
        };
        Ok(registry
            .fields_of(name)?
            .into_iter()
            .map(|f| ColumnSpec::new(f.name, f.ty))
            .collect())
    }
}

/// Builds tables, rows, cells and sub-tables.
///
/// Owns the type registry and cell factory; tables and cells keep a shared
/// handle to it so structural edits can generate new rows.
#[derive(Debug)]
pub struct TableGenerator {
    registry: TypeRegistry,
    factory: CellFactory,
    column_generators: Vec<Box<dyn ColumnGenerator>>,
}

pub type GeneratorRef = Rc<TableGenerator>;

impl TableGenerator {
    #[must_use]
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            registry,
            factory: CellFactory::new(),
            column_generators: vec![
                Box::new(DictionaryColumns),
                Box::new(ListColumns),
                Box::new(ObjectColumns),
            ],
        }
    }

    #[must_use]
    pub fn with_factory(mut self, factory: CellFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Add a column generator consulted before the built-in ones.
    #[must_use]
    pub fn with_column_generator(mut self, generator: impl ColumnGenerator + 'static) -> Self {
        self.column_generators.insert(0, Box::new(generator));
        self
    }

    #[must_use]
    pub fn into_ref(self) -> GeneratorRef {
        Rc::new(self)
    }

    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    #[must_use]
    pub fn factory(&self) -> &CellFactory {
        &self.factory
    }

    #[must_use]
    pub fn cell_kind(&self, ty: &TypeDesc) -> CellKind {
        self.factory.kind_for(ty, &self.registry)
    }

    /// Column shape for an empty table over values of `ty`.
    pub fn empty_columns(&self, ty: &TypeDesc) -> Result<Vec<ColumnSpec>> {
        self.column_generators
            .iter()
            .find(|g| g.accepts(ty))
            .ok_or_else(|| TableError::Unsupported(format!("no column generator for {ty}")))?
            .columns(ty, &self.registry)
    }

    /// One row per source, in order. Columns come from the first source.
    pub fn generate(self: &Rc<Self>, name: &str, sources: Vec<SourceRef>) -> Result<Table> {
        tracing::debug!(table = name, rows = sources.len(), "generating table");
        let mut table = Table::new(name, Rc::clone(self));
        for source in sources {
            table.add_row(source)?;
        }
        Ok(table)
    }

    /// One row per root object. Roots of different types share the columns
    /// of their closest common base type.
    pub fn generate_for_roots(self: &Rc<Self>, name: &str, roots: &[RootRef]) -> Result<Table> {
        let type_names = roots
            .iter()
            .map(|root| {
                Locator::root(root).read(|v| v.as_object().map(|o| o.type_name.clone()))
            })
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| TableError::Unsupported("table roots must be objects".into()))?;
        let base = self
            .registry
            .common_base(type_names.iter().map(String::as_str));
        if base.is_none() && !roots.is_empty() {
            tracing::warn!(table = name, "roots share no common base type");
        }

        let sources = roots
            .iter()
            .enumerate()
            .map(|(i, root)| {
                let row_name = root
                    .path()
                    .map_or_else(|| format!("Row{}", i + 1), str::to_string);
                let mut source = ObjectSource::from_root(root, row_name);
                if let Some(base) = &base {
                    source = source.with_type_override(base.clone());
                }
                Rc::new(source) as SourceRef
            })
            .collect();
        self.generate(name, sources)
    }

    /// Table with columns and no rows for values of `ty`.
    pub fn empty_table(self: &Rc<Self>, name: &str, ty: &TypeDesc) -> Result<Table> {
        let mut table = Table::new(name, Rc::clone(self));
        for spec in self.empty_columns(ty)? {
            table.add_column(spec)?;
        }
        Ok(table)
    }

    /// Table over a live collection located by `locator`: one row per
    /// element or entry. Adding and removing rows resizes the collection.
    pub fn collection_table(
        self: &Rc<Self>,
        name: &str,
        locator: &Rc<Locator>,
        ty: &TypeDesc,
    ) -> Result<Table> {
        let value = locator.get()?;
        self.collection_table_from(name, locator, ty, &value)
    }

    fn collection_table_from(
        self: &Rc<Self>,
        name: &str,
        locator: &Rc<Locator>,
        ty: &TypeDesc,
        value: &Value,
    ) -> Result<Table> {
        let mut table = Table::new(name, Rc::clone(self));
        for spec in self.empty_columns(ty)? {
            table.add_column(spec)?;
        }

        match ty {
            TypeDesc::List(element) => {
                table.backing = Backing::List {
                    locator: Rc::clone(locator),
                    element: element.as_ref().clone(),
                };
                let count = value.item_count().unwrap_or(0);
                for index in 0..count {
                    let source = ListItemSource::new(locator, index, element.as_ref().clone());
                    table.add_row(Rc::new(source))?;
                }
            }
            TypeDesc::Dictionary(key, value_ty) => {
                table.backing = Backing::Dictionary {
                    locator: Rc::clone(locator),
                    key: key.as_ref().clone(),
                    value: value_ty.as_ref().clone(),
                };
                let keys: Vec<Value> = value
                    .as_dictionary()
                    .map(|entries| entries.iter().map(|(k, _)| k.clone()).collect())
                    .unwrap_or_default();
                for k in keys {
                    let source = DictEntrySource::new(
                        locator,
                        k,
                        key.as_ref().clone(),
                        value_ty.as_ref().clone(),
                    );
                    table.add_row(Rc::new(source))?;
                }
            }
            other => {
                return Err(TableError::TypeMismatch {
                    expected: "collection".to_string(),
                    actual: other.to_string(),
                })
            }
        }
        Ok(table)
    }

    /// Sub-table owned by a cell of `kind` whose value lives at `locator`.
    ///
    /// A collection gets one row per element. A nested object gets one row,
    /// the object itself, with one column per field of the declared type; a
    /// null object gets the columns and no rows.
    pub(crate) fn sub_table(
        self: &Rc<Self>,
        kind: CellKind,
        ty: &TypeDesc,
        field: &str,
        locator: &Rc<Locator>,
        value: &Value,
    ) -> Result<Table> {
        match (kind, ty) {
            (CellKind::List | CellKind::Dictionary, _) => {
                self.collection_table_from(field, locator, ty, value)
            }
            (CellKind::Object, TypeDesc::Object(type_name)) => {
                let mut table = Table::new(field, Rc::clone(self));
                for spec in self.empty_columns(ty)? {
                    table.add_column(spec)?;
                }
                if !value.is_null() {
                    let source = ObjectSource::new(Rc::clone(locator), field)
                        .with_type_override(type_name.clone());
                    table.add_row(Rc::new(source))?;
                }
                Ok(table)
            }
            _ => Err(TableError::Unsupported(format!(
                "cell kind {kind:?} has no sub-table for {ty}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IntKind, ObjectType};

    #[test]
    fn test_empty_columns() {
        let mut registry = TypeRegistry::new();
        registry.register_object(
            ObjectType::new("Vec2")
                .field("x", TypeDesc::Int(IntKind::I32))
                .field("y", TypeDesc::Int(IntKind::I32)),
        );
        let generator = TableGenerator::new(registry);

        let dict = generator
            .empty_columns(&TypeDesc::dictionary(TypeDesc::String, TypeDesc::Bool))
            .unwrap();
        assert_eq!(dict.len(), 2);
        assert!(dict.iter().all(|c| c.is_static));
        assert_eq!(dict[0].name, KEY_COLUMN);

        let values = generator
            .empty_columns(&TypeDesc::list(TypeDesc::Int(IntKind::I32)))
            .unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].name, VALUES_COLUMN);

        let fields = generator
            .empty_columns(&TypeDesc::list(TypeDesc::object("Vec2")))
            .unwrap();
        assert_eq!(
            fields.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["x", "y"]
        );

        assert!(generator.empty_columns(&TypeDesc::Bool).is_err());
    }
}
