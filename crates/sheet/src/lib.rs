//! Typed tables over live object graphs.
//!
//! Projects objects, lists and dictionaries onto a grid of typed cells,
//! recursing into sub-tables for nested structures, and serializes tables
//! to flattened text (TSV/CSV) or nested JSON and back.
//!
//! # Examples
//!
//! ## Generating a table from root objects
//!
//! ```
//! use gridgraph_sheet::{
//!     ObjectType, ObjectValue, SerializationOptions, SourceRoot, TableGenerator, TypeDesc,
//!     TypeRegistry, Value,
//! };
//!
//! let mut registry = TypeRegistry::new();
//! registry.register_object(
//!     ObjectType::new("Item")
//!         .field("name", TypeDesc::String)
//!         .field("tags", TypeDesc::list(TypeDesc::String)),
//! );
//! let generator = TableGenerator::new(registry).into_ref();
//!
//! let root = SourceRoot::new(Value::Object(
//!     ObjectValue::new("Item")
//!         .with_field("name", "sword")
//!         .with_field("tags", vec![Value::from("sharp")]),
//! ));
//! let table = generator.generate_for_roots("Items", &[root]).unwrap();
//!
//! assert_eq!(table.cell_at("A1").unwrap().value(), &Value::from("sword"));
//! assert_eq!(table.cell_at("B1.A1").unwrap().value(), &Value::from("sharp"));
//! assert_eq!(
//!     table.to_delimited(&SerializationOptions::tsv()).unwrap(),
//!     "sword\t[\"sharp\"]\n"
//! );
//! ```
//!
//! ## Editing a collection through its cell
//!
//! ```
//! use gridgraph_sheet::{ObjectType, ObjectValue, SourceRoot, TableGenerator, TypeDesc, TypeRegistry, Value};
//!
//! let mut registry = TypeRegistry::new();
//! registry.register_object(ObjectType::new("Bag").field("items", TypeDesc::list(TypeDesc::String)));
//! let generator = TableGenerator::new(registry).into_ref();
//! let root = SourceRoot::new(Value::Object(ObjectValue::new("Bag").with_field("items", Vec::<Value>::new())));
//! let mut table = generator.generate_for_roots("Bags", &[root.clone()]).unwrap();
//!
//! let cell = table.cell_at_mut("A1").unwrap();
//! cell.add_item(Value::from("rope")).unwrap();
//! assert_eq!(cell.item_count().unwrap(), 1);
//! assert_eq!(cell.sub_table().unwrap().row_count(), 1);
//! assert!(root.is_dirty());
//! ```

mod anchor;
mod cell;
mod collection;
mod csv;
mod deserialize;
mod error;
mod factory;
mod generation;
mod json;
mod scalar;
mod serialize;
mod source;
mod table;
mod types;
mod value;

/// Re-export anchor types.
pub use anchor::{Column, Row};
/// Re-export cell types.
pub use cell::{Cell, CellKind};
/// Re-export table error types.
pub use error::{Result, TableError};
/// Re-export the cell factory.
pub use factory::{CellConstructor, CellFactory, TypeCategory};
/// Re-export generation types.
pub use generation::{
    ColumnGenerator, DictionaryColumns, GeneratorRef, ListColumns, ObjectColumns, TableGenerator,
};
/// Re-export scalar text helpers.
pub use scalar::{format_scalar, parse_color, parse_scalar, NULL_TOKEN};
/// Re-export serialization options.
pub use serialize::{SerializationOptions, KEY_QUOTE_ESCAPE};
/// Re-export value sources.
pub use source::{
    ChangeEvent, ColumnSpec, DictEntrySource, ListItemSource, Locator, ObjectSource, PathSegment,
    RootRef, SerializedObject, SourceRef, SourceRoot, KEY_COLUMN, VALUES_COLUMN, VALUE_COLUMN,
};
/// Re-export the table type.
pub use table::Table;
/// Re-export type descriptions.
pub use types::{
    EnumType, FieldDesc, FloatKind, IntKind, ObjectType, Schema, TypeDesc, TypeRegistry,
};
/// Re-export value types.
pub use value::{
    AssetRef, Color, Curve, EnumValue, Gradient, GradientAlphaKey, GradientColorKey, GradientMode,
    Keyframe, ObjectValue, Value,
};
