//! Row and column anchors.

use crate::cell::Cell;
use crate::source::{ColumnSpec, SourceRef};
use crate::types::TypeDesc;
use gridgraph_primitives::to_letters;
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

pub(crate) fn stable_hash(parts: impl Hash) -> u64 {
    let mut hasher = DefaultHasher::new();
    parts.hash(&mut hasher);
    hasher.finish()
}

/// A column of a table.
#[derive(Debug, Clone)]
pub struct Column {
    id: u64,
    pub(crate) name: String,
    pub(crate) position: usize,
    pub(crate) is_static: bool,
    pub(crate) ty: TypeDesc,
}

impl Column {
    pub(crate) fn new(spec: &ColumnSpec, position: usize, table: &str) -> Self {
        Self {
            id: stable_hash((&spec.name, table)),
            name: spec.name.clone(),
            position,
            is_static: spec.is_static,
            ty: spec.ty.clone(),
        }
    }

    /// Identity derived from the column name and owning table name.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 1-based position.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Spreadsheet letters for the position (`A`, `B`, ..., `AA`).
    #[must_use]
    pub fn letters(&self) -> String {
        to_letters(self.position).unwrap_or_default()
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    #[must_use]
    pub fn declared_type(&self) -> &TypeDesc {
        &self.ty
    }
}

/// A row of a table, backed by one value source. Cells are keyed by column
/// position.
#[derive(Debug)]
pub struct Row {
    id: u64,
    pub(crate) name: String,
    pub(crate) position: usize,
    pub(crate) is_static: bool,
    pub(crate) source: SourceRef,
    pub(crate) cells: BTreeMap<usize, Cell>,
}

impl Row {
    pub(crate) fn new(source: SourceRef, position: usize, table: &str) -> Self {
        let guid: Uuid = source.root().guid();
        Self {
            id: stable_hash((guid, position, table)),
            name: source.row_name(),
            position,
            is_static: false,
            source,
            cells: BTreeMap::new(),
        }
    }

    /// Identity derived from the root GUID, creation position and table name.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    #[must_use]
    pub fn source(&self) -> &SourceRef {
        &self.source
    }

    #[must_use]
    pub fn cell(&self, column: usize) -> Option<&Cell> {
        self.cells.get(&column)
    }

    pub fn cell_mut(&mut self, column: usize) -> Option<&mut Cell> {
        self.cells.get_mut(&column)
    }

    /// Cells in column order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters_and_identity() {
        let spec = ColumnSpec::new("Speed", TypeDesc::Bool);
        let a = Column::new(&spec, 28, "Items");
        let b = Column::new(&spec, 3, "Items");
        let c = Column::new(&spec, 28, "Other");
        assert_eq!(a.letters(), "AB");
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
    }
}
