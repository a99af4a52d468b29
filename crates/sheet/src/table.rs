//! Tables of typed cells over value sources.

use crate::anchor::{Column, Row};
use crate::cell::{Cell, CellKind, CellLocation};
use crate::error::{Result, TableError};
use crate::generation::GeneratorRef;
use crate::source::{ColumnSpec, Locator, SourceRef, KEY_COLUMN};
use crate::types::TypeDesc;
use crate::value::Value;
use gridgraph_primitives::{parse_path, parse_position, Position};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::Rc;

/// What a table's rows are backed by.
#[derive(Debug, Clone)]
pub(crate) enum Backing {
    /// Rows over independent sources; removing a row leaves data untouched.
    Plain,
    List {
        locator: Rc<Locator>,
        element: TypeDesc,
    },
    Dictionary {
        locator: Rc<Locator>,
        key: TypeDesc,
        value: TypeDesc,
    },
}

/// A named grid of rows and columns keyed by contiguous 1-based positions.
///
/// A table owned by a cell is a sub-table; its name embeds the owning cell's
/// position and `prefix` holds that cell's global position.
pub struct Table {
    name: String,
    prefix: Option<String>,
    generator: GeneratorRef,
    columns: BTreeMap<usize, Column>,
    rows: BTreeMap<usize, Row>,
    pub(crate) backing: Backing,
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("prefix", &self.prefix)
            .field("columns", &self.columns.values().map(Column::name).collect::<Vec<_>>())
            .field("rows", &self.rows.len())
            .field("backing", &self.backing)
            .finish_non_exhaustive()
    }
}

impl Table {
    pub fn new(name: impl Into<String>, generator: GeneratorRef) -> Self {
        Table {
            name: name.into(),
            prefix: None,
            generator,
            columns: BTreeMap::new(),
            rows: BTreeMap::new(),
            backing: Backing::Plain,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Global position of the owning cell, for sub-tables.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    #[must_use]
    pub fn generator(&self) -> &GeneratorRef {
        &self.generator
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether rows mirror the elements of a live list or dictionary.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        !matches!(self.backing, Backing::Plain)
    }

    /// Declared type of the backing collection, if any.
    #[must_use]
    pub fn collection_type(&self) -> Option<TypeDesc> {
        match &self.backing {
            Backing::Plain => None,
            Backing::List { element, .. } => Some(TypeDesc::list(element.clone())),
            Backing::Dictionary { key, value, .. } => {
                Some(TypeDesc::dictionary(key.clone(), value.clone()))
            }
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    /// Rows in position order.
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.values()
    }

    #[must_use]
    pub fn column(&self, position: usize) -> Option<&Column> {
        self.columns.get(&position)
    }

    #[must_use]
    pub fn row(&self, position: usize) -> Option<&Row> {
        self.rows.get(&position)
    }

    pub fn row_mut(&mut self, position: usize) -> Option<&mut Row> {
        self.rows.get_mut(&position)
    }

    #[must_use]
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.values().find(|c| c.name() == name)
    }

    /// First row with the given name.
    #[must_use]
    pub fn row_by_name(&self, name: &str) -> Option<&Row> {
        self.rows.values().find(|r| r.name() == name)
    }

    /// All rows with the given name, in position order.
    pub fn rows_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Row> + 'a {
        self.rows.values().filter(move |r| r.name() == name)
    }

    #[must_use]
    pub fn cell(&self, column: usize, row: usize) -> Option<&Cell> {
        self.rows.get(&row)?.cells.get(&column)
    }

    pub fn cell_mut(&mut self, column: usize, row: usize) -> Option<&mut Cell> {
        self.rows.get_mut(&row)?.cells.get_mut(&column)
    }

    /// Cell by row position and column name.
    #[must_use]
    pub fn cell_by_name(&self, row: usize, column: &str) -> Option<&Cell> {
        let column = self.column_by_name(column)?.position();
        self.cell(column, row)
    }

    /// Cell at a dotted position such as `B3` or `B3.A1`, descending into
    /// the sub-table of each non-terminal cell.
    pub fn cell_at(&self, path: &str) -> Result<&Cell> {
        let positions =
            parse_path(path).map_err(|_| TableError::InvalidCellNotation(path.to_string()))?;
        let mut table = self;
        let mut found = None;
        for (i, pos) in positions.iter().enumerate() {
            let cell = table
                .cell(pos.column, pos.row)
                .ok_or_else(|| TableError::CellNotFound(path.to_string()))?;
            if i + 1 < positions.len() {
                table = cell
                    .sub_table()
                    .ok_or_else(|| TableError::CellNotFound(path.to_string()))?;
            }
            found = Some(cell);
        }
        found.ok_or_else(|| TableError::CellNotFound(path.to_string()))
    }

    pub fn cell_at_mut(&mut self, path: &str) -> Result<&mut Cell> {
        let positions =
            parse_path(path).map_err(|_| TableError::InvalidCellNotation(path.to_string()))?;
        let (last, parents) = positions
            .split_last()
            .ok_or_else(|| TableError::InvalidCellNotation(path.to_string()))?;
        let mut table = self;
        for pos in parents {
            table = table
                .cell_mut(pos.column, pos.row)
                .and_then(Cell::sub_table_mut)
                .ok_or_else(|| TableError::CellNotFound(path.to_string()))?;
        }
        table
            .cell_mut(last.column, last.row)
            .ok_or_else(|| TableError::CellNotFound(path.to_string()))
    }

    /// Global position of a cell of this table, such as `B2.A1`.
    pub fn global_position(&self, column: usize, row: usize) -> Result<String> {
        let local = Position::new(column, row).to_string();
        if column == 0 || row == 0 {
            return Err(TableError::InvalidCellNotation(local));
        }
        Ok(match &self.prefix {
            Some(prefix) => format!("{prefix}.{local}"),
            None => local,
        })
    }

    /// Append a column; existing rows get a cell for it.
    pub fn add_column(&mut self, spec: ColumnSpec) -> Result<usize> {
        self.add_column_at(self.columns.len() + 1, spec)
    }

    /// Insert a column at the next free position; an occupied position is
    /// an error.
    pub fn add_column_at(&mut self, position: usize, spec: ColumnSpec) -> Result<usize> {
        if self.columns.contains_key(&position) {
            return Err(TableError::PositionOccupied {
                kind: "Column",
                position,
                table: self.name.clone(),
            });
        }
        if position == 0 || position != self.columns.len() + 1 {
            return Err(TableError::ColumnNotFound {
                position,
                count: self.columns.len(),
            });
        }

        let column = Column::new(&spec, position, &self.name);
        let mut cells = Vec::new();
        for (row_position, row) in &self.rows {
            cells.push((*row_position, self.build_cell(&column, row.id(), &row.source)));
        }
        self.columns.insert(position, column);
        for (row_position, cell) in cells {
            if let Some(row) = self.rows.get_mut(&row_position) {
                row.cells.insert(position, cell);
            }
        }
        self.reindex();
        let rows: Vec<usize> = self.rows.keys().copied().collect();
        for row in rows {
            self.build_sub_tables(row)?;
        }
        Ok(position)
    }

    /// Append a row over `source`. The first row of a table without columns
    /// also creates the columns from the source's shape.
    pub fn add_row(&mut self, source: SourceRef) -> Result<usize> {
        self.add_row_at(self.rows.len() + 1, source)
    }

    pub fn add_row_at(&mut self, position: usize, source: SourceRef) -> Result<usize> {
        if self.rows.contains_key(&position) {
            return Err(TableError::PositionOccupied {
                kind: "Row",
                position,
                table: self.name.clone(),
            });
        }
        if position == 0 || position != self.rows.len() + 1 {
            return Err(TableError::RowNotFound {
                position,
                count: self.rows.len(),
            });
        }

        if self.columns.is_empty() {
            for spec in source.column_specs(self.generator.registry())? {
                let column_position = self.columns.len() + 1;
                self.columns
                    .insert(column_position, Column::new(&spec, column_position, &self.name));
            }
        }

        let mut row = Row::new(source, position, &self.name);
        for (column_position, column) in &self.columns {
            let cell = self.build_cell(column, row.id(), &row.source);
            row.cells.insert(*column_position, cell);
        }
        self.rows.insert(position, row);
        // Appends never move existing rows.
        self.reindex_row(position);
        self.build_sub_tables(position)?;
        tracing::trace!(table = %self.name, position, "added row");
        Ok(position)
    }

    fn build_cell(&self, column: &Column, row_id: u64, source: &SourceRef) -> Cell {
        let ty = column.declared_type().clone();
        let kind = self.generator.cell_kind(&ty);
        Cell::new(
            Rc::clone(&self.generator),
            kind,
            ty,
            column.name().to_string(),
            Rc::clone(source),
            column.id(),
            row_id,
        )
    }

    fn build_sub_tables(&mut self, row: usize) -> Result<()> {
        let Some(row) = self.rows.get_mut(&row) else {
            return Ok(());
        };
        for cell in row.cells.values_mut() {
            if cell.kind().owns_sub_table() && cell.sub_table.is_none() {
                cell.rebuild_sub_table()?;
            }
        }
        Ok(())
    }

    pub(crate) fn set_location(&mut self, name: String, prefix: Option<String>) {
        self.name = name;
        self.prefix = prefix;
        self.reindex();
    }

    /// Bring anchor positions, collection row names, cell locations and
    /// sub-table prefixes in line with the position keys.
    pub(crate) fn reindex(&mut self) {
        for (position, column) in &mut self.columns {
            column.position = *position;
        }
        let positions: Vec<usize> = self.rows.keys().copied().collect();
        for position in positions {
            self.reindex_row(position);
        }
    }

    /// Locate one row's cells and sub-tables at its current position.
    fn reindex_row(&mut self, position: usize) {
        let collection = self.is_collection();
        let Some(row) = self.rows.get_mut(&position) else {
            return;
        };
        row.position = position;
        if collection {
            row.name = row.source.row_name();
        }
        for (column_position, cell) in &mut row.cells {
            cell.location = CellLocation {
                table: self.name.clone(),
                prefix: self.prefix.clone(),
                column: *column_position,
                row: position,
            };
            let name = cell.sub_table_name();
            let global = cell.global_position();
            if let Some(sub) = cell.sub_table.as_deref_mut() {
                sub.set_location(name, Some(global));
            }
        }
    }

    /// Remove a row and close the gap. On a collection-backed table the
    /// element is also removed from the live collection.
    pub fn remove_row(&mut self, position: usize) -> Result<()> {
        let Some(row) = self.rows.get(&position) else {
            return Err(TableError::RowNotFound {
                position,
                count: self.rows.len(),
            });
        };

        match &self.backing {
            Backing::Plain => {}
            Backing::List { locator, .. } => {
                let index = row
                    .source
                    .as_list_item()
                    .map_or(position - 1, |item| item.index());
                locator.write(|value| {
                    let kind = value.kind_name();
                    let items = value.as_list_mut().ok_or_else(|| TableError::TypeMismatch {
                        expected: "list".to_string(),
                        actual: kind.to_string(),
                    })?;
                    if index >= items.len() {
                        return Err(TableError::RowNotFound {
                            position,
                            count: items.len(),
                        });
                    }
                    items.remove(index);
                    Ok(())
                })?;
                for other in self.rows.values() {
                    if let Some(item) = other.source.as_list_item() {
                        if item.index() > index {
                            item.set_index(item.index() - 1);
                        }
                    }
                }
            }
            Backing::Dictionary { locator, .. } => {
                let key = row
                    .source
                    .as_dict_entry()
                    .map(|entry| entry.key())
                    .ok_or_else(|| TableError::Unsupported("row is not a dictionary entry".into()))?;
                locator.write(|value| {
                    let kind = value.kind_name();
                    let entries =
                        value
                            .as_dictionary_mut()
                            .ok_or_else(|| TableError::TypeMismatch {
                                expected: "dictionary".to_string(),
                                actual: kind.to_string(),
                            })?;
                    entries.retain(|(k, _)| *k != key);
                    Ok(())
                })?;
            }
        }

        self.rows.remove(&position);
        let tail: Vec<usize> = self.rows.range(position + 1..).map(|(p, _)| *p).collect();
        for p in tail {
            if let Some(row) = self.rows.remove(&p) {
                self.rows.insert(p - 1, row);
            }
        }
        self.reindex();
        tracing::trace!(table = %self.name, position, "removed row");
        Ok(())
    }

    fn check_row(&self, position: usize) -> Result<&Row> {
        self.rows.get(&position).ok_or(TableError::RowNotFound {
            position,
            count: self.rows.len(),
        })
    }

    fn check_column(&self, position: usize) -> Result<&Column> {
        self.columns.get(&position).ok_or(TableError::ColumnNotFound {
            position,
            count: self.columns.len(),
        })
    }

    /// Swap two rows.
    ///
    /// When both rows are list elements the live slots are swapped too.
    /// Other rows, such as dictionary entries, only swap positions and the
    /// underlying collection keeps its order.
    pub fn swap_rows(&mut self, a: usize, b: usize) -> Result<()> {
        let row_a = self.check_row(a)?;
        let row_b = self.check_row(b)?;
        if a == b {
            return Ok(());
        }

        if !row_a.is_static() && !row_b.is_static() {
            if let (Some(x), Some(y)) = (row_a.source.as_list_item(), row_b.source.as_list_item()) {
                x.swap_with(y)?;
            }
        }

        if let (Some(row_a), Some(row_b)) = (self.rows.remove(&a), self.rows.remove(&b)) {
            self.rows.insert(a, row_b);
            self.rows.insert(b, row_a);
        }
        self.reindex();
        Ok(())
    }

    /// Swap two columns along with every row's cells at those positions.
    pub fn swap_columns(&mut self, a: usize, b: usize) -> Result<()> {
        self.check_column(a)?;
        self.check_column(b)?;
        if a == b {
            return Ok(());
        }

        if let (Some(col_a), Some(col_b)) = (self.columns.remove(&a), self.columns.remove(&b)) {
            self.columns.insert(a, col_b);
            self.columns.insert(b, col_a);
        }
        for row in self.rows.values_mut() {
            let cell_a = row.cells.remove(&a);
            let cell_b = row.cells.remove(&b);
            if let Some(cell) = cell_b {
                row.cells.insert(a, cell);
            }
            if let Some(cell) = cell_a {
                row.cells.insert(b, cell);
            }
        }
        self.reindex();
        Ok(())
    }

    /// Move a row by adjacent swaps. Returns `false` without changing
    /// anything if the row is static or a static row lies in the way.
    pub fn move_row(&mut self, from: usize, to: usize) -> Result<bool> {
        let moved_is_static = self.check_row(from)?.is_static();
        self.check_row(to)?;
        if from == to {
            return Ok(false);
        }
        if moved_is_static {
            tracing::warn!(table = %self.name, position = from, "cannot move a static row");
            return Ok(false);
        }
        if let Some(blocker) = path_between(from, to).find(|p| self.rows[p].is_static()) {
            tracing::warn!(table = %self.name, from, to, blocker, "cannot move a row across a static row");
            return Ok(false);
        }

        let mut current = from;
        for next in path_between(from, to) {
            self.swap_rows(current, next)?;
            current = next;
        }
        Ok(true)
    }

    /// Move a column by adjacent swaps, refusing to move or cross static
    /// columns.
    pub fn move_column(&mut self, from: usize, to: usize) -> Result<bool> {
        let moved_is_static = self.check_column(from)?.is_static();
        self.check_column(to)?;
        if from == to {
            return Ok(false);
        }
        if moved_is_static {
            tracing::warn!(table = %self.name, position = from, "cannot move a static column");
            return Ok(false);
        }
        if let Some(blocker) = path_between(from, to).find(|p| self.columns[p].is_static()) {
            tracing::warn!(table = %self.name, from, to, blocker, "cannot move a column across a static column");
            return Ok(false);
        }

        let mut current = from;
        for next in path_between(from, to) {
            self.swap_columns(current, next)?;
            current = next;
        }
        Ok(true)
    }

    /// Mark a row static so moves cannot reorder it.
    pub fn set_row_static(&mut self, position: usize, is_static: bool) -> Result<()> {
        let count = self.rows.len();
        let row = self
            .rows
            .get_mut(&position)
            .ok_or(TableError::RowNotFound { position, count })?;
        row.is_static = is_static;
        Ok(())
    }

    /// Reassign row positions: the row currently at `order[i]` moves to
    /// position `i + 1`. List-backed tables reorder the live list to match.
    pub fn set_row_order(&mut self, order: &[usize]) -> Result<()> {
        if order.len() != self.rows.len() {
            return Err(TableError::InvalidRowOrder(format!(
                "expected {} positions, got {}",
                self.rows.len(),
                order.len()
            )));
        }
        let mut seen = HashSet::new();
        for p in order {
            if !self.rows.contains_key(p) {
                return Err(TableError::InvalidRowOrder(format!("no row at position {p}")));
            }
            if !seen.insert(*p) {
                return Err(TableError::InvalidRowOrder(format!("position {p} appears twice")));
            }
        }

        if let Backing::List { locator, .. } = &self.backing {
            let items: Option<Vec<_>> = order
                .iter()
                .map(|p| self.rows[p].source.as_list_item())
                .collect();
            if let Some(items) = items {
                let indices: Vec<usize> = items.iter().map(|item| item.index()).collect();
                locator.write(|value| {
                    let kind = value.kind_name();
                    let list = value.as_list_mut().ok_or_else(|| TableError::TypeMismatch {
                        expected: "list".to_string(),
                        actual: kind.to_string(),
                    })?;
                    if indices.len() != list.len() || indices.iter().any(|i| *i >= list.len()) {
                        return Err(TableError::InvalidRowOrder(
                            "rows are out of sync with the list".to_string(),
                        ));
                    }
                    let old = std::mem::take(list);
                    let mut slots: Vec<Option<Value>> = old.into_iter().map(Some).collect();
                    for index in &indices {
                        list.push(slots[*index].take().unwrap_or_default());
                    }
                    Ok(())
                })?;
                for (new_index, item) in items.iter().enumerate() {
                    item.set_index(new_index);
                }
            }
        }

        let mut old = std::mem::take(&mut self.rows);
        for (i, p) in order.iter().enumerate() {
            if let Some(row) = old.remove(p) {
                self.rows.insert(i + 1, row);
            }
        }
        self.reindex();
        Ok(())
    }

    /// Sort rows by the cells of one column.
    pub fn sort_by_column(&mut self, column: usize, ascending: bool) -> Result<()> {
        self.check_column(column)?;
        let mut entries: Vec<(usize, &Cell)> = self
            .rows
            .iter()
            .filter_map(|(p, row)| row.cells.get(&column).map(|c| (*p, c)))
            .collect();
        if entries.iter().any(|(_, c)| c.kind() == CellKind::Unsupported) {
            tracing::warn!(table = %self.name, column, "column has no stable order, not sorting");
            return Ok(());
        }
        entries.sort_by(|(_, a), (_, b)| {
            let ordering = a.compare(b);
            if ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });
        let order: Vec<usize> = entries.into_iter().map(|(p, _)| p).collect();
        self.set_row_order(&order)
    }

    /// Write a value to one cell through its source.
    ///
    /// Writing the key of a dictionary entry renames the entry and its row;
    /// a key already used by another entry is an invalid-cell-value error.
    pub fn set_value(&mut self, column: usize, row: usize, value: Value) -> Result<()> {
        let count = self.rows.len();
        let row_ref = self
            .rows
            .get_mut(&row)
            .ok_or(TableError::RowNotFound { position: row, count })?;
        let cell = row_ref
            .cells
            .get_mut(&column)
            .ok_or_else(|| TableError::CellNotFound(Position::new(column, row).to_string()))?;
        cell.set_value(value)?;
        let renames_row = cell.field() == KEY_COLUMN && row_ref.source.as_dict_entry().is_some();
        if renames_row {
            row_ref.name = row_ref.source.row_name();
        }
        Ok(())
    }

    /// Write a value at a dotted position, refreshing every ancestor cell's
    /// cached value on the way back up.
    pub fn set_value_at(&mut self, path: &str, value: Value) -> Result<()> {
        let positions =
            parse_path(path).map_err(|_| TableError::InvalidCellNotation(path.to_string()))?;
        self.set_value_along(&positions, value)
            .map_err(|err| match err {
                TableError::CellNotFound(_) => TableError::CellNotFound(path.to_string()),
                other => other,
            })
    }

    fn set_value_along(&mut self, path: &[Position], value: Value) -> Result<()> {
        let (first, rest) = path
            .split_first()
            .ok_or_else(|| TableError::InvalidCellNotation(String::new()))?;
        if rest.is_empty() {
            return self.set_value(first.column, first.row, value);
        }
        let cell = self
            .cell_mut(first.column, first.row)
            .ok_or_else(|| TableError::CellNotFound(first.to_string()))?;
        let sub = cell
            .sub_table
            .as_deref_mut()
            .ok_or_else(|| TableError::CellNotFound(first.to_string()))?;
        sub.set_value_along(rest, value)?;
        cell.reload_value();
        Ok(())
    }

    /// Write a value to a cell addressed by row position and column name.
    pub fn set_value_by_name(&mut self, row: usize, column: &str, value: Value) -> Result<()> {
        let column = self
            .column_by_name(column)
            .ok_or_else(|| TableError::ColumnNameNotFound {
                name: column.to_string(),
            })?
            .position();
        self.set_value(column, row, value)
    }

    /// Re-read every cached value and resize sub-tables whose collections
    /// changed.
    pub fn refresh(&mut self) -> Result<()> {
        let collection = self.is_collection();
        for row in self.rows.values_mut() {
            if collection {
                row.name = row.source.row_name();
            }
            for cell in row.cells.values_mut() {
                cell.refresh()?;
            }
        }
        Ok(())
    }

    pub fn rename_row(&mut self, position: usize, name: impl Into<String>) -> Result<()> {
        let count = self.rows.len();
        let row = self
            .rows
            .get_mut(&position)
            .ok_or(TableError::RowNotFound { position, count })?;
        row.name = name.into();
        Ok(())
    }

    /// Parse `B3`-style notation against this table's bounds.
    pub fn position_of(&self, notation: &str) -> Result<Position> {
        let pos = parse_position(notation)?;
        self.check_column(pos.column)?;
        self.check_row(pos.row)?;
        Ok(pos)
    }

    /// Backing collection locator and declared type, for collection tables.
    pub(crate) fn collection_binding(&self) -> Result<(&Rc<Locator>, TypeDesc)> {
        match &self.backing {
            Backing::List { locator, element } => Ok((locator, TypeDesc::list(element.clone()))),
            Backing::Dictionary { locator, key, value } => Ok((
                locator,
                TypeDesc::dictionary(key.clone(), value.clone()),
            )),
            Backing::Plain => Err(TableError::Unsupported(format!(
                "table '{}' is not backed by a collection",
                self.name
            ))),
        }
    }
}

/// Positions visited when walking from `from` to `to`, excluding `from`.
fn path_between(from: usize, to: usize) -> Box<dyn Iterator<Item = usize>> {
    if from < to {
        Box::new(from + 1..=to)
    } else {
        Box::new((to..from).rev())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_between() {
        assert_eq!(path_between(1, 4).collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(path_between(4, 1).collect::<Vec<_>>(), vec![3, 2, 1]);
        assert_eq!(path_between(2, 3).collect::<Vec<_>>(), vec![3]);
    }
}
