use std::collections::VecDeque;
use std::iter::FusedIterator;

use crate::error::{DbError, DbResult};
use crate::storage::node::{leaf_cell_count, leaf_key, leaf_value};
use crate::storage::row::Row;
use crate::storage::table::Table;

/// A position inside a leaf: `(page_num, cell_num)`, or end-of-table.
///
/// A cursor from `Table::find` covers one leaf. A scan cursor also carries
/// the leaves still to visit and moves on to the next one when the current
/// leaf runs out.
pub struct Cursor<'a> {
    table: &'a mut Table,
    page_num: u32,
    cell_num: usize,
    end_of_table: bool,
    next_leaves: VecDeque<u32>,
}

impl<'a> Cursor<'a> {
    /// Cursor at `cell_num` of leaf `page_num`.
    pub(crate) fn at(table: &'a mut Table, page_num: u32, cell_num: usize) -> DbResult<Cursor<'a>> {
        let mut cursor = Cursor {
            table,
            page_num,
            cell_num,
            end_of_table: false,
            next_leaves: VecDeque::new(),
        };
        cursor.settle()?;
        Ok(cursor)
    }

    /// Cursor at the first row of the first non-empty leaf in `leaves`.
    pub(crate) fn over_leaves(table: &'a mut Table, leaves: Vec<u32>) -> DbResult<Cursor<'a>> {
        let mut next_leaves = VecDeque::from(leaves);
        let Some(first) = next_leaves.pop_front() else {
            return Ok(Cursor {
                table,
                page_num: 0,
                cell_num: 0,
                end_of_table: true,
                next_leaves,
            });
        };
        let mut cursor = Cursor {
            table,
            page_num: first,
            cell_num: 0,
            end_of_table: false,
            next_leaves,
        };
        cursor.settle()?;
        Ok(cursor)
    }

    /// Move past exhausted leaves; end-of-table once none are left.
    fn settle(&mut self) -> DbResult<()> {
        loop {
            let page = self.table.pager.get_page(self.page_num)?;
            if self.cell_num < leaf_cell_count(&page.data)? {
                return Ok(());
            }
            match self.next_leaves.pop_front() {
                Some(next) => {
                    self.page_num = next;
                    self.cell_num = 0;
                }
                None => {
                    self.end_of_table = true;
                    return Ok(());
                }
            }
        }
    }

    pub fn is_end(&self) -> bool {
        self.end_of_table
    }

    /// `(page_num, cell_num)` the cursor points at. At end-of-table this is
    /// one past the last cell of the leaf, which is where an insert lands.
    pub fn position(&self) -> (u32, usize) {
        (self.page_num, self.cell_num)
    }

    /// Key of the current cell.
    pub fn key(&mut self) -> DbResult<u32> {
        if self.end_of_table {
            return Err(DbError::EndOfTable);
        }
        let page = self.table.pager.get_page(self.page_num)?;
        Ok(leaf_key(&page.data, self.cell_num))
    }

    /// Decode the row under the cursor.
    pub fn value(&mut self) -> DbResult<Row> {
        if self.end_of_table {
            return Err(DbError::EndOfTable);
        }
        let page = self.table.pager.get_page(self.page_num)?;
        Ok(Row::deserialize(leaf_value(&page.data, self.cell_num)))
    }

    pub fn advance(&mut self) -> DbResult<()> {
        if self.end_of_table {
            return Ok(());
        }
        self.cell_num += 1;
        self.settle()
    }
}

impl Iterator for Cursor<'_> {
    type Item = DbResult<Row>;

    fn next(&mut self) -> Option<DbResult<Row>> {
        if self.end_of_table {
            return None;
        }
        let result = self.value().and_then(|row| {
            self.advance()?;
            Ok(row)
        });
        if result.is_err() {
            self.end_of_table = true;
        }
        Some(result)
    }
}

impl FusedIterator for Cursor<'_> {}
