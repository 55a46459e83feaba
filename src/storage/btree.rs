use log::debug;

use crate::error::{DbError, DbResult, Unsupported};
use crate::storage::cursor::Cursor;
use crate::storage::node::{
    initialize_internal_node, initialize_leaf_node, internal_child, internal_find_child,
    internal_key, internal_num_keys, leaf_cell, leaf_cell_mut, leaf_key, leaf_max_key,
    leaf_num_cells, leaf_search, leaf_shift_right, leaf_value_mut, node_kind, set_internal_cell,
    set_internal_num_keys, set_internal_right_child, set_leaf_key, set_leaf_num_cells,
    LEAF_NODE_CELL_SIZE, LEAF_NODE_KEY_OFFSET, LEAF_NODE_KEY_SIZE, LEAF_NODE_LEFT_SPLIT_COUNT,
    LEAF_NODE_MAX_CELLS, LEAF_NODE_VALUE_OFFSET,
};
use crate::storage::page::{get_is_root, get_parent, set_is_root, set_parent, NodeKind, PAGE_SIZE};
use crate::storage::pager::Pager;
use crate::storage::row::Row;
use crate::storage::table::Table;

/// B-tree keyed by row id, stored in the table's pages.
///
/// Shapes this revision handles:
///   1. a single root leaf;
///   2. an internal root with one separator over exactly two leaves.
///
/// A full root leaf splits into shape 2:
///   • the 13 existing cells plus the new one are merged in key order,
///   • the lower 7 stay in the old page, the upper 7 go to a new page,
///   • a second new page becomes the internal root, with the old leaf as
///     child 0 (separator = its max key) and the new leaf as right child.
///
/// Anything past shape 2 (inserting once the root is internal, splitting a
/// non-root leaf, descending through a second internal level) fails with
/// `NotImplemented` before any page is modified.
impl Table {
    /// Set up page 0 as an empty root leaf in a brand-new file.
    pub(crate) fn initialize_root(pager: &mut Pager) -> DbResult<u32> {
        debug!("Initializing new database: page 0 becomes an empty root leaf.");
        let root = pager.allocate_page()?;
        let page = pager.get_page(root)?;
        initialize_leaf_node(&mut page.data);
        set_is_root(&mut page.data, true);
        Ok(root)
    }

    /// Walk parent pointers up from page 0 to the page flagged as root.
    pub(crate) fn locate_root(pager: &mut Pager) -> DbResult<u32> {
        let mut page_num = 0;
        for _ in 0..pager.page_count() {
            let page = pager.get_page(page_num)?;
            node_kind(&page.data)?;
            if get_is_root(&page.data) {
                debug!("Opening existing database: root is page {}.", page_num);
                return Ok(page_num);
            }
            page_num = get_parent(&page.data);
        }
        Err(DbError::CorruptFile("no page is flagged as the root".into()))
    }

    /// Leaf page whose key range covers `key`.
    fn leaf_for_key(&mut self, key: u32) -> DbResult<u32> {
        let root = self.pager.get_page(self.root_page)?;
        match node_kind(&root.data)? {
            NodeKind::Leaf => Ok(self.root_page),
            NodeKind::Internal => {
                let child = internal_find_child(&root.data, key)?;
                debug!("find: key {} descends from root {} to page {}.", key, self.root_page, child);
                self.expect_leaf(child)?;
                Ok(child)
            }
        }
    }

    fn expect_leaf(&mut self, page_num: u32) -> DbResult<()> {
        match node_kind(&self.pager.get_page(page_num)?.data)? {
            NodeKind::Leaf => Ok(()),
            NodeKind::Internal => Err(DbError::NotImplemented(Unsupported::SearchInternalNode)),
        }
    }

    /// Cursor at `key`, or at the cell where `key` would be inserted.
    pub fn find(&mut self, key: u32) -> DbResult<Cursor<'_>> {
        let page_num = self.leaf_for_key(key)?;
        let cell_num = {
            let page = self.pager.get_page(page_num)?;
            match leaf_search(&page.data, key) {
                Ok(found) => found,
                Err(insert_at) => insert_at,
            }
        };
        Cursor::at(self, page_num, cell_num)
    }

    /// Insert `row` keyed by its id.
    pub fn insert(&mut self, row: &Row) -> DbResult<()> {
        row.validate()?;

        let root_kind = node_kind(&self.pager.get_page(self.root_page)?.data)?;
        if root_kind == NodeKind::Internal {
            debug!("insert: root {} is internal, refusing key {}.", self.root_page, row.id);
            return Err(DbError::NotImplemented(Unsupported::SearchInternalNode));
        }

        let (page_num, cell_num) = self.find(row.id)?.position();

        let page = self.pager.get_page(page_num)?;
        let num_cells = leaf_num_cells(&page.data) as usize;
        if cell_num < num_cells && leaf_key(&page.data, cell_num) == row.id {
            return Err(DbError::DuplicateKey(row.id));
        }

        if num_cells >= LEAF_NODE_MAX_CELLS {
            debug!("insert: leaf {} is full, splitting for key {}.", page_num, row.id);
            return self.split_and_insert(page_num, cell_num, row);
        }

        leaf_shift_right(&mut page.data, cell_num);
        set_leaf_key(&mut page.data, cell_num, row.id);
        row.serialize(leaf_value_mut(&mut page.data, cell_num));
        set_leaf_num_cells(&mut page.data, num_cells as u32 + 1);

        debug!("insert: key {} at cell {} of leaf {}.", row.id, cell_num, page_num);
        Ok(())
    }

    /// Split full leaf `old_page` while inserting `row` at `cell_num`.
    fn split_and_insert(&mut self, old_page: u32, cell_num: usize, row: &Row) -> DbResult<()> {
        let cells = {
            let old = self.pager.get_page(old_page)?;
            if !get_is_root(&old.data) {
                return Err(DbError::NotImplemented(Unsupported::UpdateParentAfterSplit));
            }

            let num_cells = leaf_num_cells(&old.data) as usize;
            let mut cells: Vec<Vec<u8>> = (0..num_cells)
                .map(|i| leaf_cell(&old.data, i).to_vec())
                .collect();

            let mut new_cell = vec![0u8; LEAF_NODE_CELL_SIZE];
            new_cell[LEAF_NODE_KEY_OFFSET..LEAF_NODE_KEY_OFFSET + LEAF_NODE_KEY_SIZE]
                .copy_from_slice(&row.id.to_le_bytes());
            row.serialize(&mut new_cell[LEAF_NODE_VALUE_OFFSET..]);
            cells.insert(cell_num, new_cell);
            cells
        };

        // Both new pages must fit before anything is written.
        self.pager.ensure_room(2)?;

        let (left_cells, right_cells) = cells.split_at(LEAF_NODE_LEFT_SPLIT_COUNT);

        let new_page = self.pager.allocate_page()?;
        {
            let right = self.pager.get_page(new_page)?;
            initialize_leaf_node(&mut right.data);
            write_cells(&mut right.data, right_cells);
        }
        {
            let left = self.pager.get_page(old_page)?;
            write_cells(&mut left.data, left_cells);
        }

        debug!(
            "split: leaf {} keeps {} cells, new leaf {} takes {}.",
            old_page,
            left_cells.len(),
            new_page,
            right_cells.len()
        );

        self.create_new_root(old_page, new_page)
    }

    /// Put a fresh internal root above the two halves of a split root leaf.
    fn create_new_root(&mut self, left_page: u32, right_page: u32) -> DbResult<()> {
        let separator = leaf_max_key(&self.pager.get_page(left_page)?.data)
            .ok_or_else(|| DbError::CorruptFile(format!("split left leaf {} is empty", left_page)))?;

        let root_page = self.pager.allocate_page()?;
        {
            let root = self.pager.get_page(root_page)?;
            initialize_internal_node(&mut root.data);
            set_is_root(&mut root.data, true);
            set_internal_num_keys(&mut root.data, 1);
            set_internal_cell(&mut root.data, 0, separator, left_page);
            set_internal_right_child(&mut root.data, right_page);
        }
        {
            let left = self.pager.get_page(left_page)?;
            set_is_root(&mut left.data, false);
            set_parent(&mut left.data, root_page);
        }
        {
            let right = self.pager.get_page(right_page)?;
            set_parent(&mut right.data, root_page);
        }

        self.root_page = root_page;
        debug!(
            "New root is internal page {} (left {}, key {}, right {}).",
            root_page, left_page, separator, right_page
        );
        Ok(())
    }

    /// Leaves reachable from the root, in key order.
    fn leaf_pages(&mut self) -> DbResult<Vec<u32>> {
        let root = self.pager.get_page(self.root_page)?;
        let children = match node_kind(&root.data)? {
            NodeKind::Leaf => return Ok(vec![self.root_page]),
            NodeKind::Internal => {
                let num_keys = internal_num_keys(&root.data) as usize;
                (0..=num_keys)
                    .map(|i| internal_child(&root.data, i))
                    .collect::<DbResult<Vec<u32>>>()?
            }
        };
        for &child in &children {
            self.expect_leaf(child)?;
        }
        Ok(children)
    }

    /// Cursor over every row in ascending key order.
    pub fn scan(&mut self) -> DbResult<Cursor<'_>> {
        let leaves = self.leaf_pages()?;
        Cursor::over_leaves(self, leaves)
    }

    /// Pre-order rendering of the tree, one line per entry.
    pub fn render_tree(&mut self) -> DbResult<Vec<String>> {
        let mut lines = Vec::new();
        self.render_node(self.root_page, 0, &mut lines)?;
        Ok(lines)
    }

    fn render_node(&mut self, page_num: u32, depth: usize, lines: &mut Vec<String>) -> DbResult<()> {
        if depth > self.pager.page_count() as usize {
            return Err(DbError::CorruptFile(format!("cycle through page {}", page_num)));
        }
        let indent = "  ".repeat(depth);
        let page = self.pager.get_page(page_num)?;

        match node_kind(&page.data)? {
            NodeKind::Leaf => {
                let num_cells = leaf_num_cells(&page.data) as usize;
                lines.push(format!("{}- leaf (size {})", indent, num_cells));
                for i in 0..num_cells {
                    lines.push(format!("{}  - {}", indent, leaf_key(&page.data, i)));
                }
            }
            NodeKind::Internal => {
                let num_keys = internal_num_keys(&page.data) as usize;
                lines.push(format!("{}- internal (size {})", indent, num_keys));
                let keys: Vec<u32> = (0..num_keys).map(|i| internal_key(&page.data, i)).collect();
                let children = (0..=num_keys)
                    .map(|i| internal_child(&page.data, i))
                    .collect::<DbResult<Vec<u32>>>()?;

                for (i, child) in children.into_iter().enumerate() {
                    self.render_node(child, depth + 1, lines)?;
                    if let Some(key) = keys.get(i) {
                        lines.push(format!("{}  - key {}", indent, key));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Rewrite a leaf's cell array with `cells`, zeroing the slots left over.
fn write_cells(data: &mut [u8; PAGE_SIZE], cells: &[Vec<u8>]) {
    for (i, cell) in cells.iter().enumerate() {
        leaf_cell_mut(data, i).copy_from_slice(cell);
    }
    for i in cells.len()..LEAF_NODE_MAX_CELLS {
        leaf_cell_mut(data, i).fill(0);
    }
    set_leaf_num_cells(data, cells.len() as u32);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbConfig;
    use tempfile::{tempdir, TempDir};

    fn open_table() -> (TempDir, Table) {
        let dir = tempdir().unwrap();
        let table = Table::open(dir.path().join("btree.db"), &DbConfig::default()).unwrap();
        (dir, table)
    }

    fn row(id: u32) -> Row {
        Row::new(id as i64, format!("user{}", id), format!("person{}@example.com", id)).unwrap()
    }

    #[test]
    fn inserts_keep_leaf_sorted() {
        let (_dir, mut table) = open_table();
        for id in [3, 1, 2] {
            table.insert(&row(id)).unwrap();
        }
        assert_eq!(
            table.render_tree().unwrap(),
            vec!["- leaf (size 3)", "  - 1", "  - 2", "  - 3"]
        );
    }

    #[test]
    fn duplicate_is_rejected_without_change() {
        let (_dir, mut table) = open_table();
        table.insert(&row(1)).unwrap();
        let clash = Row::new(1, "other", "other@example.com").unwrap();
        assert!(matches!(table.insert(&clash), Err(DbError::DuplicateKey(1))));
        assert_eq!(table.select().unwrap(), vec![row(1)]);
    }

    #[test]
    fn fourteenth_insert_splits_root() {
        let (_dir, mut table) = open_table();
        for id in 1..=14 {
            table.insert(&row(id)).unwrap();
        }

        assert_eq!(table.root_page(), 2);
        assert_eq!(table.page_count(), 3);

        let root = table.pager.get_page(2).unwrap();
        assert_eq!(node_kind(&root.data).unwrap(), NodeKind::Internal);
        assert!(get_is_root(&root.data));
        assert_eq!(internal_key(&root.data, 0), 7);
        assert_eq!(internal_child(&root.data, 0).unwrap(), 0);
        assert_eq!(internal_child(&root.data, 1).unwrap(), 1);

        for leaf in [0, 1] {
            let page = table.pager.get_page(leaf).unwrap();
            assert!(!get_is_root(&page.data));
            assert_eq!(get_parent(&page.data), 2);
            assert_eq!(leaf_num_cells(&page.data), 7);
        }
    }

    #[test]
    fn split_places_new_key_in_order() {
        let (_dir, mut table) = open_table();
        for id in (2..=28).step_by(2).take(13) {
            table.insert(&row(id)).unwrap();
        }
        table.insert(&row(5)).unwrap();

        let ids: Vec<u32> = table.select().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 4, 5, 6, 8, 10, 12, 14, 16, 18, 20, 22, 24, 26]);
        let root = table.pager.get_page(table.root_page()).unwrap();
        assert_eq!(internal_key(&root.data, 0), 12);
    }

    #[test]
    fn find_descends_one_internal_level() {
        let (_dir, mut table) = open_table();
        for id in 1..=14 {
            table.insert(&row(id)).unwrap();
        }
        assert_eq!(table.find(3).unwrap().position(), (0, 2));
        assert_eq!(table.find(7).unwrap().position(), (0, 6));
        assert_eq!(table.find(8).unwrap().position(), (1, 0));
        assert_eq!(table.get(14).unwrap(), Some(row(14)));
    }

    #[test]
    fn insert_under_internal_root_is_refused_untouched() {
        let (_dir, mut table) = open_table();
        for id in 1..=14 {
            table.insert(&row(id)).unwrap();
        }
        let before = table.render_tree().unwrap();
        assert!(matches!(
            table.insert(&row(15)),
            Err(DbError::NotImplemented(Unsupported::SearchInternalNode))
        ));
        assert_eq!(table.render_tree().unwrap(), before);
        assert_eq!(table.page_count(), 3);
    }

    #[test]
    fn split_without_room_leaves_tree_intact() {
        let dir = tempdir().unwrap();
        let config = DbConfig { max_pages: 2, ..DbConfig::default() };
        let mut table = Table::open(dir.path().join("small.db"), &config).unwrap();
        for id in 1..=13 {
            table.insert(&row(id)).unwrap();
        }
        assert!(matches!(
            table.insert(&row(14)),
            Err(DbError::CapacityExceeded { .. })
        ));
        assert_eq!(table.root_page(), 0);
        assert_eq!(table.page_count(), 1);
        assert_eq!(table.select().unwrap().len(), 13);
    }

    #[test]
    fn split_of_non_root_leaf_is_refused() {
        let (_dir, mut table) = open_table();
        for id in 1..=14 {
            table.insert(&row(id)).unwrap();
        }
        // Fill the right leaf directly, bypassing the root check in `insert`.
        for id in 15..=20 {
            let page = table.pager.get_page(1).unwrap();
            let n = leaf_num_cells(&page.data) as usize;
            set_leaf_key(&mut page.data, n, id);
            row(id).serialize(leaf_value_mut(&mut page.data, n));
            set_leaf_num_cells(&mut page.data, n as u32 + 1);
        }
        assert!(matches!(
            table.split_and_insert(1, 13, &row(21)),
            Err(DbError::NotImplemented(Unsupported::UpdateParentAfterSplit))
        ));
        assert_eq!(table.page_count(), 3);
    }

    #[test]
    fn second_internal_level_is_not_searched() {
        let (_dir, mut table) = open_table();
        for id in 1..=14 {
            table.insert(&row(id)).unwrap();
        }
        // Push the right leaf one level down: page 1 becomes an internal node
        // whose only child is a copy of the old leaf at page 3.
        let right_leaf = table.pager.get_page(1).unwrap().data;
        let moved = table.pager.allocate_page().unwrap();
        {
            let page = table.pager.get_page(moved).unwrap();
            page.data = right_leaf;
            set_parent(&mut page.data, 1);
        }
        {
            let page = table.pager.get_page(1).unwrap();
            initialize_internal_node(&mut page.data);
            set_parent(&mut page.data, 2);
            set_internal_right_child(&mut page.data, moved);
        }

        assert!(matches!(
            table.find(10),
            Err(DbError::NotImplemented(Unsupported::SearchInternalNode))
        ));
        assert!(matches!(
            table.get(14),
            Err(DbError::NotImplemented(Unsupported::SearchInternalNode))
        ));
        assert!(matches!(
            table.scan(),
            Err(DbError::NotImplemented(Unsupported::SearchInternalNode))
        ));
        assert!(matches!(
            table.select(),
            Err(DbError::NotImplemented(Unsupported::SearchInternalNode))
        ));

        // The left leaf is still one level down and stays reachable.
        assert_eq!(table.get(3).unwrap(), Some(row(3)));

        let mut expected = vec!["- internal (size 1)".to_string(), "  - leaf (size 7)".to_string()];
        expected.extend((1..=7).map(|k| format!("    - {}", k)));
        expected.push("  - key 7".to_string());
        expected.push("  - internal (size 0)".to_string());
        expected.push("    - leaf (size 7)".to_string());
        expected.extend((8..=14).map(|k| format!("      - {}", k)));
        assert_eq!(table.render_tree().unwrap(), expected);
    }
}
