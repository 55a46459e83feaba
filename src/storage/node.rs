// Leaf node
// ┌──────────────────────────────────────────────────────────────────────────┐
// │ Offset │ Length │ Description                                            │
// │────────┼────────┼────────────────────────────────────────────────────────│
// │   0    │   6    │ Common header (see page.rs)                            │
// │   6    │   4    │ NUM_CELLS (u32)                                        │
// │  10    │ 297*N  │ Cells: [key u32][row ROW_SIZE bytes], ascending by key │
// └──────────────────────────────────────────────────────────────────────────┘
//
// Internal node
// ┌──────────────────────────────────────────────────────────────────────────┐
// │   0    │   6    │ Common header (see page.rs)                            │
// │   6    │   4    │ NUM_KEYS (u32)                                         │
// │  10    │   4    │ RIGHT_CHILD (u32 page number)                          │
// │  14    │   8*N  │ Cells: [key u32][child u32], ascending by key          │
// └──────────────────────────────────────────────────────────────────────────┘

use crate::error::{DbError, DbResult};
use crate::storage::page::{
    get_node_type, read_u32, set_is_root, set_node_type, write_u32, NodeKind,
    COMMON_NODE_HEADER_SIZE, PAGE_SIZE,
};
use crate::storage::row::ROW_SIZE;

pub const LEAF_NODE_NUM_CELLS_SIZE: usize = 4;
pub const LEAF_NODE_NUM_CELLS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
pub const LEAF_NODE_HEADER_SIZE: usize = COMMON_NODE_HEADER_SIZE + LEAF_NODE_NUM_CELLS_SIZE;

pub const LEAF_NODE_KEY_SIZE: usize = 4;
pub const LEAF_NODE_KEY_OFFSET: usize = 0;
pub const LEAF_NODE_VALUE_SIZE: usize = ROW_SIZE;
pub const LEAF_NODE_VALUE_OFFSET: usize = LEAF_NODE_KEY_OFFSET + LEAF_NODE_KEY_SIZE;
pub const LEAF_NODE_CELL_SIZE: usize = LEAF_NODE_KEY_SIZE + LEAF_NODE_VALUE_SIZE;
pub const LEAF_NODE_SPACE_FOR_CELLS: usize = PAGE_SIZE - LEAF_NODE_HEADER_SIZE;
pub const LEAF_NODE_MAX_CELLS: usize = LEAF_NODE_SPACE_FOR_CELLS / LEAF_NODE_CELL_SIZE;

/// Cells that stay in the old page when a full leaf splits.
pub const LEAF_NODE_LEFT_SPLIT_COUNT: usize = (LEAF_NODE_MAX_CELLS + 1).div_ceil(2);
pub const LEAF_NODE_RIGHT_SPLIT_COUNT: usize = (LEAF_NODE_MAX_CELLS + 1) - LEAF_NODE_LEFT_SPLIT_COUNT;

pub const INTERNAL_NODE_NUM_KEYS_SIZE: usize = 4;
pub const INTERNAL_NODE_NUM_KEYS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
pub const INTERNAL_NODE_RIGHT_CHILD_SIZE: usize = 4;
pub const INTERNAL_NODE_RIGHT_CHILD_OFFSET: usize =
    INTERNAL_NODE_NUM_KEYS_OFFSET + INTERNAL_NODE_NUM_KEYS_SIZE;
pub const INTERNAL_NODE_HEADER_SIZE: usize =
    COMMON_NODE_HEADER_SIZE + INTERNAL_NODE_NUM_KEYS_SIZE + INTERNAL_NODE_RIGHT_CHILD_SIZE;

pub const INTERNAL_NODE_KEY_SIZE: usize = 4;
pub const INTERNAL_NODE_CHILD_SIZE: usize = 4;
pub const INTERNAL_NODE_CELL_SIZE: usize = INTERNAL_NODE_KEY_SIZE + INTERNAL_NODE_CHILD_SIZE;
pub const INTERNAL_NODE_MAX_KEYS: usize =
    (PAGE_SIZE - INTERNAL_NODE_HEADER_SIZE) / INTERNAL_NODE_CELL_SIZE;

/// Node kind of `page`, once its cell or key count is known to fit the page.
///
/// Every page read back from the file goes through here before its cells are
/// indexed, so a bad count surfaces as `CorruptFile` instead of a slice panic.
pub fn node_kind(page: &[u8; PAGE_SIZE]) -> DbResult<NodeKind> {
    let kind = get_node_type(page)?;
    let (count, max) = match kind {
        NodeKind::Leaf => (leaf_num_cells(page) as usize, LEAF_NODE_MAX_CELLS),
        NodeKind::Internal => (internal_num_keys(page) as usize, INTERNAL_NODE_MAX_KEYS),
    };
    if count > max {
        return Err(DbError::CorruptFile(format!(
            "{:?} node claims {} entries, at most {} fit in a page",
            kind, count, max
        )));
    }
    Ok(kind)
}

/// Cell count of a leaf, checked against the page capacity.
pub fn leaf_cell_count(page: &[u8; PAGE_SIZE]) -> DbResult<usize> {
    match node_kind(page)? {
        NodeKind::Leaf => Ok(leaf_num_cells(page) as usize),
        NodeKind::Internal => Err(DbError::CorruptFile("expected a leaf node".into())),
    }
}

// ---- leaf ----------------------------------------------------------------

pub fn initialize_leaf_node(page: &mut [u8; PAGE_SIZE]) {
    set_node_type(page, NodeKind::Leaf);
    set_is_root(page, false);
    set_leaf_num_cells(page, 0);
}

pub fn leaf_num_cells(page: &[u8; PAGE_SIZE]) -> u32 {
    read_u32(page, LEAF_NODE_NUM_CELLS_OFFSET)
}

pub fn set_leaf_num_cells(page: &mut [u8; PAGE_SIZE], count: u32) {
    write_u32(page, LEAF_NODE_NUM_CELLS_OFFSET, count);
}

fn leaf_cell_offset(cell_num: usize) -> usize {
    LEAF_NODE_HEADER_SIZE + cell_num * LEAF_NODE_CELL_SIZE
}

/// The whole `[key][row]` cell at `cell_num`.
pub fn leaf_cell(page: &[u8; PAGE_SIZE], cell_num: usize) -> &[u8] {
    let offset = leaf_cell_offset(cell_num);
    &page[offset..offset + LEAF_NODE_CELL_SIZE]
}

pub fn leaf_cell_mut(page: &mut [u8; PAGE_SIZE], cell_num: usize) -> &mut [u8] {
    let offset = leaf_cell_offset(cell_num);
    &mut page[offset..offset + LEAF_NODE_CELL_SIZE]
}

pub fn leaf_key(page: &[u8; PAGE_SIZE], cell_num: usize) -> u32 {
    read_u32(page, leaf_cell_offset(cell_num) + LEAF_NODE_KEY_OFFSET)
}

pub fn set_leaf_key(page: &mut [u8; PAGE_SIZE], cell_num: usize, key: u32) {
    write_u32(page, leaf_cell_offset(cell_num) + LEAF_NODE_KEY_OFFSET, key);
}

/// Serialized row bytes of the cell at `cell_num`.
pub fn leaf_value(page: &[u8; PAGE_SIZE], cell_num: usize) -> &[u8] {
    let offset = leaf_cell_offset(cell_num) + LEAF_NODE_VALUE_OFFSET;
    &page[offset..offset + LEAF_NODE_VALUE_SIZE]
}

pub fn leaf_value_mut(page: &mut [u8; PAGE_SIZE], cell_num: usize) -> &mut [u8] {
    let offset = leaf_cell_offset(cell_num) + LEAF_NODE_VALUE_OFFSET;
    &mut page[offset..offset + LEAF_NODE_VALUE_SIZE]
}

/// Shift cells `[from, num_cells)` one slot to the right to open a gap at `from`.
/// The caller guarantees there is room for one more cell.
pub fn leaf_shift_right(page: &mut [u8; PAGE_SIZE], from: usize) {
    let num_cells = leaf_num_cells(page) as usize;
    if from >= num_cells {
        return;
    }
    let start = leaf_cell_offset(from);
    let end = leaf_cell_offset(num_cells);
    page.copy_within(start..end, start + LEAF_NODE_CELL_SIZE);
}

/// Largest key held by a non-empty leaf.
pub fn leaf_max_key(page: &[u8; PAGE_SIZE]) -> Option<u32> {
    match leaf_num_cells(page) {
        0 => None,
        n => Some(leaf_key(page, n as usize - 1)),
    }
}

/// Binary search for `key`. `Ok(i)` when cell `i` holds it, `Err(i)` with the
/// index it would be inserted at otherwise.
pub fn leaf_search(page: &[u8; PAGE_SIZE], key: u32) -> Result<usize, usize> {
    let mut min = 0usize;
    let mut one_past_max = leaf_num_cells(page) as usize;
    while min != one_past_max {
        let index = min + (one_past_max - min) / 2;
        let key_at_index = leaf_key(page, index);
        if key == key_at_index {
            return Ok(index);
        }
        if key < key_at_index {
            one_past_max = index;
        } else {
            min = index + 1;
        }
    }
    Err(min)
}

// ---- internal ------------------------------------------------------------

pub fn initialize_internal_node(page: &mut [u8; PAGE_SIZE]) {
    set_node_type(page, NodeKind::Internal);
    set_is_root(page, false);
    set_internal_num_keys(page, 0);
}

pub fn internal_num_keys(page: &[u8; PAGE_SIZE]) -> u32 {
    read_u32(page, INTERNAL_NODE_NUM_KEYS_OFFSET)
}

pub fn set_internal_num_keys(page: &mut [u8; PAGE_SIZE], count: u32) {
    write_u32(page, INTERNAL_NODE_NUM_KEYS_OFFSET, count);
}

pub fn internal_right_child(page: &[u8; PAGE_SIZE]) -> u32 {
    read_u32(page, INTERNAL_NODE_RIGHT_CHILD_OFFSET)
}

pub fn set_internal_right_child(page: &mut [u8; PAGE_SIZE], child: u32) {
    write_u32(page, INTERNAL_NODE_RIGHT_CHILD_OFFSET, child);
}

fn internal_cell_offset(cell_num: usize) -> usize {
    INTERNAL_NODE_HEADER_SIZE + cell_num * INTERNAL_NODE_CELL_SIZE
}

pub fn internal_key(page: &[u8; PAGE_SIZE], cell_num: usize) -> u32 {
    read_u32(page, internal_cell_offset(cell_num))
}

/// Write the `(key, child)` pair at `cell_num`.
pub fn set_internal_cell(page: &mut [u8; PAGE_SIZE], cell_num: usize, key: u32, child: u32) {
    let offset = internal_cell_offset(cell_num);
    write_u32(page, offset, key);
    write_u32(page, offset + INTERNAL_NODE_KEY_SIZE, child);
}

/// Child pointer `child_num`; `child_num == num_keys` names the right child.
pub fn internal_child(page: &[u8; PAGE_SIZE], child_num: usize) -> DbResult<u32> {
    let num_keys = internal_num_keys(page) as usize;
    if child_num > num_keys {
        return Err(DbError::CorruptFile(format!(
            "tried to access child {} of an internal node with {} keys",
            child_num, num_keys
        )));
    }
    if child_num == num_keys {
        Ok(internal_right_child(page))
    } else {
        Ok(read_u32(page, internal_cell_offset(child_num) + INTERNAL_NODE_KEY_SIZE))
    }
}

/// Index of the child whose key range may contain `key`: the first `i` with
/// `key <= separator[i]`, or `num_keys` for the right child.
pub fn internal_find_child_index(page: &[u8; PAGE_SIZE], key: u32) -> usize {
    let mut min = 0usize;
    let mut max = internal_num_keys(page) as usize;
    while min != max {
        let index = min + (max - min) / 2;
        if internal_key(page, index) >= key {
            max = index;
        } else {
            min = index + 1;
        }
    }
    min
}

/// Page number of the child whose key range may contain `key`.
pub fn internal_find_child(page: &[u8; PAGE_SIZE], key: u32) -> DbResult<u32> {
    internal_child(page, internal_find_child_index(page, key))
}
