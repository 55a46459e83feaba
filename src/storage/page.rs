// ┌─────────────────────────────────────────────────────────────────────────┐
// │ Offset │ Length │ Description                                           │
// │────────┼────────┼───────────────────────────────────────────────────────│
// │   0    │   1    │ NODE_TYPE (0 = internal, 1 = leaf)                    │
// │   1    │   1    │ IS_ROOT   (0 = false, 1 = true)                       │
// │   2    │   4    │ PARENT_PAGE (u32): page number of parent              │
// │────────┼────────┼───────────────────────────────────────────────────────│
// │   6    │  (PAGE_SIZE - 6)  ┆ Leaf or internal body, see node.rs         │
// └─────────────────────────────────────────────────────────────────────────│

use crate::error::{DbError, DbResult};

pub const PAGE_SIZE: usize = 4096;

pub const NODE_TYPE_SIZE: usize = 1;
pub const NODE_TYPE_OFFSET: usize = 0;
pub const IS_ROOT_SIZE: usize = 1;
pub const IS_ROOT_OFFSET: usize = NODE_TYPE_OFFSET + NODE_TYPE_SIZE;
pub const PARENT_POINTER_SIZE: usize = 4;
pub const PARENT_POINTER_OFFSET: usize = IS_ROOT_OFFSET + IS_ROOT_SIZE;
pub const COMMON_NODE_HEADER_SIZE: usize = NODE_TYPE_SIZE + IS_ROOT_SIZE + PARENT_POINTER_SIZE;

pub const NODE_INTERNAL: u8 = 0;
pub const NODE_LEAF: u8 = 1;

/// What a page holds, decoded once from its tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Internal,
    Leaf,
}

impl NodeKind {
    fn tag(self) -> u8 {
        match self {
            NodeKind::Internal => NODE_INTERNAL,
            NodeKind::Leaf => NODE_LEAF,
        }
    }
}

impl TryFrom<u8> for NodeKind {
    type Error = DbError;

    fn try_from(tag: u8) -> DbResult<Self> {
        match tag {
            NODE_INTERNAL => Ok(NodeKind::Internal),
            NODE_LEAF => Ok(NodeKind::Leaf),
            other => Err(DbError::CorruptFile(format!("unknown node type tag {}", other))),
        }
    }
}

pub(crate) fn read_u32(page: &[u8; PAGE_SIZE], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&page[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

pub(crate) fn write_u32(page: &mut [u8; PAGE_SIZE], offset: usize, value: u32) {
    page[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Read the node kind stored in the page's tag byte.
pub fn get_node_type(page: &[u8; PAGE_SIZE]) -> DbResult<NodeKind> {
    NodeKind::try_from(page[NODE_TYPE_OFFSET])
}

pub fn set_node_type(page: &mut [u8; PAGE_SIZE], kind: NodeKind) {
    page[NODE_TYPE_OFFSET] = kind.tag();
}

pub fn get_is_root(page: &[u8; PAGE_SIZE]) -> bool {
    page[IS_ROOT_OFFSET] != 0
}

pub fn set_is_root(page: &mut [u8; PAGE_SIZE], is_root: bool) {
    page[IS_ROOT_OFFSET] = u8::from(is_root);
}

/// Parent page number. Meaningless on the root.
pub fn get_parent(page: &[u8; PAGE_SIZE]) -> u32 {
    read_u32(page, PARENT_POINTER_OFFSET)
}

pub fn set_parent(page: &mut [u8; PAGE_SIZE], parent: u32) {
    write_u32(page, PARENT_POINTER_OFFSET, parent);
}
