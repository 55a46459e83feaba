use std::path::Path;

use log::info;

use crate::config::DbConfig;
use crate::error::DbResult;
use crate::storage::pager::Pager;
use crate::storage::row::Row;

/// Handle on one database file: the pager plus the page number of the current root.
///
/// The B-tree operations (`find`, `insert`, `scan`, `render_tree`) live in
/// `btree.rs`; this file covers opening, closing and the convenience wrappers
/// the command layer uses.
pub struct Table {
    pub(crate) pager: Pager,
    pub(crate) root_page: u32,
}

impl Table {
    /// Open (or create) the table stored at `path`.
    ///
    /// An empty file gets an empty root leaf at page 0. Otherwise the root is
    /// located by walking parent pointers up from page 0.
    pub fn open(path: impl AsRef<Path>, config: &DbConfig) -> DbResult<Table> {
        let mut pager = Pager::open(path, config)?;
        let root_page = if pager.page_count() == 0 {
            Table::initialize_root(&mut pager)?
        } else {
            Table::locate_root(&mut pager)?
        };
        info!("Table ready, root at page {}.", root_page);
        Ok(Table { pager, root_page })
    }

    /// Flush every cached page and release the file.
    pub fn close(self) -> DbResult<()> {
        self.pager.close()
    }

    /// Every row, ascending by id.
    pub fn select(&mut self) -> DbResult<Vec<Row>> {
        self.scan()?.collect()
    }

    /// Point lookup by id.
    pub fn get(&mut self, id: u32) -> DbResult<Option<Row>> {
        let mut cursor = self.find(id)?;
        if cursor.is_end() || cursor.key()? != id {
            return Ok(None);
        }
        cursor.value().map(Some)
    }

    pub fn root_page(&self) -> u32 {
        self.root_page
    }

    pub fn page_count(&self) -> u32 {
        self.pager.page_count()
    }
}
