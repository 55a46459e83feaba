use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::{debug, info};

use crate::config::DbConfig;
use crate::error::{DbError, DbResult};
use crate::storage::page::PAGE_SIZE;

/// A single 4 KiB page of data.
pub struct Page {
    pub data: [u8; PAGE_SIZE],
}

impl Page {
    pub(crate) fn new() -> Self {
        Page { data: [0; PAGE_SIZE] }
    }
}

/// Pager: maps page numbers to 4 KiB buffers backed by the database file.
///
/// Every page touched stays cached until `close`, which writes them all back
/// in page-number order. Pages that did not exist in the file at open time
/// start zeroed and only reach the disk at that point.
pub struct Pager {
    file: File,

    /// Pages that were already in the file when it was opened.
    file_length_pages: u32,

    /// Pages known right now, including ones allocated since open.
    num_pages: u32,

    /// Page numbers at or above this are refused.
    max_pages: u32,

    sync_on_close: bool,

    /// `cache[page_num] = Some(page)` once that page has been touched.
    cache: Vec<Option<Box<Page>>>,
}

impl Pager {
    /// Open (or create) the database file at `path`.
    ///
    /// Fails with `CorruptFile` if the file length is not a whole number of pages.
    pub fn open(path: impl AsRef<Path>, config: &DbConfig) -> DbResult<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let file_len = file.metadata()?.len();

        if file_len % PAGE_SIZE as u64 != 0 {
            return Err(DbError::CorruptFile(format!(
                "{} is {} bytes, not a whole number of {}-byte pages",
                path.display(),
                file_len,
                PAGE_SIZE
            )));
        }
        let file_length_pages = u32::try_from(file_len / PAGE_SIZE as u64).map_err(|_| {
            DbError::CorruptFile(format!("{} has more pages than can be addressed", path.display()))
        })?;

        info!(
            "Opened {} with {} page(s) on disk.",
            path.display(),
            file_length_pages
        );

        Ok(Pager {
            file,
            file_length_pages,
            num_pages: file_length_pages,
            max_pages: config.max_pages,
            sync_on_close: config.sync_on_close,
            cache: Vec::new(),
        })
    }

    /// Return a mutable reference to page `page_num`, loading it from disk on
    /// first access if it exists there. Touching a page past the current end
    /// extends `num_pages`.
    pub fn get_page(&mut self, page_num: u32) -> DbResult<&mut Page> {
        if page_num >= self.max_pages {
            return Err(DbError::CapacityExceeded {
                page_num,
                max_pages: self.max_pages,
            });
        }

        let idx = page_num as usize;
        if self.cache.len() <= idx {
            self.cache.resize_with(idx + 1, || None);
        }

        let page = match self.cache[idx].take() {
            Some(page) => page,
            None => self.load(page_num)?,
        };

        if page_num >= self.num_pages {
            self.num_pages = page_num + 1;
        }

        Ok(self.cache[idx].insert(page).as_mut())
    }

    fn load(&mut self, page_num: u32) -> DbResult<Box<Page>> {
        let mut page = Box::new(Page::new());

        if page_num < self.file_length_pages {
            debug!("Cache miss: loading page {} from disk.", page_num);
            let offset = page_num as u64 * PAGE_SIZE as u64;
            self.file.seek(SeekFrom::Start(offset))?;
            self.file.read_exact(&mut page.data)?;
        } else {
            debug!("Cache miss: page {} is new, starting zeroed.", page_num);
        }

        Ok(page)
    }

    /// Fail with `CapacityExceeded` unless `count` more pages fit under the bound.
    pub fn ensure_room(&self, count: u32) -> DbResult<()> {
        let needed = self.num_pages.saturating_add(count);
        if needed > self.max_pages {
            return Err(DbError::CapacityExceeded {
                page_num: needed - 1,
                max_pages: self.max_pages,
            });
        }
        Ok(())
    }

    /// Hand out the next unused page number and bring that (zeroed) page into the cache.
    pub fn allocate_page(&mut self) -> DbResult<u32> {
        let page_num = self.unused_page_num();
        self.get_page(page_num)?;
        debug!("Allocated page {}.", page_num);
        Ok(page_num)
    }

    /// Write the first `size` bytes of cached page `page_num` to its slot in the file.
    pub fn flush(&mut self, page_num: u32, size: usize) -> DbResult<()> {
        let page = self
            .cache
            .get(page_num as usize)
            .and_then(|slot| slot.as_deref())
            .ok_or_else(|| {
                DbError::Io(io::Error::other(format!(
                    "tried to flush page {} which was never loaded",
                    page_num
                )))
            })?;
        let size = size.min(PAGE_SIZE);

        let offset = page_num as u64 * PAGE_SIZE as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&page.data[..size])?;

        if size == PAGE_SIZE && page_num >= self.file_length_pages {
            self.file_length_pages = page_num + 1;
        }
        Ok(())
    }

    /// Flush every cached page once, in page-number order, and release the file.
    pub fn close(mut self) -> DbResult<()> {
        let mut flushed = 0usize;
        for page_num in 0..self.num_pages {
            let cached = self
                .cache
                .get(page_num as usize)
                .is_some_and(|slot| slot.is_some());
            if cached {
                self.flush(page_num, PAGE_SIZE)?;
                flushed += 1;
            }
        }
        self.file.flush()?;
        if self.sync_on_close {
            self.file.sync_all()?;
        }

        info!(
            "Closed database file: flushed {} page(s), {} page(s) total.",
            flushed, self.num_pages
        );
        Ok(())
    }

    /// How many pages the pager knows about (on disk plus newly touched).
    pub fn page_count(&self) -> u32 {
        self.num_pages
    }

    /// Next free page number. Pages are never reused, so this is the end of the file.
    pub fn unused_page_num(&self) -> u32 {
        self.num_pages
    }
}
