pub mod btree;
pub mod cursor;
pub mod node;
pub mod page;
pub mod pager;
pub mod row;
pub mod table;

pub use cursor::Cursor;
pub use row::Row;
pub use table::Table;
