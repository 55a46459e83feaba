pub mod config;
pub mod error;
pub mod execution;
pub mod sql;
pub mod storage;
