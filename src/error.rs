use thiserror::Error;
use std::io;

/// The capability a request ran into that this revision of the B-tree does not have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unsupported {
    /// Descending through an internal node below the root.
    SearchInternalNode,
    /// Inserting a separator into an existing internal parent after a split.
    UpdateParentAfterSplit,
}

impl Unsupported {
    pub fn message(&self) -> &'static str {
        match self {
            Unsupported::SearchInternalNode => "Need to implement searching an internal node",
            Unsupported::UpdateParentAfterSplit => "Need to implement updating parent after split",
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("ID must be positive.")]
    IdMustBePositive,
    #[error("ID is too large.")]
    IdTooLarge,
    #[error("String is too long.")]
    StringTooLong,
    #[error("Error: Duplicate key.")]
    DuplicateKey(u32),
    #[error("{}", .0.message())]
    NotImplemented(Unsupported),
    #[error("Cursor is past the end of the table.")]
    EndOfTable,
    #[error("Tried to fetch page number out of bounds. {page_num} >= {max_pages}")]
    CapacityExceeded { page_num: u32, max_pages: u32 },
    #[error("Corrupt database file: {0}")]
    CorruptFile(String),
    #[error("Syntax error. Could not parse statement.")]
    Syntax,
    #[error("Unrecognized keyword at start of '{0}'.")]
    UnrecognizedStatement(String),
    #[error("Unrecognized command '{0}'.")]
    UnrecognizedCommand(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl DbError {
    /// Errors that only reject the current request and leave the file untouched.
    pub fn is_request_error(&self) -> bool {
        !matches!(self, DbError::Io(_) | DbError::CorruptFile(_) | DbError::CapacityExceeded { .. })
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_the_session_contract() {
        assert_eq!(DbError::IdMustBePositive.to_string(), "ID must be positive.");
        assert_eq!(DbError::StringTooLong.to_string(), "String is too long.");
        assert_eq!(DbError::DuplicateKey(1).to_string(), "Error: Duplicate key.");
        assert_eq!(
            DbError::NotImplemented(Unsupported::SearchInternalNode).to_string(),
            "Need to implement searching an internal node"
        );
        assert_eq!(
            DbError::UnrecognizedCommand(".foo".into()).to_string(),
            "Unrecognized command '.foo'."
        );
    }

    #[test]
    fn io_errors_are_not_request_errors() {
        let err: DbError = io::Error::other("disk gone").into();
        assert!(!err.is_request_error());
        assert!(DbError::Syntax.is_request_error());
    }
}
