// src/sql/ast.rs

/// Dot-prefixed commands handled by the shell itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaCommand {
    Exit,
    Constants,
    BTree,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `insert <id> <username> <email>`. The id is kept signed so that a
    /// negative value reaches row validation instead of failing to parse.
    Insert {
        id: i64,
        username: String,
        email: String,
    },
    Select,
}

/// One line of input, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Meta(MetaCommand),
    Statement(Statement),
}
