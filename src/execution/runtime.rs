use std::io::{BufRead, Write};

use log::{debug, warn};

use crate::error::DbResult;
use crate::sql::ast::{Command, MetaCommand, Statement};
use crate::sql::parser::parse_command;
use crate::storage::node::{
    LEAF_NODE_CELL_SIZE, LEAF_NODE_HEADER_SIZE, LEAF_NODE_MAX_CELLS, LEAF_NODE_SPACE_FOR_CELLS,
};
use crate::storage::page::COMMON_NODE_HEADER_SIZE;
use crate::storage::row::{Row, ROW_SIZE};
use crate::storage::table::Table;

pub const PROMPT: &str = "db > ";
pub const EXECUTED: &str = "Executed.";

/// Layout constants reported by `.constants`, in display order.
pub const CONSTANTS: [(&str, usize); 6] = [
    ("ROW_SIZE", ROW_SIZE),
    ("COMMON_NODE_HEADER_SIZE", COMMON_NODE_HEADER_SIZE),
    ("LEAF_NODE_HEADER_SIZE", LEAF_NODE_HEADER_SIZE),
    ("LEAF_NODE_CELL_SIZE", LEAF_NODE_CELL_SIZE),
    ("LEAF_NODE_SPACE_FOR_CELLS", LEAF_NODE_SPACE_FOR_CELLS),
    ("LEAF_NODE_MAX_CELLS", LEAF_NODE_MAX_CELLS),
];

/// Whether the session keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Run one statement, returning the lines to print.
pub fn handle_statement(table: &mut Table, stmt: Statement) -> DbResult<Vec<String>> {
    match stmt {
        Statement::Insert { id, username, email } => {
            let row = Row::new(id, username, email)?;
            table.insert(&row)?;
            Ok(vec![EXECUTED.to_string()])
        }
        Statement::Select => {
            let mut lines = Vec::new();
            for row in table.scan()? {
                lines.push(row?.to_string());
            }
            lines.push(EXECUTED.to_string());
            Ok(lines)
        }
    }
}

/// Run one meta-command other than `.exit`, returning the lines to print.
pub fn handle_meta_command(table: &mut Table, cmd: MetaCommand) -> DbResult<Vec<String>> {
    match cmd {
        MetaCommand::Exit => Ok(Vec::new()),
        MetaCommand::Constants => {
            let mut lines = vec!["Constants:".to_string()];
            lines.extend(CONSTANTS.iter().map(|(name, value)| format!("{}: {}", name, value)));
            Ok(lines)
        }
        MetaCommand::BTree => {
            let mut lines = vec!["Tree:".to_string()];
            lines.extend(table.render_tree()?);
            Ok(lines)
        }
    }
}

/// Execute one input line. Errors are turned into their message line so the
/// session carries on with the next request.
pub fn handle_line(table: &mut Table, line: &str) -> (Flow, Vec<String>) {
    let result = parse_command(line).and_then(|command| match command {
        Command::Meta(MetaCommand::Exit) => Ok((Flow::Exit, Vec::new())),
        Command::Meta(cmd) => handle_meta_command(table, cmd).map(|lines| (Flow::Continue, lines)),
        Command::Statement(stmt) => handle_statement(table, stmt).map(|lines| (Flow::Continue, lines)),
    });

    match result {
        Ok(outcome) => outcome,
        Err(e) => {
            if e.is_request_error() {
                debug!("Rejected {:?}: {}", line, e);
            } else {
                warn!("Error executing {:?}: {}", line, e);
            }
            (Flow::Continue, vec![e.to_string()])
        }
    }
}

/// Prompt, read and execute lines until `.exit` or end of input, then close
/// the table. The table is closed even if reading input fails.
pub fn run_session<R: BufRead, W: Write>(mut table: Table, input: R, out: &mut W) -> DbResult<()> {
    let session = drive(&mut table, input, out);
    let closed = table.close();
    session.and(closed)
}

fn drive<R: BufRead, W: Write>(table: &mut Table, input: R, out: &mut W) -> DbResult<()> {
    let mut lines = input.lines();
    loop {
        write!(out, "{}", PROMPT)?;
        out.flush()?;

        let Some(line) = lines.next() else {
            break; // EOF
        };
        let line = line?;

        let (flow, output) = handle_line(table, &line);
        for text in output {
            writeln!(out, "{}", text)?;
        }
        if flow == Flow::Exit {
            break;
        }
    }
    out.flush()?;
    Ok(())
}
