use nom::{
    IResult, Parser,
    bytes::complete::{tag, take_till1},
    character::complete::{digit1, space0, space1},
    combinator::{all_consuming, map_res, opt, recognize},
};

use crate::error::{DbError, DbResult};
use crate::sql::ast::{Command, MetaCommand, Statement};

/// Signed decimal id; range checks happen in row validation.
fn row_id(input: &str) -> IResult<&str, i64> {
    map_res(recognize((opt(tag("-")), digit1)), |s: &str| s.parse::<i64>()).parse(input)
}

/// A whitespace-free token.
fn field(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c.is_whitespace()).parse(input)
}

fn insert_statement(input: &str) -> IResult<&str, Statement> {
    let (rest, (_, _, id, _, username, _, email, _)) = (
        tag("insert"),
        space1,
        row_id,
        space1,
        field,
        space1,
        field,
        space0,
    )
        .parse(input)?;

    Ok((
        rest,
        Statement::Insert {
            id,
            username: username.to_string(),
            email: email.to_string(),
        },
    ))
}

pub fn parse_meta_command(input: &str) -> DbResult<MetaCommand> {
    match input.trim_end() {
        ".exit" => Ok(MetaCommand::Exit),
        ".constants" => Ok(MetaCommand::Constants),
        ".btree" => Ok(MetaCommand::BTree),
        _ => Err(DbError::UnrecognizedCommand(input.to_string())),
    }
}

pub fn parse_statement(input: &str) -> DbResult<Statement> {
    if input.starts_with("insert") {
        return all_consuming(insert_statement)
            .parse(input)
            .map(|(_, stmt)| stmt)
            .map_err(|_| DbError::Syntax);
    }
    if input.trim_end() == "select" {
        return Ok(Statement::Select);
    }
    Err(DbError::UnrecognizedStatement(input.to_string()))
}

/// Classify one input line: a leading `.` makes it a meta-command.
pub fn parse_command(input: &str) -> DbResult<Command> {
    if input.starts_with('.') {
        parse_meta_command(input).map(Command::Meta)
    } else {
        parse_statement(input).map(Command::Statement)
    }
}
