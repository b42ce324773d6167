use thiserror::Error;

use crate::cmd::parsed_command::{ParsedCommand, Stage};

use self::token::LexerError;

pub mod token;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandParseError {
    #[error("failed to tokenize command: {0}")]
    Lexer(#[from] LexerError),
    #[error("no command to execute")]
    NoCommand,
}

/// Tokenizes and parses one raw input line.
pub fn parse_command(line: &str) -> Result<ParsedCommand, CommandParseError> {
    let tokens = token::tokenize(line)?;
    parse_tokens(&tokens)
}

/// Scans a token sequence once, left to right, splitting it into pipeline
/// stages and pulling out the line-wide redirection and background directives.
///
/// `<` and `>` only act as operators when another token follows them. `&`
/// ends the scan: anything after it is dropped.
pub fn parse_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<ParsedCommand, CommandParseError> {
    let mut command = ParsedCommand::default();

    if tokens.is_empty() {
        return Ok(command);
    }

    let mut stages = Vec::new();
    let mut current = Vec::new();
    let mut tokens = tokens.iter().map(|token| token.as_ref()).peekable();

    while let Some(token) = tokens.next() {
        match token {
            "&" => {
                command.background = true;
                let dropped = tokens.by_ref().count();
                if dropped > 0 {
                    debug!(dropped, "ignoring tokens after `&`");
                }
                break;
            }
            "<" if tokens.peek().is_some() => {
                command.input_file = tokens.next().map(Into::into);
            }
            ">" if tokens.peek().is_some() => {
                command.output_file = tokens.next().map(Into::into);
            }
            "|" => stages.push(std::mem::take(&mut current)),
            word => current.push(word.to_owned()),
        }
    }

    stages.push(current);

    command.stages = stages
        .into_iter()
        .map(Stage::new)
        .collect::<Option<_>>()
        .ok_or(CommandParseError::NoCommand)?;

    trace!(?command, "parsed command");

    Ok(command)
}
