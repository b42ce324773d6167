use logos::{Lexer, Logos};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Default, Error)]
pub enum LexerError {
    #[default]
    #[error("unknown token")]
    UnknownToken,
    #[error("unterminated string")]
    UnterminatedString,
}

#[derive(Debug, PartialEq, Logos)]
#[logos(skip r"[ \t\r\n\f]+", error = LexerError)]
pub enum Token<'a> {
    #[token("|")]
    Pipe,
    #[token(">")]
    Write,
    #[token("<")]
    Read,
    #[token("&")]
    Background,

    #[regex(r#"[^ \t\r\n\f|<>&"']+"#)]
    Word(&'a str),
    #[regex(r#""([^"\\]|\\.)*""#, quoted_str_callback)]
    DoubleQuotedString(String),
    #[regex(r"'[^']*'", single_quoted_str_callback)]
    SingleQuotedString(String),
    // an opening quote that runs to the end of the line
    #[regex(r#""([^"\\]|\\.)*"#)]
    #[regex(r"'[^']*")]
    Unterminated,
}

impl Token<'_> {
    fn into_word(self) -> Result<String, LexerError> {
        Ok(match self {
            Self::Pipe => "|".to_owned(),
            Self::Write => ">".to_owned(),
            Self::Read => "<".to_owned(),
            Self::Background => "&".to_owned(),
            Self::Word(word) => word.to_owned(),
            Self::DoubleQuotedString(s) | Self::SingleQuotedString(s) => s,
            Self::Unterminated => return Err(LexerError::UnterminatedString),
        })
    }
}

fn quoted_str_callback<'a>(lex: &mut Lexer<'a, Token<'a>>) -> String {
    let slice = lex.slice();
    slice[1..slice.len() - 1].replace("\\\"", "\"")
}

fn single_quoted_str_callback<'a>(lex: &mut Lexer<'a, Token<'a>>) -> String {
    let slice = lex.slice();
    slice[1..slice.len() - 1].to_owned()
}

/// Splits one input line into the word tokens the command parser consumes.
///
/// Operators come back as their literal text, so `a|b` and `a | b` produce the
/// same sequence.
pub fn tokenize(line: &str) -> Result<Vec<String>, LexerError> {
    Token::lexer(line)
        .map(|token| token.and_then(Token::into_word))
        .collect()
}
