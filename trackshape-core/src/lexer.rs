/// Line tokenizer for SIMIS text files (shapes and track section databases)
use nom::{
    branch::alt,
    bytes::complete::{take_till, take_till1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, map},
    multi::many0,
    sequence::{delimited, preceded, terminated},
    IResult,
};

use crate::error::{Error, Result};

/// Every SIMIS text file starts with a header line beginning with this
pub const SIMIS_HEADER_PREFIX: &str = "SIMISA@";

/// A token of the parenthesized SIMIS grammar
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token<'a> {
    Open,
    Close,
    /// A bare word or the contents of a double-quoted string
    Word(&'a str),
}

/// A token tagged with the zero-based line it was read from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpannedToken<'a> {
    pub token: Token<'a>,
    pub line: usize,
}

fn open(input: &str) -> IResult<&str, Token> {
    map(char('('), |_| Token::Open)(input)
}

fn close(input: &str) -> IResult<&str, Token> {
    map(char(')'), |_| Token::Close)(input)
}

fn quoted(input: &str) -> IResult<&str, Token> {
    map(
        delimited(char('"'), take_till(|c: char| c == '"'), char('"')),
        Token::Word,
    )(input)
}

fn bare_word(input: &str) -> IResult<&str, Token> {
    map(
        take_till1(|c: char| c.is_whitespace() || c == '(' || c == ')' || c == '"'),
        Token::Word,
    )(input)
}

fn line_tokens(input: &str) -> IResult<&str, Vec<Token>> {
    all_consuming(terminated(
        many0(preceded(multispace0, alt((open, close, quoted, bare_word)))),
        multispace0,
    ))(input)
}

/// Whether a line is the SIMIS file header
pub fn is_header_line(line: &str) -> bool {
    line.trim_start_matches('\u{feff}')
        .trim_start()
        .starts_with(SIMIS_HEADER_PREFIX)
}

/// Tokenize a single line
pub fn tokenize_line(line: &str) -> std::result::Result<Vec<Token>, String> {
    match line_tokens(line) {
        Ok((_, tokens)) => Ok(tokens),
        Err(e) => Err(format!("failed to tokenize line: {:?}", e)),
    }
}

/// Tokenize a whole document, skipping the SIMIS header line
pub fn tokenize<S: AsRef<str>>(lines: &[S]) -> Result<Vec<SpannedToken<'_>>> {
    let mut tokens = Vec::new();
    for (line_idx, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        if line_idx == 0 && is_header_line(line) {
            continue;
        }
        let line_tokens = tokenize_line(line).map_err(|e| Error::malformed(line_idx + 1, e))?;
        tokens.extend(line_tokens.into_iter().map(|token| SpannedToken {
            token,
            line: line_idx,
        }));
    }
    Ok(tokens)
}
