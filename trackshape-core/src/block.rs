/// Block tree of the parenthesized SIMIS grammar
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::lexer::{SpannedToken, Token};

/// Keywords taking a label between the keyword and the opening parenthesis
const LABELED_KEYWORDS: &[&str] = &["prim_state", "matrix"];

/// A word or a nested block inside a block body
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Word(String),
    Block(Block),
}

/// `keyword [label] ( items... )` with the zero-based lines of the keyword and
/// of the closing parenthesis
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub keyword: String,
    pub label: Option<String>,
    pub items: Vec<Item>,
    pub first_line: usize,
    pub last_line: usize,
}

impl Block {
    pub fn is(&self, keyword: &str) -> bool {
        self.keyword.eq_ignore_ascii_case(keyword)
    }

    /// Words directly inside this block, nested blocks skipped
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|item| match item {
            Item::Word(word) => Some(word.as_str()),
            Item::Block(_) => None,
        })
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.items.iter().filter_map(|item| match item {
            Item::Block(block) => Some(block),
            Item::Word(_) => None,
        })
    }

    pub fn children<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a Block> {
        self.blocks().filter(move |block| block.is(keyword))
    }

    pub fn child(&self, keyword: &str) -> Option<&Block> {
        self.blocks().find(|block| block.is(keyword))
    }

    /// Like [`Block::child`] but a missing child is a malformed document
    pub fn require(&self, keyword: &str) -> Result<&Block> {
        self.child(keyword).ok_or_else(|| {
            Error::malformed(
                self.first_line + 1,
                format!("'{}' block without '{}'", self.keyword, keyword),
            )
        })
    }

    pub fn children_mut<'a>(&'a mut self, keyword: &'a str) -> impl Iterator<Item = &'a mut Block> {
        self.items.iter_mut().filter_map(move |item| match item {
            Item::Block(block) if block.is(keyword) => Some(block),
            _ => None,
        })
    }

    pub fn child_mut<'a>(&'a mut self, keyword: &'a str) -> Option<&'a mut Block> {
        self.children_mut(keyword).next()
    }

    pub fn word(&self, n: usize) -> Option<&str> {
        self.words().nth(n)
    }

    /// Replace the n-th direct word, false if there is none
    pub fn set_word(&mut self, n: usize, value: impl ToString) -> bool {
        let slot = self
            .items
            .iter_mut()
            .filter_map(|item| match item {
                Item::Word(word) => Some(word),
                Item::Block(_) => None,
            })
            .nth(n);
        match slot {
            Some(word) => {
                *word = value.to_string();
                true
            }
            None => false,
        }
    }

    /// Parse the n-th direct word
    pub fn parse_word<T: FromStr>(&self, n: usize) -> Result<T> {
        let word = self.word(n).ok_or_else(|| {
            Error::malformed(
                self.first_line + 1,
                format!("'{}' is missing value {}", self.keyword, n),
            )
        })?;
        parse_value(word, self.first_line)
    }

    /// Parse every direct word
    pub fn parse_words<T: FromStr>(&self) -> Result<Vec<T>> {
        self.words()
            .map(|word| parse_value(word, self.first_line))
            .collect()
    }

    /// Parse the direct words as a leading count followed by values
    pub fn counted_values<T: FromStr>(&self) -> Result<(usize, Vec<T>)> {
        let count = self.parse_word::<usize>(0)?;
        let values = self
            .words()
            .skip(1)
            .map(|word| parse_value(word, self.first_line))
            .collect::<Result<Vec<T>>>()?;
        Ok((count, values))
    }
}

pub fn parse_value<T: FromStr>(word: &str, line: usize) -> Result<T> {
    word.parse::<T>()
        .map_err(|_| Error::malformed(line + 1, format!("unexpected value '{}'", word)))
}

/// Parse a hexadecimal word such as `00000400` or `ff969696`
pub fn parse_hex(word: &str, line: usize) -> Result<u32> {
    u32::from_str_radix(word, 16)
        .map_err(|_| Error::malformed(line + 1, format!("unexpected hex value '{}'", word)))
}

struct Parser<'t, 'a> {
    tokens: &'t [SpannedToken<'a>],
    pos: usize,
}

impl<'t, 'a> Parser<'t, 'a> {
    fn peek(&self, offset: usize) -> Option<&SpannedToken<'a>> {
        self.tokens.get(self.pos + offset)
    }

    fn is_open(&self, offset: usize) -> bool {
        matches!(self.peek(offset), Some(t) if t.token == Token::Open)
    }

    /// Parse items until the closing parenthesis of the block opened on
    /// `open_line`, or until the end of input at the top level
    fn parse_items(&mut self, open_line: Option<usize>) -> Result<(Vec<Item>, usize)> {
        let mut items = Vec::new();
        loop {
            let Some(current) = self.peek(0).copied() else {
                return match open_line {
                    Some(line) => Err(Error::malformed(line + 1, "unclosed block")),
                    None => Ok((items, self.tokens.last().map_or(0, |t| t.line))),
                };
            };
            match current.token {
                Token::Close => {
                    if open_line.is_none() {
                        return Err(Error::malformed(current.line + 1, "unexpected ')'"));
                    }
                    self.pos += 1;
                    return Ok((items, current.line));
                }
                Token::Open => {
                    return Err(Error::malformed(current.line + 1, "'(' without keyword"));
                }
                Token::Word(word) => {
                    if self.is_open(1) {
                        self.pos += 2;
                        items.push(Item::Block(self.parse_block(word, None, current.line)?));
                    } else if LABELED_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
                        && self.is_open(2)
                    {
                        let label = match self.peek(1).map(|t| t.token) {
                            Some(Token::Word(label)) => label,
                            _ => return Err(Error::malformed(current.line + 1, "missing label")),
                        };
                        self.pos += 3;
                        items.push(Item::Block(self.parse_block(
                            word,
                            Some(label),
                            current.line,
                        )?));
                    } else {
                        self.pos += 1;
                        items.push(Item::Word(word.to_string()));
                    }
                }
            }
        }
    }

    fn parse_block(&mut self, keyword: &str, label: Option<&str>, line: usize) -> Result<Block> {
        let (items, last_line) = self.parse_items(Some(line))?;
        Ok(Block {
            keyword: keyword.to_string(),
            label: label.map(str::to_string),
            items,
            first_line: line,
            last_line,
        })
    }
}

/// Build the top-level items of a tokenized document
pub fn parse_items(tokens: &[SpannedToken]) -> Result<Vec<Item>> {
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_items(None).map(|(items, _)| items)
}

/// Build the top-level blocks of a tokenized document, ignoring stray words
pub fn parse_blocks(tokens: &[SpannedToken]) -> Result<Vec<Block>> {
    Ok(parse_items(tokens)?
        .into_iter()
        .filter_map(|item| match item {
            Item::Block(block) => Some(block),
            Item::Word(_) => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn blocks(text: &str) -> Result<Vec<Block>> {
        let lines: Vec<&str> = text.lines().collect();
        let tokens = tokenize(&lines)?;
        parse_blocks(&tokens)
    }

    #[test]
    fn test_nested_blocks_with_lines() {
        let parsed = blocks("points ( 2\n\tpoint ( 0 0 0 )\n\tpoint ( 1 2 3 )\n)").unwrap();
        assert_eq!(parsed.len(), 1);
        let points = &parsed[0];
        assert!(points.is("POINTS"));
        assert_eq!(points.parse_word::<usize>(0).unwrap(), 2);
        assert_eq!(points.first_line, 0);
        assert_eq!(points.last_line, 3);
        let second = points.children("point").nth(1).unwrap();
        assert_eq!(second.parse_words::<f64>().unwrap(), vec![1.0, 2.0, 3.0]);
        assert_eq!(second.first_line, 2);
    }

    #[test]
    fn test_labeled_blocks() {
        let parsed = blocks("prim_state rails ( 00000000 0\n\ttex_idxs ( 1 0 ) 0 0 0 0 1\n)").unwrap();
        let prim_state = &parsed[0];
        assert_eq!(prim_state.label.as_deref(), Some("rails"));
        assert_eq!(prim_state.words().count(), 7);
        assert!(prim_state.child("tex_idxs").is_some());
    }

    #[test]
    fn test_word_before_nested_block_is_not_a_label() {
        let parsed = blocks("vertex ( 00000000 0 0 ff969696 ff808080\n\tvertex_uvs ( 1 0 )\n)").unwrap();
        let vertex = &parsed[0];
        assert_eq!(vertex.words().count(), 5);
        assert_eq!(vertex.require("vertex_uvs").unwrap().last_line, 1);
    }

    #[test]
    fn test_set_word_in_nested_block() {
        let mut parsed = blocks("geometry_node ( 2 0 0 0 0\n\tcullable_prims ( 1 6 18 )\n)").unwrap();
        let cullable = parsed[0].child_mut("cullable_prims").unwrap();
        assert!(cullable.set_word(1, 7));
        assert!(!cullable.set_word(3, 0));
        assert_eq!(
            parsed[0].require("cullable_prims").unwrap().parse_words::<usize>().unwrap(),
            vec![1, 7, 18]
        );
    }

    #[test]
    fn test_unbalanced_parentheses() {
        assert!(matches!(
            blocks("points ( 1\n\tpoint ( 0 0 0 )"),
            Err(Error::MalformedDocument { line: 1, .. })
        ));
        assert!(matches!(
            blocks("points ( 0 )\n)"),
            Err(Error::MalformedDocument { line: 2, .. })
        ));
    }
}
