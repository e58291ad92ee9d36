//! A minimal reader for OGC WKT (version 1 and 2) that keeps the bracket tree.
//! It only checks the syntax, the semantics are left to the transform engine.

use crate::error::{self, Error};
use crate::util::Result;
use snafu::ResultExt;

/// Real definitions nest about ten levels deep
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum WktValue {
    /// A quoted string
    Text(String),
    /// A number or an enumeration value like `NORTH`
    Literal(String),
    Node(WktNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WktNode {
    pub keyword: String,
    pub values: Vec<WktValue>,
}

impl WktNode {
    pub fn parse(input: &str) -> Result<Self> {
        let mut parser = Parser {
            source: input,
            position: 0,
            depth: 0,
        };

        let node = parser.node()?;

        parser.skip_whitespace();
        if parser.position != input.len() {
            return parser.fail("trailing characters after the root node");
        }

        Ok(node)
    }

    pub fn children(&self) -> impl Iterator<Item = &WktNode> {
        self.values.iter().filter_map(|value| match value {
            WktValue::Node(node) => Some(node),
            _ => None,
        })
    }

    /// The first direct child with one of the given keywords
    pub fn child(&self, keywords: &[&str]) -> Option<&WktNode> {
        self.children()
            .find(|child| keywords.contains(&child.keyword.as_str()))
    }

    /// The `index`-th non-node value, quoted or not
    pub fn scalar(&self, index: usize) -> Option<&str> {
        self.values
            .iter()
            .filter_map(|value| match value {
                WktValue::Text(s) | WktValue::Literal(s) => Some(s.as_str()),
                WktValue::Node(_) => None,
            })
            .nth(index)
    }

    pub fn number(&self, index: usize) -> Result<Option<f64>> {
        self.scalar(index)
            .map(|value| {
                value
                    .trim()
                    .parse::<f64>()
                    .context(error::WktNumber { value })
            })
            .transpose()
    }
}

struct Parser<'a> {
    source: &'a str,
    position: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.source[self.position..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn fail<T>(&self, reason: &str) -> Result<T> {
        Err(Error::InvalidWkt {
            position: self.position,
            reason: reason.to_string(),
        })
    }

    fn word(&mut self) -> &str {
        let start = self.position;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.bump();
        }
        &self.source[start..self.position]
    }

    fn node(&mut self) -> Result<WktNode> {
        if self.depth >= MAX_DEPTH {
            return self.fail("nodes are nested too deeply");
        }

        self.depth += 1;
        let node = self.node_body();
        self.depth -= 1;
        node
    }

    fn node_body(&mut self) -> Result<WktNode> {
        self.skip_whitespace();

        let keyword = self.word().to_ascii_uppercase();
        if keyword.is_empty() {
            return self.fail("expected a keyword");
        }

        self.skip_whitespace();
        let close = match self.bump() {
            Some('[') => ']',
            Some('(') => ')',
            _ => return self.fail("expected `[` or `(`"),
        };

        let mut values = Vec::new();

        self.skip_whitespace();
        if self.peek() == Some(close) {
            self.bump();
            return Ok(WktNode { keyword, values });
        }

        loop {
            values.push(self.value()?);

            self.skip_whitespace();
            match self.bump() {
                Some(',') => {}
                Some(c) if c == close => break,
                Some(_) => return self.fail("expected `,` or a closing bracket"),
                None => return self.fail("unexpected end of input"),
            }
        }

        Ok(WktNode { keyword, values })
    }

    fn value(&mut self) -> Result<WktValue> {
        self.skip_whitespace();

        match self.peek() {
            Some('"') => self.quoted().map(WktValue::Text),
            Some(c) if c.is_ascii_alphabetic() => {
                let start = self.position;
                let word = self.word().to_string();

                self.skip_whitespace();
                if matches!(self.peek(), Some('[' | '(')) {
                    self.position = start;
                    self.node().map(WktValue::Node)
                } else {
                    Ok(WktValue::Literal(word))
                }
            }
            Some(_) => {
                let start = self.position;
                while self
                    .peek()
                    .is_some_and(|c| !matches!(c, ',' | ']' | ')') && !c.is_whitespace())
                {
                    self.bump();
                }

                if start == self.position {
                    return self.fail("expected a value");
                }

                Ok(WktValue::Literal(
                    self.source[start..self.position].to_string(),
                ))
            }
            None => self.fail("unexpected end of input"),
        }
    }

    fn quoted(&mut self) -> Result<String> {
        self.bump();

        let mut text = String::new();
        loop {
            match self.bump() {
                // a doubled quote is an escaped quote
                Some('"') if self.peek() == Some('"') => {
                    self.bump();
                    text.push('"');
                }
                Some('"') => return Ok(text),
                Some(c) => text.push(c),
                None => return self.fail("unterminated string"),
            }
        }
    }
}
