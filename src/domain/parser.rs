//! Reader for `tree <name> = [&U] (<topology>);` records.
//!
//! Documents are scanned line by line. A line whose first word is `tree`
//! (any case) holds exactly one record; every other line is ignored, which
//! lets NEXUS framing (`#NEXUS`, `Begin trees;`, `end;`) pass through.

use regex::Regex;
use tracing::{debug, instrument};

use crate::domain::arena::Topology;
use crate::domain::error::{DomainError, DomainResult};

/// One parsed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRecord {
    pub name: String,
    pub topology: Topology,
    /// 1-based line number within the document
    pub line: usize,
}

/// Parses tree documents into records.
pub struct TreeReader {
    record_start: Regex,
    header: Regex,
}

impl Default for TreeReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeReader {
    pub fn new() -> Self {
        Self {
            record_start: Regex::new(r"(?i)^\s*tree\s").unwrap(),
            header: Regex::new(r"(?i)^\s*tree\s+([^\s=]+)\s*=((?:\s*\[[^\]]*\])*)\s*").unwrap(),
        }
    }

    /// Parse every record of a document, in order.
    #[instrument(level = "debug", skip_all)]
    pub fn parse_document(&self, text: &str) -> DomainResult<Vec<TreeRecord>> {
        let mut records = Vec::new();
        for (i, line) in text.lines().enumerate() {
            if let Some(record) = self.parse_line(line, i + 1)? {
                records.push(record);
            }
        }
        debug!("parsed {} tree records", records.len());
        Ok(records)
    }

    /// Parse one line; `Ok(None)` when it is not a tree record.
    pub fn parse_line(&self, line: &str, line_no: usize) -> DomainResult<Option<TreeRecord>> {
        if !self.record_start.is_match(line) {
            return Ok(None);
        }
        let Some(caps) = self.header.captures(line) else {
            return Err(DomainError::Parse {
                line: line_no,
                column: 1,
                fragment: fragment(line, 0),
                message: "expected `tree <name> = <topology>`".to_string(),
            });
        };
        let name = caps[1].to_string();
        let body_start = caps.get(0).map_or(0, |m| m.end());

        let mut cursor = Cursor::new(line, body_start, line_no);
        let topology = cursor.parse_record_body()?;
        Ok(Some(TreeRecord {
            name,
            topology,
            line: line_no,
        }))
    }
}

/// Parse a bare parenthesized topology such as `(A,(B,C))` with an optional
/// trailing `;`.
pub fn parse_topology(text: &str) -> DomainResult<Topology> {
    Cursor::new(text, 0, 1).parse_record_body()
}

const DELIMITERS: &[u8] = b"(),;";

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str, pos: usize, line: usize) -> Self {
        Self { text, pos, line }
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Advance to the next delimiter, returning the skipped text.
    fn take_until_delimiter(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(|b| !DELIMITERS.contains(&b)) {
            self.pos += 1;
        }
        &self.text[start..self.pos]
    }

    fn error(&self, at: usize, message: impl Into<String>) -> DomainError {
        DomainError::Parse {
            line: self.line,
            column: self.text[..at].chars().count() + 1,
            fragment: fragment(self.text, at),
            message: message.into(),
        }
    }

    fn parse_record_body(&mut self) -> DomainResult<Topology> {
        self.skip_whitespace();
        if self.peek() != Some(b'(') {
            return Err(self.error(self.pos, "expected `(` to start the topology"));
        }
        let topology = self.parse_group()?;
        self.skip_whitespace();
        if self.peek() == Some(b';') {
            self.pos += 1;
            self.skip_whitespace();
        }
        if self.pos < self.text.len() {
            return Err(self.error(self.pos, "unexpected text after topology"));
        }
        Ok(topology)
    }

    fn parse_group(&mut self) -> DomainResult<Topology> {
        let open = self.pos;
        // consume `(`
        self.pos += 1;
        let mut children = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'(') => children.push(self.parse_group()?),
                Some(_) => children.push(self.parse_label()?),
                None => return Err(self.error(open, "unbalanced parentheses: missing `)`")),
            }
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b')') => {
                    self.pos += 1;
                    // support values and branch lengths on groups are not kept
                    self.take_until_delimiter();
                    return Ok(Topology::Group(children));
                }
                Some(b';') | None => {
                    return Err(self.error(open, "unbalanced parentheses: missing `)`"))
                }
                Some(_) => return Err(self.error(self.pos, "expected `,` or `)`")),
            }
        }
    }

    fn parse_label(&mut self) -> DomainResult<Topology> {
        let start = self.pos;
        let label = self.take_until_delimiter().trim();
        if label.is_empty() {
            return Err(self.error(start, "empty label"));
        }
        Ok(Topology::Leaf(label.to_string()))
    }
}

/// Short excerpt of `text` starting at byte offset `at`.
fn fragment(text: &str, at: usize) -> String {
    text.get(at..)
        .unwrap_or_default()
        .chars()
        .take(16)
        .collect()
}
