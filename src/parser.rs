//! Streaming JSON5 parsing for brush scripts
//!
//! Supports both single-line JSONL and multi-line JSON5 formats.
//! JSON5 adds support for comments, trailing commas, and unquoted keys.

use crate::models::{BrushOp, Warning};
use std::io::Read;
use thiserror::Error;

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
}

/// An op together with the line its object starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedOp {
    pub line: usize,
    pub op: BrushOp,
}

/// Result of parsing a script.
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    pub ops: Vec<ParsedOp>,
    pub warnings: Vec<Warning>,
}

/// Parse a single JSON5 string into a BrushOp.
///
/// Supports JSON5 features: comments, trailing commas, and unquoted keys.
pub fn parse_line(line: &str, line_number: usize) -> Result<BrushOp, ParseError> {
    json5::from_str(line).map_err(|e| ParseError { message: e.to_string(), line: line_number })
}

/// Tracks nesting across lines so an object can span several of them.
#[derive(Default)]
struct Depth {
    braces: i32,
    brackets: i32,
    quote: Option<char>,
    escape_next: bool,
    in_block_comment: bool,
}

impl Depth {
    fn scan(&mut self, line: &str) {
        let mut chars = line.chars().peekable();
        while let Some(ch) = chars.next() {
            if self.in_block_comment {
                if ch == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    self.in_block_comment = false;
                }
                continue;
            }
            if self.escape_next {
                self.escape_next = false;
                continue;
            }
            match (self.quote, ch) {
                (Some(_), '\\') => self.escape_next = true,
                (Some(q), c) if c == q => self.quote = None,
                (Some(_), _) => {}
                (None, '"' | '\'') => self.quote = Some(ch),
                (None, '/') if chars.peek() == Some(&'/') => return,
                (None, '/') if chars.peek() == Some(&'*') => {
                    chars.next();
                    self.in_block_comment = true;
                }
                (None, '{') => self.braces += 1,
                (None, '}') => self.braces -= 1,
                (None, '[') => self.brackets += 1,
                (None, ']') => self.brackets -= 1,
                _ => {}
            }
        }
    }

    fn balanced(&self) -> bool {
        self.braces <= 0 && self.brackets <= 0 && !self.in_block_comment
    }
}

/// True if `text` holds nothing but whitespace and comments.
fn is_blank(text: &str) -> bool {
    let mut rest = text.trim_start();
    loop {
        if rest.is_empty() {
            return true;
        }
        if let Some(after) = rest.strip_prefix("//") {
            rest = after.split_once('\n').map_or("", |(_, tail)| tail).trim_start();
        } else if let Some(after) = rest.strip_prefix("/*") {
            match after.split_once("*/") {
                Some((_, tail)) => rest = tail.trim_start(),
                None => return false,
            }
        } else {
            return false;
        }
    }
}

/// Parse a stream of JSON5 objects into brush ops.
///
/// Supports both formats:
/// - Single-line JSONL (one JSON5 object per line)
/// - Multi-line JSON5 (objects can span multiple lines, separated by whitespace)
///
/// JSON5 features supported:
/// - Comments (// single-line and /* multi-line */)
/// - Trailing commas in arrays and objects
/// - Unquoted object keys
///
/// A malformed object is reported as a warning at the line it starts on, and
/// parsing stops there.
pub fn parse_stream<R: Read>(reader: R) -> ParseResult {
    use std::io::BufRead;

    let mut result = ParseResult::default();
    let buf_reader = std::io::BufReader::new(reader);

    let mut accumulator = String::new();
    let mut start_line = 1;
    let mut depth = Depth::default();

    for (index, line) in buf_reader.lines().enumerate() {
        let current_line = index + 1;
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                result.warnings.push(Warning::new(e.to_string(), current_line));
                return result;
            }
        };

        // Skip blank and comment-only lines between objects
        if accumulator.is_empty() && is_blank(&line) {
            continue;
        }
        if accumulator.is_empty() {
            start_line = current_line;
        } else {
            accumulator.push('\n');
        }
        accumulator.push_str(&line);
        depth.scan(&line);

        // Try to parse when braces are balanced
        if depth.balanced() {
            if is_blank(&accumulator) {
                accumulator.clear();
                depth = Depth::default();
                continue;
            }
            match parse_line(&accumulator, start_line) {
                Ok(op) => result.ops.push(ParsedOp { line: start_line, op }),
                Err(e) => {
                    result.warnings.push(Warning::new(e.message, e.line));
                    // Stop parsing after error - can't reliably find next object boundary
                    return result;
                }
            }
            accumulator.clear();
            depth = Depth::default();
        }
    }

    // Handle any remaining accumulated content
    if !accumulator.trim().is_empty() {
        match parse_line(&accumulator, start_line) {
            Ok(op) => result.ops.push(ParsedOp { line: start_line, op }),
            Err(e) => result.warnings.push(Warning::new(e.message, e.line)),
        }
    }

    result
}
