//! Document scanner
//!
//! Checks the two header lines and flattens the rest of the document into
//! whitespace-separated tokens, remembering where each one came from.

use crate::error::{Error, Result};

/// Required prefix of the first line
pub const HEADER: &str = "#META filetype nsmf";

/// Required prefix of the second line
pub const GLOBAL_CONFIG: &str = "globalconfig";

/// Comment marker (rest of the line is ignored)
const COMMENT: char = ';';

/// A single whitespace-delimited word of the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// Token text
    pub text: &'a str,
    /// 1-based source line
    pub line: usize,
    /// Number of empty lines directly above the token's line
    /// (only set on the first token of a line)
    pub blank_lines: usize,
}

impl<'a> Token<'a> {
    pub fn new(text: &'a str, line: usize) -> Self {
        Self {
            text,
            line,
            blank_lines: 0,
        }
    }

    pub fn is(&self, keyword: &str) -> bool {
        self.text == keyword
    }
}

/// Verify the header and tokenize everything below it
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>> {
    let mut lines = source.lines();

    let meta = lines
        .next()
        .map(|l| l.trim_start_matches('\u{FEFF}'))
        .unwrap_or("");
    if !meta.starts_with(HEADER) {
        return Err(Error::malformed(1, "The document is not a valid NSMF file."));
    }

    let mut tokens = Vec::new();
    let mut blank_run = 0usize;

    for (idx, raw) in lines.enumerate() {
        let line_no = idx + 2;

        if line_no == 2 && !raw.starts_with(GLOBAL_CONFIG) {
            return Err(Error::malformed(
                2,
                "The document is not a valid NSMF file (expected globalconfig).",
            ));
        }

        if raw.trim().is_empty() {
            blank_run += 1;
            continue;
        }

        let code = match raw.find(COMMENT) {
            Some(pos) => &raw[..pos],
            None => raw,
        };

        let mut words = code.split_whitespace();
        if let Some(first) = words.next() {
            tokens.push(Token {
                text: first,
                line: line_no,
                blank_lines: blank_run,
            });
            tokens.extend(words.map(|w| Token::new(w, line_no)));
        }
        blank_run = 0;
    }

    if tokens.is_empty() {
        return Err(Error::malformed(
            2,
            "The document is not a valid NSMF file (expected globalconfig).",
        ));
    }

    Ok(tokens)
}
