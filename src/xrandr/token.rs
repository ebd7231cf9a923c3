use std::fmt;

/// Kind of a lexical token. Every kind is significant; whitespace and line
/// terminators are left for the parser to skip or count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Illegal,
    Eof,
    /// One of `:(),*+`
    Punctuator,
    /// `[A-Za-z0-9_-]+` containing at least one non-digit
    Name,
    /// `[0-9]+`
    IntValue,
    /// `[0-9]+\.[0-9]*`
    FloatValue,
    /// A single space or tab
    WhiteSpace,
    /// LF, CR or CRLF
    LineTerminator,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Illegal => "illegal",
            TokenKind::Eof => "eof",
            TokenKind::Punctuator => "punctuator",
            TokenKind::Name => "name",
            TokenKind::IntValue => "int",
            TokenKind::FloatValue => "float",
            TokenKind::WhiteSpace => "whitespace",
            TokenKind::LineTerminator => "line terminator",
        };
        f.write_str(name)
    }
}

/// A token borrowing its literal from the scanned input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub literal: &'a str,
    /// Rune column of the token start on its line, starting at 1
    pub column: usize,
    /// Line of the token start, starting at 1
    pub line: usize,
}

impl<'a> Token<'a> {
    pub fn is(&self, kind: TokenKind, literals: &[&str]) -> bool {
        self.kind == kind && (literals.is_empty() || literals.contains(&self.literal))
    }
}
