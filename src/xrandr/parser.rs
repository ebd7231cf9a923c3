//! Recursive-descent parser for `xrandr --props` output
//!
//! The report is loosely specified and line oriented. Whitespace is skipped
//! while parsing header lines and mode lines, but property blocks are
//! indentation sensitive: one leading tab starts a property, two leading tabs
//! mark a continuation value (or documentation, for same-line values).

use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use super::lexer::Lexer;
use super::token::{Token, TokenKind};
use super::types::{Dimensions, Output, OutputMode, Position, Rate, Reflection, Report, Resolution, Rotation, Screen, Snapshot};
use crate::constants::xrandr as kw;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(
        "error parsing {section}: unexpected {found} token {literal:?}, wanted {wanted} ({expected}) at line {line}, column {column}"
    )]
    Syntax {
        section: &'static str,
        found: TokenKind,
        literal: String,
        wanted: TokenKind,
        expected: String,
        line: usize,
        column: usize,
    },
    #[error("error parsing {section}: invalid number {literal:?} at line {line}, column {column}")]
    Number {
        section: &'static str,
        literal: String,
        line: usize,
        column: usize,
    },
}

impl ParseError {
    pub fn line(&self) -> usize {
        match self {
            ParseError::Syntax { line, .. } | ParseError::Number { line, .. } => *line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            ParseError::Syntax { column, .. } | ParseError::Number { column, .. } => *column,
        }
    }
}

type Result<T> = std::result::Result<T, ParseError>;

/// Parse a full report into its screen header and output snapshot.
///
/// Invalid UTF-8 is replaced rather than rejected; such bytes can only appear
/// inside property values, where they are kept verbatim.
pub fn parse_report(input: &[u8]) -> Result<Report> {
    let text = String::from_utf8_lossy(input);
    Parser::new(&text).parse()
}

/// Parse a report, keeping only the outputs
pub fn parse_snapshot(input: &[u8]) -> Result<Snapshot> {
    parse_report(input).map(|report| report.snapshot)
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    token: Token<'a>,
    skip_whitespace: bool,
    section: &'static str,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let token = lexer.scan();
        let mut parser = Self {
            lexer,
            token,
            skip_whitespace: true,
            section: "screen",
        };
        parser.skip_insignificant();
        parser
    }

    fn parse(mut self) -> Result<Report> {
        let screen = self.parse_screen()?;

        let mut outputs = Vec::new();
        loop {
            outputs.push(self.parse_output()?);

            while self.skip(TokenKind::LineTerminator, &[]) {}
            if self.token.kind == TokenKind::Eof {
                break;
            }
        }

        Ok(Report {
            screen,
            snapshot: Snapshot::new(outputs),
        })
    }

    fn parse_screen(&mut self) -> Result<Screen> {
        self.section = "screen";

        self.expect(TokenKind::Name, &[kw::SCREEN])?;
        let index = self.consume_number(TokenKind::IntValue)?;
        self.expect(TokenKind::Punctuator, &[":"])?;
        self.expect(TokenKind::Name, &[kw::MINIMUM])?;
        let minimum = self.parse_screen_size()?;
        self.expect(TokenKind::Punctuator, &[","])?;
        self.expect(TokenKind::Name, &[kw::CURRENT])?;
        let current = self.parse_screen_size()?;
        self.expect(TokenKind::Punctuator, &[","])?;
        self.expect(TokenKind::Name, &[kw::MAXIMUM])?;
        let maximum = self.parse_screen_size()?;
        self.expect(TokenKind::LineTerminator, &[])?;

        Ok(Screen {
            index,
            minimum,
            current,
            maximum,
        })
    }

    /// `<w> x <h>`
    fn parse_screen_size(&mut self) -> Result<Resolution> {
        let width = self.consume_number(TokenKind::IntValue)?;
        self.expect(TokenKind::Name, &["x"])?;
        let height = self.consume_number(TokenKind::IntValue)?;
        Ok(Resolution::new(width, height))
    }

    fn parse_output(&mut self) -> Result<Output> {
        self.section = "output name";
        let name = self.consume(TokenKind::Name, &[])?;
        let mut output = Output::new(name.literal);

        self.parse_status(&mut output)?;
        self.parse_resolution_and_position(&mut output)?;
        self.parse_rotation_and_reflection(&mut output)?;
        self.parse_capabilities()?;
        self.parse_dimensions(&mut output)?;
        self.parse_properties(&mut output)?;
        self.parse_modes(&mut output)?;

        Ok(output)
    }

    fn parse_status(&mut self, output: &mut Output) -> Result<()> {
        self.section = "output status";
        let status = self.consume(TokenKind::Name, &[kw::CONNECTED, kw::DISCONNECTED])?;
        output.is_connected = status.literal == kw::CONNECTED;
        output.is_primary = self.skip(TokenKind::Name, &[kw::PRIMARY]);
        Ok(())
    }

    /// `WIDTHxHEIGHT+X+Y`, only present for enabled outputs
    fn parse_resolution_and_position(&mut self, output: &mut Output) -> Result<()> {
        self.section = "output resolution and position";
        if self.token.kind != TokenKind::Name {
            return Ok(());
        }
        let Some(resolution) = parse_resolution(self.token.literal) else {
            return Ok(());
        };
        self.scan();

        self.expect(TokenKind::Punctuator, &["+"])?;
        let offset_x = self.consume_number(TokenKind::IntValue)?;
        self.expect(TokenKind::Punctuator, &["+"])?;
        let offset_y = self.consume_number(TokenKind::IntValue)?;

        output.is_enabled = true;
        output.resolution = resolution;
        output.position = Position::new(offset_x, offset_y);
        Ok(())
    }

    fn parse_rotation_and_reflection(&mut self, output: &mut Output) -> Result<()> {
        self.section = "output rotation and reflection";
        if self.token.kind == TokenKind::Name
            && let Some(rotation) = Rotation::from_keyword(self.token.literal)
        {
            output.rotation = rotation;
            self.scan();
        }

        if self.skip(TokenKind::Name, &["x", "X"]) {
            if self.skip(TokenKind::Name, &["and"]) {
                self.expect(TokenKind::Name, &["y", "Y"])?;
                output.reflection = Reflection::XyAxis;
            } else {
                output.reflection = Reflection::XAxis;
            }
            self.expect(TokenKind::Name, &["axis"])?;
        } else if self.skip(TokenKind::Name, &["y", "Y"]) {
            output.reflection = Reflection::YAxis;
            self.expect(TokenKind::Name, &["axis"])?;
        }

        Ok(())
    }

    /// `(normal left inverted right x axis y axis)`, checked word by word
    fn parse_capabilities(&mut self) -> Result<()> {
        self.section = "output rotation and reflection capabilities";
        if !self.skip(TokenKind::Punctuator, &["("]) {
            return Ok(());
        }
        for word in kw::CAPABILITIES {
            self.expect(TokenKind::Name, &[word])?;
        }
        self.expect(TokenKind::Punctuator, &[")"])
    }

    /// `WIDTHmm x HEIGHTmm`, then the end of the output's header line
    fn parse_dimensions(&mut self, output: &mut Output) -> Result<()> {
        self.section = "output dimensions";
        if self.token.kind == TokenKind::Name {
            let width_mm = self.parse_dimension()?;
            self.expect(TokenKind::Name, &["x"])?;
            let height_mm = self.parse_dimension()?;
            output.dimensions = Dimensions { width_mm, height_mm };
        }

        // Properties may follow, and their indentation is significant.
        self.skip_whitespace = false;
        if self.token.kind == TokenKind::Eof {
            return Ok(());
        }
        self.expect(TokenKind::LineTerminator, &[])
    }

    fn parse_dimension(&mut self) -> Result<u32> {
        let token = self.token;
        let digits = token
            .literal
            .strip_suffix("mm")
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()));
        let Some(digits) = digits else {
            return Err(self.unexpected(TokenKind::Name, &["<n>mm"]));
        };
        let value = self.number(&token, digits)?;
        self.scan();
        Ok(value)
    }

    fn parse_properties(&mut self, output: &mut Output) -> Result<()> {
        self.section = "output properties";
        if !self.skip(TokenKind::WhiteSpace, &["\t"]) {
            return Ok(());
        }

        while !self.parse_property(output)? {}
        Ok(())
    }

    /// Parse one property, starting just after its single indenting tab.
    /// Returns true once the property block has ended.
    fn parse_property(&mut self, output: &mut Output) -> Result<bool> {
        let first = self.consume(TokenKind::Name, &[])?;

        let mut name = first.literal.to_string();
        while !self.token.is(TokenKind::Punctuator, &[":"]) {
            if matches!(self.token.kind, TokenKind::LineTerminator | TokenKind::Eof) {
                return Err(self.unexpected(TokenKind::Punctuator, &[":"]));
            }
            name.push_str(self.token.literal);
            self.scan();
        }
        self.scan();
        while self.skip(TokenKind::WhiteSpace, &[" "]) {}

        let mut value = String::new();
        let ended = if self.skip(TokenKind::LineTerminator, &[]) {
            // Value on the following lines, each indented by two tabs.
            loop {
                if !self.skip(TokenKind::WhiteSpace, &["\t"]) {
                    break true;
                }
                if !self.skip(TokenKind::WhiteSpace, &["\t"]) {
                    break false;
                }
                self.read_rest_of_line(Some(&mut value));
            }
        } else {
            // Value on the same line. Two-tab lines after it are documentation
            // such as `supported: ...` or `range: ...`.
            self.read_rest_of_line(Some(&mut value));
            loop {
                if !self.skip(TokenKind::WhiteSpace, &["\t"]) {
                    break true;
                }
                if !self.skip(TokenKind::WhiteSpace, &["\t"]) {
                    break false;
                }
                self.read_rest_of_line(None);
            }
        };

        output
            .properties
            .insert(name.trim().to_string(), value.trim().to_string());
        Ok(ended)
    }

    /// Consume everything up to and including the next line terminator,
    /// collecting the raw text if asked to.
    fn read_rest_of_line(&mut self, mut into: Option<&mut String>) {
        while !self.skip(TokenKind::LineTerminator, &[]) {
            if self.token.kind == TokenKind::Eof {
                return;
            }
            if let Some(text) = into.as_deref_mut() {
                text.push_str(self.token.literal);
            }
            self.scan();
        }
    }

    fn parse_modes(&mut self, output: &mut Output) -> Result<()> {
        self.section = "output modes";
        self.skip_whitespace = true;

        // Mode lines are indented with spaces; anything else is the next output.
        if !self.skip(TokenKind::WhiteSpace, &[" "]) {
            self.skip_insignificant();
            return Ok(());
        }

        while self.token.kind == TokenKind::Name {
            let token = self.token;
            let Some(resolution) = parse_resolution(token.literal) else {
                // An unindented name is the next output header.
                if token.column == 1 {
                    break;
                }
                // User-defined modes such as `1920x1080_60.00` name no resolution.
                debug!(mode = token.literal, line = token.line, "Skipping unrecognized mode line");
                self.read_rest_of_line(None);
                continue;
            };
            self.scan();

            let mut mode = OutputMode {
                resolution,
                rates: Vec::new(),
            };
            while self.token.kind == TokenKind::FloatValue {
                let token = self.token;
                let rate = self.number(&token, token.literal)?;
                self.scan();
                let is_current = self.skip(TokenKind::Punctuator, &["*"]);
                let is_preferred = self.skip(TokenKind::Punctuator, &["+"]);
                mode.rates.push(Rate {
                    rate,
                    is_current,
                    is_preferred,
                });
            }
            output.modes.push(mode);

            if self.token.kind == TokenKind::Eof {
                break;
            }
            self.expect(TokenKind::LineTerminator, &[])?;
        }

        Ok(())
    }

    fn scan(&mut self) {
        self.token = self.lexer.scan();
        self.skip_insignificant();
    }

    fn skip_insignificant(&mut self) {
        while self.skip_whitespace && self.token.kind == TokenKind::WhiteSpace {
            self.token = self.lexer.scan();
        }
    }

    fn consume(&mut self, kind: TokenKind, literals: &[&str]) -> Result<Token<'a>> {
        let token = self.token;
        if !token.is(kind, literals) {
            return Err(self.unexpected(kind, literals));
        }
        self.scan();
        Ok(token)
    }

    fn consume_number<T: FromStr>(&mut self, kind: TokenKind) -> Result<T> {
        let token = self.consume(kind, &[])?;
        self.number(&token, token.literal)
    }

    fn expect(&mut self, kind: TokenKind, literals: &[&str]) -> Result<()> {
        self.consume(kind, literals).map(|_| ())
    }

    fn skip(&mut self, kind: TokenKind, literals: &[&str]) -> bool {
        if self.token.is(kind, literals) {
            self.scan();
            true
        } else {
            false
        }
    }

    fn number<T: FromStr>(&self, token: &Token<'a>, digits: &str) -> Result<T> {
        digits.parse().map_err(|_| ParseError::Number {
            section: self.section,
            literal: token.literal.to_string(),
            line: token.line,
            column: token.column,
        })
    }

    fn unexpected(&self, wanted: TokenKind, literals: &[&str]) -> ParseError {
        let expected = if literals.is_empty() {
            "any".to_string()
        } else {
            literals.join("|")
        };
        ParseError::Syntax {
            section: self.section,
            found: self.token.kind,
            literal: self.token.literal.to_string(),
            wanted,
            expected,
            line: self.token.line,
            column: self.token.column,
        }
    }
}

/// Recognizes `^[0-9]+x[0-9]+i?$`; the interlace marker is accepted but not kept.
fn parse_resolution(literal: &str) -> Option<Resolution> {
    let literal = literal.strip_suffix('i').unwrap_or(literal);
    let (width, height) = literal.split_once('x')?;
    let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !is_digits(width) || !is_digits(height) {
        return None;
    }
    Some(Resolution::new(width.parse().ok()?, height.parse().ok()?))
}
