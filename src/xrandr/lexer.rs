//! Lexical analysis of `xrandr --props` output

use super::token::{Token, TokenKind};

/// Scanner over the report text, producing one [`Token`] per [`Lexer::scan`]
/// call. Supports a single rune of pushback.
pub struct Lexer<'a> {
    input: &'a str,
    /// Byte offset of the next rune to read
    pos: usize,
    /// Runes read so far on the current line
    column: usize,
    line: usize,
    /// Byte width of the last rune read, zero once it has been pushed back
    last_width: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            column: 0,
            line: 1,
            last_width: 0,
        }
    }

    /// Read the next token. Characters that are not understood yield an
    /// [`TokenKind::Illegal`] token; past the end of input this keeps
    /// returning [`TokenKind::Eof`].
    pub fn scan(&mut self) -> Token<'a> {
        let start = self.pos;
        let column = self.column + 1;
        let line = self.line;

        let Some(ch) = self.read() else {
            return Token {
                kind: TokenKind::Eof,
                literal: "",
                column,
                line,
            };
        };

        let kind = match ch {
            c if is_name_char(c) => self.scan_name_or_number(c),
            ' ' | '\t' => TokenKind::WhiteSpace,
            '\r' => {
                if let Some(next) = self.read()
                    && next != '\n'
                {
                    self.unread();
                }
                TokenKind::LineTerminator
            }
            '\n' => TokenKind::LineTerminator,
            ':' | '(' | ')' | ',' | '*' | '+' => TokenKind::Punctuator,
            _ => TokenKind::Illegal,
        };

        let token = Token {
            kind,
            literal: &self.input[start..self.pos],
            column,
            line,
        };

        if kind == TokenKind::LineTerminator {
            self.line += 1;
            self.column = 0;
        }

        token
    }

    /// Names and numbers share a character set, so they are scanned together:
    /// the token stays an int while only digits are seen, becomes a float on
    /// its first `.`, and becomes a name on any letter, `_` or `-`.
    fn scan_name_or_number(&mut self, first: char) -> TokenKind {
        let mut kind = if first.is_ascii_digit() {
            TokenKind::IntValue
        } else {
            TokenKind::Name
        };

        while let Some(ch) = self.read() {
            match ch {
                '0'..='9' => {}
                c if is_name_char(c) && kind != TokenKind::FloatValue => kind = TokenKind::Name,
                '.' if kind == TokenKind::IntValue => kind = TokenKind::FloatValue,
                _ => {
                    self.unread();
                    break;
                }
            }
        }

        kind
    }

    fn read(&mut self) -> Option<char> {
        let ch = self.input[self.pos..].chars().next()?;
        self.last_width = ch.len_utf8();
        self.pos += self.last_width;
        self.column += 1;
        Some(ch)
    }

    fn unread(&mut self) {
        debug_assert!(self.last_width > 0, "only one rune of pushback is supported");
        self.pos -= self.last_width;
        self.last_width = 0;
        self.column = self.column.saturating_sub(1);
    }
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_literals(input: &str) -> Vec<(TokenKind, &str)> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.scan();
            if token.kind == TokenKind::Eof {
                break;
            }
            tokens.push((token.kind, token.literal));
        }
        tokens
    }

    #[test]
    fn test_names_and_numbers() {
        assert_eq!(
            kinds_and_literals("eDP-1 1920 59.93 1920x1080 346mm _x"),
            vec![
                (TokenKind::Name, "eDP-1"),
                (TokenKind::WhiteSpace, " "),
                (TokenKind::IntValue, "1920"),
                (TokenKind::WhiteSpace, " "),
                (TokenKind::FloatValue, "59.93"),
                (TokenKind::WhiteSpace, " "),
                (TokenKind::Name, "1920x1080"),
                (TokenKind::WhiteSpace, " "),
                (TokenKind::Name, "346mm"),
                (TokenKind::WhiteSpace, " "),
                (TokenKind::Name, "_x"),
            ]
        );
    }

    #[test]
    fn test_resolution_with_offsets() {
        assert_eq!(
            kinds_and_literals("1920x1080+0+0"),
            vec![
                (TokenKind::Name, "1920x1080"),
                (TokenKind::Punctuator, "+"),
                (TokenKind::IntValue, "0"),
                (TokenKind::Punctuator, "+"),
                (TokenKind::IntValue, "0"),
            ]
        );
    }

    #[test]
    fn test_rate_flags_are_punctuators() {
        assert_eq!(
            kinds_and_literals("59.93*+"),
            vec![
                (TokenKind::FloatValue, "59.93"),
                (TokenKind::Punctuator, "*"),
                (TokenKind::Punctuator, "+"),
            ]
        );
    }

    #[test]
    fn test_second_dot_ends_float() {
        assert_eq!(
            kinds_and_literals("1.2.3"),
            vec![
                (TokenKind::FloatValue, "1.2"),
                (TokenKind::Illegal, "."),
                (TokenKind::IntValue, "3"),
            ]
        );
    }

    #[test]
    fn test_each_whitespace_char_is_a_token() {
        assert_eq!(
            kinds_and_literals("\t\t0"),
            vec![
                (TokenKind::WhiteSpace, "\t"),
                (TokenKind::WhiteSpace, "\t"),
                (TokenKind::IntValue, "0"),
            ]
        );
    }

    #[test]
    fn test_line_terminators() {
        let mut lexer = Lexer::new("a\r\nb\rc\nd");

        let expected = [
            (TokenKind::Name, "a", 1, 1),
            (TokenKind::LineTerminator, "\r\n", 1, 2),
            (TokenKind::Name, "b", 2, 1),
            (TokenKind::LineTerminator, "\r", 2, 2),
            (TokenKind::Name, "c", 3, 1),
            (TokenKind::LineTerminator, "\n", 3, 2),
            (TokenKind::Name, "d", 4, 1),
        ];
        for (kind, literal, line, column) in expected {
            let token = lexer.scan();
            assert_eq!((token.kind, token.literal, token.line, token.column), (kind, literal, line, column));
        }
    }

    #[test]
    fn test_positions_count_runes() {
        let mut lexer = Lexer::new("é x");

        let illegal = lexer.scan();
        assert_eq!((illegal.kind, illegal.literal), (TokenKind::Illegal, "é"));

        lexer.scan();
        let name = lexer.scan();
        assert_eq!(name.column, 3);
        assert_eq!(name.literal, "x");
    }

    #[test]
    fn test_eof_is_sticky() {
        let mut lexer = Lexer::new("x");
        lexer.scan();
        for _ in 0..3 {
            assert_eq!(lexer.scan().kind, TokenKind::Eof);
        }
    }

    #[test]
    fn test_illegal_characters() {
        assert_eq!(
            kinds_and_literals("a/b"),
            vec![
                (TokenKind::Name, "a"),
                (TokenKind::Illegal, "/"),
                (TokenKind::Name, "b"),
            ]
        );
    }
}
