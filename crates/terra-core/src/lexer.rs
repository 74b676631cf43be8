//! Lexer for the Terra language.
//!
//! Uses the `logos` crate for the raw scan. This module adds what logos does
//! not know about: line/column spans, literal decoding, lexical diagnostics
//! and the terminating end-of-input token.

use std::fmt;

use logos::Logos;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, Diagnostics, Stage};
use crate::error::FrontendResult;
use crate::span::{LineCursor, Span};

/// Longest numeric literal, in bytes, that is decoded.
pub const MAX_NUMERIC_LITERAL_LEN: usize = 127;

const INITIAL_TOKEN_CAPACITY: usize = 64;

/// Token kinds for the Terra language.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[logos(skip r"([ \t\r\n\f\x0B]+|//[^\n]*)")]
pub enum TokenKind {
    // Keywords
    #[token("func")]
    Func,

    #[token("return")]
    Return,

    #[token("if")]
    If,

    #[token("else")]
    Else,

    #[token("var")]
    Var,

    // Operators
    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("=")]
    Assign,

    #[token("==")]
    EqualEqual,

    #[token("!=")]
    BangEqual,

    // Punctuation
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(",")]
    Comma,

    #[token(";")]
    Semicolon,

    #[token(":")]
    Colon,

    // Identifiers
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Identifier,

    // Literals
    #[regex(r"[0-9]+")]
    Integer,

    #[regex(r"[0-9]+\.[0-9]+")]
    Float,

    #[regex(r"'([^'\\\n]|\\.)'")]
    Char,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    String,

    // Produced by the wrapper, never by logos
    Error,
    Eof,
}

impl TokenKind {
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Func | TokenKind::Return | TokenKind::If | TokenKind::Else | TokenKind::Var
        )
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::Integer | TokenKind::Float | TokenKind::Char | TokenKind::String
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Func => "'func'",
            TokenKind::Return => "'return'",
            TokenKind::If => "'if'",
            TokenKind::Else => "'else'",
            TokenKind::Var => "'var'",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Assign => "'='",
            TokenKind::EqualEqual => "'=='",
            TokenKind::BangEqual => "'!='",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::Comma => "','",
            TokenKind::Semicolon => "';'",
            TokenKind::Colon => "':'",
            TokenKind::Identifier => "identifier",
            TokenKind::Integer => "integer literal",
            TokenKind::Float => "float literal",
            TokenKind::Char => "character literal",
            TokenKind::String => "string literal",
            TokenKind::Error => "invalid token",
            TokenKind::Eof => "end of input",
        };
        f.write_str(text)
    }
}

/// Decoded value of a literal token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue {
    Integer(i64),
    Float(f64),
    Char(char),
    String(String),
}

/// A token with its kind, text, source span and decoded literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<LiteralValue>,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
            value: None,
        }
    }

    pub fn with_value(mut self, value: LiteralValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn int_value(&self) -> Option<i64> {
        match self.value {
            Some(LiteralValue::Integer(v)) => Some(v),
            _ => None,
        }
    }

    pub fn float_value(&self) -> Option<f64> {
        match self.value {
            Some(LiteralValue::Float(v)) => Some(v),
            _ => None,
        }
    }

    /// Short description used in "found ..." messages.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Identifier => format!("identifier '{}'", self.text),
            kind if kind.is_literal() => format!("{} {}", kind, self.text),
            kind => kind.to_string(),
        }
    }
}

/// Lexer for the Terra language.
pub struct Lexer<'a> {
    source: &'a str,
    file: &'a str,
    inner: logos::Lexer<'a, TokenKind>,
    cursor: LineCursor<'a>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, file: &'a str) -> Self {
        Self {
            source,
            file,
            inner: TokenKind::lexer(source),
            cursor: LineCursor::new(source),
        }
    }

    /// Tokenize the entire source.
    ///
    /// Lexical errors are reported to `diagnostics` and never stop the scan;
    /// the returned sequence always ends with exactly one `Eof` token. The
    /// only failure is running out of memory for the token buffer.
    pub fn tokenize(mut self, diagnostics: &mut Diagnostics) -> FrontendResult<Vec<Token>> {
        let mut tokens = Vec::new();
        self.reserve(&mut tokens, INITIAL_TOKEN_CAPACITY, diagnostics)?;

        while let Some(result) = self.inner.next() {
            let mut range = self.inner.span();
            let mut text = self.inner.slice();

            // An unclosed literal is reported at its opening quote only and
            // the rest of the line is scanned again.
            if result.is_err() && text.len() > 1 && text.starts_with(['"', '\'']) {
                range.end = range.start + 1;
                text = &text[..1];
                self.inner = TokenKind::lexer(self.source);
                self.inner.bump(range.end);
            }

            let span = self.cursor.span(range.start, range.end);

            let token = match result {
                Ok(kind) => self.cook(kind, text, span, diagnostics),
                Err(()) => self.unexpected(text, span, diagnostics),
            };
            self.push(&mut tokens, token, diagnostics)?;
        }

        let end = self.cursor.advance_to(self.source.len());
        self.push(&mut tokens, Token::new(TokenKind::Eof, "", Span::point(end)), diagnostics)?;

        tracing::debug!(file = self.file, count = tokens.len(), "tokenized");
        Ok(tokens)
    }

    /// Attach decoded values to literal tokens.
    fn cook(&self, kind: TokenKind, text: &str, span: Span, diagnostics: &mut Diagnostics) -> Token {
        let token = Token::new(kind, text, span);
        match kind {
            TokenKind::Integer | TokenKind::Float => self.cook_number(token, diagnostics),
            TokenKind::Char => match unescape(&text[1..text.len() - 1]).chars().next() {
                Some(c) => token.with_value(LiteralValue::Char(c)),
                None => token,
            },
            TokenKind::String => {
                let value = unescape(&text[1..text.len() - 1]);
                token.with_value(LiteralValue::String(value))
            }
            _ => token,
        }
    }

    fn cook_number(&self, token: Token, diagnostics: &mut Diagnostics) -> Token {
        let is_float = token.kind == TokenKind::Float;

        if token.text.len() > MAX_NUMERIC_LITERAL_LEN {
            diagnostics.push(
                Diagnostic::error("L002", "numeric literal exceeds maximum buffer length")
                    .with_stage(Stage::Lexer)
                    .with_file(self.file)
                    .with_span(token.span)
                    .build(),
            );
            let default = if is_float {
                LiteralValue::Float(0.0)
            } else {
                LiteralValue::Integer(0)
            };
            return token.with_value(default);
        }

        if is_float {
            // The regex only admits `digits.digits`, which always parses.
            let value = token.text.parse::<f64>().unwrap_or_default();
            return token.with_value(LiteralValue::Float(value));
        }

        match token.text.parse::<i64>() {
            Ok(value) => token.with_value(LiteralValue::Integer(value)),
            Err(_) => {
                diagnostics.push(
                    Diagnostic::error("L003", format!("integer literal '{}' is out of range", token.text))
                        .with_stage(Stage::Lexer)
                        .with_file(self.file)
                        .with_span(token.span)
                        .build(),
                );
                token.with_value(LiteralValue::Integer(i64::MAX))
            }
        }
    }

    fn unexpected(&self, text: &str, span: Span, diagnostics: &mut Diagnostics) -> Token {
        let c = text.chars().next().unwrap_or('\u{FFFD}');
        let mut diagnostic = Diagnostic::error("L001", format!("unexpected character '{}'", c.escape_debug()))
            .with_stage(Stage::Lexer)
            .with_file(self.file)
            .with_span(span);
        match c {
            '!' => diagnostic = diagnostic.with_help("did you mean '!='?"),
            '"' | '\'' => diagnostic = diagnostic.with_help("literal is not closed on this line"),
            _ => {}
        }
        diagnostics.push(diagnostic.build());
        Token::new(TokenKind::Error, text, span)
    }

    fn push(
        &self,
        tokens: &mut Vec<Token>,
        token: Token,
        diagnostics: &mut Diagnostics,
    ) -> FrontendResult<()> {
        if tokens.len() == tokens.capacity() {
            let additional = tokens.capacity().max(INITIAL_TOKEN_CAPACITY);
            self.reserve(tokens, additional, diagnostics)?;
        }
        tokens.push(token);
        Ok(())
    }

    fn reserve(
        &self,
        tokens: &mut Vec<Token>,
        additional: usize,
        diagnostics: &mut Diagnostics,
    ) -> FrontendResult<()> {
        tokens.try_reserve_exact(additional).map_err(|_| {
            let at = tokens
                .last()
                .map(|t| t.span)
                .unwrap_or_default();
            diagnostics.fatal(
                Diagnostic::fatal("L900", "out of memory while expanding token buffer")
                    .with_stage(Stage::Lexer)
                    .with_file(self.file)
                    .with_span(at)
                    .build(),
            )
        })
    }
}

/// Decode backslash escapes inside a char or string literal body.
fn unescape(body: &str) -> String {
    let mut result = String::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('0') => result.push('\0'),
            Some('\\') => result.push('\\'),
            Some('\'') => result.push('\''),
            Some('"') => result.push('"'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> (Vec<Token>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let tokens = Lexer::new(source, "test.tr").tokenize(&mut diagnostics).unwrap();
        (tokens, diagnostics)
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).0.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_function_header() {
        assert_eq!(
            kinds("func add(i32: a, b): i32 {"),
            vec![
                TokenKind::Func,
                TokenKind::Identifier,
                TokenKind::LParen,
                TokenKind::Identifier,
                TokenKind::Colon,
                TokenKind::Identifier,
                TokenKind::Comma,
                TokenKind::Identifier,
                TokenKind::RParen,
                TokenKind::Colon,
                TokenKind::Identifier,
                TokenKind::LBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords() {
        let source = "func return if else var funcs _if";
        assert_eq!(
            kinds(source),
            vec![
                TokenKind::Func,
                TokenKind::Return,
                TokenKind::If,
                TokenKind::Else,
                TokenKind::Var,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_equality_operators() {
        assert_eq!(
            kinds("= == != + - * /"),
            vec![
                TokenKind::Assign,
                TokenKind::EqualEqual,
                TokenKind::BangEqual,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lone_bang_is_error() {
        let (tokens, diagnostics) = lex("a ! b");
        assert_eq!(tokens[1].kind, TokenKind::Error);
        assert_eq!(diagnostics.error_count(), 1);

        let diag = diagnostics.iter().next().unwrap();
        assert_eq!(diag.message, "unexpected character '!'");
        assert_eq!(diag.help.as_deref(), Some("did you mean '!='?"));
        assert_eq!(diag.stage, Stage::Lexer);
    }

    #[test]
    fn test_unexpected_character_keeps_going() {
        let (tokens, diagnostics) = lex("x @ y");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Identifier, TokenKind::Error, TokenKind::Identifier, TokenKind::Eof]
        );
        assert_eq!(diagnostics.error_count(), 1);
        assert_eq!(diagnostics.iter().next().unwrap().span.start.column, 3);
    }

    #[test]
    fn test_comments_and_whitespace_skipped() {
        let source = "// leading comment\nx // trailing\n\t y";
        assert_eq!(
            kinds(source),
            vec![TokenKind::Identifier, TokenKind::Identifier, TokenKind::Eof]
        );
    }

    #[test]
    fn test_spans_track_lines_and_columns() {
        let (tokens, _) = lex("func\n  main");
        assert_eq!(tokens[0].span.start.line, 1);
        assert_eq!(tokens[0].span.start.column, 1);
        assert_eq!(tokens[0].span.end.column, 5);
        assert_eq!(tokens[1].span.start.line, 2);
        assert_eq!(tokens[1].span.start.column, 3);
        assert_eq!(tokens[2].kind, TokenKind::Eof);
        assert_eq!(tokens[2].span.start.line, 2);
        assert_eq!(tokens[2].span.start.column, 7);
    }

    #[test]
    fn test_integer_and_float_values() {
        let (tokens, diagnostics) = lex("42 3.5");
        assert!(!diagnostics.has_errors());
        assert_eq!(tokens[0].kind, TokenKind::Integer);
        assert_eq!(tokens[0].int_value(), Some(42));
        assert_eq!(tokens[1].kind, TokenKind::Float);
        assert_eq!(tokens[1].float_value(), Some(3.5));
    }

    #[test]
    fn test_dot_without_digit_is_not_consumed() {
        let (tokens, diagnostics) = lex("7.x");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Integer, TokenKind::Error, TokenKind::Identifier, TokenKind::Eof]
        );
        assert_eq!(tokens[0].int_value(), Some(7));
        assert_eq!(diagnostics.error_count(), 1);
    }

    #[test]
    fn test_numeric_literal_length_limit() {
        let at_limit = "1".repeat(MAX_NUMERIC_LITERAL_LEN);
        let (_, diagnostics) = lex(&format!("0.{}", &at_limit[2..]));
        assert!(!diagnostics.has_errors());

        let too_long = "9".repeat(MAX_NUMERIC_LITERAL_LEN + 1);
        let (tokens, diagnostics) = lex(&too_long);
        assert_eq!(tokens[0].kind, TokenKind::Integer);
        assert_eq!(tokens[0].int_value(), Some(0));
        assert_eq!(diagnostics.error_count(), 1);
        assert_eq!(
            diagnostics.iter().next().unwrap().message,
            "numeric literal exceeds maximum buffer length"
        );
    }

    #[test]
    fn test_integer_overflow_saturates() {
        let (tokens, diagnostics) = lex("99999999999999999999");
        assert_eq!(tokens[0].int_value(), Some(i64::MAX));
        assert_eq!(diagnostics.iter().next().unwrap().code, "L003");
    }

    #[test]
    fn test_char_and_string_literals() {
        let (tokens, diagnostics) = lex(r#"'a' '\n' "hi\tthere""#);
        assert!(!diagnostics.has_errors());
        assert_eq!(tokens[0].value, Some(LiteralValue::Char('a')));
        assert_eq!(tokens[1].value, Some(LiteralValue::Char('\n')));
        assert_eq!(
            tokens[2].value,
            Some(LiteralValue::String("hi\tthere".to_string()))
        );
    }

    #[test]
    fn test_empty_source_yields_only_eof() {
        let (tokens, diagnostics) = lex("");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_token_buffer_grows_past_initial_capacity() {
        let source = "x ".repeat(INITIAL_TOKEN_CAPACITY * 3);
        let (tokens, _) = lex(&source);
        assert_eq!(tokens.len(), INITIAL_TOKEN_CAPACITY * 3 + 1);
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn test_spans_on_one_long_line() {
        let count = 50_000;
        let source = "x ".repeat(count);
        let (tokens, _) = lex(&source);
        let last = &tokens[count - 1];
        assert_eq!(last.span.start.line, 1);
        assert_eq!(last.span.start.column, 2 * count - 1);
        assert_eq!(tokens[count].span.start.column, 2 * count + 1);
    }

    #[test]
    fn test_unterminated_string_reports_opening_quote() {
        let (tokens, diagnostics) = lex("\"abc");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Error, TokenKind::Identifier, TokenKind::Eof]);
        assert_eq!(tokens[1].text, "abc");
        assert_eq!(tokens[1].span.start.column, 2);

        assert_eq!(diagnostics.error_count(), 1);
        let diag = diagnostics.iter().next().unwrap();
        assert_eq!(diag.code, "L001");
        assert_eq!(diag.span.start.column, 1);
        assert_eq!(diag.span.end.column, 2);
        assert_eq!(diag.help.as_deref(), Some("literal is not closed on this line"));
    }

    #[test]
    fn test_unterminated_char_rescans_rest_of_line() {
        let (tokens, diagnostics) = lex("x = 'ab\ny");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::Assign,
                TokenKind::Error,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
        assert_eq!(diagnostics.error_count(), 1);
        assert_eq!(tokens[4].span.start.line, 2);
    }
}
