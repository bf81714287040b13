//! Tokenizer for the ES3 subset the rewriter handles.
//!
//! In template mode the lexer also accepts quasi identifiers: `@name`
//! optionally followed, without whitespace, by one of `?`, `*` or `+`.

use crate::ast::literal::{is_identifier_part, is_identifier_start};
use crate::errors::ParseError;
use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Keyword,
    Punctuator,
    Number,
    String,
    Regex,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Exact source text; for quasi identifiers this includes `@` and any
    /// quantifier suffix.
    pub text: String,
    pub span: Span,
    /// A line terminator precedes this token. Drives semicolon insertion.
    pub newline_before: bool,
}

impl Token {
    pub fn is_punct(&self, p: &str) -> bool {
        self.kind == TokenKind::Punctuator && self.text == p
    }

    pub fn is_keyword(&self, k: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == k
    }

    /// Identifiers and keywords are both valid after `.` and as property keys.
    pub fn is_identifier_name(&self) -> bool {
        matches!(self.kind, TokenKind::Identifier | TokenKind::Keyword)
    }
}

const KEYWORDS: &[&str] = &[
    "break", "case", "catch", "continue", "debugger", "default", "delete", "do", "else",
    "false", "finally", "for", "function", "if", "in", "instanceof", "new", "null", "return",
    "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while", "with",
];

/// Longest first, so that greedy matching picks `>>>=` over `>>`.
const PUNCTUATORS: &[&str] = &[
    ">>>=", "===", "!==", ">>>", "<<=", ">>=", "==", "!=", "<=", ">=", "&&", "||", "++", "--",
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<", ">>", "{", "}", "(", ")", "[", "]",
    ";", ",", "<", ">", "+", "-", "*", "/", "%", "&", "|", "^", "!", "~", "?", ":", "=", ".",
];

pub struct Lexer<'src> {
    source: &'src str,
    pos: usize,
    line: u32,
    column: u32,
    template_mode: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Lexer {
            source,
            pos: 0,
            line: 1,
            column: 1,
            template_mode: false,
        }
    }

    pub fn with_template_mode(mut self, enabled: bool) -> Self {
        self.template_mode = enabled;
        self
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens: Vec<Token> = Vec::new();
        loop {
            let newline_before = self.skip_trivia()?;
            let start = (self.pos, self.line, self.column);
            let Some(c) = self.peek() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    text: String::new(),
                    span: self.span_from(start),
                    newline_before: true,
                });
                return Ok(tokens);
            };

            let kind = if c == '@' && self.template_mode {
                self.lex_quasi_identifier(start)?
            } else if is_identifier_start(c) {
                self.bump_while(is_identifier_part);
                if KEYWORDS.contains(&&self.source[start.0..self.pos]) {
                    TokenKind::Keyword
                } else {
                    TokenKind::Identifier
                }
            } else if c.is_ascii_digit()
                || (c == '.' && self.peek_nth(1).is_some_and(|d| d.is_ascii_digit()))
            {
                self.lex_number(start)?
            } else if c == '\'' || c == '"' {
                self.lex_string(c, start)?
            } else if c == '/' && regex_allowed(tokens.last()) {
                self.lex_regex(start)?
            } else {
                self.lex_punctuator(start)?
            };

            tokens.push(Token {
                kind,
                text: self.source[start.0..self.pos].to_string(),
                span: self.span_from(start),
                newline_before,
            });
        }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.source[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn bump_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
    }

    fn span_from(&self, start: (usize, u32, u32)) -> Span {
        Span::new(start.0 as u32, self.pos as u32, start.1, start.2)
    }

    fn error(&self, message: &str, start: (usize, u32, u32)) -> ParseError {
        ParseError::new(message, self.span_from(start))
    }

    /// Skip whitespace and comments; report whether a line terminator was seen.
    fn skip_trivia(&mut self) -> Result<bool, ParseError> {
        let mut newline = false;
        loop {
            match self.peek() {
                Some('\n') | Some('\r') | Some('\u{2028}') | Some('\u{2029}') => {
                    newline = true;
                    self.bump();
                }
                Some(c) if c.is_whitespace() || c == '\u{feff}' => {
                    self.bump();
                }
                Some('/') if self.peek_nth(1) == Some('/') => {
                    self.bump_while(|c| !matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}'));
                }
                Some('/') if self.peek_nth(1) == Some('*') => {
                    let start = (self.pos, self.line, self.column);
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('*') if self.peek() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some('\n') | Some('\r') => newline = true,
                            Some(_) => {}
                            None => return Err(self.error("unterminated comment", start)),
                        }
                    }
                }
                _ => return Ok(newline),
            }
        }
    }

    fn lex_quasi_identifier(&mut self, start: (usize, u32, u32)) -> Result<TokenKind, ParseError> {
        self.bump();
        if !self.peek().is_some_and(is_identifier_start) {
            return Err(self.error("expected a name after '@'", start));
        }
        self.bump_while(is_identifier_part);
        if matches!(self.peek(), Some('?') | Some('*') | Some('+')) {
            self.bump();
        }
        Ok(TokenKind::Identifier)
    }

    fn lex_number(&mut self, start: (usize, u32, u32)) -> Result<TokenKind, ParseError> {
        if self.peek() == Some('0') && matches!(self.peek_nth(1), Some('x') | Some('X')) {
            self.bump();
            self.bump();
            if !self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                return Err(self.error("malformed hex literal", start));
            }
            self.bump_while(|c| c.is_ascii_hexdigit());
        } else {
            self.bump_while(|c| c.is_ascii_digit());
            if self.peek() == Some('.') {
                self.bump();
                self.bump_while(|c| c.is_ascii_digit());
            }
            if matches!(self.peek(), Some('e') | Some('E')) {
                self.bump();
                if matches!(self.peek(), Some('+') | Some('-')) {
                    self.bump();
                }
                if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    return Err(self.error("malformed exponent", start));
                }
                self.bump_while(|c| c.is_ascii_digit());
            }
        }
        if self.peek().is_some_and(is_identifier_start) {
            return Err(self.error("identifier directly after number", start));
        }
        Ok(TokenKind::Number)
    }

    fn lex_string(
        &mut self,
        quote: char,
        start: (usize, u32, u32),
    ) -> Result<TokenKind, ParseError> {
        self.bump();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(TokenKind::String),
                Some('\\') => {
                    if self.bump().is_none() {
                        break;
                    }
                }
                Some('\n') | Some('\r') | None => break,
                Some(_) => {}
            }
        }
        Err(self.error("unterminated string literal", start))
    }

    fn lex_regex(&mut self, start: (usize, u32, u32)) -> Result<TokenKind, ParseError> {
        self.bump();
        let mut in_class = false;
        loop {
            match self.bump() {
                Some('\\') => {
                    self.bump();
                }
                Some('[') => in_class = true,
                Some(']') => in_class = false,
                Some('/') if !in_class => break,
                Some('\n') | Some('\r') | None => {
                    return Err(self.error("unterminated regular expression", start))
                }
                Some(_) => {}
            }
        }
        self.bump_while(is_identifier_part);
        Ok(TokenKind::Regex)
    }

    fn lex_punctuator(&mut self, start: (usize, u32, u32)) -> Result<TokenKind, ParseError> {
        let rest = &self.source[self.pos..];
        let Some(p) = PUNCTUATORS.iter().find(|p| rest.starts_with(**p)) else {
            return Err(self.error("unexpected character", start));
        };
        for _ in 0..p.len() {
            self.bump();
        }
        Ok(TokenKind::Punctuator)
    }
}

/// A `/` starts a regular expression unless the previous token ends an operand.
fn regex_allowed(previous: Option<&Token>) -> bool {
    match previous {
        None => true,
        Some(tok) => match tok.kind {
            TokenKind::Identifier | TokenKind::Number | TokenKind::String | TokenKind::Regex => {
                false
            }
            TokenKind::Keyword => !matches!(tok.text.as_str(), "this" | "null" | "true" | "false"),
            TokenKind::Punctuator => !matches!(tok.text.as_str(), ")" | "]"),
            TokenKind::Eof => true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str, template: bool) -> Vec<(TokenKind, String)> {
        Lexer::new(src)
            .with_template_mode(template)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn quasi_identifiers_only_in_template_mode() {
        let toks = kinds("f(@args*)", true);
        assert_eq!(toks[2], (TokenKind::Identifier, "@args*".to_string()));
        assert!(Lexer::new("@x").tokenize().is_err());
    }

    #[test]
    fn division_versus_regex() {
        let toks = kinds("a / b; x = /re[/]/g", false);
        assert_eq!(toks[1], (TokenKind::Punctuator, "/".to_string()));
        assert_eq!(toks[6], (TokenKind::Regex, "/re[/]/g".to_string()));
    }

    #[test]
    fn newline_flag_set_after_line_break() {
        let toks = Lexer::new("a\n/* c */ b").tokenize().unwrap();
        assert!(!toks[0].newline_before);
        assert!(toks[1].newline_before);
        assert_eq!(toks[1].span.line, 2);
    }

    #[test]
    fn greedy_punctuators() {
        let toks = kinds("a >>>= 1", false);
        assert_eq!(toks[1].1, ">>>=");
    }
}
