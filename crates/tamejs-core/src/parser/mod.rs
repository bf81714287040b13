//! Recursive-descent parser producing [`Node`] trees.
//!
//! Real programs and quasiliteral templates share this grammar; templates
//! are parsed with the lexer in template mode so that `@name` holes are
//! accepted wherever an identifier may appear.

mod expressions;
pub mod lexer;
mod statements;

pub use lexer::{Lexer, Token, TokenKind};

use crate::ast::{Node, NodeKind};
use crate::errors::ParseError;
use crate::span::Span;

/// Parse a whole program into `Module[Block]`.
pub fn parse_program(source: &str) -> Result<Node, ParseError> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse_program()
}

/// Parse a program and return its top-level block.
pub fn parse_block(source: &str) -> Result<Node, ParseError> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse_top_level_block()
}

/// Parse template text, allowing quasi identifiers.
pub fn parse_template(source: &str) -> Result<Node, ParseError> {
    let tokens = Lexer::new(source).with_template_mode(true).tokenize()?;
    Parser::new(tokens).parse_top_level_block()
}

/// Parse a single expression; trailing input is an error.
pub fn parse_expression(source: &str) -> Result<Node, ParseError> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expression()?;
    if !parser.at_eof() {
        return Err(parser.unexpected());
    }
    Ok(expr)
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Inside a `for` head, where a bare `in` ends the initializer.
    no_in: bool,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            pos: 0,
            no_in: false,
        }
    }

    pub fn parse_program(&mut self) -> Result<Node, ParseError> {
        let block = self.parse_top_level_block()?;
        let span = block.span();
        Ok(Node::new(NodeKind::Module, None, vec![block], span))
    }

    pub fn parse_top_level_block(&mut self) -> Result<Node, ParseError> {
        let start = self.current().span;
        let mut statements = Vec::new();
        if let Some(prologue) = self.parse_directive_prologue()? {
            statements.push(prologue);
        }
        while !self.at_eof() {
            statements.push(self.parse_statement()?);
        }
        Ok(Node::block(statements, self.span_from(start)))
    }

    // Token cursor.

    pub(crate) fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub(crate) fn peek_at(&self, offset: usize) -> &Token {
        &self.tokens[(self.pos + offset).min(self.tokens.len() - 1)]
    }

    pub(crate) fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    pub(crate) fn at_eof(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    pub(crate) fn check_punct(&self, p: &str) -> bool {
        self.current().is_punct(p)
    }

    pub(crate) fn check_keyword(&self, k: &str) -> bool {
        self.current().is_keyword(k)
    }

    pub(crate) fn eat_punct(&mut self, p: &str) -> bool {
        if self.check_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn eat_keyword(&mut self, k: &str) -> bool {
        if self.check_keyword(k) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_punct(&mut self, p: &str) -> Result<Token, ParseError> {
        if self.check_punct(p) {
            Ok(self.advance())
        } else {
            Err(ParseError::new(
                format!("expected '{p}' but found '{}'", self.current().text),
                self.current().span,
            ))
        }
    }

    pub(crate) fn expect_keyword(&mut self, k: &str) -> Result<Token, ParseError> {
        if self.check_keyword(k) {
            Ok(self.advance())
        } else {
            Err(ParseError::new(
                format!("expected '{k}' but found '{}'", self.current().text),
                self.current().span,
            ))
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<Token, ParseError> {
        if self.current().kind == TokenKind::Identifier {
            Ok(self.advance())
        } else {
            Err(ParseError::new(
                format!("expected an identifier but found '{}'", self.current().text),
                self.current().span,
            ))
        }
    }

    pub(crate) fn unexpected(&self) -> ParseError {
        let tok = self.current();
        let shown = if tok.kind == TokenKind::Eof { "end of input" } else { tok.text.as_str() };
        ParseError::new(format!("unexpected {shown}"), tok.span)
    }

    /// Consume a statement terminator, inserting one where the grammar
    /// allows.
    pub(crate) fn consume_semicolon(&mut self) -> Result<(), ParseError> {
        if self.eat_punct(";") {
            return Ok(());
        }
        if self.check_punct("}") || self.at_eof() || self.current().newline_before {
            return Ok(());
        }
        Err(self.unexpected())
    }

    /// Span from `start` to the end of the last consumed token.
    pub(crate) fn span_from(&self, start: Span) -> Span {
        let end = if self.pos == 0 {
            start.end
        } else {
            self.tokens[self.pos - 1].span.end.max(start.start)
        };
        Span::new(start.start, end, start.line, start.column)
    }
}
