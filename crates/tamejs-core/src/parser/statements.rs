//! Statement parsing.

use crate::ast::{Node, NodeKind, Value};
use crate::errors::ParseError;
use crate::parser::{Parser, TokenKind};
use crate::span::Span;

impl Parser {
    pub(crate) fn parse_statement(&mut self) -> Result<Node, ParseError> {
        let tok = self.current().clone();
        match tok.kind {
            TokenKind::Punctuator if tok.text == "{" => self.parse_block_statement(),
            TokenKind::Punctuator if tok.text == ";" => {
                self.advance();
                Ok(Node::noop(tok.span))
            }
            TokenKind::Keyword => match tok.text.as_str() {
                "var" => {
                    let decl = self.parse_var_declarations()?;
                    self.consume_semicolon()?;
                    Ok(decl)
                }
                "function" => self.parse_function_declaration(),
                "if" => self.parse_if(),
                "for" => self.parse_for(),
                "while" => self.parse_while(),
                "do" => self.parse_do_while(),
                "break" | "continue" => self.parse_jump(),
                "return" => self.parse_return(),
                "throw" => self.parse_throw(),
                "try" => self.parse_try(),
                "switch" => self.parse_switch(),
                "with" => self.parse_with(),
                "debugger" => {
                    self.advance();
                    self.consume_semicolon()?;
                    Ok(Node::new(NodeKind::DebuggerStmt, None, Vec::new(), tok.span))
                }
                _ => self.parse_expression_statement(),
            },
            TokenKind::Identifier if self.peek_at(1).is_punct(":") => self.parse_labeled(),
            _ => self.parse_expression_statement(),
        }
    }

    pub(crate) fn parse_block_statement(&mut self) -> Result<Node, ParseError> {
        let start = self.expect_punct("{")?.span;
        let mut statements = Vec::new();
        while !self.check_punct("}") {
            if self.at_eof() {
                return Err(self.unexpected());
            }
            statements.push(self.parse_statement()?);
        }
        self.advance();
        Ok(Node::block(statements, self.span_from(start)))
    }

    /// Body of a function: a block whose leading string statements form a
    /// directive prologue.
    pub(crate) fn parse_function_body(&mut self) -> Result<Node, ParseError> {
        let start = self.expect_punct("{")?.span;
        let mut statements = Vec::new();
        if let Some(prologue) = self.parse_directive_prologue()? {
            statements.push(prologue);
        }
        while !self.check_punct("}") {
            if self.at_eof() {
                return Err(self.unexpected());
            }
            statements.push(self.parse_statement()?);
        }
        self.advance();
        Ok(Node::block(statements, self.span_from(start)))
    }

    pub(crate) fn parse_directive_prologue(&mut self) -> Result<Option<Node>, ParseError> {
        let start = self.current().span;
        let mut directives = Vec::new();
        while self.current().kind == TokenKind::String {
            let next = self.peek_at(1);
            let ends_statement = next.is_punct(";")
                || next.is_punct("}")
                || next.kind == TokenKind::Eof
                || next.newline_before;
            if !ends_statement {
                break;
            }
            let tok = self.advance();
            directives.push(Node::new(
                NodeKind::Directive,
                Some(Value::Str(tok.text)),
                Vec::new(),
                tok.span,
            ));
            self.consume_semicolon()?;
        }
        if directives.is_empty() {
            return Ok(None);
        }
        Ok(Some(Node::new(
            NodeKind::DirectivePrologue,
            None,
            directives,
            self.span_from(start),
        )))
    }

    /// `var a = 1, b` without the terminator. One declarator yields a
    /// `Declaration`, several a `MultiDeclaration`.
    pub(crate) fn parse_var_declarations(&mut self) -> Result<Node, ParseError> {
        let start = self.expect_keyword("var")?.span;
        let mut decls = vec![self.parse_declarator()?];
        while self.eat_punct(",") {
            decls.push(self.parse_declarator()?);
        }
        if decls.len() == 1 {
            return Ok(decls.remove(0));
        }
        Ok(Node::new(NodeKind::MultiDeclaration, None, decls, self.span_from(start)))
    }

    fn parse_declarator(&mut self) -> Result<Node, ParseError> {
        let name = self.expect_identifier()?;
        let ident = Node::identifier_node(&name.text, name.span);
        let init = if self.eat_punct("=") {
            Some(self.parse_assignment()?)
        } else {
            None
        };
        Ok(Node::declaration(ident, init, self.span_from(name.span)))
    }

    fn parse_function_declaration(&mut self) -> Result<Node, ParseError> {
        let start = self.current().span;
        let ctor = self.parse_function(true)?;
        // A node may occur only once in a tree.
        let ident = match ctor.child(0) {
            Some(name) => {
                Node::identifier_node(name.identifier_name().unwrap_or_default(), name.span())
            }
            None => Node::empty_identifier(start),
        };
        Ok(Node::new(
            NodeKind::FunctionDeclaration,
            None,
            vec![ident, ctor],
            self.span_from(start),
        ))
    }

    /// `function name?(params) { body }` as a `FunctionConstructor`.
    pub(crate) fn parse_function(&mut self, name_required: bool) -> Result<Node, ParseError> {
        let start = self.expect_keyword("function")?.span;
        let ident = if self.current().kind == TokenKind::Identifier {
            let tok = self.advance();
            Node::identifier_node(&tok.text, tok.span)
        } else if name_required {
            return Err(self.unexpected());
        } else {
            Node::empty_identifier(self.current().span)
        };
        let mut children = vec![ident];
        self.expect_punct("(")?;
        if !self.check_punct(")") {
            loop {
                let tok = self.expect_identifier()?;
                let param_ident = Node::identifier_node(&tok.text, tok.span);
                children.push(Node::new(NodeKind::FormalParam, None, vec![param_ident], tok.span));
                if !self.eat_punct(",") {
                    break;
                }
            }
        }
        self.expect_punct(")")?;
        children.push(self.parse_function_body()?);
        Ok(Node::new(NodeKind::FunctionConstructor, None, children, self.span_from(start)))
    }

    fn parse_if(&mut self) -> Result<Node, ParseError> {
        let start = self.expect_keyword("if")?.span;
        let cond = self.parse_paren_expression()?;
        let mut children = vec![cond, self.parse_statement()?];
        if self.eat_keyword("else") {
            children.push(self.parse_statement()?);
        }
        Ok(Node::new(NodeKind::Conditional, None, children, self.span_from(start)))
    }

    fn parse_paren_expression(&mut self) -> Result<Node, ParseError> {
        self.expect_punct("(")?;
        let expr = self.parse_expression()?;
        self.expect_punct(")")?;
        Ok(expr)
    }

    fn parse_for(&mut self) -> Result<Node, ParseError> {
        let start = self.expect_keyword("for")?.span;
        self.expect_punct("(")?;

        let saved_no_in = self.no_in;
        self.no_in = true;
        let init = if self.check_punct(";") {
            None
        } else if self.check_keyword("var") {
            Some(self.parse_var_declarations())
        } else {
            Some(self.parse_expression())
        };
        self.no_in = saved_no_in;
        let init = init.transpose()?;

        if let Some(lhs) = init.clone() {
            if self.eat_keyword("in") {
                let object = self.parse_expression()?;
                self.expect_punct(")")?;
                let body = self.parse_statement()?;
                return Ok(Node::new(
                    NodeKind::ForEachLoop,
                    None,
                    vec![lhs, object, body],
                    self.span_from(start),
                ));
            }
        }

        let here = self.current().span;
        let init = match init {
            Some(node) if node.kind().is_expression() => Node::expression_stmt(node),
            Some(node) => node,
            None => Node::noop(here),
        };
        self.expect_punct(";")?;
        let cond = if self.check_punct(";") {
            Node::noop(self.current().span)
        } else {
            self.parse_expression()?
        };
        self.expect_punct(";")?;
        let incr = if self.check_punct(")") {
            Node::noop(self.current().span)
        } else {
            Node::expression_stmt(self.parse_expression()?)
        };
        self.expect_punct(")")?;
        let body = self.parse_statement()?;
        Ok(Node::new(
            NodeKind::ForLoop,
            None,
            vec![init, cond, incr, body],
            self.span_from(start),
        ))
    }

    fn parse_while(&mut self) -> Result<Node, ParseError> {
        let start = self.expect_keyword("while")?.span;
        let cond = self.parse_paren_expression()?;
        let body = self.parse_statement()?;
        Ok(Node::new(NodeKind::WhileLoop, None, vec![cond, body], self.span_from(start)))
    }

    fn parse_do_while(&mut self) -> Result<Node, ParseError> {
        let start = self.expect_keyword("do")?.span;
        let body = self.parse_statement()?;
        self.expect_keyword("while")?;
        let cond = self.parse_paren_expression()?;
        self.eat_punct(";");
        Ok(Node::new(NodeKind::DoWhileLoop, None, vec![body, cond], self.span_from(start)))
    }

    fn parse_jump(&mut self) -> Result<Node, ParseError> {
        let tok = self.advance();
        let kind = if tok.text == "break" {
            NodeKind::BreakStmt
        } else {
            NodeKind::ContinueStmt
        };
        let label = if self.current().kind == TokenKind::Identifier
            && !self.current().newline_before
        {
            Some(Value::Name(self.advance().text))
        } else {
            None
        };
        self.consume_semicolon()?;
        Ok(Node::new(kind, label, Vec::new(), self.span_from(tok.span)))
    }

    fn parse_return(&mut self) -> Result<Node, ParseError> {
        let start = self.expect_keyword("return")?.span;
        let mut children = Vec::new();
        if !self.check_punct(";")
            && !self.check_punct("}")
            && !self.at_eof()
            && !self.current().newline_before
        {
            children.push(self.parse_expression()?);
        }
        self.consume_semicolon()?;
        Ok(Node::new(NodeKind::ReturnStmt, None, children, self.span_from(start)))
    }

    fn parse_throw(&mut self) -> Result<Node, ParseError> {
        let start = self.expect_keyword("throw")?.span;
        if self.current().newline_before {
            return Err(ParseError::new("line break after 'throw'", self.current().span));
        }
        let expr = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(Node::new(NodeKind::ThrowStmt, None, vec![expr], self.span_from(start)))
    }

    fn parse_try(&mut self) -> Result<Node, ParseError> {
        let start = self.expect_keyword("try")?.span;
        let mut children = vec![self.parse_block_statement()?];
        if self.check_keyword("catch") {
            let catch_start = self.advance().span;
            self.expect_punct("(")?;
            let name = self.expect_identifier()?;
            let decl =
                Node::declaration(Node::identifier_node(&name.text, name.span), None, name.span);
            self.expect_punct(")")?;
            let body = self.parse_block_statement()?;
            children.push(Node::new(
                NodeKind::CatchStmt,
                None,
                vec![decl, body],
                self.span_from(catch_start),
            ));
        }
        if self.check_keyword("finally") {
            let finally_start = self.advance().span;
            let body = self.parse_block_statement()?;
            children.push(Node::new(
                NodeKind::FinallyStmt,
                None,
                vec![body],
                self.span_from(finally_start),
            ));
        }
        if children.len() == 1 {
            return Err(ParseError::new("'try' without 'catch' or 'finally'", start));
        }
        Ok(Node::new(NodeKind::TryStmt, None, children, self.span_from(start)))
    }

    fn parse_switch(&mut self) -> Result<Node, ParseError> {
        let start = self.expect_keyword("switch")?.span;
        let mut children = vec![self.parse_paren_expression()?];
        self.expect_punct("{")?;
        while !self.eat_punct("}") {
            let case_start = self.current().span;
            let test = if self.eat_keyword("case") {
                Some(self.parse_expression()?)
            } else {
                self.expect_keyword("default")?;
                None
            };
            self.expect_punct(":")?;
            let body_start = self.current().span;
            let mut body = Vec::new();
            while !self.check_keyword("case")
                && !self.check_keyword("default")
                && !self.check_punct("}")
            {
                if self.at_eof() {
                    return Err(self.unexpected());
                }
                body.push(self.parse_statement()?);
            }
            let body = Node::block(body, self.span_from(body_start));
            let span = self.span_from(case_start);
            let case = match test {
                Some(test) => Node::new(NodeKind::CaseStmt, None, vec![test, body], span),
                None => Node::new(NodeKind::DefaultCaseStmt, None, vec![body], span),
            };
            children.push(case);
        }
        Ok(Node::new(NodeKind::SwitchStmt, None, children, self.span_from(start)))
    }

    fn parse_with(&mut self) -> Result<Node, ParseError> {
        let start = self.expect_keyword("with")?.span;
        let scope = self.parse_paren_expression()?;
        let body = self.parse_statement()?;
        Ok(Node::new(NodeKind::WithStmt, None, vec![scope, body], self.span_from(start)))
    }

    fn parse_labeled(&mut self) -> Result<Node, ParseError> {
        let label = self.advance();
        self.expect_punct(":")?;
        let body = self.parse_statement()?;
        Ok(Node::new(
            NodeKind::LabeledStmt,
            Some(Value::Name(label.text)),
            vec![body],
            self.span_from(label.span),
        ))
    }

    fn parse_expression_statement(&mut self) -> Result<Node, ParseError> {
        let start: Span = self.current().span;
        let expr = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(Node::new(NodeKind::ExpressionStmt, None, vec![expr], self.span_from(start)))
    }
}
