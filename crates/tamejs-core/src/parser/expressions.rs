//! Expression parsing: assignment, conditional, binary precedence climbing,
//! unary, postfix, call/member chains and primaries.

use crate::ast::{Node, NodeKind, Operator, OperatorType, Value};
use crate::errors::ParseError;
use crate::parser::{Parser, TokenKind};
use crate::span::Span;

/// Loosest binary operator handled by precedence climbing (`||`).
const PRECEDENCE_LOGICAL_OR: u8 = 14;

impl Parser {
    pub(crate) fn parse_expression(&mut self) -> Result<Node, ParseError> {
        let start = self.current().span;
        let mut expr = self.parse_assignment()?;
        while self.eat_punct(",") {
            let right = self.parse_assignment()?;
            expr = Node::operation(Operator::Comma, vec![expr, right], self.span_from(start));
        }
        Ok(expr)
    }

    pub(crate) fn parse_assignment(&mut self) -> Result<Node, ParseError> {
        let start = self.current().span;
        let target = self.parse_conditional()?;
        let tok = self.current();
        if tok.kind == TokenKind::Punctuator {
            if let Some(op) =
                Operator::lookup(&tok.text, OperatorType::Infix).filter(|op| op.is_assignment())
            {
                self.advance();
                let value = self.parse_assignment()?;
                return Ok(Node::operation(op, vec![target, value], self.span_from(start)));
            }
        }
        Ok(target)
    }

    fn parse_conditional(&mut self) -> Result<Node, ParseError> {
        let start = self.current().span;
        let cond = self.parse_binary(PRECEDENCE_LOGICAL_OR)?;
        if !self.eat_punct("?") {
            return Ok(cond);
        }
        let saved_no_in = self.no_in;
        self.no_in = false;
        let then = self.parse_assignment();
        self.no_in = saved_no_in;
        let then = then?;
        self.expect_punct(":")?;
        let otherwise = self.parse_assignment()?;
        Ok(Node::operation(Operator::Ternary, vec![cond, then, otherwise], self.span_from(start)))
    }

    /// Binary operator at the cursor, if it binds no looser than `max_prec`.
    fn peek_binary_operator(&self, max_prec: u8) -> Option<Operator> {
        let tok = self.current();
        let candidate = match tok.kind {
            TokenKind::Punctuator => Operator::lookup(&tok.text, OperatorType::Infix),
            TokenKind::Keyword if tok.text == "instanceof" => Some(Operator::InstanceOf),
            TokenKind::Keyword if tok.text == "in" && !self.no_in => Some(Operator::In),
            _ => None,
        }?;
        let binary = !candidate.is_assignment()
            && !matches!(candidate, Operator::Comma | Operator::MemberAccess);
        (binary && candidate.precedence() <= max_prec).then_some(candidate)
    }

    fn parse_binary(&mut self, max_prec: u8) -> Result<Node, ParseError> {
        let start = self.current().span;
        let mut left = self.parse_unary()?;
        while let Some(op) = self.peek_binary_operator(max_prec) {
            self.advance();
            let right = self.parse_binary(op.precedence() - 1)?;
            left = Node::operation(op, vec![left, right], self.span_from(start));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Node, ParseError> {
        let tok = self.current().clone();
        let prefix = match tok.kind {
            TokenKind::Punctuator => Operator::lookup(&tok.text, OperatorType::Prefix),
            TokenKind::Keyword => match tok.text.as_str() {
                "delete" => Some(Operator::Delete),
                "void" => Some(Operator::Void),
                "typeof" => Some(Operator::Typeof),
                _ => None,
            },
            _ => None,
        };
        match prefix {
            Some(op) if op != Operator::Construct => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Node::operation(op, vec![operand], self.span_from(tok.span)))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Node, ParseError> {
        let start = self.current().span;
        let expr = self.parse_left_hand_side()?;
        if self.current().newline_before {
            return Ok(expr);
        }
        let op = if self.check_punct("++") {
            Operator::PostIncrement
        } else if self.check_punct("--") {
            Operator::PostDecrement
        } else {
            return Ok(expr);
        };
        self.advance();
        Ok(Node::operation(op, vec![expr], self.span_from(start)))
    }

    fn parse_left_hand_side(&mut self) -> Result<Node, ParseError> {
        let start = self.current().span;
        let mut expr = self.parse_new_or_member()?;
        loop {
            if self.check_punct("(") {
                let mut operands = vec![expr];
                operands.extend(self.parse_arguments()?);
                expr = Node::operation(Operator::FunctionCall, operands, self.span_from(start));
            } else if let Some(next) = self.parse_member_suffix(expr.clone(), start)? {
                expr = next;
            } else {
                return Ok(expr);
            }
        }
    }

    /// `new` chains and member accesses, without calls.
    fn parse_new_or_member(&mut self) -> Result<Node, ParseError> {
        let start = self.current().span;
        let mut expr = if self.eat_keyword("new") {
            let callee = self.parse_new_or_member()?;
            let mut operands = vec![callee];
            if self.check_punct("(") {
                operands.extend(self.parse_arguments()?);
            }
            Node::operation(Operator::Construct, operands, self.span_from(start))
        } else {
            self.parse_primary()?
        };
        while let Some(next) = self.parse_member_suffix(expr.clone(), start)? {
            expr = next;
        }
        Ok(expr)
    }

    fn parse_member_suffix(
        &mut self,
        object: Node,
        start: Span,
    ) -> Result<Option<Node>, ParseError> {
        if self.eat_punct(".") {
            let tok = self.current().clone();
            if !tok.is_identifier_name() {
                return Err(self.unexpected());
            }
            self.advance();
            let property = Node::reference(&tok.text, tok.span);
            return Ok(Some(Node::operation(
                Operator::MemberAccess,
                vec![object, property],
                self.span_from(start),
            )));
        }
        if self.eat_punct("[") {
            let index = self.parse_nested(|p| p.parse_expression())?;
            self.expect_punct("]")?;
            return Ok(Some(Node::operation(
                Operator::SquareBracket,
                vec![object, index],
                self.span_from(start),
            )));
        }
        Ok(None)
    }

    fn parse_arguments(&mut self) -> Result<Vec<Node>, ParseError> {
        self.expect_punct("(")?;
        let mut args = Vec::new();
        if !self.check_punct(")") {
            loop {
                args.push(self.parse_nested(|p| p.parse_assignment())?);
                if !self.eat_punct(",") {
                    break;
                }
            }
        }
        self.expect_punct(")")?;
        Ok(args)
    }

    /// Run `f` with `in` allowed again, as inside any bracketed construct.
    fn parse_nested<T>(
        &mut self,
        f: impl FnOnce(&mut Parser) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let saved_no_in = self.no_in;
        self.no_in = false;
        let result = f(self);
        self.no_in = saved_no_in;
        result
    }

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        let tok = self.current().clone();
        match tok.kind {
            TokenKind::Identifier => {
                self.advance();
                Ok(Node::reference(&tok.text, tok.span))
            }
            TokenKind::Number => {
                self.advance();
                let value = parse_number(&tok.text).ok_or_else(|| {
                    ParseError::new(format!("malformed number {}", tok.text), tok.span)
                })?;
                Ok(Node::number(value, tok.span))
            }
            TokenKind::String => {
                self.advance();
                Ok(Node::new(
                    NodeKind::StringLiteral,
                    Some(Value::Str(tok.text)),
                    Vec::new(),
                    tok.span,
                ))
            }
            TokenKind::Regex => {
                self.advance();
                Ok(Node::new(
                    NodeKind::RegexpLiteral,
                    Some(Value::Regex(tok.text)),
                    Vec::new(),
                    tok.span,
                ))
            }
            TokenKind::Keyword => match tok.text.as_str() {
                "this" => {
                    self.advance();
                    Ok(Node::reference("this", tok.span))
                }
                "true" | "false" => {
                    self.advance();
                    Ok(Node::boolean(tok.text == "true", tok.span))
                }
                "null" => {
                    self.advance();
                    Ok(Node::null(tok.span))
                }
                "function" => self.parse_nested(|p| p.parse_function(false)),
                _ => Err(self.unexpected()),
            },
            TokenKind::Punctuator => match tok.text.as_str() {
                "(" => {
                    self.advance();
                    let expr = self.parse_nested(|p| p.parse_expression())?;
                    self.expect_punct(")")?;
                    Ok(expr)
                }
                "[" => self.parse_nested(|p| p.parse_array_literal()),
                "{" => self.parse_nested(|p| p.parse_object_literal()),
                _ => Err(self.unexpected()),
            },
            TokenKind::Eof => Err(self.unexpected()),
        }
    }

    fn parse_array_literal(&mut self) -> Result<Node, ParseError> {
        let start = self.expect_punct("[")?.span;
        let mut elements = Vec::new();
        loop {
            if self.eat_punct("]") {
                break;
            }
            if self.check_punct(",") {
                let tok = self.advance();
                elements.push(Node::new(NodeKind::Elision, None, Vec::new(), tok.span));
                continue;
            }
            elements.push(self.parse_assignment()?);
            if !self.eat_punct(",") {
                self.expect_punct("]")?;
                break;
            }
        }
        Ok(Node::new(NodeKind::ArrayConstructor, None, elements, self.span_from(start)))
    }

    fn parse_object_literal(&mut self) -> Result<Node, ParseError> {
        let start = self.expect_punct("{")?.span;
        let mut properties = Vec::new();
        while !self.eat_punct("}") {
            let tok = self.current().clone();
            let key = match tok.kind {
                TokenKind::String => Node::new(
                    NodeKind::StringLiteral,
                    Some(Value::Str(tok.text.clone())),
                    Vec::new(),
                    tok.span,
                ),
                TokenKind::Identifier | TokenKind::Keyword | TokenKind::Number => {
                    Node::string_literal(&tok.text, tok.span)
                }
                _ => return Err(self.unexpected()),
            };
            self.advance();
            self.expect_punct(":")?;
            let value = self.parse_assignment()?;
            properties.push(Node::new(
                NodeKind::ValueProperty,
                None,
                vec![key, value],
                self.span_from(tok.span),
            ));
            if !self.eat_punct(",") {
                self.expect_punct("}")?;
                break;
            }
        }
        Ok(Node::new(NodeKind::ObjectConstructor, None, properties, self.span_from(start)))
    }
}

fn parse_number(text: &str) -> Option<f64> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok().map(|v| v as f64);
    }
    text.parse::<f64>().ok()
}
