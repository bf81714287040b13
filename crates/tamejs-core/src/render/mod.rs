//! JavaScript rendering of node trees.
//!
//! Parentheses are inserted only where operator precedence requires them.
//! Rendering is used for logging, diagnostics and tests; it is not meant to
//! preserve the formatting of the input.

mod emitter;

pub use emitter::{Emitter, RenderStyle};

use crate::ast::{literal, Associativity, Node, NodeKind, Operator, OperatorType, Value};

/// Render on a single line.
pub fn render(node: &Node) -> String {
    render_with_style(node, RenderStyle::Compact)
}

/// Render with one statement per line.
pub fn render_pretty(node: &Node) -> String {
    render_with_style(node, RenderStyle::Pretty)
}

pub fn render_with_style(node: &Node, style: RenderStyle) -> String {
    let mut renderer = Renderer {
        emitter: Emitter::new().with_style(style),
    };
    renderer.node(node);
    renderer.emitter.finish()
}

/// Loosest precedence an operand may have without parentheses, for
/// arguments, array elements and initializers.
const ASSIGNMENT_LEVEL: u8 = 16;
const COMMA_LEVEL: u8 = 17;

struct Renderer {
    emitter: Emitter,
}

impl Renderer {
    fn write(&mut self, s: &str) {
        self.emitter.write(s);
    }

    fn node(&mut self, node: &Node) {
        match node.kind() {
            NodeKind::Module => {
                if let Some(body) = node.child(0) {
                    self.statement_list(body.children());
                }
            }
            NodeKind::Container => {
                if node.children().iter().all(|c| c.kind().is_statement()) {
                    self.statement_list(node.children());
                } else {
                    self.comma_list(node.children(), ASSIGNMENT_LEVEL);
                }
            }
            NodeKind::Identifier => self.identifier(node),
            NodeKind::FormalParam => self.identifier_of(node),
            NodeKind::ValueProperty => self.property(node),
            NodeKind::Directive => self.directive(node),
            kind if kind.is_statement() => self.statement(node),
            _ => self.expression(node, COMMA_LEVEL),
        }
    }

    fn statement_list(&mut self, statements: &[Node]) {
        for (i, stmt) in statements.iter().enumerate() {
            if i > 0 {
                self.emitter.newline();
            }
            self.statement(stmt);
        }
    }

    fn block(&mut self, node: &Node) {
        if node.children().is_empty() {
            self.write("{}");
            return;
        }
        self.write("{");
        self.emitter.indent();
        for stmt in node.children() {
            self.emitter.newline();
            self.statement(stmt);
        }
        self.emitter.dedent();
        self.emitter.newline();
        self.write("}");
    }

    /// A statement in a position like `if (c) <stmt>`.
    fn body(&mut self, node: &Node) {
        self.write(" ");
        self.statement(node);
    }

    fn statement(&mut self, node: &Node) {
        let child = |i: usize| node.child(i);
        match node.kind() {
            NodeKind::Block => self.block(node),
            NodeKind::ExpressionStmt => {
                if let Some(expr) = child(0) {
                    if starts_ambiguously(expr) {
                        self.write("(");
                        self.expression(expr, COMMA_LEVEL);
                        self.write(")");
                    } else {
                        self.expression(expr, COMMA_LEVEL);
                    }
                }
                self.write(";");
            }
            NodeKind::Declaration => {
                self.write("var ");
                self.declarator(node);
                self.write(";");
            }
            NodeKind::MultiDeclaration => {
                self.write("var ");
                self.declarators(node);
                self.write(";");
            }
            NodeKind::FunctionDeclaration => {
                if let Some(ctor) = child(1) {
                    self.function(ctor);
                }
            }
            NodeKind::ReturnStmt => {
                self.write("return");
                if let Some(expr) = child(0) {
                    self.write(" ");
                    self.expression(expr, COMMA_LEVEL);
                }
                self.write(";");
            }
            NodeKind::Conditional => {
                self.write("if (");
                self.opt_expression(child(0));
                self.write(")");
                if let Some(then) = child(1) {
                    self.body(then);
                }
                if let Some(otherwise) = child(2) {
                    self.write(" else");
                    self.body(otherwise);
                }
            }
            NodeKind::ForLoop => {
                self.write("for (");
                if let Some(init) = child(0) {
                    self.loop_head_part(init);
                }
                self.write(";");
                if let Some(cond) = child(1).filter(|c| c.kind() != NodeKind::Noop) {
                    self.write(" ");
                    self.expression(cond, COMMA_LEVEL);
                }
                self.write(";");
                if let Some(incr) = child(2).filter(|c| c.kind() != NodeKind::Noop) {
                    self.write(" ");
                    self.loop_head_part(incr);
                }
                self.write(")");
                if let Some(body) = child(3) {
                    self.body(body);
                }
            }
            NodeKind::ForEachLoop => {
                self.write("for (");
                if let Some(lhs) = child(0) {
                    self.loop_head_part(lhs);
                }
                self.write(" in ");
                self.opt_expression(child(1));
                self.write(")");
                if let Some(body) = child(2) {
                    self.body(body);
                }
            }
            NodeKind::WhileLoop => {
                self.write("while (");
                self.opt_expression(child(0));
                self.write(")");
                if let Some(body) = child(1) {
                    self.body(body);
                }
            }
            NodeKind::DoWhileLoop => {
                self.write("do");
                if let Some(body) = child(0) {
                    self.body(body);
                }
                self.write(" while (");
                self.opt_expression(child(1));
                self.write(");");
            }
            NodeKind::BreakStmt | NodeKind::ContinueStmt => {
                self.write(if node.kind() == NodeKind::BreakStmt { "break" } else { "continue" });
                if let Some(label) = node.identifier_name() {
                    self.write(" ");
                    self.write(label);
                }
                self.write(";");
            }
            NodeKind::ThrowStmt => {
                self.write("throw ");
                self.opt_expression(child(0));
                self.write(";");
            }
            NodeKind::TryStmt => {
                self.write("try ");
                if let Some(body) = child(0) {
                    self.block(body);
                }
                for clause in &node.children()[1.min(node.children().len())..] {
                    self.write(" ");
                    self.statement(clause);
                }
            }
            NodeKind::CatchStmt => {
                self.write("catch (");
                if let Some(decl) = child(0) {
                    self.identifier_of(decl);
                }
                self.write(") ");
                if let Some(body) = child(1) {
                    self.block(body);
                }
            }
            NodeKind::FinallyStmt => {
                self.write("finally ");
                if let Some(body) = child(0) {
                    self.block(body);
                }
            }
            NodeKind::SwitchStmt => {
                self.write("switch (");
                self.opt_expression(child(0));
                self.write(") {");
                self.emitter.indent();
                for case in &node.children()[1.min(node.children().len())..] {
                    self.emitter.newline();
                    self.statement(case);
                }
                self.emitter.dedent();
                self.emitter.newline();
                self.write("}");
            }
            NodeKind::CaseStmt | NodeKind::DefaultCaseStmt => {
                let body = if node.kind() == NodeKind::CaseStmt {
                    self.write("case ");
                    self.opt_expression(child(0));
                    self.write(":");
                    child(1)
                } else {
                    self.write("default:");
                    child(0)
                };
                if let Some(body) = body {
                    self.emitter.indent();
                    for stmt in body.children() {
                        self.emitter.newline();
                        self.statement(stmt);
                    }
                    self.emitter.dedent();
                }
            }
            NodeKind::LabeledStmt => {
                self.write(node.identifier_name().unwrap_or_default());
                self.write(":");
                if let Some(body) = child(0) {
                    self.body(body);
                }
            }
            NodeKind::Noop => self.write(";"),
            NodeKind::WithStmt => {
                self.write("with (");
                self.opt_expression(child(0));
                self.write(")");
                if let Some(body) = child(1) {
                    self.body(body);
                }
            }
            NodeKind::DebuggerStmt => self.write("debugger;"),
            NodeKind::DirectivePrologue => {
                for (i, directive) in node.children().iter().enumerate() {
                    if i > 0 {
                        self.emitter.newline();
                    }
                    self.directive(directive);
                }
            }
            NodeKind::Container => self.statement_list(node.children()),
            _ => {
                // An expression where a statement is expected.
                self.expression(node, COMMA_LEVEL);
                self.write(";");
            }
        }
    }

    fn directive(&mut self, node: &Node) {
        if let Some(Value::Str(raw)) = node.value() {
            self.write(raw);
        }
        self.write(";");
    }

    fn loop_head_part(&mut self, node: &Node) {
        match node.kind() {
            NodeKind::Noop => {}
            NodeKind::Declaration => {
                self.write("var ");
                self.declarator(node);
            }
            NodeKind::MultiDeclaration => {
                self.write("var ");
                self.declarators(node);
            }
            NodeKind::ExpressionStmt => self.opt_expression(node.child(0)),
            _ => self.expression(node, COMMA_LEVEL),
        }
    }

    fn declarators(&mut self, node: &Node) {
        for (i, decl) in node.children().iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.declarator(decl);
        }
    }

    fn declarator(&mut self, node: &Node) {
        self.identifier_of(node);
        if let Some(init) = node.child(1) {
            self.write(" = ");
            self.expression(init, ASSIGNMENT_LEVEL);
        }
    }

    fn identifier(&mut self, node: &Node) {
        if let Some(Value::Name(name)) = node.value() {
            self.write(name);
        }
    }

    fn identifier_of(&mut self, node: &Node) {
        if let Some(name) = node.identifier_name() {
            self.write(name);
        }
    }

    fn function(&mut self, node: &Node) {
        self.write("function");
        if let Some(name) = node.identifier_name() {
            self.write(" ");
            self.write(name);
        }
        self.write("(");
        let children = node.children();
        let params = children
            .iter()
            .filter(|c| c.kind() == NodeKind::FormalParam)
            .collect::<Vec<_>>();
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.identifier_of(param);
        }
        self.write(") ");
        match children.last().filter(|c| c.kind() == NodeKind::Block) {
            Some(body) => self.block(body),
            None => self.write("{}"),
        }
    }

    fn property(&mut self, node: &Node) {
        if let Some(key) = node.child(0) {
            match key.unquoted_string() {
                Some(name) if literal::is_valid_identifier(&name) => self.write(&name),
                _ => self.expression(key, ASSIGNMENT_LEVEL),
            }
        }
        self.write(": ");
        if let Some(value) = node.child(1) {
            self.expression(value, ASSIGNMENT_LEVEL);
        }
    }

    fn opt_expression(&mut self, node: Option<&Node>) {
        if let Some(node) = node {
            self.expression(node, COMMA_LEVEL);
        }
    }

    fn comma_list(&mut self, nodes: &[Node], level: u8) {
        for (i, node) in nodes.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.expression(node, level);
        }
    }

    /// Render `node`, parenthesized if it binds looser than `max_prec`.
    fn expression(&mut self, node: &Node, max_prec: u8) {
        let needs_parens = precedence_of(node) > max_prec;
        if needs_parens {
            self.write("(");
        }
        self.expression_inner(node);
        if needs_parens {
            self.write(")");
        }
    }

    fn expression_inner(&mut self, node: &Node) {
        match node.kind() {
            NodeKind::Reference => self.identifier_of(node),
            NodeKind::Identifier => self.identifier(node),
            NodeKind::StringLiteral | NodeKind::RegexpLiteral => match node.value() {
                Some(Value::Str(raw)) | Some(Value::Regex(raw)) => self.write(raw),
                _ => self.write("''"),
            },
            NodeKind::NumberLiteral => {
                if let Some(Value::Number(n)) = node.value() {
                    self.write(&format_number(*n));
                }
            }
            NodeKind::BooleanLiteral => {
                let b = matches!(node.value(), Some(Value::Boolean(true)));
                self.write(if b { "true" } else { "false" });
            }
            NodeKind::NullLiteral => self.write("null"),
            NodeKind::Elision => {}
            NodeKind::ArrayConstructor => {
                self.write("[");
                self.comma_list(node.children(), ASSIGNMENT_LEVEL);
                if node.children().last().is_some_and(|c| c.kind() == NodeKind::Elision) {
                    self.write(",");
                }
                self.write("]");
            }
            NodeKind::ObjectConstructor => {
                if node.children().is_empty() {
                    self.write("{}");
                    return;
                }
                self.write("{ ");
                for (i, prop) in node.children().iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.node(prop);
                }
                self.write(" }");
            }
            NodeKind::FunctionConstructor => self.function(node),
            NodeKind::Operation(op) => self.operation(op, node.children()),
            _ => self.node(node),
        }
    }

    fn operation(&mut self, op: Operator, operands: &[Node]) {
        let prec = op.precedence();
        match op {
            Operator::MemberAccess => {
                self.opt_operand(operands.first(), prec);
                self.write(".");
                if let Some(prop) = operands.get(1) {
                    self.identifier_of(prop);
                }
            }
            Operator::SquareBracket => {
                self.opt_operand(operands.first(), prec);
                self.write("[");
                self.opt_operand(operands.get(1), COMMA_LEVEL);
                self.write("]");
            }
            Operator::FunctionCall => {
                self.opt_operand(operands.first(), prec);
                self.write("(");
                self.comma_list(operands.get(1..).unwrap_or_default(), ASSIGNMENT_LEVEL);
                self.write(")");
            }
            Operator::Construct => {
                self.write("new ");
                // A call inside the callee must not be taken as the argument list.
                self.opt_operand(operands.first(), prec);
                self.write("(");
                self.comma_list(operands.get(1..).unwrap_or_default(), ASSIGNMENT_LEVEL);
                self.write(")");
            }
            Operator::Ternary => {
                self.opt_operand(operands.first(), prec - 1);
                self.write(" ? ");
                self.opt_operand(operands.get(1), ASSIGNMENT_LEVEL);
                self.write(" : ");
                self.opt_operand(operands.get(2), ASSIGNMENT_LEVEL);
            }
            _ => match op.op_type() {
                OperatorType::Prefix => {
                    self.write(op.symbol());
                    let operand = operands.first();
                    let word = op.symbol().chars().all(|c| c.is_ascii_alphabetic());
                    let clash = operand.and_then(|o| o.operator()).is_some_and(|inner| {
                        inner.op_type() == OperatorType::Prefix
                            && inner.symbol().starts_with(op.symbol())
                    });
                    let negative = operand
                        .is_some_and(|o| matches!(o.value(), Some(Value::Number(n)) if *n < 0.0));
                    if word || clash || negative {
                        self.write(" ");
                    }
                    self.opt_operand(operand, prec);
                }
                OperatorType::Postfix => {
                    self.opt_operand(operands.first(), prec);
                    self.write(op.symbol());
                }
                _ => {
                    let (left_max, right_max) = match op.associativity() {
                        Associativity::Left => (prec, prec - 1),
                        Associativity::Right => (prec - 1, prec),
                    };
                    self.opt_operand(operands.first(), left_max);
                    if op == Operator::Comma {
                        self.write(", ");
                    } else {
                        self.write(" ");
                        self.write(op.symbol());
                        self.write(" ");
                    }
                    self.opt_operand(operands.get(1), right_max);
                }
            },
        }
    }

    fn opt_operand(&mut self, node: Option<&Node>, max_prec: u8) {
        if let Some(node) = node {
            self.expression(node, max_prec);
        }
    }
}

fn precedence_of(node: &Node) -> u8 {
    match node.kind() {
        NodeKind::Operation(op) => op.precedence(),
        _ => 0,
    }
}

/// Expression statements may not begin with `{` or `function`.
fn starts_ambiguously(expr: &Node) -> bool {
    let mut leftmost = expr;
    loop {
        match leftmost.kind() {
            NodeKind::ObjectConstructor | NodeKind::FunctionConstructor => return true,
            NodeKind::Operation(op) if !matches!(op.op_type(), OperatorType::Prefix) => {
                match leftmost.child(0) {
                    // Parenthesized operands begin with `(`.
                    Some(first) if precedence_of(first) <= op.precedence() => leftmost = first,
                    _ => return false,
                }
            }
            _ => return false,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i128)
    } else {
        format!("{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_expression, parse_program};

    fn round(src: &str) -> String {
        render(&parse_program(src).unwrap())
    }

    #[test]
    fn minimal_parentheses() {
        assert_eq!(render(&parse_expression("(a + b) * c").unwrap()), "(a + b) * c");
        assert_eq!(render(&parse_expression("a + (b * c)").unwrap()), "a + b * c");
        assert_eq!(render(&parse_expression("a - (b - c)").unwrap()), "a - (b - c)");
        assert_eq!(render(&parse_expression("a = (b, c)").unwrap()), "a = (b, c)");
    }

    #[test]
    fn calls_members_and_new() {
        assert_eq!(render(&parse_expression("a.w___('b', c+1)").unwrap()), "a.w___('b', c + 1)");
        assert_eq!(render(&parse_expression("new (f())()").unwrap()), "new (f())()");
        assert_eq!(render(&parse_expression("typeof - -x").unwrap()), "typeof - -x");
    }

    #[test]
    fn statements_on_one_line() {
        assert_eq!(
            round("var a = 1, b; if (a) { b = 2; } else f();"),
            "var a = 1, b; if (a) { b = 2; } else f();"
        );
        assert_eq!(round("for (var i = 0; i < n; i++) ;"), "for (var i = 0; i < n; i++) ;");
        assert_eq!(
            round("try { x(); } catch (e) { y(e); } finally { z(); }"),
            "try { x(); } catch (e) { y(e); } finally { z(); }"
        );
    }

    #[test]
    fn function_expression_statement_is_wrapped() {
        assert_eq!(round("(function () { return 1; })();"), "(function() { return 1; }());");
        assert_eq!(round("({ a: 1 }).a;"), "({ a: 1 }.a);");
    }

    #[test]
    fn pretty_indents_blocks() {
        let out = render_pretty(&parse_program("function f(x) { return x; }").unwrap());
        assert_eq!(out, "function f(x) {\n    return x;\n}");
    }
}
