use crate::ast::{Node, NodeKind};
use crate::diagnostics::MessageKind;
use crate::rewriter::{Rule, RuleContext};
use crate::scope::Scope;

/// Structural rules that open scopes and hoist start statements, the
/// policy rules every confined program is held to, pass-through for leaves
/// and finally a catch-all that expands children.
///
/// Rules added by an embedder go between the synthetic rules and these.
pub fn baseline_rules() -> Vec<Rule> {
    vec![
        module(),
        with_block(),
        double_underscore(),
        function_declaration(),
        function(),
        block(),
        catch(),
        expression_statement(),
        leaves(),
        recurse(),
    ]
}

const LEAF_KINDS: &[NodeKind] = &[
    NodeKind::Identifier,
    NodeKind::Reference,
    NodeKind::FormalParam,
    NodeKind::StringLiteral,
    NodeKind::NumberLiteral,
    NodeKind::BooleanLiteral,
    NodeKind::NullLiteral,
    NodeKind::RegexpLiteral,
    NodeKind::Noop,
    NodeKind::BreakStmt,
    NodeKind::ContinueStmt,
    NodeKind::DebuggerStmt,
    NodeKind::Elision,
    NodeKind::Directive,
];

/// Expand `statements` in `scope` and prepend whatever the scope queued
/// while they were expanded.
fn expand_body(ctx: &RuleContext<'_>, body: &Node, scope: &Scope<'_>) -> Node {
    let statements = body
        .children()
        .iter()
        .map(|stmt| ctx.expand(stmt, Some(scope)))
        .collect();
    ctx.rebuild_if_changed(body, scope.splice_start_statements(statements))
}

fn module() -> Rule {
    Rule::new("module", |ctx, node, _scope| {
        if node.kind() != NodeKind::Module {
            return None;
        }
        let body = node.child(0)?;
        let scope = Scope::from_program(node, ctx.handler().clone());
        let body = expand_body(ctx, body, &scope);
        Some(ctx.rebuild_if_changed(node, vec![body]))
    })
    .with_synopsis("Open the program scope.")
    .with_reason("Every other scope hangs off the program.")
    .for_kinds(&[NodeKind::Module])
}

fn with_block() -> Rule {
    Rule::new("with", |ctx, node, _scope| {
        ctx.matches(node)?;
        ctx.handler()
            .emit(MessageKind::WithBlocksNotAllowed, node.span(), &[]);
        Some(node.clone())
    })
    .with_synopsis("Reject with blocks.")
    .with_reason("A with block makes variable resolution depend on runtime values.")
    .with_matches("with (@scope) @body;")
}

const DOUBLE_UNDERSCORE_KINDS: &[NodeKind] = &[
    NodeKind::Declaration,
    NodeKind::FunctionDeclaration,
    NodeKind::Reference,
];

fn double_underscore() -> Rule {
    Rule::new("doubleUnderscore", |ctx, node, _scope| {
        if !DOUBLE_UNDERSCORE_KINDS.contains(&node.kind()) {
            return None;
        }
        let ident = node.child(0)?;
        if ident.is_synthetic() || !ident.identifier_name()?.ends_with("__") {
            return None;
        }
        ctx.handler().emit(
            MessageKind::VariablesCannotEndInDoubleUnderscore,
            ident.span(),
            &[ident.identifier_name().unwrap_or_default()],
        );
        Some(node.clone())
    })
    .with_synopsis("Reject user variables ending in double underscores.")
    .with_reason("Those names are reserved for the runtime.")
    .for_kinds(DOUBLE_UNDERSCORE_KINDS)
}

fn function_declaration() -> Rule {
    Rule::new("functionDeclaration", |ctx, node, scope| {
        if node.kind() != NodeKind::FunctionDeclaration {
            return None;
        }
        let ident = node.child(0)?;
        let function = node.child(1)?;
        let children = vec![ctx.noexpand(ident), ctx.expand(function, scope)];
        Some(ctx.rebuild_if_changed(node, children))
    })
    .with_synopsis("Expand the function a declaration binds.")
    .with_reason("The declared name is bound in the enclosing scope.")
    .for_kinds(&[NodeKind::FunctionDeclaration])
}

fn function() -> Rule {
    Rule::new("function", |ctx, node, scope| {
        if node.kind() != NodeKind::FunctionConstructor {
            return None;
        }
        let parent = scope?;
        let scope = Scope::from_function(parent, node);
        let (body, head) = node.children().split_last()?;
        let (name, params) = head.split_first()?;
        // Both checks run so every bad name is reported.
        let name_ok = ctx.check_identifier(name);
        if !(ctx.check_formals(params) && name_ok) {
            return Some(node.clone());
        }
        let mut children = Vec::with_capacity(node.children().len());
        children.push(ctx.noexpand(name));
        children.extend(ctx.noexpand_params(params));
        children.push(expand_body(ctx, body, &scope));
        Some(ctx.rebuild_if_changed(node, children))
    })
    .with_synopsis("Open a function scope.")
    .with_reason("Parameters and hoisted variables are local to the function.")
    .for_kinds(&[NodeKind::FunctionConstructor])
}

fn block() -> Rule {
    Rule::new("block", |ctx, node, scope| {
        if node.kind() != NodeKind::Block {
            return None;
        }
        let scope = Scope::from_block(scope?, node);
        Some(expand_body(ctx, node, &scope))
    })
    .with_synopsis("Open a block scope.")
    .for_kinds(&[NodeKind::Block])
}

fn catch() -> Rule {
    Rule::new("catch", |ctx, node, scope| {
        if node.kind() != NodeKind::CatchStmt {
            return None;
        }
        let exception = node.child(0)?;
        if !ctx.check_identifier(exception) {
            return Some(node.clone());
        }
        let scope = Scope::from_catch(scope?, node);
        let body = node.child(1)?;
        let children = vec![ctx.noexpand(exception), expand_body(ctx, body, &scope)];
        Some(ctx.rebuild_if_changed(node, children))
    })
    .with_synopsis("Bind the exception in its own scope.")
    .with_reason("The exception name is visible only inside the handler.")
    .for_kinds(&[NodeKind::CatchStmt])
}

fn expression_statement() -> Rule {
    Rule::new("expressionStatement", |ctx, node, scope| {
        if node.kind() != NodeKind::ExpressionStmt {
            return None;
        }
        let expr = ctx.mark_tree_for_side_effect(node.child(0)?);
        Some(ctx.rebuild_if_changed(node, vec![ctx.expand(&expr, scope)]))
    })
    .with_synopsis("Expand an expression evaluated for its side effects.")
    .for_kinds(&[NodeKind::ExpressionStmt])
}

fn leaves() -> Rule {
    Rule::new("leaves", |ctx, node, _scope| {
        LEAF_KINDS.contains(&node.kind()).then(|| ctx.noexpand(node))
    })
    .with_synopsis("Pass through names and literals.")
    .for_kinds(LEAF_KINDS)
}

fn recurse() -> Rule {
    Rule::new("recurse", |ctx, node, scope| Some(ctx.expand_all(node, scope)))
        .with_synopsis("Expand every child of anything else.")
}
