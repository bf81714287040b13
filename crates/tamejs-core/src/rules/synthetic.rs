//! Pass-through rules for code built by trusted generators.
//!
//! Synthetic names are exempt from the naming rules applied to user code,
//! and the operations on them are already in their final form. These rules
//! must come before any policy rule.

use crate::ast::{Node, NodeKind, Operator};
use crate::quasi::{Binding, Bindings};
use crate::rewriter::{Rule, RuleContext};
use crate::scope::Scope;

/// All synthetic rules, in firing order.
pub fn synthetic_rules() -> Vec<Rule> {
    vec![
        synthetic_reference(),
        synthetic_calls(),
        synthetic_method_calls(),
        synthetic_deletes(),
        synthetic_reads(),
        synthetic_set_member(),
        synthetic_set_var(),
        synthetic_declaration(),
        synthetic_function_declaration(),
        synthetic_function(),
    ]
}

fn synthetic_binding(ctx: &RuleContext<'_>, bindings: &Bindings, name: &str) -> Option<Node> {
    bindings.node(name).filter(|n| ctx.is_synthetic(n)).cloned()
}

fn synthetic_reference() -> Rule {
    Rule::new("syntheticReference", |ctx, node, _scope| {
        let bindings = ctx.matches(node)?;
        let reference = bindings.node("ref")?;
        if reference.kind() != NodeKind::Reference || !ctx.is_synthetic(reference) {
            return None;
        }
        Some(ctx.noexpand(node))
    })
    .with_synopsis("Pass through synthetic references.")
    .with_reason("A variable may not be mentionable otherwise.")
    .with_matches("@ref")
    .for_kinds(&[NodeKind::Reference])
}

fn synthetic_calls() -> Rule {
    Rule::new("syntheticCalls", |ctx, node, scope| {
        let mut bindings = ctx.matches(node)?;
        let callee = synthetic_binding(ctx, &bindings, "f")?;
        if callee.kind() != NodeKind::Reference {
            return None;
        }
        bindings.insert("f", Binding::Node(ctx.noexpand(&callee)));
        ctx.expand_entry(&mut bindings, "as", scope);
        ctx.substitute(&bindings)
    })
    .with_synopsis("Pass through calls to synthetic functions.")
    .with_reason("A synthetic function may not be marked callable.")
    .with_matches("@f(@as*)")
    .with_substitutes("@f(@as*)")
}

fn synthetic_method_calls() -> Rule {
    Rule::new("syntheticMethodCalls", |ctx, node, scope| {
        let mut bindings = ctx.matches(node)?;
        let method = synthetic_binding(ctx, &bindings, "m")?;
        bindings.insert("m", Binding::Node(ctx.noexpand(&method)));
        ctx.expand_entry(&mut bindings, "o", scope);
        ctx.expand_entry(&mut bindings, "as", scope);
        ctx.substitute(&bindings)
    })
    .with_synopsis("Pass through calls to synthetic methods.")
    .with_reason("A synthetic method may not be marked callable.")
    .with_matches("@o.@m(@as*)")
    .with_substitutes("@o.@m(@as*)")
}

fn synthetic_deletes() -> Rule {
    Rule::new("syntheticDeletes", |ctx, node, scope| {
        let mut bindings = ctx.matches(node)?;
        let member = synthetic_binding(ctx, &bindings, "m")?;
        bindings.insert("m", Binding::Node(ctx.noexpand(&member)));
        ctx.expand_entry(&mut bindings, "o", scope);
        ctx.substitute(&bindings)
    })
    .with_synopsis("Pass through deletes of synthetic members.")
    .with_reason("A synthetic member may not be marked deletable.")
    .with_matches("delete @o.@m")
    .with_substitutes("delete @o.@m")
}

fn synthetic_reads() -> Rule {
    Rule::new("syntheticReads", |ctx, node, scope| {
        let mut bindings = ctx.matches(node)?;
        let member = synthetic_binding(ctx, &bindings, "m")?;
        bindings.insert("m", Binding::Node(ctx.noexpand(&member)));
        ctx.expand_entry(&mut bindings, "o", scope);
        ctx.substitute(&bindings)
    })
    .with_synopsis("Pass through reads of synthetic members.")
    .with_reason("A synthetic member may not be marked readable.")
    .with_matches("@o.@m")
    .with_substitutes("@o.@m")
}

fn synthetic_set_member() -> Rule {
    Rule::new("syntheticSetMember", |ctx, node, scope| {
        let mut bindings = ctx.matches(node)?;
        let member = synthetic_binding(ctx, &bindings, "m")?;
        bindings.insert("m", Binding::Node(ctx.noexpand(&member)));
        ctx.expand_entry(&mut bindings, "o", scope);
        ctx.expand_entry(&mut bindings, "v", scope);
        ctx.substitute(&bindings)
    })
    .with_synopsis("Pass through assignments to synthetic members.")
    .with_reason("A synthetic member may not be marked writable.")
    .with_matches("@o.@m = @v")
    .with_substitutes("@o.@m = @v")
}

fn synthetic_set_var() -> Rule {
    Rule::new("syntheticSetVar", |ctx, node, scope| {
        let mut bindings = ctx.matches(node)?;
        let target = synthetic_binding(ctx, &bindings, "lhs")?;
        if target.kind() != NodeKind::Reference {
            return None;
        }
        bindings.insert("lhs", Binding::Node(ctx.noexpand(&target)));
        ctx.expand_entry(&mut bindings, "rhs", scope);
        ctx.substitute(&bindings)
    })
    .with_synopsis("Pass through assignments to synthetic variables.")
    .with_reason("A synthetic variable may not be marked writable.")
    .with_matches("@lhs = @rhs")
    .with_substitutes("@lhs = @rhs")
}

fn synthetic_declaration() -> Rule {
    Rule::new("syntheticDeclaration", |ctx, node, scope| {
        let bindings = ctx.matches(node)?;
        let ident = bindings.node("v").filter(|v| v.is_synthetic())?;
        let scope = scope?;
        hoist_declaration(ctx, node, ident, bindings.node("initial"), scope)
    })
    .with_synopsis("Hoist synthetic variable declarations.")
    .with_reason("Generated temporaries belong to the enclosing function.")
    .with_matches("var @v = @initial?;")
}

/// Move `var v` to the start of the enclosing function or program and leave
/// the initialization, if any, in place.
fn hoist_declaration(
    ctx: &RuleContext<'_>,
    node: &Node,
    ident: &Node,
    initial: Option<&Node>,
    scope: &Scope<'_>,
) -> Option<Node> {
    let name = ident.identifier_name()?;
    scope.declare_start_of_scope_variable(&ctx.noexpand(ident));
    let Some(initial) = initial else {
        return Some(Node::noop(node.span()));
    };
    let value = ctx.expand(initial, Some(scope));
    let assignment = Node::operation(
        Operator::Assign,
        vec![Node::synthetic_reference(name), value],
        node.span(),
    );
    let assignment = ctx.mark_tree_for_side_effect(&assignment);
    Some(Node::expression_stmt(assignment))
}

fn synthetic_function_declaration() -> Rule {
    Rule::new("syntheticFnDeclaration", |ctx, node, scope| {
        if node.kind() != NodeKind::FunctionDeclaration {
            return None;
        }
        let ident = node.child(0).filter(|id| id.is_synthetic())?;
        let function = node.child(1)?;
        let children = vec![ctx.noexpand(ident), ctx.expand(function, scope)];
        Some(ctx.rebuild_if_changed(node, children))
    })
    .with_synopsis("Pass through declarations of synthetic functions.")
    .with_reason("A synthetic function name may end in double underscores.")
    .for_kinds(&[NodeKind::FunctionDeclaration])
}

fn synthetic_function() -> Rule {
    Rule::new("syntheticFunction", |ctx, node, scope| {
        if node.kind() != NodeKind::FunctionConstructor || !node.is_synthetic() {
            return None;
        }
        // Transparent to scoping: the body is expanded in the current scope.
        let children = node
            .children()
            .iter()
            .map(|child| match child.kind() {
                NodeKind::Identifier | NodeKind::FormalParam => ctx.noexpand(child),
                _ => ctx.expand_all(child, scope),
            })
            .collect();
        Some(ctx.rebuild_if_changed(node, children))
    })
    .with_synopsis("Expand synthetic functions in their enclosing scope.")
    .with_reason("Generated wrappers must not change what user code can see.")
    .for_kinds(&[NodeKind::FunctionConstructor])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RewriterConfig;
    use crate::diagnostics::{CollectingDiagnosticHandler, DiagnosticHandler, MessageKind};
    use crate::parser::parse_expression;
    use crate::render::render;
    use crate::rewriter::{Rewriter, RuleChain};
    use crate::span::Span;
    use std::rc::Rc;
    use std::sync::Arc;

    fn rewriter() -> (Rewriter, Arc<CollectingDiagnosticHandler>) {
        let mut chain = RuleChain::new();
        chain.register_all(synthetic_rules()).unwrap();
        let handler = Arc::new(CollectingDiagnosticHandler::new());
        (Rewriter::new(Rc::new(chain), handler.clone(), RewriterConfig::default()), handler)
    }

    #[test]
    fn synthetic_reads_pass_through() {
        let (rw, handler) = rewriter();
        let object = Node::synthetic_reference("___");
        let member = Node::synthetic_reference("readPub");
        let read = Node::operation(Operator::MemberAccess, vec![object, member], Span::dummy());
        let out = rw.rewrite(&read);
        assert_eq!(render(&out), "___.readPub");
        assert!(handler.is_empty(), "{:?}", handler.get_diagnostics());
    }

    #[test]
    fn user_names_are_left_to_other_rules() {
        let (rw, handler) = rewriter();
        rw.rewrite(&parse_expression("a.b").unwrap());
        assert!(!handler.of_kind(MessageKind::UnmatchedNodeLeftOver).is_empty());
    }
}
