use indoc::indoc;
use std::rc::Rc;
use std::sync::Arc;
use tamejs_core::parser::{parse_expression, parse_program};
use tamejs_core::render::render;
use tamejs_core::rules::{baseline_chain, chain_with};
use tamejs_core::{
    Binding, CollectingDiagnosticHandler, DiagnosticHandler, MessageKind, Node, NodeFlags, NodeKind,
    Rewriter, RewriterConfig, Rule, Span, Value,
};
use tamejs_test_helpers::{rewrite, rewrite_with_rules};

/// Member writes go through the runtime's guarded write.
fn set_member_rule() -> Rule {
    Rule::new("setMember", |ctx, node, scope| {
        let mut bindings = ctx.matches(node)?;
        ctx.expand_entry(&mut bindings, "o", scope);
        ctx.expand_entry(&mut bindings, "r", scope);
        ctx.substitute(&bindings)
    })
    .with_synopsis("Route member writes through w___.")
    .with_matches("@o.@p = @r")
    .with_substitutes("@o.w___('@p', @r)")
}

#[test]
fn test_member_write_becomes_guarded_call() {
    let result = rewrite_with_rules("a.b = c + 1;", vec![set_member_rule()]).unwrap();
    assert!(result.diagnostics().is_empty(), "{:?}", result.messages());
    insta::assert_snapshot!(result.output, @"a.w___('b', c + 1);");
}

#[test]
fn test_nested_member_writes_are_all_rewritten() {
    let source = indoc! {"
        function init(o) {
            o.inner.x = o.y = 2;
        }
    "};
    let result = rewrite_with_rules(source, vec![set_member_rule()]).unwrap();
    assert!(!result.has_errors(), "{:?}", result.messages());
    insta::assert_snapshot!(
        result.output,
        @"function init(o) { o.inner.w___('x', o.w___('y', 2)); }"
    );
}

#[test]
fn test_user_code_cannot_name_runtime_members() {
    let result = rewrite_with_rules("a.w___('b', 1);", vec![set_member_rule()]).unwrap();
    let errors = result.of_kind(MessageKind::VariablesCannotEndInDoubleUnderscore);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].args[0], "w___");
}

#[test]
fn test_policy_violations_are_all_reported() {
    let source = indoc! {"
        with (o) { x; }
        var bad__ = 1;
        function f(p__) {}
    "};
    let result = rewrite(source).unwrap();
    assert_eq!(result.of_kind(MessageKind::WithBlocksNotAllowed).len(), 1);
    let names: Vec<_> = result
        .of_kind(MessageKind::VariablesCannotEndInDoubleUnderscore)
        .into_iter()
        .map(|d| d.args[0].clone())
        .collect();
    assert_eq!(names, vec!["bad__".to_string(), "p__".to_string()]);
    assert!(result.has_errors());
}

#[test]
fn test_synthetic_declarations_are_hoisted() {
    let temp = Node::with_flags(
        NodeKind::Identifier,
        Some(Value::Name("t___".to_string())),
        Vec::new(),
        Span::dummy(),
        NodeFlags::SYNTHETIC,
    );
    let init = parse_expression("f(1)").unwrap();
    let declaration = Node::declaration(temp, Some(init), Span::dummy());
    let call = Node::operation(
        tamejs_core::Operator::FunctionCall,
        vec![parse_expression("g").unwrap(), Node::synthetic_reference("t___")],
        Span::dummy(),
    );
    let body = Node::block(vec![declaration, Node::expression_stmt(call)], Span::dummy());
    let program = Node::new(NodeKind::Module, None, vec![body], Span::dummy());

    let handler = Arc::new(CollectingDiagnosticHandler::new());
    let chain = Rc::new(baseline_chain().unwrap());
    let rewriter = Rewriter::new(chain, handler.clone(), RewriterConfig::default());
    let out = rewriter.rewrite(&program);
    assert!(handler.is_empty(), "{:?}", handler.get_diagnostics());
    assert_eq!(render(&out), "var t___; t___ = f(1); g(t___);");
}

#[test]
fn test_expression_statements_are_marked_for_side_effect() {
    let program = parse_program("f(); x = g();").unwrap();
    let handler = Arc::new(CollectingDiagnosticHandler::new());
    let chain = Rc::new(baseline_chain().unwrap());
    let rewriter = Rewriter::new(chain, handler.clone(), RewriterConfig::default());
    let out = rewriter.rewrite(&program);

    let statements = out.children()[0].children();
    let assignment = &statements[1].children()[0];
    assert!(rewriter.is_for_side_effect(&statements[0].children()[0]));
    assert!(rewriter.is_for_side_effect(assignment));
    assert!(!rewriter.is_for_side_effect(&assignment.children()[1]));
}

#[test]
fn test_rules_can_reuse_matched_values() {
    // `a[k] += v` evaluates `a` and `k` once.
    let compound = Rule::new("compoundIndex", |ctx, node, scope| {
        let scope = scope?;
        let bindings = ctx.matches(node)?;
        let object = ctx.reuse(&ctx.expand(bindings.node("o")?, Some(scope)), scope);
        let key = ctx.reuse(&ctx.expand(bindings.node("k")?, Some(scope)), scope);
        let value = ctx.expand(bindings.node("v")?, Some(scope));
        let mut out = bindings.clone();
        out.insert("o", Binding::Node(object.reference.clone()));
        out.insert("k", Binding::Node(key.reference.clone()));
        out.insert("v", Binding::Node(value));
        let set = ctx.substitute(&out)?;
        let mut steps: Vec<Node> = object.init.into_iter().chain(key.init).collect();
        steps.push(set);
        Some(ctx.comma_operation(steps))
    })
    .with_matches("@o[@k] += @v")
    .with_substitutes("@o[@k] = @o[@k] + @v");

    let chain = chain_with([compound]).unwrap();
    let handler = Arc::new(CollectingDiagnosticHandler::new());
    let rewriter = Rewriter::new(Rc::new(chain), handler.clone(), RewriterConfig::default());
    let out = rewriter.rewrite(&parse_program("a()[i++] += 1; b[j] += 2;").unwrap());
    assert!(handler.is_empty(), "{:?}", handler.get_diagnostics());
    insta::assert_snapshot!(
        render(&out),
        @"var x0___, x1___; x0___ = a(), x1___ = i++, x0___[x1___] = x0___[x1___] + 1; b[j] = b[j] + 2;"
    );
}
