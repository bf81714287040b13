use std::rc::Rc;
use std::sync::Arc;
use tamejs_core::config::DEFAULT_MAX_EXPANSION_DEPTH;
use tamejs_core::parser::{parse_expression, parse_program};
use tamejs_core::rules::{baseline_chain, chain_with};
use tamejs_core::{
    CollectingDiagnosticHandler, DiagnosticHandler, DiagnosticLevel, MessageKind, Node, NodeKind,
    Operator, Rewriter, RewriterConfig, Rule, RuleChain, Span,
};
use tamejs_test_helpers::{rewrite_with_config, rewrite_with_rules};

fn rewriter(
    chain: RuleChain,
    config: RewriterConfig,
) -> (Rewriter, Arc<CollectingDiagnosticHandler>) {
    let handler = Arc::new(CollectingDiagnosticHandler::new());
    (Rewriter::new(Rc::new(chain), handler.clone(), config), handler)
}

/// Returns calls as they are, without vetting them.
fn leaky_calls() -> Rule {
    Rule::new("leakyCalls", |_, node, _| Some(node.clone()))
        .for_kinds(&[NodeKind::Operation(Operator::FunctionCall)])
}

#[test]
fn test_missing_catch_all_is_fatal() {
    let mut chain = RuleChain::new();
    chain
        .register(
            Rule::new("leaves", |ctx, node, _| Some(ctx.noexpand(node)))
                .for_kinds(&[NodeKind::Reference, NodeKind::Identifier, NodeKind::NumberLiteral]),
        )
        .unwrap();
    let (rw, handler) = rewriter(chain, RewriterConfig::default());
    let input = parse_expression("a + 1").unwrap();
    let out = rw.rewrite(&input);

    assert!(out.same_node(&input));
    let unmatched = handler.of_kind(MessageKind::UnmatchedNodeLeftOver);
    assert_eq!(unmatched.len(), 1);
    assert_eq!(unmatched[0].level, DiagnosticLevel::FatalError);
    assert!(handler.has_level(DiagnosticLevel::FatalError));
}

#[test]
fn test_unvetted_output_is_reported_once_per_subtree() {
    let result = rewrite_with_rules("f(x); g(h(1));", vec![leaky_calls()]).unwrap();
    let unseen: Vec<_> = result
        .of_kind(MessageKind::UnseenNodeLeftOver)
        .into_iter()
        .map(|d| d.args[0].clone())
        .collect();
    assert_eq!(unseen, vec!["f(x)".to_string(), "g(h(1))".to_string()]);
    assert!(result.has_errors());
}

#[test]
fn test_taint_checking_can_be_turned_off() {
    let config = RewriterConfig::default().with_taint_checking(false);
    let result = rewrite_with_config("f(x);", vec![leaky_calls()], config).unwrap();
    assert!(result.diagnostics().is_empty(), "{:?}", result.messages());
    assert_eq!(result.output, "f(x);");
}

#[test]
fn test_unchanged_program_keeps_its_identity() {
    let program = parse_program("var a = 1; function f(x) { return x + a; } f(a);").unwrap();
    let (rw, handler) = rewriter(baseline_chain().unwrap(), RewriterConfig::default());
    let out = rw.rewrite(&program);
    assert!(handler.is_empty(), "{:?}", handler.get_diagnostics());
    assert!(out.same_node(&program));
    assert_eq!(out.node_count(), program.node_count());
}

#[test]
fn test_rewriter_can_run_twice() {
    let (rw, handler) = rewriter(baseline_chain().unwrap(), RewriterConfig::default());
    let first = parse_program("a.b = 1;").unwrap();
    let second = parse_program("c(d);").unwrap();
    rw.rewrite(&first);
    rw.rewrite(&second);
    assert!(handler.is_empty(), "{:?}", handler.get_diagnostics());
}

#[test]
fn test_expansion_depth_limit_from_yaml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tamejs.yaml");
    std::fs::write(&path, "max_expansion_depth: 3\n").unwrap();
    let config = RewriterConfig::from_file(&path).unwrap();
    assert!(config.taint_checking);

    let result = rewrite_with_config("f(g(h(1)));", Vec::new(), config).unwrap();
    let too_deep = result.of_kind(MessageKind::ExpansionTooDeep);
    assert!(!too_deep.is_empty());
    assert_eq!(too_deep[0].args, vec!["3".to_string()]);
    assert!(result.of_kind(MessageKind::UnseenNodeLeftOver).is_empty());
}

#[test]
fn test_index_verification_reports_misfiled_rules() {
    let misfiled = Rule::new("misfiled", |ctx, node, _| {
        (node.kind() == NodeKind::NumberLiteral).then(|| ctx.noexpand(node))
    })
    .for_kinds(&[NodeKind::StringLiteral]);
    let chain = chain_with([misfiled]).unwrap();
    let config = RewriterConfig::default().with_rule_index_verification(true);
    let (rw, handler) = rewriter(chain, config);
    rw.rewrite(&parse_program("x = 1;").unwrap());

    let mismatches = handler.of_kind(MessageKind::RuleIndexMismatch);
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].args[0], "misfiled");
}

#[test]
fn test_first_applicable_rule_wins_over_later_ones() {
    let zero = Rule::new("zero", |ctx, node, _| {
        ctx.noexpand(node);
        Some(tamejs_core::Node::number(0.0, node.span()))
    })
    .for_kinds(&[NodeKind::NumberLiteral]);
    let one = Rule::new("one", |ctx, node, _| {
        ctx.noexpand(node);
        Some(tamejs_core::Node::number(1.0, node.span()))
    })
    .for_kinds(&[NodeKind::NumberLiteral]);
    let result = rewrite_with_rules("x = 5;", vec![zero, one]).unwrap();
    assert_eq!(result.output, "x = 0;");
}

#[test]
fn test_default_depth_limit_stops_before_the_stack_does() {
    let depth = 4 * DEFAULT_MAX_EXPANSION_DEPTH;
    let mut expr = Node::number(1.0, Span::dummy());
    for _ in 0..depth {
        expr = Node::operation(Operator::Not, vec![expr], Span::dummy());
    }
    let block = Node::block(vec![Node::expression_stmt(expr)], Span::dummy());
    let program = Node::new(NodeKind::Module, None, vec![block], Span::dummy());

    let (rw, handler) = rewriter(baseline_chain().unwrap(), RewriterConfig::default());
    rw.rewrite(&program);

    let too_deep = handler.of_kind(MessageKind::ExpansionTooDeep);
    assert_eq!(too_deep.len(), 1, "{:?}", handler.get_diagnostics());
    assert_eq!(too_deep[0].args, vec![DEFAULT_MAX_EXPANSION_DEPTH.to_string()]);
}
