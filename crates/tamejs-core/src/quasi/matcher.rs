//! Matching a compiled pattern against a specimen tree.
//!
//! Each pattern consumes a prefix of a sibling list. Multi-holes are greedy
//! and never give nodes back; object literals with a multi-property hole
//! are matched by searching for each named property first.

use super::bindings::{Binding, Bindings};
use super::pattern::{LiteralPattern, Pattern, Quantifier};
use crate::ast::literal::{is_valid_identifier, unquote_string};
use crate::ast::{Node, NodeClass, NodeKind, Value};
use std::slice;

impl Pattern {
    /// Match `specimen`, returning the bindings on success.
    ///
    /// Bindings are only returned for a complete match; nothing is kept from
    /// a failed attempt.
    pub fn matches(&self, specimen: &Node) -> Option<Bindings> {
        let mut bindings = Bindings::new();
        if self.match_into(specimen, &mut bindings) {
            Some(bindings)
        } else {
            None
        }
    }

    /// Match `specimen` on top of existing bindings. On failure `bindings`
    /// is left untouched.
    pub fn match_into(&self, specimen: &Node, bindings: &mut Bindings) -> bool {
        let mut trial = bindings.clone();
        let mut pos = 0;
        if self.consume(slice::from_ref(specimen), &mut pos, &mut trial) && pos == 1 {
            *bindings = trial;
            true
        } else {
            false
        }
    }

    /// Consume nodes from `specimens` starting at `*pos`.
    fn consume(&self, specimens: &[Node], pos: &mut usize, bindings: &mut Bindings) -> bool {
        match self {
            Pattern::Literal(lit) => {
                let Some(node) = specimens.get(*pos) else {
                    return false;
                };
                if !lit.matches_node(node, bindings) {
                    return false;
                }
                *pos += 1;
                true
            }
            Pattern::Hole { name, quantifier, class } => {
                consume_hole(name, *quantifier, *class, specimens, pos, bindings)
            }
            Pattern::TrailingSuffix { name, underscores } => {
                let Some(node) = specimens.get(*pos) else {
                    return false;
                };
                let Some(stripped) = strip_suffix(node, *underscores) else {
                    return false;
                };
                let ident = Node::identifier_node(stripped, node.span());
                if !bindings.bind(name, Binding::Node(ident)) {
                    return false;
                }
                *pos += 1;
                true
            }
            Pattern::StringAsIdentifier { name } => {
                let Some(node) = specimens.get(*pos) else {
                    return false;
                };
                let Some(content) = node.unquoted_string().filter(|s| is_valid_identifier(s)) else {
                    return false;
                };
                let ident = Node::identifier_node(&content, node.span());
                if !bindings.bind(name, Binding::Node(ident)) {
                    return false;
                }
                *pos += 1;
                true
            }
            Pattern::ObjectMultiProperty { key_name, value_name, quantifier } => {
                let rest = &specimens[(*pos).min(specimens.len())..];
                if rest.iter().any(|p| p.kind() != NodeKind::ValueProperty) {
                    return false;
                }
                if *quantifier == Quantifier::OneOrMore && rest.is_empty() {
                    return false;
                }
                let keys = rest.iter().filter_map(|p| p.child(0).cloned()).collect();
                let values = rest.iter().filter_map(|p| p.child(1).cloned()).collect();
                if !bindings.bind(key_name, Binding::List(keys))
                    || !bindings.bind(value_name, Binding::List(values))
                {
                    return false;
                }
                *pos = specimens.len();
                true
            }
        }
    }
}

impl LiteralPattern {
    fn matches_node(&self, node: &Node, bindings: &mut Bindings) -> bool {
        if node.kind() != self.kind || !self.value_matches(node) {
            return false;
        }
        let children = node.children();
        if self.children.iter().any(|p| matches!(p, Pattern::ObjectMultiProperty { .. })) {
            return match_properties(&self.children, children, bindings);
        }
        let mut pos = 0;
        for pattern in &self.children {
            if !pattern.consume(children, &mut pos, bindings) {
                return false;
            }
        }
        pos == children.len()
    }

    fn value_matches(&self, node: &Node) -> bool {
        // Quoting style is not significant.
        if let (NodeKind::StringLiteral, Some(Value::Str(raw))) = (self.kind, &self.value) {
            return node.unquoted_string().is_some_and(|s| s == unquote_string(raw));
        }
        self.value.as_ref() == node.value()
    }
}

fn consume_hole(
    name: &str,
    quantifier: Quantifier,
    class: NodeClass,
    specimens: &[Node],
    pos: &mut usize,
    bindings: &mut Bindings,
) -> bool {
    match quantifier {
        Quantifier::Single => {
            let Some(node) = specimens.get(*pos) else {
                return false;
            };
            if !class.admits(node) || !bindings.bind(name, Binding::Node(node.clone())) {
                return false;
            }
            *pos += 1;
            true
        }
        Quantifier::Optional => match specimens.get(*pos) {
            // The placeholder of an anonymous function stands for "absent".
            Some(node) if class == NodeClass::Identifier && node.is_empty_identifier() => {
                *pos += 1;
                true
            }
            Some(node) if class.admits(node) => {
                if !bindings.bind(name, Binding::Node(node.clone())) {
                    return false;
                }
                *pos += 1;
                true
            }
            _ => true,
        },
        Quantifier::ZeroOrMore | Quantifier::OneOrMore => {
            let start = *pos;
            while specimens.get(*pos).is_some_and(|n| class.admits(n)) {
                *pos += 1;
            }
            if quantifier == Quantifier::OneOrMore && *pos == start {
                return false;
            }
            bindings.bind(name, Binding::List(specimens[start..*pos].to_vec()))
        }
    }
}

/// Object literal children when a multi-property hole is present. Each
/// other property pattern claims the first unused property it matches; the
/// hole takes whatever is left, in order.
fn match_properties(patterns: &[Pattern], properties: &[Node], bindings: &mut Bindings) -> bool {
    let mut used = vec![false; properties.len()];
    let mut rest_pattern = None;
    for pattern in patterns {
        if matches!(pattern, Pattern::ObjectMultiProperty { .. }) {
            rest_pattern = Some(pattern);
            continue;
        }
        let mut claimed = false;
        for (i, property) in properties.iter().enumerate() {
            if used[i] {
                continue;
            }
            let mut trial = bindings.clone();
            let mut pos = 0;
            if pattern.consume(slice::from_ref(property), &mut pos, &mut trial) && pos == 1 {
                *bindings = trial;
                used[i] = true;
                claimed = true;
                break;
            }
        }
        if !claimed {
            return false;
        }
    }
    let leftovers: Vec<Node> = properties
        .iter()
        .zip(&used)
        .filter(|(_, used)| !**used)
        .map(|(p, _)| p.clone())
        .collect();
    match rest_pattern {
        Some(pattern) => {
            let mut pos = 0;
            pattern.consume(&leftovers, &mut pos, bindings) && pos == leftovers.len()
        }
        None => leftovers.is_empty(),
    }
}

fn strip_suffix(node: &Node, underscores: usize) -> Option<&str> {
    if node.kind() != NodeKind::Identifier {
        return None;
    }
    let name = node.identifier_name()?;
    let trailing = name.len() - name.trim_end_matches('_').len();
    if trailing < underscores || name.len() == underscores {
        return None;
    }
    Some(&name[..name.len() - underscores])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Operator;
    use crate::parser::{parse_expression, parse_template};
    use crate::span::Span;

    fn compile(template: &str) -> Pattern {
        Pattern::compile_matcher(template).unwrap()
    }

    fn expr(source: &str) -> Node {
        parse_expression(source).unwrap()
    }

    #[test]
    fn binds_member_assignment_parts() {
        let b = compile("@o.@p = @r").matches(&expr("a.b = c + 1")).unwrap();
        assert_eq!(b.node("o"), Some(&expr("a")));
        assert_eq!(b.node("p").and_then(Node::identifier_name), Some("b"));
        assert_eq!(b.node("r"), Some(&expr("c + 1")));
    }

    #[test]
    fn bound_nodes_are_the_specimen_nodes() {
        let specimen = expr("f(x)");
        let b = compile("@f(@as*)").matches(&specimen).unwrap();
        assert!(b.node("f").unwrap().same_node(&specimen.children()[0]));
        assert!(b.list("as").unwrap()[0].same_node(&specimen.children()[1]));
    }

    #[test]
    fn repeated_names_must_bind_equal_trees() {
        let p = compile("@x + @x");
        assert!(p.matches(&expr("a.b + a.b")).is_some());
        assert!(p.matches(&expr("a + b")).is_none());
    }

    #[test]
    fn repeated_names_bound_to_nan_match() {
        let nan = || Node::number(f64::NAN, Span::dummy());
        let sum = Node::operation(Operator::Addition, vec![nan(), nan()], Span::dummy());
        assert!(compile("@x + @x").matches(&sum).is_some());
        let zeros = Node::operation(
            Operator::Addition,
            vec![Node::number(0.0, Span::dummy()), Node::number(-0.0, Span::dummy())],
            Span::dummy(),
        );
        assert!(compile("@x + @x").matches(&zeros).is_none());
    }

    #[test]
    fn children_must_be_consumed_entirely() {
        assert!(compile("@f(@a)").matches(&expr("f(1, 2)")).is_none());
        assert!(compile("@f()").matches(&expr("f(1)")).is_none());
    }

    #[test]
    fn one_or_more_needs_a_node() {
        let p = compile("@f(@as+)");
        assert!(p.matches(&expr("f()")).is_none());
        assert_eq!(p.matches(&expr("f(1, 2)")).unwrap().list("as").map(<[Node]>::len), Some(2));
    }

    #[test]
    fn optional_identifier_skips_the_anonymous_placeholder() {
        let p = compile("function @f?(@ps*) { @bs*; }");
        let anon = expr("function (a) { return a; }");
        let b = p.matches(&anon).unwrap();
        assert!(!b.contains("f"));
        assert_eq!(b.list("ps").map(<[Node]>::len), Some(1));

        let named = expr("function g() {}");
        let b = p.matches(&named).unwrap();
        assert_eq!(b.node("f").and_then(Node::identifier_name), Some("g"));
    }

    #[test]
    fn string_literals_compare_by_content() {
        assert!(compile("\"x\"").matches(&expr("'x'")).is_some());
        assert!(compile("'x'").matches(&expr("'y'")).is_none());
    }

    #[test]
    fn trailing_suffix_binds_the_stripped_name() {
        let p = compile("@a___");
        let b = p.matches(&expr("foo___")).unwrap();
        assert_eq!(b.node("a").and_then(Node::identifier_name), Some("foo"));
        assert!(p.matches(&expr("foo__")).is_none());
    }

    #[test]
    fn quoted_hole_needs_an_identifier_string() {
        let p = compile("@o['@k']");
        let b = p.matches(&expr("x['size']")).unwrap();
        assert_eq!(b.node("k").and_then(Node::identifier_name), Some("size"));
        assert!(p.matches(&expr("x['not valid']")).is_none());
    }

    #[test]
    fn object_multi_property_takes_the_rest() {
        let p = compile("({ 'kind': @kind, @ks*: @vs* })");
        let b = p.matches(&expr("({ a: 1, kind: 'k', b: 2 })")).unwrap();
        assert_eq!(b.node("kind"), Some(&expr("'k'")));
        let keys: Vec<_> = b.list("ks").unwrap().iter().filter_map(Node::unquoted_string).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(b.list("vs").unwrap(), &[expr("1"), expr("2")]);

        assert!(p.matches(&expr("({ a: 1 })")).is_none());
    }

    #[test]
    fn one_or_more_properties_need_a_property() {
        let p = compile("({ @ks+: @vs+ })");
        assert!(p.matches(&expr("({})")).is_none());
        let b = p.matches(&expr("({ a: 1 })")).unwrap();
        assert_eq!(b.list("vs").unwrap(), &[expr("1")]);

        let with_fixed = compile("({ a: @x, @ks+: @vs+ })");
        assert!(with_fixed.matches(&expr("({ a: 1 })")).is_none());
        assert!(with_fixed.matches(&expr("({ b: 2, a: 1 })")).is_some());
    }

    #[test]
    fn object_without_multi_property_is_positional() {
        let p = compile("({ a: @x, b: @y })");
        assert!(p.matches(&expr("({ a: 1, b: 2 })")).is_some());
        assert!(p.matches(&expr("({ b: 2, a: 1 })")).is_none());
    }

    #[test]
    fn failed_match_leaves_bindings_alone() {
        let mut b = Bindings::new().with_node("x", expr("q"));
        assert!(!compile("@x + @y").match_into(&expr("a + b"), &mut b));
        assert_eq!(b.len(), 1);
        assert!(compile("@x + @y").match_into(&expr("q + b"), &mut b));
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn statement_holes_take_statements() {
        let p = compile("{ @first; @rest*; }");
        let block = parse_template("{ a(); var b; c = 1; }").unwrap().children()[0].clone();
        let b = p.matches(&block).unwrap();
        assert_eq!(b.node("first").map(Node::kind), Some(NodeKind::ExpressionStmt));
        assert_eq!(b.list("rest").map(<[Node]>::len), Some(2));
    }
}
