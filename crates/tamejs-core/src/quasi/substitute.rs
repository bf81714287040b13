//! Building trees from a pattern and bindings.

use super::bindings::{Binding, Bindings};
use super::pattern::{LiteralPattern, Pattern, Quantifier};
use crate::ast::{Node, NodeClass, NodeFlags, NodeKind, Value};
use crate::errors::SubstitutionError;
use crate::span::Span;

impl Pattern {
    /// Instantiate the pattern. Template nodes get an unknown position;
    /// bound nodes are inserted as they are.
    ///
    /// A pattern that expands to other than exactly one node (a bare
    /// multi-hole at the root) yields a `Container` of the expansion.
    pub fn substitute(&self, bindings: &Bindings) -> Result<Node, SubstitutionError> {
        let mut out = Vec::new();
        self.emit(bindings, &mut out)?;
        if out.len() == 1 && !self.is_multi() {
            if let Some(node) = out.pop() {
                return Ok(node);
            }
        }
        Ok(Node::container(out))
    }

    fn emit(&self, bindings: &Bindings, out: &mut Vec<Node>) -> Result<(), SubstitutionError> {
        match self {
            Pattern::Literal(lit) => {
                out.push(lit.instantiate(bindings)?);
            }
            Pattern::Hole { name, quantifier, class } => match (quantifier, bindings.get(name)) {
                (Quantifier::Single, Some(Binding::Node(node))) => out.push(node.clone()),
                (Quantifier::Single, Some(Binding::List(_))) => {
                    return Err(SubstitutionError::Arity(name.clone()));
                }
                (Quantifier::Optional, Some(binding)) => {
                    out.extend(binding.nodes().iter().cloned())
                }
                (Quantifier::Optional, None) => {
                    if *class == NodeClass::Identifier {
                        out.push(Node::empty_identifier(Span::dummy()));
                    }
                }
                (Quantifier::OneOrMore, Some(binding)) if binding.nodes().is_empty() => {
                    return Err(SubstitutionError::Arity(name.clone()));
                }
                (Quantifier::ZeroOrMore | Quantifier::OneOrMore, Some(binding)) => {
                    out.extend(binding.nodes().iter().cloned());
                }
                (_, None) => return Err(SubstitutionError::MissingBinding(name.clone())),
            },
            Pattern::TrailingSuffix { name, underscores } => {
                let bound = single(bindings, name)?;
                let base = bound
                    .identifier_name()
                    .ok_or_else(|| SubstitutionError::Arity(name.clone()))?;
                let suffixed = format!("{base}{}", "_".repeat(*underscores));
                let flags = if suffixed.ends_with("__") {
                    NodeFlags::SYNTHETIC
                } else {
                    NodeFlags::empty()
                };
                out.push(Node::with_flags(
                    NodeKind::Identifier,
                    Some(Value::Name(suffixed)),
                    Vec::new(),
                    bound.span(),
                    flags,
                ));
            }
            Pattern::StringAsIdentifier { name } => {
                let bound = single(bindings, name)?;
                out.push(as_string_literal(bound));
            }
            Pattern::ObjectMultiProperty { key_name, value_name, quantifier } => {
                let keys = bindings
                    .get(key_name)
                    .ok_or_else(|| SubstitutionError::MissingBinding(key_name.clone()))?
                    .nodes();
                let values = bindings
                    .get(value_name)
                    .ok_or_else(|| SubstitutionError::MissingBinding(value_name.clone()))?
                    .nodes();
                if keys.len() != values.len() {
                    return Err(SubstitutionError::Arity(value_name.clone()));
                }
                if *quantifier == Quantifier::OneOrMore && keys.is_empty() {
                    return Err(SubstitutionError::Arity(key_name.clone()));
                }
                for (key, value) in keys.iter().zip(values) {
                    out.push(Node::new(
                        NodeKind::ValueProperty,
                        None,
                        vec![as_string_literal(key), value.clone()],
                        Span::dummy(),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl LiteralPattern {
    fn instantiate(&self, bindings: &Bindings) -> Result<Node, SubstitutionError> {
        let mut children = Vec::with_capacity(self.children.len());
        for child in &self.children {
            child.emit(bindings, &mut children)?;
        }
        let flags = if self.synthetic {
            NodeFlags::SYNTHETIC
        } else {
            NodeFlags::empty()
        };
        Ok(Node::with_flags(self.kind, self.value.clone(), children, Span::dummy(), flags))
    }
}

fn single<'b>(bindings: &'b Bindings, name: &str) -> Result<&'b Node, SubstitutionError> {
    match bindings.get(name) {
        Some(Binding::Node(node)) => Ok(node),
        Some(Binding::List(_)) => Err(SubstitutionError::Arity(name.to_string())),
        None => Err(SubstitutionError::MissingBinding(name.to_string())),
    }
}

/// Property keys and quoted holes accept either a string literal or a name.
fn as_string_literal(node: &Node) -> Node {
    if node.kind() == NodeKind::StringLiteral {
        return node.clone();
    }
    match node.identifier_name() {
        Some(name) => Node::string_literal(name, node.span()),
        None => node.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;
    use crate::render::render;

    fn expr(source: &str) -> Node {
        parse_expression(source).unwrap()
    }

    fn subst(template: &str, bindings: &Bindings) -> Node {
        Pattern::compile(template).unwrap().substitute(bindings).unwrap()
    }

    #[test]
    fn builds_a_guarded_write() {
        let b = Bindings::new()
            .with_node("o", expr("a"))
            .with_node("p", Node::identifier_node("b", Span::dummy()))
            .with_node("r", expr("c + 1"));
        let out = subst("@o.w___('@p', @r)", &b);
        assert_eq!(render(&out), "a.w___('b', c + 1)");
        assert!(out.span().is_unknown());
    }

    #[test]
    fn bound_nodes_keep_their_identity() {
        let r = expr("c");
        let out = subst("@r + 1", &Bindings::new().with_node("r", r.clone()));
        assert!(out.children()[0].same_node(&r));
    }

    #[test]
    fn multi_holes_splice_lists() {
        let b = Bindings::new()
            .with_node("f", expr("g"))
            .with_list("as", vec![expr("1"), expr("x")]);
        assert_eq!(render(&subst("@f(0, @as*)", &b)), "g(0, 1, x)");
        let empty = Bindings::new().with_node("f", expr("g")).with_list("as", Vec::new());
        assert_eq!(render(&subst("@f(@as*)", &empty)), "g()");
    }

    #[test]
    fn unbound_optional_identifier_becomes_anonymous() {
        let b = Bindings::new().with_list("ps", Vec::new()).with_list("bs", Vec::new());
        let out = subst("function @f?(@ps*) { @bs*; }", &b);
        assert_eq!(out.kind(), NodeKind::FunctionConstructor);
        assert!(out.children()[0].is_empty_identifier());
    }

    #[test]
    fn missing_bindings_are_named() {
        let err = Pattern::compile("@a + @b")
            .unwrap()
            .substitute(&Bindings::new().with_node("a", expr("1")))
            .unwrap_err();
        assert_eq!(err, SubstitutionError::MissingBinding("b".to_string()));
    }

    #[test]
    fn trailing_suffix_output_is_synthetic() {
        let b = Bindings::new().with_node("x", Node::identifier_node("foo", Span::dummy()));
        let out = subst("@x___", &b);
        assert_eq!(out.identifier_name(), Some("foo___"));
        assert!(out.is_synthetic());
        assert!(out.children()[0].is_synthetic());
    }

    #[test]
    fn object_properties_are_rebuilt_from_lists() {
        let b = Bindings::new()
            .with_list("ks", vec![expr("'a'"), Node::identifier_node("b", Span::dummy())])
            .with_list("vs", vec![expr("1"), expr("2")]);
        assert_eq!(render(&subst("({ @ks*: @vs* })", &b)), "{ a: 1, b: 2 }");
    }

    #[test]
    fn required_properties_reject_empty_lists() {
        let b = Bindings::new().with_list("ks", Vec::new()).with_list("vs", Vec::new());
        let err = Pattern::compile("({ @ks+: @vs+ })").unwrap().substitute(&b).unwrap_err();
        assert_eq!(err, SubstitutionError::Arity("ks".to_string()));
    }

    #[test]
    fn root_multi_hole_yields_a_container() {
        let b = Bindings::new().with_list("xs", vec![expr("1")]);
        assert_eq!(subst("@xs*", &b).kind(), NodeKind::Container);
    }
}
