//! Compiled pattern trees and the template compiler.

use crate::ast::literal::is_valid_identifier;
use crate::ast::{Node, NodeClass, NodeKind, Value};
use crate::errors::PatternError;
use crate::parser::parse_template;

/// How many siblings a hole may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
    Single,
    /// `@x?`
    Optional,
    /// `@x*`
    ZeroOrMore,
    /// `@x+`
    OneOrMore,
}

impl Quantifier {
    pub fn is_multi(self) -> bool {
        matches!(self, Quantifier::ZeroOrMore | Quantifier::OneOrMore)
    }

    /// Split `name?`, `name*` or `name+` into the bare name and quantifier.
    fn split(name: &str) -> (&str, Quantifier) {
        match name.as_bytes().last() {
            Some(b'?') => (&name[..name.len() - 1], Quantifier::Optional),
            Some(b'*') => (&name[..name.len() - 1], Quantifier::ZeroOrMore),
            Some(b'+') => (&name[..name.len() - 1], Quantifier::OneOrMore),
            _ => (name, Quantifier::Single),
        }
    }
}

/// A node the specimen must reproduce.
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralPattern {
    pub kind: NodeKind,
    pub value: Option<Value>,
    pub children: Vec<Pattern>,
    /// Substituted copies carry the synthetic flag.
    pub synthetic: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Literal(LiteralPattern),
    Hole {
        name: String,
        quantifier: Quantifier,
        class: NodeClass,
    },
    /// `@x___`: an identifier ending in `underscores` underscores; `x` binds
    /// the identifier with the run stripped.
    TrailingSuffix { name: String, underscores: usize },
    /// `'@x'`: a string literal whose content is an identifier.
    StringAsIdentifier { name: String },
    /// `{ @k*: @v* }`: the remaining properties of an object literal.
    /// `+` on either side requires at least one.
    ObjectMultiProperty {
        key_name: String,
        value_name: String,
        quantifier: Quantifier,
    },
}

impl Pattern {
    /// Parse `template` and compile it.
    ///
    /// A template holding a single statement compiles that statement; an
    /// expression statement compiles its expression and a function
    /// declaration its function.
    pub fn compile(template: &str) -> Result<Pattern, PatternError> {
        let block = parse_template(template).map_err(|source| PatternError::Syntax {
            template: template.to_string(),
            source,
        })?;
        let root = match block.children() {
            [] => return Err(PatternError::Empty(template.to_string())),
            [single] => promote(single),
            _ => block.clone(),
        };
        Ok(build(&root))
    }

    /// Compile a template meant for matching, rejecting sibling lists that
    /// would need backtracking to split.
    pub fn compile_matcher(template: &str) -> Result<Pattern, PatternError> {
        let pattern = Pattern::compile(template)?;
        pattern.check_unambiguous(template)?;
        Ok(pattern)
    }

    /// The node kind every match must have at its root, or `None` when the
    /// root is a hole.
    pub fn root_kind(&self) -> Option<NodeKind> {
        match self {
            Pattern::Literal(lit) => Some(lit.kind),
            Pattern::TrailingSuffix { .. } => Some(NodeKind::Identifier),
            Pattern::StringAsIdentifier { .. } => Some(NodeKind::StringLiteral),
            Pattern::ObjectMultiProperty { .. } => Some(NodeKind::ValueProperty),
            Pattern::Hole { .. } => None,
        }
    }

    /// Names of all holes, in template order, without duplicates.
    pub fn hole_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_hole_names(&mut names);
        names
    }

    fn collect_hole_names(&self, out: &mut Vec<String>) {
        let mut push = |name: &str| {
            if !out.iter().any(|n| n == name) {
                out.push(name.to_string());
            }
        };
        match self {
            Pattern::Literal(lit) => {
                for child in &lit.children {
                    child.collect_hole_names(out);
                }
            }
            Pattern::Hole { name, .. }
            | Pattern::TrailingSuffix { name, .. }
            | Pattern::StringAsIdentifier { name } => push(name),
            Pattern::ObjectMultiProperty { key_name, value_name, .. } => {
                push(key_name);
                push(value_name);
            }
        }
    }

    /// Whether this pattern takes a variable number of siblings.
    pub(crate) fn is_multi(&self) -> bool {
        match self {
            Pattern::Hole { quantifier, .. } => quantifier.is_multi(),
            Pattern::ObjectMultiProperty { .. } => true,
            _ => false,
        }
    }

    fn multi_name(&self) -> Option<&str> {
        match self {
            Pattern::Hole { name, quantifier, .. } if quantifier.is_multi() => Some(name),
            Pattern::ObjectMultiProperty { key_name, .. } => Some(key_name),
            _ => None,
        }
    }

    fn check_unambiguous(&self, template: &str) -> Result<(), PatternError> {
        let Pattern::Literal(lit) = self else {
            return Ok(());
        };
        let mut multis = lit.children.iter().filter_map(Pattern::multi_name);
        if let (Some(first), Some(second)) = (multis.next(), multis.next()) {
            return Err(PatternError::AmbiguousMultiHoles {
                template: template.to_string(),
                first: first.to_string(),
                second: second.to_string(),
            });
        }
        lit.children
            .iter()
            .try_for_each(|child| child.check_unambiguous(template))
    }
}

fn promote(node: &Node) -> Node {
    match node.kind() {
        NodeKind::ExpressionStmt => match node.child(0) {
            Some(expr) => expr.clone(),
            None => node.clone(),
        },
        NodeKind::FunctionDeclaration => match node.child(1) {
            Some(function) => function.clone(),
            None => node.clone(),
        },
        _ => node.clone(),
    }
}

/// The hole name of a quasi identifier `@name`, or `None` for ordinary
/// names and for names with a trailing underscore run.
fn hole_name(name: &str) -> Option<&str> {
    name.strip_prefix('@').filter(|rest| !rest.ends_with('_'))
}

fn hole(name: &str, class: NodeClass) -> Pattern {
    let (name, quantifier) = Quantifier::split(name);
    Pattern::Hole {
        name: name.to_string(),
        quantifier,
        class,
    }
}

fn build(node: &Node) -> Pattern {
    match node.kind() {
        NodeKind::ExpressionStmt => {
            let name = node
                .child(0)
                .filter(|expr| expr.kind() == NodeKind::Reference)
                .and_then(Node::identifier_name)
                .and_then(hole_name);
            if let Some(name) = name {
                return hole(name, NodeClass::Statement);
            }
        }
        NodeKind::Reference | NodeKind::FormalParam => {
            if let Some(name) = node.identifier_name().and_then(hole_name) {
                let class = if node.kind() == NodeKind::Reference {
                    NodeClass::Expression
                } else {
                    NodeClass::FormalParam
                };
                return hole(name, class);
            }
        }
        NodeKind::Identifier => {
            if let Some(rest) = node.identifier_name().and_then(|n| n.strip_prefix('@')) {
                let stripped = rest.trim_end_matches('_');
                let underscores = rest.len() - stripped.len();
                if underscores > 0 {
                    return Pattern::TrailingSuffix {
                        name: stripped.to_string(),
                        underscores,
                    };
                }
                return hole(rest, NodeClass::Identifier);
            }
        }
        NodeKind::StringLiteral => {
            if let Some(content) = node.unquoted_string() {
                if let Some(name) = content.strip_prefix('@').filter(|n| is_valid_identifier(n)) {
                    return Pattern::StringAsIdentifier {
                        name: name.to_string(),
                    };
                }
            }
        }
        NodeKind::ValueProperty => {
            if let Some(multi) = object_multi_property(node) {
                return multi;
            }
        }
        _ => {}
    }
    let synthetic = matches!(node.kind(), NodeKind::Identifier | NodeKind::Reference)
        && node.identifier_name().is_some_and(|n| n.ends_with("__"));
    Pattern::Literal(LiteralPattern {
        kind: node.kind(),
        value: node.value().cloned(),
        children: node.children().iter().map(build).collect(),
        synthetic,
    })
}

fn object_multi_property(property: &Node) -> Option<Pattern> {
    let key = property.child(0)?.unquoted_string()?;
    let value = property.child(1)?;
    if value.kind() != NodeKind::Reference {
        return None;
    }
    let (key_name, key_q) = Quantifier::split(key.strip_prefix('@')?);
    let (value_name, value_q) = Quantifier::split(hole_name(value.identifier_name()?)?);
    if !(key_q.is_multi() && value_q.is_multi()) {
        return None;
    }
    let quantifier = if key_q == Quantifier::OneOrMore || value_q == Quantifier::OneOrMore {
        Quantifier::OneOrMore
    } else {
        Quantifier::ZeroOrMore
    };
    Some(Pattern::ObjectMultiProperty {
        key_name: key_name.to_string(),
        value_name: value_name.to_string(),
        quantifier,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Operator;

    fn literal(pattern: &Pattern) -> &LiteralPattern {
        match pattern {
            Pattern::Literal(lit) => lit,
            other => panic!("expected a literal pattern, got {other:?}"),
        }
    }

    #[test]
    fn expression_statements_are_promoted() {
        let p = Pattern::compile("@o.@p = @r;").unwrap();
        assert_eq!(p.root_kind(), Some(NodeKind::Operation(Operator::Assign)));
        assert_eq!(p.hole_names(), vec!["o", "p", "r"]);
    }

    #[test]
    fn function_declarations_compile_to_their_function() {
        let p = Pattern::compile("function @f?(@ps*) { @bs*; }").unwrap();
        let lit = literal(&p);
        assert_eq!(lit.kind, NodeKind::FunctionConstructor);
        assert!(matches!(
            lit.children[0],
            Pattern::Hole { quantifier: Quantifier::Optional, class: NodeClass::Identifier, .. }
        ));
        assert!(matches!(
            lit.children[1],
            Pattern::Hole { quantifier: Quantifier::ZeroOrMore, class: NodeClass::FormalParam, .. }
        ));
        let body = literal(&lit.children[2]);
        assert!(matches!(
            body.children[0],
            Pattern::Hole { class: NodeClass::Statement, .. }
        ));
    }

    #[test]
    fn trailing_underscores_are_counted() {
        let p = Pattern::compile("@a___").unwrap();
        let reference = literal(&p);
        assert!(reference.synthetic);
        assert_eq!(
            reference.children[0],
            Pattern::TrailingSuffix { name: "a".to_string(), underscores: 3 }
        );
    }

    #[test]
    fn quoted_holes_and_object_multi_properties() {
        let p = Pattern::compile("({ '@k': @v, @ks*: @vs* })").unwrap();
        let object = literal(&p);
        assert_eq!(object.kind, NodeKind::ObjectConstructor);
        let first = literal(&object.children[0]);
        assert_eq!(first.children[0], Pattern::StringAsIdentifier { name: "k".to_string() });
        assert_eq!(
            object.children[1],
            Pattern::ObjectMultiProperty {
                key_name: "ks".to_string(),
                value_name: "vs".to_string(),
                quantifier: Quantifier::ZeroOrMore,
            }
        );
        let required = Pattern::compile("({ @ks*: @vs+ })").unwrap();
        assert!(matches!(
            literal(&required).children[0],
            Pattern::ObjectMultiProperty { quantifier: Quantifier::OneOrMore, .. }
        ));
    }

    #[test]
    fn double_underscore_names_are_synthetic_literals() {
        let p = Pattern::compile("___.readPub(@o, @p)").unwrap();
        let call = literal(&p);
        let callee = literal(&call.children[0]);
        let object = literal(&callee.children[0]);
        assert!(object.synthetic);
    }

    #[test]
    fn adjacent_multi_holes_are_rejected_for_matching() {
        let err = Pattern::compile_matcher("@f(@a*, @b*)").unwrap_err();
        assert!(matches!(err, PatternError::AmbiguousMultiHoles { .. }));
        assert!(Pattern::compile("@f(@a*, @b*)").is_ok());
    }

    #[test]
    fn empty_and_broken_templates_fail() {
        assert!(matches!(Pattern::compile("  "), Err(PatternError::Empty(_))));
        assert!(matches!(Pattern::compile("@a +"), Err(PatternError::Syntax { .. })));
    }
}
