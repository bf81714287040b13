use crate::ast::{Node, NodeKind, Operator};
use std::collections::BTreeSet;

/// Collects the declarations and free references of one region without
/// descending into nested functions.
///
/// A catch clause's own exception name is not collected as a reference
/// inside its body, but declarations in the body are, since `var` hoists
/// out of catch blocks.
#[derive(Debug, Default)]
pub(super) struct Harvest {
    pub references: BTreeSet<String>,
    /// Declarations, function declarations and formal parameters, in
    /// source order.
    pub declarations: Vec<Node>,
    exceptions: Vec<String>,
}

impl Harvest {
    pub fn of(root: &Node) -> Self {
        let mut harvest = Harvest::default();
        harvest.visit(root);
        harvest
    }

    fn visit(&mut self, node: &Node) {
        match node.kind() {
            NodeKind::FunctionConstructor => {
                // Generated functions are transparent to scoping.
                if node.is_synthetic() {
                    self.visit_children(node);
                }
            }
            NodeKind::CatchStmt => {
                let name = exception_name(node);
                self.exceptions.push(name);
                if let Some(body) = node.child(1) {
                    self.visit(body);
                }
                self.exceptions.pop();
            }
            NodeKind::Declaration | NodeKind::FunctionDeclaration | NodeKind::FormalParam => {
                if !node.is_synthetic() {
                    self.declarations.push(node.clone());
                }
                if let Some(init) = node.initializer() {
                    self.visit(init);
                }
            }
            NodeKind::Operation(Operator::MemberAccess) => {
                if let Some(object) = node.child(0) {
                    self.visit(object);
                }
            }
            NodeKind::Reference => {
                if node.is_synthetic() {
                    return;
                }
                if let Some(name) = node.identifier_name() {
                    if !self.exceptions.iter().any(|e| e == name) {
                        self.references.insert(name.to_string());
                    }
                }
            }
            _ => self.visit_children(node),
        }
    }

    fn visit_children(&mut self, node: &Node) {
        for child in node.children() {
            self.visit(child);
        }
    }
}

fn exception_name(catch: &Node) -> String {
    catch
        .child(0)
        .and_then(Node::identifier_name)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_block;

    fn harvest(source: &str) -> Harvest {
        Harvest::of(&parse_block(source).unwrap())
    }

    fn declared(h: &Harvest) -> Vec<&str> {
        h.declarations.iter().filter_map(Node::identifier_name).collect()
    }

    #[test]
    fn stops_at_nested_functions() {
        let h = harvest("var a = function () { var b; c; }; function d() { e; }");
        assert_eq!(declared(&h), vec!["a", "d"]);
        assert!(h.references.is_empty());
    }

    #[test]
    fn member_names_are_not_references() {
        let h = harvest("x.y.z; a[b];");
        let refs: Vec<_> = h.references.iter().map(String::as_str).collect();
        assert_eq!(refs, vec!["a", "b", "x"]);
    }

    #[test]
    fn catch_names_are_local_to_the_body() {
        let h = harvest("try { } catch (e) { e; f; var g; }");
        let refs: Vec<_> = h.references.iter().map(String::as_str).collect();
        assert_eq!(refs, vec!["f"]);
        assert_eq!(declared(&h), vec!["g"]);
    }

    #[test]
    fn this_and_arguments_are_collected_like_names() {
        let h = harvest("this.x = arguments[0];");
        assert!(h.references.contains("this"));
        assert!(h.references.contains("arguments"));
    }
}
