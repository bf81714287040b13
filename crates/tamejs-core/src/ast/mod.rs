//! The node model.
//!
//! A [`Node`] is an immutable tree value: a closed [`NodeKind`], an optional
//! scalar [`Value`], ordered children, a source [`Span`] and [`NodeFlags`].
//! Trees are never patched in place; rewriting builds new nodes and reuses
//! unchanged subtrees by sharing them.
//!
//! # Identity
//!
//! Every constructed node receives a fresh [`NodeId`]. Clones of a `Node`
//! share the id, so the rewriter can track "this exact input node" across a
//! pass. Equality (`==`) is structural and ignores ids, spans and flags.
//!
//! # Child layout
//!
//! | kind | children |
//! |------|----------|
//! | `Module` | `[Block]` |
//! | `Reference` | `[Identifier]` |
//! | `Declaration` | `[Identifier, init?]` |
//! | `FunctionDeclaration` | `[Identifier, FunctionConstructor]` |
//! | `FunctionConstructor` | `[Identifier (empty if anonymous), FormalParam*, Block]` |
//! | `Operation(.)` | `[object, Reference(property)]` |
//! | `Operation(())` | `[callee, args*]` |
//! | `ValueProperty` | `[StringLiteral, value]` |
//! | `CatchStmt` | `[Declaration, Block]` |

pub mod literal;
pub mod operator;

pub use operator::{Associativity, Operator, OperatorType};

use crate::span::Span;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeFlags: u8 {
        /// Built by a trusted generator; exempt from user naming rules and
        /// from the unseen-node check.
        const SYNTHETIC = 0b0000_0001;
    }
}

/// Stable per-node identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

impl NodeId {
    fn fresh() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Module,
    Block,
    /// Anonymous list of nodes, used where a rule needs to hand back several.
    Container,
    ExpressionStmt,
    Declaration,
    MultiDeclaration,
    FunctionDeclaration,
    FormalParam,
    FunctionConstructor,
    ReturnStmt,
    Conditional,
    ForLoop,
    ForEachLoop,
    WhileLoop,
    DoWhileLoop,
    BreakStmt,
    ContinueStmt,
    ThrowStmt,
    TryStmt,
    CatchStmt,
    FinallyStmt,
    SwitchStmt,
    CaseStmt,
    DefaultCaseStmt,
    LabeledStmt,
    Noop,
    WithStmt,
    DebuggerStmt,
    DirectivePrologue,
    Directive,
    Identifier,
    Reference,
    Operation(Operator),
    ObjectConstructor,
    ValueProperty,
    ArrayConstructor,
    Elision,
    StringLiteral,
    NumberLiteral,
    BooleanLiteral,
    NullLiteral,
    RegexpLiteral,
}

impl NodeKind {
    pub fn is_statement(self) -> bool {
        matches!(
            self,
            NodeKind::Block
                | NodeKind::ExpressionStmt
                | NodeKind::Declaration
                | NodeKind::MultiDeclaration
                | NodeKind::FunctionDeclaration
                | NodeKind::ReturnStmt
                | NodeKind::Conditional
                | NodeKind::ForLoop
                | NodeKind::ForEachLoop
                | NodeKind::WhileLoop
                | NodeKind::DoWhileLoop
                | NodeKind::BreakStmt
                | NodeKind::ContinueStmt
                | NodeKind::ThrowStmt
                | NodeKind::TryStmt
                | NodeKind::CatchStmt
                | NodeKind::FinallyStmt
                | NodeKind::SwitchStmt
                | NodeKind::CaseStmt
                | NodeKind::DefaultCaseStmt
                | NodeKind::LabeledStmt
                | NodeKind::Noop
                | NodeKind::WithStmt
                | NodeKind::DebuggerStmt
                | NodeKind::DirectivePrologue
        )
    }

    pub fn is_expression(self) -> bool {
        matches!(
            self,
            NodeKind::Reference
                | NodeKind::Operation(_)
                | NodeKind::ObjectConstructor
                | NodeKind::ArrayConstructor
                | NodeKind::Elision
                | NodeKind::FunctionConstructor
                | NodeKind::StringLiteral
                | NodeKind::NumberLiteral
                | NodeKind::BooleanLiteral
                | NodeKind::NullLiteral
                | NodeKind::RegexpLiteral
        )
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            NodeKind::StringLiteral
                | NodeKind::NumberLiteral
                | NodeKind::BooleanLiteral
                | NodeKind::NullLiteral
                | NodeKind::RegexpLiteral
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Operation(op) => write!(f, "Operation({})", op.symbol()),
            other => write!(f, "{other:?}"),
        }
    }
}

/// The scalar a node may carry.
///
/// Numbers compare by bit pattern, so `NaN` equals itself and `0` differs
/// from `-0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// Identifier names, statement labels.
    Name(String),
    /// Source text of a string literal or directive, quotes included.
    Str(String),
    Number(f64),
    Boolean(bool),
    /// Source text of a regular expression literal, slashes and flags included.
    Regex(String),
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Name(a), Value::Name(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a.to_bits() == b.to_bits(),
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Regex(a), Value::Regex(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

/// Classes of nodes a hole may accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeClass {
    Any,
    Statement,
    Expression,
    /// A named identifier; the empty placeholder is not admitted.
    Identifier,
    FormalParam,
    Literal,
}

impl NodeClass {
    pub fn admits(self, node: &Node) -> bool {
        let kind = node.kind();
        match self {
            NodeClass::Any => true,
            NodeClass::Statement => kind.is_statement(),
            NodeClass::Expression => kind.is_expression(),
            NodeClass::Identifier => kind == NodeKind::Identifier && node.value().is_some(),
            NodeClass::FormalParam => kind == NodeKind::FormalParam,
            NodeClass::Literal => kind.is_literal(),
        }
    }
}

#[derive(Debug)]
struct NodeData {
    id: NodeId,
    kind: NodeKind,
    value: Option<Value>,
    children: Vec<Node>,
    span: Span,
    flags: NodeFlags,
}

/// A shared handle to an immutable tree node.
#[derive(Clone)]
pub struct Node(Rc<NodeData>);

impl Node {
    pub fn new(kind: NodeKind, value: Option<Value>, children: Vec<Node>, span: Span) -> Node {
        Node::with_flags(kind, value, children, span, NodeFlags::empty())
    }

    pub fn with_flags(
        kind: NodeKind,
        value: Option<Value>,
        children: Vec<Node>,
        span: Span,
        flags: NodeFlags,
    ) -> Node {
        Node(Rc::new(NodeData {
            id: NodeId::fresh(),
            kind,
            value,
            children,
            span,
            flags,
        }))
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn kind(&self) -> NodeKind {
        self.0.kind
    }

    pub fn value(&self) -> Option<&Value> {
        self.0.value.as_ref()
    }

    pub fn children(&self) -> &[Node] {
        &self.0.children
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.0.children.get(index)
    }

    pub fn span(&self) -> Span {
        self.0.span
    }

    pub fn flags(&self) -> NodeFlags {
        self.0.flags
    }

    pub fn is_synthetic(&self) -> bool {
        self.0.flags.contains(NodeFlags::SYNTHETIC)
    }

    /// Whether both handles denote the same node, not merely equal trees.
    pub fn same_node(&self, other: &Node) -> bool {
        self.id() == other.id()
    }

    pub fn operator(&self) -> Option<Operator> {
        match self.kind() {
            NodeKind::Operation(op) => Some(op),
            _ => None,
        }
    }

    /// The name carried by an identifier, or by the identifier directly
    /// under a reference, declaration, parameter or function.
    pub fn identifier_name(&self) -> Option<&str> {
        match self.kind() {
            NodeKind::Identifier
            | NodeKind::LabeledStmt
            | NodeKind::BreakStmt
            | NodeKind::ContinueStmt => match self.value() {
                Some(Value::Name(name)) => Some(name),
                _ => None,
            },
            NodeKind::Reference
            | NodeKind::Declaration
            | NodeKind::FormalParam
            | NodeKind::FunctionDeclaration
            | NodeKind::FunctionConstructor => {
                self.child(0).and_then(|ident| ident.identifier_name())
            }
            _ => None,
        }
    }

    /// The identifier child of a reference, declaration, parameter or function.
    pub fn identifier(&self) -> Option<&Node> {
        match self.kind() {
            NodeKind::Reference
            | NodeKind::Declaration
            | NodeKind::FormalParam
            | NodeKind::FunctionDeclaration
            | NodeKind::FunctionConstructor => {
                self.child(0).filter(|c| c.kind() == NodeKind::Identifier)
            }
            _ => None,
        }
    }

    /// The placeholder identifier of an anonymous function.
    pub fn is_empty_identifier(&self) -> bool {
        self.kind() == NodeKind::Identifier && self.value().is_none()
    }

    /// Decoded content of a string literal.
    pub fn unquoted_string(&self) -> Option<String> {
        match (self.kind(), self.value()) {
            (NodeKind::StringLiteral, Some(Value::Str(raw))) => Some(literal::unquote_string(raw)),
            _ => None,
        }
    }

    /// Initializer of a declaration, if any.
    pub fn initializer(&self) -> Option<&Node> {
        match self.kind() {
            NodeKind::Declaration | NodeKind::FunctionDeclaration => self.child(1),
            _ => None,
        }
    }

    /// Same kind, value, span and flags, new children and a new identity.
    pub fn rebuild(&self, children: Vec<Node>) -> Node {
        Node::with_flags(self.kind(), self.value().cloned(), children, self.span(), self.flags())
    }

    /// Same node at a different position. Identity is kept.
    pub fn repositioned(&self, span: Span) -> Node {
        Node(Rc::new(NodeData {
            id: self.0.id,
            kind: self.0.kind,
            value: self.0.value.clone(),
            children: self.0.children.clone(),
            span,
            flags: self.0.flags,
        }))
    }

    /// A copy carrying the synthetic flag, with a new identity.
    pub fn as_synthetic(&self) -> Node {
        Node::with_flags(
            self.kind(),
            self.value().cloned(),
            self.children().to_vec(),
            self.span(),
            self.flags() | NodeFlags::SYNTHETIC,
        )
    }

    /// Visit this node and all descendants, parents before children.
    /// Visit every node in pre-order. Iterative, so depth is bounded by
    /// the heap rather than the call stack.
    pub fn walk<F: FnMut(&Node)>(&self, f: &mut F) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            f(node);
            stack.extend(node.children().iter().rev());
        }
    }

    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_| count += 1);
        count
    }

    // Constructors for common shapes.

    pub fn identifier_node(name: &str, span: Span) -> Node {
        Node::new(NodeKind::Identifier, Some(Value::Name(name.to_string())), Vec::new(), span)
    }

    pub fn empty_identifier(span: Span) -> Node {
        Node::new(NodeKind::Identifier, None, Vec::new(), span)
    }

    pub fn reference(name: &str, span: Span) -> Node {
        Node::new(NodeKind::Reference, None, vec![Node::identifier_node(name, span)], span)
    }

    /// A synthetic reference to a synthetic identifier.
    pub fn synthetic_reference(name: &str) -> Node {
        let ident = Node::with_flags(
            NodeKind::Identifier,
            Some(Value::Name(name.to_string())),
            Vec::new(),
            Span::dummy(),
            NodeFlags::SYNTHETIC,
        );
        Node::with_flags(
            NodeKind::Reference,
            None,
            vec![ident],
            Span::dummy(),
            NodeFlags::SYNTHETIC,
        )
    }

    /// A string literal denoting `value`.
    pub fn string_literal(value: &str, span: Span) -> Node {
        let quoted = Value::Str(literal::quote_string(value));
        Node::new(NodeKind::StringLiteral, Some(quoted), Vec::new(), span)
    }

    pub fn number(value: f64, span: Span) -> Node {
        Node::new(NodeKind::NumberLiteral, Some(Value::Number(value)), Vec::new(), span)
    }

    pub fn boolean(value: bool, span: Span) -> Node {
        Node::new(NodeKind::BooleanLiteral, Some(Value::Boolean(value)), Vec::new(), span)
    }

    pub fn null(span: Span) -> Node {
        Node::new(NodeKind::NullLiteral, None, Vec::new(), span)
    }

    pub fn operation(op: Operator, operands: Vec<Node>, span: Span) -> Node {
        Node::new(NodeKind::Operation(op), None, operands, span)
    }

    pub fn expression_stmt(expr: Node) -> Node {
        let span = expr.span();
        Node::new(NodeKind::ExpressionStmt, None, vec![expr], span)
    }

    pub fn block(statements: Vec<Node>, span: Span) -> Node {
        Node::new(NodeKind::Block, None, statements, span)
    }

    pub fn container(nodes: Vec<Node>) -> Node {
        Node::new(NodeKind::Container, None, nodes, Span::dummy())
    }

    pub fn declaration(ident: Node, init: Option<Node>, span: Span) -> Node {
        let mut children = vec![ident];
        children.extend(init);
        Node::new(NodeKind::Declaration, None, children, span)
    }

    pub fn noop(span: Span) -> Node {
        Node::new(NodeKind::Noop, None, Vec::new(), span)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Node) -> bool {
        if Rc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        self.kind() == other.kind()
            && self.value() == other.value()
            && self.children() == other.children()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())?;
        match self.value() {
            Some(Value::Name(n)) => write!(f, " {n}")?,
            Some(Value::Str(s)) | Some(Value::Regex(s)) => write!(f, " {s}")?,
            Some(Value::Number(n)) => write!(f, " {n}")?,
            Some(Value::Boolean(b)) => write!(f, " {b}")?,
            None => {}
        }
        if self.is_synthetic() {
            write!(f, " #synthetic")?;
        }
        if !self.children().is_empty() {
            f.debug_list().entries(self.children()).finish()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_structural_and_ignores_position() {
        let a = Node::reference("x", Span::new(0, 1, 1, 1));
        let b = Node::reference("x", Span::new(7, 8, 2, 4));
        assert_eq!(a, b);
        assert!(!a.same_node(&b));
        assert_ne!(a, Node::reference("y", Span::dummy()));
    }

    #[test]
    fn numbers_compare_by_bit_pattern() {
        let nan = || Node::number(f64::NAN, Span::dummy());
        assert_eq!(nan(), nan());
        assert_ne!(Node::number(0.0, Span::dummy()), Node::number(-0.0, Span::dummy()));
        assert_eq!(Node::number(2.5, Span::dummy()), Node::number(2.5, Span::dummy()));
    }

    #[test]
    fn repositioning_keeps_identity() {
        let a = Node::number(1.0, Span::dummy());
        let b = a.repositioned(Span::new(0, 1, 1, 1));
        assert!(a.same_node(&b));
        assert!(b.rebuild(Vec::new()).id() != b.id());
    }

    #[test]
    fn identifier_name_looks_through_wrappers() {
        let ident = Node::identifier_node("v", Span::dummy());
        let decl = Node::declaration(ident, None, Span::dummy());
        assert_eq!(decl.identifier_name(), Some("v"));
        assert_eq!(Node::reference("r", Span::dummy()).identifier_name(), Some("r"));
        assert_eq!(Node::null(Span::dummy()).identifier_name(), None);
    }

    #[test]
    fn identifier_class_rejects_placeholder() {
        assert!(NodeClass::Identifier.admits(&Node::identifier_node("f", Span::dummy())));
        assert!(!NodeClass::Identifier.admits(&Node::empty_identifier(Span::dummy())));
        assert!(NodeClass::Expression.admits(&Node::reference("f", Span::dummy())));
        assert!(!NodeClass::Statement.admits(&Node::reference("f", Span::dummy())));
    }
}
