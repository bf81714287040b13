//! Rule-driven tree rewriting.
//!
//! A [`Rewriter`] tries the rules of its [`RuleChain`] against a node, in
//! registration order, and returns the result of the first rule that
//! applies. Rules recurse through [`Rewriter::expand`] on the parts they
//! keep.
//!
//! # Completeness
//!
//! With taint checking on, every node of the input is marked before the
//! pass. Only [`Rewriter::noexpand`] and [`Rewriter::expand_all`] clear the
//! mark, so a node that a rule copied into its output without expanding it
//! is still marked afterwards and is reported as `UnseenNodeLeftOver`.
//! Synthetic nodes are exempt.

mod chain;
mod rule;

pub use chain::RuleChain;
pub use rule::{FireFn, Rule};

use crate::ast::{Node, NodeId, NodeKind, Operator};
use crate::config::RewriterConfig;
use crate::diagnostics::{DiagnosticHandler, MessageKind};
use crate::quasi::{Binding, Bindings, PatternCache};
use crate::render::render;
use crate::scope::Scope;
use crate::span::Span;
use rustc_hash::FxHashSet;
use std::cell::{Cell, RefCell};
use std::ops::Deref;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

/// A value computed once into a temporary, or used directly when
/// evaluating it twice is harmless.
#[derive(Debug, Clone, PartialEq)]
pub struct Reused {
    /// Expression to use in place of the value.
    pub reference: Node,
    /// Assignment to evaluate first, when a temporary was needed.
    pub init: Option<Node>,
}

pub struct Rewriter {
    chain: Rc<RuleChain>,
    handler: Arc<dyn DiagnosticHandler>,
    config: RewriterConfig,
    tainted: RefCell<FxHashSet<NodeId>>,
    side_effects: RefCell<FxHashSet<NodeId>>,
    depth: Cell<usize>,
}

impl Rewriter {
    pub fn new(
        chain: Rc<RuleChain>,
        handler: Arc<dyn DiagnosticHandler>,
        config: RewriterConfig,
    ) -> Self {
        Rewriter {
            chain,
            handler,
            config,
            tainted: RefCell::default(),
            side_effects: RefCell::default(),
            depth: Cell::new(0),
        }
    }

    pub fn chain(&self) -> &RuleChain {
        &self.chain
    }

    pub fn handler(&self) -> &Arc<dyn DiagnosticHandler> {
        &self.handler
    }

    pub fn config(&self) -> &RewriterConfig {
        &self.config
    }

    pub fn patterns(&self) -> &Arc<PatternCache> {
        self.chain.patterns()
    }

    /// Rewrite a whole tree.
    ///
    /// The result must not be trusted if the handler reports errors
    /// afterwards, whatever the returned tree looks like.
    pub fn rewrite(&self, root: &Node) -> Node {
        self.tainted.borrow_mut().clear();
        self.side_effects.borrow_mut().clear();
        if self.config.taint_checking {
            self.taint(root);
        }
        let result = self.expand(root, None);
        if self.config.taint_checking {
            self.check_taint(&result);
        }
        result
    }

    fn taint(&self, root: &Node) {
        let mut tainted = self.tainted.borrow_mut();
        root.walk(&mut |node| {
            if !tainted.insert(node.id()) {
                self.handler
                    .emit(MessageKind::MultiplyTainted, node.span(), &[&node.kind().to_string()]);
            }
        });
    }

    fn untaint(&self, node: &Node) {
        self.tainted.borrow_mut().remove(&node.id());
    }

    pub fn is_tainted(&self, node: &Node) -> bool {
        self.tainted.borrow().contains(&node.id())
    }

    fn check_taint(&self, node: &Node) {
        // Rejected output is never used, and rules that reject return
        // their input unexpanded.
        if self.handler.has_errors() {
            return;
        }
        let tainted = self.tainted.borrow();
        let mut stack = vec![node.clone()];
        while let Some(current) = stack.pop() {
            if tainted.contains(&current.id()) && !current.is_synthetic() {
                let shown = render(&current);
                warn!(kind = %current.kind(), node = %shown, "unvetted node in output");
                self.handler
                    .emit(MessageKind::UnseenNodeLeftOver, current.span(), &[&shown]);
                continue;
            }
            stack.extend(current.children().iter().rev().cloned());
        }
    }

    /// Rewrite `node` with the first rule that applies.
    ///
    /// When no rule applies the node is returned as is and an
    /// `UnmatchedNodeLeftOver` error is reported.
    pub fn expand(&self, node: &Node, scope: Option<&Scope<'_>>) -> Node {
        let depth = self.depth.get() + 1;
        if let Some(max) = self.config.max_expansion_depth {
            if depth > max {
                self.handler
                    .emit(MessageKind::ExpansionTooDeep, node.span(), &[&max.to_string()]);
                return node.clone();
            }
        }
        self.depth.set(depth);
        let result = self.apply_rules(node, scope);
        self.depth.set(depth - 1);
        result
    }

    fn apply_rules(&self, node: &Node, scope: Option<&Scope<'_>>) -> Node {
        let kind = node.kind();
        let rules = self.chain.rules();
        let every_rule: Vec<usize>;
        let candidates = if self.config.verify_rule_index {
            every_rule = (0..rules.len()).collect();
            &every_rule[..]
        } else {
            self.chain.candidates(kind)
        };

        for &position in candidates {
            let rule = &rules[position];
            let Some(result) = rule.fire(self, node, scope) else {
                continue;
            };
            if self.config.verify_rule_index && !self.chain.is_candidate(position, kind) {
                self.handler.emit(
                    MessageKind::RuleIndexMismatch,
                    node.span(),
                    &[rule.name(), &kind.to_string()],
                );
            }
            if self.config.log_rule_firings {
                debug!(rule = rule.name(), input = %kind, output = %result.kind(), "rule fired");
            } else {
                trace!(rule = rule.name(), input = %kind, output = %result.kind(), "rule fired");
            }
            if result.span().is_unknown() && !node.span().is_unknown() {
                return result.repositioned(node.span());
            }
            return result;
        }

        warn!(kind = %kind, "no rule matched");
        self.handler
            .emit(MessageKind::UnmatchedNodeLeftOver, node.span(), &[&kind.to_string()]);
        node.clone()
    }

    /// Expand every child. Returns `node` itself when no child changed.
    pub fn expand_all(&self, node: &Node, scope: Option<&Scope<'_>>) -> Node {
        let children: Vec<Node> = node
            .children()
            .iter()
            .map(|child| self.expand(child, scope))
            .collect();
        self.rebuild_if_changed(node, children)
    }

    /// `node` with `children`, or `node` itself when they are the same
    /// nodes it already has. Either way the result counts as vetted.
    pub fn rebuild_if_changed(&self, node: &Node, children: Vec<Node>) -> Node {
        let unchanged = children.len() == node.children().len()
            && children
                .iter()
                .zip(node.children())
                .all(|(new, old)| new.same_node(old));
        self.untaint(node);
        if unchanged {
            node.clone()
        } else {
            node.rebuild(children)
        }
    }

    /// Pass a node through unchanged, marking it vetted.
    ///
    /// A reference or declaration is vetted together with its identifier.
    /// A declaration with an initializer cannot be passed through this way.
    pub fn noexpand(&self, node: &Node) -> Node {
        match node.kind() {
            NodeKind::Reference | NodeKind::FormalParam => {
                if let Some(ident) = node.child(0) {
                    self.untaint(ident);
                }
            }
            NodeKind::Declaration => {
                if node.initializer().is_some() {
                    self.handler.emit(
                        MessageKind::NoexpandBinaryDecl,
                        node.span(),
                        &[&render(node)],
                    );
                    return node.clone();
                }
                if let Some(ident) = node.child(0) {
                    self.untaint(ident);
                }
            }
            _ => {}
        }
        self.untaint(node);
        node.clone()
    }

    pub fn noexpand_params(&self, params: &[Node]) -> Vec<Node> {
        params.iter().map(|p| self.noexpand(p)).collect()
    }

    /// A binding with its node, or each node of its list, expanded.
    pub fn expand_binding(&self, binding: &Binding, scope: Option<&Scope<'_>>) -> Binding {
        match binding {
            Binding::Node(node) => Binding::Node(self.expand(node, scope)),
            Binding::List(nodes) => {
                Binding::List(nodes.iter().map(|n| self.expand(n, scope)).collect())
            }
        }
    }

    /// Expand the named entry in place. Absent entries are left absent.
    pub fn expand_entry(&self, bindings: &mut Bindings, name: &str, scope: Option<&Scope<'_>>) {
        if let Some(expanded) = bindings.get(name).map(|b| self.expand_binding(b, scope)) {
            bindings.insert(name, expanded);
        }
    }

    /// Bindings with every entry expanded, in binding order.
    pub fn expand_entries(&self, bindings: &Bindings, scope: Option<&Scope<'_>>) -> Bindings {
        let mut expanded = bindings.clone();
        let names: Vec<String> = bindings.names().map(str::to_string).collect();
        for name in &names {
            self.expand_entry(&mut expanded, name, scope);
        }
        expanded
    }

    /// Instantiate an ad-hoc template. A missing binding is reported as a
    /// fatal rule defect and yields `None`.
    pub fn subst_v(&self, template: &str, bindings: &Bindings) -> Option<Node> {
        let pattern = match self.patterns().template(template) {
            Ok(pattern) => pattern,
            Err(err) => {
                error!(template, error = %err, "rule template does not compile");
                return None;
            }
        };
        match pattern.substitute(bindings) {
            Ok(node) => Some(node),
            Err(err) => {
                self.handler
                    .emit(MessageKind::MissingBinding, Span::dummy(), &[template, err.hole()]);
                None
            }
        }
    }

    /// Match an ad-hoc template.
    pub fn match_template(&self, template: &str, node: &Node) -> Option<Bindings> {
        match self.patterns().matcher(template) {
            Ok(pattern) => pattern.matches(node),
            Err(err) => {
                error!(template, error = %err, "rule template does not compile");
                None
            }
        }
    }

    /// Use `value` twice without evaluating it twice.
    ///
    /// Names and literals are used directly; anything else is assigned to a
    /// fresh temporary of the enclosing function or program.
    pub fn reuse(&self, value: &Node, scope: &Scope<'_>) -> Reused {
        let simple = value.kind() == NodeKind::Reference || value.kind().is_literal();
        if simple {
            return Reused {
                reference: value.clone(),
                init: None,
            };
        }
        let temp = scope.declare_start_of_scope_temp();
        let init =
            Node::operation(Operator::Assign, vec![temp.clone(), value.clone()], Span::dummy());
        Reused {
            reference: temp,
            init: Some(init),
        }
    }

    pub fn reuse_all(&self, values: &[Node], scope: &Scope<'_>) -> Vec<Reused> {
        values.iter().map(|v| self.reuse(v, scope)).collect()
    }

    /// A string literal holding the name of an identifier or reference.
    pub fn to_string_literal(&self, node: &Node) -> Node {
        match node.identifier_name() {
            Some(name) => Node::string_literal(name, node.span()),
            None => node.clone(),
        }
    }

    pub fn new_reference(&self, name: &str, span: Span) -> Node {
        Node::reference(name, span)
    }

    /// Join expressions with the comma operator. No expressions give
    /// `void 0`.
    pub fn comma_operation(&self, operands: Vec<Node>) -> Node {
        let mut operands = operands.into_iter();
        let Some(first) = operands.next() else {
            let zero = Node::number(0.0, Span::dummy());
            return Node::operation(Operator::Void, vec![zero], Span::dummy());
        };
        operands.fold(first, |acc, next| {
            Node::operation(Operator::Comma, vec![acc, next], Span::dummy())
        })
    }

    /// Report parameters whose names are reserved for generated code.
    /// Returns whether all were acceptable.
    pub fn check_formals(&self, params: &[Node]) -> bool {
        params
            .iter()
            .fold(true, |ok, param| self.check_identifier(param) && ok)
    }

    /// Report a user name that ends in double underscores. `node` is an
    /// identifier or anything carrying one as its first child, such as a
    /// parameter or the declaration bound by a catch clause.
    pub fn check_identifier(&self, node: &Node) -> bool {
        let ident = match node.kind() {
            NodeKind::Identifier => Some(node),
            _ => node.identifier(),
        };
        let Some(ident) = ident.filter(|i| !i.is_synthetic()) else {
            return true;
        };
        match ident.identifier_name().filter(|n| n.ends_with("__")) {
            Some(name) => {
                self.handler.emit(
                    MessageKind::VariablesCannotEndInDoubleUnderscore,
                    ident.span(),
                    &[name],
                );
                false
            }
            None => true,
        }
    }

    /// Whether any string literal in `literals` holds `value`.
    pub fn literals_contain(&self, literals: &[Node], value: &str) -> bool {
        literals
            .iter()
            .any(|l| l.unquoted_string().is_some_and(|s| s == value))
    }

    /// Whether any string literal in `literals` ends with `suffix`.
    pub fn literals_end_with(&self, literals: &[Node], suffix: &str) -> bool {
        literals
            .iter()
            .any(|l| l.unquoted_string().is_some_and(|s| s.ends_with(suffix)))
    }

    /// Whether `node` was produced by trusted code. For a reference this is
    /// a property of its identifier.
    pub fn is_synthetic(&self, node: &Node) -> bool {
        match node.kind() {
            NodeKind::Reference => node.child(0).is_some_and(Node::is_synthetic),
            _ => node.is_synthetic(),
        }
    }

    /// Record that the value of `node` is discarded.
    pub fn mark_tree_for_side_effect(&self, node: &Node) -> Node {
        self.side_effects.borrow_mut().insert(node.id());
        node.clone()
    }

    pub fn is_for_side_effect(&self, node: &Node) -> bool {
        self.side_effects.borrow().contains(&node.id())
    }
}

/// What a rule body sees: its own rule and the rewriter running it.
pub struct RuleContext<'r> {
    rule: &'r Rule,
    rewriter: &'r Rewriter,
}

impl<'r> RuleContext<'r> {
    pub fn rule(&self) -> &'r Rule {
        self.rule
    }

    pub fn rewriter(&self) -> &'r Rewriter {
        self.rewriter
    }

    /// Match the rule's `matches` template against `node`.
    pub fn matches(&self, node: &Node) -> Option<Bindings> {
        self.rule.match_pattern.as_ref()?.matches(node)
    }

    /// Instantiate the rule's `substitutes` template. A missing binding is
    /// reported as a fatal rule defect and yields `None`.
    pub fn substitute(&self, bindings: &Bindings) -> Option<Node> {
        let Some(pattern) = self.rule.substitute_pattern.as_ref() else {
            error!(rule = self.rule.name(), "rule has no substitutes template");
            return None;
        };
        match pattern.substitute(bindings) {
            Ok(node) => Some(node),
            Err(err) => {
                self.rewriter.handler.emit(
                    MessageKind::MissingBinding,
                    Span::dummy(),
                    &[self.rule.substitutes().unwrap_or_default(), err.hole()],
                );
                None
            }
        }
    }
}

impl Deref for RuleContext<'_> {
    type Target = Rewriter;

    fn deref(&self) -> &Rewriter {
        self.rewriter
    }
}
