use super::{Rewriter, RuleContext};
use crate::ast::{Node, NodeKind};
use crate::quasi::Pattern;
use crate::scope::Scope;
use std::fmt;
use std::sync::Arc;

/// The body of a rule. Returns `None` when the rule does not apply.
pub type FireFn = dyn Fn(&RuleContext<'_>, &Node, Option<&Scope<'_>>) -> Option<Node>;

/// A named rewrite step.
///
/// The `matches` template is the rule's structural precondition and also
/// decides which node kinds the chain's index files it under. The
/// `substitutes` template is what [`RuleContext::substitute`] instantiates.
/// Both are compiled when the rule is registered.
pub struct Rule {
    name: String,
    synopsis: String,
    reason: String,
    matches: Option<String>,
    substitutes: Option<String>,
    kinds: Vec<NodeKind>,
    pub(super) match_pattern: Option<Arc<Pattern>>,
    pub(super) substitute_pattern: Option<Arc<Pattern>>,
    fire: Box<FireFn>,
}

impl Rule {
    pub fn new<F>(name: &str, fire: F) -> Self
    where
        F: Fn(&RuleContext<'_>, &Node, Option<&Scope<'_>>) -> Option<Node> + 'static,
    {
        Rule {
            name: name.to_string(),
            synopsis: String::new(),
            reason: String::new(),
            matches: None,
            substitutes: None,
            kinds: Vec::new(),
            match_pattern: None,
            substitute_pattern: None,
            fire: Box::new(fire),
        }
    }

    pub fn with_synopsis(mut self, synopsis: &str) -> Self {
        self.synopsis = synopsis.to_string();
        self
    }

    pub fn with_reason(mut self, reason: &str) -> Self {
        self.reason = reason.to_string();
        self
    }

    pub fn with_matches(mut self, template: &str) -> Self {
        self.matches = Some(template.to_string());
        self
    }

    pub fn with_substitutes(mut self, template: &str) -> Self {
        self.substitutes = Some(template.to_string());
        self
    }

    /// File the rule under these kinds instead of its template's root kind.
    pub fn for_kinds(mut self, kinds: &[NodeKind]) -> Self {
        self.kinds = kinds.to_vec();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn synopsis(&self) -> &str {
        &self.synopsis
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn matches(&self) -> Option<&str> {
        self.matches.as_deref()
    }

    pub fn substitutes(&self) -> Option<&str> {
        self.substitutes.as_deref()
    }

    pub fn match_pattern(&self) -> Option<&Arc<Pattern>> {
        self.match_pattern.as_ref()
    }

    /// Kinds this rule can fire on; empty means any kind.
    pub fn indexed_kinds(&self) -> Vec<NodeKind> {
        if !self.kinds.is_empty() {
            return self.kinds.clone();
        }
        self.match_pattern
            .as_ref()
            .and_then(|p| p.root_kind())
            .into_iter()
            .collect()
    }

    pub(super) fn fire(
        &self,
        rewriter: &Rewriter,
        node: &Node,
        scope: Option<&Scope<'_>>,
    ) -> Option<Node> {
        let ctx = RuleContext {
            rule: self,
            rewriter,
        };
        (self.fire)(&ctx, node, scope)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("matches", &self.matches)
            .field("substitutes", &self.substitutes)
            .field("kinds", &self.kinds)
            .finish_non_exhaustive()
    }
}
