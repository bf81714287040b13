use super::rule::Rule;
use crate::ast::NodeKind;
use crate::errors::RuleError;
use crate::quasi::PatternCache;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

/// Rules in registration order, with an index from node kind to the rules
/// that can fire on it.
///
/// Every index entry lists rule positions in ascending order and includes
/// the wildcard rules, so trying the candidates in order gives the same
/// result as trying every rule in order.
#[derive(Debug)]
pub struct RuleChain {
    rules: Vec<Rule>,
    names: FxHashSet<String>,
    by_kind: FxHashMap<NodeKind, Vec<usize>>,
    wildcards: Vec<usize>,
    patterns: Arc<PatternCache>,
}

impl RuleChain {
    pub fn new() -> Self {
        Self::with_patterns(Arc::new(PatternCache::new()))
    }

    /// A chain compiling its templates through a shared cache.
    pub fn with_patterns(patterns: Arc<PatternCache>) -> Self {
        RuleChain {
            rules: Vec::new(),
            names: FxHashSet::default(),
            by_kind: FxHashMap::default(),
            wildcards: Vec::new(),
            patterns,
        }
    }

    /// Append `rule`, compiling its templates.
    pub fn register(&mut self, mut rule: Rule) -> Result<(), RuleError> {
        if self.names.contains(rule.name()) {
            return Err(RuleError::DuplicateName(rule.name().to_string()));
        }
        let name = rule.name().to_string();
        let pattern_error = |source| RuleError::Pattern {
            rule: name.clone(),
            source,
        };
        if let Some(template) = rule.matches().map(str::to_string) {
            let pattern = self.patterns.matcher(&template).map_err(pattern_error)?;
            rule.match_pattern = Some(pattern);
        }
        if let Some(template) = rule.substitutes().map(str::to_string) {
            let pattern = self.patterns.template(&template).map_err(pattern_error)?;
            rule.substitute_pattern = Some(pattern);
        }
        self.names.insert(name);
        self.rules.push(rule);
        self.rebuild_index();
        Ok(())
    }

    /// Register several rules, stopping at the first failure.
    pub fn register_all(&mut self, rules: impl IntoIterator<Item = Rule>) -> Result<(), RuleError> {
        rules.into_iter().try_for_each(|rule| self.register(rule))
    }

    fn rebuild_index(&mut self) {
        self.by_kind.clear();
        self.wildcards.clear();
        let mut kinds_of = Vec::with_capacity(self.rules.len());
        for (position, rule) in self.rules.iter().enumerate() {
            let kinds = rule.indexed_kinds();
            if kinds.is_empty() {
                self.wildcards.push(position);
            }
            for kind in &kinds {
                self.by_kind.entry(*kind).or_default();
            }
            kinds_of.push(kinds);
        }
        for (kind, entry) in self.by_kind.iter_mut() {
            for (position, kinds) in kinds_of.iter().enumerate() {
                if kinds.is_empty() || kinds.contains(kind) {
                    entry.push(position);
                }
            }
        }
        tracing::trace!(
            rules = self.rules.len(),
            kinds = self.by_kind.len(),
            wildcards = self.wildcards.len(),
            "rebuilt rule index"
        );
    }

    /// Positions of the rules that may fire on `kind`, in order.
    pub fn candidates(&self, kind: NodeKind) -> &[usize] {
        self.by_kind.get(&kind).unwrap_or(&self.wildcards)
    }

    /// Whether the index offers rule `position` for `kind`.
    pub fn is_candidate(&self, position: usize, kind: NodeKind) -> bool {
        self.candidates(kind).binary_search(&position).is_ok()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name() == name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn patterns(&self) -> &Arc<PatternCache> {
        &self.patterns
    }
}

impl Default for RuleChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Operator;

    fn never(name: &str) -> Rule {
        Rule::new(name, |_, _, _| None)
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut chain = RuleChain::new();
        chain.register(never("a")).unwrap();
        let err = chain.register(never("a")).unwrap_err();
        assert_eq!(err, RuleError::DuplicateName("a".to_string()));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn bad_templates_name_the_rule() {
        let mut chain = RuleChain::new();
        let err = chain
            .register(never("broken").with_matches("@f(@a*, @b*)"))
            .unwrap_err();
        assert!(matches!(err, RuleError::Pattern { ref rule, .. } if rule == "broken"));
        assert!(chain.is_empty());
    }

    #[test]
    fn index_keeps_registration_order_and_wildcards() {
        let mut chain = RuleChain::new();
        chain
            .register_all([
                never("assign").with_matches("@a = @b"),
                never("anything"),
                never("call").with_matches("@f(@as*)"),
                never("blocks").for_kinds(&[NodeKind::Block]),
                never("hole").with_matches("@x"),
            ])
            .unwrap();

        let assign = NodeKind::Operation(Operator::Assign);
        assert_eq!(chain.candidates(assign), &[0, 1, 4]);
        assert_eq!(chain.candidates(NodeKind::Operation(Operator::FunctionCall)), &[1, 2, 4]);
        assert_eq!(chain.candidates(NodeKind::Block), &[1, 3, 4]);
        assert_eq!(chain.candidates(NodeKind::WhileLoop), &[1, 4]);
        assert!(chain.is_candidate(0, assign));
        assert!(!chain.is_candidate(2, assign));
    }

    #[test]
    fn rules_keep_their_documentation() {
        let mut chain = RuleChain::new();
        chain
            .register(
                never("doc")
                    .with_synopsis("Does nothing.")
                    .with_reason("Exists for the test.")
                    .with_matches("@x + 1")
                    .with_substitutes("@x - -1"),
            )
            .unwrap();
        let rule = chain.get("doc").unwrap();
        assert_eq!(rule.synopsis(), "Does nothing.");
        assert_eq!(rule.reason(), "Exists for the test.");
        assert_eq!(rule.substitutes(), Some("@x - -1"));
        assert!(rule.match_pattern().is_some());
    }
}
