//! Rule sets shipped with the engine.
//!
//! [`synthetic_rules`] pass trusted generator output through untouched and
//! [`baseline_rules`] supply scoping, the policy every confined program is
//! held to and pass-through for everything no other rule claims. A chain is
//! assembled as synthetic rules, then embedder rules, then the baseline.

mod baseline;
mod synthetic;

pub use baseline::baseline_rules;
pub use synthetic::synthetic_rules;

use crate::errors::RuleError;
use crate::quasi::PatternCache;
use crate::rewriter::{Rule, RuleChain};
use std::sync::Arc;

/// The synthetic and baseline rules alone.
pub fn baseline_chain() -> Result<RuleChain, RuleError> {
    chain_with(Vec::new())
}

/// A chain with `rules` between the synthetic and baseline rules.
pub fn chain_with(rules: impl IntoIterator<Item = Rule>) -> Result<RuleChain, RuleError> {
    chain_with_patterns(rules, Arc::new(PatternCache::new()))
}

/// Like [`chain_with`], compiling templates through a shared cache.
pub fn chain_with_patterns(
    rules: impl IntoIterator<Item = Rule>,
    patterns: Arc<PatternCache>,
) -> Result<RuleChain, RuleError> {
    let mut chain = RuleChain::with_patterns(patterns);
    chain.register_all(synthetic_rules())?;
    chain.register_all(rules)?;
    chain.register_all(baseline_rules())?;
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedder_rules_sit_between_the_sets() {
        let chain = chain_with([Rule::new("mine", |_, _, _| None)]).unwrap();
        let names: Vec<&str> = chain.rules().iter().map(Rule::name).collect();
        let mine = names.iter().position(|n| *n == "mine").unwrap();
        assert_eq!(mine, synthetic_rules().len());
        assert_eq!(names.last(), Some(&"recurse"));
    }

    #[test]
    fn shared_cache_compiles_each_template_once() {
        let patterns = Arc::new(PatternCache::new());
        chain_with_patterns(Vec::new(), patterns.clone()).unwrap();
        let compiled = patterns.len();
        chain_with_patterns(Vec::new(), patterns.clone()).unwrap();
        assert_eq!(patterns.len(), compiled);
    }
}
