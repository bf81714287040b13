//! Shared store of compiled patterns, keyed by template text.

use super::pattern::Pattern;
use crate::errors::PatternError;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Compiled patterns keyed by template text.
///
/// Patterns hold no nodes, so one cache can be shared between threads and
/// between rule chains.
#[derive(Debug, Default)]
pub struct PatternCache {
    matchers: RwLock<FxHashMap<String, Arc<Pattern>>>,
    templates: RwLock<FxHashMap<String, Arc<Pattern>>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pattern for `template`, checked for use in matching.
    pub fn matcher(&self, template: &str) -> Result<Arc<Pattern>, PatternError> {
        Self::lookup(&self.matchers, template, Pattern::compile_matcher)
    }

    /// The pattern for `template`, for substitution only.
    pub fn template(&self, template: &str) -> Result<Arc<Pattern>, PatternError> {
        Self::lookup(&self.templates, template, Pattern::compile)
    }

    pub fn len(&self) -> usize {
        self.matchers.read().len() + self.templates.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(
        map: &RwLock<FxHashMap<String, Arc<Pattern>>>,
        template: &str,
        compile: fn(&str) -> Result<Pattern, PatternError>,
    ) -> Result<Arc<Pattern>, PatternError> {
        if let Some(pattern) = map.read().get(template) {
            return Ok(Arc::clone(pattern));
        }
        let compiled = Arc::new(compile(template)?);
        let mut map = map.write();
        // Another thread may have compiled it meanwhile.
        let entry = map.entry(template.to_string()).or_insert(compiled);
        Ok(Arc::clone(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn compiles_each_template_once() {
        let cache = PatternCache::new();
        let a = cache.matcher("@a + @b").unwrap();
        let b = cache.matcher("@a + @b").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn matchers_are_validated_but_templates_are_not() {
        let cache = PatternCache::new();
        assert!(cache.matcher("[@a*, @b*]").is_err());
        assert!(cache.template("[@a*, @b*]").is_ok());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn shared_across_threads() {
        let cache = Arc::new(PatternCache::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.matcher("@f(@as*)").map(|p| p.hole_names()))
            })
            .collect();
        for handle in handles {
            let names = handle.join().unwrap().unwrap();
            assert_eq!(names, vec!["f", "as"]);
        }
        assert_eq!(cache.len(), 1);
    }
}
