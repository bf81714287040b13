//! Quasiliteral patterns: JavaScript source templates with holes.
//!
//! A hole is written `@name` where the grammar expects an expression,
//! statement, identifier or parameter. A suffix gives its arity: `@x?`
//! (optional), `@x*` (zero or more siblings) or `@x+` (one or more). Three
//! special forms exist:
//!
//! - `@x___` matches an identifier ending in the same number of
//!   underscores and binds `x` to the name without them.
//! - `'@x'` matches a string literal whose content is an identifier and
//!   binds `x` to that identifier.
//! - `{ @ks*: @vs* }` binds the remaining keys and values of an object
//!   literal as two parallel lists.
//!
//! Template names ending in `__` produce synthetic nodes.

mod bindings;
mod cache;
mod matcher;
mod pattern;
mod substitute;

pub use bindings::{Binding, Bindings};
pub use cache::PatternCache;
pub use pattern::{LiteralPattern, Pattern, Quantifier};
