//! Source-to-source rewriting of untrusted JavaScript.
//!
//! A program is parsed into an immutable [`Node`] tree, rewritten by a
//! [`RuleChain`] of quasiliteral [`Rule`]s under a [`Rewriter`] that checks
//! every input node was vetted by some rule, and rendered back to source.
//! Problems in the program are reported through a [`DiagnosticHandler`];
//! only setup mistakes surface as `Err`.

pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod parser;
pub mod quasi;
pub mod render;
pub mod rewriter;
pub mod rules;
pub mod scope;
pub mod span;

pub use ast::{Node, NodeClass, NodeFlags, NodeId, NodeKind, Operator, Value};
pub use config::RewriterConfig;
pub use diagnostics::{
    CollectingDiagnosticHandler, Diagnostic, DiagnosticHandler, DiagnosticLevel, MessageKind,
};
pub use errors::{ConfigError, ParseError, PatternError, RuleError, SubstitutionError};
pub use quasi::{Binding, Bindings, Pattern, PatternCache};
pub use rewriter::{Reused, Rewriter, Rule, RuleChain, RuleContext};
pub use scope::{LocalKind, Scope, ScopeKind};
pub use span::Span;
