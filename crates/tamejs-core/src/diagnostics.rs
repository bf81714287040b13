//! Diagnostic reporting shared by the scope analyzer, the rewriter and rules.
//!
//! A single handler is shared by reference across a whole pass. Reporting
//! never aborts the pass: rules and scopes report and carry on, and the caller
//! inspects [`DiagnosticHandler::has_errors`] afterwards to decide whether the
//! output may be trusted.

use crate::span::Span;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    Lint,
    Warning,
    Error,
    FatalError,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiagnosticLevel::Lint => "LINT",
            DiagnosticLevel::Warning => "WARNING",
            DiagnosticLevel::Error => "ERROR",
            DiagnosticLevel::FatalError => "FATAL_ERROR",
        };
        f.write_str(s)
    }
}

/// Every message the engine and the bundled rules can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// No rule accepted a node.
    UnmatchedNodeLeftOver,
    /// A node of the input reached the output without any rule vetting it.
    UnseenNodeLeftOver,
    /// The same node appears more than once in the input tree.
    MultiplyTainted,
    NoexpandBinaryDecl,
    /// A rule substituted into a template without binding every required hole.
    MissingBinding,
    ExpansionTooDeep,
    RuleIndexMismatch,
    SymbolRedefined,
    MaskingSymbol,
    CannotMaskIdentifier,
    VariablesCannotEndInDoubleUnderscore,
    WithBlocksNotAllowed,
}

impl MessageKind {
    pub fn default_level(self) -> DiagnosticLevel {
        match self {
            MessageKind::UnmatchedNodeLeftOver
            | MessageKind::UnseenNodeLeftOver
            | MessageKind::MissingBinding
            | MessageKind::ExpansionTooDeep
            | MessageKind::RuleIndexMismatch => DiagnosticLevel::FatalError,
            MessageKind::MultiplyTainted => DiagnosticLevel::Warning,
            MessageKind::MaskingSymbol => DiagnosticLevel::Lint,
            MessageKind::NoexpandBinaryDecl
            | MessageKind::SymbolRedefined
            | MessageKind::CannotMaskIdentifier
            | MessageKind::VariablesCannotEndInDoubleUnderscore
            | MessageKind::WithBlocksNotAllowed => DiagnosticLevel::Error,
        }
    }

    /// Message template; `{0}`, `{1}`, ... are replaced by the arguments.
    pub fn template(self) -> &'static str {
        match self {
            MessageKind::UnmatchedNodeLeftOver => "Unmatched node left over: {0}",
            MessageKind::UnseenNodeLeftOver => "Unseen node left over: {0}",
            MessageKind::MultiplyTainted => "Node is tainted more than once: {0}",
            MessageKind::NoexpandBinaryDecl => {
                "Cannot noexpand a declaration with an initializer: {0}"
            }
            MessageKind::MissingBinding => "Template `{0}` has no binding for @{1}",
            MessageKind::ExpansionTooDeep => "Expansion exceeded the maximum depth of {0}",
            MessageKind::RuleIndexMismatch => "Rule {0} fired on a {1} node it is not indexed for",
            MessageKind::SymbolRedefined => "{0} originally defined at {1}",
            MessageKind::MaskingSymbol => "Declaration of {0} masks declaration at {1}",
            MessageKind::CannotMaskIdentifier => "Cannot mask identifier \"{0}\"",
            MessageKind::VariablesCannotEndInDoubleUnderscore => {
                "Variables cannot end in \"__\": {0}"
            }
            MessageKind::WithBlocksNotAllowed => "\"with\" blocks are not allowed",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            MessageKind::UnmatchedNodeLeftOver => "UNMATCHED_NODE_LEFT_OVER",
            MessageKind::UnseenNodeLeftOver => "UNSEEN_NODE_LEFT_OVER",
            MessageKind::MultiplyTainted => "MULTIPLY_TAINTED",
            MessageKind::NoexpandBinaryDecl => "NOEXPAND_BINARY_DECL",
            MessageKind::MissingBinding => "MISSING_BINDING",
            MessageKind::ExpansionTooDeep => "EXPANSION_TOO_DEEP",
            MessageKind::RuleIndexMismatch => "RULE_INDEX_MISMATCH",
            MessageKind::SymbolRedefined => "SYMBOL_REDEFINED",
            MessageKind::MaskingSymbol => "MASKING_SYMBOL",
            MessageKind::CannotMaskIdentifier => "CANNOT_MASK_IDENTIFIER",
            MessageKind::VariablesCannotEndInDoubleUnderscore => {
                "VARIABLES_CANNOT_END_IN_DOUBLE_UNDERSCORE"
            }
            MessageKind::WithBlocksNotAllowed => "WITH_BLOCKS_NOT_ALLOWED",
        }
    }
}

/// A single reported message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: MessageKind,
    pub level: DiagnosticLevel,
    pub span: Span,
    /// Values substituted into the kind's template, in order.
    pub args: Vec<String>,
}

impl Diagnostic {
    /// A diagnostic at the kind's default level.
    pub fn new(kind: MessageKind, span: Span, args: Vec<String>) -> Self {
        Diagnostic {
            kind,
            level: kind.default_level(),
            span,
            args,
        }
    }

    pub fn with_level(mut self, level: DiagnosticLevel) -> Self {
        self.level = level;
        self
    }

    pub fn message(&self) -> String {
        let mut out = self.kind.template().to_string();
        for (i, arg) in self.args.iter().enumerate() {
            out = out.replace(&format!("{{{i}}}"), arg);
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} at {}: {}",
            self.level,
            self.kind.code(),
            self.span,
            self.message()
        )
    }
}

/// Sink for diagnostics. Implementations must be append-only.
pub trait DiagnosticHandler: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);

    /// Snapshot of everything reported so far, in report order.
    fn get_diagnostics(&self) -> Vec<Diagnostic>;

    /// Report `kind` at its default level.
    fn emit(&self, kind: MessageKind, span: Span, args: &[&str]) {
        self.report(Diagnostic::new(
            kind,
            span,
            args.iter().map(|a| a.to_string()).collect(),
        ));
    }

    /// Report `kind` at an explicit level.
    fn emit_at(&self, kind: MessageKind, level: DiagnosticLevel, span: Span, args: &[&str]) {
        self.report(
            Diagnostic::new(kind, span, args.iter().map(|a| a.to_string()).collect())
                .with_level(level),
        );
    }

    /// Whether anything at `level` or above has been reported.
    fn has_level(&self, level: DiagnosticLevel) -> bool {
        self.get_diagnostics().iter().any(|d| d.level >= level)
    }

    /// Count of ERROR and FATAL_ERROR diagnostics.
    fn error_count(&self) -> usize {
        self.get_diagnostics()
            .iter()
            .filter(|d| d.level >= DiagnosticLevel::Error)
            .count()
    }

    fn warning_count(&self) -> usize {
        self.get_diagnostics()
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Warning)
            .count()
    }

    /// A pass with errors must be treated as rejected.
    fn has_errors(&self) -> bool {
        self.has_level(DiagnosticLevel::Error)
    }
}

/// Handler that keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct CollectingDiagnosticHandler {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingDiagnosticHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostics of one kind, in report order.
    pub fn of_kind(&self, kind: MessageKind) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .iter()
            .filter(|d| d.kind == kind)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.diagnostics.lock().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.lock().is_empty()
    }
}

impl DiagnosticHandler for CollectingDiagnosticHandler {
    fn report(&self, diagnostic: Diagnostic) {
        tracing::trace!(diagnostic = %diagnostic, "diagnostic reported");
        self.diagnostics.lock().push(diagnostic);
    }

    fn get_diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }
}
