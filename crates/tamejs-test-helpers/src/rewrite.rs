//! Rewriting helpers for tests
//!
//! Wraps parsing, chain assembly and rendering so a test can go from
//! source text to rewritten text and the diagnostics the pass produced.

use anyhow::{Context, Result};
use std::rc::Rc;
use std::sync::Arc;
use tamejs_core::diagnostics::{
    CollectingDiagnosticHandler, Diagnostic, DiagnosticHandler, MessageKind,
};
use tamejs_core::{parser, render, rules, Node, Rewriter, RewriterConfig, Rule};

/// Output of one rewriting pass
#[derive(Debug)]
pub struct Rewritten {
    /// The rewritten program, rendered compactly.
    pub output: String,
    pub tree: Node,
    pub handler: Arc<CollectingDiagnosticHandler>,
}

impl Rewritten {
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.handler.get_diagnostics()
    }

    pub fn of_kind(&self, kind: MessageKind) -> Vec<Diagnostic> {
        self.handler.of_kind(kind)
    }

    /// Rendered messages, one per diagnostic.
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics().iter().map(ToString::to_string).collect()
    }

    pub fn has_errors(&self) -> bool {
        self.handler.has_errors()
    }
}

/// Parse a program
///
/// # Arguments
/// * `source` - JavaScript source text
///
/// # Returns
/// The `Module` node of the program
pub fn parse(source: &str) -> Result<Node> {
    parser::parse_program(source).with_context(|| format!("failed to parse {source:?}"))
}

/// Rewrite a program with the synthetic and baseline rules only
///
/// # Arguments
/// * `source` - JavaScript source text
///
/// # Returns
/// The rewritten program and its diagnostics
pub fn rewrite(source: &str) -> Result<Rewritten> {
    rewrite_with_rules(source, Vec::new())
}

/// Rewrite a program with extra rules between the synthetic and baseline rules
///
/// # Arguments
/// * `source` - JavaScript source text
/// * `extra` - Rules to try before the baseline
///
/// # Returns
/// The rewritten program and its diagnostics
pub fn rewrite_with_rules(source: &str, extra: Vec<Rule>) -> Result<Rewritten> {
    rewrite_with_config(source, extra, RewriterConfig::default())
}

/// Rewrite a program under an explicit configuration
///
/// # Arguments
/// * `source` - JavaScript source text
/// * `extra` - Rules to try before the baseline
/// * `config` - Rewriter settings
///
/// # Returns
/// The rewritten program and its diagnostics
pub fn rewrite_with_config(
    source: &str,
    extra: Vec<Rule>,
    config: RewriterConfig,
) -> Result<Rewritten> {
    crate::init_tracing();
    let program = parse(source)?;
    let chain = rules::chain_with(extra).context("failed to assemble rule chain")?;
    let handler = Arc::new(CollectingDiagnosticHandler::new());
    let rewriter = Rewriter::new(Rc::new(chain), handler.clone(), config);
    let tree = rewriter.rewrite(&program);
    Ok(Rewritten {
        output: render::render(&tree),
        tree,
        handler,
    })
}

/// Parse and render a program without rewriting it
///
/// # Arguments
/// * `source` - JavaScript source text
///
/// # Returns
/// The program as the renderer prints it
pub fn render_source(source: &str) -> Result<String> {
    Ok(render::render(&parse(source)?))
}
