//! Lexical scope analysis.
//!
//! A [`Scope`] is built for each program, function body, block and catch
//! clause as the rewriter descends into it. Building a program or function
//! scope harvests the region once: every declaration reachable without
//! entering a nested function becomes a local, every other name mentioned
//! is checked against the scope chain and, when unresolved, recorded as an
//! import of the whole program. Redefinitions and masking are reported to
//! the diagnostic handler while the scope is built.
//!
//! Scopes borrow their parent, so a child scope cannot outlive the
//! invocation that owns its parent.

mod harvest;

use crate::ast::{Node, NodeFlags, NodeKind, Value};
use crate::diagnostics::{DiagnosticHandler, DiagnosticLevel, MessageKind};
use crate::span::Span;
use harvest::Harvest;
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Names no program may declare.
pub const UNMASKABLE_IDENTIFIERS: &[&str] = &[
    "Array",
    "Object",
    "NaN",
    "Infinity",
    "undefined",
    "eval",
    "arguments",
];

const THIS: &str = "this";
const ARGUMENTS: &str = "arguments";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Program,
    Function,
    Block,
    Catch,
}

impl ScopeKind {
    /// Whether `var` declarations and temporaries are placed here.
    pub fn is_declaration_container(self) -> bool {
        matches!(self, ScopeKind::Program | ScopeKind::Function)
    }
}

/// What a local name is bound to.
///
/// Kinds form a small implication lattice: a constructor is a declared
/// function, and a declared function is a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalKind {
    /// The name of a function expression, bound inside its own body.
    Function,
    /// `function f() {}`
    DeclaredFunction,
    /// A declared function whose body mentions `this`.
    Constructor,
    Data,
    CaughtException,
}

impl LocalKind {
    pub fn implies(self, other: LocalKind) -> bool {
        match self {
            LocalKind::Constructor => matches!(
                other,
                LocalKind::Constructor | LocalKind::DeclaredFunction | LocalKind::Function
            ),
            LocalKind::DeclaredFunction => {
                matches!(other, LocalKind::DeclaredFunction | LocalKind::Function)
            }
            kind => kind == other,
        }
    }
}

/// A local binding and where it was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Local {
    pub kind: LocalKind,
    pub span: Span,
}

pub struct Scope<'p> {
    kind: ScopeKind,
    parent: Option<&'p Scope<'p>>,
    handler: Arc<dyn DiagnosticHandler>,
    /// Scopes built only to classify a function declaration record nothing.
    side_effecting: bool,
    locals: RefCell<FxHashMap<String, Local>>,
    /// Only populated on the root.
    imported: RefCell<BTreeSet<String>>,
    free_this: Cell<bool>,
    free_arguments: Cell<bool>,
    start_statements: RefCell<Vec<Node>>,
    temp_counter: Cell<u32>,
}

impl Scope<'static> {
    /// The root scope of a program. `root` is a `Module` or its body.
    pub fn from_program(root: &Node, handler: Arc<dyn DiagnosticHandler>) -> Scope<'static> {
        let scope = Scope {
            kind: ScopeKind::Program,
            parent: None,
            handler,
            side_effecting: true,
            locals: RefCell::default(),
            imported: RefCell::default(),
            free_this: Cell::new(false),
            free_arguments: Cell::new(false),
            start_statements: RefCell::default(),
            temp_counter: Cell::new(0),
        };
        scope.walk(root);
        scope
    }
}

impl<'p> Scope<'p> {
    /// A plain block. Its declarations were already hoisted into the
    /// enclosing function or program, so nothing is harvested.
    pub fn from_block(parent: &'p Scope<'p>, _block: &Node) -> Scope<'p> {
        Scope::child(parent, ScopeKind::Block, true)
    }

    /// A catch clause, binding the exception name.
    pub fn from_catch(parent: &'p Scope<'p>, catch: &Node) -> Scope<'p> {
        let scope = Scope::child(parent, ScopeKind::Catch, true);
        if let Some(ident) = catch.child(0).and_then(Node::identifier) {
            scope.declare(ident, LocalKind::CaughtException);
        }
        scope
    }

    /// A function body, from its `FunctionConstructor`.
    pub fn from_function(parent: &'p Scope<'p>, function: &Node) -> Scope<'p> {
        Scope::function(parent, function, true)
    }

    /// A plain block over a generic node list, harvested like a program.
    pub fn from_container(parent: &'p Scope<'p>, container: &Node) -> Scope<'p> {
        let scope = Scope::child(parent, ScopeKind::Block, true);
        scope.walk(container);
        scope
    }

    fn child(parent: &'p Scope<'p>, kind: ScopeKind, side_effecting: bool) -> Scope<'p> {
        Scope {
            kind,
            parent: Some(parent),
            handler: Arc::clone(&parent.handler),
            side_effecting,
            locals: RefCell::default(),
            imported: RefCell::default(),
            free_this: Cell::new(false),
            free_arguments: Cell::new(false),
            start_statements: RefCell::default(),
            temp_counter: Cell::new(0),
        }
    }

    fn function(parent: &'p Scope<'p>, function: &Node, side_effecting: bool) -> Scope<'p> {
        let scope = Scope::child(parent, ScopeKind::Function, side_effecting);
        // A function expression's name is visible inside its own body only.
        if let Some(ident) = function.child(0).filter(|id| !id.is_empty_identifier()) {
            scope.declare(ident, LocalKind::Function);
        }
        let children = function.children();
        for param in children.iter().filter(|c| c.kind() == NodeKind::FormalParam) {
            scope.walk(param);
        }
        if let Some(body) = children.last().filter(|c| c.kind() == NodeKind::Block) {
            scope.walk(body);
        }
        scope
    }

    fn walk(&self, root: &Node) {
        let harvest = Harvest::of(root);
        if self.side_effecting {
            for decl in &harvest.declarations {
                let kind = self.declaration_kind(decl);
                if let Some(ident) = decl.identifier() {
                    self.declare(ident, kind);
                }
            }
        }
        for name in &harvest.references {
            match name.as_str() {
                ARGUMENTS => self.free_arguments.set(true),
                THIS => self.free_this.set(true),
                _ if self.side_effecting && !self.is_defined(name) => self.add_import(name),
                _ => {}
            }
        }
    }

    fn declaration_kind(&self, decl: &Node) -> LocalKind {
        if decl.kind() != NodeKind::FunctionDeclaration {
            return LocalKind::Data;
        }
        match decl.initializer() {
            Some(function) if Scope::function(self, function, false).has_free_this() => {
                LocalKind::Constructor
            }
            _ => LocalKind::DeclaredFunction,
        }
    }

    fn declare(&self, ident: &Node, kind: LocalKind) {
        let Some(name) = ident.identifier_name() else {
            return;
        };
        let span = ident.span();
        // Classification scopes declare too, but only real ones report.
        let reports = self.side_effecting && !ident.is_synthetic();
        // The name a declared function carries again inside its own body.
        let declared_outside = kind == LocalKind::Function
            && self
                .parent
                .and_then(|parent| parent.lookup(name))
                .is_some_and(|outer| outer.span == span);

        if reports && !declared_outside && UNMASKABLE_IDENTIFIERS.contains(&name) {
            self.handler.emit(MessageKind::CannotMaskIdentifier, span, &[name]);
        }

        let previous = self.locals.borrow().get(name).copied();
        if let Some(old) = previous.filter(|_| reports) {
            if old.kind != kind
                || old.kind.implies(LocalKind::Function)
                || kind.implies(LocalKind::Function)
            {
                self.handler.emit(
                    MessageKind::SymbolRedefined,
                    span,
                    &[name, &old.span.to_string()],
                );
            }
        }

        let mut ancestor = self.parent;
        while let Some(scope) = ancestor {
            if let Some(masked) = scope.local(name) {
                // A declared function seen again from inside its own body.
                let self_mask = matches!(
                    masked.kind,
                    LocalKind::DeclaredFunction | LocalKind::Constructor
                ) && kind == LocalKind::Function;
                if masked.kind != kind && !self_mask {
                    let level = if kind == LocalKind::CaughtException
                        || masked.kind == LocalKind::CaughtException
                    {
                        DiagnosticLevel::Error
                    } else {
                        DiagnosticLevel::Lint
                    };
                    if reports && !span.is_unknown() {
                        self.handler.emit_at(
                            MessageKind::MaskingSymbol,
                            level,
                            span,
                            &[name, &masked.span.to_string()],
                        );
                    }
                }
                break;
            }
            ancestor = scope.parent;
        }

        self.locals
            .borrow_mut()
            .insert(name.to_string(), Local { kind, span });
    }

    fn add_import(&self, name: &str) {
        self.root().imported.borrow_mut().insert(name.to_string());
    }

    fn root(&self) -> &Scope<'p> {
        let mut scope = self;
        while let Some(parent) = scope.parent {
            scope = parent;
        }
        scope
    }

    fn closest_declaration_container(&self) -> &Scope<'p> {
        let mut scope = self;
        while !scope.kind.is_declaration_container() {
            match scope.parent {
                Some(parent) => scope = parent,
                None => break,
            }
        }
        scope
    }

    fn local(&self, name: &str) -> Option<Local> {
        self.locals.borrow().get(name).copied()
    }

    /// The binding `name` resolves to along the scope chain.
    pub fn lookup(&self, name: &str) -> Option<Local> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(local) = current.local(name) {
                return Some(local);
            }
            scope = current.parent;
        }
        None
    }

    fn is_defined_as(&self, name: &str, kind: LocalKind) -> bool {
        self.lookup(name).is_some_and(|local| local.kind.implies(kind))
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn parent(&self) -> Option<&'p Scope<'p>> {
        self.parent
    }

    pub fn handler(&self) -> &Arc<dyn DiagnosticHandler> {
        &self.handler
    }

    /// Names declared directly in this scope.
    pub fn locals(&self) -> Vec<(String, Local)> {
        let mut locals: Vec<_> = self
            .locals
            .borrow()
            .iter()
            .map(|(name, local)| (name.clone(), *local))
            .collect();
        locals.sort_by(|a, b| a.0.cmp(&b.0));
        locals
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn is_function(&self, name: &str) -> bool {
        self.is_defined_as(name, LocalKind::Function)
    }

    pub fn is_declared_function(&self, name: &str) -> bool {
        self.is_defined_as(name, LocalKind::DeclaredFunction)
    }

    pub fn is_constructor(&self, name: &str) -> bool {
        self.is_defined_as(name, LocalKind::Constructor)
    }

    pub fn is_data(&self, name: &str) -> bool {
        self.is_defined_as(name, LocalKind::Data)
    }

    pub fn is_exception(&self, name: &str) -> bool {
        self.is_defined_as(name, LocalKind::CaughtException)
    }

    /// Whether `node` is a reference to a declared function.
    pub fn is_declared_function_reference(&self, node: &Node) -> bool {
        node.kind() == NodeKind::Reference
            && node
                .identifier_name()
                .is_some_and(|name| self.is_declared_function(name))
    }

    /// Whether `name` is unresolved at every level and was recorded as a
    /// free variable of the program.
    pub fn is_imported(&self, name: &str) -> bool {
        if self.locals.borrow().contains_key(name) {
            return false;
        }
        match self.parent {
            Some(parent) => parent.is_imported(name),
            None => self.imported.borrow().contains(name),
        }
    }

    /// Whether `name` lives outside every function: declared in the
    /// program, in blocks not nested in a function, or not at all.
    pub fn is_outer(&self, name: &str) -> bool {
        let mut declared = false;
        let mut scope = Some(self);
        while let Some(current) = scope {
            declared = declared || current.locals.borrow().contains_key(name);
            if declared && current.kind == ScopeKind::Function {
                return false;
            }
            scope = current.parent;
        }
        true
    }

    /// Whether this region mentions `this` outside nested functions.
    pub fn has_free_this(&self) -> bool {
        self.free_this.get()
    }

    pub fn has_free_arguments(&self) -> bool {
        self.free_arguments.get()
    }

    /// Free variables of the whole program, sorted.
    pub fn imported_variables(&self) -> Vec<String> {
        self.root().imported.borrow().iter().cloned().collect()
    }

    /// Statements queued for the start of this scope's body.
    pub fn start_statements(&self) -> Vec<Node> {
        self.start_statements.borrow().clone()
    }

    /// Queue `stmt` at the start of the enclosing function or program.
    pub fn add_start_of_scope_statement(&self, stmt: Node) {
        self.closest_declaration_container()
            .add_start_of_block_statement(stmt);
    }

    /// Queue `stmt` at the start of this scope's own block.
    ///
    /// A directive prologue always goes first, and a plain declaration
    /// following another declaration is merged into it.
    pub fn add_start_of_block_statement(&self, stmt: Node) {
        let mut statements = self.start_statements.borrow_mut();
        if stmt.kind() == NodeKind::DirectivePrologue {
            statements.insert(0, stmt);
            return;
        }
        if stmt.kind() == NodeKind::Declaration {
            if let Some(last) = statements.last_mut() {
                if let Some(merged) = merge_declarations(last, &stmt) {
                    *last = merged;
                    return;
                }
            }
        }
        statements.push(stmt);
    }

    /// Declare a fresh temporary `x<n>___` at the start of the enclosing
    /// function or program and return a reference to it.
    pub fn declare_start_of_scope_temp(&self) -> Node {
        let container = self.closest_declaration_container();
        let n = container.temp_counter.get();
        container.temp_counter.set(n + 1);
        let name = format!("x{n}___");
        let ident = synthetic_identifier(&name);
        container.declare_start_of_scope_variable(&ident);
        Node::synthetic_reference(&name)
    }

    /// Declare `ident` at the start of the enclosing function or program.
    pub fn declare_start_of_scope_variable(&self, ident: &Node) {
        let container = self.closest_declaration_container();
        container.declare(ident, LocalKind::Data);
        let decl = Node::with_flags(
            NodeKind::Declaration,
            None,
            vec![ident.clone()],
            Span::dummy(),
            NodeFlags::SYNTHETIC,
        );
        container.add_start_of_block_statement(decl);
    }

    /// `statements` with this scope's start statements inserted after any
    /// leading directive prologue.
    pub fn splice_start_statements(&self, statements: Vec<Node>) -> Vec<Node> {
        let start = self.start_statements.borrow();
        if start.is_empty() {
            return statements;
        }
        let mut out = Vec::with_capacity(statements.len() + start.len());
        let mut rest = statements.into_iter().peekable();
        if let Some(prologue) = rest.next_if(|s| s.kind() == NodeKind::DirectivePrologue) {
            out.push(prologue);
        }
        out.extend(start.iter().cloned());
        out.extend(rest);
        out
    }
}

impl fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("kind", &self.kind)
            .field("locals", &self.locals())
            .field("free_this", &self.free_this.get())
            .field("free_arguments", &self.free_arguments.get())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

fn synthetic_identifier(name: &str) -> Node {
    Node::with_flags(
        NodeKind::Identifier,
        Some(Value::Name(name.to_string())),
        Vec::new(),
        Span::dummy(),
        NodeFlags::SYNTHETIC,
    )
}

fn merge_declarations(previous: &Node, next: &Node) -> Option<Node> {
    let mut declarations = match previous.kind() {
        NodeKind::Declaration => vec![previous.clone()],
        NodeKind::MultiDeclaration => previous.children().to_vec(),
        _ => return None,
    };
    declarations.push(next.clone());
    Some(Node::with_flags(
        NodeKind::MultiDeclaration,
        None,
        declarations,
        Span::dummy(),
        previous.flags() & next.flags(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingDiagnosticHandler;
    use crate::parser::parse_program;
    use crate::render::render;

    fn program(source: &str) -> (Node, Arc<CollectingDiagnosticHandler>) {
        (parse_program(source).unwrap(), Arc::new(CollectingDiagnosticHandler::new()))
    }

    /// The first function expression or declaration's constructor.
    fn first_function(node: &Node) -> Node {
        let mut found = None;
        node.walk(&mut |n| {
            if found.is_none() && n.kind() == NodeKind::FunctionConstructor {
                found = Some(n.clone());
            }
        });
        found.unwrap()
    }

    #[test]
    fn local_kinds_imply_their_supertypes() {
        assert!(LocalKind::Constructor.implies(LocalKind::Function));
        assert!(LocalKind::DeclaredFunction.implies(LocalKind::Function));
        assert!(!LocalKind::Function.implies(LocalKind::DeclaredFunction));
        assert!(!LocalKind::Data.implies(LocalKind::Function));
    }

    #[test]
    fn program_scope_classifies_declarations() {
        let (root, handler) = program("var a; function b() {} function C() { this.x = 1; } d;");
        let scope = Scope::from_program(&root, handler.clone());
        assert!(scope.is_data("a"));
        assert!(scope.is_declared_function("b"));
        assert!(!scope.is_constructor("b"));
        assert!(scope.is_constructor("C"));
        assert!(scope.is_imported("d"));
        assert!(!scope.is_imported("a"));
        assert!(!scope.has_free_this());
        assert!(handler.is_empty());
    }

    #[test]
    fn function_name_is_bound_inside_the_body() {
        let (root, handler) = program("var g = function f() { return f; };");
        let top = Scope::from_program(&root, handler.clone());
        assert!(!top.is_defined("f"));
        let inner = Scope::from_function(&top, &first_function(&root));
        assert!(inner.is_function("f"));
        assert!(!inner.is_declared_function("f"));
        assert!(handler.is_empty());
    }

    #[test]
    fn declared_function_does_not_mask_itself() {
        let (root, handler) = program("function f() { return f; }");
        let top = Scope::from_program(&root, handler.clone());
        let _inner = Scope::from_function(&top, &first_function(&root));
        assert!(handler.is_empty(), "{:?}", handler.get_diagnostics());
    }

    #[test]
    fn redefining_a_function_as_data_is_an_error() {
        let (root, handler) = program("function x() {} var x;");
        Scope::from_program(&root, handler.clone());
        let errors = handler.of_kind(MessageKind::SymbolRedefined);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].level, DiagnosticLevel::Error);
    }

    #[test]
    fn repeated_var_is_fine() {
        let (root, handler) = program("var x; var x = 1;");
        Scope::from_program(&root, handler.clone());
        assert!(handler.is_empty());
    }

    #[test]
    fn masking_data_with_data_is_silent_but_function_masking_is_lint() {
        let (root, handler) = program("var x; function g() {} (function () { var x; var g; });");
        let top = Scope::from_program(&root, handler.clone());
        Scope::from_function(&top, &first_function(&root.children()[0].children()[2]));
        let masks = handler.of_kind(MessageKind::MaskingSymbol);
        assert_eq!(masks.len(), 1);
        assert_eq!(masks[0].args[0], "g");
        assert_eq!(masks[0].level, DiagnosticLevel::Lint);
    }

    #[test]
    fn catch_binding_masking_a_var_is_an_error() {
        let (root, handler) = program("var e; try { } catch (e) { }");
        let top = Scope::from_program(&root, handler.clone());
        let mut catch = None;
        root.walk(&mut |n| {
            if n.kind() == NodeKind::CatchStmt {
                catch = Some(n.clone());
            }
        });
        let scope = Scope::from_catch(&top, &catch.unwrap());
        assert!(scope.is_exception("e"));
        let masks = handler.of_kind(MessageKind::MaskingSymbol);
        assert_eq!(masks.len(), 1);
        assert_eq!(masks[0].level, DiagnosticLevel::Error);
    }

    #[test]
    fn unmaskable_names_are_rejected() {
        let (root, handler) = program("var Array; function f(undefined) {}");
        let top = Scope::from_program(&root, handler.clone());
        Scope::from_function(&top, &first_function(&root));
        let errors = handler.of_kind(MessageKind::CannotMaskIdentifier);
        let names: Vec<_> = errors.iter().map(|d| d.args[0].as_str()).collect();
        assert_eq!(names, vec!["Array", "undefined"]);
    }

    #[test]
    fn unmaskable_function_name_is_reported_once() {
        for source in ["function Array() { this.x = 1; }", "(function NaN() {});"] {
            let (root, handler) = program(source);
            let top = Scope::from_program(&root, handler.clone());
            Scope::from_function(&top, &first_function(&root));
            let errors = handler.of_kind(MessageKind::CannotMaskIdentifier);
            assert_eq!(errors.len(), 1, "{source}: {:?}", handler.get_diagnostics());
        }
    }

    #[test]
    fn classifying_a_function_reports_nothing() {
        let (root, handler) = program("function f(Object) { var f; }");
        let top = Scope::from_program(&root, handler.clone());
        assert!(top.is_declared_function("f"));
        assert!(handler.is_empty(), "{:?}", handler.get_diagnostics());
    }

    #[test]
    fn free_this_and_arguments_stop_at_functions() {
        let (root, handler) = program("this.a; function f() { return arguments; }");
        let top = Scope::from_program(&root, handler.clone());
        assert!(top.has_free_this());
        assert!(!top.has_free_arguments());
        let inner = Scope::from_function(&top, &first_function(&root));
        assert!(inner.has_free_arguments());
        assert!(!inner.has_free_this());
    }

    #[test]
    fn outer_means_no_function_in_between() {
        let (root, handler) = program("var a; function f(p) { var b; }");
        let top = Scope::from_program(&root, handler.clone());
        let inner = Scope::from_function(&top, &first_function(&root));
        let block = Scope::from_block(&inner, &Node::block(Vec::new(), Span::dummy()));
        assert!(block.is_outer("a"));
        assert!(!block.is_outer("b"));
        assert!(!block.is_outer("p"));
        assert!(block.is_outer("nowhere"));
        let top_block = Scope::from_block(&top, &Node::block(Vec::new(), Span::dummy()));
        assert!(top_block.is_outer("a"));
    }

    #[test]
    fn temporaries_go_to_the_nearest_function() {
        let (root, handler) = program("function f() { }");
        let top = Scope::from_program(&root, handler.clone());
        let inner = Scope::from_function(&top, &first_function(&root));
        let block = Scope::from_block(&inner, &Node::block(Vec::new(), Span::dummy()));

        let t0 = block.declare_start_of_scope_temp();
        let t1 = block.declare_start_of_scope_temp();
        assert_eq!(t0.identifier_name(), Some("x0___"));
        assert_eq!(t1.identifier_name(), Some("x1___"));
        assert!(t0.is_synthetic());
        assert!(block.start_statements().is_empty());
        assert!(top.start_statements().is_empty());

        let start = inner.start_statements();
        assert_eq!(start.len(), 1);
        assert_eq!(render(&start[0]), "var x0___, x1___;");
        assert!(inner.is_data("x0___"));
    }

    #[test]
    fn directive_prologue_stays_first() {
        let (root, handler) = program("'use strict'; f();");
        let top = Scope::from_program(&root, handler);
        top.declare_start_of_scope_temp();
        let body = root.children()[0].children().to_vec();
        let spliced = top.splice_start_statements(body);
        let kinds: Vec<_> = spliced.iter().map(Node::kind).collect();
        assert_eq!(
            kinds,
            vec![NodeKind::DirectivePrologue, NodeKind::Declaration, NodeKind::ExpressionStmt]
        );
    }

    #[test]
    fn free_variable_of_nested_function_reaches_the_root() {
        let (root, handler) = program("function f(x) { var y = x; return y + z; }");
        let top = Scope::from_program(&root, handler.clone());
        let inner = Scope::from_function(&top, &first_function(&root));
        assert!(inner.is_data("x"));
        assert!(inner.is_data("y"));
        assert_eq!(top.imported_variables(), vec!["z".to_string()]);
        assert!(inner.is_imported("z"));
        assert!(handler.is_empty());
    }
}
