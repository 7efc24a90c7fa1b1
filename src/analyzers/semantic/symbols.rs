//! Symbol table and def/use collection in a single traversal.
//!
//! Scopes are dotted paths rooted at `global`; every function and class
//! opens a new scope named after it. References are resolved after the
//! walk, innermost scope first, so calls to hoisted functions resolve.

use std::collections::{BTreeMap, HashMap, HashSet};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::parser::queries::{callee_name, class_name, function_name};
use crate::parser::{for_each_node, visit, AstNode, NodeKind, VisitControl, Visitor};

pub const GLOBAL_SCOPE: &str = "global";

/// What introduced a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Variable,
    Function,
    Class,
    Enum,
    Namespace,
    Parameter,
    Import,
}

impl SymbolKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Variable => "Variable",
            Self::Function => "Function",
            Self::Class => "Class",
            Self::Enum => "Enum",
            Self::Namespace => "Namespace",
            Self::Parameter => "Parameter",
            Self::Import => "Import",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub name: String,
    pub kind: SymbolKind,
    /// Inferred value type for variables, otherwise the declaration kind.
    #[serde(rename = "type")]
    pub symbol_type: String,
    pub scope: String,
    pub usage_count: usize,
    pub defined: bool,
    pub exported: bool,
    pub line: usize,
    pub column: usize,
}

/// Symbols in declaration order, indexed by `(scope, name)`.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<SymbolInfo>,
    index: HashMap<(String, String), usize>,
}

impl SymbolTable {
    /// Register a symbol; a redeclaration in the same scope keeps the first.
    pub fn declare(&mut self, symbol: SymbolInfo) {
        let key = (symbol.scope.clone(), symbol.name.clone());
        if self.index.contains_key(&key) {
            return;
        }
        self.index.insert(key, self.symbols.len());
        self.symbols.push(symbol);
    }

    /// Find `name` visible from `scope`, innermost first.
    pub fn resolve(&self, scope: &str, name: &str) -> Option<usize> {
        let mut current = scope;
        loop {
            if let Some(&idx) = self.index.get(&(current.to_string(), name.to_string())) {
                return Some(idx);
            }
            current = &current[..current.rfind('.')?];
        }
    }

    pub fn get(&self, idx: usize) -> Option<&SymbolInfo> {
        self.symbols.get(idx)
    }

    fn get_mut(&mut self, idx: usize) -> Option<&mut SymbolInfo> {
        self.symbols.get_mut(idx)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SymbolInfo> {
        self.symbols.iter()
    }

    pub fn into_vec(self) -> Vec<SymbolInfo> {
        self.symbols
    }
}

/// An identifier read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub scope: String,
    pub line: usize,
    pub column: usize,
    pub resolved: bool,
    /// Named in a type position; counts as a use but may name an
    /// ambient or global type.
    pub type_only: bool,
}

/// Everything gathered by the traversal.
#[derive(Debug, Default)]
pub struct Collected {
    pub table: SymbolTable,
    pub references: Vec<Reference>,
    /// Definition lines per name: declarators, loop bindings, assignments.
    pub definitions: BTreeMap<String, Vec<usize>>,
    /// Use lines per name.
    pub uses: BTreeMap<String, Vec<usize>>,
}

/// Build the symbol table and def/use maps for `root`.
pub fn collect(root: &AstNode) -> Collected {
    let mut collector = Collector {
        scopes: vec![GLOBAL_SCOPE.to_string()],
        declaring: HashSet::new(),
        out: Collected::default(),
        exports: Vec::new(),
    };
    visit(root, &mut collector);

    let Collector {
        mut out, exports, ..
    } = collector;

    for (scope, name) in exports {
        if let Some(idx) = out.table.resolve(&scope, &name) {
            if let Some(symbol) = out.table.get_mut(idx) {
                symbol.exported = true;
            }
        }
    }

    for reference in &mut out.references {
        if let Some(idx) = out.table.resolve(&reference.scope, &reference.name) {
            if let Some(symbol) = out.table.get_mut(idx) {
                symbol.usage_count += 1;
            }
            reference.resolved = true;
        }
    }

    out
}

struct Collector {
    scopes: Vec<String>,
    /// Start offsets of identifiers in declaring position.
    declaring: HashSet<usize>,
    out: Collected,
    exports: Vec<(String, String)>,
}

impl Collector {
    fn scope(&self) -> &str {
        self.scopes.last().map_or(GLOBAL_SCOPE, String::as_str)
    }

    fn push_scope(&mut self, segment: &str, node: &AstNode) {
        let segment = if segment == "anonymous" {
            format!("anonymous@{}", node.start_line())
        } else {
            segment.to_string()
        };
        let scope = format!("{}.{}", self.scope(), segment);
        self.scopes.push(scope);
    }

    fn declare(&mut self, ident: &AstNode, kind: SymbolKind, symbol_type: &str) {
        let Some(name) = ident.text() else {
            return;
        };
        self.declaring.insert(ident.range.start);
        let symbol = SymbolInfo {
            name: name.to_string(),
            kind,
            symbol_type: symbol_type.to_string(),
            scope: self.scope().to_string(),
            usage_count: 0,
            defined: true,
            exported: false,
            line: ident.loc.start.line,
            column: ident.loc.start.column,
        };
        self.out.table.declare(symbol);
    }

    fn define(&mut self, ident: &AstNode) {
        if let Some(name) = ident.text() {
            self.out
                .definitions
                .entry(name.to_string())
                .or_default()
                .push(ident.loc.start.line);
        }
    }

    fn declare_parameters(&mut self, func: &AstNode) {
        let params: Vec<&AstNode> = match func.child("parameters") {
            Some(list) => list.children().collect(),
            None => func.child("parameter").into_iter().collect(),
        };
        for param in params {
            for ident in binding_names(param) {
                self.declare(ident, SymbolKind::Parameter, "parameter");
            }
        }
    }

    fn mark_exported(&mut self, export: &AstNode) {
        let scope = self.scope().to_string();
        let mut names = Vec::new();

        if let Some(decl) = export.child("declaration") {
            match decl.kind {
                NodeKind::LexicalDeclaration | NodeKind::VariableDeclaration => {
                    for declarator in decl.children() {
                        if let Some(pattern) = declarator.child("name") {
                            names.extend(
                                binding_names(pattern).into_iter().filter_map(AstNode::text),
                            );
                        }
                    }
                }
                _ => names.extend(decl.child("name").and_then(AstNode::text)),
            }
        }
        if let Some(value) = export.child("value").filter(|v| v.kind == NodeKind::Identifier) {
            names.extend(value.text());
        }
        for clause in export.children().filter(|c| c.kind == NodeKind::ExportClause) {
            for specifier in clause.children() {
                names.extend(specifier.child("name").and_then(AstNode::text));
            }
        }

        self.exports
            .extend(names.into_iter().map(|n| (scope.clone(), n.to_string())));
    }

    fn reference(&mut self, node: &AstNode, type_only: bool) {
        let Some(name) = node.text() else {
            return;
        };
        if !type_only {
            self.out
                .uses
                .entry(name.to_string())
                .or_default()
                .push(node.loc.start.line);
        }
        self.out.references.push(Reference {
            name: name.to_string(),
            scope: self.scope().to_string(),
            line: node.loc.start.line,
            column: node.loc.start.column,
            resolved: false,
            type_only,
        });
    }

    /// `namespace A.B { }` declares `A`; the inner segments only name
    /// nested scopes.
    fn declare_namespace(&mut self, module: &AstNode) {
        let Some(name) = module.child("name") else {
            return;
        };
        let mut segments = Vec::new();
        for_each_node(name, |node, _| {
            if matches!(node.kind, NodeKind::Identifier | NodeKind::PropertyIdentifier) {
                segments.push(node);
            }
        });
        if let Some((first, rest)) = segments.split_first() {
            self.declare(first, SymbolKind::Namespace, "namespace");
            for segment in rest {
                self.declaring.insert(segment.range.start);
            }
        }
        let label: Vec<&str> = segments.iter().filter_map(|s| s.text()).collect();
        let label = if label.is_empty() {
            "module".to_string()
        } else {
            label.join(".")
        };
        self.push_scope(&label, module);
    }

    fn declare_imports(&mut self, import: &AstNode) {
        let mut bindings = Vec::new();
        for_each_node(import, |node, parent| {
            if node.kind != NodeKind::Identifier {
                return;
            }
            let aliased_away = parent.is_some_and(|p| {
                p.kind == NodeKind::ImportSpecifier
                    && p.child("alias").is_some_and(|alias| alias.range != node.range)
            });
            if !aliased_away {
                bindings.push(node);
            }
        });
        for ident in bindings {
            self.declare(ident, SymbolKind::Import, "import");
        }
    }
}

impl<'a> Visitor<'a> for Collector {
    fn enter(&mut self, node: &'a AstNode, parent: Option<&'a AstNode>) -> VisitControl {
        match node.kind {
            kind if kind.is_function_like() => {
                let declared = matches!(
                    kind,
                    NodeKind::FunctionDeclaration | NodeKind::GeneratorFunctionDeclaration
                );
                let own_name = node.child("name").filter(|n| n.kind == NodeKind::Identifier);
                if declared {
                    if let Some(name) = own_name {
                        self.declare(name, SymbolKind::Function, "function");
                    }
                }
                self.push_scope(function_name(node, parent), node);
                if !declared {
                    if let Some(name) = own_name {
                        self.declare(name, SymbolKind::Function, "function");
                    }
                }
                self.declare_parameters(node);
            }
            kind if kind.is_class_like() => {
                if let Some(name) = node.child("name") {
                    if kind == NodeKind::Class {
                        self.declaring.insert(name.range.start);
                    } else {
                        self.declare(name, SymbolKind::Class, "class");
                    }
                }
                self.push_scope(class_name(node), node);
            }
            NodeKind::VariableDeclarator => {
                let symbol_type = infer_type(node.child("value"));
                if let Some(pattern) = node.child("name") {
                    for ident in binding_names(pattern) {
                        self.declare(ident, SymbolKind::Variable, &symbol_type);
                        self.define(ident);
                    }
                }
            }
            NodeKind::ForInStatement => {
                if let Some(left) = node.child("left") {
                    if node.scalar("kind").is_some() {
                        for ident in binding_names(left) {
                            self.declare(ident, SymbolKind::Variable, "unknown");
                            self.define(ident);
                        }
                    } else if left.kind == NodeKind::Identifier {
                        self.declaring.insert(left.range.start);
                        self.define(left);
                    }
                }
            }
            NodeKind::CatchClause => {
                if let Some(param) = node.child("parameter") {
                    for ident in binding_names(param) {
                        self.declare(ident, SymbolKind::Parameter, "parameter");
                    }
                }
            }
            NodeKind::EnumDeclaration => {
                if let Some(name) = node.child("name") {
                    self.declare(name, SymbolKind::Enum, "enum");
                }
            }
            NodeKind::InternalModule => self.declare_namespace(node),
            NodeKind::FunctionSignature => {
                // Overloads and ambient declarations; the first one wins.
                if let Some(name) = node.child("name") {
                    self.declare(name, SymbolKind::Function, "function");
                }
            }
            NodeKind::InterfaceDeclaration
            | NodeKind::TypeAliasDeclaration
            | NodeKind::TypeParameter => {
                if let Some(name) = node.child("name") {
                    self.declaring.insert(name.range.start);
                }
            }
            NodeKind::ImportStatement => {
                self.declare_imports(node);
                return VisitControl::SkipChildren;
            }
            NodeKind::ExportStatement => {
                if node.child("source").is_some() {
                    return VisitControl::SkipChildren;
                }
                self.mark_exported(node);
            }
            NodeKind::FormalParameters => {
                // Signatures in types and interfaces bind names too.
                for param in node.children() {
                    for ident in binding_names(param) {
                        self.declaring.insert(ident.range.start);
                    }
                }
            }
            NodeKind::Other("index_signature") => {
                if let Some(name) = node.child("name") {
                    self.declaring.insert(name.range.start);
                }
            }
            NodeKind::AssignmentExpression => {
                if let Some(left) = node.child("left") {
                    if left.kind == NodeKind::Identifier {
                        self.declaring.insert(left.range.start);
                        self.define(left);
                    } else if is_commonjs_export(left) {
                        if let Some(value) =
                            node.child("right").filter(|r| r.kind == NodeKind::Identifier)
                        {
                            let scope = self.scope().to_string();
                            self.exports.extend(value.text().map(|n| (scope, n.to_string())));
                        }
                    }
                }
            }
            NodeKind::AugmentedAssignmentExpression => {
                if let Some(left) = node.child("left").filter(|l| l.kind == NodeKind::Identifier) {
                    self.define(left);
                }
            }
            NodeKind::Identifier | NodeKind::ShorthandPropertyIdentifier => {
                if !self.declaring.contains(&node.range.start) && !is_jsx_tag(node, parent) {
                    self.reference(node, false);
                }
            }
            NodeKind::TypeIdentifier => {
                if !self.declaring.contains(&node.range.start) {
                    self.reference(node, true);
                }
            }
            _ => {}
        }
        VisitControl::Continue
    }

    fn exit(&mut self, node: &'a AstNode, _parent: Option<&'a AstNode>) {
        if node.is_function_like()
            || node.is_class_like()
            || node.kind == NodeKind::InternalModule
        {
            self.scopes.pop();
        }
    }
}

/// Identifiers bound by a declaration or parameter pattern.
pub fn binding_names(pattern: &AstNode) -> Vec<&AstNode> {
    let mut names = Vec::new();
    collect_bindings(pattern, &mut names);
    names
}

fn collect_bindings<'a>(node: &'a AstNode, out: &mut Vec<&'a AstNode>) {
    match node.kind {
        NodeKind::Identifier | NodeKind::ShorthandPropertyIdentifierPattern => out.push(node),
        NodeKind::RequiredParameter | NodeKind::OptionalParameter => {
            if let Some(pattern) = node.child("pattern") {
                collect_bindings(pattern, out);
            }
        }
        NodeKind::AssignmentPattern | NodeKind::ObjectAssignmentPattern => {
            if let Some(left) = node.child("left") {
                collect_bindings(left, out);
            }
        }
        NodeKind::PairPattern => {
            if let Some(value) = node.child("value") {
                collect_bindings(value, out);
            }
        }
        NodeKind::RestPattern | NodeKind::ObjectPattern | NodeKind::ArrayPattern => {
            for child in node.children() {
                collect_bindings(child, out);
            }
        }
        _ => {}
    }
}

fn infer_type(value: Option<&AstNode>) -> String {
    let Some(value) = value else {
        return "unknown".to_string();
    };
    let inferred = match value.kind {
        NodeKind::String | NodeKind::TemplateString => "string",
        NodeKind::Number => "number",
        NodeKind::True | NodeKind::False => "boolean",
        NodeKind::Array => "array",
        NodeKind::Object => "object",
        NodeKind::Regex => "regexp",
        NodeKind::Null => "null",
        kind if kind.is_function_like() => "function",
        kind if kind.is_class_like() => "class",
        NodeKind::NewExpression => {
            return value
                .child("constructor")
                .filter(|c| c.kind == NodeKind::Identifier)
                .and_then(AstNode::text)
                .unwrap_or("object")
                .to_string();
        }
        NodeKind::CallExpression if callee_name(value) == Some("require") => "module",
        NodeKind::AwaitExpression => "promise_result",
        _ => "unknown",
    };
    inferred.to_string()
}

/// `module.exports` or `exports.x` on the left of an assignment.
pub fn is_commonjs_export(left: &AstNode) -> bool {
    if left.kind != NodeKind::MemberExpression {
        return false;
    }
    let Some(object) = left.child("object") else {
        return false;
    };
    let property = left.child("property").and_then(AstNode::text);
    match object.kind {
        NodeKind::Identifier => match object.text() {
            Some("module") => property == Some("exports"),
            Some("exports") => true,
            _ => false,
        },
        NodeKind::MemberExpression => is_commonjs_export(object),
        _ => false,
    }
}

/// Tag names of intrinsic JSX elements and every closing tag.
fn is_jsx_tag(node: &AstNode, parent: Option<&AstNode>) -> bool {
    match parent.map(|p| p.kind) {
        Some(NodeKind::JsxClosingElement) => true,
        Some(NodeKind::JsxOpeningElement | NodeKind::JsxSelfClosingElement) => node
            .text()
            .and_then(|t| t.chars().next())
            .is_some_and(|c| c.is_ascii_lowercase()),
        _ => false,
    }
}

static BUILTINS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // language
        "arguments", "globalThis", "undefined", "NaN", "Infinity", "eval", "isFinite",
        "isNaN", "parseFloat", "parseInt", "decodeURI", "decodeURIComponent", "encodeURI",
        "encodeURIComponent", "escape", "unescape",
        // constructors and namespaces
        "Object", "Function", "Array", "String", "Number", "Boolean", "Symbol", "BigInt",
        "Date", "RegExp", "Error", "TypeError", "RangeError", "SyntaxError",
        "ReferenceError", "EvalError", "URIError", "AggregateError", "Promise", "Proxy",
        "Reflect", "Map", "Set", "WeakMap", "WeakSet", "WeakRef", "FinalizationRegistry",
        "ArrayBuffer", "SharedArrayBuffer", "DataView", "Int8Array", "Uint8Array",
        "Uint8ClampedArray", "Int16Array", "Uint16Array", "Int32Array", "Uint32Array",
        "Float32Array", "Float64Array", "BigInt64Array", "BigUint64Array", "Math", "JSON",
        "Atomics", "Intl", "WebAssembly",
        // timers and scheduling
        "setTimeout", "setInterval", "clearTimeout", "clearInterval", "setImmediate",
        "clearImmediate", "queueMicrotask", "requestAnimationFrame",
        "cancelAnimationFrame", "structuredClone",
        // browser
        "window", "document", "navigator", "location", "history", "localStorage",
        "sessionStorage", "console", "fetch", "alert", "confirm", "prompt", "self",
        "performance", "crypto", "URL", "URLSearchParams", "Headers", "Request",
        "Response", "FormData", "Blob", "File", "FileReader", "AbortController",
        "AbortSignal", "Event", "CustomEvent", "EventTarget", "HTMLElement", "Element",
        "Node", "MutationObserver", "IntersectionObserver", "ResizeObserver", "WebSocket",
        "Worker", "XMLHttpRequest", "TextEncoder", "TextDecoder", "atob", "btoa",
        // node and module systems
        "process", "global", "Buffer", "require", "module", "exports", "__dirname",
        "__filename",
    ]
    .into_iter()
    .collect()
});

/// Globals every script can reference without declaring.
pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use std::path::Path;

    fn collect_ts(source: &str) -> Collected {
        let root = parse(source, Path::new("s.ts")).unwrap();
        collect(&root)
    }

    fn symbol<'a>(c: &'a Collected, name: &str) -> &'a SymbolInfo {
        c.table.iter().find(|s| s.name == name).unwrap()
    }

    #[test]
    fn test_scopes_and_usage() {
        let c = collect_ts("function outer(a) {\n  const b = a + 1;\n  return b;\n}\nouter(1);");
        let outer = symbol(&c, "outer");
        assert_eq!(outer.scope, "global");
        assert_eq!(outer.usage_count, 1);
        let a = symbol(&c, "a");
        assert_eq!(a.kind, SymbolKind::Parameter);
        assert_eq!(a.scope, "global.outer");
        assert_eq!(a.usage_count, 1);
        let b = symbol(&c, "b");
        assert_eq!(b.symbol_type, "unknown");
        assert_eq!(b.usage_count, 1);
    }

    #[test]
    fn test_hoisted_call_resolves() {
        let c = collect_ts("run();\nfunction run() {}");
        assert_eq!(symbol(&c, "run").usage_count, 1);
        assert!(c.references.iter().all(|r| r.resolved));
    }

    #[test]
    fn test_declarations_are_not_usages() {
        let c = collect_ts("let x = 1;\nx = 2;");
        assert_eq!(symbol(&c, "x").usage_count, 0);
        assert_eq!(c.definitions.get("x"), Some(&vec![1, 2]));
    }

    #[test]
    fn test_destructuring_and_imports() {
        let c = collect_ts(
            "import def, { a as b, c } from './m';\nimport * as ns from 'ns';\nconst { d, e: f, ...g } = def;\nconst [h, i = b] = c;",
        );
        let names: Vec<_> = c.table.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["def", "b", "c", "ns", "d", "f", "g", "h", "i"]);
        assert_eq!(symbol(&c, "b").kind, SymbolKind::Import);
        assert_eq!(symbol(&c, "b").usage_count, 1);
    }

    #[test]
    fn test_exports() {
        let c = collect_ts(
            "export const a = 1;\nexport function b() {}\nconst c = 2;\nexport { c };\nconst d = 3;\nexport default d;",
        );
        for name in ["a", "b", "c", "d"] {
            assert!(symbol(&c, name).exported, "{name} should be exported");
        }
    }

    #[test]
    fn test_commonjs_export() {
        let root = parse("function f() {}\nmodule.exports = f;", Path::new("c.js")).unwrap();
        let c = collect(&root);
        assert!(symbol(&c, "f").exported);
    }

    #[test]
    fn test_type_inference() {
        let c = collect_ts(
            "const s = 'x';\nconst n = 1;\nconst o = {};\nconst fn = () => 1;\nconst m = new Map();\nconst r = require('r');",
        );
        assert_eq!(symbol(&c, "s").symbol_type, "string");
        assert_eq!(symbol(&c, "n").symbol_type, "number");
        assert_eq!(symbol(&c, "o").symbol_type, "object");
        assert_eq!(symbol(&c, "fn").symbol_type, "function");
        assert_eq!(symbol(&c, "m").symbol_type, "Map");
        assert_eq!(symbol(&c, "r").symbol_type, "module");
    }

    #[test]
    fn test_interface_signatures_are_not_references() {
        let c = collect_ts("interface Api { get(id: string): void; [key: string]: unknown }");
        assert!(c.references.is_empty());
    }

    #[test]
    fn test_type_references_count_as_usage() {
        let c = collect_ts(
            "import { Foo } from './foo';\nclass Local {}\ntype Pair<T> = [T, Local];\nlet x: Foo;",
        );
        assert_eq!(symbol(&c, "Foo").usage_count, 1);
        assert_eq!(symbol(&c, "Local").usage_count, 1);
        assert!(c.references.iter().all(|r| r.type_only));
        assert!(!c.references.iter().any(|r| r.name == "Pair"));
        assert!(!c.uses.contains_key("Foo"));
    }

    #[test]
    fn test_nested_namespace_scopes() {
        let c = collect_ts("namespace A.B {\n  const inner = 1;\n}");
        assert_eq!(symbol(&c, "A").kind, SymbolKind::Namespace);
        assert!(c.table.iter().all(|s| s.name != "B"));
        assert_eq!(symbol(&c, "inner").scope, "global.A.B");
    }

    #[test]
    fn test_builtins() {
        assert!(is_builtin("console"));
        assert!(is_builtin("Promise"));
        assert!(!is_builtin("lodash"));
    }

    #[test]
    fn test_scope_resolution_walks_outward() {
        let mut table = SymbolTable::default();
        table.declare(SymbolInfo {
            name: "x".into(),
            kind: SymbolKind::Variable,
            symbol_type: "number".into(),
            scope: "global".into(),
            usage_count: 0,
            defined: true,
            exported: false,
            line: 1,
            column: 0,
        });
        assert_eq!(table.resolve("global.f.g", "x"), Some(0));
        assert_eq!(table.resolve("global.f", "y"), None);
    }
}
