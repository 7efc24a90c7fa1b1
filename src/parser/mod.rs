//! Tree-sitter backed parser for TypeScript and JavaScript.
//!
//! Parses source text and lowers the concrete tree into the normalized
//! [`AstNode`] shape. Syntax errors are fatal: no partial tree is returned.

pub mod ast;
pub mod queries;

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use parking_lot::Mutex;
use tree_sitter::{
    Language as TsLanguage, Node as TsNode, Parser as TsParser, Point, TreeCursor as TsCursor,
};

use crate::core::{Error, Language, Result, SourceUnit};

pub use ast::{
    for_each_node, visit, AstNode, Loc, NodeKind, Position, Range, Slot, SlotValue,
    VisitControl, Visitor, CHILDREN,
};

/// Deepest syntax nesting lowered before the file is rejected.
///
/// Lowering itself is iterative, but the analyzers walk the tree
/// recursively; the CLI runs them on threads with an 8 MiB stack.
pub const MAX_DEPTH: usize = 4096;

/// Thread-safe parser pool.
///
/// Parsers are checked out per call, so parallel callers never wait on
/// each other while parsing.
pub struct Parser {
    idle: Mutex<HashMap<Language, Vec<TsParser>>>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Create a new parser.
    pub fn new() -> Self {
        Self {
            idle: Mutex::new(HashMap::new()),
        }
    }

    /// Parse source text, detecting the dialect from `path`.
    pub fn parse(&self, source: &str, path: &Path) -> Result<AstNode> {
        let language = Language::detect(path).ok_or_else(|| Error::UnsupportedLanguage {
            path: path.to_path_buf(),
        })?;
        self.parse_as(source, language, path, None)
    }

    /// Parse a loaded source unit.
    pub fn parse_unit(&self, unit: &SourceUnit, timeout: Option<Duration>) -> Result<AstNode> {
        self.parse_as(&unit.content, unit.language, &unit.path, timeout)
    }

    /// Parse with an explicit dialect and optional parse-time budget.
    pub fn parse_as(
        &self,
        source: &str,
        language: Language,
        path: &Path,
        timeout: Option<Duration>,
    ) -> Result<AstNode> {
        let mut parser = self.checkout(language, path)?;
        let micros = timeout.map_or(0, |t| (t.as_micros() as u64).max(1));
        #[allow(deprecated)]
        parser.set_timeout_micros(micros);

        let tree = parser.parse(source, None);
        if tree.is_none() {
            // A halted parse resumes on the next call unless cleared.
            parser.reset();
        }
        self.idle.lock().entry(language).or_default().push(parser);

        let tree = tree.ok_or_else(|| match timeout {
            Some(t) => Error::Timeout {
                path: path.to_path_buf(),
                elapsed_ms: t.as_millis() as u64,
            },
            None => Error::parse(path, "parser produced no tree", 1, 0),
        })?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(syntax_error(root, source, path));
        }

        lower(root, source.as_bytes(), path)
    }

    fn checkout(&self, language: Language, path: &Path) -> Result<TsParser> {
        if let Some(parser) = self.idle.lock().get_mut(&language).and_then(Vec::pop) {
            return Ok(parser);
        }
        let mut parser = TsParser::new();
        parser
            .set_language(&tree_sitter_language(language))
            .map_err(|e| Error::parse(path, format!("grammar unavailable: {e}"), 1, 0))?;
        Ok(parser)
    }
}

/// Parse once with a throwaway parser.
pub fn parse(source: &str, path: &Path) -> Result<AstNode> {
    Parser::new().parse(source, path)
}

/// Get tree-sitter language for a Language enum value.
pub fn tree_sitter_language(lang: Language) -> TsLanguage {
    let ts_lang = match lang {
        Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT,
        Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX,
        Language::JavaScript | Language::Jsx => tree_sitter_javascript::LANGUAGE,
    };
    ts_lang.into()
}

/// Converts tree-sitter byte columns to character columns.
///
/// Only lines holding non-ASCII text need a scan.
struct LineIndex<'s> {
    source: &'s [u8],
    ascii: Vec<bool>,
}

impl<'s> LineIndex<'s> {
    fn new(source: &'s [u8]) -> Self {
        Self {
            source,
            ascii: source.split(|b| *b == b'\n').map(<[u8]>::is_ascii).collect(),
        }
    }

    /// 1-based line and 0-based character column of `point` at `byte`.
    fn position(&self, point: Point, byte: usize) -> Position {
        let column = if self.ascii.get(point.row).copied().unwrap_or(true) {
            point.column
        } else {
            self.source
                .get(byte.saturating_sub(point.column)..byte)
                .and_then(|prefix| std::str::from_utf8(prefix).ok())
                .map_or(point.column, |prefix| prefix.chars().count())
        };
        Position {
            line: point.row + 1,
            column,
        }
    }
}

/// Build a parse error from the first ERROR or MISSING node.
fn syntax_error(root: TsNode<'_>, source: &str, path: &Path) -> Error {
    let lines = LineIndex::new(source.as_bytes());
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            let at = lines.position(node.start_position(), node.start_byte());
            let message = if node.is_missing() {
                format!("missing `{}`", node.kind())
            } else {
                let snippet: String = source
                    .get(node.start_byte()..node.end_byte())
                    .unwrap_or("")
                    .chars()
                    .take(24)
                    .collect();
                format!("unexpected syntax near `{}`", snippet.trim())
            };
            return Error::parse(path, message, at.line, at.column);
        }

        // Only descend into subtrees that contain the error.
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return Error::parse(path, "syntax error", 1, 0);
            }
        }
    }
}

fn keeps_text(kind: NodeKind, node: TsNode<'_>) -> bool {
    node.named_child_count() == 0
        || matches!(
            kind,
            NodeKind::String | NodeKind::TemplateString | NodeKind::Regex
        )
}

struct Frame<'t> {
    node: TsNode<'t>,
    cursor: TsCursor<'t>,
    lowered: AstNode,
    field: &'static str,
    entered: bool,
}

impl<'t> Frame<'t> {
    fn new(node: TsNode<'t>, field: &'static str, lines: &LineIndex<'_>) -> Self {
        let lowered = AstNode::new(
            NodeKind::from_grammar(node.kind()),
            Range {
                start: node.start_byte(),
                end: node.end_byte(),
            },
            Loc {
                start: lines.position(node.start_position(), node.start_byte()),
                end: lines.position(node.end_position(), node.end_byte()),
            },
        );
        Self {
            node,
            cursor: node.walk(),
            lowered,
            field,
            entered: false,
        }
    }

    /// Move to the next child, or `false` once the node is exhausted.
    fn advance(&mut self) -> bool {
        if self.entered {
            self.cursor.goto_next_sibling()
        } else {
            self.entered = true;
            self.cursor.goto_first_child()
        }
    }

    fn finish(mut self, source: &[u8]) -> (&'static str, AstNode) {
        if keeps_text(self.lowered.kind, self.node) {
            let text = self.node.utf8_text(source).unwrap_or("");
            self.lowered.push_scalar("text", text);
        }
        (self.field, self.lowered)
    }
}

/// Lower a tree-sitter tree into the normalized tree with an explicit
/// work stack.
fn lower(root: TsNode<'_>, source: &[u8], path: &Path) -> Result<AstNode> {
    let lines = LineIndex::new(source);
    let mut stack = vec![Frame::new(root, CHILDREN, &lines)];

    while let Some(frame) = stack.last_mut() {
        if frame.advance() {
            let child = frame.cursor.node();
            let field = frame.cursor.field_name();
            if child.is_extra() {
                // comments
            } else if child.is_named() {
                if stack.len() > MAX_DEPTH {
                    let at = lines.position(child.start_position(), child.start_byte());
                    return Err(Error::parse(
                        path,
                        format!("nesting deeper than {MAX_DEPTH} levels"),
                        at.line,
                        at.column,
                    ));
                }
                stack.push(Frame::new(child, field.unwrap_or(CHILDREN), &lines));
            } else if let Some(field) = field {
                frame.lowered.push_scalar(field, child.kind());
            }
            continue;
        }

        let Some(done) = stack.pop() else { break };
        let (field, node) = done.finish(source);
        match stack.last_mut() {
            Some(parent) => parent.lowered.push_child(field, node),
            None => return Ok(node),
        }
    }

    Err(Error::parse(path, "parser produced no tree", 1, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ts(source: &str) -> Result<AstNode> {
        parse(source, Path::new("test.ts"))
    }

    #[test]
    fn test_parse_simple_function() {
        let root = parse_ts("function add(a: number, b: number) { return a + b; }").unwrap();
        assert_eq!(root.kind, NodeKind::Program);
        let func = root.children().next().unwrap();
        assert_eq!(func.kind, NodeKind::FunctionDeclaration);
        assert_eq!(func.child("name").and_then(AstNode::text), Some("add"));
        assert!(func.child("body").is_some());
    }

    #[test]
    fn test_operator_tokens_are_scalars() {
        let root = parse_ts("const x = a && b;").unwrap();
        let mut ops = Vec::new();
        for_each_node(&root, |node, _| {
            if node.kind == NodeKind::BinaryExpression {
                ops.push(node.operator().unwrap_or("").to_string());
            }
        });
        assert_eq!(ops, vec!["&&"]);
    }

    #[test]
    fn test_comments_are_dropped() {
        let root = parse_ts("// hello\nconst a = 1; /* tail */").unwrap();
        let mut kinds = Vec::new();
        for_each_node(&root, |node, _| kinds.push(node.kind.as_str()));
        assert!(!kinds.contains(&"comment"));
    }

    #[test]
    fn test_location_is_one_based_line() {
        let root = parse_ts("\n\nlet x = 1;").unwrap();
        let decl = root.children().next().unwrap();
        assert_eq!(decl.loc.start.line, 3);
        assert_eq!(decl.loc.start.column, 0);
    }

    #[test]
    fn test_columns_count_characters() {
        let root = parse_ts("const s = 'héllo'; let n = 1;").unwrap();
        let decls: Vec<&AstNode> = root.children().collect();
        assert_eq!(decls[1].loc.start.column, 19);
        assert_eq!(decls[1].range.start, 20);
    }

    #[test]
    fn test_child_ranges_nest_within_parent() {
        let root = parse_ts("class A { m() { if (x) { return 1; } } }").unwrap();
        fn check(node: &AstNode) {
            for child in node.children() {
                assert!(node.range.contains(&child.range), "{} escapes {}", child.kind, node.kind);
                check(child);
            }
        }
        check(&root);
    }

    #[test]
    fn test_syntax_error_reports_position() {
        let err = parse_ts("function broken( {\n  return 1;\n").unwrap_err();
        match err {
            Error::Parse { path, line, .. } => {
                assert_eq!(path, Path::new("test.ts"));
                assert!(line >= 1);
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_extension() {
        let err = parse("x", Path::new("main.rs")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedLanguage { .. }));
    }

    #[test]
    fn test_tsx_and_jsx() {
        let parser = Parser::new();
        assert!(parser
            .parse("const el = <div className=\"a\">{x}</div>;", Path::new("a.tsx"))
            .is_ok());
        assert!(parser
            .parse("const el = <span>{y}</span>;", Path::new("a.jsx"))
            .is_ok());
    }

    #[test]
    fn test_javascript_rejects_type_annotations() {
        let parser = Parser::new();
        assert!(parser.parse("let a: number = 1;", Path::new("a.js")).is_err());
        assert!(parser.parse("let a: number = 1;", Path::new("a.ts")).is_ok());
    }

    #[test]
    fn test_parser_pool_reuse() {
        let parser = Parser::new();
        for _ in 0..3 {
            parser.parse("let a = 1;", Path::new("a.ts")).unwrap();
        }
        assert_eq!(parser.idle.lock().get(&Language::TypeScript).map(Vec::len), Some(1));
    }

    #[test]
    fn test_parser_recovers_after_timeout() {
        let parser = Parser::new();
        let big: String = (0..20_000)
            .map(|i| format!("function f{i}(a: number) {{ return a + {i}; }}\n"))
            .collect();
        let err = parser
            .parse_as(
                &big,
                Language::TypeScript,
                Path::new("big.ts"),
                Some(Duration::from_micros(1)),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }), "{err:?}");

        let root = parser
            .parse_as("let a = 1;", Language::TypeScript, Path::new("small.ts"), None)
            .unwrap();
        let decl = root.children().next().unwrap();
        assert_eq!(decl.kind, NodeKind::LexicalDeclaration);
        assert_eq!(decl.range.end, 10);
    }

    #[test]
    fn test_long_left_nested_expression() {
        let terms = vec!["a"; 1500].join(" + ");
        let root = parse_ts(&format!("const total = {terms};")).unwrap();
        let mut binaries = 0;
        for_each_node(&root, |node, _| {
            if node.kind == NodeKind::BinaryExpression {
                binaries += 1;
            }
        });
        assert_eq!(binaries, 1499);
    }

    #[test]
    fn test_excessive_nesting_is_rejected() {
        let source = format!("const x = {}1{};", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        let err = parse_ts(&source).unwrap_err();
        assert!(err.to_string().contains("nesting deeper"), "{err}");
    }

    #[test]
    fn test_string_literal_keeps_text() {
        let root = parse_ts("import x from \"./dep\";").unwrap();
        let import = root.children().next().unwrap();
        let source = import.child("source").unwrap();
        assert_eq!(source.kind, NodeKind::String);
        assert_eq!(source.text(), Some("\"./dep\""));
    }
}
