//! Normalized syntax tree shared by every analyzer.
//!
//! Tree-sitter nodes are lowered into owned [`AstNode`]s: a closed
//! [`NodeKind`], byte range, line/column location and named child slots.
//! Comments and punctuation are dropped; operator tokens survive as
//! `operator` scalars and leaf text survives as a `text` scalar.

macro_rules! node_kinds {
    (@first $first:literal $(| $rest:literal)*) => {
        $first
    };
    ($($variant:ident => $($grammar:literal)|+),* $(,)?) => {
        /// Syntax node kinds the analyzers distinguish.
        ///
        /// Anything else is carried as [`NodeKind::Other`] with the raw
        /// grammar name.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum NodeKind {
            $($variant,)*
            Other(&'static str),
        }

        impl NodeKind {
            /// Map a tree-sitter grammar kind onto the closed set.
            pub fn from_grammar(kind: &'static str) -> Self {
                match kind {
                    $($($grammar)|+ => Self::$variant,)*
                    other => Self::Other(other),
                }
            }

            /// The canonical grammar name.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => node_kinds!(@first $($grammar)|+),)*
                    Self::Other(kind) => *kind,
                }
            }
        }
    };
}

node_kinds! {
    Program => "program",
    // functions
    FunctionDeclaration => "function_declaration",
    GeneratorFunctionDeclaration => "generator_function_declaration",
    FunctionExpression => "function_expression" | "function",
    GeneratorFunction => "generator_function",
    ArrowFunction => "arrow_function",
    MethodDefinition => "method_definition",
    FormalParameters => "formal_parameters",
    RequiredParameter => "required_parameter",
    OptionalParameter => "optional_parameter",
    // classes and declarations
    ClassDeclaration => "class_declaration",
    AbstractClassDeclaration => "abstract_class_declaration",
    Class => "class",
    ClassBody => "class_body",
    FieldDefinition => "public_field_definition" | "field_definition",
    InterfaceDeclaration => "interface_declaration",
    EnumDeclaration => "enum_declaration",
    TypeAliasDeclaration => "type_alias_declaration",
    InternalModule => "internal_module" | "module",
    FunctionSignature => "function_signature",
    VariableDeclaration => "variable_declaration",
    LexicalDeclaration => "lexical_declaration",
    VariableDeclarator => "variable_declarator",
    // statements
    StatementBlock => "statement_block",
    ExpressionStatement => "expression_statement",
    IfStatement => "if_statement",
    ElseClause => "else_clause",
    SwitchStatement => "switch_statement",
    SwitchBody => "switch_body",
    SwitchCase => "switch_case",
    SwitchDefault => "switch_default",
    ForStatement => "for_statement",
    ForInStatement => "for_in_statement",
    WhileStatement => "while_statement",
    DoStatement => "do_statement",
    TryStatement => "try_statement",
    CatchClause => "catch_clause",
    FinallyClause => "finally_clause",
    ReturnStatement => "return_statement",
    ThrowStatement => "throw_statement",
    BreakStatement => "break_statement",
    ContinueStatement => "continue_statement",
    LabeledStatement => "labeled_statement",
    EmptyStatement => "empty_statement",
    // expressions
    TernaryExpression => "ternary_expression",
    BinaryExpression => "binary_expression",
    UnaryExpression => "unary_expression",
    UpdateExpression => "update_expression",
    AssignmentExpression => "assignment_expression",
    AugmentedAssignmentExpression => "augmented_assignment_expression",
    CallExpression => "call_expression",
    NewExpression => "new_expression",
    MemberExpression => "member_expression",
    SubscriptExpression => "subscript_expression",
    AwaitExpression => "await_expression",
    ParenthesizedExpression => "parenthesized_expression",
    SequenceExpression => "sequence_expression",
    Arguments => "arguments",
    Object => "object",
    Pair => "pair",
    Array => "array",
    // patterns
    AssignmentPattern => "assignment_pattern",
    RestPattern => "rest_pattern",
    ObjectPattern => "object_pattern",
    ArrayPattern => "array_pattern",
    PairPattern => "pair_pattern",
    ObjectAssignmentPattern => "object_assignment_pattern",
    // names and literals
    Identifier => "identifier",
    PropertyIdentifier => "property_identifier",
    PrivatePropertyIdentifier => "private_property_identifier",
    ShorthandPropertyIdentifier => "shorthand_property_identifier",
    ShorthandPropertyIdentifierPattern => "shorthand_property_identifier_pattern",
    StatementIdentifier => "statement_identifier",
    TypeIdentifier => "type_identifier",
    This => "this",
    Super => "super",
    String => "string",
    TemplateString => "template_string",
    TemplateSubstitution => "template_substitution",
    Number => "number",
    Regex => "regex",
    True => "true",
    False => "false",
    Null => "null",
    Undefined => "undefined",
    // modules
    ImportStatement => "import_statement",
    ImportClause => "import_clause",
    NamedImports => "named_imports",
    ImportSpecifier => "import_specifier",
    NamespaceImport => "namespace_import",
    Import => "import",
    ExportStatement => "export_statement",
    ExportClause => "export_clause",
    ExportSpecifier => "export_specifier",
    // jsx
    JsxElement => "jsx_element",
    JsxOpeningElement => "jsx_opening_element",
    JsxClosingElement => "jsx_closing_element",
    JsxSelfClosingElement => "jsx_self_closing_element",
    JsxExpression => "jsx_expression",
    JsxAttribute => "jsx_attribute",
    // types
    TypeAnnotation => "type_annotation",
    TypeArguments => "type_arguments",
    TypeParameters => "type_parameters",
    TypeParameter => "type_parameter",
}

impl NodeKind {
    /// Declarations, expressions, arrows and methods.
    pub fn is_function_like(&self) -> bool {
        matches!(
            self,
            Self::FunctionDeclaration
                | Self::GeneratorFunctionDeclaration
                | Self::FunctionExpression
                | Self::GeneratorFunction
                | Self::ArrowFunction
                | Self::MethodDefinition
        )
    }

    pub fn is_class_like(&self) -> bool {
        matches!(
            self,
            Self::ClassDeclaration | Self::AbstractClassDeclaration | Self::Class
        )
    }

    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            Self::ForStatement | Self::ForInStatement | Self::WhileStatement | Self::DoStatement
        )
    }

    /// Names and literals counted as Halstead operands.
    pub fn is_operand(&self) -> bool {
        matches!(
            self,
            Self::Identifier
                | Self::PropertyIdentifier
                | Self::PrivatePropertyIdentifier
                | Self::ShorthandPropertyIdentifier
                | Self::This
                | Self::String
                | Self::TemplateString
                | Self::Number
                | Self::Regex
                | Self::True
                | Self::False
                | Self::Null
                | Self::Undefined
        )
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Byte offsets into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub fn contains(&self, other: &Range) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// A 1-based line and 0-based column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Loc {
    pub start: Position,
    pub end: Position,
}

/// Contents of a named child slot.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotValue {
    Node(Box<AstNode>),
    List(Vec<AstNode>),
    Scalar(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub name: &'static str,
    pub value: SlotValue,
}

/// Slot name for children the grammar does not label.
pub const CHILDREN: &str = "children";

/// Whether `(kind, field)` always holds a list, even with a single child.
fn is_list_slot(kind: NodeKind, field: &str) -> bool {
    field == CHILDREN
        || field == "decorator"
        || matches!(
            (kind, field),
            (NodeKind::SwitchCase, "body")
                | (NodeKind::SwitchDefault, "body")
                | (NodeKind::ClassBody, "member")
        )
}

/// A node of the normalized tree.
#[derive(Debug, Clone, PartialEq)]
pub struct AstNode {
    pub kind: NodeKind,
    pub range: Range,
    pub loc: Loc,
    pub slots: Vec<Slot>,
}

impl AstNode {
    pub fn new(kind: NodeKind, range: Range, loc: Loc) -> Self {
        Self {
            kind,
            range,
            loc,
            slots: Vec::new(),
        }
    }

    /// Add a child node, promoting repeated fields to lists.
    pub fn push_child(&mut self, name: &'static str, node: AstNode) {
        let list_slot = is_list_slot(self.kind, name);
        match self.slots.iter_mut().find(|slot| slot.name == name) {
            Some(slot) => {
                let previous = std::mem::replace(&mut slot.value, SlotValue::List(Vec::new()));
                slot.value = match previous {
                    SlotValue::List(mut nodes) => {
                        nodes.push(node);
                        SlotValue::List(nodes)
                    }
                    SlotValue::Node(first) => SlotValue::List(vec![*first, node]),
                    SlotValue::Scalar(_) => SlotValue::Node(Box::new(node)),
                };
            }
            None if list_slot => self.slots.push(Slot {
                name,
                value: SlotValue::List(vec![node]),
            }),
            None => self.slots.push(Slot {
                name,
                value: SlotValue::Node(Box::new(node)),
            }),
        }
    }

    pub fn push_scalar(&mut self, name: &'static str, value: impl Into<String>) {
        self.slots.push(Slot {
            name,
            value: SlotValue::Scalar(value.into()),
        });
    }

    fn slot(&self, name: &str) -> Option<&SlotValue> {
        self.slots
            .iter()
            .find(|slot| slot.name == name)
            .map(|slot| &slot.value)
    }

    /// The single node held by `name`.
    pub fn child(&self, name: &str) -> Option<&AstNode> {
        match self.slot(name)? {
            SlotValue::Node(node) => Some(node),
            SlotValue::List(nodes) => nodes.first(),
            SlotValue::Scalar(_) => None,
        }
    }

    /// All nodes held by `name`, whether it is a single or list slot.
    pub fn children_of(&self, name: &str) -> &[AstNode] {
        match self.slot(name) {
            Some(SlotValue::Node(node)) => std::slice::from_ref(node.as_ref()),
            Some(SlotValue::List(nodes)) => nodes.as_slice(),
            _ => &[],
        }
    }

    pub fn scalar(&self, name: &str) -> Option<&str> {
        match self.slot(name)? {
            SlotValue::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// Leaf text for identifiers and literals.
    pub fn text(&self) -> Option<&str> {
        self.scalar("text")
    }

    /// Operator token of binary, unary, update and assignment expressions.
    pub fn operator(&self) -> Option<&str> {
        self.scalar("operator")
    }

    /// Every child node, in slot order.
    pub fn children(&self) -> impl Iterator<Item = &AstNode> + '_ {
        self.slots.iter().flat_map(|slot| match &slot.value {
            SlotValue::Node(node) => std::slice::from_ref(node.as_ref()),
            SlotValue::List(nodes) => nodes.as_slice(),
            SlotValue::Scalar(_) => &[],
        })
    }

    /// First child of the given kind.
    pub fn find_child(&self, kind: NodeKind) -> Option<&AstNode> {
        self.children().find(|child| child.kind == kind)
    }

    pub fn start_line(&self) -> usize {
        self.loc.start.line
    }

    pub fn end_line(&self) -> usize {
        self.loc.end.line
    }

    pub fn is_function_like(&self) -> bool {
        self.kind.is_function_like()
    }

    pub fn is_class_like(&self) -> bool {
        self.kind.is_class_like()
    }
}

/// Returned from [`Visitor::enter`] to prune a subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitControl {
    Continue,
    SkipChildren,
}

/// Callbacks for [`visit`]. Both default to no-ops.
pub trait Visitor<'a> {
    fn enter(&mut self, _node: &'a AstNode, _parent: Option<&'a AstNode>) -> VisitControl {
        VisitControl::Continue
    }

    fn exit(&mut self, _node: &'a AstNode, _parent: Option<&'a AstNode>) {}
}

/// Depth-first walk over every child slot of `root`.
pub fn visit<'a, V: Visitor<'a>>(root: &'a AstNode, visitor: &mut V) {
    walk(root, None, visitor);
}

fn walk<'a, V: Visitor<'a>>(node: &'a AstNode, parent: Option<&'a AstNode>, visitor: &mut V) {
    if visitor.enter(node, parent) == VisitControl::Continue {
        for slot in &node.slots {
            match &slot.value {
                SlotValue::Node(child) => walk(child, Some(node), visitor),
                SlotValue::List(children) => {
                    for child in children {
                        walk(child, Some(node), visitor);
                    }
                }
                SlotValue::Scalar(_) => {}
            }
        }
    }
    visitor.exit(node, parent);
}

struct EnterFn<F>(F);

impl<'a, F> Visitor<'a> for EnterFn<F>
where
    F: FnMut(&'a AstNode, Option<&'a AstNode>),
{
    fn enter(&mut self, node: &'a AstNode, parent: Option<&'a AstNode>) -> VisitControl {
        (self.0)(node, parent);
        VisitControl::Continue
    }
}

/// Call `f` for every node in pre-order.
pub fn for_each_node<'a, F>(root: &'a AstNode, f: F)
where
    F: FnMut(&'a AstNode, Option<&'a AstNode>),
{
    visit(root, &mut EnterFn(f));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(kind: NodeKind, start: usize, end: usize) -> AstNode {
        AstNode::new(
            kind,
            Range { start, end },
            Loc {
                start: Position { line: 1, column: start },
                end: Position { line: 1, column: end },
            },
        )
    }

    #[test]
    fn test_from_grammar_roundtrip() {
        assert_eq!(NodeKind::from_grammar("if_statement"), NodeKind::IfStatement);
        assert_eq!(NodeKind::IfStatement.as_str(), "if_statement");
        assert_eq!(
            NodeKind::from_grammar("field_definition"),
            NodeKind::FieldDefinition
        );
        assert_eq!(
            NodeKind::from_grammar("decorator"),
            NodeKind::Other("decorator")
        );
        assert_eq!(NodeKind::Other("decorator").as_str(), "decorator");
    }

    #[test]
    fn test_function_like_kinds() {
        assert!(NodeKind::ArrowFunction.is_function_like());
        assert!(NodeKind::MethodDefinition.is_function_like());
        assert!(!NodeKind::CallExpression.is_function_like());
        assert!(NodeKind::Class.is_class_like());
    }

    #[test]
    fn test_repeated_field_promoted_to_list() {
        let mut node = leaf(NodeKind::Other("x"), 0, 10);
        node.push_child("item", leaf(NodeKind::Identifier, 0, 1));
        assert!(matches!(node.slots[0].value, SlotValue::Node(_)));
        node.push_child("item", leaf(NodeKind::Identifier, 2, 3));
        assert_eq!(node.children_of("item").len(), 2);
        assert_eq!(node.child("item").unwrap().range.start, 0);
    }

    #[test]
    fn test_switch_case_body_is_always_list() {
        let mut case = leaf(NodeKind::SwitchCase, 0, 10);
        case.push_child("body", leaf(NodeKind::ReturnStatement, 5, 10));
        assert!(matches!(case.slots[0].value, SlotValue::List(_)));
    }

    #[test]
    fn test_children_skips_scalars() {
        let mut node = leaf(NodeKind::BinaryExpression, 0, 5);
        node.push_child("left", leaf(NodeKind::Identifier, 0, 1));
        node.push_scalar("operator", "+");
        node.push_child("right", leaf(NodeKind::Identifier, 4, 5));
        assert_eq!(node.children().count(), 2);
        assert_eq!(node.operator(), Some("+"));
    }

    #[test]
    fn test_visit_enter_exit_order() {
        struct Recorder(Vec<String>);
        impl<'a> Visitor<'a> for Recorder {
            fn enter(&mut self, node: &'a AstNode, _: Option<&'a AstNode>) -> VisitControl {
                self.0.push(format!("enter:{}", node.kind));
                VisitControl::Continue
            }
            fn exit(&mut self, node: &'a AstNode, _: Option<&'a AstNode>) {
                self.0.push(format!("exit:{}", node.kind));
            }
        }

        let mut root = leaf(NodeKind::Program, 0, 5);
        root.push_child(CHILDREN, leaf(NodeKind::Identifier, 0, 1));
        let mut recorder = Recorder(Vec::new());
        visit(&root, &mut recorder);
        assert_eq!(
            recorder.0,
            vec![
                "enter:program",
                "enter:identifier",
                "exit:identifier",
                "exit:program"
            ]
        );
    }

    #[test]
    fn test_skip_children() {
        struct Skipper(usize);
        impl<'a> Visitor<'a> for Skipper {
            fn enter(&mut self, node: &'a AstNode, _: Option<&'a AstNode>) -> VisitControl {
                self.0 += 1;
                if node.kind == NodeKind::ArrowFunction {
                    VisitControl::SkipChildren
                } else {
                    VisitControl::Continue
                }
            }
        }

        let mut arrow = leaf(NodeKind::ArrowFunction, 0, 5);
        arrow.push_child("body", leaf(NodeKind::Identifier, 3, 5));
        let mut root = leaf(NodeKind::Program, 0, 5);
        root.push_child(CHILDREN, arrow);
        let mut skipper = Skipper(0);
        visit(&root, &mut skipper);
        assert_eq!(skipper.0, 2);
    }
}
