//! Language-neutral syntax nodes
//!
//! Front ends lower their own ASTs into this closed set of node kinds.
//! Analyzers walk it through [`NodeVisitor`], overriding only the hooks they
//! care about; [`walk_node`] is the single dispatch over every variant.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A top-level or nested syntax node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Import(ImportNode),
    ReExport(ReExportNode),
    Function(FunctionNode),
    TypeDecl(TypeDeclNode),
    Variable(VariableNode),
    Comment(CommentNode),
    Call(CallNode),
    Other { line: usize },
}

impl Node {
    /// Line where the node starts (1-based)
    pub fn line(&self) -> usize {
        match self {
            Node::Import(n) => n.line,
            Node::ReExport(n) => n.line,
            Node::Function(n) => n.line,
            Node::TypeDecl(n) => n.line,
            Node::Variable(n) => n.line,
            Node::Comment(n) => n.line,
            Node::Call(n) => n.line,
            Node::Other { line } => *line,
        }
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, Node::Comment(_))
    }

    pub fn is_reexport(&self) -> bool {
        matches!(self, Node::ReExport(_))
    }
}

/// `import x from './x'`, `use crate::x`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportNode {
    pub line: usize,
    pub specifier: String,
}

/// `export * from './x'`, `pub use self::x::Y`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReExportNode {
    pub line: usize,
    pub source: String,
    #[serde(default)]
    pub names: Vec<String>,
    /// Re-exports everything from the source (`*`)
    #[serde(default)]
    pub wildcard: bool,
}

/// A function parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    /// Type annotation as written, if any
    #[serde(default)]
    pub type_annotation: Option<String>,
}

impl Param {
    pub fn new(name: impl Into<String>, type_annotation: Option<&str>) -> Self {
        Self {
            name: name.into(),
            type_annotation: type_annotation.map(str::to_string),
        }
    }
}

/// A function, method, or arrow function bound to a name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionNode {
    pub name: String,
    pub line: usize,
    pub end_line: usize,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub return_type: Option<String>,
    #[serde(default)]
    pub exported: bool,
    /// Has a doc comment
    #[serde(default)]
    pub documented: bool,
    #[serde(default)]
    pub body: Vec<Node>,
}

impl FunctionNode {
    pub fn new(name: impl Into<String>, line: usize, end_line: usize) -> Self {
        Self {
            name: name.into(),
            line,
            end_line,
            params: Vec::new(),
            return_type: None,
            exported: false,
            documented: false,
            body: Vec::new(),
        }
    }

    /// Number of lines spanned, inclusive
    pub fn length(&self) -> usize {
        self.end_line.saturating_sub(self.line) + 1
    }
}

/// Kind of type declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Struct,
    Enum,
    Trait,
    Interface,
    Alias,
    Class,
    /// Inline module or namespace grouping other nodes
    Module,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::Struct => write!(f, "struct"),
            TypeKind::Enum => write!(f, "enum"),
            TypeKind::Trait => write!(f, "trait"),
            TypeKind::Interface => write!(f, "interface"),
            TypeKind::Alias => write!(f, "type alias"),
            TypeKind::Class => write!(f, "class"),
            TypeKind::Module => write!(f, "module"),
        }
    }
}

/// A named type (or container such as a class body or inline module)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDeclNode {
    pub name: String,
    pub line: usize,
    pub kind: TypeKind,
    #[serde(default)]
    pub exported: bool,
    #[serde(default)]
    pub documented: bool,
    /// Marks an inline test container (`#[cfg(test)] mod tests`, `describe` blocks)
    #[serde(default)]
    pub is_test: bool,
    #[serde(default)]
    pub members: Vec<Node>,
}

impl TypeDeclNode {
    pub fn new(name: impl Into<String>, line: usize, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            line,
            kind,
            exported: false,
            documented: false,
            is_test: false,
            members: Vec::new(),
        }
    }
}

/// A named binding (`const`, `static`, `let`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableNode {
    pub name: String,
    pub line: usize,
    #[serde(default)]
    pub type_annotation: Option<String>,
    #[serde(default)]
    pub exported: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentKind {
    Line,
    Block,
    Doc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentNode {
    pub line: usize,
    /// Comment text without its delimiters
    pub text: String,
    pub comment_kind: CommentKind,
}

/// A call whose callee is syntactically known (`console.log`, `println!`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallNode {
    pub line: usize,
    pub callee: String,
}

/// Visitor over [`Node`] trees
///
/// Every hook defaults to walking into the node's children, so an
/// implementation that overrides a hook must call the matching `walk_*`
/// function itself if it still wants nested nodes visited.
pub trait NodeVisitor {
    fn visit_node(&mut self, node: &Node) {
        walk_node(self, node);
    }

    fn visit_import(&mut self, _node: &ImportNode) {}

    fn visit_reexport(&mut self, _node: &ReExportNode) {}

    fn visit_function(&mut self, node: &FunctionNode) {
        walk_function(self, node);
    }

    fn visit_type_decl(&mut self, node: &TypeDeclNode) {
        walk_type_decl(self, node);
    }

    fn visit_variable(&mut self, _node: &VariableNode) {}

    fn visit_comment(&mut self, _node: &CommentNode) {}

    fn visit_call(&mut self, _node: &CallNode) {}

    fn visit_other(&mut self, _line: usize) {}
}

/// Dispatch a node to the visitor hook for its kind
pub fn walk_node<V: NodeVisitor + ?Sized>(visitor: &mut V, node: &Node) {
    match node {
        Node::Import(n) => visitor.visit_import(n),
        Node::ReExport(n) => visitor.visit_reexport(n),
        Node::Function(n) => visitor.visit_function(n),
        Node::TypeDecl(n) => visitor.visit_type_decl(n),
        Node::Variable(n) => visitor.visit_variable(n),
        Node::Comment(n) => visitor.visit_comment(n),
        Node::Call(n) => visitor.visit_call(n),
        Node::Other { line } => visitor.visit_other(*line),
    }
}

pub fn walk_function<V: NodeVisitor + ?Sized>(visitor: &mut V, node: &FunctionNode) {
    for child in &node.body {
        visitor.visit_node(child);
    }
}

pub fn walk_type_decl<V: NodeVisitor + ?Sized>(visitor: &mut V, node: &TypeDeclNode) {
    for child in &node.members {
        visitor.visit_node(child);
    }
}

/// Visit every node in a slice
pub fn walk_nodes<V: NodeVisitor + ?Sized>(visitor: &mut V, nodes: &[Node]) {
    for node in nodes {
        visitor.visit_node(node);
    }
}

/// Every function in a node tree, including methods and nested functions,
/// in source order
pub fn functions(nodes: &[Node]) -> Vec<&FunctionNode> {
    let mut found = Vec::new();
    let mut stack: Vec<&Node> = nodes.iter().rev().collect();
    while let Some(node) = stack.pop() {
        match node {
            Node::Function(f) => {
                found.push(f);
                stack.extend(f.body.iter().rev());
            }
            Node::TypeDecl(t) => stack.extend(t.members.iter().rev()),
            _ => {}
        }
    }
    found
}

/// Every type declaration in a node tree, in source order
pub fn type_decls(nodes: &[Node]) -> Vec<&TypeDeclNode> {
    let mut found = Vec::new();
    let mut stack: Vec<&Node> = nodes.iter().rev().collect();
    while let Some(node) = stack.pop() {
        match node {
            Node::Function(f) => stack.extend(f.body.iter().rev()),
            Node::TypeDecl(t) => {
                found.push(t);
                stack.extend(t.members.iter().rev());
            }
            _ => {}
        }
    }
    found
}
