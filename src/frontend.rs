//! Rust source front end
//!
//! Uses `syn` to parse every `.rs` file of a project and lowers its items
//! into [`Node`]s. Files are parsed in parallel via Rayon; `crate::`,
//! `super::` and `self::` imports are then resolved against the module
//! tree derived from file paths. Everything else stays unresolved.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use syn::spanned::Spanned;
use syn::visit::Visit;
use syn::{
    Attribute, FnArg, GenericArgument, ImplItem, Item, ItemFn, ItemUse, Pat, PathArguments,
    ReturnType, Signature, TraitItem, Type, UseTree,
};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::ast::{
    CallNode, CommentKind, CommentNode, FunctionNode, ImportNode, Node, Param, ReExportNode,
    TypeDeclNode, TypeKind, VariableNode,
};
use crate::config::{CompiledConfig, ConfigError, load_compiled_config};
use crate::engine::Engine;
use crate::model::{ImportTarget, Report, SourceFile, SourceModel};
use crate::rubric::Rubric;

/// Errors that can occur while loading a project
#[derive(Error, Debug)]
pub enum FrontendError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse Rust file: {0}")]
    ParseError(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),
}

/// Whether an item is part of the public API (`pub` only, not `pub(crate)`)
fn is_exported(vis: &syn::Visibility) -> bool {
    matches!(vis, syn::Visibility::Public(_))
}

fn has_doc(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|a| a.path().is_ident("doc"))
}

fn is_cfg_test(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|a| {
        a.path().is_ident("cfg") && matches!(a.parse_args::<syn::Ident>(), Ok(ident) if ident == "test")
    })
}

/// Render a type the way it is usually written (`Box<dyn Any>`, `&mut [u8]`)
pub fn type_label(ty: &Type) -> String {
    match ty {
        Type::Path(type_path) => path_label(&type_path.path),
        Type::Reference(r) => {
            let mutability = if r.mutability.is_some() { "mut " } else { "" };
            format!("&{}{}", mutability, type_label(&r.elem))
        }
        Type::Slice(s) => format!("[{}]", type_label(&s.elem)),
        Type::Array(a) => format!("[{}; _]", type_label(&a.elem)),
        Type::Ptr(p) => {
            let kind = if p.mutability.is_some() { "mut" } else { "const" };
            format!("*{} {}", kind, type_label(&p.elem))
        }
        Type::Tuple(t) => format!(
            "({})",
            t.elems.iter().map(type_label).collect::<Vec<_>>().join(", ")
        ),
        Type::TraitObject(t) => format!("dyn {}", bounds_label(t.bounds.iter())),
        Type::ImplTrait(t) => format!("impl {}", bounds_label(t.bounds.iter())),
        Type::Paren(p) => type_label(&p.elem),
        Type::Group(g) => type_label(&g.elem),
        Type::Never(_) => "!".to_string(),
        _ => "_".to_string(),
    }
}

fn path_label(path: &syn::Path) -> String {
    path.segments
        .iter()
        .map(|segment| match &segment.arguments {
            PathArguments::AngleBracketed(args) => {
                let args: Vec<String> = args
                    .args
                    .iter()
                    .map(|arg| match arg {
                        GenericArgument::Type(ty) => type_label(ty),
                        GenericArgument::Lifetime(lt) => format!("'{}", lt.ident),
                        _ => "_".to_string(),
                    })
                    .collect();
                format!("{}<{}>", segment.ident, args.join(", "))
            }
            _ => segment.ident.to_string(),
        })
        .collect::<Vec<_>>()
        .join("::")
}

fn bounds_label<'a>(bounds: impl Iterator<Item = &'a syn::TypeParamBound>) -> String {
    bounds
        .filter_map(|bound| match bound {
            syn::TypeParamBound::Trait(t) => Some(path_label(&t.path)),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" + ")
}

/// Leaf paths of a use tree: (full path, name it binds, is glob)
fn use_paths(tree: &UseTree, prefix: &str, out: &mut Vec<(String, String, bool)>) {
    let join = |ident: &syn::Ident| {
        if prefix.is_empty() {
            ident.to_string()
        } else {
            format!("{}::{}", prefix, ident)
        }
    };

    match tree {
        UseTree::Path(path) => use_paths(&path.tree, &join(&path.ident), out),
        // `use a::b::{self}` imports `a::b` itself
        UseTree::Name(name) if name.ident == "self" && !prefix.is_empty() => {
            let bound = prefix.rsplit("::").next().unwrap_or(prefix);
            out.push((prefix.to_string(), bound.to_string(), false));
        }
        UseTree::Name(name) => out.push((join(&name.ident), name.ident.to_string(), false)),
        UseTree::Rename(rename) => out.push((join(&rename.ident), rename.rename.to_string(), false)),
        UseTree::Glob(_) => out.push((format!("{}::*", prefix), String::new(), true)),
        UseTree::Group(group) => {
            for item in &group.items {
                use_paths(item, prefix, out);
            }
        }
    }
}

/// Collects debug-relevant macro calls and typed `let` bindings in a body
#[derive(Default)]
struct BodyCollector {
    nodes: Vec<Node>,
}

impl<'ast> Visit<'ast> for BodyCollector {
    fn visit_macro(&mut self, node: &'ast syn::Macro) {
        if let Some(last) = node.path.segments.last() {
            self.nodes.push(Node::Call(CallNode {
                line: node.span().start().line,
                callee: format!("{}!", last.ident),
            }));
        }
        syn::visit::visit_macro(self, node);
    }

    fn visit_local(&mut self, node: &'ast syn::Local) {
        let binding = match &node.pat {
            Pat::Type(typed) => match typed.pat.as_ref() {
                Pat::Ident(ident) => Some((ident.ident.to_string(), Some(type_label(&typed.ty)))),
                _ => None,
            },
            Pat::Ident(ident) => Some((ident.ident.to_string(), None)),
            _ => None,
        };
        if let Some((name, type_annotation)) = binding {
            self.nodes.push(Node::Variable(VariableNode {
                name,
                line: node.span().start().line,
                type_annotation,
                exported: false,
            }));
        }
        syn::visit::visit_local(self, node);
    }

    // Nested items are not part of the enclosing body
    fn visit_item(&mut self, _node: &'ast Item) {}
}

fn lower_signature(sig: &Signature, exported: bool, documented: bool, end_line: usize) -> FunctionNode {
    let line = sig.span().start().line;
    let mut function = FunctionNode::new(sig.ident.to_string(), line, end_line.max(line));
    function.exported = exported;
    function.documented = documented;
    function.params = sig
        .inputs
        .iter()
        .filter_map(|arg| match arg {
            FnArg::Typed(pat_type) => {
                let name = match pat_type.pat.as_ref() {
                    Pat::Ident(ident) => ident.ident.to_string(),
                    _ => "_".to_string(),
                };
                Some(Param::new(name, Some(&type_label(&pat_type.ty))))
            }
            FnArg::Receiver(_) => None,
        })
        .collect();
    // An omitted return type is an explicit `()` in Rust
    function.return_type = Some(match &sig.output {
        ReturnType::Default => "()".to_string(),
        ReturnType::Type(_, ty) => type_label(ty),
    });
    function
}

fn lower_body(function: &mut FunctionNode, block: &syn::Block) {
    let mut collector = BodyCollector::default();
    collector.visit_block(block);
    function.body = collector.nodes;
}

fn lower_fn(item: &ItemFn) -> FunctionNode {
    let mut function = lower_signature(
        &item.sig,
        is_exported(&item.vis),
        has_doc(&item.attrs),
        item.block.span().end().line,
    );
    lower_body(&mut function, &item.block);
    function
}

/// A `use` leaf together with the inline module it was written in
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScopedImport {
    /// Inline `mod` segments between the file's module and the `use`
    scope: Vec<String>,
    specifier: String,
}

/// Longest `::`-separated prefix shared by every path
fn common_prefix<'a>(paths: impl IntoIterator<Item = &'a str>) -> String {
    let mut prefix: Option<Vec<&str>> = None;
    for path in paths {
        let segments: Vec<&str> = path.split("::").collect();
        prefix = Some(match prefix {
            None => segments,
            Some(current) => current
                .into_iter()
                .zip(segments)
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| a)
                .collect(),
        });
    }
    prefix.unwrap_or_default().join("::")
}

/// Per-file lowering state
#[derive(Default)]
struct FileLowering {
    exports: Vec<String>,
    imports: Vec<ScopedImport>,
    /// Inline modules enclosing the item being lowered
    scope: Vec<String>,
    /// Inside a `#[cfg(test)]` module
    in_test: bool,
}

impl FileLowering {
    fn lower_items(&mut self, items: &[Item]) -> Vec<Node> {
        let mut nodes = Vec::new();
        for item in items {
            self.lower_item(item, &mut nodes);
        }
        nodes
    }

    /// One `use` item is one statement: an `Import` node, or a single
    /// `ReExport` node for `pub use`. Every leaf still becomes a graph
    /// import unless the item only exists under `cfg(test)`.
    fn lower_use(&mut self, item: &ItemUse, nodes: &mut Vec<Node>) {
        let line = item.span().start().line;
        let mut paths = Vec::new();
        use_paths(&item.tree, "", &mut paths);
        if paths.is_empty() {
            return;
        }

        let leaves: Vec<(String, String, bool)> = paths
            .into_iter()
            .map(|(path, name, wildcard)| (path.trim_end_matches("::*").to_string(), name, wildcard))
            .collect();

        if is_exported(&item.vis) {
            // Named leaves are re-exported from their parent path
            let sources: Vec<&str> = leaves
                .iter()
                .map(|(specifier, _, wildcard)| {
                    if *wildcard {
                        specifier.as_str()
                    } else {
                        specifier.rsplit_once("::").map_or("", |(source, _)| source)
                    }
                })
                .collect();
            let names: Vec<String> = leaves
                .iter()
                .filter(|(_, _, wildcard)| !wildcard)
                .map(|(_, name, _)| name.clone())
                .collect();
            self.exports.extend(names.iter().cloned());
            nodes.push(Node::ReExport(ReExportNode {
                line,
                source: common_prefix(sources),
                names,
                wildcard: leaves.iter().any(|(_, _, wildcard)| *wildcard),
            }));
        } else {
            nodes.push(Node::Import(ImportNode {
                line,
                specifier: common_prefix(leaves.iter().map(|(s, _, _)| s.as_str())),
            }));
        }

        if self.in_test || is_cfg_test(&item.attrs) {
            return;
        }
        for (specifier, _, _) in leaves {
            self.imports.push(ScopedImport {
                scope: self.scope.clone(),
                specifier,
            });
        }
    }

    fn type_decl(
        &mut self,
        name: &syn::Ident,
        vis: &syn::Visibility,
        attrs: &[Attribute],
        line: usize,
        kind: TypeKind,
    ) -> TypeDeclNode {
        let mut decl = TypeDeclNode::new(name.to_string(), line, kind);
        decl.exported = is_exported(vis);
        decl.documented = has_doc(attrs);
        if decl.exported {
            self.exports.push(decl.name.clone());
        }
        decl
    }

    fn variable(&mut self, ident: &syn::Ident, vis: &syn::Visibility, ty: &Type, line: usize) -> Node {
        let exported = is_exported(vis);
        if exported {
            self.exports.push(ident.to_string());
        }
        Node::Variable(VariableNode {
            name: ident.to_string(),
            line,
            type_annotation: Some(type_label(ty)),
            exported,
        })
    }

    fn lower_item(&mut self, item: &Item, nodes: &mut Vec<Node>) {
        let line = item.span().start().line;
        match item {
            Item::Use(item) => self.lower_use(item, nodes),
            Item::Fn(item) => {
                let function = lower_fn(item);
                if function.exported {
                    self.exports.push(function.name.clone());
                }
                nodes.push(Node::Function(function));
            }
            Item::Struct(item) => {
                let decl = self.type_decl(&item.ident, &item.vis, &item.attrs, line, TypeKind::Struct);
                nodes.push(Node::TypeDecl(decl));
            }
            Item::Enum(item) => {
                let decl = self.type_decl(&item.ident, &item.vis, &item.attrs, line, TypeKind::Enum);
                nodes.push(Node::TypeDecl(decl));
            }
            Item::Type(item) => {
                let decl = self.type_decl(&item.ident, &item.vis, &item.attrs, line, TypeKind::Alias);
                nodes.push(Node::TypeDecl(decl));
            }
            Item::Trait(item) => {
                let mut decl =
                    self.type_decl(&item.ident, &item.vis, &item.attrs, line, TypeKind::Trait);
                for member in &item.items {
                    if let TraitItem::Fn(method) = member {
                        let end_line = method.span().end().line;
                        let mut function =
                            lower_signature(&method.sig, decl.exported, has_doc(&method.attrs), end_line);
                        if let Some(block) = &method.default {
                            lower_body(&mut function, block);
                        }
                        decl.members.push(Node::Function(function));
                    }
                }
                nodes.push(Node::TypeDecl(decl));
            }
            // Methods are lowered as free functions; the impl block itself
            // declares nothing
            Item::Impl(item) => {
                for member in &item.items {
                    match member {
                        ImplItem::Fn(method) => {
                            let mut function = lower_signature(
                                &method.sig,
                                is_exported(&method.vis),
                                has_doc(&method.attrs),
                                method.block.span().end().line,
                            );
                            lower_body(&mut function, &method.block);
                            nodes.push(Node::Function(function));
                        }
                        other => nodes.push(Node::Other {
                            line: other.span().start().line,
                        }),
                    }
                }
            }
            Item::Const(item) => {
                nodes.push(self.variable(&item.ident, &item.vis, &item.ty, line));
            }
            Item::Static(item) => {
                nodes.push(self.variable(&item.ident, &item.vis, &item.ty, line));
            }
            Item::Mod(item) => match &item.content {
                Some((_, items)) => {
                    let mut decl =
                        self.type_decl(&item.ident, &item.vis, &item.attrs, line, TypeKind::Module);
                    decl.is_test = is_cfg_test(&item.attrs);

                    let outer_test = self.in_test;
                    self.in_test = outer_test || decl.is_test;
                    self.scope.push(item.ident.to_string());
                    decl.members = self.lower_items(items);
                    self.scope.pop();
                    self.in_test = outer_test;

                    nodes.push(Node::TypeDecl(decl));
                }
                // `mod x;` only declares the file that holds the module
                None => {
                    if is_exported(&item.vis) {
                        self.exports.push(item.ident.to_string());
                    }
                    nodes.push(Node::Other { line });
                }
            },
            _ => nodes.push(Node::Other { line }),
        }
    }
}

/// Recover comments that `syn` does not keep: whole-line `//` and `/* */`
/// comments, plus doc comments for marker scanning
fn scan_comments(content: &str) -> Vec<Node> {
    let mut comments = Vec::new();
    let mut block: Option<(usize, Vec<String>)> = None;

    for (index, raw) in content.lines().enumerate() {
        let line = index + 1;
        let text = raw.trim();

        if let Some((start, mut lines)) = block.take() {
            match text.split_once("*/") {
                Some((last, _)) => {
                    lines.push(last.trim_start_matches('*').trim().to_string());
                    comments.push(block_comment(start, lines));
                }
                None => {
                    lines.push(text.trim_start_matches('*').trim().to_string());
                    block = Some((start, lines));
                }
            }
            continue;
        }

        if let Some(rest) = text.strip_prefix("///").or_else(|| text.strip_prefix("//!")) {
            comments.push(Node::Comment(CommentNode {
                line,
                text: rest.trim().to_string(),
                comment_kind: CommentKind::Doc,
            }));
        } else if let Some(rest) = text.strip_prefix("//") {
            comments.push(Node::Comment(CommentNode {
                line,
                text: rest.trim().to_string(),
                comment_kind: CommentKind::Line,
            }));
        } else if let Some(rest) = text.strip_prefix("/*") {
            let is_doc = rest.starts_with('*') || rest.starts_with('!');
            let rest = rest.trim_start_matches(['*', '!']);
            match rest.split_once("*/") {
                Some((inner, _)) => comments.push(Node::Comment(CommentNode {
                    line,
                    text: inner.trim().to_string(),
                    comment_kind: if is_doc { CommentKind::Doc } else { CommentKind::Block },
                })),
                None => block = Some((line, vec![rest.trim().to_string()])),
            }
        }
    }

    // Unterminated block: keep what was read
    if let Some((start, lines)) = block {
        comments.push(block_comment(start, lines));
    }
    comments
}

fn block_comment(line: usize, lines: Vec<String>) -> Node {
    Node::Comment(CommentNode {
        line,
        text: lines.join("\n").trim().to_string(),
        comment_kind: CommentKind::Block,
    })
}

/// A parsed file whose imports are not yet resolved
struct ParsedFile {
    file: SourceFile,
    imports: Vec<ScopedImport>,
}

/// Parse one Rust source text into a [`SourceFile`] with unresolved imports
pub fn parse_rust_source(relative_path: &str, content: &str) -> Result<SourceFile, FrontendError> {
    parse_source(relative_path, content).map(|parsed| {
        parsed
            .imports
            .into_iter()
            .fold(parsed.file, |file, import| {
                file.with_import(ImportTarget::unresolved(import.specifier))
            })
    })
}

fn parse_source(relative_path: &str, content: &str) -> Result<ParsedFile, FrontendError> {
    let syntax = syn::parse_file(content)
        .map_err(|e| FrontendError::ParseError(format!("{}: {}", relative_path, e)))?;

    let mut lowering = FileLowering::default();
    let mut nodes = lowering.lower_items(&syntax.items);
    nodes.extend(scan_comments(content));
    nodes.sort_by_key(Node::line);

    let mut file = SourceFile::new(relative_path).with_line_count(content.lines().count());
    file.nodes = nodes;
    for name in lowering.exports {
        file = file.with_export(name);
    }
    Ok(ParsedFile {
        file,
        imports: lowering.imports,
    })
}

/// Get an iterator over all non-hidden, non-excluded rust files in `dir`
fn rs_files<'a>(dir: &'a Path, config: &'a CompiledConfig) -> impl Iterator<Item = PathBuf> + 'a {
    WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(move |entry| {
            let file_path = entry.path();
            // Only components below the project root count
            let file_path = file_path.strip_prefix(dir).unwrap_or(file_path);

            !file_path.components().any(|c| {
                let s = c.as_os_str().to_string_lossy();
                s == "target" || s.starts_with('.')
            }) && file_path.extension() == Some(OsStr::new("rs"))
                && !config.should_exclude(&file_path.to_string_lossy().replace('\\', "/"))
        })
        .map(|e| e.path().to_path_buf())
}

/// Module location of a file: (crate source root, module segments)
///
/// `src/lib.rs` and `src/main.rs` are the crate root, `src/a/mod.rs` is
/// `a`, `src/a/b.rs` is `a::b`. Files outside a `src` directory have none.
fn module_of(relative_path: &str) -> Option<(String, Vec<String>)> {
    let segments: Vec<&str> = relative_path.split('/').collect();
    let src = segments.iter().rposition(|s| *s == "src")?;
    let root = segments[..=src].join("/");
    let rest = &segments[src + 1..];
    let (file, dirs) = rest.split_last()?;
    let stem = file.strip_suffix(".rs")?;

    let mut module: Vec<String> = dirs.iter().map(|d| d.to_string()).collect();
    match stem {
        "lib" | "main" if dirs.is_empty() => {}
        "mod" => {}
        _ => module.push(stem.to_string()),
    }
    Some((root, module))
}

/// Maps module paths to the files that define them
struct ModuleTree {
    modules: HashMap<(String, String), String>,
}

impl ModuleTree {
    fn new<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        let modules = paths
            .into_iter()
            .filter_map(|path| {
                module_of(path).map(|(root, module)| ((root, module.join("::")), path.to_string()))
            })
            .collect();
        Self { modules }
    }

    /// Resolve a `crate::`/`super::`/`self::` path, or a bare path relative
    /// to the current module, to the file of the longest matching module
    /// prefix (never the crate root itself)
    ///
    /// `scope` names the inline modules of `from` that enclose the `use`.
    fn resolve(&self, from: &str, scope: &[String], specifier: &str) -> Option<String> {
        let (root, mut module) = module_of(from)?;
        module.extend(scope.iter().cloned());
        let mut segments = specifier.split("::").peekable();

        let mut base: Vec<String> = match segments.peek().copied() {
            Some("crate") => {
                segments.next();
                Vec::new()
            }
            Some("self") => {
                segments.next();
                module.clone()
            }
            Some("super") => {
                let mut base = module.clone();
                while segments.peek() == Some(&"super") {
                    segments.next();
                    base.pop()?;
                }
                base
            }
            // 2018-style paths start at a child of the current module
            Some(_) => module.clone(),
            None => return None,
        };
        base.extend(segments.filter(|s| *s != "*").map(str::to_string));

        (1..=base.len())
            .rev()
            .find_map(|n| self.modules.get(&(root.clone(), base[..n].join("::"))))
            .filter(|path| path.as_str() != from)
            .cloned()
    }
}

/// Load every Rust file under `root` into a [`SourceModel`]
///
/// Files that cannot be read or parsed are skipped with a warning.
pub fn load_rust_project(root: &Path, config: &CompiledConfig) -> Result<SourceModel, FrontendError> {
    if !root.is_dir() {
        return Err(FrontendError::InvalidPath(root.display().to_string()));
    }

    let file_paths: Vec<PathBuf> = rs_files(root, config).collect();
    debug!("Found {} Rust files under {}", file_paths.len(), root.display());

    let mut parsed: Vec<ParsedFile> = file_paths
        .par_iter()
        .filter_map(|path| match load_file(root, path) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                None
            }
        })
        .collect();
    parsed.sort_by(|a, b| a.file.path.cmp(&b.file.path));

    let tree = ModuleTree::new(parsed.iter().map(|p| p.file.path.as_str()));

    let files = parsed
        .into_iter()
        .map(|ParsedFile { file, imports }| {
            let path = file.path.clone();
            imports.into_iter().fold(file, |file, import| {
                let target = match tree.resolve(&path, &import.scope, &import.specifier) {
                    Some(resolved) => ImportTarget::resolved(import.specifier, resolved),
                    None => ImportTarget::unresolved(import.specifier),
                };
                file.with_import(target)
            })
        })
        .collect();

    Ok(SourceModel::new(files))
}

/// Score a Rust project with its `.readiness.toml` (if any) and the
/// standard rubric
pub fn score_rust_project(root: &Path) -> Result<Report, FrontendError> {
    let config = load_compiled_config(root)?;
    let model = load_rust_project(root, &config)?;
    Ok(Engine::new(config, Rubric::standard()).run(&model, root))
}

fn load_file(root: &Path, path: &Path) -> Result<ParsedFile, FrontendError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| FrontendError::InvalidPath(path.display().to_string()))?
        .to_string_lossy()
        .replace('\\', "/");
    let content = fs::read_to_string(path)?;

    let mut parsed = parse_source(&relative, &content)?;
    parsed.file.absolute_path = path.to_path_buf();
    Ok(parsed)
}
