//! Python locator using tree-sitter
//!
//! Finds function and class definitions and renders their signatures with
//! annotations, `*args`/`**kwargs` markers and base classes.

use tree_sitter::{Node, Parser, Query, QueryCursor, StreamingIterator, Tree};

use super::{collapse_whitespace, Lookup};
use crate::models::{EntityKind, EntitySpan};

const DEFINITION_QUERY: &str = r#"
    (function_definition name: (identifier) @name) @definition
    (class_definition name: (identifier) @name) @definition
"#;

/// Locate a function or class by name.
pub(crate) fn locate(source: &str, name: &str, kind: EntityKind) -> Lookup {
    if !matches!(kind, EntityKind::Function | EntityKind::Class) {
        return Lookup::Missing;
    }

    let Some(tree) = parse(source) else {
        return Lookup::Unparsable;
    };
    if tree.root_node().has_error() {
        return Lookup::Unparsable;
    }

    let source_bytes = source.as_bytes();
    let best = definitions(&tree, source_bytes)
        .into_iter()
        .filter(|node| entity_kind(node) == Some(kind))
        .filter(|node| definition_name(node, source_bytes) == Some(name))
        .min_by_key(|node| (depth(node), node.start_byte()));

    match best {
        Some(node) => Lookup::Found(to_span(&node, source_bytes, kind)),
        None => Lookup::Missing,
    }
}

/// All definitions in the file, or `None` if the source does not parse.
pub(crate) fn list(source: &str) -> Option<Vec<EntitySpan>> {
    let tree = parse(source)?;
    if tree.root_node().has_error() {
        return None;
    }
    let source_bytes = source.as_bytes();
    Some(
        definitions(&tree, source_bytes)
            .into_iter()
            .filter_map(|node| {
                let kind = entity_kind(&node)?;
                Some(to_span(&node, source_bytes, kind))
            })
            .collect(),
    )
}

fn parse(source: &str) -> Option<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .ok()?;
    parser.parse(source, None)
}

fn definitions<'t>(tree: &'t Tree, source: &[u8]) -> Vec<Node<'t>> {
    let language = tree_sitter_python::LANGUAGE.into();
    let Ok(query) = Query::new(&language, DEFINITION_QUERY) else {
        return Vec::new();
    };
    let Some(def_idx) = query.capture_index_for_name("definition") else {
        return Vec::new();
    };

    let mut found = Vec::new();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, tree.root_node(), source);
    while let Some(m) = matches.next() {
        for capture in m.captures {
            if capture.index == def_idx {
                found.push(capture.node);
            }
        }
    }
    found
}

fn entity_kind(node: &Node) -> Option<EntityKind> {
    match node.kind() {
        "function_definition" => Some(EntityKind::Function),
        "class_definition" => Some(EntityKind::Class),
        _ => None,
    }
}

fn definition_name<'s>(node: &Node, source: &'s [u8]) -> Option<&'s str> {
    node.child_by_field_name("name")?.utf8_text(source).ok()
}

fn depth(node: &Node) -> usize {
    let mut depth = 0;
    let mut current = node.parent();
    while let Some(n) = current {
        depth += 1;
        current = n.parent();
    }
    depth
}

fn to_span(node: &Node, source: &[u8], kind: EntityKind) -> EntitySpan {
    let name = definition_name(node, source).unwrap_or("").to_string();
    let (signature, parent) = match kind {
        EntityKind::Class => (class_signature(node, source, &name), None),
        _ => (
            function_signature(node, source, &name),
            enclosing_class(node, source),
        ),
    };
    EntitySpan {
        name,
        kind,
        start_line: node.start_position().row as u32 + 1,
        end_line: node.end_position().row as u32 + 1,
        signature,
        parent,
    }
}

/// `async def name(a: int, *args, **kwargs) -> str`
fn function_signature(node: &Node, source: &[u8], name: &str) -> String {
    let is_async = node
        .child(0)
        .map(|first| first.kind() == "async")
        .unwrap_or(false);

    let mut params = Vec::new();
    if let Some(parameters) = node.child_by_field_name("parameters") {
        let mut cursor = parameters.walk();
        for param in parameters.named_children(&mut cursor) {
            if let Some(rendered) = render_parameter(&param, source) {
                params.push(rendered);
            }
        }
    }

    let mut signature = format!(
        "{} {}({})",
        if is_async { "async def" } else { "def" },
        name,
        params.join(", ")
    );
    if let Some(ret) = node
        .child_by_field_name("return_type")
        .and_then(|n| n.utf8_text(source).ok())
    {
        signature.push_str(" -> ");
        signature.push_str(&collapse_whitespace(ret));
    }
    signature
}

/// Parameter names with annotations; defaults are left out.
fn render_parameter(param: &Node, source: &[u8]) -> Option<String> {
    let text = |n: &Node| n.utf8_text(source).ok().map(collapse_whitespace);
    match param.kind() {
        "identifier" | "list_splat_pattern" | "dictionary_splat_pattern" | "typed_parameter" => {
            text(param)
        }
        "default_parameter" => param.child_by_field_name("name").and_then(|n| text(&n)),
        "typed_default_parameter" => {
            let name = param.child_by_field_name("name").and_then(|n| text(&n))?;
            match param.child_by_field_name("type").and_then(|n| text(&n)) {
                Some(ty) => Some(format!("{}: {}", name, ty)),
                None => Some(name),
            }
        }
        // bare `*` and `/` separators
        _ => None,
    }
}

/// `class Name(Base, pkg.Mixin):`
fn class_signature(node: &Node, source: &[u8], name: &str) -> String {
    let mut bases = Vec::new();
    if let Some(superclasses) = node.child_by_field_name("superclasses") {
        let mut cursor = superclasses.walk();
        for base in superclasses.named_children(&mut cursor) {
            if matches!(base.kind(), "identifier" | "attribute") {
                if let Ok(text) = base.utf8_text(source) {
                    bases.push(text.to_string());
                }
            }
        }
    }
    if bases.is_empty() {
        format!("class {}:", name)
    } else {
        format!("class {}({}):", name, bases.join(", "))
    }
}

/// Class whose body directly holds this function (decorators allowed).
fn enclosing_class(node: &Node, source: &[u8]) -> Option<String> {
    let mut parent = node.parent()?;
    if parent.kind() == "decorated_definition" {
        parent = parent.parent()?;
    }
    if parent.kind() != "block" {
        return None;
    }
    let class = parent.parent()?;
    if class.kind() != "class_definition" {
        return None;
    }
    definition_name(&class, source).map(str::to_string)
}
