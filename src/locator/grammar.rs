//! Declaration lookup through tree-sitter grammars
//!
//! Each language has a small table mapping grammar node kinds to entity
//! kinds and a rule for pulling the declared name out of the node. Names
//! usually sit in a `name` field; Rust impl blocks, Go type specs, C/C++
//! declarators and JS variable-bound functions need their own lookup.

use tree_sitter::{Node, Parser, Tree};

use super::{collapse_whitespace, Lookup};
use crate::config::Language;
use crate::models::{EntityKind, EntitySpan};

/// How to find the declared name inside a matched node.
#[derive(Debug, Clone, Copy)]
enum NameRule {
    Field(&'static str),
    /// `impl<T> Trait for Type<T>`: the implemented type, generics stripped
    ImplType,
    /// Go `type_spec` whose `type` child has this kind
    GoTypeSpec(&'static str),
    /// C/C++ function definitions: follow the declarator chain
    Declarator,
    /// `struct X { ... }` definitions only, not bare references
    SpecifierWithBody,
    /// `const f = () => {}` and `const f = function () {}`
    BoundFunction,
}

#[derive(Debug, Clone, Copy)]
struct Declaration {
    node_kind: &'static str,
    kind: EntityKind,
    name: NameRule,
}

const fn decl(node_kind: &'static str, kind: EntityKind, name: NameRule) -> Declaration {
    Declaration {
        node_kind,
        kind,
        name,
    }
}

const NAME: NameRule = NameRule::Field("name");

const RUST: &[Declaration] = &[
    decl("function_item", EntityKind::Function, NAME),
    decl("struct_item", EntityKind::Struct, NAME),
    decl("enum_item", EntityKind::Enum, NAME),
    decl("trait_item", EntityKind::Interface, NAME),
    decl("impl_item", EntityKind::Impl, NameRule::ImplType),
];

const JAVASCRIPT: &[Declaration] = &[
    decl("function_declaration", EntityKind::Function, NAME),
    decl("generator_function_declaration", EntityKind::Function, NAME),
    decl("method_definition", EntityKind::Function, NAME),
    decl("variable_declarator", EntityKind::Function, NameRule::BoundFunction),
    decl("class_declaration", EntityKind::Class, NAME),
];

const TYPESCRIPT: &[Declaration] = &[
    decl("function_declaration", EntityKind::Function, NAME),
    decl("generator_function_declaration", EntityKind::Function, NAME),
    decl("method_definition", EntityKind::Function, NAME),
    decl("variable_declarator", EntityKind::Function, NameRule::BoundFunction),
    decl("class_declaration", EntityKind::Class, NAME),
    decl("abstract_class_declaration", EntityKind::Class, NAME),
    decl("interface_declaration", EntityKind::Interface, NAME),
    decl("enum_declaration", EntityKind::Enum, NAME),
];

const GO: &[Declaration] = &[
    decl("function_declaration", EntityKind::Function, NAME),
    decl("method_declaration", EntityKind::Function, NAME),
    decl("type_spec", EntityKind::Struct, NameRule::GoTypeSpec("struct_type")),
    decl(
        "type_spec",
        EntityKind::Interface,
        NameRule::GoTypeSpec("interface_type"),
    ),
];

const JAVA: &[Declaration] = &[
    decl("method_declaration", EntityKind::Function, NAME),
    decl("constructor_declaration", EntityKind::Function, NAME),
    decl("class_declaration", EntityKind::Class, NAME),
    decl("record_declaration", EntityKind::Class, NAME),
    decl("interface_declaration", EntityKind::Interface, NAME),
    decl("enum_declaration", EntityKind::Enum, NAME),
];

const C: &[Declaration] = &[
    decl("function_definition", EntityKind::Function, NameRule::Declarator),
    decl("struct_specifier", EntityKind::Struct, NameRule::SpecifierWithBody),
    decl("enum_specifier", EntityKind::Enum, NameRule::SpecifierWithBody),
];

const CPP: &[Declaration] = &[
    decl("function_definition", EntityKind::Function, NameRule::Declarator),
    decl("class_specifier", EntityKind::Class, NameRule::SpecifierWithBody),
    decl("struct_specifier", EntityKind::Struct, NameRule::SpecifierWithBody),
    decl("enum_specifier", EntityKind::Enum, NameRule::SpecifierWithBody),
];

const CSHARP: &[Declaration] = &[
    decl("method_declaration", EntityKind::Function, NAME),
    decl("constructor_declaration", EntityKind::Function, NAME),
    decl("class_declaration", EntityKind::Class, NAME),
    decl("record_declaration", EntityKind::Class, NAME),
    decl("struct_declaration", EntityKind::Struct, NAME),
    decl("interface_declaration", EntityKind::Interface, NAME),
    decl("enum_declaration", EntityKind::Enum, NAME),
];

fn grammar(language: Language) -> Option<(tree_sitter::Language, &'static [Declaration])> {
    Some(match language {
        Language::Rust => (tree_sitter_rust::LANGUAGE.into(), RUST),
        Language::JavaScript => (tree_sitter_javascript::LANGUAGE.into(), JAVASCRIPT),
        Language::TypeScript => (
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            TYPESCRIPT,
        ),
        Language::Tsx => (tree_sitter_typescript::LANGUAGE_TSX.into(), TYPESCRIPT),
        Language::Go => (tree_sitter_go::LANGUAGE.into(), GO),
        Language::Java => (tree_sitter_java::LANGUAGE.into(), JAVA),
        Language::C => (tree_sitter_c::LANGUAGE.into(), C),
        Language::Cpp => (tree_sitter_cpp::LANGUAGE.into(), CPP),
        Language::CSharp => (tree_sitter_c_sharp::LANGUAGE.into(), CSHARP),
        Language::Python | Language::Ruby => return None,
    })
}

/// A declaration node that matched the table.
struct Candidate<'t> {
    node: Node<'t>,
    depth: usize,
    decl: Declaration,
    name: String,
}

/// Locate a declaration of `kind` named `name`.
pub(crate) fn locate(source: &str, name: &str, kind: EntityKind, language: Language) -> Lookup {
    let Some((ts_language, table)) = grammar(language) else {
        return Lookup::Missing;
    };
    if !table.iter().any(|d| d.kind == kind) {
        return Lookup::Missing;
    }
    let Some(tree) = parse(&ts_language, source) else {
        return Lookup::Missing;
    };

    let source_bytes = source.as_bytes();
    let best = candidates(&tree, source_bytes, table)
        .into_iter()
        .filter(|c| c.decl.kind == kind && c.name == name)
        .min_by_key(|c| (c.depth, c.node.start_byte()));

    match best {
        Some(candidate) => Lookup::Found(to_span(&candidate, source_bytes, table)),
        None => Lookup::Missing,
    }
}

/// Every declaration the table recognizes.
pub(crate) fn list(source: &str, language: Language) -> Vec<EntitySpan> {
    let Some((ts_language, table)) = grammar(language) else {
        return Vec::new();
    };
    let Some(tree) = parse(&ts_language, source) else {
        return Vec::new();
    };
    let source_bytes = source.as_bytes();
    candidates(&tree, source_bytes, table)
        .iter()
        .map(|c| to_span(c, source_bytes, table))
        .collect()
}

fn parse(language: &tree_sitter::Language, source: &str) -> Option<Tree> {
    let mut parser = Parser::new();
    parser.set_language(language).ok()?;
    parser.parse(source, None)
}

fn candidates<'t>(tree: &'t Tree, source: &[u8], table: &[Declaration]) -> Vec<Candidate<'t>> {
    let mut found = Vec::new();
    walk(tree.root_node(), |node, depth| {
        for decl in table.iter().filter(|d| d.node_kind == node.kind()) {
            if let Some(name) = declared_name(&node, source, decl.name) {
                found.push(Candidate {
                    node,
                    depth,
                    decl: *decl,
                    name: name.to_string(),
                });
            }
        }
    });
    found
}

/// Pre-order traversal with depth.
fn walk<'t>(root: Node<'t>, mut visit: impl FnMut(Node<'t>, usize)) {
    let mut cursor = root.walk();
    let mut depth = 0;
    loop {
        visit(cursor.node(), depth);
        if cursor.goto_first_child() {
            depth += 1;
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
            depth -= 1;
        }
    }
}

fn declared_name<'s>(node: &Node, source: &'s [u8], rule: NameRule) -> Option<&'s str> {
    let name_node = match rule {
        NameRule::Field(field) => node.child_by_field_name(field)?,
        NameRule::ImplType => {
            let mut ty = node.child_by_field_name("type")?;
            if ty.kind() == "generic_type" {
                ty = ty.child_by_field_name("type")?;
            }
            if ty.kind() == "scoped_type_identifier" {
                ty = ty.child_by_field_name("name")?;
            }
            ty
        }
        NameRule::GoTypeSpec(type_kind) => {
            if node.child_by_field_name("type")?.kind() != type_kind {
                return None;
            }
            node.child_by_field_name("name")?
        }
        NameRule::Declarator => return declarator_name(node.child_by_field_name("declarator")?, source),
        NameRule::SpecifierWithBody => {
            node.child_by_field_name("body")?;
            node.child_by_field_name("name")?
        }
        NameRule::BoundFunction => {
            let value = node.child_by_field_name("value")?;
            if !matches!(
                value.kind(),
                "arrow_function" | "function_expression" | "function" | "generator_function"
            ) {
                return None;
            }
            node.child_by_field_name("name")?
        }
    };
    name_node.utf8_text(source).ok()
}

/// Walk `*name`, `&name`, `name(...)` and `ns::name` down to the identifier.
fn declarator_name<'t, 's>(mut node: Node<'t>, source: &'s [u8]) -> Option<&'s str> {
    loop {
        match node.kind() {
            "identifier" | "field_identifier" | "type_identifier" | "destructor_name"
            | "operator_name" => return node.utf8_text(source).ok(),
            "qualified_identifier" => node = node.child_by_field_name("name")?,
            _ => {
                let next = match node.child_by_field_name("declarator") {
                    Some(inner) => inner,
                    None => {
                        let mut cursor = node.walk();
                        let last = node.named_children(&mut cursor).last()?;
                        last
                    }
                };
                node = next;
            }
        }
    }
}

/// The node whose lines make up the entity: a lone Go type spec or JS
/// declarator is widened to its enclosing declaration statement.
fn span_node<'t>(node: Node<'t>, rule: NameRule) -> Node<'t> {
    let wrapper = match rule {
        NameRule::GoTypeSpec(_) => "type_declaration",
        NameRule::BoundFunction => "declaration",
        _ => return node,
    };
    match node.parent() {
        Some(parent) if holds_single_declarator(&parent, wrapper) => parent,
        _ => node,
    }
}

/// `const f = () => {}` parses as a `lexical_declaration` holding exactly one
/// declarator; `const a = 1, f = () => {}` keeps the declarator's own span.
fn holds_single_declarator(parent: &Node, wrapper: &str) -> bool {
    if !parent.kind().ends_with(wrapper) {
        return false;
    }
    let mut cursor = parent.walk();
    let count = parent
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "variable_declarator" || c.kind() == "type_spec")
        .count();
    count == 1
}

fn to_span(candidate: &Candidate, source: &[u8], table: &[Declaration]) -> EntitySpan {
    let node = span_node(candidate.node, candidate.decl.name);
    EntitySpan {
        name: candidate.name.clone(),
        kind: candidate.decl.kind,
        start_line: node.start_position().row as u32 + 1,
        end_line: node.end_position().row as u32 + 1,
        signature: signature(&node, &candidate.node, source),
        parent: enclosing_declaration(&candidate.node, source, table),
    }
}

/// Declaration text up to its body, on one line.
fn signature(span_node: &Node, decl_node: &Node, source: &[u8]) -> String {
    let body_start = decl_node
        .child_by_field_name("body")
        .or_else(|| {
            decl_node
                .child_by_field_name("value")
                .and_then(|v| v.child_by_field_name("body"))
        })
        .map(|body| body.start_byte());

    let text = &source[span_node.start_byte()..span_node.end_byte()];
    let text = String::from_utf8_lossy(text);
    let head = match body_start {
        Some(end) if end > span_node.start_byte() => {
            let cut = (end - span_node.start_byte()).min(text.len());
            text.get(..cut).unwrap_or(&text).to_string()
        }
        _ => match text.find('{') {
            Some(brace) => text[..brace].to_string(),
            None => text.lines().next().unwrap_or("").to_string(),
        },
    };
    collapse_whitespace(&head)
}

/// Name of the nearest enclosing table declaration (impl, class, ...).
fn enclosing_declaration(node: &Node, source: &[u8], table: &[Declaration]) -> Option<String> {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        for decl in table.iter().filter(|d| d.node_kind == ancestor.kind()) {
            if let Some(name) = declared_name(&ancestor, source, decl.name) {
                return Some(name.to_string());
            }
        }
        current = ancestor.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(lookup: Lookup) -> EntitySpan {
        match lookup {
            Lookup::Found(span) => span,
            other => panic!("expected a span, got {:?}", other),
        }
    }

    #[test]
    fn test_rust_impl_generic_type() {
        let source = "struct Wrapper<T>(T);\n\nimpl<T: Debug> Display for Wrapper<T> {\n    fn fmt(&self, f: &mut Formatter) -> Result {\n        todo!()\n    }\n}\n";
        let span = found(locate(source, "Wrapper", EntityKind::Impl, Language::Rust));
        assert_eq!((span.start_line, span.end_line), (3, 7));
        assert_eq!(span.signature, "impl<T: Debug> Display for Wrapper<T>");

        let method = found(locate(source, "fmt", EntityKind::Function, Language::Rust));
        assert_eq!(method.parent.as_deref(), Some("Wrapper"));
        assert_eq!(
            method.signature,
            "fn fmt(&self, f: &mut Formatter) -> Result"
        );
    }

    #[test]
    fn test_rust_trait_is_interface() {
        let source = "pub trait Backend {\n    fn name(&self) -> &str;\n}\n";
        let span = found(locate(source, "Backend", EntityKind::Interface, Language::Rust));
        assert_eq!((span.start_line, span.end_line), (1, 3));
    }

    #[test]
    fn test_go_struct_and_method() {
        let source = "package geo\n\ntype Point struct {\n\tX int\n\tY int\n}\n\nfunc (p *Point) Norm() int {\n\treturn p.X\n}\n";
        let span = found(locate(source, "Point", EntityKind::Struct, Language::Go));
        assert_eq!((span.start_line, span.end_line), (3, 6));
        assert_eq!(span.signature, "type Point struct");

        let method = found(locate(source, "Norm", EntityKind::Function, Language::Go));
        assert_eq!((method.start_line, method.end_line), (8, 10));
        assert_eq!(method.signature, "func (p *Point) Norm() int");

        assert_eq!(
            locate(source, "Point", EntityKind::Interface, Language::Go),
            Lookup::Missing
        );
    }

    #[test]
    fn test_typescript_arrow_function_and_interface() {
        let source = "interface Shape {\n  area(): number;\n}\n\nexport const add = (a: number, b: number): number => {\n  return a + b;\n};\n";
        let iface = found(locate(source, "Shape", EntityKind::Interface, Language::TypeScript));
        assert_eq!((iface.start_line, iface.end_line), (1, 3));

        let add = found(locate(source, "add", EntityKind::Function, Language::TypeScript));
        assert_eq!((add.start_line, add.end_line), (5, 7));
        assert_eq!(add.signature, "const add = (a: number, b: number): number =>");
    }

    #[test]
    fn test_java_method_parent() {
        let source = "public class Greeter {\n    public String greet(String name) {\n        return name;\n    }\n}\n";
        let method = found(locate(source, "greet", EntityKind::Function, Language::Java));
        assert_eq!((method.start_line, method.end_line), (2, 4));
        assert_eq!(method.parent.as_deref(), Some("Greeter"));
        assert_eq!(method.signature, "public String greet(String name)");
    }

    #[test]
    fn test_c_pointer_function_and_struct() {
        let source = "struct point {\n  int x;\n};\n\nchar *name_of(struct point *p) {\n  return 0;\n}\n";
        let func = found(locate(source, "name_of", EntityKind::Function, Language::C));
        assert_eq!((func.start_line, func.end_line), (5, 7));
        let st = found(locate(source, "point", EntityKind::Struct, Language::C));
        assert_eq!((st.start_line, st.end_line), (1, 3));
    }

    #[test]
    fn test_cpp_qualified_method() {
        let source = "int Widget::size() const {\n  return n;\n}\n";
        let func = found(locate(source, "size", EntityKind::Function, Language::Cpp));
        assert_eq!((func.start_line, func.end_line), (1, 3));
    }

    #[test]
    fn test_kind_absent_from_table() {
        assert_eq!(
            locate("fn a() {}\n", "a", EntityKind::Class, Language::Rust),
            Lookup::Missing
        );
    }

    #[test]
    fn test_list_rust() {
        let source = "struct A;\nimpl A {\n    fn new() -> Self { A }\n}\n";
        let names: Vec<(String, EntityKind)> = list(source, Language::Rust)
            .into_iter()
            .map(|s| (s.name, s.kind))
            .collect();
        assert_eq!(
            names,
            vec![
                ("A".to_string(), EntityKind::Struct),
                ("A".to_string(), EntityKind::Impl),
                ("new".to_string(), EntityKind::Function),
            ]
        );
    }
}
