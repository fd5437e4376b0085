//! Last-resort, line-based entity lookup
//!
//! A per-language regex finds the declaration line, then a pure scanner
//! walks forward to where the declaration ends: brace depth for C-like
//! languages, indentation for Python and Ruby.

use regex::Regex;

use crate::config::Language;
use crate::models::{EntityKind, EntitySpan};

/// How a language delimits blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStyle {
    Braces,
    Indent,
    /// Indentation, with a closing `end` line at the declaration's level
    IndentWithEnd,
}

impl BlockStyle {
    pub fn for_language(language: Language) -> Self {
        match language {
            Language::Python => BlockStyle::Indent,
            Language::Ruby => BlockStyle::IndentWithEnd,
            _ => BlockStyle::Braces,
        }
    }
}

/// Where a declaration ends (0-indexed line).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockEnd {
    Block(usize),
    /// A `;` came before any `{`: a call, prototype or unit declaration
    Statement(usize),
}

impl BlockEnd {
    pub fn line(&self) -> usize {
        match self {
            BlockEnd::Block(line) | BlockEnd::Statement(line) => *line,
        }
    }
}

/// Find the last line of the declaration starting at `start`.
///
/// Braces: the line where depth returns to zero after the first `{`; if the
/// file ends first, the last line. Indentation: the last non-blank,
/// non-comment line before the first line indented at or below the
/// declaration (for `IndentWithEnd`, a closing `end` there is included).
pub fn find_block_end(lines: &[&str], start: usize, style: BlockStyle) -> BlockEnd {
    if start >= lines.len() {
        return BlockEnd::Block(start);
    }
    match style {
        BlockStyle::Braces => brace_end(lines, start),
        BlockStyle::Indent => BlockEnd::Block(indent_end(lines, start, false)),
        BlockStyle::IndentWithEnd => BlockEnd::Block(indent_end(lines, start, true)),
    }
}

fn brace_end(lines: &[&str], start: usize) -> BlockEnd {
    let mut depth = 0i32;
    let mut nesting = 0i32;
    let mut opened = false;

    for (i, line) in lines.iter().enumerate().skip(start) {
        for c in line.chars() {
            match c {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => depth -= 1,
                '(' | '[' => nesting += 1,
                ')' | ']' => nesting -= 1,
                ';' if !opened && nesting <= 0 => return BlockEnd::Statement(i),
                _ => {}
            }
        }
        if opened && depth <= 0 {
            return BlockEnd::Block(i);
        }
    }
    BlockEnd::Block(lines.len() - 1)
}

fn indent_end(lines: &[&str], start: usize, closes_with_end: bool) -> usize {
    let base = indent_width(lines[start]);
    let header = header_end(lines, start);
    let mut last_body = header;

    for (i, line) in lines.iter().enumerate().skip(header + 1) {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if indent_width(line) <= base {
            if closes_with_end {
                if starts_with_keyword(trimmed, "end") {
                    return i;
                }
                if ["rescue", "ensure", "else", "elsif", "when"]
                    .iter()
                    .any(|kw| starts_with_keyword(trimmed, kw))
                {
                    last_body = i;
                    continue;
                }
            }
            return last_body;
        }
        last_body = i;
    }
    last_body
}

/// Last line of a declaration header whose brackets span several lines.
fn header_end(lines: &[&str], start: usize) -> usize {
    let mut depth = 0i32;
    for (i, line) in lines.iter().enumerate().skip(start) {
        for c in line.chars() {
            match c {
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth -= 1,
                _ => {}
            }
        }
        if depth <= 0 {
            return i;
        }
    }
    start
}

fn indent_width(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn starts_with_keyword(text: &str, keyword: &str) -> bool {
    text.strip_prefix(keyword).is_some_and(|rest| {
        !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_')
    })
}

/// Declaration regex for `kind` in `language`; `name` is a regex fragment,
/// either an escaped literal or a capture group.
fn pattern(language: Language, kind: EntityKind, name: &str) -> Option<String> {
    use EntityKind::*;
    use Language::*;

    let pattern = match (kind, language) {
        (Function, Python) => format!(r"^\s*(?:async\s+)?def\s+{name}\s*\("),
        (Function, Ruby) => format!(r"^\s*def\s+(?:self\.)?{name}(?:[\s(;]|$)"),
        (Function, JavaScript) => format!(
            r"(?:\bfunction\s*\*?\s*{name}\s*\(|\b(?:const|let|var)\s+{name}\s*=\s*(?:async\s*)?(?:\(|function\b|\w+\s*=>)|^\s*(?:async\s+)?{name}\s*\([^)]*\)\s*\{{)"
        ),
        (Function, TypeScript | Tsx) => format!(
            r"(?:\bfunction\s*\*?\s*{name}\s*[<(]|\b(?:const|let|var)\s+{name}\s*(?::[^=]+)?=\s*(?:async\s*)?(?:\(|function\b|\w+\s*=>)|^\s*(?:(?:public|private|protected|static|async|readonly)\s+)*{name}\s*(?:<[^>]*>)?\([^)]*\)\s*(?::\s*[^{{]+)?\{{)"
        ),
        (Function, Go) => format!(r"^\s*func\s+(?:\([^)]*\)\s*)?{name}\s*[(\[]"),
        (Function, Rust) => format!(r"\bfn\s+{name}\s*[<(]"),
        (Function, Java | CSharp) => format!(
            r"^\s*(?:(?:public|private|protected|internal|static|final|abstract|synchronized|override|virtual|async|sealed|extern|unsafe)\s+)*[\w<>\[\],.?]+\s+{name}\s*\("
        ),
        (Function, C) => format!(r"^\s*(?:[\w*]+\s+)+\**{name}\s*\("),
        (Function, Cpp) => format!(r"^\s*(?:[\w:<>,*&~]+\s+)*[*&]*(?:\w+::)*~?{name}\s*\("),

        (Class, Python) => format!(r"^\s*class\s+{name}\s*[(:]"),
        (Class, Ruby) => format!(r"^\s*(?:class|module)\s+{name}(?:[\s<;]|$)"),
        (Class, JavaScript | TypeScript | Tsx | Java | CSharp | Cpp) => {
            format!(r"\bclass\s+{name}\b")
        }

        (Struct, Rust | C | Cpp | CSharp) => format!(r"\bstruct\s+{name}\b"),
        (Struct, Go) => format!(r"^\s*type\s+{name}\s+struct\b"),

        (Enum, Rust | TypeScript | Tsx | Java | CSharp | C | Cpp) => {
            format!(r"\benum\s+(?:class\s+|struct\s+)?{name}\b")
        }

        (Interface, TypeScript | Tsx | Java | CSharp) => format!(r"\binterface\s+{name}\b"),
        (Interface, Go) => format!(r"^\s*type\s+{name}\s+interface\b"),
        (Interface, Rust) => format!(r"\btrait\s+{name}\b"),

        (Impl, Rust) => format!(
            r"^\s*(?:unsafe\s+)?impl\b(?:<[^{{]*?>)?\s+(?:[^{{]*?\bfor\s+)?(?:\w+::)*{name}\b"
        ),

        _ => return None,
    };
    Some(pattern)
}

/// Single-line declarations that still count as entities.
fn accepts_statement(language: Language, kind: EntityKind) -> bool {
    matches!(
        (language, kind),
        (Language::Rust, EntityKind::Struct)
            | (
                Language::JavaScript | Language::TypeScript | Language::Tsx,
                EntityKind::Function
            )
    )
}

fn is_comment(line: &str, language: Language) -> bool {
    let trimmed = line.trim_start();
    if language.is_indentation_based() {
        trimmed.starts_with('#')
    } else {
        trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*')
    }
}

/// `impl Trait for Type`: the name matched the trait, not the type.
fn names_trait(line: &str, match_end: usize) -> bool {
    let rest = &line[match_end..];
    let rest = rest.split('{').next().unwrap_or(rest);
    rest.split_whitespace().any(|token| token == "for")
}

fn signature(line: &str) -> String {
    line.trim().trim_end_matches('{').trim_end().to_string()
}

/// Locate the first declaration of `name` as `kind`.
pub fn locate(source: &str, name: &str, kind: EntityKind, language: Language) -> Option<EntitySpan> {
    let regex = Regex::new(&pattern(language, kind, &regex::escape(name))?).ok()?;
    let lines: Vec<&str> = source.lines().collect();
    let style = BlockStyle::for_language(language);

    for (i, line) in lines.iter().enumerate() {
        if is_comment(line, language) {
            continue;
        }
        let Some(m) = regex.find(line) else {
            continue;
        };
        if kind == EntityKind::Impl && names_trait(line, m.end()) {
            continue;
        }
        let end = match find_block_end(&lines, i, style) {
            BlockEnd::Statement(_) if !accepts_statement(language, kind) => continue,
            end => end.line(),
        };
        return Some(EntitySpan {
            name: name.to_string(),
            kind,
            start_line: i as u32 + 1,
            end_line: end as u32 + 1,
            signature: signature(line),
            parent: None,
        });
    }
    None
}

/// Every declaration the patterns recognize, one per line.
pub fn list(source: &str, language: Language) -> Vec<EntitySpan> {
    let capture = if language == Language::Ruby {
        r"(\w+[?!]?)"
    } else {
        r"(\w+)"
    };
    let patterns: Vec<(EntityKind, Regex)> = EntityKind::AUTO_ORDER
        .iter()
        .filter_map(|kind| {
            let regex = Regex::new(&pattern(language, *kind, capture)?).ok()?;
            Some((*kind, regex))
        })
        .collect();

    let lines: Vec<&str> = source.lines().collect();
    let style = BlockStyle::for_language(language);
    let mut spans = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if is_comment(line, language) {
            continue;
        }
        for (kind, regex) in &patterns {
            let Some(caps) = regex.captures(line) else {
                continue;
            };
            let Some(name) = caps.iter().skip(1).flatten().next() else {
                continue;
            };
            let end = match find_block_end(&lines, i, style) {
                BlockEnd::Statement(_) if !accepts_statement(language, *kind) => continue,
                end => end.line(),
            };
            spans.push(EntitySpan {
                name: name.as_str().to_string(),
                kind: *kind,
                start_line: i as u32 + 1,
                end_line: end as u32 + 1,
                signature: signature(line),
                parent: None,
            });
            break;
        }
    }
    spans
}
