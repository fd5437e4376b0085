//! Language detection from file extensions.
//!
//! The table is built once (defaults plus any `[languages]` overrides from
//! config) and handed to the locator by reference.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

/// Languages the locator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Tsx,
    Go,
    Rust,
    Java,
    C,
    Cpp,
    CSharp,
    Ruby,
}

impl Language {
    pub const ALL: [Language; 11] = [
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Tsx,
        Language::Go,
        Language::Rust,
        Language::Java,
        Language::C,
        Language::Cpp,
        Language::CSharp,
        Language::Ruby,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Tsx => "tsx",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Ruby => "ruby",
        }
    }

    /// Whether blocks are delimited by indentation rather than braces.
    pub fn is_indentation_based(&self) -> bool {
        matches!(self, Language::Python | Language::Ruby)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Language::ALL
            .into_iter()
            .find(|lang| lang.as_str() == lower)
            .or(match lower.as_str() {
                "js" => Some(Language::JavaScript),
                "ts" => Some(Language::TypeScript),
                "c++" => Some(Language::Cpp),
                "c#" | "cs" => Some(Language::CSharp),
                _ => None,
            })
            .ok_or_else(|| format!("unknown language '{}'", s))
    }
}

const DEFAULT_EXTENSIONS: &[(&str, Language)] = &[
    ("py", Language::Python),
    ("pyi", Language::Python),
    ("js", Language::JavaScript),
    ("jsx", Language::JavaScript),
    ("mjs", Language::JavaScript),
    ("cjs", Language::JavaScript),
    ("ts", Language::TypeScript),
    ("tsx", Language::Tsx),
    ("go", Language::Go),
    ("rs", Language::Rust),
    ("java", Language::Java),
    ("c", Language::C),
    ("h", Language::C),
    ("cpp", Language::Cpp),
    ("cc", Language::Cpp),
    ("cxx", Language::Cpp),
    ("hpp", Language::Cpp),
    ("hh", Language::Cpp),
    ("hxx", Language::Cpp),
    ("cs", Language::CSharp),
    ("rb", Language::Ruby),
];

/// Extension -> language map.
#[derive(Debug, Clone)]
pub struct LanguageTable {
    by_extension: HashMap<String, Language>,
}

impl Default for LanguageTable {
    fn default() -> Self {
        Self {
            by_extension: DEFAULT_EXTENSIONS
                .iter()
                .map(|(ext, lang)| (ext.to_string(), *lang))
                .collect(),
        }
    }
}

impl LanguageTable {
    /// Defaults plus user mappings (`"ext" -> "language"`). Mappings naming an
    /// unknown language are ignored.
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut table = Self::default();
        for (ext, name) in overrides {
            match name.parse::<Language>() {
                Ok(lang) => {
                    table
                        .by_extension
                        .insert(ext.trim_start_matches('.').to_lowercase(), lang);
                }
                Err(e) => warn!("Ignoring language mapping for .{}: {}", ext, e),
            }
        }
        table
    }

    /// Detect the language of `path` from its extension.
    pub fn detect(&self, path: &str) -> Option<Language> {
        let ext = Path::new(path).extension()?.to_str()?.to_lowercase();
        self.by_extension.get(&ext).copied()
    }

    /// All known extensions, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.by_extension.keys().map(|s| s.as_str()).collect();
        exts.sort_unstable();
        exts
    }
}
