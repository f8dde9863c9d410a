//! Language profiles
//!
//! A language is described by data, not code: a [`LanguageSyntax`] record
//! tells the lexer which characters open comments and strings and which
//! words play which structural role. Built-in languages ship as an embedded
//! YAML table with the same shape as the `languages` section of a config
//! file, so adding a language is a configuration change.

use crate::adapter::{adapter_for, LanguageAdapter};
use crate::config::{ConfigError, LanguageOverride};
use crate::model::Visibility;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

const BUILTIN_LANGUAGES: &str = include_str!("builtin.yaml");

/// How a language delimits blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStyle {
    #[default]
    Brace,
    Indent,
}

/// Words grouped by the structural role they play
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Keywords {
    pub conditional: Vec<String>,
    /// Keywords that continue a preceding construct (`else`, `catch`, ...)
    pub continuation: Vec<String>,
    pub loops: Vec<String>,
    #[serde(rename = "try")]
    pub try_blocks: Vec<String>,
    pub switch: Vec<String>,
    /// Keywords that declare a class-like type
    pub class: Vec<String>,
    /// Keywords that open a class-like body without declaring a type (`impl`)
    pub extension: Vec<String>,
    /// Keywords introducing a function (`fn`, `def`, `function`)
    pub method: Vec<String>,
    /// Keywords directly followed by a bound name (`let`, `val`)
    pub binding: Vec<String>,
    pub modifiers: Vec<String>,
    pub public: Vec<String>,
    pub protected: Vec<String>,
    pub private: Vec<String>,
    pub returns: Vec<String>,
    pub booleans: Vec<String>,
    /// Word spellings of logical operators (`and`, `or`)
    pub logical: Vec<String>,
    /// Other reserved words
    pub reserved: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

impl Default for Keywords {
    fn default() -> Self {
        Self {
            conditional: words(&["if", "else"]),
            continuation: words(&["else", "catch", "finally"]),
            loops: words(&["for", "while", "do"]),
            try_blocks: words(&["try", "catch", "finally"]),
            switch: words(&["switch"]),
            class: words(&["class", "interface", "struct", "enum"]),
            extension: Vec::new(),
            method: Vec::new(),
            binding: Vec::new(),
            modifiers: words(&[
                "static",
                "final",
                "abstract",
                "const",
                "virtual",
                "override",
                "readonly",
                "async",
                "sealed",
                "synchronized",
                "volatile",
                "transient",
                "native",
                "inline",
                "extern",
            ]),
            public: words(&["public"]),
            protected: words(&["protected"]),
            private: words(&["private"]),
            returns: words(&["return"]),
            booleans: words(&["true", "false"]),
            logical: Vec::new(),
            reserved: words(&[
                "new",
                "this",
                "null",
                "break",
                "continue",
                "throw",
                "throws",
                "case",
                "default",
                "goto",
                "import",
                "package",
                "extends",
                "implements",
                "instanceof",
            ]),
        }
    }
}

impl Keywords {
    /// Every word that lexes as a keyword
    pub fn all(&self) -> impl Iterator<Item = &str> {
        [
            &self.conditional,
            &self.continuation,
            &self.loops,
            &self.try_blocks,
            &self.switch,
            &self.class,
            &self.extension,
            &self.method,
            &self.binding,
            &self.modifiers,
            &self.public,
            &self.protected,
            &self.private,
            &self.returns,
            &self.logical,
            &self.reserved,
        ]
        .into_iter()
        .flatten()
        .map(String::as_str)
    }

    /// Visibility named by a keyword, if it is one
    pub fn visibility(&self, word: &str) -> Option<Visibility> {
        if contains(&self.public, word) {
            Some(Visibility::Public)
        } else if contains(&self.protected, word) {
            Some(Visibility::Protected)
        } else if contains(&self.private, word) {
            Some(Visibility::Private)
        } else {
            None
        }
    }
}

/// Membership test for keyword lists
pub fn contains(list: &[String], word: &str) -> bool {
    list.iter().any(|w| w == word)
}

/// Lexical and structural description of one language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageSyntax {
    /// Language identifier (filled from the profile key)
    pub id: String,
    /// File extensions without the dot
    pub extensions: Vec<String>,
    pub block_style: BlockStyle,
    /// Whether `if`/`for`/`while` bodies may omit braces
    pub braces_optional: bool,
    /// Functions are only declared with a method keyword (`fn`, `func`)
    pub keyword_functions: bool,
    /// Typed declarations put the name before the type (`count int`)
    pub name_first: bool,
    pub line_comments: Vec<String>,
    pub block_comments: Vec<(String, String)>,
    /// Single-line string quotes
    pub quotes: Vec<String>,
    /// String markers that may span lines
    pub multiline_quotes: Vec<String>,
    /// Quote for one-character literals where the same character has other
    /// uses (Rust lifetimes)
    pub char_quote: Option<String>,
    /// Operators that introduce a lambda body
    pub lambda_arrows: Vec<String>,
    /// Method names that denote a constructor
    pub constructor_names: Vec<String>,
    pub default_visibility: Visibility,
    /// Leading `_`/`__` mark protected/private names
    pub underscore_visibility: bool,
    pub keywords: Keywords,
}

impl Default for LanguageSyntax {
    fn default() -> Self {
        Self {
            id: String::new(),
            extensions: Vec::new(),
            block_style: BlockStyle::Brace,
            braces_optional: true,
            keyword_functions: false,
            name_first: false,
            line_comments: words(&["//"]),
            block_comments: vec![("/*".to_string(), "*/".to_string())],
            quotes: words(&["\"", "'"]),
            multiline_quotes: Vec::new(),
            char_quote: None,
            lambda_arrows: Vec::new(),
            constructor_names: Vec::new(),
            default_visibility: Visibility::Unspecified,
            underscore_visibility: false,
            keywords: Keywords::default(),
        }
    }
}

impl LanguageSyntax {
    pub fn is_constructor_name(&self, name: &str) -> bool {
        contains(&self.constructor_names, name)
    }

    /// Visibility implied by a name under the underscore convention
    pub fn name_visibility(&self, name: &str) -> Option<Visibility> {
        if !self.underscore_visibility {
            return None;
        }
        if name.starts_with("__") && !name.ends_with("__") {
            Some(Visibility::Private)
        } else if name.starts_with('_') && !name.ends_with("__") {
            Some(Visibility::Protected)
        } else {
            None
        }
    }
}

/// Parse the embedded built-in profile table
pub fn builtin_profiles() -> Result<BTreeMap<String, LanguageOverride>, ConfigError> {
    let profiles: BTreeMap<String, LanguageOverride> = serde_yaml::from_str(BUILTIN_LANGUAGES)?;
    Ok(profiles)
}

/// Adapters keyed by language id and by file extension
#[derive(Clone, Default)]
pub struct LanguageRegistry {
    adapters: BTreeMap<String, Arc<dyn LanguageAdapter>>,
    by_extension: HashMap<String, String>,
}

impl std::fmt::Debug for LanguageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageRegistry")
            .field("languages", &self.adapters.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding only the built-in languages
    pub fn builtin() -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for (id, profile) in builtin_profiles()? {
            if let Some(syntax) = profile.syntax {
                registry.register(&id, syntax);
            }
        }
        Ok(registry)
    }

    /// Register (or replace) a language
    pub fn register(&mut self, id: &str, mut syntax: LanguageSyntax) {
        syntax.id = id.to_string();
        self.by_extension.retain(|_, lang| lang != id);
        for ext in &syntax.extensions {
            self.by_extension
                .insert(ext.trim_start_matches('.').to_lowercase(), id.to_string());
        }
        self.adapters.insert(id.to_string(), adapter_for(syntax));
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn LanguageAdapter>> {
        self.adapters.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.adapters.contains_key(id)
    }

    /// Detect the language of a file from its extension
    pub fn for_path(&self, path: &Path) -> Option<Arc<dyn LanguageAdapter>> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        let id = self.by_extension.get(&ext)?;
        self.get(id)
    }

    /// Language ids in sorted order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }
}
