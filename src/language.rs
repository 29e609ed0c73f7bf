//! Explanation languages and per-document comment syntax.
//!
//! Two unrelated notions of "language" live here:
//! - `TargetLanguage`: the natural language explanations are written in
//! - `CommentSyntax`: how a comment is written in the document's programming language

use phf::phf_map;
use serde::{Deserialize, Serialize};

/// Natural language the explanation service answers in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TargetLanguage {
    #[default]
    English,
    Korean,
    Japanese,
    #[serde(rename = "Chinese (Simplified)")]
    ChineseSimplified,
    #[serde(rename = "Chinese (Traditional)")]
    ChineseTraditional,
    Spanish,
    French,
    German,
    Portuguese,
    Russian,
    Italian,
    Arabic,
    Hindi,
    Vietnamese,
    Thai,
}

impl TargetLanguage {
    /// Every supported language, in menu order.
    pub const ALL: [TargetLanguage; 15] = [
        TargetLanguage::English,
        TargetLanguage::Korean,
        TargetLanguage::Japanese,
        TargetLanguage::ChineseSimplified,
        TargetLanguage::ChineseTraditional,
        TargetLanguage::Spanish,
        TargetLanguage::French,
        TargetLanguage::German,
        TargetLanguage::Portuguese,
        TargetLanguage::Russian,
        TargetLanguage::Italian,
        TargetLanguage::Arabic,
        TargetLanguage::Hindi,
        TargetLanguage::Vietnamese,
        TargetLanguage::Thai,
    ];

    /// The name sent to the service in the `language` request field.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetLanguage::English => "English",
            TargetLanguage::Korean => "Korean",
            TargetLanguage::Japanese => "Japanese",
            TargetLanguage::ChineseSimplified => "Chinese (Simplified)",
            TargetLanguage::ChineseTraditional => "Chinese (Traditional)",
            TargetLanguage::Spanish => "Spanish",
            TargetLanguage::French => "French",
            TargetLanguage::German => "German",
            TargetLanguage::Portuguese => "Portuguese",
            TargetLanguage::Russian => "Russian",
            TargetLanguage::Italian => "Italian",
            TargetLanguage::Arabic => "Arabic",
            TargetLanguage::Hindi => "Hindi",
            TargetLanguage::Vietnamese => "Vietnamese",
            TargetLanguage::Thai => "Thai",
        }
    }

    /// The language's name written in that language.
    pub fn native_name(&self) -> &'static str {
        match self {
            TargetLanguage::English => "English",
            TargetLanguage::Korean => "한국어",
            TargetLanguage::Japanese => "日本語",
            TargetLanguage::ChineseSimplified => "简体中文",
            TargetLanguage::ChineseTraditional => "繁體中文",
            TargetLanguage::Spanish => "Español",
            TargetLanguage::French => "Français",
            TargetLanguage::German => "Deutsch",
            TargetLanguage::Portuguese => "Português",
            TargetLanguage::Russian => "Русский",
            TargetLanguage::Italian => "Italiano",
            TargetLanguage::Arabic => "العربية",
            TargetLanguage::Hindi => "हिन्दी",
            TargetLanguage::Vietnamese => "Tiếng Việt",
            TargetLanguage::Thai => "ไทย",
        }
    }
}

impl std::fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TargetLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        TargetLanguage::ALL
            .iter()
            .copied()
            .find(|lang| {
                lang.as_str().eq_ignore_ascii_case(wanted) || lang.native_name() == wanted
            })
            .ok_or_else(|| format!("unknown language: {}", s))
    }
}

/// How a single-line comment is written in a programming language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentSyntax {
    pub prefix: &'static str,
    /// Closing marker for languages without line comments (empty otherwise)
    pub suffix: &'static str,
}

const SLASHES: CommentSyntax = CommentSyntax {
    prefix: "//",
    suffix: "",
};
const HASH: CommentSyntax = CommentSyntax {
    prefix: "#",
    suffix: "",
};
const DASHES: CommentSyntax = CommentSyntax {
    prefix: "--",
    suffix: "",
};
const PERCENT: CommentSyntax = CommentSyntax {
    prefix: "%",
    suffix: "",
};
const SEMICOLON: CommentSyntax = CommentSyntax {
    prefix: ";",
    suffix: "",
};
const APOSTROPHE: CommentSyntax = CommentSyntax {
    prefix: "'",
    suffix: "",
};
const BLOCK: CommentSyntax = CommentSyntax {
    prefix: "/*",
    suffix: "*/",
};
const MARKUP: CommentSyntax = CommentSyntax {
    prefix: "<!--",
    suffix: "-->",
};

/// Comment syntax by editor language id.
static COMMENT_SYNTAX: phf::Map<&'static str, CommentSyntax> = phf_map! {
    "javascript" => SLASHES,
    "javascriptreact" => SLASHES,
    "typescript" => SLASHES,
    "typescriptreact" => SLASHES,
    "java" => SLASHES,
    "c" => SLASHES,
    "cpp" => SLASHES,
    "csharp" => SLASHES,
    "go" => SLASHES,
    "rust" => SLASHES,
    "swift" => SLASHES,
    "kotlin" => SLASHES,
    "scala" => SLASHES,
    "dart" => SLASHES,
    "php" => SLASHES,
    "python" => HASH,
    "ruby" => HASH,
    "perl" => HASH,
    "r" => HASH,
    "shellscript" => HASH,
    "powershell" => HASH,
    "yaml" => HASH,
    "toml" => HASH,
    "dockerfile" => HASH,
    "makefile" => HASH,
    "elixir" => HASH,
    "sql" => DASHES,
    "lua" => DASHES,
    "haskell" => DASHES,
    "matlab" => PERCENT,
    "latex" => PERCENT,
    "clojure" => SEMICOLON,
    "lisp" => SEMICOLON,
    "vb" => APOSTROPHE,
    "css" => BLOCK,
    "scss" => SLASHES,
    "less" => SLASHES,
    "html" => MARKUP,
    "xml" => MARKUP,
    "markdown" => MARKUP,
    "vue" => MARKUP,
};

/// Editor language id by file extension.
static EXTENSION_LANGUAGE: phf::Map<&'static str, &'static str> = phf_map! {
    "js" => "javascript",
    "mjs" => "javascript",
    "cjs" => "javascript",
    "jsx" => "javascriptreact",
    "ts" => "typescript",
    "tsx" => "typescriptreact",
    "java" => "java",
    "c" => "c",
    "h" => "c",
    "cpp" => "cpp",
    "cc" => "cpp",
    "hpp" => "cpp",
    "cs" => "csharp",
    "go" => "go",
    "rs" => "rust",
    "swift" => "swift",
    "kt" => "kotlin",
    "scala" => "scala",
    "dart" => "dart",
    "php" => "php",
    "py" => "python",
    "rb" => "ruby",
    "pl" => "perl",
    "r" => "r",
    "sh" => "shellscript",
    "bash" => "shellscript",
    "ps1" => "powershell",
    "yaml" => "yaml",
    "yml" => "yaml",
    "toml" => "toml",
    "ex" => "elixir",
    "exs" => "elixir",
    "sql" => "sql",
    "lua" => "lua",
    "hs" => "haskell",
    "m" => "matlab",
    "tex" => "latex",
    "clj" => "clojure",
    "lisp" => "lisp",
    "vb" => "vb",
    "css" => "css",
    "scss" => "scss",
    "less" => "less",
    "html" => "html",
    "htm" => "html",
    "xml" => "xml",
    "md" => "markdown",
    "vue" => "vue",
};

/// Look up the comment syntax for an editor language id.
/// Unknown languages get `//`.
pub fn comment_syntax(language_id: &str) -> CommentSyntax {
    COMMENT_SYNTAX
        .get(language_id.to_ascii_lowercase().as_str())
        .copied()
        .unwrap_or(SLASHES)
}

/// Determine the editor language id from a file extension.
pub fn language_id_for_extension(ext: &str) -> Option<&'static str> {
    EXTENSION_LANGUAGE
        .get(ext.to_ascii_lowercase().as_str())
        .copied()
}
