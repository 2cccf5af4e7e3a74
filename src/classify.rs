//! Language classification by file extension.
//!
//! Every path maps to exactly one [`Language`] tag, and every tag belongs to
//! exactly one [`LanguageKind`]. Classification never fails: anything the
//! extension table does not know degrades to [`Language::Unknown`].

use std::fmt;
use std::path::Path;

use phf::phf_map;
use serde::{Deserialize, Serialize};

/// A language tag known to the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Java,
    Python,
    JavaScript,
    Html,
    Css,
    Scss,
    TypeScript,
    Less,
    Cpp,
    C,
    CSharp,
    Ruby,
    Go,
    Php,
    Kotlin,
    Scala,
    Rust,
    Swift,
    Dart,
    Xml,
    Json,
    Yaml,
    Sql,
    Shell,
    PowerShell,
    Image,
    Unknown,
}

/// The analysis class a language tag belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageKind {
    /// Has a registered extractor and is structurally analyzed.
    Supported,
    /// Recognized but never content-analyzed (binary/image formats).
    Opaque,
    /// Recognized language without an extractor. Counted, never analyzed.
    Unsupported,
    /// Extension not in the table.
    Unknown,
}

/// Extension (lowercase, no dot) to language tag.
static EXTENSIONS: phf::Map<&'static str, Language> = phf_map! {
    "java" => Language::Java,
    "py" => Language::Python,
    "js" => Language::JavaScript,
    "jsx" => Language::JavaScript,
    "mjs" => Language::JavaScript,
    "cjs" => Language::JavaScript,
    "ts" => Language::TypeScript,
    "tsx" => Language::TypeScript,
    "html" => Language::Html,
    "htm" => Language::Html,
    "css" => Language::Css,
    "scss" => Language::Scss,
    "sass" => Language::Scss,
    "less" => Language::Less,
    "cpp" => Language::Cpp,
    "cc" => Language::Cpp,
    "cxx" => Language::Cpp,
    "hpp" => Language::Cpp,
    "c" => Language::C,
    "h" => Language::C,
    "cs" => Language::CSharp,
    "rb" => Language::Ruby,
    "go" => Language::Go,
    "php" => Language::Php,
    "kt" => Language::Kotlin,
    "scala" => Language::Scala,
    "rs" => Language::Rust,
    "swift" => Language::Swift,
    "dart" => Language::Dart,
    "xml" => Language::Xml,
    "json" => Language::Json,
    "yaml" => Language::Yaml,
    "yml" => Language::Yaml,
    "sql" => Language::Sql,
    "sh" => Language::Shell,
    "bash" => Language::Shell,
    "ps1" => Language::PowerShell,
    "png" => Language::Image,
    "jpg" => Language::Image,
    "jpeg" => Language::Image,
    "gif" => Language::Image,
    "bmp" => Language::Image,
    "tiff" => Language::Image,
    "tif" => Language::Image,
    "webp" => Language::Image,
    "svg" => Language::Image,
    "ico" => Language::Image,
    "psd" => Language::Image,
    "raw" => Language::Image,
    "heic" => Language::Image,
    "heif" => Language::Image,
};

impl Language {
    /// Every tag, in declaration order.
    pub const ALL: [Language; 27] = [
        Language::Java,
        Language::Python,
        Language::JavaScript,
        Language::Html,
        Language::Css,
        Language::Scss,
        Language::TypeScript,
        Language::Less,
        Language::Cpp,
        Language::C,
        Language::CSharp,
        Language::Ruby,
        Language::Go,
        Language::Php,
        Language::Kotlin,
        Language::Scala,
        Language::Rust,
        Language::Swift,
        Language::Dart,
        Language::Xml,
        Language::Json,
        Language::Yaml,
        Language::Sql,
        Language::Shell,
        Language::PowerShell,
        Language::Image,
        Language::Unknown,
    ];

    /// All structurally supported languages, in registry order.
    pub const SUPPORTED: [Language; 6] = [
        Language::Java,
        Language::Python,
        Language::JavaScript,
        Language::Html,
        Language::Css,
        Language::Scss,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Java => "java",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::Html => "html",
            Language::Css => "css",
            Language::Scss => "scss",
            Language::TypeScript => "typescript",
            Language::Less => "less",
            Language::Cpp => "cpp",
            Language::C => "c",
            Language::CSharp => "csharp",
            Language::Ruby => "ruby",
            Language::Go => "go",
            Language::Php => "php",
            Language::Kotlin => "kotlin",
            Language::Scala => "scala",
            Language::Rust => "rust",
            Language::Swift => "swift",
            Language::Dart => "dart",
            Language::Xml => "xml",
            Language::Json => "json",
            Language::Yaml => "yaml",
            Language::Sql => "sql",
            Language::Shell => "shell",
            Language::PowerShell => "powershell",
            Language::Image => "image",
            Language::Unknown => "unknown",
        }
    }

    /// Look up a tag by its string form.
    pub fn parse(s: &str) -> Option<Self> {
        Language::ALL.into_iter().find(|lang| lang.as_str() == s)
    }

    /// Look up a tag by file extension. Case-insensitive, leading dot optional.
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        EXTENSIONS.get(ext.as_str()).copied().unwrap_or(Language::Unknown)
    }

    pub fn kind(&self) -> LanguageKind {
        match self {
            Language::Java
            | Language::Python
            | Language::JavaScript
            | Language::Html
            | Language::Css
            | Language::Scss => LanguageKind::Supported,
            Language::Image => LanguageKind::Opaque,
            Language::Unknown => LanguageKind::Unknown,
            _ => LanguageKind::Unsupported,
        }
    }

    /// Whether files of this language are structurally analyzed.
    pub fn is_supported(&self) -> bool {
        self.kind() == LanguageKind::Supported
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of classifying one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub language: Language,
    pub kind: LanguageKind,
}

impl Classification {
    pub fn analyzable(&self) -> bool {
        self.kind == LanguageKind::Supported
    }
}

/// Classify a path by its extension.
pub fn classify(path: &Path) -> Classification {
    let language = path
        .extension()
        .and_then(|e| e.to_str())
        .map(Language::from_extension)
        .unwrap_or(Language::Unknown);

    Classification {
        language,
        kind: language.kind(),
    }
}

/// The lowercase extension of a path with a leading dot, or an empty string.
pub fn extension_label(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extensions() {
        assert_eq!(classify(Path::new("src/App.java")).language, Language::Java);
        assert_eq!(classify(Path::new("pkg/mod.py")).language, Language::Python);
        assert_eq!(classify(Path::new("web/app.jsx")).language, Language::JavaScript);
        assert_eq!(classify(Path::new("index.HTM")).language, Language::Html);
        assert_eq!(classify(Path::new("theme.sass")).language, Language::Scss);
        assert!(classify(Path::new("site.css")).analyzable());
    }

    #[test]
    fn test_opaque_and_unsupported() {
        let img = classify(Path::new("logo.PNG"));
        assert_eq!(img.language, Language::Image);
        assert_eq!(img.kind, LanguageKind::Opaque);
        assert!(!img.analyzable());

        let ts = classify(Path::new("main.ts"));
        assert_eq!(ts.language, Language::TypeScript);
        assert_eq!(ts.kind, LanguageKind::Unsupported);
    }

    #[test]
    fn test_unknown_never_fails() {
        assert_eq!(classify(Path::new("Makefile")).language, Language::Unknown);
        assert_eq!(classify(Path::new("notes.xyz")).kind, LanguageKind::Unknown);
        assert_eq!(Language::from_extension(".YML"), Language::Yaml);
    }

    #[test]
    fn test_kinds_are_disjoint() {
        for lang in Language::SUPPORTED {
            assert_eq!(lang.kind(), LanguageKind::Supported);
        }
        assert_eq!(Language::Image.kind(), LanguageKind::Opaque);
        assert_eq!(Language::Rust.kind(), LanguageKind::Unsupported);

        let supported = Language::ALL.iter().filter(|l| l.is_supported()).count();
        assert_eq!(supported, Language::SUPPORTED.len());
        for lang in Language::ALL {
            assert_eq!(Language::parse(lang.as_str()), Some(lang));
        }
    }

    #[test]
    fn test_parse_round_trips_names() {
        assert_eq!(Language::parse("javascript"), Some(Language::JavaScript));
        assert_eq!(Language::parse("unknown"), Some(Language::Unknown));
        assert_eq!(Language::parse("cobol"), None);
    }
}
