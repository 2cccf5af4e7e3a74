//! Language-specific extractor implementations and the registry that maps a
//! language tag to one of them.

mod css;
mod html;
mod java;
mod javascript;
mod python;
mod scss;

pub use css::CssExtractor;
pub use html::HtmlExtractor;
pub use java::JavaExtractor;
pub use javascript::JavaScriptExtractor;
pub use python::PythonExtractor;
pub use scss::ScssExtractor;

use super::Extractor;
use crate::classify::Language;
use crate::config::Thresholds;

/// One extractor per structurally supported language.
///
/// The set is closed: [`ExtractorRegistry::resolve`] matches every
/// [`Language`] variant explicitly, so adding a tag forces a decision here.
pub struct ExtractorRegistry {
    java: JavaExtractor,
    python: PythonExtractor,
    javascript: JavaScriptExtractor,
    html: HtmlExtractor,
    css: CssExtractor,
    scss: ScssExtractor,
}

impl ExtractorRegistry {
    pub fn new(thresholds: &Thresholds) -> Self {
        Self {
            java: JavaExtractor::new(*thresholds),
            python: PythonExtractor::new(*thresholds),
            javascript: JavaScriptExtractor::new(*thresholds),
            html: HtmlExtractor::new(),
            css: CssExtractor::new(),
            scss: ScssExtractor::new(),
        }
    }

    /// The extractor for `language`, or `None` when it is not supported.
    pub fn resolve(&self, language: Language) -> Option<&dyn Extractor> {
        match language {
            Language::Java => Some(&self.java),
            Language::Python => Some(&self.python),
            Language::JavaScript => Some(&self.javascript),
            Language::Html => Some(&self.html),
            Language::Css => Some(&self.css),
            Language::Scss => Some(&self.scss),
            Language::TypeScript
            | Language::Less
            | Language::Cpp
            | Language::C
            | Language::CSharp
            | Language::Ruby
            | Language::Go
            | Language::Php
            | Language::Kotlin
            | Language::Scala
            | Language::Rust
            | Language::Swift
            | Language::Dart
            | Language::Xml
            | Language::Json
            | Language::Yaml
            | Language::Sql
            | Language::Shell
            | Language::PowerShell
            | Language::Image
            | Language::Unknown => None,
        }
    }

    /// Languages with a registered extractor.
    pub fn languages(&self) -> impl Iterator<Item = Language> + '_ {
        Language::SUPPORTED
            .into_iter()
            .filter(move |lang| self.resolve(*lang).is_some())
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new(&Thresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_supported() {
        let registry = ExtractorRegistry::default();
        for lang in Language::SUPPORTED {
            let extractor = registry.resolve(lang).expect("supported language has an extractor");
            assert_eq!(extractor.language(), lang);
        }
    }

    #[test]
    fn test_resolve_unsupported() {
        let registry = ExtractorRegistry::default();
        assert!(registry.resolve(Language::TypeScript).is_none());
        assert!(registry.resolve(Language::Image).is_none());
        assert!(registry.resolve(Language::Unknown).is_none());
    }

    #[test]
    fn test_registry_agrees_with_classifier() {
        let registry = ExtractorRegistry::default();
        let languages: Vec<_> = registry.languages().collect();
        assert_eq!(languages, Language::SUPPORTED.to_vec());
        assert!(languages.iter().all(|l| l.is_supported()));
    }

    #[test]
    fn test_custom_thresholds_reach_extractors() {
        let thresholds = Thresholds {
            complexity: 1,
            ..Thresholds::default()
        };
        let registry = ExtractorRegistry::new(&thresholds);
        let source = "public class A {\n  void f(int x) {\n    if (x > 0) { x--; }\n  }\n}\n";
        let output = registry
            .resolve(Language::Java)
            .unwrap()
            .analyze_file("A.java", source);
        assert_eq!(output.issues.len(), 1);
        assert_eq!(output.issues[0].rule.as_str(), "COMPLEX_METHOD");
    }
}
