//! Per-file structural analysis.
//!
//! This module turns the content of one source file into "facts": classes,
//! methods, fields, declared variables, threshold findings and coding-standard
//! violations. Every supported language implements the same [`Extractor`]
//! contract; some are backed by a tree-sitter grammar, the rest by line-local
//! patterns.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌───────────────────┐
//! │ (path, content) │────▶│ ExtractorRegistry│────▶│ Extractor         │
//! └─────────────────┘     │ resolve(Language)│     │ (Java, Python, ..)│
//!                         └──────────────────┘     └───────────────────┘
//!                                                           │
//!                                   ┌───────────────────────┼──────────────────┐
//!                                   ▼                       ▼                  ▼
//!                          ┌────────────────┐    ┌──────────────────┐  ┌────────────────┐
//!                          │ExtractionOutput│    │ VariableRecord[] │  │StyleValidation │
//!                          │classes + issues│    └──────────────────┘  └────────────────┘
//!                          └────────────────┘
//! ```
//!
//! # Adding a New Language
//!
//! 1. Add the tag and its extensions to [`crate::classify`]
//! 2. Create a module in `src/analysis/languages/` implementing [`Extractor`]
//! 3. Use [`findings::finish_class`] so threshold findings stay uniform
//! 4. Return the extractor from `ExtractorRegistry::resolve`

pub mod complexity;
mod facts;
pub mod findings;
mod languages;
pub mod style;
pub mod text;
mod traits;

pub use complexity::{ComplexityProfile, ControlFlowInfo};
pub use facts::{
    style_score, CodeIssue, FieldRecord, FileRecord, IssueCategory, IssueRule, LanguageClass,
    LanguageMethod, Parameter, Severity, Span, StyleValidation, StyleViolation, VariableRecord,
    VariableScope, Visibility,
};
pub use languages::{
    CssExtractor, ExtractorRegistry, HtmlExtractor, JavaExtractor, JavaScriptExtractor,
    PythonExtractor, ScssExtractor,
};
pub use traits::{ExtractionOutput, Extractor, ParsedFile};
