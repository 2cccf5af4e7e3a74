//! File enumeration.
//!
//! Walks a tree, skips ignored paths, classifies every remaining file and
//! tallies its size, line count and a cheap textual class/method count. The
//! result is an [`Inventory`] that the scheduler consumes.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use globset::GlobSet;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use walkdir::{DirEntry, WalkDir};

use crate::analysis::text::non_blank_lines;
use crate::analysis::FileRecord;
use crate::classify::{classify, extension_label, Language, LanguageKind};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};

/// Directory names never descended into.
const SKIP_DIRS: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    "node_modules",
    "__pycache__",
    ".pytest_cache",
    "venv",
    ".venv",
    "target",
    "build",
    "dist",
    ".idea",
    ".vscode",
    "bin",
    "obj",
];

/// File names never scanned.
const SKIP_FILES: &[&str] = &[".DS_Store", "Thumbs.db", ".gitignore", ".gitkeep"];

/// Directory names that hold tests.
const TEST_DIRS: &[&str] = &["test", "tests", "__tests__", "spec"];

lazy_static! {
    static ref CLASS_LINE: Regex = Regex::new(r"^\s*(?:[a-z]+\s+)*class\s+[A-Za-z_$]").unwrap();
    static ref METHOD_LINE: Regex = Regex::new(
        r"^\s*(?:(?:async\s+)?def\s+\w|(?:export\s+)?(?:async\s+)?function\b|(?:public|private|protected)\b[^=;]*\w\s*\()"
    )
    .unwrap();
}

/// Every file found under one root.
#[derive(Debug, Clone, Serialize)]
pub struct Inventory {
    pub root: PathBuf,
    pub files: Vec<FileRecord>,
}

/// Outcome of checking an inventory for analyzable content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageValidation {
    pub primary_language: Language,
    pub supported_files: usize,
    pub unsupported_files: usize,
    pub image_files: usize,
    pub unknown_files: usize,
    pub warnings: Vec<String>,
    pub language_distribution: BTreeMap<Language, usize>,
    pub unsupported_languages: Vec<Language>,
    pub unknown_extensions: Vec<String>,
}

/// Walk `root` (a directory or a single file) honoring the config's
/// exclusions and test policy.
pub fn collect(root: &Path, config: &AnalysisConfig) -> Result<Inventory> {
    let excluded = config.exclusion_set()?;
    let include_tests = config.include_tests;

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || keep_entry(e, include_tests));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(source) if source.depth() == 0 => {
                return Err(AnalysisError::Walk {
                    path: root.display().to_string(),
                    source,
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if is_excluded(&excluded, root, path) {
            tracing::debug!(path = %path.display(), "excluded by pattern");
            continue;
        }

        let size_bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);
        files.push(tally(path, size_bytes));
    }

    tracing::info!(root = %root.display(), files = files.len(), "inventory collected");
    Ok(Inventory {
        root: root.to_path_buf(),
        files,
    })
}

fn keep_entry(entry: &DirEntry, include_tests: bool) -> bool {
    let name = entry.file_name().to_string_lossy();
    if entry.file_type().is_dir() {
        if SKIP_DIRS.contains(&name.as_ref()) {
            return false;
        }
        if !include_tests && TEST_DIRS.contains(&name.as_ref()) {
            return false;
        }
        return true;
    }

    if name.starts_with('.') || SKIP_FILES.contains(&name.as_ref()) {
        return false;
    }
    include_tests || !is_test_file(&name)
}

/// Test files by naming convention: `test_x.py`, `x_test.py`, `conftest.py`,
/// `FooTest.java`, `TestFoo.java`, `x.test.js`, `x.spec.js`.
fn is_test_file(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    if lower.contains(".test.") || lower.contains(".spec.") {
        return true;
    }

    let stem = name.split('.').next().unwrap_or(name);
    let lower_stem = stem.to_ascii_lowercase();
    let test_prefix_type = stem
        .strip_prefix("Test")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_uppercase());

    matches!(lower_stem.as_str(), "test" | "tests" | "conftest")
        || lower_stem.starts_with("test_")
        || lower_stem.ends_with("_test")
        || lower_stem.ends_with("_tests")
        || stem.ends_with("Test")
        || stem.ends_with("Tests")
        || test_prefix_type
}

fn is_excluded(excluded: &GlobSet, root: &Path, path: &Path) -> bool {
    if excluded.is_empty() {
        return false;
    }
    let relative = path.strip_prefix(root).unwrap_or(path);
    excluded.is_match(relative)
}

/// Build the record for one file. Opaque files are never read.
fn tally(path: &Path, size_bytes: u64) -> FileRecord {
    let classification = classify(path);
    let mut record = FileRecord {
        path: path.display().to_string(),
        language: classification.language,
        size_bytes,
        line_count: 0,
        class_count: 0,
        method_count: 0,
    };

    if classification.kind == LanguageKind::Opaque {
        return record;
    }

    match fs::read(path) {
        Ok(bytes) => {
            let text = String::from_utf8_lossy(&bytes);
            record.line_count = non_blank_lines(&text);
            if classification.analyzable() {
                for line in text.lines() {
                    if CLASS_LINE.is_match(line) {
                        record.class_count += 1;
                    } else if METHOD_LINE.is_match(line) {
                        record.method_count += 1;
                    }
                }
            }
        }
        Err(e) => tracing::debug!(path = %path.display(), error = %e, "could not tally file"),
    }
    record
}

impl Inventory {
    /// Files per language tag.
    pub fn language_summary(&self) -> BTreeMap<Language, usize> {
        let mut summary = BTreeMap::new();
        for file in &self.files {
            *summary.entry(file.language).or_insert(0) += 1;
        }
        summary
    }

    /// Recognized languages without an extractor, sorted.
    pub fn unsupported_languages(&self) -> Vec<Language> {
        let set: BTreeSet<Language> = self
            .files
            .iter()
            .map(|f| f.language)
            .filter(|l| l.kind() == LanguageKind::Unsupported)
            .collect();
        set.into_iter().collect()
    }

    /// Extensions that mapped to `unknown`, sorted (`.ext`, or empty for none).
    pub fn unknown_extensions(&self) -> Vec<String> {
        let set: BTreeSet<String> = self
            .files
            .iter()
            .filter(|f| f.language == Language::Unknown)
            .map(|f| extension_label(Path::new(&f.path)))
            .filter(|ext| !ext.is_empty())
            .collect();
        set.into_iter().collect()
    }

    /// Files with a registered extractor, in walk order.
    pub fn analyzable(&self) -> Vec<&FileRecord> {
        self.files.iter().filter(|f| f.language.is_supported()).collect()
    }

    /// Refuse to continue when nothing is analyzable; otherwise summarize the
    /// distribution and produce warnings for what will be skipped.
    pub fn validate(&self) -> Result<LanguageValidation> {
        let distribution = self.language_summary();

        let mut supported_files = 0;
        let mut unsupported_files = 0;
        let mut image_files = 0;
        let mut unknown_files = 0;
        for (language, count) in &distribution {
            match language.kind() {
                LanguageKind::Supported => supported_files += count,
                LanguageKind::Unsupported => unsupported_files += count,
                LanguageKind::Opaque => image_files += count,
                LanguageKind::Unknown => unknown_files += count,
            }
        }

        // max_by_key keeps the last maximum; reverse so ties go to registry order
        let primary = Language::SUPPORTED
            .iter()
            .rev()
            .filter_map(|l| distribution.get(l).map(|n| (*l, *n)))
            .max_by_key(|(_, n)| *n)
            .map(|(l, _)| l);

        let Some(primary_language) = primary else {
            return Err(AnalysisError::NoSupportedFiles {
                path: self.root.display().to_string(),
                total_files: self.files.len(),
            });
        };

        let unsupported_languages = self.unsupported_languages();
        let unknown_extensions = self.unknown_extensions();

        let mut warnings = Vec::new();
        if unsupported_files > 0 {
            let names: Vec<&str> = unsupported_languages.iter().map(|l| l.as_str()).collect();
            warnings.push(format!(
                "Found {} files in unsupported languages: {}. Analysis will focus on supported languages only.",
                unsupported_files,
                names.join(", ")
            ));
        }
        if image_files > 0 {
            warnings.push(format!(
                "Found {} image files. These will be tracked but not analyzed.",
                image_files
            ));
        }
        if unknown_files > 0 {
            warnings.push(format!(
                "Found {} files with unknown extensions: {}.",
                unknown_files,
                unknown_extensions.join(", ")
            ));
        }
        for warning in &warnings {
            tracing::warn!("{}", warning);
        }

        Ok(LanguageValidation {
            primary_language,
            supported_files,
            unsupported_files,
            image_files,
            unknown_files,
            warnings,
            language_distribution: distribution,
            unsupported_languages,
            unknown_extensions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/App.java", "public class App {\n\n  public void run() {}\n}\n");
        write(dir.path(), "src/util.py", "def helper():\n    pass\n");
        write(dir.path(), "src/main.go", "package main\n");
        write(dir.path(), "assets/logo.png", "\u{0}\u{1}binary");
        write(dir.path(), "notes.xyz", "?");
        write(dir.path(), "node_modules/lib/index.js", "module.exports = {};\n");
        write(dir.path(), ".hidden.py", "x = 1\n");
        write(dir.path(), "tests/test_util.py", "def test_helper():\n    pass\n");
        write(dir.path(), "generated/Gen.java", "class Gen {}\n");
        dir
    }

    fn relative_paths(inventory: &Inventory) -> Vec<String> {
        inventory
            .files
            .iter()
            .map(|f| {
                Path::new(&f.path)
                    .strip_prefix(&inventory.root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_collect_skips_ignored_paths() {
        let dir = project();
        let inventory = collect(dir.path(), &AnalysisConfig::default()).unwrap();
        let paths = relative_paths(&inventory);

        assert!(paths.contains(&"src/App.java".to_string()));
        assert!(paths.contains(&"tests/test_util.py".to_string()));
        assert!(!paths.iter().any(|p| p.contains("node_modules")));
        assert!(!paths.iter().any(|p| p.contains(".hidden")));
    }

    #[test]
    fn test_test_file_names() {
        for name in [
            "test_util.py",
            "util_test.py",
            "conftest.py",
            "OrderTest.java",
            "OrderTests.java",
            "TestOrder.java",
            "app.test.js",
            "app.spec.js",
        ] {
            assert!(is_test_file(name), "{}", name);
        }
        for name in ["inspector.js", "latest.py", "Testament.java", "contest.py", "respect.css"] {
            assert!(!is_test_file(name), "{}", name);
        }
    }

    #[test]
    fn test_collect_honors_exclusions_and_test_policy() {
        let dir = project();
        let config = AnalysisConfig {
            include_tests: false,
            excluded_paths: vec!["generated/**".to_string()],
            ..AnalysisConfig::default()
        };
        let inventory = collect(dir.path(), &config).unwrap();
        let paths = relative_paths(&inventory);

        assert!(!paths.iter().any(|p| p.starts_with("tests/")));
        assert!(!paths.iter().any(|p| p.starts_with("generated/")));
        assert!(paths.contains(&"src/util.py".to_string()));
    }

    #[test]
    fn test_tally() {
        let dir = project();
        let inventory = collect(dir.path(), &AnalysisConfig::default()).unwrap();
        let app = inventory.files.iter().find(|f| f.path.ends_with("App.java")).unwrap();
        assert_eq!(app.language, Language::Java);
        assert_eq!(app.line_count, 3);
        assert_eq!(app.class_count, 1);
        assert_eq!(app.method_count, 1);

        let logo = inventory.files.iter().find(|f| f.path.ends_with("logo.png")).unwrap();
        assert_eq!(logo.language, Language::Image);
        assert_eq!(logo.line_count, 0);
        assert!(logo.size_bytes > 0);
    }

    #[test]
    fn test_validate() {
        let dir = project();
        let inventory = collect(dir.path(), &AnalysisConfig::default()).unwrap();
        let validation = inventory.validate().unwrap();

        assert_eq!(validation.primary_language, Language::Java);
        assert_eq!(validation.supported_files, 4);
        assert_eq!(validation.unsupported_files, 1);
        assert_eq!(validation.image_files, 1);
        assert_eq!(validation.unknown_files, 1);
        assert_eq!(validation.unsupported_languages, vec![Language::Go]);
        assert_eq!(validation.unknown_extensions, vec![".xyz"]);
        assert_eq!(validation.warnings.len(), 3);
        assert_eq!(inventory.analyzable().len(), 4);
    }

    #[test]
    fn test_no_supported_files_is_fatal() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "main.go", "package main\n");
        write(dir.path(), "README.txt", "hello\n");
        let inventory = collect(dir.path(), &AnalysisConfig::default()).unwrap();

        match inventory.validate() {
            Err(AnalysisError::NoSupportedFiles { total_files, .. }) => assert_eq!(total_files, 2),
            other => panic!("expected NoSupportedFiles, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = collect(&dir.path().join("absent"), &AnalysisConfig::default());
        assert!(matches!(result, Err(AnalysisError::Walk { .. })));
    }

    #[test]
    fn test_single_file_root() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "Only.java", "class Only {}\n");
        let inventory = collect(&dir.path().join("Only.java"), &AnalysisConfig::default()).unwrap();
        assert_eq!(inventory.files.len(), 1);
    }
}
