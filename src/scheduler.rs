//! Parallel per-file analysis.
//!
//! Two independent passes run over the same file list on one bounded rayon
//! pool: the structural pass (classes and issues) and the hygiene pass
//! (variables and style). Every file gets exactly one slot per pass, in
//! submission order. A task that cannot read its file, or that panics, fills
//! its slot with a `FILE_READ_ERROR` instead of taking the batch down.
//!
//! The structural pass always sees the whole file. The hygiene pass works on
//! content cut to the configured cap.

use std::fs;
use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;
use rayon::ThreadPool;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::analysis::text::truncate_at_boundary;
use crate::analysis::{
    CodeIssue, ExtractorRegistry, FileRecord, LanguageClass, StyleValidation, VariableRecord,
};
use crate::classify::Language;
use crate::error::Result;

/// Structural result for one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureSlot {
    pub path: String,
    pub language: Language,
    pub classes: Vec<LanguageClass>,
    pub issues: Vec<CodeIssue>,
}

/// Variables and style result for one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HygieneSlot {
    pub path: String,
    pub language: Language,
    pub variables: Vec<VariableRecord>,
    /// `None` when the file could not be read or has no extractor.
    pub style: Option<StyleValidation>,
}

/// Runs extractor work on a fixed-size worker pool.
pub struct Scheduler {
    registry: ExtractorRegistry,
    pool: ThreadPool,
    max_content_bytes: usize,
}

impl Scheduler {
    pub fn new(registry: ExtractorRegistry, workers: usize, max_content_bytes: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("codecensus-worker-{}", i))
            .build()?;
        Ok(Self {
            registry,
            pool,
            max_content_bytes,
        })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Structural pass. Returns one slot per input file, in input order.
    pub fn analyze_structure(&self, files: &[&FileRecord]) -> Vec<StructureSlot> {
        info!(files = files.len(), workers = self.workers(), "structural pass");
        self.pool
            .install(|| files.par_iter().map(|file| self.structure_task(file)).collect())
    }

    /// Variables and style pass. Returns one slot per input file, in input order.
    pub fn analyze_hygiene(&self, files: &[&FileRecord]) -> Vec<HygieneSlot> {
        info!(files = files.len(), workers = self.workers(), "hygiene pass");
        self.pool
            .install(|| files.par_iter().map(|file| self.hygiene_task(file)).collect())
    }

    /// Both passes, run concurrently. Returns once every task has finished.
    pub fn analyze_all(&self, files: &[&FileRecord]) -> (Vec<StructureSlot>, Vec<HygieneSlot>) {
        self.pool.join(
            || self.analyze_structure(files),
            || self.analyze_hygiene(files),
        )
    }

    fn structure_task(&self, file: &FileRecord) -> StructureSlot {
        let mut slot = StructureSlot {
            path: file.path.clone(),
            language: file.language,
            classes: Vec::new(),
            issues: Vec::new(),
        };

        let Some(extractor) = self.registry.resolve(file.language) else {
            debug!(path = %file.path, language = %file.language, "no extractor");
            return slot;
        };

        let outcome = guarded(|| {
            let content = read(&file.path)?;
            Ok::<_, String>(extractor.analyze_file(&file.path, &content))
        });

        match outcome {
            Ok(Ok(output)) => {
                debug!(
                    path = %file.path,
                    classes = output.classes.len(),
                    issues = output.issues.len(),
                    "analyzed"
                );
                slot.classes = output.classes;
                slot.issues = output.issues;
            }
            Ok(Err(reason)) => {
                warn!(path = %file.path, error = %reason, "failed to read file");
                slot.issues.push(CodeIssue::file_read_error(&file.path, &reason));
            }
            Err(panic_msg) => {
                error!(path = %file.path, "structural analysis panicked: {}", panic_msg);
                slot.issues
                    .push(CodeIssue::file_read_error(&file.path, &format!("Panic: {}", panic_msg)));
            }
        }
        slot
    }

    fn hygiene_task(&self, file: &FileRecord) -> HygieneSlot {
        let mut slot = HygieneSlot {
            path: file.path.clone(),
            language: file.language,
            variables: Vec::new(),
            style: None,
        };

        let Some(extractor) = self.registry.resolve(file.language) else {
            return slot;
        };

        let outcome = guarded(|| {
            let full = read(&file.path)?;
            let content = self.capped(&file.path, &full);
            let variables = extractor
                .extract_variables(content, &file.path)
                .unwrap_or_else(|e| {
                    warn!(path = %file.path, error = %e, "variable extraction failed");
                    Vec::new()
                });
            let style = extractor.validate_coding_standards(content, &file.path);
            Ok::<_, String>((variables, style))
        });

        match outcome {
            Ok(Ok((variables, style))) => {
                slot.variables = variables;
                slot.style = Some(style);
            }
            // the structural pass reports unreadable files
            Ok(Err(_)) => {}
            Err(panic_msg) => {
                error!(path = %file.path, "hygiene analysis panicked: {}", panic_msg);
                slot.style = Some(StyleValidation::failed(&file.path, file.language));
            }
        }
        slot
    }

    /// `content` cut to the content cap on a char boundary.
    fn capped<'a>(&self, path: &str, content: &'a str) -> &'a str {
        let kept = truncate_at_boundary(content, self.max_content_bytes);
        if kept.len() < content.len() {
            debug!(path, bytes = content.len(), keep = kept.len(), "truncating content");
        }
        kept
    }
}

/// Read a file as UTF-8.
fn read(path: &str) -> std::result::Result<String, String> {
    fs::read_to_string(path).map_err(|e| e.to_string())
}

/// Run `f`, turning a panic into its message.
fn guarded<T>(f: impl FnOnce() -> T) -> std::result::Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|panic_info| {
        if let Some(s) = panic_info.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        }
    })
}
