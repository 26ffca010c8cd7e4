//! View-model rendered into the single page.

use crate::pipeline::Conversion;
use serde::Serialize;

/// Page heading and document title.
pub(crate) const PAGE_TITLE: &str = "Cypress to Playwright Test Converter";

#[derive(Debug, Serialize)]
pub(crate) struct PageView<'a> {
    title: &'static str,
    model: &'a str,
    max_upload_mb: usize,
    error: Option<String>,
    source: Option<CodeView<'a>>,
    converted: Option<ConvertedView<'a>>,
}

#[derive(Debug, Serialize)]
struct CodeView<'a> {
    filename: &'a str,
    code: &'a str,
    lines: usize,
    bytes: usize,
}

#[derive(Debug, Serialize)]
struct ConvertedView<'a> {
    filename: &'a str,
    code: &'a str,
    lines: usize,
    bytes: usize,
    generation_secs: f64,
}

impl<'a> PageView<'a> {
    /// The page before any upload.
    pub(crate) fn empty(model: &'a str, max_upload_size: usize) -> Self {
        Self {
            title: PAGE_TITLE,
            model,
            max_upload_mb: max_upload_size.div_ceil(1024 * 1024),
            error: None,
            source: None,
            converted: None,
        }
    }

    /// Shows both panes and the download action.
    #[must_use]
    pub(crate) fn with_conversion(mut self, conversion: &'a Conversion) -> Self {
        self.source = Some(CodeView {
            filename: &conversion.source_filename,
            code: &conversion.source,
            lines: conversion.stats.source_lines,
            bytes: conversion.stats.source_bytes,
        });
        self.converted = Some(ConvertedView {
            filename: &conversion.artifact.filename,
            code: &conversion.converted,
            lines: conversion.stats.result_lines,
            bytes: conversion.stats.result_bytes,
            generation_secs: conversion.stats.generation_duration.as_secs_f64(),
        });
        self
    }

    /// Shows the decoded source without a result.
    #[must_use]
    pub(crate) fn with_source(mut self, filename: &'a str, code: &'a str) -> Self {
        self.source = Some(CodeView {
            filename,
            code,
            lines: code.lines().count(),
            bytes: code.len(),
        });
        self
    }

    #[must_use]
    pub(crate) fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }
}
