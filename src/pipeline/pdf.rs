//! Paged-document extraction: `.pdf` → [`ExtractedDocument`].
//!
//! Each page contributes its raw text and, best-effort, the tables that
//! [`crate::pipeline::tables::detect_tables`] finds in its text layout:
//!
//! ```text
//! === PAGE 2 ===          only when the document has more than one page
//! <page text>
//! TABLES:
//! TABLE 1:
//! Year | Value
//! 2024 | 42
//! ```
//!
//! Pages with neither text nor tables are dropped with their marker. Failing
//! to read a page's text fails the extraction; failing to collect the
//! positioned runs for table detection only costs that page its tables.
//!
//! pdfium is not async-safe; [`extract_pdf`] is blocking and the pipeline
//! calls it from `spawn_blocking`.

use crate::error::NoteError;
use crate::pipeline::document::{Block, ExtractedDocument, MarkerKind, SourceFormat};
use crate::pipeline::tables::{detect_tables, TableRows, TextRun};
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

/// Environment variable pointing at an existing pdfium shared library.
pub const PDFIUM_LIB_ENV: &str = "PDFIUM_LIB_PATH";

/// Text and tables of one page, before assembly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageContent {
    pub text: String,
    pub tables: Vec<TableRows>,
}

/// Extract a `.pdf` file from disk.
pub fn extract_pdf(path: &Path, column_gap: f32) -> Result<ExtractedDocument, NoteError> {
    if !path.exists() {
        return Err(NoteError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let pdfium = bind_pdfium().map_err(|detail| NoteError::ExtractionFailed {
        path: path.to_path_buf(),
        detail,
    })?;

    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| NoteError::ExtractionFailed {
            path: path.to_path_buf(),
            detail: format!("{:?}", e),
        })?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut contents = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| NoteError::ExtractionFailed {
                path: path.to_path_buf(),
                detail: format!("page {}: {:?}", idx + 1, e),
            })?
            .all();

        let tables = match page_runs(&page) {
            Ok(runs) => detect_tables(&runs, column_gap),
            Err(e) => {
                warn!("Page {}: table detection skipped: {:?}", idx + 1, e);
                Vec::new()
            }
        };

        debug!(
            "Page {}: {} chars, {} tables",
            idx + 1,
            text.trim().len(),
            tables.len()
        );
        contents.push(PageContent { text, tables });
    }

    Ok(assemble_pages(contents))
}

/// Build the document from per-page content, in page order.
///
/// `pages` must hold every page of the document, including empty ones, so
/// that markers carry original page numbers.
pub fn assemble_pages(pages: Vec<PageContent>) -> ExtractedDocument {
    let multi_page = pages.len() > 1;
    let mut doc = ExtractedDocument::new(SourceFormat::PagedDocument);

    for (i, page) in pages.into_iter().enumerate() {
        let text = normalize_line_endings(&page.text);
        let mut blocks: Vec<Block> = Block::paragraph(&text).into_iter().collect();

        let tables: Vec<Block> = page
            .tables
            .into_iter()
            .enumerate()
            .filter_map(|(k, rows)| Block::table(Some(format!("TABLE {}:", k + 1)), rows))
            .collect();
        if !tables.is_empty() {
            blocks.push(Block::Label("TABLES:".into()));
            blocks.extend(tables);
        }

        let marker = multi_page.then_some(Block::Marker {
            kind: MarkerKind::Page,
            index: i + 1,
        });
        doc.push_unit(marker, blocks);
    }

    doc
}

/// pdfium reports `\r\n` (and the odd bare `\r`) between lines.
fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Positioned text segments of a page, for table detection.
fn page_runs(page: &PdfPage<'_>) -> Result<Vec<TextRun>, PdfiumError> {
    let text = page.text()?;
    let runs = text
        .segments()
        .iter()
        .map(|segment| {
            let bounds = segment.bounds();
            TextRun {
                text: segment.text(),
                left: bounds.left().value,
                right: bounds.right().value,
                top: bounds.top().value,
                bottom: bounds.bottom().value,
            }
        })
        .collect();
    Ok(runs)
}

/// Bind to pdfium: `PDFIUM_LIB_PATH` first, then the working directory,
/// then the system library.
fn bind_pdfium() -> Result<Pdfium, String> {
    let bindings = match std::env::var(PDFIUM_LIB_ENV) {
        Ok(lib) if !lib.is_empty() => Pdfium::bind_to_library(&lib),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| {
        format!(
            "PDFium library unavailable ({:?}). Install libpdfium or set {}=/path/to/libpdfium",
            e, PDFIUM_LIB_ENV
        )
    })?;
    Ok(Pdfium::new(bindings))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(text: &str) -> PageContent {
        PageContent {
            text: text.into(),
            tables: Vec::new(),
        }
    }

    #[test]
    fn single_page_has_no_marker() {
        let doc = assemble_pages(vec![page("  Test PDF Content \n")]);
        assert_eq!(doc.to_text(), "Test PDF Content");
        assert!(doc.marker_indices().is_empty());
    }

    #[test]
    fn line_endings_are_normalized() {
        let doc = assemble_pages(vec![page("Line one\r\nLine two\rLine three\r\n")]);
        assert_eq!(doc.to_text(), "Line one\nLine two\nLine three");
    }

    #[test]
    fn multi_page_markers_keep_original_numbers() {
        let doc = assemble_pages(vec![page("first"), page("   "), page("third")]);
        assert_eq!(doc.marker_indices(), vec![1, 3]);
        assert_eq!(doc.to_text(), "=== PAGE 1 ===\nfirst\n\n=== PAGE 3 ===\nthird");
    }

    #[test]
    fn empty_single_page_document_is_empty() {
        let doc = assemble_pages(vec![page("")]);
        assert!(doc.is_empty());
        assert_eq!(doc.to_text(), "");
    }

    #[test]
    fn tables_are_labelled_and_numbered() {
        let content = PageContent {
            text: "Results".into(),
            tables: vec![
                vec![vec!["Year".into(), "Value".into()], vec!["2024".into(), "42".into()]],
                vec![vec!["a".into(), "b".into()], vec!["c".into(), "d".into()]],
            ],
        };
        let doc = assemble_pages(vec![content]);
        assert_eq!(
            doc.to_text(),
            "Results\nTABLES:\nTABLE 1:\nYear | Value\n2024 | 42\nTABLE 2:\na | b\nc | d"
        );
    }

    #[test]
    fn table_only_page_is_kept() {
        let content = PageContent {
            text: String::new(),
            tables: vec![vec![vec!["x".into(), "y".into()]]],
        };
        let doc = assemble_pages(vec![page(""), content]);
        assert_eq!(doc.marker_indices(), vec![2]);
        assert!(doc.to_text().starts_with("=== PAGE 2 ===\nTABLES:"));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = extract_pdf(Path::new("/definitely/not/here.pdf"), 12.0).unwrap_err();
        assert!(matches!(err, NoteError::NotFound { .. }));
    }
}
