//! The structured text model shared by both extractors.
//!
//! An [`ExtractedDocument`] is a flat, ordered list of [`Block`]s. Slide and
//! page boundaries are themselves blocks ([`Block::Marker`]), so the order of
//! the list *is* the order of the original document and nothing needs to be
//! re-sorted. [`ExtractedDocument::to_text`] flattens the blocks into the
//! string sent to the model; it is the only place structure is dropped.
//!
//! Blank blocks cannot be constructed: the `Block::*` helper constructors
//! return `None` for empty text, and tables drop blank cells and empty rows.

use crate::error::NoteError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Joins the cells of one table row.
pub const CELL_DELIMITER: &str = " | ";

/// Indentation per bullet nesting level.
const INDENT: &str = "  ";

/// The two supported container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Office Open XML slide deck (`.pptx`).
    SlideDeck,
    /// Portable Document Format (`.pdf`).
    PagedDocument,
}

impl SourceFormat {
    /// Detect the format from a file name's extension, case-insensitively.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, NoteError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("pptx") => Ok(SourceFormat::SlideDeck),
            Some("pdf") => Ok(SourceFormat::PagedDocument),
            _ => Err(NoteError::UnsupportedFormat {
                name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
            }),
        }
    }
}

/// What a marker delimits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerKind {
    Section,
    Page,
}

/// One unit of extracted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Block {
    /// Start of a slide (`Section`) or page (`Page`), 1-based original index.
    Marker { kind: MarkerKind, index: usize },
    /// Slide title.
    Heading(String),
    /// Free text, e.g. the raw text of a PDF page.
    Paragraph(String),
    /// Outline line at a nesting level (0 = top).
    Bullet { level: usize, text: String },
    /// Table rows; every row holds at least one non-empty cell.
    Table {
        caption: Option<String>,
        rows: Vec<Vec<String>>,
    },
    /// A bare label line such as `TABLES:`.
    Label(String),
    /// Speaker notes of a slide.
    Notes(String),
}

impl Block {
    pub fn heading(text: &str) -> Option<Block> {
        non_blank(text).map(Block::Heading)
    }

    pub fn paragraph(text: &str) -> Option<Block> {
        non_blank(text).map(Block::Paragraph)
    }

    pub fn bullet(level: usize, text: &str) -> Option<Block> {
        non_blank(text).map(|text| Block::Bullet { level, text })
    }

    pub fn notes(text: &str) -> Option<Block> {
        non_blank(text).map(Block::Notes)
    }

    /// Build a table from raw rows, trimming cells and dropping blank ones.
    ///
    /// Returns `None` when no row keeps a cell.
    pub fn table<R, C>(caption: Option<String>, rows: R) -> Option<Block>
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        let rows: Vec<Vec<String>> = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .filter_map(|cell| non_blank(cell.as_ref()))
                    .collect::<Vec<_>>()
            })
            .filter(|row| !row.is_empty())
            .collect();
        if rows.is_empty() {
            None
        } else {
            Some(Block::Table { caption, rows })
        }
    }

    pub fn is_marker(&self) -> bool {
        matches!(self, Block::Marker { .. })
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Block::Marker {
                kind: MarkerKind::Section,
                index,
            } => write!(f, "=== SECTION {index} ==="),
            Block::Marker {
                kind: MarkerKind::Page,
                index,
            } => write!(f, "=== PAGE {index} ==="),
            Block::Heading(text) => write!(f, "TITLE: {text}"),
            Block::Paragraph(text) => f.write_str(text),
            Block::Bullet { level, text } => write!(f, "{}- {text}", INDENT.repeat(*level)),
            Block::Table { caption, rows } => {
                let mut lines: Vec<String> = Vec::with_capacity(rows.len() + 1);
                if let Some(c) = caption {
                    lines.push(c.clone());
                }
                lines.extend(rows.iter().map(|row| row.join(CELL_DELIMITER)));
                f.write_str(&lines.join("\n"))
            }
            Block::Label(text) => f.write_str(text),
            Block::Notes(text) => write!(f, "NOTES:\n{text}"),
        }
    }
}

fn non_blank(text: &str) -> Option<String> {
    let t = text.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// Ordered blocks extracted from one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub format: Option<SourceFormat>,
    pub blocks: Vec<Block>,
}

impl ExtractedDocument {
    pub fn new(format: SourceFormat) -> Self {
        Self {
            format: Some(format),
            blocks: Vec::new(),
        }
    }

    /// Append a unit (slide or page) if it has any content.
    ///
    /// `marker` is placed in front of the unit's blocks; an empty unit adds
    /// nothing, not even its marker.
    pub fn push_unit(&mut self, marker: Option<Block>, blocks: Vec<Block>) {
        if blocks.is_empty() {
            return;
        }
        self.blocks.extend(marker);
        self.blocks.extend(blocks);
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(Block::is_marker)
    }

    /// Indices carried by the markers, in order.
    pub fn marker_indices(&self) -> Vec<usize> {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Marker { index, .. } => Some(*index),
                _ => None,
            })
            .collect()
    }

    /// Split into units: each starts at a marker (or at the first block).
    pub fn units(&self) -> Vec<&[Block]> {
        let mut units = Vec::new();
        let mut start = 0;
        for (i, block) in self.blocks.iter().enumerate() {
            if block.is_marker() && i > start {
                units.push(&self.blocks[start..i]);
                start = i;
            }
        }
        if start < self.blocks.len() {
            units.push(&self.blocks[start..]);
        }
        units
    }

    /// Flatten to text: blocks of a unit joined by a newline, units by a
    /// blank line.
    pub fn to_text(&self) -> String {
        self.units()
            .into_iter()
            .map(|unit| {
                unit.iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(index: usize) -> Option<Block> {
        Some(Block::Marker {
            kind: MarkerKind::Section,
            index,
        })
    }

    #[test]
    fn format_detection_is_case_insensitive() {
        assert_eq!(SourceFormat::from_path("a/Deck.PPTX").unwrap(), SourceFormat::SlideDeck);
        assert_eq!(SourceFormat::from_path("paper.pdf").unwrap(), SourceFormat::PagedDocument);
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let err = SourceFormat::from_path("/tmp/notes.txt").unwrap_err();
        match err {
            NoteError::UnsupportedFormat { name } => assert_eq!(name, "notes.txt"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(SourceFormat::from_path("no_extension").is_err());
    }

    #[test]
    fn blank_blocks_are_not_built() {
        assert!(Block::heading("  ").is_none());
        assert!(Block::bullet(2, "\n").is_none());
        assert!(Block::table(None, vec![vec!["", " "]]).is_none());
    }

    #[test]
    fn table_drops_blank_cells() {
        let block = Block::table(None, vec![vec!["a", " ", "b"], vec!["", ""], vec!["c"]]).unwrap();
        assert_eq!(block.to_string(), "a | b\nc");
    }

    #[test]
    fn bullet_indents_by_level() {
        assert_eq!(Block::bullet(0, "top").unwrap().to_string(), "- top");
        assert_eq!(Block::bullet(2, "deep").unwrap().to_string(), "    - deep");
    }

    #[test]
    fn empty_unit_leaves_no_marker() {
        let mut doc = ExtractedDocument::new(SourceFormat::SlideDeck);
        doc.push_unit(section(1), vec![Block::heading("Intro").unwrap()]);
        doc.push_unit(section(2), vec![]);
        doc.push_unit(section(3), vec![Block::bullet(0, "x").unwrap()]);
        assert_eq!(doc.marker_indices(), vec![1, 3]);
    }

    #[test]
    fn text_joins_units_with_blank_line() {
        let mut doc = ExtractedDocument::new(SourceFormat::SlideDeck);
        doc.push_unit(
            section(1),
            vec![Block::heading("Intro").unwrap(), Block::bullet(1, "A").unwrap()],
        );
        doc.push_unit(section(4), vec![Block::notes("say hi").unwrap()]);
        assert_eq!(
            doc.to_text(),
            "=== SECTION 1 ===\nTITLE: Intro\n  - A\n\n=== SECTION 4 ===\nNOTES:\nsay hi"
        );
    }

    #[test]
    fn unmarked_document_is_one_unit() {
        let mut doc = ExtractedDocument::new(SourceFormat::PagedDocument);
        doc.push_unit(None, vec![Block::paragraph("body").unwrap(), Block::Label("TABLES:".into())]);
        assert_eq!(doc.units().len(), 1);
        assert_eq!(doc.to_text(), "body\nTABLES:");
    }

    #[test]
    fn empty_document() {
        let doc = ExtractedDocument::default();
        assert!(doc.is_empty());
        assert_eq!(doc.to_text(), "");
    }
}
