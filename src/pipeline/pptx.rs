//! Slide-deck extraction: `.pptx` → [`ExtractedDocument`].
//!
//! A `.pptx` file is a zip archive of XML parts. Slide order is not the
//! order of the `slideN.xml` file names but the order of `<p:sldId>` entries
//! in `ppt/presentation.xml`, each pointing at its slide part through
//! `ppt/_rels/presentation.xml.rels`. Speaker notes hang off each slide's own
//! relationship file.
//!
//! Every slide part is read with a streaming `quick-xml` pass that collects
//! the shape tree as a flat list of [`Item`]s (text shapes and tables, in
//! document order, group shapes flattened). Of each `mc:AlternateContent`
//! only the first `mc:Choice` is read; the other branches repeat the same
//! content. The slide is then assembled:
//!
//! ```text
//! === SECTION 3 ===        original 1-based slide index
//! TITLE: Results           title placeholder, always first
//! - Finding one            one bullet per non-empty paragraph,
//!   - Detail               indented by the paragraph's `lvl`
//! Year | Value             one line per non-empty table row
//! NOTES:                   speaker notes, only when requested
//! Mention the caveat.
//! ```
//!
//! A slide with no title, no content and no requested notes is dropped
//! together with its marker.

use crate::error::NoteError;
use crate::pipeline::document::{Block, ExtractedDocument, MarkerKind, SourceFormat};
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";
const NOTES_REL_SUFFIX: &str = "/notesSlide";

/// Decoding failures inside the container. Mapped to
/// [`NoteError::ExtractionFailed`] at the module boundary.
#[derive(Debug, Error)]
pub enum DeckError {
    #[error("not a valid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed XML attribute: {0}")]
    Attr(#[from] AttrError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing part '{0}' (is this a PowerPoint file?)")]
    MissingPart(String),
}

/// Extract a `.pptx` file from disk.
pub fn extract_pptx(path: &Path, include_notes: bool) -> Result<ExtractedDocument, NoteError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => NoteError::NotFound {
            path: path.to_path_buf(),
        },
        _ => NoteError::ExtractionFailed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        },
    })?;

    read_deck(BufReader::new(file), include_notes).map_err(|e| NoteError::ExtractionFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

/// Extract a slide deck from any seekable reader.
pub fn read_deck<R: Read + Seek>(
    reader: R,
    include_notes: bool,
) -> Result<ExtractedDocument, DeckError> {
    let mut archive = ZipArchive::new(reader)?;

    let presentation = read_part(&mut archive, PRESENTATION_PART)?
        .ok_or_else(|| DeckError::MissingPart(PRESENTATION_PART.into()))?;
    let rels_xml = read_part(&mut archive, PRESENTATION_RELS)?
        .ok_or_else(|| DeckError::MissingPart(PRESENTATION_RELS.into()))?;

    let slide_ids = parse_slide_ids(&presentation)?;
    let rels = parse_relationships(&rels_xml)?;

    let mut doc = ExtractedDocument::new(SourceFormat::SlideDeck);

    for (i, rel_id) in slide_ids.iter().enumerate() {
        let index = i + 1;
        let Some(rel) = rels.iter().find(|r| &r.id == rel_id) else {
            debug!("Slide {}: relationship {} not found, skipping", index, rel_id);
            continue;
        };
        let part = resolve_target("ppt", &rel.target);
        let Some(slide_xml) = read_part(&mut archive, &part)? else {
            debug!("Slide {}: part {} missing, skipping", index, part);
            continue;
        };

        let items = parse_shapes(&slide_xml)?;
        let notes = if include_notes {
            read_notes(&mut archive, &part)?
        } else {
            None
        };

        let blocks = assemble_slide(items, notes.as_deref());
        debug!("Slide {}: {} blocks", index, blocks.len());
        doc.push_unit(
            Some(Block::Marker {
                kind: MarkerKind::Section,
                index,
            }),
            blocks,
        );
    }

    Ok(doc)
}

// ── Slide assembly ───────────────────────────────────────────────────────

/// One entry of a flattened shape tree.
#[derive(Debug, Clone, PartialEq)]
enum Item {
    Shape(Shape),
    Table(Vec<Vec<String>>),
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Shape {
    /// Placeholder type (`title`, `body`, …); `obj` when `<p:ph>` has none.
    placeholder: Option<String>,
    paragraphs: Vec<Paragraph>,
}

impl Shape {
    fn is_title(&self) -> bool {
        matches!(self.placeholder.as_deref(), Some("title") | Some("ctrTitle"))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Paragraph {
    level: usize,
    text: String,
}

fn assemble_slide(items: Vec<Item>, notes: Option<&str>) -> Vec<Block> {
    let title_pos = items
        .iter()
        .position(|item| matches!(item, Item::Shape(s) if s.is_title()));

    let mut blocks = Vec::new();

    if let Some(Item::Shape(title)) = title_pos.map(|i| &items[i]) {
        let text = title
            .paragraphs
            .iter()
            .map(|p| p.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        blocks.extend(Block::heading(&text));
    }

    for (i, item) in items.into_iter().enumerate() {
        if Some(i) == title_pos {
            continue;
        }
        match item {
            Item::Shape(shape) => blocks.extend(
                shape
                    .paragraphs
                    .iter()
                    .filter_map(|p| Block::bullet(p.level, &p.text)),
            ),
            Item::Table(rows) => blocks.extend(Block::table(None, rows)),
        }
    }

    if let Some(notes) = notes {
        blocks.extend(Block::notes(notes));
    }

    blocks
}

/// Text of the notes page's body placeholder, if the slide has one.
fn read_notes<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    slide_part: &str,
) -> Result<Option<String>, DeckError> {
    let (dir, file) = slide_part.rsplit_once('/').unwrap_or(("", slide_part));
    let rels_part = format!("{dir}/_rels/{file}.rels");
    let Some(rels_xml) = read_part(archive, &rels_part)? else {
        return Ok(None);
    };

    let Some(rel) = parse_relationships(&rels_xml)?
        .into_iter()
        .find(|r| r.rel_type.ends_with(NOTES_REL_SUFFIX))
    else {
        return Ok(None);
    };

    let notes_part = resolve_target(dir, &rel.target);
    let Some(notes_xml) = read_part(archive, &notes_part)? else {
        return Ok(None);
    };

    let text = parse_shapes(&notes_xml)?
        .into_iter()
        .find_map(|item| match item {
            Item::Shape(s) if s.placeholder.as_deref() == Some("body") => Some(s),
            _ => None,
        })
        .map(|s| {
            s.paragraphs
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        })
        .filter(|t| !t.is_empty());

    Ok(text)
}

// ── XML parsing ──────────────────────────────────────────────────────────

/// Streaming state while walking a slide's shape tree.
#[derive(Default)]
struct ShapeTreeParser {
    items: Vec<Item>,
    shape: Option<Shape>,
    table: Option<TableState>,
    paragraph: Option<Paragraph>,
    in_text: bool,
    /// One flag per open `mc:AlternateContent`: a branch was already taken.
    alternates: Vec<bool>,
    /// Depth inside a skipped alternate branch, 0 when reading.
    skip_depth: usize,
}

#[derive(Default)]
struct TableState {
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: Option<Vec<String>>,
}

impl ShapeTreeParser {
    fn open(&mut self, e: &BytesStart<'_>) -> Result<(), DeckError> {
        if self.skip_depth > 0 {
            self.skip_depth += 1;
            return Ok(());
        }
        match e.local_name().as_ref() {
            b"AlternateContent" => self.alternates.push(false),
            b"Choice" | b"Fallback" => {
                if let Some(taken) = self.alternates.last_mut() {
                    if *taken {
                        self.skip_depth = 1;
                    } else {
                        *taken = true;
                    }
                }
            }
            b"sp" => self.shape = Some(Shape::default()),
            b"ph" => {
                if let (Some(shape), None) = (self.shape.as_mut(), self.table.as_ref()) {
                    let kind = attribute(e, b"type", false)?.unwrap_or_else(|| "obj".into());
                    shape.placeholder = Some(kind);
                }
            }
            b"tbl" => self.table = Some(TableState::default()),
            b"tr" => {
                if let Some(t) = self.table.as_mut() {
                    t.row.clear();
                }
            }
            b"tc" => {
                if let Some(t) = self.table.as_mut() {
                    t.cell = Some(Vec::new());
                }
            }
            b"p" => {
                let in_cell = self.table.as_ref().is_some_and(|t| t.cell.is_some());
                if in_cell || self.shape.is_some() {
                    self.paragraph = Some(Paragraph::default());
                }
            }
            b"pPr" => {
                if let Some(p) = self.paragraph.as_mut() {
                    if let Some(lvl) = attribute(e, b"lvl", false)? {
                        p.level = lvl.trim().parse().unwrap_or(0);
                    }
                }
            }
            b"t" => self.in_text = self.paragraph.is_some(),
            b"br" => {
                if let Some(p) = self.paragraph.as_mut() {
                    p.text.push(' ');
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, local_name: &[u8]) {
        if self.skip_depth > 0 {
            self.skip_depth -= 1;
            return;
        }
        match local_name {
            b"AlternateContent" => {
                self.alternates.pop();
            }
            b"t" => self.in_text = false,
            b"p" => {
                let Some(paragraph) = self.paragraph.take() else {
                    return;
                };
                if let Some(cell) = self.table.as_mut().and_then(|t| t.cell.as_mut()) {
                    cell.push(paragraph.text);
                } else if let Some(shape) = self.shape.as_mut() {
                    shape.paragraphs.push(paragraph);
                }
            }
            b"tc" => {
                if let Some(t) = self.table.as_mut() {
                    if let Some(cell) = t.cell.take() {
                        let text = cell
                            .iter()
                            .map(|s| s.trim())
                            .filter(|s| !s.is_empty())
                            .collect::<Vec<_>>()
                            .join(" ");
                        t.row.push(text);
                    }
                }
            }
            b"tr" => {
                if let Some(t) = self.table.as_mut() {
                    let row = std::mem::take(&mut t.row);
                    t.rows.push(row);
                }
            }
            b"tbl" => {
                if let Some(t) = self.table.take() {
                    self.items.push(Item::Table(t.rows));
                }
            }
            b"sp" => {
                if let Some(shape) = self.shape.take() {
                    self.items.push(Item::Shape(shape));
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_text && self.skip_depth == 0 {
            if let Some(p) = self.paragraph.as_mut() {
                p.text.push_str(text);
            }
        }
    }
}

fn parse_shapes(xml: &str) -> Result<Vec<Item>, DeckError> {
    let mut reader = Reader::from_str(xml);
    let mut parser = ShapeTreeParser::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => parser.open(&e)?,
            Event::Empty(e) => {
                parser.open(&e)?;
                parser.close(e.local_name().as_ref());
            }
            Event::End(e) => parser.close(e.local_name().as_ref()),
            Event::Text(t) => {
                let text = t.unescape()?;
                parser.text(&text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(parser.items)
}

/// Relationship ids of `<p:sldId>` entries, in presentation order.
fn parse_slide_ids(xml: &str) -> Result<Vec<String>, DeckError> {
    let mut reader = Reader::from_str(xml);
    let mut ids = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sldId" => {
                if let Some(id) = attribute(&e, b"id", true)? {
                    ids.push(id);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(ids)
}

#[derive(Debug, Clone)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
}

fn parse_relationships(xml: &str) -> Result<Vec<Relationship>, DeckError> {
    let mut reader = Reader::from_str(xml);
    let mut rels = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let id = attribute(&e, b"Id", false)?;
                let target = attribute(&e, b"Target", false)?;
                if let (Some(id), Some(target)) = (id, target) {
                    rels.push(Relationship {
                        id,
                        rel_type: attribute(&e, b"Type", false)?.unwrap_or_default(),
                        target,
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(rels)
}

/// Value of the attribute with local name `local`; `prefixed` selects
/// `r:id` over a plain `id`.
fn attribute(e: &BytesStart<'_>, local: &[u8], prefixed: bool) -> Result<Option<String>, DeckError> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == local && attr.key.prefix().is_some() == prefixed {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

// ── Archive helpers ──────────────────────────────────────────────────────

fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>, DeckError> {
    let mut file = match archive.by_name(name) {
        Ok(f) => f,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    file.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_target(base_dir: &str, target: &str) -> String {
    let (mut parts, rel): (Vec<&str>, &str) = match target.strip_prefix('/') {
        Some(absolute) => (Vec::new(), absolute),
        None => (base_dir.split('/').filter(|s| !s.is_empty()).collect(), target),
    };
    for seg in rel.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}
