//! Shared fixtures for the integration tests: an in-memory `.pptx` builder
//! and a recording completion backend.

#![allow(dead_code)]

use async_trait::async_trait;
use note_maker::{CompletionBackend, NoteError, Prompt};
use std::io::{Cursor, Write};
use std::sync::Mutex;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Shapes of one slide.
#[derive(Default)]
pub struct SlideSpec {
    pub title: Option<&'static str>,
    pub bullets: Vec<(usize, &'static str)>,
    pub table: Vec<Vec<&'static str>>,
}

impl SlideSpec {
    pub fn titled(title: &'static str) -> Self {
        Self {
            title: Some(title),
            ..Default::default()
        }
    }

    pub fn bullet(mut self, level: usize, text: &'static str) -> Self {
        self.bullets.push((level, text));
        self
    }

    pub fn row(mut self, cells: &[&'static str]) -> Self {
        self.table.push(cells.to_vec());
        self
    }

    fn to_xml(&self) -> String {
        let mut shapes = String::new();
        if let Some(title) = self.title {
            shapes.push_str(&format!(
                r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:txBody><a:bodyPr/><a:p><a:r><a:t>{title}</a:t></a:r></a:p></p:txBody></p:sp>"#
            ));
        }
        if !self.bullets.is_empty() {
            let ps: String = self
                .bullets
                .iter()
                .map(|(lvl, t)| format!(r#"<a:p><a:pPr lvl="{lvl}"/><a:r><a:t>{t}</a:t></a:r></a:p>"#))
                .collect();
            shapes.push_str(&format!(
                r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="Content"/><p:cNvSpPr/><p:nvPr><p:ph idx="1"/></p:nvPr></p:nvSpPr><p:txBody><a:bodyPr/>{ps}</p:txBody></p:sp>"#
            ));
        }
        if !self.table.is_empty() {
            let trs: String = self
                .table
                .iter()
                .map(|row| {
                    let tcs: String = row
                        .iter()
                        .map(|c| format!(r#"<a:tc><a:txBody><a:bodyPr/><a:p><a:r><a:t>{c}</a:t></a:r></a:p></a:txBody></a:tc>"#))
                        .collect();
                    format!("<a:tr>{tcs}</a:tr>")
                })
                .collect();
            shapes.push_str(&format!(
                r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="4" name="Table"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr><a:graphic><a:graphicData><a:tbl>{trs}</a:tbl></a:graphicData></a:graphic></p:graphicFrame>"#
            ));
        }
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sld {NS}><p:cSld><p:spTree><p:nvGrpSpPr/><p:grpSpPr/>{shapes}</p:spTree></p:cSld></p:sld>"#
        )
    }
}

/// Zip the slides into a `.pptx`, in the given order.
pub fn build_deck(slides: &[SlideSpec]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = SimpleFileOptions::default();

    let ids: String = (1..=slides.len())
        .map(|n| format!(r#"<p:sldId id="{}" r:id="rId{n}"/>"#, 255 + n))
        .collect();
    zip.start_file("ppt/presentation.xml", opts).unwrap();
    write!(
        zip,
        r#"<?xml version="1.0"?><p:presentation {NS}><p:sldIdLst>{ids}</p:sldIdLst></p:presentation>"#
    )
    .unwrap();

    let rels: String = (1..=slides.len())
        .map(|n| format!(r#"<Relationship Id="rId{n}" Type="{REL_NS}/slide" Target="slides/slide{n}.xml"/>"#))
        .collect();
    zip.start_file("ppt/_rels/presentation.xml.rels", opts).unwrap();
    write!(zip, r#"<?xml version="1.0"?><Relationships xmlns="{PKG_REL_NS}">{rels}</Relationships>"#).unwrap();

    for (i, spec) in slides.iter().enumerate() {
        zip.start_file(format!("ppt/slides/slide{}.xml", i + 1), opts)
            .unwrap();
        zip.write_all(spec.to_xml().as_bytes()).unwrap();
    }

    zip.finish().unwrap().into_inner()
}

/// Backend that records every prompt and answers with a fixed reply.
pub struct RecordingBackend {
    reply: String,
    pub prompts: Mutex<Vec<Prompt>>,
}

impl RecordingBackend {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_user_message(&self) -> String {
        self.prompts
            .lock()
            .unwrap()
            .last()
            .map(|p| p.user.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CompletionBackend for RecordingBackend {
    async fn complete(&self, prompt: &Prompt) -> Result<String, NoteError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        Ok(self.reply.clone())
    }
}
