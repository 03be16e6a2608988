//! PPTX file parser implementation.

use crate::tree::{local_name, Node, SlideTracker};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Read, Seek};
use storybook_core::{Deck, Error, Paragraph, Result, Run, Shape, Slide, TextFrame};
use zip::ZipArchive;

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";

/// Parser for PPTX (Office Open XML) files.
pub struct PptxParser;

impl PptxParser {
    /// Create a new PPTX parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse a PPTX file from a reader into a deck tree.
    pub fn parse<R: Read + Seek>(&self, reader: R, filename: &str) -> Result<Deck> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let mut deck = Deck::new(filename);

        // Slide order comes from presentation.xml's sldIdLst
        let slide_order = self.get_slide_order(&mut archive)?;

        for (idx, part_name) in slide_order.iter().enumerate() {
            let content = read_file_from_archive(&mut archive, part_name)?;
            let slide = parse_slide_xml(&content, idx + 1, part_name)?;
            log::debug!(
                "Slide {} ({}): {} shape(s)",
                slide.number,
                part_name,
                slide.shapes.len()
            );
            deck.add_slide(slide);
        }

        Ok(deck)
    }

    /// Get the ordered list of slide part names.
    fn get_slide_order<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
        let rels_content = read_file_from_archive(archive, PRESENTATION_RELS)?;
        let targets = parse_relationships(&rels_content)?;

        let presentation = read_file_from_archive(archive, PRESENTATION_PART)?;
        let slide_ids = parse_slide_id_list(&presentation)?;

        slide_ids
            .into_iter()
            .map(|rel_id| {
                targets
                    .get(&rel_id)
                    .map(|target| resolve_target("ppt", target))
                    .ok_or_else(|| {
                        Error::CorruptedFile(format!(
                            "Slide relationship '{}' missing from {}",
                            rel_id, PRESENTATION_RELS
                        ))
                    })
            })
            .collect()
    }
}

impl Default for PptxParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Map relationship ids to their targets.
fn parse_relationships(xml: &str) -> Result<HashMap<String, String>> {
    let mut targets = HashMap::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let mut id = String::new();
                let mut target = String::new();

                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = String::from_utf8_lossy(&attr.value).to_string(),
                        b"Target" => target = String::from_utf8_lossy(&attr.value).to_string(),
                        _ => {}
                    }
                }

                if !id.is_empty() {
                    targets.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(targets)
}

/// Relationship ids of `p:sldId` entries, in presentation order.
fn parse_slide_id_list(xml: &str) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldId" =>
            {
                // The plain `id` attribute is the slide id; `r:id` is the relationship.
                let rel_id = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.as_ref().ends_with(b":id"))
                    .map(|a| String::from_utf8_lossy(&a.value).to_string());
                if let Some(rel_id) = rel_id {
                    ids.push(rel_id);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing slide list: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(ids)
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Build the shape/paragraph/run tree of one slide, keeping runs exactly as stored.
pub(crate) fn parse_slide_xml(xml: &str, number: usize, part_name: &str) -> Result<Slide> {
    let mut slide = Slide::new(number, part_name);
    let mut reader = Reader::from_str(xml);
    let mut tracker = SlideTracker::new();
    let mut run_text: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let node = tracker.open(e.name().as_ref());
                if node == Node::Run {
                    run_text = Some(String::new());
                } else {
                    enter_node(&mut slide, node, e);
                }
            }
            Ok(Event::Empty(ref e)) => {
                let node = tracker.empty(e.name().as_ref());
                if node == Node::Run {
                    push_run(&mut slide, Run::new(""));
                } else {
                    enter_node(&mut slide, node, e);
                }
            }
            Ok(Event::Text(ref e)) if tracker.current() == Some(Node::RunText) => {
                let text = e.unescape().map_err(|err| {
                    Error::XmlError(format!("Bad run text in {}: {}", part_name, err))
                })?;
                if let Some(buffer) = run_text.as_mut() {
                    buffer.push_str(&text);
                }
            }
            Ok(Event::CData(ref e)) if tracker.current() == Some(Node::RunText) => {
                if let Some(buffer) = run_text.as_mut() {
                    buffer.push_str(&String::from_utf8_lossy(e));
                }
            }
            Ok(Event::End(_)) => {
                if tracker.close() == Some(Node::Run) {
                    push_run(&mut slide, Run::new(run_text.take().unwrap_or_default()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing {} at position {}: {}",
                    part_name,
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(slide)
}

fn enter_node(slide: &mut Slide, node: Node, e: &BytesStart) {
    match node {
        Node::Shape => {
            let kind = String::from_utf8_lossy(local_name(e.name().as_ref())).to_string();
            slide.shapes.push(Shape::new(kind));
        }
        Node::ShapeIdentity => {
            if let Some(shape) = slide.shapes.last_mut() {
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"id" => shape.id = String::from_utf8_lossy(&attr.value).parse().ok(),
                        b"name" => {
                            shape.name = attr
                                .unescape_value()
                                .map(|v| v.to_string())
                                .unwrap_or_else(|_| {
                                    String::from_utf8_lossy(&attr.value).to_string()
                                });
                        }
                        _ => {}
                    }
                }
            }
        }
        Node::TextFrame => {
            if let Some(shape) = slide.shapes.last_mut() {
                shape.text_frame = Some(TextFrame::default());
            }
        }
        Node::Paragraph => {
            if let Some(frame) = slide
                .shapes
                .last_mut()
                .and_then(|s| s.text_frame.as_mut())
            {
                frame.paragraphs.push(Paragraph::default());
            }
        }
        _ => {}
    }
}

fn push_run(slide: &mut Slide, run: Run) {
    if let Some(paragraph) = slide
        .shapes
        .last_mut()
        .and_then(|s| s.text_frame.as_mut())
        .and_then(|f| f.paragraphs.last_mut())
    {
        paragraph.runs.push(run);
    }
}

/// Read a file from the ZIP archive.
pub(crate) fn read_file_from_archive<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Result<String> {
    let mut file = archive
        .by_name(path)
        .map_err(|e| Error::ZipError(format!("File not found in archive '{}': {}", path, e)))?;

    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

    Ok(content)
}
