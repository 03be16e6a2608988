//! PPTX package writer.
//!
//! Slide parts whose runs changed are re-serialized event by event, with only
//! the `a:t` content of modified runs replaced. Every other part is copied raw.

use crate::parser::read_file_from_archive;
use crate::tree::{Node, SlideTracker};
use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use storybook_core::{Deck, Error, Result, Run, Slide};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Rebuild the package with the deck's current run text.
pub(crate) fn write_package(package: &[u8], deck: &Deck) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(package))
        .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

    let modified: HashMap<&str, &Slide> = deck
        .slides
        .iter()
        .filter(|s| s.is_modified())
        .map(|s| (s.part_name.as_str(), s))
        .collect();

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut rewritten = 0usize;

    for idx in 0..archive.len() {
        let name = archive
            .by_index_raw(idx)
            .map_err(|e| Error::ZipError(format!("Failed to read entry {}: {}", idx, e)))?
            .name()
            .to_string();

        match modified.get(name.as_str()) {
            Some(slide) => {
                let xml = read_file_from_archive(&mut archive, &name)?;
                let content = rewrite_slide_xml(&xml, slide)?;
                let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
                zip.start_file(name.as_str(), options)
                    .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", name, e)))?;
                zip.write_all(&content)?;
                rewritten += 1;
                log::debug!("Rewrote {}", name);
            }
            None => {
                let file = archive
                    .by_index_raw(idx)
                    .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", name, e)))?;
                zip.raw_copy_file(file)
                    .map_err(|e| Error::ZipError(format!("Failed to copy '{}': {}", name, e)))?;
            }
        }
    }

    if rewritten != modified.len() {
        return Err(Error::CorruptedFile(format!(
            "{} modified slide part(s) missing from the package",
            modified.len() - rewritten
        )));
    }

    let cursor = zip
        .finish()
        .map_err(|e| Error::ZipError(format!("Failed to finish ZIP: {}", e)))?;
    Ok(cursor.into_inner())
}

/// Re-emit a slide part with the text of modified runs replaced.
pub(crate) fn rewrite_slide_xml(xml: &str, slide: &Slide) -> Result<Vec<u8>> {
    let runs: Vec<&Run> = slide.runs().collect();
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut tracker = SlideTracker::new();

    let mut seen_runs = 0usize;
    let mut current: Option<&Run> = None;
    let mut text_written = false;
    let mut replacing = false;

    loop {
        let event = reader.read_event().map_err(|e| {
            Error::XmlError(format!(
                "Error parsing {} at position {}: {}",
                slide.part_name,
                reader.buffer_position(),
                e
            ))
        })?;

        match &event {
            Event::Start(e) => match tracker.open(e.name().as_ref()) {
                Node::Run => {
                    current = runs.get(seen_runs).copied().filter(|r| r.is_modified());
                    text_written = false;
                    seen_runs += 1;
                }
                Node::RunText => {
                    if let Some(run) = current {
                        write(&mut writer, Event::Start(e.clone()))?;
                        if !text_written && !run.text.is_empty() {
                            write(&mut writer, Event::Text(BytesText::new(&run.text)))?;
                        }
                        text_written = true;
                        replacing = true;
                        continue;
                    }
                }
                _ => {}
            },
            Event::Empty(e) => match tracker.empty(e.name().as_ref()) {
                Node::Run => seen_runs += 1,
                Node::RunText => {
                    if let Some(run) = current.filter(|r| !text_written && !r.text.is_empty()) {
                        write(&mut writer, Event::Start(e.clone()))?;
                        write(&mut writer, Event::Text(BytesText::new(&run.text)))?;
                        write(&mut writer, Event::End(e.to_end()))?;
                        text_written = true;
                        continue;
                    }
                }
                _ => {}
            },
            Event::Text(_) | Event::CData(_) if replacing => continue,
            Event::End(_) => match tracker.close() {
                Some(Node::RunText) => replacing = false,
                Some(Node::Run) => current = None,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }

        write(&mut writer, event)?;
    }

    if seen_runs != runs.len() {
        return Err(Error::CorruptedFile(format!(
            "Slide {} has {} run(s) but {} holds {}; runs cannot be added or removed",
            slide.number,
            runs.len(),
            slide.part_name,
            seen_runs
        )));
    }

    Ok(writer.into_inner())
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::XmlError(format!("Failed to write XML: {}", e)))
}
