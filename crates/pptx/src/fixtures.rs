//! In-memory PPTX packages for tests.

use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const NAMESPACES: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

/// Bytes stored as-is in every fixture, to check raw copying.
pub(crate) const MEDIA_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nnot really an image";

/// Wrap shape XML into a complete slide part.
pub(crate) fn slide_xml(shapes: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld {ns}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{shapes}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
        ns = NAMESPACES,
        shapes = shapes
    )
}

/// A text shape whose paragraphs hold bold 24pt runs with the given texts.
pub(crate) fn text_shape(id: u32, name: &str, paragraphs: &[&[&str]]) -> String {
    let mut body = String::new();
    for runs in paragraphs {
        body.push_str("<a:p>");
        for text in *runs {
            body.push_str(&format!(
                r#"<a:r><a:rPr lang="en-US" sz="2400" b="1" dirty="0"/><a:t>{}</a:t></a:r>"#,
                text
            ));
        }
        body.push_str(r#"<a:endParaRPr lang="en-US" dirty="0"/></a:p>"#);
    }
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="838200" y="365125"/><a:ext cx="10515600" cy="1325563"/></a:xfrm></p:spPr><p:txBody><a:bodyPr wrap="square"/><a:lstStyle/>{body}</p:txBody></p:sp>"#,
        id = id,
        name = name,
        body = body
    )
}

/// A picture shape.
pub(crate) fn picture_shape(id: u32) -> String {
    format!(
        r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="Picture {id}"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId2"/></p:blipFill><p:spPr/></p:pic>"#,
        id = id
    )
}

/// A group holding one text shape.
pub(crate) fn group_shape(id: u32, text: &str) -> String {
    format!(
        r#"<p:grpSp><p:nvGrpSpPr><p:cNvPr id="{id}" name="Group {id}"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{inner}</p:grpSp>"#,
        id = id,
        inner = text_shape(id + 1, "Grouped", &[&[text]])
    )
}

pub(crate) fn build_pptx(slides: &[String]) -> Vec<u8> {
    let order: Vec<usize> = (0..slides.len()).collect();
    build_pptx_with_order(slides, &order)
}

/// Build a package; `order` lists slide indices in presentation order.
pub(crate) fn build_pptx_with_order(slides: &[String], order: &[usize]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let deflated = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let stored = FileOptions::default().compression_method(CompressionMethod::Stored);

    let mut overrides = String::new();
    for idx in 0..slides.len() {
        overrides.push_str(&format!(
            r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
            idx + 1
        ));
    }
    let content_types = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>{}</Types>"#,
        overrides
    );

    let mut rels = String::new();
    for idx in 0..slides.len() {
        rels.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{}.xml"/>"#,
            idx + 2,
            idx + 1
        ));
    }
    let presentation_rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>{}</Relationships>"#,
        rels
    );

    let mut ids = String::new();
    for (pos, idx) in order.iter().enumerate() {
        ids.push_str(&format!(
            r#"<p:sldId id="{}" r:id="rId{}"/>"#,
            256 + pos,
            idx + 2
        ));
    }
    let presentation = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation {}><p:sldIdLst>{}</p:sldIdLst><p:sldSz cx="12192000" cy="6858000"/></p:presentation>"#,
        NAMESPACES, ids
    );

    let mut parts: Vec<(String, Vec<u8>, FileOptions)> = vec![
        ("[Content_Types].xml".into(), content_types.into_bytes(), deflated),
        ("ppt/presentation.xml".into(), presentation.into_bytes(), deflated),
        ("ppt/_rels/presentation.xml.rels".into(), presentation_rels.into_bytes(), deflated),
        ("ppt/media/image1.png".into(), MEDIA_BYTES.to_vec(), stored),
    ];
    for (idx, slide) in slides.iter().enumerate() {
        parts.push((
            format!("ppt/slides/slide{}.xml", idx + 1),
            slide.clone().into_bytes(),
            deflated,
        ));
    }

    for (name, bytes, options) in parts {
        zip.start_file(name, options).unwrap();
        zip.write_all(&bytes).unwrap();
    }
    zip.finish().unwrap().into_inner()
}
