//! A loaded PPTX package together with its deck tree.

use crate::parser::PptxParser;
use crate::writer::write_package;
use std::collections::BTreeSet;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use storybook_core::{
    find_placeholders, substitute, Deck, Error, Replacements, Result, SubstitutionReport,
};
use tempfile::NamedTempFile;

/// A PPTX file held in memory.
///
/// The original package bytes are kept so that saving copies every part the
/// deck tree does not describe.
#[derive(Debug, Clone)]
pub struct PptxDocument {
    deck: Deck,
    package: Vec<u8>,
}

impl PptxDocument {
    /// Load a PPTX file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }

        let package = fs::read(path)?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown");

        log::debug!("Loading {} ({} bytes)", path.display(), package.len());
        Self::from_bytes(package, filename)
    }

    /// Load a PPTX package from bytes.
    pub fn from_bytes(package: Vec<u8>, filename: &str) -> Result<Self> {
        let deck = PptxParser::new().parse(Cursor::new(package.as_slice()), filename)?;
        Ok(Self { deck, package })
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn deck_mut(&mut self) -> &mut Deck {
        &mut self.deck
    }

    /// Distinct placeholder tokens present in the deck, sorted.
    pub fn placeholders(&self) -> BTreeSet<String> {
        find_placeholders(&self.deck)
    }

    /// Substitute tokens in every run.
    pub fn apply(&mut self, replacements: &Replacements) -> SubstitutionReport {
        substitute::apply(&mut self.deck, replacements)
    }

    /// Serialize the package with the deck's current text.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        write_package(&self.package, &self.deck)
    }

    /// Write the package to `destination`, creating parent directories and
    /// replacing any existing file.
    ///
    /// The package is written to a temporary file beside the destination and
    /// renamed over it, so a failed save leaves any previous file untouched.
    pub fn save(&self, destination: impl AsRef<Path>) -> Result<PathBuf> {
        let destination = destination.as_ref();
        let bytes = self.to_bytes()?;

        replace_file(destination, |file| file.write_all(&bytes))?;

        log::info!("Saved {}", destination.display());
        Ok(destination.to_path_buf())
    }
}

/// Fill a temporary file in the destination's directory with `fill`, then
/// move it into place.
fn replace_file(
    destination: &Path,
    fill: impl FnOnce(&mut fs::File) -> std::io::Result<()>,
) -> Result<()> {
    let parent = match destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent,
        None => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| Error::write(parent, e))?;

    let mut staged = NamedTempFile::new_in(parent).map_err(|e| Error::write(parent, e))?;
    fill(staged.as_file_mut())
        .and_then(|_| staged.as_file().sync_all())
        .map_err(|e| Error::write(destination, e))?;
    staged
        .persist(destination)
        .map_err(|e| Error::write(destination, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{build_pptx, group_shape, picture_shape, slide_xml, text_shape, MEDIA_BYTES};
    use std::io::Read;
    use storybook_core::ErrorKind;
    use zip::ZipArchive;

    fn storybook_bytes() -> Vec<u8> {
        build_pptx(&[
            slide_xml(&format!(
                "{}{}",
                text_shape(2, "Title", &[&["{{CHILD_NAME_UPPER}}'s Gift"], &["By Aanchal"]]),
                picture_shape(3)
            )),
            slide_xml(&text_shape(2, "Body", &[&["Snow fell."]])),
            slide_xml(&format!(
                "{}{}",
                text_shape(2, "Body", &[&["Dear {{CHILD_NAME}}, Dear {{CHILD_NAME}}"], &["{{CHIL", "D_NAME}}"]]),
                group_shape(5, "{{CHILD_NAME}} in a group")
            )),
        ])
    }

    fn entry(bytes: &[u8], name: &str) -> Vec<u8> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut content = Vec::new();
        file.read_to_end(&mut content).unwrap();
        content
    }

    fn run_texts(doc: &PptxDocument) -> Vec<String> {
        doc.deck().runs().map(|r| r.text.clone()).collect()
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let err = PptxDocument::open(dir.path().join("missing.pptx")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_load_tree() {
        let doc = PptxDocument::from_bytes(storybook_bytes(), "book.pptx").unwrap();
        let deck = doc.deck();

        assert_eq!(deck.filename, "book.pptx");
        assert_eq!(deck.slides.len(), 3);
        assert_eq!(deck.slides[0].shapes.len(), 2);
        assert_eq!(deck.slides[0].shapes[1].kind, "pic");
        assert_eq!(deck.slides[2].shapes[1].kind, "grpSp");
        assert!(deck.slides[2].shapes[1].text_frame.is_none());

        let placeholders: Vec<String> = doc.placeholders().into_iter().collect();
        assert_eq!(placeholders, vec!["{{CHILD_NAME_UPPER}}", "{{CHILD_NAME}}"]);
    }

    #[test]
    fn test_personalize_round_trip() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let mut doc = PptxDocument::from_bytes(storybook_bytes(), "book.pptx").unwrap();
        let before = doc.deck().structure();

        let report = doc.apply(&Replacements::for_child("Emma"));
        assert_eq!(report.total_replacements, 2);
        assert_eq!(report.slides_modified, 2);

        let out = doc.save(dir.path().join("out/Emma_Storybook.pptx")).unwrap();
        let reloaded = PptxDocument::open(&out).unwrap();

        assert_eq!(reloaded.deck().structure(), before);
        assert_eq!(
            run_texts(&reloaded),
            vec![
                "EMMA's Gift",
                "By Aanchal",
                "Snow fell.",
                "Dear Emma, Dear Emma",
                "{{CHIL",
                "D_NAME}}",
            ]
        );
    }

    #[test]
    fn test_save_preserves_untouched_parts() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let original = storybook_bytes();
        let mut doc = PptxDocument::from_bytes(original.clone(), "book.pptx").unwrap();
        doc.apply(&Replacements::for_child("Liam"));
        let saved = fs::read(doc.save(dir.path().join("Liam.pptx")).unwrap()).unwrap();

        assert_eq!(entry(&saved, "ppt/media/image1.png"), MEDIA_BYTES);
        assert_eq!(
            entry(&saved, "ppt/slides/slide2.xml"),
            entry(&original, "ppt/slides/slide2.xml")
        );

        let slide3 = String::from_utf8(entry(&saved, "ppt/slides/slide3.xml")).unwrap();
        assert!(slide3.contains(r#"<a:rPr lang="en-US" sz="2400" b="1" dirty="0"/><a:t>Dear Liam, Dear Liam</a:t>"#));
        assert!(slide3.contains("{{CHILD_NAME}} in a group"));
        assert!(slide3.contains(r#"<a:off x="838200" y="365125"/>"#));
    }

    #[test]
    fn test_save_overwrites_existing_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let dest = dir.path().join("deck.pptx");
        fs::write(&dest, b"stale").unwrap();

        let doc = PptxDocument::from_bytes(storybook_bytes(), "book.pptx").unwrap();
        doc.save(&dest).unwrap();

        assert!(PptxDocument::open(&dest).is_ok());
    }

    #[test]
    fn test_save_to_unwritable_destination() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let doc = PptxDocument::from_bytes(storybook_bytes(), "book.pptx").unwrap();

        // A directory already occupies the destination path
        let err = doc.save(dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_failed_write_keeps_previous_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let dest = dir.path().join("Emma_Storybook.pptx");
        fs::write(&dest, b"previous deck").unwrap();

        let err = replace_file(&dest, |file| {
            file.write_all(b"PK\x03\x04 half a package")?;
            Err(std::io::Error::new(std::io::ErrorKind::Other, "No space left on device"))
        })
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(fs::read(&dest).unwrap(), b"previous deck");
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1, "staged file left behind");
    }

    #[test]
    fn test_failed_write_creates_nothing() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let dest = dir.path().join("new/deck.pptx");

        let result = replace_file(&dest, |_| {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "interrupted"))
        });

        assert!(result.is_err());
        assert!(!dest.exists());
    }

    #[test]
    fn test_second_apply_changes_nothing() {
        let replacements = Replacements::for_child("Noah");
        let mut doc = PptxDocument::from_bytes(storybook_bytes(), "book.pptx").unwrap();
        doc.apply(&replacements);
        let first = run_texts(&doc);

        let second = doc.apply(&replacements);
        assert_eq!(second.total_replacements, 0);
        assert_eq!(run_texts(&doc), first);
    }
}
