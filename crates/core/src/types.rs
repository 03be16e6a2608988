//! Domain types for representing a loaded slide deck.
//!
//! The tree mirrors the container: slide → shape → text frame → paragraph → run.
//! Only a run's `text` is meant to be mutated; everything else describes the
//! partitioning of the source file and must survive a save unchanged.

use serde::{Deserialize, Serialize};

/// An entire deck with its slides in presentation order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Deck {
    /// Original filename (without path).
    pub filename: String,

    /// Slides in presentation order.
    pub slides: Vec<Slide>,
}

impl Deck {
    /// Create an empty deck with the given filename.
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            slides: Vec::new(),
        }
    }

    /// Add a slide to the deck.
    pub fn add_slide(&mut self, slide: Slide) {
        self.slides.push(slide);
    }

    /// Iterate over every run in document order.
    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.slides.iter().flat_map(Slide::runs)
    }

    /// Count slides, shapes, paragraphs and runs.
    pub fn structure(&self) -> Structure {
        let mut counts = Structure {
            slides: self.slides.len(),
            ..Structure::default()
        };
        for slide in &self.slides {
            counts.shapes += slide.shapes.len();
            for frame in slide.shapes.iter().filter_map(|s| s.text_frame.as_ref()) {
                counts.paragraphs += frame.paragraphs.len();
                counts.runs += frame.paragraphs.iter().map(|p| p.runs.len()).sum::<usize>();
            }
        }
        counts
    }
}

/// Node counts of a deck, used to check that substitution preserved layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Structure {
    pub slides: usize,
    pub shapes: usize,
    pub paragraphs: usize,
    pub runs: usize,
}

/// A single slide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slide {
    /// 1-based slide number.
    pub number: usize,

    /// Package part holding this slide, e.g. `ppt/slides/slide1.xml`.
    pub part_name: String,

    /// Shapes directly on the slide's shape tree, in z-order.
    pub shapes: Vec<Shape>,
}

impl Slide {
    /// Create a new slide with the given number and part name.
    pub fn new(number: usize, part_name: impl Into<String>) -> Self {
        Self {
            number,
            part_name: part_name.into(),
            shapes: Vec::new(),
        }
    }

    /// Iterate over every run on this slide.
    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.shapes
            .iter()
            .filter_map(|s| s.text_frame.as_ref())
            .flat_map(|f| f.paragraphs.iter())
            .flat_map(|p| p.runs.iter())
    }

    /// Iterate mutably over every run on this slide.
    pub fn runs_mut(&mut self) -> impl Iterator<Item = &mut Run> {
        self.shapes
            .iter_mut()
            .filter_map(|s| s.text_frame.as_mut())
            .flat_map(|f| f.paragraphs.iter_mut())
            .flat_map(|p| p.runs.iter_mut())
    }

    /// Whether any run on this slide differs from its loaded text.
    pub fn is_modified(&self) -> bool {
        self.runs().any(Run::is_modified)
    }
}

/// A shape on a slide. Pictures, connectors and group shapes carry no text frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Shape {
    /// Element kind, e.g. `sp`, `pic`, `grpSp`.
    pub kind: String,

    /// Shape id from the non-visual properties, when present.
    pub id: Option<u32>,

    /// Shape name from the non-visual properties.
    pub name: String,

    pub text_frame: Option<TextFrame>,
}

impl Shape {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextFrame {
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Paragraph {
    pub runs: Vec<Run>,
}

impl Paragraph {
    /// Concatenated text of all runs.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// A run of uniformly formatted text.
///
/// Formatting lives in the container and is never touched; the run only
/// carries its current text and the text it was loaded with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Run {
    /// Current text content.
    pub text: String,

    #[serde(skip)]
    loaded: String,
}

impl Run {
    /// Create a run as loaded from a container.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            loaded: text.clone(),
            text,
        }
    }

    /// Text the run had when it was loaded.
    pub fn loaded_text(&self) -> &str {
        &self.loaded
    }

    /// Whether the text differs from what was loaded.
    pub fn is_modified(&self) -> bool {
        self.text != self.loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_slide() -> Slide {
        let mut slide = Slide::new(1, "ppt/slides/slide1.xml");
        let mut title = Shape::new("sp");
        title.text_frame = Some(TextFrame {
            paragraphs: vec![
                Paragraph {
                    runs: vec![Run::new("Hello "), Run::new("{{CHILD_NAME}}")],
                },
                Paragraph::default(),
            ],
        });
        slide.shapes.push(title);
        slide.shapes.push(Shape::new("pic"));
        slide
    }

    #[test]
    fn test_structure_counts() {
        let mut deck = Deck::new("book.pptx");
        deck.add_slide(sample_slide());
        deck.add_slide(Slide::new(2, "ppt/slides/slide2.xml"));

        assert_eq!(
            deck.structure(),
            Structure {
                slides: 2,
                shapes: 2,
                paragraphs: 2,
                runs: 2,
            }
        );
    }

    #[test]
    fn test_run_modification_tracking() {
        let mut slide = sample_slide();
        assert!(!slide.is_modified());

        let run = slide.runs_mut().nth(1).unwrap();
        run.text = "Emma".to_string();
        assert!(run.is_modified());
        assert_eq!(run.loaded_text(), "{{CHILD_NAME}}");
        assert!(slide.is_modified());
    }

    #[test]
    fn test_paragraph_text_joins_runs() {
        let slide = sample_slide();
        let frame = slide.shapes[0].text_frame.as_ref().unwrap();
        assert_eq!(frame.paragraphs[0].text(), "Hello {{CHILD_NAME}}");
    }
}
