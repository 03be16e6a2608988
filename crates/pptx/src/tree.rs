//! Classification of slide XML elements into deck tree nodes.
//!
//! Loader and writer both walk the slide XML through [`SlideTracker`], so the
//! n-th run seen while saving is the n-th run created while loading.

/// Role of an element in the slide tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Node {
    /// `p:sld`
    Slide,
    /// `p:cSld`
    CommonData,
    /// `p:spTree`
    ShapeTree,
    /// Shape element directly under the shape tree: `p:sp`, `p:grpSp`,
    /// `p:graphicFrame`, `p:cxnSp`, `p:pic` or `p:contentPart`.
    Shape,
    /// `p:nvSpPr`, `p:nvPicPr`, ... of a shape.
    NonVisual,
    /// `p:cNvPr` carrying the shape id and name.
    ShapeIdentity,
    /// `p:txBody` of a shape.
    TextFrame,
    /// `a:p`
    Paragraph,
    /// `a:r`
    Run,
    /// `a:t` of a run.
    RunText,
    Other,
}

fn classify(parent: Option<Node>, local: &[u8]) -> Node {
    match (parent, local) {
        (None, b"sld") => Node::Slide,
        (Some(Node::Slide), b"cSld") => Node::CommonData,
        (Some(Node::CommonData), b"spTree") => Node::ShapeTree,
        (
            Some(Node::ShapeTree),
            b"sp" | b"grpSp" | b"graphicFrame" | b"cxnSp" | b"pic" | b"contentPart",
        ) => Node::Shape,
        (
            Some(Node::Shape),
            b"nvSpPr"
            | b"nvPicPr"
            | b"nvGrpSpPr"
            | b"nvGraphicFramePr"
            | b"nvCxnSpPr"
            | b"nvContentPartPr",
        ) => Node::NonVisual,
        (Some(Node::Shape), b"txBody") => Node::TextFrame,
        (Some(Node::NonVisual), b"cNvPr") => Node::ShapeIdentity,
        (Some(Node::TextFrame), b"p") => Node::Paragraph,
        (Some(Node::Paragraph), b"r") => Node::Run,
        (Some(Node::Run), b"t") => Node::RunText,
        _ => Node::Other,
    }
}

/// Stack of open elements, classified as they are entered.
#[derive(Debug, Default)]
pub(crate) struct SlideTracker {
    stack: Vec<Node>,
}

impl SlideTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Enter a start tag.
    pub(crate) fn open(&mut self, name: &[u8]) -> Node {
        let node = classify(self.current(), local_name(name));
        self.stack.push(node);
        node
    }

    /// Classify a self-closing tag without entering it.
    pub(crate) fn empty(&self, name: &[u8]) -> Node {
        classify(self.current(), local_name(name))
    }

    /// Leave the current element.
    pub(crate) fn close(&mut self) -> Option<Node> {
        self.stack.pop()
    }

    pub(crate) fn current(&self) -> Option<Node> {
        self.stack.last().copied()
    }
}

/// Extract the local name from a potentially namespaced XML element name.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"p:sp"), b"sp");
        assert_eq!(local_name(b"a:t"), b"t");
        assert_eq!(local_name(b"sp"), b"sp");
    }

    #[test]
    fn test_run_text_path() {
        let mut tracker = SlideTracker::new();
        let path = [
            ("p:sld", Node::Slide),
            ("p:cSld", Node::CommonData),
            ("p:spTree", Node::ShapeTree),
            ("p:sp", Node::Shape),
            ("p:txBody", Node::TextFrame),
            ("a:p", Node::Paragraph),
            ("a:r", Node::Run),
            ("a:t", Node::RunText),
        ];
        for (name, expected) in path {
            assert_eq!(tracker.open(name.as_bytes()), expected, "{}", name);
        }
    }

    #[test]
    fn test_grouped_and_table_text_is_not_a_run() {
        let mut tracker = SlideTracker::new();
        for name in ["p:sld", "p:cSld", "p:spTree"] {
            tracker.open(name.as_bytes());
        }
        assert_eq!(tracker.open(b"p:grpSp"), Node::Shape);
        assert_eq!(tracker.open(b"p:sp"), Node::Other);
        assert_eq!(tracker.open(b"p:txBody"), Node::Other);
        assert_eq!(tracker.open(b"a:p"), Node::Other);
        for _ in 0..4 {
            tracker.close();
        }

        assert_eq!(tracker.open(b"p:graphicFrame"), Node::Shape);
        assert_eq!(tracker.open(b"a:graphic"), Node::Other);
        assert_eq!(tracker.empty(b"a:txBody"), Node::Other);
    }

    #[test]
    fn test_shape_tree_properties_are_not_shapes() {
        let mut tracker = SlideTracker::new();
        for name in ["p:sld", "p:cSld", "p:spTree"] {
            tracker.open(name.as_bytes());
        }
        assert_eq!(tracker.empty(b"p:grpSpPr"), Node::Other);
        assert_eq!(tracker.open(b"p:nvGrpSpPr"), Node::Other);
        tracker.close();
        assert_eq!(tracker.open(b"p:pic"), Node::Shape);
        assert_eq!(tracker.open(b"p:nvPicPr"), Node::NonVisual);
        assert_eq!(tracker.empty(b"p:cNvPr"), Node::ShapeIdentity);
    }

    #[test]
    fn test_only_shape_elements_are_shapes() {
        let mut tracker = SlideTracker::new();
        for name in ["p:sld", "p:cSld", "p:spTree"] {
            tracker.open(name.as_bytes());
        }
        for name in ["p:sp", "p:grpSp", "p:graphicFrame", "p:cxnSp", "p:pic", "p:contentPart"] {
            assert_eq!(tracker.empty(name.as_bytes()), Node::Shape, "{}", name);
        }

        // Markup-compatibility wrappers are not shapes, nor is anything inside them
        assert_eq!(tracker.open(b"mc:AlternateContent"), Node::Other);
        assert_eq!(tracker.open(b"mc:Choice"), Node::Other);
        assert_eq!(tracker.open(b"p:sp"), Node::Other);
        assert_eq!(tracker.open(b"p:txBody"), Node::Other);
    }
}
