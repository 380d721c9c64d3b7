use serde::{Deserialize, Serialize};

use crate::core::{Document, NodeId};
use crate::index::DocIndex;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub node: NodeId,
    pub offset: usize,
}

impl Point {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn is_inside(&self, index: &DocIndex) -> bool {
        index.contains(self.anchor.node) && index.contains(self.focus.node)
    }

    /// The same selection with offsets clamped to the nodes they point
    /// into, or `None` when either node is gone.
    pub fn clamped(&self, doc: &Document, index: &DocIndex) -> Option<Self> {
        Some(Self {
            anchor: clamp_point(doc, index, &self.anchor)?,
            focus: clamp_point(doc, index, &self.focus)?,
        })
    }
}

pub fn clamp_point(doc: &Document, index: &DocIndex, point: &Point) -> Option<Point> {
    let node = doc.node(index.path(point.node)?)?;
    Some(Point::new(point.node, node.clamp_offset(point.offset)))
}

/// Tracks the host's selection across focus changes.
///
/// `saved` only ever holds ranges the host reported inside the editable
/// root; results of commands never overwrite it, they only carry it onto
/// the runs that replaced the ones it pointed into.
#[derive(Debug, Clone, Default)]
pub struct SelectionTracker {
    current: Option<Selection>,
    saved: Option<Selection>,
    focused: bool,
}

impl SelectionTracker {
    pub fn new(initial: Selection) -> Self {
        Self {
            current: Some(initial),
            saved: None,
            focused: false,
        }
    }

    pub fn current(&self) -> Option<&Selection> {
        self.current.as_ref()
    }

    pub fn saved(&self) -> Option<&Selection> {
        self.saved.as_ref()
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn on_selection_change(&mut self, range: Option<Selection>, index: &DocIndex) {
        match range {
            Some(range) if range.is_inside(index) => {
                self.saved = Some(range.clone());
                self.current = Some(range);
                self.focused = true;
            }
            Some(range) => {
                log::debug!("selection left the editable root");
                self.current = Some(range);
                self.focused = false;
            }
            None => self.focused = false,
        }
    }

    pub fn on_focus_change(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn set_from_command(&mut self, selection: Selection) {
        self.current = Some(selection);
        self.focused = true;
    }

    pub fn carry_saved(&mut self, selection: Selection) {
        self.saved = Some(selection);
    }

    /// Puts the saved range back as the live selection. Offsets are clamped
    /// when the document shrank underneath it; a range whose nodes are gone
    /// is not restored.
    pub fn restore(&mut self, doc: &Document, index: &DocIndex) -> Option<Selection> {
        let Some(saved) = self.saved.as_ref() else {
            log::debug!("no saved selection to restore");
            return None;
        };
        let Some(restored) = saved.clamped(doc, index) else {
            log::debug!("saved selection no longer resolves");
            return None;
        };
        self.current = Some(restored.clone());
        self.focused = true;
        Some(restored)
    }
}
