use super::layout::{ElementId, ElementRole, LayoutTree, Rect};
use crate::blocks::{BlockTypeRegistry, ContentRule};
use crate::editing::Document;
use crate::models::{Node, NodeContent};

/// A simple block layout: every textblock and atom takes one line, nested
/// blocks are indented, and column layouts split their width evenly.
///
/// Each block gets a drag handle in the gutter to its left, rendered as chrome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackedLayout {
    pub width: f32,
    pub line_height: f32,
    pub indent: f32,
    /// Horizontal space between columns.
    pub gap: f32,
    /// Width of the drag-handle gutter left of the content.
    pub gutter: f32,
}

impl Default for StackedLayout {
    fn default() -> Self {
        Self {
            width: 640.0,
            line_height: 16.0,
            indent: 16.0,
            gap: 16.0,
            gutter: 16.0,
        }
    }
}

struct Pass<'a> {
    layout: &'a StackedLayout,
    registry: &'a BlockTypeRegistry,
    tree: LayoutTree,
}

impl StackedLayout {
    pub fn layout(&self, doc: &Document) -> LayoutTree {
        let mut pass = Pass {
            layout: self,
            registry: doc.registry(),
            tree: LayoutTree::new(),
        };
        let root = pass.tree.push(
            None,
            Rect::new(0.0, 0.0, self.width, 0.0),
            ElementRole::Decoration,
        );
        let bottom = pass.children(
            root,
            doc.root(),
            0,
            self.gutter,
            0.0,
            self.width - self.gutter,
        );
        pass.tree
            .resize(root, Rect::new(0.0, 0.0, self.width, bottom));
        pass.tree
    }
}

impl Pass<'_> {
    fn line(&self) -> f32 {
        self.layout.line_height
    }

    /// Lays out the children of `node`, whose content starts at `start`.
    /// Returns the bottom edge.
    fn children(
        &mut self,
        parent: ElementId,
        node: &Node,
        start: usize,
        x: f32,
        mut y: f32,
        width: f32,
    ) -> f32 {
        let mut address = start;
        for child in node.children() {
            y = self.block(parent, child, address, x, y, width);
            address += child.node_size();
        }
        y
    }

    fn block(
        &mut self,
        parent: ElementId,
        node: &Node,
        address: usize,
        x: f32,
        y: f32,
        width: f32,
    ) -> f32 {
        let line = self.line();
        let element = self.tree.push(
            Some(parent),
            Rect::new(x, y, width, line),
            ElementRole::Node { pos: address },
        );

        let bottom = match &node.content {
            NodeContent::Inline(_) => {
                self.tree.push(
                    Some(element),
                    Rect::new(x, y, width, line),
                    ElementRole::Node { pos: address + 1 },
                );
                y + line
            }
            NodeContent::Atom => y + line,
            NodeContent::Blocks(slots) => {
                let registry = self.registry;
                let block_type = registry.by_kind(&node.kind);
                if block_type.is_some_and(|block_type| block_type.is_pass_through()) {
                    self.columns(element, slots, address + 1, x, y, width)
                } else if block_type
                    .is_some_and(|block_type| matches!(block_type.content, ContentRule::Slots(_)))
                {
                    self.slots(element, slots, address + 1, x, y, width)
                } else {
                    let indent = self.layout.indent;
                    self.children(element, node, address + 1, x + indent, y, width - indent)
                }
            }
        };

        let rect = Rect::new(x, y, width, bottom - y);
        self.tree.resize(element, rect);
        self.tree.set_block_rect(address, rect);
        let gutter = self.layout.gutter;
        self.tree.push(
            Some(element),
            Rect::new(x - gutter, y, gutter, line),
            ElementRole::Chrome,
        );
        bottom
    }

    fn columns(
        &mut self,
        wrapper: ElementId,
        columns: &[Node],
        start: usize,
        x: f32,
        y: f32,
        width: f32,
    ) -> f32 {
        let count = columns.len().max(1) as f32;
        let gap = self.layout.gap;
        let column_width = (width - gap * (count - 1.0)) / count;

        let mut bottom = y;
        let mut address = start;
        for (i, column) in columns.iter().enumerate() {
            let column_x = x + i as f32 * (column_width + gap);
            let element = self.tree.push(
                Some(wrapper),
                Rect::new(column_x, y, column_width, 0.0),
                ElementRole::Node { pos: address + 1 },
            );
            let column_bottom =
                self.children(element, column, address + 1, column_x, y, column_width);
            self.tree.resize(
                element,
                Rect::new(column_x, y, column_width, column_bottom - y),
            );
            bottom = bottom.max(column_bottom);
            address += column.node_size();
        }
        bottom
    }

    fn slots(
        &mut self,
        block: ElementId,
        slots: &[Node],
        start: usize,
        x: f32,
        mut y: f32,
        width: f32,
    ) -> f32 {
        let line = self.line();
        let indent = self.layout.indent;
        let mut address = start;
        for slot in slots {
            if slot.is_textblock() {
                self.tree.push(
                    Some(block),
                    Rect::new(x, y, width, line),
                    ElementRole::Node { pos: address + 1 },
                );
                y += line;
            } else {
                let element = self.tree.push(
                    Some(block),
                    Rect::new(x + indent, y, width - indent, 0.0),
                    ElementRole::Decoration,
                );
                let bottom =
                    self.children(element, slot, address + 1, x + indent, y, width - indent);
                self.tree.resize(
                    element,
                    Rect::new(x + indent, y, width - indent, bottom - y),
                );
                y = bottom;
            }
            address += slot.node_size();
        }
        y
    }
}
