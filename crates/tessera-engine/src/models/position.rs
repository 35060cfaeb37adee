use super::node::{Node, NodeContent};

/// One ancestor on the path from the root to a resolved position.
#[derive(Debug, Clone, Copy)]
struct Level<'a> {
    node: &'a Node,
    /// Absolute position of the first content slot of `node`.
    start: usize,
    /// Index of the child at or after the position.
    index: usize,
    /// Absolute position where the child at `index` begins.
    child_start: usize,
}

/// A position together with its ancestor chain.
///
/// Depth 0 is the root. The deepest level is the innermost node whose content
/// contains the position; positions at a child boundary stay at the parent.
#[derive(Debug, Clone)]
pub struct ResolvedPos<'a> {
    pos: usize,
    levels: Vec<Level<'a>>,
}

impl<'a> ResolvedPos<'a> {
    /// Resolves `pos` inside `root`'s content. Returns `None` past the end.
    pub fn resolve(root: &'a Node, pos: usize) -> Option<Self> {
        if pos > root.content_size() {
            return None;
        }

        let mut levels = Vec::new();
        let mut node = root;
        let mut start = 0;

        loop {
            let NodeContent::Blocks(children) = &node.content else {
                levels.push(Level {
                    node,
                    start,
                    index: 0,
                    child_start: start,
                });
                break;
            };

            let mut child_start = start;
            let mut index = children.len();
            let mut descend = None;
            for (i, child) in children.iter().enumerate() {
                let end = child_start + child.node_size();
                if pos == child_start {
                    index = i;
                    break;
                }
                if pos < end {
                    index = i;
                    if !child.is_atom() {
                        descend = Some((child, child_start + 1));
                    }
                    break;
                }
                child_start = end;
            }

            levels.push(Level {
                node,
                start,
                index,
                child_start,
            });

            match descend {
                Some((child, child_content_start)) => {
                    node = child;
                    start = child_content_start;
                }
                None => break,
            }
        }

        Some(Self { pos, levels })
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Depth of the innermost ancestor.
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    /// Ancestor at `depth`. Panics if `depth > self.depth()`.
    pub fn node(&self, depth: usize) -> &'a Node {
        self.levels[depth].node
    }

    /// Absolute start of the content of the ancestor at `depth`.
    pub fn start(&self, depth: usize) -> usize {
        self.levels[depth].start
    }

    /// Position directly before the ancestor at `depth` (meaningful for depth >= 1).
    pub fn before(&self, depth: usize) -> usize {
        self.levels[depth].start.saturating_sub(1)
    }

    /// Index into the ancestor at `depth` of the child at or after the position.
    pub fn index(&self, depth: usize) -> usize {
        self.levels[depth].index
    }

    /// Offset of the position inside the innermost ancestor's content.
    pub fn parent_offset(&self) -> usize {
        self.pos - self.levels[self.depth()].start
    }

    /// Whether the position sits between two children (or at either end) of
    /// the innermost ancestor.
    pub fn at_child_boundary(&self) -> bool {
        let level = &self.levels[self.depth()];
        level.node.has_blocks() && level.child_start == self.pos
    }

    /// The child starting exactly at the position, if any.
    pub fn node_after(&self) -> Option<&'a Node> {
        let level = &self.levels[self.depth()];
        if level.child_start != self.pos {
            return None;
        }
        level.node.children().get(level.index)
    }

    /// Child indices leading from the root to the ancestor at `depth`.
    pub fn path(&self, depth: usize) -> Vec<usize> {
        self.levels[..depth].iter().map(|level| level.index).collect()
    }

    /// Child indices leading to `node_after()`.
    pub fn path_after(&self) -> Vec<usize> {
        self.path(self.depth() + 1)
    }
}

impl<'a> ResolvedPos<'a> {
    /// Ancestors from the root down, for callers that walk the chain.
    pub fn ancestors(&self) -> impl Iterator<Item = &'a Node> + '_ {
        self.levels.iter().map(|level| level.node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // doc
    //   0 paragraph "ab"        (0..4)
    //   4 quote                 (4..13)
    //       5 paragraph "cd"    (5..9)
    //       9 divider           (9..10)
    //      10 paragraph ""      (10..12)
    fn sample() -> Node {
        Node::blocks(
            "doc",
            vec![
                Node::text("paragraph", "ab"),
                Node::blocks(
                    "quote",
                    vec![
                        Node::text("paragraph", "cd"),
                        Node::atom("divider"),
                        Node::text("paragraph", ""),
                    ],
                ),
            ],
        )
    }

    #[test]
    fn test_resolve_child_boundary_stays_at_parent() {
        let root = sample();
        let rp = ResolvedPos::resolve(&root, 4).unwrap();
        assert_eq!(rp.depth(), 0);
        assert!(rp.at_child_boundary());
        assert_eq!(rp.node_after().map(|n| n.kind.as_str()), Some("quote"));
        assert_eq!(rp.path_after(), vec![1]);
    }

    #[test]
    fn test_resolve_inside_text_descends() {
        let root = sample();
        let rp = ResolvedPos::resolve(&root, 7).unwrap();
        assert_eq!(rp.depth(), 2);
        assert_eq!(rp.node(1).kind, "quote");
        assert_eq!(rp.node(2).kind, "paragraph");
        assert_eq!(rp.before(2), 5);
        assert_eq!(rp.before(1), 4);
        assert_eq!(rp.parent_offset(), 1);
        assert_eq!(rp.path(2), vec![1, 0]);
        assert!(rp.node_after().is_none());
    }

    #[test]
    fn test_resolve_before_atom_and_at_end() {
        let root = sample();
        let rp = ResolvedPos::resolve(&root, 9).unwrap();
        assert_eq!(rp.depth(), 1);
        assert_eq!(rp.node_after().map(|n| n.kind.as_str()), Some("divider"));

        let end = root.content_size();
        let rp = ResolvedPos::resolve(&root, end).unwrap();
        assert_eq!(rp.depth(), 0);
        assert_eq!(rp.index(0), 2);
        assert!(rp.node_after().is_none());
    }

    #[test]
    fn test_resolve_past_end_is_none() {
        let root = sample();
        assert!(ResolvedPos::resolve(&root, root.content_size() + 1).is_none());
    }
}
