use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Node attributes (heading level, callout emoji, image source, ...).
pub type Attrs = Map<String, Value>;

/// Inline formatting applied to a run of text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mark {
    Bold,
    Italic,
    Code,
    Strike,
    Link { href: String },
}

/// A run of text sharing one set of marks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineRun {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

impl InlineRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    pub fn marked(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Self {
            text: text.into(),
            marks,
        }
    }

    /// Length in the linear content model (one unit per char).
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// What a node holds: inline text, child blocks, or nothing at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeContent {
    Inline(Vec<InlineRun>),
    Blocks(Vec<Node>),
    Atom,
}

/// One node of the document tree.
///
/// Sizes follow the linear content model: an atom occupies one position, any
/// other node occupies its content plus an opening and a closing token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attrs: Attrs,
    pub content: NodeContent,
}

impl Node {
    /// A textblock holding a single plain run.
    pub fn text(kind: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let runs = if text.is_empty() {
            Vec::new()
        } else {
            vec![InlineRun::plain(text)]
        };
        Self::textblock(kind, runs)
    }

    pub fn textblock(kind: impl Into<String>, runs: Vec<InlineRun>) -> Self {
        Self {
            kind: kind.into(),
            attrs: Attrs::new(),
            content: NodeContent::Inline(normalize_runs(runs)),
        }
    }

    pub fn blocks(kind: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            kind: kind.into(),
            attrs: Attrs::new(),
            content: NodeContent::Blocks(children),
        }
    }

    pub fn atom(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attrs: Attrs::new(),
            content: NodeContent::Atom,
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn with_attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn is_textblock(&self) -> bool {
        matches!(self.content, NodeContent::Inline(_))
    }

    pub fn is_atom(&self) -> bool {
        matches!(self.content, NodeContent::Atom)
    }

    pub fn has_blocks(&self) -> bool {
        matches!(self.content, NodeContent::Blocks(_))
    }

    /// Child nodes; empty for textblocks and atoms.
    pub fn children(&self) -> &[Node] {
        match &self.content {
            NodeContent::Blocks(children) => children,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match &mut self.content {
            NodeContent::Blocks(children) => Some(children),
            _ => None,
        }
    }

    /// Inline runs; empty for anything but a textblock.
    pub fn inline(&self) -> &[InlineRun] {
        match &self.content {
            NodeContent::Inline(runs) => runs,
            _ => &[],
        }
    }

    pub fn inline_mut(&mut self) -> Option<&mut Vec<InlineRun>> {
        match &mut self.content {
            NodeContent::Inline(runs) => Some(runs),
            _ => None,
        }
    }

    /// Text of a textblock, without marks.
    pub fn plain_text(&self) -> String {
        self.inline().iter().map(|run| run.text.as_str()).collect()
    }

    pub fn content_size(&self) -> usize {
        match &self.content {
            NodeContent::Inline(runs) => runs.iter().map(InlineRun::len).sum(),
            NodeContent::Blocks(children) => children.iter().map(Node::node_size).sum(),
            NodeContent::Atom => 0,
        }
    }

    pub fn node_size(&self) -> usize {
        match self.content {
            NodeContent::Atom => 1,
            _ => self.content_size() + 2,
        }
    }

    /// Follows child indices from this node.
    pub fn descendant(&self, path: &[usize]) -> Option<&Node> {
        let mut node = self;
        for &index in path {
            node = node.children().get(index)?;
        }
        Some(node)
    }

    pub fn descendant_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let mut node = self;
        for &index in path {
            node = node.children_mut()?.get_mut(index)?;
        }
        Some(node)
    }

    /// Depth of the deepest descendant below this node (0 for a node without children).
    pub fn nesting_depth(&self) -> usize {
        self.children()
            .iter()
            .map(|child| child.nesting_depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Offset of the first position inside the first textblock of this subtree,
    /// relative to the position before this node.
    pub fn first_text_offset(&self) -> Option<usize> {
        match &self.content {
            NodeContent::Inline(_) => Some(1),
            NodeContent::Atom => None,
            NodeContent::Blocks(children) => {
                let mut offset = 1;
                for child in children {
                    if let Some(inner) = child.first_text_offset() {
                        return Some(offset + inner);
                    }
                    offset += child.node_size();
                }
                None
            }
        }
    }
}

/// Merges adjacent runs with identical marks and drops empty ones.
pub fn normalize_runs(runs: Vec<InlineRun>) -> Vec<InlineRun> {
    let mut merged: Vec<InlineRun> = Vec::with_capacity(runs.len());
    for run in runs.into_iter().filter(|run| !run.is_empty()) {
        match merged.last_mut() {
            Some(last) if last.marks == run.marks => last.text.push_str(&run.text),
            _ => merged.push(run),
        }
    }
    merged
}

/// Drops every mark, keeping only the text.
pub fn strip_marks(runs: &[InlineRun]) -> Vec<InlineRun> {
    let text: String = runs.iter().map(|run| run.text.as_str()).collect();
    if text.is_empty() {
        Vec::new()
    } else {
        vec![InlineRun::plain(text)]
    }
}

/// Inserts `text` at char `offset`, inheriting the marks of the run it lands in.
pub fn insert_text(runs: &mut Vec<InlineRun>, offset: usize, text: &str) {
    let mut remaining = offset;
    for run in runs.iter_mut() {
        let len = run.len();
        if remaining <= len {
            let byte = char_to_byte(&run.text, remaining);
            run.text.insert_str(byte, text);
            return;
        }
        remaining -= len;
    }
    runs.push(InlineRun::plain(text));
}

/// Removes the char range `from..to`, then re-normalizes.
pub fn delete_text(runs: &mut Vec<InlineRun>, from: usize, to: usize) {
    let mut start = 0;
    for run in runs.iter_mut() {
        let len = run.len();
        let end = start + len;
        let lo = from.clamp(start, end) - start;
        let hi = to.clamp(start, end) - start;
        if lo < hi {
            let lo_byte = char_to_byte(&run.text, lo);
            let hi_byte = char_to_byte(&run.text, hi);
            run.text.replace_range(lo_byte..hi_byte, "");
        }
        start = end;
    }
    *runs = normalize_runs(std::mem::take(runs));
}

fn char_to_byte(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sizes_follow_linear_content_model() {
        let paragraph = Node::text("paragraph", "héllo");
        assert_eq!(paragraph.content_size(), 5);
        assert_eq!(paragraph.node_size(), 7);

        let divider = Node::atom("divider");
        assert_eq!(divider.node_size(), 1);

        let quote = Node::blocks("quote", vec![paragraph.clone(), divider]);
        assert_eq!(quote.content_size(), 8);
        assert_eq!(quote.node_size(), 10);
    }

    #[test]
    fn test_empty_text_has_no_runs() {
        let node = Node::text("paragraph", "");
        assert!(node.inline().is_empty());
        assert_eq!(node.node_size(), 2);
    }

    #[test]
    fn test_normalize_merges_and_drops_empty_runs() {
        let runs = vec![
            InlineRun::plain("a"),
            InlineRun::plain(""),
            InlineRun::plain("b"),
            InlineRun::marked("c", vec![Mark::Bold]),
        ];
        assert_eq!(
            normalize_runs(runs),
            vec![
                InlineRun::plain("ab"),
                InlineRun::marked("c", vec![Mark::Bold])
            ]
        );
    }

    #[test]
    fn test_insert_and_delete_text_across_runs() {
        let mut runs = vec![
            InlineRun::plain("Hello "),
            InlineRun::marked("world", vec![Mark::Italic]),
        ];
        insert_text(&mut runs, 8, "🦀");
        assert_eq!(runs[1].text, "wo🦀rld");

        delete_text(&mut runs, 4, 9);
        assert_eq!(
            runs,
            vec![
                InlineRun::plain("Hell"),
                InlineRun::marked("rld", vec![Mark::Italic])
            ]
        );
    }

    #[test]
    fn test_first_text_offset_skips_atoms() {
        let quote = Node::blocks(
            "quote",
            vec![Node::atom("divider"), Node::text("paragraph", "x")],
        );
        // quote opens at 0, divider takes 1, paragraph opens at 2
        assert_eq!(quote.first_text_offset(), Some(3));
        assert_eq!(Node::atom("image").first_text_offset(), None);
    }

    #[test]
    fn test_node_json_shape() {
        let node = Node::text("heading", "Title").with_attr("level", 2);
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "kind": "heading",
                "attrs": { "level": 2 },
                "content": { "inline": [ { "text": "Title" } ] }
            })
        );
        let back: Node = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }
}
